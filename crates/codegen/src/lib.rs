pub mod backends;
pub mod error;

use golite_front::symbol_table::SymbolTable;
use golite_middle::ir::iloc::FuncFrag;

pub use backends::arm64::Arm64Codegen;
pub use error::CodegenError;


/// Lower ILOC fragments to ARMv8-A assembly lines using a fresh backend
pub fn compile_to_arm64(frags: &[FuncFrag], symbols: &SymbolTable) -> Result<Vec<String>, CodegenError> {
    let mut codegen = Arm64Codegen::new();
    codegen.generate(frags, symbols)
}
