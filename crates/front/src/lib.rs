pub mod ast;
pub mod compilation_unit;
pub mod symbol_table;
