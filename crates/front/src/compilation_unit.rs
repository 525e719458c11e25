use golite_common::generators::{RegisterGenerator, VirtualRegister};
use golite_common::typings::Type;
use golite_common::{idx, Idx, IndexVec};

use crate::ast::{Ast, StmtIndex};
use crate::symbol_table::{ScopeIdx, SymbolTable};


idx!(FunctionIdx);

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    /// Local variable names in declaration order, parameters excluded.
    pub locals: Vec<String>,
    pub body: Vec<StmtIndex>,
    pub scope: ScopeIdx,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Global variable names in declaration order.
    pub globals: Vec<String>,
    pub functions: IndexVec<FunctionIdx, FunctionDeclaration>,
}

/// A validated program: its declarations, statement arena and symbol table.
///
/// The `declare_*` helpers keep the program and the symbol table in step and
/// are what semantic analysis calls once a declaration has been checked.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub ast: Ast,
    pub program: Program,
    pub symbols: SymbolTable,
}

impl CompilationUnit {
    pub fn new() -> Self {
        Self { ast: Ast::new(), program: Program::default(), symbols: SymbolTable::new() }
    }

    pub fn declare_struct(&mut self, name: &str, fields: &[(&str, Type)], registers: &mut RegisterGenerator) {
        self.symbols.declare_struct(name, fields, registers);
    }

    pub fn declare_global(&mut self, name: &str, ty: Type, registers: &mut RegisterGenerator) -> VirtualRegister {
        let global = self.symbols.global();
        let register = self.symbols.declare_variable(global, name, ty, registers);
        self.program.globals.push(name.to_string());

        register
    }

    pub fn declare_function(
        &mut self,
        name: &str,
        parameters: &[(&str, Type)],
        return_type: Type,
        registers: &mut RegisterGenerator,
    ) -> FunctionIdx {
        let scope = self.symbols.declare_function(name, return_type);
        for (parameter, ty) in parameters {
            self.symbols.declare_parameter(scope, parameter, ty.clone(), registers);
        }

        self.program.functions.push(FunctionDeclaration {
            name: name.to_string(),
            locals: Vec::new(),
            body: Vec::new(),
            scope,
        })
    }

    pub fn declare_local(
        &mut self,
        function: FunctionIdx,
        name: &str,
        ty: Type,
        registers: &mut RegisterGenerator,
    ) -> VirtualRegister {
        let function = &mut self.program.functions[function];
        let register = self.symbols.declare_variable(function.scope, name, ty, registers);
        function.locals.push(name.to_string());

        register
    }

    pub fn push_statement(&mut self, function: FunctionIdx, statement: StmtIndex) {
        self.program.functions[function].body.push(statement);
    }
}
