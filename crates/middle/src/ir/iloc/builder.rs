use golite_common::bug_report;
use golite_common::generators::{Generators, VirtualRegister};
use golite_common::typings::Type;
use golite_front::ast::{
    BinaryChain, BinaryOpKind, CallExpression, ExprIndex, ExpressionKind, LValue, StatementKind, StmtIndex,
    UnaryOpKind,
};
use golite_front::compilation_unit::{CompilationUnit, FunctionDeclaration};
use golite_front::symbol_table::{Builtin, Callee, Entry, ScopeIdx, VarEntry};

use crate::ir::iloc::{Address, BinaryOperator, Condition, FuncFrag, Instruction, Operand, GLOBAL_FRAG_LABEL};


/// Lowers a validated program to ILOC: one synthetic fragment for the global
/// initializers followed by one fragment per function.
///
/// Every expression lowering returns the virtual register holding its result.
pub struct ILOCBuilder<'a> {
    unit: &'a CompilationUnit,
    generators: &'a mut Generators,
    scope: ScopeIdx,
    instructions: Vec<Instruction>,
}

impl<'a> ILOCBuilder<'a> {
    pub fn new(unit: &'a CompilationUnit, generators: &'a mut Generators) -> Self {
        Self {
            unit,
            generators,
            scope: unit.symbols.global(),
            instructions: Vec::new(),
        }
    }

    pub fn build(mut self) -> Vec<FuncFrag> {
        let unit = self.unit;
        let mut frags = vec![self.build_globals()];

        for function in unit.program.functions.iter() {
            frags.push(self.build_function(function));
        }

        frags
    }

    fn build_globals(&mut self) -> FuncFrag {
        let unit = self.unit;
        self.scope = unit.symbols.global();

        for global in &unit.program.globals {
            let register = self.register_of(global);
            self.emit(Instruction::Mov { target: register, source: Operand::Immediate(0), condition: Condition::Always });
            self.emit(Instruction::Str { value: register, address: Address::Global(global.clone()) });
        }

        FuncFrag { label: GLOBAL_FRAG_LABEL.to_string(), body: std::mem::take(&mut self.instructions) }
    }

    fn build_function(&mut self, function: &FunctionDeclaration) -> FuncFrag {
        tracing::debug!("Lowering function `{}` ({} statements)", function.name, function.body.len());
        self.scope = function.scope;

        for local in &function.locals {
            let register = self.register_of(local);
            self.emit(Instruction::Mov { target: register, source: Operand::Immediate(0), condition: Condition::Always });
        }

        self.build_block(&function.body);

        FuncFrag { label: function.name.clone(), body: std::mem::take(&mut self.instructions) }
    }

    fn emit(&mut self, instruction: Instruction) {
        tracing::trace!("Emitting `{}`", instruction);
        self.instructions.push(instruction);
    }

    fn next_register(&mut self) -> VirtualRegister {
        self.generators.registers.next_register()
    }

    fn variable(&self, name: &str) -> &'a VarEntry {
        let unit = self.unit;
        match unit.symbols.power_contains(self.scope, name) {
            Some(Entry::Var(var)) => var,
            Some(_) => bug_report!("`{}` is not a variable", name),
            None => bug_report!("Unresolved identifier `{}` reached lowering", name),
        }
    }

    /// Stable register of the variable `name` resolves to.
    fn register_of(&self, name: &str) -> VirtualRegister {
        match self.unit.symbols.power_contains(self.scope, name).and_then(Entry::register) {
            Some(register) => register,
            None => bug_report!("`{}` does not resolve to a variable", name),
        }
    }

    fn is_global(&self, name: &str) -> bool {
        self.unit.symbols.check_global_variable(self.scope, name)
    }

    fn build_block(&mut self, statements: &[StmtIndex]) {
        for statement in statements {
            self.build_statement(*statement);
        }
    }

    fn build_statement(&mut self, stmt_id: StmtIndex) {
        let unit = self.unit;
        let statement = unit.ast.query_statement(stmt_id);

        match &statement.kind {
            StatementKind::Assignment(assignment) => {
                let value = self.build_expression(assignment.value);
                self.build_store(&assignment.target, value);
            }
            StatementKind::Print(print) => {
                let source = self.build_variable_read(&print.variable);
                if print.newline {
                    self.emit(Instruction::Println { source });
                } else {
                    self.emit(Instruction::Print { source });
                }
            }
            StatementKind::Read(read) => {
                if self.is_global(&read.variable) {
                    let target = self.next_register();
                    self.emit(Instruction::Read { target, variable: read.variable.clone() });
                    self.emit(Instruction::Str { value: target, address: Address::Global(read.variable.clone()) });
                } else {
                    let target = self.register_of(&read.variable);
                    self.emit(Instruction::Read { target, variable: read.variable.clone() });
                }
            }
            StatementKind::Conditional(conditional) => {
                let condition = self.build_expression(conditional.condition);
                self.emit(Instruction::Cmp { left: condition, right: Operand::Immediate(1) });

                let else_label = conditional.else_block.as_ref()
                    .map(|_| self.generators.labels.next_label("else"));
                let done_label = self.generators.labels.next_label("done");

                let skip_label = else_label.clone().unwrap_or_else(|| done_label.clone());
                self.emit(Instruction::Branch { condition: Condition::Ne, label: skip_label });

                self.build_block(&conditional.then_block);
                self.emit(Instruction::Branch { condition: Condition::Always, label: done_label.clone() });

                if let (Some(else_label), Some(else_block)) = (else_label, &conditional.else_block) {
                    self.emit(Instruction::Label(else_label));
                    self.build_block(else_block);
                }

                self.emit(Instruction::Label(done_label));
            }
            StatementKind::Loop(loop_statement) => {
                let condition_label = self.generators.labels.next_label("condLabel");
                let body_label = self.generators.labels.next_label("loopBody");

                self.emit(Instruction::Branch { condition: Condition::Always, label: condition_label.clone() });
                self.emit(Instruction::Label(body_label.clone()));
                self.build_block(&loop_statement.body);

                self.emit(Instruction::Label(condition_label));
                let condition = self.build_expression(loop_statement.condition);
                self.emit(Instruction::Cmp { left: condition, right: Operand::Immediate(1) });
                self.emit(Instruction::Branch { condition: Condition::Eq, label: body_label });
            }
            StatementKind::Return(return_statement) => {
                let value = return_statement.value
                    .map(|value| Operand::Register(self.build_expression(value)));
                self.emit(Instruction::Ret { value });
            }
            StatementKind::Invocation(call) => {
                self.build_call(call, false);
            }
        }
    }

    /// Reads a named variable: locals are their own register, globals are loaded
    /// into a fresh one.
    fn build_variable_read(&mut self, name: &str) -> VirtualRegister {
        if self.is_global(name) {
            let target = self.next_register();
            self.emit(Instruction::Ldr { target, address: Address::Global(name.to_string()) });
            target
        } else {
            self.register_of(name)
        }
    }

    fn build_store(&mut self, target: &LValue, value: VirtualRegister) {
        let Some((last_field, path)) = target.fields.split_last() else {
            if self.is_global(&target.base) {
                self.emit(Instruction::Str { value, address: Address::Global(target.base.clone()) });
            } else {
                let register = self.register_of(&target.base);
                self.emit(Instruction::Mov { target: register, source: Operand::Register(value), condition: Condition::Always });
            }
            return;
        };

        let mut ty = self.variable(&target.base).ty.clone();
        let mut base = self.build_variable_read(&target.base);

        for field in path {
            (base, ty) = self.build_field_load(base, &ty, field);
        }

        let (index, _) = self.field(&ty, last_field);
        self.emit(Instruction::StrRef { value, base, field: last_field.clone(), index });
    }

    fn field(&self, ty: &Type, field: &str) -> (usize, &'a Entry) {
        let Some(struct_name) = ty.struct_name() else {
            bug_report!("Field `{}` selected on non-struct type {}", field, ty);
        };

        let unit = self.unit;
        match unit.symbols.field(struct_name, field) {
            Some(found) => found,
            None => bug_report!("Struct `{}` has no field `{}`", struct_name, field),
        }
    }

    fn field_type(entry: &Entry) -> Type {
        match entry {
            Entry::Var(var) => var.ty.clone(),
            Entry::Func(_) | Entry::Struct(_) => Type::Unknown,
        }
    }

    fn build_field_load(&mut self, base: VirtualRegister, ty: &Type, field: &str) -> (VirtualRegister, Type) {
        let (index, entry) = self.field(ty, field);
        let target = self.next_register();
        self.emit(Instruction::LoadRef { target, base, field: field.to_string(), index });

        (target, Self::field_type(entry))
    }

    pub fn build_expression(&mut self, expr_id: ExprIndex) -> VirtualRegister {
        let unit = self.unit;
        let expression = unit.ast.query_expression(expr_id);

        match &expression.kind {
            ExpressionKind::Int(value) => self.build_constant(*value),
            ExpressionKind::Bool(value) => self.build_constant(i64::from(*value)),
            ExpressionKind::Nil => self.build_constant(0),
            ExpressionKind::Identifier(name) => self.build_variable_read(name),
            ExpressionKind::Parenthesised(inner) => self.build_expression(*inner),
            ExpressionKind::Binary(chain) => self.build_chain(chain),
            ExpressionKind::Unary(unary) => {
                let operand = self.build_expression(unary.operand);
                match unary.operator {
                    UnaryOpKind::Not => {
                        let target = self.next_register();
                        self.emit(Instruction::Not { target, operand });
                        target
                    }
                    UnaryOpKind::Negate => {
                        let zero = self.build_constant(0);
                        let target = self.next_register();
                        self.emit(Instruction::Binary {
                            operator: BinaryOperator::Sub,
                            target,
                            left: zero,
                            right: Operand::Register(operand),
                        });
                        target
                    }
                }
            }
            ExpressionKind::Selector(selector) => {
                let mut ty = self.static_type(selector.base);
                let mut base = self.build_expression(selector.base);

                for field in &selector.fields {
                    (base, ty) = self.build_field_load(base, &ty, field);
                }

                base
            }
            ExpressionKind::Call(call) => match self.build_call(call, true) {
                Some(register) => register,
                None => bug_report!("Call to `{}` used as a value produces none", call.callee),
            },
        }
    }

    fn build_constant(&mut self, value: i64) -> VirtualRegister {
        let target = self.next_register();
        self.emit(Instruction::Mov { target, source: Operand::Immediate(value), condition: Condition::Always });
        target
    }

    /// Left fold over the chain: each step combines the running result with the
    /// next operand into a fresh register.
    fn build_chain(&mut self, chain: &BinaryChain) -> VirtualRegister {
        let mut result = self.build_expression(chain.head);

        for (operator, operand) in &chain.rest {
            let operand = self.build_expression(*operand);
            result = self.build_binary(*operator, result, operand);
        }

        result
    }

    fn build_binary(&mut self, operator: BinaryOpKind, left: VirtualRegister, right: VirtualRegister) -> VirtualRegister {
        let target = self.next_register();

        if let Some(condition) = Condition::from_operator(operator) {
            self.emit(Instruction::Mov { target, source: Operand::Immediate(0), condition: Condition::Always });
            self.emit(Instruction::Cmp { left, right: Operand::Register(right) });
            self.emit(Instruction::Mov { target, source: Operand::Immediate(1), condition });
            return target;
        }

        let Some(operator) = BinaryOperator::from_operator(operator) else {
            bug_report!("Operator `{}` has no ILOC counterpart", operator);
        };
        self.emit(Instruction::Binary { operator, target, left, right: Operand::Register(right) });

        target
    }

    /// Lowers a call. Returns the register capturing the result when
    /// `wants_value` is set.
    fn build_call(&mut self, call: &CallExpression, wants_value: bool) -> Option<VirtualRegister> {
        let unit = self.unit;
        match unit.symbols.resolve_callee(self.scope, &call.callee) {
            Some(Callee::Builtin(Builtin::New)) => {
                let struct_name = match call.arguments.first().map(|argument| &unit.ast.query_expression(*argument).kind) {
                    Some(ExpressionKind::Identifier(name)) => name.clone(),
                    _ => bug_report!("`new` expects a struct name"),
                };
                let Some(field_count) = unit.symbols.field_count(&struct_name) else {
                    bug_report!("`new` of unknown struct `{}`", struct_name);
                };

                let target = self.next_register();
                self.emit(Instruction::New { target, struct_name, field_count });
                Some(target)
            }
            Some(Callee::Builtin(Builtin::Delete)) => {
                let Some(argument) = call.arguments.first() else {
                    bug_report!("`delete` expects one argument");
                };
                let pointer = self.build_expression(*argument);
                self.emit(Instruction::Delete { pointer });
                None
            }
            Some(Callee::User(_)) => {
                let registers: Vec<VirtualRegister> = call.arguments.iter()
                    .map(|argument| self.build_expression(*argument))
                    .collect();

                self.emit(Instruction::Push { registers: registers.clone(), callee: call.callee.clone() });
                self.emit(Instruction::Bl { callee: call.callee.clone() });

                let result = if wants_value {
                    let target = self.next_register();
                    self.emit(Instruction::MovReturn { target });
                    Some(target)
                } else {
                    None
                };

                self.emit(Instruction::Pop { registers, callee: call.callee.clone() });

                result
            }
            None => bug_report!("Unresolved function `{}` reached lowering", call.callee),
        }
    }

    /// Static type of an expression, used to resolve field selections.
    fn static_type(&self, expr_id: ExprIndex) -> Type {
        match &self.unit.ast.query_expression(expr_id).kind {
            ExpressionKind::Int(_) => Type::Int,
            ExpressionKind::Bool(_) => Type::Bool,
            ExpressionKind::Nil => Type::Unknown,
            ExpressionKind::Identifier(name) => self.variable(name).ty.clone(),
            ExpressionKind::Parenthesised(inner) => self.static_type(*inner),
            ExpressionKind::Binary(chain) => match chain.rest.first() {
                Some((BinaryOpKind::Plus | BinaryOpKind::Minus | BinaryOpKind::Multiply | BinaryOpKind::Divide, _)) => Type::Int,
                Some(_) => Type::Bool,
                None => self.static_type(chain.head),
            },
            ExpressionKind::Unary(unary) => match unary.operator {
                UnaryOpKind::Not => Type::Bool,
                UnaryOpKind::Negate => Type::Int,
            },
            ExpressionKind::Selector(selector) => {
                let mut ty = self.static_type(selector.base);
                for field in &selector.fields {
                    let (_, entry) = self.field(&ty, field);
                    ty = Self::field_type(entry);
                }
                ty
            }
            ExpressionKind::Call(call) => match self.unit.symbols.resolve_callee(self.scope, &call.callee) {
                Some(Callee::User(func)) => func.return_type.clone(),
                Some(Callee::Builtin(Builtin::New)) => match call.arguments.first().map(|argument| &self.unit.ast.query_expression(*argument).kind) {
                    Some(ExpressionKind::Identifier(name)) => Type::Struct(name.clone()),
                    _ => Type::Unknown,
                },
                Some(Callee::Builtin(Builtin::Delete)) => Type::Void,
                None => bug_report!("Unresolved function `{}` reached lowering", call.callee),
            },
        }
    }
}
