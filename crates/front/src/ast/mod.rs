use std::fmt::{Display, Formatter};

use golite_common::{idx, Idx, IndexVec};


idx!(StmtIndex);
idx!(ExprIndex);

/// Arena of the validated statements and expressions of one program.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub statements: IndexVec<StmtIndex, Statement>,
    pub expressions: IndexVec<ExprIndex, Expression>,
}

impl Ast {
    pub fn new() -> Self {
        Self {
            statements: IndexVec::new(),
            expressions: IndexVec::new(),
        }
    }

    pub fn query_statement(&self, stmt_id: StmtIndex) -> &Statement {
        self.statements.get_or_panic(stmt_id)
    }

    pub fn query_expression(&self, expr_id: ExprIndex) -> &Expression {
        self.expressions.get_or_panic(expr_id)
    }

    // Statement
    fn statement_from_kind(&mut self, kind: StatementKind) -> StmtIndex {
        let id = self.statements.push(Statement { id: StmtIndex::new(0), kind });
        self.statements[id].id = id;
        id
    }

    pub fn assignment(&mut self, target: LValue, value: ExprIndex) -> StmtIndex {
        self.statement_from_kind(StatementKind::Assignment(AssignmentStatement { target, value }))
    }

    pub fn print(&mut self, variable: &str) -> StmtIndex {
        self.statement_from_kind(StatementKind::Print(PrintStatement { variable: variable.to_string(), newline: false }))
    }

    pub fn println(&mut self, variable: &str) -> StmtIndex {
        self.statement_from_kind(StatementKind::Print(PrintStatement { variable: variable.to_string(), newline: true }))
    }

    pub fn read(&mut self, variable: &str) -> StmtIndex {
        self.statement_from_kind(StatementKind::Read(ReadStatement { variable: variable.to_string() }))
    }

    pub fn conditional(
        &mut self,
        condition: ExprIndex,
        then_block: Vec<StmtIndex>,
        else_block: Option<Vec<StmtIndex>>,
    ) -> StmtIndex {
        self.statement_from_kind(StatementKind::Conditional(ConditionalStatement { condition, then_block, else_block }))
    }

    pub fn loop_statement(&mut self, condition: ExprIndex, body: Vec<StmtIndex>) -> StmtIndex {
        self.statement_from_kind(StatementKind::Loop(LoopStatement { condition, body }))
    }

    pub fn return_statement(&mut self, value: Option<ExprIndex>) -> StmtIndex {
        self.statement_from_kind(StatementKind::Return(ReturnStatement { value }))
    }

    pub fn invocation(&mut self, callee: &str, arguments: Vec<ExprIndex>) -> StmtIndex {
        self.statement_from_kind(StatementKind::Invocation(CallExpression { callee: callee.to_string(), arguments }))
    }

    // Expression
    fn expression_from_kind(&mut self, kind: ExpressionKind) -> ExprIndex {
        let id = self.expressions.push(Expression { id: ExprIndex::new(0), kind });
        self.expressions[id].id = id;
        id
    }

    pub fn int(&mut self, value: i64) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Int(value))
    }

    pub fn boolean(&mut self, value: bool) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Bool(value))
    }

    pub fn nil(&mut self) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Nil)
    }

    pub fn identifier(&mut self, name: &str) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Identifier(name.to_string()))
    }

    pub fn parenthesised(&mut self, inner: ExprIndex) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Parenthesised(inner))
    }

    /// An operator chain `head op1 e1 op2 e2 ...` of one precedence level.
    pub fn chain(&mut self, head: ExprIndex, rest: Vec<(BinaryOpKind, ExprIndex)>) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Binary(BinaryChain { head, rest }))
    }

    pub fn binary(&mut self, left: ExprIndex, operator: BinaryOpKind, right: ExprIndex) -> ExprIndex {
        self.chain(left, vec![(operator, right)])
    }

    pub fn unary(&mut self, operator: UnaryOpKind, operand: ExprIndex) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Unary(UnaryExpression { operator, operand }))
    }

    pub fn selector(&mut self, base: ExprIndex, fields: &[&str]) -> ExprIndex {
        let fields = fields.iter().map(|field| field.to_string()).collect();
        self.expression_from_kind(ExpressionKind::Selector(SelectorExpression { base, fields }))
    }

    pub fn call(&mut self, callee: &str, arguments: Vec<ExprIndex>) -> ExprIndex {
        self.expression_from_kind(ExpressionKind::Call(CallExpression { callee: callee.to_string(), arguments }))
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub id: StmtIndex,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Assignment(AssignmentStatement),
    Print(PrintStatement),
    Read(ReadStatement),
    Conditional(ConditionalStatement),
    Loop(LoopStatement),
    Return(ReturnStatement),
    Invocation(CallExpression),
}

/// Assignment target: a variable, optionally followed by a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LValue {
    pub base: String,
    pub fields: Vec<String>,
}

impl LValue {
    pub fn variable(name: &str) -> Self {
        Self { base: name.to_string(), fields: Vec::new() }
    }

    pub fn field_path(base: &str, fields: &[&str]) -> Self {
        Self { base: base.to_string(), fields: fields.iter().map(|field| field.to_string()).collect() }
    }
}

impl Display for LValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentStatement {
    pub target: LValue,
    pub value: ExprIndex,
}

#[derive(Debug, Clone)]
pub struct PrintStatement {
    pub variable: String,
    pub newline: bool,
}

#[derive(Debug, Clone)]
pub struct ReadStatement {
    pub variable: String,
}

#[derive(Debug, Clone)]
pub struct ConditionalStatement {
    pub condition: ExprIndex,
    pub then_block: Vec<StmtIndex>,
    pub else_block: Option<Vec<StmtIndex>>,
}

#[derive(Debug, Clone)]
pub struct LoopStatement {
    pub condition: ExprIndex,
    pub body: Vec<StmtIndex>,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Option<ExprIndex>,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub id: ExprIndex,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Binary(BinaryChain),
    Unary(UnaryExpression),
    Selector(SelectorExpression),
    Call(CallExpression),
    Int(i64),
    Bool(bool),
    Nil,
    Identifier(String),
    Parenthesised(ExprIndex),
}

#[derive(Debug, Clone)]
pub struct BinaryChain {
    pub head: ExprIndex,
    pub rest: Vec<(BinaryOpKind, ExprIndex)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpKind {
    Or,
    And,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl Display for BinaryOpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let operator = match self {
            BinaryOpKind::Or => "||",
            BinaryOpKind::And => "&&",
            BinaryOpKind::Equals => "==",
            BinaryOpKind::NotEquals => "!=",
            BinaryOpKind::LessThan => "<",
            BinaryOpKind::LessThanOrEqual => "<=",
            BinaryOpKind::GreaterThan => ">",
            BinaryOpKind::GreaterThanOrEqual => ">=",
            BinaryOpKind::Plus => "+",
            BinaryOpKind::Minus => "-",
            BinaryOpKind::Multiply => "*",
            BinaryOpKind::Divide => "/",
        };
        write!(f, "{}", operator)
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOpKind,
    pub operand: ExprIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
    Negate,
}

#[derive(Debug, Clone)]
pub struct SelectorExpression {
    pub base: ExprIndex,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: String,
    pub arguments: Vec<ExprIndex>,
}
