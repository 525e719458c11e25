use std::fmt::{Display, Formatter, Result};

use golite_common::bug_report;
use golite_common::generators::VirtualRegister;
use golite_front::ast::BinaryOpKind;

pub mod builder;
pub mod writer;

pub use builder::ILOCBuilder;
pub use writer::ILOCWriter;


/// Label of the synthetic fragment holding the global initializers.
pub const GLOBAL_FRAG_LABEL: &str = "Global Variable";

/// One function's lowered instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncFrag {
    pub label: String,
    pub body: Vec<Instruction>,
}

impl FuncFrag {
    pub fn is_globals(&self) -> bool {
        self.label == GLOBAL_FRAG_LABEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(VirtualRegister),
    Immediate(i64),
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Operand::Register(register) => write!(f, "{}", register),
            Operand::Immediate(value) => write!(f, "#{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Condition {
    pub fn suffix(&self) -> &'static str {
        match self {
            Condition::Always => "",
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Gt => "gt",
            Condition::Lt => "lt",
            Condition::Ge => "ge",
            Condition::Le => "le",
        }
    }

    pub fn inverse(&self) -> Condition {
        match self {
            Condition::Eq => Condition::Ne,
            Condition::Ne => Condition::Eq,
            Condition::Gt => Condition::Le,
            Condition::Le => Condition::Gt,
            Condition::Lt => Condition::Ge,
            Condition::Ge => Condition::Lt,
            Condition::Always => bug_report!("An unconditional flag has no inverse"),
        }
    }

    /// Flag set by a relational or equality operator, `None` for the rest.
    pub fn from_operator(operator: BinaryOpKind) -> Option<Condition> {
        match operator {
            BinaryOpKind::Equals => Some(Condition::Eq),
            BinaryOpKind::NotEquals => Some(Condition::Ne),
            BinaryOpKind::GreaterThan => Some(Condition::Gt),
            BinaryOpKind::LessThan => Some(Condition::Lt),
            BinaryOpKind::GreaterThanOrEqual => Some(Condition::Ge),
            BinaryOpKind::LessThanOrEqual => Some(Condition::Le),
            BinaryOpKind::Or | BinaryOpKind::And | BinaryOpKind::Plus
            | BinaryOpKind::Minus | BinaryOpKind::Multiply | BinaryOpKind::Divide => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
}

impl BinaryOperator {
    pub fn from_operator(operator: BinaryOpKind) -> Option<BinaryOperator> {
        match operator {
            BinaryOpKind::Plus => Some(BinaryOperator::Add),
            BinaryOpKind::Minus => Some(BinaryOperator::Sub),
            BinaryOpKind::Multiply => Some(BinaryOperator::Mul),
            BinaryOpKind::Divide => Some(BinaryOperator::Div),
            BinaryOpKind::And => Some(BinaryOperator::And),
            BinaryOpKind::Or => Some(BinaryOperator::Or),
            _ => None,
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mnemonic = match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Sub => "sub",
            BinaryOperator::Mul => "mul",
            BinaryOperator::Div => "div",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        };
        write!(f, "{}", mnemonic)
    }
}

/// Memory operand of `Ldr`/`Str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// `base + offset register`
    Indexed { base: VirtualRegister, offset: VirtualRegister },
    /// `base + #offset` bytes
    Displaced { base: VirtualRegister, offset: i64 },
    Base(VirtualRegister),
    Global(String),
}

impl Address {
    fn registers(&self) -> Vec<VirtualRegister> {
        match self {
            Address::Indexed { base, offset } => vec![*base, *offset],
            Address::Displaced { base, .. } | Address::Base(base) => vec![*base],
            Address::Global(_) => vec![],
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Address::Indexed { base, offset } => write!(f, "{},{}", base, offset),
            Address::Displaced { base, offset } => write!(f, "{},#{}", base, offset),
            Address::Base(base) => write!(f, "{}", base),
            Address::Global(name) => write!(f, "@{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Binary {
        operator: BinaryOperator,
        target: VirtualRegister,
        left: VirtualRegister,
        right: Operand,
    },
    Not {
        target: VirtualRegister,
        operand: VirtualRegister,
    },
    Cmp {
        left: VirtualRegister,
        right: Operand,
    },
    Branch {
        condition: Condition,
        label: String,
    },
    Label(String),
    Ldr {
        target: VirtualRegister,
        address: Address,
    },
    Str {
        value: VirtualRegister,
        address: Address,
    },
    LoadRef {
        target: VirtualRegister,
        base: VirtualRegister,
        field: String,
        index: usize,
    },
    StrRef {
        value: VirtualRegister,
        base: VirtualRegister,
        field: String,
        index: usize,
    },
    New {
        target: VirtualRegister,
        struct_name: String,
        field_count: usize,
    },
    Delete {
        pointer: VirtualRegister,
    },
    Push {
        registers: Vec<VirtualRegister>,
        callee: String,
    },
    Pop {
        registers: Vec<VirtualRegister>,
        callee: String,
    },
    Mov {
        target: VirtualRegister,
        source: Operand,
        condition: Condition,
    },
    /// A `Mov` copying the return-convention register right after a `Bl`.
    MovReturn {
        target: VirtualRegister,
    },
    Ret {
        value: Option<Operand>,
    },
    Bl {
        callee: String,
    },
    Print {
        source: VirtualRegister,
    },
    Println {
        source: VirtualRegister,
    },
    Read {
        target: VirtualRegister,
        variable: String,
    },
}

impl Instruction {
    /// The register this instruction writes, if any.
    pub fn target(&self) -> Option<VirtualRegister> {
        match self {
            Instruction::Binary { target, .. }
            | Instruction::Not { target, .. }
            | Instruction::Ldr { target, .. }
            | Instruction::LoadRef { target, .. }
            | Instruction::New { target, .. }
            | Instruction::Mov { target, .. }
            | Instruction::MovReturn { target }
            | Instruction::Read { target, .. } => Some(*target),
            Instruction::Cmp { .. }
            | Instruction::Branch { .. }
            | Instruction::Label(_)
            | Instruction::Str { .. }
            | Instruction::StrRef { .. }
            | Instruction::Delete { .. }
            | Instruction::Push { .. }
            | Instruction::Pop { .. }
            | Instruction::Ret { .. }
            | Instruction::Bl { .. }
            | Instruction::Print { .. }
            | Instruction::Println { .. } => None,
        }
    }

    /// Registers this instruction reads.
    pub fn sources(&self) -> Vec<VirtualRegister> {
        fn operand(operand: &Operand) -> Vec<VirtualRegister> {
            match operand {
                Operand::Register(register) => vec![*register],
                Operand::Immediate(_) => vec![],
            }
        }

        match self {
            Instruction::Binary { left, right, .. } | Instruction::Cmp { left, right } => {
                let mut sources = vec![*left];
                sources.extend(operand(right));
                sources
            }
            Instruction::Not { operand, .. } => vec![*operand],
            Instruction::Ldr { address, .. } => address.registers(),
            Instruction::Str { value, address } => {
                let mut sources = vec![*value];
                sources.extend(address.registers());
                sources
            }
            Instruction::LoadRef { base, .. } => vec![*base],
            Instruction::StrRef { value, base, .. } => vec![*value, *base],
            Instruction::Delete { pointer } => vec![*pointer],
            Instruction::Push { registers, .. } => registers.clone(),
            Instruction::Mov { source, .. } => operand(source),
            Instruction::Ret { value } => value.as_ref().map(operand).unwrap_or_default(),
            Instruction::Print { source } | Instruction::Println { source } => vec![*source],
            Instruction::Branch { .. }
            | Instruction::Label(_)
            | Instruction::New { .. }
            | Instruction::Pop { .. }
            | Instruction::MovReturn { .. }
            | Instruction::Bl { .. }
            | Instruction::Read { .. } => vec![],
        }
    }

    /// Label named by a branch or defined by a `Label`.
    pub fn label(&self) -> Option<&str> {
        match self {
            Instruction::Branch { label, .. } | Instruction::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn global_name(&self) -> Option<&str> {
        match self {
            Instruction::Ldr { address: Address::Global(name), .. }
            | Instruction::Str { address: Address::Global(name), .. } => Some(name),
            _ => None,
        }
    }
}

fn register_list(registers: &[VirtualRegister]) -> String {
    registers.iter().map(|register| register.to_string()).collect::<Vec<_>>().join(",")
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Instruction::Binary { operator, target, left, right } => write!(f, "{} {},{},{}", operator, target, left, right),
            Instruction::Not { target, operand } => write!(f, "not {},{}", target, operand),
            Instruction::Cmp { left, right } => write!(f, "cmp {},{}", left, right),
            Instruction::Branch { condition, label } => write!(f, "b{} {}", condition.suffix(), label),
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::Ldr { target, address } => write!(f, "ldr {},{}", target, address),
            Instruction::Str { value, address } => write!(f, "str {},{}", value, address),
            Instruction::LoadRef { target, base, field, .. } => write!(f, "loadRef {},{},@{}", target, base, field),
            Instruction::StrRef { value, base, field, .. } => write!(f, "strRef {},{},@{}", value, base, field),
            Instruction::New { target, struct_name, .. } => write!(f, "new {},{}", target, struct_name),
            Instruction::Delete { pointer } => write!(f, "delete {}", pointer),
            Instruction::Push { registers, callee } => write!(f, "push {{{}}} @{}", register_list(registers), callee),
            Instruction::Pop { registers, callee } => write!(f, "pop {{{}}} @{}", register_list(registers), callee),
            Instruction::Mov { target, source, condition } => write!(f, "mov{} {},{}", condition.suffix(), target, source),
            Instruction::MovReturn { target } => write!(f, "mov {},@ret", target),
            Instruction::Ret { value: Some(value) } => write!(f, "ret {}", value),
            Instruction::Ret { value: None } => write!(f, "ret"),
            Instruction::Bl { callee } => write!(f, "bl {}", callee),
            Instruction::Print { source } => write!(f, "print {}", source),
            Instruction::Println { source } => write!(f, "println {}", source),
            Instruction::Read { target, variable } => write!(f, "read {} @{}", target, variable),
        }
    }
}
