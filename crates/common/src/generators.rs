use std::fmt::{Display, Formatter};

/// An abstract value slot produced by lowering. Not a machine register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualRegister(pub u32);

impl Display for VirtualRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct RegisterGenerator {
    next: u32,
}

impl RegisterGenerator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn next_register(&mut self) -> VirtualRegister {
        let register = VirtualRegister(self.next);
        self.next += 1;
        register
    }

    pub fn issued(&self) -> u32 {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[derive(Debug, Default)]
pub struct LabelGenerator {
    next: u32,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// `<prefix>_L<n>`
    pub fn next_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_L{}", prefix, self.next);
        self.next += 1;
        label
    }

    pub fn issued(&self) -> u32 {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Both counters of one compilation. Owned by the compilation session and
/// lent to the symbol table (variable registers) and to lowering.
#[derive(Debug, Default)]
pub struct Generators {
    pub registers: RegisterGenerator,
    pub labels: LabelGenerator,
}

impl Generators {
    pub fn new() -> Self {
        Self { registers: RegisterGenerator::new(), labels: LabelGenerator::new() }
    }

    pub fn reset(&mut self) {
        self.registers.reset();
        self.labels.reset();
    }
}
