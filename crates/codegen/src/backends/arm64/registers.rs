use std::fmt::{Display, Formatter};

use golite_common::bug_report;


/// A general purpose 64-bit register, `x<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalRegister(pub u8);

impl Display for PhysicalRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

pub const FRAME_POINTER: &str = "x29";
pub const LINK_REGISTER: &str = "x30";
/// Intra-procedure scratch, used to form addresses of far stack slots.
pub const ADDRESS_SCRATCH: PhysicalRegister = PhysicalRegister(16);

/// x0 through x28. x29/x30/sp are never handed out.
pub const POOL_SIZE: usize = 29;
/// IP0, IP1 and the platform register.
const RESERVED: [u8; 3] = [16, 17, 18];

#[derive(Debug, Clone)]
pub struct RegisterPool {
    busy: [bool; POOL_SIZE],
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPool {
    pub fn new() -> Self {
        let mut pool = Self { busy: [false; POOL_SIZE] };
        pool.reset();
        pool
    }

    /// Everything free again, apart from the reserved registers.
    pub fn reset(&mut self) {
        self.busy = [false; POOL_SIZE];
        for reserved in RESERVED {
            self.busy[reserved as usize] = true;
        }
    }

    /// Hands out the lowest free register.
    pub fn acquire(&mut self) -> PhysicalRegister {
        match self.busy.iter().position(|busy| !busy) {
            Some(free) => {
                self.busy[free] = true;
                PhysicalRegister(free as u8)
            }
            None => bug_report!("Physical register pool exhausted"),
        }
    }

    pub fn occupy(&mut self, register: PhysicalRegister) {
        self.busy[register.0 as usize] = true;
    }

    pub fn release(&mut self, register: PhysicalRegister) {
        if RESERVED.contains(&register.0) {
            return;
        }
        self.busy[register.0 as usize] = false;
    }

    pub fn is_busy(&self, register: PhysicalRegister) -> bool {
        self.busy[register.0 as usize]
    }
}

pub struct CallingConvention;

impl CallingConvention {
    pub const MAX_REGISTER_ARGUMENTS: usize = 8;

    /// Register for integer/pointer argument by index (0-7)
    pub fn get_int_arg_register(arg_index: usize) -> Option<PhysicalRegister> {
        if arg_index < Self::MAX_REGISTER_ARGUMENTS {
            Some(PhysicalRegister(arg_index as u8))
        } else {
            None
        }
    }

    pub fn get_return_register() -> PhysicalRegister {
        PhysicalRegister(0)
    }
}
