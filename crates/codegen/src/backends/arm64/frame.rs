use std::collections::HashMap;

use golite_common::bug_report;
use golite_common::generators::VirtualRegister;
use golite_common::typings::WORD_SIZE;
use golite_middle::ir::iloc::Instruction;

use crate::backends::arm64::registers::{CallingConvention, PhysicalRegister};
use crate::error::CodegenError;


/// Largest frame whose size still fits the 12-bit `sub sp` immediate.
pub const MAX_FRAME_BYTES: i64 = 4080;

/// Where a virtual register lives for the whole function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Offset from the frame pointer, always negative.
    Slot(i64),
    /// Bound to its argument register for the whole body.
    Parameter(PhysicalRegister),
}

/// Rounds a non-positive frame offset down to the next multiple of 16.
pub fn align_frame(offset: i64) -> i64 {
    -((-offset + 15) & !15)
}

/// Spill-everything layout of one function: every written register gets its
/// own 8-byte slot below the frame pointer, in order of first appearance.
#[derive(Debug, Clone)]
pub struct StackFrame {
    locations: HashMap<VirtualRegister, Location>,
    parameters: Vec<PhysicalRegister>,
    size: i64,
}

impl StackFrame {
    pub fn layout(function: &str, body: &[Instruction], parameters: &[VirtualRegister]) -> Result<Self, CodegenError> {
        if parameters.len() > CallingConvention::MAX_REGISTER_ARGUMENTS {
            return Err(CodegenError::TooManyParameters { function: function.to_string(), count: parameters.len() });
        }

        let mut locations = HashMap::new();
        let mut bound = Vec::new();
        for (index, parameter) in parameters.iter().enumerate() {
            let Some(register) = CallingConvention::get_int_arg_register(index) else {
                bug_report!("No argument register for parameter {}", index);
            };
            locations.insert(*parameter, Location::Parameter(register));
            bound.push(register);
        }

        let mut offset = 0;
        for target in body.iter().filter_map(Instruction::target) {
            if locations.contains_key(&target) {
                continue;
            }

            offset -= WORD_SIZE;
            tracing::trace!("{}: {} -> [x29, #{}]", function, target, offset);
            locations.insert(target, Location::Slot(offset));
        }

        let size = align_frame(offset);
        if -size > MAX_FRAME_BYTES {
            return Err(CodegenError::FrameTooLarge { function: function.to_string(), size: -size, limit: MAX_FRAME_BYTES });
        }

        Ok(Self { locations, parameters: bound, size })
    }

    /// Non-positive multiple of 16.
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Bytes reserved below the frame pointer.
    pub fn bytes(&self) -> i64 {
        -self.size
    }

    pub fn location(&self, register: VirtualRegister) -> Option<Location> {
        self.locations.get(&register).copied()
    }

    pub fn location_or_panic(&self, register: VirtualRegister) -> Location {
        match self.location(register) {
            Some(location) => location,
            None => bug_report!("{} is read before any write or parameter binding", register),
        }
    }

    pub fn parameter_registers(&self) -> &[PhysicalRegister] {
        &self.parameters
    }

    pub fn slot_count(&self) -> usize {
        self.locations.values().filter(|location| matches!(location, Location::Slot(_))).count()
    }
}
