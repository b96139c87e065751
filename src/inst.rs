//! Canonical decoded instruction record.

use std::fmt;

use crate::isa::{Category, Opcode, Reg};

/// One decoded instruction.
///
/// Records are immutable after decode. `seq` is the position in the decoded
/// stream and is the correlation key between hazard records and retiring
/// instructions; unused operand slots are `None` rather than an in-range
/// sentinel value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub seq: usize,
    pub opcode: Opcode,
    /// First register read.
    pub src1: Option<Reg>,
    /// Second register read.
    pub src2: Option<Reg>,
    /// Register write.
    pub dst: Option<Reg>,
    pub imm: Option<i16>,
    /// Original assembly text (reconstructed for binary input).
    pub text: String,
}

impl Instruction {
    pub fn category(&self) -> Category {
        self.opcode.category()
    }

    pub fn is_load(&self) -> bool {
        self.opcode.is_load()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
