//! Instruction set metadata for the simulated MIPS subset.
//!
//! The [`OpDesc`] table is the single authority on operand shapes: both
//! decoders use it to place written operands into instruction fields, and the
//! pipeline engines consult it to classify instructions and recognize loads.

use std::fmt;

/// Number of architectural registers.
pub const REG_COUNT: u8 = 32;

/// Conventional register names, indexed by register number.
const REG_NAMES: [&str; REG_COUNT as usize] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", //
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", //
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", //
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

/// Architectural register index, always `< REG_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reg(u8);

impl Reg {
    pub fn new(num: u8) -> Option<Self> {
        (num < REG_COUNT).then_some(Self(num))
    }

    pub fn num(self) -> u8 {
        self.0
    }

    /// Resolve a register token, numeric (`$4`) or named (`$a0`).
    pub fn parse(token: &str) -> Option<Self> {
        let name = token.strip_prefix('$')?;
        if name.chars().all(|c| c.is_ascii_digit()) {
            return Self::new(name.parse().ok()?);
        }
        REG_NAMES
            .iter()
            .position(|&r| r == name)
            .map(|i| Self(i as u8))
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Operand shape of an instruction, the classic R/I/J format split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    RegReg,
    RegImm,
    JumpOnly,
}

/// Supported opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Addi,
    Xor,
    Mult,
    Mflo,
    Sll,
    Slt,
    Slti,
    Lb,
    J,
    Beq,
}

/// Static description of one opcode.
///
/// The `*_pos` fields give the index of each instruction field within the
/// written operand list (after memory operands are split into displacement
/// and base register), or `None` when the field is absent. `src1`/`src2` are
/// the register reads, `dst` the register write.
pub struct OpDesc {
    pub mnemonic: &'static str,
    pub category: Category,
    pub operands: usize,
    pub src1_pos: Option<usize>,
    pub src2_pos: Option<usize>,
    pub dst_pos: Option<usize>,
    pub imm_pos: Option<usize>,
    /// The immediate names a branch/jump target label.
    pub imm_label: bool,
    /// The result only exists after the memory stage.
    pub is_load: bool,
    /// 6-bit opcode field of the binary encoding.
    pub op_field: u8,
    /// 6-bit funct field, present for `RegReg` encodings.
    pub funct_field: Option<u8>,
}

/// One entry per opcode, indexed by `Opcode as usize`.
static OPCODES: [OpDesc; 11] = [
    OpDesc {
        mnemonic: "add",
        category: Category::RegReg,
        operands: 3,
        src1_pos: Some(2),
        src2_pos: Some(1),
        dst_pos: Some(0),
        imm_pos: None,
        imm_label: false,
        is_load: false,
        op_field: 0b000000,
        funct_field: Some(0b100000),
    },
    OpDesc {
        mnemonic: "addi",
        category: Category::RegImm,
        operands: 3,
        src1_pos: Some(1),
        src2_pos: None,
        dst_pos: Some(0),
        imm_pos: Some(2),
        imm_label: false,
        is_load: false,
        op_field: 0b001000,
        funct_field: None,
    },
    OpDesc {
        mnemonic: "xor",
        category: Category::RegReg,
        operands: 3,
        src1_pos: Some(2),
        src2_pos: Some(1),
        dst_pos: Some(0),
        imm_pos: None,
        imm_label: false,
        is_load: false,
        op_field: 0b000000,
        funct_field: Some(0b100110),
    },
    OpDesc {
        mnemonic: "mult",
        category: Category::RegReg,
        operands: 2,
        src1_pos: Some(1),
        src2_pos: Some(0),
        dst_pos: None,
        imm_pos: None,
        imm_label: false,
        is_load: false,
        op_field: 0b000000,
        funct_field: Some(0b011000),
    },
    OpDesc {
        mnemonic: "mflo",
        category: Category::RegReg,
        operands: 1,
        src1_pos: None,
        src2_pos: None,
        dst_pos: Some(0),
        imm_pos: None,
        imm_label: false,
        is_load: false,
        op_field: 0b000000,
        funct_field: Some(0b010010),
    },
    OpDesc {
        mnemonic: "sll",
        category: Category::RegReg,
        operands: 3,
        src1_pos: Some(1),
        src2_pos: None,
        dst_pos: Some(0),
        imm_pos: Some(2),
        imm_label: false,
        is_load: false,
        op_field: 0b000000,
        funct_field: Some(0b000000),
    },
    OpDesc {
        mnemonic: "slt",
        category: Category::RegReg,
        operands: 3,
        src1_pos: Some(2),
        src2_pos: Some(1),
        dst_pos: Some(0),
        imm_pos: None,
        imm_label: false,
        is_load: false,
        op_field: 0b000000,
        funct_field: Some(0b101010),
    },
    OpDesc {
        mnemonic: "slti",
        category: Category::RegImm,
        operands: 3,
        src1_pos: Some(1),
        src2_pos: None,
        dst_pos: Some(0),
        imm_pos: Some(2),
        imm_label: false,
        is_load: false,
        op_field: 0b001010,
        funct_field: None,
    },
    OpDesc {
        mnemonic: "lb",
        category: Category::RegImm,
        operands: 3,
        src1_pos: Some(2),
        src2_pos: None,
        dst_pos: Some(0),
        imm_pos: Some(1),
        imm_label: false,
        is_load: true,
        op_field: 0b100000,
        funct_field: None,
    },
    OpDesc {
        mnemonic: "j",
        category: Category::JumpOnly,
        operands: 1,
        src1_pos: None,
        src2_pos: None,
        dst_pos: None,
        imm_pos: Some(0),
        imm_label: true,
        is_load: false,
        op_field: 0b000010,
        funct_field: None,
    },
    OpDesc {
        mnemonic: "beq",
        category: Category::RegImm,
        operands: 3,
        src1_pos: Some(0),
        src2_pos: None,
        dst_pos: Some(1),
        imm_pos: Some(2),
        imm_label: true,
        is_load: false,
        op_field: 0b000100,
        funct_field: None,
    },
];

impl Opcode {
    const ALL: [Opcode; 11] = [
        Opcode::Add,
        Opcode::Addi,
        Opcode::Xor,
        Opcode::Mult,
        Opcode::Mflo,
        Opcode::Sll,
        Opcode::Slt,
        Opcode::Slti,
        Opcode::Lb,
        Opcode::J,
        Opcode::Beq,
    ];

    pub fn desc(self) -> &'static OpDesc {
        &OPCODES[self as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        self.desc().mnemonic
    }

    pub fn category(self) -> Category {
        self.desc().category
    }

    pub fn is_load(self) -> bool {
        self.desc().is_load
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.desc().mnemonic == s)
    }

    /// Resolve an opcode from its binary encoding fields. The funct field
    /// disambiguates the shared `RegReg` opcode field.
    pub fn from_fields(op_field: u8, funct_field: u8) -> Option<Self> {
        let mut matches = Self::ALL
            .into_iter()
            .filter(|o| o.desc().op_field == op_field);
        let first = matches.next()?;
        if matches.next().is_none() {
            return Some(first);
        }
        Self::ALL
            .into_iter()
            .find(|o| o.desc().funct_field == Some(funct_field))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg_parse() {
        assert_eq!(Reg::parse("$4"), Reg::new(4));
        assert_eq!(Reg::parse("$a0"), Reg::new(4));
        assert_eq!(Reg::parse("$zero"), Reg::new(0));
        assert_eq!(Reg::parse("$ra"), Reg::new(31));
        assert_eq!(Reg::parse("$32"), None);
        assert_eq!(Reg::parse("$99"), None);
        assert_eq!(Reg::parse("t0"), None);
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(Opcode::from_mnemonic("add"), Some(Opcode::Add));
        assert_eq!(Opcode::from_mnemonic("lb"), Some(Opcode::Lb));
        assert_eq!(Opcode::from_mnemonic("sw"), None);
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
    }

    #[test]
    fn test_binary_lookup() {
        // unique opcode fields resolve without the funct field
        assert_eq!(Opcode::from_fields(0b001000, 0), Some(Opcode::Addi));
        assert_eq!(Opcode::from_fields(0b100000, 0), Some(Opcode::Lb));
        // RegReg encodings share an opcode field and need funct
        assert_eq!(Opcode::from_fields(0, 0b100000), Some(Opcode::Add));
        assert_eq!(Opcode::from_fields(0, 0b011000), Some(Opcode::Mult));
        assert_eq!(Opcode::from_fields(0, 0b111111), None);
        assert_eq!(Opcode::from_fields(0b111111, 0), None);
    }

    #[test]
    fn test_load_category() {
        assert!(Opcode::Lb.is_load());
        assert!(!Opcode::Add.is_load());
        assert_eq!(Opcode::J.category(), Category::JumpOnly);
        assert_eq!(Opcode::Beq.category(), Category::RegImm);
    }
}
