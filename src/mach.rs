//! Fixed-width binary decoder.
//!
//! Input is one 32-character `0`/`1` line per instruction. Fields follow the
//! classic MIPS layout: 6-bit opcode, then 5-bit register fields and a
//! 16-bit two's-complement immediate (I-format), a 5-bit shift amount and
//! 6-bit funct field (R-format), or a 26-bit target (J-format). A canonical
//! assembly text is reconstructed for each instruction so transcripts can
//! show it.

use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::inst::Instruction;
use crate::isa::{Category, Opcode, Reg};

fn inst_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[01]{32}$").expect("hardcoded regex"))
}

/// Decode binary source into the canonical instruction stream.
pub fn decode(src: &str) -> Result<Vec<Instruction>> {
    let mut insts = Vec::new();
    for (idx, line) in src.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !inst_line_re().is_match(line) {
            bail!("line {lineno}: expected 32 binary digits, found `{line}`");
        }
        let word = u32::from_str_radix(line, 2)
            .with_context(|| format!("line {lineno}: bad encoding"))?;

        let op_field = (word >> 26) as u8;
        let funct_field = (word & 0x3f) as u8;
        let opcode = Opcode::from_fields(op_field, funct_field)
            .with_context(|| format!("line {lineno}: unrecognized encoding `{line}`"))?;

        insts.push(decode_word(insts.len(), opcode, word, lineno)?);
    }
    Ok(insts)
}

fn decode_word(seq: usize, opcode: Opcode, word: u32, lineno: usize) -> Result<Instruction> {
    let desc = opcode.desc();
    let rs = Reg::new((word >> 21 & 0x1f) as u8);
    let rt = Reg::new((word >> 16 & 0x1f) as u8);
    let rd = Reg::new((word >> 11 & 0x1f) as u8);

    let (src1, src2, dst, imm) = match desc.category {
        Category::RegReg => {
            let shamt = (word >> 6 & 0x1f) as i16;
            (
                desc.src1_pos.and(rt),
                desc.src2_pos.and(rs),
                desc.dst_pos.and(rd),
                desc.imm_pos.map(|_| shamt),
            )
        }
        Category::RegImm => {
            let imm16 = word as u16 as i16; // two's complement
            (
                desc.src1_pos.and(rs),
                None,
                desc.dst_pos.and(rt),
                desc.imm_pos.map(|_| imm16),
            )
        }
        Category::JumpOnly => {
            let target = word & 0x03ff_ffff;
            let target = i16::try_from(target)
                .ok()
                .with_context(|| format!("line {lineno}: jump target out of range"))?;
            (None, None, None, desc.imm_pos.map(|_| target))
        }
    };

    let text = render_text(opcode, src1, src2, dst, imm);
    tracing::trace!(lineno, %opcode, "decoded `{text}`");
    Ok(Instruction {
        seq,
        opcode,
        src1,
        src2,
        dst,
        imm,
        text,
    })
}

/// Reconstruct assembly text from decoded fields, operands laid out in the
/// positions the opcode table prescribes.
fn render_text(
    opcode: Opcode,
    src1: Option<Reg>,
    src2: Option<Reg>,
    dst: Option<Reg>,
    imm: Option<i16>,
) -> String {
    let desc = opcode.desc();
    if opcode.is_load() {
        // displacement and base register fold into one written operand
        let (Some(dst), Some(base), Some(disp)) = (dst, src1, imm) else {
            return opcode.mnemonic().to_string();
        };
        return format!("{opcode} {dst}, {disp}({base})");
    }

    let mut slots = vec![String::new(); desc.operands];
    if let (Some(p), Some(r)) = (desc.src1_pos, src1) {
        slots[p] = r.to_string();
    }
    if let (Some(p), Some(r)) = (desc.src2_pos, src2) {
        slots[p] = r.to_string();
    }
    if let (Some(p), Some(r)) = (desc.dst_pos, dst) {
        slots[p] = r.to_string();
    }
    if let (Some(p), Some(v)) = (desc.imm_pos, imm) {
        // branch/jump targets are word addresses, shown in hex
        slots[p] = if desc.imm_label {
            format!("{:#x}", (v as i32) * 4)
        } else {
            v.to_string()
        };
    }
    format!("{opcode} {}", slots.join(", "))
}
