//! Text assembly decoder for the MIPS subset.
//!
//! Lines are parsed with a pest grammar, then checked against the opcode
//! table: mnemonic, operand count, register names, and immediate range. Any
//! malformed line makes the whole file invalid; no partial instruction
//! stream is ever returned.

use anyhow::{bail, Context, Result};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::inst::Instruction;
use crate::isa::{Opcode, Reg};

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to src
pub struct MipsAsmParser;

/// Branch/jump target labels are assigned synthetic word-aligned addresses
/// in order of first appearance, starting at zero.
const LABEL_ADDR_STEP: i16 = 4;

pub fn parse(src: &str) -> Result<pest::iterators::Pairs<'_, Rule>> {
    Ok(MipsAsmParser::parse(Rule::main, src)
        .context("fail to parse asm file")?
        .next()
        .unwrap()
        .into_inner())
}

/// Decode assembly source into the canonical instruction stream.
pub fn decode(src: &str) -> Result<Vec<Instruction>> {
    let lines = parse(src)?;
    let mut insts = Vec::new();
    let mut next_label_addr: i16 = 0;

    for line in lines {
        if line.as_rule() != Rule::line {
            continue; // EOI
        }
        let Some(inst_pair) = line.into_inner().next() else {
            continue; // blank line
        };
        let (lineno, _) = inst_pair.line_col();
        let text = source_text(src, lineno);

        let mut it = inst_pair.into_inner();
        let mnemonic = it.next().unwrap().as_str();
        let opcode = Opcode::from_mnemonic(mnemonic)
            .with_context(|| format!("line {lineno}: unknown mnemonic `{mnemonic}`"))?;
        let desc = opcode.desc();

        // flatten operands; a mem operand contributes (displacement, base)
        let mut operands: Vec<Pair<'_, Rule>> = Vec::new();
        for op_pair in it {
            let inner = op_pair.into_inner().next().unwrap();
            if inner.as_rule() == Rule::mem {
                operands.extend(inner.into_inner());
            } else {
                operands.push(inner);
            }
        }
        if operands.len() != desc.operands {
            bail!(
                "line {lineno}: `{mnemonic}` expects {} operands, found {}",
                desc.operands,
                operands.len()
            );
        }

        let src1 = reg_field(&operands, desc.src1_pos, lineno)?;
        let src2 = reg_field(&operands, desc.src2_pos, lineno)?;
        let dst = reg_field(&operands, desc.dst_pos, lineno)?;

        let imm = match desc.imm_pos {
            None => None,
            Some(p) => {
                let pair = &operands[p];
                match pair.as_rule() {
                    Rule::num => {
                        let value: i64 = pair
                            .as_str()
                            .parse()
                            .with_context(|| format!("line {lineno}: bad immediate"))?;
                        let value = i16::try_from(value).ok().with_context(|| {
                            format!("line {lineno}: immediate {value} out of range")
                        })?;
                        Some(value)
                    }
                    Rule::label if desc.imm_label => {
                        let addr = next_label_addr;
                        next_label_addr += LABEL_ADDR_STEP;
                        Some(addr)
                    }
                    _ => bail!(
                        "line {lineno}: bad immediate operand `{}`",
                        pair.as_str()
                    ),
                }
            }
        };

        tracing::trace!(lineno, %opcode, "decoded `{text}`");
        insts.push(Instruction {
            seq: insts.len(),
            opcode,
            src1,
            src2,
            dst,
            imm,
            text,
        });
    }
    Ok(insts)
}

/// The source line with its comment stripped, trimmed.
fn source_text(src: &str, lineno: usize) -> String {
    let line = src.lines().nth(lineno - 1).unwrap_or_default();
    let line = line.split('#').next().unwrap_or_default();
    line.trim().to_string()
}

fn reg_field(
    operands: &[Pair<'_, Rule>],
    pos: Option<usize>,
    lineno: usize,
) -> Result<Option<Reg>> {
    let Some(p) = pos else {
        return Ok(None);
    };
    let token = operands[p].as_str();
    if operands[p].as_rule() != Rule::reg {
        bail!("line {lineno}: expected register, found `{token}`");
    }
    let reg = Reg::parse(token)
        .with_context(|| format!("line {lineno}: invalid register `{token}`"))?;
    Ok(Some(reg))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::isa::Opcode;

    pub const SAMPLE_ASM: &str = r#"
# sum a byte out of a table, then loop
add $4, $1, $2
addi $5, $4, 10     # consumes the add result
lb $6, 4($5)
beq $6, $5, done
j loop
"#;

    #[test]
    fn test_decode_sample() {
        let insts = decode(SAMPLE_ASM).unwrap();
        assert_eq!(insts.len(), 5);

        let add = &insts[0];
        assert_eq!(add.opcode, Opcode::Add);
        assert_eq!(add.dst, Reg::new(4));
        assert_eq!(add.src1, Reg::new(2));
        assert_eq!(add.src2, Reg::new(1));
        assert_eq!(add.imm, None);
        assert_eq!(add.text, "add $4, $1, $2");

        let addi = &insts[1];
        assert_eq!(addi.src1, Reg::new(4));
        assert_eq!(addi.dst, Reg::new(5));
        assert_eq!(addi.imm, Some(10));
        assert_eq!(addi.text, "addi $5, $4, 10");

        // memory operand splits into displacement and base register
        let lb = &insts[2];
        assert_eq!(lb.opcode, Opcode::Lb);
        assert_eq!(lb.dst, Reg::new(6));
        assert_eq!(lb.src1, Reg::new(5));
        assert_eq!(lb.imm, Some(4));

        // labels resolve to synthetic word-aligned addresses in order
        assert_eq!(insts[3].imm, Some(0));
        assert_eq!(insts[4].imm, Some(4));
        assert_eq!(insts[4].seq, 4);
    }

    #[test]
    fn test_named_registers() {
        let insts = decode("add $t0, $a0, $a1").unwrap();
        assert_eq!(insts[0].dst, Reg::new(8));
        assert_eq!(insts[0].src2, Reg::new(4));
        assert_eq!(insts[0].src1, Reg::new(5));
    }

    #[test]
    fn test_unknown_mnemonic() {
        assert!(decode("sw $1, 0($2)").is_err());
    }

    #[test]
    fn test_operand_arity() {
        assert!(decode("add $1, $2").is_err());
        assert!(decode("mflo $1, $2").is_err());
    }

    #[test]
    fn test_register_out_of_range() {
        assert!(decode("add $32, $1, $2").is_err());
        assert!(decode("add $1, $somereg, $2").is_err());
    }

    #[test]
    fn test_immediate_out_of_range() {
        assert!(decode("addi $1, $2, 32767").is_ok());
        assert!(decode("addi $1, $2, -32768").is_ok());
        assert!(decode("addi $1, $2, 40000").is_err());
        assert!(decode("addi $1, $2, -32769").is_err());
    }

    #[test]
    fn test_label_only_for_branching() {
        // addi takes a numeric immediate, never a label
        assert!(decode("addi $1, $2, somewhere").is_err());
        assert!(decode("j somewhere").is_ok());
    }
}
