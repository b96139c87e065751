//! Register dependence tracking across the decoded instruction stream.
//!
//! The tracker consumes instructions in stream order, keeps the last access
//! (mode + instruction index) per register, and classifies conflicts as
//! read-after-write, write-after-read, or write-after-write. All three kinds
//! are kept for diagnostics, but only the read-after-write entries feed the
//! pipeline stall logic: issue is strictly in program order, so WAR and WAW
//! conflicts never become observable before retirement.

use std::fmt;

use crate::inst::Instruction;
use crate::isa::{Category, Reg};

/// Data-hazard classification between two instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardKind {
    ReadAfterWrite,
    WriteAfterRead,
    WriteAfterWrite,
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HazardKind::ReadAfterWrite => "RAW",
            HazardKind::WriteAfterRead => "WAR",
            HazardKind::WriteAfterWrite => "WAW",
        })
    }
}

/// One register dependence between a producer and a consumer instruction.
#[derive(Debug, Clone)]
pub struct Hazard {
    pub kind: HazardKind,
    pub reg: Reg,
    /// Stream index of the earlier instruction.
    pub producer: usize,
    /// Stream index of the later instruction.
    pub consumer: usize,
    pub producer_text: String,
    pub consumer_text: String,
}

impl Hazard {
    /// Consumer-minus-producer distance in stream positions.
    pub fn distance(&self) -> usize {
        self.consumer - self.producer
    }
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Dependence between instruction {} {} and {} {}",
            self.kind, self.producer, self.producer_text, self.consumer, self.consumer_text
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Builds the hazard list for an instruction stream.
pub struct Tracker {
    /// Last access per register; `None` means never accessed.
    regs: Vec<Option<(Access, usize)>>,
    /// Texts of the instructions seen so far, indexed by stream position.
    texts: Vec<String>,
    hazards: Vec<Hazard>,
    count: usize,
}

impl Tracker {
    pub fn new(reg_count: u8) -> Self {
        Self {
            regs: vec![None; reg_count as usize],
            texts: Vec::new(),
            hazards: Vec::new(),
            count: 0,
        }
    }

    /// Record one instruction's register accesses, in stream order.
    ///
    /// `RegReg` reads src1 and src2 and writes dst; `RegImm` reads src1 (and
    /// src2 when present) and writes dst; `JumpOnly` touches no register.
    /// Empty slots and registers outside the tracked range are skipped.
    pub fn record(&mut self, inst: &Instruction) {
        debug_assert_eq!(inst.seq, self.count);
        match inst.category() {
            Category::RegReg | Category::RegImm => {
                if let Some(r) = inst.src1 {
                    self.read(r, inst);
                }
                if let Some(r) = inst.src2 {
                    self.read(r, inst);
                }
                if let Some(r) = inst.dst {
                    self.write(r, inst);
                }
            }
            Category::JumpOnly => {}
        }
        self.texts.push(inst.text.clone());
        self.count += 1;
    }

    fn read(&mut self, reg: Reg, inst: &Instruction) {
        let Some(state) = self.regs.get_mut(reg.num() as usize) else {
            return;
        };
        if let Some((Access::Write, producer)) = *state {
            self.push_hazard(HazardKind::ReadAfterWrite, reg, producer, inst);
        }
        self.regs[reg.num() as usize] = Some((Access::Read, self.count));
    }

    fn write(&mut self, reg: Reg, inst: &Instruction) {
        let Some(state) = self.regs.get_mut(reg.num() as usize) else {
            return;
        };
        match *state {
            Some((Access::Read, producer)) => {
                self.push_hazard(HazardKind::WriteAfterRead, reg, producer, inst);
            }
            Some((Access::Write, producer)) => {
                self.push_hazard(HazardKind::WriteAfterWrite, reg, producer, inst);
            }
            None => {}
        }
        self.regs[reg.num() as usize] = Some((Access::Write, self.count));
    }

    fn push_hazard(&mut self, kind: HazardKind, reg: Reg, producer: usize, inst: &Instruction) {
        if producer == self.count {
            // an instruction's own earlier access, not a dependence
            return;
        }
        let hazard = Hazard {
            kind,
            reg,
            producer,
            consumer: self.count,
            producer_text: self.texts[producer].clone(),
            consumer_text: inst.text.clone(),
        };
        tracing::debug!(%kind, %reg, producer, consumer = self.count, "classified hazard");
        self.hazards.push(hazard);
    }

    /// All classified dependences, in discovery order.
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn into_hazards(self) -> Vec<Hazard> {
        self.hazards
    }
}

/// The read-after-write subset, the only kind consumed by scheduling.
pub fn raw_only(hazards: &[Hazard]) -> impl Iterator<Item = &Hazard> {
    hazards
        .iter()
        .filter(|h| h.kind == HazardKind::ReadAfterWrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{Opcode, REG_COUNT};

    fn inst(
        seq: usize,
        opcode: Opcode,
        src1: Option<u8>,
        src2: Option<u8>,
        dst: Option<u8>,
    ) -> Instruction {
        Instruction {
            seq,
            opcode,
            src1: src1.and_then(Reg::new),
            src2: src2.and_then(Reg::new),
            dst: dst.and_then(Reg::new),
            imm: None,
            text: format!("{opcode} #{seq}"),
        }
    }

    fn track(insts: &[Instruction]) -> Vec<Hazard> {
        let mut tracker = Tracker::new(REG_COUNT);
        for i in insts {
            tracker.record(i);
        }
        tracker.into_hazards()
    }

    #[test]
    fn test_raw_chain_ordering() {
        // every instruction reads and writes $1: a strict producer/consumer
        // chain yields n-1 RAW entries in stream order
        let n = 6;
        let insts: Vec<_> = (0..n)
            .map(|i| inst(i, Opcode::Addi, Some(1), None, Some(1)))
            .collect();
        let hazards = track(&insts);
        assert_eq!(hazards.len(), n - 1);
        for (i, h) in hazards.iter().enumerate() {
            assert_eq!(h.kind, HazardKind::ReadAfterWrite);
            assert_eq!(h.producer, i);
            assert_eq!(h.consumer, i + 1);
            assert_eq!(h.distance(), 1);
        }
    }

    #[test]
    fn test_war_waw_not_consumed() {
        // inst 0 reads $2; inst 1 writes $2 (WAR); inst 2 writes $2 (WAW)
        let insts = [
            inst(0, Opcode::Add, Some(2), Some(3), Some(4)),
            inst(1, Opcode::Add, Some(5), Some(6), Some(2)),
            inst(2, Opcode::Add, Some(7), Some(8), Some(2)),
        ];
        let hazards = track(&insts);
        assert_eq!(hazards.len(), 2);
        assert_eq!(hazards[0].kind, HazardKind::WriteAfterRead);
        assert_eq!(hazards[1].kind, HazardKind::WriteAfterWrite);
        assert_eq!(raw_only(&hazards).count(), 0);
    }

    #[test]
    fn test_raw_distance() {
        let insts = [
            inst(0, Opcode::Add, Some(1), Some(2), Some(3)),
            inst(1, Opcode::Add, Some(4), Some(5), Some(6)),
            inst(2, Opcode::Add, Some(3), Some(7), Some(8)),
        ];
        let hazards = track(&insts);
        let raw: Vec<_> = raw_only(&hazards).collect();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].distance(), 2);
        assert_eq!(raw[0].reg, Reg::new(3).unwrap());
    }

    #[test]
    fn test_jump_touches_nothing() {
        let insts = [
            inst(0, Opcode::Add, Some(1), Some(2), Some(3)),
            inst(1, Opcode::J, None, None, None),
            inst(2, Opcode::Add, Some(3), Some(1), Some(4)),
        ];
        let hazards = track(&insts);
        let raw: Vec<_> = raw_only(&hazards).collect();
        // the jump neither breaks nor adds dependences
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].producer, 0);
        assert_eq!(raw[0].consumer, 2);
    }

    #[test]
    fn test_untracked_register_is_noop() {
        // a tracker over fewer registers silently skips indices beyond it
        let mut tracker = Tracker::new(4);
        tracker.record(&inst(0, Opcode::Add, Some(20), Some(21), Some(22)));
        tracker.record(&inst(1, Opcode::Add, Some(22), Some(20), Some(23)));
        assert!(tracker.hazards().is_empty());
    }

    #[test]
    fn test_read_then_write_same_register() {
        // an instruction reading and writing the same register records the
        // read first, so no self-hazard appears
        let insts = [inst(0, Opcode::Addi, Some(1), None, Some(1))];
        assert!(track(&insts).is_empty());
    }
}
