//! Five-stage pipeline timing engines.
//!
//! A single stage-advancement loop serves all three scheduling disciplines;
//! the policies differ only in the penalty charged when an instruction
//! retires. Runs are side-effect-free over a shared instruction stream and
//! hazard list, so the three policies can be simulated in any order with
//! identical results.

use std::fmt;

use anyhow::{ensure, Result};

use crate::hazard::{raw_only, Hazard};
use crate::inst::Instruction;
use crate::isa::Category;

/// Pipeline depth: Fetch, Decode, Execute, Memory, WriteBack.
pub const STAGE_COUNT: u64 = 5;

/// Scheduling discipline of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No hazard handling at all.
    Ideal,
    /// Freeze the whole pipeline until the conflicting value is written back.
    Stall,
    /// Forward results between stages; only the load-use case still stalls.
    Forward,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Ideal, Policy::Stall, Policy::Forward];

    pub fn name(self) -> &'static str {
        match self {
            Policy::Ideal => "IDEAL",
            Policy::Stall => "STALL",
            Policy::Forward => "FORWARDING",
        }
    }

    /// Stall cycles charged for one read-after-write hazard when its
    /// consumer retires, keyed by producer/consumer distance.
    fn raw_penalty(self, hazard: &Hazard, producer: &Instruction) -> u64 {
        match self {
            Policy::Ideal => 0,
            Policy::Stall => match hazard.distance() {
                1 => 2,
                2 => 1,
                _ => 0,
            },
            // forwarding resolves every conflict except a value that only
            // exists after the producer's memory stage
            Policy::Forward => {
                if hazard.distance() == 1 && producer.is_load() {
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Cycles to resolve and redirect control flow when a jump retires.
    fn jump_penalty(self) -> u64 {
        match self {
            Policy::Ideal => 0,
            Policy::Stall | Policy::Forward => 1,
        }
    }
}

/// Completion record of one retired instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub seq: usize,
    pub cycle: u64,
    pub text: String,
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub policy: Policy,
    pub completions: Vec<Completion>,
    pub total_cycles: u64,
    /// The read-after-write entries that were consulted, for the transcript.
    pub raw_hazards: Vec<Hazard>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for h in &self.raw_hazards {
            writeln!(f, "{h}")?;
        }
        writeln!(f, "Instr#\tCompletionTime\tMnemonic")?;
        for c in &self.completions {
            writeln!(f, "{}\t{}\t|{}", c.seq, c.cycle, c.text)?;
        }
        writeln!(f, "Total time is {}", self.total_cycles)
    }
}

/// The five stage slots, each holding the stream index of its occupant.
#[derive(Debug, Default)]
struct Stages {
    fetch: Option<usize>,
    decode: Option<usize>,
    execute: Option<usize>,
    memory: Option<usize>,
    writeback: Option<usize>,
}

impl Stages {
    /// Shift occupants back-to-front. The write-back occupant must already
    /// have been retired by the caller.
    fn advance(&mut self) {
        self.writeback = self.memory.take();
        self.memory = self.execute.take();
        self.execute = self.decode.take();
        self.decode = self.fetch.take();
    }
}

/// Run the instruction stream through the pipeline under one policy.
///
/// Instructions advance one stage per cycle in program order. When the
/// write-back occupant retires, the policy charges stall cycles for every
/// read-after-write hazard whose consumer it is (matched by stream index),
/// then the completion record is taken, then any jump penalty lands; a stall
/// freezes the whole pipeline, delaying every later instruction by the same
/// amount. With no stalls, n instructions take n + 4 cycles.
pub fn simulate(program: &[Instruction], hazards: &[Hazard], policy: Policy) -> Result<RunReport> {
    ensure!(!program.is_empty(), "no instructions to simulate");

    let raw: Vec<&Hazard> = raw_only(hazards).collect();

    let mut stages = Stages::default();
    let mut completions = Vec::with_capacity(program.len());
    let mut cycle: u64 = 0;
    let mut fetched = 0usize;

    stages.fetch = Some(fetched);
    fetched += 1;

    while completions.len() < program.len() {
        cycle += 1;

        if let Some(seq) = stages.writeback.take() {
            let inst = &program[seq];
            for h in raw.iter().filter(|h| h.consumer == seq) {
                let stall = policy.raw_penalty(h, &program[h.producer]);
                if stall > 0 {
                    tracing::debug!(
                        policy = policy.name(),
                        seq,
                        stall,
                        distance = h.distance(),
                        "pipeline frozen for hazard on {}",
                        h.reg
                    );
                    cycle += stall;
                }
            }
            completions.push(Completion {
                seq,
                cycle,
                text: inst.text.clone(),
            });
            if inst.category() == Category::JumpOnly {
                cycle += policy.jump_penalty();
            }
        }

        stages.advance();

        if fetched < program.len() {
            stages.fetch = Some(fetched);
            fetched += 1;
        }
    }

    tracing::info!(
        policy = policy.name(),
        total = cycle,
        instructions = program.len(),
        "run complete"
    );
    Ok(RunReport {
        policy,
        completions,
        total_cycles: cycle,
        raw_hazards: raw.into_iter().cloned().collect(),
    })
}
