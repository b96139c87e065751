//! A timing simulator for a classic five-stage MIPS pipeline.
//!
//! The crate decodes a small MIPS subset from either assembly text or
//! 32-bit binary encodings into one canonical instruction stream, classifies
//! register dependences over it, and replays it under three scheduling
//! policies (ideal, stall, forwarding), reporting per-instruction completion
//! cycles and the total run time.

pub mod asm;
pub mod hazard;
pub mod inst;
pub mod isa;
pub mod mach;
pub mod pipeline;

use std::path::Path;

use anyhow::{bail, Context, Result};

pub use hazard::{Hazard, HazardKind, Tracker};
pub use inst::Instruction;
pub use pipeline::{simulate, Policy, RunReport};

/// Decode a source file, dispatching on its extension: `.asm` for assembly
/// text, `.mach` for binary encodings.
pub fn decode_file(path: &Path) -> Result<Vec<Instruction>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("could not read file `{}`", path.display()))?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("asm") => asm::decode(&src),
        Some("mach") => mach::decode(&src),
        _ => bail!(
            "unsupported file type `{}`, expected .asm or .mach",
            path.display()
        ),
    }
}

/// Classify register dependences over an instruction stream.
pub fn track_hazards(program: &[Instruction]) -> Vec<Hazard> {
    let mut tracker = Tracker::new(isa::REG_COUNT);
    for inst in program {
        tracker.record(inst);
    }
    tracker.into_hazards()
}
