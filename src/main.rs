use anyhow::Result;
use clap::Parser;

use mips_pipe_rs::{decode_file, simulate, track_hazards, Policy};

// MIPS five-stage pipeline timing simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input .asm (assembly) or .mach (binary) file
    input: String,

    /// Print logs during simulation (repeat for more detail)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn logging_setup(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging_setup(args.verbose);

    let program = decode_file(std::path::Path::new(&args.input))?;
    let hazards = track_hazards(&program);

    for policy in Policy::ALL {
        let report = simulate(&program, &hazards, policy)?;
        println!(
            "{}",
            ansi_term::Colour::Green
                .bold()
                .paint(format!("----- {} -----", policy.name()))
        );
        print!("{report}");
    }
    Ok(())
}
