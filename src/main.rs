//! LC-3 Emulator - CLI Entry Point
//!
//! `lc3-emu [OPTIONS] <IMAGE>...` loads every image in order (later images
//! overwrite earlier ones) and runs from 0x3000 until the program halts.
//!
//! Exit codes:
//! - 0: the program executed TRAP HALT (or hit `--max-cycles`)
//! - 1: the machine faulted (illegal opcode, bad trap, console failure)
//! - 2: usage error or an image could not be loaded
//! - 130: interrupted with Ctrl-C

use clap::Parser;
use lc3::{load_image, Console, Cpu, CpuError, CpuState, CrlfWriter, Image, Registers, TerminalConsole};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "lc3-emu")]
#[command(version)]
#[command(about = "An emulator for the LC-3 educational computer")]
struct Cli {
    /// Program images to load, in order
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Stop after this many instructions
    #[arg(short, long)]
    max_cycles: Option<u64>,

    /// Increase the level of verbosity. Can be used multiple times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the final machine state as JSON on stderr
    #[arg(long)]
    summary: bool,
}

impl Cli {
    const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "lc3=debug,warn",
            2 => "lc3=trace,warn",
            3..=u8::MAX => "trace",
        }
    }

    fn filter_layer(&self) -> EnvFilter {
        // RUST_LOG wins over -v
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.log_filter()))
    }
}

/// How a run ended.
enum Outcome {
    Halted,
    CycleLimit(u64),
    Interrupted,
    Fault(CpuError),
}

/// Final machine state, printed with `--summary`.
#[derive(Serialize)]
struct Summary<'a> {
    state: CpuState,
    cycles: u64,
    fault: Option<u16>,
    registers: &'a Registers,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with program output. The terminal
    // is in raw mode while the program runs, so line endings are expanded.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(|| CrlfWriter::new(io::stderr()))
        .without_time()
        .with_target(false);
    tracing_subscriber::registry()
        .with(cli.filter_layer())
        .with(fmt_layer)
        .init();

    // Read every image before touching the terminal
    let mut images: Vec<Image> = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        match load_image(path) {
            Ok(image) => images.push(image),
            Err(e) => {
                eprintln!("failed to load image: {}", path.display());
                error!("{}", e);
                return ExitCode::from(2);
            }
        }
    }

    let console = match TerminalConsole::new() {
        Ok(console) => console,
        Err(e) => {
            eprintln!("failed to configure terminal: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut cpu = Cpu::new(console);
    for image in &images {
        cpu.load_image(image);
    }

    let outcome = run(&mut cpu, cli.max_cycles);

    let summary = cli.summary.then(|| {
        serde_json::to_string_pretty(&Summary {
            state: cpu.state,
            cycles: cpu.cycles,
            fault: cpu.fault(),
            registers: &cpu.regs,
        })
    });

    // Restore the terminal before reporting anything
    drop(cpu);

    match summary {
        Some(Ok(json)) => eprintln!("{}", json),
        Some(Err(e)) => error!("failed to serialize summary: {}", e),
        None => {}
    }

    match outcome {
        Outcome::Halted => ExitCode::SUCCESS,
        Outcome::CycleLimit(max) => {
            eprintln!("stopped after reaching the cycle limit ({})", max);
            ExitCode::SUCCESS
        }
        Outcome::Interrupted => {
            eprintln!("interrupted");
            ExitCode::from(130)
        }
        Outcome::Fault(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Drive the machine until it halts, faults, is interrupted or runs out of cycles.
fn run(cpu: &mut Cpu<TerminalConsole>, max_cycles: Option<u64>) -> Outcome {
    while cpu.is_running() {
        if let Some(max) = max_cycles.filter(|&max| cpu.cycles >= max) {
            return Outcome::CycleLimit(max);
        }
        if cpu.console().interrupted() {
            return Outcome::Interrupted;
        }

        match cpu.step() {
            Ok(_) => {}
            Err(CpuError::Console(e)) if e.kind() == io::ErrorKind::Interrupted => {
                return Outcome::Interrupted;
            }
            Err(e) => return Outcome::Fault(e),
        }
    }

    info!(cycles = cpu.cycles, "program halted");
    Outcome::Halted
}
