use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use rv32i_asm::Gpr;
use rv32i_sim::{LogLevel, Session, SimConfig, SimError, Snapshot, DEFAULT_TRACE_CAPACITY};

/// Assemble and run RV32I programs where the program counter is an instruction index.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log verbosity (`-v` debug, `-vv` trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    machine: MachineArgs,
}

#[derive(ClapArgs)]
struct MachineArgs {
    /// Steps a run may take before it is aborted
    #[arg(long, env = "RV32SIM_MAX_STEPS", global = true)]
    max_steps: Option<u64>,
    /// Data memory size in bytes
    #[arg(long, env = "RV32SIM_MEMORY_SIZE", global = true)]
    memory_size: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble and run one or more files to completion on a single machine
    Run {
        /// Assembly files, run in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print the final snapshot (or error report) as JSON
        #[arg(long)]
        json: bool,
        /// Print the instruction trace
        #[arg(long)]
        trace: bool,
        /// Zero registers and memory before each file
        #[arg(long)]
        fresh: bool,
    },
    /// Assemble a file into a fresh machine and single-step it
    Step {
        /// Assembly file
        file: PathBuf,
        /// Number of steps to take
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u64,
        /// Print the final snapshot (or error report) as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assemble a file without running it and print the resolved listing
    Check {
        /// Assembly file
        file: PathBuf,
    },
}

impl Command {
    fn json(&self) -> bool {
        match self {
            Command::Run { json, .. } | Command::Step { json, .. } => *json,
            Command::Check { .. } => false,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logger: {e}");
    }

    let json = args.command.json();
    match dispatch(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, json);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(args: Args) -> Result<()> {
    let mut config = SimConfig::default();
    if let Some(limit) = args.machine.max_steps {
        config = config.with_max_steps(limit);
    }
    if let Some(size) = args.machine.memory_size {
        config = config.with_memory_size(size);
    }

    match args.command {
        Command::Run {
            files,
            json,
            trace,
            fresh,
        } => {
            if trace {
                config = config
                    .with_log_level(LogLevel::Instructions)
                    .with_trace_capacity(DEFAULT_TRACE_CAPACITY);
            }
            let config = config.with_preserve_state_on_run(!fresh);
            run(&files, config, json, trace)
        }
        Command::Step { file, count, json } => step(&file, count, config, json),
        Command::Check { file } => check(&file),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))
}

fn run(files: &[PathBuf], config: SimConfig, json: bool, trace: bool) -> Result<()> {
    let mut session = Session::new(config);
    let mut snapshot = session.snapshot();

    for path in files {
        if !json {
            file_message(MsgColor::Green, "Assembling", path);
        }
        let source = read_source(path)?;
        let result = session.assemble_and_run(&source);

        if trace && !json {
            print!("{}", session.machine().format_logs());
        }
        snapshot = result?;

        if !json {
            let status = if snapshot.halted { "Halted" } else { "Finished" };
            message(
                MsgColor::Green,
                status,
                &format!("pc {} after {} steps", snapshot.pc, snapshot.step_count),
            );
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_state(&snapshot);
    }
    Ok(())
}

fn step(path: &Path, count: u64, config: SimConfig, json: bool) -> Result<()> {
    let config = config
        .with_log_level(LogLevel::Instructions)
        .with_trace_capacity(1);
    let mut session = Session::new(config);
    let source = read_source(path)?;

    if !json {
        file_message(MsgColor::Green, "Assembling", path);
    }

    let mut snapshot = session.snapshot();
    for n in 0..count {
        let before = snapshot.step_count;
        snapshot = if n == 0 {
            session.assemble_and_step(&source)?
        } else {
            session.step()?
        };

        if json {
            continue;
        }
        if snapshot.step_count == before {
            let reason = if snapshot.halted {
                "machine is halted"
            } else {
                "pc is past the end of the program"
            };
            message(MsgColor::Cyan, "Idle", reason);
        } else if let Some(log) = session.machine().get_logs().last() {
            println!("{log}");
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_state(&snapshot);
    }
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    file_message(MsgColor::Green, "Checking", path);
    let source = read_source(path)?;
    let program = rv32i_asm::assemble(&source).map_err(SimError::from)?;

    for (index, inst) in program.iter().enumerate() {
        let line = program.line_of(index).unwrap_or(0);
        println!("{index:>5}  {:<28} line {line}", inst.to_string());
    }
    message(
        MsgColor::Green,
        "Success",
        &format!("{} instructions, no errors found", program.len()),
    );
    Ok(())
}

fn print_state(snapshot: &Snapshot) {
    println!("Registers:");
    let mut any = false;
    for (index, value) in snapshot.nonzero_registers() {
        any = true;
        let reg = Gpr::new(index as u8);
        println!(
            "  {:>4} ({:>3}) = {:>11} (0x{:08x})",
            reg.abi_name(),
            reg.to_string(),
            value,
            value as u32
        );
    }
    if !any {
        println!("  (all zero)");
    }

    println!("Memory:");
    let mut any = false;
    for cell in snapshot.nonzero_memory() {
        any = true;
        println!("  0x{:04x}: {} ({})", cell.address, cell.hex, cell.value);
    }
    if !any {
        println!("  (all zero)");
    }
}

fn report_error(error: &anyhow::Error, json: bool) {
    let Some(sim) = error.downcast_ref::<SimError>() else {
        message(MsgColor::Red, "Error", &format!("{error:#}"));
        return;
    };

    if json {
        let mut value = serde_json::json!(sim.report());
        if let Some(snapshot) = sim.snapshot() {
            value["snapshot"] = serde_json::json!(snapshot);
        }
        println!("{value:#}");
        return;
    }

    message(MsgColor::Red, sim.kind().as_str(), &sim.to_string());
    if let Some(snapshot) = sim.snapshot() {
        print_state(snapshot);
    }
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}
