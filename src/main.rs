//! Sea16 Emulator - CLI Entry Point
//!
//! Commands:
//! - `sea16-emu run <image>` - Run a raw image for a fixed number of steps
//! - `sea16-emu debug <image>` - Interactive debugger

use clap::{Parser, Subcommand};
use sea16::{Cpu, RunConfig, StdIo};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sea16-emu")]
#[command(version)]
#[command(about = "An interpreter for the Sea16 16-bit stack-frame virtual CPU")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an image for a fixed number of steps
    Run {
        /// Path to the raw image, loaded at address 0
        image: PathBuf,
        /// Number of instructions to execute (default: 20)
        #[arg(short, long)]
        steps: Option<u64>,
        /// Print the registers before every step
        #[arg(short, long)]
        trace: bool,
        /// Print the final registers as JSON
        #[arg(long)]
        dump_state: bool,
        /// JSON run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the final 64KB of memory to this file
        #[arg(long)]
        save_memory: Option<PathBuf>,
    },
    /// Interactive debugger
    Debug {
        /// Path to the raw image
        image: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { image, steps, trace, dump_state, config, save_memory }) => {
            let mut run_config = load_config(config.as_deref());
            if let Some(steps) = steps {
                run_config.steps = steps;
            }
            run_config.trace |= trace;
            run_config.dump_state |= dump_state;

            run_image(&image, &run_config, save_memory.as_deref());
        }
        Some(Commands::Debug { image }) => {
            debug_image(&image);
        }
        None => {
            println!("Sea16 Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit stack-frame virtual CPU");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn load_config(path: Option<&Path>) -> RunConfig {
    let mut config = match path {
        Some(path) => match RunConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        },
        None => RunConfig::default(),
    };
    config.apply_env_overrides();
    config
}

fn read_image(path: &Path) -> Vec<u8> {
    match sea16::load_image(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_image(path: &Path, config: &RunConfig, save_memory: Option<&Path>) {
    let image = read_image(path);

    let mut cpu = Cpu::with_io(StdIo);
    cpu.quirks = config.quirks;
    if let Err(e) = cpu.load_image(&image) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    log::info!("running {} for {} steps", path.display(), config.steps);

    if config.trace {
        cpu.set_trace_hook(|regs| println!("{}", regs));
    }

    let summary = cpu.run(config.steps);
    if summary.illegal > 0 {
        eprintln!(
            "warning: {} of {} steps hit an illegal opcode",
            summary.illegal, summary.steps
        );
    }

    if config.dump_state {
        match serde_json::to_string_pretty(&cpu.regs) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: failed to serialize registers: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(out) = save_memory {
        if let Err(e) = sea16::save_image(out, cpu.mem.as_slice()) {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
        log::info!("saved memory to {}", out.display());
    }
}

#[cfg(feature = "tui")]
fn debug_image(path: &Path) {
    let image = read_image(path);

    if let Err(e) = sea16::run_debugger(image) {
        eprintln!("error: debugger failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_image(_path: &Path) {
    eprintln!("error: built without the `tui` feature");
    std::process::exit(1);
}
