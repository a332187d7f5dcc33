use anyhow::{Context, Result};
use clap::Parser;
use emu_core::logging::{LogCategory, LogConfig, LogLevel};
use emu_core::System;
use emu_segacd::{SegaCdConfig, SegaCdError, SegaCdSystem, PROGRAM_MOUNT_POINT};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    /// Path to a big-endian SSP1601 program image
    program: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of instructions to execute
    #[arg(long, default_value_t = 1000)]
    steps: u64,

    /// Run for this many cycles instead of a fixed instruction count
    #[arg(long)]
    cycles: Option<u32>,

    /// Stop at the first DSP fault
    #[arg(long, default_value_t = false)]
    halt_on_fault: bool,

    /// Dump save-state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Global emulator log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Per-category log level, e.g. `dsp=trace` (repeatable)
    #[arg(long = "log", value_name = "CATEGORY=LEVEL")]
    log_categories: Vec<String>,

    /// Maximum log lines per second and category (0 = unlimited)
    #[arg(long)]
    log_rate_limit: Option<usize>,

    /// Write emulator logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn configure_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    let level = LogLevel::from_str(&args.log_level)
        .with_context(|| format!("unknown log level '{}'", args.log_level))?;
    config.set_global_level(level);

    for entry in &args.log_categories {
        let (name, level) = entry
            .split_once('=')
            .with_context(|| format!("expected CATEGORY=LEVEL, got '{}'", entry))?;
        let category = LogCategory::from_str(name)
            .with_context(|| format!("unknown log category '{}'", name))?;
        let level =
            LogLevel::from_str(level).with_context(|| format!("unknown log level '{}'", level))?;
        config.set_level(category, level);
    }

    if let Some(limit) = args.log_rate_limit {
        config.set_rate_limit(limit);
    }
    if let Some(path) = &args.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("cannot open log file {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;

    let config = match &args.config {
        Some(path) => SegaCdConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SegaCdConfig::default(),
    };
    log::debug!("config: {:?}", config);

    let image = fs::read(&args.program)
        .with_context(|| format!("reading program {}", args.program.display()))?;
    let mut sys = SegaCdSystem::with_config(config);
    sys.mount(PROGRAM_MOUNT_POINT, &image)?;
    log::info!(
        "loaded {} program words from {}",
        image.len() / 2,
        args.program.display()
    );

    if let Some(budget) = args.cycles {
        let spent = sys.run_cycles(budget)?;
        println!("Ran {} cycles", spent);
    } else {
        let mut faults = 0u64;
        for n in 0..args.steps {
            let result = sys.step();
            if let Some(fault) = result.fault {
                faults += 1;
                println!("step {}: {}", n, fault);
                if args.halt_on_fault {
                    return Err(SegaCdError::from(fault).into());
                }
            }
        }
        println!(
            "Ran {} instructions, {} cycles, {} faults",
            args.steps,
            sys.cycles(),
            faults
        );
    }

    let regs = &sys.dsp().regs;
    println!(
        "PC={:04X} A={:04X} AL={:04X} X={:04X} Y={:04X} ST={:04X}",
        regs.pc,
        regs.a(),
        regs.al(),
        regs.x,
        regs.y,
        regs.st()
    );
    println!("Word RAM: {:?}, swap={}", sys.mode(), sys.swap_flag());

    if let Some(path) = &args.save {
        let state = sys.save_state();
        let mut f = File::create(path)?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
        log::info!("save state written to {}", path.display());
    }

    Ok(())
}
