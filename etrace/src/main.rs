//! # etrace - Main Entry Point
//!
//! Two subcommands:
//! - **view** (`etrace view --trace FILE`): Interactive step-through viewer
//! - **profile** (`etrace profile TRACE NM`): Batch hot-function report
//!
//! Exit status is 0 on a normal quit (including Ctrl+C in the viewer) and 1
//! for usage errors or any other failure.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};

use etrace::analysis::{profile_trace, ProgressMeter, SymbolTable};
use etrace::cli::{Args, Command, ProfileArgs, ViewArgs};
use etrace::config::Config;
use etrace::navigation::Navigator;
use etrace::source::SourceCache;
use etrace::symbolization::addr2line_process::DEFAULT_ADDR2LINE;
use etrace::symbolization::{
    Addr2Line, DwarfSymbolizer, NullSymbolizer, SymbolResolver, Symbolize,
};
use etrace::trace::TraceReader;
use etrace::tui::App;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
/// Missing or malformed command-line input
const EXIT_USAGE: i32 = 1;

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version print to stdout and are not failures
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    std::process::exit(match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::View(view) => run_view(view),
        Command::Profile(profile) => run_profile(&profile),
    }
}

fn run_view(args: ViewArgs) -> Result<()> {
    let Some(trace_path) = args.trace.as_ref() else {
        anyhow::bail!(
            "Missing required argument: --trace\n\n\
             Usage:\n  \
             etrace view --trace run.etrace [--elf firmware.elf]\n\n\
             Run 'etrace view --help' for more options"
        );
    };

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_overrides(args.comp_dir.clone(), args.addr2line.clone());

    let resolver = build_resolver(&args, &config)?;
    let reader = TraceReader::open(trace_path)
        .with_context(|| format!("Failed to open trace {}", trace_path.display()))?;
    if reader.is_empty() {
        warn!("Trace {} is empty", trace_path.display());
    }

    let nav = Navigator::new(reader, resolver);
    let sources = SourceCache::new(config.comp_dir.clone());
    App::new(nav, sources).run()
}

fn build_resolver(args: &ViewArgs, config: &Config) -> Result<SymbolResolver> {
    let backend: Box<dyn Symbolize> = match &args.elf {
        None => {
            info!("No ELF image given, locations will not be resolved");
            Box::new(NullSymbolizer)
        }
        Some(elf) if args.dwarf => Box::new(
            DwarfSymbolizer::new(elf)
                .with_context(|| format!("Failed to load debug info from {}", elf.display()))?,
        ),
        Some(elf) => {
            let program = config.addr2line.as_deref().unwrap_or(DEFAULT_ADDR2LINE);
            info!("Symbolizing with {program} -f -e {}", elf.display());
            Box::new(Addr2Line::with_program(program, elf))
        }
    };

    let resolver = SymbolResolver::new(backend);
    Ok(match config.address_map()? {
        Some(map) => resolver.with_transform(map),
        None => resolver,
    })
}

fn run_profile(args: &ProfileArgs) -> Result<()> {
    println!("Loading NM symbols...");
    let table = SymbolTable::load(&args.nm)?;

    println!("Parsing trace...");
    let mut reader = TraceReader::open(&args.trace)
        .with_context(|| format!("Failed to open trace {}", args.trace.display()))?;

    let mut meter = ProgressMeter::new();
    let aggregator = profile_trace(&mut reader, &table, |done, total| {
        if let Some(pct) = meter.update(done, total) {
            eprint!("\rProgress: {pct:3}%");
        }
    });
    eprintln!();
    if let Some(err) = reader.last_error() {
        warn!("Trace ended early: {err}");
        eprintln!("warning: trace ended early: {err}");
    }

    let report = aggregator.report(args.top);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out)?;
    report.write_text(&mut out)?;

    if let Some(path) = &args.json {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        report.write_json(&mut writer)?;
        writer.flush()?;
        info!("Wrote JSON report to {}", path.display());
    }
    Ok(())
}
