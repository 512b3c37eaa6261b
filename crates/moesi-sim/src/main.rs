//! CLI entry point for the MOESI trace simulator.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use log::{LevelFilter, Log, Metadata, Record};
use moesi_core::CacheSystem;
use moesi_sim::config::{default_config_json, load_config, ConfigOverrides};
use moesi_sim::errors::SimError;
use moesi_sim::runner::{run_trace, RunOptions};
use moesi_sim::trace::parse_trace;
use serde_json as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;

const USAGE_TEXT: &str = "\
Usage: moesi-sim <command> [options]

Commands:
  run <trace> [options]  Run an access trace and print read values and counters
  config                 Print the default system configuration as JSON

Options (run):
  --config <file>        JSON system configuration (default: built-in)
  --caches <n>           Number of uniform caches, IDs 0..n
  --lines <n>            Lines per cache
  --index-bits <n>       Index bits per cache
  --block-size <n>       Block size in bytes (power of two)
  --address-bits <n>     Address width in bits (1..=24)
  --audit                Check coherence invariants after every operation
  -v, --verbose          Log protocol activity to stderr
  -h, --help             Show this help message

Trace lines:
  <cache-id> r <b|h|w|d> <address>
  <cache-id> w <b|h|w|d> <address> <value>

Exit codes: 0 success, 1 I/O or parse error, 2 usage error, 3 audit failure
";

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_AUDIT: i32 = 3;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Config,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunArgs {
    trace: PathBuf,
    config: Option<PathBuf>,
    overrides: ConfigOverrides,
    audit: bool,
    verbose: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    match first.to_string_lossy().as_ref() {
        "run" => parse_run_args(args).map(|parsed| parsed.map_or(ParseResult::Help, |run| {
            ParseResult::Command(Command::Run(run))
        })),
        "config" => match args.next() {
            None => Ok(ParseResult::Command(Command::Config)),
            Some(extra) => Err(format!("unexpected argument: {}", extra.to_string_lossy())),
        },
        other => Err(format!("unknown command: {other}")),
    }
}

/// Returns `Ok(None)` when help was requested.
#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<Option<RunArgs>, String> {
    let mut trace: Option<PathBuf> = None;
    let mut run = RunArgs::default();

    while let Some(arg) = args.next() {
        let flag = arg.to_string_lossy().to_string();
        match flag.as_str() {
            "--help" | "-h" => return Ok(None),
            "--verbose" | "-v" => run.verbose = true,
            "--audit" => run.audit = true,
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --config".to_string())?;
                run.config = Some(PathBuf::from(value));
            }
            "--caches" => run.overrides.caches = Some(flag_value(&flag, args.next())?),
            "--lines" => run.overrides.lines = Some(flag_value(&flag, args.next())?),
            "--index-bits" => run.overrides.index_bits = Some(flag_value(&flag, args.next())?),
            "--block-size" => run.overrides.block_size = Some(flag_value(&flag, args.next())?),
            "--address-bits" => {
                run.overrides.address_bits = Some(flag_value(&flag, args.next())?);
            }
            option if option.starts_with('-') => return Err(format!("unknown option: {option}")),
            _ => {
                if trace.is_some() {
                    return Err("multiple trace paths provided".to_string());
                }
                trace = Some(PathBuf::from(arg));
            }
        }
    }

    run.trace = trace.ok_or_else(|| "missing trace path".to_string())?;
    Ok(Some(run))
}

fn flag_value<T: FromStr>(flag: &str, value: Option<OsString>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("missing value for {flag}"))?;
    let text = value.to_string_lossy();
    text.parse()
        .map_err(|_| format!("invalid value for {flag}: {text}"))
}

/// Writes `log` records to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn install_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn run(args: &RunArgs) -> Result<i32, SimError> {
    let config = load_config(args.config.as_deref(), &args.overrides)?;
    let mut system = CacheSystem::new(&config)?;
    for node in system.nodes() {
        log::info!("{}", node.cache().geometry().describe(node.id()));
    }

    let text = fs::read_to_string(&args.trace).map_err(|source| SimError::Io {
        path: args.trace.clone(),
        source,
    })?;
    let trace = parse_trace(&text).map_err(|source| SimError::Trace {
        path: args.trace.clone(),
        source,
    })?;

    let report = run_trace(&mut system, &trace, RunOptions { audit: args.audit });
    println!("{report}");

    if let Some((line, violation)) = report.audit_failure {
        eprintln!("error: audit failed after line {line}: {violation}");
        return Ok(EXIT_AUDIT);
    }
    Ok(0)
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Config)) => match default_config_json() {
            Ok(json) => {
                println!("{json}");
                0
            }
            Err(error) => {
                eprintln!("error: {error}");
                EXIT_FAILURE
            }
        },
        Ok(ParseResult::Command(Command::Run(args))) => {
            install_logger(args.verbose);
            run(&args).unwrap_or_else(|error| {
                eprintln!("{}", error.format_for_stderr());
                EXIT_FAILURE
            })
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            EXIT_USAGE
        }
    };

    std::process::exit(exit_code);
}
