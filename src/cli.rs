//! CLI argument parsing for Meridian
//!
//! Defines the Command enum and parse_args() for the orchestrator binary.

use anyhow::{Result, bail};
use std::path::PathBuf;

use meridian::orchestrator::DEFAULT_ANALYZER_URL;

pub fn print_usage() {
    eprintln!("Meridian - JVM call-graph extraction engine");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  meridian <command> [arguments]");
    eprintln!("  meridian --help");
    eprintln!();
    eprintln!("  meridian run    --db <FILE> --packages <MANIFEST> [--init] [--limit <N>] [--domain <PREFIX>]... [--analyzer-url <URL>]");
    eprintln!("  meridian index  --db <FILE> --packages <MANIFEST> [--domain <PREFIX>]... [--analyzer-url <URL>]");
    eprintln!("  meridian status --db <FILE>");
    eprintln!("  meridian stop-analyzer [--analyzer-url <URL>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run            Index all packages, then extract the call graph");
    eprintln!("  index          Build the symbol index only (skip extraction)");
    eprintln!("  status         Show store statistics and per-package metadata");
    eprintln!("  stop-analyzer  Ask the analysis service to shut down");
    eprintln!();
    eprintln!("Run/index arguments:");
    eprintln!("  --db <FILE>          Path to the SQLite fact store");
    eprintln!("  --packages <FILE>    JSON manifest of packages (name, classesDir, sourcesDir?)");
    eprintln!("  --init               Drop and recreate all tables before the run");
    eprintln!("  --limit <N>          Max classes per package (tests only; requires --init)");
    eprintln!("  --domain <PREFIX>    FQN prefix filter, repeatable (default: no filter)");
    eprintln!("  --analyzer-url <URL> Analysis service base URL (default: {})", DEFAULT_ANALYZER_URL);
    eprintln!();
    eprintln!("Status arguments:");
    eprintln!("  --db <FILE>          Path to the SQLite fact store");
}

#[derive(Debug)]
pub enum Command {
    Run {
        db_path: PathBuf,
        manifest: PathBuf,
        analyzer_url: String,
        init: bool,
        limit: Option<usize>,
        domains: Vec<String>,
        index_only: bool,
    },
    Status {
        db_path: PathBuf,
    },
    StopAnalyzer {
        analyzer_url: String,
    },
    Help,
    Version,
}

pub fn parse_args(args: &[String]) -> Result<Command> {
    if args.is_empty() {
        return Ok(Command::Help);
    }

    match args[0].as_str() {
        "--help" | "-h" | "help" => Ok(Command::Help),
        "--version" | "-V" | "version" => Ok(Command::Version),
        "run" | "index" => parse_run(&args[0], &args[1..]),
        "status" => {
            let db_path = required_path_flag(&args[1..], "--db")?;
            Ok(Command::Status { db_path })
        }
        "stop-analyzer" => {
            let analyzer_url = optional_flag(&args[1..], "--analyzer-url")?
                .unwrap_or_else(|| DEFAULT_ANALYZER_URL.to_string());
            Ok(Command::StopAnalyzer { analyzer_url })
        }
        other => bail!("unknown command: {}", other),
    }
}

fn parse_run(command: &str, args: &[String]) -> Result<Command> {
    let mut db_path = None;
    let mut manifest = None;
    let mut analyzer_url = DEFAULT_ANALYZER_URL.to_string();
    let mut init = false;
    let mut limit = None;
    let mut domains = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" => {
                db_path = Some(PathBuf::from(value_of(args, &mut i, "--db")?));
            }
            "--packages" => {
                manifest = Some(PathBuf::from(value_of(args, &mut i, "--packages")?));
            }
            "--analyzer-url" => {
                analyzer_url = value_of(args, &mut i, "--analyzer-url")?;
            }
            "--init" => {
                init = true;
                i += 1;
            }
            "--limit" => {
                let raw = value_of(args, &mut i, "--limit")?;
                limit = Some(raw.parse().map_err(|_| {
                    anyhow::anyhow!("--limit expects an integer, got '{}'", raw)
                })?);
            }
            "--domain" => {
                domains.push(value_of(args, &mut i, "--domain")?);
            }
            other => bail!("unknown argument: {}", other),
        }
    }

    let Some(db_path) = db_path else {
        bail!("--db is required");
    };
    let Some(manifest) = manifest else {
        bail!("--packages is required");
    };

    Ok(Command::Run {
        db_path,
        manifest,
        analyzer_url,
        init,
        limit,
        domains,
        index_only: command == "index",
    })
}

/// Consume `--flag VALUE`, advancing the cursor past both tokens.
fn value_of(args: &[String], i: &mut usize, flag: &str) -> Result<String> {
    if *i + 1 >= args.len() {
        bail!("{} requires a value", flag);
    }
    let value = args[*i + 1].clone();
    *i += 2;
    Ok(value)
}

fn required_path_flag(args: &[String], flag: &str) -> Result<PathBuf> {
    optional_flag(args, flag)?
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("{} is required", flag))
}

fn optional_flag(args: &[String], flag: &str) -> Result<Option<String>> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            if i + 1 >= args.len() {
                bail!("{} requires a value", flag);
            }
            return Ok(Some(args[i + 1].clone()));
        }
        i += 1;
    }
    Ok(None)
}
