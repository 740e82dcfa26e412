//! Meridian CLI - JVM call-graph extraction orchestrator
//!
//! Usage: meridian <command> [arguments]

mod cli;

use anyhow::Result;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use meridian::analyzer::HttpAnalyzer;
use meridian::orchestrator::{self, ExtractionConfig};
use meridian::package;
use meridian::store::GraphStore;

use cli::Command;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match cli::parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("meridian: error: {}", e);
            cli::print_usage();
            return ExitCode::from(2);
        }
    };

    match dispatch(command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("meridian: error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Command) -> Result<ExitCode> {
    match command {
        Command::Help => {
            cli::print_usage();
            Ok(ExitCode::SUCCESS)
        }
        Command::Version => {
            println!("meridian {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            db_path,
            manifest,
            analyzer_url,
            init,
            limit,
            domains,
            index_only,
        } => {
            let packages = package::load_manifest(&manifest)?;
            let mut config = ExtractionConfig::new(db_path, packages);
            config.analyzer_url = analyzer_url;
            config.init = init;
            config.limit = limit;
            config.domains = domains;
            config.index_only = index_only;

            let summary = orchestrator::run_with_service(&config)?;
            println!("{}", summary);

            // Non-zero exit when any package failed, so CI and scripts
            // notice partial runs.
            if summary.has_failures() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Status { db_path } => {
            let store = GraphStore::open(&db_path, false)?;
            let stats = store.stats()?;
            println!("Store:    {}", db_path.display());
            println!("Symbols:  {}", stats.symbols);
            println!("Nodes:    {}", stats.nodes);
            println!("Edges:    {}", stats.edges);
            println!("Packages: {}", stats.packages);
            for row in store.list_metadata()? {
                println!(
                    "  {}  {}  indexed_at={}",
                    row.package,
                    &row.content_hash[..12.min(row.content_hash.len())],
                    row.indexed_at
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::StopAnalyzer { analyzer_url } => {
            let client = HttpAnalyzer::new(analyzer_url);
            let response = client.shutdown()?;
            println!("{}", response.status);
            Ok(ExitCode::SUCCESS)
        }
    }
}
