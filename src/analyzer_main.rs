//! Meridian analysis service binary
//!
//! Binds the bytecode analyzer to a loopback port and serves the wire
//! protocol until a shutdown request arrives. The service is stateless;
//! restarting it mid-corpus loses nothing.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use meridian::analyzer::routes::{AppState, build_router};

const DEFAULT_PORT: u16 = 8766;

/// Delay between answering /shutdown and exiting, so the response flushes.
const SHUTDOWN_GRACE_MS: u64 = 500;

fn print_usage() {
    eprintln!("meridian-analyzer - bytecode analysis service");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  meridian-analyzer [--port <N>]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  --port <N>   Loopback port to bind (default: {})", DEFAULT_PORT);
}

fn parse_port(args: &[String]) -> Result<u16, String> {
    let mut port = DEFAULT_PORT;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| "--port requires a value".to_string())?;
                port = value
                    .parse()
                    .map_err(|_| format!("invalid port: {}", value))?;
                i += 2;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(port)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let port = match parse_port(&args) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("meridian-analyzer: error: {}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let app = build_router(AppState {
        shutdown: shutdown_tx,
    });

    let addr = format!("127.0.0.1:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("meridian-analyzer: error: failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!(port = port, version = env!("CARGO_PKG_VERSION"), "analysis service listening");
    info!("endpoints: GET /health, POST /index, POST /index/batch, POST /analyze, POST /shutdown");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
    });

    if let Err(e) = serve.await {
        eprintln!("meridian-analyzer: error: {}", e);
        std::process::exit(1);
    }

    tokio::time::sleep(std::time::Duration::from_millis(SHUTDOWN_GRACE_MS)).await;
    info!("analysis service stopped");
}
