//! pianotutor - command-line front end for the piano tutoring backend.
//!
//! Signs in, registers, resets passwords and reports session state. All of
//! the session and network logic lives in `pianotutor-core`; this binary
//! only gathers input and prints results.

mod commands;

use std::io;

use anyhow::Result;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use pianotutor_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// Log file name prefix inside `<data_dir>/logs`
const LOG_FILE_PREFIX: &str = "pianotutor.log";

/// Initialize the tracing subscriber for logging.
///
/// Stderr gets the `RUST_LOG` filtered output (default `warn`); when a data
/// directory is available a daily rolling file receives the same events.
/// The returned guard must stay alive to flush the file writer.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.data_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match commands::parse_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{}\n\n{}", e, commands::USAGE);
            std::process::exit(2);
        }
    };

    if invocation.command == Command::Help {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config, using defaults: {:#}", e);
            let mut config = Config::default();
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
    };

    let _log_guard = init_tracing(&config);
    info!(base_url = %config.base_url, storage = ?config.storage, "pianotutor starting");

    let mut config = config;
    let result = commands::run(&mut config, invocation).await;

    if let Err(ref e) = result {
        warn!(error = %e, "Command failed");
    }
    result
}
