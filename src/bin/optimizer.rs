//! Reads a JSON array of signal records on stdin and writes the allocation
//! (or an error / informational object) to stdout. Diagnostics go to stderr.

use signal_allocation_engine::{cli, error::PipelineError};
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // stdout carries the result; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        error!(error = %e, "Failed to read stdin");
        let e = PipelineError::from(e);
        println!("{}", serde_json::json!({ "error": format!("Failed to read input JSON: {}", e) }));
        return ExitCode::FAILURE;
    }

    cli::optimize(&raw).emit()
}
