//! localdev CLI
//!
//! Provisions and health-checks the local kind cluster.

use std::process::ExitCode;

use clap::Parser;

use localdev::Cli;
use localdev_common::telemetry::{init_tracing, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    if let Err(e) = init_tracing(format) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
