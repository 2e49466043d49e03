// Allow common clippy pedantic lints
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_self)]
#![allow(clippy::needless_pass_by_value)]

//! PinCart CLI
//!
//! Command-line client for the PinCart backend

use clap::Parser;
use pincart_client::cli::{Cli, Runner};
use pincart_client::telemetry::{self, ErrorReporter, SentryReporter};
use pincart_client::Result;
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for error reports before exiting
const REPORT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    telemetry::init_logging(cli.verbose);

    let runner = Runner::new(cli);

    if let Err(e) = run(&runner).await {
        telemetry::capture_error(&e);
        telemetry::flush_error_reporting(REPORT_FLUSH_TIMEOUT);
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(runner: &Runner) -> Result<()> {
    let settings = runner.settings()?;

    let reporter = SentryReporter::new(&settings.error_reporting)?
        .map(|r| Arc::new(r) as Arc<dyn ErrorReporter>);
    telemetry::init_error_reporting(reporter);

    runner.run_with(&settings).await
}
