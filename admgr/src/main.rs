//! `admgr` — automated ACME DNS-01 certificate lifecycle manager.
//!
//! One-shot batch utility: parses configuration and CLI arguments,
//! builds the certificate request list, and drives the Request
//! Orchestrator to completion. Never a long-running process; no
//! listener, no admin API.
//!
//! Grounded on `pingclair/src/main.rs` and
//! `NiklasRosenstein-rise/rise-cli/src/main.rs` for the clap-derive +
//! `tracing_subscriber` wiring shape.

mod cli;
mod logging;
mod orchestrator;

use std::path::Path;
use std::time::Duration;

use admgr_config::Config;
use admgr_core::{CancellationToken, CertificateRequest, Error, ErrorKind};
use admgr_store::CredentialStore;
use clap::Parser;

use crate::orchestrator::{RequestOrchestrator, RunOutcome};

/// Overall invocation timeout.
const INVOCATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    if cli.print_config_template {
        print!("{}", Config::template());
        return;
    }

    logging::init(cli.log_format, cli.effective_log_level());

    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("invocation", request_id = %request_id);
    let _guard = span.enter();

    match run(&cli).await {
        Ok(RunOutcome::AllDone) => {
            tracing::info!("invocation complete");
        }
        Ok(RunOutcome::DnsSetupNeeded(plan)) => {
            // Advisory termination, not a failure: printed at warn
            // level so it survives --quiet, exits 0.
            tracing::warn!("DNS delegation is required before any certificate in this invocation can proceed");
            println!("\nDNS setup required. Create the following CNAME record(s):\n");
            for (challenge_name, target) in &plan {
                println!("  {challenge_name}  CNAME  {target}");
            }
            println!("\nRe-run this invocation once the records above have propagated.");
        }
        Err(e) => {
            tracing::error!("{}", e.short());
            eprintln!("{}", e.detailed());
            std::process::exit(exit_code_for(&e));
        }
    }
}

async fn run(cli: &cli::Cli) -> Result<RunOutcome, Error> {
    let config = Config::load(Path::new(&cli.config))?;
    let requests = resolve_requests(cli, &config)?;

    let cancel = CancellationToken::new();
    arm_cancellation(cancel.clone());

    let store = CredentialStore::open(&config.cert_storage_path).await?;

    let orchestrator = RequestOrchestrator::new(&config, &store, &cancel);
    orchestrator.run(&requests).await
}

/// Exactly one of manual (CLI positional arguments) or auto
/// (configuration) may produce the request list.
fn resolve_requests(cli: &cli::Cli, config: &Config) -> Result<Vec<CertificateRequest>, Error> {
    let manual_given = !cli.requests.is_empty();

    if cli.auto && manual_given {
        return Err(Error::validation(
            "mode_gating",
            "both --auto and positional certificate arguments were supplied; specify exactly one",
        )
        .with_context("mode", "both")
        .suggest("drop --auto for manual mode, or remove the positional arguments for auto mode"));
    }
    if !cli.auto && !manual_given {
        return Err(Error::validation(
            "mode_gating",
            "neither --auto nor any positional certificate arguments were supplied; specify exactly one",
        )
        .with_context("mode", "neither")
        .suggest("pass --auto to use auto_domains from the config file, or list certificates on the command line"));
    }

    if cli.auto {
        config
            .auto_certs
            .iter()
            .map(|c| CertificateRequest::new(c.name.clone(), c.domains.clone(), Some(c.key_type)))
            .collect()
    } else {
        admgr_config::parse_positional_args(&cli.requests)
    }
}

/// Arms `token` from SIGINT/SIGTERM-equivalent and the overall 30-minute
/// timeout. Runs as a background task so the main orchestration loop only
/// ever needs to poll `is_cancelled()` at its own coarse-grained
/// boundaries.
fn arm_cancellation(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received interrupt signal, finishing in-flight work and stopping");
                token.cancel();
            }
            _ = tokio::time::sleep(INVOCATION_TIMEOUT) => {
                tracing::warn!("invocation exceeded the 30 minute overall timeout, stopping");
                token.cancel();
            }
        }
    });
}

/// Maps an error's kind to a process exit code. Every non-success path is
/// non-zero; the specific value beyond 1 keeps `Cancelled` distinguishable
/// from "real" failures for anyone watching exit codes from a timer unit.
fn exit_code_for(e: &Error) -> i32 {
    match e.kind {
        ErrorKind::Cancelled => 130,
        _ => 1,
    }
}
