use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use mrsi::logger::init_logging;
use mrsi::stats::StatsHandler;
use mrsi::{RequestHandler, cancel};
use mrsi::{log_error, log_info};

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log_error!("{:#}", err);
            eprintln!("mrsi error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let raw = cli.to_config()?;
    let config = raw.clone().validate().context("invalid configuration")?;

    if let Some(path) = &cli.save_profile {
        raw.save_profile(path)
            .with_context(|| format!("saving profile {}", path.display()))?;
        log_info!("Profile saved to {}", path.display());
    }

    log_info!("📋 Configuration:");
    log_info!("  Requests: {}", config.request_count);
    log_info!("  Workers: {}", config.worker_count);
    log_info!("  Method: {}", config.method);
    log_info!("  Seed: {}", config.randomizer.seed);
    for template in &config.randomizer.url_templates {
        log_info!("  URL: {}", template);
    }
    for rule in &config.randomizer.int_rules {
        log_info!("  Int: {} in [{}, {}]", rule.key, rule.min, rule.max);
    }
    for rule in &config.randomizer.string_rules {
        log_info!("  Choice: {} from {:?}", rule.key, rule.choices);
    }
    log_info!("Press Ctrl+C to stop...");

    let cancel = cancel::trap_ctrl_c();
    let executor = RequestHandler::build_client(&config)?;
    let report = RequestHandler::run(&config, executor, cancel).await?;

    StatsHandler::print_final_stats(&report.summary, report.elapsed);
    Ok(())
}
