// quant-sweep - bfloat16 vs. int8 training sweep
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use quant_sweep::archive::CommandArchiver;
use quant_sweep::config::load_config;
use quant_sweep::errors::{wrap_error_with_suggestion, SweepError};
use quant_sweep::training::{RunSequencer, SubprocessLauncher, SweepReport, TokioSettle};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "quant-sweep")]
#[command(
    about = "Run the bfloat16 and int8 training variants back to back and archive their metrics",
    version
)]
struct Args {
    /// Base run name; each run is named <BASE_RUN_NAME>-<suffix>
    base_run_name: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_tracing();

    match run_sweep(&args.base_run_name).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let (code, suggestion) = match e.downcast_ref::<SweepError>() {
                Some(sweep_err) => (sweep_err.exit_code(), sweep_err.suggestion()),
                None => (1, "Re-run with RUST_LOG=debug for more detail."),
            };
            eprintln!(
                "\x1b[1;31mError:\x1b[0m {}",
                wrap_error_with_suggestion(&e, suggestion)
            );
            ExitCode::from(exit_status_byte(code))
        }
    }
}

async fn run_sweep(base_run_name: &str) -> Result<SweepReport> {
    let config = load_config()
        .context("Failed to load sweep configuration")
        .map_err(|e| SweepError::Config(format!("{:#}", e)))?;

    println!("Quantized Training Sweep");
    println!("========================");
    println!("Base run name: {}", base_run_name);
    println!("Runs: {}", config.runs.len());
    println!("Archive: {}", config.archive.bucket_root);
    println!();

    let sequencer = RunSequencer::from_config(
        &config,
        Box::new(SubprocessLauncher::new()),
        Box::new(CommandArchiver::from_config(&config.archive)),
        Box::new(TokioSettle),
    )?;

    Ok(sequencer.execute_sweep(base_run_name, &config.runs).await?)
}

fn print_report(report: &SweepReport) {
    println!();
    println!("Sweep Summary");
    println!("=============");
    println!("Base run name: {}", report.base_run_name);
    for run in &report.runs {
        println!(
            "  {:<32} {:>8.1}s  {}",
            run.run_name,
            run.duration.as_secs_f64(),
            run.metrics_path.display()
        );
    }
    println!("Total duration: {:.1}s", report.duration.as_secs_f64());
}

/// Clamp an exit code into the 1..=255 range a process can report
fn exit_status_byte(code: i32) -> u8 {
    u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
}

/// Logs go to stderr so per-run metrics summaries on stdout stay clean
fn init_tracing() {
    let show_debug = std::env::var("QUANT_SWEEP_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    // Default: INFO level, can be overridden with RUST_LOG
    let env_filter = if show_debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    // Bridge log crate → tracing (for dependencies using log crate)
    tracing_log::LogTracer::init().ok();
}
