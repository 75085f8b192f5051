// Run sequencer
//
// Drives each run specification through launch, summary, archive and settle,
// strictly one at a time. The first failure aborts the sweep; nothing already
// produced is rolled back.

use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::archive::{Archiver, RemoteUri};
use crate::config::{SweepConfig, TrainerConfig};
use crate::errors::SweepError;
use crate::training::launcher::{TrainingInvocation, TrainingLauncher};
use crate::training::metrics::{self, RunSummary};
use crate::training::run_spec::{validate_sweep, RunSpec};

/// Pause between runs so external resources can settle
#[async_trait]
pub trait Settle: Send + Sync {
    async fn settle(&self, delay: Duration);
}

/// Settle by sleeping on the tokio timer
#[derive(Debug, Default, Clone)]
pub struct TokioSettle;

#[async_trait]
impl Settle for TokioSettle {
    async fn settle(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Outcome of a sweep where every run succeeded
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub base_run_name: String,
    pub runs: Vec<RunSummary>,
    pub duration: Duration,
}

/// Executes an ordered list of runs, one after another
pub struct RunSequencer {
    trainer: TrainerConfig,
    bucket_root: RemoteUri,
    settle_delay: Duration,
    summary_lines: usize,
    launcher: Box<dyn TrainingLauncher>,
    archiver: Box<dyn Archiver>,
    settler: Box<dyn Settle>,
}

impl RunSequencer {
    pub fn new(
        trainer: TrainerConfig,
        bucket_root: RemoteUri,
        launcher: Box<dyn TrainingLauncher>,
        archiver: Box<dyn Archiver>,
        settler: Box<dyn Settle>,
    ) -> Self {
        Self {
            trainer,
            bucket_root,
            settle_delay: Duration::from_secs(crate::config::DEFAULT_SETTLE_SECS),
            summary_lines: metrics::DEFAULT_SUMMARY_LINES,
            launcher,
            archiver,
            settler,
        }
    }

    /// Build a sequencer whose settings come from the loaded configuration
    pub fn from_config(
        config: &SweepConfig,
        launcher: Box<dyn TrainingLauncher>,
        archiver: Box<dyn Archiver>,
        settler: Box<dyn Settle>,
    ) -> Result<Self, SweepError> {
        let bucket_root = RemoteUri::parse(&config.archive.bucket_root)?;
        Ok(
            Self::new(config.trainer.clone(), bucket_root, launcher, archiver, settler)
                .with_settle_delay(config.settle_delay())
                .with_summary_lines(config.summary_lines),
        )
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_summary_lines(mut self, lines: usize) -> Self {
        self.summary_lines = lines;
        self
    }

    /// Remote object a run's metrics file is archived to
    pub fn archive_target(&self, base_run_name: &str, spec: &RunSpec) -> RemoteUri {
        self.bucket_root.join(&spec.remote_metrics_name(base_run_name))
    }

    /// Run every specification in order, stopping at the first failure
    pub async fn execute_sweep(
        &self,
        base_run_name: &str,
        specs: &[RunSpec],
    ) -> Result<SweepReport, SweepError> {
        validate_sweep(base_run_name, specs)?;

        let started = Instant::now();
        let mut runs = Vec::with_capacity(specs.len());

        info!(
            base = base_run_name,
            runs = specs.len(),
            "Starting sweep"
        );

        for (index, spec) in specs.iter().enumerate() {
            let summary = self
                .execute_run(base_run_name, spec)
                .await
                .inspect_err(|e| {
                    error!(
                        run = %spec.run_name(base_run_name),
                        remaining = specs.len() - index - 1,
                        "Sweep aborted: {}",
                        e
                    )
                })?;
            runs.push(summary);

            if index + 1 < specs.len() {
                info!(
                    seconds = self.settle_delay.as_secs_f64(),
                    "Waiting before next run"
                );
                self.settler.settle(self.settle_delay).await;
            }
        }

        Ok(SweepReport {
            base_run_name: base_run_name.to_string(),
            runs,
            duration: started.elapsed(),
        })
    }

    async fn execute_run(
        &self,
        base_run_name: &str,
        spec: &RunSpec,
    ) -> Result<RunSummary, SweepError> {
        let invocation = TrainingInvocation::new(&self.trainer, base_run_name, spec);
        let metrics_path = invocation.metrics_path();
        remove_stale_metrics(&metrics_path).await?;

        let started = Instant::now();

        self.launcher.launch(&invocation).await?;

        let lines = metrics::read_tail(&metrics_path, self.summary_lines).await?;
        let summary = RunSummary {
            run_name: invocation.run_name.clone(),
            metrics_path: metrics_path.clone(),
            lines,
            duration: started.elapsed(),
        };
        print!("{}", summary);

        let target = self.archive_target(base_run_name, spec);
        self.archiver.copy(&metrics_path, &target).await?;
        info!(run = %invocation.run_name, remote = %target, "Run archived");

        Ok(summary)
    }
}

/// A metrics file from an earlier invocation must not pass for this run's output
async fn remove_stale_metrics(path: &Path) -> Result<(), SweepError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale metrics file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SweepError::StaleMetrics {
            path: path.to_path_buf(),
            source,
        }),
    }
}
