// Training program launcher
//
// Runs the external trainer as a blocking child process. Per-run environment
// overrides go to the child only; the sweep's own environment is never touched.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TrainerConfig;
use crate::errors::SweepError;
use crate::training::run_spec::RunSpec;

/// Everything needed to start one training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingInvocation {
    /// Executable to run (e.g. `python3`)
    pub program: String,

    /// Arguments placed before the config file (e.g. the training script)
    pub leading_args: Vec<String>,

    /// Trainer config file, passed positionally
    pub config_file: PathBuf,

    /// `<base>-<suffix>`
    pub run_name: String,

    /// Run-specific `key=value` overrides, in order
    pub overrides: Vec<(String, String)>,

    /// Metrics file the trainer should write
    pub metrics_file: PathBuf,

    /// Extra environment for the child process
    pub env: BTreeMap<String, String>,

    /// Directory the trainer runs in; relative metrics paths resolve here
    pub working_dir: Option<PathBuf>,
}

impl TrainingInvocation {
    pub fn new(trainer: &TrainerConfig, base_run_name: &str, spec: &RunSpec) -> Self {
        Self {
            program: trainer.program.clone(),
            leading_args: trainer.script.iter().map(|s| s.display().to_string()).collect(),
            config_file: trainer.config_file.clone(),
            run_name: spec.run_name(base_run_name),
            overrides: spec.args.clone(),
            metrics_file: spec.metrics_file.clone(),
            env: spec.env.clone(),
            working_dir: trainer.working_dir.clone(),
        }
    }

    /// Full argument vector after the program name:
    /// `[leading...] <config> run_name=<name> <k=v...> metrics_file=<path>`
    pub fn args(&self) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push(self.config_file.display().to_string());
        args.push(format!("run_name={}", self.run_name));
        args.extend(self.overrides.iter().map(|(k, v)| format!("{}={}", k, v)));
        args.push(format!("metrics_file={}", self.metrics_file.display()));
        args
    }

    /// Where the metrics file is expected once the trainer exits
    pub fn metrics_path(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) => dir.join(&self.metrics_file),
            None => self.metrics_file.clone(),
        }
    }
}

/// Starts a training run and waits for it to finish
#[async_trait]
pub trait TrainingLauncher: Send + Sync {
    /// Run to completion. Non-zero exit is `SweepError::LaunchFailure`.
    async fn launch(&self, invocation: &TrainingInvocation) -> Result<(), SweepError>;
}

/// Launcher backed by a real child process
#[derive(Debug, Default, Clone)]
pub struct SubprocessLauncher;

impl SubprocessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TrainingLauncher for SubprocessLauncher {
    async fn launch(&self, invocation: &TrainingInvocation) -> Result<(), SweepError> {
        let args = invocation.args();

        info!(
            run = %invocation.run_name,
            program = %invocation.program,
            "Launching training run"
        );
        debug!(args = ?args, env = ?invocation.env.keys().collect::<Vec<_>>(), "Trainer invocation");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().await.map_err(|source| SweepError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(SweepError::LaunchFailure {
                run_name: invocation.run_name.clone(),
                code: status.code(),
            });
        }

        info!(run = %invocation.run_name, "Training run finished");
        Ok(())
    }
}
