// Configuration structs

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::training::metrics::DEFAULT_SUMMARY_LINES;
use crate::training::run_spec::{default_runs, RunSpec};

/// Pause between runs, in seconds
pub const DEFAULT_SETTLE_SECS: u64 = 60;

/// Remote prefix metrics files are archived under
pub const DEFAULT_BUCKET_ROOT: &str = "gs://maxtext-experiments-multipod/int8";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub trainer: TrainerConfig,

    pub archive: ArchiveConfig,

    /// Seconds to wait after archiving a run before starting the next
    pub settle_delay_secs: u64,

    /// Trailing metrics lines printed per run
    pub summary_lines: usize,

    /// Ordered sweep; the bfloat16/aqt pair when not configured
    pub runs: Vec<RunSpec>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            trainer: TrainerConfig::default(),
            archive: ArchiveConfig::default(),
            settle_delay_secs: DEFAULT_SETTLE_SECS,
            summary_lines: DEFAULT_SUMMARY_LINES,
            runs: default_runs(),
        }
    }
}

impl SweepConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

/// How the external training program is invoked
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Executable (default: python3)
    pub program: String,

    /// Script passed to the program before the config file
    pub script: Option<PathBuf>,

    /// Trainer config file
    pub config_file: PathBuf,

    /// Working directory for the trainer; metrics files land here
    pub working_dir: Option<PathBuf>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: Some(PathBuf::from("MaxText/train.py")),
            config_file: PathBuf::from("MaxText/configs/base.yml"),
            working_dir: None,
        }
    }
}

/// Where and how metrics files are archived
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// gs:// or s3:// prefix
    pub bucket_root: String,

    /// Copy tool (default: gsutil)
    pub program: String,

    /// Arguments before `<local> <remote>` (default: ["cp"])
    pub args: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            bucket_root: DEFAULT_BUCKET_ROOT.to_string(),
            program: "gsutil".to_string(),
            args: vec!["cp".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_secs(60));
        assert_eq!(config.summary_lines, 3);
        assert_eq!(config.runs.len(), 2);
        assert_eq!(config.trainer.program, "python3");
        assert_eq!(config.archive.args, vec!["cp"]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SweepConfig = toml::from_str(
            r#"
            settle_delay_secs = 5

            [archive]
            bucket_root = "s3://other/prefix"
            "#,
        )
        .unwrap();

        assert_eq!(config.settle_delay_secs, 5);
        assert_eq!(config.archive.bucket_root, "s3://other/prefix");
        assert_eq!(config.archive.program, "gsutil");
        assert_eq!(config.runs.len(), 2);
    }

    #[test]
    fn test_runs_from_toml_replace_defaults() {
        let config: SweepConfig = toml::from_str(
            r#"
            [[runs]]
            name_suffix = "fp8"
            metrics_file = "fp8_metrics.txt"
            args = [{ steps = "10" }]
            "#,
        )
        .unwrap();

        assert_eq!(config.runs.len(), 1);
        assert_eq!(config.runs[0].name_suffix, "fp8");
    }
}
