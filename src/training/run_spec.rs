// Run specifications
//
// Static description of each sweep variant plus the checks that keep run
// names and metrics files from colliding within one sweep.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::errors::SweepError;

/// Environment variable the trainer reads its runtime tuning flags from
pub const TUNING_ENV_VAR: &str = "LIBTPU_INIT_ARGS";

/// Override keys the sequencer fills in itself
pub const RESERVED_KEYS: [&str; 2] = ["run_name", "metrics_file"];

const BASE_TUNING_FLAGS: &str = "--xla_tpu_enable_data_parallel_all_reduce_opt=true \
--xla_tpu_data_parallel_opt_different_sized_ops=true \
--xla_tpu_enable_async_collective_fusion=true \
--xla_tpu_enable_async_collective_fusion_fuse_all_gather=true \
--xla_tpu_enable_async_collective_fusion_multiple_steps=true \
--xla_tpu_overlap_compute_collective_tc=true \
--xla_enable_async_all_gather=true";

const INT8_TUNING_FLAGS: &str = "--xla_tpu_enable_async_collective_fusion_allow_int8=true";

/// One variant of the sweep
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunSpec {
    /// Appended to the base run name to form the run name
    pub name_suffix: String,

    /// Environment for the trainer process of this run only
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Ordered `key=value` overrides for the trainer
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub args: Vec<(String, String)>,

    /// File the trainer is told to write its metrics to
    pub metrics_file: PathBuf,
}

impl RunSpec {
    pub fn new(name_suffix: impl Into<String>, metrics_file: impl Into<PathBuf>) -> Self {
        Self {
            name_suffix: name_suffix.into(),
            env: BTreeMap::new(),
            args: Vec::new(),
            metrics_file: metrics_file.into(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((key.into(), value.to_string()));
        self
    }

    /// `<base>-<suffix>`
    pub fn run_name(&self, base_run_name: &str) -> String {
        format!("{}-{}", base_run_name, self.name_suffix)
    }

    /// Object name the metrics file is archived under: `<base>_metrics_<suffix>.txt`
    pub fn remote_metrics_name(&self, base_run_name: &str) -> String {
        format!("{}_metrics_{}.txt", base_run_name, self.name_suffix)
    }
}

/// The bfloat16 baseline followed by the int8 (AQT) variant
pub fn default_runs() -> Vec<RunSpec> {
    vec![
        precision_run("bfloat16", false, BASE_TUNING_FLAGS.to_string()),
        precision_run(
            "aqt",
            true,
            format!("{} {}", BASE_TUNING_FLAGS, INT8_TUNING_FLAGS),
        ),
    ]
}

fn precision_run(suffix: &str, int8: bool, tuning: String) -> RunSpec {
    RunSpec::new(suffix, format!("{}_metrics.txt", suffix))
        .with_env(TUNING_ENV_VAR, tuning)
        .with_arg("base_emb_dim", 8192)
        .with_arg("per_device_batch_size", 4)
        .with_arg("enable_checkpointing", false)
        .with_arg("use_int8_training", int8)
        .with_arg("steps", 150)
}

/// Check the base run name and the sweep before anything is launched
pub fn validate_sweep(base_run_name: &str, specs: &[RunSpec]) -> Result<(), SweepError> {
    validate_base_run_name(base_run_name)?;

    if specs.is_empty() {
        return Err(SweepError::InvalidSweep(
            "sweep has no run specifications".to_string(),
        ));
    }

    let mut suffixes = HashSet::new();
    let mut metrics_files = HashSet::new();

    for spec in specs {
        if spec.name_suffix.trim().is_empty() {
            return Err(SweepError::InvalidSweep(
                "run specification has an empty name suffix".to_string(),
            ));
        }
        check_name_chars("name suffix", &spec.name_suffix)?;
        if !suffixes.insert(spec.name_suffix.as_str()) {
            return Err(SweepError::InvalidSweep(format!(
                "duplicate run name '{}'",
                spec.run_name(base_run_name)
            )));
        }
        if spec.metrics_file.as_os_str().is_empty() {
            return Err(SweepError::InvalidSweep(format!(
                "run '{}' has no metrics file",
                spec.name_suffix
            )));
        }
        if !metrics_files.insert(spec.metrics_file.as_path()) {
            return Err(SweepError::InvalidSweep(format!(
                "metrics file {} is used by more than one run",
                spec.metrics_file.display()
            )));
        }
        if let Some((key, _)) = spec
            .args
            .iter()
            .find(|(key, _)| RESERVED_KEYS.contains(&key.as_str()))
        {
            return Err(SweepError::InvalidSweep(format!(
                "run '{}' overrides '{}', which is set by the sweep",
                spec.name_suffix, key
            )));
        }
    }

    Ok(())
}

fn validate_base_run_name(base_run_name: &str) -> Result<(), SweepError> {
    if base_run_name.is_empty() {
        return Err(SweepError::InvalidSweep(
            "base run name is empty".to_string(),
        ));
    }

    check_name_chars("base run name", base_run_name)
}

/// Names end up inside a `run_name=` token and a remote object name
fn check_name_chars(what: &str, name: &str) -> Result<(), SweepError> {
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '='))
    {
        return Err(SweepError::InvalidSweep(format!(
            "{} '{}' contains invalid character {:?}",
            what, name, bad
        )));
    }

    Ok(())
}

/// Overrides are written as an ordered array of single-entry tables in TOML:
/// `args = [{ steps = "150" }, { use_int8_training = "true" }]`
fn ordered_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let tables = Vec::<BTreeMap<String, String>>::deserialize(deserializer)?;
    tables
        .into_iter()
        .map(|table| {
            let mut entries = table.into_iter();
            match (entries.next(), entries.next()) {
                (Some(pair), None) => Ok(pair),
                _ => Err(D::Error::custom(
                    "each argument override must be a single key = value pair",
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_and_remote_names() {
        let spec = RunSpec::new("bfloat16", "bfloat16_metrics.txt");
        assert_eq!(spec.run_name("exp42"), "exp42-bfloat16");
        assert_eq!(spec.remote_metrics_name("exp42"), "exp42_metrics_bfloat16.txt");
    }

    #[test]
    fn test_default_runs() {
        let runs = default_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].name_suffix, "bfloat16");
        assert_eq!(runs[1].name_suffix, "aqt");
        assert_eq!(runs[0].metrics_file, PathBuf::from("bfloat16_metrics.txt"));
        assert_eq!(runs[1].metrics_file, PathBuf::from("aqt_metrics.txt"));

        let int8: Vec<&str> = runs
            .iter()
            .map(|r| {
                r.args
                    .iter()
                    .find(|(k, _)| k == "use_int8_training")
                    .map(|(_, v)| v.as_str())
                    .unwrap()
            })
            .collect();
        assert_eq!(int8, vec!["false", "true"]);

        assert!(runs[1].env[TUNING_ENV_VAR].contains("allow_int8"));
        assert!(!runs[0].env[TUNING_ENV_VAR].contains("allow_int8"));
        assert!(validate_sweep("exp42", &runs).is_ok());
    }

    #[test]
    fn test_argument_order_is_preserved() {
        let spec = RunSpec::new("x", "x.txt")
            .with_arg("steps", 10)
            .with_arg("base_emb_dim", 512);
        assert_eq!(spec.args[0].0, "steps");
        assert_eq!(spec.args[1].0, "base_emb_dim");
    }

    #[test]
    fn test_rejects_bad_base_names() {
        let runs = default_runs();
        for name in ["", "has space", "a/b", "a\\b", "k=v"] {
            assert!(
                matches!(validate_sweep(name, &runs), Err(SweepError::InvalidSweep(_))),
                "expected '{}' to be rejected",
                name
            );
        }
    }

    #[test]
    fn test_rejects_bad_suffix_characters() {
        for suffix in ["int 8", "a/b", "a\\b", "mode=aqt"] {
            let specs = vec![RunSpec::new(suffix, "m.txt")];
            let err = validate_sweep("exp42", &specs).unwrap_err();
            assert!(
                err.to_string().contains("name suffix"),
                "expected suffix '{}' to be rejected",
                suffix
            );
        }
    }

    #[test]
    fn test_rejects_empty_sweep() {
        assert!(matches!(
            validate_sweep("exp42", &[]),
            Err(SweepError::InvalidSweep(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_suffix() {
        let specs = vec![
            RunSpec::new("aqt", "a.txt"),
            RunSpec::new("aqt", "b.txt"),
        ];
        let err = validate_sweep("exp42", &specs).unwrap_err();
        assert!(err.to_string().contains("exp42-aqt"));
    }

    #[test]
    fn test_rejects_shared_metrics_file() {
        let specs = vec![
            RunSpec::new("a", "metrics.txt"),
            RunSpec::new("b", "metrics.txt"),
        ];
        assert!(validate_sweep("exp42", &specs).is_err());
    }

    #[test]
    fn test_rejects_reserved_override() {
        let specs = vec![RunSpec::new("a", "a.txt").with_arg("metrics_file", "other.txt")];
        let err = validate_sweep("exp42", &specs).unwrap_err();
        assert!(err.to_string().contains("metrics_file"));
    }

    #[test]
    fn test_toml_keeps_override_order() {
        let text = r#"
            name_suffix = "aqt"
            metrics_file = "aqt_metrics.txt"
            args = [{ steps = "20" }, { use_int8_training = "true" }]

            [env]
            LIBTPU_INIT_ARGS = "--flag=true"
        "#;
        let spec: RunSpec = toml::from_str(text).unwrap();
        assert_eq!(
            spec.args,
            vec![
                ("steps".to_string(), "20".to_string()),
                ("use_int8_training".to_string(), "true".to_string()),
            ]
        );
        assert_eq!(spec.env[TUNING_ENV_VAR], "--flag=true");
    }

    #[test]
    fn test_override_table_with_two_keys_is_rejected() {
        let text = r#"
            name_suffix = "aqt"
            metrics_file = "aqt_metrics.txt"
            args = [{ steps = "20", use_int8_training = "true" }]
        "#;
        assert!(toml::from_str::<RunSpec>(text).is_err());
    }
}
