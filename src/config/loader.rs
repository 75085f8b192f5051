// Configuration loader
// Loads sweep settings from a TOML file, then applies environment overrides

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::SweepConfig;

/// Explicit config file path
pub const CONFIG_PATH_ENV: &str = "QUANT_SWEEP_CONFIG";
/// Overrides `archive.bucket_root`
pub const BUCKET_ENV: &str = "QUANT_SWEEP_BUCKET";
/// Overrides `settle_delay_secs`
pub const SETTLE_SECS_ENV: &str = "QUANT_SWEEP_SETTLE_SECS";

/// Load configuration from `$QUANT_SWEEP_CONFIG`, `~/.quant-sweep/config.toml`,
/// or built-in defaults, then apply `QUANT_SWEEP_*` environment overrides
pub fn load_config() -> Result<SweepConfig> {
    let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            if !path.exists() {
                bail!(
                    "{} points to {}, which does not exist",
                    CONFIG_PATH_ENV,
                    path.display()
                );
            }
            load_from_file(&path)?
        }
        _ => match default_config_path() {
            Some(path) if path.exists() => load_from_file(&path)?,
            _ => SweepConfig::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// `~/.quant-sweep/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".quant-sweep").join("config.toml"))
}

pub fn load_from_file(path: &Path) -> Result<SweepConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: SweepConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::debug!(path = %path.display(), runs = config.runs.len(), "Loaded sweep config");
    Ok(config)
}

fn apply_env_overrides(
    config: &mut SweepConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(bucket) = lookup(BUCKET_ENV).filter(|v| !v.is_empty()) {
        config.archive.bucket_root = bucket;
    }

    if let Some(secs) = lookup(SETTLE_SECS_ENV).filter(|v| !v.is_empty()) {
        config.settle_delay_secs = secs
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", SETTLE_SECS_ENV, secs))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            summary_lines = 5

            [trainer]
            program = "python"
            config_file = "configs/base.yml"
            "#,
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.summary_lines, 5);
        assert_eq!(config.trainer.program, "python");
        // unspecified trainer fields fall back to defaults
        assert!(config.trainer.script.is_some());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "settle_delay_secs = [").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (BUCKET_ENV, "gs://elsewhere/runs"),
            (SETTLE_SECS_ENV, "0"),
        ]);
        let mut config = SweepConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.archive.bucket_root, "gs://elsewhere/runs");
        assert_eq!(config.settle_delay_secs, 0);
    }

    #[test]
    fn test_bad_settle_override() {
        let mut config = SweepConfig::default();
        let result = apply_env_overrides(&mut config, |k| {
            (k == SETTLE_SECS_ENV).then(|| "soon".to_string())
        });
        assert!(result.is_err());
        assert_eq!(config.settle_delay_secs, 60);
    }
}
