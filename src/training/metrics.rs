// Metrics file summary
//
// The trainer writes one metric record per line; a run's status report is the
// tail of that file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::SweepError;

/// Number of trailing lines reported per run
pub const DEFAULT_SUMMARY_LINES: usize = 3;

/// Tail of one finished run's metrics file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_name: String,
    pub metrics_path: PathBuf,
    /// Last lines of the file, verbatim and in file order
    pub lines: Vec<String>,
    pub duration: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} finished in {:.1}s; last {} line(s) of {}:",
            self.run_name,
            self.duration.as_secs_f64(),
            self.lines.len(),
            self.metrics_path.display()
        )?;
        for line in &self.lines {
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }
}

/// Last `count` lines of `content`, or all of them if there are fewer
pub fn tail_lines(content: &str, count: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Read the metrics file and keep its tail
pub async fn read_tail(path: &Path, count: usize) -> Result<Vec<String>, SweepError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| SweepError::MetricsMissing {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(tail_lines(&String::from_utf8_lossy(&bytes), count))
}
