// Command-line object storage copy
//
// Shells out to a copy tool (`gsutil cp` by default) for each archived file.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::{Archiver, RemoteUri};
use crate::config::ArchiveConfig;
use crate::errors::SweepError;

/// Archiver that runs `<program> <args...> <local> <remote>`
#[derive(Debug, Clone)]
pub struct CommandArchiver {
    program: String,
    args: Vec<String>,
}

impl CommandArchiver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn failure(&self, local: &Path, remote: &RemoteUri, reason: String) -> SweepError {
        SweepError::ArchiveFailure {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Archiver for CommandArchiver {
    async fn copy(&self, local: &Path, remote: &RemoteUri) -> Result<(), SweepError> {
        if !local.is_file() {
            return Err(self.failure(local, remote, "local file does not exist".to_string()));
        }

        info!(local = %local.display(), remote = %remote, "Archiving metrics file");
        debug!(program = %self.program, args = ?self.args, "Archive command");

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(local)
            .arg(remote.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.failure(local, remote, format!("could not run '{}': {}", self.program, e)))?;

        if !status.success() {
            let reason = match status.code() {
                Some(code) => format!("'{}' exited with code {}", self.program, code),
                None => format!("'{}' was terminated by a signal", self.program),
            };
            return Err(self.failure(local, remote, reason));
        }

        Ok(())
    }
}
