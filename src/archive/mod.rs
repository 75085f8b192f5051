// Archive module
// Copies finished metrics files to remote object storage

use async_trait::async_trait;
use std::path::Path;

use crate::errors::SweepError;

mod command;
mod uri;

pub use command::CommandArchiver;
pub use uri::RemoteUri;

/// Copies a local file to a remote object URI
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Any failure is `SweepError::ArchiveFailure`
    async fn copy(&self, local: &Path, remote: &RemoteUri) -> Result<(), SweepError>;
}
