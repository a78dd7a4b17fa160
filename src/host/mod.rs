// deploysync/src/host/mod.rs
pub(crate) mod ssh;
#[cfg(test)]
pub(crate) mod mock;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// What the sync flows need from the machine they drive.
///
/// Remote calls target one application server; `run_local` runs a shell
/// command on the machine the tool is started on. Every call waits for the
/// command to finish and fails on a non-zero exit.
#[async_trait]
pub trait Host: Send + Sync {
    /// Runs `command` on the remote server.
    async fn execute(&self, command: &str) -> Result<()>;

    /// Runs `command` on the remote server and returns its stdout.
    async fn capture(&self, command: &str) -> Result<String>;

    /// Copies a local file to `remote` on the server.
    async fn upload(&self, local: &Path, remote: &str) -> Result<()>;

    /// Copies `remote` from the server to a local file.
    async fn download(&self, remote: &str, local: &Path) -> Result<()>;

    /// Runs `command` through the local shell.
    async fn run_local(&self, command: &str) -> Result<()>;
}
