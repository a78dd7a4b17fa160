// deploysync/src/host/mock.rs
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::Host;
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Execute(String),
    Capture(String),
    Upload(PathBuf, String),
    Download(String, PathBuf),
    Local(String),
}

/// Records every call; `capture` answers with the configured remote file.
/// With `failing_at(n)` the n-th (0-based) mutating call is recorded and
/// then fails like a command with a non-zero exit.
#[derive(Default)]
pub struct MockHost {
    pub remote_database_yml: String,
    calls: Mutex<Vec<Call>>,
    fail_at: Option<usize>,
}

impl MockHost {
    pub fn with_remote_database_yml(content: &str) -> Self {
        MockHost {
            remote_database_yml: content.to_string(),
            calls: Mutex::new(Vec::new()),
            fail_at: None,
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Calls other than reading configuration.
    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Capture(_)))
            .collect()
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut calls = self.calls.lock().expect("calls lock");
        let index = calls.iter().filter(|c| !matches!(c, Call::Capture(_))).count();
        let failing = !matches!(call, Call::Capture(_)) && self.fail_at == Some(index);
        let command = format!("{:?}", call);
        calls.push(call);
        if failing {
            return Err(AppError::CommandFailed {
                command,
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: "simulated failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl Host for MockHost {
    async fn execute(&self, command: &str) -> Result<()> {
        self.record(Call::Execute(command.to_string()))
    }

    async fn capture(&self, command: &str) -> Result<String> {
        self.record(Call::Capture(command.to_string()))?;
        Ok(self.remote_database_yml.clone())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        self.record(Call::Upload(local.to_path_buf(), remote.to_string()))
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        self.record(Call::Download(remote.to_string(), local.to_path_buf()))
    }

    async fn run_local(&self, command: &str) -> Result<()> {
        self.record(Call::Local(command.to_string()))
    }
}
