// deploysync/src/host/ssh.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

use super::Host;
use crate::config::ServerConfig;
use crate::errors::AppError;
use crate::utils::find_executable;

/// Drives one server through the system `ssh` and `scp` clients.
pub struct SshHost {
    server: ServerConfig,
    ssh_path: PathBuf,
    scp_path: PathBuf,
    sh_path: PathBuf,
}

impl SshHost {
    pub fn new(server: &ServerConfig) -> Result<Self> {
        Ok(SshHost {
            server: server.clone(),
            ssh_path: find_executable("ssh")?,
            scp_path: find_executable("scp")?,
            sh_path: find_executable("sh")?,
        })
    }

    fn remote_spec(&self, path: &str) -> String {
        format!("{}:{}", self.server.destination(), path)
    }

    async fn ssh(&self, command: &str) -> Result<Output> {
        info!("🔧 executing on {}: {}", self.server.host, command);
        Command::new(&self.ssh_path)
            .arg("-p")
            .arg(self.server.port.to_string())
            .arg(self.server.destination())
            .arg(command)
            .output()
            .await
            .with_context(|| format!("Failed to run ssh to {}", self.server.host))
    }

    async fn scp(&self, from: &str, to: &str) -> Result<()> {
        info!("📦 copying {} -> {}", from, to);
        let output = Command::new(&self.scp_path)
            .arg("-P")
            .arg(self.server.port.to_string())
            .arg(from)
            .arg(to)
            .output()
            .await
            .with_context(|| format!("Failed to run scp for {}", from))?;
        check_status(&format!("scp {} {}", from, to), output)?;
        Ok(())
    }
}

/// Turns a non-zero exit into `AppError::CommandFailed`, otherwise hands back stdout.
pub(crate) fn check_status(command: &str, output: Output) -> Result<String> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(AppError::CommandFailed {
            command: command.to_string(),
            status: output.status.to_string(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into());
    }
    debug!("✓ {}", command);
    Ok(stdout)
}

#[async_trait]
impl Host for SshHost {
    async fn execute(&self, command: &str) -> Result<()> {
        let output = self.ssh(command).await?;
        check_status(command, output)?;
        Ok(())
    }

    async fn capture(&self, command: &str) -> Result<String> {
        let output = self.ssh(command).await?;
        check_status(command, output)
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let local = local.to_string_lossy();
        self.scp(&local, &self.remote_spec(remote)).await
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory for download: {}", parent.display()))?;
        }
        self.scp(&self.remote_spec(remote), &local.to_string_lossy()).await
    }

    async fn run_local(&self, command: &str) -> Result<()> {
        info!("💻 executing local: {}", command);
        let output = Command::new(&self.sh_path)
            .arg("-c")
            .arg(command)
            .output()
            .await
            .context("Failed to spawn local shell")?;
        check_status(command, output)?;
        Ok(())
    }
}

/// Built by hand so tests do not need ssh/scp installed.
#[cfg(test)]
pub(crate) fn test_host() -> SshHost {
    SshHost {
        server: ServerConfig {
            host: "app1".to_string(),
            user: Some("deploy".to_string()),
            port: 22,
            roles: vec!["db".to_string()],
        },
        ssh_path: PathBuf::from("ssh"),
        scp_path: PathBuf::from("scp"),
        sh_path: PathBuf::from("sh"),
    }
}
