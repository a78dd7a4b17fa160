// deploysync/src/assets/mod.rs
use anyhow::{Context, Result};
use log::info;

use crate::config::{DeployConfig, ServerConfig};
use crate::host::Host;
use crate::utils::shell_quote;

const RSYNC: &str = "rsync -a --del -L -K -vv --progress";

fn rsh(server: &ServerConfig) -> String {
    format!("--rsh='ssh -p {}'", server.port)
}

/// Pulls every `assets_dir` from the server into `local_assets_dir`.
pub fn remote_to_local_commands(settings: &DeployConfig, server: &ServerConfig) -> Vec<String> {
    settings
        .assets_dir
        .iter()
        .map(|dir| {
            format!(
                "{} {} {}:{}/{} {}",
                RSYNC,
                rsh(server),
                server.destination(),
                settings.current_path,
                dir,
                settings.local_assets_dir
            )
        })
        .collect()
}

/// Pushes every local `assets_dir` into `local_assets_dir` of the current release.
pub fn local_to_remote_commands(settings: &DeployConfig, server: &ServerConfig) -> Vec<String> {
    settings
        .assets_dir
        .iter()
        .map(|dir| {
            format!(
                "{} {} ./{} {}:{}/{}",
                RSYNC,
                rsh(server),
                dir,
                server.destination(),
                settings.current_path,
                settings.local_assets_dir
            )
        })
        .collect()
}

async fn run_all(host: &dyn Host, settings: &DeployConfig, commands: Vec<String>) -> Result<()> {
    for command in commands {
        let root = shell_quote(&settings.local_root.to_string_lossy());
        host.run_local(&format!("cd {} && {}", root, command))
            .await
            .context("Asset sync failed")?;
    }
    Ok(())
}

pub async fn remote_to_local(host: &dyn Host, settings: &DeployConfig, server: &ServerConfig) -> Result<()> {
    info!("⬇️ Syncing assets from {}", server.host);
    run_all(host, settings, remote_to_local_commands(settings, server)).await?;
    info!("✅ Completed assets sync");
    Ok(())
}

pub async fn local_to_remote(host: &dyn Host, settings: &DeployConfig, server: &ServerConfig) -> Result<()> {
    info!("⬆️ Syncing assets to {}", server.host);
    run_all(host, settings, local_to_remote_commands(settings, server)).await?;
    info!("✅ Completed assets sync");
    Ok(())
}
