// deploysync/src/database/mod.rs
pub(crate) mod adapter;
pub(crate) mod commands;
pub(crate) mod endpoint;

use anyhow::{Context, Result};
use log::info;

use crate::config::DeployConfig;
use crate::errors::AppError;
use crate::host::Host;
use endpoint::{Endpoint, LocalDatabase, ReadOnlyRemoteDatabase, RemoteDatabase, SourceOptions};

/// Both sides must be the same engine family; cross-engine sync is refused
/// before anything is dumped.
pub fn check(a: &Endpoint, b: &Endpoint) -> Result<()> {
    if a.adapter() != b.adapter() {
        return Err(AppError::UnsupportedAdapterPair.into());
    }
    Ok(())
}

/// Replaces the local database with the server's.
pub async fn remote_to_local(host: &dyn Host, settings: &DeployConfig) -> Result<()> {
    let local_db = LocalDatabase::new(host, settings)?;
    let remote_db = RemoteDatabase::new(host, settings).await?;

    check(local_db.endpoint(), remote_db.endpoint())?;

    info!("⬇️ Syncing {} -> local {}", remote_db.endpoint().database(), local_db.endpoint().database());
    remote_db.dump().await?.download(None).await?;
    local_db
        .load(remote_db.output_file(), settings.db_local_clean)
        .await
        .context("Remote to local database sync failed")
}

/// Replaces the server's database with the local one.
pub async fn local_to_remote(host: &dyn Host, settings: &DeployConfig) -> Result<()> {
    let local_db = LocalDatabase::new(host, settings)?;
    let remote_db = RemoteDatabase::new(host, settings).await?;

    check(local_db.endpoint(), remote_db.endpoint())?;

    info!("⬆️ Syncing local {} -> {}", local_db.endpoint().database(), remote_db.endpoint().database());
    local_db.dump().await?.upload().await?;
    remote_db
        .load(local_db.output_file(), settings.db_local_clean)
        .await
        .context("Local to remote database sync failed")
}

/// Replaces the deployed database with another one reachable from the same
/// server. The dump is written into the release directory the destination
/// loads from, so no copy between hosts is needed.
pub async fn remote_to_remote(host: &dyn Host, settings: &DeployConfig, options: &SourceOptions) -> Result<()> {
    let destination_db = RemoteDatabase::new(host, settings).await?;
    let source_db = ReadOnlyRemoteDatabase::new(host, settings, options).await?;

    check(destination_db.endpoint(), source_db.endpoint())?;

    info!("🔁 Syncing {} -> {}", source_db.endpoint().database(), destination_db.endpoint().database());
    source_db.dump().await?;
    destination_db
        .load(source_db.output_file(), settings.db_local_clean)
        .await
        .context("Remote to remote database sync failed")
}
