// deploysync/src/tasks/mod.rs
use anyhow::Result;
use log::info;

use crate::assets;
use crate::config::DeployConfig;
use crate::database::{self, endpoint::LocalDatabase, endpoint::SourceOptions};
use crate::errors::AppError;
use crate::host::Host;
use crate::utils::prompt::Prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    DbRemoteSync,
    DbRemotePull,
    DbLocalSync,
    AssetsRemoteSync,
    AssetsLocalSync,
    AppRemoteSync,
    AppLocalSync,
}

impl Task {
    pub const ALL: [Task; 7] = [
        Task::DbRemoteSync,
        Task::DbRemotePull,
        Task::DbLocalSync,
        Task::AssetsRemoteSync,
        Task::AssetsLocalSync,
        Task::AppRemoteSync,
        Task::AppLocalSync,
    ];

    /// Accepts the task name or its push/pull alias.
    pub fn from_name(name: &str) -> Result<Self, AppError> {
        let task = match name {
            "db:remote:sync" | "db:push" => Task::DbRemoteSync,
            "db:remote:pull" => Task::DbRemotePull,
            "db:local:sync" | "db:pull" => Task::DbLocalSync,
            "assets:remote:sync" | "assets:push" => Task::AssetsRemoteSync,
            "assets:local:sync" | "assets:pull" => Task::AssetsLocalSync,
            "app:remote:sync" | "app:push" => Task::AppRemoteSync,
            "app:local:sync" | "app:pull" => Task::AppLocalSync,
            other => return Err(AppError::InvalidInput(format!("unknown task '{}'", other))),
        };
        Ok(task)
    }

    pub fn name(self) -> &'static str {
        match self {
            Task::DbRemoteSync => "db:remote:sync",
            Task::DbRemotePull => "db:remote:pull",
            Task::DbLocalSync => "db:local:sync",
            Task::AssetsRemoteSync => "assets:remote:sync",
            Task::AssetsLocalSync => "assets:local:sync",
            Task::AppRemoteSync => "app:remote:sync",
            Task::AppLocalSync => "app:local:sync",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Task::DbRemoteSync => "Synchronize your remote database using local database data",
            Task::DbRemotePull => "Synchronize your remote database with other remote database data",
            Task::DbLocalSync => "Synchronize your local database using remote database data",
            Task::AssetsRemoteSync => "Synchronize your remote assets using local assets",
            Task::AssetsLocalSync => "Synchronize your local assets using remote assets",
            Task::AppRemoteSync => "Synchronize your remote assets AND database using local assets and database",
            Task::AppLocalSync => "Synchronize your local assets AND database using remote assets and database",
        }
    }

    /// Server role the task's remote commands go to.
    pub fn role(self) -> &'static str {
        match self {
            Task::AssetsRemoteSync | Task::AssetsLocalSync => "app",
            _ => "db",
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn declined(task: Task) -> Result<()> {
    info!("🚫 {} aborted, nothing was changed", task.name());
    Ok(())
}

/// Runs `task` against `host` once the user has agreed to it.
pub async fn run_task(
    task: Task,
    source_env: Option<&str>,
    host: &dyn Host,
    settings: &DeployConfig,
    prompt: &mut dyn Prompt,
) -> Result<()> {
    let assets_dir = settings.assets_dir.join(" ");

    match task {
        Task::DbRemoteSync => {
            if !prompt.confirm("Are you sure you want to REPLACE THE REMOTE DATABASE with local database")? {
                return declined(task);
            }
            database::local_to_remote(host, settings).await
        }
        Task::DbRemotePull => {
            let (label, options) = match source_env {
                Some(env) => (env.to_string(), SourceOptions::Environment(env.to_string())),
                None => {
                    let database = non_empty(prompt.ask("Source Database Name")?);
                    let username = non_empty(prompt.ask("Source Database User Name")?);
                    let password = non_empty(prompt.ask("Source Database Password")?);
                    let db_host = non_empty(prompt.ask("Source Database Host Name")?);
                    let label = database.clone().unwrap_or_default();
                    let options = SourceOptions::Explicit {
                        database,
                        username,
                        password,
                        host: db_host,
                    };
                    (label, options)
                }
            };
            let message = format!(
                "Are you sure you want to REPLACE {} DATABASE with {} database",
                settings.rails_env, label
            );
            if !prompt.confirm(&message)? {
                return declined(task);
            }
            database::remote_to_remote(host, settings, &options).await
        }
        Task::DbLocalSync => {
            println!("Local database: {}", LocalDatabase::new(host, settings)?.endpoint().database());
            if !prompt.confirm("Are you sure you want to erase your local database with server database")? {
                return declined(task);
            }
            database::remote_to_local(host, settings).await
        }
        Task::AssetsRemoteSync => {
            println!("Assets directories: {}", assets_dir);
            if !prompt.confirm("Are you sure you want to erase your server assets with local assets")? {
                return declined(task);
            }
            assets::local_to_remote(host, settings, settings.server_for("app")?).await
        }
        Task::AssetsLocalSync => {
            println!("Assets directories: {}", settings.local_assets_dir);
            if !prompt.confirm("Are you sure you want to erase your local assets with server assets")? {
                return declined(task);
            }
            assets::remote_to_local(host, settings, settings.server_for("app")?).await
        }
        Task::AppRemoteSync => {
            let message = format!(
                "Are you sure you want to REPLACE THE REMOTE DATABASE AND your remote assets with local database and assets({})",
                assets_dir
            );
            if !prompt.confirm(&message)? {
                return declined(task);
            }
            database::local_to_remote(host, settings).await?;
            assets::local_to_remote(host, settings, settings.server_for("app")?).await
        }
        Task::AppLocalSync => {
            println!("Local database     : {}", LocalDatabase::new(host, settings)?.endpoint().database());
            println!("Assets directories : {}", settings.local_assets_dir);
            let message = format!(
                "Are you sure you want to erase your local database AND your local assets with server database and assets({})",
                assets_dir
            );
            if !prompt.confirm(&message)? {
                return declined(task);
            }
            database::remote_to_local(host, settings).await?;
            assets::remote_to_local(host, settings, settings.server_for("app")?).await
        }
    }
}
