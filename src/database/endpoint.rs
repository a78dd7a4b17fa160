// deploysync/src/database/endpoint.rs
use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use super::adapter::Adapter;
use super::commands::{compressed_dump_command, import_command, output_file_name, unzipped_path};
use crate::config::DeployConfig;
use crate::config::database::{DatabaseConfig, load_database_yml, parse_database_yml, system_env};
use crate::errors::AppError;
use crate::host::Host;
use crate::utils::shell_quote;

/// One configured database and the artifact it dumps to.
#[derive(Debug)]
pub struct Endpoint {
    config: DatabaseConfig,
    adapter: Adapter,
    output_file: OnceLock<String>,
}

impl Endpoint {
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let adapter = Adapter::from_config(&config)?;
        Ok(Endpoint {
            config,
            adapter,
            output_file: OnceLock::new(),
        })
    }

    pub fn adapter(&self) -> Adapter {
        self.adapter
    }

    #[cfg(test)]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        self.config.database()
    }

    /// Relative artifact path, fixed on first use so dump, transfer and load
    /// all agree on it.
    pub fn output_file(&self) -> &str {
        self.output_file
            .get_or_init(|| output_file_name(self.database(), Local::now()))
    }

    fn dump_command(&self) -> String {
        compressed_dump_command(self.adapter, &self.config, self.output_file())
    }

    fn import_command(&self, file: &str) -> String {
        import_command(self.adapter, &self.config, file)
    }
}

fn leave_message(unzip_file: &str) {
    info!(
        "leaving {} (set db_local_clean in deploy.json to remove)",
        unzip_file
    );
}

/// Database on the machine running the tool, read from `config/database.yml`.
pub struct LocalDatabase<'a> {
    endpoint: Endpoint,
    host: &'a dyn Host,
    root: PathBuf,
    release_path: String,
}

impl<'a> LocalDatabase<'a> {
    pub fn new(host: &'a dyn Host, settings: &DeployConfig) -> Result<Self> {
        let path = settings.local_root.join("config").join("database.yml");
        let config = load_database_yml(&path, &settings.local_rails_env).with_context(|| {
            format!(
                "Failed to load local database configuration for '{}'",
                settings.local_rails_env
            )
        })?;
        let endpoint = Endpoint::new(config)?;
        info!(
            "local {} database: {}",
            settings.local_rails_env,
            endpoint.database()
        );

        Ok(LocalDatabase {
            endpoint,
            host,
            root: settings.local_root.clone(),
            release_path: settings.release_path.clone(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn output_file(&self) -> &str {
        self.endpoint.output_file()
    }

    pub async fn dump(&self) -> Result<&Self> {
        let db_dir = self.root.join("db");
        fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create dump directory: {}", db_dir.display()))?;

        let command = format!(
            "cd {} && {}",
            shell_quote(&self.root.to_string_lossy()),
            self.endpoint.dump_command()
        );
        self.host
            .run_local(&command)
            .await
            .with_context(|| format!("Failed to dump local database {}", self.endpoint.database()))?;
        Ok(self)
    }

    pub async fn upload(&self) -> Result<()> {
        let output_file = self.output_file();
        let remote_file = format!("{}/{}", self.release_path, output_file);
        self.host
            .upload(&self.root.join(output_file), &remote_file)
            .await
            .with_context(|| format!("Failed to upload {}", output_file))
    }

    /// Decompresses and imports `file`; `cleanup` removes the decompressed
    /// SQL afterwards, otherwise it stays in `db/`.
    pub async fn load(&self, file: &str, cleanup: bool) -> Result<()> {
        let unzip_file = unzipped_path(file);
        let command = format!(
            "cd {} && bunzip2 -f {} && {}",
            shell_quote(&self.root.to_string_lossy()),
            file,
            self.endpoint.import_command(&unzip_file)
        );
        self.host
            .run_local(&command)
            .await
            .with_context(|| format!("Failed to import {} into local database", file))?;

        if cleanup {
            info!("removing {}", unzip_file);
            let path = self.root.join(&unzip_file);
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        } else {
            leave_message(&unzip_file);
        }
        info!("✅ Completed database import");
        Ok(())
    }
}

/// Database of the deployed application, configured by the shared
/// `config/database.yml` on the server.
pub struct RemoteDatabase<'a> {
    endpoint: Endpoint,
    host: &'a dyn Host,
    release_path: String,
    local_root: PathBuf,
}

impl<'a> RemoteDatabase<'a> {
    pub async fn new(host: &'a dyn Host, settings: &DeployConfig) -> Result<Self> {
        let config = fetch_remote_config(host, settings, &settings.rails_env).await?;
        Self::with_config(host, settings, config)
    }

    fn with_config(host: &'a dyn Host, settings: &DeployConfig, config: DatabaseConfig) -> Result<Self> {
        Ok(RemoteDatabase {
            endpoint: Endpoint::new(config)?,
            host,
            release_path: settings.release_path.clone(),
            local_root: settings.local_root.clone(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn output_file(&self) -> &str {
        self.endpoint.output_file()
    }

    pub async fn dump(&self) -> Result<&Self> {
        let command = format!(
            "cd {} && mkdir -p db && {}",
            shell_quote(&self.release_path),
            self.endpoint.dump_command()
        );
        self.host
            .execute(&command)
            .await
            .with_context(|| format!("Failed to dump remote database {}", self.endpoint.database()))?;
        Ok(self)
    }

    /// Copies the dump down to `local_file` (relative to the project root),
    /// defaulting to the same relative path as on the server.
    pub async fn download(&self, local_file: Option<&str>) -> Result<()> {
        let output_file = self.output_file();
        let remote_file = format!("{}/{}", self.release_path, output_file);
        let local_file = self.local_root.join(local_file.unwrap_or(output_file));
        self.host
            .download(&remote_file, &local_file)
            .await
            .with_context(|| format!("Failed to download {}", remote_file))
    }

    pub async fn load(&self, file: &str, cleanup: bool) -> Result<()> {
        let unzip_file = unzipped_path(file);
        let command = format!(
            "cd {} && bunzip2 -f {} && {}",
            shell_quote(&self.release_path),
            file,
            self.endpoint.import_command(&unzip_file)
        );
        self.host
            .execute(&command)
            .await
            .with_context(|| format!("Failed to import {} into remote database", file))?;

        if cleanup {
            info!("removing {} on server", unzip_file);
            self.host
                .execute(&format!("cd {} && rm {}", shell_quote(&self.release_path), unzip_file))
                .await
                .with_context(|| format!("Failed to remove {}", unzip_file))?;
        } else {
            leave_message(&unzip_file);
        }
        info!("✅ Completed database import");
        Ok(())
    }
}

async fn fetch_remote_config(
    host: &dyn Host,
    settings: &DeployConfig,
    environment: &str,
) -> Result<DatabaseConfig> {
    let content = host
        .capture(&format!("cat {}/config/database.yml", settings.shared_path))
        .await
        .context("Failed to read remote database configuration")?;
    let config = parse_database_yml(&content, environment, system_env).with_context(|| {
        format!(
            "Failed to load remote database configuration for '{}'",
            environment
        )
    })?;
    Ok(config)
}

/// Where the source of a remote-to-remote sync is described.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOptions {
    /// Another environment of the remote `database.yml`.
    Environment(String),
    /// Connection details overriding the deployed environment's settings.
    Explicit {
        database: Option<String>,
        username: Option<String>,
        password: Option<String>,
        host: Option<String>,
    },
}

/// Dump-only source of a remote-to-remote sync.
pub struct ReadOnlyRemoteDatabase<'a> {
    remote: RemoteDatabase<'a>,
}

impl<'a> ReadOnlyRemoteDatabase<'a> {
    pub async fn new(host: &'a dyn Host, settings: &DeployConfig, options: &SourceOptions) -> Result<Self> {
        let config = match options {
            SourceOptions::Environment(environment) => {
                fetch_remote_config(host, settings, environment).await?
            }
            SourceOptions::Explicit {
                database,
                username,
                password,
                host: db_host,
            } => {
                let mut config = fetch_remote_config(host, settings, &settings.rails_env).await?;
                config.database = database.clone();
                config.username = username.clone();
                config.user = None;
                config.password = password.clone();
                config.host = db_host.clone();
                config.validate("source")?;
                config
            }
        };

        Ok(ReadOnlyRemoteDatabase {
            remote: RemoteDatabase::with_config(host, settings, config)?,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.remote.endpoint()
    }

    pub fn output_file(&self) -> &str {
        self.remote.output_file()
    }

    pub async fn dump(&self) -> Result<&Self> {
        self.remote.dump().await?;
        Ok(self)
    }

    pub async fn load(&self, _file: &str, _cleanup: bool) -> Result<()> {
        Err(AppError::ReadOnly.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::{settings_for, write_local_yml, PG_REMOTE_YML};
    use crate::host::mock::{Call, MockHost};

    #[test]
    fn test_output_file_is_memoized() -> anyhow::Result<()> {
        let endpoint = Endpoint::new(DatabaseConfig {
            adapter: Some("pg".to_string()),
            database: Some("app".to_string()),
            ..Default::default()
        })?;
        let first = endpoint.output_file().to_string();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(endpoint.output_file(), first);
        assert!(first.starts_with("db/app_") && first.ends_with(".sql.bz2"));
        Ok(())
    }

    #[test]
    fn test_endpoint_rejects_unknown_adapter() {
        let result = Endpoint::new(DatabaseConfig {
            adapter: Some("sqlite3".to_string()),
            database: Some("app".to_string()),
            ..Default::default()
        });
        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::UnsupportedAdapter(_))));
    }

    #[tokio::test]
    async fn test_local_load_with_cleanup_removes_sql() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_local_yml(dir.path(), "development:\n  adapter: postgresql\n  database: app_dev\n")?;
        let settings = settings_for(dir.path(), false);
        let host = MockHost::default();
        let local = LocalDatabase::new(&host, &settings)?;

        fs::create_dir_all(dir.path().join("db"))?;
        let unzipped = dir.path().join("db/app_20240101-000000.sql");
        fs::write(&unzipped, "-- dump")?;

        local.load("db/app_20240101-000000.sql.bz2", true).await?;
        assert!(!unzipped.exists());

        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::Local(command) => {
                assert!(command.contains("bunzip2 -f db/app_20240101-000000.sql.bz2 && "));
                assert!(command.ends_with("psql  -d app_dev < db/app_20240101-000000.sql"));
            }
            other => panic!("unexpected call {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_local_load_without_cleanup_leaves_sql() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_local_yml(dir.path(), "development:\n  adapter: mysql2\n  database: shop\n")?;
        let settings = settings_for(dir.path(), false);
        let host = MockHost::default();
        let local = LocalDatabase::new(&host, &settings)?;

        fs::create_dir_all(dir.path().join("db"))?;
        let unzipped = dir.path().join("db/shop_1.sql");
        fs::write(&unzipped, "-- dump")?;

        local.load("db/shop_1.sql.bz2", false).await?;
        assert!(unzipped.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_local_dump_creates_db_dir_and_compresses() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_local_yml(dir.path(), "development:\n  adapter: mysql2\n  database: shop\n  username: root\n")?;
        let settings = settings_for(dir.path(), false);
        let host = MockHost::default();
        let local = LocalDatabase::new(&host, &settings)?;

        local.dump().await?.upload().await?;
        assert!(dir.path().join("db").is_dir());

        let calls = host.calls();
        let output_file = local.output_file();
        assert_eq!(
            calls[0],
            Call::Local(format!(
                "cd {} && {}",
                dir.path().display(),
                compressed_dump_command(Adapter::Mysql, local.endpoint().config(), output_file)
            ))
        );
        assert_eq!(
            calls[1],
            Call::Upload(dir.path().join(output_file), format!("/srv/app/current/{}", output_file))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_local_commands_quote_project_root() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("my app");
        write_local_yml(&root, "development:\n  adapter: postgresql\n  database: app_dev\n")?;
        let settings = settings_for(&root, false);
        let host = MockHost::default();
        let local = LocalDatabase::new(&host, &settings)?;

        local.dump().await?;
        local.load("db/app_1.sql.bz2", false).await?;

        let quoted = format!("cd '{}' && ", root.display());
        let calls = host.calls();
        assert_eq!(calls.len(), 2);
        for call in &calls {
            assert!(matches!(call, Call::Local(c) if c.starts_with(&quoted)), "{:?}", call);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_load_cleanup_contract() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings_for(dir.path(), false);

        let host = MockHost::with_remote_database_yml(PG_REMOTE_YML);
        let remote = RemoteDatabase::new(&host, &settings).await?;
        remote.load("db/a.sql.bz2", true).await?;
        let executed = host.mutating_calls();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[1], Call::Execute("cd /srv/app/current && rm db/a.sql".to_string()));

        let host = MockHost::with_remote_database_yml(PG_REMOTE_YML);
        let remote = RemoteDatabase::new(&host, &settings).await?;
        remote.load("db/a.sql.bz2", false).await?;
        let executed = host.mutating_calls();
        assert_eq!(executed.len(), 1);
        match &executed[0] {
            Call::Execute(command) => {
                assert!(command.starts_with("cd /srv/app/current && bunzip2 -f db/a.sql.bz2 && PGPASSWORD='pw' psql -c"));
            }
            other => panic!("unexpected call {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_dump_and_download_use_same_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings_for(dir.path(), false);
        let host = MockHost::with_remote_database_yml(PG_REMOTE_YML);
        let remote = RemoteDatabase::new(&host, &settings).await?;

        remote.dump().await?.download(None).await?;
        let output_file = remote.output_file().to_string();
        let calls = host.mutating_calls();
        assert_eq!(
            calls[0],
            Call::Execute(format!(
                "cd /srv/app/current && mkdir -p db && PGPASSWORD='pw' pg_dump --no-acl --no-owner  -U app  -h db.internal app_production > {} && bzip2 -f {}",
                unzipped_path(&output_file),
                unzipped_path(&output_file)
            ))
        );
        assert_eq!(
            calls[1],
            Call::Download(format!("/srv/app/current/{}", output_file), dir.path().join(&output_file))
        );
        assert_eq!(
            host.calls()[0],
            Call::Capture("cat /srv/app/shared/config/database.yml".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_read_only_load_always_fails_without_commands() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings_for(dir.path(), false);
        let host = MockHost::with_remote_database_yml(PG_REMOTE_YML);
        let source = ReadOnlyRemoteDatabase::new(
            &host,
            &settings,
            &SourceOptions::Environment("staging".to_string()),
        )
        .await?;

        for (file, cleanup) in [("db/a.sql.bz2", true), ("", false)] {
            let err = source.load(file, cleanup).await.unwrap_err();
            assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::ReadOnly)));
        }
        assert!(host.mutating_calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_read_only_source_from_environment() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings_for(dir.path(), false);
        let host = MockHost::with_remote_database_yml(PG_REMOTE_YML);
        let source = ReadOnlyRemoteDatabase::new(
            &host,
            &settings,
            &SourceOptions::Environment("staging".to_string()),
        )
        .await?;
        assert_eq!(source.endpoint().database(), "app_staging");
        assert_eq!(source.endpoint().config().password, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_only_source_explicit_overrides() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let settings = settings_for(dir.path(), false);
        let host = MockHost::with_remote_database_yml(PG_REMOTE_YML);
        let source = ReadOnlyRemoteDatabase::new(
            &host,
            &settings,
            &SourceOptions::Explicit {
                database: Some("legacy".to_string()),
                username: Some("reader".to_string()),
                password: None,
                host: Some("old-db".to_string()),
            },
        )
        .await?;
        let config = source.endpoint().config();
        assert_eq!(source.endpoint().adapter(), Adapter::Postgresql);
        assert_eq!(config.database(), "legacy");
        assert_eq!(config.username(), Some("reader"));
        assert_eq!(config.password, None);
        assert_eq!(config.host.as_deref(), Some("old-db"));

        let missing_db = ReadOnlyRemoteDatabase::new(
            &host,
            &settings,
            &SourceOptions::Explicit {
                database: None,
                username: None,
                password: None,
                host: None,
            },
        )
        .await;
        assert!(missing_db.is_err());
        Ok(())
    }
}
