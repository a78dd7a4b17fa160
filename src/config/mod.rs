// deploysync/src/config/mod.rs
pub mod database;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LOCAL_RAILS_ENV: &str = "development";
const DEFAULT_ASSETS_DIR: &str = "system";
const DEFAULT_LOCAL_ASSETS_DIR: &str = "public";
const DEFAULT_SSH_PORT: u16 = 22;

// Structs for deserializing deploy.json
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JsonAssetsDir {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonServer {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub stage: Option<String>,
    pub rails_env: Option<String>,
    pub local_rails_env: Option<String>,
    pub db_local_clean: Option<bool>,
    pub assets_dir: Option<JsonAssetsDir>,
    pub local_assets_dir: Option<String>,
    pub deploy_to: Option<String>,
    pub shared_path: Option<String>,
    pub current_path: Option<String>,
    pub release_path: Option<String>,
    #[serde(default)]
    pub servers: Vec<JsonServer>,
}

// Application's internal configuration structs
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub user: Option<String>,
    pub port: u16,
    pub roles: Vec<String>,
}

impl ServerConfig {
    /// `user@host`, or just `host` when no user is configured.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub rails_env: String,
    pub local_rails_env: String,
    pub db_local_clean: bool,
    pub assets_dir: Vec<String>,
    pub local_assets_dir: String,
    pub shared_path: String,
    pub current_path: String,
    pub release_path: String,
    pub servers: Vec<ServerConfig>,
    /// Local project directory holding `config/database.yml` and `db/`.
    pub local_root: PathBuf,
}

impl DeployConfig {
    pub fn load_from_json(config_path: &Path, local_root: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;

        Self::from_raw(raw_json_config, local_root, database::system_env)
    }

    /// Resolves defaults the way the deploy settings fall back to each other.
    pub fn from_raw<F>(raw: RawJsonConfig, local_root: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rails_env = raw
            .rails_env
            .clone()
            .or_else(|| raw.stage.clone())
            .context("rails_env (or stage) must be set in deploy.json")?;

        let local_rails_env = raw
            .local_rails_env
            .clone()
            .or_else(|| env("RAILS_ENV"))
            .unwrap_or_else(|| DEFAULT_LOCAL_RAILS_ENV.to_string());

        let deploy_to = raw.deploy_to.as_deref().map(|d| d.trim_end_matches('/'));
        let shared_path = resolve_path(raw.shared_path, deploy_to, "shared")
            .context("shared_path (or deploy_to) must be set in deploy.json")?;
        let current_path = resolve_path(raw.current_path, deploy_to, "current")
            .context("current_path (or deploy_to) must be set in deploy.json")?;
        let release_path = raw.release_path.unwrap_or_else(|| current_path.clone());

        let assets_dir = match raw.assets_dir {
            Some(JsonAssetsDir::One(dir)) => vec![dir],
            Some(JsonAssetsDir::Many(dirs)) => dirs,
            None => vec![DEFAULT_ASSETS_DIR.to_string()],
        };

        if raw.servers.is_empty() {
            return Err(anyhow::anyhow!("servers must list at least one server in deploy.json"));
        }
        let servers = raw
            .servers
            .into_iter()
            .map(|s| ServerConfig {
                host: s.host,
                user: s.user.filter(|u| !u.is_empty()),
                port: s.port.unwrap_or(DEFAULT_SSH_PORT),
                roles: s
                    .roles
                    .unwrap_or_else(|| vec!["app".to_string(), "db".to_string()]),
            })
            .collect();

        Ok(DeployConfig {
            rails_env,
            local_rails_env,
            db_local_clean: raw.db_local_clean.unwrap_or(false),
            assets_dir,
            local_assets_dir: raw
                .local_assets_dir
                .unwrap_or_else(|| DEFAULT_LOCAL_ASSETS_DIR.to_string()),
            shared_path,
            current_path,
            release_path,
            servers,
            local_root: local_root.to_path_buf(),
        })
    }

    /// First server carrying `role`.
    pub fn server_for(&self, role: &str) -> Result<&ServerConfig> {
        self.servers
            .iter()
            .find(|s| s.has_role(role))
            .with_context(|| format!("No server with role '{}' configured in deploy.json", role))
    }
}

fn resolve_path(explicit: Option<String>, deploy_to: Option<&str>, leaf: &str) -> Option<String> {
    explicit.or_else(|| deploy_to.map(|d| format!("{}/{}", d, leaf)))
}
