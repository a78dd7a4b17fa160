// deploysync/src/database/adapter.rs
use crate::config::database::DatabaseConfig;
use crate::errors::{AppError, Result};

/// Database engine family, selected once from the `adapter` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Mysql,
    Postgresql,
}

impl Adapter {
    /// `mysql*` adapters (mysql, mysql2, ...) and `postgresql`/`pg`.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.starts_with("mysql") {
            Ok(Adapter::Mysql)
        } else if name == "postgresql" || name == "pg" {
            Ok(Adapter::Postgresql)
        } else {
            Err(AppError::UnsupportedAdapter(name.to_string()))
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::from_name(config.adapter.as_deref().unwrap_or_default())
    }

    /// Credential flags appended to the client invocations.
    ///
    /// Every clause keeps its surrounding spaces, so absent keys leave no
    /// trace and present keys always appear in the same order.
    pub fn credentials(self, config: &DatabaseConfig) -> String {
        let mut flags = String::new();
        match self {
            Adapter::Mysql => {
                if let Some(username) = config.username() {
                    flags.push_str(&format!(" -u {} ", username));
                }
                if let Some(password) = &config.password {
                    flags.push_str(&format!(" -p'{}' ", password));
                }
                if let Some(host) = &config.host {
                    flags.push_str(&format!(" -h {}", host));
                }
                if let Some(socket) = &config.socket {
                    flags.push_str(&format!(" -S{}", socket));
                }
            }
            Adapter::Postgresql => {
                if let Some(username) = config.username() {
                    flags.push_str(&format!(" -U {} ", username));
                }
                if let Some(host) = &config.host {
                    flags.push_str(&format!(" -h {}", host));
                }
            }
        }
        flags
    }

    /// `PGPASSWORD='...'` for postgres invocations; MySQL takes `-p` instead.
    pub fn password_env(self, config: &DatabaseConfig) -> Option<String> {
        match self {
            Adapter::Postgresql => config
                .password
                .as_ref()
                .map(|password| format!("PGPASSWORD='{}'", password)),
            Adapter::Mysql => None,
        }
    }
}
