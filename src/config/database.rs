// deploysync/src/config/database.rs
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::errors::{AppError, Result};

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<%([=#]?)(.*?)-?%>").expect("template tag pattern is valid")
});

static ENV_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^ENV\[\s*['"](\w+)['"]\s*\](?:\s*\|\|\s*(.+))?$"#)
        .expect("ENV index pattern is valid")
});

static ENV_FETCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^ENV\.fetch\(\s*['"](\w+)['"]\s*(?:,\s*(.+?))?\s*\)(?:\s*\{\s*(.+?)\s*\})?$"#)
        .expect("ENV.fetch pattern is valid")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("number pattern is valid"));

/// One environment section of a `database.yml` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default, deserialize_with = "scalar")]
    pub adapter: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub socket: Option<String>,
}

impl DatabaseConfig {
    /// `username`, falling back to the `user` spelling.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().or(self.user.as_deref())
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or_default()
    }

    /// Checks the keys every command needs.
    pub fn validate(&self, environment: &str) -> Result<()> {
        for (key, value) in [("adapter", &self.adapter), ("database", &self.database)] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(AppError::MissingConfigKey {
                    environment: environment.to_string(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }
}

// YAML types `password: 123456` as a number; command strings want the text.
fn scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

/// Reads an environment variable from the process environment.
pub fn system_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Expands the ERB tags Rails projects put in `database.yml`.
///
/// Supported output tags read environment variables:
/// `ENV['X']`, `ENV['X'] || 'default'`, `ENV.fetch('X')`,
/// `ENV.fetch('X', 'default')` and `ENV.fetch('X') { default }`.
/// Comment tags (`<%# ... %>`) are dropped. Anything else is rejected.
pub fn expand_template<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in TAG.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&input[last..whole.start()]);
        match &caps[1] {
            "=" => out.push_str(&evaluate(caps[2].trim(), &lookup)?),
            "#" => {}
            _ => {
                return Err(AppError::Template(format!(
                    "unsupported template tag: {}",
                    whole.as_str()
                )));
            }
        }
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

fn evaluate<F>(expression: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(caps) = ENV_INDEX.captures(expression) {
        let name = &caps[1];
        return match (lookup(name), caps.get(2)) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => literal(default.as_str()),
            (None, None) => Ok(String::new()),
        };
    }

    if let Some(caps) = ENV_FETCH.captures(expression) {
        let name = &caps[1];
        if let Some(value) = lookup(name) {
            return Ok(value);
        }
        return match caps.get(2).or(caps.get(3)) {
            Some(default) => literal(default.as_str()),
            None => Err(AppError::Template(format!("key not found: \"{}\"", name))),
        };
    }

    Err(AppError::Template(format!(
        "unsupported template expression: {}",
        expression
    )))
}

fn literal(raw: &str) -> Result<String> {
    let raw = raw.trim();
    for quote in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Ok(raw[1..raw.len() - 1].to_string());
        }
    }
    if raw == "nil" {
        return Ok(String::new());
    }
    if NUMBER.is_match(raw) {
        return Ok(raw.to_string());
    }
    Err(AppError::Template(format!("unsupported default value: {}", raw)))
}

/// Expands, parses and picks `environment` out of a `database.yml` document.
pub fn parse_database_yml<F>(content: &str, environment: &str, lookup: F) -> Result<DatabaseConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_template(content, lookup)?;
    let mut document: Value = serde_yaml::from_str(&expanded)?;
    document.apply_merge()?;

    let section = document
        .get(environment)
        .cloned()
        .ok_or_else(|| AppError::MissingEnvironment(environment.to_string()))?;
    let config: DatabaseConfig = serde_yaml::from_value(section)?;
    config.validate(environment)?;
    Ok(config)
}

/// Loads `environment` from a `database.yml` on local disk.
pub fn load_database_yml(path: &Path, environment: &str) -> Result<DatabaseConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_database_yml(&content, environment, system_env)
}
