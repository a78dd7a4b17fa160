use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing key '{key}' in database configuration for environment '{environment}'")]
    MissingConfigKey { environment: String, key: String },

    #[error("Environment '{0}' not found in database configuration")]
    MissingEnvironment(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Unsupported database adapter: '{0}' (only mysql and postgresql are supported)")]
    UnsupportedAdapter(String),

    #[error("Only mysql or postgresql on remote and local server is supported")]
    UnsupportedAdapterPair,

    #[error("remote database is read only")]
    ReadOnly,

    #[error("Command `{command}` failed with status: {status}\nStdout: {stdout}\nStderr: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("{0} executable not found in PATH")]
    ExecutableNotFound(String),

    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
