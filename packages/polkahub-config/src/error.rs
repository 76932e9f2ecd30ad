use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value}")]
    InvalidEnvVar { var: String, value: String },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error("{0}")]
    Other(String),
}

impl ConfigError {
    pub fn invalid_env(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            var: var.into(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
