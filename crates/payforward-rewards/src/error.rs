use thiserror::Error;

pub type Result<T> = std::result::Result<T, RewardsError>;

#[derive(Debug, Error)]
pub enum RewardsError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
