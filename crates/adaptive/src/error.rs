use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownsamplerError {
    /// The append-only metrics log could not be opened at startup.
    #[error("could not open metrics log {}: {source}", path.display())]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics log write failed: {0}")]
    Sink(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DownsamplerError>;
