use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found or unreadable: {}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key mismatch: '{}' was not packed with the active key pair", path.display())]
    KeyMismatch { path: PathBuf },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("corrupt container '{}': {reason}", path.display())]
    CorruptContainer { path: PathBuf, reason: String },

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileNotFound {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptContainer {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn crypto(err: anyhow::Error) -> Self {
        Error::Crypto(format!("{err:#}"))
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        Error::Io(std::io::Error::other(format!("{err:#}")))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
