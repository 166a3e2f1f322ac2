use std::path::PathBuf;
use thiserror::Error;

/// Main error type for hdrdoc operations
#[derive(Error, Debug)]
pub enum HdrdocError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Could not parse source file: {}", path.display())]
    Unparseable { path: PathBuf },

    #[error("File {} exceeds maximum size limit of {limit} bytes", path.display())]
    FileTooLarge { path: PathBuf, limit: usize },

    #[error("Output {} for {} is already claimed by {}", output.display(), path.display(), first.display())]
    OutputCollision {
        path: PathBuf,
        output: PathBuf,
        first: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, HdrdocError>;
