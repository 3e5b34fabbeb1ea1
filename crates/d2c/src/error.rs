//! CLI error types.

use d2c_config::ConfigError;
use d2c_confluence::ConfluenceError;
use d2c_sync::{LoadError, Summary};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Confluence(#[from] ConfluenceError),

    #[error("sync task failed: {0}")]
    Task(String),

    #[error(
        "sync incomplete: {} failed, {} blocked, {} cancelled",
        .0.failed,
        .0.blocked,
        .0.cancelled
    )]
    Incomplete(Summary),
}
