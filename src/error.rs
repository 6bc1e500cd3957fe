use std::io;

use thiserror::Error;

/// everything that can stop the engine before or during a run
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("out of memory allocating {what} ({requested} elements)")]
    ResourceExhausted { what: &'static str, requested: usize },

    #[error("failed to spawn evaluation worker {index}: {source}")]
    WorkerSpawn {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("engine thread failed: {0}")]
    EngineThread(String),
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidConfig(msg.into())
    }
}
