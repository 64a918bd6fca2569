use thiserror::Error;

/// JSON-RPC code used for every handler-level failure.
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Too many concurrent sessions")]
    TooManySessions,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// JSON-RPC error code reported for this failure.
    ///
    /// The taxonomy is flattened on the wire: clients only ever see `-32603`.
    pub fn code(&self) -> i32 {
        INTERNAL_ERROR
    }
}

pub type Result<T> = std::result::Result<T, Error>;
