/// Shared error type used across all LexIntake crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("capability {capability}: {message}")]
    Capability { capability: String, message: String },

    #[error("context store: {0}")]
    Store(String),

    #[error("context store conflict for {key}: expected revision {expected}, found {found}")]
    StoreConflict {
        key: String,
        expected: u64,
        found: u64,
    },

    #[error("invalid arguments for tool {tool}: {message}")]
    InvalidToolArguments { tool: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
