use thiserror::Error;

/// Message substituted by the client when a bad response carries no message.
pub const UNKNOWN_SERVER_ERROR: &str = "unknown server error";

#[derive(Error, Debug)]
pub enum ProcBridgeError {
    #[error("unrecognized protocol")]
    UnrecognizedProtocol,

    #[error("incompatible protocol version")]
    IncompatibleVersion,

    #[error("incomplete data")]
    IncompleteData,

    #[error("invalid status code")]
    InvalidStatusCode,

    #[error("invalid body")]
    InvalidBody,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Error reported by the remote handler in a bad response.
    #[error("Server error: {0}")]
    Server(String),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// A multi-argument handler was invoked with a payload that is not an
    /// array of exactly `expected` elements.
    #[error("method needs {expected} elements")]
    ArityMismatch { expected: usize },

    #[error("Illegal server state: {0}")]
    IllegalState(String),

    /// Something failed inside a guarded operation that is not one of the
    /// protocol-defined failures above.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ProcBridgeError>;
