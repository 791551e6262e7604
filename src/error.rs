use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config has no followers")]
    NoFollowers,
    #[error("duplicate follower name {0:?}")]
    DuplicateFollower(String),
    #[error("leader name must not be empty")]
    EmptyLeaderName,
    #[error("timeout must be nonzero")]
    ZeroTimeout,
    #[error("unknown follower {0:?}")]
    UnknownFollower(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error talking to {address}: {source}")]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("reply from {address} did not arrive within {timeout_ms}ms")]
    Timeout { address: String, timeout_ms: u64 },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
    #[error("field {field:?} had the wrong type")]
    WrongType { field: &'static str },
    #[error("field {field:?} is not a valid decimal i64: {text:?}")]
    BadInteger { field: &'static str, text: String },
    #[error("message was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to write reply: {0}")]
    Io(#[from] std::io::Error),
}
