use thiserror::Error;

/// Error surface for the dispatch engine.
///
/// The three deadline variants are kept distinct from each other and from
/// every other failure: an inner deadline (scanner, distribution) must never
/// be caught as the outer one (request), per the nested-deadline contract.
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "redis-backend")]
    #[error("backend error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rule set failed to compile: {0}")]
    RuleCompile(String),

    #[error("scanner deadline expired")]
    ScannerTimeout,

    #[error("distribution deadline expired")]
    DistributionTimeout,

    #[error("request deadline expired")]
    RequestTimeout,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SieveError>;
