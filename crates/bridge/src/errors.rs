use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("timed out {0}")]
    Timeout(String),
    #[error("connection closed")]
    Closed,
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}
