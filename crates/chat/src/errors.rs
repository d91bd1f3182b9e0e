use bridge::BridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gemini returned {status}: {message}")]
    Gemini { status: u16, message: String },
    #[error("model returned no text")]
    EmptyResponse,
    #[error("no answer after {0} tool rounds")]
    ToolRounds(usize),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("invalid url: {0}")]
    Url(String),
}
