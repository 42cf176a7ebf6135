use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("auth error: {0}")]
    Auth(String),
    /// The identity provider answered with an OAuth error body, e.g.
    /// `invalid_grant` once the session is gone on its side.
    #[error("identity provider rejected the request ({status}): {error} ({description})")]
    OAuth {
        status: u16,
        error: String,
        description: String,
    },
    #[error("api error: {0}")]
    Api(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed access token: {0}")]
    Token(String),
    /// A caller broke the session call discipline (e.g. asked for the user
    /// while logged out). Never retried.
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl AppError {
    pub fn precondition(message: &'static str) -> Self {
        tracing::error!(%message, "session precondition violated");
        Self::Precondition(message)
    }
}
