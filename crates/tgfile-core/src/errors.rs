/// Local precondition failures on an upload source.
///
/// Checked before any request is made, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file stream is not seekable")]
    NotSeekable,

    #[error("stream is empty")]
    Empty,

    #[error("file size is more than 20 MB ({size} > {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("file stream is not readable")]
    NotReadable,
}

/// Core error type shared by the client and the CLI.
///
/// Remote failures keep the code and description reported by the API so
/// callers can render them without re-parsing the wire text.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bot is not initialized")]
    NotInitialized,

    #[error("invalid access token")]
    InvalidCredentials,

    #[error("invalid stream: {0}")]
    Validation(#[from] ValidationError),

    #[error("bad request: [{code}] {description}")]
    BadRequest { code: i64, description: String },

    #[error("remote error: [{code}] {description}")]
    Remote { code: i64, description: String },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("cancelled")]
    Cancelled,

    #[error("progress observer failed: {0}")]
    Observer(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Remote error code, when the failure came from an API envelope.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::BadRequest { code, .. } | Error::Remote { code, .. } => Some(*code),
            Error::InvalidCredentials => Some(401),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
