use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error(
        "Speech credentials not found. Set {env_var} environment variable or add to config."
    )]
    MissingCredentials { env_var: String },

    #[error("Speech service rejected credentials: {0}")]
    Auth(String),

    #[error("Speech quota exceeded{}", .retry_after.map(|s| format!(". Retry after {} seconds", s)).unwrap_or_default())]
    QuotaExceeded { retry_after: Option<u64> },

    #[error("Invalid SSML markup: {0}")]
    InvalidMarkup(String),

    #[error("Speech service error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpeechError>;
