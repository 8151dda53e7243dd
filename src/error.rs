/// Boxed failure reported by a [`crate::mal::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("MAL API error in {operation}: status {status}: {body}")]
    Upstream {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to send {operation} request: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("No anime found with name: {0}")]
    NotFound(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    NoConfigDir,
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
