use derive_more::{Display, From};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0}")]
    Custom(String),

    #[display("Configuration error: {_0}")]
    Config(String),

    /// The persisted comment list could not be loaded; aborts a run.
    #[display("Comment source {path} unavailable: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[display("Agent invocation failed: {_0}")]
    InvocationFailure(String),

    #[display("Agent output is not valid JSON: {_0}")]
    MalformedOutput(String),

    #[display("Agent invocation timed out after {_0:?}")]
    Timeout(std::time::Duration),

    #[from]
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    #[from]
    #[display("JSON error: {_0}")]
    Json(serde_json::Error),

    #[from]
    #[display("OpenAI error: {_0}")]
    OpenAi(async_openai::error::OpenAIError),

    #[from]
    #[display("HTTP error: {_0}")]
    Http(reqwest::Error),
}

impl std::error::Error for Error {}

impl Error {
    pub fn custom(message: impl std::fmt::Display) -> Self {
        Self::Custom(message.to_string())
    }

    pub fn config(message: impl std::fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    pub fn source_unavailable(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
