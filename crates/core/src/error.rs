use std::{path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpendreelError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Text extraction failed for {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Story extraction failed: {reason}")]
    StoryFailed { reason: String },

    #[error("Narration synthesis failed: {reason}")]
    NarrationFailed { reason: String },

    #[error("Media search failed for \"{phrase}\": {reason}")]
    SearchFailed { phrase: String, reason: String },

    #[error("Video suggestions failed for \"{query}\": {reason}")]
    SuggestionsFailed { query: String, reason: String },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: &'static str, reason: String },

    #[error("{tool} timed out after {after:?}")]
    TimedOut { tool: &'static str, after: Duration },

    #[error("Assembly failed for {output}: {reason}")]
    AssemblyFailed { output: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },
}

impl SpendreelError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        SpendreelError::InvalidInput {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpendreelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_timeouts_keep_their_precision() {
        let err = SpendreelError::TimedOut {
            tool: "ffmpeg",
            after: Duration::from_millis(200),
        };
        assert_eq!(err.to_string(), "ffmpeg timed out after 200ms");
    }
}
