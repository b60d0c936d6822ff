//! Structured errors for recording, storage and playback

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    CorruptRecording,
    RecordingNotFound,
    UnresolvableKey,
    UnresolvableButton,
    InvalidSpeed,
    SubscriptionFailure,
    InjectionFailed,
    Io,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn corrupt_recording(path: &Path, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::CorruptRecording,
            format!("Corrupt recording {}: {}", path.display(), reason),
        )
        .with_context(serde_json::json!({ "path": path.display().to_string() }))
    }

    pub fn recording_not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::RecordingNotFound,
            format!("Recording not found: {}", path.display()),
        )
        .with_suggestions(vec!["Run `irec list` to see saved recordings".to_string()])
    }

    pub fn unresolvable_key(token: &str) -> Self {
        Self::new(
            ErrorCode::UnresolvableKey,
            format!("No injectable key for: {:?}", token),
        )
    }

    pub fn unresolvable_button(button: &str) -> Self {
        Self::new(
            ErrorCode::UnresolvableButton,
            format!("No injectable mouse button for: {}", button),
        )
    }

    pub fn invalid_speed(speed: f64) -> Self {
        Self::new(
            ErrorCode::InvalidSpeed,
            format!("Speed must be greater than 0, got {}", speed),
        )
    }

    pub fn subscription_failure(reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SubscriptionFailure,
            format!("Failed to subscribe to global input events: {}", reason),
        )
        .with_suggestions(vec![
            "macOS: grant Accessibility and Input Monitoring to the terminal".to_string(),
            "Linux: run under X11 with access to the display".to_string(),
        ])
    }

    pub fn injection_failed(action: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InjectionFailed,
            format!("{} failed: {}", action, reason),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code_and_message() {
        let e = Error::invalid_speed(-1.0);
        assert_eq!(e.code, ErrorCode::InvalidSpeed);
        assert_eq!(e.to_string(), "[InvalidSpeed] Speed must be greater than 0, got -1");
    }

    #[test]
    fn serializes_code_in_screaming_case() {
        let e = Error::corrupt_recording(Path::new("r.json"), "missing field `events`");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["code"], "CORRUPT_RECORDING");
        assert_eq!(v["context"]["path"], "r.json");
        assert!(v.get("suggestions").is_none());
    }
}
