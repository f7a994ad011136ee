use std::fmt;

use thiserror::Error;

use crate::constants::ERROR_MESSAGES;

/// Error object returned by any identity or table call.
///
/// `Display` renders the human-readable message: the known-code table when
/// the code is listed there, the backend's raw message otherwise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// An error without a machine-readable code.
    pub fn raw(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    pub fn user_message(&self) -> &str {
        self.code
            .as_deref()
            .and_then(known_message)
            .unwrap_or(self.message.as_str())
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

fn known_message(code: &str) -> Option<&'static str> {
    ERROR_MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel name is reserved: {0}")]
    ReservedName(String),

    #[error("Invalid channel name: {0:?}")]
    InvalidName(String),

    #[error("Channel already subscribed: {0}")]
    AlreadySubscribed(String),

    #[error("Channel activation failed: {0}")]
    Activation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CODE_INVALID_CREDENTIALS, CODE_WEAK_PASSWORD};

    #[test]
    fn test_known_code_is_mapped() {
        let err = ProviderError::new(CODE_INVALID_CREDENTIALS, "Invalid login credentials");
        assert_eq!(err.to_string(), "Wrong email or password.");
    }

    #[test]
    fn test_weak_password_keeps_backend_minimum() {
        let err = ProviderError::new(CODE_WEAK_PASSWORD, "Password should be at least 10 characters");
        assert_eq!(err.to_string(), "Password should be at least 10 characters");
    }

    #[test]
    fn test_unknown_code_falls_back_to_raw_message() {
        let err = ProviderError::new("over_request_rate_limit", "Too many requests");
        assert_eq!(err.to_string(), "Too many requests");

        let err = ProviderError::raw("connection reset");
        assert_eq!(err.to_string(), "connection reset");
        assert!(!err.has_code(CODE_WEAK_PASSWORD));
    }
}
