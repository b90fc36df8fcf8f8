//! Error kinds for a chat session

use crate::i18n::{Locale, Text};
use std::time::Duration;
use thiserror::Error;

/// Errors that end (or, for `MalformedFrame`, are recovered within) a session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// No usable credential stored locally; no request was sent
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Server answered 401
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Server answered 403 (token and session uuid do not match)
    #[error("Access denied")]
    AccessDenied,

    /// Network failure or any other non-success status
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,

    /// One NDJSON line could not be parsed; never surfaced to the user
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

impl ChatError {
    /// Map a non-success HTTP status to its error kind
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ChatError::AuthenticationFailed,
            403 => ChatError::AccessDenied,
            other => ChatError::Transport(format!("HTTP error! status: {}", other)),
        }
    }

    /// Text shown in the error turn
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            ChatError::AuthenticationRequired => locale.t(Text::ErrorAuthRequired).to_string(),
            ChatError::AuthenticationFailed => locale.t(Text::ErrorAuthFailed).to_string(),
            ChatError::AccessDenied => locale.t(Text::ErrorAccessDenied).to_string(),
            ChatError::Transport(detail) | ChatError::MalformedFrame(detail) => {
                format!("{}: {}", locale.t(Text::ErrorTransport), detail)
            }
            ChatError::Timeout(_) => locale.t(Text::ErrorTimeout).to_string(),
            ChatError::Cancelled => locale.t(Text::ErrorCancelled).to_string(),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Transport(e.to_string())
    }
}

/// Why a submission was refused before anything happened
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("A chat session is already in progress")]
    Busy,

    #[error("Query is empty")]
    EmptyQuery,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ChatError::from_status(401), ChatError::AuthenticationFailed);
        assert_eq!(ChatError::from_status(403), ChatError::AccessDenied);
        assert!(matches!(ChatError::from_status(502), ChatError::Transport(ref m) if m.contains("502")));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let kinds = [
            ChatError::AuthenticationRequired,
            ChatError::AuthenticationFailed,
            ChatError::AccessDenied,
            ChatError::Transport("boom".to_string()),
            ChatError::Timeout(Duration::from_secs(1)),
            ChatError::Cancelled,
        ];

        for locale in [Locale::English, Locale::Japanese] {
            let mut messages: Vec<String> = kinds.iter().map(|k| k.user_message(locale)).collect();
            messages.sort();
            messages.dedup();
            assert_eq!(messages.len(), kinds.len());
        }
    }
}
