//! Extension error types

use std::fmt;

use thiserror::Error;

use crate::BoxError;

/// Extensions API operation, used to label errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    NextEvent,
    InitError,
    ExitError,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::NextEvent => "next_event",
            Self::InitError => "init_error",
            Self::ExitError => "exit_error",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the Extensions API client and the event parser
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl ExtensionError {
    pub fn transport(operation: Operation, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            operation,
            source: source.into(),
        }
    }
}

/// The platform answered, but not the way the contract says it should
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{operation} returned status {status}: {body}")]
    UnexpectedStatus {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("register response missing lambda-extension-identifier header")]
    MissingIdentifier,

    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),
}

/// The next-event body could not be turned into an event
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("empty event payload")]
    Empty,

    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid event type: eventType missing")]
    MissingEventType,

    #[error("invalid event type received: {0}")]
    UnknownEventType(String),
}

/// Value of the `Lambda-Extension-Function-Error-Type` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /// The extension registered but could not finish initializing
    InitFailed,
    /// A lifecycle hook returned an error or panicked
    Unhandled,
    Custom(String),
}

impl ErrorType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InitFailed => "Extension.InitFailed",
            Self::Unhandled => "Fatal.Unhandled",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ErrorType {
    fn from(s: &str) -> Self {
        Self::Custom(s.to_string())
    }
}

impl From<String> for ErrorType {
    fn from(s: String) -> Self {
        Self::Custom(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_header_values() {
        assert_eq!(ErrorType::InitFailed.as_str(), "Extension.InitFailed");
        assert_eq!(ErrorType::Unhandled.as_str(), "Fatal.Unhandled");
        assert_eq!(ErrorType::from("Extension.Custom").as_str(), "Extension.Custom");
    }

    #[test]
    fn test_error_display() {
        let err = ExtensionError::from(ProtocolError::UnexpectedStatus {
            operation: Operation::NextEvent,
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(err.to_string(), "next_event returned status 500: boom");

        let err = ExtensionError::from(PayloadError::UnknownEventType("RESTART".to_string()));
        assert!(err.to_string().contains("RESTART"));
    }

    #[test]
    fn test_transport_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ExtensionError::transport(Operation::Register, io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("register request failed"));
    }
}
