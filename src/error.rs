//! Error types for schemals

use std::path::PathBuf;

use thiserror::Error;

use crate::infra::protocol::error_codes;
use crate::models::lang::Diagnostics;

/// Failure of a single protocol request
///
/// Every variant is turned into a JSON-RPC error response; none of them
/// terminates the connection.
#[derive(Debug, Error)]
pub enum LangError {
    #[error("server not initialized")]
    NotInitialized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("invalid position {line}:{character}: {reason}")]
    InvalidPosition {
        line: u32,
        character: u32,
        reason: String,
    },

    #[error("core schema is not available yet for {target}")]
    SchemaNotReady { target: String },

    #[error("finding compatible decoder failed for {}: {source}", dir.display())]
    NoCompatibleDecoder {
        dir: PathBuf,
        #[source]
        source: DecoderError,
    },

    #[error("{0}")]
    Diagnostics(Diagnostics),

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl LangError {
    pub fn error_code(&self) -> i32 {
        match self {
            Self::NotInitialized => error_codes::SERVER_NOT_INITIALIZED,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_)
            | Self::DocumentNotFound(_)
            | Self::InvalidPosition { .. } => error_codes::INVALID_PARAMS,
            Self::SchemaNotReady { .. } => error_codes::SCHEMA_NOT_READY,
            Self::NoCompatibleDecoder { .. } | Self::Diagnostics(_) => error_codes::SERVER_ERROR,
            Self::Cancelled => error_codes::REQUEST_CANCELLED,
            Self::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Whether the client may usefully repeat the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SchemaNotReady { .. } | Self::Cancelled)
    }

    /// Errors that indicate a server defect rather than a client mistake
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::Internal(_))
    }

    pub fn schema_not_ready(target: impl std::fmt::Display) -> Self {
        Self::SchemaNotReady {
            target: target.to_string(),
        }
    }

    pub fn invalid_position(line: u32, character: u32, reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            line,
            character,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LangError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidParams(err.to_string())
    }
}

/// Failure to provide a decoder for a directory
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("core schema not loaded")]
    SchemaNotLoaded,

    #[error("schema failed to load: {0}")]
    SchemaFailed(String),

    #[error("no open documents in {}", .0.display())]
    NoDocuments(PathBuf),
}

/// Transport and lifecycle failures of the server itself
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("TCP server failed to start at {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Peer hung up; a normal end of a connection loop
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
        ))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Config serialize error: {0}")]
    Serialize(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema parse error: {0}")]
    Parse(String),

    #[error("Invalid schema for block '{block}': {message}")]
    Invalid { block: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lang::Diagnostic;

    #[test]
    fn test_schema_not_ready_names_target() {
        let err = LangError::schema_not_ready("/work/network");
        assert_eq!(
            err.to_string(),
            "core schema is not available yet for /work/network"
        );
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), error_codes::SCHEMA_NOT_READY);
    }

    #[test]
    fn test_decoder_error_keeps_context() {
        let err = LangError::NoCompatibleDecoder {
            dir: PathBuf::from("/work/app"),
            source: DecoderError::SchemaNotLoaded,
        };
        assert_eq!(
            err.to_string(),
            "finding compatible decoder failed for /work/app: core schema not loaded"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_diagnostics_error_message() {
        let err = LangError::Diagnostics(Diagnostic::error("Unclosed block").into());
        assert_eq!(err.to_string(), "Unclosed block");
        assert_eq!(err.error_code(), error_codes::SERVER_ERROR);
    }

    #[test]
    fn test_not_initialized_is_internal() {
        assert!(LangError::NotInitialized.is_internal());
        assert!(!LangError::DocumentNotFound("file:///a.tf".into()).is_internal());
        assert_eq!(
            LangError::Cancelled.error_code(),
            error_codes::REQUEST_CANCELLED
        );
    }

    #[test]
    fn test_disconnect_detection() {
        let eof = ServerError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "closed",
        ));
        assert!(eof.is_disconnect());
        let bind = ServerError::Bind {
            address: "127.0.0.1:1".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(!bind.is_disconnect());
    }
}
