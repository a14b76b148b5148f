/// Unified error handling for the aguja routing core
///
/// Selection failures are ordinary return values, not panics: the only
/// hard failure the core can surface is the master gate at session
/// bring-up. Everything else is recovered locally.
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for aguja operations
#[derive(Debug, Error)]
pub enum AgujaError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No master could be located in the backend list
    #[error("Couldn't find a suitable master from {candidates} candidates")]
    MasterNotFound { candidates: usize },

    /// A master exists but refuses new connections
    #[error("Master exists ({address}), but it is being drained and cannot be used")]
    MasterDraining { address: String },

    /// Backend connection errors
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for aguja operations
pub type AgujaResult<T> = Result<T, AgujaError>;

impl AgujaError {
    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        AgujaError::Backend {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        AgujaError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AgujaError::Backend { .. } => true,
            // A draining master may come back once the drain is lifted.
            AgujaError::MasterDraining { .. } => true,
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AgujaError::Config(_) => ErrorSeverity::Critical,
            AgujaError::Internal { .. } => ErrorSeverity::Critical,
            AgujaError::MasterNotFound { .. } => ErrorSeverity::Error,
            AgujaError::MasterDraining { .. } => ErrorSeverity::Warning,
            AgujaError::Backend { .. } => ErrorSeverity::Warning,
        }
    }
}

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors that affect functionality but don't crash the system
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational messages about recoverable issues
    Info,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Info => write!(f, "INFO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = AgujaError::backend("Backend unavailable");
        assert!(matches!(error, AgujaError::Backend { .. }));
        assert_eq!(error.to_string(), "Backend error: Backend unavailable");

        let error = AgujaError::internal("candidate list corrupted");
        assert_eq!(error.to_string(), "Internal error: candidate list corrupted");
    }

    #[test]
    fn test_master_gate_messages() {
        let not_found = AgujaError::MasterNotFound { candidates: 4 };
        assert_eq!(
            not_found.to_string(),
            "Couldn't find a suitable master from 4 candidates"
        );

        let draining = AgujaError::MasterDraining {
            address: "10.0.1.10".to_string(),
        };
        assert_eq!(
            draining.to_string(),
            "Master exists (10.0.1.10), but it is being drained and cannot be used"
        );
    }

    #[test]
    fn test_error_severity() {
        let config_error = AgujaError::Config(ConfigError::ValidationError("test".to_string()));
        assert_eq!(config_error.severity(), ErrorSeverity::Critical);

        let gate_error = AgujaError::MasterNotFound { candidates: 0 };
        assert_eq!(gate_error.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_recoverability() {
        let backend_error = AgujaError::backend("connect refused");
        assert!(backend_error.is_recoverable());

        let config_error = AgujaError::Config(ConfigError::ValidationError("test".to_string()));
        assert!(!config_error.is_recoverable());

        assert!(!AgujaError::MasterNotFound { candidates: 2 }.is_recoverable());
    }
}
