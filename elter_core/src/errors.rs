//! # Error Types
//!
//! Structured error types for elter_core. Panel controllers turn these into
//! lines in the panel's output area, so every message is written to be read
//! by the person clicking the toolbar, not only by a developer.
//!
//! ## Example
//!
//! ```rust
//! use elter_core::errors::{ToolbarError, ToolbarResult};
//!
//! fn validate_scale(scale_m: u32) -> ToolbarResult<()> {
//!     if scale_m == 0 {
//!         return Err(ToolbarError::InvalidInput {
//!             field: "scale".to_string(),
//!             value: scale_m.to_string(),
//!             reason: "Scale must be positive".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for elter_core operations
pub type ToolbarResult<T> = Result<T, ToolbarError>;

/// Structured error type for toolbar operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ToolbarError {
    /// An input value is invalid (out of range, unparseable, inconsistent)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A selection the action depends on has not been made yet
    #[error("Please select {what} first")]
    MissingSelection { what: String },

    /// A named network, site, raster or layer does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// Product cannot be produced for the chosen parameters
    #[error("Product unavailable: {product} - {reason}")]
    ProductUnavailable { product: String, reason: String },

    /// A remote service (site directory, compute) failed or was unreachable
    #[error("{service} request failed: {reason}")]
    ServiceError { service: String, reason: String },

    /// A remote service answered with a non-success status
    #[error("{service} returned HTTP {status}: {reason}")]
    ServiceRejected {
        service: String,
        status: u16,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON / GeoJSON serialization or parsing error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Config schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ToolbarError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolbarError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingSelection error
    pub fn missing_selection(what: impl Into<String>) -> Self {
        ToolbarError::MissingSelection { what: what.into() }
    }

    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        ToolbarError::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a ProductUnavailable error
    pub fn product_unavailable(product: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolbarError::ProductUnavailable {
            product: product.into(),
            reason: reason.into(),
        }
    }

    /// Create a ServiceError
    pub fn service(service: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolbarError::ServiceError {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a ServiceRejected error
    pub fn rejected(service: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        ToolbarError::ServiceRejected {
            service: service.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolbarError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        ToolbarError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        ToolbarError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Check if re-clicking the same action may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ToolbarError::ServiceError { .. } | ToolbarError::FileLocked { .. } => true,
            ToolbarError::ServiceRejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolbarError::InvalidInput { .. } => "INVALID_INPUT",
            ToolbarError::MissingSelection { .. } => "MISSING_SELECTION",
            ToolbarError::NotFound { .. } => "NOT_FOUND",
            ToolbarError::ProductUnavailable { .. } => "PRODUCT_UNAVAILABLE",
            ToolbarError::ServiceError { .. } => "SERVICE_ERROR",
            ToolbarError::ServiceRejected { .. } => "SERVICE_REJECTED",
            ToolbarError::FileError { .. } => "FILE_ERROR",
            ToolbarError::FileLocked { .. } => "FILE_LOCKED",
            ToolbarError::SerializationError { .. } => "SERIALIZATION_ERROR",
            ToolbarError::VersionMismatch { .. } => "VERSION_MISMATCH",
            ToolbarError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = ToolbarError::invalid_input("crs", "43x6", "EPSG code must be numeric");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidInput\""));
        let roundtrip: ToolbarError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ToolbarError::missing_selection("an eLTER site").error_code(), "MISSING_SELECTION");
        assert_eq!(ToolbarError::not_found("Network", "Atlantis").error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_missing_selection_message() {
        let error = ToolbarError::missing_selection("an eLTER site");
        assert_eq!(error.to_string(), "Please select an eLTER site first");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(ToolbarError::service("DEIMS", "timed out").is_recoverable());
        assert!(ToolbarError::rejected("Compute", 503, "busy").is_recoverable());
        assert!(!ToolbarError::rejected("Compute", 400, "bad band").is_recoverable());
        assert!(!ToolbarError::missing_selection("a network").is_recoverable());
    }
}
