//! Error types for archviz operations.

use std::io;
use thiserror::Error;

/// The error type for archviz operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Filter wiring or lookup failed.
    #[error("Filter error: {0}")]
    Filter(#[from] archviz_filter::Error),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A graph or violations document could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A document references something it does not define.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Node not found.
    #[error("Node not found: {0}")]
    UnknownNode(String),

    /// No violations group with this rule exists.
    #[error("Violations group not found: {0}")]
    UnknownViolationsGroup(String),
}

/// A specialized Result type for archviz operations.
pub type Result<T> = std::result::Result<T, Error>;
