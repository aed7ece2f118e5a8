//! Error types for incrar
//!
//! Provides a unified error type for all operations.
//!
//! Errors fall into two fatal severities plus plumbing:
//! - **per-file**: the file being diffed or transferred cannot be processed
//!   (stat failure, checksum failure, short reads/writes, byte-count drift)
//! - **stream**: the tar transport is corrupt or speaks a different protocol
//!   (malformed block, unterminated filename, bad size, incoherent manifest)
//!
//! Nothing here is retried. Every error propagates to the caller, which owns
//! any checkpoint/restart strategy.

use thiserror::Error;

/// Result type alias using IncrError
pub type Result<T> = std::result::Result<T, IncrError>;

/// Unified error type for incrar operations
#[derive(Debug, Error)]
pub enum IncrError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Per-file Errors
    // -------------------------------------------------------------------------
    /// A data file could not be diffed or serialised
    #[error("{filename}: {message}")]
    Serialise { filename: String, message: String },

    // -------------------------------------------------------------------------
    // Stream Errors
    // -------------------------------------------------------------------------
    #[error("Bad block: {0}")]
    MalformedBlock(String),

    #[error("Bad block: bad size: {0}")]
    BadSize(String),

    #[error("Error reading manifest: {0}")]
    Manifest(String),

    // -------------------------------------------------------------------------
    // Page Errors
    // -------------------------------------------------------------------------
    #[error("Invalid page: {0}")]
    InvalidPage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// How far a failure reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Aborts processing of one file
    File,
    /// Aborts the whole increment decode
    Stream,
    /// Environment or programming errors (I/O plumbing, bad config)
    Other,
}

impl IncrError {
    /// Build a per-file error
    pub fn serialise(filename: impl Into<String>, message: impl Into<String>) -> Self {
        IncrError::Serialise {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Classify this error by blast radius
    pub fn severity(&self) -> Severity {
        match self {
            IncrError::Serialise { .. } => Severity::File,
            IncrError::MalformedBlock(_) | IncrError::BadSize(_) | IncrError::Manifest(_) => {
                Severity::Stream
            }
            IncrError::Io(_) | IncrError::InvalidPage(_) | IncrError::Config(_) => Severity::Other,
        }
    }
}
