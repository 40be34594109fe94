//! # Error Types
//!
//! This module provides the error types used throughout the library. It
//! defines a central error type [`VdkError`] that encapsulates the failure
//! kinds a caller of the index/segment/playlist pipeline can observe.
//!
//! ## Example Usage
//!
//! ```rust
//! use vdkio::error::{Result, VdkError};
//!
//! fn check_duration(duration_secs: i64) -> Result<()> {
//!     if duration_secs <= 0 {
//!         return Err(VdkError::GetIndexFailed("integer divide by zero".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Primary error type for the library.
#[derive(Error, Debug)]
pub enum VdkError {
    /// I/O errors encountered while reading a source file or writing an
    /// index file. Folded into [`VdkError::DemuxFailed`] or
    /// [`VdkError::GetIndexFailed`] at the point where the surrounding
    /// operation is known.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport stream could not be demultiplexed: a malformed sync
    /// byte, PSI section, or PES header was encountered while building an
    /// index.
    #[error("demux failed: {0}")]
    DemuxFailed(String),

    /// An index could not be produced or read back: missing, stale,
    /// corrupt framing, version mismatch, or a zero-duration source.
    #[error("get index failed: {0}")]
    GetIndexFailed(String),

    /// A segment request could not be resolved: unparsable segment URI or
    /// a sequence number outside the range produced by the segmenter.
    #[error("get stream failed: {0}")]
    GetStreamFailed(String),

    /// Configuration could not be loaded or failed validation. Surfaced at
    /// startup only, never from a request handler.
    #[error("config error: {0}")]
    Config(String),
}

/// A specialized Result type for operations in this crate.
pub type Result<T> = std::result::Result<T, VdkError>;
