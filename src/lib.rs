#![doc(html_root_url = "https://docs.rs/vdkio/0.2.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # vdkio - on-demand HLS serving for MPEG-2 Transport Stream files
//!
//! `vdkio` serves `.ts` files to HLS clients without pre-segmenting them on
//! disk. A source file is demultiplexed once to recover a presentation-time
//! to byte-offset index (persisted as a `.tsidx` sidecar); HLS segments are
//! then virtual byte ranges of the original file, computed from that index
//! on the fly.
//!
//! ## Module overview
//!
//! - [`demux`]: parses PAT/PMT/PES from a stream of TS packets and emits
//!   frame events (PTS + byte offset).
//! - [`index`]: groups frame events into time slices and encodes/decodes
//!   the binary `.tsidx` format.
//! - [`segment`]: partitions an index into byte-range HLS segments for a
//!   target duration.
//! - [`coordinator`]: process-wide mutual exclusion and progress tracking
//!   for index builds.
//! - [`playlist`]: URI parsing and `.m3u8` text formatting.
//! - [`api`]: the external interface contracts ([`api::Api`]) tying the
//!   above together.
//! - [`config`]: TOML-backed configuration.
//! - [`error`]: the crate's [`error::VdkError`] and [`error::Result`].

/// The external interface contracts driving an HTTP layer.
pub mod api;
/// Configuration loading.
pub mod config;
/// Per-file build coordination and progress reporting.
pub mod coordinator;
/// MPEG-2 Transport Stream demultiplexing.
pub mod demux;
/// Error types and utilities.
pub mod error;
/// Index data model, construction, and binary codec.
pub mod index;
/// Playlist URI parsing and text formatting.
pub mod playlist;
/// Virtual HLS segmentation.
pub mod segment;

pub use error::{Result, VdkError};
