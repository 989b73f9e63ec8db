//! Core types and traits for SnapCommit
//!
//! This crate defines the foundational types shared by the workspace:
//! - Payload: opaque, already-encoded full snapshot bytes
//! - CommitError: failure taxonomy of a durable commit
//! - CommitStorage: the filesystem contract a commit consumes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod payload;
pub mod traits;

pub use error::{CommitError, CommitResult};
pub use payload::Payload;
pub use traits::CommitStorage;
