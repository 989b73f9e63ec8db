//! Testing utilities for commit serializers
//!
//! - **Instrumented storage**: local filesystem storage that can hold
//!   commits at a gate, slow them down, fail or panic on a chosen payload,
//!   and records what actually reached the target path
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use snapcommit_durability::testing::{FaultKind, InstrumentedStorage};
//!
//! let storage = Arc::new(InstrumentedStorage::new());
//! storage.inject(b"v2", FaultKind::FailRename);
//! ```

mod instrumented;

pub use instrumented::{FaultKind, InstrumentedStorage};
