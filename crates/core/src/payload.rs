//! Opaque snapshot payloads
//!
//! A [`Payload`] is the full, already-encoded snapshot of the caller's state.
//! Nothing in this workspace looks inside it: the bytes handed to a commit are
//! exactly the bytes that land on disk.

use std::fmt;

/// Serialized full snapshot of the caller's logical state
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wrap already-encoded bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Payload(bytes)
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes that a commit of this payload writes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length snapshot
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take back the underlying buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

// Snapshots can be megabytes; print the size, not the contents.
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").field("len", &self.0.len()).finish()
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(bytes: &[u8; N]) -> Self {
        Payload(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload(text.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload(text.as_bytes().to_vec())
    }
}
