//! Identifier types for destinations, stacks and attachments
//!
//! All identifiers compare by value. Two destinations built separately with the
//! same explicit identifier are the same navigation target.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one logical navigation target.
///
/// Destinations that depend on input (e.g. "conversation #7") should be built
/// with an explicit, stable identifier so repeated construction yields the
/// same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DestinationId(String);

impl DestinationId {
    /// Create a destination ID from an explicit value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh, globally unique destination ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DestinationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DestinationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identity of one independently operating navigation stack.
///
/// Several stacks can share a notification bus; subscribers use this to tell
/// their stack's broadcasts apart from everyone else's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackId(String);

impl StackId {
    const MAIN: &'static str = "navstack.main";
    const SECONDARY: &'static str = "navstack.secondary";

    /// Create a stack ID from an explicit value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh, globally unique stack ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Well-known identity of the primary stack
    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    /// Well-known identity of a second, independent stack
    pub fn secondary() -> Self {
        Self(Self::SECONDARY.to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque token issued once per attach.
///
/// A destination only accepts a detach request carrying the token it currently
/// holds, so a stale token from a previous owner cannot evict it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentToken(Uuid);

impl AttachmentToken {
    pub(crate) fn issue() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AttachmentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attachment-{}", self.0)
    }
}
