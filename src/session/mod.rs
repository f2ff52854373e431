//! # Session Module
//!
//! Bookkeeping for connected phones: identity, role and the main-device
//! election that gates gyroscope input.

pub mod arbiter;
pub mod registry;

use std::fmt;

use chrono::{DateTime, Utc};

pub use arbiter::{Election, MainDeviceArbiter};
pub use registry::InputSessionRegistry;

/// Identifier of one connected session, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Role of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionRole {
    #[default]
    None,
    /// Its gyroscope drives the controller.
    Main,
}

/// One connected session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub role: SessionRole,
    pub connected_at: DateTime<Utc>,
}
