//! Connected sessions, their roles and their outbound notification channels.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::arbiter::MainDeviceArbiter;
use super::{SessionId, SessionRecord, SessionRole};
use crate::error::{BridgeError, Result};
use crate::transport::protocol::ServerMessage;

struct SessionEntry {
    record: SessionRecord,
    outbound: mpsc::Sender<ServerMessage>,
}

/// Session table plus the main-device arbiter.
///
/// Roles stored in the records always agree with the arbiter.
#[derive(Default)]
pub struct InputSessionRegistry {
    sessions: HashMap<SessionId, SessionEntry>,
    arbiter: MainDeviceArbiter,
}

impl std::fmt::Debug for InputSessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("main", &self.arbiter.current())
            .finish()
    }
}

impl InputSessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session with no role. Reconnecting an id replaces its entry.
    pub fn connect(&mut self, id: SessionId, outbound: mpsc::Sender<ServerMessage>) {
        let record = SessionRecord {
            id,
            role: SessionRole::None,
            connected_at: Utc::now(),
        };
        if self.sessions.insert(id, SessionEntry { record, outbound }).is_some() {
            warn!("Session {} reconnected, previous entry replaced", id);
            self.arbiter.demote(id);
        }
        info!("Session {} connected ({} total)", id, self.sessions.len());
    }

    /// Removes a session and releases the main role if it held it.
    pub fn disconnect(&mut self, id: SessionId) -> Option<SessionRecord> {
        let entry = self.sessions.remove(&id)?;
        if self.arbiter.demote(id) {
            info!("Main device {} disconnected, role is unclaimed", id);
        }
        info!("Session {} disconnected ({} remaining)", id, self.sessions.len());
        Some(entry.record)
    }

    /// Best-effort, non-blocking delivery. Returns whether the message was queued.
    pub fn notify(&self, id: SessionId, message: ServerMessage) -> bool {
        let Some(entry) = self.sessions.get(&id) else {
            debug!("Dropping notification for unknown session {}", id);
            return false;
        };
        match entry.outbound.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                warn!("Notification to session {} dropped: {}", id, e);
                false
            }
        }
    }

    /// Makes `id` the main device. A demoted holder is told it lost the role,
    /// then the new holder is told it has it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` if `id` is not connected.
    pub fn elect_main(&mut self, id: SessionId) -> Result<()> {
        if !self.sessions.contains_key(&id) {
            return Err(BridgeError::UnknownSession(id));
        }

        let election = self.arbiter.elect_main(id);
        if let Some(demoted) = election.demoted {
            self.set_role(demoted, SessionRole::None);
            self.notify(demoted, ServerMessage::MainStatusChanged { is_main: false });
        }
        self.set_role(id, SessionRole::Main);
        self.notify(id, ServerMessage::MainStatusChanged { is_main: true });
        Ok(())
    }

    /// Gives up the main role if `id` holds it and confirms the role to the session.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` if `id` is not connected.
    pub fn resign_main(&mut self, id: SessionId) -> Result<()> {
        if !self.sessions.contains_key(&id) {
            return Err(BridgeError::UnknownSession(id));
        }
        self.arbiter.demote(id);
        self.set_role(id, SessionRole::None);
        self.notify(id, ServerMessage::MainStatusChanged { is_main: false });
        Ok(())
    }

    /// Whether gyro samples from `id` are accepted.
    #[must_use]
    pub fn is_main(&self, id: SessionId) -> bool {
        self.arbiter.is_main(id)
    }

    #[must_use]
    pub fn main_session(&self) -> Option<SessionId> {
        self.arbiter.current()
    }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&SessionRecord> {
        self.sessions.get(&id).map(|entry| &entry.record)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn set_role(&mut self, id: SessionId, role: SessionRole) {
        if let Some(entry) = self.sessions.get_mut(&id) {
            entry.record.role = role;
        }
    }
}
