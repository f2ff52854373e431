//! Main-device election. At most one session holds the main role; only its
//! gyroscope stream reaches the router.

use tracing::info;

use super::SessionId;

/// Outcome of a successful election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Election {
    /// New holder of the main role.
    pub main: SessionId,
    /// Previous holder that lost the role, if it was a different session.
    pub demoted: Option<SessionId>,
}

/// Single-writer arbiter: either unclaimed or claimed by one session.
#[derive(Debug, Default)]
pub struct MainDeviceArbiter {
    holder: Option<SessionId>,
}

impl MainDeviceArbiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Promotes `session`, demoting any other holder.
    pub fn elect_main(&mut self, session: SessionId) -> Election {
        let previous = self.holder.replace(session);
        let demoted = previous.filter(|&prev| prev != session);

        match demoted {
            Some(prev) => info!("Main device: {} (replaces {})", session, prev),
            None => info!("Main device: {}", session),
        }

        Election {
            main: session,
            demoted,
        }
    }

    /// Clears the role if `session` holds it. Returns whether it did.
    pub fn demote(&mut self, session: SessionId) -> bool {
        if self.holder == Some(session) {
            self.holder = None;
            info!("Main device released by {}", session);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_main(&self, session: SessionId) -> bool {
        self.holder == Some(session)
    }

    #[must_use]
    pub fn current(&self) -> Option<SessionId> {
        self.holder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unclaimed() {
        let arbiter = MainDeviceArbiter::new();
        assert_eq!(arbiter.current(), None);
        assert!(!arbiter.is_main(SessionId(1)));
    }

    #[test]
    fn test_elect_from_unclaimed() {
        let mut arbiter = MainDeviceArbiter::new();
        let election = arbiter.elect_main(SessionId(1));
        assert_eq!(
            election,
            Election {
                main: SessionId(1),
                demoted: None
            }
        );
        assert!(arbiter.is_main(SessionId(1)));
    }

    #[test]
    fn test_elect_replaces_holder() {
        let mut arbiter = MainDeviceArbiter::new();
        arbiter.elect_main(SessionId(1));
        let election = arbiter.elect_main(SessionId(2));

        assert_eq!(election.demoted, Some(SessionId(1)));
        assert!(arbiter.is_main(SessionId(2)));
        assert!(!arbiter.is_main(SessionId(1)));
    }

    #[test]
    fn test_reelect_same_session_demotes_nobody() {
        let mut arbiter = MainDeviceArbiter::new();
        arbiter.elect_main(SessionId(3));
        assert_eq!(arbiter.elect_main(SessionId(3)).demoted, None);
    }

    #[test]
    fn test_demote_only_affects_holder() {
        let mut arbiter = MainDeviceArbiter::new();
        arbiter.elect_main(SessionId(1));

        assert!(!arbiter.demote(SessionId(2)));
        assert!(arbiter.is_main(SessionId(1)));

        assert!(arbiter.demote(SessionId(1)));
        assert_eq!(arbiter.current(), None);
        assert!(!arbiter.demote(SessionId(1)));
    }
}
