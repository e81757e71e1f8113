use std::sync::RwLock;

use crate::{
    domain::{BotId, BotIdentity},
    errors::Error,
    Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready(BotIdentity),
}

/// Authenticated identity gating every transfer.
///
/// Starts uninitialized; each successful `getMe` replaces the identity.
#[derive(Debug, Default)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_identity(&self, identity: BotIdentity) {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = SessionState::Ready(identity);
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self.state(), SessionState::Ready(_))
    }

    /// The identity, or `NotInitialized`.
    pub fn identity(&self) -> Result<BotIdentity> {
        match self.state() {
            SessionState::Ready(identity) => Ok(identity),
            SessionState::Uninitialized => Err(Error::NotInitialized),
        }
    }

    pub fn id(&self) -> Result<BotId> {
        self.identity().map(|i| i.id)
    }

    pub fn username(&self) -> Result<String> {
        self.identity().map(|i| i.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: i64, username: &str) -> BotIdentity {
        BotIdentity {
            id: BotId(id),
            first_name: "Files".to_string(),
            username: username.to_string(),
        }
    }

    #[test]
    fn starts_uninitialized() {
        let s = Session::new();
        assert!(!s.is_authorized());
        assert!(matches!(s.id(), Err(Error::NotInitialized)));
        assert!(matches!(s.username(), Err(Error::NotInitialized)));
    }

    #[test]
    fn reinitialization_overwrites() {
        let s = Session::new();
        s.set_identity(identity(1, "first_bot"));
        s.set_identity(identity(2, "second_bot"));
        assert!(s.is_authorized());
        assert_eq!(s.id().unwrap(), BotId(2));
        assert_eq!(s.username().unwrap(), "second_bot");
    }
}
