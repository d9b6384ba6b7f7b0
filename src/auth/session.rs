//! Session registry
//!
//! Sessions are addressed by generational handles: a slot index plus the
//! generation it was issued under. Closing a slot bumps its generation, so a
//! handle kept after logout never resolves to a later session in that slot.

use std::fmt;

use crate::auth::identity::Identity;
use crate::error::FsError;
use crate::utils::time::unix_now;

/// Opaque session identifier handed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    index: u32,
    generation: u32,
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

/// Lifecycle of a connection's session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    Closed,
}

/// A live authenticated binding to an identity snapshot.
#[derive(Debug, Clone)]
pub struct Session {
    pub handle: SessionHandle,
    pub identity: Identity,
    pub login_time: u64,
    pub last_activity: u64,
    pub operations_count: u64,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    session: Option<Session>,
}

impl Slot {
    fn holds(&self, handle: SessionHandle) -> bool {
        self.generation == handle.generation && self.session.is_some()
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    active: usize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Registers a session for an identity that has already passed login.
    pub fn open(&mut self, identity: Identity) -> SessionHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let handle = SessionHandle {
            index,
            generation: slot.generation,
        };
        let now = unix_now();
        slot.session = Some(Session {
            handle,
            identity,
            login_time: now,
            last_activity: now,
            operations_count: 0,
        });
        self.active += 1;
        handle
    }

    fn slot_mut(&mut self, handle: SessionHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.holds(handle))
    }

    pub fn find(&self, handle: SessionHandle) -> Result<&Session, FsError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.session.as_ref())
            .ok_or(FsError::InvalidSession)
    }

    /// Records one operation on the session and returns a snapshot of it.
    pub fn touch(&mut self, handle: SessionHandle) -> Result<Session, FsError> {
        let session = self
            .slot_mut(handle)
            .and_then(|slot| slot.session.as_mut())
            .ok_or(FsError::InvalidSession)?;

        session.last_activity = unix_now();
        session.operations_count += 1;
        Ok(session.clone())
    }

    pub fn state(&self, handle: SessionHandle) -> SessionState {
        match self.find(handle) {
            Ok(_) => SessionState::Authenticated,
            Err(_) => SessionState::Closed,
        }
    }

    pub fn close(&mut self, handle: SessionHandle) -> Result<Session, FsError> {
        let slot = self.slot_mut(handle).ok_or(FsError::InvalidSession)?;
        let session = slot.session.take().ok_or(FsError::InvalidSession)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.active -= 1;
        Ok(session)
    }

    /// Closes every session bound to `username`; returns how many.
    pub fn close_all_for(&mut self, username: &str) -> usize {
        let handles: Vec<SessionHandle> = self
            .slots
            .iter()
            .filter_map(|slot| slot.session.as_ref())
            .filter(|session| session.identity.username == username)
            .map(|session| session.handle)
            .collect();

        handles
            .into_iter()
            .filter(|handle| self.close(*handle).is_ok())
            .count()
    }

    pub fn close_all(&mut self) -> usize {
        let handles: Vec<SessionHandle> = self
            .slots
            .iter()
            .filter_map(|slot| slot.session.as_ref())
            .map(|session| session.handle)
            .collect();

        handles
            .into_iter()
            .filter(|handle| self.close(*handle).is_ok())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::UserRole;

    fn identity(name: &str) -> Identity {
        Identity::new(name, "pw", UserRole::Normal)
    }

    #[test]
    fn test_open_find_close() {
        let mut registry = SessionRegistry::new();
        let handle = registry.open(identity("alice"));

        assert_eq!(registry.state(handle), SessionState::Authenticated);
        assert_eq!(registry.find(handle).unwrap().identity.username, "alice");
        assert_eq!(registry.active_count(), 1);

        registry.close(handle).unwrap();
        assert_eq!(registry.state(handle), SessionState::Closed);
        assert!(matches!(
            registry.find(handle),
            Err(FsError::InvalidSession)
        ));
        assert!(matches!(
            registry.close(handle),
            Err(FsError::InvalidSession)
        ));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_stale_handle_does_not_resolve_to_reused_slot() {
        let mut registry = SessionRegistry::new();
        let first = registry.open(identity("alice"));
        registry.close(first).unwrap();

        let second = registry.open(identity("bob"));
        assert_ne!(first, second);
        assert!(registry.find(first).is_err());
        assert_eq!(registry.find(second).unwrap().identity.username, "bob");
    }

    #[test]
    fn test_touch_counts_operations() {
        let mut registry = SessionRegistry::new();
        let handle = registry.open(identity("alice"));
        registry.touch(handle).unwrap();
        let snapshot = registry.touch(handle).unwrap();
        assert_eq!(snapshot.operations_count, 2);
    }

    #[test]
    fn test_close_all_for_user() {
        let mut registry = SessionRegistry::new();
        let a1 = registry.open(identity("alice"));
        let a2 = registry.open(identity("alice"));
        let b = registry.open(identity("bob"));

        assert_eq!(registry.close_all_for("alice"), 2);
        assert!(registry.find(a1).is_err());
        assert!(registry.find(a2).is_err());
        assert!(registry.find(b).is_ok());

        assert_eq!(registry.close_all(), 1);
        assert_eq!(registry.active_count(), 0);
    }
}
