//! Identity store
//!
//! Registered accounts keyed by username. Usernames are case-sensitive.

use std::collections::HashMap;
use std::fmt;

use crate::error::FsError;
use crate::utils::time::unix_now;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Normal,
    Admin,
}

impl UserRole {
    /// Accepts `0`/`normal` and `1`/`admin`, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "0" | "normal" => Some(UserRole::Normal),
            "1" | "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Normal => f.write_str("normal"),
            UserRole::Admin => f.write_str("admin"),
        }
    }
}

/// A registered user account.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub username: String,
    /// Compared byte for byte; the hashing scheme is the caller's concern.
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: u64,
    pub last_login: u64,
}

impl Identity {
    pub fn new(username: &str, password_hash: &str, role: UserRole) -> Self {
        Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            is_active: true,
            created_at: unix_now(),
            last_login: 0,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug)]
pub struct IdentityStore {
    users: HashMap<String, Identity>,
    max_users: u32,
}

impl IdentityStore {
    pub fn new(max_users: u32) -> Self {
        Self {
            users: HashMap::new(),
            max_users,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn add(&mut self, identity: Identity) -> Result<(), FsError> {
        if self.users.contains_key(&identity.username) {
            return Err(FsError::AlreadyExists(format!(
                "user {}",
                identity.username
            )));
        }

        if self.users.len() >= self.max_users as usize {
            return Err(FsError::NoSpace {
                requested: 1,
                available: 0,
            });
        }

        self.users.insert(identity.username.clone(), identity);
        Ok(())
    }

    pub fn remove(&mut self, username: &str) -> Result<Identity, FsError> {
        self.users
            .remove(username)
            .ok_or_else(|| FsError::NotFound(format!("user {}", username)))
    }

    pub fn find(&self, username: &str) -> Option<&Identity> {
        self.users.get(username)
    }

    /// Checks credentials and stamps `last_login` on success.
    pub fn verify_login(&mut self, username: &str, password: &str) -> Result<Identity, FsError> {
        let identity = self
            .users
            .get_mut(username)
            .ok_or_else(|| FsError::NotFound(format!("user {}", username)))?;

        if !identity.is_active {
            return Err(FsError::InvalidSession);
        }

        if identity.password_hash.as_bytes() != password.as_bytes() {
            return Err(FsError::PermissionDenied(format!(
                "wrong password for {}",
                username
            )));
        }

        identity.last_login = unix_now();
        Ok(identity.clone())
    }

    pub fn set_active(&mut self, username: &str, active: bool) -> Result<(), FsError> {
        let identity = self
            .users
            .get_mut(username)
            .ok_or_else(|| FsError::NotFound(format!("user {}", username)))?;
        identity.is_active = active;
        Ok(())
    }

    /// All identities ordered by username ascending.
    pub fn list(&self) -> Vec<Identity> {
        let mut users: Vec<Identity> = self.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn seeded() -> IdentityStore {
        let mut store = IdentityStore::new(3);
        store
            .add(Identity::new("root", "root", UserRole::Admin))
            .unwrap();
        store
    }

    #[test]
    fn test_add_rejects_duplicates_and_overflow() {
        let mut store = seeded();
        let err = store
            .add(Identity::new("root", "x", UserRole::Normal))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        store
            .add(Identity::new("alice", "a", UserRole::Normal))
            .unwrap();
        store
            .add(Identity::new("bob", "b", UserRole::Normal))
            .unwrap();
        let err = store
            .add(Identity::new("carol", "c", UserRole::Normal))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSpace);
    }

    #[test]
    fn test_usernames_are_case_sensitive() {
        let mut store = seeded();
        store
            .add(Identity::new("Root", "x", UserRole::Normal))
            .unwrap();
        assert!(store.find("ROOT").is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_verify_login_outcomes() {
        let mut store = seeded();
        store
            .add(Identity::new("alice", "hash123", UserRole::Normal))
            .unwrap();

        assert_eq!(
            store.verify_login("nobody", "x").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.verify_login("alice", "wrong").unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );

        let alice = store.verify_login("alice", "hash123").unwrap();
        assert!(alice.last_login > 0);
        assert_eq!(store.find("alice").unwrap().last_login, alice.last_login);

        store.set_active("alice", false).unwrap();
        assert_eq!(
            store.verify_login("alice", "hash123").unwrap_err().kind(),
            ErrorKind::InvalidSession
        );
    }

    #[test]
    fn test_list_is_sorted() {
        let mut store = IdentityStore::new(10);
        for name in ["mallory", "alice", "root", "bob"] {
            store
                .add(Identity::new(name, "pw", UserRole::Normal))
                .unwrap();
        }
        let names: Vec<String> = store.list().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["alice", "bob", "mallory", "root"]);
    }

    #[test]
    fn test_remove_missing() {
        let mut store = seeded();
        assert_eq!(
            store.remove("ghost").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(store.remove("root").unwrap().username, "root");
        assert!(store.is_empty());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(UserRole::parse("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("0"), Some(UserRole::Normal));
        assert_eq!(UserRole::parse("2"), None);
    }
}
