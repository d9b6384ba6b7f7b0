//! Entry permissions
//!
//! Unix-style permission bits and the ownership checks built on them.

use crate::auth::{Identity, UserRole};
use crate::storage::namespace::Entry;

pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;
pub const DEFAULT_DIR_PERMISSIONS: u32 = 0o755;

pub const OTHERS_READ: u32 = 0o004;
pub const OTHERS_WRITE: u32 = 0o002;

/// Highest meaningful permission mask
pub const PERMISSION_MASK: u32 = 0o7777;

fn is_owner_or_admin(identity: &Identity, entry: &Entry) -> bool {
    identity.role == UserRole::Admin || identity.username == entry.owner
}

/// May change permissions or delete the entry
pub fn can_administer(identity: &Identity, entry: &Entry) -> bool {
    is_owner_or_admin(identity, entry)
}

/// Check if the entry's payload is readable by this identity
pub fn is_readable(identity: &Identity, entry: &Entry) -> bool {
    is_owner_or_admin(identity, entry) || entry.permissions & OTHERS_READ != 0
}

/// Check if the entry's payload or name may be changed by this identity
pub fn is_writable(identity: &Identity, entry: &Entry) -> bool {
    is_owner_or_admin(identity, entry) || entry.permissions & OTHERS_WRITE != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::namespace::EntryKind;

    fn user(name: &str, role: UserRole) -> Identity {
        Identity::new(name, "pw", role)
    }

    #[test]
    fn test_owner_and_admin_rules() {
        let entry = Entry::new("a.txt", EntryKind::File, "alice", DEFAULT_FILE_PERMISSIONS);
        let alice = user("alice", UserRole::Normal);
        let bob = user("bob", UserRole::Normal);
        let root = user("root", UserRole::Admin);

        assert!(can_administer(&alice, &entry));
        assert!(can_administer(&root, &entry));
        assert!(!can_administer(&bob, &entry));

        assert!(is_readable(&bob, &entry));
        assert!(!is_writable(&bob, &entry));
        assert!(is_writable(&root, &entry));
    }

    #[test]
    fn test_others_bits() {
        let mut entry = Entry::new("a.txt", EntryKind::File, "alice", 0o600);
        let bob = user("bob", UserRole::Normal);
        assert!(!is_readable(&bob, &entry));

        entry.permissions = 0o666;
        assert!(is_readable(&bob, &entry));
        assert!(is_writable(&bob, &entry));
    }
}
