//! Filesystem engine
//!
//! Owns every piece of store state and exposes the operation set the
//! protocol layer calls. Identities, the namespace, file content and the
//! stat counters live behind one `RwLock`; the session registry has its own
//! `Mutex`. When both are needed the store lock is taken first.

use log::{debug, info, warn};
use std::path::Path;
use std::sync::{
    Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::auth::{
    Identity, IdentityStore, Session, SessionHandle, SessionRegistry, SessionState, UserRole,
    validate_password, validate_username,
};
use crate::config::StorageConfig;
use crate::engine::results::EntryMetadata;
use crate::error::FsError;
use crate::storage::permissions::{
    DEFAULT_DIR_PERMISSIONS, DEFAULT_FILE_PERMISSIONS, PERMISSION_MASK, can_administer,
    is_readable, is_writable,
};
use crate::storage::{
    ContentStore, Entry, EntryId, EntryKind, FsStats, Namespace, ROOT_ID, StoreHeader, format,
    read_header,
};

/// Seeded administrator account
pub const ROOT_USER: &str = "root";
const ROOT_PASSWORD: &str = "root";

#[derive(Debug)]
struct StoreState {
    identities: IdentityStore,
    namespace: Namespace,
    content: ContentStore,
    stats: FsStats,
}

impl StoreState {
    /// Resolves `path` to a file entry, rejecting directories.
    fn file(&self, path: &str) -> Result<(EntryId, &Entry), FsError> {
        let id = self.namespace.resolve(path)?;
        let entry = self
            .namespace
            .get(id)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        if !entry.is_file() {
            return Err(FsError::InvalidOperation(format!(
                "{} is a directory",
                path
            )));
        }
        Ok((id, entry))
    }

    fn set_size(&mut self, id: EntryId, size: u64) {
        if let Some(entry) = self.namespace.get_mut(id) {
            entry.size = size;
            entry.touch();
        }
    }
}

#[derive(Debug)]
pub struct FilesystemEngine {
    header: StoreHeader,
    store: RwLock<StoreState>,
    sessions: Mutex<SessionRegistry>,
}

impl FilesystemEngine {
    /// Opens the store whose header lives at `store_path`.
    ///
    /// Fails `NotFound` when no header exists and `Io` when it is corrupt.
    /// Settings in `config_path` must parse, but the header's geometry wins.
    pub fn init(store_path: &Path, config_path: &Path) -> Result<Self, FsError> {
        let header = read_header(store_path)?;
        let configured = StorageConfig::load(config_path)?;

        if configured.total_size != header.total_size || configured.block_size != header.block_size
        {
            warn!(
                "Config geometry ({} bytes / {} byte blocks) differs from the store header",
                configured.total_size, configured.block_size
            );
        }

        let engine = Self::from_header(header)?;
        info!(
            "Store {} opened: {} bytes in {} blocks of {} bytes",
            store_path.display(),
            engine.header.total_size,
            engine.header.total_blocks(),
            engine.header.block_size
        );
        Ok(engine)
    }

    /// Builds an empty store for the given geometry with `root` seeded.
    pub fn from_header(header: StoreHeader) -> Result<Self, FsError> {
        let mut identities = IdentityStore::new(header.max_users);
        let root = Identity::new(ROOT_USER, ROOT_PASSWORD, UserRole::Admin);
        identities.add(root)?;

        let mut stats = FsStats::new(header.total_size, header.block_size);
        stats.total_users = identities.len() as u32;

        let state = StoreState {
            identities,
            namespace: Namespace::new(),
            content: ContentStore::new(header.total_blocks(), header.block_size),
            stats,
        };

        Ok(Self {
            header,
            store: RwLock::new(state),
            sessions: Mutex::new(SessionRegistry::new()),
        })
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    /// Closes every live session. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let closed = self.sessions().close_all();
        info!("Engine shut down, {} session(s) closed", closed);
        closed
    }

    fn read_store(&self) -> RwLockReadGuard<'_, StoreState> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, SessionRegistry> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates the handle, counts the operation and returns the caller's identity.
    fn authorize(&self, handle: SessionHandle) -> Result<Identity, FsError> {
        self.sessions()
            .touch(handle)
            .map(|session| session.identity)
    }

    fn authorize_admin(&self, handle: SessionHandle) -> Result<Identity, FsError> {
        let identity = self.authorize(handle)?;
        if !identity.is_admin() {
            return Err(FsError::PermissionDenied(format!(
                "{} is not an administrator",
                identity.username
            )));
        }
        Ok(identity)
    }

    // --------------------
    // Sessions
    // --------------------

    /// Verifies credentials and opens a session.
    ///
    /// The store lock is held until the session exists, so a concurrent
    /// removal or deactivation either rejects the login or closes the session.
    pub fn login(&self, username: &str, password: &str) -> Result<SessionHandle, FsError> {
        let mut store = self.write_store();
        let identity = store.identities.verify_login(username, password)?;
        let handle = self.sessions().open(identity);
        drop(store);
        info!("User {} logged in (session {})", username, handle);
        Ok(handle)
    }

    pub fn logout(&self, handle: SessionHandle) -> Result<(), FsError> {
        let session = self.sessions().close(handle)?;
        info!(
            "User {} logged out after {} operation(s)",
            session.identity.username, session.operations_count
        );
        Ok(())
    }

    /// Snapshot of the caller's session.
    pub fn session_info(&self, handle: SessionHandle) -> Result<Session, FsError> {
        self.sessions().touch(handle)
    }

    pub fn session_state(&self, handle: SessionHandle) -> SessionState {
        self.sessions().state(handle)
    }

    // --------------------
    // User administration
    // --------------------

    pub fn create_user(
        &self,
        handle: SessionHandle,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> Result<(), FsError> {
        let admin = self.authorize_admin(handle)?;
        validate_username(username)?;
        validate_password(password)?;

        let mut store = self.write_store();
        let user = Identity::new(username, password, role);
        store.identities.add(user)?;
        store.stats.total_users = store.identities.len() as u32;

        info!(
            "User {} created by {} with role {}",
            username, admin.username, role
        );
        Ok(())
    }

    /// Removes an account and closes all of its sessions.
    pub fn remove_user(&self, handle: SessionHandle, username: &str) -> Result<(), FsError> {
        let admin = self.authorize_admin(handle)?;
        if username == ROOT_USER {
            return Err(FsError::InvalidOperation(
                "the root account cannot be removed".into(),
            ));
        }

        let mut store = self.write_store();
        store.identities.remove(username)?;
        store.stats.total_users = store.identities.len() as u32;
        let closed = self.sessions().close_all_for(username);
        drop(store);

        info!(
            "User {} removed by {} ({} session(s) closed)",
            username, admin.username, closed
        );
        Ok(())
    }

    pub fn list_users(&self, handle: SessionHandle) -> Result<Vec<Identity>, FsError> {
        self.authorize_admin(handle)?;
        Ok(self.read_store().identities.list())
    }

    /// Enables or disables an account. Disabling closes its sessions.
    pub fn set_user_active(
        &self,
        handle: SessionHandle,
        username: &str,
        active: bool,
    ) -> Result<(), FsError> {
        let admin = self.authorize_admin(handle)?;
        if username == ROOT_USER && !active {
            return Err(FsError::InvalidOperation(
                "the root account cannot be deactivated".into(),
            ));
        }

        let mut store = self.write_store();
        store.identities.set_active(username, active)?;
        if !active {
            self.sessions().close_all_for(username);
        }
        drop(store);

        info!(
            "User {} {} by {}",
            username,
            if active { "activated" } else { "deactivated" },
            admin.username
        );
        Ok(())
    }

    // --------------------
    // Directories
    // --------------------

    pub fn create_directory(&self, handle: SessionHandle, path: &str) -> Result<(), FsError> {
        let identity = self.authorize(handle)?;
        let entry = Entry::new(
            "",
            EntryKind::Directory,
            &identity.username,
            DEFAULT_DIR_PERMISSIONS,
        );

        let mut store = self.write_store();
        store.namespace.create(path, entry)?;
        store.stats.total_directories += 1;

        info!("{} created directory {}", identity.username, path);
        Ok(())
    }

    /// Removes an empty directory. Owner or administrator only.
    pub fn remove_directory(&self, handle: SessionHandle, path: &str) -> Result<(), FsError> {
        let identity = self.authorize(handle)?;
        let mut store = self.write_store();

        let id = store.namespace.resolve(path)?;
        if id == ROOT_ID {
            return Err(FsError::InvalidOperation(
                "the root directory cannot be removed".into(),
            ));
        }
        let entry = store
            .namespace
            .get(id)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        if !entry.is_dir() {
            return Err(FsError::InvalidOperation(format!(
                "{} is not a directory",
                path
            )));
        }
        if !can_administer(&identity, entry) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        store.namespace.remove(path)?;
        store.stats.total_directories -= 1;

        info!("{} removed directory {}", identity.username, path);
        Ok(())
    }

    /// Direct children of `path`.
    pub fn list_directory(&self, handle: SessionHandle, path: &str) -> Result<Vec<Entry>, FsError> {
        self.authorize(handle)?;
        let entries = self.read_store().namespace.list(path)?;
        debug!("Listed {} ({} entries)", path, entries.len());
        Ok(entries)
    }

    /// `false` for a missing path, a malformed path, or a file.
    pub fn directory_exists(&self, handle: SessionHandle, path: &str) -> Result<bool, FsError> {
        self.authorize(handle)?;
        let store = self.read_store();
        Ok(store.namespace.find(path).is_ok_and(Entry::is_dir))
    }

    // --------------------
    // Files
    // --------------------

    /// Creates a file holding `data`. Nothing is left behind on failure.
    pub fn create_file(
        &self,
        handle: SessionHandle,
        path: &str,
        data: &[u8],
    ) -> Result<(), FsError> {
        let identity = self.authorize(handle)?;
        let entry = Entry::new(
            "",
            EntryKind::File,
            &identity.username,
            DEFAULT_FILE_PERMISSIONS,
        );

        let mut guard = self.write_store();
        let store = &mut *guard;

        let id = store.namespace.create(path, entry)?;
        if let Err(e) = store.content.write(id, data, &mut store.stats) {
            store.namespace.remove(path)?;
            return Err(e);
        }
        store.set_size(id, data.len() as u64);

        info!(
            "{} created file {} ({} bytes)",
            identity.username,
            path,
            data.len()
        );
        Ok(())
    }

    pub fn read_file(&self, handle: SessionHandle, path: &str) -> Result<Vec<u8>, FsError> {
        let identity = self.authorize(handle)?;
        let store = self.read_store();

        let (id, entry) = store.file(path)?;
        if !is_readable(&identity, entry) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        let data = store.content.read(id)?;
        debug!("{} read {} ({} bytes)", identity.username, path, data.len());
        Ok(data)
    }

    /// Writes `data` at `offset`; returns the new file size.
    pub fn edit_file(
        &self,
        handle: SessionHandle,
        path: &str,
        data: &[u8],
        offset: u64,
    ) -> Result<u64, FsError> {
        let identity = self.authorize(handle)?;
        let mut guard = self.write_store();
        let store = &mut *guard;

        let (id, entry) = store.file(path)?;
        if !is_writable(&identity, entry) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        let size = store.content.edit(id, data, offset, &mut store.stats)?;
        store.set_size(id, size);

        info!(
            "{} edited {} at offset {} ({} bytes, size now {})",
            identity.username,
            path,
            offset,
            data.len(),
            size
        );
        Ok(size)
    }

    pub fn truncate_file(&self, handle: SessionHandle, path: &str) -> Result<(), FsError> {
        let identity = self.authorize(handle)?;
        let mut guard = self.write_store();
        let store = &mut *guard;

        let (id, entry) = store.file(path)?;
        if !is_writable(&identity, entry) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        store.content.truncate(id, &mut store.stats)?;
        store.set_size(id, 0);

        info!("{} truncated {}", identity.username, path);
        Ok(())
    }

    /// Deletes a file. Owner or administrator only.
    pub fn delete_file(&self, handle: SessionHandle, path: &str) -> Result<(), FsError> {
        let identity = self.authorize(handle)?;
        let mut guard = self.write_store();
        let store = &mut *guard;

        let (id, entry) = store.file(path)?;
        if !can_administer(&identity, entry) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        let freed = store.content.delete(id, &mut store.stats)?;
        store.namespace.remove(path)?;

        info!(
            "{} deleted {} ({} bytes freed)",
            identity.username, path, freed
        );
        Ok(())
    }

    /// Moves a file to `new_path`; its content follows.
    pub fn rename_file(
        &self,
        handle: SessionHandle,
        path: &str,
        new_path: &str,
    ) -> Result<(), FsError> {
        let identity = self.authorize(handle)?;
        let mut store = self.write_store();

        let (_, entry) = store.file(path)?;
        if !is_writable(&identity, entry) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        store.namespace.rename(path, new_path)?;

        info!("{} renamed {} to {}", identity.username, path, new_path);
        Ok(())
    }

    /// `false` for a missing path, a malformed path, or a directory.
    pub fn file_exists(&self, handle: SessionHandle, path: &str) -> Result<bool, FsError> {
        self.authorize(handle)?;
        let store = self.read_store();
        Ok(store.namespace.find(path).is_ok_and(Entry::is_file))
    }

    // --------------------
    // Metadata and stats
    // --------------------

    pub fn get_metadata(
        &self,
        handle: SessionHandle,
        path: &str,
    ) -> Result<EntryMetadata, FsError> {
        self.authorize(handle)?;
        let store = self.read_store();

        let id = store.namespace.resolve(path)?;
        let entry = store
            .namespace
            .get(id)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        let blocks_used = store.content.get(id).map_or(0, |record| record.blocks_used);
        let path = store
            .namespace
            .path_of(id)
            .unwrap_or_else(|| path.to_string());

        Ok(EntryMetadata {
            path,
            entry,
            blocks_used,
        })
    }

    /// Replaces the permission bits. Owner or administrator only.
    pub fn set_permissions(
        &self,
        handle: SessionHandle,
        path: &str,
        permissions: u32,
    ) -> Result<(), FsError> {
        let identity = self.authorize(handle)?;
        if permissions > PERMISSION_MASK {
            return Err(FsError::InvalidOperation(format!(
                "permission mask {:o} out of range",
                permissions
            )));
        }

        let mut store = self.write_store();
        let id = store.namespace.resolve(path)?;
        let entry = store
            .namespace
            .get_mut(id)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        if !can_administer(&identity, entry) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        entry.permissions = permissions;
        entry.touch();

        info!(
            "{} set permissions of {} to {:o}",
            identity.username, path, permissions
        );
        Ok(())
    }

    pub fn get_stats(&self, handle: SessionHandle) -> Result<FsStats, FsError> {
        self.authorize(handle)?;
        let mut stats = self.read_store().stats;
        stats.active_sessions = self.sessions().active_count() as u32;
        Ok(stats)
    }
}

/// Opens the store at `store_path`, formatting it once if it cannot be opened.
pub fn open_or_format(store_path: &Path, config_path: &Path) -> Result<FilesystemEngine, FsError> {
    match FilesystemEngine::init(store_path, config_path) {
        Ok(engine) => Ok(engine),
        Err(e) => {
            warn!(
                "Cannot open store {} ({}), formatting a new one",
                store_path.display(),
                e
            );
            format(store_path, config_path)?;
            FilesystemEngine::init(store_path, config_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::thread;
    use std::time::Duration;

    const BLOCK: u64 = 64;

    fn engine() -> FilesystemEngine {
        let storage = StorageConfig {
            total_size: 64 * BLOCK,
            block_size: BLOCK,
            max_users: 8,
            ..StorageConfig::default()
        };
        let header = StoreHeader::from_config(&storage).unwrap();
        FilesystemEngine::from_header(header).unwrap()
    }

    fn with_user(engine: &FilesystemEngine, name: &str) -> SessionHandle {
        let root = engine.login("root", "root").unwrap();
        engine
            .create_user(root, name, "pw", UserRole::Normal)
            .unwrap();
        engine.login(name, "pw").unwrap()
    }

    #[test]
    fn test_fresh_store_stats() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        let stats = engine.get_stats(root).unwrap();

        assert_eq!(stats.total_size, 64 * BLOCK);
        assert_eq!(stats.used_space, 0);
        assert_eq!(stats.total_directories, 1);
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.active_sessions, 1);
    }

    #[test]
    fn test_operations_require_session() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        engine.logout(root).unwrap();

        assert_eq!(
            engine.create_directory(root, "/a").unwrap_err().kind(),
            ErrorKind::InvalidSession
        );
        assert_eq!(engine.session_state(root), SessionState::Closed);
    }

    #[test]
    fn test_normal_user_cannot_administer_users() {
        let engine = engine();
        let alice = with_user(&engine, "alice");
        assert_eq!(
            engine
                .create_user(alice, "bob", "pw", UserRole::Normal)
                .unwrap_err()
                .kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            engine.list_users(alice).unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_root_account_is_protected() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        assert_eq!(
            engine.remove_user(root, "root").unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(
            engine
                .set_user_active(root, "root", false)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidOperation
        );
    }

    #[test]
    fn test_removing_user_closes_sessions() {
        let engine = engine();
        let alice = with_user(&engine, "alice");
        let root = engine.login("root", "root").unwrap();

        engine.remove_user(root, "alice").unwrap();
        assert_eq!(engine.session_state(alice), SessionState::Closed);
        assert_eq!(engine.get_stats(root).unwrap().total_users, 1);
    }

    #[test]
    fn test_deactivated_user_cannot_log_in() {
        let engine = engine();
        let alice = with_user(&engine, "alice");
        let root = engine.login("root", "root").unwrap();

        engine.set_user_active(root, "alice", false).unwrap();
        assert_eq!(engine.session_state(alice), SessionState::Closed);
        assert_eq!(
            engine.login("alice", "pw").unwrap_err().kind(),
            ErrorKind::InvalidSession
        );

        engine.set_user_active(root, "alice", true).unwrap();
        assert!(engine.login("alice", "pw").is_ok());
    }

    #[test]
    fn test_permission_rules_on_files() {
        let engine = engine();
        let alice = with_user(&engine, "alice");
        let root = engine.login("root", "root").unwrap();
        engine
            .create_user(root, "bob", "pw", UserRole::Normal)
            .unwrap();
        let bob = engine.login("bob", "pw").unwrap();

        engine.create_file(alice, "/a.txt", b"secret").unwrap();

        // 0o644: others may read but not write
        assert_eq!(engine.read_file(bob, "/a.txt").unwrap(), b"secret");
        assert_eq!(
            engine.edit_file(bob, "/a.txt", b"x", 0).unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            engine.delete_file(bob, "/a.txt").unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );

        engine.set_permissions(alice, "/a.txt", 0o600).unwrap();
        assert_eq!(
            engine.read_file(bob, "/a.txt").unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );

        engine.set_permissions(alice, "/a.txt", 0o666).unwrap();
        engine.edit_file(bob, "/a.txt", b"S", 0).unwrap();
        assert_eq!(engine.read_file(root, "/a.txt").unwrap(), b"Secret");

        engine.delete_file(root, "/a.txt").unwrap();
    }

    #[test]
    fn test_kind_mismatch() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        engine.create_directory(root, "/d").unwrap();
        engine.create_file(root, "/f", b"").unwrap();

        assert_eq!(
            engine.read_file(root, "/d").unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(
            engine.remove_directory(root, "/f").unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
        assert!(!engine.file_exists(root, "/d").unwrap());
        assert!(!engine.directory_exists(root, "/f").unwrap());
        assert!(engine.directory_exists(root, "/d").unwrap());
    }

    #[test]
    fn test_failed_create_leaves_nothing_behind() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        let too_big = vec![7u8; (65 * BLOCK) as usize];

        assert_eq!(
            engine
                .create_file(root, "/big", &too_big)
                .unwrap_err()
                .kind(),
            ErrorKind::NoSpace
        );
        assert!(!engine.file_exists(root, "/big").unwrap());

        let stats = engine.get_stats(root).unwrap();
        assert_eq!(stats.used_space, 0);
        assert_eq!(stats.total_files, 0);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_rename_keeps_content_and_metadata_tracks_path() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        engine.create_directory(root, "/d").unwrap();
        engine.create_file(root, "/a", b"payload").unwrap();

        engine.rename_file(root, "/a", "/d/b").unwrap();
        assert_eq!(engine.read_file(root, "/d/b").unwrap(), b"payload");

        let meta = engine.get_metadata(root, "/d/b").unwrap();
        assert_eq!(meta.path, "/d/b");
        assert_eq!(meta.entry.size, 7);
        assert_eq!(meta.blocks_used, 1);
        assert_eq!(meta.kind(), EntryKind::File);
    }

    #[test]
    fn test_truncate_and_set_permissions_range() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        engine.create_file(root, "/a", b"abc").unwrap();
        engine.truncate_file(root, "/a").unwrap();

        assert_eq!(engine.get_metadata(root, "/a").unwrap().entry.size, 0);
        assert_eq!(engine.get_stats(root).unwrap().used_space, 0);
        assert_eq!(
            engine
                .set_permissions(root, "/a", 0o17777)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidOperation
        );
    }

    #[test]
    fn test_session_info_counts_operations() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        engine.directory_exists(root, "/").unwrap();
        let info = engine.session_info(root).unwrap();
        assert_eq!(info.identity.username, "root");
        assert_eq!(info.operations_count, 2);
    }

    #[test]
    fn test_shutdown_closes_sessions() {
        let engine = engine();
        let a = engine.login("root", "root").unwrap();
        let b = engine.login("root", "root").unwrap();
        assert_eq!(engine.shutdown(), 2);
        assert_eq!(engine.session_state(a), SessionState::Closed);
        assert_eq!(engine.session_state(b), SessionState::Closed);
    }

    #[test]
    fn test_root_directory_removal_is_invalid_for_everyone() {
        let engine = engine();
        let alice = with_user(&engine, "alice");
        let root = engine.login("root", "root").unwrap();

        assert_eq!(
            engine.remove_directory(alice, "/").unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(
            engine.remove_directory(root, "/").unwrap_err().kind(),
            ErrorKind::InvalidOperation
        );
    }

    #[test]
    fn test_login_racing_deactivation_leaves_no_live_session() {
        let engine = engine();
        let root = engine.login("root", "root").unwrap();
        engine
            .create_user(root, "alice", "pw", UserRole::Normal)
            .unwrap();

        // Park the login between credential check and session open.
        let registry = engine.sessions();
        thread::scope(|scope| {
            let login = scope.spawn(|| engine.login("alice", "pw"));

            let mut waits = 0;
            while engine.store.try_write().is_ok() {
                assert!(waits < 1000, "login released the store lock early");
                thread::sleep(Duration::from_millis(1));
                waits += 1;
            }

            let deactivate = scope.spawn(|| engine.set_user_active(root, "alice", false));
            drop(registry);

            let alice = login.join().unwrap().unwrap();
            deactivate.join().unwrap().unwrap();
            assert_eq!(engine.session_state(alice), SessionState::Closed);
        });

        assert_eq!(engine.get_stats(root).unwrap().active_sessions, 1);
    }
}
