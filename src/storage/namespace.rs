//! Namespace tree
//!
//! Directories and files live in an arena keyed by `EntryId`. Each node keeps
//! its parent id and the ids of its direct children, so no node owns another
//! and removal is an unlink plus an arena delete.

use std::collections::HashMap;
use std::fmt;

use crate::error::FsError;
use crate::storage::permissions::DEFAULT_DIR_PERMISSIONS;
use crate::storage::validation::{join, split_parent, split_path};
use crate::utils::time::unix_now;

/// Stable identifier of a namespace entry. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

impl EntryId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

pub const ROOT_ID: EntryId = EntryId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// Metadata of one namespace node.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub permissions: u32,
    pub owner: String,
    pub created_at: u64,
    pub modified_at: u64,
    /// Creation order, for display only
    pub sequence_id: u64,
}

impl Entry {
    pub fn new(name: &str, kind: EntryKind, owner: &str, permissions: u32) -> Self {
        let now = unix_now();
        Self {
            name: name.to_string(),
            kind,
            size: 0,
            permissions,
            owner: owner.to_string(),
            created_at: now,
            modified_at: now,
            sequence_id: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn touch(&mut self) {
        self.modified_at = unix_now();
    }
}

#[derive(Debug)]
struct Node {
    entry: Entry,
    parent: Option<EntryId>,
    children: Vec<EntryId>,
}

/// Hierarchical path → entry index rooted at `/`.
#[derive(Debug)]
pub struct Namespace {
    nodes: HashMap<EntryId, Node>,
    next_id: u64,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        let root = Node {
            entry: Entry::new("/", EntryKind::Directory, "root", DEFAULT_DIR_PERMISSIONS),
            parent: None,
            children: Vec::new(),
        };

        let mut nodes = HashMap::new();
        nodes.insert(ROOT_ID, root);

        Self { nodes, next_id: 1 }
    }

    /// Number of entries including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.nodes.get(&id).map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.nodes.get_mut(&id).map(|node| &mut node.entry)
    }

    fn child_named(&self, parent: EntryId, name: &str) -> Option<EntryId> {
        self.nodes.get(&parent).and_then(|node| {
            node.children
                .iter()
                .copied()
                .find(|child| self.get(*child).is_some_and(|e| e.name == name))
        })
    }

    fn walk(&self, components: &[&str]) -> Option<EntryId> {
        components
            .iter()
            .try_fold(ROOT_ID, |current, part| self.child_named(current, part))
    }

    /// Resolves a path to the directory that would hold its final component.
    fn resolve_parent_dir(&self, components: &[&str], path: &str) -> Result<EntryId, FsError> {
        self.walk(components)
            .filter(|id| self.get(*id).is_some_and(Entry::is_dir))
            .ok_or_else(|| FsError::NotFound(format!("parent of {}", path)))
    }

    /// Resolves a path to its entry id.
    pub fn resolve(&self, path: &str) -> Result<EntryId, FsError> {
        let components = split_path(path)?;
        self.walk(&components)
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    pub fn find(&self, path: &str) -> Result<&Entry, FsError> {
        let id = self.resolve(path)?;
        self.get(id)
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// Inserts `entry` at `path`. The parent directory must already exist.
    pub fn create(&mut self, path: &str, mut entry: Entry) -> Result<EntryId, FsError> {
        let (parent_components, name) = split_parent(path)?;
        let parent = self.resolve_parent_dir(&parent_components, path)?;

        if self.child_named(parent, name).is_some() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }

        let id = EntryId(self.next_id);
        self.next_id += 1;

        entry.name = name.to_string();
        entry.sequence_id = id.0;

        self.nodes.insert(
            id,
            Node {
                entry,
                parent: Some(parent),
                children: Vec::new(),
            },
        );

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
            parent_node.entry.touch();
        }

        Ok(id)
    }

    /// Removes a file or an empty directory, returning what was removed.
    pub fn remove(&mut self, path: &str) -> Result<(EntryId, Entry), FsError> {
        let id = self.resolve(path)?;
        if id == ROOT_ID {
            return Err(FsError::InvalidOperation(
                "the root directory cannot be removed".into(),
            ));
        }

        let has_children = self
            .nodes
            .get(&id)
            .is_some_and(|node| !node.children.is_empty());
        if has_children {
            return Err(FsError::NotEmpty(path.to_string()));
        }

        self.unlink(id);
        let node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        Ok((id, node.entry))
    }

    /// Direct children of a directory, in creation order.
    pub fn list(&self, path: &str) -> Result<Vec<Entry>, FsError> {
        let id = self.resolve(path)?;
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        if !node.entry.is_dir() {
            return Err(FsError::InvalidOperation(format!(
                "{} is not a directory",
                path
            )));
        }

        Ok(node
            .children
            .iter()
            .filter_map(|child| self.get(*child).cloned())
            .collect())
    }

    /// Moves the entry at `path` to `new_path`; the id, and so any content keyed
    /// by it, stays the same.
    pub fn rename(&mut self, path: &str, new_path: &str) -> Result<EntryId, FsError> {
        let (new_parent_components, new_name) = split_parent(new_path)?;
        let id = self.resolve(path)?;
        if id == ROOT_ID {
            return Err(FsError::InvalidOperation(
                "the root directory cannot be renamed".into(),
            ));
        }

        let new_parent = self.resolve_parent_dir(&new_parent_components, new_path)?;

        if self.child_named(new_parent, new_name).is_some() {
            return Err(FsError::AlreadyExists(new_path.to_string()));
        }

        if self.is_self_or_ancestor(id, new_parent) {
            return Err(FsError::InvalidOperation(format!(
                "cannot move {} inside itself",
                path
            )));
        }

        self.unlink(id);

        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
            node.entry.name = new_name.to_string();
            node.entry.touch();
        }

        if let Some(parent_node) = self.nodes.get_mut(&new_parent) {
            parent_node.children.push(id);
            parent_node.entry.touch();
        }

        Ok(id)
    }

    /// Rebuilds the absolute path of an entry by walking parent links.
    pub fn path_of(&self, id: EntryId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = id;
        loop {
            let node = self.nodes.get(&current)?;
            match node.parent {
                Some(parent) => {
                    names.push(node.entry.name.as_str());
                    current = parent;
                }
                None => break,
            }
        }
        names.reverse();
        Some(join(&names))
    }

    fn is_self_or_ancestor(&self, candidate: EntryId, mut id: EntryId) -> bool {
        loop {
            if id == candidate {
                return true;
            }
            match self.nodes.get(&id).and_then(|node| node.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn unlink(&mut self, id: EntryId) {
        let parent = self.nodes.get(&id).and_then(|node| node.parent);
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent_node.children.retain(|child| *child != id);
            parent_node.entry.touch();
        }
    }
}
