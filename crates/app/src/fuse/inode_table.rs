//! Inode to path mapping for the FUSE adapter
//!
//! FUSE identifies files by inode (u64), the store by path.
//! This module provides bidirectional mapping between them.

use std::collections::HashMap;

/// Bidirectional mapping between inodes and paths
pub struct InodeTable {
    path_to_inode: HashMap<String, u64>,
    inode_to_path: HashMap<u64, String>,
    next_inode: u64,
}

impl InodeTable {
    pub const ROOT_INODE: u64 = 1;

    /// Create a new inode table with the mount root at inode 1
    pub fn new() -> Self {
        let mut table = Self {
            path_to_inode: HashMap::new(),
            inode_to_path: HashMap::new(),
            next_inode: Self::ROOT_INODE + 1,
        };

        table.path_to_inode.insert("/".to_string(), Self::ROOT_INODE);
        table.inode_to_path.insert(Self::ROOT_INODE, "/".to_string());

        table
    }

    /// Get inode for a path, allocating one if it doesn't exist
    pub fn get_or_create(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.path_to_inode.get(path) {
            return ino;
        }

        let ino = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(path.to_string(), ino);
        self.inode_to_path.insert(ino, path.to_string());
        ino
    }

    /// Get path for an inode
    pub fn get_path(&self, inode: u64) -> Option<&str> {
        self.inode_to_path.get(&inode).map(|p| p.as_str())
    }

    /// Forget a deleted path. The root is never forgotten.
    pub fn remove_by_path(&mut self, path: &str) {
        if path == "/" {
            return;
        }
        if let Some(ino) = self.path_to_inode.remove(path) {
            self.inode_to_path.remove(&ino);
        }
    }

    /// Absolute path of `name` inside `parent`
    pub fn child_path(parent: &str, name: &str) -> String {
        if parent == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent, name)
        }
    }

    /// Parent of an absolute path (`/` for top-level entries and the root)
    pub fn parent_path(path: &str) -> String {
        match path.rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(idx) => path[..idx].to_string(),
        }
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_inode_one() {
        let table = InodeTable::new();
        assert_eq!(table.get_path(InodeTable::ROOT_INODE), Some("/"));
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let mut table = InodeTable::new();
        let a = table.get_or_create("/a");
        let b = table.get_or_create("/a/b");
        assert_ne!(a, b);
        assert_eq!(table.get_or_create("/a"), a);
        assert_eq!(table.get_path(b), Some("/a/b"));
    }

    #[test]
    fn test_remove_by_path() {
        let mut table = InodeTable::new();
        let ino = table.get_or_create("/gone");
        table.remove_by_path("/gone");
        assert_eq!(table.get_path(ino), None);

        // A recreated path gets a fresh inode
        assert_ne!(table.get_or_create("/gone"), ino);

        table.remove_by_path("/");
        assert_eq!(table.get_path(InodeTable::ROOT_INODE), Some("/"));
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(InodeTable::child_path("/", "a"), "/a");
        assert_eq!(InodeTable::child_path("/a", "b"), "/a/b");
        assert_eq!(InodeTable::parent_path("/a/b"), "/a");
        assert_eq!(InodeTable::parent_path("/a"), "/");
        assert_eq!(InodeTable::parent_path("/"), "/");
    }
}
