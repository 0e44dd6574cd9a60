//! FUSE filesystem backed by a ZooKeeper tree
//!
//! Implements the fuser::Filesystem trait on top of [`ZkFs`]: this layer
//! only resolves inodes to paths and marshals replies, every decision about
//! what a call means is made by the translation layer.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use tokio::runtime::Handle;

use common::fs::attr::DIR_PERM;
use common::fs::{FileAttributes, NodeKind, ZkFs};
use common::store::Store;

use crate::fuse::inode_table::InodeTable;

/// FUSE filesystem for a ZooKeeper tree
pub struct ZkFuse {
    /// Tokio runtime handle for driving store calls
    rt: Handle,
    /// Path-level translation layer
    fs: ZkFs<Arc<dyn Store>>,
    /// Inode table
    inodes: InodeTable,
    /// How long the kernel may cache attributes and entries
    ttl: Duration,
    /// Next file handle
    next_fh: u64,
    uid: u32,
    gid: u32,
}

impl ZkFuse {
    /// Block size for FUSE
    const BLOCK_SIZE: u32 = 512;

    pub fn new(rt: Handle, fs: ZkFs<Arc<dyn Store>>, ttl: Duration) -> Self {
        Self {
            rt,
            fs,
            inodes: InodeTable::new(),
            ttl,
            next_fh: 1,
            // SAFETY: getuid/getgid cannot fail
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    /// Generate the next file handle
    fn next_handle(&mut self) -> u64 {
        let fh = self.next_fh;
        self.next_fh += 1;
        fh
    }

    /// Build a FileAttr from translated attributes.
    ///
    /// The mount root is always a directory, even while the node behind it
    /// has no children.
    fn make_attr(&self, inode: u64, attr: &FileAttributes) -> FileAttr {
        let (kind, perm) = if inode == InodeTable::ROOT_INODE {
            (FileType::Directory, DIR_PERM)
        } else {
            match attr.kind {
                NodeKind::Directory => (FileType::Directory, attr.perm),
                NodeKind::Regular => (FileType::RegularFile, attr.perm),
            }
        };

        let mtime = UNIX_EPOCH + Duration::from_secs(attr.mtime.max(0) as u64);
        let ctime = UNIX_EPOCH + Duration::from_secs(attr.ctime.max(0) as u64);

        FileAttr {
            ino: inode,
            size: attr.size,
            blocks: attr.size.div_ceil(Self::BLOCK_SIZE as u64),
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: ctime,
            kind,
            perm,
            nlink: if kind == FileType::Directory { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: Self::BLOCK_SIZE,
            flags: 0,
        }
    }

    fn path_of(&self, ino: u64) -> Result<String, libc::c_int> {
        self.inodes
            .get_path(ino)
            .map(str::to_string)
            .ok_or(libc::ENOENT)
    }

    fn entry_path(&self, parent: u64, name: &OsStr) -> Result<String, libc::c_int> {
        let name = name.to_str().ok_or(libc::EINVAL)?;
        let parent_path = self.path_of(parent)?;
        Ok(InodeTable::child_path(&parent_path, name))
    }

    /// Fetch fresh attributes for `path` and bind it to an inode
    fn lookup_attr(&mut self, path: &str) -> Result<FileAttr, libc::c_int> {
        let attr = self
            .rt
            .block_on(self.fs.getattr(path))
            .map_err(|e| e.errno())?;
        let inode = self.inodes.get_or_create(path);
        Ok(self.make_attr(inode, &attr))
    }
}

impl Filesystem for ZkFuse {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        tracing::info!(
            root = self.fs.root(),
            write_policy = ?self.fs.write_policy(),
            "FUSE filesystem initialized"
        );
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!(root = self.fs.root(), "FUSE filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.entry_path(parent, name) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        match self.lookup_attr(&path) {
            Ok(attr) => reply.entry(&self.ttl, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        match self.rt.block_on(self.fs.getattr(&path)) {
            Ok(attr) => reply.attr(&self.ttl, &self.make_attr(ino, &attr)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        // Only size changes mean anything to the store; mode, owner and
        // times are fixed
        if let Some(new_size) = size {
            if let Err(e) = self.rt.block_on(self.fs.truncate(&path, new_size)) {
                tracing::debug!(path = %path, new_size, error = %e, "truncate failed");
                reply.error(e.errno());
                return;
            }
        }

        match self.rt.block_on(self.fs.getattr(&path)) {
            Ok(attr) => reply.attr(&self.ttl, &self.make_attr(ino, &attr)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let names = match self.rt.block_on(self.fs.readdir(&path)) {
            Ok(names) => names,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        // Build full entry list with . and ..
        let mut all_entries: Vec<(u64, FileType, String)> = Vec::with_capacity(names.len() + 2);
        all_entries.push((ino, FileType::Directory, ".".to_string()));
        let parent_ino = if ino == InodeTable::ROOT_INODE {
            ino
        } else {
            self.inodes.get_or_create(&InodeTable::parent_path(&path))
        };
        all_entries.push((parent_ino, FileType::Directory, "..".to_string()));

        for name in names {
            let entry_path = InodeTable::child_path(&path, &name);
            // A child that vanished between the listing and its stat is
            // still listed; lookup will report it missing
            let kind = match self.rt.block_on(self.fs.getattr(&entry_path)) {
                Ok(attr) if attr.kind.is_dir() => FileType::Directory,
                _ => FileType::RegularFile,
            };
            let entry_ino = self.inodes.get_or_create(&entry_path);
            all_entries.push((entry_ino, kind, name));
        }

        // Skip to offset and add entries
        for (i, (ino, kind, name)) in all_entries
            .into_iter()
            .enumerate()
            .skip(offset.max(0) as usize)
        {
            if reply.add(ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }

        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        if let Err(e) = self.rt.block_on(self.fs.getattr(&path)) {
            reply.error(e.errno());
            return;
        }

        let fh = self.next_handle();
        reply.opened(fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }

        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        match self.rt.block_on(self.fs.read(&path, offset as u64, size)) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }

        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        match self.rt.block_on(self.fs.write(&path, offset as u64, data)) {
            Ok(written) => reply.written(written as u32),
            Err(e) => {
                tracing::debug!(path = %path, offset, len = data.len(), error = %e, "write failed");
                reply.error(e.errno());
            }
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.entry_path(parent, name) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        if let Err(e) = self.rt.block_on(self.fs.create(&path, mode)) {
            tracing::debug!(path = %path, error = %e, "create failed");
            reply.error(e.errno());
            return;
        }

        match self.lookup_attr(&path) {
            Ok(attr) => {
                let fh = self.next_handle();
                reply.created(&self.ttl, &attr, 0, fh, flags as u32);
            }
            Err(e) => reply.error(e),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.entry_path(parent, name) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        if let Err(e) = self.rt.block_on(self.fs.mkdir(&path, mode)) {
            tracing::debug!(path = %path, error = %e, "mkdir failed");
            reply.error(e.errno());
            return;
        }

        // A fresh node has no children yet, so it reads back as a regular
        // file until something is created beneath it
        match self.lookup_attr(&path) {
            Ok(attr) => reply.entry(&self.ttl, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.entry_path(parent, name) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        match self.rt.block_on(self.fs.unlink(&path)) {
            Ok(()) => {
                self.inodes.remove_by_path(&path);
                reply.ok();
            }
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "unlink failed");
                reply.error(e.errno());
            }
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.entry_path(parent, name) {
            Ok(p) => p,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        match self.rt.block_on(self.fs.rmdir(&path)) {
            Ok(()) => {
                self.inodes.remove_by_path(&path);
                reply.ok();
            }
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "rmdir failed");
                reply.error(e.errno());
            }
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (old_path, new_path) = match (
            self.entry_path(parent, name),
            self.entry_path(newparent, newname),
        ) {
            (Ok(old), Ok(new)) => (old, new),
            (Err(e), _) | (_, Err(e)) => {
                reply.error(e);
                return;
            }
        };

        match self.rt.block_on(self.fs.rename(&old_path, &new_path)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }
}
