//! FUSE adapter.
//!
//! [`ArchiveFs`] owns the archive source, the tree index built from it, and
//! the table of open file handles, and implements the rfuse3 `Filesystem`
//! trait on top. The archive is read-mostly: existing content is served from
//! per-open streams, `create`/`write` work only on files that are not yet
//! part of the archive, and everything that would mutate archive content in
//! place reports ENOSYS.

pub mod mount;

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::Read;
use std::num::NonZeroU32;
use std::os::unix::fs::FileExt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use libc::c_int;
use log::{debug, error, warn};
use rfuse3::Result as FuseResult;
use rfuse3::raw::reply::{
    DirectoryEntry, DirectoryEntryPlus, FileAttr, ReplyAttr, ReplyCreated, ReplyData,
    ReplyDirectory, ReplyDirectoryPlus, ReplyEntry, ReplyInit, ReplyOpen, ReplyStatFs, ReplyWrite,
};
use rfuse3::raw::{Filesystem, Request};
use rfuse3::{Errno, FileType as FuseFileType, SetAttr, Timestamp};

use crate::archive::ArchiveSource;
use crate::tree::index::{DirChild, FileKind, NodeInit, NodeView, TreeError, TreeIndex};
use crate::tree::ino::ROOT_INO;
use crate::tree::loader::{LoadError, build_tree};

const TTL: Duration = Duration::from_secs(1);
const DIR_PERM: u16 = 0o555;
const NEW_FILE_PERM: u16 = 0o644;

/// Content state of one open of an existing archive file. The stream is
/// bound at open time and drained in full on the first read.
struct ArchiveRead {
    stream: Option<Box<dyn Read + Send>>,
    content: Option<Bytes>,
}

enum FileHandle {
    /// Independent read stream over archive content.
    Archive(Mutex<ArchiveRead>),
    /// Writable backing stream of a file that is not part of the archive yet.
    New(Arc<File>),
}

struct HandleTable {
    next: AtomicU64,
    open: RwLock<HashMap<u64, Arc<FileHandle>>>,
}

impl HandleTable {
    fn new() -> Self {
        HandleTable {
            next: AtomicU64::new(1),
            open: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, handle: FileHandle) -> u64 {
        let fh = self.next.fetch_add(1, Ordering::Relaxed);
        self.open.write().unwrap().insert(fh, Arc::new(handle));
        fh
    }

    fn get(&self, fh: u64) -> Option<Arc<FileHandle>> {
        self.open.read().unwrap().get(&fh).cloned()
    }

    fn remove(&self, fh: u64) {
        self.open.write().unwrap().remove(&fh);
    }
}

fn tree_errno(err: TreeError) -> c_int {
    match err {
        TreeError::NotFound
        | TreeError::InvalidPath
        | TreeError::NoChildren
        | TreeError::MissingNode(_) => libc::ENOENT,
        TreeError::NotDirectory(_) => libc::ENOTDIR,
        TreeError::SameNode | TreeError::InoCollision { .. } => libc::EIO,
    }
}

fn fuse_kind(kind: FileKind) -> FuseFileType {
    match kind {
        FileKind::Directory => FuseFileType::Directory,
        FileKind::RegularFile => FuseFileType::RegularFile,
    }
}

fn make_attr(
    ino: u64,
    kind: FuseFileType,
    perm: u16,
    size: u64,
    mtime: SystemTime,
    uid: u32,
    gid: u32,
) -> FileAttr {
    let ts = Timestamp::from(mtime);
    FileAttr {
        ino,
        size,
        blocks: size.div_ceil(512),
        atime: ts,
        mtime: ts,
        ctime: ts,
        #[cfg(target_os = "macos")]
        crtime: ts,
        kind,
        perm,
        nlink: 1,
        uid,
        gid,
        rdev: 0,
        #[cfg(target_os = "macos")]
        flags: 0,
        blksize: 4096,
    }
}

pub struct ArchiveFs<S> {
    source: S,
    tree: TreeIndex,
    handles: HandleTable,
}

impl<S: ArchiveSource> ArchiveFs<S> {
    /// Builds the tree from the source's entry list. Called exactly once
    /// before any protocol traffic; a structural load error aborts the mount
    /// here instead of surfacing mid-session.
    pub fn load(source: S) -> Result<Self, LoadError> {
        let tree = build_tree(&source)?;
        Ok(ArchiveFs {
            source,
            tree,
            handles: HandleTable::new(),
        })
    }

    pub fn tree(&self) -> &TreeIndex {
        &self.tree
    }

    fn node_attr(&self, ino: u64, uid: u32, gid: u32) -> Result<FileAttr, c_int> {
        let view = self.tree.node(ino).map_err(tree_errno)?;
        Ok(match view {
            NodeView::Directory { ino, .. } => make_attr(
                ino,
                FuseFileType::Directory,
                DIR_PERM,
                0,
                SystemTime::now(),
                uid,
                gid,
            ),
            NodeView::FileExisting { ino, entry, .. } => make_attr(
                ino,
                FuseFileType::RegularFile,
                (entry.mode & 0o7777) as u16,
                entry.size,
                entry.modified,
                uid,
                gid,
            ),
            NodeView::FileNew { ino, backing, .. } => {
                let size = backing.metadata().map(|m| m.len()).unwrap_or(0);
                make_attr(
                    ino,
                    FuseFileType::RegularFile,
                    NEW_FILE_PERM,
                    size,
                    SystemTime::now(),
                    uid,
                    gid,
                )
            }
        })
    }

    /// Linear scan of the directory listing; an absent name is the normal
    /// outcome, never escalated beyond ENOENT.
    fn lookup_child(&self, parent: u64, name: &str) -> Result<u64, c_int> {
        let children = self.tree.children(parent).map_err(tree_errno)?;
        children
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.ino)
            .ok_or(libc::ENOENT)
    }

    fn dir_children(&self, ino: u64) -> Result<Vec<DirChild>, c_int> {
        self.tree.children(ino).map_err(|err| match err {
            TreeError::NoChildren => libc::ENOTDIR,
            other => tree_errno(other),
        })
    }

    fn open_node(&self, ino: u64) -> Result<u64, c_int> {
        match self.tree.node(ino).map_err(tree_errno)? {
            NodeView::Directory { .. } => Err(libc::EISDIR),
            NodeView::FileExisting { entry, name, .. } => {
                let stream = self.source.open_entry(entry.index).map_err(|err| {
                    error!("opening archive stream for {name:?} failed: {err}");
                    libc::EIO
                })?;
                Ok(self.handles.insert(FileHandle::Archive(Mutex::new(
                    ArchiveRead {
                        stream: Some(stream),
                        content: None,
                    },
                ))))
            }
            NodeView::FileNew { backing, .. } => Ok(self.handles.insert(FileHandle::New(backing))),
        }
    }

    fn read_handle(&self, fh: u64, offset: u64, size: u32) -> Result<Bytes, c_int> {
        let handle = self.handles.get(fh).ok_or(libc::EBADF)?;
        match &*handle {
            FileHandle::Archive(state) => {
                let mut state = state.lock().unwrap();
                let content = if let Some(content) = &state.content {
                    content.clone()
                } else {
                    let Some(mut stream) = state.stream.take() else {
                        return Err(libc::EIO);
                    };
                    let mut buf = Vec::new();
                    stream.read_to_end(&mut buf).map_err(|err| {
                        error!("draining archive stream failed: {err}");
                        libc::EIO
                    })?;
                    let content = Bytes::from(buf);
                    state.content = Some(content.clone());
                    content
                };
                let start = (offset as usize).min(content.len());
                let end = start
                    .saturating_add(size as usize)
                    .min(content.len());
                Ok(content.slice(start..end))
            }
            // read-back of a not-yet-archived file is left undefined upstream
            FileHandle::New(_) => Err(libc::ENOSYS),
        }
    }

    fn write_handle(&self, fh: u64, offset: u64, data: &[u8]) -> Result<u32, c_int> {
        let handle = self.handles.get(fh).ok_or(libc::EBADF)?;
        match &*handle {
            FileHandle::New(backing) => {
                backing.write_at(data, offset).map(|n| n as u32).map_err(|err| {
                    error!("write to backing stream failed: {err}");
                    libc::EIO
                })
            }
            // in-place archive mutation is out of scope
            FileHandle::Archive(_) => Err(libc::ENOSYS),
        }
    }

    /// Allocates a fresh writable backing stream, inserts the node and
    /// returns `(ino, fh)` with the handle already bound.
    fn create_node(&self, parent: u64, name: &str) -> Result<(u64, u64), c_int> {
        if self.lookup_child(parent, name).is_ok() {
            return Err(libc::EEXIST);
        }
        let backing = Arc::new(tempfile::tempfile().map_err(|err| {
            error!("allocating backing stream failed: {err}");
            libc::EIO
        })?);
        let ino = self
            .tree
            .add(parent, name, NodeInit::FileNew(backing.clone()))
            .map_err(tree_errno)?;
        let fh = self.handles.insert(FileHandle::New(backing));
        Ok((ino, fh))
    }
}

impl<S: ArchiveSource> Filesystem for ArchiveFs<S> {
    type DirEntryStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntry>> + Send + 'a>>
    where
        Self: 'a;

    type DirEntryPlusStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntryPlus>> + Send + 'a>>
    where
        Self: 'a;

    async fn init(&self, _req: Request) -> FuseResult<ReplyInit> {
        let max_write = NonZeroU32::new(1024 * 1024).unwrap();
        Ok(ReplyInit { max_write })
    }

    async fn destroy(&self, _req: Request) {}

    async fn lookup(&self, req: Request, parent: u64, name: &OsStr) -> FuseResult<ReplyEntry> {
        let name = name.to_string_lossy();
        debug!("lookup parent={parent} name={name:?}");
        let ino = self.lookup_child(parent, name.as_ref()).map_err(Errno::from)?;
        let attr = self.node_attr(ino, req.uid, req.gid).map_err(Errno::from)?;
        Ok(ReplyEntry {
            ttl: TTL,
            attr,
            generation: 0,
        })
    }

    async fn getattr(
        &self,
        req: Request,
        ino: u64,
        _fh: Option<u64>,
        _flags: u32,
    ) -> FuseResult<ReplyAttr> {
        let attr = self.node_attr(ino, req.uid, req.gid).map_err(Errno::from)?;
        Ok(ReplyAttr { ttl: TTL, attr })
    }

    async fn setattr(
        &self,
        req: Request,
        ino: u64,
        _fh: Option<u64>,
        set_attr: SetAttr,
    ) -> FuseResult<ReplyAttr> {
        if let Some(size) = set_attr.size {
            match self.tree.node(ino).map_err(|e| Errno::from(tree_errno(e)))? {
                NodeView::FileNew { backing, .. } => {
                    backing.set_len(size).map_err(|err| {
                        error!("truncating backing stream failed: {err}");
                        Errno::from(libc::EIO)
                    })?;
                }
                // truncating archive content would be in-place mutation
                NodeView::FileExisting { .. } => return Err(libc::ENOSYS.into()),
                NodeView::Directory { .. } => return Err(libc::EISDIR.into()),
            }
        }
        let attr = self.node_attr(ino, req.uid, req.gid).map_err(Errno::from)?;
        Ok(ReplyAttr { ttl: TTL, attr })
    }

    async fn open(&self, _req: Request, ino: u64, _flags: u32) -> FuseResult<ReplyOpen> {
        debug!("open ino={ino}");
        let fh = self.open_node(ino).map_err(Errno::from)?;
        Ok(ReplyOpen { fh, flags: 0 })
    }

    async fn opendir(&self, _req: Request, ino: u64, _flags: u32) -> FuseResult<ReplyOpen> {
        match self.tree.node(ino).map_err(|e| Errno::from(tree_errno(e)))? {
            // directory listings are stateless, no handle needed
            NodeView::Directory { .. } => Ok(ReplyOpen { fh: 0, flags: 0 }),
            _ => Err(libc::ENOTDIR.into()),
        }
    }

    async fn read(
        &self,
        _req: Request,
        ino: u64,
        fh: u64,
        offset: u64,
        size: u32,
    ) -> FuseResult<ReplyData> {
        debug!("read ino={ino} fh={fh} offset={offset} size={size}");
        let data = self.read_handle(fh, offset, size).map_err(Errno::from)?;
        Ok(ReplyData { data })
    }

    async fn write(
        &self,
        _req: Request,
        ino: u64,
        fh: u64,
        offset: u64,
        data: &[u8],
        _write_flags: u32,
        _flags: u32,
    ) -> FuseResult<ReplyWrite> {
        debug!("write ino={ino} fh={fh} offset={offset} len={}", data.len());
        let written = self.write_handle(fh, offset, data).map_err(Errno::from)?;
        Ok(ReplyWrite { written })
    }

    async fn readdir<'a>(
        &'a self,
        _req: Request,
        ino: u64,
        _fh: u64,
        offset: i64,
    ) -> FuseResult<ReplyDirectory<Self::DirEntryStream<'a>>> {
        let children = self.dir_children(ino).map_err(Errno::from)?;

        let mut all: Vec<DirectoryEntry> = Vec::with_capacity(children.len() + 2);
        all.push(DirectoryEntry {
            inode: ino,
            kind: FuseFileType::Directory,
            name: OsString::from("."),
            offset: 1,
        });
        let parent_ino = self.tree.parent_of(ino).unwrap_or(ROOT_INO);
        all.push(DirectoryEntry {
            inode: parent_ino,
            kind: FuseFileType::Directory,
            name: OsString::from(".."),
            offset: 2,
        });
        for (i, child) in children.iter().enumerate() {
            all.push(DirectoryEntry {
                inode: child.ino,
                kind: fuse_kind(child.kind),
                name: OsString::from(child.name.clone()),
                offset: (i as i64) + 3,
            });
        }

        let start = if offset <= 0 { 0 } else { offset as usize };
        let slice = if start >= all.len() {
            Vec::new()
        } else {
            all[start..].to_vec()
        };
        let entries: Self::DirEntryStream<'a> = Box::pin(stream::iter(slice.into_iter().map(Ok)));
        Ok(ReplyDirectory { entries })
    }

    async fn readdirplus<'a>(
        &'a self,
        req: Request,
        ino: u64,
        _fh: u64,
        offset: u64,
        _lock_owner: u64,
    ) -> FuseResult<ReplyDirectoryPlus<Self::DirEntryPlusStream<'a>>> {
        let children = self.dir_children(ino).map_err(Errno::from)?;

        let mut all: Vec<DirectoryEntryPlus> = Vec::with_capacity(children.len() + 2);
        let self_attr = self.node_attr(ino, req.uid, req.gid).map_err(Errno::from)?;
        all.push(DirectoryEntryPlus {
            inode: ino,
            generation: 0,
            kind: FuseFileType::Directory,
            name: OsString::from("."),
            offset: 1,
            attr: self_attr,
            entry_ttl: TTL,
            attr_ttl: TTL,
        });
        let parent_ino = self.tree.parent_of(ino).unwrap_or(ROOT_INO);
        if let Ok(parent_attr) = self.node_attr(parent_ino, req.uid, req.gid) {
            all.push(DirectoryEntryPlus {
                inode: parent_ino,
                generation: 0,
                kind: FuseFileType::Directory,
                name: OsString::from(".."),
                offset: 2,
                attr: parent_attr,
                entry_ttl: TTL,
                attr_ttl: TTL,
            });
        }
        for (i, child) in children.iter().enumerate() {
            let Ok(attr) = self.node_attr(child.ino, req.uid, req.gid) else {
                warn!("skipping child {:?} with no resolvable node", child.name);
                continue;
            };
            all.push(DirectoryEntryPlus {
                inode: child.ino,
                generation: 0,
                kind: fuse_kind(child.kind),
                name: OsString::from(child.name.clone()),
                offset: (i as i64) + 3,
                attr,
                entry_ttl: TTL,
                attr_ttl: TTL,
            });
        }

        let start = if offset == 0 { 0 } else { offset as usize };
        let slice = if start >= all.len() {
            Vec::new()
        } else {
            all[start..].to_vec()
        };
        let entries: Self::DirEntryPlusStream<'a> =
            Box::pin(stream::iter(slice.into_iter().map(Ok)));
        Ok(ReplyDirectoryPlus { entries })
    }

    async fn create(
        &self,
        req: Request,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _flags: u32,
    ) -> FuseResult<ReplyCreated> {
        let name = name.to_string_lossy();
        debug!("create parent={parent} name={name:?}");
        let (ino, fh) = self.create_node(parent, name.as_ref()).map_err(Errno::from)?;
        let attr = self.node_attr(ino, req.uid, req.gid).map_err(Errno::from)?;
        Ok(ReplyCreated {
            ttl: TTL,
            attr,
            generation: 0,
            fh,
            flags: 0,
        })
    }

    async fn mkdir(
        &self,
        _req: Request,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
    ) -> FuseResult<ReplyEntry> {
        // directory creation inside an archive mount is unsupported; report
        // it instead of pretending with a half-made node
        debug!("mkdir parent={parent} name={:?} rejected", name);
        Err(libc::ENOSYS.into())
    }

    async fn statfs(&self, _req: Request, _ino: u64) -> FuseResult<ReplyStatFs> {
        Ok(ReplyStatFs {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: self.tree.node_count() as u64,
            ffree: u64::MAX,
            bsize: 4096,
            namelen: 255,
            frsize: 4096,
        })
    }

    async fn release(
        &self,
        _req: Request,
        _inode: u64,
        fh: u64,
        _flags: u32,
        _lock_owner: u64,
        _flush: bool,
    ) -> FuseResult<()> {
        self.handles.remove(fh);
        Ok(())
    }

    async fn flush(&self, _req: Request, _inode: u64, _fh: u64, _lock_owner: u64) -> FuseResult<()> {
        Ok(())
    }

    async fn fsync(&self, _req: Request, _inode: u64, fh: u64, _datasync: bool) -> FuseResult<()> {
        if let Some(handle) = self.handles.get(fh) {
            if let FileHandle::New(backing) = &*handle {
                backing.sync_all().map_err(|err| {
                    error!("fsync of backing stream failed: {err}");
                    Errno::from(libc::EIO)
                })?;
            }
        }
        Ok(())
    }

    async fn releasedir(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _flags: u32,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn fsyncdir(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _datasync: bool,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn forget(&self, _req: Request, _inode: u64, _nlookup: u64) {}

    async fn batch_forget(&self, _req: Request, _inodes: &[(u64, u64)]) {}

    async fn interrupt(&self, _req: Request, _unique: u64) -> FuseResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::StubSource;

    fn sample_fs() -> ArchiveFs<StubSource> {
        ArchiveFs::load(StubSource::new(vec![
            ("docs/", b""),
            ("docs/readme.txt", b"hello tarfs"),
            ("deep/nested/data.bin", b"0123456789abcdef"),
        ]))
        .unwrap()
    }

    #[test]
    fn attributes_per_kind() {
        let fs = sample_fs();
        let root = fs.node_attr(ROOT_INO, 1000, 1000).unwrap();
        assert!(matches!(root.kind, FuseFileType::Directory));
        assert_eq!(root.perm, 0o555);

        let file = fs.lookup_child(ROOT_INO, "docs").unwrap();
        let file = fs.lookup_child(file, "readme.txt").unwrap();
        let attr = fs.node_attr(file, 1000, 1000).unwrap();
        assert!(matches!(attr.kind, FuseFileType::RegularFile));
        assert_eq!(attr.size, 11);
        assert_eq!(attr.perm, 0o644);
        assert_eq!(attr.uid, 1000);
    }

    #[test]
    fn lookup_miss_is_enoent() {
        let fs = sample_fs();
        assert_eq!(fs.lookup_child(ROOT_INO, "nope"), Err(libc::ENOENT));
    }

    #[test]
    fn synthesized_directories_are_listed() {
        let fs = sample_fs();
        let deep = fs.lookup_child(ROOT_INO, "deep").unwrap();
        let nested = fs.lookup_child(deep, "nested").unwrap();
        let children = fs.dir_children(nested).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "data.bin");
    }

    #[test]
    fn open_and_read_slices_archive_content() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        let file = fs.lookup_child(docs, "readme.txt").unwrap();
        let fh = fs.open_node(file).unwrap();

        assert_eq!(&fs.read_handle(fh, 0, 1024).unwrap()[..], b"hello tarfs");
        assert_eq!(&fs.read_handle(fh, 6, 5).unwrap()[..], b"tarfs");
        assert!(fs.read_handle(fh, 100, 5).unwrap().is_empty());
    }

    #[test]
    fn concurrent_opens_get_independent_handles() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        let file = fs.lookup_child(docs, "readme.txt").unwrap();
        let a = fs.open_node(file).unwrap();
        let b = fs.open_node(file).unwrap();
        assert_ne!(a, b);
        assert_eq!(fs.read_handle(a, 0, 64).unwrap(), fs.read_handle(b, 0, 64).unwrap());
    }

    #[test]
    fn open_on_directory_is_eisdir() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        assert_eq!(fs.open_node(docs), Err(libc::EISDIR));
        assert_eq!(fs.open_node(0xdead_beef), Err(libc::ENOENT));
    }

    #[test]
    fn create_then_lookup_then_single_listing() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        let (ino, _fh) = fs.create_node(docs, "new.txt").unwrap();

        assert_eq!(fs.lookup_child(docs, "new.txt").unwrap(), ino);
        let listed: Vec<_> = fs
            .dir_children(docs)
            .unwrap()
            .into_iter()
            .filter(|c| c.name == "new.txt")
            .collect();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ino, ino);
    }

    #[test]
    fn create_existing_name_is_eexist() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        assert_eq!(fs.create_node(docs, "readme.txt"), Err(libc::EEXIST));
    }

    #[test]
    fn write_lands_at_offset_in_backing_stream() {
        let fs = sample_fs();
        let (ino, fh) = fs.create_node(ROOT_INO, "fresh.txt").unwrap();
        assert_eq!(fs.write_handle(fh, 10, b"abcde").unwrap(), 5);

        let NodeView::FileNew { backing, .. } = fs.tree().node(ino).unwrap() else {
            panic!("expected a new-file node");
        };
        let mut buf = [0u8; 15];
        backing.read_exact_at(&mut buf, 0).unwrap();
        assert_eq!(&buf[..10], &[0u8; 10]);
        assert_eq!(&buf[10..], b"abcde");
    }

    #[test]
    fn write_to_archive_content_is_enosys_and_harmless() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        let file = fs.lookup_child(docs, "readme.txt").unwrap();
        let fh = fs.open_node(file).unwrap();

        assert_eq!(fs.write_handle(fh, 0, b"clobber"), Err(libc::ENOSYS));
        assert_eq!(&fs.read_handle(fh, 0, 64).unwrap()[..], b"hello tarfs");
    }

    #[test]
    fn read_of_new_file_is_enosys() {
        let fs = sample_fs();
        let (_ino, fh) = fs.create_node(ROOT_INO, "fresh.txt").unwrap();
        assert_eq!(fs.read_handle(fh, 0, 16), Err(libc::ENOSYS));
    }

    #[test]
    fn stale_handle_is_ebadf() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        let file = fs.lookup_child(docs, "readme.txt").unwrap();
        let fh = fs.open_node(file).unwrap();
        fs.handles.remove(fh);
        assert_eq!(fs.read_handle(fh, 0, 8), Err(libc::EBADF));
    }

    #[test]
    fn readdir_errors_distinguish_missing_and_non_directory() {
        let fs = sample_fs();
        let docs = fs.lookup_child(ROOT_INO, "docs").unwrap();
        let file = fs.lookup_child(docs, "readme.txt").unwrap();
        assert_eq!(fs.dir_children(file), Err(libc::ENOTDIR));
        assert_eq!(fs.dir_children(0xdead_beef), Err(libc::ENOENT));
    }
}
