//! FUSE filesystem implementation.

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, Request,
};
use libc::{c_int, EINVAL, EIO, EISDIR, ENOENT, ENOTDIR, EROFS};
use peoplefs_core::TagIndex;
use peoplefs_index::IndexStore;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::{FileExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::inode::{InodeTable, ROOT_INO};
use crate::resolver::{EntryKind, Resolution, Resolver};

const TTL: Duration = Duration::from_secs(1);
const BLOCK_SIZE: u64 = 512;
const DIR_PERM: u16 = 0o555;
const WRITE_BITS: u32 = 0o222;

/// Inode reported for listed children the kernel has not looked up yet.
/// Plain readdir only uses it for `d_ino`.
const UNKNOWN_INO: u64 = 0xffff_ffff;

/// One directory listing: inode, kind and name per entry, `.` and `..` first.
type DirListing = Vec<(u64, FileType, OsString)>;

/// Read-only FUSE filesystem serving the published tag index.
///
/// Each request takes one snapshot handle from the store and answers
/// entirely from it, so a rebuild published mid-request is only seen by
/// later requests. Directory listings are taken once at `opendir` and paged
/// from that copy until `releasedir`.
pub struct PeopleFs {
    /// Published snapshots
    store: Arc<IndexStore>,
    /// Inode table
    inodes: Arc<RwLock<InodeTable>>,
    /// Listings of open directories, keyed by file handle
    dir_handles: Arc<RwLock<HashMap<u64, Arc<DirListing>>>>,
    /// Next directory file handle
    next_fh: AtomicU64,
    /// Tokio runtime handle for async operations
    runtime: Handle,
}

impl PeopleFs {
    #[must_use]
    pub fn new(store: Arc<IndexStore>, runtime: Handle) -> Self {
        Self {
            store,
            inodes: Arc::new(RwLock::new(InodeTable::new())),
            dir_handles: Arc::new(RwLock::new(HashMap::new())),
            next_fh: AtomicU64::new(1),
            runtime,
        }
    }

    /// The store this filesystem reads from.
    #[must_use]
    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    fn snapshot(&self) -> Arc<TagIndex> {
        self.runtime.block_on(self.store.snapshot())
    }

    fn path_of(&self, ino: u64) -> Option<PathBuf> {
        let inodes = self.runtime.block_on(self.inodes.read());
        inodes.path_of(ino).map(Path::to_path_buf)
    }

    #[allow(unsafe_code)]
    fn dir_attr(&self, ino: u64, index: &TagIndex) -> FileAttr {
        let built = SystemTime::from(index.built_at());
        // SAFETY: getuid() and getgid() are always safe to call
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        FileAttr {
            ino,
            size: 0,
            blocks: 0,
            atime: built,
            mtime: built,
            ctime: built,
            crtime: built,
            kind: FileType::Directory,
            perm: DIR_PERM,
            nlink: 2,
            uid,
            gid,
            rdev: 0,
            blksize: BLOCK_SIZE as u32,
            flags: 0,
        }
    }

    /// Attributes of a backing file, read-only.
    fn file_attr(&self, ino: u64, backing: &Path) -> Result<FileAttr, c_int> {
        let metadata = fs::metadata(backing).map_err(|e| errno(&e))?;
        if !metadata.is_file() {
            return Err(ENOENT);
        }

        let atime = metadata.accessed().unwrap_or(UNIX_EPOCH);
        let mtime = metadata.modified().unwrap_or(UNIX_EPOCH);
        let ctime = UNIX_EPOCH + Duration::from_secs(metadata.ctime().max(0) as u64);

        Ok(FileAttr {
            ino,
            size: metadata.len(),
            blocks: metadata.len().div_ceil(BLOCK_SIZE),
            atime,
            mtime,
            ctime,
            crtime: ctime,
            kind: FileType::RegularFile,
            perm: (metadata.mode() & 0o7777 & !WRITE_BITS) as u16,
            nlink: 1,
            uid: metadata.uid(),
            gid: metadata.gid(),
            rdev: 0,
            blksize: BLOCK_SIZE as u32,
            flags: 0,
        })
    }

    fn attr_of(&self, ino: u64, path: &Path, index: &TagIndex) -> Result<FileAttr, c_int> {
        match Resolver::new(index).resolve(path) {
            Resolution::Directory => Ok(self.dir_attr(ino, index)),
            Resolution::File(backing) => self.file_attr(ino, &backing),
            Resolution::NotFound => Err(ENOENT),
        }
    }

    /// Resolve `name` under `parent` and take a lookup reference on it.
    fn lookup_entry(&self, parent: u64, name: &OsStr) -> Result<FileAttr, c_int> {
        let parent_path = self.path_of(parent).ok_or(ENOENT)?;
        let path = parent_path.join(name);
        let index = self.snapshot();

        // Stat first so a failed lookup never leaks a reference.
        let mut attr = self.attr_of(0, &path, &index)?;

        let mut inodes = self.runtime.block_on(self.inodes.write());
        let ino = inodes.get_or_create(parent, path);
        inodes.lookup(ino);
        attr.ino = ino;
        Ok(attr)
    }

    fn getattr_entry(&self, ino: u64) -> Result<FileAttr, c_int> {
        let path = self.path_of(ino).ok_or(ENOENT)?;
        let index = self.snapshot();
        self.attr_of(ino, &path, &index)
    }

    /// Entries of directory `ino`, `.` and `..` included, all from one
    /// snapshot. Children the kernel never looked up get [`UNKNOWN_INO`];
    /// listing allocates no inodes.
    fn dir_entries(&self, ino: u64) -> Result<DirListing, c_int> {
        let (path, parent) = {
            let inodes = self.runtime.block_on(self.inodes.read());
            let entry = inodes.get(ino).ok_or(ENOENT)?;
            (entry.path.clone(), entry.parent)
        };
        let index = self.snapshot();
        let resolver = Resolver::new(&index);

        match resolver.resolve(&path) {
            Resolution::Directory => {}
            Resolution::File(_) => return Err(ENOTDIR),
            Resolution::NotFound => return Err(ENOENT),
        }

        let children = resolver.list_children(&path);
        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push((ino, FileType::Directory, OsString::from(".")));
        entries.push((parent, FileType::Directory, OsString::from("..")));

        let inodes = self.runtime.block_on(self.inodes.read());
        for child in children {
            let child_ino = inodes
                .get_by_path(&path.join(&child.name))
                .unwrap_or(UNKNOWN_INO);
            let kind = match child.kind {
                EntryKind::Directory => FileType::Directory,
                EntryKind::File => FileType::RegularFile,
            };
            entries.push((child_ino, kind, child.name));
        }

        Ok(entries)
    }

    /// Take the listing of `ino` and register it under a new file handle.
    fn open_dir(&self, ino: u64) -> Result<u64, c_int> {
        let entries = self.dir_entries(ino)?;
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        let mut handles = self.runtime.block_on(self.dir_handles.write());
        handles.insert(fh, Arc::new(entries));
        Ok(fh)
    }

    /// Listing held by `fh`, or a fresh one if the handle is unknown.
    fn dir_listing(&self, ino: u64, fh: u64) -> Result<Arc<DirListing>, c_int> {
        let held = {
            let handles = self.runtime.block_on(self.dir_handles.read());
            handles.get(&fh).cloned()
        };
        match held {
            Some(entries) => Ok(entries),
            None => self.dir_entries(ino).map(Arc::new),
        }
    }

    fn release_dir(&self, fh: u64) {
        let mut handles = self.runtime.block_on(self.dir_handles.write());
        handles.remove(&fh);
    }

    fn check_open(&self, ino: u64, flags: i32) -> Result<(), c_int> {
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            return Err(EROFS);
        }
        self.backing_file(ino).map(|_| ())
    }

    /// Backing path of file inode `ino`, checked to still exist.
    fn backing_file(&self, ino: u64) -> Result<PathBuf, c_int> {
        let path = self.path_of(ino).ok_or(ENOENT)?;
        match Resolver::new(&self.snapshot()).resolve(&path) {
            Resolution::File(backing) => {
                fs::metadata(&backing).map_err(|e| errno(&e))?;
                Ok(backing)
            }
            Resolution::Directory => Err(EISDIR),
            Resolution::NotFound => Err(ENOENT),
        }
    }

    /// Read up to `size` bytes at `offset` from the backing file.
    fn read_data(&self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>, c_int> {
        let offset = u64::try_from(offset).map_err(|_| EINVAL)?;
        let backing = self.backing_file(ino)?;
        let file = File::open(&backing).map_err(|e| errno(&e))?;

        let mut buf = vec![0u8; size as usize];
        let mut filled = 0;
        while filled < buf.len() {
            match file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Failed to read file {:?}: {}", backing, e);
                    return Err(errno(&e));
                }
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

/// Map an I/O error to an errno. A vanished file is `ENOENT`.
fn errno(e: &io::Error) -> c_int {
    if e.kind() == io::ErrorKind::NotFound {
        ENOENT
    } else {
        e.raw_os_error().unwrap_or(EIO)
    }
}

impl Filesystem for PeopleFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!("FUSE init");
        Ok(())
    }

    fn destroy(&mut self) {
        debug!("FUSE destroy");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("lookup: parent={}, name={:?}", parent, name);

        match self.lookup_entry(parent, name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        let mut inodes = self.runtime.block_on(self.inodes.write());
        inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!("getattr: ino={}", ino);

        match self.getattr_entry(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open: ino={}, flags={}", ino, flags);

        match self.check_open(ino, flags) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(e),
        }
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
        debug!("read: ino={}, offset={}, size={}", ino, offset, size);

        match self.read_data(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("opendir: ino={}, flags={}", ino, flags);

        match self.open_dir(ino) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir: ino={}, fh={}, offset={}", ino, fh, offset);

        let entries = match self.dir_listing(ino, fh) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (entry_ino, kind, name)) in entries.iter().enumerate().skip(skip) {
            if reply.add(*entry_ino, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        debug!("releasedir: ino={}, fh={}", ino, fh);
        self.release_dir(fh);
        reply.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peoplefs_core::FileTags;
    use tempfile::TempDir;
    use tokio::runtime::Runtime;

    const PHOTO1: &[u8] = b"photo one bytes";
    const PHOTO2: &[u8] = b"photo two, a little longer";

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
        rt: Runtime,
        fs: PeopleFs,
    }

    impl Fixture {
        fn publish(&self, tags: Vec<FileTags>) {
            let index = TagIndex::from_tags(self.root.clone(), tags);
            self.rt.block_on(self.fs.store().publish(index));
        }

        /// Look up a slash separated virtual path from the root.
        fn walk(&self, path: &str) -> Result<FileAttr, c_int> {
            let mut attr = self.fs.getattr_entry(ROOT_INO)?;
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                attr = self.fs.lookup_entry(attr.ino, OsStr::new(segment))?;
            }
            Ok(attr)
        }

        fn names(&self, path: &str) -> Vec<String> {
            let ino = self.walk(path).unwrap().ino;
            self.fs
                .dir_entries(ino)
                .unwrap()
                .into_iter()
                .map(|(_, _, name)| name.to_string_lossy().into_owned())
                .collect()
        }
    }

    fn tags(root: &Path, relative: &str, people: &[&str]) -> FileTags {
        FileTags::new(
            root.join(relative),
            people.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("vacation/extra")).unwrap();
        fs::write(root.join("vacation/photo1.jpg"), PHOTO1).unwrap();
        fs::write(root.join("vacation/extra/photo2.jpg"), PHOTO2).unwrap();

        let rt = Runtime::new().unwrap();
        let store = Arc::new(IndexStore::new(&root));
        let fs = PeopleFs::new(store, rt.handle().clone());

        let fixture = Fixture {
            _temp: temp,
            root,
            rt,
            fs,
        };
        fixture.publish(vec![
            tags(&fixture.root, "vacation/photo1.jpg", &["Alice"]),
            tags(&fixture.root, "vacation/extra/photo2.jpg", &["Alice", "Bob"]),
        ]);
        fixture
    }

    // ========== Lookup / Getattr Tests ==========

    #[test]
    fn test_root_is_read_only_directory() {
        let f = fixture();
        let attr = f.fs.getattr_entry(ROOT_INO).unwrap();
        assert_eq!(attr.kind, FileType::Directory);
        assert_eq!(attr.perm, 0o555);
    }

    #[test]
    fn test_lookup_person_directory() {
        let f = fixture();
        let attr = f.walk("Alice").unwrap();
        assert_eq!(attr.kind, FileType::Directory);
        assert_ne!(attr.ino, ROOT_INO);
    }

    #[test]
    fn test_lookup_file_uses_backing_stat() {
        let f = fixture();
        let attr = f.walk("Bob/vacation/extra/photo2.jpg").unwrap();
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.size, PHOTO2.len() as u64);
        assert_eq!(attr.perm & 0o222, 0);
    }

    #[test]
    fn test_lookup_other_persons_file_is_enoent() {
        let f = fixture();
        assert_eq!(f.walk("Bob/vacation/photo1.jpg").unwrap_err(), ENOENT);
    }

    #[test]
    fn test_lookup_parent_dir_name_is_enoent() {
        let f = fixture();
        let alice = f.walk("Alice").unwrap();
        assert_eq!(
            f.fs.lookup_entry(alice.ino, OsStr::new("..")).unwrap_err(),
            ENOENT
        );
    }

    #[test]
    fn test_lookup_unknown_parent_is_enoent() {
        let f = fixture();
        assert_eq!(
            f.fs.lookup_entry(4242, OsStr::new("Alice")).unwrap_err(),
            ENOENT
        );
    }

    #[test]
    fn test_failed_lookup_takes_no_reference() {
        let f = fixture();
        let before = f.rt.block_on(f.fs.inodes.read()).len();
        let _ = f.walk("Bob/vacation/photo1.jpg");
        let inodes = f.rt.block_on(f.fs.inodes.read());
        let path = Path::new("Bob/vacation/photo1.jpg");
        assert!(inodes.get_by_path(path).is_none());
        // Only "Bob" and "Bob/vacation" were added.
        assert_eq!(inodes.len(), before + 2);
    }

    // ========== Readdir Tests ==========

    #[test]
    fn test_readdir_scenario() {
        let f = fixture();
        assert_eq!(f.names(""), vec![".", "..", "Alice", "Bob"]);
        assert_eq!(f.names("Alice"), vec![".", "..", "vacation"]);
        assert_eq!(
            f.names("Alice/vacation"),
            vec![".", "..", "extra", "photo1.jpg"]
        );
        assert_eq!(f.names("Bob/vacation"), vec![".", "..", "extra"]);
        assert_eq!(
            f.names("Bob/vacation/extra"),
            vec![".", "..", "photo2.jpg"]
        );
    }

    #[test]
    fn test_readdir_kinds() {
        let f = fixture();
        let ino = f.walk("Alice/vacation").unwrap().ino;
        let entries = f.fs.dir_entries(ino).unwrap();

        let kinds: Vec<_> = entries.iter().map(|(_, kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![
                FileType::Directory,
                FileType::Directory,
                FileType::Directory,
                FileType::RegularFile
            ]
        );
    }

    #[test]
    fn test_readdir_on_file_is_enotdir() {
        let f = fixture();
        let ino = f.walk("Alice/vacation/photo1.jpg").unwrap().ino;
        assert_eq!(f.fs.dir_entries(ino).unwrap_err(), ENOTDIR);
        assert_eq!(f.fs.open_dir(ino).unwrap_err(), ENOTDIR);
    }

    #[test]
    fn test_paged_readdir_stays_on_one_snapshot() {
        let f = fixture();
        let first: Vec<FileTags> = (0..200)
            .map(|i| tags(&f.root, &format!("a{i:03}.jpg"), &["Al"]))
            .collect();
        f.publish(first);
        let ino = f.walk("Al").unwrap().ino;
        let fh = f.fs.open_dir(ino).unwrap();

        let page1: Vec<OsString> = f.fs.dir_listing(ino, fh).unwrap()[..100]
            .iter()
            .map(|(_, _, name)| name.clone())
            .collect();

        // A rebuild lands between two readdir pages
        let second: Vec<FileTags> = (0..200)
            .map(|i| tags(&f.root, &format!("b{i:03}.jpg"), &["Al"]))
            .collect();
        f.publish(second);

        let page2: Vec<OsString> = f.fs.dir_listing(ino, fh).unwrap()[100..]
            .iter()
            .map(|(_, _, name)| name.clone())
            .collect();

        let listing: Vec<String> = page1
            .iter()
            .chain(&page2)
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        assert_eq!(listing.len(), 202);
        assert!(listing[2..].iter().all(|name| name.starts_with('a')));

        // A directory opened after the rebuild sees the new snapshot
        let fresh = f.fs.open_dir(ino).unwrap();
        let entries = f.fs.dir_listing(ino, fresh).unwrap();
        assert!(entries[2..]
            .iter()
            .all(|(_, _, name)| name.to_string_lossy().starts_with('b')));
    }

    #[test]
    fn test_release_dir_drops_listing() {
        let f = fixture();
        let ino = f.walk("Alice").unwrap().ino;
        let fh = f.fs.open_dir(ino).unwrap();
        assert_eq!(f.rt.block_on(f.fs.dir_handles.read()).len(), 1);

        f.fs.release_dir(fh);
        assert!(f.rt.block_on(f.fs.dir_handles.read()).is_empty());

        // An unknown handle falls back to a fresh listing
        let entries = f.fs.dir_listing(ino, fh).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_open_dir_handles_are_distinct() {
        let f = fixture();
        let first = f.fs.open_dir(ROOT_INO).unwrap();
        let second = f.fs.open_dir(ROOT_INO).unwrap();
        assert_ne!(first, second);
        assert_ne!(first, 0);
    }

    #[test]
    fn test_readdir_allocates_no_inodes() {
        let f = fixture();
        let ino = f.walk("Alice").unwrap().ino;
        let before = f.rt.block_on(f.fs.inodes.read()).len();

        for round in 0..5 {
            let batch: Vec<FileTags> = (0..50)
                .map(|i| tags(&f.root, &format!("r{round}/{i}.jpg"), &["Alice"]))
                .collect();
            f.publish(batch);
            let fh = f.fs.open_dir(ino).unwrap();
            assert_eq!(f.fs.dir_listing(ino, fh).unwrap().len(), 3);
            f.fs.release_dir(fh);
        }

        assert_eq!(f.rt.block_on(f.fs.inodes.read()).len(), before);
    }

    #[test]
    fn test_readdir_reports_looked_up_inodes() {
        let f = fixture();
        let vacation = f.walk("Alice/vacation").unwrap().ino;
        let photo = f.walk("Alice/vacation/photo1.jpg").unwrap().ino;

        let entries = f.fs.dir_entries(vacation).unwrap();
        let ino_of = |wanted: &str| {
            entries
                .iter()
                .find(|(_, _, name)| name == wanted)
                .map(|(ino, _, _)| *ino)
                .unwrap()
        };
        assert_eq!(ino_of("photo1.jpg"), photo);
        assert_eq!(ino_of("extra"), UNKNOWN_INO);
    }

    // ========== Open / Read Tests ==========

    #[test]
    fn test_read_returns_backing_bytes() {
        let f = fixture();
        let ino = f.walk("Alice/vacation/photo1.jpg").unwrap().ino;

        f.fs.check_open(ino, libc::O_RDONLY).unwrap();
        assert_eq!(f.fs.read_data(ino, 0, 4096).unwrap(), PHOTO1);
    }

    #[test]
    fn test_read_at_offset() {
        let f = fixture();
        let ino = f.walk("Bob/vacation/extra/photo2.jpg").unwrap().ino;

        assert_eq!(f.fs.read_data(ino, 6, 3).unwrap(), &PHOTO2[6..9]);
        assert!(f.fs.read_data(ino, 10_000, 16).unwrap().is_empty());
        assert_eq!(f.fs.read_data(ino, -1, 16).unwrap_err(), EINVAL);
    }

    #[test]
    fn test_open_for_write_is_erofs() {
        let f = fixture();
        let ino = f.walk("Alice/vacation/photo1.jpg").unwrap().ino;

        assert_eq!(f.fs.check_open(ino, libc::O_WRONLY).unwrap_err(), EROFS);
        assert_eq!(f.fs.check_open(ino, libc::O_RDWR).unwrap_err(), EROFS);
    }

    #[test]
    fn test_open_directory_is_eisdir() {
        let f = fixture();
        let ino = f.walk("Alice").unwrap().ino;
        assert_eq!(f.fs.check_open(ino, libc::O_RDONLY).unwrap_err(), EISDIR);
    }

    #[test]
    fn test_vanished_backing_file_is_enoent() {
        let f = fixture();
        let ino = f.walk("Alice/vacation/photo1.jpg").unwrap().ino;
        fs::remove_file(f.root.join("vacation/photo1.jpg")).unwrap();

        assert_eq!(f.fs.getattr_entry(ino).unwrap_err(), ENOENT);
        assert_eq!(f.fs.check_open(ino, libc::O_RDONLY).unwrap_err(), ENOENT);
        assert_eq!(f.fs.read_data(ino, 0, 16).unwrap_err(), ENOENT);
    }

    // ========== Rebuild Tests ==========

    #[test]
    fn test_inode_follows_published_snapshot() {
        let f = fixture();
        let ino = f.walk("Bob/vacation/extra/photo2.jpg").unwrap().ino;

        // Bob is untagged from photo2 by the next build.
        f.publish(vec![
            tags(&f.root, "vacation/photo1.jpg", &["Alice"]),
            tags(&f.root, "vacation/extra/photo2.jpg", &["Alice"]),
        ]);

        assert_eq!(f.fs.getattr_entry(ino).unwrap_err(), ENOENT);
        assert_eq!(f.names(""), vec![".", "..", "Alice"]);
    }

    // ========== errno() Tests ==========

    #[test]
    fn test_errno_mapping() {
        assert_eq!(errno(&io::Error::from(io::ErrorKind::NotFound)), ENOENT);
        assert_eq!(errno(&io::Error::from_raw_os_error(libc::EACCES)), libc::EACCES);
        assert_eq!(errno(&io::Error::other("weird")), EIO);
    }
}
