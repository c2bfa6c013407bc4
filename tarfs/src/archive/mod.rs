//! Archive entry providers.
//!
//! The tree builder and the FUSE adapter never look at the container format.
//! They consume a flat entry list and per-entry content streams through the
//! [`ArchiveSource`] capability; `tar` holds the concrete provider.

pub mod tar;

use std::io::Read;
use std::time::SystemTime;

/// One record in the container's flat entry list.
///
/// A trailing `/` in `name` marks an explicit directory record. The list is
/// not required to be in hierarchical order, and directory records may be
/// missing entirely for some ancestors.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub mode: u32,
    /// Position of the record in the entry list, used to reopen its content.
    pub index: usize,
}

impl ArchiveEntry {
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Metadata kept on file nodes after load: enough to serve attributes and to
/// reopen the content stream without holding the scan-time entry alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub size: u64,
    pub modified: SystemTime,
    pub mode: u32,
    pub index: usize,
}

impl From<&ArchiveEntry> for EntryMeta {
    fn from(entry: &ArchiveEntry) -> Self {
        EntryMeta {
            size: entry.size,
            modified: entry.modified,
            mode: entry.mode,
            index: entry.index,
        }
    }
}

/// Capability interface over the archive container.
pub trait ArchiveSource: Send + Sync + 'static {
    /// The flat entry list, in container order. Called once at load time.
    fn entries(&self) -> std::io::Result<Vec<ArchiveEntry>>;

    /// Open a fresh, independent content stream for the entry at `index`.
    /// Streams are never shared between concurrent opens.
    fn open_entry(&self, index: usize) -> std::io::Result<Box<dyn Read + Send>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{ArchiveEntry, ArchiveSource};
    use std::collections::HashMap;
    use std::io::{self, Read};
    use std::time::{Duration, SystemTime};

    /// In-memory source for tests: entries are `(name, content)` pairs in
    /// list order, directories marked by a trailing slash as usual.
    pub struct StubSource {
        entries: Vec<ArchiveEntry>,
        contents: HashMap<usize, Vec<u8>>,
    }

    impl StubSource {
        pub fn new(raw: Vec<(&str, &[u8])>) -> Self {
            let mut entries = Vec::new();
            let mut contents = HashMap::new();
            for (index, (name, data)) in raw.into_iter().enumerate() {
                entries.push(ArchiveEntry {
                    name: name.to_owned(),
                    size: data.len() as u64,
                    modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
                    mode: if name.ends_with('/') { 0o755 } else { 0o644 },
                    index,
                });
                contents.insert(index, data.to_vec());
            }
            StubSource { entries, contents }
        }
    }

    impl ArchiveSource for StubSource {
        fn entries(&self) -> io::Result<Vec<ArchiveEntry>> {
            Ok(self.entries.clone())
        }

        fn open_entry(&self, index: usize) -> io::Result<Box<dyn Read + Send>> {
            match self.contents.get(&index) {
                Some(data) => Ok(Box::new(io::Cursor::new(data.clone()))),
                None => Err(io::Error::new(io::ErrorKind::NotFound, "no such entry")),
            }
        }
    }
}
