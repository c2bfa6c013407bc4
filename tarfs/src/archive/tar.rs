//! Tar archive provider.
//!
//! Supports plain `.tar` as well as `.tar.gz`/`.tgz`. The entry table is
//! scanned once when the source is opened; content streams are reopened per
//! request. Plain tar serves content straight from the recorded byte offset,
//! gzip has no random access so the stream is re-decoded and skipped to the
//! requested record.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use flate2::read::GzDecoder;
use log::{debug, warn};
use tar::{Archive, EntryType};

use super::{ArchiveEntry, ArchiveSource};

/// Scan-time location of an entry's content within the container.
#[derive(Debug, Clone, Copy)]
struct RawEntry {
    /// Position in the tar stream, counting every record including skipped ones.
    tar_index: usize,
    /// Byte offset of the content, valid only for uncompressed archives.
    offset: u64,
    size: u64,
}

pub struct TarSource {
    path: PathBuf,
    gzipped: bool,
    entries: Vec<ArchiveEntry>,
    raw: Vec<RawEntry>,
}

impl TarSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let gzipped = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("gz") | Some("tgz")
        );
        let mut source = TarSource {
            path,
            gzipped,
            entries: Vec::new(),
            raw: Vec::new(),
        };
        source.scan()?;
        debug!(
            "scanned {} with {} usable entries",
            source.path.display(),
            source.entries.len()
        );
        Ok(source)
    }

    fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(&self.path)?;
        if self.gzipped {
            Ok(Box::new(GzDecoder::new(file)))
        } else {
            Ok(Box::new(file))
        }
    }

    fn scan(&mut self) -> io::Result<()> {
        let mut archive = Archive::new(self.reader()?);
        for (tar_index, entry) in archive.entries()?.enumerate() {
            let entry = entry?;
            let header = entry.header();
            let mut name = entry.path()?.to_string_lossy().into_owned();
            match header.entry_type() {
                EntryType::Directory => {
                    if !name.ends_with('/') {
                        name.push('/');
                    }
                }
                EntryType::Regular => {}
                other => {
                    warn!("skipping unsupported entry {name:?} ({other:?})");
                    continue;
                }
            }
            let size = entry.size();
            let mtime = header.mtime().unwrap_or(0);
            let index = self.entries.len();
            self.raw.push(RawEntry {
                tar_index,
                offset: entry.raw_file_position(),
                size,
            });
            self.entries.push(ArchiveEntry {
                name,
                size,
                modified: SystemTime::UNIX_EPOCH + Duration::from_secs(mtime),
                mode: header.mode().unwrap_or(0o644) & 0o7777,
                index,
            });
        }
        Ok(())
    }
}

impl ArchiveSource for TarSource {
    fn entries(&self) -> io::Result<Vec<ArchiveEntry>> {
        Ok(self.entries.clone())
    }

    fn open_entry(&self, index: usize) -> io::Result<Box<dyn Read + Send>> {
        let raw = *self
            .raw
            .get(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such archive entry"))?;
        if self.gzipped {
            let mut archive = Archive::new(GzDecoder::new(File::open(&self.path)?));
            for (tar_index, entry) in archive.entries()?.enumerate() {
                let mut entry = entry?;
                if tar_index == raw.tar_index {
                    let mut buf = Vec::with_capacity(raw.size as usize);
                    entry.read_to_end(&mut buf)?;
                    return Ok(Box::new(io::Cursor::new(buf)));
                }
            }
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive entry vanished during rescan",
            ))
        } else {
            let mut file = File::open(&self.path)?;
            file.seek(SeekFrom::Start(raw.offset))?;
            Ok(Box::new(file.take(raw.size)))
        }
    }
}
