//! Storage backends.
//!
//! Readers need independent cursors onto the same bytes so that chunks can be
//! fetched in parallel. [`Source::try_clone`] hands out such a cursor.

use crate::error::Result;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Seekable bytes which can be opened more than once.
pub trait Source: Read + Seek + Send + Sync {
    /// Opens a second cursor at offset 0.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Total length in bytes.
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// A file on the local filesystem.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    file: File,
}

impl LocalFile {
    /// Creates or truncates `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self { path, file })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for LocalFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Write for LocalFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Source for LocalFile {
    fn try_clone(&self) -> Result<Self> {
        Self::open(&self.path)
    }

    fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

type Files = FxHashMap<String, Arc<Vec<u8>>>;

/// In-memory named files. Cloning the store shares its contents, and every
/// store is independent of every other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<RwLock<Files>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new file. It becomes visible under `name` on flush.
    pub fn create(&self, name: impl Into<String>) -> MemoryFile {
        MemoryFile {
            store: Some(self.clone()),
            name: name.into(),
            data: Arc::new(vec![]),
            pos: 0,
        }
    }

    /// Opens a committed file for reading.
    pub fn open(&self, name: &str) -> Result<MemoryFile> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let data = files
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {name}")))?;
        Ok(MemoryFile {
            store: None,
            name: name.to_string(),
            data,
            pos: 0,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn remove(&self, name: &str) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    fn commit(&self, name: &str, data: Arc<Vec<u8>>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), data);
    }
}

/// Cursor onto a [`MemoryStore`] file.
///
/// Files from [`MemoryStore::create`] are writable, and files from
/// [`MemoryStore::open`] are read-only snapshots.
#[derive(Debug)]
pub struct MemoryFile {
    store: Option<MemoryStore>,
    name: String,
    data: Arc<Vec<u8>>,
    pos: u64,
}

impl MemoryFile {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = (self.pos as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => (self.data.len() as u64).checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(target) => {
                self.pos = target;
                Ok(target)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the file",
            )),
        }
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.store.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is open for reading", self.name),
            ));
        }
        let data = Arc::make_mut(&mut self.data);
        let start = self.pos as usize;
        if data.len() < start {
            data.resize(start, 0);
        }
        let overlap = buf.len().min(data.len() - start);
        data[start..start + overlap].copy_from_slice(&buf[..overlap]);
        data.extend_from_slice(&buf[overlap..]);
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(ref store) = self.store {
            store.commit(&self.name, Arc::clone(&self.data));
        }
        Ok(())
    }
}

impl Source for MemoryFile {
    fn try_clone(&self) -> Result<Self> {
        Ok(MemoryFile {
            store: None,
            name: self.name.clone(),
            data: Arc::clone(&self.data),
            pos: 0,
        })
    }

    fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_file_commit() {
        let store = MemoryStore::new();
        let mut file = store.create("a.parquet");
        file.write_all(b"PAR1").unwrap();
        assert!(!store.contains("a.parquet"), "Not visible before flush");

        file.flush().unwrap();
        let mut reader = store.open("a.parquet").unwrap();
        let mut buf = vec![];
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"PAR1");

        assert!(reader.write(b"x").is_err(), "Opened files are read-only");
        assert!(store.open("b.parquet").is_err());
        assert!(store.remove("a.parquet"));
        assert!(!store.contains("a.parquet"));
    }

    #[test]
    fn test_stores_are_independent() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        let mut file = a.create("x");
        file.write_all(b"1").unwrap();
        file.flush().unwrap();

        assert!(a.contains("x"));
        assert!(!b.contains("x"));
    }

    #[test]
    fn test_independent_cursors() {
        let store = MemoryStore::new();
        let mut file = store.create("f");
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let mut first = store.open("f").unwrap();
        first.seek(SeekFrom::End(-4)).unwrap();
        let mut second = first.try_clone().unwrap();

        let mut tail = [0u8; 4];
        first.read_exact(&mut tail).unwrap();
        let mut head = [0u8; 2];
        second.read_exact(&mut head).unwrap();
        assert_eq!(&tail, b"6789");
        assert_eq!(&head, b"01");
        assert_eq!(second.len().unwrap(), 10);
        assert!(first.seek(SeekFrom::Current(-100)).is_err());
    }

    #[test]
    fn test_overwrite_after_seek() {
        let store = MemoryStore::new();
        let mut file = store.create("f");
        file.write_all(b"abcdef").unwrap();
        file.seek(SeekFrom::Start(2)).unwrap();
        file.write_all(b"XYZW").unwrap();
        file.write_all(b"!").unwrap();
        file.flush().unwrap();

        let mut buf = vec![];
        store.open("f").unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"abXYZW!");
    }

    #[test]
    fn test_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let mut file = LocalFile::create(&path).unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();

        let mut reader = LocalFile::open(&path).unwrap();
        let mut other = reader.try_clone().unwrap();
        reader.seek(SeekFrom::Start(3)).unwrap();
        let mut buf = String::new();
        other.read_to_string(&mut buf).unwrap();

        assert_eq!(buf, "hello");
        assert_eq!(reader.len().unwrap(), 5);
        assert_eq!(reader.path(), path.as_path());
    }
}
