use crate::collection::MediaRoot;
use crate::error::StorageError;
use crate::file_ref::ContentUri;
use crate::platform::memory::MemoryBroker;
use crate::platform::{ContentBroker, EntryRecord, NewEntry, Selection, WriteMode};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Write a file into an app-private test directory
pub fn create_private_file(private_dir: &TempDir, filename: &str, bytes: &[u8]) -> PathBuf {
    let file_path = private_dir.path().join(filename);
    fs::write(&file_path, bytes).unwrap();
    file_path
}

/// Bytes that pass through a broken stream before it fails
const BYTES_BEFORE_FAILURE: usize = 4;

/// Wraps a [`MemoryBroker`] and breaks its read or write streams partway.
pub struct BrokenStreamBroker {
    inner: Arc<MemoryBroker>,
    break_reads: bool,
    break_writes: bool,
}

impl BrokenStreamBroker {
    pub fn breaking_reads(inner: Arc<MemoryBroker>) -> Self {
        Self {
            inner,
            break_reads: true,
            break_writes: false,
        }
    }

    pub fn breaking_writes(inner: Arc<MemoryBroker>) -> Self {
        Self {
            inner,
            break_reads: false,
            break_writes: true,
        }
    }
}

struct BrokenReader<'a> {
    inner: Box<dyn Read + 'a>,
    remaining: usize,
}

impl Read for BrokenReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("connection reset"));
        }
        let limit = buf.len().min(self.remaining);
        let read = self.inner.read(&mut buf[..limit])?;
        self.remaining -= read;
        Ok(read)
    }
}

struct BrokenWriter<'a> {
    inner: Box<dyn Write + 'a>,
    remaining: usize,
}

impl Write for BrokenWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("disk full"));
        }
        let limit = buf.len().min(self.remaining);
        let written = self.inner.write(&buf[..limit])?;
        self.remaining -= written;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ContentBroker for BrokenStreamBroker {
    fn insert(&self, root: MediaRoot, entry: &NewEntry) -> Result<ContentUri, StorageError> {
        self.inner.insert(root, entry)
    }

    fn query(
        &self,
        root: MediaRoot,
        selection: &Selection,
    ) -> Result<Vec<EntryRecord>, StorageError> {
        self.inner.query(root, selection)
    }

    fn describe(&self, uri: &ContentUri) -> Result<Option<EntryRecord>, StorageError> {
        self.inner.describe(uri)
    }

    fn open_read(&self, uri: &ContentUri) -> Result<Box<dyn Read + '_>, StorageError> {
        let reader = self.inner.open_read(uri)?;
        if !self.break_reads {
            return Ok(reader);
        }
        Ok(Box::new(BrokenReader {
            inner: reader,
            remaining: BYTES_BEFORE_FAILURE,
        }))
    }

    fn open_write(
        &self,
        uri: &ContentUri,
        mode: WriteMode,
    ) -> Result<Box<dyn Write + '_>, StorageError> {
        let writer = self.inner.open_write(uri, mode)?;
        if !self.break_writes {
            return Ok(writer);
        }
        Ok(Box::new(BrokenWriter {
            inner: writer,
            remaining: BYTES_BEFORE_FAILURE,
        }))
    }

    fn delete(&self, uri: &ContentUri) -> Result<usize, StorageError> {
        self.inner.delete(uri)
    }

    fn mime_type(&self, uri: &ContentUri) -> Option<String> {
        self.inner.mime_type(uri)
    }
}
