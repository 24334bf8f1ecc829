use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

pub const CHUNK_SIZE: usize = 2048;

/// How bytes move between two streams. Both produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyStrategy {
    /// Platform bulk copy
    #[default]
    Bulk,
    /// Fixed 2048 byte transfer loop
    Chunked,
}

impl CopyStrategy {
    /// Copy everything from `reader` into `writer` and flush it
    pub fn copy(self, reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<u64> {
        let copied = match self {
            CopyStrategy::Bulk => io::copy(reader, writer)?,
            CopyStrategy::Chunked => copy_chunked(reader, writer)?,
        };
        writer.flush()?;
        Ok(copied)
    }
}

fn copy_chunked(reader: &mut dyn Read, writer: &mut dyn Write) -> io::Result<u64> {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut copied = 0u64;
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => return Ok(copied),
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&chunk[..read])?;
        copied += read as u64;
    }
}

impl fmt::Display for CopyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyStrategy::Bulk => f.write_str("bulk"),
            CopyStrategy::Chunked => f.write_str("chunked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown copy strategy '{0}', expected 'bulk' or 'chunked'")]
pub struct UnknownCopyStrategy(pub String);

impl FromStr for CopyStrategy {
    type Err = UnknownCopyStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bulk" => Ok(CopyStrategy::Bulk),
            "chunked" => Ok(CopyStrategy::Chunked),
            _ => Err(UnknownCopyStrategy(s.to_string())),
        }
    }
}
