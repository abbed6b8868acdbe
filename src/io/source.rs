// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Random-access byte sources.
//!
//! The decoder never assumes sequential access: everything it reads goes
//! through [`ByteSource`], a positional, idempotent read interface. Two
//! implementations are provided: an owned in-memory buffer and a read-only
//! memory map over a file.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::core::Result;

/// A random-access byte source.
///
/// Reads are positional and idempotent. Short reads at EOF are permitted;
/// callers surface an error if required bytes are missing.
pub trait ByteSource {
    /// Total size in bytes, fixed for the lifetime of the source.
    fn size(&self) -> u64;

    /// Read up to `buf.len()` bytes starting at `offset`, returning the
    /// number of bytes actually read. Reading at or past EOF returns 0.
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read(offset, buf)
    }
}

fn read_from_slice(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    if offset >= data.len() as u64 {
        return 0;
    }
    let start = offset as usize;
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}

/// A byte source over an owned in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    /// Create a source over the given bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl ByteSource for MemorySource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok(read_from_slice(&self.data, offset, buf))
    }
}

/// A byte source over a read-only memory-mapped file.
#[derive(Debug)]
pub struct FileSource {
    mmap: Mmap,
}

impl FileSource {
    /// Open a file and map it read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the map is read-only and the file handle is held for the
        // map's lifetime.
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(Self { mmap })
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok(read_from_slice(&self.mmap, offset, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source_reads() {
        let source = MemorySource::new(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(source.size(), 8);

        let mut buf = [0u8; 4];
        assert_eq!(source.read(2, &mut buf).unwrap(), 4);
        assert_eq!(buf, [2, 3, 4, 5]);
    }

    #[test]
    fn test_memory_source_short_read_at_eof() {
        let source = MemorySource::new(vec![9, 8, 7]);
        let mut buf = [0u8; 8];
        assert_eq!(source.read(1, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[8, 7]);
        assert_eq!(source.read(3, &mut buf).unwrap(), 0);
        assert_eq!(source.read(100, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_memory_source_reads_are_idempotent() {
        let source = MemorySource::new((0..32).collect());
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        source.read(10, &mut a).unwrap();
        source.read(10, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_borrowed_source() {
        let source = MemorySource::new(vec![1, 2, 3]);
        let borrowed: &MemorySource = &source;
        assert_eq!(ByteSource::size(&borrowed), 3);
        let mut buf = [0u8; 2];
        assert_eq!(borrowed.read(1, &mut buf).unwrap(), 2);
        assert_eq!(buf, [2, 3]);
    }

    #[test]
    fn test_file_source() {
        let path = format!("/tmp/ulogcodec_test_source_{}.bin", std::process::id());
        let mut file = File::create(&path).unwrap();
        file.write_all(&[10, 20, 30, 40, 50]).unwrap();
        file.sync_all().unwrap();

        let source = FileSource::open(&path).unwrap();
        assert_eq!(source.size(), 5);
        let mut buf = [0u8; 3];
        assert_eq!(source.read(1, &mut buf).unwrap(), 3);
        assert_eq!(buf, [20, 30, 40]);
        assert_eq!(source.read(4, &mut buf).unwrap(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_source_missing_file() {
        let result = FileSource::open("/tmp/ulogcodec_definitely_missing_file.ulg");
        assert!(result.is_err());
    }
}
