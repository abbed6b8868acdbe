// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunked read cursor over a [`ByteSource`].
//!
//! Caches a sliding byte window over the source and exposes a typed cursor
//! with peek, skip, seek, and little-endian primitive decoders. When a
//! primitive straddles a chunk boundary the unread tail is stitched to the
//! next fetch, so reads behave identically at every offset regardless of the
//! chunk size.

use byteorder::{ByteOrder, LittleEndian};

use crate::core::{Result, UlogError};
use crate::io::source::ByteSource;

/// Default chunk size for block reads (256 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// A typed read cursor over a random-access byte source.
///
/// Invariant: `file_cursor` is the source offset of the first byte *after*
/// the loaded chunk, so the logical position is
/// `file_cursor - (chunk.len() - chunk_pos)`.
#[derive(Debug)]
pub struct ChunkedReader<S> {
    source: S,
    size: u64,
    chunk_size: usize,
    chunk: Vec<u8>,
    chunk_pos: usize,
    file_cursor: u64,
}

impl<S: ByteSource> ChunkedReader<S> {
    /// Create a reader with the default chunk size.
    pub fn new(source: S) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// Create a reader with an explicit chunk size.
    pub fn with_chunk_size(source: S, chunk_size: usize) -> Self {
        let size = source.size();
        Self {
            source,
            size,
            chunk_size: chunk_size.max(1),
            chunk: Vec::new(),
            chunk_pos: 0,
            file_cursor: 0,
        }
    }

    /// Logical byte offset of the next byte to be read.
    #[inline]
    pub fn position(&self) -> u64 {
        self.file_cursor - (self.chunk.len() - self.chunk_pos) as u64
    }

    /// Total size of the underlying source.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes between the cursor and the end of the source.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.size - self.position()
    }

    /// Seek to an absolute offset in `[0, size]`, invalidating the chunk.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        if offset > self.size {
            return Err(UlogError::SeekOutOfRange {
                target: offset as i128,
                size: self.size,
            });
        }
        self.chunk.clear();
        self.chunk_pos = 0;
        self.file_cursor = offset;
        Ok(())
    }

    /// Seek relative to the current position.
    pub fn seek(&mut self, relative: i64) -> Result<()> {
        let target = self.position() as i128 + relative as i128;
        if target < 0 || target > self.size as i128 {
            return Err(UlogError::SeekOutOfRange {
                target,
                size: self.size,
            });
        }
        self.seek_to(target as u64)
    }

    /// Advance the cursor by `n` bytes without decoding them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let available = (self.chunk.len() - self.chunk_pos) as u64;
        if n <= available {
            self.chunk_pos += n as usize;
            return Ok(());
        }
        self.seek_to(self.position() + n)
    }

    /// Byte at `position() + k` without advancing the cursor.
    pub fn peek_u8(&mut self, k: usize) -> Result<u8> {
        self.ensure(k + 1)?;
        Ok(self.chunk[self.chunk_pos + k])
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.chunk[self.chunk_pos];
        self.chunk_pos += 1;
        Ok(value)
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let s = self.take(2)?;
        Ok(LittleEndian::read_u16(s))
    }

    /// Read a little-endian i16.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let s = self.take(4)?;
        Ok(LittleEndian::read_u32(s))
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        let s = self.take(8)?;
        Ok(LittleEndian::read_u64(s))
    }

    /// Read a little-endian i64.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Read a little-endian f32.
    pub fn read_f32(&mut self) -> Result<f32> {
        let s = self.take(4)?;
        Ok(LittleEndian::read_f32(s))
    }

    /// Read a little-endian f64.
    pub fn read_f64(&mut self) -> Result<f64> {
        let s = self.take(8)?;
        Ok(LittleEndian::read_f64(s))
    }

    /// Borrow the next `n` bytes and advance past them.
    ///
    /// The returned view stays valid only until the next non-peek read,
    /// which may restitch the underlying chunk.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.take(n)
    }

    /// UTF-8 decode of the next `n` bytes (invalid sequences replaced).
    pub fn read_string(&mut self, n: usize) -> Result<String> {
        let bytes = self.take(n)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        self.ensure(n)?;
        let start = self.chunk_pos;
        self.chunk_pos += n;
        Ok(&self.chunk[start..start + n])
    }

    /// Make at least `needed` unread bytes available in the chunk.
    ///
    /// Fetches `clamp(chunk_size, needed, file_remaining)` bytes; when the
    /// current chunk holds an unread tail, the tail is copied in front of the
    /// next fetch so multi-byte values never split across fetches.
    fn ensure(&mut self, needed: usize) -> Result<()> {
        let available = self.chunk.len() - self.chunk_pos;
        if available >= needed {
            return Ok(());
        }

        let file_remaining = (self.size - self.file_cursor) as usize;
        if available == 0 {
            let want = needed.max(self.chunk_size).min(file_remaining);
            self.chunk = self.fetch(want)?;
            self.chunk_pos = 0;
        } else {
            let want = (needed - available).max(self.chunk_size).min(file_remaining);
            let fetched = self.fetch(want)?;
            let mut stitched = Vec::with_capacity(available + fetched.len());
            stitched.extend_from_slice(&self.chunk[self.chunk_pos..]);
            stitched.extend_from_slice(&fetched);
            self.chunk = stitched;
            self.chunk_pos = 0;
        }

        let available = self.chunk.len() - self.chunk_pos;
        if available < needed {
            return Err(UlogError::unexpected_eof(
                needed,
                available,
                self.position(),
            ));
        }
        Ok(())
    }

    /// Read exactly `len` bytes at the file cursor, tolerating short reads
    /// from the source by retrying until it reports EOF.
    fn fetch(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self
                .source
                .read(self.file_cursor + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        self.file_cursor += filled as u64;
        Ok(buf)
    }
}
