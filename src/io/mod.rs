// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte-level I/O: random-access sources and the chunked read cursor.

pub mod chunked;
pub mod source;

pub use chunked::{ChunkedReader, DEFAULT_CHUNK_SIZE};
pub use source::{ByteSource, FileSource, MemorySource};
