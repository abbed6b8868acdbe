// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # ulogcodec
//!
//! Decoder for PX4 ULog flight-recorder files: a binary, self-describing,
//! little-endian stream of typed records produced by autopilot firmware.
//!
//! The library is organized bottom-up:
//! - `io/` - random-access byte sources and the chunked read cursor
//! - `schema/` - message-definition parsing and byte-size resolution
//! - `reader/record` - record framing over the wire format
//! - `encoding/` - the definition-driven message deserializer
//! - `reader/` - the [`UlogReader`] engine, time index, and iteration API
//!
//! ## Example: reading a log
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ulogcodec::{FileSource, ReadOptions, UlogReader};
//!
//! let source = FileSource::open("flight.ulg")?;
//! let mut reader = UlogReader::new(source);
//! reader.open()?;
//!
//! println!("version {}, {} records", reader.version(), reader.message_count().unwrap());
//! for message in reader.read_messages(ReadOptions::default())? {
//!     let message = message?;
//!     if let Some(ts) = message.timestamp() {
//!         println!("{ts}: {message:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The engine never assumes sequential access: everything goes through the
//! [`ByteSource`] trait, so logs can be decoded from a memory map, an owned
//! buffer, or any other positional reader.

// Core types
pub mod core;

// Re-export core types for convenience
pub use crate::core::{DecodedMessage, Result, UlogError, UlogValue};

// Byte-level I/O
pub mod io;

pub use io::{ByteSource, ChunkedReader, FileSource, MemorySource, DEFAULT_CHUNK_SIZE};

// Message-definition model
pub mod schema;

pub use schema::{
    parse_field_definition, parse_message_definition, BuiltinType, Field, MessageDefinition,
    SizeResolver,
};

// Payload decoding
pub mod encoding;

pub use encoding::MessageDecoder;

// The reader engine and its supporting types
pub mod reader;

pub use reader::index::{IndexEntry, IndexTag, TimeIndex};
pub use reader::messages::{
    DataSectionMessage, LogLevel, Parameter, ParameterValue, ReadOptions, Subscription,
};
pub use reader::record::{FlagBits, Record, RecordCodec, FILE_MAGIC, SYNC_MAGIC};
pub use reader::timeseries::Timeseries;
pub use reader::{MessageIter, ReaderOptions, UlogReader};
