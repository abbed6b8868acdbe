// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ULog record framing.
//!
//! Every record is `uint16 size` (payload bytes, little-endian), `uint8 type`
//! (an ASCII tag), then `size` payload bytes, contiguous with its neighbors.
//! [`RecordCodec`] decodes one record at a time into the closed [`Record`]
//! sum type; tags outside the known set are retained as [`Record::Unknown`].

use byteorder::{ByteOrder, LittleEndian};

use crate::core::{Result, UlogError};
use crate::io::chunked::ChunkedReader;
use crate::io::source::ByteSource;

/// The 7-byte ULog file magic.
pub const FILE_MAGIC: [u8; 7] = [0x55, 0x4C, 0x6F, 0x67, 0x01, 0x12, 0x35];

/// Size of the fixed file header: magic, version byte, start timestamp.
pub const FILE_HEADER_SIZE: u64 = 16;

/// Size of a record header: `uint16 size` + `uint8 type`.
pub const RECORD_HEADER_SIZE: u64 = 3;

/// Payload of every synchronization record.
pub const SYNC_MAGIC: [u8; 8] = [0x2F, 0x73, 0x13, 0x20, 0x25, 0x0C, 0xBB, 0x12];

/// FlagBits payload from the start of the Definitions section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagBits {
    /// Compatible flag bytes; unknown bits are ignorable
    pub compat_flags: [u8; 8],
    /// Incompatible flag bytes; only bit 0 of byte 0 ("appended data") is
    /// recognized
    pub incompat_flags: [u8; 8],
    /// Up to three file offsets of appended (crash-dump) data segments
    pub appended_offsets: [u64; 3],
}

impl FlagBits {
    /// Whether the appended-data bit is set.
    pub fn has_appended_data(&self) -> bool {
        self.incompat_flags[0] & 1 != 0
    }
}

/// One decoded ULog record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// `B`: flag bits (Definitions section, first record, v >= 1)
    FlagBits(FlagBits),
    /// `I`: information entry; key is an undecoded field definition
    Information {
        /// Field-definition key, e.g. `char[3] sys_name`
        key: String,
        /// Raw value bytes
        value: Vec<u8>,
    },
    /// `M`: continued/multi information entry
    InformationMulti {
        /// Whether this entry continues the previous one for the same key
        is_continued: bool,
        /// Field-definition key
        key: String,
        /// Raw value bytes
        value: Vec<u8>,
    },
    /// `F`: message format definition
    FormatDefinition {
        /// The raw format string, `name:type field;…`
        format: String,
    },
    /// `P`: parameter
    Parameter {
        /// Field-definition key, e.g. `float SENS_BARO_QNH`
        key: String,
        /// Raw value bytes
        value: Vec<u8>,
    },
    /// `Q`: parameter with default-type bitfield
    ParameterDefault {
        /// Default-type bitfield
        default_types: u8,
        /// Field-definition key
        key: String,
        /// Raw value bytes
        value: Vec<u8>,
    },
    /// `A`: subscribe a message name to a numeric id
    AddLogged {
        /// Instance id for multi-instance topics
        multi_id: u8,
        /// Stream id used by subsequent `D` records
        msg_id: u16,
        /// Name of the message definition
        message_name: String,
    },
    /// `R`: unsubscribe (observational only; ids stay bound)
    RemoveLogged {
        /// Stream id being unsubscribed
        msg_id: u16,
    },
    /// `D`: data payload for a subscribed stream
    Data {
        /// Stream id bound by a prior `A` record
        msg_id: u16,
        /// Packed message payload
        data: Vec<u8>,
    },
    /// `L`: string log message
    Log {
        /// Syslog-style level
        level: u8,
        /// Timestamp in microseconds
        timestamp: u64,
        /// Message text
        message: String,
    },
    /// `C`: tagged string log message
    LogTagged {
        /// Syslog-style level
        level: u8,
        /// Source tag
        tag: u16,
        /// Timestamp in microseconds
        timestamp: u64,
        /// Message text
        message: String,
    },
    /// `S`: synchronization marker (validated, zero content)
    Synchronization,
    /// `O`: logging dropout
    Dropout {
        /// Dropout duration in milliseconds
        duration_ms: u16,
    },
    /// Any other tag, retained opaquely for forward compatibility
    Unknown {
        /// The unrecognized ASCII tag
        tag: u8,
        /// Raw payload bytes
        bytes: Vec<u8>,
    },
}

impl Record {
    /// The ASCII tag this record was decoded from.
    pub fn tag(&self) -> u8 {
        match self {
            Record::FlagBits(_) => b'B',
            Record::Information { .. } => b'I',
            Record::InformationMulti { .. } => b'M',
            Record::FormatDefinition { .. } => b'F',
            Record::Parameter { .. } => b'P',
            Record::ParameterDefault { .. } => b'Q',
            Record::AddLogged { .. } => b'A',
            Record::RemoveLogged { .. } => b'R',
            Record::Data { .. } => b'D',
            Record::Log { .. } => b'L',
            Record::LogTagged { .. } => b'C',
            Record::Synchronization => b'S',
            Record::Dropout { .. } => b'O',
            Record::Unknown { tag, .. } => *tag,
        }
    }
}

/// Whether a tag belongs to the Data section.
pub fn is_data_section_tag(tag: u8) -> bool {
    matches!(tag, b'A' | b'R' | b'D' | b'L' | b'C' | b'S' | b'O')
}

/// Minimum payload size required by a tag.
fn min_payload_size(tag: u8) -> usize {
    match tag {
        b'B' => 40,
        b'I' | b'P' | b'R' => 1,
        b'M' | b'Q' | b'D' | b'O' => 2,
        b'A' => 3,
        b'S' => 8,
        b'L' => 9,
        b'C' => 11,
        _ => 0,
    }
}

/// Decodes record frames from a [`ChunkedReader`].
#[derive(Debug, Default)]
pub struct RecordCodec;

impl RecordCodec {
    /// Decode the next record before `data_end`.
    ///
    /// Returns `Ok(None)` when fewer than a record header's worth of bytes
    /// remain. In lenient mode a declared payload that crosses `data_end` is
    /// also treated as end-of-stream (truncated tails are common in
    /// crash-dump logs), while strict mode reports it as malformed.
    pub fn read_record<S: ByteSource>(
        reader: &mut ChunkedReader<S>,
        data_end: u64,
        lenient: bool,
    ) -> Result<Option<(u64, Record)>> {
        let offset = reader.position();
        let end = data_end.min(reader.size());
        if end.saturating_sub(offset) < RECORD_HEADER_SIZE {
            return Ok(None);
        }

        let size = reader.read_u16()? as u64;
        let tag = reader.read_u8()?;

        if offset + RECORD_HEADER_SIZE + size > end {
            if lenient {
                return Ok(None);
            }
            return Err(UlogError::malformed(
                tag,
                offset,
                format!("payload of {size} bytes crosses the data boundary"),
            ));
        }

        let payload = reader.read_bytes(size as usize)?;
        let record = Self::parse_payload(tag, offset, payload)?;
        Ok(Some((offset, record)))
    }

    /// Parse a record payload by its tag.
    fn parse_payload(tag: u8, offset: u64, payload: &[u8]) -> Result<Record> {
        let size = payload.len();
        let min = min_payload_size(tag);
        if size < min {
            return Err(UlogError::malformed(
                tag,
                offset,
                format!("payload below minimum of {min} bytes"),
            ));
        }

        let record = match tag {
            b'B' => {
                let mut compat_flags = [0u8; 8];
                let mut incompat_flags = [0u8; 8];
                compat_flags.copy_from_slice(&payload[0..8]);
                incompat_flags.copy_from_slice(&payload[8..16]);
                let appended_offsets = [
                    LittleEndian::read_u64(&payload[16..24]),
                    LittleEndian::read_u64(&payload[24..32]),
                    LittleEndian::read_u64(&payload[32..40]),
                ];
                Record::FlagBits(FlagBits {
                    compat_flags,
                    incompat_flags,
                    appended_offsets,
                })
            }
            b'I' => {
                let (key, value) = split_keyed(tag, offset, payload, 1)?;
                Record::Information { key, value }
            }
            b'M' => {
                let is_continued = payload[0] != 0;
                let (key, value) = split_keyed(tag, offset, payload, 2)?;
                Record::InformationMulti {
                    is_continued,
                    key,
                    value,
                }
            }
            b'F' => Record::FormatDefinition {
                format: String::from_utf8_lossy(payload).into_owned(),
            },
            b'P' => {
                let (key, value) = split_keyed(tag, offset, payload, 1)?;
                Record::Parameter { key, value }
            }
            b'Q' => {
                let default_types = payload[0];
                let (key, value) = split_keyed(tag, offset, payload, 2)?;
                Record::ParameterDefault {
                    default_types,
                    key,
                    value,
                }
            }
            b'A' => Record::AddLogged {
                multi_id: payload[0],
                msg_id: LittleEndian::read_u16(&payload[1..3]),
                message_name: String::from_utf8_lossy(&payload[3..]).into_owned(),
            },
            b'R' => Record::RemoveLogged {
                msg_id: payload[0] as u16,
            },
            b'D' => Record::Data {
                msg_id: LittleEndian::read_u16(&payload[0..2]),
                data: payload[2..].to_vec(),
            },
            b'L' => Record::Log {
                level: payload[0],
                timestamp: LittleEndian::read_u64(&payload[1..9]),
                message: String::from_utf8_lossy(&payload[9..]).into_owned(),
            },
            b'C' => Record::LogTagged {
                level: payload[0],
                tag: LittleEndian::read_u16(&payload[1..3]),
                timestamp: LittleEndian::read_u64(&payload[3..11]),
                message: String::from_utf8_lossy(&payload[11..]).into_owned(),
            },
            b'S' => {
                if payload != SYNC_MAGIC {
                    return Err(UlogError::malformed(
                        tag,
                        offset,
                        "synchronization payload does not match the sync magic",
                    ));
                }
                Record::Synchronization
            }
            b'O' => Record::Dropout {
                duration_ms: LittleEndian::read_u16(&payload[0..2]),
            },
            _ => Record::Unknown {
                tag,
                bytes: payload.to_vec(),
            },
        };
        Ok(record)
    }
}

/// Split a keyed payload (`I`/`M`/`P`/`Q`) at `key_at`, where
/// `payload[key_at - 1]` is the key length.
fn split_keyed(tag: u8, offset: u64, payload: &[u8], key_at: usize) -> Result<(String, Vec<u8>)> {
    let key_len = payload[key_at - 1] as usize;
    if key_at + key_len > payload.len() {
        return Err(UlogError::malformed(
            tag,
            offset,
            format!("key length {key_len} exceeds the record payload"),
        ));
    }
    let key = String::from_utf8_lossy(&payload[key_at..key_at + key_len]).into_owned();
    let value = payload[key_at + key_len..].to_vec();
    Ok((key, value))
}
