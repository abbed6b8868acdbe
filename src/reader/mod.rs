// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ULog reader engine.
//!
//! [`UlogReader`] orchestrates the decoder: `open()` consumes the file
//! header and the whole Definitions section, then builds a time index across
//! the Data section; after that the header state, counters, and
//! [`UlogReader::read_messages`] are available.
//!
//! Indexing never fully deserializes data records. The timestamp of each
//! stream is read at a per-`msg_id` byte offset computed once from the
//! subscription's field layout and cached thereafter.

pub mod index;
pub mod messages;
pub mod record;
pub mod timeseries;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::core::{Result, UlogError, UlogValue};
use crate::encoding::decoder::MessageDecoder;
use crate::io::chunked::{ChunkedReader, DEFAULT_CHUNK_SIZE};
use crate::io::source::ByteSource;
use crate::schema::ast::{BuiltinType, MessageDefinition};
use crate::schema::parser::{parse_field_definition, parse_message_definition};
use crate::schema::size::SizeResolver;

use index::{IndexEntry, IndexTag, TimeIndex};
use messages::{DataSectionMessage, Parameter, ParameterValue, ReadOptions, Subscription};
use record::{
    is_data_section_tag, FlagBits, Record, RecordCodec, FILE_MAGIC, RECORD_HEADER_SIZE, SYNC_MAGIC,
};

/// Construction options for [`UlogReader`].
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Block size for source reads; defaults to 256 KiB
    pub chunk_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unopened,
    Open,
}

/// Streaming, seekable ULog decoder over a [`ByteSource`].
///
/// The source may be owned or borrowed (`&S` implements `ByteSource` too);
/// a borrowed source can back several readers at once since reads are
/// positional.
#[derive(Debug)]
pub struct UlogReader<S: ByteSource> {
    reader: ChunkedReader<S>,
    state: State,
    version: u8,
    start_timestamp: u64,
    flag_bits: Option<FlagBits>,
    information: HashMap<String, UlogValue>,
    parameters: HashMap<String, Parameter>,
    definitions: HashMap<String, MessageDefinition>,
    subscriptions: HashMap<u16, Subscription>,
    sizes: SizeResolver,
    decoder: MessageDecoder,
    index: TimeIndex,
    timestamp_offsets: HashMap<u16, usize>,
    data_counts: HashMap<u16, u64>,
    log_count: u64,
    dropout_count: u64,
    dropout_duration_ms: u64,
    time_range: Option<(u64, u64)>,
    data_end: u64,
}

impl<S: ByteSource> UlogReader<S> {
    /// Create an unopened reader with default options.
    pub fn new(source: S) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    /// Create an unopened reader with explicit options.
    pub fn with_options(source: S, options: ReaderOptions) -> Self {
        Self {
            reader: ChunkedReader::with_chunk_size(source, options.chunk_size),
            state: State::Unopened,
            version: 0,
            start_timestamp: 0,
            flag_bits: None,
            information: HashMap::new(),
            parameters: HashMap::new(),
            definitions: HashMap::new(),
            subscriptions: HashMap::new(),
            sizes: SizeResolver::new(),
            decoder: MessageDecoder::new(),
            index: TimeIndex::new(),
            timestamp_offsets: HashMap::new(),
            data_counts: HashMap::new(),
            log_count: 0,
            dropout_count: 0,
            dropout_duration_ms: 0,
            time_range: None,
            data_end: 0,
        }
    }

    /// Consume the file header and the Definitions section, then index the
    /// Data section. Must complete before any query or iteration call.
    pub fn open(&mut self) -> Result<()> {
        if self.state == State::Open {
            return Err(UlogError::state("open() called on an already-open reader"));
        }

        self.read_file_header()?;
        self.read_definitions()?;

        // The first nonzero appended offset below the file size bounds the
        // logical data section; bytes past it belong to a crash-dump
        // continuation.
        self.data_end = self.reader.size();
        if let Some(flag_bits) = &self.flag_bits {
            let appended = flag_bits.appended_offsets[0];
            if appended != 0 && appended < self.data_end {
                self.data_end = appended;
            }
        }

        self.build_index()?;
        self.state = State::Open;

        debug!(
            version = self.version,
            definitions = self.definitions.len(),
            subscriptions = self.subscriptions.len(),
            records = self.index.len(),
            "opened ULog file"
        );
        Ok(())
    }

    /// ULog format version from the file header.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Logging start timestamp in microseconds from the file header.
    pub fn start_timestamp(&self) -> u64 {
        self.start_timestamp
    }

    /// Flag bits, if the file carried a `B` record.
    pub fn flag_bits(&self) -> Option<&FlagBits> {
        self.flag_bits.as_ref()
    }

    /// Information entries (`I`/`M` records) keyed by name.
    pub fn information(&self) -> &HashMap<String, UlogValue> {
        &self.information
    }

    /// Initial parameters keyed by name.
    pub fn parameters(&self) -> &HashMap<String, Parameter> {
        &self.parameters
    }

    /// Message definitions keyed by name.
    pub fn definitions(&self) -> &HashMap<String, MessageDefinition> {
        &self.definitions
    }

    /// Stream subscriptions keyed by `msg_id`.
    pub fn subscriptions(&self) -> &HashMap<u16, Subscription> {
        &self.subscriptions
    }

    /// Definition bound to a subscribed stream.
    pub fn subscription_definition(&self, msg_id: u16) -> Option<&MessageDefinition> {
        let subscription = self.subscriptions.get(&msg_id)?;
        self.definitions.get(&subscription.message_name)
    }

    /// Total indexed record count, once open.
    pub fn message_count(&self) -> Option<u64> {
        self.opened().then(|| self.index.len() as u64)
    }

    /// Count of `L` and `C` records, once open.
    pub fn log_count(&self) -> Option<u64> {
        self.opened().then_some(self.log_count)
    }

    /// Per-stream `D` record counts, once open.
    pub fn data_message_counts(&self) -> Option<&HashMap<u16, u64>> {
        self.opened().then_some(&self.data_counts)
    }

    /// Count of `O` records, once open.
    pub fn dropout_count(&self) -> Option<u64> {
        self.opened().then_some(self.dropout_count)
    }

    /// Summed dropout duration in milliseconds, once open.
    pub fn dropout_duration_ms(&self) -> Option<u64> {
        self.opened().then_some(self.dropout_duration_ms)
    }

    /// `(min, max)` timestamp over time-bearing records, if any.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        if self.opened() {
            self.time_range
        } else {
            None
        }
    }

    /// Iterate records of the data section in index order.
    ///
    /// The range `[start, end]` is inclusive; `msg_ids` restricts data
    /// streams (log messages stay unless `include_logs` is false); `reverse`
    /// yields newest-first. Decode failures terminate the iterator with the
    /// error.
    pub fn read_messages(&mut self, options: ReadOptions) -> Result<MessageIter<'_, S>> {
        if !self.opened() {
            return Err(UlogError::state("read_messages called before open()"));
        }
        let start = options.start.unwrap_or(0);
        let end = options.end.unwrap_or(u64::MAX);
        let bounds = self.index.find_range(start, end);
        Ok(MessageIter {
            engine: self,
            bounds,
            msg_ids: options.msg_ids,
            include_logs: options.include_logs,
            reverse: options.reverse,
        })
    }

    fn opened(&self) -> bool {
        self.state == State::Open
    }

    /// Unopened -> HeaderRead: magic, version byte, start timestamp.
    fn read_file_header(&mut self) -> Result<()> {
        self.reader.seek_to(0)?;
        let mut magic = [0u8; 7];
        magic.copy_from_slice(self.reader.read_bytes(7)?);
        if magic != FILE_MAGIC {
            return Err(UlogError::InvalidMagic {
                found: magic.to_vec(),
            });
        }
        self.version = self.reader.read_u8()?;
        self.start_timestamp = self.reader.read_u64()?;
        Ok(())
    }

    /// HeaderRead -> DefinitionsParsed: dispatch records until the first
    /// Data-section tag shows up in the pre-peek.
    fn read_definitions(&mut self) -> Result<()> {
        let file_size = self.reader.size();
        loop {
            if self.reader.remaining() < RECORD_HEADER_SIZE {
                // No data section at all; indexing will yield nothing.
                break;
            }
            let tag = self.reader.peek_u8(2)?;
            if is_data_section_tag(tag) {
                break;
            }

            let Some((offset, decoded)) =
                RecordCodec::read_record(&mut self.reader, file_size, false)?
            else {
                break;
            };

            match decoded {
                Record::FlagBits(flag_bits) => {
                    validate_incompat_flags(&flag_bits)?;
                    self.flag_bits = Some(flag_bits);
                }
                Record::Information { key, value } => {
                    self.store_information(&key, &value, false)?;
                }
                Record::InformationMulti { key, value, .. } => {
                    self.store_information(&key, &value, true)?;
                }
                Record::FormatDefinition { format } => {
                    let definition = parse_message_definition(&format)?;
                    self.definitions.insert(definition.name.clone(), definition);
                }
                Record::Parameter { key, value } => {
                    if let Some((name, value)) = decode_parameter(b'P', offset, &key, &value)? {
                        self.parameters.insert(
                            name,
                            Parameter {
                                value,
                                default_types: 0,
                            },
                        );
                    }
                }
                Record::ParameterDefault {
                    default_types,
                    key,
                    value,
                } => {
                    if let Some((name, value)) = decode_parameter(b'Q', offset, &key, &value)? {
                        self.parameters.insert(
                            name,
                            Parameter {
                                value,
                                default_types,
                            },
                        );
                    }
                }
                Record::Unknown { tag, .. } => {
                    warn!(tag, offset, "ignoring unknown record in definitions section");
                }
                other => {
                    return Err(UlogError::state(format!(
                        "data-section record '{}' inside the definitions section at offset {offset}",
                        char::from(other.tag())
                    )));
                }
            }
        }
        Ok(())
    }

    /// Store an `I`/`M` entry; only simple-typed keys are kept.
    fn store_information(&mut self, key: &str, value: &[u8], multi: bool) -> Result<()> {
        let field = parse_field_definition(key)?;
        if field.is_complex() {
            warn!(key, "skipping information entry with complex-typed key");
            return Ok(());
        }
        let decoded = self.decoder.decode_info_value(&field, value)?;
        if multi {
            match self
                .information
                .entry(field.name)
                .or_insert_with(|| UlogValue::Array(Vec::new()))
            {
                UlogValue::Array(list) => list.push(decoded),
                existing => *existing = UlogValue::Array(vec![existing.clone(), decoded]),
            }
        } else {
            self.information.insert(field.name, decoded);
        }
        Ok(())
    }

    /// DefinitionsParsed -> Indexed: one entry per record until `data_end`,
    /// dropping a partial trailing record.
    fn build_index(&mut self) -> Result<()> {
        let data_end = self.data_end;
        let mut running_max = 0u64;

        loop {
            let offset = self.reader.position();
            if data_end.saturating_sub(offset) < RECORD_HEADER_SIZE {
                break;
            }
            let size = self.reader.read_u16()? as u64;
            let tag = self.reader.read_u8()?;
            if offset + RECORD_HEADER_SIZE + size > data_end {
                warn!(offset, "data section truncated mid-record");
                break;
            }

            let index_tag = match tag {
                b'A' => {
                    require_payload(tag, offset, size, 3)?;
                    let multi_id = self.reader.read_u8()?;
                    let msg_id = self.reader.read_u16()?;
                    let message_name = self.reader.read_string(size as usize - 3)?;
                    self.bind_subscription(msg_id, multi_id, message_name)?;
                    IndexTag::Other
                }
                b'D' => {
                    require_payload(tag, offset, size, 2)?;
                    let msg_id = self.reader.read_u16()?;
                    let ts_offset = self.timestamp_offset(msg_id, offset)? as u64;
                    if ts_offset + 8 > size - 2 {
                        return Err(UlogError::malformed(
                            tag,
                            offset,
                            "timestamp lies beyond the record payload",
                        ));
                    }
                    self.reader.skip(ts_offset)?;
                    let timestamp = self.reader.read_u64()?;
                    self.reader.skip(size - 2 - ts_offset - 8)?;
                    self.note_time(timestamp, &mut running_max);
                    *self.data_counts.entry(msg_id).or_insert(0) += 1;
                    self.push_entry(timestamp, offset, IndexTag::Data(msg_id));
                    continue;
                }
                b'L' => {
                    require_payload(tag, offset, size, 9)?;
                    let _level = self.reader.read_u8()?;
                    let timestamp = self.reader.read_u64()?;
                    self.reader.skip(size - 9)?;
                    self.note_time(timestamp, &mut running_max);
                    self.log_count += 1;
                    self.push_entry(timestamp, offset, IndexTag::Log);
                    continue;
                }
                b'C' => {
                    require_payload(tag, offset, size, 11)?;
                    self.reader.skip(3)?;
                    let timestamp = self.reader.read_u64()?;
                    self.reader.skip(size - 11)?;
                    self.note_time(timestamp, &mut running_max);
                    self.log_count += 1;
                    self.push_entry(timestamp, offset, IndexTag::Log);
                    continue;
                }
                b'S' => {
                    require_payload(tag, offset, size, 8)?;
                    let mut magic = [0u8; 8];
                    magic.copy_from_slice(self.reader.read_bytes(8)?);
                    if size != 8 || magic != SYNC_MAGIC {
                        return Err(UlogError::malformed(
                            tag,
                            offset,
                            "synchronization payload does not match the sync magic",
                        ));
                    }
                    IndexTag::Other
                }
                b'O' => {
                    require_payload(tag, offset, size, 2)?;
                    let duration_ms = self.reader.read_u16()?;
                    self.reader.skip(size - 2)?;
                    self.dropout_count += 1;
                    self.dropout_duration_ms += duration_ms as u64;
                    IndexTag::Other
                }
                _ => {
                    self.reader.skip(size)?;
                    IndexTag::Other
                }
            };

            self.push_entry(running_max, offset, index_tag);
        }

        self.index.sort();
        Ok(())
    }

    fn push_entry(&mut self, timestamp: u64, offset: u64, tag: IndexTag) {
        self.index.push(IndexEntry {
            timestamp,
            offset,
            tag,
        });
    }

    fn note_time(&mut self, timestamp: u64, running_max: &mut u64) {
        *running_max = (*running_max).max(timestamp);
        self.time_range = Some(match self.time_range {
            None => (timestamp, timestamp),
            Some((lo, hi)) => (lo.min(timestamp), hi.max(timestamp)),
        });
    }

    /// Bind a stream id to its definition. The first binding wins; a
    /// conflicting rebind is ignored with a warning.
    fn bind_subscription(&mut self, msg_id: u16, multi_id: u8, message_name: String) -> Result<()> {
        if !self.definitions.contains_key(&message_name) {
            return Err(UlogError::unknown_type(message_name));
        }
        if let Some(existing) = self.subscriptions.get(&msg_id) {
            if existing.message_name != message_name {
                warn!(
                    msg_id,
                    bound = %existing.message_name,
                    requested = %message_name,
                    "ignoring conflicting re-subscription"
                );
            }
            return Ok(());
        }
        self.subscriptions.insert(
            msg_id,
            Subscription {
                message_name,
                multi_id,
            },
        );
        Ok(())
    }

    /// Byte offset of the `timestamp` field within a stream's payload,
    /// computed on first sight of the `msg_id` and cached.
    fn timestamp_offset(&mut self, msg_id: u16, record_offset: u64) -> Result<usize> {
        if let Some(&cached) = self.timestamp_offsets.get(&msg_id) {
            return Ok(cached);
        }

        let message_name = match self.subscriptions.get(&msg_id) {
            Some(subscription) => subscription.message_name.clone(),
            None => {
                return Err(UlogError::UnknownSubscription {
                    msg_id,
                    offset: record_offset,
                })
            }
        };
        let definition = self
            .definitions
            .get(&message_name)
            .ok_or_else(|| UlogError::unknown_type(&message_name))?;

        let mut walked = 0usize;
        let mut found = None;
        for field in &definition.fields {
            if !field.is_padding()
                && field.name == "timestamp"
                && field.builtin == Some(BuiltinType::UInt64)
                && field.array_length.is_none()
            {
                found = Some(walked);
                break;
            }
            walked += self.sizes.field_size(field, &self.definitions)? * field.element_count();
        }

        let ts_offset = found.ok_or_else(|| UlogError::missing_timestamp(&message_name))?;
        self.timestamp_offsets.insert(msg_id, ts_offset);
        Ok(ts_offset)
    }

    /// Seek to an index entry and decode its record fully.
    fn decode_entry(&mut self, entry: IndexEntry) -> Result<DataSectionMessage> {
        self.reader.seek_to(entry.offset)?;
        let (offset, decoded) = RecordCodec::read_record(&mut self.reader, self.data_end, false)?
            .ok_or_else(|| {
            UlogError::unexpected_eof(RECORD_HEADER_SIZE as usize, 0, entry.offset)
        })?;

        let message = match decoded {
            Record::Data { msg_id, data } => {
                let subscription = self
                    .subscriptions
                    .get(&msg_id)
                    .cloned()
                    .ok_or(UlogError::UnknownSubscription { msg_id, offset })?;
                let definition = self
                    .definitions
                    .get(&subscription.message_name)
                    .ok_or_else(|| UlogError::unknown_type(&subscription.message_name))?;
                let fields =
                    self.decoder
                        .decode(definition, &self.definitions, &self.sizes, &data, 0)?;
                DataSectionMessage::Data {
                    msg_id,
                    multi_id: subscription.multi_id,
                    message_name: subscription.message_name,
                    timestamp: entry.timestamp,
                    fields,
                }
            }
            Record::Log {
                level,
                timestamp,
                message,
            } => DataSectionMessage::Log {
                level,
                timestamp,
                message,
            },
            Record::LogTagged {
                level,
                tag,
                timestamp,
                message,
            } => DataSectionMessage::TaggedLog {
                level,
                tag,
                timestamp,
                message,
            },
            Record::AddLogged {
                multi_id,
                msg_id,
                message_name,
            } => DataSectionMessage::Subscription {
                msg_id,
                multi_id,
                message_name,
            },
            Record::RemoveLogged { msg_id } => DataSectionMessage::Unsubscription { msg_id },
            Record::Parameter { key, value } => match decode_parameter(b'P', offset, &key, &value)?
            {
                Some((key, value)) => DataSectionMessage::ParameterChange { key, value },
                None => DataSectionMessage::Unknown { tag: b'P' },
            },
            Record::ParameterDefault { key, value, .. } => {
                match decode_parameter(b'Q', offset, &key, &value)? {
                    Some((key, value)) => DataSectionMessage::ParameterChange { key, value },
                    None => DataSectionMessage::Unknown { tag: b'Q' },
                }
            }
            Record::Synchronization => DataSectionMessage::Sync,
            Record::Dropout { duration_ms } => DataSectionMessage::Dropout { duration_ms },
            other => DataSectionMessage::Unknown { tag: other.tag() },
        };
        Ok(message)
    }
}

/// Iterator over decoded data-section messages within a time range.
///
/// Dropping a partially consumed iterator leaves the reader valid; a new
/// iteration may be started at any time.
pub struct MessageIter<'a, S: ByteSource> {
    engine: &'a mut UlogReader<S>,
    bounds: Option<(usize, usize)>,
    msg_ids: Option<Vec<u16>>,
    include_logs: bool,
    reverse: bool,
}

impl<S: ByteSource> MessageIter<'_, S> {
    fn passes(&self, entry: IndexEntry) -> bool {
        match entry.tag {
            IndexTag::Data(msg_id) => self
                .msg_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&msg_id)),
            IndexTag::Log => self.include_logs,
            IndexTag::Other => self.msg_ids.is_none(),
        }
    }
}

impl<S: ByteSource> Iterator for MessageIter<'_, S> {
    type Item = Result<DataSectionMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (lo, hi) = self.bounds?;
            let at = if self.reverse { hi } else { lo };
            self.bounds = if lo == hi {
                None
            } else if self.reverse {
                Some((lo, hi - 1))
            } else {
                Some((lo + 1, hi))
            };

            let entry = self.engine.index.get(at)?;
            if !self.passes(entry) {
                continue;
            }
            return match self.engine.decode_entry(entry) {
                Ok(message) => Some(Ok(message)),
                Err(error) => {
                    self.bounds = None;
                    Some(Err(error))
                }
            };
        }
    }
}

/// FlagBits invariant: only the appended-data bit of incompatible byte 0 is
/// recognized; anything else makes the file unreadable.
fn validate_incompat_flags(flag_bits: &FlagBits) -> Result<()> {
    if flag_bits.incompat_flags[0] > 1 {
        return Err(UlogError::IncompatibleFlag {
            byte_index: 0,
            value: flag_bits.incompat_flags[0],
        });
    }
    for (byte_index, &value) in flag_bits.incompat_flags.iter().enumerate().skip(1) {
        if value != 0 {
            return Err(UlogError::IncompatibleFlag { byte_index, value });
        }
    }
    Ok(())
}

fn require_payload(tag: u8, offset: u64, size: u64, min: u64) -> Result<()> {
    if size < min {
        return Err(UlogError::malformed(
            tag,
            offset,
            format!("payload below minimum of {min} bytes"),
        ));
    }
    Ok(())
}

/// Decode a parameter value; only `int32_t` and `float` scalars are
/// accepted, anything else is skipped with a warning.
fn decode_parameter(
    tag: u8,
    offset: u64,
    key: &str,
    value: &[u8],
) -> Result<Option<(String, ParameterValue)>> {
    let field = parse_field_definition(key)?;
    let decoded = match (field.builtin, field.array_length) {
        (Some(BuiltinType::Int32), None) => {
            let bytes = value.get(0..4).ok_or_else(|| {
                UlogError::malformed(tag, offset, "parameter value shorter than 4 bytes")
            })?;
            ParameterValue::Int32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        (Some(BuiltinType::Float), None) => {
            let bytes = value.get(0..4).ok_or_else(|| {
                UlogError::malformed(tag, offset, "parameter value shorter than 4 bytes")
            })?;
            ParameterValue::Float(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        _ => {
            warn!(key, "skipping parameter that is not an int32_t or float scalar");
            return Ok(None);
        }
    };
    Ok(Some((field.name, decoded)))
}
