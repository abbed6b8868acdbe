// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Data-section message types and read options.

use crate::core::DecodedMessage;

/// A parameter value; ULog parameters are `int32_t` or `float` scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    /// An `int32_t` parameter
    Int32(i32),
    /// A `float` parameter
    Float(f32),
}

/// A named parameter with its default-type bitfield (0 for plain `P`
/// records).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    /// The parameter value
    pub value: ParameterValue,
    /// Default-type bitfield from a `Q` record, 0 otherwise
    pub default_types: u8,
}

/// A stream binding established by an `A` record. Permanent once assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Name of the bound message definition
    pub message_name: String,
    /// Instance id for multi-instance topics
    pub multi_id: u8,
}

/// Syslog-style log severity used by `L` and `C` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// System is unusable
    Emergency,
    /// Action must be taken immediately
    Alert,
    /// Critical conditions
    Critical,
    /// Error conditions
    Error,
    /// Warning conditions
    Warning,
    /// Normal but significant condition
    Notice,
    /// Informational
    Info,
    /// Debug-level messages
    Debug,
}

impl LogLevel {
    /// Map a raw record level to a severity.
    ///
    /// Firmware writes the level as an ASCII digit; raw 0..=7 is accepted
    /// too.
    pub fn from_raw(level: u8) -> Option<Self> {
        let value = if level.is_ascii_digit() {
            level - b'0'
        } else {
            level
        };
        match value {
            0 => Some(LogLevel::Emergency),
            1 => Some(LogLevel::Alert),
            2 => Some(LogLevel::Critical),
            3 => Some(LogLevel::Error),
            4 => Some(LogLevel::Warning),
            5 => Some(LogLevel::Notice),
            6 => Some(LogLevel::Info),
            7 => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

/// One fully decoded record from the data section.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSectionMessage {
    /// A decoded `D` record
    Data {
        /// Stream id
        msg_id: u16,
        /// Instance id of the stream's subscription
        multi_id: u8,
        /// Name of the message definition
        message_name: String,
        /// The message's own timestamp in microseconds
        timestamp: u64,
        /// Decoded field values, padding excluded
        fields: DecodedMessage,
    },
    /// An `L` record
    Log {
        /// Raw severity byte
        level: u8,
        /// Timestamp in microseconds
        timestamp: u64,
        /// Message text
        message: String,
    },
    /// A `C` record
    TaggedLog {
        /// Raw severity byte
        level: u8,
        /// Source tag
        tag: u16,
        /// Timestamp in microseconds
        timestamp: u64,
        /// Message text
        message: String,
    },
    /// An `A` record observed during iteration
    Subscription {
        /// Stream id being bound
        msg_id: u16,
        /// Instance id
        multi_id: u8,
        /// Name of the bound message definition
        message_name: String,
    },
    /// An `R` record; the binding itself stays in place
    Unsubscription {
        /// Stream id being unsubscribed
        msg_id: u16,
    },
    /// A `P` or `Q` record after the Definitions section (mid-flight
    /// parameter update); header state is not mutated
    ParameterChange {
        /// Parameter name
        key: String,
        /// New value
        value: ParameterValue,
    },
    /// A validated `S` record
    Sync,
    /// An `O` record
    Dropout {
        /// Dropout duration in milliseconds
        duration_ms: u16,
    },
    /// Any other record kind
    Unknown {
        /// The record's ASCII tag
        tag: u8,
    },
}

impl DataSectionMessage {
    /// The message's indexed timestamp, for time-bearing kinds.
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            DataSectionMessage::Data { timestamp, .. }
            | DataSectionMessage::Log { timestamp, .. }
            | DataSectionMessage::TaggedLog { timestamp, .. } => Some(*timestamp),
            _ => None,
        }
    }

    /// The severity of a log message.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            DataSectionMessage::Log { level, .. }
            | DataSectionMessage::TaggedLog { level, .. } => LogLevel::from_raw(*level),
            _ => None,
        }
    }
}

/// Options for [`UlogReader::read_messages`](crate::reader::UlogReader::read_messages).
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Inclusive lower timestamp bound in microseconds
    pub start: Option<u64>,
    /// Inclusive upper timestamp bound in microseconds
    pub end: Option<u64>,
    /// Restrict data messages to these stream ids
    pub msg_ids: Option<Vec<u16>>,
    /// Keep log messages even when `msg_ids` filters data streams
    pub include_logs: bool,
    /// Iterate the range newest-first
    pub reverse: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            msg_ids: None,
            include_logs: true,
            reverse: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_ascii_and_raw() {
        assert_eq!(LogLevel::from_raw(b'0'), Some(LogLevel::Emergency));
        assert_eq!(LogLevel::from_raw(b'4'), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_raw(b'7'), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_raw(3), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_raw(6), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_raw(8), None);
        assert_eq!(LogLevel::from_raw(b'9'), None);
    }

    #[test]
    fn test_message_timestamp_accessor() {
        let log = DataSectionMessage::Log {
            level: b'6',
            timestamp: 42,
            message: "armed".to_string(),
        };
        assert_eq!(log.timestamp(), Some(42));
        assert_eq!(log.log_level(), Some(LogLevel::Info));

        assert_eq!(DataSectionMessage::Sync.timestamp(), None);
        assert_eq!(
            DataSectionMessage::Dropout { duration_ms: 10 }.log_level(),
            None
        );
    }

    #[test]
    fn test_read_options_defaults() {
        let opts = ReadOptions::default();
        assert_eq!(opts.start, None);
        assert_eq!(opts.end, None);
        assert!(opts.msg_ids.is_none());
        assert!(opts.include_logs);
        assert!(!opts.reverse);
    }
}
