// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for ulogcodec.
//!
//! Every failure mode of the decoder surfaces as a distinct [`UlogError`]
//! kind. Errors raised while a record is being decoded carry the byte offset
//! of the offending record where available.

use std::fmt;

/// Errors that can occur while decoding a ULog file.
#[derive(Debug, Clone)]
pub enum UlogError {
    /// The 7-byte file magic did not match.
    InvalidMagic {
        /// The bytes actually found at the start of the file
        found: Vec<u8>,
    },

    /// An incompatible flag byte outside the recognized "appended data" bit.
    IncompatibleFlag {
        /// Index of the offending byte within the incompatible-flags block
        byte_index: usize,
        /// Value of that byte
        value: u8,
    },

    /// Fewer bytes were available than a read required.
    UnexpectedEof {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Logical byte offset of the read
        offset: u64,
    },

    /// A record payload violated its type's structural requirements.
    MalformedRecord {
        /// ASCII record tag
        tag: u8,
        /// File offset of the record's size field
        offset: u64,
        /// What was wrong
        reason: String,
    },

    /// A message format or field definition string failed to parse.
    BadFormat {
        /// The offending definition text
        input: String,
        /// What was wrong
        reason: String,
    },

    /// A complex field referenced a message name with no definition.
    UnknownType {
        /// The referenced type name
        type_name: String,
    },

    /// A data record carried a `msg_id` never bound by a subscription.
    UnknownSubscription {
        /// The unbound message id
        msg_id: u16,
        /// File offset of the data record
        offset: u64,
    },

    /// A subscribed message definition has no top-level `uint64_t timestamp`.
    MissingTimestamp {
        /// Name of the definition
        message_name: String,
    },

    /// An operation was attempted in the wrong lifecycle state.
    StateViolation {
        /// What was attempted and why it is invalid
        reason: String,
    },

    /// A seek target fell outside the file.
    SeekOutOfRange {
        /// Requested absolute offset
        target: i128,
        /// Total file size
        size: u64,
    },

    /// An underlying byte-source I/O failure.
    Io {
        /// Error message from the source
        message: String,
    },
}

impl UlogError {
    /// Create an unexpected-EOF error.
    pub fn unexpected_eof(requested: usize, available: usize, offset: u64) -> Self {
        UlogError::UnexpectedEof {
            requested,
            available,
            offset,
        }
    }

    /// Create a malformed-record error.
    pub fn malformed(tag: u8, offset: u64, reason: impl Into<String>) -> Self {
        UlogError::MalformedRecord {
            tag,
            offset,
            reason: reason.into(),
        }
    }

    /// Create a bad-format error.
    pub fn bad_format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        UlogError::BadFormat {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown-type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        UlogError::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Create a missing-timestamp error.
    pub fn missing_timestamp(message_name: impl Into<String>) -> Self {
        UlogError::MissingTimestamp {
            message_name: message_name.into(),
        }
    }

    /// Create a state-violation error.
    pub fn state(reason: impl Into<String>) -> Self {
        UlogError::StateViolation {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for UlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UlogError::InvalidMagic { found } => {
                write!(f, "Invalid ULog magic: found {found:02X?}")
            }
            UlogError::IncompatibleFlag { byte_index, value } => write!(
                f,
                "Incompatible flag byte {byte_index} has unrecognized value 0x{value:02X}"
            ),
            UlogError::UnexpectedEof {
                requested,
                available,
                offset,
            } => write!(
                f,
                "Unexpected end of data: requested {requested} bytes at offset {offset}, but only {available} bytes available"
            ),
            UlogError::MalformedRecord {
                tag,
                offset,
                reason,
            } => write!(
                f,
                "Malformed '{}' record at offset {offset}: {reason}",
                char::from(*tag)
            ),
            UlogError::BadFormat { input, reason } => {
                write!(f, "Bad format definition '{input}': {reason}")
            }
            UlogError::UnknownType { type_name } => {
                write!(f, "Unknown message type: '{type_name}'")
            }
            UlogError::UnknownSubscription { msg_id, offset } => write!(
                f,
                "Data record at offset {offset} references unsubscribed msg_id {msg_id}"
            ),
            UlogError::MissingTimestamp { message_name } => write!(
                f,
                "Message definition '{message_name}' has no top-level uint64_t timestamp field"
            ),
            UlogError::StateViolation { reason } => {
                write!(f, "State violation: {reason}")
            }
            UlogError::SeekOutOfRange { target, size } => {
                write!(f, "Seek target {target} outside file of {size} bytes")
            }
            UlogError::Io { message } => write!(f, "I/O error: {message}"),
        }
    }
}

impl std::error::Error for UlogError {}

impl From<std::io::Error> for UlogError {
    fn from(err: std::io::Error) -> Self {
        UlogError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for ulogcodec operations.
pub type Result<T> = std::result::Result<T, UlogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_eof_display() {
        let err = UlogError::unexpected_eof(8, 3, 120);
        assert!(matches!(err, UlogError::UnexpectedEof { .. }));
        assert_eq!(
            err.to_string(),
            "Unexpected end of data: requested 8 bytes at offset 120, but only 3 bytes available"
        );
    }

    #[test]
    fn test_malformed_record_display() {
        let err = UlogError::malformed(b'L', 42, "payload below minimum of 9 bytes");
        assert_eq!(
            err.to_string(),
            "Malformed 'L' record at offset 42: payload below minimum of 9 bytes"
        );
    }

    #[test]
    fn test_bad_format_display() {
        let err = UlogError::bad_format("uint8_t[0] x", "array length must be positive");
        assert_eq!(
            err.to_string(),
            "Bad format definition 'uint8_t[0] x': array length must be positive"
        );
    }

    #[test]
    fn test_unknown_type_display() {
        let err = UlogError::unknown_type("esc_report");
        assert_eq!(err.to_string(), "Unknown message type: 'esc_report'");
    }

    #[test]
    fn test_unknown_subscription_display() {
        let err = UlogError::UnknownSubscription {
            msg_id: 7,
            offset: 4096,
        };
        assert_eq!(
            err.to_string(),
            "Data record at offset 4096 references unsubscribed msg_id 7"
        );
    }

    #[test]
    fn test_missing_timestamp_display() {
        let err = UlogError::missing_timestamp("vehicle_status");
        assert_eq!(
            err.to_string(),
            "Message definition 'vehicle_status' has no top-level uint64_t timestamp field"
        );
    }

    #[test]
    fn test_state_violation_display() {
        let err = UlogError::state("read_messages before open");
        assert_eq!(
            err.to_string(),
            "State violation: read_messages before open"
        );
    }

    #[test]
    fn test_seek_out_of_range_display() {
        let err = UlogError::SeekOutOfRange {
            target: -1,
            size: 100,
        };
        assert_eq!(err.to_string(), "Seek target -1 outside file of 100 bytes");
    }

    #[test]
    fn test_incompatible_flag_display() {
        let err = UlogError::IncompatibleFlag {
            byte_index: 3,
            value: 0x80,
        };
        assert_eq!(
            err.to_string(),
            "Incompatible flag byte 3 has unrecognized value 0x80"
        );
    }

    #[test]
    fn test_invalid_magic_display() {
        let err = UlogError::InvalidMagic {
            found: vec![0x00, 0x11, 0x22],
        };
        assert!(err.to_string().starts_with("Invalid ULog magic"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: UlogError = io_err.into();
        assert!(matches!(err, UlogError::Io { .. }));
        assert_eq!(err.to_string(), "I/O error: file not found");
    }

    #[test]
    fn test_error_clone() {
        let err1 = UlogError::unknown_type("wind_estimate");
        let err2 = err1.clone();
        assert_eq!(err1.to_string(), err2.to_string());
    }
}
