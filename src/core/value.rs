// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Decoded value type system.
//!
//! Provides a unified value representation for decoded ULog data messages.
//! All variants are serde-serializable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Type alias for a decoded message as field name -> value mapping.
pub type DecodedMessage = HashMap<String, UlogValue>;

/// Unified value type for decoded ULog data.
///
/// Covers the twelve ULog builtin scalar types plus the three composites a
/// message layout can produce: arrays of primitives, nested structs, and
/// arrays of structs. `char` arrays decode to [`UlogValue::String`].
///
/// Decoded values own their strings and arrays; they never alias the
/// reader's chunk buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UlogValue {
    // Boolean
    Bool(bool),

    // Signed integers
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    // Unsigned integers
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),

    // Floating point
    Float32(f32),
    Float64(f64),

    // String (UTF-8, from char arrays)
    String(String),

    // Array of values
    Array(Vec<UlogValue>),

    // Nested message/struct
    Struct(DecodedMessage),
}

impl UlogValue {
    /// Check if this value is a numeric type (integers or floats).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            UlogValue::Int8(_)
                | UlogValue::Int16(_)
                | UlogValue::Int32(_)
                | UlogValue::Int64(_)
                | UlogValue::UInt8(_)
                | UlogValue::UInt16(_)
                | UlogValue::UInt32(_)
                | UlogValue::UInt64(_)
                | UlogValue::Float32(_)
                | UlogValue::Float64(_)
        )
    }

    /// Check if this value is a container type (array or struct).
    pub fn is_container(&self) -> bool {
        matches!(self, UlogValue::Array(_) | UlogValue::Struct(_))
    }

    /// Try to convert this value to f64 (for numeric values only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            UlogValue::Int8(v) => Some(*v as f64),
            UlogValue::Int16(v) => Some(*v as f64),
            UlogValue::Int32(v) => Some(*v as f64),
            UlogValue::Int64(v) => Some(*v as f64),
            UlogValue::UInt8(v) => Some(*v as f64),
            UlogValue::UInt16(v) => Some(*v as f64),
            UlogValue::UInt32(v) => Some(*v as f64),
            UlogValue::UInt64(v) => Some(*v as f64),
            UlogValue::Float32(v) => Some(*v as f64),
            UlogValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to convert this value to i64 (for integer types only).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            UlogValue::Int8(v) => Some(*v as i64),
            UlogValue::Int16(v) => Some(*v as i64),
            UlogValue::Int32(v) => Some(*v as i64),
            UlogValue::Int64(v) => Some(*v),
            UlogValue::UInt8(v) => Some(*v as i64),
            UlogValue::UInt16(v) => Some(*v as i64),
            UlogValue::UInt32(v) => Some(*v as i64),
            UlogValue::UInt64(v) => {
                if *v <= i64::MAX as u64 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Try to convert this value to u64 (for non-negative integer types only).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            UlogValue::UInt8(v) => Some(*v as u64),
            UlogValue::UInt16(v) => Some(*v as u64),
            UlogValue::UInt32(v) => Some(*v as u64),
            UlogValue::UInt64(v) => Some(*v),
            UlogValue::Int8(v) if *v >= 0 => Some(*v as u64),
            UlogValue::Int16(v) if *v >= 0 => Some(*v as u64),
            UlogValue::Int32(v) if *v >= 0 => Some(*v as u64),
            UlogValue::Int64(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    /// Try to get the inner string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            UlogValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the inner array.
    pub fn as_array(&self) -> Option<&[UlogValue]> {
        match self {
            UlogValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to get the inner struct.
    pub fn as_struct(&self) -> Option<&DecodedMessage> {
        match self {
            UlogValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name of this value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            UlogValue::Bool(_) => "bool",
            UlogValue::Int8(_) => "int8",
            UlogValue::Int16(_) => "int16",
            UlogValue::Int32(_) => "int32",
            UlogValue::Int64(_) => "int64",
            UlogValue::UInt8(_) => "uint8",
            UlogValue::UInt16(_) => "uint16",
            UlogValue::UInt32(_) => "uint32",
            UlogValue::UInt64(_) => "uint64",
            UlogValue::Float32(_) => "float32",
            UlogValue::Float64(_) => "float64",
            UlogValue::String(_) => "string",
            UlogValue::Array(_) => "array",
            UlogValue::Struct(_) => "struct",
        }
    }
}

impl fmt::Display for UlogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UlogValue::Bool(v) => write!(f, "{v}"),
            UlogValue::Int8(v) => write!(f, "{v}"),
            UlogValue::Int16(v) => write!(f, "{v}"),
            UlogValue::Int32(v) => write!(f, "{v}"),
            UlogValue::Int64(v) => write!(f, "{v}"),
            UlogValue::UInt8(v) => write!(f, "{v}"),
            UlogValue::UInt16(v) => write!(f, "{v}"),
            UlogValue::UInt32(v) => write!(f, "{v}"),
            UlogValue::UInt64(v) => write!(f, "{v}"),
            UlogValue::Float32(v) => write!(f, "{v}"),
            UlogValue::Float64(v) => write!(f, "{v}"),
            UlogValue::String(v) => write!(f, "\"{v}\""),
            UlogValue::Array(v) => write!(f, "[{} elements]", v.len()),
            UlogValue::Struct(v) => write!(f, "{{{} fields}}", v.len()),
        }
    }
}
