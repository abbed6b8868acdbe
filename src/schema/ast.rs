// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! AST types for parsed ULog message definitions.

use std::fmt;

/// The twelve ULog builtin scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    /// Boolean, 1 byte
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Single byte character; arrays of char decode as UTF-8 strings
    Char,
}

impl BuiltinType {
    /// Get the wire size in bytes. ULog layouts are packed, so this is also
    /// the stride of array elements.
    pub const fn size(self) -> usize {
        match self {
            BuiltinType::Bool | BuiltinType::Int8 | BuiltinType::UInt8 | BuiltinType::Char => 1,
            BuiltinType::Int16 | BuiltinType::UInt16 => 2,
            BuiltinType::Int32 | BuiltinType::UInt32 | BuiltinType::Float => 4,
            BuiltinType::Int64 | BuiltinType::UInt64 | BuiltinType::Double => 8,
        }
    }

    /// Parse a builtin type from its ULog spelling.
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(BuiltinType::Bool),
            "int8_t" => Some(BuiltinType::Int8),
            "uint8_t" => Some(BuiltinType::UInt8),
            "int16_t" => Some(BuiltinType::Int16),
            "uint16_t" => Some(BuiltinType::UInt16),
            "int32_t" => Some(BuiltinType::Int32),
            "uint32_t" => Some(BuiltinType::UInt32),
            "int64_t" => Some(BuiltinType::Int64),
            "uint64_t" => Some(BuiltinType::UInt64),
            "float" => Some(BuiltinType::Float),
            "double" => Some(BuiltinType::Double),
            "char" => Some(BuiltinType::Char),
            _ => None,
        }
    }

    /// The ULog spelling of this type.
    pub const fn name(self) -> &'static str {
        match self {
            BuiltinType::Bool => "bool",
            BuiltinType::Int8 => "int8_t",
            BuiltinType::UInt8 => "uint8_t",
            BuiltinType::Int16 => "int16_t",
            BuiltinType::UInt16 => "uint16_t",
            BuiltinType::Int32 => "int32_t",
            BuiltinType::UInt32 => "uint32_t",
            BuiltinType::Int64 => "int64_t",
            BuiltinType::UInt64 => "uint64_t",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::Char => "char",
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field in a message definition.
///
/// `builtin` is `Some` iff the type is one of the twelve builtins; otherwise
/// `type_name` references another message definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Type spelling as it appeared in the format string
    pub type_name: String,
    /// Resolved builtin type, `None` for complex (nested-message) fields
    pub builtin: Option<BuiltinType>,
    /// Field name; a leading `_` marks a padding field
    pub name: String,
    /// Fixed array length, `None` for scalars
    pub array_length: Option<usize>,
}

impl Field {
    /// Whether this field references another message definition.
    pub fn is_complex(&self) -> bool {
        self.builtin.is_none()
    }

    /// Padding fields occupy layout space but produce no decoded output.
    pub fn is_padding(&self) -> bool {
        self.name.starts_with('_')
    }

    /// Number of elements this field contributes to the layout (1 for
    /// scalars).
    pub fn element_count(&self) -> usize {
        self.array_length.unwrap_or(1)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array_length {
            Some(n) => write!(f, "{}[{}] {}", self.type_name, n, self.name),
            None => write!(f, "{} {}", self.type_name, self.name),
        }
    }
}

/// An ordered, typed field list for one message name, parsed from the format
/// string of an `F` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDefinition {
    /// Message name
    pub name: String,
    /// Ordered list of fields, padding included
    pub fields: Vec<Field>,
}

impl MessageDefinition {
    /// Reconstruct the canonical format string, `name:type field;…;`.
    ///
    /// A trailing `;` is always emitted, matching the form PX4 firmware
    /// writes, so `parse(def.format()) == def`.
    pub fn format(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 16 * self.fields.len());
        out.push_str(&self.name);
        out.push(':');
        for field in &self.fields {
            out.push_str(&field.to_string());
            out.push(';');
        }
        out
    }

    /// Find the top-level `uint64_t timestamp` field, if any.
    pub fn timestamp_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| {
            !f.is_padding()
                && f.name == "timestamp"
                && f.builtin == Some(BuiltinType::UInt64)
                && f.array_length.is_none()
        })
    }
}
