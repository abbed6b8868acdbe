// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Definition-driven message deserializer.
//!
//! Interprets a data record's payload against a [`MessageDefinition`],
//! producing a [`UlogValue`] tree. Padding fields (name starting with `_`)
//! advance the cursor but produce no output; `char` arrays decode as UTF-8
//! strings; complex fields recurse through the definitions table.

use std::collections::HashMap;

use crate::core::{DecodedMessage, Result, UlogError, UlogValue};
use crate::schema::ast::{BuiltinType, Field, MessageDefinition};
use crate::schema::size::SizeResolver;

/// Decodes packed ULog message payloads using parsed definitions.
#[derive(Debug, Default)]
pub struct MessageDecoder;

impl MessageDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self
    }

    /// Decode `data` starting at `offset` according to `definition`.
    ///
    /// Walks fields in declaration order, advancing by each field's full
    /// contribution (per-element size times array length) whether or not the
    /// field is skipped as padding.
    pub fn decode(
        &self,
        definition: &MessageDefinition,
        definitions: &HashMap<String, MessageDefinition>,
        sizes: &SizeResolver,
        data: &[u8],
        offset: usize,
    ) -> Result<DecodedMessage> {
        let mut result = DecodedMessage::with_capacity(definition.fields.len());
        let mut cursor = offset;

        for field in &definition.fields {
            let elem_size = sizes.field_size(field, definitions)?;
            let total = elem_size * field.element_count();

            if field.is_padding() {
                cursor += total;
                continue;
            }

            let value = match field.builtin {
                Some(BuiltinType::Char) if field.array_length.is_some() => {
                    // Char arrays become strings, truncated to the bytes the
                    // view still holds.
                    let start = cursor.min(data.len());
                    let len = field.element_count().min(data.len() - start);
                    UlogValue::String(String::from_utf8_lossy(&data[start..start + len]).into_owned())
                }
                Some(builtin) => match field.array_length {
                    Some(count) => {
                        let mut values = Vec::with_capacity(count);
                        for i in 0..count {
                            values.push(read_primitive(builtin, data, cursor + i * elem_size)?);
                        }
                        UlogValue::Array(values)
                    }
                    None => read_primitive(builtin, data, cursor)?,
                },
                None => {
                    let nested = definitions
                        .get(&field.type_name)
                        .ok_or_else(|| UlogError::unknown_type(&field.type_name))?;
                    match field.array_length {
                        Some(count) => {
                            let mut values = Vec::with_capacity(count);
                            for i in 0..count {
                                let fields = self.decode(
                                    nested,
                                    definitions,
                                    sizes,
                                    data,
                                    cursor + i * elem_size,
                                )?;
                                values.push(UlogValue::Struct(fields));
                            }
                            UlogValue::Array(values)
                        }
                        None => UlogValue::Struct(self.decode(
                            nested,
                            definitions,
                            sizes,
                            data,
                            cursor,
                        )?),
                    }
                }
            };

            result.insert(field.name.clone(), value);
            cursor += total;
        }

        Ok(result)
    }

    /// Decode the value bytes of an information or parameter record against
    /// the simple-typed field parsed from its key.
    ///
    /// Only builtin-typed keys are decodable; a complex key is a bad format.
    pub fn decode_info_value(&self, field: &Field, data: &[u8]) -> Result<UlogValue> {
        let builtin = field.builtin.ok_or_else(|| {
            UlogError::bad_format(
                field.to_string(),
                "information keys must use builtin types",
            )
        })?;

        if builtin == BuiltinType::Char && field.array_length.is_some() {
            let len = field.element_count().min(data.len());
            return Ok(UlogValue::String(
                String::from_utf8_lossy(&data[..len]).into_owned(),
            ));
        }

        match field.array_length {
            Some(count) => {
                let mut values = Vec::with_capacity(count);
                for i in 0..count {
                    values.push(read_primitive(builtin, data, i * builtin.size())?);
                }
                Ok(UlogValue::Array(values))
            }
            None => read_primitive(builtin, data, 0),
        }
    }
}

/// Decode one little-endian primitive at `at`.
fn read_primitive(builtin: BuiltinType, data: &[u8], at: usize) -> Result<UlogValue> {
    let width = builtin.size();
    if at + width > data.len() {
        return Err(UlogError::unexpected_eof(
            width,
            data.len().saturating_sub(at),
            at as u64,
        ));
    }
    let bytes = &data[at..at + width];
    let value = match builtin {
        BuiltinType::Bool => UlogValue::Bool(bytes[0] != 0),
        BuiltinType::Int8 => UlogValue::Int8(bytes[0] as i8),
        BuiltinType::UInt8 => UlogValue::UInt8(bytes[0]),
        BuiltinType::Int16 => UlogValue::Int16(i16::from_le_bytes([bytes[0], bytes[1]])),
        BuiltinType::UInt16 => UlogValue::UInt16(u16::from_le_bytes([bytes[0], bytes[1]])),
        BuiltinType::Int32 => {
            UlogValue::Int32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        BuiltinType::UInt32 => {
            UlogValue::UInt32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        BuiltinType::Int64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(bytes);
            UlogValue::Int64(i64::from_le_bytes(b))
        }
        BuiltinType::UInt64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(bytes);
            UlogValue::UInt64(u64::from_le_bytes(b))
        }
        BuiltinType::Float => {
            UlogValue::Float32(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        BuiltinType::Double => {
            let mut b = [0u8; 8];
            b.copy_from_slice(bytes);
            UlogValue::Float64(f64::from_le_bytes(b))
        }
        // A lone char decodes as a one-byte string, consistent with arrays.
        BuiltinType::Char => {
            UlogValue::String(String::from_utf8_lossy(&bytes[..1]).into_owned())
        }
    };
    Ok(value)
}
