// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Parser for ULog message-format strings.
//!
//! The format is a single line of the shape:
//!
//! ```text
//! name:type1 field1;type2[N] field2;…
//! ```
//!
//! A trailing `;` is tolerated, and empty fields between `;` separators are
//! skipped. Whitespace around each field is trimmed. Any type spelling that
//! is not one of the twelve builtins references another message definition.

use crate::core::{Result, UlogError};
use crate::schema::ast::{BuiltinType, Field, MessageDefinition};

/// Parse a full message definition string.
pub fn parse_message_definition(input: &str) -> Result<MessageDefinition> {
    let (name, body) = input
        .split_once(':')
        .ok_or_else(|| UlogError::bad_format(input, "missing ':' after message name"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(UlogError::bad_format(input, "empty message name"));
    }

    let mut fields = Vec::new();
    for part in body.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        fields.push(parse_field_definition(part)?);
    }

    Ok(MessageDefinition {
        name: name.to_string(),
        fields,
    })
}

/// Parse a single field definition of the shape `type[len]? name`.
pub fn parse_field_definition(input: &str) -> Result<Field> {
    let input = input.trim();
    let mut tokens = input.split_whitespace();
    let type_part = tokens
        .next()
        .ok_or_else(|| UlogError::bad_format(input, "empty field definition"))?;
    let name = tokens
        .next()
        .ok_or_else(|| UlogError::bad_format(input, "missing field name"))?;
    if tokens.next().is_some() {
        return Err(UlogError::bad_format(input, "trailing tokens after field name"));
    }

    let (type_name, array_length) = match type_part.split_once('[') {
        Some((base, rest)) => {
            let digits = rest
                .strip_suffix(']')
                .ok_or_else(|| UlogError::bad_format(input, "unterminated array bracket"))?;
            let len: usize = digits
                .parse()
                .map_err(|_| UlogError::bad_format(input, "invalid array length"))?;
            if len == 0 {
                return Err(UlogError::bad_format(input, "array length must be positive"));
            }
            (base, Some(len))
        }
        None => (type_part, None),
    };

    if type_name.is_empty() {
        return Err(UlogError::bad_format(input, "empty field type"));
    }

    Ok(Field {
        type_name: type_name.to_string(),
        builtin: BuiltinType::try_from_str(type_name),
        name: name.to_string(),
        array_length,
    })
}
