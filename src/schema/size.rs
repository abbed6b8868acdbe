// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte-size resolution for message definitions.
//!
//! ULog layouts are packed: a message's wire size is the sum of its fields'
//! sizes, padding fields included, with no implicit alignment. Complex
//! fields resolve recursively through the definitions table.
//!
//! Convention: [`SizeResolver::field_size`] returns the *per-element* size.
//! Walkers multiply by `Field::element_count()` themselves when advancing
//! offsets.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::{Result, UlogError};
use crate::schema::ast::{Field, MessageDefinition};

/// Maximum nesting depth for recursive definitions, guarding against
/// self-referential format strings.
const MAX_NESTING_DEPTH: usize = 64;

/// Resolves and memoizes message byte sizes over a definitions table.
///
/// Resolved sizes are cached per definition name behind a lock, so a shared
/// resolver stays cheap across millions of records.
#[derive(Debug, Default)]
pub struct SizeResolver {
    cache: Mutex<HashMap<String, usize>>,
}

impl SizeResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-element size of a field in bytes. For array fields this is the
    /// stride, not the total contribution.
    pub fn field_size(
        &self,
        field: &Field,
        definitions: &HashMap<String, MessageDefinition>,
    ) -> Result<usize> {
        self.field_size_at_depth(field, definitions, 0)
    }

    /// Total wire size of a message definition in bytes.
    pub fn message_size(
        &self,
        definition: &MessageDefinition,
        definitions: &HashMap<String, MessageDefinition>,
    ) -> Result<usize> {
        self.message_size_at_depth(definition, definitions, 0)
    }

    fn field_size_at_depth(
        &self,
        field: &Field,
        definitions: &HashMap<String, MessageDefinition>,
        depth: usize,
    ) -> Result<usize> {
        if let Some(builtin) = field.builtin {
            return Ok(builtin.size());
        }
        let nested = definitions
            .get(&field.type_name)
            .ok_or_else(|| UlogError::unknown_type(&field.type_name))?;
        self.message_size_at_depth(nested, definitions, depth + 1)
    }

    fn message_size_at_depth(
        &self,
        definition: &MessageDefinition,
        definitions: &HashMap<String, MessageDefinition>,
        depth: usize,
    ) -> Result<usize> {
        if depth > MAX_NESTING_DEPTH {
            return Err(UlogError::bad_format(
                &definition.name,
                format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
            ));
        }

        {
            let cache = self.lock_cache();
            if let Some(&size) = cache.get(&definition.name) {
                return Ok(size);
            }
        }

        let mut size = 0usize;
        for field in &definition.fields {
            size += self.field_size_at_depth(field, definitions, depth)? * field.element_count();
        }

        self.lock_cache().insert(definition.name.clone(), size);
        Ok(size)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        // A poisoned lock only means another thread panicked mid-insert; the
        // cache itself is still a valid map.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::parse_message_definition;

    fn table(formats: &[&str]) -> HashMap<String, MessageDefinition> {
        formats
            .iter()
            .map(|f| {
                let def = parse_message_definition(f).unwrap();
                (def.name.clone(), def)
            })
            .collect()
    }

    #[test]
    fn field_size_is_per_element() {
        // Pins the memo convention: per-element, never multiplied by the
        // array length.
        let defs = table(&["m:uint16_t[4] a;"]);
        let resolver = SizeResolver::new();
        let field = &defs["m"].fields[0];
        assert_eq!(resolver.field_size(field, &defs).unwrap(), 2);
        assert_eq!(resolver.message_size(&defs["m"], &defs).unwrap(), 8);
    }

    #[test]
    fn test_primitive_message_size() {
        let defs = table(&["att:uint64_t timestamp;float rollspeed;float pitchspeed;float yawspeed;float[4] q;"]);
        let resolver = SizeResolver::new();
        // 8 + 4 + 4 + 4 + 16
        assert_eq!(resolver.message_size(&defs["att"], &defs).unwrap(), 36);
    }

    #[test]
    fn test_padding_counts_toward_size() {
        let defs = table(&["m:uint64_t timestamp;uint8_t[7] _padding0;"]);
        let resolver = SizeResolver::new();
        assert_eq!(resolver.message_size(&defs["m"], &defs).unwrap(), 15);
    }

    #[test]
    fn test_nested_message_size() {
        let defs = table(&[
            "esc_report:uint64_t timestamp;int32_t esc_rpm;float esc_voltage;",
            "esc_status:uint64_t timestamp;uint8_t esc_count;esc_report[8] esc;",
        ]);
        let resolver = SizeResolver::new();
        assert_eq!(resolver.message_size(&defs["esc_report"], &defs).unwrap(), 16);
        assert_eq!(
            resolver.message_size(&defs["esc_status"], &defs).unwrap(),
            8 + 1 + 8 * 16
        );
        // Complex field size is the per-element nested size.
        let esc_field = &defs["esc_status"].fields[2];
        assert_eq!(resolver.field_size(esc_field, &defs).unwrap(), 16);
    }

    #[test]
    fn test_memoized_lookup_is_stable() {
        let defs = table(&["m:uint32_t a;uint32_t b;"]);
        let resolver = SizeResolver::new();
        assert_eq!(resolver.message_size(&defs["m"], &defs).unwrap(), 8);
        assert_eq!(resolver.message_size(&defs["m"], &defs).unwrap(), 8);
    }

    #[test]
    fn test_missing_reference_is_fatal() {
        let defs = table(&["m:wind_estimate w;"]);
        let resolver = SizeResolver::new();
        let err = resolver.message_size(&defs["m"], &defs).unwrap_err();
        assert!(matches!(err, UlogError::UnknownType { .. }));
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let defs = table(&["m:m inner;"]);
        let resolver = SizeResolver::new();
        assert!(resolver.message_size(&defs["m"], &defs).is_err());
    }
}
