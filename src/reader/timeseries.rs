// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Flattened numeric time series for one subscribed stream.
//!
//! Plotting and analysis frontends want columns, not value trees. This
//! module walks every data record of a stream and flattens its numeric
//! fields into aligned `f64` columns: arrays become `name[i]`, nested
//! structs become `name.member`, booleans become 0/1, and strings are
//! dropped. Column sets are identical across rows because decoding is
//! definition-driven.

use std::collections::BTreeMap;

use crate::core::{Result, UlogError, UlogValue};
use crate::io::source::ByteSource;
use crate::reader::messages::{DataSectionMessage, ReadOptions};
use crate::reader::UlogReader;

/// Aligned time-series columns for one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeseries {
    /// Per-record timestamps in microseconds
    pub timestamps: Vec<u64>,
    /// Flattened field name -> one value per record, ordered by name
    pub columns: Vec<(String, Vec<f64>)>,
}

impl Timeseries {
    /// Number of records in the series.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the stream produced no records.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Look up a column by its flattened name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, values)| values.as_slice())
    }
}

impl<S: ByteSource> UlogReader<S> {
    /// Extract the flattened numeric time series of one stream.
    ///
    /// Iterates every `D` record of `msg_id` in time order and flattens the
    /// decoded values into aligned columns. The stream id must be bound by a
    /// subscription.
    pub fn timeseries(&mut self, msg_id: u16) -> Result<Timeseries> {
        if self.message_count().is_none() {
            return Err(UlogError::state("timeseries called before open()"));
        }
        if !self.subscriptions().contains_key(&msg_id) {
            return Err(UlogError::UnknownSubscription { msg_id, offset: 0 });
        }

        let mut timestamps = Vec::new();
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        let iter = self.read_messages(ReadOptions {
            msg_ids: Some(vec![msg_id]),
            include_logs: false,
            ..Default::default()
        })?;
        for message in iter {
            let message = message?;
            let DataSectionMessage::Data {
                timestamp, fields, ..
            } = message
            else {
                continue;
            };
            timestamps.push(timestamp);
            for (name, value) in &fields {
                flatten_value(name, value, &mut columns);
            }
        }

        Ok(Timeseries {
            timestamps,
            columns: columns.into_iter().collect(),
        })
    }
}

/// Append one record's value under its flattened column names.
fn flatten_value(name: &str, value: &UlogValue, columns: &mut BTreeMap<String, Vec<f64>>) {
    match value {
        UlogValue::Bool(v) => push(columns, name, if *v { 1.0 } else { 0.0 }),
        UlogValue::Array(values) => {
            for (i, element) in values.iter().enumerate() {
                flatten_value(&format!("{name}[{i}]"), element, columns);
            }
        }
        UlogValue::Struct(fields) => {
            for (member, nested) in fields {
                flatten_value(&format!("{name}.{member}"), nested, columns);
            }
        }
        UlogValue::String(_) => {}
        numeric => {
            if let Some(v) = numeric.as_f64() {
                push(columns, name, v);
            }
        }
    }
}

fn push(columns: &mut BTreeMap<String, Vec<f64>>, name: &str, value: f64) {
    columns.entry(name.to_string()).or_default().push(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_flatten_scalars_and_arrays() {
        let mut columns = BTreeMap::new();
        flatten_value("counter", &UlogValue::UInt16(7), &mut columns);
        flatten_value(
            "q",
            &UlogValue::Array(vec![UlogValue::Float32(0.5), UlogValue::Float32(-0.5)]),
            &mut columns,
        );
        flatten_value("armed", &UlogValue::Bool(true), &mut columns);
        flatten_value("name", &UlogValue::String("PX4".to_string()), &mut columns);

        assert_eq!(columns["counter"], vec![7.0]);
        assert_eq!(columns["q[0]"], vec![0.5]);
        assert_eq!(columns["q[1]"], vec![-0.5]);
        assert_eq!(columns["armed"], vec![1.0]);
        assert!(!columns.contains_key("name"));
    }

    #[test]
    fn test_flatten_nested_struct() {
        let mut inner = HashMap::new();
        inner.insert("rpm".to_string(), UlogValue::Int32(1200));
        inner.insert("voltage".to_string(), UlogValue::Float32(11.1));
        let mut columns = BTreeMap::new();
        flatten_value("esc", &UlogValue::Struct(inner), &mut columns);

        assert_eq!(columns["esc.rpm"], vec![1200.0]);
        assert_eq!(columns["esc.voltage"], vec![11.1f32 as f64]);
    }

    #[test]
    fn test_column_lookup() {
        let series = Timeseries {
            timestamps: vec![1, 2],
            columns: vec![("x".to_string(), vec![0.0, 1.0])],
        };
        assert_eq!(series.len(), 2);
        assert!(!series.is_empty());
        assert_eq!(series.column("x"), Some(&[0.0, 1.0][..]));
        assert_eq!(series.column("y"), None);
    }
}
