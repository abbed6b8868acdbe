// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-file time index.
//!
//! The indexer appends one entry per record of the data section; after the
//! pass the index is sorted by `(timestamp, offset)`. The offset tiebreak
//! keeps file order stable across records sharing a timestamp, which bursty
//! logs produce constantly. Range lookups are two binary searches.

/// What kind of record an index entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTag {
    /// A `D` record for the given stream id
    Data(u16),
    /// An `L` or `C` record
    Log,
    /// Any other record; its entry carries the running maximum timestamp
    Other,
}

/// One `(timestamp, file offset, kind)` index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Timestamp in microseconds (running maximum for non-time-bearing
    /// records)
    pub timestamp: u64,
    /// File offset of the record's size field
    pub offset: u64,
    /// Record kind
    pub tag: IndexTag,
}

/// Sorted array of index entries with binary-search range lookup.
#[derive(Debug, Default)]
pub struct TimeIndex {
    entries: Vec<IndexEntry>,
}

impl TimeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry (unsorted until [`TimeIndex::sort`]).
    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// Sort by `(timestamp, offset)` ascending.
    pub fn sort(&mut self) {
        self.entries
            .sort_unstable_by_key(|e| (e.timestamp, e.offset));
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sorted entries.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Entry at `i`, if in bounds.
    pub fn get(&self, i: usize) -> Option<IndexEntry> {
        self.entries.get(i).copied()
    }

    /// Find the contiguous range of entries with timestamps in
    /// `[start, end]`, inclusive on both sides.
    ///
    /// Returns the smallest `i` with `ts[i] >= start` and the largest `j`
    /// with `ts[j] <= end`, iff both exist and `i <= j`.
    pub fn find_range(&self, start: u64, end: u64) -> Option<(usize, usize)> {
        let lower = self.entries.partition_point(|e| e.timestamp < start);
        let upper = self.entries.partition_point(|e| e.timestamp <= end);
        if lower < upper {
            Some((lower, upper - 1))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(timestamps: &[u64]) -> TimeIndex {
        let mut index = TimeIndex::new();
        for (i, &ts) in timestamps.iter().enumerate() {
            index.push(IndexEntry {
                timestamp: ts,
                offset: i as u64,
                tag: IndexTag::Other,
            });
        }
        index.sort();
        index
    }

    #[test]
    fn test_find_range_distinct_timestamps() {
        let index = index_of(&[1, 2, 3, 4, 5]);
        assert_eq!(index.find_range(2, 4), Some((1, 3)));
        assert_eq!(index.find_range(5, 6), Some((4, 4)));
        assert_eq!(index.find_range(6, 7), None);
    }

    #[test]
    fn test_find_range_duplicate_timestamps() {
        let index = index_of(&[0, 0, 3, 4, 4, 5]);
        assert_eq!(index.find_range(0, 0), Some((0, 1)));
        assert_eq!(index.find_range(3, 3), Some((2, 2)));
        assert_eq!(index.find_range(3, 50), Some((2, 5)));
    }

    #[test]
    fn test_find_range_empty_index() {
        let index = TimeIndex::new();
        assert_eq!(index.find_range(0, u64::MAX), None);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_find_range_below_and_above() {
        let index = index_of(&[10, 20, 30]);
        assert_eq!(index.find_range(0, 5), None);
        assert_eq!(index.find_range(31, 100), None);
        assert_eq!(index.find_range(0, 100), Some((0, 2)));
    }

    #[test]
    fn test_sort_breaks_ties_by_offset() {
        let mut index = TimeIndex::new();
        for offset in [30u64, 10, 20] {
            index.push(IndexEntry {
                timestamp: 100,
                offset,
                tag: IndexTag::Log,
            });
        }
        index.sort();
        let offsets: Vec<u64> = index.entries().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![10, 20, 30]);
    }

    #[test]
    fn test_range_boundaries_are_inclusive() {
        let index = index_of(&[5, 10, 15]);
        assert_eq!(index.find_range(5, 15), Some((0, 2)));
        assert_eq!(index.find_range(5, 5), Some((0, 0)));
        assert_eq!(index.find_range(15, 15), Some((2, 2)));
        assert_eq!(index.find_range(6, 14), Some((1, 1)));
    }

    #[test]
    fn test_get() {
        let index = index_of(&[7]);
        assert_eq!(index.get(0).unwrap().timestamp, 7);
        assert!(index.get(1).is_none());
    }
}
