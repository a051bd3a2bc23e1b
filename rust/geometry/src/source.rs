// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Row source and payload decoder seams.
//!
//! The backing store sits behind [`GeometryRowSource`]; the engine never
//! builds SQL itself. Real sources run a `root_id = ?` prepared statement
//! for single fetches and a `root_id IN (...)` variant for bulk fetches,
//! with the dialect handled by the embedding application's query layer.

use crate::error::Result;
use citydb_lite_core::wkb::{decode_polygon, Ring};
use citydb_lite_core::GeometryRow;
use rustc_hash::FxHashMap;

/// Source of geometry rows for one or more roots.
///
/// A missing root is not an error at this layer: sources return the rows
/// that exist, and the engine reports roots that yielded none.
pub trait GeometryRowSource {
    /// Fetch all rows of one tree.
    fn fetch_root(&mut self, root_id: i64) -> Result<Vec<GeometryRow>>;

    /// Fetch the rows of many trees in one round trip.
    ///
    /// The default loops over single fetches; sources backed by a real
    /// store should override this with a bulk query.
    fn fetch_roots(&mut self, root_ids: &[i64]) -> Result<Vec<GeometryRow>> {
        let mut rows = Vec::new();
        for &root_id in root_ids {
            rows.extend(self.fetch_root(root_id)?);
        }
        Ok(rows)
    }
}

/// Decodes a raw polygon payload column into rings, exterior first.
pub trait PayloadDecoder {
    fn decode_rings(&self, payload: &[u8]) -> citydb_lite_core::Result<Vec<Ring>>;
}

/// Default decoder for stores that deliver extended WKB payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct WkbDecoder;

impl PayloadDecoder for WkbDecoder {
    fn decode_rings(&self, payload: &[u8]) -> citydb_lite_core::Result<Vec<Ring>> {
        decode_polygon(payload)
    }
}

/// Row source over an in-memory table, for tests and pre-fetched exports.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    rows: FxHashMap<i64, Vec<GeometryRow>>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one row under its root id.
    pub fn push(&mut self, row: GeometryRow) {
        self.rows.entry(row.root_id).or_default().push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = GeometryRow>) {
        for row in rows {
            self.push(row);
        }
    }
}

impl GeometryRowSource for MemoryRowSource {
    fn fetch_root(&mut self, root_id: i64) -> Result<Vec<GeometryRow>> {
        Ok(self.rows.get(&root_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_fetches_by_root() {
        let mut source = MemoryRowSource::new();
        source.push(GeometryRow::new(1, 1, 0));
        source.push(GeometryRow::new(2, 1, 1));
        source.push(GeometryRow::new(5, 5, 0));

        assert_eq!(source.fetch_root(1).unwrap().len(), 2);
        assert_eq!(source.fetch_root(5).unwrap().len(), 1);
        assert!(source.fetch_root(9).unwrap().is_empty());

        // Default bulk fetch concatenates per-root results
        let rows = source.fetch_roots(&[1, 5, 9]).unwrap();
        assert_eq!(rows.len(), 3);
    }
}
