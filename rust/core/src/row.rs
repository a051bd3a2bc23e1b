// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface geometry table rows.
//!
//! One row per B-rep tree node. Nesting is expressed through `parent_id`
//! alone; a bulk fetch returns the rows of a tree in arbitrary order.

/// A single row of the surface geometry table.
///
/// Leaf rows carry a polygon payload (EWKB); interior rows carry only the
/// attribute flags that classify the aggregate they stand for. Rows of
/// geometry stored relative to a local origin carry the payload in
/// `implicit_geometry` instead.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryRow {
    /// Primary key.
    pub id: i64,
    /// Optional gml id exposed in exported documents. Shared geometry is
    /// correlated across features through this identifier.
    pub gml_id: Option<String>,
    /// Id of the tree's root row; the column bulk queries filter on.
    pub root_id: i64,
    /// Id of the parent row, or [`GeometryRow::NO_PARENT`] for the root.
    pub parent_id: i64,
    /// Node bounds a volume.
    pub is_solid: bool,
    /// Node is a composite aggregate (adjacent members).
    pub is_composite: bool,
    /// Node is a triangulated surface.
    pub is_triangulated: bool,
    /// Node is shared across owning features (xlink candidate).
    pub is_xlink: bool,
    /// Ring coordinates are stored in reversed orientation.
    pub is_reversed: bool,
    /// EWKB polygon payload (leaf rows only).
    pub geometry: Option<Vec<u8>>,
    /// EWKB polygon payload relative to a local origin (template geometry).
    pub implicit_geometry: Option<Vec<u8>>,
}

impl GeometryRow {
    /// `parent_id` value marking a tree root.
    pub const NO_PARENT: i64 = 0;

    /// Create a row with all flags cleared and no payload.
    pub fn new(id: i64, root_id: i64, parent_id: i64) -> Self {
        Self {
            id,
            root_id,
            parent_id,
            ..Self::default()
        }
    }

    /// Whether this row is the root of its tree.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id == Self::NO_PARENT
    }

    /// Whether this row carries any polygon payload.
    #[inline]
    pub fn has_payload(&self) -> bool {
        self.geometry.is_some() || self.implicit_geometry.is_some()
    }
}
