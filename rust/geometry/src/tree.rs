// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parent-indexed tree assembly.
//!
//! Rows of one tree arrive in arbitrary order: a child may be processed
//! before its parent. The assembler keeps an arena of nodes keyed by row
//! id and creates placeholder entries for parents that have not arrived
//! yet; when the parent's own row is processed the placeholder is filled
//! in place, preserving already-attached children.

use citydb_lite_core::GeometryRow;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// One node of a geometry tree.
///
/// Exists either filled (its row has been processed) or as a placeholder
/// created by an earlier-arriving child.
#[derive(Debug, Clone)]
pub struct GeometryNode {
    pub row: GeometryRow,
    /// Child ids in row arrival order.
    pub children: SmallVec<[i64; 4]>,
    filled: bool,
}

impl GeometryNode {
    fn placeholder(id: i64) -> Self {
        Self {
            row: GeometryRow {
                id,
                ..GeometryRow::default()
            },
            children: SmallVec::new(),
            filled: false,
        }
    }

    /// Whether this node's own row has been processed.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.filled
    }
}

/// Arena of nodes for a single root, valid for one resolution pass.
#[derive(Debug, Default)]
pub struct GeometryTree {
    root_id: Option<i64>,
    nodes: FxHashMap<i64, GeometryNode>,
}

impl GeometryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one row, creating or filling its node and linking it to its
    /// parent. Correctness does not depend on arrival order.
    pub fn insert(&mut self, row: GeometryRow) {
        let id = row.id;
        let parent_id = row.parent_id;

        let node = self
            .nodes
            .entry(id)
            .or_insert_with(|| GeometryNode::placeholder(id));
        node.row = row;
        node.filled = true;

        if parent_id == GeometryRow::NO_PARENT {
            self.root_id = Some(id);
        } else {
            self.nodes
                .entry(parent_id)
                .or_insert_with(|| GeometryNode::placeholder(parent_id))
                .children
                .push(id);
        }
    }

    /// Id of the root row, once it has arrived.
    pub fn root_id(&self) -> Option<i64> {
        self.root_id
    }

    pub fn node(&self, id: i64) -> Option<&GeometryNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Placeholders whose own row never arrived. They are unreachable from
    /// the root (no row ever named them as a child target's parent edge
    /// source) and are silently dropped with the tree.
    pub fn orphan_count(&self) -> usize {
        self.nodes.values().filter(|n| !n.filled).count()
    }
}

/// Demultiplex a bulk fetch into one tree per root id.
pub fn assemble(rows: Vec<GeometryRow>) -> FxHashMap<i64, GeometryTree> {
    let mut trees: FxHashMap<i64, GeometryTree> = FxHashMap::default();
    for row in rows {
        trees
            .entry(row.root_id)
            .or_insert_with(GeometryTree::new)
            .insert(row);
    }
    trees
}
