// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type classification and tree rebuilding.
//!
//! Walks one assembled [`GeometryTree`] depth-first and rebuilds the nested
//! typed geometry. Classification per node, in order:
//!
//! 1. payload present -> Polygon
//! 2. no children -> absent
//! 3. not triangulated: CompositeSurface / Solid / CompositeSolid from the
//!    solid+composite flags; otherwise MultiSolid when every child row is
//!    solid-flagged, else MultiSurface
//! 4. triangulated -> TriangulatedSurface
//!
//! Containers keep only members whose resolved kind is legal for them;
//! illegal members are dropped, not errors. Sub-tree failures degrade to
//! absent so siblings and the rest of the batch continue.

use crate::appearance::AppearanceTracker;
use crate::error::{Error, FailurePolicy, Result};
use crate::exporter::XlinkMode;
use crate::model::{
    Aggregate, GeometryRef, LinearRing, OrientableSurface, Polygon, Solid, SurfaceGeometry,
};
use crate::source::PayloadDecoder;
use crate::tree::{GeometryNode, GeometryTree};
use crate::xref::XrefCache;
use citydb_lite_core::wkb::Ring;
use citydb_lite_core::IdGenerator;
use nalgebra::Point3;
use tracing::{debug, warn};

/// Which resolved kinds a container admits as members.
#[derive(Clone, Copy)]
enum MemberRule {
    /// Single surfaces: polygon, orientable, composite surface,
    /// triangulated surface, reference.
    Surface,
    /// Single solids: solid, composite solid.
    Solid,
    /// Triangle patches of a triangulated surface.
    Patch,
}

impl MemberRule {
    fn admits(self, geometry: &SurfaceGeometry) -> bool {
        match self {
            MemberRule::Surface => geometry.is_surface(),
            MemberRule::Solid => geometry.is_solid(),
            MemberRule::Patch => matches!(geometry, SurfaceGeometry::Polygon(_)),
        }
    }
}

/// One rebuild pass over a single tree.
///
/// Thread-confined; only the xref cache behind it is shared.
pub(crate) struct Rebuilder<'a> {
    tree: &'a GeometryTree,
    decoder: &'a dyn PayloadDecoder,
    ids: &'a dyn IdGenerator,
    xrefs: &'a XrefCache,
    appearance: &'a mut AppearanceTracker,
    xlink_mode: XlinkMode,
    policy: FailurePolicy,
    /// Read the implicit (local-origin) payload column instead of the
    /// world-space one.
    implicit: bool,
    /// An ancestor already opened an orientable-surface context, so
    /// reversed descendants only reverse their rings and never wrap again.
    orientable: bool,
}

impl<'a> Rebuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tree: &'a GeometryTree,
        decoder: &'a dyn PayloadDecoder,
        ids: &'a dyn IdGenerator,
        xrefs: &'a XrefCache,
        appearance: &'a mut AppearanceTracker,
        xlink_mode: XlinkMode,
        policy: FailurePolicy,
        implicit: bool,
    ) -> Self {
        Self {
            tree,
            decoder,
            ids,
            xrefs,
            appearance,
            xlink_mode,
            policy,
            implicit,
            orientable: false,
        }
    }

    /// Rebuild the whole tree from its root.
    pub(crate) fn rebuild(&mut self) -> Result<Option<SurfaceGeometry>> {
        let tree = self.tree;
        let Some(root_id) = tree.root_id() else {
            debug!("tree has no root row, resolving to absent");
            return Ok(None);
        };
        let orphans = tree.orphan_count();
        if orphans > 0 {
            debug!(orphans, "dropping unreachable placeholder nodes");
        }
        self.orientable = false;
        self.rebuild_node(root_id, false)
    }

    /// Rebuild one node. `duplicating` marks the re-run that copies an
    /// already-claimed shared sub-tree under fresh gml ids.
    fn rebuild_node(&mut self, id: i64, duplicating: bool) -> Result<Option<SurfaceGeometry>> {
        let tree = self.tree;
        let Some(node) = tree.node(id) else {
            return Ok(None);
        };
        if !node.is_filled() {
            return Ok(None);
        }

        // A reversal opens the orientable context unless an ancestor
        // already did; the opener wraps its own result exactly once
        let opened_here = node.row.is_reversed && !self.orientable;
        if opened_here {
            self.orientable = true;
        }

        let built = self.dispatch(node, duplicating)?;

        let result = if opened_here {
            self.orientable = false;
            match built {
                Some(geometry) if geometry.is_surface() => {
                    Some(SurfaceGeometry::OrientableSurface(OrientableSurface {
                        id: None,
                        base: Box::new(geometry),
                    }))
                }
                other => other,
            }
        } else {
            built
        };
        Ok(result)
    }

    /// Cross-reference arbitration, then materialization.
    fn dispatch(
        &mut self,
        node: &'a GeometryNode,
        duplicating: bool,
    ) -> Result<Option<SurfaceGeometry>> {
        let row = &node.row;

        if let Some(gml_id) = row.gml_id.as_deref() {
            let already_claimed = self.xrefs.try_claim(gml_id, row.id);
            if already_claimed && row.is_xlink {
                return match self.xlink_mode {
                    XlinkMode::ByReference => {
                        debug!(row = row.id, gml_id, "writing shared geometry by reference");
                        Ok(Some(SurfaceGeometry::Ref(GeometryRef {
                            href: format!("#{gml_id}"),
                        })))
                    }
                    XlinkMode::Duplicate => {
                        let replacement = self.ids.replacement_id(gml_id);
                        debug!(
                            row = row.id,
                            gml_id,
                            replacement = %replacement,
                            "duplicating shared geometry under new identity"
                        );
                        self.materialize(node, Some(replacement), true)
                    }
                };
            }
        }

        self.materialize(node, None, duplicating)
    }

    /// The classification matrix of the module docs.
    fn materialize(
        &mut self,
        node: &'a GeometryNode,
        id_override: Option<String>,
        duplicating: bool,
    ) -> Result<Option<SurfaceGeometry>> {
        let row = &node.row;

        // A duplication pass re-ids every node it copies so the output
        // document never carries the same gml id twice
        let gml_id = id_override.or_else(|| {
            let stored = row.gml_id.as_deref()?;
            if duplicating {
                Some(self.ids.replacement_id(stored))
            } else {
                Some(stored.to_owned())
            }
        });

        let payload = if self.implicit {
            row.implicit_geometry.as_deref()
        } else {
            row.geometry.as_deref()
        };

        let result = if let Some(payload) = payload {
            if row.is_solid || row.is_triangulated {
                warn!(row = row.id, "aggregate-flagged row carries a polygon payload");
            }
            self.build_polygon(row.id, gml_id, payload, row.is_reversed)?
        } else if node.children.is_empty() {
            None
        } else if row.is_triangulated {
            self.build_aggregate(node, gml_id, duplicating, MemberRule::Patch)?
                .map(SurfaceGeometry::TriangulatedSurface)
        } else if row.is_solid && row.is_composite {
            self.build_aggregate(node, gml_id, duplicating, MemberRule::Solid)?
                .map(SurfaceGeometry::CompositeSolid)
        } else if row.is_solid {
            self.build_solid(node, gml_id, duplicating)?
        } else if row.is_composite {
            self.build_aggregate(node, gml_id, duplicating, MemberRule::Surface)?
                .map(SurfaceGeometry::CompositeSurface)
        } else {
            let tree = self.tree;
            let all_solid = node
                .children
                .iter()
                .all(|&child| tree.node(child).is_some_and(|c| c.row.is_solid));
            if all_solid {
                self.build_aggregate(node, gml_id, duplicating, MemberRule::Solid)?
                    .map(SurfaceGeometry::MultiSolid)
            } else {
                self.build_aggregate(node, gml_id, duplicating, MemberRule::Surface)?
                    .map(SurfaceGeometry::MultiSurface)
            }
        };

        if result.is_some() && !duplicating && node.row.gml_id.is_some() {
            self.appearance.record(node.row.id)?;
        }
        Ok(result)
    }

    fn build_polygon(
        &mut self,
        row_id: i64,
        gml_id: Option<String>,
        payload: &[u8],
        reversed: bool,
    ) -> Result<Option<SurfaceGeometry>> {
        let rings = match self.decoder.decode_rings(payload) {
            Ok(rings) => rings,
            Err(source) => {
                self.policy
                    .absorb(Error::MalformedPayload { id: row_id, source })?;
                return Ok(None);
            }
        };

        let mut rings = rings.into_iter();
        let Some(shell) = rings.next() else {
            debug!(row = row_id, "polygon payload decoded to zero rings");
            return Ok(None);
        };

        let exterior = Self::build_ring(shell, gml_id.as_deref(), 0, reversed);
        let interior = rings
            .enumerate()
            .map(|(i, ring)| Self::build_ring(ring, gml_id.as_deref(), i + 1, reversed))
            .collect();

        Ok(Some(SurfaceGeometry::Polygon(Polygon {
            id: gml_id,
            exterior,
            interior,
        })))
    }

    fn build_ring(
        coords: Ring,
        polygon_id: Option<&str>,
        index: usize,
        reversed: bool,
    ) -> LinearRing {
        let mut points: Vec<Point3<f64>> = coords
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect();
        if reversed {
            points.reverse();
        }
        LinearRing {
            id: polygon_id.map(|id| format!("{id}_{index}")),
            points,
        }
    }

    fn build_aggregate(
        &mut self,
        node: &'a GeometryNode,
        gml_id: Option<String>,
        duplicating: bool,
        rule: MemberRule,
    ) -> Result<Option<Aggregate>> {
        let mut members = Vec::with_capacity(node.children.len());
        for &child in &node.children {
            let Some(geometry) = self.rebuild_node(child, duplicating)? else {
                continue;
            };
            if rule.admits(&geometry) {
                members.push(geometry);
            } else {
                debug!(
                    parent = node.row.id,
                    child,
                    kind = ?geometry.kind(),
                    "dropping container member of incompatible kind"
                );
            }
        }

        if members.is_empty() {
            debug!(row = node.row.id, "container empty after member filtering");
            return Ok(None);
        }
        Ok(Some(Aggregate {
            id: gml_id,
            members,
        }))
    }

    fn build_solid(
        &mut self,
        node: &'a GeometryNode,
        gml_id: Option<String>,
        duplicating: bool,
    ) -> Result<Option<SurfaceGeometry>> {
        // Compatibility: only the first child becomes the exterior shell.
        // Extra shells have been observed in legacy data and are dropped.
        let Some(&first) = node.children.first() else {
            return Ok(None);
        };
        if node.children.len() > 1 {
            warn!(
                row = node.row.id,
                ignored = node.children.len() - 1,
                "solid with more than one shell, ignoring extras"
            );
        }

        match self.rebuild_node(first, duplicating)? {
            Some(shell) if shell.is_surface() => Ok(Some(SurfaceGeometry::Solid(Solid {
                id: gml_id,
                exterior: Box::new(shell),
            }))),
            Some(other) => {
                debug!(
                    row = node.row.id,
                    kind = ?other.kind(),
                    "solid shell did not resolve to a surface"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
