// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed B-rep geometry model.
//!
//! The closed [`SurfaceGeometry`] enum is the reconstruction result handed
//! to feature exporters. Keeping the kinds in one enum (instead of open
//! trait objects) makes every classification site exhaustive: adding a
//! B-rep kind flags all unmatched code at compile time.

use nalgebra::Point3;

/// One ring of a polygon as a closed coordinate sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRing {
    /// Derived from the owning polygon's gml id plus the ring index;
    /// absent when the polygon is anonymous.
    pub id: Option<String>,
    pub points: Vec<Point3<f64>>,
}

/// A planar patch with one exterior ring and zero or more interior rings.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub id: Option<String>,
    pub exterior: LinearRing,
    pub interior: Vec<LinearRing>,
}

/// A surface whose stored orientation is reversed relative to its use.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientableSurface {
    pub id: Option<String>,
    pub base: Box<SurfaceGeometry>,
}

/// A volume bounded by exactly one exterior shell.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    pub id: Option<String>,
    pub exterior: Box<SurfaceGeometry>,
}

/// Member list shared by the aggregate kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub id: Option<String>,
    pub members: Vec<SurfaceGeometry>,
}

/// Reference to a geometry materialized earlier in the session.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRef {
    /// Fragment reference to the target's gml id, e.g. `#G1`.
    pub href: String,
}

/// A reconstructed B-rep geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceGeometry {
    Polygon(Polygon),
    OrientableSurface(OrientableSurface),
    CompositeSurface(Aggregate),
    MultiSurface(Aggregate),
    TriangulatedSurface(Aggregate),
    Solid(Solid),
    CompositeSolid(Aggregate),
    MultiSolid(Aggregate),
    Ref(GeometryRef),
}

/// Discriminant of [`SurfaceGeometry`], used for diagnostics and member
/// eligibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Polygon,
    OrientableSurface,
    CompositeSurface,
    MultiSurface,
    TriangulatedSurface,
    Solid,
    CompositeSolid,
    MultiSolid,
    Reference,
}

impl SurfaceGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            SurfaceGeometry::Polygon(_) => GeometryKind::Polygon,
            SurfaceGeometry::OrientableSurface(_) => GeometryKind::OrientableSurface,
            SurfaceGeometry::CompositeSurface(_) => GeometryKind::CompositeSurface,
            SurfaceGeometry::MultiSurface(_) => GeometryKind::MultiSurface,
            SurfaceGeometry::TriangulatedSurface(_) => GeometryKind::TriangulatedSurface,
            SurfaceGeometry::Solid(_) => GeometryKind::Solid,
            SurfaceGeometry::CompositeSolid(_) => GeometryKind::CompositeSolid,
            SurfaceGeometry::MultiSolid(_) => GeometryKind::MultiSolid,
            SurfaceGeometry::Ref(_) => GeometryKind::Reference,
        }
    }

    /// Whether this value can stand where a single surface is required
    /// (container member of a surface aggregate, exterior shell of a solid).
    ///
    /// References count as surfaces: shared geometry is surface-shaped in
    /// this engine. Multi aggregates do not; they are collections, not
    /// surfaces.
    pub fn is_surface(&self) -> bool {
        matches!(
            self,
            SurfaceGeometry::Polygon(_)
                | SurfaceGeometry::OrientableSurface(_)
                | SurfaceGeometry::CompositeSurface(_)
                | SurfaceGeometry::TriangulatedSurface(_)
                | SurfaceGeometry::Ref(_)
        )
    }

    /// Whether this value can stand where a single solid is required.
    pub fn is_solid(&self) -> bool {
        matches!(
            self,
            SurfaceGeometry::Solid(_) | SurfaceGeometry::CompositeSolid(_)
        )
    }

    /// The gml id carried by this geometry, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            SurfaceGeometry::Polygon(p) => p.id.as_deref(),
            SurfaceGeometry::OrientableSurface(o) => o.id.as_deref(),
            SurfaceGeometry::Solid(s) => s.id.as_deref(),
            SurfaceGeometry::CompositeSurface(a)
            | SurfaceGeometry::MultiSurface(a)
            | SurfaceGeometry::TriangulatedSurface(a)
            | SurfaceGeometry::CompositeSolid(a)
            | SurfaceGeometry::MultiSolid(a) => a.id.as_deref(),
            SurfaceGeometry::Ref(_) => None,
        }
    }
}
