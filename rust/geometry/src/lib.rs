// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityDB-Lite Geometry Reconstruction
//!
//! Rebuilds typed B-rep geometry from the flat parent-pointer rows a 3D
//! city database stores, one row per tree node.
//!
//! The engine consumes an unordered row stream per root id, assembles a
//! parent-indexed tree, classifies every node from its stored flags and
//! child shape, and produces a nested [`SurfaceGeometry`] value. Geometry
//! shared across owning features is arbitrated through a session-wide
//! [`XrefCache`]: the first claimant materializes it, later claimants get
//! an href reference or a duplicated copy under a fresh gml id.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use citydb_lite_geometry::{MemoryRowSource, SurfaceGeometryExporter};
//!
//! let mut exporter = SurfaceGeometryExporter::new(source);
//! if let Some(geometry) = exporter.resolve(building_lod2_root)? {
//!     // hand the typed tree to the document writer
//! }
//! exporter.shutdown()?;
//! ```
//!
//! Feature exporters that resolve many roots should prefer the batched
//! form: [`SurfaceGeometryExporter::enqueue`] followed by a single
//! [`SurfaceGeometryExporter::flush`], which fetches all pending trees in
//! one round trip.

pub mod appearance;
mod builder;
pub mod error;
pub mod exporter;
pub mod model;
pub mod source;
pub mod tree;
pub mod xref;

// Re-export nalgebra and core types for convenience
pub use citydb_lite_core::GeometryRow;
pub use nalgebra::Point3;

pub use appearance::{AppearanceSink, AppearanceTracker, MemorySink};
pub use error::{Error, FailurePolicy, Result};
pub use exporter::{ExporterConfig, SurfaceGeometryExporter, XlinkMode};
pub use model::{
    Aggregate, GeometryKind, GeometryRef, LinearRing, OrientableSurface, Polygon, Solid,
    SurfaceGeometry,
};
pub use source::{GeometryRowSource, MemoryRowSource, PayloadDecoder, WkbDecoder};
pub use tree::{assemble, GeometryNode, GeometryTree};
pub use xref::XrefCache;
