// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityDB-Lite Core
//!
//! Flat relational geometry model for 3D city databases.
//!
//! A city database stores boundary-representation geometry as one row per
//! tree node in a single table, linked by parent pointers. This crate
//! provides:
//!
//! - **Geometry rows**: the raw record shape ([`GeometryRow`]) handed to the
//!   reconstruction engine in `citydb-lite-geometry`
//! - **Payload decoding**: extended WKB polygon payloads decoded into ring
//!   coordinate arrays ([`wkb`])
//! - **Identifier synthesis**: globally-unique gml ids for duplicated shared
//!   geometry ([`id`])
//!
//! ## Quick Start
//!
//! ```rust
//! use citydb_lite_core::GeometryRow;
//!
//! // A root row for a solid, as fetched from the surface geometry table
//! let mut row = GeometryRow::new(1, 1, GeometryRow::NO_PARENT);
//! row.is_solid = true;
//! assert!(row.is_root());
//! ```

pub mod error;
pub mod id;
pub mod row;
pub mod wkb;

pub use error::{Error, Result};
pub use id::{DefaultIdGenerator, IdGenerator};
pub use row::GeometryRow;
pub use wkb::decode_polygon;
