// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding stored geometry payloads
#[derive(Error, Debug)]
pub enum Error {
    #[error("truncated payload: need {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid wkb byte-order marker {0:#04x}")]
    ByteOrder(u8),

    #[error("unsupported wkb geometry type {0}")]
    UnsupportedType(u32),

    #[error("degenerate ring: {0} points")]
    DegenerateRing(usize),

    #[error("polygon payload has no rings")]
    EmptyPolygon,
}
