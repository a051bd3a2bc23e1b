// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gml identifier synthesis.
//!
//! When a shared geometry cannot be written by reference it is duplicated
//! under a fresh, globally-unique gml id. Generation sits behind a trait so
//! embedders can plug in their own id scheme.

use uuid::Uuid;

/// Source of globally-unique gml ids.
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh id.
    fn next_id(&self) -> String;

    /// Produce a fresh id replacing `old_id` on a duplicated geometry.
    ///
    /// The default keeps no trace of the replaced id.
    fn replacement_id(&self, _old_id: &str) -> String {
        self.next_id()
    }
}

/// UUID-v4 based generator with a configurable prefix.
///
/// Ids must be valid XML NCNames, which cannot start with a digit, so a
/// non-empty prefix is always applied.
#[derive(Debug, Clone)]
pub struct DefaultIdGenerator {
    prefix: String,
    keep_old_suffix: bool,
}

impl DefaultIdGenerator {
    pub fn new() -> Self {
        Self {
            prefix: "ID_".into(),
            keep_old_suffix: false,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            keep_old_suffix: false,
        }
    }

    /// Append the replaced id to synthesized replacement ids, keeping the
    /// original identity visible in exported documents.
    pub fn keep_old_id_suffix(mut self, keep: bool) -> Self {
        self.keep_old_suffix = keep;
        self
    }
}

impl Default for DefaultIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for DefaultIdGenerator {
    fn next_id(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4())
    }

    fn replacement_id(&self, old_id: &str) -> String {
        if self.keep_old_suffix {
            format!("{}-{}", self.next_id(), old_id)
        } else {
            self.next_id()
        }
    }
}
