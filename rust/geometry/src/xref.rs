// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session-wide identity cache for shared geometry.
//!
//! Worker threads each own an engine instance, but all of them resolve
//! shared geometry through one cache so exactly one worker materializes a
//! given gml id. The claim is a single guarded map insert, which makes
//! first-claim arbitration linearizable across threads.

use rustc_hash::FxHashMap;
use std::sync::Mutex;

/// Append-only `gml id -> internal id` cache; first writer wins.
///
/// Construct one per export session, share it as `Arc<XrefCache>` across
/// workers, and never keep it beyond the session.
#[derive(Debug, Default)]
pub struct XrefCache {
    entries: Mutex<FxHashMap<String, i64>>,
}

impl XrefCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `gml_id` for `internal_id`.
    ///
    /// Returns `false` for the first caller in the session (the claim
    /// succeeded and the caller must materialize the geometry) and `true`
    /// for every later caller.
    pub fn try_claim(&self, gml_id: &str, internal_id: i64) -> bool {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.contains_key(gml_id) {
            return true;
        }
        entries.insert(gml_id.to_owned(), internal_id);
        false
    }

    /// Internal id of the claimant, if `gml_id` has been claimed.
    pub fn lookup(&self, gml_id: &str) -> Option<i64> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(gml_id)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_claim_wins() {
        let cache = XrefCache::new();
        assert!(!cache.try_claim("G1", 100));
        assert!(cache.try_claim("G1", 200));
        assert!(cache.try_claim("G1", 300));
        assert_eq!(cache.lookup("G1"), Some(100));
        assert_eq!(cache.lookup("G2"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_claims_elect_one_winner() {
        let cache = Arc::new(XrefCache::new());
        let mut handles = Vec::new();
        for worker in 0..8i64 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                // One claim per worker on the same id; count wins
                usize::from(!cache.try_claim("SHARED", worker))
            }));
        }
        let wins: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(wins, 1);
        assert!(cache.lookup("SHARED").is_some());
    }
}
