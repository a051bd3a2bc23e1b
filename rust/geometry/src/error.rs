// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;
use tracing::warn;

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during surface geometry reconstruction
#[derive(Error, Debug)]
pub enum Error {
    #[error("no geometry rows for root {0}")]
    MissingRoot(i64),

    #[error("malformed polygon payload in row {id}: {source}")]
    MalformedPayload {
        id: i64,
        source: citydb_lite_core::Error,
    },

    #[error("row fetch failed: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("appearance linkage write failed: {0}")]
    Appearance(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap a row source failure.
    pub fn fetch<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Fetch(Box::new(err))
    }

    /// Wrap an appearance sink failure.
    pub fn appearance<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Appearance(Box::new(err))
    }
}

/// Session-wide escalation policy for recoverable export errors.
///
/// Missing roots and undecodable payloads degrade the affected geometry to
/// absent; this policy decides whether that degradation is logged or
/// surfaced as an error. Fetch failures ignore the policy and always abort
/// the current flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Surface the first recoverable error to the caller.
    FailFast,
    /// Log recoverable errors and keep exporting.
    #[default]
    BestEffort,
}

impl FailurePolicy {
    /// Log or propagate `err` according to the session policy.
    pub fn absorb(self, err: Error) -> Result<()> {
        match self {
            FailurePolicy::FailFast => Err(err),
            FailurePolicy::BestEffort => {
                warn!(error = %err, "continuing after recoverable export error");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_absorbs() {
        assert!(FailurePolicy::BestEffort
            .absorb(Error::MissingRoot(7))
            .is_ok());
    }

    #[test]
    fn test_fail_fast_propagates() {
        let err = FailurePolicy::FailFast
            .absorb(Error::MissingRoot(7))
            .unwrap_err();
        assert!(matches!(err, Error::MissingRoot(7)));
    }
}
