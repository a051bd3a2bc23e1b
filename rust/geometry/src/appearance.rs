// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appearance linkage side-channel.
//!
//! When appearance export is enabled, every resolved geometry that carries
//! a gml id has its internal id recorded so textures can be correlated
//! later. Ids go into a write-behind buffer that is flushed to the sink at
//! a size threshold and unconditionally at shutdown.

use crate::error::Result;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Destination of appearance linkage batches, typically a temporary
/// association table in the backing store.
pub trait AppearanceSink: Send {
    fn write_batch(&mut self, internal_ids: &[i64]) -> Result<()>;
}

/// Write-behind buffer over an [`AppearanceSink`].
///
/// A tracker without a sink is disabled: [`record`](Self::record) is a
/// no-op, which is the default when appearance export is off.
pub struct AppearanceTracker {
    sink: Option<Box<dyn AppearanceSink>>,
    buffer: Vec<i64>,
    batch_size: usize,
}

impl AppearanceTracker {
    /// Tracker for sessions without appearance export.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            buffer: Vec::new(),
            batch_size: 0,
        }
    }

    pub fn new(sink: Box<dyn AppearanceSink>, batch_size: usize) -> Self {
        Self {
            sink: Some(sink),
            buffer: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Ids recorded but not yet written to the sink.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Record one resolved geometry id, flushing if the buffer is full.
    pub fn record(&mut self, internal_id: i64) -> Result<()> {
        if self.sink.is_none() {
            return Ok(());
        }
        self.buffer.push(internal_id);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write all buffered ids to the sink.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            if !self.buffer.is_empty() {
                sink.write_batch(&self.buffer)?;
                debug!(count = self.buffer.len(), "flushed appearance linkage batch");
                self.buffer.clear();
            }
        }
        Ok(())
    }
}

impl Drop for AppearanceTracker {
    fn drop(&mut self) {
        // Shutdown flushes explicitly; this is the fallback path
        if let Err(err) = self.flush() {
            warn!(error = %err, "appearance buffer flush failed on drop");
        }
    }
}

/// In-memory sink, shared by handle so recorded ids stay inspectable after
/// the boxed copy moves into a tracker.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    ids: Arc<Mutex<Vec<i64>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<i64> {
        self.ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AppearanceSink for MemorySink {
    fn write_batch(&mut self, internal_ids: &[i64]) -> Result<()> {
        self.ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(internal_ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_tracker_records_nothing() {
        let mut tracker = AppearanceTracker::disabled();
        assert!(!tracker.is_enabled());
        tracker.record(1).unwrap();
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_threshold_flush() {
        let sink = MemorySink::new();
        let mut tracker = AppearanceTracker::new(Box::new(sink.clone()), 3);

        tracker.record(1).unwrap();
        tracker.record(2).unwrap();
        assert_eq!(sink.recorded(), Vec::<i64>::new());
        assert_eq!(tracker.pending(), 2);

        tracker.record(3).unwrap();
        assert_eq!(sink.recorded(), vec![1, 2, 3]);
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_shutdown_flushes_remainder() {
        let sink = MemorySink::new();
        let mut tracker = AppearanceTracker::new(Box::new(sink.clone()), 100);
        tracker.record(42).unwrap();
        tracker.flush().unwrap();
        assert_eq!(sink.recorded(), vec![42]);
    }

    #[test]
    fn test_drop_flushes() {
        let sink = MemorySink::new();
        {
            let mut tracker = AppearanceTracker::new(Box::new(sink.clone()), 100);
            tracker.record(7).unwrap();
        }
        assert_eq!(sink.recorded(), vec![7]);
    }
}
