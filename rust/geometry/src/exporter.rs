// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exporter facade and deferred batch queue.
//!
//! Feature exporters either resolve one root at a time or enqueue
//! `(root id, callback)` pairs and flush them together. A flush with one
//! pending entry uses the cheaper single-root query; two or more trigger
//! the bulk query, demultiplexed into one tree per root before
//! classification. Implicit template entries whose root is already in the
//! session cache are served from it and excluded from the query. Callbacks
//! fire only after the whole fetch completes, and the queue is cleared
//! after every flush attempt so no caller can ever receive a stale result.

use crate::appearance::{AppearanceSink, AppearanceTracker};
use crate::builder::Rebuilder;
use crate::error::{Error, FailurePolicy, Result};
use crate::model::SurfaceGeometry;
use crate::source::{GeometryRowSource, PayloadDecoder, WkbDecoder};
use crate::tree::{assemble, GeometryTree};
use crate::xref::XrefCache;
use citydb_lite_core::{DefaultIdGenerator, IdGenerator};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// How an already-claimed shared geometry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XlinkMode {
    /// Emit an href pointing at the first materialization.
    #[default]
    ByReference,
    /// Re-materialize the sub-tree under freshly synthesized gml ids.
    Duplicate,
}

/// Per-session exporter settings.
#[derive(Debug, Clone, Copy)]
pub struct ExporterConfig {
    pub xlink_mode: XlinkMode,
    pub failure_policy: FailurePolicy,
    /// Appearance linkage buffer size before a write-behind flush.
    pub appearance_batch_size: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            xlink_mode: XlinkMode::default(),
            failure_policy: FailurePolicy::default(),
            appearance_batch_size: 1000,
        }
    }
}

type Callback = Box<dyn FnOnce(Option<SurfaceGeometry>)>;

struct Pending {
    root_id: i64,
    implicit: bool,
    callback: Callback,
}

/// Surface geometry reconstruction engine, one instance per worker.
///
/// Synchronous and thread-confined; share only the [`XrefCache`] between
/// instances.
pub struct SurfaceGeometryExporter<S: GeometryRowSource> {
    source: S,
    decoder: Box<dyn PayloadDecoder>,
    ids: Box<dyn IdGenerator>,
    xrefs: Arc<XrefCache>,
    appearance: AppearanceTracker,
    config: ExporterConfig,
    pending: Vec<Pending>,
    /// Implicit templates are referenced by many city objects; decode each
    /// once per session.
    template_cache: FxHashMap<i64, Option<SurfaceGeometry>>,
}

impl<S: GeometryRowSource> SurfaceGeometryExporter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: Box::new(WkbDecoder),
            ids: Box::new(DefaultIdGenerator::new()),
            xrefs: Arc::new(XrefCache::new()),
            appearance: AppearanceTracker::disabled(),
            config: ExporterConfig::default(),
            pending: Vec::new(),
            template_cache: FxHashMap::default(),
        }
    }

    pub fn with_config(mut self, config: ExporterConfig) -> Self {
        self.config = config;
        self
    }

    /// Share one identity cache across all workers of a session.
    pub fn with_xref_cache(mut self, cache: Arc<XrefCache>) -> Self {
        self.xrefs = cache;
        self
    }

    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_payload_decoder(mut self, decoder: Box<dyn PayloadDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Enable appearance export. Apply after [`with_config`](Self::with_config)
    /// so the configured batch size is picked up.
    pub fn with_appearance_sink(mut self, sink: Box<dyn AppearanceSink>) -> Self {
        self.appearance = AppearanceTracker::new(sink, self.config.appearance_batch_size);
        self
    }

    /// Handle to the session identity cache.
    pub fn xrefs(&self) -> Arc<XrefCache> {
        Arc::clone(&self.xrefs)
    }

    /// Entries waiting for the next [`flush`](Self::flush).
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Resolve one root in a single round trip.
    pub fn resolve(&mut self, root_id: i64) -> Result<Option<SurfaceGeometry>> {
        let rows = self.source.fetch_root(root_id)?;
        self.reconstruct(root_id, rows, false)
    }

    /// Resolve a template geometry stored relative to a local origin.
    pub fn resolve_implicit_template(&mut self, root_id: i64) -> Result<Option<SurfaceGeometry>> {
        if let Some(cached) = self.template_cache.get(&root_id) {
            return Ok(cached.clone());
        }
        let rows = self.source.fetch_root(root_id)?;
        let result = self.reconstruct(root_id, rows, true)?;
        self.template_cache.insert(root_id, result.clone());
        Ok(result)
    }

    /// Defer resolution of `root_id` until the next flush.
    pub fn enqueue<F>(&mut self, root_id: i64, on_resolved: F)
    where
        F: FnOnce(Option<SurfaceGeometry>) + 'static,
    {
        self.pending.push(Pending {
            root_id,
            implicit: false,
            callback: Box::new(on_resolved),
        });
    }

    /// Defer resolution of an implicit template until the next flush.
    pub fn enqueue_implicit_template<F>(&mut self, root_id: i64, on_resolved: F)
    where
        F: FnOnce(Option<SurfaceGeometry>) + 'static,
    {
        self.pending.push(Pending {
            root_id,
            implicit: true,
            callback: Box::new(on_resolved),
        });
    }

    /// Resolve everything pending in one round trip and dispatch results.
    ///
    /// A fetch failure aborts the whole flush: every waiting callback is
    /// invoked with absent and the error is returned. Recoverable per-root
    /// problems follow the session [`FailurePolicy`].
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);

        // Template roots already decoded this session are served from the
        // cache; only the rest go into the query.
        let mut roots: Vec<i64> = pending
            .iter()
            .filter(|p| !(p.implicit && self.template_cache.contains_key(&p.root_id)))
            .map(|p| p.root_id)
            .collect();
        let fetched = if roots.is_empty() {
            Ok(Vec::new())
        } else if roots.len() == 1 {
            self.source.fetch_root(roots[0])
        } else {
            roots.sort_unstable();
            roots.dedup();
            self.source.fetch_roots(&roots)
        };

        let rows = match fetched {
            Ok(rows) => rows,
            Err(err) => {
                warn!(pending = pending.len(), error = %err, "row fetch failed, aborting flush");
                for entry in pending {
                    (entry.callback)(None);
                }
                return Err(err);
            }
        };

        debug!(pending = pending.len(), rows = rows.len(), "flushing geometry batch");
        let trees = assemble(rows);

        let mut entries = pending.into_iter();
        while let Some(entry) = entries.next() {
            let outcome = if entry.implicit {
                self.rebuild_template(&trees, entry.root_id)
            } else {
                match trees.get(&entry.root_id) {
                    Some(tree) => self.rebuild_tree(tree, false),
                    None => self
                        .config
                        .failure_policy
                        .absorb(Error::MissingRoot(entry.root_id))
                        .map(|()| None),
                }
            };
            match outcome {
                Ok(result) => (entry.callback)(result),
                Err(err) => {
                    // fail-fast: remaining callers still hear back, with
                    // absent results, before the error surfaces
                    (entry.callback)(None);
                    for rest in entries {
                        (rest.callback)(None);
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Flush pending work and the appearance buffer. Call once per session
    /// after the last feature.
    pub fn shutdown(&mut self) -> Result<()> {
        self.flush()?;
        self.appearance.flush()
    }

    fn reconstruct(
        &mut self,
        root_id: i64,
        rows: Vec<citydb_lite_core::GeometryRow>,
        implicit: bool,
    ) -> Result<Option<SurfaceGeometry>> {
        if rows.is_empty() {
            self.config
                .failure_policy
                .absorb(Error::MissingRoot(root_id))?;
            return Ok(None);
        }
        let mut trees = assemble(rows);
        let Some(tree) = trees.remove(&root_id) else {
            self.config
                .failure_policy
                .absorb(Error::MissingRoot(root_id))?;
            return Ok(None);
        };
        self.rebuild_tree(&tree, implicit)
    }

    /// Batched counterpart of [`resolve_implicit_template`]: serve and
    /// populate the session template cache so a template enqueued by many
    /// city objects is rebuilt once.
    ///
    /// [`resolve_implicit_template`]: Self::resolve_implicit_template
    fn rebuild_template(
        &mut self,
        trees: &FxHashMap<i64, GeometryTree>,
        root_id: i64,
    ) -> Result<Option<SurfaceGeometry>> {
        if let Some(cached) = self.template_cache.get(&root_id) {
            return Ok(cached.clone());
        }
        let result = match trees.get(&root_id) {
            Some(tree) => self.rebuild_tree(tree, true)?,
            None => {
                self.config
                    .failure_policy
                    .absorb(Error::MissingRoot(root_id))?;
                None
            }
        };
        self.template_cache.insert(root_id, result.clone());
        Ok(result)
    }

    fn rebuild_tree(
        &mut self,
        tree: &GeometryTree,
        implicit: bool,
    ) -> Result<Option<SurfaceGeometry>> {
        Rebuilder::new(
            tree,
            self.decoder.as_ref(),
            self.ids.as_ref(),
            &self.xrefs,
            &mut self.appearance,
            self.config.xlink_mode,
            self.config.failure_policy,
            implicit,
        )
        .rebuild()
    }
}
