//! Engine facade: owns the statistics sources, the current snapshot, and the
//! reload listeners.
//!
//! Reloads are synchronous and single-writer. Each reload builds a brand-new
//! [`Snapshot`] from private working copies and publishes it with one atomic
//! pointer store, so concurrent readers see either the previous snapshot or
//! the new one. A reload that ends up with no usable source clears the
//! snapshot instead of keeping the previous one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, RecResult};
use crate::index::builder::try_build;
use crate::index::{Direction, RecommendationEntry};
use crate::join::{JoinedRow, join};
use crate::node::{NodeId, NodeTypeClassifier};
use crate::query::{self, Canonical, Detached, GraphNeighbors, Lookup, SourceRecommendations};
use crate::snapshot::{Snapshot, SourceIndex};
use crate::source::StatisticsSource;

/// Error type reload listeners may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

type Listener = Arc<dyn Fn() -> Result<(), ListenerError> + Send + Sync>;

/// Handle returned by [`Engine::add_reload_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A source that could not be loaded, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

/// What a reload did with every source.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReloadReport {
    /// Sources whose index made it into the new snapshot, in order.
    pub loaded: Vec<String>,
    pub disabled: Vec<String>,
    /// Sources that yielded no recommendations at all.
    pub empty: Vec<String>,
    pub failed: Vec<SourceFailure>,
}

impl ReloadReport {
    /// Whether the reload published a snapshot.
    pub fn is_loaded(&self) -> bool {
        !self.loaded.is_empty()
    }
}

/// The node recommendation engine.
pub struct Engine {
    sources: Vec<Arc<dyn StatisticsSource>>,
    classifier: Arc<dyn NodeTypeClassifier>,
    snapshot: ArcSwapOption<Snapshot>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    writer: Mutex<()>,
}

impl Engine {
    /// Create an engine. Nothing is loaded until [`reload`](Self::reload).
    pub fn new(
        sources: Vec<Arc<dyn StatisticsSource>>,
        classifier: Arc<dyn NodeTypeClassifier>,
    ) -> Self {
        Self {
            sources,
            classifier,
            snapshot: ArcSwapOption::empty(),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            writer: Mutex::new(()),
        }
    }

    /// File sources and catalog classifier as described by `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.statistics_sources(),
            Arc::new(config.catalog.to_catalog()),
        )
    }

    pub fn sources(&self) -> &[Arc<dyn StatisticsSource>] {
        &self.sources
    }

    /// The snapshot currently in effect, if any.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.load().is_some()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Rebuild every enabled source and publish the result.
    ///
    /// Failing sources are logged and left out. Listeners are notified after
    /// the new snapshot is published; the first listener error aborts the
    /// notification and is returned.
    pub fn reload(&self) -> RecResult<ReloadReport> {
        let report = {
            let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            let (built, report) = self.build_all();
            let snapshot = Snapshot::new(built).map(Arc::new);
            if snapshot.is_none() {
                warn!("no statistics source returned data, clearing recommendations");
            }
            self.snapshot.store(snapshot);
            report
        };

        info!(
            loaded = report.loaded.len(),
            disabled = report.disabled.len(),
            empty = report.empty.len(),
            failed = report.failed.len(),
            "recommendations reloaded"
        );
        self.notify()?;
        Ok(report)
    }

    /// Reload if nothing is loaded yet or an enabled source reports new data.
    /// Returns `None` when no reload was necessary.
    pub fn refresh(&self) -> RecResult<Option<ReloadReport>> {
        let stale = !self.is_loaded()
            || self
                .sources
                .iter()
                .any(|source| source.is_enabled() && source.needs_update());
        if stale {
            self.reload().map(Some)
        } else {
            debug!("recommendations are up to date");
            Ok(None)
        }
    }

    fn build_all(&self) -> (Vec<SourceIndex>, ReloadReport) {
        let mut built = Vec::new();
        let mut report = ReloadReport::default();

        for source in &self.sources {
            let name = source.name().to_string();
            if !source.is_enabled() {
                debug!(source = %name, "statistics source disabled");
                report.disabled.push(name);
                continue;
            }

            let result = source
                .triples()
                .and_then(|triples| try_build(triples, self.classifier.as_ref()));
            match result {
                Ok(index) if index.is_empty() => {
                    debug!(source = %name, "statistics source produced no recommendations");
                    report.empty.push(name);
                }
                Ok(index) => {
                    report.loaded.push(name.clone());
                    built.push(SourceIndex { name, index });
                }
                Err(err) => {
                    warn!(source = %name, error = %err, "statistics source omitted from snapshot");
                    report.failed.push(SourceFailure {
                        source: name,
                        message: err.to_string(),
                    });
                }
            }
        }
        (built, report)
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Register a callback run after every reload, in registration order.
    pub fn add_reload_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if the listener was not registered.
    pub fn remove_reload_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    fn notify(&self) -> RecResult<()> {
        // listeners may (un)register listeners or query the engine
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener().map_err(|e| EngineError::Listener {
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Recommend for zero or one node type, without workflow context.
    pub fn recommend(
        &self,
        nodes: &[NodeId],
        direction: Direction,
    ) -> RecResult<Lookup<Vec<SourceRecommendations>>> {
        self.recommend_in(&Detached, nodes, direction)
    }

    /// Recommend for zero or one node instance of `graph`, using its
    /// connected neighbors as additional context. Node ids are resolved
    /// through the engine's classifier first.
    pub fn recommend_in<G: GraphNeighbors + ?Sized>(
        &self,
        graph: &G,
        nodes: &[G::Node],
        direction: Direction,
    ) -> RecResult<Lookup<Vec<SourceRecommendations>>> {
        let snapshot = self.snapshot();
        let graph = Canonical::new(graph, self.classifier.as_ref());
        Ok(query::recommend(snapshot.as_deref(), &graph, nodes, direction)?)
    }

    pub fn most_frequently_used(&self) -> Lookup<Vec<SourceRecommendations>> {
        query::most_frequently_used(self.snapshot().as_deref())
    }

    /// Side-by-side rows over per-source results.
    pub fn join(&self, results: &[SourceRecommendations]) -> Vec<JoinedRow<RecommendationEntry>> {
        join(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::error::{RecError, SourceError};
    use crate::node::{NodeType, UsageTriple};
    use crate::source::{MemorySource, TripleStream};

    fn classifier() -> Arc<dyn NodeTypeClassifier> {
        Arc::new(|_: &str| Some(NodeType::Other))
    }

    fn mem_source(name: &str) -> Arc<MemorySource> {
        Arc::new(MemorySource::new(
            name,
            vec![UsageTriple::new(None, Some("a"), Some("b"), 2)],
        ))
    }

    fn memory(name: &str) -> Arc<dyn StatisticsSource> {
        mem_source(name)
    }

    struct Broken;

    impl StatisticsSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn is_enabled(&self) -> bool {
            true
        }
        fn needs_update(&self) -> bool {
            false
        }
        fn triples(&self) -> Result<TripleStream<'_>, SourceError> {
            Err(SourceError::Unavailable {
                source_name: "broken".into(),
                message: "offline".into(),
            })
        }
    }

    #[test]
    fn failing_source_is_omitted() {
        let engine = Engine::new(
            vec![Arc::new(Broken) as Arc<dyn StatisticsSource>, memory("mem")],
            classifier(),
        );
        let report = engine.reload().unwrap();
        assert_eq!(report.loaded, ["mem"]);
        assert_eq!(report.failed[0].source, "broken");
        let names: Vec<String> = engine
            .snapshot()
            .unwrap()
            .source_names()
            .map(str::to_string)
            .collect();
        assert_eq!(names, ["mem"]);
    }

    #[test]
    fn reload_without_data_clears_snapshot() {
        let source = mem_source("mem");
        let engine = Engine::new(vec![source.clone() as Arc<dyn StatisticsSource>], classifier());
        engine.reload().unwrap();
        assert!(engine.is_loaded());

        source.set_enabled(false);
        let report = engine.reload().unwrap();
        assert!(!report.is_loaded());
        assert_eq!(report.disabled, ["mem"]);
        assert!(!engine.is_loaded());
        assert!(!engine.most_frequently_used().is_loaded());
    }

    #[test]
    fn empty_source_counts_as_no_data() {
        let engine = Engine::new(
            vec![Arc::new(MemorySource::new("empty", Vec::new())) as Arc<dyn StatisticsSource>],
            classifier(),
        );
        let report = engine.reload().unwrap();
        assert_eq!(report.empty, ["empty"]);
        assert!(!engine.is_loaded());
    }

    #[test]
    fn no_sources_clears_snapshot_without_error() {
        let engine = Engine::new(Vec::new(), classifier());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        engine.add_reload_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let report = engine.reload().unwrap();
        assert!(!report.is_loaded());
        assert!(report.disabled.is_empty() && report.failed.is_empty());
        assert!(!engine.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let engine = Engine::new(vec![memory("mem")], classifier());
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in [1, 2, 3] {
            let order = Arc::clone(&order);
            engine.add_reload_listener(move || {
                order.lock().unwrap().push(tag);
                Ok(())
            });
        }
        engine.reload().unwrap();
        assert_eq!(*order.lock().unwrap(), [1, 2, 3]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let engine = Engine::new(vec![memory("mem")], classifier());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = engine.add_reload_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        engine.reload().unwrap();
        assert!(engine.remove_reload_listener(id));
        assert!(!engine.remove_reload_listener(id));
        engine.reload().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_error_propagates_after_publication() {
        let engine = Engine::new(vec![memory("mem")], classifier());
        let later = Arc::new(AtomicUsize::new(0));
        engine.add_reload_listener(|| Err("listener exploded".into()));
        let counter = Arc::clone(&later);
        engine.add_reload_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = engine.reload().unwrap_err();
        assert!(matches!(err, RecError::Engine(EngineError::Listener { .. })));
        assert!(engine.is_loaded());
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn refresh_only_reloads_stale_sources() {
        let engine = Engine::new(vec![memory("mem")], classifier());
        assert!(engine.refresh().unwrap().is_some());
        assert!(engine.refresh().unwrap().is_none());
    }

    #[test]
    fn listener_can_query_engine() {
        let engine = Arc::new(Engine::new(vec![memory("mem")], classifier()));
        let seen = Arc::new(AtomicUsize::new(0));
        let (weak, counter) = (Arc::downgrade(&engine), Arc::clone(&seen));
        engine.add_reload_listener(move || {
            if let Some(engine) = weak.upgrade() {
                if let Lookup::Loaded(lists) = engine.most_frequently_used() {
                    counter.store(lists[0].entries.len(), Ordering::SeqCst);
                }
            }
            Ok(())
        });
        engine.reload().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
