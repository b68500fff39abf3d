//! Statistics sources: where usage triples come from.
//!
//! A source hands out a fresh, lazy triple stream on every call to
//! [`StatisticsSource::triples`]; streams are read once and not restarted.
//!
//! - [`FileStatisticsSource`]: JSON-lines file on disk
//! - [`MemorySource`]: triples held in memory

pub mod file;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SourceError;
use crate::node::UsageTriple;

pub use file::FileStatisticsSource;

/// A lazily read, fallible stream of usage triples.
pub type TripleStream<'a> = Box<dyn Iterator<Item = Result<UsageTriple, SourceError>> + 'a>;

/// A provider of historical usage triples.
pub trait StatisticsSource: Send + Sync {
    /// Name shown next to this source's recommendations.
    fn name(&self) -> &str;

    /// Disabled sources are skipped by reloads.
    fn is_enabled(&self) -> bool;

    /// Whether the data changed since the last call to [`triples`](Self::triples).
    fn needs_update(&self) -> bool;

    /// Open a new stream over all triples of this source.
    fn triples(&self) -> Result<TripleStream<'_>, SourceError>;
}

/// A source backed by an in-memory list of triples.
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    triples: Vec<UsageTriple>,
    enabled: AtomicBool,
    stale: AtomicBool,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, triples: Vec<UsageTriple>) -> Self {
        Self {
            name: name.into(),
            triples,
            enabled: AtomicBool::new(true),
            stale: AtomicBool::new(true),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl StatisticsSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn needs_update(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    fn triples(&self) -> Result<TripleStream<'_>, SourceError> {
        self.stale.store(false, Ordering::Release);
        Ok(Box::new(self.triples.iter().cloned().map(Ok)))
    }
}
