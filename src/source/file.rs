//! JSON-lines statistics files.
//!
//! One usage triple per JSON object, e.g.
//!
//! ```text
//! {"node": "csv-reader", "successor": "row-filter", "count": 42}
//! {"predecessor": "csv-reader", "node": "row-filter", "successor": "plot", "count": 7}
//! ```
//!
//! The file is streamed, never read into memory as a whole.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use crate::error::SourceError;
use crate::node::UsageTriple;

use super::{StatisticsSource, TripleStream};

/// A statistics source reading a JSON-lines file.
#[derive(Debug)]
pub struct FileStatisticsSource {
    name: String,
    path: PathBuf,
    enabled: AtomicBool,
    /// Modification time of the file when it was last opened.
    last_read: Mutex<Option<SystemTime>>,
}

impl FileStatisticsSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            enabled: AtomicBool::new(true),
            last_read: Mutex::new(None),
        }
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        self.enabled.store(enabled, Ordering::Release);
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
    }

    fn io_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Io {
            source_name: self.name.clone(),
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl StatisticsSource for FileStatisticsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn needs_update(&self) -> bool {
        let last_read = *self
            .last_read
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match (last_read, self.modified()) {
            (Some(read), Some(current)) => read != current,
            _ => true,
        }
    }

    fn triples(&self) -> Result<TripleStream<'_>, SourceError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let modified = file.metadata().and_then(|m| m.modified()).ok();
        *self
            .last_read
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = modified;

        let stream = serde_json::Deserializer::from_reader(BufReader::new(file))
            .into_iter::<UsageTriple>()
            .map(move |record| {
                record.map_err(|e| {
                    if e.is_io() {
                        self.io_error(e.into())
                    } else {
                        SourceError::Parse {
                            source_name: self.name.clone(),
                            line: e.line(),
                            message: e.to_string(),
                        }
                    }
                })
            });
        Ok(Box::new(stream))
    }
}
