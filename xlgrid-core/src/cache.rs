//! Process-wide cache of opened workbooks, keyed by absolute path.
//!
//! Each cached workbook sits behind its own async mutex so requests against
//! the same file are serialized while different files proceed independently.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::{Result, XlgridError};
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;

/// Shared handle to a cached document.
pub type DocumentHandle = Arc<tokio::sync::Mutex<Document>>;

/// A workbook together with the file it was loaded from.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    workbook: Workbook,
}

impl Document {
    pub fn new(path: PathBuf, workbook: Workbook) -> Self {
        Document { path, workbook }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    /// The named sheet, or the first one when `name` is `None`.
    pub fn sheet(&self, name: Option<&str>) -> Result<&Worksheet> {
        self.workbook.sheet(name)
    }

    /// Write the in-memory workbook back to its file.
    ///
    /// Serialization happens on the caller's thread; the file write runs on
    /// the blocking pool.
    pub async fn persist(&self) -> Result<()> {
        let bytes = self.workbook.save_to_bytes()?;
        let path = self.path.clone();
        let written = bytes.len();
        tokio::task::spawn_blocking(move || std::fs::write(&path, bytes))
            .await
            .map_err(|e| XlgridError::Task(e.to_string()))??;
        debug!(path = %self.path.display(), bytes = written, "persisted workbook");
        Ok(())
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<PathBuf, DocumentHandle>,
    /// Least recently used first.
    order: VecDeque<PathBuf>,
}

impl CacheState {
    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.order.iter().position(|p| p == path) {
            if let Some(entry) = self.order.remove(pos) {
                self.order.push_back(entry);
            }
        }
    }
}

/// Maps file paths to opened documents for the lifetime of the server.
///
/// Unbounded unless built with [`DocumentCache::with_capacity`], in which case
/// the least recently used entry is dropped once the limit is exceeded.
#[derive(Default)]
pub struct DocumentCache {
    state: Mutex<CacheState>,
    capacity: Option<NonZeroUsize>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        DocumentCache {
            state: Mutex::new(CacheState::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        match std::path::absolute(path.as_ref()) {
            Ok(key) => self.lock_state().entries.contains_key(&key),
            Err(_) => false,
        }
    }

    /// Return the cached handle for `path`, loading the workbook on first use.
    pub async fn get_or_open(&self, path: impl AsRef<Path>) -> Result<DocumentHandle> {
        let path = path.as_ref();
        let key = std::path::absolute(path)
            .map_err(|_| XlgridError::NotFound(path.display().to_string()))?;

        if let Some(handle) = self.lookup(&key) {
            debug!(path = %key.display(), "document cache hit");
            return Ok(handle);
        }

        let load_path = key.clone();
        let workbook = tokio::task::spawn_blocking(move || Workbook::load(&load_path))
            .await
            .map_err(|e| XlgridError::Task(e.to_string()))?
            .map_err(|e| match e {
                XlgridError::NotFound(_) => XlgridError::NotFound(path.display().to_string()),
                other => other,
            })?;

        info!(
            path = %key.display(),
            sheets = workbook.worksheets().len(),
            "opened workbook"
        );

        let mut state = self.lock_state();
        // Another request may have opened the same file while this one was loading.
        if let Some(existing) = state.entries.get(&key).cloned() {
            state.touch(&key);
            return Ok(existing);
        }

        let handle: DocumentHandle = Arc::new(tokio::sync::Mutex::new(Document::new(key.clone(), workbook)));
        state.entries.insert(key.clone(), handle.clone());
        state.order.push_back(key);

        if let Some(capacity) = self.capacity {
            while state.entries.len() > capacity.get() {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
                debug!(path = %oldest.display(), "evicted workbook from cache");
            }
        }

        Ok(handle)
    }

    fn lookup(&self, key: &Path) -> Option<DocumentHandle> {
        let mut state = self.lock_state();
        let handle = state.entries.get(key).cloned()?;
        if self.capacity.is_some() {
            state.touch(key);
        }
        Some(handle)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // The state holds no invariants a panicking holder could break halfway.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
