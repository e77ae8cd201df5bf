//! Module loading and the shared module cache.
//!
//! The cache is the only state shared across requests. Each location is read
//! and hashed at most once per cache; concurrent loads of the same location
//! wait on a per-location slot instead of reading twice.

use crate::error::{Error, Result};
use crate::naming::make_unique_id;
use crate::resolver::ModuleLocation;
use rustc_hash::FxHashMap;
use sourcefiles_util::fs::read_utf8;
use std::sync::{Arc, Mutex, RwLock};

/// A loaded module. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub location: ModuleLocation,
    /// Original file contents, before normalization or patching.
    pub contents: String,
    /// `<shortName>-<hash>`, fixed by the specifier of the first load.
    pub unique_id: String,
}

type Slot = Arc<Mutex<Option<Arc<ModuleRecord>>>>;

/// Append-only cache of loaded modules keyed by canonical location.
#[derive(Debug, Default)]
pub struct ModuleCache {
    slots: RwLock<FxHashMap<ModuleLocation, Slot>>,
}

impl ModuleCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the module at `location`, reached through `specifier`.
    ///
    /// Returns the cached record if the location was loaded before; the id
    /// then reflects the specifier used by that first load. Read failures are
    /// not cached.
    pub fn load(&self, location: &ModuleLocation, specifier: &str) -> Result<Arc<ModuleRecord>> {
        let slot = self.slot(location)?;
        let mut guard = slot.lock().map_err(|_| poisoned(location))?;

        if let Some(record) = guard.as_ref() {
            tracing::trace!(path = %location, id = %record.unique_id, "module cache hit");
            return Ok(Arc::clone(record));
        }

        let contents = read_utf8(location.path()).map_err(|source| Error::Load {
            path: location.path().to_path_buf(),
            source,
        })?;
        let unique_id = make_unique_id(specifier, &contents);
        tracing::debug!(path = %location, specifier, id = %unique_id, "loaded module");

        let record = Arc::new(ModuleRecord {
            location: location.clone(),
            contents,
            unique_id,
        });
        *guard = Some(Arc::clone(&record));
        Ok(record)
    }

    /// Cached record for `location`, without loading.
    #[must_use]
    pub fn get(&self, location: &ModuleLocation) -> Option<Arc<ModuleRecord>> {
        let slot = self.slots.read().ok()?.get(location).cloned()?;
        let guard = slot.lock().ok()?;
        guard.clone()
    }

    /// Number of loaded modules.
    #[must_use]
    pub fn len(&self) -> usize {
        let Ok(slots) = self.slots.read() else {
            return 0;
        };
        slots
            .values()
            .filter(|slot| slot.lock().map(|g| g.is_some()).unwrap_or(false))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, location: &ModuleLocation) -> Result<Slot> {
        if let Some(slot) = self
            .slots
            .read()
            .map_err(|_| poisoned(location))?
            .get(location)
        {
            return Ok(Arc::clone(slot));
        }

        let mut slots = self.slots.write().map_err(|_| poisoned(location))?;
        Ok(Arc::clone(slots.entry(location.clone()).or_default()))
    }
}

fn poisoned(location: &ModuleLocation) -> Error {
    Error::Load {
        path: location.path().to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "module cache lock poisoned"),
    }
}
