//! Package manifest (`package.json`) reading and lookup.

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// File name of a package manifest.
pub const MANIFEST: &str = "package.json";

/// Parsed package manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Absolute path of the `package.json` file.
    pub path: PathBuf,
    /// Parsed JSON.
    pub value: Value,
}

impl Manifest {
    /// Read and parse a manifest.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let value = serde_json::from_str(&content).map_err(|source| Error::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            value,
        })
    }

    /// Directory containing the manifest (the package root).
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }

    /// A top-level string field such as `main` or `module`.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn exports(&self) -> Option<&Value> {
        self.value.get("exports").filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn imports(&self) -> Option<&Value> {
        self.value.get("imports").filter(|v| !v.is_null())
    }

    /// Entries of the `files` array, if declared.
    #[must_use]
    pub fn files(&self) -> Option<Vec<&str>> {
        self.value
            .get("files")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    /// Names of runtime (non-dev) dependencies, in manifest order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        self.value
            .get("dependencies")
            .and_then(Value::as_object)
            .map(|deps| deps.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The declared type entry (`types`, falling back to `typings`).
    #[must_use]
    pub fn types_entry(&self) -> Option<&str> {
        self.str_field("types").or_else(|| self.str_field("typings"))
    }
}

/// Per-request cache of parsed manifests keyed by path.
///
/// Missing manifests are cached as `None` so repeated lookups of absent
/// `package.json` files do not touch the filesystem again.
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: RwLock<FxHashMap<PathBuf, Option<Arc<Manifest>>>>,
}

impl ManifestCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the manifest at `path`, returning `None` if no file exists there.
    pub fn get(&self, path: &Path) -> Result<Option<Arc<Manifest>>> {
        if let Some(cached) = self
            .entries
            .read()
            .map_err(|_| poisoned(path))?
            .get(path)
        {
            return Ok(cached.clone());
        }

        let loaded = if path.is_file() {
            Some(Arc::new(Manifest::read(path)?))
        } else {
            None
        };

        self.entries
            .write()
            .map_err(|_| poisoned(path))?
            .insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }

    /// Manifest of the package directory `dir`, if it has one.
    pub fn in_dir(&self, dir: &Path) -> Result<Option<Arc<Manifest>>> {
        self.get(&dir.join(MANIFEST))
    }

    /// Nearest manifest at or above `start`.
    pub fn nearest(&self, start: &Path) -> Result<Option<Arc<Manifest>>> {
        for dir in start.ancestors() {
            if let Some(manifest) = self.in_dir(dir)? {
                return Ok(Some(manifest));
            }
        }
        Ok(None)
    }
}

fn poisoned(path: &Path) -> Error {
    Error::Load {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "manifest cache lock poisoned"),
    }
}

/// Find `node_modules/<name>` directories from `start` upward, nearest first.
pub fn package_dirs<'a>(name: &'a str, start: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
    start
        .ancestors()
        .filter(|dir| dir.file_name().map_or(true, |n| n != "node_modules"))
        .map(move |dir| dir.join("node_modules").join(name))
        .filter(|candidate| candidate.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST);
        fs::write(
            &path,
            r#"{
                "name": "pkg",
                "main": "./index.js",
                "module": "",
                "typings": "./index.d.ts",
                "files": ["dist", "index.d.ts"],
                "dependencies": { "zeta": "1", "alpha": "1" },
                "devDependencies": { "vitest": "1" }
            }"#,
        )
        .unwrap();

        let manifest = Manifest::read(&path).unwrap();
        assert_eq!(manifest.str_field("main"), Some("./index.js"));
        assert_eq!(manifest.str_field("module"), None);
        assert_eq!(manifest.types_entry(), Some("./index.d.ts"));
        assert_eq!(manifest.files(), Some(vec!["dist", "index.d.ts"]));
        assert_eq!(manifest.dependencies(), vec!["zeta", "alpha"]);
        assert_eq!(manifest.dir(), dir.path());
    }

    #[test]
    fn test_malformed_manifest_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST);
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Manifest::read(&path),
            Err(Error::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_cache_missing_and_nearest() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST), r#"{"name": "root"}"#).unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let cache = ManifestCache::new();
        assert!(cache.in_dir(&nested).unwrap().is_none());
        let nearest = cache.nearest(&nested).unwrap().unwrap();
        assert_eq!(nearest.str_field("name"), Some("root"));
    }

    #[test]
    fn test_package_dirs_nearest_first() {
        let dir = tempdir().unwrap();
        let outer = dir.path().join("node_modules").join("dep");
        let app = dir.path().join("app");
        let inner = app.join("node_modules").join("dep");
        fs::create_dir_all(&outer).unwrap();
        fs::create_dir_all(&inner).unwrap();

        let found: Vec<_> = package_dirs("dep", &app).collect();
        assert_eq!(found, vec![inner, outer]);
    }
}
