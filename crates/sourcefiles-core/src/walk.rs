//! Module graph walking.
//!
//! Starting from an entry specifier, every reachable module is loaded,
//! scanned and patched so that each import literal names another key of the
//! same import map. The walk is depth-first in source order; that order only
//! decides which module keeps a contested bare specifier key.

use crate::config::EngineConfig;
use crate::diagnostics::{codes, Diagnostic, Diagnostics};
use crate::error::Result;
use crate::loader::ModuleCache;
use crate::normalize::Normalizer;
use crate::patch::patch;
use crate::resolver::{ModuleLocation, Resolution, Resolver, Stage};
use crate::scan::scan;
use crate::specifier::is_bare;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Specifier (bare name or module id) to patched module text.
pub type ImportMap = BTreeMap<String, String>;

/// Result of one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkOutput {
    pub import_map: ImportMap,
    /// Bare specifier to the entry file it resolved to.
    pub package_paths: BTreeMap<String, PathBuf>,
    pub diagnostics: Diagnostics,
}

/// A pending visit: the specifier a module was reached by, and where it
/// resolved.
struct Visit {
    specifier: String,
    location: ModuleLocation,
}

/// Walks one module graph. The visited set lives for a single walk; the
/// module cache may be shared.
pub struct Walker<'a> {
    resolver: Resolver<'a>,
    cache: &'a ModuleCache,
    normalizer: &'a dyn Normalizer,
    visited: FxHashSet<ModuleLocation>,
    bare_owners: FxHashMap<String, ModuleLocation>,
    id_owners: FxHashMap<String, ModuleLocation>,
    output: WalkOutput,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub fn new(config: &'a EngineConfig, cache: &'a ModuleCache, normalizer: &'a dyn Normalizer) -> Self {
        Self {
            resolver: Resolver::new(config),
            cache,
            normalizer,
            visited: FxHashSet::default(),
            bare_owners: FxHashMap::default(),
            id_owners: FxHashMap::default(),
            output: WalkOutput::default(),
        }
    }

    /// Walk the graph reachable from `entry`, resolved against `base_dir`.
    ///
    /// # Errors
    /// Any resolution, load, scan or patch failure aborts the walk; no
    /// partial map is returned.
    pub fn walk(mut self, entry: &str, base_dir: &Path) -> Result<WalkOutput> {
        tracing::debug!(specifier = entry, base = %base_dir.display(), "walking module graph");

        let resolution = self.resolve(entry, base_dir)?;
        let mut stack = vec![Visit {
            specifier: entry.to_string(),
            location: resolution.location,
        }];

        while let Some(visit) = stack.pop() {
            let children = self.visit(&visit)?;
            // reversed so the first import is visited next
            stack.extend(children.into_iter().rev());
        }

        tracing::debug!(
            specifier = entry,
            modules = self.visited.len(),
            keys = self.output.import_map.len(),
            "walk complete"
        );
        Ok(self.output)
    }

    fn resolve(&mut self, specifier: &str, base_dir: &Path) -> Result<Resolution> {
        let resolution = self.resolver.resolve(specifier, base_dir)?;
        if resolution.stage == Stage::CommonJs {
            self.output.diagnostics.push(
                Diagnostic::info(
                    codes::CJS_FALLBACK,
                    format!("'{specifier}' resolved through the CommonJS fallback"),
                )
                .with_path(resolution.location.path()),
            );
        }
        Ok(resolution)
    }

    /// Emit one module and return its children in source order.
    fn visit(&mut self, visit: &Visit) -> Result<Vec<Visit>> {
        if !self.visited.insert(visit.location.clone()) {
            return Ok(Vec::new());
        }

        let record = self.cache.load(&visit.location, &visit.specifier)?;
        let path = visit.location.path();
        let text = self.normalizer.normalize(path, &record.contents)?;
        let references = scan(path, &text)?;

        let mut ids: FxHashMap<&str, String> = FxHashMap::default();
        let mut children = Vec::new();
        for reference in &references {
            if ids.contains_key(reference.specifier.as_str()) {
                continue;
            }
            let resolution = self.resolve(&reference.specifier, visit.location.dir())?;
            let child = self.cache.load(&resolution.location, &reference.specifier)?;
            tracing::trace!(
                from = %visit.location,
                specifier = %reference.specifier,
                id = %child.unique_id,
                "resolved import"
            );
            ids.insert(reference.specifier.as_str(), child.unique_id.clone());
            children.push(Visit {
                specifier: reference.specifier.clone(),
                location: resolution.location,
            });
        }

        let patched = patch(&text, &references, |r| ids.get(r.specifier.as_str()).cloned())?;

        if is_bare(&visit.specifier) {
            self.emit_bare(&visit.specifier, &patched, &visit.location);
        }
        self.emit_id(&record.unique_id, patched, &visit.location);

        Ok(children)
    }

    /// Identical contents at two locations share an id, but their imports
    /// may resolve to different modules. The first visited text keeps the
    /// key; a differing later text only produces a diagnostic.
    fn emit_id(&mut self, id: &str, text: String, location: &ModuleLocation) {
        match self.output.import_map.get(id) {
            Some(existing) if *existing != text => {
                let owner = self
                    .id_owners
                    .get(id)
                    .map_or_else(String::new, |owner| format!(" by {owner}"));
                self.output.diagnostics.push(
                    Diagnostic::warning(
                        codes::DUPLICATE_MODULE_ID,
                        format!("module id '{id}' is already taken{owner}; ignoring {location}"),
                    )
                    .with_path(location.path()),
                );
            }
            Some(_) => {}
            None => {
                self.id_owners.insert(id.to_string(), location.clone());
                self.output.import_map.insert(id.to_string(), text);
            }
        }
    }

    /// First-visited module keeps a bare key; later distinct modules only
    /// produce a diagnostic.
    fn emit_bare(&mut self, specifier: &str, text: &str, location: &ModuleLocation) {
        if let Some(owner) = self.bare_owners.get(specifier) {
            let differs = self.output.import_map.get(specifier).map(String::as_str) != Some(text);
            if differs {
                self.output.diagnostics.push(
                    Diagnostic::warning(
                        codes::DUPLICATE_BARE_KEY,
                        format!("'{specifier}' already maps to {owner}; ignoring {location}"),
                    )
                    .with_path(location.path()),
                );
            }
            return;
        }

        self.bare_owners
            .insert(specifier.to_string(), location.clone());
        self.output
            .import_map
            .insert(specifier.to_string(), text.to_string());
        self.output
            .package_paths
            .insert(specifier.to_string(), location.path().to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{is_unique_id, make_unique_id};
    use crate::normalize::BasicNormalizer;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn package(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join("node_modules").join(name);
        write(
            &dir.join("package.json"),
            &format!(r#"{{"name": "{name}", "type": "module", "main": "index.js"}}"#),
        );
        for (file, contents) in files {
            write(&dir.join(file), contents);
        }
    }

    fn walk(root: &Path, entry: &str) -> Result<WalkOutput> {
        let config = EngineConfig::default();
        let cache = ModuleCache::new();
        let normalizer = BasicNormalizer::default();
        Walker::new(&config, &cache, &normalizer).walk(entry, root)
    }

    #[test]
    fn test_alpha_reexports_beta() {
        let dir = tempdir().unwrap();
        let beta = "export const x = 1;";
        package(
            dir.path(),
            "alpha",
            &[("index.js", "export * from './beta.js';\n"), ("beta.js", beta)],
        );

        let out = walk(dir.path(), "alpha").unwrap();
        let beta_id = make_unique_id("./beta.js", beta);
        let alpha_id = make_unique_id("alpha", "export * from './beta.js';\n");

        assert_eq!(out.import_map.len(), 3);
        assert_eq!(out.import_map[&beta_id], beta);
        let patched = format!("export * from \"{beta_id}\";\n");
        assert_eq!(out.import_map["alpha"], patched);
        assert_eq!(out.import_map[&alpha_id], patched);
        assert!(out.package_paths["alpha"].ends_with("index.js"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_cycle_terminates() {
        let dir = tempdir().unwrap();
        package(dir.path(), "a", &[("index.js", "import 'b';\nexport const a = 1;")]);
        package(dir.path(), "b", &[("index.js", "import 'a';\nexport const b = 1;")]);

        let out = walk(dir.path(), "a").unwrap();
        // a, a-<h>, b, b-<h>
        assert_eq!(out.import_map.len(), 4);
        let ids: Vec<_> = out.import_map.keys().filter(|k| is_unique_id(k)).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_shared_content_collapses_to_one_id() {
        let dir = tempdir().unwrap();
        let util = "export const util = true;";
        package(dir.path(), "x", &[("index.js", "import './lib/util.js';"), ("lib/util.js", util)]);
        package(dir.path(), "y", &[("index.js", "import './util.js';"), ("util.js", util)]);
        package(dir.path(), "app", &[("index.js", "import 'x';\nimport 'y';")]);

        let out = walk(dir.path(), "app").unwrap();
        let util_id = make_unique_id("./util.js", util);
        let quoted = format!("\"{util_id}\"");
        assert_eq!(out.import_map[&util_id], util);
        assert!(out.import_map["x"].contains(&quoted));
        assert!(out.import_map["y"].contains(&quoted));
        assert_eq!(
            out.import_map.values().filter(|v| v.as_str() == util).count(),
            1
        );
    }

    #[test]
    fn test_duplicate_bare_key_first_wins() {
        let dir = tempdir().unwrap();
        package(dir.path(), "dep", &[("index.js", "export const version = 1;")]);
        package(dir.path(), "first", &[("index.js", "import 'dep';")]);
        let second = dir.path().join("node_modules/second");
        write(&second.join("package.json"), r#"{"name": "second", "main": "index.js"}"#);
        write(&second.join("index.js"), "import 'dep';");
        package(&second, "dep", &[("index.js", "export const version = 2;")]);
        package(dir.path(), "app", &[("index.js", "import 'first';\nimport 'second';")]);

        let out = walk(dir.path(), "app").unwrap();
        assert_eq!(out.import_map["dep"], "export const version = 1;");
        assert_eq!(out.diagnostics.with_code(codes::DUPLICATE_BARE_KEY).count(), 1);
        // both versions are still reachable by id
        assert!(out.import_map.values().any(|v| v == "export const version = 2;"));
    }

    #[test]
    fn test_identical_wrappers_over_different_deps() {
        let dir = tempdir().unwrap();
        let wrap = "export * from 'dep';\n";
        package(dir.path(), "dep", &[("index.js", "export const version = 1;")]);
        package(dir.path(), "p1", &[("index.js", "export * from './wrap.js';"), ("wrap.js", wrap)]);
        let p2 = dir.path().join("node_modules/p2");
        package(dir.path(), "p2", &[("index.js", "export * from './wrap.js';"), ("wrap.js", wrap)]);
        package(&p2, "dep", &[("index.js", "export const version = 2;")]);
        package(dir.path(), "app", &[("index.js", "import 'p1';\nimport 'p2';")]);

        let out = walk(dir.path(), "app").unwrap();
        let wrap_id = make_unique_id("./wrap.js", wrap);
        let dep_v1 = make_unique_id("dep", "export const version = 1;");
        assert_eq!(out.import_map[&wrap_id], format!("export * from \"{dep_v1}\";\n"));

        let duplicates: Vec<_> = out.diagnostics.with_code(codes::DUPLICATE_MODULE_ID).collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].path.as_ref().unwrap().starts_with(dunce::canonicalize(&p2).unwrap()));

        // every rewritten literal still names a key of the map
        for text in out.import_map.values() {
            for reference in scan(Path::new("/check.js"), text).unwrap() {
                assert!(out.import_map.contains_key(&reference.specifier));
            }
        }
    }

    #[test]
    fn test_commonjs_fallback_is_reported() {
        let dir = tempdir().unwrap();
        package(dir.path(), "app", &[("index.js", "import './util';"), ("util.js", "export {};")]);

        let out = walk(dir.path(), "app").unwrap();
        assert_eq!(out.diagnostics.with_code(codes::CJS_FALLBACK).count(), 1);
        assert!(out.import_map.contains_key(&make_unique_id("./util", "export {};")));
    }

    #[test]
    fn test_unresolvable_import_aborts() {
        let dir = tempdir().unwrap();
        package(dir.path(), "app", &[("index.js", "import 'not-installed';")]);
        let err = walk(dir.path(), "app").unwrap_err();
        assert_eq!(err.code(), "RESOLUTION_ERROR");
    }

    #[test]
    fn test_require_in_graph_aborts() {
        let dir = tempdir().unwrap();
        package(dir.path(), "app", &[("index.js", "import './cjs.js';"), ("cjs.js", "module.exports = require('x');")]);
        let err = walk(dir.path(), "app").unwrap_err();
        assert_eq!(err.code(), "PARSE_ERROR");
    }
}
