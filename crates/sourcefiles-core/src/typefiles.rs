//! Type declaration collection.
//!
//! Gathers the `package.json` and declaration files of a package, its
//! `@types` shadow package and its runtime dependencies, keyed by a virtual
//! path that places every package directly under the virtual
//! `node_modules` root.

use crate::config::EngineConfig;
use crate::diagnostics::{codes, Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::resolver::{package_dirs, Manifest, ManifestCache, MANIFEST};
use crate::specifier::{PackageSpecifier, SpecifierKind};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use sourcefiles_util::fs::{read_utf8, relative_slash};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Virtual path to file text.
pub type TypeMap = BTreeMap<String, String>;

/// Result of a type file collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeFiles {
    pub files: TypeMap,
    pub diagnostics: Diagnostics,
}

/// A package queued for collection.
struct PendingPackage {
    name: String,
    dir: PathBuf,
}

/// Collect type files for `specifier`, located from `root`.
///
/// Bare specifiers (including deep subpaths) name their package; relative
/// and absolute specifiers use the nearest enclosing `package.json`.
///
/// # Errors
/// Fails if the root package cannot be located, a manifest is malformed, or
/// a collected file cannot be read. Missing dependencies are diagnostics.
pub fn collect_type_files(config: &EngineConfig, specifier: &str, root: &Path) -> Result<TypeFiles> {
    let collector = Collector {
        config,
        manifests: ManifestCache::new(),
        visited: FxHashSet::default(),
        output: TypeFiles::default(),
    };
    collector.run(specifier, root)
}

struct Collector<'a> {
    config: &'a EngineConfig,
    manifests: ManifestCache,
    visited: FxHashSet<PathBuf>,
    output: TypeFiles,
}

impl Collector<'_> {
    fn run(mut self, specifier: &str, root: &Path) -> Result<TypeFiles> {
        let entry = self.locate_root(specifier, root)?;
        tracing::debug!(package = %entry.name, dir = %entry.dir.display(), "collecting type files");

        let mut queue = vec![entry];
        while let Some(pending) = queue.pop() {
            let next = self.collect_package(&pending)?;
            queue.extend(next.into_iter().rev());
        }

        tracing::debug!(files = self.output.files.len(), "type files collected");
        Ok(self.output)
    }

    fn locate_root(&self, specifier: &str, root: &Path) -> Result<PendingPackage> {
        let not_found = |reason: &str| Error::resolution(specifier, root, reason);

        match SpecifierKind::of(specifier) {
            SpecifierKind::Bare => {
                let pkg = PackageSpecifier::parse(specifier).map_err(not_found)?;
                let dir = package_dirs(pkg.name, root)
                    .find(|dir| dir.join(MANIFEST).is_file())
                    .ok_or_else(|| not_found("PACKAGE_NOT_FOUND"))?;
                Ok(PendingPackage {
                    name: pkg.name.to_string(),
                    dir,
                })
            }
            SpecifierKind::Relative | SpecifierKind::Absolute => {
                let manifest = self
                    .manifests
                    .nearest(&root.join(specifier))?
                    .ok_or_else(|| not_found("PACKAGE_NOT_FOUND"))?;
                let dir = manifest.dir().to_path_buf();
                let name = manifest
                    .str_field("name")
                    .map(str::to_string)
                    .or_else(|| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .ok_or_else(|| not_found("PACKAGE_NOT_FOUND"))?;
                Ok(PendingPackage { name, dir })
            }
            SpecifierKind::Url | SpecifierKind::PackageImport => Err(not_found("UNSUPPORTED_SCHEME")),
        }
    }

    /// Collect one package; returns the packages it leads to.
    fn collect_package(&mut self, pending: &PendingPackage) -> Result<Vec<PendingPackage>> {
        let canonical = dunce::canonicalize(&pending.dir).map_err(|source| Error::Load {
            path: pending.dir.clone(),
            source,
        })?;
        if !self.visited.insert(canonical) {
            return Ok(Vec::new());
        }

        let Some(manifest) = self.manifests.in_dir(&pending.dir)? else {
            return Ok(Vec::new());
        };

        let sources = self.declaration_sources(&pending.dir, &manifest);
        let loaded: Vec<(String, String)> = sources
            .into_par_iter()
            .map(|(rel, path)| {
                read_utf8(&path)
                    .map(|contents| (rel, contents))
                    .map_err(|source| Error::Load { path, source })
            })
            .collect::<Result<_>>()?;

        tracing::trace!(package = %pending.name, files = loaded.len(), "package type files");
        for (rel, contents) in loaded {
            let virtual_path = format!("{}{}/{}", self.config.virtual_root, pending.name, rel);
            match self.output.files.entry(virtual_path) {
                Entry::Vacant(slot) => {
                    slot.insert(contents);
                }
                Entry::Occupied(slot) if *slot.get() != contents => {
                    let message = format!("'{}' is already collected from another copy of '{}'", slot.key(), pending.name);
                    self.output.diagnostics.push(
                        Diagnostic::warning(codes::DUPLICATE_TYPE_PATH, message)
                            .with_path(pending.dir.join(&rel)),
                    );
                }
                Entry::Occupied(_) => {}
            }
        }

        Ok(self.linked_packages(pending, &manifest))
    }

    /// Files to read for one package: relative slash path to real path.
    fn declaration_sources(&mut self, dir: &Path, manifest: &Manifest) -> BTreeMap<String, PathBuf> {
        let mut found = BTreeMap::new();
        found.insert(MANIFEST.to_string(), manifest.path.clone());

        if let Some(entry) = manifest.types_entry() {
            let path = dir.join(entry);
            if path.is_file() {
                self.add(dir, &path, &mut found);
            } else {
                self.output.diagnostics.push(
                    Diagnostic::warning(
                        codes::TYPES_ENTRY_MISSING,
                        format!("types entry '{entry}' does not exist"),
                    )
                    .with_path(&manifest.path),
                );
            }
        }

        match manifest.files() {
            Some(entries) => {
                for entry in entries {
                    self.add_files_entry(dir, entry, &mut found);
                }
            }
            None => self.add_tree(dir, dir, &mut found),
        }
        found
    }

    /// One entry of the manifest `files` list: a file, a directory, or a glob.
    fn add_files_entry(&self, dir: &Path, entry: &str, found: &mut BTreeMap<String, PathBuf>) {
        let entry = entry.trim_start_matches("./");
        if entry.is_empty() || entry.starts_with('!') {
            return;
        }

        if entry.contains(['*', '?', '[']) {
            let pattern = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), entry);
            let Ok(paths) = glob::glob(&pattern) else {
                return;
            };
            for path in paths.flatten() {
                if path.is_dir() {
                    self.add_tree(dir, &path, found);
                } else if self.is_declaration(&path) {
                    self.add(dir, &path, found);
                }
            }
            return;
        }

        let path = dir.join(entry);
        if path.is_dir() {
            self.add_tree(dir, &path, found);
        } else if path.is_file() && self.is_declaration(&path) {
            self.add(dir, &path, found);
        }
    }

    /// Every declaration file below `start`, skipping nested `node_modules`.
    fn add_tree(&self, dir: &Path, start: &Path, found: &mut BTreeMap<String, PathBuf>) {
        let walker = WalkDir::new(start)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != "node_modules");

        for entry in walker.filter_map(std::result::Result::ok) {
            if entry.file_type().is_file() && self.is_declaration(entry.path()) {
                self.add(dir, entry.path(), found);
            }
        }
    }

    fn add(&self, dir: &Path, path: &Path, found: &mut BTreeMap<String, PathBuf>) {
        let Some(rel) = relative_slash(dir, path) else {
            return;
        };
        if rel.split('/').any(|segment| segment == "node_modules") {
            return;
        }
        found.entry(rel).or_insert_with(|| path.to_path_buf());
    }

    fn is_declaration(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.config.is_declaration(&name.to_string_lossy()))
    }

    /// The `@types` shadow package and runtime dependencies of a package.
    fn linked_packages(&mut self, pending: &PendingPackage, manifest: &Manifest) -> Vec<PendingPackage> {
        let mut linked = Vec::new();

        if self.config.follow_types_packages && !pending.name.starts_with("@types/") {
            if let Ok(pkg) = PackageSpecifier::parse(&pending.name) {
                let types_name = pkg.types_package();
                if let Some(dir) = find_package(&types_name, &pending.dir) {
                    linked.push(PendingPackage {
                        name: types_name,
                        dir,
                    });
                }
            }
        }

        for dep in manifest.dependencies() {
            match find_package(dep, &pending.dir) {
                Some(dir) => linked.push(PendingPackage {
                    name: dep.to_string(),
                    dir,
                }),
                None => self.output.diagnostics.push(
                    Diagnostic::warning(
                        codes::TYPE_DEPENDENCY_MISSING,
                        format!("dependency '{dep}' of '{}' has no package.json", pending.name),
                    )
                    .with_path(&manifest.path),
                ),
            }
        }

        linked
    }
}

/// Nearest installed package `name` (with a manifest) visible from `from`.
fn find_package(name: &str, from: &Path) -> Option<PathBuf> {
    package_dirs(name, from).find(|dir| dir.join(MANIFEST).is_file())
}
