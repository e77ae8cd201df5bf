//! Module resolver.
//!
//! Resolution runs in two explicit stages:
//! 1. **ESM** - `import`-conditioned exports, `module`/`main` entry points,
//!    exact file paths (no extension probing).
//! 2. **CommonJS** - `require`-conditioned exports, `main` field, extension
//!    probing and directory `index.*` files, for packages that lack modern
//!    export maps.
//!
//! Each stage yields a typed [`StageOutcome`]; [`Resolver::resolve`] only
//! fails when both stages are unresolved.

mod exports;
mod manifest;

pub use exports::{resolve_exports, resolve_imports};
pub use manifest::{package_dirs, Manifest, ManifestCache, MANIFEST};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::specifier::{PackageSpecifier, SpecifierKind};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Canonical absolute path of a module file; the identity key for
/// de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleLocation(PathBuf);

impl ModuleLocation {
    /// Canonicalize `path` into a location.
    pub fn from_path(path: &Path) -> Result<Self> {
        dunce::canonicalize(path)
            .map(Self)
            .map_err(|source| Error::Load {
                path: path.to_path_buf(),
                source,
            })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Directory used as the base for specifiers imported by this module.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.0.parent().unwrap_or(&self.0)
    }
}

impl fmt::Display for ModuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Reason codes for an unresolved stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    SpecifierInvalid,
    UnsupportedScheme,
    NotFound,
    IsDirectory,
    PackageNotFound,
    PackageEntryNotFound,
    ExportsNotFound,
    ExportsTargetNotFound,
    ImportsNotFound,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SpecifierInvalid => "SPECIFIER_INVALID",
            Self::UnsupportedScheme => "UNSUPPORTED_SCHEME",
            Self::NotFound => "NOT_FOUND",
            Self::IsDirectory => "IS_DIRECTORY",
            Self::PackageNotFound => "PACKAGE_NOT_FOUND",
            Self::PackageEntryNotFound => "PACKAGE_ENTRY_NOT_FOUND",
            Self::ExportsNotFound => "EXPORTS_NOT_FOUND",
            Self::ExportsTargetNotFound => "EXPORTS_TARGET_NOT_FOUND",
            Self::ImportsNotFound => "IMPORTS_NOT_FOUND",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a single resolution stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Resolved(PathBuf),
    Unresolved(ReasonCode),
}

impl StageOutcome {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Which stage produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Esm,
    CommonJs,
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub location: ModuleLocation,
    pub stage: Stage,
}

/// Two-stage module resolver.
#[derive(Debug)]
pub struct Resolver<'a> {
    config: &'a EngineConfig,
    manifests: ManifestCache,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            manifests: ManifestCache::new(),
        }
    }

    /// Resolve `spec` imported from a module in `base_dir`.
    ///
    /// Tries the ESM stage first, then the CommonJS stage. Fails with
    /// [`Error::Resolution`] naming both stage reasons.
    pub fn resolve(&self, spec: &str, base_dir: &Path) -> Result<Resolution> {
        let esm = self.resolve_esm(spec, base_dir)?;
        let (path, stage, esm_reason) = match esm {
            StageOutcome::Resolved(path) => (path, Stage::Esm, None),
            StageOutcome::Unresolved(esm_reason) => match self.resolve_cjs(spec, base_dir)? {
                StageOutcome::Resolved(path) => (path, Stage::CommonJs, Some(esm_reason)),
                StageOutcome::Unresolved(cjs_reason) => {
                    return Err(Error::resolution(
                        spec,
                        base_dir,
                        format!("esm: {esm_reason}, commonjs: {cjs_reason}"),
                    ));
                }
            },
        };

        if let Some(reason) = esm_reason {
            tracing::debug!(specifier = spec, base = %base_dir.display(), %reason, "falling back to commonjs resolution");
        }

        Ok(Resolution {
            location: ModuleLocation::from_path(&path)?,
            stage,
        })
    }

    /// ESM stage: exact files, `import`-conditioned exports.
    pub fn resolve_esm(&self, spec: &str, base_dir: &Path) -> Result<StageOutcome> {
        self.resolve_stage(spec, base_dir, Stage::Esm)
    }

    /// CommonJS stage: `require`-conditioned exports, probing, `main`.
    pub fn resolve_cjs(&self, spec: &str, base_dir: &Path) -> Result<StageOutcome> {
        self.resolve_stage(spec, base_dir, Stage::CommonJs)
    }

    fn conditions(&self, stage: Stage) -> &[String] {
        match stage {
            Stage::Esm => &self.config.esm_conditions,
            Stage::CommonJs => &self.config.cjs_conditions,
        }
    }

    fn resolve_stage(&self, spec: &str, base_dir: &Path, stage: Stage) -> Result<StageOutcome> {
        if spec.is_empty() {
            return Ok(StageOutcome::Unresolved(ReasonCode::SpecifierInvalid));
        }
        match SpecifierKind::of(spec) {
            SpecifierKind::PackageImport => self.resolve_package_import(spec, base_dir, stage),
            SpecifierKind::Relative | SpecifierKind::Absolute => {
                Ok(self.resolve_path(&base_dir.join(spec), stage))
            }
            SpecifierKind::Url => match Url::parse(spec) {
                Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                    Ok(path) => Ok(self.resolve_path(&path, stage)),
                    Err(()) => Ok(StageOutcome::Unresolved(ReasonCode::SpecifierInvalid)),
                },
                _ => Ok(StageOutcome::Unresolved(ReasonCode::UnsupportedScheme)),
            },
            SpecifierKind::Bare => self.resolve_bare(spec, base_dir, stage),
        }
    }

    /// Resolve a filesystem path. The ESM stage requires an exact file.
    fn resolve_path(&self, path: &Path, stage: Stage) -> StageOutcome {
        match stage {
            Stage::Esm if path.is_file() => StageOutcome::Resolved(path.to_path_buf()),
            Stage::Esm if path.is_dir() => StageOutcome::Unresolved(ReasonCode::IsDirectory),
            Stage::Esm => StageOutcome::Unresolved(ReasonCode::NotFound),
            Stage::CommonJs => self
                .load_as_file(path)
                .or_else(|| self.load_as_directory(path))
                .map_or(StageOutcome::Unresolved(ReasonCode::NotFound), StageOutcome::Resolved),
        }
    }

    /// Exact file, then each probe extension appended.
    fn load_as_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        let name = path.file_name()?;
        self.config
            .extensions
            .iter()
            .map(|ext| {
                let mut probe = name.to_os_string();
                probe.push(ext);
                path.with_file_name(probe)
            })
            .find(|candidate| candidate.is_file())
    }

    /// `package.json` main, then `index.*`.
    fn load_as_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        if let Ok(Some(manifest)) = self.manifests.in_dir(dir) {
            if let Some(main) = manifest.str_field("main") {
                let main_path = dir.join(main);
                if let Some(found) = self
                    .load_as_file(&main_path)
                    .or_else(|| self.load_index(&main_path))
                {
                    return Some(found);
                }
            }
        }
        self.load_index(dir)
    }

    fn load_index(&self, dir: &Path) -> Option<PathBuf> {
        self.config
            .extensions
            .iter()
            .map(|ext| dir.join(format!("index{ext}")))
            .find(|candidate| candidate.is_file())
    }

    fn resolve_bare(&self, spec: &str, base_dir: &Path, stage: Stage) -> Result<StageOutcome> {
        let Ok(pkg) = PackageSpecifier::parse(spec) else {
            return Ok(StageOutcome::Unresolved(ReasonCode::SpecifierInvalid));
        };

        let mut last = StageOutcome::Unresolved(ReasonCode::PackageNotFound);
        for pkg_dir in package_dirs(pkg.name, base_dir) {
            last = self.resolve_in_package(&pkg_dir, pkg.subpath, stage)?;
            // ESM stops at the first package directory found; CommonJS keeps walking up.
            if stage == Stage::Esm || last.is_resolved() {
                return Ok(last);
            }
        }
        Ok(last)
    }

    fn resolve_in_package(
        &self,
        pkg_dir: &Path,
        subpath: Option<&str>,
        stage: Stage,
    ) -> Result<StageOutcome> {
        let manifest = self.manifests.in_dir(pkg_dir)?;

        if let Some(exports) = manifest.as_ref().and_then(|m| m.exports()) {
            let key = subpath.map_or_else(|| ".".to_string(), |s| format!("./{s}"));
            let Some(target) = resolve_exports(exports, &key, self.conditions(stage)) else {
                return Ok(StageOutcome::Unresolved(ReasonCode::ExportsNotFound));
            };
            let target_path = pkg_dir.join(target.trim_start_matches("./"));
            return Ok(if target_path.is_file() {
                StageOutcome::Resolved(target_path)
            } else {
                StageOutcome::Unresolved(ReasonCode::ExportsTargetNotFound)
            });
        }

        if let Some(sub) = subpath {
            return Ok(self.resolve_path(&pkg_dir.join(sub), stage));
        }

        match stage {
            Stage::Esm => {
                let entry = manifest.as_ref().and_then(|m| {
                    m.str_field("module")
                        .map(|module| pkg_dir.join(module))
                        .filter(|p| p.is_file())
                        .or_else(|| self.legacy_main(pkg_dir, m.str_field("main")))
                });
                let entry = entry.or_else(|| {
                    let index = pkg_dir.join("index.js");
                    index.is_file().then_some(index)
                });
                Ok(entry.map_or(
                    StageOutcome::Unresolved(ReasonCode::PackageEntryNotFound),
                    StageOutcome::Resolved,
                ))
            }
            Stage::CommonJs => Ok(self
                .load_as_directory(pkg_dir)
                .map_or(
                    StageOutcome::Unresolved(ReasonCode::PackageEntryNotFound),
                    StageOutcome::Resolved,
                )),
        }
    }

    /// Node's legacy `main` lookup for packages without `exports`.
    fn legacy_main(&self, pkg_dir: &Path, main: Option<&str>) -> Option<PathBuf> {
        let main = pkg_dir.join(main?);
        [
            main.clone(),
            PathBuf::from(format!("{}.js", main.display())),
            main.join("index.js"),
        ]
        .into_iter()
        .find(|candidate| candidate.is_file())
    }

    /// `#`-prefixed specifiers via the nearest manifest's `imports` field.
    fn resolve_package_import(
        &self,
        spec: &str,
        base_dir: &Path,
        stage: Stage,
    ) -> Result<StageOutcome> {
        let Some(manifest) = self.manifests.nearest(base_dir)? else {
            return Ok(StageOutcome::Unresolved(ReasonCode::ImportsNotFound));
        };
        let Some(target) = manifest
            .imports()
            .and_then(|imports| resolve_imports(imports, spec, self.conditions(stage)))
        else {
            return Ok(StageOutcome::Unresolved(ReasonCode::ImportsNotFound));
        };

        let pkg_dir = manifest.dir().to_path_buf();
        if let Some(relative) = target.strip_prefix("./") {
            return Ok(self.resolve_path(&pkg_dir.join(relative), stage));
        }
        self.resolve_bare(&target, &pkg_dir, stage)
    }
}
