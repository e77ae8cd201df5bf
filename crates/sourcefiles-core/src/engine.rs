//! Top-level engine: one object that owns the configuration and the shared
//! module cache and answers import map and type map requests.

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::host::{map_value, render_data_module, Trigger, TriggerKind};
use crate::loader::ModuleCache;
#[cfg(not(feature = "swc"))]
use crate::normalize::BasicNormalizer;
use crate::normalize::Normalizer;
#[cfg(feature = "swc")]
use crate::normalize::SwcNormalizer;
use crate::typefiles::{collect_type_files, TypeFiles, TypeMap};
use crate::walk::{ImportMap, WalkOutput, Walker};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Import map and type map for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFiles {
    pub import_map: ImportMap,
    pub type_files: TypeMap,
    pub package_paths: BTreeMap<String, PathBuf>,
    pub diagnostics: Diagnostics,
}

pub struct Engine {
    config: EngineConfig,
    cache: Arc<ModuleCache>,
    normalizer: Box<dyn Normalizer>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("modules", &self.cache.len())
            .field("normalizer", &self.normalizer.name())
            .finish()
    }
}

impl Engine {
    /// Engine with a fresh module cache.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_cache(config, Arc::new(ModuleCache::new()))
    }

    /// Engine sharing an existing module cache.
    #[must_use]
    pub fn with_cache(config: EngineConfig, cache: Arc<ModuleCache>) -> Self {
        let normalizer = default_normalizer(&config);
        Self {
            config,
            cache,
            normalizer,
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    #[must_use]
    pub fn normalizer(&self) -> &dyn Normalizer {
        self.normalizer.as_ref()
    }

    /// Walk the module graph of `specifier` as seen from `root`.
    pub fn import_map(&self, specifier: &str, root: &Path) -> Result<WalkOutput> {
        Walker::new(&self.config, &self.cache, self.normalizer.as_ref()).walk(specifier, root)
    }

    /// Collect the declaration files of `specifier` as seen from `root`.
    pub fn type_files(&self, specifier: &str, root: &Path) -> Result<TypeFiles> {
        collect_type_files(&self.config, specifier, root)
    }

    /// Both maps for one package. The walk and the collection run in
    /// parallel; either failing fails the request.
    pub fn source_files(&self, specifier: &str, root: &Path) -> Result<SourceFiles> {
        let (walk, types) = rayon::join(
            || self.import_map(specifier, root),
            || self.type_files(specifier, root),
        );
        let walk = walk?;
        let types = types?;

        let mut diagnostics = walk.diagnostics;
        diagnostics.extend(types.diagnostics);
        Ok(SourceFiles {
            import_map: walk.import_map,
            type_files: types.files,
            package_paths: walk.package_paths,
            diagnostics,
        })
    }

    /// Serve a trigger id (`pkg?sourceFiles`, `pkg?typeFiles`,
    /// `pkg?remapImports`) as a data module. Returns `Ok(None)` for ids
    /// without a trigger suffix.
    pub fn load_trigger(&self, id: &str, root: &Path) -> Result<Option<String>> {
        let Some(trigger) = Trigger::parse(id) else {
            return Ok(None);
        };
        tracing::debug!(specifier = trigger.specifier, kind = ?trigger.kind, "serving trigger");

        let value = match trigger.kind {
            TriggerKind::RemapImports => {
                let walk = self.import_map(trigger.specifier, root)?;
                warn_diagnostics(&walk.diagnostics);
                map_value(&walk.import_map)
            }
            TriggerKind::TypeFiles => {
                let types = self.type_files(trigger.specifier, root)?;
                warn_diagnostics(&types.diagnostics);
                map_value(&types.files)
            }
            TriggerKind::SourceFiles => {
                let files = self.source_files(trigger.specifier, root)?;
                warn_diagnostics(&files.diagnostics);
                json!({
                    "importMap": map_value(&files.import_map),
                    "typeFiles": map_value(&files.type_files),
                })
            }
        };
        Ok(Some(render_data_module(&value)))
    }
}

/// Data modules have no diagnostics channel; surface warnings in the log.
fn warn_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        if diagnostic.severity == crate::diagnostics::Severity::Warning {
            tracing::warn!(code = %diagnostic.code, "{}", diagnostic.message);
        }
    }
}

fn default_normalizer(config: &EngineConfig) -> Box<dyn Normalizer> {
    #[cfg(feature = "swc")]
    {
        Box::new(SwcNormalizer::new(config.strip_source_maps))
    }

    #[cfg(not(feature = "swc"))]
    {
        Box::new(BasicNormalizer::new(config.strip_source_maps))
    }
}
