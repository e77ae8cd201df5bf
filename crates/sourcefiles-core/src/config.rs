use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default conditions for the ESM resolution stage.
pub const DEFAULT_ESM_CONDITIONS: &[&str] = &["import", "node", "default"];

/// Default conditions for the CommonJS fallback stage.
pub const DEFAULT_CJS_CONDITIONS: &[&str] = &["require", "node", "default"];

/// Extensions probed by the CommonJS stage (in order).
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".json"];

/// File suffixes treated as type declarations.
pub const DEFAULT_DECLARATION_SUFFIXES: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

/// Prefix of every type map key.
pub const DEFAULT_VIRTUAL_ROOT: &str = "file:///node_modules/";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Export conditions matched by the ESM stage.
    pub esm_conditions: Vec<String>,

    /// Export conditions matched by the CommonJS stage.
    pub cjs_conditions: Vec<String>,

    /// Extensions probed by the CommonJS stage.
    pub extensions: Vec<String>,

    /// Suffixes identifying declaration files.
    pub declaration_suffixes: Vec<String>,

    /// Prefix for synthetic type map paths.
    pub virtual_root: String,

    /// Strip `sourceMappingURL` trailer comments before scanning.
    pub strip_source_maps: bool,

    /// Follow `@types/<pkg>` shadow packages when collecting type files.
    pub follow_types_packages: bool,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            esm_conditions: to_strings(DEFAULT_ESM_CONDITIONS),
            cjs_conditions: to_strings(DEFAULT_CJS_CONDITIONS),
            extensions: to_strings(DEFAULT_EXTENSIONS),
            declaration_suffixes: to_strings(DEFAULT_DECLARATION_SUFFIXES),
            virtual_root: DEFAULT_VIRTUAL_ROOT.to_string(),
            strip_source_maps: true,
            follow_types_packages: true,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn with_esm_conditions(mut self, conditions: &[&str]) -> Self {
        self.esm_conditions = to_strings(conditions);
        self
    }

    #[must_use]
    pub fn with_virtual_root(mut self, root: impl Into<String>) -> Self {
        self.virtual_root = root.into();
        self
    }

    #[must_use]
    pub fn with_strip_source_maps(mut self, strip: bool) -> Self {
        self.strip_source_maps = strip;
        self
    }

    #[must_use]
    pub fn with_follow_types_packages(mut self, follow: bool) -> Self {
        self.follow_types_packages = follow;
        self
    }

    /// Whether `path` ends in one of the declaration suffixes.
    #[must_use]
    pub fn is_declaration(&self, path: &str) -> bool {
        self.declaration_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
    }
}
