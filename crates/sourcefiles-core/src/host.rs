//! Build-tool host integration.
//!
//! A host (bundler plugin, dev server) recognizes import ids carrying a
//! reserved suffix, asks the engine for the matching map, and serves the
//! result as an inline data module.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// What a trigger suffix asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// `?sourceFiles`: import map and type map together.
    SourceFiles,
    /// `?typeFiles`: type map only.
    TypeFiles,
    /// `?remapImports`: import map only.
    RemapImports,
}

/// Suffixes, lowercased. Matching ignores ASCII case.
const SUFFIXES: &[(&str, TriggerKind)] = &[
    ("?sourcefiles", TriggerKind::SourceFiles),
    ("?typefiles", TriggerKind::TypeFiles),
    ("?remapimports", TriggerKind::RemapImports),
];

/// An import id with a trigger suffix, split into specifier and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger<'a> {
    pub specifier: &'a str,
    pub kind: TriggerKind,
}

impl<'a> Trigger<'a> {
    /// Recognize a trigger id such as `lodash?typeFiles`.
    ///
    /// Returns `None` for ordinary ids and for a bare suffix with no
    /// specifier.
    #[must_use]
    pub fn parse(id: &'a str) -> Option<Self> {
        let lower = id.to_ascii_lowercase();
        SUFFIXES.iter().find_map(|(suffix, kind)| {
            if !lower.ends_with(suffix) {
                return None;
            }
            let specifier = id.get(..id.len() - suffix.len())?;
            (!specifier.is_empty()).then_some(Self {
                specifier,
                kind: *kind,
            })
        })
    }
}

/// Render `value` as an ES module whose default export is the value.
#[must_use]
pub fn render_data_module(value: &Value) -> String {
    format!("export default {value:#};")
}

/// A string map as a JSON object, keys in map order.
#[must_use]
pub fn map_value(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<_, _>>(),
    )
}
