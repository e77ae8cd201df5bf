//! `sourcefiles import-map` command.

use super::{fail_core, print_ok};
use miette::Result;
use sourcefiles_core::{Engine, WalkOutput};
use std::collections::BTreeMap;
use std::path::Path;

/// Walk each specifier in command-line order. The engine's module cache is
/// shared by all walks, so a module keeps one id across entries.
pub fn run(engine: &Engine, cwd: &Path, specifiers: &[String], json: bool) -> Result<()> {
    let mut entries: BTreeMap<&str, WalkOutput> = BTreeMap::new();
    for specifier in specifiers {
        match engine.import_map(specifier, cwd) {
            Ok(output) => {
                tracing::info!(
                    specifier = %specifier,
                    keys = output.import_map.len(),
                    "import map built"
                );
                entries.insert(specifier.as_str(), output);
            }
            Err(e) => return fail_core(&e, json),
        }
    }
    print_ok(&entries, json)
}
