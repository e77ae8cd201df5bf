//! `sourcefiles type-files` command.

use super::{fail_core, print_ok};
use miette::Result;
use sourcefiles_core::Engine;
use std::path::Path;

pub fn run(engine: &Engine, cwd: &Path, specifier: &str, json: bool) -> Result<()> {
    match engine.type_files(specifier, cwd) {
        Ok(types) => {
            tracing::info!(specifier, files = types.files.len(), "type files collected");
            print_ok(&types, json)
        }
        Err(e) => fail_core(&e, json),
    }
}
