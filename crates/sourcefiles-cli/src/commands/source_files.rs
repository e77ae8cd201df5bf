//! `sourcefiles source-files` command: import map and type map together.

use super::{fail_core, print_ok};
use miette::Result;
use sourcefiles_core::Engine;
use std::path::Path;

pub fn run(engine: &Engine, cwd: &Path, specifier: &str, json: bool) -> Result<()> {
    match engine.source_files(specifier, cwd) {
        Ok(files) => print_ok(&files, json),
        Err(e) => fail_core(&e, json),
    }
}
