//! `sourcefiles scan` command: list the import references of one file.

use super::{fail, fail_core, print_ok};
use miette::Result;
use serde::Serialize;
use sourcefiles_core::error::codes;
use sourcefiles_core::{scan, Engine, ImportReference};
use sourcefiles_util::fs::read_utf8;
use std::path::Path;

#[derive(Serialize)]
struct ScanJson<'a> {
    file: String,
    references: &'a [ImportReference],
}

/// Scan `file` (relative to `cwd`) after the engine's normalization, so
/// offsets match the text the walker would patch.
pub fn run(engine: &Engine, cwd: &Path, file: &Path, json: bool) -> Result<()> {
    let path = cwd.join(file);
    let text = match read_utf8(&path) {
        Ok(text) => text,
        Err(e) => {
            return fail(
                codes::LOAD_ERROR,
                &format!("Failed to load {}: {e}", path.display()),
                json,
            )
        }
    };

    let references = engine
        .normalizer()
        .normalize(&path, &text)
        .and_then(|normalized| scan(&path, &normalized));

    match references {
        Ok(references) => print_ok(
            &ScanJson {
                file: path.display().to_string(),
                references: &references,
            },
            json,
        ),
        Err(e) => fail_core(&e, json),
    }
}
