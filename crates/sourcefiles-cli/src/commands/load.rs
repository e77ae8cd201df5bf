//! `sourcefiles load` command.
//!
//! Serves a trigger id (`pkg?sourceFiles`, `pkg?typeFiles`,
//! `pkg?remapImports`) the way a build-tool host would: as the text of an
//! inline data module.

use super::{fail, fail_core, print_ok, NOT_A_TRIGGER};
use miette::Result;
use serde::Serialize;
use sourcefiles_core::Engine;
use std::path::Path;

#[derive(Serialize)]
struct LoadJson<'a> {
    id: &'a str,
    module: &'a str,
}

pub fn run(engine: &Engine, cwd: &Path, id: &str, json: bool) -> Result<()> {
    match engine.load_trigger(id, cwd) {
        Ok(Some(module)) => {
            if json {
                print_ok(&LoadJson { id, module: &module }, true)
            } else {
                println!("{module}");
                Ok(())
            }
        }
        Ok(None) => fail(
            NOT_A_TRIGGER,
            &format!("'{id}' has no ?sourceFiles, ?typeFiles or ?remapImports suffix"),
            json,
        ),
        Err(e) => fail_core(&e, json),
    }
}
