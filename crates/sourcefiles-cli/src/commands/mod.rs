//! Subcommand implementations and their shared output contract.
//!
//! Plain mode prints the result as pretty JSON. `--json` mode prints one
//! line: `{"ok": true, "schema_version": 1, "result": ...}` on success or
//! `{"ok": false, "schema_version": 1, "error": {"code", "message"}}` on
//! failure, and exits 1 on failure.

pub mod import_map;
pub mod load;
pub mod scan;
pub mod source_files;
pub mod type_files;

use miette::{IntoDiagnostic, MietteDiagnostic, Result};
use serde::Serialize;

/// Version of the `--json` envelope.
pub const SCHEMA_VERSION: u32 = 1;

/// Error code for an id passed to `load` that has no trigger suffix.
pub const NOT_A_TRIGGER: &str = "NOT_A_TRIGGER";

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson<'a>>,
}

#[derive(Serialize)]
struct ErrorJson<'a> {
    code: &'a str,
    message: &'a str,
}

/// Print a successful result.
pub fn print_ok<T: Serialize>(value: &T, json: bool) -> Result<()> {
    let out = if json {
        serde_json::to_string(&Envelope {
            ok: true,
            schema_version: SCHEMA_VERSION,
            result: Some(value),
            error: None,
        })
    } else {
        serde_json::to_string_pretty(value)
    }
    .into_diagnostic()?;
    println!("{out}");
    Ok(())
}

/// Report a failure with a stable code.
pub fn fail(code: &str, message: &str, json: bool) -> Result<()> {
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            ok: false,
            schema_version: SCHEMA_VERSION,
            result: None,
            error: Some(ErrorJson { code, message }),
        };
        if let Ok(out) = serde_json::to_string(&envelope) {
            println!("{out}");
        }
        std::process::exit(1);
    }
    Err(MietteDiagnostic::new(message.to_string())
        .with_code(code.to_string())
        .into())
}

/// Report a library error.
pub fn fail_core(err: &sourcefiles_core::Error, json: bool) -> Result<()> {
    tracing::debug!(code = err.code(), "request failed");
    fail(err.code(), &err.to_string(), json)
}
