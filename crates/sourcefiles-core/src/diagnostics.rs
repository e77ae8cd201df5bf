//! Structured, non-fatal findings returned alongside results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stable diagnostic codes.
pub mod codes {
    /// Two distinct modules claimed the same bare specifier key.
    pub const DUPLICATE_BARE_KEY: &str = "DUPLICATE_BARE_KEY";
    /// Identical module contents produced different patched text; the
    /// first visited text keeps the id.
    pub const DUPLICATE_MODULE_ID: &str = "DUPLICATE_MODULE_ID";
    /// Two package copies mapped a file to the same virtual path.
    pub const DUPLICATE_TYPE_PATH: &str = "DUPLICATE_TYPE_PATH";
    /// A dependency's package manifest could not be located.
    pub const TYPE_DEPENDENCY_MISSING: &str = "TYPE_DEPENDENCY_MISSING";
    /// ESM resolution failed and the CommonJS stage was used instead.
    pub const CJS_FALLBACK: &str = "CJS_FALLBACK";
    /// A declaration file path listed by a manifest did not exist.
    pub const TYPES_ENTRY_MISSING: &str = "TYPES_ENTRY_MISSING";
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

/// A single structured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Diagnostic {
    #[must_use]
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code: code.to_string(),
            message: message.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Ordered list of diagnostics accumulated during one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            code = %diagnostic.code,
            severity = diagnostic.severity.as_str(),
            "{}",
            diagnostic.message
        );
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Diagnostics carrying the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.0.iter().filter(move |d| d.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_filter_by_code() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(codes::DUPLICATE_BARE_KEY, "dup"));
        diags.push(Diagnostic::info(codes::CJS_FALLBACK, "fallback").with_path("/a.js"));

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.with_code(codes::CJS_FALLBACK).count(), 1);
        assert_eq!(
            diags.with_code(codes::CJS_FALLBACK).next().unwrap().path,
            Some(PathBuf::from("/a.js"))
        );
    }

    #[test]
    fn test_serializes_as_array() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(codes::TYPE_DEPENDENCY_MISSING, "missing"));
        let json = serde_json::to_value(&diags).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["severity"], "warning");
        assert_eq!(json[0]["code"], "TYPE_DEPENDENCY_MISSING");
        assert!(json[0].get("path").is_none());
    }
}
