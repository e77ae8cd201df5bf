use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, one per [`Error`] variant.
pub mod codes {
    pub const RESOLUTION_ERROR: &str = "RESOLUTION_ERROR";
    pub const LOAD_ERROR: &str = "LOAD_ERROR";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const PATCH_CONSISTENCY_ERROR: &str = "PATCH_CONSISTENCY_ERROR";
    pub const MANIFEST_PARSE_ERROR: &str = "MANIFEST_PARSE_ERROR";
    pub const CONFIG_READ_ERROR: &str = "CONFIG_READ_ERROR";
    pub const CONFIG_PARSE_ERROR: &str = "CONFIG_PARSE_ERROR";
}

/// Core error type for sourcefiles operations.
///
/// Every variant is fatal for the request that raised it: no partial import
/// map or type map is returned alongside an error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot resolve '{specifier}' from {base}: {reason}")]
    Resolution {
        specifier: String,
        base: PathBuf,
        reason: String,
    },

    #[error("Failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {path} at byte {offset}: {message}")]
    Parse {
        path: PathBuf,
        offset: usize,
        message: String,
    },

    #[error("Inconsistent patch: {message}")]
    PatchConsistency { message: String },

    #[error("Failed to parse package manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    #[must_use]
    pub fn resolution(
        specifier: impl Into<String>,
        base: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            specifier: specifier.into(),
            base: base.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            offset,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn patch(message: impl Into<String>) -> Self {
        Self::PatchConsistency {
            message: message.into(),
        }
    }

    /// Stable SCREAMING_SNAKE_CASE code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => codes::RESOLUTION_ERROR,
            Self::Load { .. } => codes::LOAD_ERROR,
            Self::Parse { .. } => codes::PARSE_ERROR,
            Self::PatchConsistency { .. } => codes::PATCH_CONSISTENCY_ERROR,
            Self::ManifestParse { .. } => codes::MANIFEST_PARSE_ERROR,
            Self::ConfigRead { .. } => codes::CONFIG_READ_ERROR,
            Self::ConfigParse { .. } => codes::CONFIG_PARSE_ERROR,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message_names_specifier_and_base() {
        let err = Error::resolution("left-pad", "/project", "NOT_FOUND");
        let msg = err.to_string();
        assert!(msg.contains("'left-pad'"));
        assert!(msg.contains("/project"));
        assert_eq!(err.code(), "RESOLUTION_ERROR");
    }

    #[test]
    fn test_codes_are_screaming_snake_case() {
        let errors = [
            Error::resolution("a", "/", "x"),
            Error::parse("/a.js", 3, "bad"),
            Error::patch("overlap"),
        ];
        for err in &errors {
            assert!(err
                .code()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }
}
