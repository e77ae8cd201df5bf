//! Content-addressed module ids.
//!
//! A module id is `<shortName>-<hash>`: a readable name derived from the
//! specifier plus a 7-character prefix of the content hash. Identical
//! contents reached through specifiers with the same short name collapse to
//! one id; different contents never share an id short of a hash collision.

use crate::specifier::SpecifierKind;
use sourcefiles_util::hash::{short_hash, SHORT_HASH_LEN};

/// Short name used when a specifier has no safe characters left.
pub const PLACEHOLDER_NAME: &str = "module";

/// Compute the unique id for a module loaded through `specifier`.
///
/// `contents` must be the module's original loaded text (before any
/// normalization or patching).
#[must_use]
pub fn make_unique_id(specifier: &str, contents: &str) -> String {
    format!("{}-{}", short_name(specifier), short_hash(contents.as_bytes()))
}

/// Derive the readable part of a module id.
///
/// Bare and `#` specifiers keep their final path segment (without the `#`).
/// Relative, absolute and URL specifiers keep their file name minus its final
/// extension. The result is truncated at the first character outside
/// `[A-Za-z0-9_.-]`.
#[must_use]
pub fn short_name(specifier: &str) -> String {
    let last_segment = specifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(specifier)
        .trim_start_matches('#');

    let safe: String = last_segment
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let name = match SpecifierKind::of(specifier) {
        SpecifierKind::Bare | SpecifierKind::PackageImport => safe.as_str(),
        _ => strip_extension(&safe),
    };

    if name.is_empty() || name.chars().all(|c| c == '.') {
        PLACEHOLDER_NAME.to_string()
    } else {
        name.to_string()
    }
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(i) => &file_name[..i],
    }
}

/// Whether `id` has the `<name>-<7 hex chars>` shape of a module id.
#[must_use]
pub fn is_unique_id(id: &str) -> bool {
    let Some((name, hash)) = id.rsplit_once('-') else {
        return false;
    };
    !name.is_empty()
        && hash.len() == SHORT_HASH_LEN
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_import() {
        assert_eq!(make_unique_id("foo", "hello world"), "foo-d74981e");
    }

    #[test]
    fn test_relative_import_drops_extension() {
        assert_eq!(make_unique_id("./foo.js", "hello world"), "foo-d74981e");
        assert_eq!(short_name("../lib/beta.js"), "beta");
        assert_eq!(short_name("./x.min.js"), "x.min");
    }

    #[test]
    fn test_url_drops_query() {
        assert_eq!(short_name("https://cdn.test/foo.js?x=y"), "foo");
        assert_eq!(short_name("file:///pkg/dist/index.mjs"), "index");
    }

    #[test]
    fn test_bare_uses_final_segment() {
        assert_eq!(short_name("@reactively/core"), "core");
        assert_eq!(short_name("stoneberry/scan"), "scan");
        assert_eq!(short_name("lodash.merge"), "lodash.merge");
    }

    #[test]
    fn test_package_import_drops_hash() {
        assert_eq!(short_name("#internal"), "internal");
        assert_eq!(short_name("#utils/fmt"), "fmt");
    }

    #[test]
    fn test_truncates_at_disallowed_character() {
        assert_eq!(short_name("pkg+extra"), "pkg");
        assert_eq!(short_name("./a b.js"), "a");
    }

    #[test]
    fn test_placeholder_when_nothing_safe() {
        assert_eq!(short_name("./"), PLACEHOLDER_NAME);
        assert_eq!(short_name("+x"), PLACEHOLDER_NAME);
        assert_eq!(short_name("https://cdn.test/?q=1"), PLACEHOLDER_NAME);
    }

    #[test]
    fn test_deterministic_and_content_sensitive() {
        let a = make_unique_id("./beta.js", "export const x = 1;");
        let b = make_unique_id("../other/beta.js", "export const x = 1;");
        let c = make_unique_id("./beta.js", "export const x = 2;");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, make_unique_id("./beta.js", "export const x = 1;"));
    }

    #[test]
    fn test_is_unique_id() {
        assert!(is_unique_id("beta-d74981e"));
        assert!(is_unique_id("lodash.merge-0a1b2c3"));
        assert!(!is_unique_id("beta"));
        assert!(!is_unique_id("beta-d74981"));
        assert!(!is_unique_id("beta-D74981E"));
        assert!(!is_unique_id("-d74981e"));
    }
}
