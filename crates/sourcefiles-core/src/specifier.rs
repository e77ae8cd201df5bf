//! Specifier classification and package-name parsing.

use url::Url;

/// Kind of module specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// `./x`, `../x`, `.`
    Relative,
    /// `/abs/x` (or a Windows drive path)
    Absolute,
    /// `file:///x`, `https://x`, `node:fs`
    Url,
    /// Package-internal import: `#internal/x`
    PackageImport,
    /// Plain package name, optionally with a subpath: `lodash`, `@scope/pkg/sub`
    Bare,
}

impl SpecifierKind {
    #[must_use]
    pub fn of(spec: &str) -> Self {
        if spec.starts_with('.') {
            Self::Relative
        } else if spec.starts_with('#') {
            Self::PackageImport
        } else if is_absolute_path(spec) {
            Self::Absolute
        } else if Url::parse(spec).is_ok() {
            Self::Url
        } else {
            Self::Bare
        }
    }
}

/// Whether the specifier is a bare package specifier.
#[must_use]
pub fn is_bare(spec: &str) -> bool {
    SpecifierKind::of(spec) == SpecifierKind::Bare
}

fn is_absolute_path(spec: &str) -> bool {
    if spec.starts_with('/') || spec.starts_with("\\\\") {
        return true;
    }

    // Windows absolute: C:\, D:/
    let bytes = spec.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// A bare specifier split into package name and subpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpecifier<'a> {
    /// Package name, including scope: `lodash`, `@scope/pkg`.
    pub name: &'a str,
    /// Subpath after the package name, without leading slash: `fp`, `dist/x.js`.
    pub subpath: Option<&'a str>,
}

impl<'a> PackageSpecifier<'a> {
    /// Split a bare specifier, validating the package name.
    ///
    /// Package names cannot start with `.`, contain percent-encoding or `\`
    /// separators, and scoped names need both scope and name segments.
    pub fn parse(spec: &'a str) -> Result<Self, &'static str> {
        let mut separator = spec.find('/');
        if spec.starts_with('@') {
            match separator {
                Some(first) if first > 1 => {
                    separator = spec[first + 1..].find('/').map(|i| first + 1 + i);
                    if spec.len() == first + 1 || separator == Some(first + 1) {
                        return Err("SPECIFIER_INVALID");
                    }
                }
                _ => return Err("SPECIFIER_INVALID"),
            }
        }

        let (name, subpath) = match separator {
            Some(i) => (&spec[..i], Some(&spec[i + 1..])),
            None => (spec, None),
        };

        if name.is_empty() || name.starts_with('.') || name.contains('%') || name.contains('\\') {
            return Err("SPECIFIER_INVALID");
        }

        Ok(Self {
            name,
            subpath: subpath.filter(|s| !s.is_empty()),
        })
    }

    /// Name of the DefinitelyTyped shadow package for this package.
    ///
    /// `lodash` maps to `@types/lodash`, `@scope/pkg` to `@types/scope__pkg`.
    #[must_use]
    pub fn types_package(&self) -> String {
        match self.name.strip_prefix('@').and_then(|s| s.split_once('/')) {
            Some((scope, name)) => format!("@types/{scope}__{name}"),
            None => format!("@types/{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(SpecifierKind::of("./beta.js"), SpecifierKind::Relative);
        assert_eq!(SpecifierKind::of("../lib/x"), SpecifierKind::Relative);
        assert_eq!(SpecifierKind::of("/abs/x.js"), SpecifierKind::Absolute);
        assert_eq!(SpecifierKind::of("C:\\x\\y.js"), SpecifierKind::Absolute);
        assert_eq!(SpecifierKind::of("file:///x.js"), SpecifierKind::Url);
        assert_eq!(SpecifierKind::of("https://foo.js?x=y"), SpecifierKind::Url);
        assert_eq!(SpecifierKind::of("lodash"), SpecifierKind::Bare);
        assert_eq!(SpecifierKind::of("@reactively/core"), SpecifierKind::Bare);
        assert_eq!(SpecifierKind::of("#internal"), SpecifierKind::PackageImport);
    }

    #[test]
    fn test_subpath_specifier_is_bare() {
        assert!(is_bare("stoneberry/scan"));
        assert!(!is_bare("./scan"));
        assert!(!is_bare("#scan"));
    }

    #[test]
    fn test_parse_plain_and_subpath() {
        let p = PackageSpecifier::parse("lodash").unwrap();
        assert_eq!(p.name, "lodash");
        assert_eq!(p.subpath, None);

        let p = PackageSpecifier::parse("lodash/fp/map").unwrap();
        assert_eq!(p.name, "lodash");
        assert_eq!(p.subpath, Some("fp/map"));
    }

    #[test]
    fn test_parse_scoped() {
        let p = PackageSpecifier::parse("@scope/pkg").unwrap();
        assert_eq!(p.name, "@scope/pkg");
        assert_eq!(p.subpath, None);

        let p = PackageSpecifier::parse("@scope/pkg/sub/x.js").unwrap();
        assert_eq!(p.name, "@scope/pkg");
        assert_eq!(p.subpath, Some("sub/x.js"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PackageSpecifier::parse("@scope").is_err());
        assert!(PackageSpecifier::parse("@/pkg").is_err());
        assert!(PackageSpecifier::parse("@scope/").is_err());
        assert!(PackageSpecifier::parse("%20pkg").is_err());
        assert!(PackageSpecifier::parse("a\\b").is_err());
    }

    #[test]
    fn test_types_package() {
        assert_eq!(
            PackageSpecifier::parse("lodash").unwrap().types_package(),
            "@types/lodash"
        );
        assert_eq!(
            PackageSpecifier::parse("@scope/pkg/sub").unwrap().types_package(),
            "@types/scope__pkg"
        );
    }
}
