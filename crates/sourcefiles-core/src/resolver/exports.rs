//! Package.json `exports` / `imports` field evaluation.
//!
//! Implements the Node.js target resolution rules that matter for import
//! maps:
//! - String, array and condition-object targets
//! - Root (`"."`) and subpath (`"./feature"`) keys
//! - Pattern keys with a single `*` wildcard
//! - Condition objects evaluated in manifest key order

use serde_json::{Map, Value};

/// Evaluate an `exports` field for `subpath` (`"."` or `"./feature"`).
///
/// Returns the package-relative target (starting with `"./"`) if the subpath
/// is exported under the given conditions.
#[must_use]
pub fn resolve_exports(exports: &Value, subpath: &str, conditions: &[String]) -> Option<String> {
    match exports {
        Value::Object(obj) if has_subpath_keys(obj) => resolve_in_map(obj, subpath, conditions),
        // String, array, or a root-level conditions object: sugar for { ".": exports }
        _ if subpath == "." => resolve_target(exports, None, conditions),
        _ => None,
    }
}

/// Evaluate an `imports` field for a `#`-prefixed specifier.
///
/// Targets may be package-relative (`"./src/x.js"`) or bare package
/// specifiers (`"lodash"`); both are returned as-is.
#[must_use]
pub fn resolve_imports(imports: &Value, spec: &str, conditions: &[String]) -> Option<String> {
    let obj = imports.as_object()?;
    let (target, star) = match_key(obj, spec)?;
    resolve_import_target(target, star.as_deref(), conditions)
}

/// Whether an exports object maps subpaths (keys starting with `.`) rather
/// than conditions.
fn has_subpath_keys(obj: &Map<String, Value>) -> bool {
    obj.keys().any(|k| k.starts_with('.'))
}

fn resolve_in_map(obj: &Map<String, Value>, subpath: &str, conditions: &[String]) -> Option<String> {
    let (target, star) = match_key(obj, subpath)?;
    resolve_target(target, star.as_deref(), conditions)
}

/// Find the entry for `key` in a subpath map: exact keys first, then the
/// most specific single-`*` pattern.
///
/// Returns the target and the text matched by `*`, if any.
fn match_key<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<(&'a Value, Option<String>)> {
    if let Some(target) = obj.get(key) {
        if !key.contains('*') {
            return Some((target, None));
        }
    }

    let mut best: Option<(&str, &Value, String)> = None;
    for (pattern, target) in obj {
        if pattern.matches('*').count() != 1 {
            continue;
        }
        let Some(star_value) = match_pattern(pattern, key) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((current, _, _)) => pattern.len() > current.len(),
        };
        if better {
            best = Some((pattern.as_str(), target, star_value));
        }
    }

    best.map(|(_, target, star)| (target, Some(star)))
}

/// Match a pattern key against a subpath.
///
/// Returns the `*` substitution value if matched.
/// E.g., pattern `"./features/*.js"` with subpath `"./features/x.js"` returns `Some("x")`.
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let (prefix, suffix) = pattern.split_once('*')?;

    if !subpath.starts_with(prefix) || !subpath.ends_with(suffix) {
        return None;
    }
    if subpath.len() < prefix.len() + suffix.len() {
        return None;
    }

    let star_value = &subpath[prefix.len()..subpath.len() - suffix.len()];
    if star_value.is_empty() {
        return None;
    }

    Some(star_value.to_string())
}

/// Resolve an exports target: string, array of fallbacks, or conditions
/// object. Only package-relative string targets are valid.
fn resolve_target(target: &Value, star: Option<&str>, conditions: &[String]) -> Option<String> {
    match target {
        Value::String(s) => {
            if !s.starts_with("./") {
                return None;
            }
            substitute(s, star)
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_target(item, star, conditions)),
        Value::Object(obj) => select_condition(obj, conditions)
            .find_map(|value| resolve_target(value, star, conditions)),
        _ => None,
    }
}

/// Like [`resolve_target`], but bare package targets are also allowed.
fn resolve_import_target(target: &Value, star: Option<&str>, conditions: &[String]) -> Option<String> {
    match target {
        Value::String(s) if s.starts_with("./") => substitute(s, star),
        Value::String(s) if !s.starts_with('.') && !s.starts_with('/') && !s.contains("://") => {
            substitute(s, star)
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_import_target(item, star, conditions)),
        Value::Object(obj) => select_condition(obj, conditions)
            .find_map(|value| resolve_import_target(value, star, conditions)),
        _ => None,
    }
}

/// Condition values whose key is `default` or in `conditions`, in manifest
/// key order.
fn select_condition<'a>(
    obj: &'a Map<String, Value>,
    conditions: &'a [String],
) -> impl Iterator<Item = &'a Value> + 'a {
    obj.iter()
        .filter(move |(key, _)| key.as_str() == "default" || conditions.iter().any(|c| c == *key))
        .map(|(_, value)| value)
}

/// Substitute `*` in a target and reject path traversal.
fn substitute(target: &str, star: Option<&str>) -> Option<String> {
    let result = match star {
        Some(value) => target.replace('*', value),
        None => target.to_string(),
    };

    if result
        .split('/')
        .skip(1)
        .any(|segment| segment == ".." || segment == "." || segment == "node_modules")
    {
        return None;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn esm() -> Vec<String> {
        vec!["import".into(), "node".into(), "default".into()]
    }

    fn cjs() -> Vec<String> {
        vec!["require".into(), "node".into(), "default".into()]
    }

    #[test]
    fn test_exports_string_root() {
        let exports = json!("./dist/index.js");
        assert_eq!(
            resolve_exports(&exports, ".", &esm()),
            Some("./dist/index.js".to_string())
        );
        assert_eq!(resolve_exports(&exports, "./other", &esm()), None);
    }

    #[test]
    fn test_exports_conditions_follow_key_order() {
        let exports = json!({
            ".": {
                "require": "./cjs.cjs",
                "import": "./esm.js",
                "default": "./d.js"
            }
        });
        assert_eq!(
            resolve_exports(&exports, ".", &esm()),
            Some("./esm.js".to_string())
        );
        assert_eq!(
            resolve_exports(&exports, ".", &cjs()),
            Some("./cjs.cjs".to_string())
        );
    }

    #[test]
    fn test_exports_default_first_wins() {
        // "default" listed before "import" is matched first, as in Node.
        let exports = json!({ "default": "./d.js", "import": "./esm.js" });
        assert_eq!(
            resolve_exports(&exports, ".", &esm()),
            Some("./d.js".to_string())
        );
    }

    #[test]
    fn test_exports_nested_conditions() {
        let exports = json!({
            ".": {
                "node": { "import": "./node.mjs", "require": "./node.cjs" },
                "default": "./browser.js"
            }
        });
        assert_eq!(
            resolve_exports(&exports, ".", &esm()),
            Some("./node.mjs".to_string())
        );
        let browser = vec!["browser".to_string(), "import".to_string()];
        assert_eq!(
            resolve_exports(&exports, ".", &browser),
            Some("./browser.js".to_string())
        );
    }

    #[test]
    fn test_exports_array_fallback() {
        let exports = json!({ ".": ["https://bad", "./ok.js"] });
        assert_eq!(
            resolve_exports(&exports, ".", &esm()),
            Some("./ok.js".to_string())
        );
    }

    #[test]
    fn test_exports_subpath_and_pattern() {
        let exports = json!({
            ".": "./index.js",
            "./scan": { "import": "./dist/scan.js" },
            "./features/*": "./src/features/*.js",
            "./features/internal/*": null
        });
        assert_eq!(
            resolve_exports(&exports, "./scan", &esm()),
            Some("./dist/scan.js".to_string())
        );
        assert_eq!(
            resolve_exports(&exports, "./features/x", &esm()),
            Some("./src/features/x.js".to_string())
        );
        // more specific null pattern blocks the subpath
        assert_eq!(resolve_exports(&exports, "./features/internal/y", &esm()), None);
        assert_eq!(resolve_exports(&exports, "./missing", &esm()), None);
    }

    #[test]
    fn test_exports_rejects_traversal_and_non_relative() {
        let exports = json!({ "./*": "./dist/*", "./abs": "/etc/passwd" });
        assert_eq!(resolve_exports(&exports, "./../secret", &esm()), None);
        assert_eq!(resolve_exports(&exports, "./abs", &esm()), None);
    }

    #[test]
    fn test_imports_field() {
        let imports = json!({
            "#internal": { "import": "./src/internal.js" },
            "#dep": "lodash",
            "#utils/*": "./src/utils/*.js"
        });
        assert_eq!(
            resolve_imports(&imports, "#internal", &esm()),
            Some("./src/internal.js".to_string())
        );
        assert_eq!(
            resolve_imports(&imports, "#dep", &esm()),
            Some("lodash".to_string())
        );
        assert_eq!(
            resolve_imports(&imports, "#utils/fmt", &esm()),
            Some("./src/utils/fmt.js".to_string())
        );
        assert_eq!(resolve_imports(&imports, "#nope", &esm()), None);
    }
}
