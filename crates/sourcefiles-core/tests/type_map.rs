//! Type map shape over an installed package tree.

use sourcefiles_core::diagnostics::codes;
use sourcefiles_core::{Engine, EngineConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_type_map_shape() {
    let dir = tempdir().unwrap();
    let nm = dir.path().join("node_modules");
    write(
        &nm.join("thimbleberry/package.json"),
        r#"{"name": "thimbleberry", "types": "dist/index.d.ts", "dependencies": {"@reactively/core": "1", "left-out": "1"}}"#,
    );
    write(&nm.join("thimbleberry/dist/index.d.ts"), "export * from './shader';");
    write(&nm.join("thimbleberry/dist/shader.d.ts"), "export declare function shader(): void;");
    write(&nm.join("thimbleberry/dist/index.js"), "export {};");
    write(&nm.join("@reactively/core/package.json"), r#"{"name": "@reactively/core", "files": ["dist"]}"#);
    write(&nm.join("@reactively/core/dist/core.d.ts"), "export {};");
    write(&nm.join("@reactively/core/src/private.d.ts"), "export {};");

    let engine = Engine::new(EngineConfig::default());
    let types = engine.type_files("thimbleberry", dir.path()).unwrap();
    let keys: Vec<&str> = types.files.keys().map(String::as_str).collect();

    assert_eq!(
        keys.iter()
            .filter(|k| **k == "file:///node_modules/thimbleberry/package.json")
            .count(),
        1
    );
    assert!(keys.iter().filter(|k| k.ends_with(".d.ts")).count() >= 2);
    assert!(keys.contains(&"file:///node_modules/@reactively/core/dist/core.d.ts"));
    assert!(keys.contains(&"file:///node_modules/@reactively/core/package.json"));
    assert!(!keys.iter().any(|k| k.contains("private.d.ts")));
    assert!(!keys.iter().any(|k| k.ends_with(".js")));
    assert!(keys.iter().all(|k| k.starts_with("file:///node_modules/")));
    assert_eq!(types.diagnostics.with_code(codes::TYPE_DEPENDENCY_MISSING).count(), 1);

    let again = engine.type_files("thimbleberry", dir.path()).unwrap();
    assert_eq!(types, again);
}

#[test]
fn test_custom_virtual_root() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("node_modules/pkg/package.json"), r#"{"name": "pkg"}"#);
    write(&dir.path().join("node_modules/pkg/index.d.ts"), "export {};");

    let engine = Engine::new(EngineConfig::default().with_virtual_root("file:///vendor/"));
    let types = engine.type_files("pkg", dir.path()).unwrap();
    assert!(types.files.contains_key("file:///vendor/pkg/index.d.ts"));
}
