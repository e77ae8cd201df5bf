//! Source normalization before import scanning.
//!
//! Normalization produces the text that is scanned and patched. Module ids
//! are always hashed from the original loaded contents, never from the
//! normalized text.

#![allow(clippy::default_trait_access)]

use crate::error::Result;
#[cfg(feature = "swc")]
use crate::error::Error;
use std::path::Path;

/// Rewrites module text into scannable ECMAScript.
pub trait Normalizer: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Normalize the text of the module at `path`.
    fn normalize(&self, path: &Path, text: &str) -> Result<String>;
}

/// Whether `path` names a TypeScript source.
#[must_use]
pub fn is_typescript(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "ts" | "tsx" | "mts" | "cts"))
}

/// Pattern-based normalizer.
///
/// Strips `sourceMappingURL` trailers and, for TypeScript sources, removes
/// type-only import and re-export declarations. Anything else passes through
/// unchanged.
#[derive(Debug, Clone)]
pub struct BasicNormalizer {
    strip_source_maps: bool,
}

impl BasicNormalizer {
    #[must_use]
    pub fn new(strip_source_maps: bool) -> Self {
        Self { strip_source_maps }
    }
}

impl Default for BasicNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Normalizer for BasicNormalizer {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn normalize(&self, path: &Path, text: &str) -> Result<String> {
        let mut code = text.to_string();
        if is_typescript(path) {
            code = strip_type_only_declarations(&code);
        }
        if self.strip_source_maps {
            code = strip_source_map_comments(&code);
        }
        Ok(code)
    }
}

/// Remove `//# sourceMappingURL=...` and `/*# sourceMappingURL=... */`
/// comments (including the legacy `@` marker).
#[must_use]
pub fn strip_source_map_comments(source: &str) -> String {
    let mut result = source.to_string();

    if let Ok(re) = regex_lite::Regex::new(r"(?m)^[ \t]*//[#@][ \t]*sourceMappingURL=[^\r\n]*(\r?\n)?") {
        result = re.replace_all(&result, "").to_string();
    }

    if let Ok(re) = regex_lite::Regex::new(r"(?m)^[ \t]*/\*[#@][ \t]*sourceMappingURL=[^*]*\*/[ \t]*(\r?\n)?") {
        result = re.replace_all(&result, "").to_string();
    }

    result
}

/// Remove `import type ... from "x"` and `export type ... from "x"`
/// declarations, which have no runtime module.
#[must_use]
pub fn strip_type_only_declarations(source: &str) -> String {
    let mut result = source.to_string();

    if let Ok(re) = regex_lite::Regex::new(
        r#"(?m)^[ \t]*(import|export)[ \t]+type[ \t]+[^;'"]*?from[ \t]*("[^"\r\n]*"|'[^'\r\n]*')[ \t]*;?"#,
    ) {
        result = re.replace_all(&result, "").to_string();
    }

    result
}

/// Full TypeScript type stripping with SWC.
///
/// JavaScript sources are handed to [`BasicNormalizer`] untouched by SWC, so
/// their text keeps its original layout.
#[cfg(feature = "swc")]
#[derive(Debug, Clone, Default)]
pub struct SwcNormalizer {
    basic: BasicNormalizer,
}

#[cfg(feature = "swc")]
impl SwcNormalizer {
    #[must_use]
    pub fn new(strip_source_maps: bool) -> Self {
        Self {
            basic: BasicNormalizer::new(strip_source_maps),
        }
    }
}

#[cfg(feature = "swc")]
impl Normalizer for SwcNormalizer {
    fn name(&self) -> &'static str {
        "swc"
    }

    fn normalize(&self, path: &Path, text: &str) -> Result<String> {
        if !is_typescript(path) {
            return self.basic.normalize(path, text);
        }
        let stripped = strip_types_with_swc(path, text)?;
        Ok(if self.basic.strip_source_maps {
            strip_source_map_comments(&stripped)
        } else {
            stripped
        })
    }
}

#[cfg(feature = "swc")]
fn strip_types_with_swc(path: &Path, source: &str) -> Result<String> {
    use swc_common::{comments::SingleThreadedComments, sync::Lrc, FileName, Globals, Mark, SourceMap, GLOBALS};
    use swc_ecma_ast::{EsVersion, Program};
    use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
    use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};
    use swc_ecma_transforms_base::{fixer::fixer, hygiene::hygiene, resolver};
    use swc_ecma_transforms_typescript::strip;
    use swc_ecma_visit::FoldWith;

    let parse_error = |message: String| Error::parse(path, 0, message);

    let cm: Lrc<SourceMap> = Default::default();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input.ts");
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );

    let tsx = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsx"));
    let syntax = Syntax::Typescript(TsSyntax {
        tsx,
        decorators: true,
        ..Default::default()
    });

    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(syntax, EsVersion::EsNext, StringInput::from(&*fm), Some(&comments));
    let mut parser = Parser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|e| parse_error(format!("{:?}", e.kind())))?;

    let errors: Vec<String> = parser
        .take_errors()
        .into_iter()
        .map(|e| format!("{:?}", e.kind()))
        .collect();
    if !errors.is_empty() {
        return Err(parse_error(errors.join(", ")));
    }

    let output = GLOBALS.set(&Globals::default(), || {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();

        let mut program = Program::Module(module);
        program = program.fold_with(&mut resolver(unresolved_mark, top_level_mark, true));
        program = program.fold_with(&mut strip(unresolved_mark, top_level_mark));
        program = program.fold_with(&mut hygiene());
        program.fold_with(&mut fixer(Some(&comments)))
    });

    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_target(EsVersion::EsNext),
            cm: cm.clone(),
            comments: Some(&comments),
            wr: writer,
        };
        emitter
            .emit_program(&output)
            .map_err(|e| parse_error(format!("failed to emit: {e}")))?;
    }

    String::from_utf8(buf).map_err(|e| parse_error(format!("invalid UTF-8 output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_source_map_trailer() {
        let source = "export const x = 1;\n//# sourceMappingURL=index.js.map\n";
        let out = BasicNormalizer::default()
            .normalize(Path::new("index.js"), source)
            .unwrap();
        assert_eq!(out, "export const x = 1;\n");
    }

    #[test]
    fn test_strips_legacy_and_block_markers() {
        let source = "a();\n//@ sourceMappingURL=a.map\nb();\n/*# sourceMappingURL=b.map */\n";
        assert_eq!(strip_source_map_comments(source), "a();\nb();\n");
    }

    #[test]
    fn test_keeps_source_map_when_disabled() {
        let source = "x();\n//# sourceMappingURL=x.map";
        let out = BasicNormalizer::new(false)
            .normalize(Path::new("x.js"), source)
            .unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_elides_type_only_imports_in_typescript() {
        let source = "import type { A } from './types';\nexport type { B } from \"./b\";\nimport { c } from './c';\n";
        let out = BasicNormalizer::default()
            .normalize(Path::new("mod.ts"), source)
            .unwrap();
        assert!(!out.contains("./types"));
        assert!(!out.contains("./b"));
        assert!(out.contains("import { c } from './c';"));
    }

    #[test]
    fn test_javascript_type_text_untouched() {
        let source = "import type from './type.js';\n";
        let out = BasicNormalizer::default()
            .normalize(Path::new("mod.js"), source)
            .unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_is_typescript() {
        assert!(is_typescript(Path::new("a.ts")));
        assert!(is_typescript(Path::new("a.MTS")));
        assert!(!is_typescript(Path::new("a.d")));
        assert!(!is_typescript(Path::new("a.js")));
    }
}
