//! Lowers a single file: parse, bind, transform.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tslua_checker::Checker;
use tslua_diagnostics::{Diagnostics, SourceCache};
use tslua_lua_ast::Block;
use tslua_lualib::FeatureSet;
use tslua_parser::parse_typescript_with_cache;
use tslua_transform::{CompilerOptions, LuaTransformer};

/// Result of lowering one file. `output` is `None` when parsing or
/// transformation failed; the reason is in `diagnostics`.
#[derive(Debug)]
pub struct Lowered {
    pub path: PathBuf,
    pub diagnostics: Diagnostics,
    pub output: Option<(Block, FeatureSet)>,
}

impl Lowered {
    pub fn features(&self) -> Option<&FeatureSet> {
        self.output.as_ref().map(|(_, features)| features)
    }
}

pub fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

/// Reads and lowers `path`, registering its text in `cache`.
pub fn lower_file(path: &Path, options: CompilerOptions, cache: &mut SourceCache) -> Result<Lowered> {
    let source = fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    Ok(lower_source(path, &source, options, cache))
}

pub fn lower_source(path: &Path, source: &str, options: CompilerOptions, cache: &mut SourceCache) -> Lowered {
    let filename = path.to_string_lossy();
    let json = is_json(path);
    // a JSON document parses as one parenthesized expression statement
    let text = if json { format!("({})", source) } else { source.to_string() };

    let mut lowered = Lowered {
        path: path.to_path_buf(),
        diagnostics: Diagnostics::new(),
        output: None,
    };

    let parsed = match parse_typescript_with_cache(&text, &filename, cache) {
        Ok(parsed) => parsed,
        Err(error) => {
            log::debug!("parse failed for {}: {}", filename, error);
            lowered.diagnostics.push(error.diagnostic);
            return lowered;
        }
    };
    lowered.diagnostics.extend(parsed.diagnostics.iter().cloned());

    let checker = Checker::new(&parsed, &text);
    lowered.diagnostics.extend(checker.diagnostics().iter().cloned());

    let mut transformer = LuaTransformer::new(options, &checker);
    let result = if json {
        transformer.transform_json_file(&parsed.module)
    } else {
        transformer.transform_source_file(&parsed.module)
    };
    match result {
        Ok(output) => {
            log::info!(
                "lowered {} ({} statements, {} features)",
                filename,
                output.0.statements.len(),
                output.1.len()
            );
            lowered.output = Some(output);
        }
        Err(error) => {
            log::debug!("lowering failed for {}: {}", filename, error);
            lowered.diagnostics.push(error.to_diagnostic());
        }
    }
    lowered
}

#[cfg(test)]
mod tests {
    use super::*;
    use tslua_diagnostics::DiagnosticCode;
    use tslua_lualib::LuaLibFeature;

    fn lower(path: &str, source: &str) -> Lowered {
        let mut cache = SourceCache::new();
        lower_source(Path::new(path), source, CompilerOptions::default(), &mut cache)
    }

    #[test]
    fn test_lowers_module_with_features() {
        let lowered = lower("main.ts", "declare const ys: number[];\nexport const xs = ys.map(x => x * 2);");
        assert!(!lowered.diagnostics.has_errors());
        let features = lowered.features().unwrap();
        assert!(features.contains(LuaLibFeature::ArrayMap));
    }

    #[test]
    fn test_parse_error_becomes_diagnostic() {
        let lowered = lower("broken.ts", "function f( {");
        assert!(lowered.output.is_none());
        assert!(lowered.diagnostics.has_errors());
        assert!(lowered
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::ParseError));
    }

    #[test]
    fn test_transform_error_becomes_diagnostic() {
        let lowered = lower("main.ts", "declare const xs: number[];\nfor (const k in xs) {}");
        assert!(lowered.output.is_none());
        assert!(lowered
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::ForbiddenForIn));
    }

    #[test]
    fn test_json_file_returns_value() {
        let lowered = lower("data.json", r#"{ "name": "tslua", "tags": [1, 2] }"#);
        let (block, features) = lowered.output.unwrap();
        assert_eq!(block.statements.len(), 1);
        assert!(features.is_empty());
    }
}
