//! Compile command - lowers one file and prints the Lua tree as JSON

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tslua_diagnostics::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, SourceCache, TerminalEmitter};
use tslua_lua_ast::Block;
use tslua_lualib::{DirectorySource, FeatureSet, LuaLibImportKind};

use crate::config::{Config, ConfigOverrides};
use crate::driver;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Input TypeScript or JSON file
    pub input: PathBuf,

    /// Write the JSON document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include the concatenated LuaLib helper sources
    #[arg(long)]
    pub lualib_bundle: bool,

    /// Directory holding `<Feature>.lua` files (overrides `lua.lualib_dir`)
    #[arg(long)]
    pub lualib_dir: Option<PathBuf>,

    /// Pretty-print the JSON document
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Feature names in load order. Empty when helpers are never imported.
fn ordered_features(kind: LuaLibImportKind, features: &FeatureSet) -> Vec<&'static str> {
    if kind == LuaLibImportKind::None {
        return Vec::new();
    }
    tslua_lualib::resolve_load_order(features)
        .into_iter()
        .map(|feature| feature.name())
        .collect()
}

fn build_document(
    path: &Path,
    block: &Block,
    features: &FeatureSet,
    kind: LuaLibImportKind,
    bundle: Option<String>,
) -> Result<serde_json::Value> {
    let mut document = serde_json::json!({
        "file": path.to_string_lossy(),
        "lualib_import": kind.as_str(),
        "requires_bundle": kind.requires_bundle(features),
        "features": ordered_features(kind, features),
        "ast": serde_json::to_value(block)?,
    });
    if let Some(bundle) = bundle {
        document["lualib_bundle"] = serde_json::Value::String(bundle);
    }
    Ok(document)
}

pub fn run(args: CompileArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let input = args
        .input
        .canonicalize()
        .with_context(|| format!("could not find {}", args.input.display()))?;
    let start = input.parent().unwrap_or(&input);
    let config = Config::resolve(start, &args.overrides)?;
    let options = config.compiler_options(&input);
    let kind = options.lualib_import;

    let mut source_cache = SourceCache::new();
    let lowered = driver::lower_file(&input, options, &mut source_cache)?;

    match format {
        OutputFormat::Text => {
            let stderr = std::io::stderr();
            if quiet {
                SimpleEmitter::new(stderr.lock()).emit_all(&lowered.diagnostics, &source_cache)?;
            } else {
                TerminalEmitter::new(stderr.lock(), use_color).emit_all(&lowered.diagnostics, &source_cache)?;
            }
        }
        OutputFormat::Json => {
            let stderr = std::io::stderr();
            JsonEmitter::new(stderr.lock()).emit_all(&lowered.diagnostics, &source_cache)?;
        }
    }

    let Some((block, features)) = &lowered.output else {
        return Err(anyhow!(
            "Compilation of {} failed with {} error(s)",
            input.display(),
            lowered.diagnostics.error_count()
        ));
    };

    let bundle = if args.lualib_bundle {
        let dir = args
            .lualib_dir
            .or_else(|| config.lualib_dir())
            .ok_or_else(|| anyhow!("--lualib-bundle needs a LuaLib directory (--lualib-dir or lua.lualib_dir)"))?;
        let wanted = if kind == LuaLibImportKind::None {
            FeatureSet::new()
        } else {
            features.clone()
        };
        Some(tslua_lualib::load_features(&wanted, &DirectorySource::new(dir))?)
    } else {
        None
    };

    let document = build_document(&input, block, features, kind, bundle)?;
    let text = if args.pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };

    match &args.output {
        Some(path) => {
            fs::write(path, text + "\n").with_context(|| format!("could not write {}", path.display()))?;
            if !quiet && matches!(format, OutputFormat::Text) {
                println!("Wrote {}", path.display());
            }
        }
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tslua_lualib::LuaLibFeature;
    use tslua_transform::CompilerOptions;

    fn lower(source: &str) -> (Block, FeatureSet) {
        let mut cache = SourceCache::new();
        driver::lower_source(Path::new("main.ts"), source, CompilerOptions::default(), &mut cache)
            .output
            .expect("lowering failed")
    }

    #[test]
    fn test_features_follow_load_order() {
        let mut features = FeatureSet::new();
        features.insert(LuaLibFeature::ArrayMap);
        let names = ordered_features(LuaLibImportKind::Require, &features);
        assert_eq!(names.last(), Some(&"ArrayMap"));
        assert!(ordered_features(LuaLibImportKind::None, &features).is_empty());
    }

    #[test]
    fn test_document_shape() {
        let (block, features) = lower("declare const ys: number[];\nexport const n = ys.map(y => y).length;");
        let document = build_document(Path::new("main.ts"), &block, &features, LuaLibImportKind::Require, None).unwrap();
        assert_eq!(document["file"], "main.ts");
        assert_eq!(document["lualib_import"], "require");
        assert_eq!(document["requires_bundle"], true);
        assert!(document["features"].as_array().unwrap().iter().any(|f| f == "ArrayMap"));
        assert!(document["ast"].is_object());
        assert!(document.get("lualib_bundle").is_none());
    }

    #[test]
    fn test_bundle_is_attached() {
        let (block, features) = lower("export const x = 1;");
        let document = build_document(
            Path::new("main.ts"),
            &block,
            &features,
            LuaLibImportKind::Inline,
            Some(String::new()),
        )
        .unwrap();
        assert_eq!(document["requires_bundle"], false);
        assert_eq!(document["lualib_bundle"], "");
    }
}
