//! Check command - lowers every file under a path and reports what fails

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tslua_diagnostics::{
    DiagnosticEmitter, Diagnostics, JsonEmitter, SimpleEmitter, SourceCache, TerminalEmitter,
};
use tslua_lualib::LuaLibFeature;
use walkdir::WalkDir;

use crate::config::{Config, ConfigOverrides};
use crate::driver;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input TypeScript file or directory
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// List the LuaLib features each file needs
    #[arg(long)]
    pub features: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

fn is_source_file(path: &Path) -> bool {
    if path.to_string_lossy().ends_with(".d.ts") {
        return false;
    }
    path.extension().map_or(false, |ext| ext == "ts")
}

/// TypeScript files under `path`, skipping `node_modules` and declaration files.
fn collect_ts_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_source_file(path) || driver::is_json(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != "node_modules")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn progress_bar(len: usize, show: bool) -> Result<ProgressBar> {
    if !show || len < 2 {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?);
    Ok(bar)
}

fn feature_names(features: &[LuaLibFeature]) -> Vec<&'static str> {
    features.iter().map(|feature| feature.name()).collect()
}

pub fn run(args: CheckArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let input = args.input.canonicalize().unwrap_or_else(|_| args.input.clone());
    let project_root = if input.is_file() {
        input.parent().unwrap_or(&input).to_path_buf()
    } else {
        input.clone()
    };
    let config = Config::resolve(&project_root, &args.overrides)?;

    let files = collect_ts_files(&input);
    if files.is_empty() {
        match format {
            OutputFormat::Text => {
                if !quiet {
                    println!("No TypeScript files found.");
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "files": 0,
                        "errors": 0,
                        "warnings": 0,
                    })
                );
            }
        }
        return Ok(());
    }

    let text = matches!(format, OutputFormat::Text);
    if text && !quiet {
        println!("Checking {} file(s)...", files.len());
    }

    let mut source_cache = SourceCache::new();
    let mut all_diagnostics = Diagnostics::new();
    let mut visited = HashSet::new();
    let mut file_features = Vec::new();
    let mut checked_files = 0;

    let bar = progress_bar(files.len(), text && use_color)?;
    for file in &files {
        bar.inc(1);
        let canonical = file.canonicalize().unwrap_or_else(|_| file.clone());
        if !visited.insert(canonical.clone()) {
            continue;
        }
        bar.set_message(
            canonical
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let lowered = match driver::lower_file(&canonical, config.compiler_options(&canonical), &mut source_cache) {
            Ok(lowered) => lowered,
            Err(error) => {
                log::warn!("{:#}", error);
                continue;
            }
        };
        if let Some(features) = lowered.features() {
            let order = tslua_lualib::resolve_load_order(features);
            file_features.push((lowered.path.clone(), order));
        }
        all_diagnostics.extend(lowered.diagnostics);
        checked_files += 1;
    }
    bar.finish_and_clear();
    all_diagnostics.sort_by_location();

    let errors = all_diagnostics.error_count();
    let warnings = all_diagnostics.warning_count();
    let failed = errors > 0 || (args.strict && warnings > 0);

    match format {
        OutputFormat::Text => {
            let stderr = std::io::stderr();
            if quiet {
                SimpleEmitter::new(stderr.lock()).emit_all(&all_diagnostics, &source_cache)?;
            } else {
                TerminalEmitter::new(stderr.lock(), use_color).emit_all(&all_diagnostics, &source_cache)?;
            }

            if args.features && !quiet {
                println!();
                for (path, features) in &file_features {
                    let names = feature_names(features);
                    if names.is_empty() {
                        println!("{}: no LuaLib features", path.display());
                    } else {
                        println!("{}: {}", path.display(), names.join(", "));
                    }
                }
            }

            if !quiet {
                println!();
                print_summary(errors, warnings, checked_files, args.strict, use_color);
            }
        }
        OutputFormat::Json => {
            let stdout = std::io::stdout();
            let mut emitter = JsonEmitter::new(stdout.lock());
            emitter.emit_all(&all_diagnostics, &source_cache)?;

            let mut summary = serde_json::json!({
                "success": !failed,
                "files": checked_files,
                "errors": errors,
                "warnings": warnings,
            });
            if args.features {
                summary["features"] = file_features
                    .iter()
                    .map(|(path, features)| {
                        serde_json::json!({
                            "file": path.to_string_lossy(),
                            "features": feature_names(features),
                        })
                    })
                    .collect();
            }
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    if failed {
        return Err(anyhow!("Check failed with errors"));
    }
    Ok(())
}

fn print_summary(errors: usize, warnings: usize, files: usize, strict: bool, use_color: bool) {
    if errors > 0 {
        if use_color {
            println!(
                "{}: {} error(s), {} warning(s)",
                console::style("Check failed").red().bold(),
                errors,
                warnings
            );
        } else {
            println!("Check failed: {} error(s), {} warning(s)", errors, warnings);
        }
    } else if warnings > 0 && strict {
        if use_color {
            println!(
                "{}: {} warning(s) (strict mode)",
                console::style("Check failed").yellow().bold(),
                warnings
            );
        } else {
            println!("Check failed: {} warning(s) (strict mode)", warnings);
        }
    } else if warnings > 0 {
        if use_color {
            println!("{}: {} warning(s)", console::style("Check passed").yellow(), warnings);
        } else {
            println!("Check passed: {} warning(s)", warnings);
        }
    } else if use_color {
        println!(
            "{} - {} file(s) checked",
            console::style("All checks passed!").green().bold(),
            files
        );
    } else {
        println!("All checks passed! - {} file(s) checked", files);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tslua-check-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_collect_skips_declarations_and_node_modules() {
        let dir = scratch_dir("collect");
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::create_dir_all(dir.join("node_modules/pkg")).unwrap();
        fs::write(dir.join("src/main.ts"), "export {}").unwrap();
        fs::write(dir.join("src/types.d.ts"), "declare const x: number;").unwrap();
        fs::write(dir.join("src/readme.md"), "# hi").unwrap();
        fs::write(dir.join("node_modules/pkg/index.ts"), "export {}").unwrap();

        let files = collect_ts_files(&dir);
        assert_eq!(files, vec![dir.join("src/main.ts")]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_check_fails_on_errors() {
        let dir = scratch_dir("fail");
        fs::write(dir.join("bad.ts"), "declare const xs: number[];\nfor (const k in xs) {}\n").unwrap();
        let args = CheckArgs {
            input: dir.clone(),
            features: false,
            strict: false,
            overrides: ConfigOverrides::default(),
        };
        assert!(run(args, OutputFormat::Json, false, true).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_check_passes_clean_project() {
        let dir = scratch_dir("pass");
        fs::write(dir.join("main.ts"), "export function add(a: number, b: number) { return a + b; }\n").unwrap();
        let args = CheckArgs {
            input: dir.clone(),
            features: true,
            strict: false,
            overrides: ConfigOverrides::default(),
        };
        assert!(run(args, OutputFormat::Json, false, true).is_ok());
        fs::remove_dir_all(&dir).unwrap();
    }
}
