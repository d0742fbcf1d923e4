//! Init command - write a starter tslua project

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use crate::config::CONFIG_FILE;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory (default: current)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Project name (defaults to directory name)
    #[arg(long)]
    pub name: Option<String>,
}

const DEFAULT_MAIN_TS: &str = r#"// Main entry point

export function greet(name: string): string {
    return `Hello, ${name}!`;
}

print(greet("Lua"));
"#;

const DEFAULT_CONFIG: &str = r#"# tslua configuration

[project]
name = "{name}"
root_dir = "src"

[lua]
target = "JIT"
lualib_import = "require"
no_hoisting = false

[checker]
strict = true
"#;

const DEFAULT_GITIGNORE: &str = r#"# tslua outputs
*.lua.json
lualib_bundle.lua

node_modules/
"#;

/// Writes `contents` unless the file exists. Returns whether it was written.
fn write_if_missing(path: &Path, contents: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    fs::write(path, contents)?;
    Ok(true)
}

pub fn run(args: InitArgs, format: OutputFormat, _use_color: bool) -> Result<()> {
    fs::create_dir_all(&args.path)?;
    let project_path = args.path.canonicalize().unwrap_or(args.path.clone());

    let name = args.name.unwrap_or_else(|| {
        project_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("my-project")
            .to_string()
    });

    let src_dir = project_path.join("src");
    fs::create_dir_all(&src_dir)?;

    if let OutputFormat::Text = format {
        println!("Creating new tslua project '{}'...\n", name);
    }

    let files = [
        (CONFIG_FILE.to_string(), project_path.join(CONFIG_FILE), DEFAULT_CONFIG.replace("{name}", &name)),
        ("src/main.ts".to_string(), src_dir.join("main.ts"), DEFAULT_MAIN_TS.to_string()),
        (".gitignore".to_string(), project_path.join(".gitignore"), DEFAULT_GITIGNORE.to_string()),
    ];

    let mut created = Vec::new();
    for (label, path, contents) in &files {
        let written = write_if_missing(path, contents)?;
        if written {
            created.push(label.clone());
        }
        if let OutputFormat::Text = format {
            if written {
                println!("  Created {}", label);
            } else {
                println!("  Skipped {} (already exists)", label);
            }
        }
    }

    match format {
        OutputFormat::Text => {
            println!("\nDone! Next steps:");
            println!("  cd {}", project_path.display());
            println!("  tslua check");
            println!("  tslua compile src/main.ts");
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "project_name": name,
                "path": project_path.to_string_lossy(),
                "created": created,
            });
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_default_config_parses() {
        let text = DEFAULT_CONFIG.replace("{name}", "demo");
        let config = Config::parse(&text, Path::new(CONFIG_FILE)).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("demo"));
        assert_eq!(config.lua.lualib_import, tslua_lualib::LuaLibImportKind::Require);
    }

    #[test]
    fn test_init_keeps_existing_files() {
        let dir = std::env::temp_dir().join(format!("tslua-init-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CONFIG_FILE), "[project]\nname = \"kept\"\n").unwrap();

        let args = InitArgs {
            path: dir.clone(),
            name: Some("fresh".to_string()),
        };
        run(args, OutputFormat::Json, false).unwrap();

        let config = fs::read_to_string(dir.join(CONFIG_FILE)).unwrap();
        assert!(config.contains("kept"));
        assert!(dir.join("src/main.ts").is_file());
        assert!(dir.join(".gitignore").is_file());
        fs::remove_dir_all(&dir).unwrap();
    }
}
