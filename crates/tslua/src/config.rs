//! `tslua.toml` loading and the flags that override it.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tslua_lualib::LuaLibImportKind;
use tslua_transform::{CompilerOptions, LuaTarget};

pub const CONFIG_FILE: &str = "tslua.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: Option<String>,
    /// Require paths are relative to this directory.
    pub root_dir: Option<PathBuf>,
    pub base_url: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LuaConfig {
    pub target: LuaTarget,
    pub lualib_import: LuaLibImportKind,
    /// Directory holding `<Feature>.lua` helper sources.
    pub lualib_dir: Option<PathBuf>,
    pub no_header: bool,
    pub no_hoisting: bool,
    pub source_map_traceback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub strict: bool,
    pub strict_null_checks: bool,
    pub preserve_const_enums: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            strict: true,
            strict_null_checks: true,
            preserve_const_enums: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub lua: LuaConfig,
    pub checker: CheckerConfig,
    /// Directory of the file the config was read from; relative paths are
    /// resolved against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Command line overrides for config values.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Lua dialect to target (5.1, 5.2, 5.3, JIT)
    #[arg(long)]
    pub lua_target: Option<LuaTarget>,

    /// Keep declarations in source order and reject forward references
    #[arg(long)]
    pub no_hoisting: bool,

    /// How LuaLib helpers are imported (none, always, inline, require)
    #[arg(long)]
    pub lualib_import: Option<LuaLibImportKind>,

    /// Directory require paths are made relative to
    #[arg(long)]
    pub root_dir: Option<PathBuf>,

    /// Config file to use instead of searching for tslua.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Config::parse(&text, path)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// The nearest `tslua.toml` in `start` or one of its ancestors, or the
    /// defaults when there is none.
    pub fn discover(start: &Path) -> Result<Config, ConfigError> {
        for directory in start.ancestors() {
            let candidate = directory.join(CONFIG_FILE);
            if candidate.is_file() {
                return Config::load(&candidate);
            }
        }
        log::debug!("no {} above {}, using defaults", CONFIG_FILE, start.display());
        Ok(Config::default())
    }

    /// Loads the config `overrides` names, or discovers one from `start`,
    /// and applies the overrides.
    pub fn resolve(start: &Path, overrides: &ConfigOverrides) -> Result<Config, ConfigError> {
        let mut config = match &overrides.config {
            Some(path) => Config::load(path)?,
            None => Config::discover(start)?,
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(target) = overrides.lua_target {
            self.lua.target = target;
        }
        if overrides.no_hoisting {
            self.lua.no_hoisting = true;
        }
        if let Some(kind) = overrides.lualib_import {
            self.lua.lualib_import = kind;
        }
        if let Some(root_dir) = &overrides.root_dir {
            // flags are relative to the working directory, not the config
            self.project.root_dir = Some(absolute(root_dir));
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => absolute(&base.join(path)),
            _ => absolute(path),
        }
    }

    pub fn lualib_dir(&self) -> Option<PathBuf> {
        self.lua.lualib_dir.as_deref().map(|dir| self.resolve_path(dir))
    }

    /// Options for lowering `source_path`.
    pub fn compiler_options(&self, source_path: &Path) -> CompilerOptions {
        let root_dir = match &self.project.root_dir {
            Some(root) => self.resolve_path(root),
            None => self.base_dir.clone().unwrap_or_else(|| absolute(Path::new("."))),
        };
        CompilerOptions {
            lua_target: self.lua.target,
            lualib_import: self.lua.lualib_import,
            no_hoisting: self.lua.no_hoisting,
            no_header: self.lua.no_header,
            source_map_traceback: self.lua.source_map_traceback,
            preserve_const_enums: self.checker.preserve_const_enums,
            strict: self.checker.strict,
            strict_null_checks: self.checker.strict_null_checks,
            root_dir: Some(root_dir),
            base_url: self.project.base_url.as_deref().map(|url| self.resolve_path(url)),
            source_path: Some(absolute(source_path)),
        }
    }
}

/// Canonical form when the path exists, joined onto the working directory
/// otherwise.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::parse("", Path::new("tslua.toml")).unwrap();
        assert_eq!(config.lua.target, LuaTarget::LuaJIT);
        assert_eq!(config.lua.lualib_import, LuaLibImportKind::Inline);
        assert!(config.checker.strict);
        assert!(!config.lua.no_hoisting);
    }

    #[test]
    fn test_parse_all_sections() {
        let text = r#"
            [project]
            name = "game"
            root_dir = "src"

            [lua]
            target = "5.3"
            lualib_import = "require"
            no_hoisting = true

            [checker]
            preserve_const_enums = true
        "#;
        let config = Config::parse(text, Path::new("tslua.toml")).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("game"));
        assert_eq!(config.lua.target, LuaTarget::Lua53);
        assert_eq!(config.lua.lualib_import, LuaLibImportKind::Require);
        assert!(config.lua.no_hoisting);
        assert!(config.checker.preserve_const_enums);
        assert!(config.checker.strict_null_checks);
    }

    #[test]
    fn test_invalid_target_is_a_parse_error() {
        let error = Config::parse("[lua]\ntarget = \"5.4\"\n", Path::new("tslua.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().starts_with("invalid tslua.toml"));
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::parse("[lua]\ntarget = \"5.1\"\n", Path::new("tslua.toml")).unwrap();
        config.apply(&ConfigOverrides {
            lua_target: Some(LuaTarget::Lua52),
            no_hoisting: true,
            lualib_import: Some(LuaLibImportKind::None),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.lua.target, LuaTarget::Lua52);
        assert!(config.lua.no_hoisting);
        assert_eq!(config.lua.lualib_import, LuaLibImportKind::None);
    }

    #[test]
    fn test_paths_resolve_against_config_dir() {
        let mut config = Config::parse("[project]\nroot_dir = \"src\"\n", Path::new("tslua.toml")).unwrap();
        config.base_dir = Some(PathBuf::from("/nonexistent/project"));
        let options = config.compiler_options(Path::new("/nonexistent/project/src/main.ts"));
        assert_eq!(options.root_dir, Some(PathBuf::from("/nonexistent/project/src")));
        assert_eq!(options.source_path, Some(PathBuf::from("/nonexistent/project/src/main.ts")));
        assert_eq!(options.lua_target, LuaTarget::LuaJIT);
    }
}
