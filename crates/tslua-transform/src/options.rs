//! Options that change the shape of the emitted tree.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tslua_lualib::LuaLibImportKind;

/// Lua dialect the output must run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LuaTarget {
    #[serde(rename = "5.1")]
    Lua51,
    #[serde(rename = "5.2")]
    Lua52,
    #[serde(rename = "5.3")]
    Lua53,
    #[default]
    #[serde(rename = "JIT", alias = "jit")]
    LuaJIT,
}

impl LuaTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            LuaTarget::Lua51 => "5.1",
            LuaTarget::Lua52 => "5.2",
            LuaTarget::Lua53 => "5.3",
            LuaTarget::LuaJIT => "JIT",
        }
    }

    /// `goto` and labels exist from 5.2 on (LuaJIT has them too).
    pub fn supports_goto(self) -> bool {
        self != LuaTarget::Lua51
    }

    /// Name of the global `unpack` function.
    pub fn unpack_function(self) -> &'static str {
        match self {
            LuaTarget::Lua51 | LuaTarget::LuaJIT => "unpack",
            LuaTarget::Lua52 | LuaTarget::Lua53 => "table.unpack",
        }
    }
}

impl fmt::Display for LuaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LuaTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "5.1" | "lua51" => Ok(LuaTarget::Lua51),
            "5.2" | "lua52" => Ok(LuaTarget::Lua52),
            "5.3" | "lua53" => Ok(LuaTarget::Lua53),
            "jit" | "luajit" => Ok(LuaTarget::LuaJIT),
            _ => Err(format!("unknown Lua target '{}', expected 5.1, 5.2, 5.3 or JIT", s)),
        }
    }
}

/// Compiler options consulted while lowering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub lua_target: LuaTarget,
    pub lualib_import: LuaLibImportKind,
    /// Keep declarations in source order and reject forward references.
    pub no_hoisting: bool,
    pub no_header: bool,
    pub source_map_traceback: bool,
    pub preserve_const_enums: bool,
    pub strict: bool,
    pub strict_null_checks: bool,
    /// Directory require paths are made relative to.
    pub root_dir: Option<PathBuf>,
    /// Directory non-relative module specifiers resolve against.
    pub base_url: Option<PathBuf>,
    /// Path of the file being lowered, used to resolve relative imports.
    pub source_path: Option<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            lua_target: LuaTarget::default(),
            lualib_import: LuaLibImportKind::default(),
            no_hoisting: false,
            no_header: false,
            source_map_traceback: false,
            preserve_const_enums: false,
            strict: true,
            strict_null_checks: true,
            root_dir: None,
            base_url: None,
            source_path: None,
        }
    }
}

impl CompilerOptions {
    /// `strictNullChecks` is implied by `strict`.
    pub fn null_checks(&self) -> bool {
        self.strict || self.strict_null_checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!("5.1".parse::<LuaTarget>().unwrap(), LuaTarget::Lua51);
        assert_eq!("JIT".parse::<LuaTarget>().unwrap(), LuaTarget::LuaJIT);
        assert_eq!("luajit".parse::<LuaTarget>().unwrap(), LuaTarget::LuaJIT);
        assert!("5.4".parse::<LuaTarget>().is_err());
    }

    #[test]
    fn test_unpack_per_target() {
        assert_eq!(LuaTarget::Lua51.unpack_function(), "unpack");
        assert_eq!(LuaTarget::Lua53.unpack_function(), "table.unpack");
        assert!(!LuaTarget::Lua51.supports_goto());
        assert!(LuaTarget::LuaJIT.supports_goto());
    }
}
