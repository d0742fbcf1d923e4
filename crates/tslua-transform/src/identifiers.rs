//! Identifier lowering and Lua-safe renaming.

use swc_ecma_ast as ast;

use tslua_checker::SymbolKind;
use tslua_lua_ast::*;
use tslua_types::{DirectiveKind, SymbolRef};

use crate::error::{CompileErrorKind, Result};
use crate::transformer::LuaTransformer;

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

const LUA_BUILTINS: &[&str] = &[
    "_G", "_VERSION", "assert", "collectgarbage", "coroutine", "debug", "dofile", "error",
    "getfenv", "getmetatable", "io", "ipairs", "load", "loadfile", "loadstring", "math", "module",
    "next", "os", "package", "pairs", "pcall", "print", "rawequal", "rawget", "rawlen", "rawset",
    "require", "select", "setfenv", "setmetatable", "string", "table", "tonumber", "tostring",
    "type", "unpack", "xpcall",
];

pub fn is_lua_keyword(name: &str) -> bool {
    LUA_KEYWORDS.contains(&name)
}

/// Matches `[a-zA-Z_][a-zA-Z0-9_]*` and is not a keyword.
pub fn is_valid_lua_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_well && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_lua_keyword(name)
}

/// Would shadow a keyword or a Lua global, or is not a Lua identifier.
pub fn is_unsafe_name(name: &str) -> bool {
    is_lua_keyword(name) || LUA_BUILTINS.contains(&name) || !is_valid_lua_identifier(name)
}

/// Replaces every character Lua rejects with `_` and its UTF-16 code in
/// hex.
pub fn fix_invalid_lua_identifier(name: &str) -> String {
    let mut fixed = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            fixed.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                fixed.push_str(&format!("_{:X}", unit));
            }
        }
    }
    fixed
}

pub fn create_safe_name(name: &str) -> String {
    format!("____{}", fix_invalid_lua_identifier(name))
}

impl LuaTransformer<'_> {
    pub(crate) fn transform_identifier(&mut self, ident: &ast::Ident) -> Result<Identifier> {
        let name: &str = &ident.sym;
        let symbol = self.oracle.symbol_at(ident);

        if let Some(symbol) = symbol {
            if self.is_for_range_symbol(symbol) {
                return Err(self.error(
                    CompileErrorKind::InvalidForRangeCall(
                        "@forRange function can only be used as an iterable in a for...of loop.".to_string(),
                    ),
                    ident.span,
                ));
            }
        }

        let text = if self.has_unsafe_identifier_name(ident, symbol)? {
            create_safe_name(name)
        } else {
            name.to_string()
        };
        let symbol_id = match symbol {
            Some(symbol) => Some(self.track_symbol_reference(symbol, ident.span)?),
            None => None,
        };
        Ok(create_identifier(text, self.pos(ident.span), symbol_id, Some(name.to_string())))
    }

    /// An identifier used as a value: globals with Lua spellings are
    /// substituted and exported symbols read from their export table.
    pub(crate) fn transform_identifier_expression(&mut self, ident: &ast::Ident) -> Result<Expression> {
        let original = self.pos(ident.span);
        let symbol = self.oracle.symbol_at(ident);
        let is_global = symbol.map_or(true, |s| self.oracle.symbol(s).kind == SymbolKind::Builtin);
        if is_global {
            match &*ident.sym {
                "undefined" => return Ok(create_nil_literal(original)),
                "NaN" => {
                    let division = create_binary_expression(
                        create_numeric_literal(0.0, None),
                        create_numeric_literal(0.0, None),
                        BinaryOperator::Division,
                        None,
                    );
                    return Ok(create_parenthesized_expression(division, original));
                }
                "Infinity" => {
                    let math = create_identifier("math", None, None, None);
                    return Ok(create_table_index_expression(math.into(), create_string_literal("huge", None), original).into());
                }
                "globalThis" => return Ok(create_identifier("_G", original, None, Some("globalThis".to_string())).into()),
                _ => {}
            }
        }

        let identifier = self.transform_identifier(ident)?;
        Ok(self.add_export_to_identifier(identifier))
    }

    fn is_for_range_symbol(&self, symbol: SymbolRef) -> bool {
        let info = self.oracle.symbol(symbol);
        if !matches!(info.kind, SymbolKind::Function | SymbolKind::Variable | SymbolKind::Import) {
            return false;
        }
        info.has_directive(DirectiveKind::ForRange)
            || self
                .oracle
                .type_directives(&self.oracle.type_of_symbol(symbol))
                .has(DirectiveKind::ForRange)
    }

    fn has_unsafe_identifier_name(&self, ident: &ast::Ident, symbol: Option<SymbolRef>) -> Result<bool> {
        match symbol {
            Some(symbol) => self.has_unsafe_symbol_name(symbol, ident),
            None if !is_valid_lua_identifier(&ident.sym) => Err(self.error(
                CompileErrorKind::InvalidAmbientIdentifierName(ident.sym.to_string()),
                ident.span,
            )),
            None => Ok(false),
        }
    }

    /// Unsafe names are only renamed for symbols this file owns; ambient
    /// symbols must already be valid Lua.
    pub(crate) fn has_unsafe_symbol_name(&self, symbol: SymbolRef, ident: &ast::Ident) -> Result<bool> {
        let info = self.oracle.symbol(symbol);
        let ambient = info.kind == SymbolKind::Builtin || info.declarations.iter().any(|d| d.ambient);
        if ambient && !is_valid_lua_identifier(&info.name) {
            return Err(self.error(
                CompileErrorKind::InvalidAmbientIdentifierName(info.name.clone()),
                ident.span,
            ));
        }
        if is_unsafe_name(&info.name) {
            return Ok(!ambient && !info.is_exported());
        }
        Ok(false)
    }

    /// Local name for a declaration identifier that may have to be
    /// renamed, without recording a reference.
    pub(crate) fn safe_declaration_name(&self, ident: &ast::Ident) -> Result<String> {
        let symbol = self.oracle.symbol_at(ident);
        Ok(if self.has_unsafe_identifier_name(ident, symbol)? {
            create_safe_name(&ident.sym)
        } else {
            ident.sym.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error, render_block};

    #[test]
    fn test_name_classification() {
        assert!(is_lua_keyword("end"));
        assert!(!is_lua_keyword("self"));
        assert!(is_valid_lua_identifier("_private1"));
        assert!(!is_valid_lua_identifier("1abc"));
        assert!(!is_valid_lua_identifier("then"));
        assert!(is_unsafe_name("print"));
        assert!(is_unsafe_name("$el"));
        assert!(!is_unsafe_name("value"));
    }

    #[test]
    fn test_fix_invalid_identifier() {
        assert_eq!(fix_invalid_lua_identifier("$el"), "_24el");
        assert_eq!(fix_invalid_lua_identifier("a-b"), "a_2Db");
        assert_eq!(create_safe_name("end"), "____end");
        assert_eq!(create_safe_name("été"), "_____E9t_E9");
    }

    #[test]
    fn test_unsafe_local_is_renamed() {
        let lowered = lower("function f() { const type = 1; const $el = type; }");
        let text = render_block(&lowered.block);
        assert!(text.contains("local ____type = 1"));
        assert!(text.contains("local _____24el = ____type"));
    }

    #[test]
    fn test_exported_unsafe_name_is_kept() {
        let lowered = lower("export const type = 1;");
        assert!(render_block(&lowered.block).contains("____exports[\"type\"] = 1"));
    }

    #[test]
    fn test_global_spellings() {
        let lowered = lower("let a = NaN; let b = Infinity; let c = undefined; let d = globalThis;");
        let text = render_block(&lowered.block);
        assert!(text.contains("local a = (0 / 0)"));
        assert!(text.contains("local b = math[\"huge\"]"));
        assert!(text.contains("local c = nil"));
        assert!(text.contains("local d = _G"));
    }

    #[test]
    fn test_ambient_invalid_name_is_rejected() {
        let error = lower_error("declare const $: any;\nconst x = $;");
        assert_eq!(error.kind, CompileErrorKind::InvalidAmbientIdentifierName("$".to_string()));
    }
}
