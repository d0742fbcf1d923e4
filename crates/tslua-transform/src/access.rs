//! Property and element access.
//!
//! Most accesses become `table[key]`. Strings, arrays, `Math`,
//! `@luaTable` and `@compileMembersOnly` owners get their own spellings,
//! and numeric indices into arrays and strings shift to one-based.

use swc_common::Span;
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::{ConstValue, DirectiveKind};

use crate::error::{CompileErrorKind, Result};
use crate::transformer::LuaTransformer;

/// Statically known member name: `a.b` or `a["b"]`.
pub(crate) fn member_prop_name(prop: &ast::MemberProp) -> Option<String> {
    match prop {
        ast::MemberProp::Ident(name) => Some(name.sym.to_string()),
        ast::MemberProp::Computed(computed) => match computed.expr.as_ref() {
            ast::Expr::Lit(ast::Lit::Str(s)) => Some(s.value.as_str().unwrap_or("").to_string()),
            _ => None,
        },
        ast::MemberProp::PrivateName(_) => None,
    }
}

/// Value of a `Math` constant other than `PI`.
fn math_constant(name: &str) -> Option<f64> {
    use std::f64::consts;
    Some(match name {
        "E" => consts::E,
        "LN10" => consts::LN_10,
        "LN2" => consts::LN_2,
        "LOG10E" => consts::LOG10_E,
        "LOG2E" => consts::LOG2_E,
        "SQRT1_2" => consts::FRAC_1_SQRT_2,
        "SQRT2" => consts::SQRT_2,
        _ => return None,
    })
}

/// Table literals must be parenthesized before they can be indexed.
fn parenthesize_table(expression: Expression) -> Expression {
    match expression {
        Expression::Table(_) => create_parenthesized_expression(expression, None),
        other => other,
    }
}

impl LuaTransformer<'_> {
    pub(crate) fn create_const_value_literal(&self, value: ConstValue, original: Option<Position>) -> Expression {
        match value {
            ConstValue::Number(n) => create_numeric_literal(n, original),
            ConstValue::String(s) => create_string_literal(s, original),
        }
    }

    /// `a.b`, `a[b]` and `a["b"]`. `node` is the member expression itself.
    pub(crate) fn transform_member_expression(&mut self, node: &ast::Expr, member: &ast::MemberExpr) -> Result<Expression> {
        let original = self.pos(member.span);
        if let Some(value) = self.oracle.const_value(node) {
            return Ok(self.create_const_value_literal(value, original));
        }
        match &member.prop {
            ast::MemberProp::Ident(name) => self.transform_property_access(member, &name.sym, name.span),
            ast::MemberProp::Computed(computed) => self.transform_element_access(member, &computed.expr),
            ast::MemberProp::PrivateName(name) => Err(self.unsupported("property access", "PrivateName", name.span)),
        }
    }

    fn transform_property_access(&mut self, member: &ast::MemberExpr, property: &str, name_span: Span) -> Result<Expression> {
        let original = self.pos(member.span);
        let owner = self.oracle.type_of_expr(&member.obj);

        if owner.is_string_like() {
            if property != "length" {
                return Err(self.error(CompileErrorKind::unsupported_property("string", property), name_span));
            }
            let mut string = self.transform_expression(&member.obj)?;
            if matches!(member.obj.as_ref(), ast::Expr::Tpl(_)) {
                string = create_parenthesized_expression(string, None);
            }
            return Ok(create_unary_expression(string, UnaryOperator::Length, original));
        }
        if owner.is_explicit_array() && property == "length" {
            let array = parenthesize_table(self.transform_expression(&member.obj)?);
            return Ok(create_unary_expression(array, UnaryOperator::Length, original));
        }

        self.check_for_lualib_type(&owner);
        let directives = self.oracle.type_directives(&owner);
        if directives.has(DirectiveKind::CompileMembersOnly) {
            if let ast::Expr::Member(outer) = member.obj.as_ref() {
                let table = self.transform_expression(&outer.obj)?;
                return Ok(create_table_index_expression(table, create_string_literal(property, None), original).into());
            }
            return Ok(create_identifier(property, original, None, None).into());
        }
        if directives.has(DirectiveKind::LuaTable) {
            if property != "length" {
                return Err(self.error(CompileErrorKind::unsupported_property("LuaTable", property), name_span));
            }
            let table = self.transform_expression(&member.obj)?;
            return Ok(create_unary_expression(table, UnaryOperator::Length, original));
        }

        if owner.is_builtin("Math") {
            return self.transform_math_property(property, member.span);
        }
        if let ast::Expr::Ident(_) = member.obj.as_ref() {
            if owner.is_builtin("SymbolConstructor") {
                self.import_feature(LuaLibFeature::Symbol);
            }
        }

        let table = parenthesize_table(self.transform_expression(&member.obj)?);
        Ok(create_table_index_expression(table, create_string_literal(property, None), original).into())
    }

    fn transform_math_property(&self, property: &str, span: Span) -> Result<Expression> {
        let original = self.pos(span);
        if property == "PI" {
            let math = create_identifier("math", None, None, None);
            return Ok(create_table_index_expression(math.into(), create_string_literal("pi", None), original).into());
        }
        match math_constant(property) {
            Some(value) => Ok(create_numeric_literal(value, original)),
            None => Err(self.error(CompileErrorKind::unsupported_property("Math", property), span)),
        }
    }

    fn transform_element_access(&mut self, member: &ast::MemberExpr, index: &ast::Expr) -> Result<Expression> {
        let original = self.pos(member.span);
        let table = parenthesize_table(self.transform_expression(&member.obj)?);
        let owner = self.oracle.type_of_expr(&member.obj);
        if self.oracle.type_directives(&owner).has(DirectiveKind::LuaTable) {
            return Err(self.unsupported("LuaTable access expression", "ElementAccessExpression", member.span));
        }

        let index_type = self.oracle.type_of_expr(index);
        if index_type.is_number_like() && owner.is_string_like() {
            let index = self.transform_expression(index)?;
            let position = self.expression_plus_one(index);
            let string_sub = create_table_index_expression(
                create_identifier("string", None, None, None).into(),
                create_string_literal("sub", None),
                None,
            );
            return Ok(create_call_expression(
                string_sub.into(),
                vec![table, position.clone(), position],
                original,
            ));
        }

        let index = self.transform_element_index(&member.obj, index)?;
        Ok(create_table_index_expression(table, index, original).into())
    }

    /// Index of `object[index]`, shifted to one-based for numeric indices
    /// into arrays.
    pub(crate) fn transform_element_index(&mut self, object: &ast::Expr, index: &ast::Expr) -> Result<Expression> {
        let lowered = self.transform_expression(index)?;
        let index_type = self.oracle.type_of_expr(index);
        if index_type.is_number_like() && self.oracle.type_of_expr(object).is_explicit_array() {
            return Ok(self.expression_plus_one(lowered));
        }
        Ok(lowered)
    }

    /// `super.name` and `super[name]`.
    pub(crate) fn transform_super_property(&mut self, prop: &ast::SuperPropExpr) -> Result<Expression> {
        let original = self.pos(prop.span);
        let prototype = self.transform_super_prototype(prop.obj.span)?;
        let key = match &prop.prop {
            ast::SuperProp::Ident(name) => create_string_literal(name.sym.to_string(), None),
            ast::SuperProp::Computed(computed) => self.transform_expression(&computed.expr)?,
        };
        Ok(create_table_index_expression(prototype, key, original).into())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};
    use tslua_lualib::LuaLibFeature;

    #[test]
    fn test_property_and_element_access() {
        let source = "declare const o: { a: number, [k: string]: number };\ndeclare const k: string;\nconst x = o.a;\nconst y = o[k];\nconst z = o[\"b\"];";
        let text = lower(source).text();
        assert!(text.contains("local x = o[\"a\"]\n"), "{}", text);
        assert!(text.contains("local y = o[k]\n"), "{}", text);
        assert!(text.contains("local z = o[\"b\"]\n"), "{}", text);
    }

    #[test]
    fn test_array_indices_are_shifted() {
        let source = "declare const xs: number[];\ndeclare const i: number;\nconst a = xs[0];\nconst b = xs[i];\nconst c = xs[i - 1];\nconst n = xs.length;";
        let text = lower(source).text();
        assert!(text.contains("local a = xs[1]\n"), "{}", text);
        assert!(text.contains("local b = xs[i + 1]\n"), "{}", text);
        assert!(text.contains("local c = xs[i]\n"), "{}", text);
        assert!(text.contains("local n = #xs\n"), "{}", text);
    }

    #[test]
    fn test_string_access() {
        let source = "declare const s: string;\nconst n = s.length;\nconst c = s[2];";
        let text = lower(source).text();
        assert!(text.contains("local n = #s\n"), "{}", text);
        assert!(text.contains("local c = string[\"sub\"](s, 3, 3)\n"), "{}", text);
    }

    #[test]
    fn test_unknown_string_property() {
        let error = lower_error("declare const s: string;\nconst n = (s as any as string).foo;");
        assert_eq!(error.kind, CompileErrorKind::unsupported_property("string", "foo"));
    }

    #[test]
    fn test_math_constants() {
        let text = lower("const a = Math.PI;\nconst b = Math.SQRT2;").text();
        assert!(text.contains("local a = math[\"pi\"]\n"), "{}", text);
        assert!(text.contains("local b = 1.4142135623730951\n"), "{}", text);
        let error = lower_error("const c = (Math as any as Math).whatever;");
        assert_eq!(error.kind, CompileErrorKind::unsupported_property("Math", "whatever"));
        let text = lower("const d = (Math as any as Math).PI;").text();
        assert!(text.contains("local d = math[\"pi\"]\n"), "{}", text);
    }

    #[test]
    fn test_enum_members_fold_to_values() {
        let text = lower("enum E { A = 3, B = \"b\" }\nconst a = E.A;\nconst b = E[\"B\"];").text();
        assert!(text.contains("local a = 3\n"), "{}", text);
        assert!(text.contains("local b = \"b\"\n"), "{}", text);
    }

    #[test]
    fn test_lua_table_length_and_element_access() {
        let source = "/** @luaTable */\ndeclare class Table { length: number; }\ndeclare const t: Table;\nconst n = t.length;";
        assert!(lower(source).text().contains("local n = #t\n"));
        let error = lower_error("/** @luaTable */\ndeclare class Table { length: number; }\ndeclare const t: Table;\nconst v = (t as any as Table)[\"x\"];");
        assert_eq!(error.kind, CompileErrorKind::unsupported_kind("LuaTable access expression", "ElementAccessExpression"));
    }

    #[test]
    fn test_collection_types_request_features() {
        let lowered = lower("declare const m: Map<string, number>;\nconst s = m.size;");
        assert!(lowered.features.contains(LuaLibFeature::Map), "{:?}", lowered.features);
    }
}
