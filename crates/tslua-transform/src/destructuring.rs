//! Destructuring declarations and assignments.
//!
//! Simple array patterns become Lua multiple assignment. Everything else
//! is expanded field by field from a table expression: nested patterns
//! extend the access path, defaults become `if x == nil` checks, and rest
//! elements call `__TS__ObjectRest` / `__TS__ArraySlice`.

use swc_common::Spanned;
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;

use crate::error::Result;
use crate::loops::is_simple_array_pattern;
use crate::transformer::{DeclarationSite, LuaTransformer};

/// `path[0][1]...` applied to `table`.
fn index_path(table: &Expression, path: &[Expression]) -> Expression {
    path.iter().fold(table.clone(), |acc, key| {
        create_table_index_expression(acc, key.clone(), None).into()
    })
}

/// One element of an object or array pattern, normalized.
struct PatternElement<'p> {
    /// Field key; `None` for array elements, which are positional.
    key: Option<&'p ast::PropName>,
    /// Shorthand `{ a }` binds the identifier named like the key.
    shorthand: Option<&'p ast::BindingIdent>,
    target: Option<&'p ast::Pat>,
    default: Option<&'p ast::Expr>,
    rest: bool,
}

fn split_default(pat: &ast::Pat) -> (&ast::Pat, Option<&ast::Expr>) {
    match pat {
        ast::Pat::Assign(assign) => (assign.left.as_ref(), Some(assign.right.as_ref())),
        other => (other, None),
    }
}

/// Elements of a pattern with their position; holes are skipped.
fn pattern_elements(pattern: &ast::Pat) -> Vec<(usize, PatternElement<'_>)> {
    match pattern {
        ast::Pat::Array(array) => array
            .elems
            .iter()
            .enumerate()
            .filter_map(|(index, element)| {
                let element = element.as_ref()?;
                let (target, rest) = match element {
                    ast::Pat::Rest(rest) => (rest.arg.as_ref(), true),
                    other => (other, false),
                };
                let (target, default) = split_default(target);
                Some((
                    index,
                    PatternElement {
                        key: None,
                        shorthand: None,
                        target: Some(target),
                        default,
                        rest,
                    },
                ))
            })
            .collect(),
        ast::Pat::Object(object) => object
            .props
            .iter()
            .enumerate()
            .map(|(index, prop)| {
                let element = match prop {
                    ast::ObjectPatProp::KeyValue(key_value) => {
                        let (target, default) = split_default(&key_value.value);
                        PatternElement {
                            key: Some(&key_value.key),
                            shorthand: None,
                            target: Some(target),
                            default,
                            rest: false,
                        }
                    }
                    ast::ObjectPatProp::Assign(assign) => PatternElement {
                        key: None,
                        shorthand: Some(&assign.key),
                        target: None,
                        default: assign.value.as_deref(),
                        rest: false,
                    },
                    ast::ObjectPatProp::Rest(rest) => PatternElement {
                        key: None,
                        shorthand: None,
                        target: Some(rest.arg.as_ref()),
                        default: None,
                        rest: true,
                    },
                };
                (index, element)
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl LuaTransformer<'_> {
    /// `const [a, b] = e` and `const { a, b } = e`.
    pub(crate) fn transform_destructuring_declaration(
        &mut self,
        declarator: &ast::VarDeclarator,
        block_scoped: bool,
    ) -> Result<Vec<Statement>> {
        let original = self.pos(declarator.span);
        if let ast::Pat::Array(array) = &declarator.name {
            if is_simple_array_pattern(array) {
                return self.transform_simple_array_declaration(declarator, array, block_scoped);
            }
        }

        let mut result = Vec::new();
        let table: Expression = match declarator.init.as_deref() {
            Some(ast::Expr::Ident(ident)) => self.transform_identifier_expression(ident)?,
            Some(init) => {
                let value = self.transform_expression(init)?;
                result.push(create_variable_declaration_statement(
                    vec![create_anonymous_identifier(original)],
                    Some(vec![value]),
                    original,
                ));
                create_anonymous_identifier(None).into()
            }
            None => create_anonymous_identifier(None).into(),
        };
        result.extend(self.transform_binding_pattern(&declarator.name, table, block_scoped)?);
        Ok(result)
    }

    /// `local a, b = f()` for tuple-return calls, `local a, b = 1, 2` for
    /// array literals and `local a, b = unpack(e)` otherwise.
    fn transform_simple_array_declaration(
        &mut self,
        declarator: &ast::VarDeclarator,
        array: &ast::ArrayPat,
        block_scoped: bool,
    ) -> Result<Vec<Statement>> {
        let mut names = Vec::new();
        for element in &array.elems {
            names.push(match element {
                Some(ast::Pat::Ident(binding)) => self.transform_identifier(&binding.id)?,
                _ => create_anonymous_identifier(None),
            });
        }
        if names.is_empty() {
            names.push(create_anonymous_identifier(self.pos(array.span)));
        }

        let values = match declarator.init.as_deref() {
            Some(ast::Expr::Call(call)) if self.is_tuple_return_call(call) => {
                vec![self.transform_call_expression(call, false)?]
            }
            Some(ast::Expr::Array(literal)) if literal.elems.is_empty() => vec![create_nil_literal(None)],
            Some(ast::Expr::Array(literal)) => self.transform_array_elements_as_values(literal)?,
            Some(init) => {
                let value = self.transform_expression(init)?;
                vec![self.create_unpack_call(value, self.pos(init.span()))]
            }
            None => vec![create_nil_literal(None)],
        };
        let site = DeclarationSite {
            span: Some(declarator.span),
            variable: true,
            block_scoped,
            first_declaration: true,
            ..Default::default()
        };
        self.create_local_or_exported_or_global_declaration(names, Some(values), site, None)
    }

    /// Elements of an array literal as a value list; a trailing spread
    /// expands in place.
    pub(crate) fn transform_array_elements_as_values(&mut self, literal: &ast::ArrayLit) -> Result<Vec<Expression>> {
        let mut values = Vec::new();
        for element in &literal.elems {
            values.push(match element {
                Some(element) if element.spread.is_some() => self.transform_spread(&element.expr, element.span())?,
                Some(element) => self.transform_expression(&element.expr)?,
                None => create_nil_literal(None),
            });
        }
        Ok(values)
    }

    /// Declares every binding of `pattern`, reading from `table`.
    pub(crate) fn transform_binding_pattern(
        &mut self,
        pattern: &ast::Pat,
        table: Expression,
        block_scoped: bool,
    ) -> Result<Vec<Statement>> {
        let mut result = Vec::new();
        self.expand_binding_pattern(pattern, &table, &mut Vec::new(), block_scoped, &mut result)?;
        Ok(result)
    }

    fn expand_binding_pattern(
        &mut self,
        pattern: &ast::Pat,
        table: &Expression,
        path: &mut Vec<Expression>,
        block_scoped: bool,
        result: &mut Vec<Statement>,
    ) -> Result<()> {
        let object = matches!(pattern, ast::Pat::Object(_));
        let elements = pattern_elements(pattern);
        let count = match pattern {
            ast::Pat::Array(array) => array.elems.len(),
            ast::Pat::Object(object) => object.props.len(),
            _ => 0,
        };

        for (index, element) in &elements {
            if element.rest && index + 1 != count {
                continue;
            }
            let key = match (element.key, element.shorthand) {
                (Some(key), _) => Some(self.transform_property_name(key)?),
                (None, Some(shorthand)) => Some(create_string_literal(shorthand.id.sym.to_string(), None)),
                (None, None) if !object => Some(create_numeric_literal((index + 1) as f64, None)),
                (None, None) => None,
            };

            let nested = element
                .target
                .filter(|target| matches!(target, ast::Pat::Array(_) | ast::Pat::Object(_)));
            if let Some(target) = nested {
                if let Some(key) = key {
                    path.push(key);
                    self.expand_binding_pattern(target, table, path, block_scoped, result)?;
                    path.pop();
                }
                continue;
            }

            let ident = match (element.target, element.shorthand) {
                (Some(ast::Pat::Ident(binding)), _) => &binding.id,
                (None, Some(shorthand)) => &shorthand.id,
                (Some(other), _) => return Err(self.unsupported("destructuring element", "Pattern", other.span())),
                (None, None) => continue,
            };
            let source = index_path(table, path);
            let value = if element.rest {
                self.create_rest_value(&elements, source, object, *index)?
            } else {
                let Some(key) = key else { continue };
                create_table_index_expression(source, key, self.pos(ident.span)).into()
            };

            let name = self.transform_identifier(ident)?;
            let site = DeclarationSite {
                variable: true,
                block_scoped,
                first_declaration: true,
                ..Default::default()
            };
            result.extend(self.create_local_or_exported_or_global_declaration(
                vec![clone_identifier(&name, None)],
                Some(vec![value]),
                site,
                None,
            )?);
            if let Some(default) = element.default {
                result.push(self.create_default_check(name, default)?);
            }
        }
        Ok(())
    }

    /// `__TS__ObjectRest(t, {a = true, ...})` or `__TS__ArraySlice(t, i)`.
    fn create_rest_value(
        &mut self,
        elements: &[(usize, PatternElement<'_>)],
        source: Expression,
        object: bool,
        index: usize,
    ) -> Result<Expression> {
        if !object {
            return Ok(self.lualib_call(
                LuaLibFeature::ArraySlice,
                vec![source, create_numeric_literal(index as f64, None)],
                None,
            ));
        }
        let mut used = Vec::new();
        for (_, element) in elements.iter().filter(|(_, element)| !element.rest) {
            let key = match (element.key, element.shorthand) {
                (Some(key), _) => self.transform_property_name(key)?,
                (None, Some(shorthand)) => create_string_literal(shorthand.id.sym.to_string(), None),
                (None, None) => continue,
            };
            used.push(create_table_field_expression(create_boolean_literal(true, None), Some(key), None));
        }
        Ok(self.lualib_call(
            LuaLibFeature::ObjectRest,
            vec![source, create_table_expression(used, None)],
            None,
        ))
    }

    /// `if x == nil then x = default end`, export aware.
    fn create_default_check(&mut self, name: Identifier, default: &ast::Expr) -> Result<Statement> {
        let value = self.transform_expression(default)?;
        let reference = self.add_export_to_identifier(clone_identifier(&name, None));
        let target = self.add_export_to_assignment_target(name);
        let condition = create_binary_expression(reference, create_nil_literal(None), BinaryOperator::Equality, None);
        let assignment = create_assignment_statement(vec![target], vec![value], None);
        Ok(create_if_statement(condition, create_block(vec![assignment], None), None, None).into())
    }

    /// `[a, b] = e` and `({ a, b } = e)` as statements.
    pub(crate) fn transform_destructuring_assignment(
        &mut self,
        pattern: &ast::Pat,
        right: &ast::Expr,
        span: swc_common::Span,
    ) -> Result<Vec<Statement>> {
        let original = self.pos(span);
        if let ast::Pat::Array(array) = pattern {
            if array.elems.iter().all(|element| matches!(element, None | Some(ast::Pat::Ident(_) | ast::Pat::Expr(_)))) {
                let mut targets = Vec::new();
                for element in &array.elems {
                    targets.push(match element {
                        Some(element) => self.transform_assignment_target_pat(element)?,
                        None => create_anonymous_identifier(None).into(),
                    });
                }
                if targets.is_empty() {
                    targets.push(create_anonymous_identifier(None).into());
                }
                let values = match right {
                    ast::Expr::Array(literal) if literal.elems.is_empty() => vec![create_nil_literal(None)],
                    ast::Expr::Array(literal) => self.transform_array_elements_as_values(literal)?,
                    ast::Expr::Call(call) if self.is_tuple_return_call(call) => {
                        vec![self.transform_call_expression(call, false)?]
                    }
                    other => {
                        let value = self.transform_expression(other)?;
                        vec![self.create_unpack_call(value, self.pos(other.span()))]
                    }
                };
                return Ok(vec![create_assignment_statement(targets, values, original)]);
            }
        }

        let value = self.transform_expression(right)?;
        let temporary = create_identifier("____tmp", None, None, None);
        let mut body = vec![create_variable_declaration_statement(
            vec![clone_identifier(&temporary, None)],
            Some(vec![value]),
            original,
        )];
        body.extend(self.assign_pattern_from_table(pattern, &temporary.into())?);
        Ok(vec![create_do_statement(body, original)])
    }

    /// `([a, b] = e)` used as a value: assigns through a temporary table
    /// and yields it.
    pub(crate) fn transform_destructuring_assignment_expression(
        &mut self,
        pattern: &ast::Pat,
        right: &ast::Expr,
        span: swc_common::Span,
    ) -> Result<Expression> {
        let value = match right {
            ast::Expr::Call(call) if self.is_tuple_return_call(call) => {
                let call = self.transform_call_expression(call, false)?;
                self.wrap_in_table(vec![call])
            }
            other => self.transform_expression(other)?,
        };
        let temporary = create_identifier("____tmp", None, None, None);
        let mut statements = vec![create_variable_declaration_statement(
            vec![clone_identifier(&temporary, None)],
            Some(vec![value]),
            None,
        )];
        statements.extend(self.assign_pattern_from_table(pattern, &clone_identifier(&temporary, None).into())?);
        Ok(self.create_immediately_invoked_function_expression(statements, vec![temporary.into()], self.pos(span)))
    }

    /// Assigns every target of an assignment pattern from `table`.
    fn assign_pattern_from_table(&mut self, pattern: &ast::Pat, table: &Expression) -> Result<Vec<Statement>> {
        let mut result = Vec::new();
        let object = matches!(pattern, ast::Pat::Object(_));
        let elements = pattern_elements(pattern);
        for (index, element) in &elements {
            let key = match (element.key, element.shorthand) {
                (Some(key), _) => Some(self.transform_property_name(key)?),
                (None, Some(shorthand)) => Some(create_string_literal(shorthand.id.sym.to_string(), None)),
                (None, None) if !object => Some(create_numeric_literal((index + 1) as f64, None)),
                (None, None) => None,
            };
            let value = if element.rest {
                self.create_rest_value(&elements, table.clone(), object, *index)?
            } else {
                let Some(key) = key else { continue };
                create_table_index_expression(table.clone(), key, None).into()
            };

            match (element.target, element.shorthand) {
                (Some(nested), _) if matches!(nested, ast::Pat::Array(_) | ast::Pat::Object(_)) => {
                    let temporary = create_identifier("____nested", None, None, None);
                    let mut body = vec![create_variable_declaration_statement(
                        vec![clone_identifier(&temporary, None)],
                        Some(vec![value]),
                        None,
                    )];
                    body.extend(self.assign_pattern_from_table(nested, &temporary.into())?);
                    result.push(create_do_statement(body, None));
                }
                (Some(target), _) => {
                    let target = self.transform_assignment_target_pat(target)?;
                    result.push(create_assignment_statement(vec![target.clone()], vec![value], None));
                    if let Some(default) = element.default {
                        result.push(self.create_target_default_check(target, default)?);
                    }
                }
                (None, Some(shorthand)) => {
                    let target = self.transform_assignment_target_pat(&ast::Pat::Ident(shorthand.clone()))?;
                    result.push(create_assignment_statement(vec![target.clone()], vec![value], None));
                    if let Some(default) = element.default {
                        result.push(self.create_target_default_check(target, default)?);
                    }
                }
                (None, None) => {}
            }
        }
        Ok(result)
    }

    fn create_target_default_check(&mut self, target: AssignmentLeftHandSide, default: &ast::Expr) -> Result<Statement> {
        let value = self.transform_expression(default)?;
        let condition = create_binary_expression(
            Expression::from(target.clone()),
            create_nil_literal(None),
            BinaryOperator::Equality,
            None,
        );
        let assignment = create_assignment_statement(vec![target], vec![value], None);
        Ok(create_if_statement(condition, create_block(vec![assignment], None), None, None).into())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::lower;
    use tslua_lualib::LuaLibFeature;

    #[test]
    fn test_object_rest_excludes_named_keys() {
        let lowered = lower("declare const obj: { a: number, b: number, c: number };\nconst { a, ...rest } = obj;");
        let text = lowered.text();
        assert_eq!(
            text,
            "local a = obj[\"a\"]\nlocal rest = __TS__ObjectRest(obj, {[\"a\"] = true})\n"
        );
        assert!(lowered.features.contains(LuaLibFeature::ObjectRest));
    }

    #[test]
    fn test_simple_array_patterns_use_multiple_assignment() {
        let source = "declare const xs: number[];\nconst [a, b] = xs;\nconst [c, , d] = [1, 2, 3];\n/** @tupleReturn */\ndeclare function pair(this: void): [number, number];\nconst [e, f] = pair();\nconst single = pair();";
        let text = lower(source).text();
        assert!(text.contains("local a, b = unpack(xs)\n"), "{}", text);
        assert!(text.contains("local c, ____, d = 1, 2, 3\n"), "{}", text);
        assert!(text.contains("local e, f = pair()\n"), "{}", text);
        assert!(text.contains("local single = ({pair()})\n"), "{}", text);
    }

    #[test]
    fn test_nested_pattern_and_defaults() {
        let source = "declare const o: { p: { x: number }, q?: number, r: number[] };\nconst { p: { x }, q = 5, r: [first, ...others] } = o;";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(text.contains("local x = o[\"p\"][\"x\"]\n"), "{}", text);
        assert!(text.contains("local q = o[\"q\"]\nif q == nil then\n    q = 5\nend\n"), "{}", text);
        assert!(text.contains("local first = o[\"r\"][1]\n"), "{}", text);
        assert!(text.contains("local others = __TS__ArraySlice(o[\"r\"], 1)\n"), "{}", text);
        assert!(lowered.features.contains(LuaLibFeature::ArraySlice));
    }

    #[test]
    fn test_non_identifier_initializer_is_cached() {
        let source = "declare function get(this: void): { a: number };\nconst { a } = get();";
        let text = lower(source).text();
        assert_eq!(text, "local ____ = get()\nlocal a = ____[\"a\"]\n");
    }

    #[test]
    fn test_destructuring_assignment_statements() {
        let source = "let a = 1;\nlet b = 2;\n[a, b] = [b, a];\ndeclare const o: { a: number, b: number };\n({ a, b } = o);";
        let text = lower(source).text();
        assert!(text.contains("a, b = b, a\n"), "{}", text);
        assert!(text.contains("do\n    local ____tmp = o\n    a = ____tmp[\"a\"]\n    b = ____tmp[\"b\"]\nend\n"), "{}", text);
    }
}
