//! Functions: declarations, expressions, arrows, parameters, bodies,
//! generators and `return`.

use swc_common::{Span, Spanned};
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::{ContextType, DirectiveKind, Type};

use crate::error::{CompileErrorKind, Result};
use crate::scope::{FunctionDefinition, Scope, ScopeKind};
use crate::transformer::{DeclarationSite, FunctionContext, LuaTransformer};

/// Body of a function-like node.
#[derive(Clone, Copy)]
pub(crate) enum FunctionBody<'b> {
    Block(&'b ast::BlockStmt),
    /// Arrow function expression body, lowered as a single `return`.
    Expression(&'b ast::Expr),
}

/// Lowered parameter list.
pub(crate) struct Parameters {
    pub names: Vec<Identifier>,
    pub dots: bool,
    pub rest: Option<Identifier>,
}

/// Splits a parameter pattern into its binding, default value and whether
/// it is a rest parameter.
fn parameter_parts(pat: &ast::Pat) -> (&ast::Pat, Option<&ast::Expr>, bool) {
    match pat {
        ast::Pat::Assign(assign) => (assign.left.as_ref(), Some(assign.right.as_ref()), false),
        ast::Pat::Rest(rest) => (rest.arg.as_ref(), None, true),
        other => (other, None, false),
    }
}

fn is_this_parameter(pat: &ast::Pat) -> bool {
    matches!(pat, ast::Pat::Ident(binding) if &*binding.id.sym == "this")
}

fn is_binding_pattern(pat: &ast::Pat) -> bool {
    matches!(pat, ast::Pat::Array(_) | ast::Pat::Object(_))
}

impl LuaTransformer<'_> {
    pub(crate) fn transform_function_declaration(
        &mut self,
        ident: &ast::Ident,
        function: &ast::Function,
        site: Span,
    ) -> Result<Vec<Statement>> {
        let Some(body) = &function.body else {
            return Ok(Vec::new());
        };
        self.check_async(function.is_async, function.span)?;

        let ty = self.oracle.function_type(function.span).unwrap_or(Type::Any);
        let context = (self.oracle.function_context_type(&ty) != ContextType::Void)
            .then(|| self.create_self_identifier(None));
        let pats: Vec<&ast::Pat> = function.params.iter().map(|p| &p.pat).collect();
        let parameters = self.transform_parameters(&pats, context)?;
        let name = self.transform_identifier(ident)?;

        let info = self.function_context_of_type(&ty);
        let (statements, scope) = self.transform_function_like_body(
            &pats,
            FunctionBody::Block(body),
            parameters.rest.as_ref(),
            info,
            function.is_generator,
        )?;
        let expression = create_function_expression(
            create_block(statements, None),
            parameters.names,
            parameters.dots,
            parameters.rest,
            FunctionExpressionFlags::DECLARATION,
            self.pos(function.span),
        );

        if let (false, Some(symbol_id)) = (self.options.no_hoisting, name.symbol_id) {
            let mut referenced_symbols: Vec<u32> = scope.referenced_symbols.keys().copied().collect();
            referenced_symbols.sort_unstable();
            self.peek_scope_mut().function_definitions.push((
                symbol_id,
                FunctionDefinition {
                    referenced_symbols,
                    definition: None,
                },
            ));
        }

        self.create_local_or_exported_or_global_declaration(
            vec![name],
            Some(vec![expression]),
            DeclarationSite::function(site),
            None,
        )
    }

    /// `function(...) end` from a function expression; a named expression
    /// that refers to itself is wrapped so the name is bound locally.
    /// `node` is the expression wrapping `expression`.
    pub(crate) fn transform_function_expression(&mut self, node: &ast::Expr, expression: &ast::FnExpr) -> Result<Expression> {
        let function = &expression.function;
        let Some(body) = &function.body else {
            return Err(self.error(CompileErrorKind::UnsupportedFunctionWithoutBody, function.span));
        };
        self.check_async(function.is_async, function.span)?;

        let ty = self.oracle.function_type(function.span).unwrap_or(Type::Any);
        let context = (self.oracle.function_context_type(&ty) != ContextType::Void)
            .then(|| self.create_self_identifier(None));
        let pats: Vec<&ast::Pat> = function.params.iter().map(|p| &p.pat).collect();
        let parameters = self.transform_parameters(&pats, context)?;

        let info = self.function_context_of_expression(node, &ty);
        let (statements, scope) = self.transform_function_like_body(
            &pats,
            FunctionBody::Block(body),
            parameters.rest.as_ref(),
            info,
            function.is_generator,
        )?;
        let result = create_function_expression(
            create_block(statements, None),
            parameters.names,
            parameters.dots,
            parameters.rest,
            FunctionExpressionFlags::NONE,
            self.pos(function.span),
        );

        if let Some(ident) = &expression.ident {
            let referenced = self
                .oracle
                .symbol_at(ident)
                .and_then(|symbol| self.known_symbol_id(symbol))
                .map_or(false, |id| scope.referenced_symbols.contains_key(&id));
            if referenced {
                let name = self.transform_identifier(ident)?;
                let declaration = create_variable_declaration_statement(vec![name.clone()], Some(vec![result]), None);
                let reference = clone_identifier(&name, None);
                return Ok(self.create_immediately_invoked_function_expression(
                    vec![declaration],
                    vec![reference.into()],
                    self.pos(function.span),
                ));
            }
        }
        Ok(result)
    }

    /// Object literal methods, class methods and accessors.
    pub(crate) fn transform_method_function(&mut self, function: &ast::Function) -> Result<Expression> {
        let Some(body) = &function.body else {
            return Err(self.error(CompileErrorKind::UnsupportedFunctionWithoutBody, function.span));
        };
        self.check_async(function.is_async, function.span)?;

        let ty = self.oracle.function_type(function.span).unwrap_or(Type::Any);
        let context = (self.oracle.function_context_type(&ty) != ContextType::Void)
            .then(|| self.create_self_identifier(None));
        let pats: Vec<&ast::Pat> = function.params.iter().map(|p| &p.pat).collect();
        let parameters = self.transform_parameters(&pats, context)?;
        let info = self.function_context_of_type(&ty);
        let (statements, _) = self.transform_function_like_body(
            &pats,
            FunctionBody::Block(body),
            parameters.rest.as_ref(),
            info,
            function.is_generator,
        )?;
        Ok(create_function_expression(
            create_block(statements, None),
            parameters.names,
            parameters.dots,
            parameters.rest,
            FunctionExpressionFlags::DECLARATION,
            self.pos(function.span),
        ))
    }

    pub(crate) fn transform_arrow_function(&mut self, node: &ast::Expr, arrow: &ast::ArrowExpr) -> Result<Expression> {
        self.check_async(arrow.is_async, arrow.span)?;
        let ty = self.oracle.function_type(arrow.span).unwrap_or(Type::Any);
        let context = (self.oracle.function_context_type(&ty) != ContextType::Void && !arrow.params.is_empty())
            .then(|| create_anonymous_identifier(None));
        let pats: Vec<&ast::Pat> = arrow.params.iter().collect();
        let parameters = self.transform_parameters(&pats, context)?;

        let (body, flags) = match arrow.body.as_ref() {
            ast::BlockStmtOrExpr::BlockStmt(block) => (FunctionBody::Block(block), FunctionExpressionFlags::NONE),
            ast::BlockStmtOrExpr::Expr(expression) => (FunctionBody::Expression(expression), FunctionExpressionFlags::INLINE),
        };
        let info = self.function_context_of_expression(node, &ty);
        let (statements, _) =
            self.transform_function_like_body(&pats, body, parameters.rest.as_ref(), info, arrow.is_generator)?;
        Ok(create_function_expression(
            create_block(statements, None),
            parameters.names,
            parameters.dots,
            parameters.rest,
            flags,
            self.pos(arrow.span),
        ))
    }

    fn check_async(&self, is_async: bool, span: Span) -> Result<()> {
        if is_async {
            return Err(self.unsupported("function modifier", "async", span));
        }
        Ok(())
    }

    /// Whether calls through `ty` return multiple Lua values.
    pub(crate) fn is_tuple_return_type(&self, ty: &Type) -> bool {
        self.oracle.type_directives(ty).has(DirectiveKind::TupleReturn)
            || ty
                .call_signatures()
                .iter()
                .any(|signature| signature.directives.has(DirectiveKind::TupleReturn))
    }

    pub(crate) fn function_context_of_type(&self, ty: &Type) -> FunctionContext {
        FunctionContext {
            tuple_return: self.is_tuple_return_type(ty),
            return_type: ty.call_signatures().first().map(|signature| signature.return_type.clone()),
        }
    }

    /// Function expressions also take `@tupleReturn` from the type they are
    /// assigned to.
    fn function_context_of_expression(&self, expression: &ast::Expr, ty: &Type) -> FunctionContext {
        let mut info = self.function_context_of_type(ty);
        if let Some(contextual) = self.oracle.contextual_type(expression) {
            info.tuple_return |= self.is_tuple_return_type(&contextual.non_nullable());
        }
        info
    }

    /// Parameter identifiers, with the context parameter first. A `this`
    /// parameter is dropped, binding patterns get placeholder names and a
    /// rest parameter becomes `...`.
    pub(crate) fn transform_parameters(&mut self, params: &[&ast::Pat], context: Option<Identifier>) -> Result<Parameters> {
        let mut names: Vec<Identifier> = context.into_iter().collect();
        let mut rest = None;
        let mut pattern_index = 0;
        for pat in params {
            if is_this_parameter(pat) {
                continue;
            }
            let (binding, _, is_rest) = parameter_parts(pat);
            let name = match binding {
                ast::Pat::Ident(ident) => self.transform_identifier(&ident.id)?,
                other if is_binding_pattern(other) => {
                    let name = create_identifier(format!("____bindingPattern{}", pattern_index), None, None, None);
                    pattern_index += 1;
                    name
                }
                other => return Err(self.unsupported("parameter", "Pattern", other.span())),
            };
            if is_rest {
                rest = Some(name);
            } else {
                names.push(name);
            }
        }
        let dots = rest.is_some();
        Ok(Parameters { names, dots, rest })
    }

    /// Lowers a body in a function scope, hoists it and returns it with the
    /// popped scope.
    pub(crate) fn transform_function_body_statements(
        &mut self,
        body: FunctionBody<'_>,
        info: FunctionContext,
    ) -> Result<(Vec<Statement>, Scope)> {
        self.push_scope(ScopeKind::FUNCTION);
        self.function_stack.push(info);
        let statements = match body {
            FunctionBody::Block(block) => self.transform_statements(&block.stmts),
            FunctionBody::Expression(expression) => self
                .transform_return(Some(expression), expression.span())
                .map(|statement| vec![statement]),
        };
        self.function_stack.pop();
        let scope = self.pop_scope();
        let statements = self.perform_hoisting(&scope, statements?);
        Ok((statements, scope))
    }

    /// Default values, the rest table and binding pattern expansion that
    /// open a function body.
    pub(crate) fn transform_function_body_header(
        &mut self,
        scope: &Scope,
        params: &[&ast::Pat],
        rest: Option<&Identifier>,
    ) -> Result<Vec<Statement>> {
        let mut header = Vec::new();
        let mut patterns = Vec::new();
        let mut pattern_index = 0;
        for pat in params {
            if is_this_parameter(pat) {
                continue;
            }
            let (binding, default, _) = parameter_parts(pat);
            match binding {
                ast::Pat::Ident(ident) => {
                    if let Some(default) = default {
                        let name = self.transform_identifier(&ident.id)?;
                        header.push(self.transform_parameter_default_value(name, default)?);
                    }
                }
                other if is_binding_pattern(other) => {
                    let name = create_identifier(format!("____bindingPattern{}", pattern_index), None, None, None);
                    pattern_index += 1;
                    if let Some(default) = default {
                        header.push(self.transform_parameter_default_value(clone_identifier(&name, None), default)?);
                    }
                    patterns.extend(self.transform_binding_pattern(other, name.into(), true)?);
                }
                _ => {}
            }
        }

        if let Some(rest) = rest {
            if self.is_rest_parameter_referenced(rest, scope) {
                let table = self.wrap_in_table(vec![create_dots_literal(None)]);
                header.push(create_variable_declaration_statement(
                    vec![clone_identifier(rest, None)],
                    Some(vec![table]),
                    None,
                ));
            }
        }
        header.extend(patterns);
        Ok(header)
    }

    /// Body plus header; generators are wrapped into a coroutine-backed
    /// iterator.
    pub(crate) fn transform_function_like_body(
        &mut self,
        params: &[&ast::Pat],
        body: FunctionBody<'_>,
        rest: Option<&Identifier>,
        info: FunctionContext,
        generator: bool,
    ) -> Result<(Vec<Statement>, Scope)> {
        let (statements, scope) = self.transform_function_body_statements(body, info)?;
        let mut header = self.transform_function_body_header(&scope, params, rest)?;
        if generator {
            let spread = header
                .iter()
                .position(|statement| matches!(statement, Statement::VariableDeclaration(local) if rest.map_or(false, |r| local.left.first().map(|l| l.text.as_str()) == Some(r.text.as_str()))));
            let rest_table = spread.map(|index| header.remove(index));
            header.extend(statements);
            let mut wrapped: Vec<Statement> = rest_table.into_iter().collect();
            wrapped.extend(self.create_generator_body(header));
            return Ok((wrapped, scope));
        }
        header.extend(statements);
        Ok((header, scope))
    }

    fn is_rest_parameter_referenced(&self, rest: &Identifier, scope: &Scope) -> bool {
        match rest.symbol_id {
            Some(id) => scope.referenced_symbols.contains_key(&id),
            None => true,
        }
    }

    /// `if p == nil then p = v end`
    fn transform_parameter_default_value(&mut self, name: Identifier, value: &ast::Expr) -> Result<Statement> {
        let value = self.transform_expression(value)?;
        let condition = create_binary_expression(
            clone_identifier(&name, None).into(),
            create_nil_literal(None),
            BinaryOperator::Equality,
            None,
        );
        let assignment = create_assignment_statement(vec![name.into()], vec![value], None);
        Ok(create_if_statement(condition, create_block(vec![assignment], None), None, None).into())
    }

    /// Runs `body` in a coroutine and returns an iterator object whose
    /// `next` resumes it.
    fn create_generator_body(&mut self, body: Vec<Statement>) -> Vec<Statement> {
        self.import_feature(LuaLibFeature::Symbol);
        let ident = |name: &str| create_identifier(name, None, None, None);
        let coroutine_member = |name: &str| -> Expression {
            create_table_index_expression(ident("coroutine").into(), create_string_literal(name, None), None).into()
        };

        let function = create_function_expression(create_block(body, None), vec![], false, None, FunctionExpressionFlags::NONE, None);
        let coroutine = create_variable_declaration_statement(
            vec![ident("____co")],
            Some(vec![create_call_expression(coroutine_member("create"), vec![function], None)]),
            None,
        );

        let resume = create_call_expression(
            coroutine_member("resume"),
            vec![ident("____co").into(), create_dots_literal(None)],
            None,
        );
        let resumed = create_variable_declaration_statement(vec![ident("____err"), ident("____value")], Some(vec![resume]), None);
        let raise = create_expression_statement(
            create_call_expression(ident("error").into(), vec![ident("____value").into()], None),
            None,
        );
        let check: Statement = create_if_statement(
            create_unary_expression(ident("____err").into(), UnaryOperator::Not, None),
            create_block(vec![raise], None),
            None,
            None,
        )
        .into();
        let status = create_binary_expression(
            create_call_expression(coroutine_member("status"), vec![ident("____co").into()], None),
            create_string_literal("dead", None),
            BinaryOperator::Equality,
            None,
        );
        let result = create_table_expression(
            vec![
                create_table_field_expression(status, Some(create_string_literal("done", None)), None),
                create_table_field_expression(ident("____value").into(), Some(create_string_literal("value", None)), None),
            ],
            None,
        );
        let next = create_function_expression(
            create_block(vec![resumed, check, create_return_statement(vec![result], None)], None),
            vec![create_anonymous_identifier(None)],
            true,
            None,
            FunctionExpressionFlags::NONE,
            None,
        );
        let iterator = create_variable_declaration_statement(
            vec![ident("____it")],
            Some(vec![create_table_expression(
                vec![create_table_field_expression(next, Some(create_string_literal("next", None)), None)],
                None,
            )]),
            None,
        );
        let symbol_iterator: Expression =
            create_table_index_expression(ident("Symbol").into(), create_string_literal("iterator", None), None).into();
        let returns_self = create_function_expression(
            create_block(vec![create_return_statement(vec![ident("____it").into()], None)], None),
            vec![],
            false,
            None,
            FunctionExpressionFlags::NONE,
            None,
        );
        let self_iterable = create_assignment_statement(
            vec![create_table_index_expression(ident("____it").into(), symbol_iterator, None).into()],
            vec![returns_self],
            None,
        );
        vec![
            coroutine,
            iterator,
            self_iterable,
            create_return_statement(vec![ident("____it").into()], None),
        ]
    }

    /// `coroutine.yield(e)`
    pub(crate) fn transform_yield_expression(&mut self, expression: &ast::YieldExpr) -> Result<Expression> {
        if expression.delegate {
            return Err(self.unsupported("yield", "yield*", expression.span));
        }
        let params = match &expression.arg {
            Some(argument) => vec![self.transform_expression(argument)?],
            None => Vec::new(),
        };
        let coroutine = create_identifier("coroutine", None, None, None);
        let function = create_table_index_expression(coroutine.into(), create_string_literal("yield", None), None);
        Ok(create_call_expression(function.into(), params, self.pos(expression.span)))
    }

    pub(crate) fn transform_return_statement(&mut self, statement: &ast::ReturnStmt) -> Result<Statement> {
        self.transform_return(statement.arg.as_deref(), statement.span)
    }

    /// Marks every scope up to the function as returned; inside a `try` or
    /// `catch` the value is prefixed with `true` so the protected call can
    /// tell a return from falling off the end.
    pub(crate) fn transform_return(&mut self, argument: Option<&ast::Expr>, span: Span) -> Result<Statement> {
        let mut inside_try_catch = false;
        for scope in self.scopes_mut() {
            scope.function_returned = true;
            if scope.kind == ScopeKind::FUNCTION {
                break;
            }
            inside_try_catch |= scope.kind.intersects(ScopeKind::TRY | ScopeKind::CATCH);
        }

        let info = self.function_stack.last().cloned().unwrap_or_default();
        let mut results = match argument {
            Some(expression) => {
                let ty = self.oracle.type_of_expr(expression);
                if let Some(return_type) = &info.return_type {
                    self.validate_function_assignment(expression.span(), &ty, return_type, None)?;
                }
                if info.tuple_return {
                    let results = self.transform_tuple_return_values(expression, &ty)?;
                    if inside_try_catch {
                        vec![self.wrap_in_table(results)]
                    } else {
                        results
                    }
                } else {
                    vec![self.transform_expression(expression)?]
                }
            }
            None => Vec::new(),
        };
        if inside_try_catch {
            results.insert(0, create_boolean_literal(true, None));
        }
        Ok(create_return_statement(results, self.pos(span)))
    }

    /// Values returned from a `@tupleReturn` function: array literal
    /// elements directly, other arrays unpacked, tuple-return calls
    /// forwarded.
    fn transform_tuple_return_values(&mut self, expression: &ast::Expr, ty: &Type) -> Result<Vec<Expression>> {
        match expression {
            ast::Expr::Array(array) => array
                .elems
                .iter()
                .map(|element| match element {
                    Some(element) if element.spread.is_some() => self.transform_spread(&element.expr, element.span()),
                    Some(element) => self.transform_expression(&element.expr),
                    None => Ok(create_nil_literal(None)),
                })
                .collect(),
            ast::Expr::Paren(paren) => self.transform_tuple_return_values(&paren.expr, ty),
            ast::Expr::Call(call) if self.is_tuple_return_call(call) => {
                Ok(vec![self.transform_call_expression(call, false)?])
            }
            other if ty.is_explicit_array() => {
                let value = self.transform_expression(other)?;
                Ok(vec![self.create_unpack_call(value, self.pos(other.span()))])
            }
            other => Ok(vec![self.transform_expression(other)?]),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};

    #[test]
    fn test_function_declaration_takes_self() {
        let text = lower("function f(a: number, b: number) { return a + b; }").text();
        assert_eq!(text, "f = function(self, a, b)\n    return a + b\nend\n");
    }

    #[test]
    fn test_void_context_drops_self() {
        let text = lower("function f(this: void, a: number) { return a; }\n/** @noSelf */\ndeclare function g(): void;").text();
        assert!(text.starts_with("f = function(a)\n"), "{}", text);
    }

    #[test]
    fn test_arrow_context_placeholder() {
        let text = lower("const f = (a: number) => a;\nconst g = () => 1;").text();
        assert!(text.contains("local f\nf = function(____, a)\n    return a\nend"), "{}", text);
        assert!(text.contains("local g\ng = function()\n    return 1\nend"), "{}", text);
    }

    #[test]
    fn test_default_parameter() {
        let text = lower("function f(a = 1) { return a; }").text();
        assert!(text.contains("    if a == nil then\n        a = 1\n    end\n    return a\n"), "{}", text);
    }

    #[test]
    fn test_rest_parameter_table_only_when_used() {
        let text = lower("function f(...args: number[]) { return args; }\nfunction g(...args: number[]) { return 1; }").text();
        assert!(text.contains("f = function(self, ...)\n    local args = ({...})\n    return args\n"), "{}", text);
        assert!(text.contains("g = function(self, ...)\n    return 1\n"), "{}", text);
    }

    #[test]
    fn test_binding_pattern_parameter() {
        let text = lower("function f({ a, b }: { a: number, b: number }) { return a + b; }").text();
        assert!(text.contains("f = function(self, ____bindingPattern0)\n"), "{}", text);
        assert!(text.contains("local a = ____bindingPattern0[\"a\"]"), "{}", text);
        assert!(text.contains("local b = ____bindingPattern0[\"b\"]"), "{}", text);
    }

    #[test]
    fn test_self_referencing_function_expression() {
        let text = lower("const f = function fact(n: number): number { return n <= 1 ? 1 : n * fact(n - 1); };").text();
        assert!(text.contains("local f\nf = (function()\n    local fact = function(self, n)"), "{}", text);
        assert!(text.contains("fact(nil, n - 1)"), "{}", text);
        assert!(text.contains("return fact\nend)()"), "{}", text);
    }

    #[test]
    fn test_generator_is_coroutine_iterator() {
        let lowered = lower("function* count() { yield 1; yield 2; }");
        let text = lowered.text();
        assert!(text.contains("local ____co = coroutine[\"create\"](function()"), "{}", text);
        assert!(text.contains("coroutine[\"yield\"](1)"), "{}", text);
        assert!(text.contains("____it[Symbol[\"iterator\"]] = function()"), "{}", text);
        assert!(lowered.features.contains(tslua_lualib::LuaLibFeature::Symbol));
    }

    #[test]
    fn test_tuple_return_values() {
        let source = "/** @tupleReturn */\nfunction pair(): [number, number] { return [1, 2]; }\n/** @tupleReturn */\nfunction forward(): [number, number] { return pair(); }\n/** @tupleReturn */\nfunction spread(xs: number[]): number[] { return xs; }";
        let text = lower(source).text();
        assert!(text.contains("    return 1, 2\n"), "{}", text);
        assert!(text.contains("    return pair(nil)\n"), "{}", text);
        assert!(text.contains("    return unpack(xs)\n"), "{}", text);
    }

    #[test]
    fn test_overload_signatures_emit_nothing() {
        let text = lower("function f(a: string): void;\nfunction f(a: any) { }").text();
        assert_eq!(text, "f = function(self, a)\nend\n");
    }

    #[test]
    fn test_async_is_rejected() {
        let error = lower_error("async function f() { }");
        assert_eq!(error.kind, CompileErrorKind::unsupported_kind("function modifier", "async"));
    }
}
