//! Loops: `while`, `do..while`, `for`, `for..of` and `for..in`.

use swc_common::Spanned;
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::{DirectiveKind, Type};

use crate::error::{CompileErrorKind, Result};
use crate::scope::ScopeKind;
use crate::transformer::LuaTransformer;

fn for_range_error(message: &str) -> CompileErrorKind {
    CompileErrorKind::InvalidForRangeCall(message.to_string())
}

/// The single declarator of a `for (const x of ...)` head.
fn head_declarator(head: &ast::ForHead) -> Option<&ast::VarDeclarator> {
    match head {
        ast::ForHead::VarDecl(var) => var.decls.first(),
        _ => None,
    }
}

/// Array pattern whose elements are all plain identifiers or holes.
pub(crate) fn is_simple_array_pattern(array: &ast::ArrayPat) -> bool {
    array.elems.iter().all(|element| matches!(element, None | Some(ast::Pat::Ident(_))))
}

impl LuaTransformer<'_> {
    /// Loop body in a loop scope. A `continue` inside jumps to a label
    /// placed after the body, so the body is wrapped in `do ... end` to
    /// keep its locals out of the label's scope.
    pub(crate) fn transform_loop_body(&mut self, body: &ast::Stmt) -> Result<Vec<Statement>> {
        self.push_scope(ScopeKind::LOOP);
        let statements = self.transform_block_or_statement(body);
        let scope = self.pop_scope();
        let statements = self.perform_hoisting(&scope, statements?);
        if !scope.loop_continued {
            return Ok(statements);
        }
        Ok(vec![
            create_do_statement(statements, None),
            create_label_statement(format!("__continue{}", scope.id), None),
        ])
    }

    pub(crate) fn transform_while_statement(&mut self, statement: &ast::WhileStmt) -> Result<Statement> {
        let condition = self.transform_expression(&statement.test)?;
        let body = self.transform_loop_body(&statement.body)?;
        Ok(create_while_statement(create_block(body, None), condition, self.pos(statement.span)))
    }

    /// `repeat do body end until not (cond)`
    pub(crate) fn transform_do_while_statement(&mut self, statement: &ast::DoWhileStmt) -> Result<Statement> {
        let body = self.transform_loop_body(&statement.body)?;
        let condition = match self.transform_expression(&statement.test)? {
            Expression::Unary(unary) if unary.operator == UnaryOperator::Not => *unary.operand,
            other => create_unary_expression(create_parenthesized_expression(other, None), UnaryOperator::Not, None),
        };
        Ok(create_repeat_statement(
            create_block(vec![create_do_statement(body, None)], None),
            condition,
            self.pos(statement.span),
        ))
    }

    /// `do init; while cond do body; update end end`
    pub(crate) fn transform_for_statement(&mut self, statement: &ast::ForStmt) -> Result<Statement> {
        let mut result = Vec::new();
        match &statement.init {
            Some(ast::VarDeclOrExpr::VarDecl(var)) => result.extend(self.transform_variable_statement(var)?),
            Some(ast::VarDeclOrExpr::Expr(expression)) => result.extend(self.transform_expression_statement(expression)?),
            None => {}
        }
        let condition = match &statement.test {
            Some(test) => self.transform_expression(test)?,
            None => create_boolean_literal(true, None),
        };
        let mut body = self.transform_loop_body(&statement.body)?;
        if let Some(update) = &statement.update {
            body.extend(self.transform_expression_statement(update)?);
        }
        result.push(create_while_statement(create_block(body, None), condition, None));
        Ok(create_do_statement(result, self.pos(statement.span)))
    }

    pub(crate) fn transform_for_of_statement(&mut self, statement: &ast::ForOfStmt) -> Result<Statement> {
        if statement.is_await {
            return Err(self.unsupported("for...of modifier", "await", statement.span));
        }
        if let ast::Expr::Call(call) = statement.right.as_ref() {
            if self.is_for_range_call(call) {
                return self.transform_for_range_statement(statement, call);
            }
        }
        let iterable_type = self.oracle.type_of_expr(&statement.right);
        let directives = self.oracle.type_directives(&iterable_type);
        if directives.has(DirectiveKind::LuaIterator) {
            let tuple_return = directives.has(DirectiveKind::TupleReturn);
            return self.transform_for_of_lua_iterator_statement(statement, tuple_return);
        }
        if iterable_type.is_explicit_array() {
            return self.transform_for_of_array_statement(statement);
        }
        self.transform_for_of_iterator_statement(statement)
    }

    fn is_for_range_call(&self, call: &ast::CallExpr) -> bool {
        let ast::Callee::Expr(callee) = &call.callee else {
            return false;
        };
        let ty = self.oracle.type_of_expr(callee);
        if self.oracle.type_directives(&ty).has(DirectiveKind::ForRange) {
            return true;
        }
        match callee.as_ref() {
            ast::Expr::Ident(ident) => self
                .oracle
                .symbol_at(ident)
                .map_or(false, |symbol| self.oracle.symbol(symbol).has_directive(DirectiveKind::ForRange)),
            _ => false,
        }
    }

    /// `for i = start, limit, step do`
    fn transform_for_range_statement(&mut self, statement: &ast::ForOfStmt, call: &ast::CallExpr) -> Result<Statement> {
        if call.args.len() < 2 || call.args.len() > 3 {
            return Err(self.error(for_range_error("@forRange function must take 2 or 3 arguments."), call.span));
        }
        if call.args.iter().any(|argument| !self.oracle.type_of_expr(&argument.expr).is_number_like()) {
            return Err(self.error(for_range_error("@forRange arguments must be number types."), call.span));
        }
        let Some(declarator) = head_declarator(&statement.left) else {
            return Err(self.error(
                for_range_error("@forRange loop must declare its own control variable."),
                statement.left.span(),
            ));
        };
        let ast::Pat::Ident(binding) = &declarator.name else {
            return Err(self.error(for_range_error("@forRange loop cannot use destructuring."), declarator.span));
        };
        if let Some(symbol) = self.oracle.symbol_at(&binding.id) {
            let control_type = self.oracle.type_of_symbol(symbol);
            let known = !matches!(control_type.resolved(), Type::Any | Type::Unknown);
            if known && !control_type.is_number_like() {
                return Err(self.error(
                    for_range_error("@forRange function must return Iterable<number> or Array<number>."),
                    call.span,
                ));
            }
        }

        let control = self.transform_identifier(&binding.id)?;
        let signature = self.oracle.resolved_signature(tslua_checker::CallSite::Call(call));
        let mut arguments = self.transform_arguments(&call.args, signature.as_ref())?.into_iter();
        let (Some(start), Some(limit)) = (arguments.next(), arguments.next()) else {
            panic!("@forRange arguments were counted before lowering");
        };
        let step = arguments.next();
        let body = self.transform_loop_body(&statement.body)?;
        Ok(create_for_statement(create_block(body, None), control, start, limit, step, self.pos(statement.span)))
    }

    /// `for ____, x in ipairs(arr) do`
    fn transform_for_of_array_statement(&mut self, statement: &ast::ForOfStmt) -> Result<Statement> {
        let mut prelude = Vec::new();
        let value = match head_declarator(&statement.left).map(|declarator| &declarator.name) {
            Some(ast::Pat::Ident(binding)) => self.transform_identifier(&binding.id)?,
            Some(pattern) => {
                let values = create_identifier("____values", None, None, None);
                prelude.extend(self.transform_for_of_declared_pattern(pattern, clone_identifier(&values, None))?);
                values
            }
            None => {
                let value = create_identifier("____value", None, None, None);
                prelude.extend(self.transform_for_of_assignment(&statement.left, clone_identifier(&value, None).into())?);
                value
            }
        };
        let iterable = self.transform_expression(&statement.right)?;
        let ipairs = create_call_expression(create_identifier("ipairs", None, None, None).into(), vec![iterable], None);
        prelude.extend(self.transform_loop_body(&statement.body)?);
        Ok(create_for_in_statement(
            create_block(prelude, None),
            vec![create_anonymous_identifier(None), value],
            vec![ipairs],
            self.pos(statement.span),
        ))
    }

    /// `for x in it do`, or `for a, b in it do` for tuple-returning
    /// iterators, which must be destructured.
    fn transform_for_of_lua_iterator_statement(&mut self, statement: &ast::ForOfStmt, tuple_return: bool) -> Result<Statement> {
        let iterator = self.transform_expression(&statement.right)?;
        let mut prelude = Vec::new();
        let names = if tuple_return {
            match (&statement.left, head_declarator(&statement.left).map(|declarator| &declarator.name)) {
                (_, Some(ast::Pat::Array(array))) if is_simple_array_pattern(array) => {
                    let mut names = Vec::new();
                    for element in &array.elems {
                        names.push(match element {
                            Some(ast::Pat::Ident(binding)) => self.transform_identifier(&binding.id)?,
                            _ => create_anonymous_identifier(None),
                        });
                    }
                    if names.is_empty() {
                        names.push(create_anonymous_identifier(None));
                    }
                    names
                }
                (ast::ForHead::Pat(pat), None) => match pat.as_ref() {
                    ast::Pat::Array(array) => {
                        let temporaries: Vec<Identifier> = (0..array.elems.len())
                            .map(|i| create_identifier(format!("____value{}", i), None, None, None))
                            .collect();
                        if temporaries.is_empty() {
                            vec![create_anonymous_identifier(None)]
                        } else {
                            let mut targets = Vec::new();
                            for element in array.elems.iter() {
                                targets.push(match element {
                                    Some(element) => self.transform_assignment_target_pat(element)?,
                                    None => create_anonymous_identifier(None).into(),
                                });
                            }
                            let values = temporaries.iter().map(|t| clone_identifier(t, None).into()).collect();
                            prelude.push(create_assignment_statement(targets, values, None));
                            temporaries
                        }
                    }
                    other => return Err(self.error(CompileErrorKind::UnsupportedNonDestructuringLuaIterator, other.span())),
                },
                (head, _) => return Err(self.error(CompileErrorKind::UnsupportedNonDestructuringLuaIterator, head.span())),
            }
        } else {
            match head_declarator(&statement.left).map(|declarator| &declarator.name) {
                Some(ast::Pat::Ident(binding)) => vec![self.transform_identifier(&binding.id)?],
                Some(pattern) => {
                    let value = create_identifier("____value", None, None, None);
                    prelude.extend(self.transform_for_of_declared_pattern(pattern, clone_identifier(&value, None))?);
                    vec![value]
                }
                None => {
                    let value = create_identifier("____value", None, None, None);
                    prelude.extend(self.transform_for_of_assignment(&statement.left, clone_identifier(&value, None).into())?);
                    vec![value]
                }
            }
        };
        prelude.extend(self.transform_loop_body(&statement.body)?);
        Ok(create_for_in_statement(create_block(prelude, None), names, vec![iterator], self.pos(statement.span)))
    }

    /// `for x in __TS__Iterator(e) do`
    fn transform_for_of_iterator_statement(&mut self, statement: &ast::ForOfStmt) -> Result<Statement> {
        let iterable = self.transform_expression(&statement.right)?;
        let iterator = self.lualib_call(LuaLibFeature::Iterator, vec![iterable], None);
        let mut prelude = Vec::new();
        let name = match head_declarator(&statement.left).map(|declarator| &declarator.name) {
            Some(ast::Pat::Ident(binding)) => self.transform_identifier(&binding.id)?,
            Some(pattern) => {
                let value = create_identifier("____value", None, None, None);
                prelude.extend(self.transform_for_of_declared_pattern(pattern, clone_identifier(&value, None))?);
                value
            }
            None => {
                let value = create_identifier("____value", None, None, None);
                prelude.extend(self.transform_for_of_assignment(&statement.left, clone_identifier(&value, None).into())?);
                value
            }
        };
        prelude.extend(self.transform_loop_body(&statement.body)?);
        Ok(create_for_in_statement(create_block(prelude, None), vec![name], vec![iterator], self.pos(statement.span)))
    }

    /// Locals declared by a destructuring loop head, read from the
    /// per-iteration `value`.
    fn transform_for_of_declared_pattern(&mut self, pattern: &ast::Pat, value: Identifier) -> Result<Vec<Statement>> {
        match pattern {
            ast::Pat::Object(object) => Err(self.error(CompileErrorKind::UnsupportedObjectDestructuringInForOf, object.span)),
            ast::Pat::Array(array) if array.elems.is_empty() => Ok(Vec::new()),
            ast::Pat::Array(array) if is_simple_array_pattern(array) => {
                let mut names = Vec::new();
                for element in &array.elems {
                    names.push(match element {
                        Some(ast::Pat::Ident(binding)) => self.transform_identifier(&binding.id)?,
                        _ => create_anonymous_identifier(None),
                    });
                }
                let unpacked = self.create_unpack_call(value.into(), None);
                Ok(vec![create_variable_declaration_statement(names, Some(vec![unpacked]), None)])
            }
            ast::Pat::Array(_) => self.transform_binding_pattern(pattern, value.into(), true),
            other => Err(self.unsupported("for...of variable", "Pattern", other.span())),
        }
    }

    /// Assignment to existing variables at the top of each iteration.
    fn transform_for_of_assignment(&mut self, head: &ast::ForHead, value: Expression) -> Result<Vec<Statement>> {
        let ast::ForHead::Pat(pat) = head else {
            return Err(self.unsupported("for...of variable", "UsingDeclaration", head.span()));
        };
        match pat.as_ref() {
            ast::Pat::Object(object) => Err(self.error(CompileErrorKind::UnsupportedObjectDestructuringInForOf, object.span)),
            ast::Pat::Array(array) if array.elems.is_empty() => Ok(Vec::new()),
            ast::Pat::Array(array) => {
                let mut targets = Vec::new();
                for element in &array.elems {
                    targets.push(match element {
                        Some(element) => self.transform_assignment_target_pat(element)?,
                        None => create_anonymous_identifier(None).into(),
                    });
                }
                let unpacked = self.create_unpack_call(value, None);
                Ok(vec![create_assignment_statement(targets, vec![unpacked], None)])
            }
            other => {
                let target = self.transform_assignment_target_pat(other)?;
                Ok(vec![create_assignment_statement(vec![target], vec![value], None)])
            }
        }
    }

    /// `for k in pairs(t) do`
    pub(crate) fn transform_for_in_statement(&mut self, statement: &ast::ForInStmt) -> Result<Statement> {
        if self.oracle.type_of_expr(&statement.right).is_explicit_array() {
            return Err(self.error(CompileErrorKind::ForbiddenForIn, statement.span));
        }
        let table = self.transform_expression(&statement.right)?;
        let pairs = create_call_expression(create_identifier("pairs", None, None, None).into(), vec![table], None);

        let mut prelude = Vec::new();
        let key = match (&statement.left, head_declarator(&statement.left).map(|declarator| &declarator.name)) {
            (_, Some(ast::Pat::Ident(binding))) => self.transform_identifier(&binding.id)?,
            (ast::ForHead::Pat(pat), None) if matches!(pat.as_ref(), ast::Pat::Ident(_) | ast::Pat::Expr(_)) => {
                let key = create_identifier("____key", None, None, None);
                let target = self.transform_assignment_target_pat(pat)?;
                prelude.push(create_assignment_statement(vec![target], vec![clone_identifier(&key, None).into()], None));
                key
            }
            (head, _) => return Err(self.error(CompileErrorKind::UnsupportedForInVariable, head.span())),
        };
        prelude.extend(self.transform_loop_body(&statement.body)?);
        Ok(create_for_in_statement(create_block(prelude, None), vec![key], vec![pairs], self.pos(statement.span)))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};

    #[test]
    fn test_while_and_continue_label() {
        let source = "let i = 0;\nwhile (i < 10) {\n  i++;\n  if (i > 5) { continue; }\n  let j = i;\n}";
        let text = lower(source).text();
        assert!(text.contains("while i < 10 do\n    do\n        i = i + 1\n"), "{}", text);
        assert!(text.contains("goto __continue"), "{}", text);
        assert!(text.contains("    end\n    ::__continue"), "{}", text);
    }

    #[test]
    fn test_do_while_negates_condition() {
        let text = lower("let i = 0;\ndo { i++; } while (i < 3);\ndo { i--; } while (!(i > 0));").text();
        assert!(text.contains("repeat\n    do\n        i = i + 1\n    end\nuntil not (i < 3)\n"), "{}", text);
        assert!(text.contains("until (i > 0)\n") || text.contains("until i > 0\n"), "{}", text);
    }

    #[test]
    fn test_for_statement() {
        let text = lower("let s = 0;\nfor (let i = 0; i < 3; i++) { s += i; }").text();
        assert_eq!(
            text,
            "local s = 0\ndo\n    local i = 0\n    while i < 3 do\n        s = s + i\n        i = i + 1\n    end\nend\n"
        );
    }

    #[test]
    fn test_for_of_array_literal_uses_ipairs() {
        let text = lower("let sum = 0;\nfor (const x of [1, 2, 3]) { sum += x; }").text();
        assert_eq!(
            text,
            "local sum = 0\nfor ____, x in ipairs({1, 2, 3}) do\n    sum = sum + x\nend\n"
        );
    }

    #[test]
    fn test_for_of_destructuring() {
        let text = lower("declare const entries: [string, number][];\nfor (const [k, v] of entries) { k; }").text();
        assert!(text.contains("for ____, ____values in ipairs(entries) do\n    local k, v = unpack(____values)\n"), "{}", text);

        let error = lower_error("declare const xs: { a: number }[];\nfor (const { a } of xs) { }");
        assert_eq!(error.kind, CompileErrorKind::UnsupportedObjectDestructuringInForOf);
    }

    #[test]
    fn test_for_of_existing_variable() {
        let text = lower("declare const xs: number[];\nlet x = 0;\nfor (x of xs) { }").text();
        assert!(text.contains("for ____, ____value in ipairs(xs) do\n    x = ____value\nend"), "{}", text);
    }

    #[test]
    fn test_for_of_iterable_uses_iterator_helper() {
        let lowered = lower("declare const s: Set<number>;\nfor (const v of s) { v; }");
        assert!(lowered.text().contains("for v in __TS__Iterator(s) do"), "{}", lowered.text());
        assert!(lowered.features.contains(tslua_lualib::LuaLibFeature::Iterator));
    }

    #[test]
    fn test_lua_iterator() {
        let source = "/** @luaIterator */\ninterface Iter extends Array<string> {}\ndeclare function it(this: void): Iter;\nfor (const s of it()) { s; }\n/** @luaIterator @tupleReturn */\ninterface Pairs extends Array<[string, number]> {}\ndeclare function kv(this: void): Pairs;\nfor (const [k, v] of kv()) { k; }";
        let text = lower(source).text();
        assert!(text.contains("for s in it() do"), "{}", text);
        assert!(text.contains("for k, v in kv() do"), "{}", text);

        let error = lower_error("/** @luaIterator @tupleReturn */\ninterface Pairs extends Array<[string, number]> {}\ndeclare function kv(this: void): Pairs;\nfor (const p of kv()) { }");
        assert_eq!(error.kind, CompileErrorKind::UnsupportedNonDestructuringLuaIterator);
    }

    #[test]
    fn test_for_range() {
        let source = "/** @forRange */\ndeclare function range(start: number, limit: number, step?: number): number[];\nfor (const i of range(1, 10, 2)) { i; }";
        let text = lower(source).text();
        assert!(text.contains("for i = 1, 10, 2 do"), "{}", text);

        let error = lower_error("/** @forRange */\ndeclare function range(start: number, limit: number, step?: number): number[];\nfor (const i of range(1)) { }");
        assert_eq!(
            error.kind,
            CompileErrorKind::InvalidForRangeCall("@forRange function must take 2 or 3 arguments.".to_string())
        );
    }

    #[test]
    fn test_for_in() {
        let text = lower("declare const t: { [k: string]: number };\nfor (const k in t) { k; }\nlet key: string;\nfor (key in t) { }").text();
        assert!(text.contains("for k in pairs(t) do"), "{}", text);
        assert!(text.contains("for ____key in pairs(t) do\n    key = ____key\nend"), "{}", text);

        let error = lower_error("declare const xs: number[];\nfor (const i in xs) { }");
        assert_eq!(error.kind, CompileErrorKind::ForbiddenForIn);
    }
}
