//! Branching and non-local control flow: `if`, `switch`, `break`,
//! `continue`, `try`, `throw`.

use swc_common::Spanned;
use swc_ecma_ast as ast;

use tslua_lua_ast::*;

use crate::error::{CompileErrorKind, Result};
use crate::scope::ScopeKind;
use crate::transformer::LuaTransformer;

impl LuaTransformer<'_> {
    pub(crate) fn transform_if_statement(&mut self, statement: &ast::IfStmt) -> Result<IfStatement> {
        let condition = self.transform_expression(&statement.test)?;
        let if_block = self.transform_conditional_branch(&statement.cons)?;
        let else_block = match statement.alt.as_deref() {
            Some(ast::Stmt::If(nested)) => Some(ElseBranch::If(Box::new(self.transform_if_statement(nested)?))),
            Some(other) => Some(ElseBranch::Block(self.transform_conditional_branch(other)?)),
            None => None,
        };
        Ok(create_if_statement(condition, if_block, else_block, self.pos(statement.span)))
    }

    fn transform_conditional_branch(&mut self, statement: &ast::Stmt) -> Result<Block> {
        self.push_scope(ScopeKind::CONDITIONAL);
        let body = self.transform_block_or_statement(statement);
        let scope = self.pop_scope();
        let body = self.perform_hoisting(&scope, body?);
        Ok(create_block(body, None))
    }

    /// Jump table over the clauses:
    ///
    /// ```lua
    /// local ____switch1 = e
    /// if ____switch1 == a then goto ____switch1_case_0 end
    /// goto ____switch1_end
    /// ::____switch1_case_0::
    /// do ... end
    /// ::____switch1_end::
    /// ```
    ///
    /// Clause bodies follow each other, so a clause without `break` falls
    /// through into the next.
    pub(crate) fn transform_switch_statement(&mut self, statement: &ast::SwitchStmt) -> Result<Vec<Statement>> {
        if !self.options.lua_target.supports_goto() {
            return Err(self.error(
                CompileErrorKind::unsupported_for_target("Switch statements", self.options.lua_target),
                statement.span,
            ));
        }
        let id = self.push_scope(ScopeKind::SWITCH);
        let body = self.transform_switch_clauses(statement, id);
        let scope = self.pop_scope();
        let statements = self.perform_hoisting(&scope, body?);
        log::trace!("lowered switch {} with {} clauses", id, statement.cases.len());
        Ok(statements)
    }

    fn transform_switch_clauses(&mut self, statement: &ast::SwitchStmt, id: u32) -> Result<Vec<Statement>> {
        let name = format!("____switch{}", id);
        let label = |suffix: &str| format!("{}_{}", name, suffix);
        let case_label = |index: usize, clause: &ast::SwitchCase| match clause.test {
            Some(_) => label(&format!("case_{}", index)),
            None => label("case_default"),
        };
        let variable = || create_identifier(name.clone(), None, None, None);

        let discriminant = self.transform_expression(&statement.discriminant)?;
        let mut result = vec![create_variable_declaration_statement(
            vec![variable()],
            Some(vec![discriminant]),
            self.pos(statement.span),
        )];

        for (index, clause) in statement.cases.iter().enumerate() {
            let Some(test) = &clause.test else {
                continue;
            };
            let value = self.transform_expression(test)?;
            let condition = create_binary_expression(variable().into(), value, BinaryOperator::Equality, None);
            let jump = create_goto_statement(case_label(index, clause), None);
            result.push(create_if_statement(condition, create_block(vec![jump], None), None, self.pos(clause.span)).into());
        }
        let fallback = if statement.cases.iter().any(|clause| clause.test.is_none()) {
            label("case_default")
        } else {
            label("end")
        };
        result.push(create_goto_statement(fallback, None));

        for (index, clause) in statement.cases.iter().enumerate() {
            result.push(create_label_statement(case_label(index, clause), None));
            let body = self.transform_statements(&clause.cons)?;
            result.push(create_do_statement(body, self.pos(clause.span)));
        }
        result.push(create_label_statement(label("end"), None));
        Ok(result)
    }

    /// `break` leaves the innermost loop, or jumps to the end label of the
    /// innermost switch.
    pub(crate) fn transform_break_statement(&mut self, statement: &ast::BreakStmt) -> Result<Statement> {
        if let Some(label) = &statement.label {
            return Err(self.unsupported("break", "label", label.span));
        }
        let original = self.pos(statement.span);
        match self.find_scope(ScopeKind::LOOP | ScopeKind::SWITCH) {
            Some(scope) if scope.kind == ScopeKind::SWITCH => {
                Ok(create_goto_statement(format!("____switch{}_end", scope.id), original))
            }
            Some(_) => Ok(create_break_statement(original)),
            None => panic!("break statement outside of any loop or switch scope"),
        }
    }

    pub(crate) fn transform_continue_statement(&mut self, statement: &ast::ContinueStmt) -> Result<Statement> {
        if !self.options.lua_target.supports_goto() {
            return Err(self.error(
                CompileErrorKind::unsupported_for_target("Continue statement", self.options.lua_target),
                statement.span,
            ));
        }
        if let Some(label) = &statement.label {
            return Err(self.unsupported("continue", "label", label.span));
        }
        let Some(scope) = self.find_scope_mut(ScopeKind::LOOP) else {
            panic!("continue statement outside of any loop scope");
        };
        scope.loop_continued = true;
        let label = format!("__continue{}", scope.id);
        Ok(create_goto_statement(label, self.pos(statement.span)))
    }

    /// Only strings can be thrown; they become `error(e)`.
    pub(crate) fn transform_throw_statement(&mut self, statement: &ast::ThrowStmt) -> Result<Statement> {
        if !self.oracle.type_of_expr(&statement.arg).is_string_like() {
            return Err(self.error(CompileErrorKind::InvalidThrowExpression, statement.arg.span()));
        }
        let value = self.transform_expression(&statement.arg)?;
        let error = create_identifier("error", None, None, None);
        Ok(create_expression_statement(
            create_call_expression(error.into(), vec![value], None),
            self.pos(statement.span),
        ))
    }

    /// Runs the `try` block under `pcall`. When either block returns, the
    /// returned flag and value travel out of the protected functions and
    /// are re-returned afterwards.
    pub(crate) fn transform_try_statement(&mut self, statement: &ast::TryStmt) -> Result<Statement> {
        let (try_block, try_scope) = self.transform_scope_block(&statement.block.stmts, ScopeKind::TRY)?;
        let ident = |name: &str| create_identifier(name, None, None, None);
        let try_call = create_call_expression(
            ident("pcall").into(),
            vec![create_function_expression(try_block, vec![], false, None, FunctionExpressionFlags::NONE, None)],
            None,
        );

        let mut result = Vec::new();
        let mut returned: Option<Identifier> = None;
        let mut return_condition: Option<Expression> = None;

        let handler = statement.handler.as_ref().filter(|handler| !handler.body.stmts.is_empty());
        if let Some(handler) = handler {
            let (catch_block, catch_scope) = self.transform_scope_block(&handler.body.stmts, ScopeKind::CATCH)?;
            let function_returned = try_scope.function_returned || catch_scope.function_returned;
            returned = match &handler.param {
                Some(ast::Pat::Ident(binding)) => Some(self.transform_identifier(&binding.id)?),
                Some(other) => return Err(self.unsupported("catch variable", "Pattern", other.span())),
                None if function_returned => Some(ident("____returned")),
                None => None,
            };

            let mut names = vec![ident("____try")];
            if let Some(returned) = &returned {
                names.push(clone_identifier(returned, None));
                if function_returned {
                    names.push(ident("____returnValue"));
                    return_condition = Some(clone_identifier(returned, None).into());
                }
            }
            result.push(create_variable_declaration_statement(names, Some(vec![try_call]), None));

            let catch_block = match (&returned, function_returned) {
                (Some(returned), true) => {
                    let function = create_function_expression(catch_block, vec![], false, None, FunctionExpressionFlags::NONE, None);
                    let call = create_call_expression(create_parenthesized_expression(function, None), vec![], None);
                    let assignment = create_assignment_statement(
                        vec![clone_identifier(returned, None).into(), ident("____returnValue").into()],
                        vec![call],
                        None,
                    );
                    create_block(vec![assignment], None)
                }
                _ => catch_block,
            };
            let failed = create_unary_expression(
                create_parenthesized_expression(ident("____try").into(), None),
                UnaryOperator::Not,
                None,
            );
            result.push(create_if_statement(failed, catch_block, None, self.pos(handler.span)).into());
        } else if try_scope.function_returned {
            let flag = ident("____returned");
            result.push(create_variable_declaration_statement(
                vec![ident("____try"), clone_identifier(&flag, None), ident("____returnValue")],
                Some(vec![try_call]),
                None,
            ));
            return_condition = Some(create_binary_expression(
                ident("____try").into(),
                clone_identifier(&flag, None).into(),
                BinaryOperator::And,
                None,
            ));
            returned = Some(flag);
        } else {
            result.push(create_expression_statement(try_call, None));
        }

        if let Some(finalizer) = statement.finalizer.as_ref().filter(|block| !block.stmts.is_empty()) {
            let (block, _) = self.transform_scope_block(&finalizer.stmts, ScopeKind::BLOCK)?;
            result.push(create_do_statement(block.statements, self.pos(finalizer.span)));
        }

        if let (Some(condition), Some(_)) = (return_condition, returned) {
            let mut values = Vec::new();
            let enclosing = self.find_scope(ScopeKind::FUNCTION | ScopeKind::TRY | ScopeKind::CATCH);
            if enclosing.map_or(false, |scope| scope.kind != ScopeKind::FUNCTION) {
                values.push(create_boolean_literal(true, None));
            }
            let tuple_return = self.function_stack.last().map_or(false, |function| function.tuple_return);
            if tuple_return {
                values.push(self.create_unpack_call(ident("____returnValue").into(), None));
            } else {
                values.push(ident("____returnValue").into());
            }
            let body = create_block(vec![create_return_statement(values, None)], None);
            result.push(create_if_statement(condition, body, None, None).into());
        }
        Ok(create_do_statement(result, self.pos(statement.span)))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::options::{CompilerOptions, LuaTarget};
    use crate::testing::{lower, lower_error, lower_with};

    #[test]
    fn test_else_if_chain() {
        let text = lower("declare const a: number;\nif (a > 1) { a; } else if (a > 0) { a; } else { a; }").text();
        assert_eq!(
            text,
            "if a > 1 then\n    local ____ = a\nelseif a > 0 then\n    local ____ = a\nelse\n    local ____ = a\nend\n"
        );
    }

    #[test]
    fn test_switch_without_default_jumps_to_end() {
        let source = "declare const x: number;\ndeclare function f(this: void, n: number): void;\nswitch (x) {\n  case 1: f(1); break;\n  case 2: { if (x > 1) { break; } f(2); }\n  case 3: f(3);\n}";
        let text = lower(source).text();
        let conditional_gotos = text.matches("then\n    goto ____switch").count();
        assert_eq!(conditional_gotos, 3, "{}", text);
        assert!(text.contains("end\ngoto ____switch1_end\n::____switch1_case_0::"), "{}", text);
        // Both breaks, including the nested one, leave through the end label.
        assert_eq!(text.matches("goto ____switch1_end").count(), 3, "{}", text);
        assert!(!text.contains("break"), "{}", text);
        assert!(text.trim_end().ends_with("::____switch1_end::"), "{}", text);
    }

    #[test]
    fn test_switch_default_label() {
        let source = "declare const x: string;\nlet y = 0;\nswitch (x) {\n  default: y = 1;\n  case \"a\": y = 2; break;\n}";
        let text = lower(source).text();
        assert!(text.contains("if ____switch1 == \"a\" then\n    goto ____switch1_case_1\nend\ngoto ____switch1_case_default\n"), "{}", text);
        assert!(text.contains("::____switch1_case_default::\ndo\n    y = 1\nend\n::____switch1_case_1::"), "{}", text);
    }

    #[test]
    fn test_switch_and_continue_need_goto() {
        let options = CompilerOptions {
            lua_target: LuaTarget::Lua51,
            ..CompilerOptions::default()
        };
        let error = lower_with("declare const x: number;\nswitch (x) { case 1: break; }", options.clone()).unwrap_err();
        assert_eq!(error.kind, CompileErrorKind::unsupported_for_target("Switch statements", LuaTarget::Lua51));
        let error = lower_with("while (true) { continue; }", options).unwrap_err();
        assert_eq!(error.kind, CompileErrorKind::unsupported_for_target("Continue statement", LuaTarget::Lua51));
    }

    #[test]
    fn test_throw_requires_string() {
        assert_eq!(lower("throw \"boom\";").text(), "error(\"boom\")\n");
        let error = lower_error("throw 42;");
        assert_eq!(error.kind, CompileErrorKind::InvalidThrowExpression);
    }

    #[test]
    fn test_try_catch_returns() {
        let source = "function f(): number {\n  try { return 1; } catch (e) { return 2; }\n}";
        let text = lower(source).text();
        assert!(text.contains("local ____try, e, ____returnValue = pcall(function()\n            return true, 1\n        end)"), "{}", text);
        assert!(text.contains("if not (____try) then\n            e, ____returnValue = (function()\n                return true, 2\n            end)()\n        end"), "{}", text);
        assert!(text.contains("if e then\n            return ____returnValue\n        end"), "{}", text);
    }

    #[test]
    fn test_try_without_returns() {
        let source = "declare function g(this: void): void;\ntry { g(); } catch (e) { g(); } finally { g(); }";
        let text = lower(source).text();
        assert_eq!(
            text,
            "do\n    local ____try, e = pcall(function()\n        g()\n    end)\n    if not (____try) then\n        g()\n    end\n    do\n        g()\n    end\nend\n"
        );
    }

    #[test]
    fn test_try_return_without_catch() {
        let source = "function f() {\n  try { return 1; } finally { }\n}";
        let text = lower(source).text();
        assert!(text.contains("local ____try, ____returned, ____returnValue = pcall(function()"), "{}", text);
        assert!(text.contains("if ____try and ____returned then\n            return ____returnValue\n"), "{}", text);
    }

    #[test]
    fn test_nested_try_prefixes_true() {
        let source = "function f() {\n  try { try { return 1; } catch { } } catch { }\n}";
        let text = lower(source).text();
        assert!(text.contains("return true, ____returnValue"), "{}", text);
    }
}
