//! Statement dispatch, blocks, variable statements and expression
//! statements.

use swc_common::{Span, Spanned};
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_types::DirectiveKind;

use crate::error::{CompileErrorKind, Result};
use crate::scope::{Scope, ScopeKind};
use crate::transformer::{DeclarationSite, LuaTransformer};

/// Kind name used in "Unsupported statement kind" errors.
pub(crate) fn statement_kind_name(statement: &ast::Stmt) -> &'static str {
    match statement {
        ast::Stmt::Block(_) => "Block",
        ast::Stmt::Empty(_) => "EmptyStatement",
        ast::Stmt::Debugger(_) => "DebuggerStatement",
        ast::Stmt::With(_) => "WithStatement",
        ast::Stmt::Return(_) => "ReturnStatement",
        ast::Stmt::Labeled(_) => "LabeledStatement",
        ast::Stmt::Break(_) => "BreakStatement",
        ast::Stmt::Continue(_) => "ContinueStatement",
        ast::Stmt::If(_) => "IfStatement",
        ast::Stmt::Switch(_) => "SwitchStatement",
        ast::Stmt::Throw(_) => "ThrowStatement",
        ast::Stmt::Try(_) => "TryStatement",
        ast::Stmt::While(_) => "WhileStatement",
        ast::Stmt::DoWhile(_) => "DoStatement",
        ast::Stmt::For(_) => "ForStatement",
        ast::Stmt::ForIn(_) => "ForInStatement",
        ast::Stmt::ForOf(_) => "ForOfStatement",
        ast::Stmt::Decl(_) => "Declaration",
        ast::Stmt::Expr(_) => "ExpressionStatement",
    }
}

impl LuaTransformer<'_> {
    pub(crate) fn transform_module_items(&mut self, items: &[ast::ModuleItem]) -> Result<Vec<Statement>> {
        let mut result = Vec::new();
        for item in items {
            match item {
                ast::ModuleItem::Stmt(statement) => result.extend(self.transform_statement(statement)?),
                ast::ModuleItem::ModuleDecl(declaration) => {
                    result.extend(self.transform_module_declaration_item(declaration)?)
                }
            }
        }
        Ok(result)
    }

    pub(crate) fn transform_statements(&mut self, statements: &[ast::Stmt]) -> Result<Vec<Statement>> {
        let mut result = Vec::new();
        for statement in statements {
            result.extend(self.transform_statement(statement)?);
        }
        Ok(result)
    }

    pub(crate) fn transform_statement(&mut self, statement: &ast::Stmt) -> Result<Vec<Statement>> {
        match statement {
            ast::Stmt::Block(block) => {
                let (body, _) = self.transform_scope_block(&block.stmts, ScopeKind::BLOCK)?;
                Ok(vec![create_do_statement(body.statements, self.pos(block.span))])
            }
            ast::Stmt::Empty(_) => Ok(Vec::new()),
            ast::Stmt::Return(statement) => Ok(vec![self.transform_return_statement(statement)?]),
            ast::Stmt::Break(statement) => Ok(vec![self.transform_break_statement(statement)?]),
            ast::Stmt::Continue(statement) => Ok(vec![self.transform_continue_statement(statement)?]),
            ast::Stmt::If(statement) => Ok(vec![self.transform_if_statement(statement)?.into()]),
            ast::Stmt::Switch(statement) => self.transform_switch_statement(statement),
            ast::Stmt::Throw(statement) => Ok(vec![self.transform_throw_statement(statement)?]),
            ast::Stmt::Try(statement) => Ok(vec![self.transform_try_statement(statement)?]),
            ast::Stmt::While(statement) => Ok(vec![self.transform_while_statement(statement)?]),
            ast::Stmt::DoWhile(statement) => Ok(vec![self.transform_do_while_statement(statement)?]),
            ast::Stmt::For(statement) => Ok(vec![self.transform_for_statement(statement)?]),
            ast::Stmt::ForIn(statement) => Ok(vec![self.transform_for_in_statement(statement)?]),
            ast::Stmt::ForOf(statement) => Ok(vec![self.transform_for_of_statement(statement)?]),
            ast::Stmt::Decl(declaration) => self.transform_declaration(declaration, None),
            ast::Stmt::Expr(statement) => self.transform_expression_statement(&statement.expr),
            other => Err(self.unsupported("Statement", statement_kind_name(other), other.span())),
        }
    }

    /// Lowers a declaration. `export_span` is the span of the enclosing
    /// `export` item, which is where the declaration's symbol is recorded.
    pub(crate) fn transform_declaration(&mut self, declaration: &ast::Decl, export_span: Option<Span>) -> Result<Vec<Statement>> {
        let site = export_span.unwrap_or_else(|| declaration.span());
        match declaration {
            ast::Decl::Class(class) => {
                if class.declare {
                    return Ok(Vec::new());
                }
                self.transform_class_declaration(&class.class, Some(&class.ident), site, export_span.is_some(), false)
            }
            ast::Decl::Fn(function) => {
                if function.declare {
                    return Ok(Vec::new());
                }
                self.transform_function_declaration(&function.ident, &function.function, site)
            }
            ast::Decl::Var(var) => self.transform_variable_statement(var),
            ast::Decl::TsInterface(_) | ast::Decl::TsTypeAlias(_) => Ok(Vec::new()),
            ast::Decl::TsEnum(enumeration) => self.transform_enum_declaration(enumeration, site),
            ast::Decl::TsModule(module) => self.transform_namespace_declaration(module, site),
            ast::Decl::Using(using) => Err(self.unsupported("Statement", "UsingDeclaration", using.span)),
        }
    }

    /// Lowers `statements` in a fresh scope of `kind` and hoists inside it.
    pub(crate) fn transform_scope_block(&mut self, statements: &[ast::Stmt], kind: ScopeKind) -> Result<(Block, Scope)> {
        self.push_scope(kind);
        let body = self.transform_statements(statements);
        let scope = self.pop_scope();
        let body = self.perform_hoisting(&scope, body?);
        Ok((create_block(body, None), scope))
    }

    /// The body of a loop, `if` branch or label: blocks are unwrapped, any
    /// other statement is lowered on its own.
    pub(crate) fn transform_block_or_statement(&mut self, statement: &ast::Stmt) -> Result<Vec<Statement>> {
        match statement {
            ast::Stmt::Block(block) => self.transform_statements(&block.stmts),
            other => self.transform_statement(other),
        }
    }

    pub(crate) fn transform_variable_statement(&mut self, var: &ast::VarDecl) -> Result<Vec<Statement>> {
        if var.declare {
            return Ok(Vec::new());
        }
        let block_scoped = var.kind != ast::VarDeclKind::Var;
        let mut result = Vec::new();
        for declarator in &var.decls {
            result.extend(self.transform_variable_declaration(declarator, block_scoped)?);
        }
        Ok(result)
    }

    pub(crate) fn transform_variable_declaration(
        &mut self,
        declarator: &ast::VarDeclarator,
        block_scoped: bool,
    ) -> Result<Vec<Statement>> {
        if let (Some(init), ast::Pat::Ident(binding)) = (&declarator.init, &declarator.name) {
            if let Some(annotation) = &binding.type_ann {
                let target = self.oracle.annotation_type(&annotation.type_ann);
                let value = self.oracle.type_of_expr(init);
                self.validate_function_assignment(init.span(), &value, &target, Some(binding.id.sym.to_string()))?;
            }
        }

        match &declarator.name {
            ast::Pat::Ident(binding) => {
                let identifier = self.transform_identifier(&binding.id)?;
                let first_declaration = match self.oracle.symbol_at(&binding.id) {
                    Some(symbol) => {
                        let offset = self.oracle.offset(declarator.span.lo);
                        self.oracle.symbol(symbol).first_declaration().map_or(true, |first| first == offset)
                    }
                    None => true,
                };
                let function_initializer = declarator
                    .init
                    .as_ref()
                    .map_or(false, |init| !self.oracle.type_of_expr(init).call_signatures().is_empty());
                let value = match &declarator.init {
                    Some(init) => Some(vec![self.transform_expression(init)?]),
                    None => None,
                };
                let site = DeclarationSite {
                    span: Some(declarator.span),
                    variable: true,
                    block_scoped,
                    first_declaration,
                    function_initializer,
                    ..Default::default()
                };
                self.create_local_or_exported_or_global_declaration(vec![identifier], value, site, None)
            }
            ast::Pat::Array(_) | ast::Pat::Object(_) => {
                self.transform_destructuring_declaration(declarator, block_scoped)
            }
            other => Err(self.unsupported("BindingName", "Pattern", other.span())),
        }
    }

    pub(crate) fn transform_expression_statement(&mut self, expression: &ast::Expr) -> Result<Vec<Statement>> {
        let original = self.pos(expression.span());
        match expression {
            ast::Expr::Assign(assign) => return self.transform_assignment_statement(assign),
            ast::Expr::Update(update) => return self.transform_update_statement(update),
            ast::Expr::Unary(unary) if unary.op == ast::UnaryOp::Delete => {
                let target = self.transform_expression(&unary.arg)?;
                let target = AssignmentLeftHandSide::try_from(target)
                    .map_err(|_| self.unsupported("delete expression", "non-reference", unary.span))?;
                return Ok(vec![create_assignment_statement(
                    vec![target],
                    vec![create_nil_literal(None)],
                    original,
                )]);
            }
            ast::Expr::Seq(sequence) => {
                let mut body = Vec::new();
                for expression in &sequence.exprs {
                    body.extend(self.transform_expression_statement(expression)?);
                }
                return Ok(vec![create_do_statement(body, original)]);
            }
            ast::Expr::Paren(paren) => return self.transform_expression_statement(&paren.expr),
            ast::Expr::Call(call) => {
                if let Some(statement) = self.transform_lua_table_statement(call)? {
                    return Ok(vec![statement]);
                }
                let result = self.transform_call_expression(call, false)?;
                return Ok(vec![self.create_expression_or_anonymous_local(result, original)]);
            }
            _ => {}
        }
        let result = self.transform_expression(expression)?;
        Ok(vec![self.create_expression_or_anonymous_local(result, original)])
    }

    /// Calls can stand alone as Lua statements; anything else is bound to
    /// a throwaway `local ____`.
    fn create_expression_or_anonymous_local(&self, expression: Expression, original: Option<Position>) -> Statement {
        match expression {
            Expression::Call(_) | Expression::MethodCall(_) => create_expression_statement(expression, original),
            other => create_variable_declaration_statement(vec![create_anonymous_identifier(None)], Some(vec![other]), original),
        }
    }

    /// `table.get(k)` and `table.set(k, v)` on `@luaTable` types used as
    /// statements.
    fn transform_lua_table_statement(&mut self, call: &ast::CallExpr) -> Result<Option<Statement>> {
        let ast::Callee::Expr(callee) = &call.callee else {
            return Ok(None);
        };
        let ast::Expr::Member(member) = callee.as_ref() else {
            return Ok(None);
        };
        let owner = self.oracle.type_of_expr(&member.obj);
        if !self.oracle.type_directives(&owner).has(DirectiveKind::LuaTable) {
            return Ok(None);
        }
        let method = self.validate_lua_table_call(call, member, true)?;
        let original = self.pos(call.span);
        let table = self.transform_expression(&member.obj)?;
        let mut params = self.transform_arguments(&call.args, None)?;
        if params.is_empty() {
            return Err(self.lua_table_error("One parameter is required for get().", call.span));
        }
        let key = params.remove(0);
        let index = create_table_index_expression(table, key, original);
        Ok(Some(match method.as_str() {
            "get" => create_variable_declaration_statement(
                vec![create_anonymous_identifier(original)],
                Some(vec![index.into()]),
                original,
            ),
            _ => create_assignment_statement(vec![index.into()], params, original),
        }))
    }

    pub(crate) fn lua_table_error(&self, message: &str, span: Span) -> crate::error::CompileError {
        self.error(CompileErrorKind::ForbiddenLuaTableUseException(message.to_string()), span)
    }

    /// Checks a `@luaTable` method call and returns the method name.
    pub(crate) fn validate_lua_table_call(
        &self,
        call: &ast::CallExpr,
        member: &ast::MemberExpr,
        statement: bool,
    ) -> Result<String> {
        let ast::MemberProp::Ident(name) = &member.prop else {
            return Err(self.lua_table_error("Cannot use computed property access on a LuaTable.", member.span));
        };
        if call.args.iter().any(|argument| argument.spread.is_some()) {
            return Err(self.lua_table_error("Arguments cannot be spread.", call.span));
        }
        let method = name.sym.to_string();
        match method.as_str() {
            "get" if call.args.len() != 1 => Err(self.lua_table_error("One parameter is required for get().", call.span)),
            "set" if call.args.len() != 2 => Err(self.lua_table_error("Two parameters are required for set().", call.span)),
            "set" if !statement => Err(self.lua_table_error("set() cannot be used as an expression.", call.span)),
            "get" | "set" => Ok(method),
            _ => Err(self.error(CompileErrorKind::unsupported_property("LuaTable", method), name.span)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};

    #[test]
    fn test_block_becomes_do() {
        let text = lower("{ let a = 1; }").text();
        assert_eq!(text, "do\n    local a = 1\nend\n");
    }

    #[test]
    fn test_declarations_without_output() {
        let text = lower("declare const x: number;\ninterface I { a: number }\ntype T = string;\n;").text();
        assert_eq!(text, "");
    }

    #[test]
    fn test_var_at_top_level_is_global() {
        assert_eq!(lower("var a = 1;\nlet b = 2;").text(), "a = 1\nlocal b = 2\n");
    }

    #[test]
    fn test_var_redeclaration_is_assignment() {
        let text = lower("function f() { var a = 1; var a = 2; }").text();
        assert!(text.contains("local a = 1\n"), "{}", text);
        assert!(text.contains("    a = 2\n"), "{}", text);
    }

    #[test]
    fn test_function_typed_initializer_is_split() {
        let text = lower("function f() { const g = () => g; }").text();
        assert!(text.contains("    local g\n    g = function()"), "{}", text);
    }

    #[test]
    fn test_cast_initializer_uses_asserted_type() {
        let source = "declare const o: any;\nfunction f() {\n    const k = (o as any as { n: number }).n;\n    const g = (o as any as { h: () => void }).h;\n}";
        let text = lower(source).text();
        assert!(text.contains("    local k = "), "{}", text);
        assert!(!text.contains("    local k\n"), "{}", text);
        assert!(text.contains("    local g\n    g = "), "{}", text);
        let text = lower("function f() { const n = (Math as any as Math).SQRT2; }").text();
        assert!(text.contains("    local n = 1.4142135623730951\n"), "{}", text);
    }

    #[test]
    fn test_expression_statements() {
        let text = lower("let a = 1;\na++;\n--a;\na += 2;\na;\n(a, a);").text();
        assert!(text.contains("a = a + 1\n"));
        assert!(text.contains("a = a - 1\n"));
        assert!(text.contains("a = a + 2\n"));
        assert!(text.contains("local ____ = a\n"));
        assert!(text.contains("do\n    local ____ = a\n    local ____ = a\nend"));
    }

    #[test]
    fn test_delete_assigns_nil() {
        let text = lower("const t: { [k: string]: number } = {};\ndelete t.x;").text();
        assert!(text.contains("t[\"x\"] = nil"), "{}", text);
    }

    #[test]
    fn test_lua_table_statements() {
        let source = "/** @luaTable */\ndeclare class Table<K, V> { length: number; get(k: K): V; set(k: K, v: V): void; }\ndeclare const t: Table<string, number>;\nt.set(\"a\", 1);\nt.get(\"a\");";
        let text = lower(source).text();
        assert!(text.contains("t[\"a\"] = 1\n"), "{}", text);
        assert!(text.contains("local ____ = t[\"a\"]\n"), "{}", text);
    }

    #[test]
    fn test_lua_table_set_arity() {
        let source = "/** @luaTable */\ndeclare class Table<K, V> { get(k: K): V; set(k: K, v: V): void; }\ndeclare const t: Table<string, number>;\nt.set(\"a\");";
        let error = lower_error(source);
        assert_eq!(
            error.kind,
            CompileErrorKind::ForbiddenLuaTableUseException("Two parameters are required for set().".to_string())
        );
    }

    #[test]
    fn test_unsupported_statement() {
        let error = lower_error("label: for (;;) { break label; }");
        assert!(matches!(error.kind, CompileErrorKind::UnsupportedKind { ref kind, .. } if kind == "LabeledStatement"));
    }
}
