//! Lowering context
//!
//! [`LuaTransformer`] carries everything one compilation unit needs while
//! it is lowered: the scope stack, symbol ids for hoisting, the LuaLib
//! features requested so far and the class/namespace/function being
//! lowered. The statement and expression rules live in sibling modules as
//! further `impl` blocks.

use std::collections::{HashMap, HashSet};

use swc_common::{Span, Spanned};
use swc_ecma_ast as ast;

use tslua_checker::{ExportScope, TypeOracle};
use tslua_lua_ast::*;
use tslua_lualib::{FeatureSet, LuaLibFeature};
use tslua_types::{SymbolRef, Type};

use crate::error::{CompileError, CompileErrorKind, Result};
use crate::options::CompilerOptions;
use crate::scope::{Scope, ScopeKind, SymbolRecord, VariableDeclaration};

/// The class whose members are being lowered.
#[derive(Debug, Clone)]
pub(crate) struct ClassContext {
    /// Local name of the class table; `None` for anonymous classes.
    pub name: Option<Identifier>,
    /// Local name of the extended class when it is a plain, non-exported
    /// identifier; `super` goes through `Name.____super` otherwise.
    pub base: Option<Identifier>,
    pub has_base: bool,
}

/// Namespace whose body is being lowered.
#[derive(Debug, Clone)]
pub(crate) struct NamespaceContext {
    pub symbol: Option<SymbolRef>,
    /// Local table the namespace's exports are assigned into.
    pub table: Identifier,
}

/// Facts about the function whose body is being lowered.
#[derive(Debug, Clone, Default)]
pub(crate) struct FunctionContext {
    /// Declared `@tupleReturn`.
    pub tuple_return: bool,
    /// Declared return type, for validating returned functions.
    pub return_type: Option<Type>,
}

/// How a local declaration was written in the source.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DeclarationSite {
    pub span: Option<Span>,
    pub function_declaration: bool,
    /// Lowered from a `var`, `let` or `const` declarator.
    pub variable: bool,
    pub block_scoped: bool,
    /// `var` redeclarations after the first are plain assignments.
    pub first_declaration: bool,
    /// The initializer has a function type.
    pub function_initializer: bool,
}

impl DeclarationSite {
    pub fn synthetic() -> Self {
        DeclarationSite {
            first_declaration: true,
            ..Default::default()
        }
    }

    pub fn function(span: Span) -> Self {
        DeclarationSite {
            span: Some(span),
            function_declaration: true,
            first_declaration: true,
            ..Default::default()
        }
    }
}

pub struct LuaTransformer<'a> {
    pub(crate) options: CompilerOptions,
    pub(crate) oracle: &'a dyn TypeOracle,
    /// Source of scope ids and therefore of generated names.
    gen_var_counter: u32,
    scope_stack: Vec<Scope>,
    symbol_ids: HashMap<SymbolRef, u32>,
    pub(crate) symbol_info: HashMap<u32, SymbolRecord>,
    next_symbol_id: u32,
    features: FeatureSet,
    pub(crate) class_stack: Vec<ClassContext>,
    pub(crate) function_stack: Vec<FunctionContext>,
    pub(crate) current_namespace: Option<NamespaceContext>,
    pub(crate) is_module: bool,
    /// `export =` was seen; it provides `____exports` itself.
    pub(crate) visited_export_equals: bool,
    /// `(from, to)` type pairs already checked for context compatibility.
    pub(crate) validated_assignments: HashSet<(String, String)>,
}

impl<'a> LuaTransformer<'a> {
    pub fn new(options: CompilerOptions, oracle: &'a dyn TypeOracle) -> Self {
        LuaTransformer {
            options,
            oracle,
            gen_var_counter: 0,
            scope_stack: Vec::new(),
            symbol_ids: HashMap::new(),
            symbol_info: HashMap::new(),
            next_symbol_id: 1,
            features: FeatureSet::new(),
            class_stack: Vec::new(),
            function_stack: Vec::new(),
            current_namespace: None,
            is_module: false,
            visited_export_equals: false,
            validated_assignments: HashSet::new(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn reset(&mut self) {
        self.gen_var_counter = 0;
        self.scope_stack.clear();
        self.symbol_ids.clear();
        self.symbol_info.clear();
        self.next_symbol_id = 1;
        self.features = FeatureSet::new();
        self.class_stack.clear();
        self.function_stack.clear();
        self.current_namespace = None;
        self.visited_export_equals = false;
        self.validated_assignments.clear();
        self.is_module = self.oracle.is_module();
    }

    /// Lowers a whole module. The returned block is the Lua chunk; the
    /// feature set lists every LuaLib helper it calls.
    pub fn transform_source_file(&mut self, module: &ast::Module) -> Result<(Block, FeatureSet)> {
        self.reset();
        log::debug!(
            "lowering {} top-level items (module: {})",
            module.body.len(),
            self.is_module
        );

        self.push_scope(ScopeKind::FILE);
        let statements = self.transform_module_items(&module.body)?;
        let scope = self.pop_scope();
        let mut statements = self.perform_hoisting(&scope, statements);

        if self.is_module {
            if !self.visited_export_equals {
                statements.insert(
                    0,
                    create_variable_declaration_statement(
                        vec![self.create_exports_identifier()],
                        Some(vec![create_table_expression(vec![], None)]),
                        None,
                    ),
                );
            }
            statements.push(create_return_statement(
                vec![self.create_exports_identifier().into()],
                None,
            ));
        }

        let features = std::mem::take(&mut self.features);
        log::debug!("lowered module uses {} LuaLib features", features.len());
        Ok((create_block(statements, None), features))
    }

    /// Lowers a JSON document that was parsed as a parenthesized
    /// expression statement into `return <value>`.
    pub fn transform_json_file(&mut self, module: &ast::Module) -> Result<(Block, FeatureSet)> {
        self.reset();
        let expression = match module.body.first() {
            Some(ast::ModuleItem::Stmt(ast::Stmt::Expr(statement))) => &statement.expr,
            _ => return Err(self.error(CompileErrorKind::InvalidJsonFileContent, module.span)),
        };
        self.push_scope(ScopeKind::FILE);
        let value = self.transform_expression(expression)?;
        self.pop_scope();
        let statement = create_return_statement(vec![value], self.pos(module.span));
        let features = std::mem::take(&mut self.features);
        Ok((create_block(vec![statement], None), features))
    }

    // ---- positions and errors ----

    pub(crate) fn pos(&self, span: Span) -> Option<Position> {
        if span.is_dummy() {
            return None;
        }
        self.oracle
            .line_column(span.lo)
            .map(|(line, column)| Position::new(line, column))
    }

    pub(crate) fn pos_of<N: Spanned>(&self, node: &N) -> Option<Position> {
        self.pos(node.span())
    }

    pub(crate) fn error(&self, kind: CompileErrorKind, span: Span) -> CompileError {
        CompileError::new(kind, self.oracle.source_span(span))
    }

    pub(crate) fn unsupported(&self, description: &str, kind: &str, span: Span) -> CompileError {
        self.error(CompileErrorKind::unsupported_kind(description, kind), span)
    }

    // ---- scopes ----

    pub(crate) fn push_scope(&mut self, kind: ScopeKind) -> u32 {
        let id = self.gen_var_counter;
        self.gen_var_counter += 1;
        self.scope_stack.push(Scope::new(kind, id));
        id
    }

    pub(crate) fn pop_scope(&mut self) -> Scope {
        match self.scope_stack.pop() {
            Some(scope) => scope,
            None => panic!("cannot pop scope: the scope stack is empty"),
        }
    }

    pub(crate) fn peek_scope(&self) -> &Scope {
        match self.scope_stack.last() {
            Some(scope) => scope,
            None => panic!("no scope is open"),
        }
    }

    pub(crate) fn peek_scope_mut(&mut self) -> &mut Scope {
        match self.scope_stack.last_mut() {
            Some(scope) => scope,
            None => panic!("no scope is open"),
        }
    }

    /// Innermost open scope whose kind shares a bit with `mask`.
    pub(crate) fn find_scope(&self, mask: ScopeKind) -> Option<&Scope> {
        self.scope_stack.iter().rev().find(|s| s.kind.intersects(mask))
    }

    pub(crate) fn find_scope_mut(&mut self, mask: ScopeKind) -> Option<&mut Scope> {
        self.scope_stack.iter_mut().rev().find(|s| s.kind.intersects(mask))
    }

    pub(crate) fn scopes_mut(&mut self) -> impl Iterator<Item = &mut Scope> {
        self.scope_stack.iter_mut().rev()
    }

    pub(crate) fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scope_stack.iter().rev()
    }

    // ---- symbols ----

    /// Assigns `symbol` an id on first sight and records the reference in
    /// every open scope.
    pub(crate) fn track_symbol_reference(&mut self, symbol: SymbolRef, span: Span) -> Result<u32> {
        let position = self.oracle.offset(span.lo);
        let id = match self.symbol_ids.get(&symbol) {
            Some(id) => *id,
            None => {
                let id = self.next_symbol_id;
                self.next_symbol_id += 1;
                self.symbol_ids.insert(symbol, id);
                self.symbol_info.insert(
                    id,
                    SymbolRecord {
                        symbol,
                        first_seen: position,
                    },
                );
                id
            }
        };

        if self.options.no_hoisting {
            let info = self.oracle.symbol(symbol);
            if let Some(declaration) = info.first_declaration() {
                if position < declaration {
                    return Err(self.error(
                        CompileErrorKind::ReferencedBeforeDeclaration(info.name.clone()),
                        span,
                    ));
                }
            }
        }

        for scope in self.scope_stack.iter_mut() {
            scope.referenced_symbols.entry(id).or_default().push(position);
        }
        Ok(id)
    }

    /// Id already given to `symbol`, without recording a reference.
    pub(crate) fn known_symbol_id(&self, symbol: SymbolRef) -> Option<u32> {
        self.symbol_ids.get(&symbol).copied()
    }

    pub(crate) fn symbol_of_identifier(&self, identifier: &Identifier) -> Option<SymbolRef> {
        identifier
            .symbol_id
            .and_then(|id| self.symbol_info.get(&id))
            .map(|record| record.symbol)
    }

    pub(crate) fn identifier_export_scope(&self, identifier: &Identifier) -> Option<ExportScope> {
        self.symbol_of_identifier(identifier)
            .and_then(|symbol| self.oracle.symbol(symbol).export_scope)
    }

    // ---- features ----

    pub(crate) fn import_feature(&mut self, feature: LuaLibFeature) {
        if self.features.insert(feature) {
            log::debug!("requested LuaLib feature {}", feature.name());
        }
    }

    /// Calls the LuaLib helper for `feature`, requesting it.
    pub(crate) fn lualib_call(
        &mut self,
        feature: LuaLibFeature,
        params: Vec<Expression>,
        original: Option<Position>,
    ) -> Expression {
        self.import_feature(feature);
        let function = create_identifier(feature.function_name(), None, None, None);
        create_call_expression(function.into(), params, original)
    }

    /// Requests the collection features a constructed builtin needs.
    pub(crate) fn check_for_lualib_type(&mut self, ty: &Type) {
        let Some(named) = ty.resolved().as_named() else {
            return;
        };
        let feature = match named.name.trim_end_matches("Constructor") {
            "Map" => LuaLibFeature::Map,
            "Set" => LuaLibFeature::Set,
            "WeakMap" => LuaLibFeature::WeakMap,
            "WeakSet" => LuaLibFeature::WeakSet,
            _ => return,
        };
        self.import_feature(feature);
    }

    // ---- synthesized nodes ----

    pub(crate) fn create_self_identifier(&self, original: Option<Position>) -> Identifier {
        create_identifier("self", original, None, Some("this".to_string()))
    }

    pub(crate) fn create_exports_identifier(&self) -> Identifier {
        create_identifier("____exports", None, None, None)
    }

    /// `unpack(e)` or `table.unpack(e)` depending on the target.
    pub(crate) fn create_unpack_call(&self, expression: Expression, original: Option<Position>) -> Expression {
        let function: Expression = match self.options.lua_target.unpack_function() {
            "table.unpack" => create_table_index_expression(
                create_identifier("table", None, None, None).into(),
                create_string_literal("unpack", None),
                None,
            )
            .into(),
            name => create_identifier(name, None, None, None).into(),
        };
        create_call_expression(function, vec![expression], original)
    }

    /// `({a, b, c})`
    pub(crate) fn wrap_in_table(&self, expressions: Vec<Expression>) -> Expression {
        let fields = expressions
            .into_iter()
            .map(|e| create_table_field_expression(e, None, None))
            .collect();
        create_parenthesized_expression(create_table_expression(fields, None), None)
    }

    /// `function() return e end`
    pub(crate) fn wrap_in_function_call(&self, expression: Expression) -> Expression {
        let body = create_block(vec![create_return_statement(vec![expression], None)], None);
        create_function_expression(body, vec![], false, None, FunctionExpressionFlags::INLINE, None)
    }

    /// `(function() statements; return result end)()`
    pub(crate) fn create_immediately_invoked_function_expression(
        &self,
        mut statements: Vec<Statement>,
        result: Vec<Expression>,
        original: Option<Position>,
    ) -> Expression {
        let flags = if statements.is_empty() {
            FunctionExpressionFlags::INLINE
        } else {
            FunctionExpressionFlags::NONE
        };
        statements.push(create_return_statement(result, None));
        let function = create_function_expression(create_block(statements, None), vec![], false, None, flags, None);
        create_call_expression(create_parenthesized_expression(function, None), vec![], original)
    }

    /// `tostring(e)` unless `e` is already a string, a number or a
    /// concatenation.
    pub(crate) fn wrap_in_to_string_for_concat(&self, expression: Expression) -> Expression {
        match &expression {
            Expression::StringLiteral(_) | Expression::NumericLiteral(_) => expression,
            Expression::Binary(b) if b.operator == BinaryOperator::Concat => expression,
            _ => {
                let tostring = create_identifier("tostring", None, None, None);
                create_call_expression(tostring.into(), vec![expression], None)
            }
        }
    }

    /// Shifts a zero-based index to Lua's one-based indexing, folding
    /// literals and an immediately preceding `- 1`.
    pub(crate) fn expression_plus_one(&self, expression: Expression) -> Expression {
        let expression = match expression {
            Expression::NumericLiteral(literal) => {
                let original = literal.meta.position;
                return create_numeric_literal(literal.value + 1.0, original);
            }
            Expression::Binary(binary) => {
                if binary.operator == BinaryOperator::Subtraction {
                    if let Expression::NumericLiteral(one) = binary.right.as_ref() {
                        if one.value == 1.0 {
                            return *binary.left;
                        }
                    }
                }
                create_parenthesized_expression(Expression::Binary(binary), None)
            }
            other => other,
        };
        create_binary_expression(expression, create_numeric_literal(1.0, None), BinaryOperator::Addition, None)
    }

    // ---- declarations ----

    /// Declares `lhs` the way the symbol's position requires: assigned into
    /// an export table, as a `local`, or as a global assignment.
    pub(crate) fn create_local_or_exported_or_global_declaration(
        &mut self,
        lhs: Vec<Identifier>,
        rhs: Option<Vec<Expression>>,
        site: DeclarationSite,
        override_export_scope: Option<ExportScope>,
    ) -> Result<Vec<Statement>> {
        let Some(first) = lhs.first() else {
            return Ok(Vec::new());
        };
        let original = site.span.and_then(|span| self.pos(span));
        let mut declaration: Option<Statement> = None;
        let mut assignment: Option<Statement> = None;

        let export_scope = override_export_scope.or_else(|| self.identifier_export_scope(first));
        let function_symbol = if site.function_declaration { first.symbol_id } else { None };

        if let Some(scope) = export_scope {
            let Some(rhs) = rhs else {
                return Ok(Vec::new());
            };
            let left = lhs
                .iter()
                .map(|identifier| self.create_exported_identifier(identifier, scope).into())
                .collect();
            assignment = Some(create_assignment_statement(left, rhs, original));
        } else {
            let inside_function = self.find_scope(ScopeKind::FUNCTION).is_some();
            let first_declaration = site.block_scoped || site.first_declaration;
            if (self.is_module || self.current_namespace.is_some() || inside_function || site.block_scoped)
                && first_declaration
            {
                let statement = if !site.function_declaration && site.variable && site.function_initializer {
                    let left: Vec<AssignmentLeftHandSide> =
                        lhs.iter().map(|i| clone_identifier(i, None).into()).collect();
                    if let Some(rhs) = rhs {
                        assignment = Some(create_assignment_statement(left, rhs, original));
                    }
                    create_variable_declaration_statement(lhs.clone(), None, original)
                } else {
                    create_variable_declaration_statement(lhs.clone(), rhs, original)
                };

                if !self.options.no_hoisting {
                    let record = VariableDeclaration {
                        statement: statement.id(),
                        identifiers: lhs.clone(),
                        original,
                    };
                    let scope = if site.block_scoped || site.function_declaration {
                        Some(self.peek_scope_mut())
                    } else {
                        self.find_scope_mut(ScopeKind::FUNCTION | ScopeKind::FILE)
                    };
                    if let Some(scope) = scope {
                        scope.variable_declarations.push(record);
                    }
                }
                declaration = Some(statement);
            } else if let Some(rhs) = rhs {
                let left = lhs.into_iter().map(AssignmentLeftHandSide::from).collect();
                assignment = Some(create_assignment_statement(left, rhs, original));
            } else {
                return Ok(Vec::new());
            }
        }

        if let (Some(symbol_id), Some(span)) = (function_symbol, site.span) {
            let definition = declaration.as_ref().or(assignment.as_ref()).map(|s| s.id());
            let offset = self.oracle.offset(span.lo);
            if let (Some(definition), false) = (definition, self.options.no_hoisting) {
                if let Some(record) = self.peek_scope_mut().function_definition_mut(symbol_id) {
                    record.definition = Some((definition, offset));
                }
            }
        }

        Ok(declaration.into_iter().chain(assignment).collect())
    }

    /// `local name = value`, recorded for hoisting when `name` is a
    /// tracked symbol.
    pub(crate) fn create_hoistable_variable_declaration(
        &mut self,
        identifier: Identifier,
        value: Option<Expression>,
        original: Option<Position>,
    ) -> Statement {
        let statement = create_variable_declaration_statement(vec![identifier.clone()], value.map(|v| vec![v]), original);
        if !self.options.no_hoisting && identifier.symbol_id.is_some() {
            let record = VariableDeclaration {
                statement: statement.id(),
                identifiers: vec![identifier],
                original,
            };
            self.peek_scope_mut().variable_declarations.push(record);
        }
        statement
    }

    /// `____exports.name` or `Namespace.name`.
    pub(crate) fn create_exported_identifier(&self, identifier: &Identifier, scope: ExportScope) -> TableIndexExpression {
        let table = match scope {
            ExportScope::File => self.create_exports_identifier(),
            ExportScope::Namespace(namespace) => self.create_namespace_table_identifier(namespace),
        };
        create_table_index_expression(
            table.into(),
            create_string_literal(identifier.text.clone(), None),
            identifier.meta.position,
        )
    }

    /// Export-aware reference to a declared identifier.
    pub(crate) fn add_export_to_identifier(&self, identifier: Identifier) -> Expression {
        match self.identifier_export_scope(&identifier) {
            Some(scope) => self.create_exported_identifier(&identifier, scope).into(),
            None => identifier.into(),
        }
    }

    /// [`Self::add_export_to_identifier`] for the left side of `=`.
    pub(crate) fn add_export_to_assignment_target(&self, identifier: Identifier) -> AssignmentLeftHandSide {
        match self.identifier_export_scope(&identifier) {
            Some(scope) => self.create_exported_identifier(&identifier, scope).into(),
            None => identifier.into(),
        }
    }

    /// Local name of a namespace's table.
    pub(crate) fn create_namespace_table_identifier(&self, namespace: SymbolRef) -> Identifier {
        if let Some(current) = &self.current_namespace {
            if current.symbol == Some(namespace) {
                return clone_identifier(&current.table, None);
            }
        }
        let name = &self.oracle.symbol(namespace).name;
        let text = if crate::identifiers::is_unsafe_name(name) {
            crate::identifiers::create_safe_name(name)
        } else {
            name.clone()
        };
        create_identifier(text, None, self.known_symbol_id(namespace), Some(name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{lower, render_block, with_transformer};

    #[test]
    fn test_expression_plus_one_folds_literals() {
        with_transformer("", |transformer| {
            let folded = transformer.expression_plus_one(create_numeric_literal(2.0, None));
            assert!(matches!(folded, Expression::NumericLiteral(ref n) if n.value == 3.0));

            let minus_one = create_binary_expression(
                create_identifier("i", None, None, None).into(),
                create_numeric_literal(1.0, None),
                BinaryOperator::Subtraction,
                None,
            );
            let cancelled = transformer.expression_plus_one(minus_one);
            assert!(matches!(cancelled, Expression::Identifier(ref i) if i.text == "i"));

            let sum = create_binary_expression(
                create_identifier("i", None, None, None).into(),
                create_identifier("j", None, None, None).into(),
                BinaryOperator::Addition,
                None,
            );
            let Expression::Binary(binary) = transformer.expression_plus_one(sum) else {
                panic!("expected addition");
            };
            assert!(matches!(*binary.left, Expression::Parenthesized(_)));
        });
    }

    #[test]
    fn test_module_gets_exports_table() {
        let lowered = lower("export const answer = 42;");
        let text = render_block(&lowered.block);
        assert!(text.starts_with("local ____exports = {}\n"));
        assert!(text.contains("____exports[\"answer\"] = 42"));
        assert!(text.trim_end().ends_with("return ____exports"));
    }

    #[test]
    fn test_script_has_no_exports_table() {
        let lowered = lower("var answer = 42;");
        assert_eq!(render_block(&lowered.block), "answer = 42\n");
    }

    #[test]
    #[should_panic(expected = "scope stack is empty")]
    fn test_pop_scope_underflow_panics() {
        with_transformer("", |transformer| {
            transformer.pop_scope();
        });
    }

    #[test]
    fn test_scope_ids_are_unique() {
        with_transformer("", |transformer| {
            let a = transformer.push_scope(ScopeKind::FILE);
            let b = transformer.push_scope(ScopeKind::LOOP);
            assert_ne!(a, b);
            assert_eq!(transformer.find_scope(ScopeKind::FILE).map(|s| s.id), Some(a));
            assert_eq!(transformer.pop_scope().id, b);
        });
    }
}
