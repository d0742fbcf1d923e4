//! Classes.
//!
//! A class lowers to a table holding its static members and a `prototype`
//! table holding instance members, chained to the base class through
//! metatables. `Name.new` creates an instance and runs
//! `prototype.____constructor`. Accessors live in `____getters` and
//! `____setters` tables that the LuaLib index helpers consult; those
//! helpers are only installed when the class or an ancestor declares
//! accessors.

use std::collections::HashSet;

use swc_common::{Span, Spanned};
use swc_ecma_ast as ast;

use tslua_checker::ClassInfo;
use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::{ContextType, DirectiveKind, Directives, SymbolRef, Type};

use crate::error::{CompileErrorKind, Result};
use crate::functions::FunctionBody;
use crate::transformer::{ClassContext, DeclarationSite, LuaTransformer};

/// `table["key"]`
fn index(table: impl Into<Expression>, key: &str) -> Expression {
    create_table_index_expression(table.into(), create_string_literal(key, None), None).into()
}

fn index_target(table: impl Into<Expression>, key: &str) -> AssignmentLeftHandSide {
    create_table_index_expression(table.into(), create_string_literal(key, None), None).into()
}

fn global(name: &str) -> Expression {
    create_identifier(name, None, None, None).into()
}

fn set_metatable(table: Expression, metatable: Expression, original: Option<Position>) -> Statement {
    create_expression_statement(
        create_call_expression(global("setmetatable"), vec![table, metatable], None),
        original,
    )
}

/// Text of a non-computed member name.
fn prop_name_text(key: &ast::PropName) -> Option<String> {
    match key {
        ast::PropName::Ident(ident) => Some(ident.sym.to_string()),
        ast::PropName::Str(s) => Some(s.value.as_str().unwrap_or("").to_string()),
        ast::PropName::Num(n) => Some(n.value.to_string()),
        ast::PropName::Computed(_) | ast::PropName::BigInt(_) => None,
    }
}

fn is_super_call_statement(statement: &ast::Stmt) -> bool {
    match statement {
        ast::Stmt::Expr(statement) => matches!(
            statement.expr.as_ref(),
            ast::Expr::Call(ast::CallExpr { callee: ast::Callee::Super(_), .. })
        ),
        _ => false,
    }
}

/// How the class table is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassBinding {
    /// Declared like any other local, export or global.
    Declaration,
    /// `local Name = {}` inside the function wrapping a class expression.
    Expression,
    /// `____exports.default = {}` followed by a local alias.
    DefaultExport,
}

struct ClassName {
    local: Identifier,
    /// Value of the `name` field.
    text: String,
    anonymous: bool,
}

/// Members of a class body, grouped the way they are emitted.
#[derive(Default)]
struct Members<'c> {
    constructor: Option<&'c ast::Constructor>,
    instance_fields: Vec<&'c ast::ClassProp>,
    static_fields: Vec<&'c ast::ClassProp>,
    getters: Vec<&'c ast::ClassMethod>,
    setters: Vec<&'c ast::ClassMethod>,
    methods: Vec<&'c ast::ClassMethod>,
}

impl<'a> LuaTransformer<'a> {
    /// `class Name {}` as a statement. An unnamed class is only accepted
    /// as a default export.
    pub(crate) fn transform_class_declaration(
        &mut self,
        class: &ast::Class,
        ident: Option<&ast::Ident>,
        site: Span,
        exported: bool,
        default_export: bool,
    ) -> Result<Vec<Statement>> {
        let binding = if default_export {
            ClassBinding::DefaultExport
        } else {
            ClassBinding::Declaration
        };
        match ident {
            Some(ident) => {
                let name = ClassName {
                    local: self.transform_identifier(ident)?,
                    text: ident.sym.to_string(),
                    anonymous: false,
                };
                self.transform_class(class, name, binding, site, exported)
            }
            None if default_export => {
                let name = ClassName {
                    local: create_identifier("default", None, None, None),
                    text: "default".to_string(),
                    anonymous: true,
                };
                let value = self.transform_class_in_function(class, name)?;
                let left = index_target(self.create_exports_identifier(), "default");
                Ok(vec![create_assignment_statement(vec![left], vec![value], self.pos(site))])
            }
            None => Err(self.error(CompileErrorKind::MissingClassName, class.span)),
        }
    }

    /// `class {}` as a value: the declaration wrapped in a function that
    /// returns the class table.
    pub(crate) fn transform_class_expression(&mut self, expression: &ast::ClassExpr) -> Result<Expression> {
        let name = match &expression.ident {
            Some(ident) => ClassName {
                local: self.transform_identifier(ident)?,
                text: ident.sym.to_string(),
                anonymous: false,
            },
            None => ClassName {
                local: create_anonymous_identifier(None),
                text: "____".to_string(),
                anonymous: true,
            },
        };
        self.transform_class_in_function(&expression.class, name)
    }

    fn transform_class_in_function(&mut self, class: &ast::Class, name: ClassName) -> Result<Expression> {
        let result = clone_identifier(&name.local, None);
        let statements = self.transform_class(class, name, ClassBinding::Expression, class.span, false)?;
        Ok(self.create_immediately_invoked_function_expression(statements, vec![result.into()], self.pos(class.span)))
    }

    /// `Base.prototype` for a simple, non-exported base identifier and
    /// `Name.____super.prototype` otherwise.
    pub(crate) fn transform_super_prototype(&mut self, span: Span) -> Result<Expression> {
        let base: Expression = match self.class_stack.last() {
            Some(ClassContext { has_base: false, .. }) | None => {
                return Err(self.error(CompileErrorKind::UnknownSuperType, span));
            }
            Some(ClassContext { base: Some(base), .. }) => clone_identifier(base, None).into(),
            Some(ClassContext { name: Some(name), .. }) => index(clone_identifier(name, None), "____super"),
            Some(_) => return Err(self.error(CompileErrorKind::MissingClassName, span)),
        };
        Ok(create_table_index_expression(base, create_string_literal("prototype", None), self.pos(span)).into())
    }

    fn transform_class(
        &mut self,
        class: &ast::Class,
        name: ClassName,
        binding: ClassBinding,
        site: Span,
        exported: bool,
    ) -> Result<Vec<Statement>> {
        let extended = self.extended_class(class);
        let base = match &extended {
            Some((ast::Expr::Ident(ident), _)) => {
                let plain = self
                    .oracle
                    .symbol_at(ident)
                    .map_or(false, |symbol| self.oracle.symbol(symbol).export_scope.is_none());
                if plain {
                    Some(self.transform_identifier(ident)?)
                } else {
                    None
                }
            }
            _ => None,
        };
        log::trace!("lowering class {} (extends: {})", name.text, extended.is_some());

        self.class_stack.push(ClassContext {
            name: (!name.anonymous).then(|| clone_identifier(&name.local, None)),
            base,
            has_base: extended.is_some(),
        });
        let result = self.transform_class_members(class, &name, binding, site, exported, extended.as_ref());
        self.class_stack.pop();
        result
    }

    /// The extended class expression and its type, ignoring
    /// `@pureAbstract` bases.
    fn extended_class<'c>(&self, class: &'c ast::Class) -> Option<(&'c ast::Expr, Type)> {
        let super_class = class.super_class.as_deref()?;
        let ty = self.oracle.type_of_expr(super_class);
        if self.base_directives(super_class, &ty).has(DirectiveKind::PureAbstract) {
            return None;
        }
        Some((super_class, ty))
    }

    fn base_directives(&self, super_class: &ast::Expr, ty: &Type) -> Directives {
        let mut directives = self.oracle.type_directives(ty);
        if let ast::Expr::Ident(ident) = super_class {
            if let Some(symbol) = self.oracle.symbol_at(ident) {
                directives.merge(&self.oracle.symbol(symbol).directives);
            }
        }
        directives
    }

    fn base_name(&self, super_class: &ast::Expr, ty: &Type) -> String {
        if let Some(symbol) = ty.symbol() {
            return self.oracle.symbol(symbol).name.clone();
        }
        match super_class {
            ast::Expr::Ident(ident) => ident.sym.to_string(),
            _ => "____".to_string(),
        }
    }

    /// Member facts of the class and every class it extends, nearest first.
    fn class_chain(&self, symbol: Option<SymbolRef>) -> Vec<&'a ClassInfo> {
        let oracle = self.oracle;
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = symbol;
        while let Some(symbol) = next {
            if !seen.insert(symbol) {
                break;
            }
            let Some(info) = oracle.class_info(symbol) else {
                break;
            };
            chain.push(info);
            next = info.base;
        }
        chain
    }

    fn collect_members<'c>(&self, class: &'c ast::Class) -> Result<Members<'c>> {
        let mut members = Members::default();
        for member in &class.body {
            match member {
                ast::ClassMember::Constructor(constructor) => {
                    if constructor.body.is_some() && members.constructor.is_none() {
                        members.constructor = Some(constructor);
                    }
                }
                ast::ClassMember::ClassProp(prop) => {
                    if prop.declare || prop.value.is_none() {
                        continue;
                    }
                    if prop.is_static {
                        members.static_fields.push(prop);
                    } else {
                        members.instance_fields.push(prop);
                    }
                }
                ast::ClassMember::Method(method) => match method.kind {
                    ast::MethodKind::Getter => members.getters.push(method),
                    ast::MethodKind::Setter => members.setters.push(method),
                    ast::MethodKind::Method => members.methods.push(method),
                },
                ast::ClassMember::PrivateMethod(method) => {
                    return Err(self.unsupported("class member", "PrivateIdentifier", method.span));
                }
                ast::ClassMember::PrivateProp(prop) => {
                    return Err(self.unsupported("class member", "PrivateIdentifier", prop.span));
                }
                ast::ClassMember::StaticBlock(block) => {
                    return Err(self.unsupported("class member", "ClassStaticBlockDeclaration", block.span));
                }
                ast::ClassMember::AutoAccessor(accessor) => {
                    return Err(self.unsupported("class member", "AccessorKeyword", accessor.span));
                }
                ast::ClassMember::TsIndexSignature(_) | ast::ClassMember::Empty(_) => {}
            }
        }
        Ok(members)
    }

    fn validate_class_element(&self, is_static: bool, key: &ast::PropName) -> Result<()> {
        let named_new = match key {
            ast::PropName::Ident(_) | ast::PropName::Str(_) => prop_name_text(key).as_deref() == Some("new"),
            _ => false,
        };
        if is_static && named_new {
            return Err(self.error(
                CompileErrorKind::ForbiddenStaticClassPropertyName("new".to_string()),
                key.span(),
            ));
        }
        Ok(())
    }

    fn transform_class_members(
        &mut self,
        class: &ast::Class,
        name: &ClassName,
        binding: ClassBinding,
        site: Span,
        exported: bool,
        extended: Option<&(&ast::Expr, Type)>,
    ) -> Result<Vec<Statement>> {
        let original = self.pos(class.span);
        let symbol = self.oracle.class_symbol(class);
        let directives = symbol
            .map(|symbol| self.oracle.symbol(symbol).directives.clone())
            .unwrap_or_else(Directives::new);

        let is_extension = directives.has(DirectiveKind::Extension);
        let is_meta_extension = directives.has(DirectiveKind::MetaExtension);
        if is_extension && is_meta_extension {
            return Err(self.error(CompileErrorKind::InvalidExtensionMetaExtension, class.span));
        }
        let patches_existing = is_extension || is_meta_extension;
        if patches_existing && (exported || self.identifier_export_scope(&name.local).is_some()) {
            return Err(self.error(CompileErrorKind::InvalidExportsExtension, class.span));
        }
        if let Some((super_class, ty)) = extended {
            let base_directives = self.base_directives(super_class, ty);
            if !patches_existing
                && (base_directives.has(DirectiveKind::Extension) || base_directives.has(DirectiveKind::MetaExtension))
            {
                return Err(self.error(CompileErrorKind::InvalidExtendsExtension, class.span));
            }
            if base_directives.has(DirectiveKind::LuaTable) {
                return Err(self.error(CompileErrorKind::InvalidExtendsLuaTable, class.span));
            }
        }
        if directives.has(DirectiveKind::LuaTable) {
            return Err(self.error(CompileErrorKind::ForbiddenLuaTableNonDeclaration, class.span));
        }

        let members = self.collect_members(class)?;
        let mut result = Vec::new();
        let mut local = clone_identifier(&name.local, None);

        if is_meta_extension {
            let Some((super_class, ty)) = extended else {
                return Err(self.error(CompileErrorKind::MissingMetaExtension, class.span));
            };
            let base_name = self.base_name(super_class, ty);
            local = create_identifier(format!("__meta__{}", base_name), None, None, None);
            let registry = create_call_expression(index(global("debug"), "getregistry"), vec![], None);
            let metatable = create_table_index_expression(registry, create_string_literal(base_name, None), None);
            result.push(create_variable_declaration_statement(
                vec![clone_identifier(&local, None)],
                Some(vec![metatable.into()]),
                original,
            ));
        }
        if is_extension {
            if let Some(extension_name) = directives.args(DirectiveKind::Extension).and_then(|args| args.first()) {
                local = create_identifier(extension_name.clone(), None, None, None);
            } else if let Some((super_class, ty)) = extended {
                local = create_identifier(self.base_name(super_class, ty), None, None, None);
            }
        }

        if patches_existing {
            for field in &members.instance_fields {
                let key = self.transform_property_name(&field.key)?;
                let value = self.transform_class_field_value(field)?;
                let target = create_table_index_expression(clone_identifier(&local, None).into(), key, None);
                result.push(create_assignment_statement(vec![target.into()], vec![value], self.pos(field.span)));
            }
        } else {
            result.extend(self.create_class_creation(class, name, &local, binding, site, symbol, extended, &members)?);
            result.extend(self.create_class_constructor(class, &local, symbol, extended.is_some(), &members)?);
        }

        for getter in &members.getters {
            result.extend(self.transform_accessor(getter, &local, "____getters")?);
        }
        for setter in &members.setters {
            result.extend(self.transform_accessor(setter, &local, "____setters")?);
        }
        for method in &members.methods {
            result.extend(self.transform_class_method(method, &local, patches_existing)?);
        }
        for field in &members.static_fields {
            self.validate_class_element(true, &field.key)?;
            let key = self.transform_property_name(&field.key)?;
            let value = self.transform_class_field_value(field)?;
            let target = create_table_index_expression(clone_identifier(&local, None).into(), key, None);
            result.push(create_assignment_statement(vec![target.into()], vec![value], self.pos(field.span)));
        }
        result.extend(self.create_class_decoration(class, name)?);
        Ok(result)
    }

    fn transform_class_field_value(&mut self, field: &ast::ClassProp) -> Result<Expression> {
        match &field.value {
            Some(value) => self.transform_expression(value),
            None => Ok(create_nil_literal(None)),
        }
    }

    /// Class and prototype tables, metatable wiring and `Name.new`.
    #[allow(clippy::too_many_arguments)]
    fn create_class_creation(
        &mut self,
        class: &ast::Class,
        name: &ClassName,
        local: &Identifier,
        binding: ClassBinding,
        site: Span,
        symbol: Option<SymbolRef>,
        extended: Option<&(&ast::Expr, Type)>,
        members: &Members<'_>,
    ) -> Result<Vec<Statement>> {
        let original = self.pos(class.span);
        let class_ref = || -> Expression { clone_identifier(local, None).into() };
        let prototype = || index(clone_identifier(local, None), "prototype");
        let mut result = Vec::new();

        let table = create_table_expression(vec![], None);
        match binding {
            ClassBinding::Declaration => {
                let declaration_site = DeclarationSite {
                    span: Some(site),
                    first_declaration: true,
                    ..Default::default()
                };
                result.extend(self.create_local_or_exported_or_global_declaration(
                    vec![clone_identifier(&name.local, None)],
                    Some(vec![table]),
                    declaration_site,
                    None,
                )?);
                if let Some(scope) = self.identifier_export_scope(&name.local) {
                    let exported = self.create_exported_identifier(&name.local, scope);
                    result.push(create_variable_declaration_statement(
                        vec![clone_identifier(local, None)],
                        Some(vec![exported.into()]),
                        None,
                    ));
                }
            }
            ClassBinding::DefaultExport => {
                let exports = || self.create_exports_identifier();
                result.push(create_assignment_statement(
                    vec![index_target(exports(), "default")],
                    vec![table],
                    original,
                ));
                result.push(create_variable_declaration_statement(
                    vec![clone_identifier(local, None)],
                    Some(vec![index(exports(), "default")]),
                    None,
                ));
            }
            ClassBinding::Expression => {
                result.push(create_variable_declaration_statement(
                    vec![clone_identifier(local, None)],
                    Some(vec![table]),
                    original,
                ));
            }
        }

        result.push(create_assignment_statement(
            vec![index_target(class_ref(), "name")],
            vec![create_string_literal(name.text.clone(), None)],
            original,
        ));

        let chain = self.class_chain(symbol);
        let own_static_getters = members.getters.iter().any(|getter| getter.is_static);
        let own_static_setters = members.setters.iter().any(|setter| setter.is_static);
        let own_instance_getters = members.getters.iter().any(|getter| !getter.is_static);
        let own_instance_setters = members.setters.iter().any(|setter| !setter.is_static);
        let static_getters = own_static_getters || chain.iter().any(|info| !info.static_getters.is_empty());
        let static_setters = own_static_setters || chain.iter().any(|info| !info.static_setters.is_empty());
        let instance_getters = own_instance_getters || chain.iter().any(|info| !info.instance_getters.is_empty());
        let instance_setters = own_instance_setters || chain.iter().any(|info| !info.instance_setters.is_empty());

        if own_static_getters {
            result.push(create_assignment_statement(
                vec![index_target(class_ref(), "____getters")],
                vec![create_table_expression(vec![], None)],
                original,
            ));
        }
        result.push(create_assignment_statement(
            vec![index_target(class_ref(), "__index")],
            vec![class_ref()],
            original,
        ));
        if own_static_setters {
            result.push(create_assignment_statement(
                vec![index_target(class_ref(), "____setters")],
                vec![create_table_expression(vec![], None)],
                original,
            ));
        }

        result.push(create_assignment_statement(
            vec![index_target(class_ref(), "prototype")],
            vec![create_table_expression(vec![], None)],
            original,
        ));
        if own_instance_getters {
            result.push(create_assignment_statement(
                vec![index_target(prototype(), "____getters")],
                vec![create_table_expression(vec![], None)],
                original,
            ));
        }
        let prototype_index = if instance_getters {
            self.lualib_call(LuaLibFeature::Index, vec![prototype()], None)
        } else {
            prototype()
        };
        result.push(create_assignment_statement(
            vec![index_target(prototype(), "__index")],
            vec![prototype_index],
            original,
        ));
        if own_instance_setters {
            result.push(create_assignment_statement(
                vec![index_target(prototype(), "____setters")],
                vec![create_table_expression(vec![], None)],
                original,
            ));
        }
        if instance_setters {
            let new_index = self.lualib_call(LuaLibFeature::NewIndex, vec![prototype()], None);
            result.push(create_assignment_statement(
                vec![index_target(prototype(), "__newindex")],
                vec![new_index],
                original,
            ));
        }
        result.push(create_assignment_statement(
            vec![index_target(prototype(), "constructor")],
            vec![class_ref()],
            original,
        ));

        let static_metatable = |transformer: &mut Self, fallback: Option<Expression>| {
            let mut fields = Vec::new();
            if static_getters {
                transformer.import_feature(LuaLibFeature::ClassIndex);
                let helper = global(&LuaLibFeature::ClassIndex.function_name());
                fields.push(create_table_field_expression(helper, Some(create_string_literal("__index", None)), None));
            } else if let Some(fallback) = fallback {
                fields.push(create_table_field_expression(fallback, Some(create_string_literal("__index", None)), None));
            }
            if static_setters {
                transformer.import_feature(LuaLibFeature::ClassNewIndex);
                let helper = global(&LuaLibFeature::ClassNewIndex.function_name());
                fields.push(create_table_field_expression(helper, Some(create_string_literal("__newindex", None)), None));
            }
            create_table_expression(fields, None)
        };

        if let Some((super_class, _)) = extended {
            let super_original = self.pos(super_class.span());
            let base = self.transform_expression(super_class)?;
            result.push(create_assignment_statement(
                vec![index_target(class_ref(), "____super")],
                vec![base],
                super_original,
            ));
            let class_base = || index(clone_identifier(local, None), "____super");
            let metatable = if static_getters || static_setters {
                static_metatable(self, Some(class_base()))
            } else {
                class_base()
            };
            result.push(set_metatable(class_ref(), metatable, super_original));
            result.push(set_metatable(prototype(), index(class_base(), "prototype"), super_original));
        } else if static_getters || static_setters {
            let metatable = static_metatable(self, None);
            result.push(set_metatable(class_ref(), metatable, original));
        }

        let instance = || self.create_self_identifier(None);
        let create_instance = create_call_expression(
            global("setmetatable"),
            vec![create_table_expression(vec![], None), prototype()],
            None,
        );
        let run_constructor = create_method_call_expression(
            instance().into(),
            create_identifier("____constructor", None, None, None),
            vec![create_dots_literal(None)],
            None,
        );
        let new_body = vec![
            create_variable_declaration_statement(vec![instance()], Some(vec![create_instance]), original),
            create_expression_statement(run_constructor, original),
            create_return_statement(vec![instance().into()], original),
        ];
        let new_function = create_function_expression(
            create_block(new_body, None),
            vec![],
            true,
            None,
            FunctionExpressionFlags::DECLARATION,
            None,
        );
        result.push(create_assignment_statement(
            vec![index_target(class_ref(), "new")],
            vec![new_function],
            original,
        ));
        Ok(result)
    }

    /// Instance getters whose name is also an initialized field somewhere
    /// in the class chain; the field would otherwise shadow the getter.
    fn getter_overrides(&self, symbol: Option<SymbolRef>, members: &Members<'_>) -> Vec<String> {
        let chain = self.class_chain(symbol);
        let own_fields: Vec<String> = members
            .instance_fields
            .iter()
            .filter_map(|field| prop_name_text(&field.key))
            .collect();
        members
            .getters
            .iter()
            .filter(|getter| !getter.is_static)
            .filter_map(|getter| prop_name_text(&getter.key))
            .filter(|name| own_fields.contains(name) || chain.iter().any(|info| info.initialized_fields.contains(name)))
            .collect()
    }

    /// `self.field = value` for every initialized instance field, then
    /// `rawset(self, name, nil)` for overridden getters.
    fn transform_class_instance_fields(&mut self, symbol: Option<SymbolRef>, members: &Members<'_>) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        for field in &members.instance_fields {
            self.validate_class_element(false, &field.key)?;
            let key = self.transform_property_name(&field.key)?;
            let value = self.transform_class_field_value(field)?;
            let target = create_table_index_expression(self.create_self_identifier(None).into(), key, None);
            statements.push(create_assignment_statement(vec![target.into()], vec![value], self.pos(field.span)));
        }
        for getter in self.getter_overrides(symbol, members) {
            let reset = create_call_expression(
                global("rawset"),
                vec![
                    self.create_self_identifier(None).into(),
                    create_string_literal(getter, None),
                    create_nil_literal(None),
                ],
                None,
            );
            statements.push(create_expression_statement(reset, None));
        }
        Ok(statements)
    }

    fn create_constructor_target(&self, local: &Identifier) -> AssignmentLeftHandSide {
        index_target(index(clone_identifier(local, None), "prototype"), "____constructor")
    }

    fn create_class_constructor(
        &mut self,
        class: &ast::Class,
        local: &Identifier,
        symbol: Option<SymbolRef>,
        has_base: bool,
        members: &Members<'_>,
    ) -> Result<Vec<Statement>> {
        if let Some(constructor) = members.constructor {
            return Ok(vec![self.transform_constructor(constructor, local, symbol, members)?]);
        }
        let original = self.pos(class.span);
        if !has_base {
            let body = self.transform_class_instance_fields(symbol, members)?;
            let function = create_function_expression(
                create_block(body, None),
                vec![self.create_self_identifier(None)],
                false,
                None,
                FunctionExpressionFlags::DECLARATION,
                None,
            );
            return Ok(vec![create_assignment_statement(
                vec![self.create_constructor_target(local)],
                vec![function],
                original,
            )]);
        }
        if members.instance_fields.is_empty() && self.getter_overrides(symbol, members).is_empty() {
            return Ok(Vec::new());
        }

        let base_constructor = index(self.transform_super_prototype(class.span)?, "____constructor");
        let super_call = create_call_expression(
            base_constructor,
            vec![self.create_self_identifier(None).into(), create_dots_literal(None)],
            None,
        );
        let mut body = vec![create_expression_statement(super_call, None)];
        body.extend(self.transform_class_instance_fields(symbol, members)?);
        let function = create_function_expression(
            create_block(body, None),
            vec![self.create_self_identifier(None)],
            true,
            None,
            FunctionExpressionFlags::DECLARATION,
            None,
        );
        Ok(vec![create_assignment_statement(
            vec![self.create_constructor_target(local)],
            vec![function],
            original,
        )])
    }

    /// An explicit constructor. Default parameters are assigned first,
    /// then a leading `super(...)` call, parameter properties, field
    /// initializers and the rest of the body.
    fn transform_constructor(
        &mut self,
        constructor: &ast::Constructor,
        local: &Identifier,
        symbol: Option<SymbolRef>,
        members: &Members<'_>,
    ) -> Result<Statement> {
        let Some(body) = &constructor.body else {
            panic!("constructor without a body selected for lowering");
        };

        let mut pats: Vec<ast::Pat> = Vec::new();
        let mut properties: Vec<&ast::Ident> = Vec::new();
        for param in &constructor.params {
            match param {
                ast::ParamOrTsParamProp::Param(param) => pats.push(param.pat.clone()),
                ast::ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                    ast::TsParamPropParam::Ident(binding) => {
                        properties.push(&binding.id);
                        pats.push(ast::Pat::Ident(binding.clone()));
                    }
                    ast::TsParamPropParam::Assign(assign) => {
                        if let ast::Pat::Ident(binding) = assign.left.as_ref() {
                            properties.push(&binding.id);
                        }
                        pats.push(ast::Pat::Assign(assign.clone()));
                    }
                },
            }
        }
        let pats: Vec<&ast::Pat> = pats.iter().collect();

        let ty = self.oracle.function_type(constructor.span).unwrap_or(Type::Any);
        let context = self.create_self_identifier(None);
        let parameters = self.transform_parameters(&pats, Some(context))?;
        let info = self.function_context_of_type(&ty);
        let (mut statements, scope) = self.transform_function_body_statements(FunctionBody::Block(body), info)?;
        let mut header = self.transform_function_body_header(&scope, &pats, parameters.rest.as_ref())?;
        let fields = self.transform_class_instance_fields(symbol, members)?;

        let moves_super_call = !properties.is_empty() || !fields.is_empty();
        if moves_super_call && body.stmts.first().map_or(false, is_super_call_statement) {
            let position = statements
                .iter()
                .position(|statement| matches!(statement, Statement::Expression(_)));
            if let Some(position) = position {
                header.push(statements.remove(position));
            }
        }
        for ident in properties {
            let name = self.transform_identifier(ident)?;
            let target = index_target(self.create_self_identifier(None), &name.text);
            header.push(create_assignment_statement(vec![target], vec![name.into()], None));
        }
        header.extend(fields);
        header.extend(statements);

        let function = create_function_expression(
            create_block(header, None),
            parameters.names,
            parameters.dots,
            parameters.rest,
            FunctionExpressionFlags::DECLARATION,
            None,
        );
        Ok(create_assignment_statement(
            vec![self.create_constructor_target(local)],
            vec![function],
            self.pos(constructor.span),
        ))
    }

    /// `Name.prototype.____getters.name = function(self) ... end`, or on
    /// the class table itself for static accessors.
    fn transform_accessor(
        &mut self,
        accessor: &ast::ClassMethod,
        local: &Identifier,
        table: &str,
    ) -> Result<Option<Statement>> {
        let function = &accessor.function;
        let Some(body) = &function.body else {
            return Ok(None);
        };
        self.validate_class_element(accessor.is_static, &accessor.key)?;
        let Some(name) = prop_name_text(&accessor.key) else {
            return Err(self.unsupported("accessor name", "ComputedPropertyName", accessor.key.span()));
        };

        let ty = self.oracle.function_type(function.span).unwrap_or(Type::Any);
        let pats: Vec<&ast::Pat> = function.params.iter().map(|p| &p.pat).collect();
        let context = self.create_self_identifier(None);
        let parameters = self.transform_parameters(&pats, Some(context))?;
        let info = self.function_context_of_type(&ty);
        let (statements, _) =
            self.transform_function_like_body(&pats, FunctionBody::Block(body), parameters.rest.as_ref(), info, false)?;
        let accessor_function = create_function_expression(
            create_block(statements, None),
            parameters.names,
            parameters.dots,
            parameters.rest,
            FunctionExpressionFlags::DECLARATION,
            self.pos(function.span),
        );

        let owner = if accessor.is_static {
            clone_identifier(local, None).into()
        } else {
            index(clone_identifier(local, None), "prototype")
        };
        let target = create_table_index_expression(index(owner, table), create_string_literal(name, None), None);
        Ok(Some(create_assignment_statement(
            vec![target.into()],
            vec![accessor_function],
            self.pos(accessor.span),
        )))
    }

    fn transform_class_method(
        &mut self,
        method: &ast::ClassMethod,
        local: &Identifier,
        no_prototype: bool,
    ) -> Result<Option<Statement>> {
        if method.function.body.is_none() {
            return Ok(None);
        }
        self.validate_class_element(method.is_static, &method.key)?;
        let mut key = self.transform_property_name(&method.key)?;
        if matches!(&key, Expression::StringLiteral(literal) if literal.value == "toString") {
            key = create_string_literal("__tostring", self.pos(method.key.span()));
        }
        let function = self.transform_method_function(&method.function)?;
        let owner = if method.is_static || no_prototype {
            clone_identifier(local, None).into()
        } else {
            index(clone_identifier(local, None), "prototype")
        };
        let target = create_table_index_expression(owner, key, None);
        Ok(Some(create_assignment_statement(
            vec![target.into()],
            vec![function],
            self.pos(method.span),
        )))
    }

    /// `Name = __TS__Decorate({decorators}, Name)`
    fn create_class_decoration(&mut self, class: &ast::Class, name: &ClassName) -> Result<Option<Statement>> {
        if class.decorators.is_empty() {
            return Ok(None);
        }
        let mut fields = Vec::new();
        for decorator in &class.decorators {
            let ty = self.oracle.type_of_expr(&decorator.expr);
            if self.oracle.function_context_type(&ty) == ContextType::Void {
                return Err(self.error(CompileErrorKind::InvalidDecoratorContext, decorator.span));
            }
            let expression = self.transform_expression(&decorator.expr)?;
            fields.push(create_table_field_expression(expression, None, None));
        }

        let (target, left): (Expression, AssignmentLeftHandSide) = if name.anonymous {
            (create_anonymous_identifier(None).into(), create_anonymous_identifier(None).into())
        } else {
            (
                self.add_export_to_identifier(clone_identifier(&name.local, None)),
                self.add_export_to_assignment_target(clone_identifier(&name.local, None)),
            )
        };
        let decorate = self.lualib_call(
            LuaLibFeature::Decorate,
            vec![create_table_expression(fields, None), target],
            None,
        );
        Ok(Some(create_assignment_statement(vec![left], vec![decorate], self.pos(class.span))))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};
    use tslua_lualib::LuaLibFeature;

    #[test]
    fn test_derived_class_synthesizes_constructor_for_fields() {
        let text = lower("class Bar {}\nclass Foo extends Bar {\n    field = 1;\n}").text();
        assert!(text.contains("Bar[\"prototype\"][\"____constructor\"] = function(self)\nend\n"), "{}", text);
        assert!(text.contains("Foo[\"____super\"] = Bar\n"), "{}", text);
        assert!(text.contains("setmetatable(Foo, Foo[\"____super\"])\n"), "{}", text);
        assert!(
            text.contains("setmetatable(Foo[\"prototype\"], Foo[\"____super\"][\"prototype\"])\n"),
            "{}",
            text
        );
        assert!(
            text.contains(
                "Foo[\"prototype\"][\"____constructor\"] = function(self, ...)\n    Bar[\"prototype\"][\"____constructor\"](self, ...)\n    self[\"field\"] = 1\nend\n"
            ),
            "{}",
            text
        );
    }

    #[test]
    fn test_class_creation_sequence() {
        let text = lower("class A {}").text();
        let expected = "A = {}\nA[\"name\"] = \"A\"\nA[\"__index\"] = A\nA[\"prototype\"] = {}\nA[\"prototype\"][\"__index\"] = A[\"prototype\"]\nA[\"prototype\"][\"constructor\"] = A\nA[\"new\"] = function(...)\n    local self = setmetatable({}, A[\"prototype\"])\n    self:____constructor(...)\n    return self\nend\n";
        assert!(text.starts_with(expected), "{}", text);
    }

    #[test]
    fn test_exported_class_with_parameter_properties() {
        let source = "export class A {\n    constructor(public x: number) {}\n    m() { return this.x; }\n}";
        let text = lower(source).text();
        assert!(text.contains("____exports[\"A\"] = {}\n"), "{}", text);
        assert!(text.contains("local A = ____exports[\"A\"]\n"), "{}", text);
        assert!(
            text.contains("A[\"prototype\"][\"____constructor\"] = function(self, x)\n    self[\"x\"] = x\nend\n"),
            "{}",
            text
        );
        assert!(text.contains("A[\"prototype\"][\"m\"] = function(self)\n    return self[\"x\"]\nend\n"), "{}", text);
    }

    #[test]
    fn test_super_call_moves_before_field_initializers() {
        let source = "class B { constructor(a: number) {} }\nclass C extends B {\n    y = 2;\n    constructor(a: number) { super(a); }\n}";
        let text = lower(source).text();
        assert!(
            text.contains("C[\"prototype\"][\"____constructor\"] = function(self, a)\n    B[\"prototype\"][\"____constructor\"](self, a)\n    self[\"y\"] = 2\nend\n"),
            "{}",
            text
        );
    }

    #[test]
    fn test_accessors_install_index_helpers() {
        let source = "class P {\n    private v = 0;\n    get value() { return this.v; }\n    set value(x: number) { this.v = x; }\n    static get count() { return 1; }\n}";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(text.contains("P[\"____getters\"] = {}\n"), "{}", text);
        assert!(text.contains("setmetatable(P, {[\"__index\"] = __TS__ClassIndex})\n"), "{}", text);
        assert!(text.contains("P[\"prototype\"][\"__index\"] = __TS__Index(P[\"prototype\"])\n"), "{}", text);
        assert!(text.contains("P[\"prototype\"][\"__newindex\"] = __TS__NewIndex(P[\"prototype\"])\n"), "{}", text);
        assert!(
            text.contains("P[\"prototype\"][\"____getters\"][\"value\"] = function(self)\n    return self[\"v\"]\nend\n"),
            "{}",
            text
        );
        assert!(text.contains("P[\"____getters\"][\"count\"] = function(self)\n"), "{}", text);
        for feature in [LuaLibFeature::Index, LuaLibFeature::NewIndex, LuaLibFeature::ClassIndex] {
            assert!(lowered.features.contains(feature), "{:?}", lowered.features);
        }
    }

    #[test]
    fn test_methods_statics_and_to_string() {
        let source = "class S {\n    static n = 2;\n    static make() { return 1; }\n    toString() { return \"s\"; }\n}";
        let text = lower(source).text();
        assert!(text.contains("S[\"prototype\"][\"__tostring\"] = function(self)\n    return \"s\"\nend\n"), "{}", text);
        assert!(text.contains("S[\"make\"] = function(self)\n    return 1\nend\n"), "{}", text);
        assert!(text.contains("S[\"n\"] = 2\n"), "{}", text);
    }

    #[test]
    fn test_super_method_call() {
        let source = "class B { greet() { return 1; } }\nclass C extends B { greet() { return super.greet(); } }";
        let text = lower(source).text();
        assert!(text.contains("return B[\"prototype\"][\"greet\"](self)\n"), "{}", text);
    }

    #[test]
    fn test_class_expression_is_wrapped() {
        let text = lower("const C = class {\n    x = 1;\n};").text();
        assert!(text.contains("(function()\n"), "{}", text);
        assert!(text.contains("local ____ = {}\n"), "{}", text);
        assert!(text.contains("____[\"name\"] = \"____\"\n"), "{}", text);
        assert!(text.contains("return ____\nend)()\n"), "{}", text);
    }

    #[test]
    fn test_extension_classes_patch_existing_tables() {
        let text = lower("declare class Foo {}\n/** @extension */\nclass FooExt extends Foo {\n    bar() { return 1; }\n}").text();
        assert!(text.contains("Foo[\"bar\"] = function(self)\n    return 1\nend\n"), "{}", text);
        assert!(!text.contains("[\"new\"]"), "{}", text);

        let text = lower("declare class Bar {}\n/** @metaExtension */\nclass BarMeta extends Bar {\n    baz() {}\n}").text();
        assert!(text.contains("local __meta__Bar = debug[\"getregistry\"]()[\"Bar\"]\n"), "{}", text);
        assert!(text.contains("__meta__Bar[\"baz\"] = function(self)\nend\n"), "{}", text);
    }

    #[test]
    fn test_decorators() {
        let text = lower("declare function dec(this: any, c: any): any;\n@dec\nclass D {}").text();
        assert!(text.contains("D = __TS__Decorate({dec}, D)\n"), "{}", text);
        let error = lower_error("declare function dec(this: void, c: any): any;\n@dec\nclass D {}");
        assert_eq!(error.kind, CompileErrorKind::InvalidDecoratorContext);
    }

    #[test]
    fn test_class_validation_errors() {
        let cases = [
            ("class N { static new() { return 1; } }", CompileErrorKind::ForbiddenStaticClassPropertyName("new".to_string())),
            ("/**\n * @extension\n * @metaExtension\n */\nclass E {}", CompileErrorKind::InvalidExtensionMetaExtension),
            ("/** @metaExtension */\nclass M {}", CompileErrorKind::MissingMetaExtension),
            ("/** @luaTable */\ndeclare class T {}\nclass U extends T {}", CompileErrorKind::InvalidExtendsLuaTable),
            ("/** @luaTable */\nclass T {}", CompileErrorKind::ForbiddenLuaTableNonDeclaration),
            ("declare class F {}\n/** @extension */\nclass X extends F {}\nclass Y extends X {}", CompileErrorKind::InvalidExtendsExtension),
            ("declare class F {}\n/** @extension */\nexport class X extends F {}", CompileErrorKind::InvalidExportsExtension),
        ];
        for (source, kind) in cases {
            assert_eq!(lower_error(source).kind, kind, "{}", source);
        }
    }

    #[test]
    fn test_super_outside_derived_class() {
        let error = lower_error("class A { m() { return super.toString(); } }");
        assert_eq!(error.kind, CompileErrorKind::UnknownSuperType);
    }
}
