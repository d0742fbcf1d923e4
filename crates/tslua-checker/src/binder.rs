//! Name binding.
//!
//! One walk over the module declares every symbol, resolves every
//! identifier to the symbol it names and records the facts that type
//! queries need later: where each function-like node lives and which
//! calling convention it was declared with, where contextual types come
//! from, and which class each `this` refers to.
//!
//! Each block is handled in two passes so that later declarations are
//! visible to earlier code (functions, classes and `let` in the same block,
//! `var` anywhere in the function).

use std::collections::{HashMap, HashSet};

use swc_common::comments::SingleThreadedComments;
use swc_common::{BytePos, Span, Spanned};
use swc_ecma_ast::*;
use tslua_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use tslua_parser::SpanMapper;
use tslua_types::{ContextType, DirectiveKind, Directives, SymbolRef};

use crate::builtins;
use crate::jsdoc::{self, DirectiveIssue};
use crate::oracle::{CallSite, ClassInfo, DeclarationInfo, ExportScope, SymbolInfo, SymbolKind};

/// Lookup key for nodes that may share a start position with their
/// children.
pub(crate) type SpanKey = (BytePos, BytePos);

pub(crate) fn span_key(span: Span) -> SpanKey {
    (span.lo, span.hi)
}

/// Step from a destructured value to one of its bindings.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PatStep {
    Index(usize),
    /// `...rest` starting at this index.
    Rest(usize),
    Key(String),
    /// `...rest` of an object pattern.
    ObjectRest,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum VarInit<'a> {
    Expr(&'a Expr),
    /// Loop variable of `for (x of e)`.
    ForOf(&'a Expr),
    /// Loop variable of `for (x in e)`.
    ForIn,
    None,
}

#[derive(Debug, Clone)]
pub(crate) enum DeclSource<'a> {
    Variable {
        annotation: Option<&'a TsType>,
        init: VarInit<'a>,
        path: Vec<PatStep>,
        is_const: bool,
    },
    Parameter {
        annotation: Option<&'a TsType>,
        function: BytePos,
        index: usize,
        default: Option<&'a Expr>,
        path: Vec<PatStep>,
    },
    Function(&'a Function),
    Class(&'a Class),
    Interface(&'a TsInterfaceDecl),
    TypeAlias(&'a TsTypeAliasDecl),
    TypeParameter(&'a TsTypeParam),
    Enum(&'a TsEnumDecl),
    EnumMember {
        enumeration: SymbolRef,
        index: usize,
        member: &'a TsEnumMember,
    },
    Namespace,
    Import,
    /// `import x = A.B`
    ImportAlias(&'a TsEntityName),
    Builtin,
}

#[derive(Debug, Clone)]
pub(crate) struct SymbolData<'a> {
    pub info: SymbolInfo,
    pub sources: Vec<DeclSource<'a>>,
    /// Exported values of namespaces and members of enums.
    pub exports: HashMap<String, SymbolRef>,
    pub type_exports: HashMap<String, SymbolRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Declaration,
    Expression,
    Arrow,
    Method,
    ObjectMethod,
    Constructor,
    Getter,
    Setter,
}

#[derive(Debug, Clone)]
pub(crate) struct ParamRecord<'a> {
    pub name: String,
    pub annotation: Option<&'a TsType>,
    pub optional: bool,
    pub rest: bool,
    pub default: Option<&'a Expr>,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionRecord<'a> {
    pub kind: FunctionKind,
    pub params: Vec<ParamRecord<'a>>,
    pub return_annotation: Option<&'a TsType>,
    pub expression_body: Option<&'a Expr>,
    /// Calling convention of the declaration itself.
    pub context: ContextType,
    pub explicit_this: bool,
    pub directives: Directives,
    pub symbol: Option<SymbolRef>,
    pub class: Option<SymbolRef>,
    /// Where to look up the contextual type of a function expression.
    pub context_key: Option<SpanKey>,
    pub has_body: bool,
}

/// Calling convention and directives of a signature written in a type.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeSite {
    pub context: ContextType,
    pub directives: Directives,
    pub declared_in_type: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThisBinding {
    Instance(SymbolRef),
    Static(SymbolRef),
}

/// Origin of the type an expression is expected to have.
#[derive(Debug, Clone)]
pub(crate) enum ContextSource<'a> {
    Annotation(&'a TsType),
    Argument { site: CallSite<'a>, index: usize },
    Return { function: BytePos },
    Symbol(SymbolRef),
    Member(&'a MemberExpr),
    Property { object: SpanKey, name: String },
    Element { array: SpanKey, index: usize },
}

#[derive(Debug, Clone)]
pub(crate) struct ClassData<'a> {
    pub class: &'a Class,
    pub no_self: bool,
    /// Class named in `extends`, when it is a plain identifier.
    pub extends: Option<SymbolRef>,
    pub info: ClassInfo,
}

#[derive(Debug, Default)]
pub(crate) struct Bindings<'a> {
    pub symbols: Vec<SymbolData<'a>>,
    pub value_refs: HashMap<BytePos, SymbolRef>,
    pub type_refs: HashMap<BytePos, SymbolRef>,
    pub this_bindings: HashMap<BytePos, ThisBinding>,
    pub functions: HashMap<BytePos, FunctionRecord<'a>>,
    pub contexts: HashMap<SpanKey, ContextSource<'a>>,
    pub classes: HashMap<SymbolRef, ClassData<'a>>,
    pub class_symbols: HashMap<BytePos, SymbolRef>,
    pub type_sites: HashMap<BytePos, TypeSite>,
    pub file_directives: Directives,
    pub module_directives: HashMap<String, Directives>,
    pub is_module: bool,
    pub value_reads: HashMap<SymbolRef, usize>,
    pub diagnostics: Diagnostics,
}

impl<'a> Bindings<'a> {
    pub fn data(&self, symbol: SymbolRef) -> &SymbolData<'a> {
        &self.symbols[symbol.0 as usize]
    }
}

#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, SymbolRef>,
    types: HashMap<String, SymbolRef>,
    /// Namespace whose body this scope is; its exports from other
    /// declarations are visible too.
    namespace: Option<SymbolRef>,
}

/// Enclosing class or interface of a member signature.
#[derive(Debug, Clone, Copy)]
struct MemberOwner {
    no_self: bool,
}

pub(crate) struct Binder<'a> {
    comments: &'a SingleThreadedComments,
    mapper: SpanMapper,
    out: Bindings<'a>,
    scopes: Vec<Scope>,
    /// `@noSelf` of each enclosing namespace.
    namespace_no_self: Vec<bool>,
    owners: Vec<MemberOwner>,
    this_stack: Vec<Option<ThisBinding>>,
    functions: Vec<BytePos>,
    ambient_depth: usize,
    /// Function expression initializing a class property.
    property_initializer: Option<BytePos>,
    /// Directives of a variable statement, applied to the function
    /// expression that initializes it.
    initializer_directives: Option<(BytePos, Directives)>,
    seen_comments: HashSet<BytePos>,
}

fn is_module_file(module: &Module) -> bool {
    module.body.iter().any(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(_)) => false,
        ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(import)) => import.is_export,
        ModuleItem::ModuleDecl(_) => true,
        ModuleItem::Stmt(_) => false,
    })
}

fn kind_rank(kind: SymbolKind) -> u8 {
    match kind {
        SymbolKind::Class => 5,
        SymbolKind::Enum => 4,
        SymbolKind::Function => 3,
        SymbolKind::Namespace => 2,
        SymbolKind::Interface => 1,
        _ => 0,
    }
}

fn mergeable(existing: SymbolKind, new: SymbolKind) -> bool {
    use SymbolKind as K;
    match (existing, new) {
        (K::Variable, K::Variable) | (K::Function, K::Function) | (K::Interface, K::Interface) | (K::Enum, K::Enum) => true,
        (K::Namespace, K::Class | K::Function | K::Enum | K::Namespace | K::Interface) => true,
        (K::Class | K::Function | K::Enum | K::Interface, K::Namespace) => true,
        (K::Class, K::Interface) | (K::Interface, K::Class) => true,
        _ => false,
    }
}

fn is_this_param(pat: &Pat) -> bool {
    matches!(pat, Pat::Ident(ident) if &*ident.id.sym == "this")
}

fn void_annotation(annotation: Option<&TsTypeAnn>) -> bool {
    matches!(
        annotation.map(|ann| &*ann.type_ann),
        Some(TsType::TsKeywordType(TsKeywordType {
            kind: TsKeywordTypeKind::TsVoidKeyword,
            ..
        }))
    )
}

/// Context declared by an explicit `this` parameter.
fn explicit_this_context(first: Option<&Pat>) -> Option<ContextType> {
    match first {
        Some(Pat::Ident(ident)) if &*ident.id.sym == "this" => Some(if void_annotation(ident.type_ann.as_deref()) {
            ContextType::Void
        } else {
            ContextType::NonVoid
        }),
        _ => None,
    }
}

fn explicit_this_in_type(params: &[TsFnParam]) -> Option<ContextType> {
    match params.first() {
        Some(TsFnParam::Ident(ident)) if &*ident.id.sym == "this" => {
            Some(if void_annotation(ident.type_ann.as_deref()) {
                ContextType::Void
            } else {
                ContextType::NonVoid
            })
        }
        _ => None,
    }
}

pub(crate) fn prop_name_text(name: &PropName) -> Option<String> {
    match name {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => Some(s.value.as_str().unwrap_or("").to_string()),
        PropName::Num(n) => Some(n.value.to_string()),
        PropName::Computed(_) | PropName::BigInt(_) => None,
    }
}

pub(crate) fn key_expr_text(key: &Expr) -> Option<String> {
    match key {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Lit(Lit::Str(s)) => Some(s.value.as_str().unwrap_or("").to_string()),
        Expr::Lit(Lit::Num(n)) => Some(n.value.to_string()),
        _ => None,
    }
}

impl<'a> Binder<'a> {
    pub fn new(comments: &'a SingleThreadedComments, mapper: SpanMapper) -> Self {
        Binder {
            comments,
            mapper,
            out: Bindings::default(),
            scopes: Vec::new(),
            namespace_no_self: Vec::new(),
            owners: Vec::new(),
            this_stack: Vec::new(),
            functions: Vec::new(),
            ambient_depth: 0,
            property_initializer: None,
            initializer_directives: None,
            seen_comments: HashSet::new(),
        }
    }

    pub fn bind(mut self, module: &'a Module) -> Bindings<'a> {
        self.out.is_module = is_module_file(module);
        if let Some(first) = module.body.first() {
            self.out.file_directives = self.directives_at(first.span().lo);
        }
        log::debug!(
            "binding {} statements (module: {})",
            module.body.len(),
            self.out.is_module
        );

        self.scopes.push(Scope::default());
        for name in builtins::GLOBAL_VALUES {
            let symbol = self.new_symbol(name, SymbolKind::Builtin, None, DeclSource::Builtin, Directives::new());
            self.current_scope().values.insert(name.to_string(), symbol);
        }

        self.scopes.push(Scope::default());
        self.this_stack.push(None);
        self.prescan_module_vars(&module.body);
        for item in &module.body {
            self.declare_module_item(item);
        }
        for item in &module.body {
            self.bind_module_item(item);
        }
        self.this_stack.pop();
        self.scopes.pop();
        self.scopes.pop();

        self.finish_classes();
        self.out
    }

    // ----- comments -----

    fn directives_at(&mut self, pos: BytePos) -> Directives {
        let (directives, issues) = jsdoc::leading_directives(self.comments, pos);
        for (issue, span) in issues {
            if !self.seen_comments.insert(span.lo) {
                continue;
            }
            let diagnostic = match issue {
                DirectiveIssue::Deprecated(text) => {
                    log::warn!("deprecated directive syntax '{}'", text);
                    Diagnostic::warning(
                        DiagnosticCode::DeprecatedDirectiveSyntax,
                        format!(
                            "[Deprecated] Decorators with ! are being deprecated, use @{} instead",
                            &text[1..]
                        ),
                    )
                }
                DirectiveIssue::Unknown(text) => {
                    log::warn!("unknown directive '{}'", text);
                    Diagnostic::warning(
                        DiagnosticCode::UnknownDirective,
                        format!("Encountered unknown decorator {}.", text),
                    )
                }
            };
            self.out
                .diagnostics
                .push(diagnostic.with_span(self.mapper.span(span)).build());
        }
        directives
    }

    // ----- symbols -----

    fn current_scope(&mut self) -> &mut Scope {
        match self.scopes.last_mut() {
            Some(scope) => scope,
            None => panic!("binder scope stack is empty"),
        }
    }

    fn new_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        declaration: Option<DeclarationInfo>,
        source: DeclSource<'a>,
        directives: Directives,
    ) -> SymbolRef {
        let symbol = SymbolRef(self.out.symbols.len() as u32);
        self.out.symbols.push(SymbolData {
            info: SymbolInfo {
                name: name.to_string(),
                kind,
                declarations: declaration.into_iter().collect(),
                export_scope: None,
                exported_by_specifier: false,
                directives,
                module_specifier: None,
                const_enum: false,
            },
            sources: vec![source],
            exports: HashMap::new(),
            type_exports: HashMap::new(),
        });
        symbol
    }

    fn declaration(&self, node: Span, kind: SymbolKind, exported: bool, declare: bool) -> DeclarationInfo {
        let ambient = declare || self.ambient_depth > 0;
        // members of ambient namespaces are exported implicitly
        let in_namespace = self.scopes.last().map_or(false, |scope| scope.namespace.is_some());
        DeclarationInfo {
            pos: self.mapper.offset(node.lo),
            kind,
            exported: exported || (ambient && in_namespace && kind != SymbolKind::Parameter),
            ambient,
            block_scoped: false,
            overload: false,
        }
    }

    /// Declares `name` in the current scope, merging with a compatible
    /// earlier declaration.
    fn declare(
        &mut self,
        name: &str,
        declaration: DeclarationInfo,
        source: DeclSource<'a>,
        directives: Directives,
        ident: Option<BytePos>,
    ) -> SymbolRef {
        let kind = declaration.kind;
        let exported = declaration.exported;
        let existing = {
            let scope = self.current_scope();
            scope.values.get(name).or_else(|| scope.types.get(name)).copied()
        };
        let symbol = match existing {
            Some(existing) if mergeable(self.out.data(existing).info.kind, kind) => {
                let data = &mut self.out.symbols[existing.0 as usize];
                data.info.declarations.push(declaration);
                data.info.directives.merge(&directives);
                data.sources.push(source);
                if kind_rank(kind) > kind_rank(data.info.kind) {
                    data.info.kind = kind;
                }
                existing
            }
            _ => self.new_symbol(name, kind, Some(declaration), source, directives),
        };

        let scope = self.current_scope();
        if kind.is_value() {
            scope.values.insert(name.to_string(), symbol);
        }
        if kind.is_type() {
            scope.types.insert(name.to_string(), symbol);
        }

        if exported {
            let namespace = self.current_scope().namespace;
            let export_scope = match namespace {
                Some(namespace) => {
                    let data = &mut self.out.symbols[namespace.0 as usize];
                    if kind.is_value() {
                        data.exports.insert(name.to_string(), symbol);
                    }
                    if kind.is_type() {
                        data.type_exports.insert(name.to_string(), symbol);
                    }
                    Some(ExportScope::Namespace(namespace))
                }
                None if self.out.is_module => Some(ExportScope::File),
                None => None,
            };
            if export_scope.is_some() {
                self.out.symbols[symbol.0 as usize].info.export_scope = export_scope;
            }
        }

        if let Some(pos) = ident {
            if kind.is_value() {
                self.out.value_refs.insert(pos, symbol);
            } else {
                self.out.type_refs.insert(pos, symbol);
            }
        }
        symbol
    }

    fn resolve_value(&self, name: &str) -> Option<SymbolRef> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.values.get(name) {
                return Some(*symbol);
            }
            if let Some(namespace) = scope.namespace {
                if let Some(symbol) = self.out.data(namespace).exports.get(name) {
                    return Some(*symbol);
                }
            }
        }
        None
    }

    fn resolve_type(&self, name: &str) -> Option<SymbolRef> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.types.get(name) {
                return Some(*symbol);
            }
            if let Some(namespace) = scope.namespace {
                if let Some(symbol) = self.out.data(namespace).type_exports.get(name) {
                    return Some(*symbol);
                }
            }
        }
        None
    }

    fn reference(&mut self, ident: &Ident) {
        if let Some(symbol) = self.resolve_value(&ident.sym) {
            self.out.value_refs.insert(ident.span.lo, symbol);
            *self.out.value_reads.entry(symbol).or_insert(0) += 1;
        }
    }

    fn reference_entity(&mut self, name: &TsEntityName, as_type: bool) {
        match name {
            TsEntityName::Ident(ident) => {
                let symbol = if as_type {
                    self.resolve_type(&ident.sym).or_else(|| self.resolve_value(&ident.sym))
                } else {
                    self.resolve_value(&ident.sym)
                };
                if let Some(symbol) = symbol {
                    if as_type {
                        self.out.type_refs.insert(ident.span.lo, symbol);
                    } else {
                        self.out.value_refs.insert(ident.span.lo, symbol);
                    }
                }
            }
            TsEntityName::TsQualifiedName(qualified) => self.reference_entity(&qualified.left, false),
        }
    }

    fn set_context(&mut self, expr: &'a Expr, source: ContextSource<'a>) {
        match expr {
            Expr::Paren(paren) => self.set_context(&paren.expr, source.clone()),
            Expr::Cond(cond) => {
                self.set_context(&cond.cons, source.clone());
                self.set_context(&cond.alt, source.clone());
            }
            _ => {}
        }
        self.out.contexts.insert(span_key(expr.span()), source);
    }

    fn no_self_scope(&self) -> bool {
        self.namespace_no_self.iter().any(|no_self| *no_self)
            || self.out.file_directives.has(DirectiveKind::NoSelfInFile)
    }

    fn namespace_context(&self) -> ContextType {
        if self.no_self_scope() {
            ContextType::Void
        } else {
            ContextType::NonVoid
        }
    }

    fn member_context(&self) -> ContextType {
        match self.owners.last() {
            Some(owner) if owner.no_self => ContextType::Void,
            _ => ContextType::NonVoid,
        }
    }

    // ----- declaration pass -----

    fn prescan_module_vars(&mut self, items: &'a [ModuleItem]) {
        for item in items {
            match item {
                ModuleItem::Stmt(stmt) => self.prescan_vars(stmt),
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    if let Decl::Var(var) = &export.decl {
                        if var.kind == VarDeclKind::Var {
                            let directives = self.directives_at(export.span.lo);
                            self.declare_var(var, true, directives, |init| init);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Declares the `var` bindings of a function body, which are visible in
    /// the whole function.
    fn prescan_vars(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Decl(Decl::Var(var)) if var.kind == VarDeclKind::Var => {
                let directives = self.directives_at(var.span.lo);
                self.declare_var(var, false, directives, |init| init);
            }
            Stmt::Block(block) => block.stmts.iter().for_each(|s| self.prescan_vars(s)),
            Stmt::If(if_stmt) => {
                self.prescan_vars(&if_stmt.cons);
                if let Some(alt) = &if_stmt.alt {
                    self.prescan_vars(alt);
                }
            }
            Stmt::While(s) => self.prescan_vars(&s.body),
            Stmt::DoWhile(s) => self.prescan_vars(&s.body),
            Stmt::Labeled(s) => self.prescan_vars(&s.body),
            Stmt::For(s) => {
                if let Some(VarDeclOrExpr::VarDecl(var)) = &s.init {
                    if var.kind == VarDeclKind::Var {
                        self.declare_var(var, false, Directives::new(), |init| init);
                    }
                }
                self.prescan_vars(&s.body);
            }
            Stmt::ForIn(s) => {
                if let ForHead::VarDecl(var) = &s.left {
                    if var.kind == VarDeclKind::Var {
                        self.declare_var(var, false, Directives::new(), |_| VarInit::ForIn);
                    }
                }
                self.prescan_vars(&s.body);
            }
            Stmt::ForOf(s) => {
                if let ForHead::VarDecl(var) = &s.left {
                    if var.kind == VarDeclKind::Var {
                        let right = &*s.right;
                        self.declare_var(var, false, Directives::new(), |_| VarInit::ForOf(right));
                    }
                }
                self.prescan_vars(&s.body);
            }
            Stmt::Switch(s) => {
                for case in &s.cases {
                    case.cons.iter().for_each(|c| self.prescan_vars(c));
                }
            }
            Stmt::Try(s) => {
                s.block.stmts.iter().for_each(|c| self.prescan_vars(c));
                if let Some(handler) = &s.handler {
                    handler.body.stmts.iter().for_each(|c| self.prescan_vars(c));
                }
                if let Some(finalizer) = &s.finalizer {
                    finalizer.stmts.iter().for_each(|c| self.prescan_vars(c));
                }
            }
            _ => {}
        }
    }

    fn declare_var(
        &mut self,
        var: &'a VarDecl,
        exported: bool,
        directives: Directives,
        init: impl Fn(VarInit<'a>) -> VarInit<'a>,
    ) {
        let block_scoped = var.kind != VarDeclKind::Var;
        let is_const = var.kind == VarDeclKind::Const;
        for declarator in &var.decls {
            let mut declaration = self.declaration(declarator.span, SymbolKind::Variable, exported, var.declare);
            declaration.block_scoped = block_scoped;
            let initializer = init(match &declarator.init {
                Some(expr) => VarInit::Expr(expr),
                None => VarInit::None,
            });
            self.declare_pattern(&declarator.name, Vec::new(), &mut |path, annotation| {
                (
                    declaration.clone(),
                    DeclSource::Variable {
                        annotation,
                        init: initializer,
                        path,
                        is_const,
                    },
                    directives.clone(),
                )
            });
        }
    }

    /// Declares every binding of a pattern; `make` builds the declaration
    /// for each binding from its path and annotation.
    fn declare_pattern(
        &mut self,
        pat: &'a Pat,
        path: Vec<PatStep>,
        make: &mut dyn FnMut(Vec<PatStep>, Option<&'a TsType>) -> (DeclarationInfo, DeclSource<'a>, Directives),
    ) {
        match pat {
            Pat::Ident(binding) => {
                let annotation = binding.type_ann.as_deref().map(|ann| &*ann.type_ann);
                let (declaration, source, directives) = make(path, annotation);
                self.declare(&binding.id.sym, declaration, source, directives, Some(binding.id.span.lo));
            }
            Pat::Array(array) => {
                for (index, element) in array.elems.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let mut next = path.clone();
                    match element {
                        Pat::Rest(rest) => {
                            next.push(PatStep::Rest(index));
                            self.declare_pattern(&rest.arg, next, make);
                        }
                        _ => {
                            next.push(PatStep::Index(index));
                            self.declare_pattern(element, next, make);
                        }
                    }
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    let mut next = path.clone();
                    match prop {
                        ObjectPatProp::KeyValue(kv) => {
                            if let Some(name) = prop_name_text(&kv.key) {
                                next.push(PatStep::Key(name));
                            }
                            self.declare_pattern(&kv.value, next, make);
                        }
                        ObjectPatProp::Assign(assign) => {
                            next.push(PatStep::Key(assign.key.id.sym.to_string()));
                            let annotation = assign.key.type_ann.as_deref().map(|ann| &*ann.type_ann);
                            let (declaration, source, directives) = make(next, annotation);
                            self.declare(
                                &assign.key.id.sym,
                                declaration,
                                source,
                                directives,
                                Some(assign.key.id.span.lo),
                            );
                        }
                        ObjectPatProp::Rest(rest) => {
                            next.push(PatStep::ObjectRest);
                            self.declare_pattern(&rest.arg, next, make);
                        }
                    }
                }
            }
            Pat::Rest(rest) => self.declare_pattern(&rest.arg, path, make),
            Pat::Assign(assign) => self.declare_pattern(&assign.left, path, make),
            Pat::Expr(_) | Pat::Invalid(_) => {}
        }
    }

    fn declare_module_item(&mut self, item: &'a ModuleItem) {
        match item {
            ModuleItem::Stmt(stmt) => self.declare_stmt(stmt),
            ModuleItem::ModuleDecl(decl) => match decl {
                ModuleDecl::Import(import) => self.declare_import(import),
                ModuleDecl::ExportDecl(export) => {
                    let directives = self.directives_at(export.span.lo);
                    self.declare_decl(&export.decl, export.span, true, directives);
                }
                ModuleDecl::ExportDefaultDecl(export) => {
                    let directives = self.directives_at(export.span.lo);
                    match &export.decl {
                        DefaultDecl::Class(class) => {
                            if let Some(ident) = &class.ident {
                                let declaration = self.declaration(export.span, SymbolKind::Class, false, false);
                                let symbol = self.declare(
                                    &ident.sym,
                                    declaration,
                                    DeclSource::Class(&class.class),
                                    directives,
                                    Some(ident.span.lo),
                                );
                                self.out.class_symbols.insert(class.class.span.lo, symbol);
                            }
                        }
                        DefaultDecl::Fn(function) => {
                            if let Some(ident) = &function.ident {
                                let declaration = self.declaration(export.span, SymbolKind::Function, false, false);
                                self.declare(
                                    &ident.sym,
                                    declaration,
                                    DeclSource::Function(&function.function),
                                    directives,
                                    Some(ident.span.lo),
                                );
                            }
                        }
                        DefaultDecl::TsInterfaceDecl(interface) => {
                            let declaration = self.declaration(export.span, SymbolKind::Interface, false, false);
                            self.declare(
                                &interface.id.sym,
                                declaration,
                                DeclSource::Interface(interface),
                                directives,
                                Some(interface.id.span.lo),
                            );
                        }
                    }
                }
                ModuleDecl::TsImportEquals(import) => {
                    let declaration = self.declaration(import.span, SymbolKind::Import, import.is_export, false);
                    let source = match &import.module_ref {
                        TsModuleRef::TsEntityName(entity) => DeclSource::ImportAlias(entity),
                        TsModuleRef::TsExternalModuleRef(_) => DeclSource::Import,
                    };
                    let symbol = self.declare(&import.id.sym, declaration, source, Directives::new(), Some(import.id.span.lo));
                    if let TsModuleRef::TsExternalModuleRef(external) = &import.module_ref {
                        self.out.symbols[symbol.0 as usize].info.module_specifier =
                            Some(external.expr.value.as_str().unwrap_or("").to_string());
                    }
                }
                _ => {}
            },
        }
    }

    fn declare_import(&mut self, import: &'a ImportDecl) {
        let specifier = import.src.value.as_str().unwrap_or("").to_string();
        for spec in &import.specifiers {
            let local = match spec {
                ImportSpecifier::Named(named) => &named.local,
                ImportSpecifier::Default(default) => &default.local,
                ImportSpecifier::Namespace(namespace) => &namespace.local,
            };
            let declaration = self.declaration(import.span, SymbolKind::Import, false, false);
            let symbol = self.declare(&local.sym, declaration, DeclSource::Import, Directives::new(), Some(local.span.lo));
            self.out.symbols[symbol.0 as usize].info.module_specifier = Some(specifier.clone());
        }
    }

    fn declare_stmts(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            self.declare_stmt(stmt);
        }
    }

    fn declare_stmt(&mut self, stmt: &'a Stmt) {
        if let Stmt::Decl(decl) = stmt {
            let directives = self.directives_at(decl.span().lo);
            self.declare_decl(decl, decl.span(), false, directives);
        }
    }

    fn declare_decl(&mut self, decl: &'a Decl, node: Span, exported: bool, directives: Directives) {
        match decl {
            Decl::Fn(function) => {
                let mut declaration = self.declaration(node, SymbolKind::Function, exported, function.declare);
                declaration.overload = function.function.body.is_none();
                self.declare(
                    &function.ident.sym,
                    declaration,
                    DeclSource::Function(&function.function),
                    directives,
                    Some(function.ident.span.lo),
                );
            }
            Decl::Class(class) => {
                let declaration = self.declaration(node, SymbolKind::Class, exported, class.declare);
                let symbol = self.declare(
                    &class.ident.sym,
                    declaration,
                    DeclSource::Class(&class.class),
                    directives,
                    Some(class.ident.span.lo),
                );
                self.out.class_symbols.insert(class.class.span.lo, symbol);
            }
            Decl::Var(var) => {
                if var.kind != VarDeclKind::Var {
                    self.declare_var(var, exported, directives, |init| init);
                }
            }
            Decl::TsEnum(enumeration) => {
                let declaration = self.declaration(node, SymbolKind::Enum, exported, enumeration.declare);
                let symbol = self.declare(
                    &enumeration.id.sym,
                    declaration,
                    DeclSource::Enum(enumeration),
                    directives,
                    Some(enumeration.id.span.lo),
                );
                self.out.symbols[symbol.0 as usize].info.const_enum |= enumeration.is_const;
                for (index, member) in enumeration.members.iter().enumerate() {
                    let name = match &member.id {
                        TsEnumMemberId::Ident(ident) => ident.sym.to_string(),
                        TsEnumMemberId::Str(s) => s.value.as_str().unwrap_or("").to_string(),
                    };
                    let member_declaration =
                        self.declaration(member.span, SymbolKind::EnumMember, false, enumeration.declare);
                    let member_symbol = self.new_symbol(
                        &name,
                        SymbolKind::EnumMember,
                        Some(member_declaration),
                        DeclSource::EnumMember {
                            enumeration: symbol,
                            index,
                            member,
                        },
                        Directives::new(),
                    );
                    self.out.symbols[symbol.0 as usize]
                        .exports
                        .entry(name)
                        .or_insert(member_symbol);
                }
            }
            Decl::TsModule(module) => {
                if let TsModuleName::Str(name) = &module.id {
                    self.out
                        .module_directives
                        .entry(name.value.as_str().unwrap_or("").to_string())
                        .or_default()
                        .merge(&directives);
                    return;
                }
                if module.global {
                    return;
                }
                if let TsModuleName::Ident(ident) = &module.id {
                    let declaration = self.declaration(node, SymbolKind::Namespace, exported, module.declare);
                    self.declare(&ident.sym, declaration, DeclSource::Namespace, directives, Some(ident.span.lo));
                }
            }
            Decl::TsInterface(interface) => {
                let declaration = self.declaration(node, SymbolKind::Interface, exported, interface.declare);
                self.declare(
                    &interface.id.sym,
                    declaration,
                    DeclSource::Interface(interface),
                    directives,
                    Some(interface.id.span.lo),
                );
            }
            Decl::TsTypeAlias(alias) => {
                let declaration = self.declaration(node, SymbolKind::TypeAlias, exported, alias.declare);
                self.declare(
                    &alias.id.sym,
                    declaration,
                    DeclSource::TypeAlias(alias),
                    directives,
                    Some(alias.id.span.lo),
                );
            }
            Decl::Using(_) => {}
        }
    }

    fn declare_type_params(&mut self, params: Option<&'a TsTypeParamDecl>) {
        let Some(params) = params else { return };
        for param in &params.params {
            let declaration = self.declaration(param.span, SymbolKind::TypeParameter, false, false);
            self.declare(
                &param.name.sym,
                declaration,
                DeclSource::TypeParameter(param),
                Directives::new(),
                Some(param.name.span.lo),
            );
        }
        for param in &params.params {
            if let Some(constraint) = &param.constraint {
                self.bind_type(constraint, None);
            }
            if let Some(default) = &param.default {
                self.bind_type(default, None);
            }
        }
    }

    // ----- resolution pass -----

    fn bind_module_item(&mut self, item: &'a ModuleItem) {
        match item {
            ModuleItem::Stmt(stmt) => self.bind_stmt(stmt),
            ModuleItem::ModuleDecl(decl) => match decl {
                ModuleDecl::Import(_) => {}
                ModuleDecl::ExportDecl(export) => {
                    let directives = self.directives_at(export.span.lo);
                    self.bind_decl(&export.decl, directives);
                }
                ModuleDecl::ExportDefaultDecl(export) => {
                    let directives = self.directives_at(export.span.lo);
                    match &export.decl {
                        DefaultDecl::Class(class) => {
                            let symbol = self.class_symbol(&class.class, class.ident.as_ref(), directives);
                            self.bind_class(&class.class, symbol);
                        }
                        DefaultDecl::Fn(function) => {
                            let symbol = function.ident.as_ref().and_then(|i| self.out.value_refs.get(&i.span.lo).copied());
                            self.bind_function(&function.function, FunctionKind::Declaration, symbol, directives, None);
                        }
                        DefaultDecl::TsInterfaceDecl(interface) => self.bind_interface(interface),
                    }
                }
                ModuleDecl::ExportDefaultExpr(export) => self.bind_expr(&export.expr),
                ModuleDecl::ExportNamed(named) => {
                    if named.src.is_some() {
                        return;
                    }
                    for spec in &named.specifiers {
                        if let ExportSpecifier::Named(named) = spec {
                            if let ModuleExportName::Ident(orig) = &named.orig {
                                self.reference(orig);
                                if let Some(symbol) = self.out.value_refs.get(&orig.span.lo).copied() {
                                    self.out.symbols[symbol.0 as usize].info.exported_by_specifier = true;
                                } else if let Some(symbol) = self.resolve_type(&orig.sym) {
                                    // a type-only name: resolved so lowering can see it has no value
                                    self.out.value_refs.insert(orig.span.lo, symbol);
                                }
                            }
                        }
                    }
                }
                ModuleDecl::TsImportEquals(import) => {
                    if let TsModuleRef::TsEntityName(entity) = &import.module_ref {
                        self.reference_entity(entity, false);
                    }
                }
                ModuleDecl::TsExportAssignment(export) => self.bind_expr(&export.expr),
                ModuleDecl::ExportAll(_) | ModuleDecl::TsNamespaceExport(_) => {}
            },
        }
    }

    fn bind_block(&mut self, stmts: &'a [Stmt]) {
        self.scopes.push(Scope::default());
        self.declare_stmts(stmts);
        for stmt in stmts {
            self.bind_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn bind_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Block(block) => self.bind_block(&block.stmts),
            Stmt::Expr(expr) => self.bind_expr(&expr.expr),
            Stmt::Return(ret) => {
                if let Some(arg) = &ret.arg {
                    if let Some(function) = self.functions.last().copied() {
                        self.set_context(arg, ContextSource::Return { function });
                    }
                    self.bind_expr(arg);
                }
            }
            Stmt::If(if_stmt) => {
                self.bind_expr(&if_stmt.test);
                self.bind_stmt(&if_stmt.cons);
                if let Some(alt) = &if_stmt.alt {
                    self.bind_stmt(alt);
                }
            }
            Stmt::While(s) => {
                self.bind_expr(&s.test);
                self.bind_stmt(&s.body);
            }
            Stmt::DoWhile(s) => {
                self.bind_stmt(&s.body);
                self.bind_expr(&s.test);
            }
            Stmt::Labeled(s) => self.bind_stmt(&s.body),
            Stmt::Throw(s) => self.bind_expr(&s.arg),
            Stmt::For(s) => {
                self.scopes.push(Scope::default());
                match &s.init {
                    Some(VarDeclOrExpr::VarDecl(var)) => {
                        if var.kind != VarDeclKind::Var {
                            self.declare_var(var, false, Directives::new(), |init| init);
                        }
                        self.bind_var(var, Directives::new());
                    }
                    Some(VarDeclOrExpr::Expr(expr)) => self.bind_expr(expr),
                    None => {}
                }
                if let Some(test) = &s.test {
                    self.bind_expr(test);
                }
                if let Some(update) = &s.update {
                    self.bind_expr(update);
                }
                self.bind_stmt(&s.body);
                self.scopes.pop();
            }
            Stmt::ForIn(s) => {
                self.bind_expr(&s.right);
                self.scopes.push(Scope::default());
                self.bind_for_head(&s.left, |_| VarInit::ForIn);
                self.bind_stmt(&s.body);
                self.scopes.pop();
            }
            Stmt::ForOf(s) => {
                self.bind_expr(&s.right);
                self.scopes.push(Scope::default());
                let right = &*s.right;
                self.bind_for_head(&s.left, move |_| VarInit::ForOf(right));
                self.bind_stmt(&s.body);
                self.scopes.pop();
            }
            Stmt::Switch(s) => {
                self.bind_expr(&s.discriminant);
                self.scopes.push(Scope::default());
                for case in &s.cases {
                    self.declare_stmts(&case.cons);
                }
                for case in &s.cases {
                    if let Some(test) = &case.test {
                        self.bind_expr(test);
                    }
                    for stmt in &case.cons {
                        self.bind_stmt(stmt);
                    }
                }
                self.scopes.pop();
            }
            Stmt::Try(s) => {
                self.bind_block(&s.block.stmts);
                if let Some(handler) = &s.handler {
                    self.scopes.push(Scope::default());
                    if let Some(param) = &handler.param {
                        let declaration = self.declaration(param.span(), SymbolKind::Variable, false, false);
                        self.declare_pattern(param, Vec::new(), &mut |path, annotation| {
                            (
                                declaration.clone(),
                                DeclSource::Variable {
                                    annotation,
                                    init: VarInit::None,
                                    path,
                                    is_const: false,
                                },
                                Directives::new(),
                            )
                        });
                        self.bind_binding_pattern(param);
                    }
                    self.bind_block(&handler.body.stmts);
                    self.scopes.pop();
                }
                if let Some(finalizer) = &s.finalizer {
                    self.bind_block(&finalizer.stmts);
                }
            }
            Stmt::Decl(decl) => {
                let directives = self.directives_at(decl.span().lo);
                self.bind_decl(decl, directives);
            }
            Stmt::With(s) => {
                self.bind_expr(&s.obj);
                self.bind_stmt(&s.body);
            }
            Stmt::Empty(_) | Stmt::Debugger(_) | Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn bind_for_head(&mut self, head: &'a ForHead, init: impl Fn(VarInit<'a>) -> VarInit<'a>) {
        match head {
            ForHead::VarDecl(var) => {
                if var.kind != VarDeclKind::Var {
                    self.declare_var(var, false, Directives::new(), init);
                }
                self.bind_var(var, Directives::new());
            }
            ForHead::Pat(pat) => self.bind_assign_pattern(pat),
            ForHead::UsingDecl(_) => {}
        }
    }

    fn bind_decl(&mut self, decl: &'a Decl, directives: Directives) {
        match decl {
            Decl::Fn(function) => {
                let symbol = self.out.value_refs.get(&function.ident.span.lo).copied();
                if function.declare {
                    self.ambient_depth += 1;
                }
                self.bind_function(&function.function, FunctionKind::Declaration, symbol, directives, None);
                if function.declare {
                    self.ambient_depth -= 1;
                }
            }
            Decl::Class(class) => {
                let symbol = self.class_symbol(&class.class, Some(&class.ident), directives);
                if class.declare {
                    self.ambient_depth += 1;
                }
                self.bind_class(&class.class, symbol);
                if class.declare {
                    self.ambient_depth -= 1;
                }
            }
            Decl::Var(var) => self.bind_var(var, directives),
            Decl::TsEnum(enumeration) => {
                let Some(symbol) = self.out.value_refs.get(&enumeration.id.span.lo).copied() else {
                    return;
                };
                self.scopes.push(Scope {
                    namespace: Some(symbol),
                    ..Scope::default()
                });
                for member in &enumeration.members {
                    if let Some(init) = &member.init {
                        self.bind_expr(init);
                    }
                }
                self.scopes.pop();
            }
            Decl::TsModule(module) => self.bind_namespace(module, directives),
            Decl::TsInterface(interface) => self.bind_interface(interface),
            Decl::TsTypeAlias(alias) => {
                self.scopes.push(Scope::default());
                self.declare_type_params(alias.type_params.as_deref());
                self.bind_alias_type(&alias.type_ann);
                self.scopes.pop();
            }
            Decl::Using(_) => {}
        }
    }

    fn bind_var(&mut self, var: &'a VarDecl, directives: Directives) {
        if var.declare {
            self.ambient_depth += 1;
        }
        for declarator in &var.decls {
            self.bind_binding_pattern(&declarator.name);
            let Some(init) = &declarator.init else { continue };
            if let Pat::Ident(binding) = &declarator.name {
                if let Some(annotation) = &binding.type_ann {
                    self.set_context(init, ContextSource::Annotation(&annotation.type_ann));
                }
            }
            if matches!(&**init, Expr::Fn(_) | Expr::Arrow(_)) && !directives.is_empty() {
                self.initializer_directives = Some((init.span().lo, directives.clone()));
            }
            self.bind_expr(init);
        }
        if var.declare {
            self.ambient_depth -= 1;
        }
    }

    fn bind_namespace(&mut self, module: &'a TsModuleDecl, directives: Directives) {
        let Some(body) = &module.body else { return };
        if module.declare {
            self.ambient_depth += 1;
        }
        match &module.id {
            TsModuleName::Ident(ident) => {
                let symbol = self.out.value_refs.get(&ident.span.lo).copied();
                self.bind_namespace_body(body, symbol, directives.has(DirectiveKind::NoSelf));
            }
            TsModuleName::Str(_) => {
                self.ambient_depth += 1;
                self.bind_namespace_body(body, None, directives.has(DirectiveKind::NoSelf));
                self.ambient_depth -= 1;
            }
        }
        if module.declare {
            self.ambient_depth -= 1;
        }
    }

    fn bind_namespace_body(&mut self, body: &'a TsNamespaceBody, symbol: Option<SymbolRef>, no_self: bool) {
        self.scopes.push(Scope {
            namespace: symbol,
            ..Scope::default()
        });
        self.namespace_no_self.push(no_self);

        match body {
            TsNamespaceBody::TsModuleBlock(block) => {
                self.prescan_module_vars(&block.body);
                for item in &block.body {
                    self.declare_module_item(item);
                }
                for item in &block.body {
                    self.bind_module_item(item);
                }
            }
            TsNamespaceBody::TsNamespaceDecl(nested) => {
                // `namespace A.B {}` exports B from A
                let declaration = self.declaration(nested.span, SymbolKind::Namespace, true, nested.declare);
                let inner = self.declare(
                    &nested.id.sym,
                    declaration,
                    DeclSource::Namespace,
                    Directives::new(),
                    Some(nested.id.span.lo),
                );
                self.bind_namespace_body(&nested.body, Some(inner), false);
            }
        }

        self.namespace_no_self.pop();
        self.scopes.pop();
    }

    fn bind_interface(&mut self, interface: &'a TsInterfaceDecl) {
        let directives = self
            .out
            .type_refs
            .get(&interface.id.span.lo)
            .map(|symbol| self.out.data(*symbol).info.directives.clone())
            .unwrap_or_default();
        self.scopes.push(Scope::default());
        self.declare_type_params(interface.type_params.as_deref());
        for heritage in &interface.extends {
            if let Expr::Ident(ident) = &*heritage.expr {
                if let Some(symbol) = self.resolve_type(&ident.sym) {
                    self.out.type_refs.insert(ident.span.lo, symbol);
                }
            }
            self.bind_type_args(heritage.type_args.as_deref());
        }
        self.owners.push(MemberOwner {
            no_self: directives.has(DirectiveKind::NoSelf),
        });
        for element in &interface.body.body {
            self.bind_type_element(element, true);
        }
        self.owners.pop();
        self.scopes.pop();
    }

    // ----- classes -----

    /// Symbol of a class declaration, or a fresh one for class expressions.
    fn class_symbol(&mut self, class: &'a Class, ident: Option<&'a Ident>, directives: Directives) -> SymbolRef {
        if let Some(symbol) = self.out.class_symbols.get(&class.span.lo) {
            return *symbol;
        }
        let name = ident.map_or_else(|| "____".to_string(), |ident| ident.sym.to_string());
        let declaration = self.declaration(class.span, SymbolKind::Class, false, false);
        let symbol = self.new_symbol(&name, SymbolKind::Class, Some(declaration), DeclSource::Class(class), directives);
        self.out.class_symbols.insert(class.span.lo, symbol);
        symbol
    }

    fn bind_class(&mut self, class: &'a Class, symbol: SymbolRef) {
        let directives = self.out.data(symbol).info.directives.clone();
        for decorator in &class.decorators {
            self.bind_expr(&decorator.expr);
        }
        let mut extends = None;
        if let Some(super_class) = &class.super_class {
            self.bind_expr(super_class);
            if let Expr::Ident(ident) = &**super_class {
                extends = self.out.value_refs.get(&ident.span.lo).copied();
            }
        }
        self.bind_type_args(class.super_type_params.as_deref());
        for implemented in &class.implements {
            if let Expr::Ident(ident) = &*implemented.expr {
                if let Some(target) = self.resolve_type(&ident.sym) {
                    self.out.type_refs.insert(ident.span.lo, target);
                }
            }
        }

        let no_self = directives.has(DirectiveKind::NoSelf);
        let name = self.out.data(symbol).info.name.clone();
        self.out.classes.insert(
            symbol,
            ClassData {
                class,
                no_self,
                extends,
                info: ClassInfo {
                    name: name.clone(),
                    ..ClassInfo::default()
                },
            },
        );

        self.scopes.push(Scope::default());
        if self.resolve_value(&name) != Some(symbol) && name != "____" {
            self.current_scope().values.insert(name, symbol);
        }
        self.declare_type_params(class.type_params.as_deref());
        self.owners.push(MemberOwner { no_self });

        for member in &class.body {
            self.bind_class_member(member, symbol);
        }

        self.owners.pop();
        self.scopes.pop();
    }

    fn bind_class_member(&mut self, member: &'a ClassMember, class: SymbolRef) {
        match member {
            ClassMember::Constructor(constructor) => {
                let directives = self.directives_at(constructor.span.lo);
                let mut params = Vec::new();
                self.scopes.push(Scope::default());
                self.functions.push(constructor.span.lo);
                self.this_stack.push(Some(ThisBinding::Instance(class)));
                for (index, param) in constructor.params.iter().enumerate() {
                    let record = match param {
                        ParamOrTsParamProp::Param(param) => {
                            for decorator in &param.decorators {
                                self.bind_expr(&decorator.expr);
                            }
                            self.declare_param(&param.pat, constructor.span.lo, index)
                        }
                        ParamOrTsParamProp::TsParamProp(prop) => {
                            for decorator in &prop.decorators {
                                self.bind_expr(&decorator.expr);
                            }
                            self.declare_param_prop(prop, constructor.span.lo, index)
                        }
                    };
                    params.push(record);
                }
                if let Some(body) = &constructor.body {
                    self.bind_function_body(&body.stmts);
                }
                self.this_stack.pop();
                self.functions.pop();
                self.scopes.pop();
                self.out.functions.insert(
                    constructor.span.lo,
                    FunctionRecord {
                        kind: FunctionKind::Constructor,
                        params,
                        return_annotation: None,
                        expression_body: None,
                        context: self.member_context(),
                        explicit_this: false,
                        directives,
                        symbol: None,
                        class: Some(class),
                        context_key: None,
                        has_body: constructor.body.is_some(),
                    },
                );
            }
            ClassMember::Method(method) => {
                let directives = self.directives_at(method.span.lo);
                if let PropName::Computed(computed) = &method.key {
                    self.bind_expr(&computed.expr);
                }
                let kind = match method.kind {
                    MethodKind::Method => FunctionKind::Method,
                    MethodKind::Getter => FunctionKind::Getter,
                    MethodKind::Setter => FunctionKind::Setter,
                };
                let this = if method.is_static {
                    ThisBinding::Static(class)
                } else {
                    ThisBinding::Instance(class)
                };
                self.bind_method(&method.function, kind, class, this, directives);
            }
            ClassMember::PrivateMethod(method) => {
                let directives = self.directives_at(method.span.lo);
                let this = if method.is_static {
                    ThisBinding::Static(class)
                } else {
                    ThisBinding::Instance(class)
                };
                self.bind_method(&method.function, FunctionKind::Method, class, this, directives);
            }
            ClassMember::ClassProp(prop) => {
                let directives = self.directives_at(prop.span.lo);
                if let PropName::Computed(computed) = &prop.key {
                    self.bind_expr(&computed.expr);
                }
                if let Some(annotation) = &prop.type_ann {
                    self.bind_member_type(&annotation.type_ann, directives);
                }
                if let Some(value) = &prop.value {
                    self.bind_property_value(value, prop.type_ann.as_deref(), prop.is_static, class);
                }
            }
            ClassMember::PrivateProp(prop) => {
                if let Some(annotation) = &prop.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
                if let Some(value) = &prop.value {
                    self.bind_property_value(value, prop.type_ann.as_deref(), prop.is_static, class);
                }
            }
            ClassMember::StaticBlock(block) => {
                self.this_stack.push(Some(ThisBinding::Static(class)));
                self.bind_block(&block.body.stmts);
                self.this_stack.pop();
            }
            ClassMember::TsIndexSignature(signature) => {
                if let Some(annotation) = &signature.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
            }
            ClassMember::AutoAccessor(_) | ClassMember::Empty(_) => {}
        }
    }

    fn bind_property_value(&mut self, value: &'a Expr, annotation: Option<&'a TsTypeAnn>, is_static: bool, class: SymbolRef) {
        let this = if is_static {
            ThisBinding::Static(class)
        } else {
            ThisBinding::Instance(class)
        };
        if let Some(annotation) = annotation {
            self.set_context(value, ContextSource::Annotation(&annotation.type_ann));
        }
        if matches!(value, Expr::Arrow(_) | Expr::Fn(_)) {
            self.property_initializer = Some(value.span().lo);
        }
        self.this_stack.push(Some(this));
        self.bind_expr(value);
        self.this_stack.pop();
        self.property_initializer = None;
    }

    fn bind_method(
        &mut self,
        function: &'a Function,
        kind: FunctionKind,
        class: SymbolRef,
        this: ThisBinding,
        directives: Directives,
    ) {
        self.this_stack.push(Some(this));
        let context = self.member_context();
        self.bind_function(function, kind, None, directives, Some(context));
        if let Some(record) = self.out.functions.get_mut(&function.span.lo) {
            record.class = Some(class);
        }
        self.this_stack.pop();
    }

    fn finish_classes(&mut self) {
        let symbols: Vec<SymbolRef> = self.out.classes.keys().copied().collect();
        for symbol in symbols {
            let (class, extends) = {
                let data = &self.out.classes[&symbol];
                (data.class, data.extends)
            };
            let mut info = self.out.classes[&symbol].info.clone();
            info.base = extends.filter(|base| !self.out.data(*base).info.has_directive(DirectiveKind::PureAbstract));
            for member in &class.body {
                if let ClassMember::ClassProp(prop) = member {
                    if prop.value.is_some() && !prop.is_static {
                        if let Some(name) = prop_name_text(&prop.key) {
                            info.initialized_fields.insert(name);
                        }
                    }
                    continue;
                }
                let ClassMember::Method(method) = member else { continue };
                let Some(name) = prop_name_text(&method.key) else { continue };
                let set = match (method.kind, method.is_static) {
                    (MethodKind::Getter, false) => &mut info.instance_getters,
                    (MethodKind::Setter, false) => &mut info.instance_setters,
                    (MethodKind::Getter, true) => &mut info.static_getters,
                    (MethodKind::Setter, true) => &mut info.static_setters,
                    (MethodKind::Method, _) => continue,
                };
                set.insert(name);
            }
            if let Some(data) = self.out.classes.get_mut(&symbol) {
                data.info = info;
            }
        }
    }

    // ----- functions -----

    fn function_context(&self, kind: FunctionKind, explicit: Option<ContextType>, lo: BytePos) -> ContextType {
        if let Some(context) = explicit {
            return context;
        }
        match kind {
            FunctionKind::Method
            | FunctionKind::Constructor
            | FunctionKind::Getter
            | FunctionKind::Setter
            | FunctionKind::ObjectMethod => self.member_context(),
            FunctionKind::Expression | FunctionKind::Arrow if self.property_initializer == Some(lo) => {
                self.member_context()
            }
            _ => self.namespace_context(),
        }
    }

    fn declare_param(&mut self, pat: &'a Pat, function: BytePos, index: usize) -> ParamRecord<'a> {
        let (inner, default) = match pat {
            Pat::Assign(assign) => (&*assign.left, Some(&*assign.right)),
            other => (other, None),
        };
        let rest = matches!(inner, Pat::Rest(_));
        let (name, annotation, optional) = match inner {
            Pat::Ident(binding) => (
                binding.id.sym.to_string(),
                binding.type_ann.as_deref().map(|ann| &*ann.type_ann),
                binding.id.optional,
            ),
            Pat::Rest(rest) => (
                match &*rest.arg {
                    Pat::Ident(binding) => binding.id.sym.to_string(),
                    _ => format!("____bindingPattern{}", index),
                },
                rest.type_ann.as_deref().map(|ann| &*ann.type_ann),
                false,
            ),
            Pat::Array(array) => (
                format!("____bindingPattern{}", index),
                array.type_ann.as_deref().map(|ann| &*ann.type_ann),
                array.optional,
            ),
            Pat::Object(object) => (
                format!("____bindingPattern{}", index),
                object.type_ann.as_deref().map(|ann| &*ann.type_ann),
                object.optional,
            ),
            _ => (format!("____bindingPattern{}", index), None, false),
        };

        let declaration = self.declaration(pat.span(), SymbolKind::Parameter, false, false);
        self.declare_pattern(inner, Vec::new(), &mut |path, binding_annotation| {
            let annotation = if path.is_empty() { annotation } else { binding_annotation };
            (
                declaration.clone(),
                DeclSource::Parameter {
                    annotation,
                    function,
                    index,
                    default,
                    path,
                },
                Directives::new(),
            )
        });

        if let Some(annotation) = annotation {
            self.bind_type(annotation, None);
        }
        self.bind_binding_pattern(inner);
        if let Some(default) = default {
            if let Some(annotation) = annotation {
                self.set_context(default, ContextSource::Annotation(annotation));
            }
            self.bind_expr(default);
        }

        ParamRecord {
            name,
            annotation,
            optional: optional || default.is_some(),
            rest,
            default,
        }
    }

    /// `constructor(private x: T)`: binds like a parameter.
    fn declare_param_prop(&mut self, prop: &'a TsParamProp, function: BytePos, index: usize) -> ParamRecord<'a> {
        match &prop.param {
            TsParamPropParam::Ident(binding) => {
                let annotation = binding.type_ann.as_deref().map(|ann| &*ann.type_ann);
                let declaration = self.declaration(binding.id.span, SymbolKind::Parameter, false, false);
                self.declare(
                    &binding.id.sym,
                    declaration,
                    DeclSource::Parameter {
                        annotation,
                        function,
                        index,
                        default: None,
                        path: Vec::new(),
                    },
                    Directives::new(),
                    Some(binding.id.span.lo),
                );
                if let Some(annotation) = annotation {
                    self.bind_type(annotation, None);
                }
                ParamRecord {
                    name: binding.id.sym.to_string(),
                    annotation,
                    optional: binding.id.optional,
                    rest: false,
                    default: None,
                }
            }
            TsParamPropParam::Assign(assign) => {
                let mut record = self.declare_param(&assign.left, function, index);
                if let Some(annotation) = record.annotation {
                    self.set_context(&assign.right, ContextSource::Annotation(annotation));
                }
                self.bind_expr(&assign.right);
                record.default = Some(&*assign.right);
                record.optional = true;
                record
            }
        }
    }

    fn bind_function_body(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            self.prescan_vars(stmt);
        }
        self.declare_stmts(stmts);
        for stmt in stmts {
            self.bind_stmt(stmt);
        }
    }

    fn take_initializer_directives(&mut self, lo: BytePos) -> Directives {
        match self.initializer_directives.take() {
            Some((pos, directives)) if pos == lo => directives,
            Some(other) => {
                self.initializer_directives = Some(other);
                Directives::new()
            }
            None => Directives::new(),
        }
    }

    fn bind_function(
        &mut self,
        function: &'a Function,
        kind: FunctionKind,
        symbol: Option<SymbolRef>,
        directives: Directives,
        member_context: Option<ContextType>,
    ) {
        let lo = function.span.lo;
        let explicit = explicit_this_context(function.params.first().map(|p| &p.pat));
        let context = explicit
            .or(member_context)
            .unwrap_or_else(|| self.function_context(kind, None, lo));

        for param in &function.params {
            for decorator in &param.decorators {
                self.bind_expr(&decorator.expr);
            }
        }

        self.scopes.push(Scope::default());
        self.declare_type_params(function.type_params.as_deref());
        self.functions.push(lo);
        if matches!(kind, FunctionKind::Declaration | FunctionKind::Expression | FunctionKind::ObjectMethod) {
            self.this_stack.push(None);
        }

        let mut params = Vec::new();
        for (index, param) in function.params.iter().enumerate() {
            if is_this_param(&param.pat) {
                if let Pat::Ident(binding) = &param.pat {
                    if let Some(annotation) = &binding.type_ann {
                        self.bind_type(&annotation.type_ann, None);
                    }
                }
                continue;
            }
            let position = index - usize::from(explicit.is_some());
            params.push(self.declare_param(&param.pat, lo, position));
        }
        if let Some(return_type) = &function.return_type {
            self.bind_type(&return_type.type_ann, None);
        }
        if let Some(body) = &function.body {
            self.bind_function_body(&body.stmts);
        }

        if matches!(kind, FunctionKind::Declaration | FunctionKind::Expression | FunctionKind::ObjectMethod) {
            self.this_stack.pop();
        }
        self.functions.pop();
        self.scopes.pop();

        let context_key = matches!(kind, FunctionKind::Expression | FunctionKind::ObjectMethod)
            .then(|| span_key(function.span));
        self.out.functions.insert(
            lo,
            FunctionRecord {
                kind,
                params,
                return_annotation: function.return_type.as_deref().map(|ann| &*ann.type_ann),
                expression_body: None,
                context,
                explicit_this: explicit.is_some(),
                directives,
                symbol,
                class: None,
                context_key,
                has_body: function.body.is_some(),
            },
        );
    }

    fn bind_arrow(&mut self, arrow: &'a ArrowExpr) {
        let lo = arrow.span.lo;
        let context = self.function_context(FunctionKind::Arrow, None, lo);
        let directives = self.take_initializer_directives(lo);

        self.scopes.push(Scope::default());
        self.declare_type_params(arrow.type_params.as_deref());
        self.functions.push(lo);
        let mut params = Vec::new();
        for (index, pat) in arrow.params.iter().enumerate() {
            params.push(self.declare_param(pat, lo, index));
        }
        if let Some(return_type) = &arrow.return_type {
            self.bind_type(&return_type.type_ann, None);
        }
        let expression_body = match &*arrow.body {
            BlockStmtOrExpr::BlockStmt(block) => {
                self.bind_function_body(&block.stmts);
                None
            }
            BlockStmtOrExpr::Expr(expr) => {
                self.set_context(expr, ContextSource::Return { function: lo });
                self.bind_expr(expr);
                Some(&**expr)
            }
        };
        self.functions.pop();
        self.scopes.pop();

        self.out.functions.insert(
            lo,
            FunctionRecord {
                kind: FunctionKind::Arrow,
                params,
                return_annotation: arrow.return_type.as_deref().map(|ann| &*ann.type_ann),
                expression_body,
                context,
                explicit_this: false,
                directives,
                symbol: None,
                class: None,
                context_key: Some(span_key(arrow.span)),
                has_body: true,
            },
        );
    }

    // ----- patterns -----

    /// Expressions and annotations inside a declared pattern.
    fn bind_binding_pattern(&mut self, pat: &'a Pat) {
        match pat {
            Pat::Ident(binding) => {
                if let Some(annotation) = &binding.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
            }
            Pat::Array(array) => {
                for element in array.elems.iter().flatten() {
                    self.bind_binding_pattern(element);
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => {
                            if let PropName::Computed(computed) = &kv.key {
                                self.bind_expr(&computed.expr);
                            }
                            self.bind_binding_pattern(&kv.value);
                        }
                        ObjectPatProp::Assign(assign) => {
                            if let Some(value) = &assign.value {
                                self.bind_expr(value);
                            }
                        }
                        ObjectPatProp::Rest(rest) => self.bind_binding_pattern(&rest.arg),
                    }
                }
            }
            Pat::Rest(rest) => self.bind_binding_pattern(&rest.arg),
            Pat::Assign(assign) => {
                self.bind_binding_pattern(&assign.left);
                self.bind_expr(&assign.right);
            }
            Pat::Expr(expr) => self.bind_expr(expr),
            Pat::Invalid(_) => {}
        }
    }

    /// Targets of a destructuring assignment: identifiers are references.
    fn bind_assign_pattern(&mut self, pat: &'a Pat) {
        match pat {
            Pat::Ident(binding) => self.reference(&binding.id),
            Pat::Array(array) => {
                for element in array.elems.iter().flatten() {
                    self.bind_assign_pattern(element);
                }
            }
            Pat::Object(object) => self.bind_assign_object(object),
            Pat::Rest(rest) => self.bind_assign_pattern(&rest.arg),
            Pat::Assign(assign) => {
                self.bind_assign_pattern(&assign.left);
                self.bind_expr(&assign.right);
            }
            Pat::Expr(expr) => self.bind_expr(expr),
            Pat::Invalid(_) => {}
        }
    }

    fn bind_assign_object(&mut self, object: &'a ObjectPat) {
        for prop in &object.props {
            match prop {
                ObjectPatProp::KeyValue(kv) => {
                    if let PropName::Computed(computed) = &kv.key {
                        self.bind_expr(&computed.expr);
                    }
                    self.bind_assign_pattern(&kv.value);
                }
                ObjectPatProp::Assign(assign) => {
                    self.reference(&assign.key.id);
                    if let Some(value) = &assign.value {
                        self.bind_expr(value);
                    }
                }
                ObjectPatProp::Rest(rest) => self.bind_assign_pattern(&rest.arg),
            }
        }
    }

    // ----- expressions -----

    fn bind_args(&mut self, args: &'a [ExprOrSpread], site: CallSite<'a>) {
        for (index, arg) in args.iter().enumerate() {
            if arg.spread.is_none() {
                self.set_context(&arg.expr, ContextSource::Argument { site, index });
            }
            self.bind_expr(&arg.expr);
        }
    }

    fn bind_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::This(this) => {
                if let Some(Some(binding)) = self.this_stack.last() {
                    self.out.this_bindings.insert(this.span.lo, *binding);
                }
            }
            Expr::Ident(ident) => self.reference(ident),
            Expr::Array(array) => {
                let key = span_key(array.span);
                for (index, element) in array.elems.iter().enumerate() {
                    let Some(element) = element else { continue };
                    if element.spread.is_none() {
                        self.set_context(&element.expr, ContextSource::Element { array: key, index });
                    }
                    self.bind_expr(&element.expr);
                }
            }
            Expr::Object(object) => self.bind_object(object),
            Expr::Fn(function) => {
                let directives = self.take_initializer_directives(function.function.span.lo);
                match &function.ident {
                    Some(ident) => {
                        self.scopes.push(Scope::default());
                        let declaration = self.declaration(function.function.span, SymbolKind::Function, false, false);
                        let symbol = self.declare(
                            &ident.sym,
                            declaration,
                            DeclSource::Function(&function.function),
                            Directives::new(),
                            Some(ident.span.lo),
                        );
                        self.bind_function(&function.function, FunctionKind::Expression, Some(symbol), directives, None);
                        self.scopes.pop();
                    }
                    None => self.bind_function(&function.function, FunctionKind::Expression, None, directives, None),
                }
            }
            Expr::Arrow(arrow) => self.bind_arrow(arrow),
            Expr::Class(class) => {
                let symbol = self.class_symbol(&class.class, class.ident.as_ref(), Directives::new());
                self.bind_class(&class.class, symbol);
            }
            Expr::Unary(unary) => self.bind_expr(&unary.arg),
            Expr::Update(update) => self.bind_expr(&update.arg),
            Expr::Bin(bin) => {
                self.bind_expr(&bin.left);
                self.bind_expr(&bin.right);
            }
            Expr::Assign(assign) => {
                match &assign.left {
                    AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                        self.reference(&binding.id);
                        if assign.op == AssignOp::Assign {
                            if let Some(symbol) = self.out.value_refs.get(&binding.id.span.lo).copied() {
                                self.set_context(&assign.right, ContextSource::Symbol(symbol));
                            }
                        }
                    }
                    AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                        self.bind_member(member);
                        if assign.op == AssignOp::Assign {
                            self.set_context(&assign.right, ContextSource::Member(member));
                        }
                    }
                    AssignTarget::Simple(simple) => self.bind_simple_target(simple),
                    AssignTarget::Pat(AssignTargetPat::Array(array)) => {
                        for element in array.elems.iter().flatten() {
                            self.bind_assign_pattern(element);
                        }
                    }
                    AssignTarget::Pat(AssignTargetPat::Object(object)) => self.bind_assign_object(object),
                    AssignTarget::Pat(AssignTargetPat::Invalid(_)) => {}
                }
                self.bind_expr(&assign.right);
            }
            Expr::Member(member) => self.bind_member(member),
            Expr::SuperProp(super_prop) => {
                if let SuperProp::Computed(computed) = &super_prop.prop {
                    self.bind_expr(&computed.expr);
                }
            }
            Expr::Cond(cond) => {
                self.bind_expr(&cond.test);
                self.bind_expr(&cond.cons);
                self.bind_expr(&cond.alt);
            }
            Expr::Call(call) => {
                if let Callee::Expr(callee) = &call.callee {
                    self.bind_expr(callee);
                }
                self.bind_type_args(call.type_args.as_deref());
                self.bind_args(&call.args, CallSite::Call(call));
            }
            Expr::New(new) => {
                self.bind_expr(&new.callee);
                self.bind_type_args(new.type_args.as_deref());
                if let Some(args) = &new.args {
                    self.bind_args(args, CallSite::New(new));
                }
            }
            Expr::Seq(seq) => {
                for expr in &seq.exprs {
                    self.bind_expr(expr);
                }
            }
            Expr::Tpl(tpl) => {
                for expr in &tpl.exprs {
                    self.bind_expr(expr);
                }
            }
            Expr::TaggedTpl(tagged) => {
                self.bind_expr(&tagged.tag);
                for expr in &tagged.tpl.exprs {
                    self.bind_expr(expr);
                }
            }
            Expr::Yield(yield_expr) => {
                if let Some(arg) = &yield_expr.arg {
                    self.bind_expr(arg);
                }
            }
            Expr::Await(await_expr) => self.bind_expr(&await_expr.arg),
            Expr::Paren(paren) => self.bind_expr(&paren.expr),
            Expr::TsTypeAssertion(assertion) => {
                self.bind_type(&assertion.type_ann, None);
                self.set_context(&assertion.expr, ContextSource::Annotation(&assertion.type_ann));
                self.bind_expr(&assertion.expr);
            }
            Expr::TsAs(as_expr) => {
                self.bind_type(&as_expr.type_ann, None);
                self.set_context(&as_expr.expr, ContextSource::Annotation(&as_expr.type_ann));
                self.bind_expr(&as_expr.expr);
            }
            Expr::TsSatisfies(satisfies) => {
                self.bind_type(&satisfies.type_ann, None);
                self.set_context(&satisfies.expr, ContextSource::Annotation(&satisfies.type_ann));
                self.bind_expr(&satisfies.expr);
            }
            Expr::TsConstAssertion(assertion) => self.bind_expr(&assertion.expr),
            Expr::TsNonNull(non_null) => self.bind_expr(&non_null.expr),
            Expr::TsInstantiation(instantiation) => {
                self.bind_expr(&instantiation.expr);
                self.bind_type_args(Some(&*instantiation.type_args));
            }
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => self.bind_member(member),
                OptChainBase::Call(call) => {
                    self.bind_expr(&call.callee);
                    for arg in &call.args {
                        self.bind_expr(&arg.expr);
                    }
                }
            },
            _ => {}
        }
    }

    fn bind_simple_target(&mut self, target: &'a SimpleAssignTarget) {
        match target {
            SimpleAssignTarget::Ident(binding) => self.reference(&binding.id),
            SimpleAssignTarget::Member(member) => self.bind_member(member),
            SimpleAssignTarget::SuperProp(super_prop) => {
                if let SuperProp::Computed(computed) = &super_prop.prop {
                    self.bind_expr(&computed.expr);
                }
            }
            SimpleAssignTarget::Paren(paren) => self.bind_expr(&paren.expr),
            SimpleAssignTarget::TsAs(as_expr) => self.bind_expr(&as_expr.expr),
            SimpleAssignTarget::TsSatisfies(satisfies) => self.bind_expr(&satisfies.expr),
            SimpleAssignTarget::TsNonNull(non_null) => self.bind_expr(&non_null.expr),
            SimpleAssignTarget::TsTypeAssertion(assertion) => self.bind_expr(&assertion.expr),
            SimpleAssignTarget::TsInstantiation(instantiation) => self.bind_expr(&instantiation.expr),
            SimpleAssignTarget::OptChain(_) | SimpleAssignTarget::Invalid(_) => {}
        }
    }

    fn bind_member(&mut self, member: &'a MemberExpr) {
        self.bind_expr(&member.obj);
        if let MemberProp::Computed(computed) = &member.prop {
            self.bind_expr(&computed.expr);
        }
    }

    fn bind_object(&mut self, object: &'a ObjectLit) {
        let key = span_key(object.span);
        for prop in &object.props {
            match prop {
                PropOrSpread::Spread(spread) => self.bind_expr(&spread.expr),
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::Shorthand(ident) => self.reference(ident),
                    Prop::KeyValue(kv) => {
                        match &kv.key {
                            PropName::Computed(computed) => self.bind_expr(&computed.expr),
                            name => {
                                if let Some(name) = prop_name_text(name) {
                                    self.set_context(&kv.value, ContextSource::Property { object: key, name });
                                }
                            }
                        }
                        self.bind_expr(&kv.value);
                    }
                    Prop::Assign(assign) => self.bind_expr(&assign.value),
                    Prop::Method(method) => {
                        if let PropName::Computed(computed) = &method.key {
                            self.bind_expr(&computed.expr);
                        }
                        if let Some(name) = prop_name_text(&method.key) {
                            self.out
                                .contexts
                                .insert(span_key(method.function.span), ContextSource::Property { object: key, name });
                        }
                        self.bind_function(&method.function, FunctionKind::ObjectMethod, None, Directives::new(), None);
                    }
                    Prop::Getter(getter) => {
                        if let PropName::Computed(computed) = &getter.key {
                            self.bind_expr(&computed.expr);
                        }
                        if let Some(body) = &getter.body {
                            self.scopes.push(Scope::default());
                            self.this_stack.push(None);
                            self.bind_function_body(&body.stmts);
                            self.this_stack.pop();
                            self.scopes.pop();
                        }
                    }
                    Prop::Setter(setter) => {
                        if let PropName::Computed(computed) = &setter.key {
                            self.bind_expr(&computed.expr);
                        }
                        self.scopes.push(Scope::default());
                        self.this_stack.push(None);
                        self.declare_param(&setter.param, setter.span.lo, 0);
                        if let Some(body) = &setter.body {
                            self.bind_function_body(&body.stmts);
                        }
                        self.this_stack.pop();
                        self.scopes.pop();
                    }
                },
            }
        }
    }

    // ----- types -----

    fn bind_type_args(&mut self, args: Option<&'a TsTypeParamInstantiation>) {
        if let Some(args) = args {
            for arg in &args.params {
                self.bind_type(arg, None);
            }
        }
    }

    fn bind_member_type(&mut self, ty: &'a TsType, directives: Directives) {
        let owner = TypeSite {
            context: self.member_context(),
            directives,
            declared_in_type: false,
        };
        self.bind_type(ty, Some(owner));
    }

    fn bind_alias_type(&mut self, ty: &'a TsType) {
        let owner = TypeSite {
            context: self.namespace_context(),
            directives: Directives::new(),
            declared_in_type: true,
        };
        self.bind_type(ty, Some(owner));
    }

    fn bind_fn_params(&mut self, params: &'a [TsFnParam]) {
        for param in params {
            let annotation = match param {
                TsFnParam::Ident(ident) => ident.type_ann.as_deref(),
                TsFnParam::Array(array) => array.type_ann.as_deref(),
                TsFnParam::Rest(rest) => rest.type_ann.as_deref(),
                TsFnParam::Object(object) => object.type_ann.as_deref(),
            };
            if let Some(annotation) = annotation {
                self.bind_type(&annotation.type_ann, None);
            }
        }
    }

    /// Resolves names in a type and records the calling convention of the
    /// function types in it. `owner` describes the declaration that
    /// directly holds `ty` (a property or type alias).
    fn bind_type(&mut self, ty: &'a TsType, owner: Option<TypeSite>) {
        match ty {
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsFnType(function)) => {
                let explicit = explicit_this_in_type(&function.params);
                let site = match owner {
                    Some(owner) => TypeSite {
                        context: explicit.unwrap_or(owner.context),
                        ..owner
                    },
                    None => TypeSite {
                        context: explicit.unwrap_or_else(|| self.namespace_context()),
                        ..TypeSite::default()
                    },
                };
                self.out.type_sites.insert(function.span.lo, site);
                self.scopes.push(Scope::default());
                self.declare_type_params(function.type_params.as_deref());
                self.bind_fn_params(&function.params);
                self.bind_type(&function.type_ann.type_ann, None);
                self.scopes.pop();
            }
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsConstructorType(constructor)) => {
                self.scopes.push(Scope::default());
                self.declare_type_params(constructor.type_params.as_deref());
                self.bind_fn_params(&constructor.params);
                self.bind_type(&constructor.type_ann.type_ann, None);
                self.scopes.pop();
            }
            TsType::TsTypeRef(reference) => {
                self.reference_entity(&reference.type_name, true);
                self.bind_type_args(reference.type_params.as_deref());
            }
            TsType::TsTypeQuery(query) => {
                if let TsTypeQueryExpr::TsEntityName(entity) = &query.expr_name {
                    self.reference_entity(entity, false);
                }
            }
            TsType::TsTypeLit(literal) => {
                for element in &literal.members {
                    self.bind_type_element(element, false);
                }
            }
            TsType::TsArrayType(array) => self.bind_type(&array.elem_type, None),
            TsType::TsTupleType(tuple) => {
                for element in &tuple.elem_types {
                    self.bind_type(&element.ty, None);
                }
            }
            TsType::TsOptionalType(optional) => self.bind_type(&optional.type_ann, None),
            TsType::TsRestType(rest) => self.bind_type(&rest.type_ann, None),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(union)) => {
                for member in &union.types {
                    self.bind_type(member, None);
                }
            }
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(intersection)) => {
                for member in &intersection.types {
                    self.bind_type(member, None);
                }
            }
            TsType::TsConditionalType(conditional) => {
                self.bind_type(&conditional.check_type, None);
                self.bind_type(&conditional.extends_type, None);
                self.bind_type(&conditional.true_type, None);
                self.bind_type(&conditional.false_type, None);
            }
            TsType::TsParenthesizedType(paren) => self.bind_type(&paren.type_ann, None),
            TsType::TsTypeOperator(operator) => self.bind_type(&operator.type_ann, None),
            TsType::TsIndexedAccessType(access) => {
                self.bind_type(&access.obj_type, None);
                self.bind_type(&access.index_type, None);
            }
            TsType::TsMappedType(mapped) => {
                if let Some(inner) = &mapped.type_ann {
                    self.bind_type(inner, None);
                }
            }
            TsType::TsTypePredicate(predicate) => {
                if let Some(annotation) = &predicate.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
            }
            _ => {}
        }
    }

    fn bind_type_element(&mut self, element: &'a TsTypeElement, in_interface: bool) {
        match element {
            TsTypeElement::TsPropertySignature(property) => {
                let directives = self.directives_at(property.span.lo);
                if property.computed {
                    self.bind_expr(&property.key);
                }
                if let Some(annotation) = &property.type_ann {
                    self.bind_member_type(&annotation.type_ann, directives);
                }
            }
            TsTypeElement::TsMethodSignature(method) => {
                let directives = self.directives_at(method.span.lo);
                if method.computed {
                    self.bind_expr(&method.key);
                }
                let context = explicit_this_in_type(&method.params).unwrap_or_else(|| self.member_context());
                self.out.type_sites.insert(
                    method.span.lo,
                    TypeSite {
                        context,
                        directives,
                        declared_in_type: false,
                    },
                );
                self.scopes.push(Scope::default());
                self.declare_type_params(method.type_params.as_deref());
                self.bind_fn_params(&method.params);
                if let Some(annotation) = &method.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
                self.scopes.pop();
            }
            TsTypeElement::TsCallSignatureDecl(call) => {
                let directives = self.directives_at(call.span.lo);
                let context = explicit_this_in_type(&call.params).unwrap_or_else(|| self.namespace_context());
                self.out.type_sites.insert(
                    call.span.lo,
                    TypeSite {
                        context,
                        directives,
                        declared_in_type: in_interface,
                    },
                );
                self.scopes.push(Scope::default());
                self.declare_type_params(call.type_params.as_deref());
                self.bind_fn_params(&call.params);
                if let Some(annotation) = &call.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
                self.scopes.pop();
            }
            TsTypeElement::TsConstructSignatureDecl(construct) => {
                let directives = self.directives_at(construct.span.lo);
                let context = explicit_this_in_type(&construct.params).unwrap_or_else(|| self.member_context());
                self.out.type_sites.insert(
                    construct.span.lo,
                    TypeSite {
                        context,
                        directives,
                        declared_in_type: false,
                    },
                );
                self.bind_fn_params(&construct.params);
                if let Some(annotation) = &construct.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
            }
            TsTypeElement::TsGetterSignature(getter) => {
                if let Some(annotation) = &getter.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
            }
            TsTypeElement::TsSetterSignature(setter) => {
                self.bind_fn_params(std::slice::from_ref(&setter.param));
            }
            TsTypeElement::TsIndexSignature(index) => {
                if let Some(annotation) = &index.type_ann {
                    self.bind_type(&annotation.type_ann, None);
                }
            }
        }
    }
}
