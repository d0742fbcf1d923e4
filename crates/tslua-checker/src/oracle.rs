//! The semantic oracle consumed by the Lua transformer.
//!
//! Everything the lowering core needs to know about the TypeScript program
//! (symbols, types, signatures, directives, constant values and source
//! positions) is asked through [`TypeOracle`]. [`crate::Checker`] is the
//! implementation shipped with the workspace.

use std::collections::BTreeSet;

use swc_common::{BytePos, Span};
use swc_ecma_ast::{CallExpr, Class, Expr, Ident, NewExpr, TaggedTpl, TsType};
use tslua_types::{ConstValue, ContextType, DirectiveKind, Directives, Signature, SymbolRef, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Class,
    Interface,
    TypeAlias,
    TypeParameter,
    Enum,
    EnumMember,
    Namespace,
    Import,
    /// Declared by the standard library.
    Builtin,
}

impl SymbolKind {
    /// Lives in the value namespace.
    pub fn is_value(self) -> bool {
        !matches!(
            self,
            SymbolKind::Interface | SymbolKind::TypeAlias | SymbolKind::TypeParameter
        )
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::TypeAlias
                | SymbolKind::TypeParameter
                | SymbolKind::Enum
                | SymbolKind::Namespace
                | SymbolKind::Import
                | SymbolKind::Builtin
        )
    }
}

/// One declaration of a symbol in the current file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationInfo {
    /// File-relative offset of the declaration node.
    pub pos: u32,
    pub kind: SymbolKind,
    /// Carries an `export` modifier.
    pub exported: bool,
    /// Under `declare` (directly or through an ambient namespace).
    pub ambient: bool,
    /// `let` or `const`.
    pub block_scoped: bool,
    /// A function or method signature without a body.
    pub overload: bool,
}

/// Table a symbol is exported into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportScope {
    /// `____exports` of the current module file.
    File,
    /// The local table of an enclosing namespace.
    Namespace(SymbolRef),
}

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    pub declarations: Vec<DeclarationInfo>,
    /// Set when the symbol has an exported declaration that its file or
    /// namespace actually exports.
    pub export_scope: Option<ExportScope>,
    /// Exported through an export specifier (`export { x }`).
    pub exported_by_specifier: bool,
    pub directives: Directives,
    /// Module specifier for symbols introduced by imports.
    pub module_specifier: Option<String>,
    /// `const enum`
    pub const_enum: bool,
}

impl SymbolInfo {
    pub fn is_ambient(&self) -> bool {
        self.kind == SymbolKind::Builtin
            || (!self.declarations.is_empty() && self.declarations.iter().all(|d| d.ambient))
    }

    pub fn is_exported(&self) -> bool {
        self.export_scope.is_some() || self.exported_by_specifier
    }

    /// Offset of the first declaration in the file.
    pub fn first_declaration(&self) -> Option<u32> {
        self.declarations.iter().map(|d| d.pos).min()
    }

    pub fn has_directive(&self, kind: DirectiveKind) -> bool {
        self.directives.has(kind)
    }
}

/// Facts about a class the transformer needs for its ancestors, which it
/// may not be lowering itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    /// Extended class, skipping `@pureAbstract` bases.
    pub base: Option<SymbolRef>,
    pub instance_getters: BTreeSet<String>,
    pub instance_setters: BTreeSet<String>,
    pub static_getters: BTreeSet<String>,
    pub static_setters: BTreeSet<String>,
    /// Instance properties declared with an initializer.
    pub initialized_fields: BTreeSet<String>,
}

/// A node that resolves to a call signature.
#[derive(Debug, Clone, Copy)]
pub enum CallSite<'n> {
    Call(&'n CallExpr),
    New(&'n NewExpr),
    TaggedTemplate(&'n TaggedTpl),
}

impl CallSite<'_> {
    pub fn span(&self) -> Span {
        match self {
            CallSite::Call(call) => call.span,
            CallSite::New(new) => new.span,
            CallSite::TaggedTemplate(tagged) => tagged.span,
        }
    }
}

/// Semantic facts about one parsed file.
pub trait TypeOracle {
    /// Value symbol an identifier (reference or binding) resolves to.
    fn symbol_at(&self, ident: &Ident) -> Option<SymbolRef>;

    fn symbol(&self, symbol: SymbolRef) -> &SymbolInfo;

    fn type_of_expr(&self, expr: &Expr) -> Type;

    fn type_of_symbol(&self, symbol: SymbolRef) -> Type;

    fn annotation_type(&self, ty: &TsType) -> Type;

    fn resolved_signature(&self, site: CallSite<'_>) -> Option<Signature>;

    /// Type of the function-like node starting at `span`: declarations,
    /// expressions, arrows, methods, accessors and constructors.
    fn function_type(&self, span: Span) -> Option<Type>;

    /// Type the surrounding code expects `expr` to have.
    fn contextual_type(&self, expr: &Expr) -> Option<Type>;

    fn property_type(&self, ty: &Type, name: &str) -> Type;

    /// Members declared by an interface or object type.
    fn member_names(&self, ty: &Type) -> Vec<String>;

    fn class_info(&self, class: SymbolRef) -> Option<&ClassInfo>;

    /// Symbol of a class declaration or expression.
    fn class_symbol(&self, class: &Class) -> Option<SymbolRef>;

    /// Directives written at the top of the file (`@noSelfInFile`).
    fn file_directives(&self) -> &Directives;

    /// Directives on an ambient module declaration for `specifier`.
    fn module_directives(&self, specifier: &str) -> Directives;

    /// Compile-time value of a const enum member access.
    fn const_value(&self, expr: &Expr) -> Option<ConstValue>;

    fn enum_member_value(&self, enumeration: SymbolRef, member: &str) -> Option<ConstValue>;

    /// Whether the symbol is read as a value anywhere in the file.
    fn is_value_referenced(&self, symbol: SymbolRef) -> bool;

    /// Whether the file is an ES module.
    fn is_module(&self) -> bool;

    /// Zero-based line and column of `pos`.
    fn line_column(&self, pos: BytePos) -> Option<(u32, u32)>;

    /// File-relative offset of `pos`.
    fn offset(&self, pos: BytePos) -> u32;

    /// Diagnostic span of a source node.
    fn source_span(&self, span: Span) -> tslua_diagnostics::Span;

    /// Directives of the type's symbol and of the alias it was referenced
    /// through.
    fn type_directives(&self, ty: &Type) -> Directives {
        let mut directives = Directives::new();
        if let Type::Alias { symbol, target } = ty {
            directives.merge(&self.symbol(*symbol).directives);
            directives.merge(&self.type_directives(target));
            return directives;
        }
        if let Some(symbol) = ty.symbol() {
            directives.merge(&self.symbol(symbol).directives);
        }
        directives
    }

    /// Context reduced over every call signature of `ty`.
    fn function_context_type(&self, ty: &Type) -> ContextType {
        let ty = match ty.resolved() {
            Type::TypeParameter {
                constraint: Some(constraint),
                ..
            } => constraint.as_ref(),
            other => other,
        };
        if let Type::Union(members) = ty {
            return ContextType::reduce(members.iter().map(|m| self.function_context_type(m)));
        }
        ContextType::reduce(ty.call_signatures().into_iter().map(Signature::effective_context))
    }
}
