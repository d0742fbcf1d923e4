//! Lowering failures.
//!
//! Every user-facing failure is a [`CompileError`]: a kind plus the span
//! of the offending node. Broken transformer invariants (scope underflow,
//! missing hoisting records) panic instead.

use thiserror::Error;
use tslua_diagnostics::{Diagnostic, DiagnosticCode, Span};

use crate::options::LuaTarget;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileErrorKind {
    // ----- unsupported constructs -----
    #[error("Unsupported {description} kind: {kind}")]
    UnsupportedKind { description: String, kind: String },

    #[error("Unsupported property on {parent}: {property}")]
    UnsupportedProperty { parent: String, property: String },

    #[error("{functionality} is/are not supported for target Lua {target}.")]
    UnsupportedForTarget { functionality: String, target: LuaTarget },

    #[error("Functions with undefined bodies are not supported.")]
    UnsupportedFunctionWithoutBody,

    #[error("Unsupported for...in variable kind.")]
    UnsupportedForInVariable,

    #[error("Unsupported import type.")]
    UnsupportedImportType,

    #[error("Unsupported use of lua iterator with TupleReturn decorator in for...of statement. You must use a destructuring statement to catch results from a lua iterator with the TupleReturn decorator.")]
    UnsupportedNonDestructuringLuaIterator,

    #[error("Unsupported object destructuring in for...of statement.")]
    UnsupportedObjectDestructuringInForOf,

    #[error("Class declarations must have a name.")]
    MissingClassName,

    #[error("Unsupported function declaration without name.")]
    MissingFunctionName,

    #[error("Invalid throw expression, only strings can be thrown.")]
    InvalidThrowExpression,

    #[error("Unable to resolve type of super expression.")]
    UnknownSuperType,

    #[error("Cannot create require path. {reason}. Module path: {path}")]
    UnresolvableRequirePath { reason: String, path: String },

    #[error("Invalid JSON file content")]
    InvalidJsonFileContent,

    // ----- capability misuse -----
    #[error("Iterating over arrays with 'for ... in' is not allowed.")]
    ForbiddenForIn,

    #[error("Classes with the '@luaTable' decorator must be declared.")]
    ForbiddenLuaTableNonDeclaration,

    #[error("Cannot extend classes with the decorator '@luaTable'.")]
    InvalidExtendsLuaTable,

    #[error("The instanceof operator cannot be used with a '@luaTable' class.")]
    InvalidInstanceOfLuaTable,

    #[error("{0}")]
    ForbiddenLuaTableUseException(String),

    #[error("{name} expects {expected} argument(s) but got {got}.")]
    InvalidDecoratorArgumentNumber { name: String, got: usize, expected: usize },

    #[error("Decorator function cannot have 'this: void'.")]
    InvalidDecoratorContext,

    #[error("Cannot use both '@extension' and '@metaExtension' decorators on the same class.")]
    InvalidExtensionMetaExtension,

    #[error("Cannot construct classes with decorator '@extension' or '@metaExtension'.")]
    InvalidNewExpressionOnExtension,

    #[error("Cannot extend classes with decorator '@extension' or '@metaExtension'.")]
    InvalidExtendsExtension,

    #[error("Cannot export classes with decorator '@extension' or '@metaExtension'.")]
    InvalidExportsExtension,

    #[error("Cannot use instanceof on classes with decorator '@extension' or '@metaExtension'.")]
    InvalidInstanceOfExtension,

    #[error("Cannot use \"{0}\" as a static property name.")]
    ForbiddenStaticClassPropertyName(String),

    #[error("@metaExtension requires the extension of the metatable class.")]
    MissingMetaExtension,

    #[error("{0}")]
    InvalidForRangeCall(String),

    // ----- incompatible function contexts -----
    #[error("Unable to convert function with a 'this' parameter to function{} with no 'this'. To fix, wrap in an arrow function, or declare with 'this: void'.", quoted_name(.0))]
    UnsupportedNoSelfFunctionConversion(Option<String>),

    #[error("Unable to convert function with no 'this' parameter to function{} with 'this'. To fix, wrap in an arrow function or declare with 'this: any'.", quoted_name(.0))]
    UnsupportedSelfFunctionConversion(Option<String>),

    #[error("Unsupported assignment of function with different overloaded types for 'this'{}. Overloads should either be all functions or all methods, but not both.", assignment_target(.0))]
    UnsupportedOverloadAssignment(Option<String>),

    // ----- naming -----
    #[error("Invalid ambient identifier name \"{0}\". Ambient identifiers must be valid lua identifiers.")]
    InvalidAmbientIdentifierName(String),

    // ----- ordering -----
    #[error("Identifier \"{0}\" was referenced before it was declared. The declaration must be moved before the identifier's use, or hoisting must be enabled.")]
    ReferencedBeforeDeclaration(String),
}

fn quoted_name(name: &Option<String>) -> String {
    name.as_ref().map(|n| format!(" \"{}\"", n)).unwrap_or_default()
}

fn assignment_target(name: &Option<String>) -> String {
    name.as_ref().map(|n| format!(" to \"{}\"", n)).unwrap_or_default()
}

impl CompileErrorKind {
    pub fn unsupported_kind(description: impl Into<String>, kind: impl Into<String>) -> Self {
        CompileErrorKind::UnsupportedKind {
            description: description.into(),
            kind: kind.into(),
        }
    }

    pub fn unsupported_property(parent: impl Into<String>, property: impl Into<String>) -> Self {
        CompileErrorKind::UnsupportedProperty {
            parent: parent.into(),
            property: property.into(),
        }
    }

    pub fn unsupported_for_target(functionality: impl Into<String>, target: LuaTarget) -> Self {
        CompileErrorKind::UnsupportedForTarget {
            functionality: functionality.into(),
            target,
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        use CompileErrorKind::*;
        match self {
            UnsupportedKind { .. } => DiagnosticCode::UnsupportedKind,
            UnsupportedProperty { .. } => DiagnosticCode::UnsupportedProperty,
            UnsupportedForTarget { .. } => DiagnosticCode::UnsupportedForTarget,
            UnsupportedFunctionWithoutBody => DiagnosticCode::UnsupportedFunctionWithoutBody,
            UnsupportedForInVariable => DiagnosticCode::UnsupportedForInVariable,
            UnsupportedImportType => DiagnosticCode::UnsupportedImportType,
            UnsupportedNonDestructuringLuaIterator => DiagnosticCode::UnsupportedNonDestructuringLuaIterator,
            UnsupportedObjectDestructuringInForOf => DiagnosticCode::UnsupportedObjectDestructuringInForOf,
            MissingClassName => DiagnosticCode::MissingClassName,
            MissingFunctionName => DiagnosticCode::MissingFunctionName,
            InvalidThrowExpression => DiagnosticCode::InvalidThrowExpression,
            UnknownSuperType => DiagnosticCode::UnknownSuperType,
            UnresolvableRequirePath { .. } => DiagnosticCode::UnresolvableRequirePath,
            InvalidJsonFileContent => DiagnosticCode::InvalidJsonFileContent,
            ForbiddenForIn => DiagnosticCode::ForbiddenForIn,
            ForbiddenLuaTableNonDeclaration => DiagnosticCode::ForbiddenLuaTableNonDeclaration,
            InvalidExtendsLuaTable => DiagnosticCode::InvalidExtendsLuaTable,
            InvalidInstanceOfLuaTable => DiagnosticCode::InvalidInstanceOfLuaTable,
            ForbiddenLuaTableUseException(_) => DiagnosticCode::ForbiddenLuaTableUseException,
            InvalidDecoratorArgumentNumber { .. } => DiagnosticCode::InvalidDecoratorArgumentNumber,
            InvalidDecoratorContext => DiagnosticCode::InvalidDecoratorContext,
            InvalidExtensionMetaExtension => DiagnosticCode::InvalidExtensionMetaExtension,
            InvalidNewExpressionOnExtension => DiagnosticCode::InvalidNewExpressionOnExtension,
            InvalidExtendsExtension => DiagnosticCode::InvalidExtendsExtension,
            InvalidExportsExtension => DiagnosticCode::InvalidExportsExtension,
            InvalidInstanceOfExtension => DiagnosticCode::InvalidInstanceOfExtension,
            ForbiddenStaticClassPropertyName(_) => DiagnosticCode::ForbiddenStaticClassPropertyName,
            MissingMetaExtension => DiagnosticCode::MissingMetaExtension,
            InvalidForRangeCall(_) => DiagnosticCode::InvalidForRangeCall,
            UnsupportedNoSelfFunctionConversion(_) => DiagnosticCode::UnsupportedNoSelfFunctionConversion,
            UnsupportedSelfFunctionConversion(_) => DiagnosticCode::UnsupportedSelfFunctionConversion,
            UnsupportedOverloadAssignment(_) => DiagnosticCode::UnsupportedOverloadAssignment,
            InvalidAmbientIdentifierName(_) => DiagnosticCode::InvalidAmbientIdentifierName,
            ReferencedBeforeDeclaration(_) => DiagnosticCode::ReferencedBeforeDeclaration,
        }
    }
}

/// A lowering failure located at a source node.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        CompileError { kind, span }
    }

    pub fn code(&self) -> DiagnosticCode {
        self.kind.code()
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = Diagnostic::error(self.code(), self.kind.to_string()).with_span(self.span);
        if let CompileErrorKind::ReferencedBeforeDeclaration(_) = self.kind {
            builder = builder.with_help("remove `no_hoisting` from tslua.toml to let declarations move");
        }
        builder.build()
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_follow_kind() {
        let kind = CompileErrorKind::unsupported_for_target("Bitwise operations", LuaTarget::Lua51);
        assert_eq!(kind.to_string(), "Bitwise operations is/are not supported for target Lua 5.1.");

        let kind = CompileErrorKind::UnsupportedSelfFunctionConversion(Some("cb".to_string()));
        assert!(kind.to_string().contains("to function \"cb\" with 'this'"));
        let kind = CompileErrorKind::UnsupportedOverloadAssignment(None);
        assert!(kind.to_string().starts_with("Unsupported assignment of function with different overloaded types for 'this'."));
    }

    #[test]
    fn test_diagnostic_carries_code_and_span() {
        let error = CompileError::new(CompileErrorKind::ForbiddenForIn, Span::DUMMY);
        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.code, DiagnosticCode::ForbiddenForIn);
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.message, "Iterating over arrays with 'for ... in' is not allowed.");
    }
}
