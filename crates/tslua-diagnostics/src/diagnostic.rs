//! Diagnostic values, codes and the fluent builder.

use crate::span::{Label, Span};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Hint,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping of diagnostic codes, mirrored in the hundreds digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    /// TL0xx: input could not be parsed
    Syntax,
    /// TL1xx: a source construct has no lowering rule
    Unsupported,
    /// TL2xx: a declared capability (directive) is used outside its shape
    Capability,
    /// TL3xx: functions with incompatible `this` expectations are mixed
    Type,
    /// TL4xx: identifier cannot be expressed in Lua
    Naming,
    /// TL5xx: declaration order problems
    Ordering,
    /// TL6xx: runtime library problems
    Runtime,
    /// TL7xx: directive comments
    Directive,
    /// TL9xx: tooling failures (I/O, configuration)
    Internal,
}

/// Stable diagnostic codes.
///
/// Lowering errors map one-to-one onto these; see `tslua_transform::CompileErrorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    ParseError,

    UnsupportedKind,
    UnsupportedProperty,
    UnsupportedForTarget,
    UnsupportedFunctionWithoutBody,
    UnsupportedForInVariable,
    UnsupportedImportType,
    UnsupportedNonDestructuringLuaIterator,
    UnsupportedObjectDestructuringInForOf,
    MissingClassName,
    MissingFunctionName,
    InvalidThrowExpression,
    UnknownSuperType,
    UnresolvableRequirePath,
    InvalidJsonFileContent,

    ForbiddenForIn,
    ForbiddenLuaTableNonDeclaration,
    InvalidExtendsLuaTable,
    InvalidInstanceOfLuaTable,
    ForbiddenLuaTableUseException,
    InvalidDecoratorArgumentNumber,
    InvalidDecoratorContext,
    InvalidExtensionMetaExtension,
    InvalidNewExpressionOnExtension,
    InvalidExtendsExtension,
    InvalidExportsExtension,
    InvalidInstanceOfExtension,
    ForbiddenStaticClassPropertyName,
    MissingMetaExtension,
    InvalidForRangeCall,

    UnsupportedNoSelfFunctionConversion,
    UnsupportedSelfFunctionConversion,
    UnsupportedOverloadAssignment,

    InvalidAmbientIdentifierName,

    ReferencedBeforeDeclaration,

    MissingLuaLibFeature,

    UnknownDirective,
    DeprecatedDirectiveSyntax,

    InternalError,
}

impl DiagnosticCode {
    /// Every code, in numeric order.
    pub const ALL: &'static [DiagnosticCode] = &[
        Self::ParseError,
        Self::UnsupportedKind,
        Self::UnsupportedProperty,
        Self::UnsupportedForTarget,
        Self::UnsupportedFunctionWithoutBody,
        Self::UnsupportedForInVariable,
        Self::UnsupportedImportType,
        Self::UnsupportedNonDestructuringLuaIterator,
        Self::UnsupportedObjectDestructuringInForOf,
        Self::MissingClassName,
        Self::MissingFunctionName,
        Self::InvalidThrowExpression,
        Self::UnknownSuperType,
        Self::UnresolvableRequirePath,
        Self::InvalidJsonFileContent,
        Self::ForbiddenForIn,
        Self::ForbiddenLuaTableNonDeclaration,
        Self::InvalidExtendsLuaTable,
        Self::InvalidInstanceOfLuaTable,
        Self::ForbiddenLuaTableUseException,
        Self::InvalidDecoratorArgumentNumber,
        Self::InvalidDecoratorContext,
        Self::InvalidExtensionMetaExtension,
        Self::InvalidNewExpressionOnExtension,
        Self::InvalidExtendsExtension,
        Self::InvalidExportsExtension,
        Self::InvalidInstanceOfExtension,
        Self::ForbiddenStaticClassPropertyName,
        Self::MissingMetaExtension,
        Self::InvalidForRangeCall,
        Self::UnsupportedNoSelfFunctionConversion,
        Self::UnsupportedSelfFunctionConversion,
        Self::UnsupportedOverloadAssignment,
        Self::InvalidAmbientIdentifierName,
        Self::ReferencedBeforeDeclaration,
        Self::MissingLuaLibFeature,
        Self::UnknownDirective,
        Self::DeprecatedDirectiveSyntax,
        Self::InternalError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "TL001",

            Self::UnsupportedKind => "TL101",
            Self::UnsupportedProperty => "TL102",
            Self::UnsupportedForTarget => "TL103",
            Self::UnsupportedFunctionWithoutBody => "TL104",
            Self::UnsupportedForInVariable => "TL105",
            Self::UnsupportedImportType => "TL106",
            Self::UnsupportedNonDestructuringLuaIterator => "TL107",
            Self::UnsupportedObjectDestructuringInForOf => "TL108",
            Self::MissingClassName => "TL109",
            Self::MissingFunctionName => "TL110",
            Self::InvalidThrowExpression => "TL111",
            Self::UnknownSuperType => "TL112",
            Self::UnresolvableRequirePath => "TL113",
            Self::InvalidJsonFileContent => "TL114",

            Self::ForbiddenForIn => "TL201",
            Self::ForbiddenLuaTableNonDeclaration => "TL202",
            Self::InvalidExtendsLuaTable => "TL203",
            Self::InvalidInstanceOfLuaTable => "TL204",
            Self::ForbiddenLuaTableUseException => "TL205",
            Self::InvalidDecoratorArgumentNumber => "TL206",
            Self::InvalidDecoratorContext => "TL207",
            Self::InvalidExtensionMetaExtension => "TL208",
            Self::InvalidNewExpressionOnExtension => "TL209",
            Self::InvalidExtendsExtension => "TL210",
            Self::InvalidExportsExtension => "TL211",
            Self::InvalidInstanceOfExtension => "TL212",
            Self::ForbiddenStaticClassPropertyName => "TL213",
            Self::MissingMetaExtension => "TL214",
            Self::InvalidForRangeCall => "TL215",

            Self::UnsupportedNoSelfFunctionConversion => "TL301",
            Self::UnsupportedSelfFunctionConversion => "TL302",
            Self::UnsupportedOverloadAssignment => "TL303",

            Self::InvalidAmbientIdentifierName => "TL401",

            Self::ReferencedBeforeDeclaration => "TL501",

            Self::MissingLuaLibFeature => "TL601",

            Self::UnknownDirective => "TL701",
            Self::DeprecatedDirectiveSyntax => "TL702",

            Self::InternalError => "TL901",
        }
    }

    /// Look a code up by its `TLxxx` string (case-insensitive).
    pub fn from_code_str(code: &str) -> Option<DiagnosticCode> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    pub fn category(&self) -> DiagnosticCategory {
        let digits = &self.as_str()[2..];
        match digits.as_bytes()[0] {
            b'0' => DiagnosticCategory::Syntax,
            b'1' => DiagnosticCategory::Unsupported,
            b'2' => DiagnosticCategory::Capability,
            b'3' => DiagnosticCategory::Type,
            b'4' => DiagnosticCategory::Naming,
            b'5' => DiagnosticCategory::Ordering,
            b'6' => DiagnosticCategory::Runtime,
            b'7' => DiagnosticCategory::Directive,
            _ => DiagnosticCategory::Internal,
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self.category() {
            DiagnosticCategory::Directive => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Short human title, used by `tslua explain` and the JSON emitter.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::UnsupportedKind => "Unsupported syntax kind",
            Self::UnsupportedProperty => "Unsupported property on a known namespace",
            Self::UnsupportedForTarget => "Unsupported for the configured Lua target",
            Self::UnsupportedFunctionWithoutBody => "Function without a body",
            Self::UnsupportedForInVariable => "Unsupported for-in variable",
            Self::UnsupportedImportType => "Unsupported import form",
            Self::UnsupportedNonDestructuringLuaIterator => {
                "Tuple-returning Lua iterator without destructuring"
            }
            Self::UnsupportedObjectDestructuringInForOf => "Object destructuring in for-of",
            Self::MissingClassName => "Class without a name",
            Self::MissingFunctionName => "Function declaration without a name",
            Self::InvalidThrowExpression => "Throwing a non-string value",
            Self::UnknownSuperType => "Unresolvable super expression",
            Self::UnresolvableRequirePath => "Import outside the root directory",
            Self::InvalidJsonFileContent => "Invalid JSON module",
            Self::ForbiddenForIn => "for-in over an array",
            Self::ForbiddenLuaTableNonDeclaration => "Non-ambient @luaTable class",
            Self::InvalidExtendsLuaTable => "Extending a @luaTable class",
            Self::InvalidInstanceOfLuaTable => "instanceof with a @luaTable class",
            Self::ForbiddenLuaTableUseException => "Invalid @luaTable usage",
            Self::InvalidDecoratorArgumentNumber => "Wrong directive argument count",
            Self::InvalidDecoratorContext => "Decorator with 'this: void'",
            Self::InvalidExtensionMetaExtension => "@extension combined with @metaExtension",
            Self::InvalidNewExpressionOnExtension => "Constructing an extension class",
            Self::InvalidExtendsExtension => "Extending an extension class",
            Self::InvalidExportsExtension => "Exporting an extension class",
            Self::InvalidInstanceOfExtension => "instanceof with an extension class",
            Self::ForbiddenStaticClassPropertyName => "Reserved static member name",
            Self::MissingMetaExtension => "@metaExtension without a base",
            Self::InvalidForRangeCall => "Invalid @forRange call",
            Self::UnsupportedNoSelfFunctionConversion => "Method passed where a function is expected",
            Self::UnsupportedSelfFunctionConversion => "Function passed where a method is expected",
            Self::UnsupportedOverloadAssignment => "Overloads with mixed 'this' types",
            Self::InvalidAmbientIdentifierName => "Invalid ambient identifier name",
            Self::ReferencedBeforeDeclaration => "Referenced before declaration",
            Self::MissingLuaLibFeature => "Missing runtime library feature",
            Self::UnknownDirective => "Unknown directive",
            Self::DeprecatedDirectiveSyntax => "Deprecated '!' directive syntax",
            Self::InternalError => "Internal error",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary information attached to a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// One-line message
    pub message: String,
    /// Optional help text shown under the snippet
    pub help: Option<String>,
    pub span: Span,
    pub labels: Vec<Label>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    pub fn hint(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Hint, message)
    }

    /// Diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                help: None,
                span: Span::DUMMY,
                labels: Vec::new(),
                related: Vec::new(),
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.inner.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_primary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.inner.labels.push(Label::primary(span, message));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.inner.related.push(RelatedInfo {
            span,
            message: message.into(),
        });
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Diagnostics pooled across files.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn hint_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_hint()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Order by file, then offset, so pooled output reads top to bottom.
    pub fn sort_by_location(&mut self) {
        self.items
            .sort_by_key(|d| (d.span.file_id.0, d.span.start, d.span.end));
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    #[test]
    fn test_codes_are_unique_and_parse_back() {
        let mut seen = std::collections::HashSet::new();
        for code in DiagnosticCode::ALL {
            assert!(seen.insert(code.as_str()), "duplicate {}", code);
            assert_eq!(DiagnosticCode::from_code_str(code.as_str()), Some(*code));
        }
        assert_eq!(
            DiagnosticCode::from_code_str("tl501"),
            Some(DiagnosticCode::ReferencedBeforeDeclaration)
        );
        assert_eq!(DiagnosticCode::from_code_str("TL999"), None);
    }

    #[test]
    fn test_category_follows_hundreds_digit() {
        assert_eq!(
            DiagnosticCode::UnsupportedKind.category(),
            DiagnosticCategory::Unsupported
        );
        assert_eq!(
            DiagnosticCode::ForbiddenForIn.category(),
            DiagnosticCategory::Capability
        );
        assert_eq!(
            DiagnosticCode::UnsupportedOverloadAssignment.category(),
            DiagnosticCategory::Type
        );
        assert_eq!(
            DiagnosticCode::ReferencedBeforeDeclaration.category(),
            DiagnosticCategory::Ordering
        );
        assert_eq!(
            DiagnosticCode::UnknownDirective.default_severity(),
            Severity::Warning
        );
    }

    #[test]
    fn test_pool_counts_and_sorting() {
        let mut pool = Diagnostics::new();
        pool.push(
            Diagnostic::new(DiagnosticCode::ForbiddenForIn, "b")
                .with_span(Span::new(FileId(1), 5, 6))
                .build(),
        );
        pool.push(
            Diagnostic::new(DiagnosticCode::UnknownDirective, "a")
                .with_span(Span::new(FileId(0), 9, 10))
                .build(),
        );
        assert_eq!(pool.error_count(), 1);
        assert_eq!(pool.warning_count(), 1);
        pool.sort_by_location();
        assert_eq!(pool.items[0].message, "a");
    }
}
