//! TypeScript parser wrapper using SWC
//!
//! Parses one TypeScript file into an SWC [`Module`], keeping its comments so
//! that JSDoc directives (`@noSelf`, `@tupleReturn`, ...) can be looked up by
//! the checker. Spans produced by SWC live in a per-file `BytePos` space;
//! [`SpanMapper`] turns them into file-relative [`Span`]s for diagnostics.

use swc_common::comments::SingleThreadedComments;
use swc_common::{input::StringInput, sync::Lrc, BytePos, FileName, SourceMap};
use swc_ecma_ast::Module;
use swc_ecma_parser::{lexer::Lexer, Parser, Syntax, TsSyntax};
use thiserror::Error;
use tslua_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, FileId, SourceCache, Span};

pub use swc_common::Spanned;
pub use swc_ecma_ast;

/// Converts SWC positions of one parsed file into diagnostic spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanMapper {
    pub file_id: FileId,
    pub base: BytePos,
}

impl SpanMapper {
    /// Byte offset of `pos` from the start of the file text.
    pub fn offset(&self, pos: BytePos) -> u32 {
        pos.0.saturating_sub(self.base.0)
    }

    pub fn span(&self, span: swc_common::Span) -> Span {
        if span.is_dummy() {
            return Span::DUMMY;
        }
        Span::new(self.file_id, self.offset(span.lo), self.offset(span.hi))
    }
}

pub struct ParseResult {
    pub module: Module,
    pub comments: SingleThreadedComments,
    pub mapper: SpanMapper,
    /// Recoverable syntax errors, reported as warnings
    pub diagnostics: Diagnostics,
}

impl std::fmt::Debug for ParseResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseResult")
            .field("statements", &self.module.body.len())
            .field("mapper", &self.mapper)
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

#[derive(Debug, Error)]
#[error("{}", .diagnostic.message)]
pub struct ParseError {
    pub diagnostic: Diagnostic,
}

fn ts_syntax() -> Syntax {
    Syntax::Typescript(TsSyntax {
        tsx: false,
        decorators: true,
        dts: false,
        no_early_errors: false,
        disallow_ambiguous_jsx_like: false,
    })
}

/// Parses `source`, registering it in `cache` under `filename`.
pub fn parse_typescript_with_cache(
    source: &str,
    filename: &str,
    cache: &mut SourceCache,
) -> Result<ParseResult, ParseError> {
    let file_id = cache.add_file(filename, source.to_string());

    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );
    let mapper = SpanMapper {
        file_id,
        base: source_file.start_pos,
    };

    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        ts_syntax(),
        swc_ecma_ast::EsVersion::Es2022,
        StringInput::from(&*source_file),
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);

    let module = parser.parse_module().map_err(|e| ParseError {
        diagnostic: Diagnostic::error(DiagnosticCode::ParseError, e.kind().msg().to_string())
            .with_span(mapper.span(e.span()))
            .build(),
    })?;

    let mut diagnostics = Diagnostics::new();
    for error in parser.take_errors() {
        diagnostics.push(
            Diagnostic::warning(DiagnosticCode::ParseError, error.kind().msg().to_string())
                .with_span(mapper.span(error.span()))
                .build(),
        );
    }

    Ok(ParseResult {
        module,
        comments,
        mapper,
        diagnostics,
    })
}

/// Parses with a throwaway cache. Mostly used by tests.
pub fn parse_typescript(source: &str, filename: &str) -> Result<ParseResult, ParseError> {
    let mut cache = SourceCache::new();
    parse_typescript_with_cache(source, filename, &mut cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::comments::Comments;

    #[test]
    fn test_parse_namespace_and_class() {
        let source = r#"
            namespace Shapes {
                export class Circle {
                    constructor(public radius: number) {}
                    area(): number { return Math.PI * this.radius ** 2; }
                }
            }
        "#;
        let result = parse_typescript(source, "shapes.ts").unwrap();
        assert_eq!(result.module.body.len(), 1);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_spans_are_file_relative() {
        let source = "let answer = 42;";
        let mut cache = SourceCache::new();
        let result = parse_typescript_with_cache(source, "a.ts", &mut cache).unwrap();
        let span = result.mapper.span(result.module.body[0].span());
        assert_eq!((span.start, span.end), (0, 16));
        assert_eq!(cache.source_text(span), Some(source));
    }

    #[test]
    fn test_keeps_jsdoc_comments() {
        let source = "/** @noSelf */\ndeclare function print(this: void, s: string): void;";
        let result = parse_typescript(source, "decl.ts").unwrap();
        let stmt_lo = result.module.body[0].span().lo;
        let leading = result.comments.get_leading(stmt_lo).unwrap();
        assert!(leading[0].text.contains("@noSelf"));
    }

    #[test]
    fn test_parse_error_carries_span() {
        let err = parse_typescript("let x: number = ;", "bad.ts").unwrap_err();
        assert_eq!(err.diagnostic.code, DiagnosticCode::ParseError);
        assert!(!err.diagnostic.span.is_dummy());
    }
}
