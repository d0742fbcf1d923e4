//! Diagnostic infrastructure for the tslua compiler.
//!
//! Lowering failures, parse errors and directive warnings all end up as
//! [`Diagnostic`] values. Each carries a stable `TLxxx` code grouped by
//! category (unsupported construct, capability misuse, type
//! incompatibility, naming, ordering), a span into a file held by the
//! [`SourceCache`], and optional help text.
//!
//! # Example
//!
//! ```
//! use tslua_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SimpleEmitter, SourceCache, Span,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("main.ts", "for (const k in arr) {}".to_string());
//!
//! let diag = Diagnostic::new(
//!     DiagnosticCode::ForbiddenForIn,
//!     "Iterating over arrays with 'for ... in' is not allowed.",
//! )
//! .with_span(Span::new(file_id, 0, 23))
//! .with_help("Use 'for ... of' to iterate array elements")
//! .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("main.ts:1:1: error"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{
    Diagnostic, DiagnosticBuilder, DiagnosticCategory, DiagnosticCode, Diagnostics, RelatedInfo,
    Severity,
};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Label, LabelStyle, Location, Span};
