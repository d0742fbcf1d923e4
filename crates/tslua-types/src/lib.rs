//! Type model for tslua
//!
//! Types, call signatures and JSDoc directives produced by the checker and
//! consumed by the Lua transformer. Everything here is plain data plus the
//! pure classification helpers (`is_string_like`, `is_falsible`, ...) the
//! lowering rules branch on.

pub mod context;
pub mod directive;
pub mod ty;

pub use context::ContextType;
pub use directive::{DirectiveKind, Directives, UnknownDirective};
pub use ty::{
    ConstValue, FunctionType, LiteralType, NamedKind, NamedType, Parameter, PropertySignature,
    Signature, SymbolRef, Type,
};
