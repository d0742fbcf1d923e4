//! TypeScript to Lua lowering
//!
//! [`LuaTransformer`] walks a parsed and bound TypeScript module and builds
//! the equivalent Lua syntax tree from `tslua-lua-ast`, together with the
//! set of LuaLib helpers the tree calls. Semantic questions (symbols,
//! types, directives) go through a [`tslua_checker::TypeOracle`].

mod access;
mod assignments;
mod builtins;
mod calls;
mod classes;
mod control;
mod destructuring;
pub mod error;
mod expressions;
mod functions;
mod hoisting;
pub mod identifiers;
mod loops;
mod modules;
mod namespaces;
mod operators;
pub mod options;
mod scope;
mod statements;
mod transformer;
mod validation;

#[cfg(test)]
mod testing;

pub use error::{CompileError, CompileErrorKind, Result};
pub use options::{CompilerOptions, LuaTarget};
pub use transformer::LuaTransformer;
pub use tslua_lualib::LuaLibImportKind;
