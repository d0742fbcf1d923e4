//! The [`Checker`]: bindings of one file plus lazily computed types.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use swc_common::{BytePos, Span, Spanned};
use swc_ecma_ast::{Class, Expr, Ident, MemberProp, Module, TsType};
use tslua_diagnostics::Diagnostics;
use tslua_parser::{ParseResult, SpanMapper};
use tslua_types::{ConstValue, Directives, NamedKind, Signature, SymbolRef, Type};

use crate::binder::{span_key, Binder, Bindings, DeclSource};
use crate::oracle::{CallSite, ClassInfo, SymbolInfo, TypeOracle};

/// Binds one parsed file and answers type queries about it.
///
/// Types are computed on demand and cached per symbol. Circular
/// references (a variable initialized from itself, a recursive alias)
/// resolve to `any`.
pub struct Checker<'a> {
    pub(crate) module: &'a Module,
    pub(crate) mapper: SpanMapper,
    pub(crate) bindings: Bindings<'a>,
    line_starts: Vec<u32>,
    pub(crate) symbol_types: RefCell<HashMap<SymbolRef, Type>>,
    pub(crate) in_progress: RefCell<HashSet<SymbolRef>>,
    pub(crate) enum_values: RefCell<HashMap<SymbolRef, Option<ConstValue>>>,
}

fn line_starts(source: &str) -> Vec<u32> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i as u32 + 1))
        .collect()
}

impl<'a> Checker<'a> {
    /// Binds `parsed`; `source` is the text it was parsed from.
    pub fn new(parsed: &'a ParseResult, source: &str) -> Self {
        let bindings = Binder::new(&parsed.comments, parsed.mapper).bind(&parsed.module);
        log::debug!(
            "bound {} symbols, {} function-like nodes",
            bindings.symbols.len(),
            bindings.functions.len()
        );
        Checker {
            module: &parsed.module,
            mapper: parsed.mapper,
            bindings,
            line_starts: line_starts(source),
            symbol_types: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
            enum_values: RefCell::new(HashMap::new()),
        }
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    /// Directive warnings found while binding.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.bindings.diagnostics
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolRef, &SymbolInfo)> {
        self.bindings
            .symbols
            .iter()
            .enumerate()
            .map(|(i, data)| (SymbolRef(i as u32), &data.info))
    }

    /// First symbol declared with `name` in the file, builtins excluded.
    pub fn lookup(&self, name: &str) -> Option<SymbolRef> {
        self.symbols()
            .find(|(_, info)| info.name == name && !info.declarations.is_empty())
            .map(|(symbol, _)| symbol)
    }

    pub(crate) fn function_record_type_at(&self, pos: BytePos) -> Option<Type> {
        let record = self.bindings.functions.get(&pos)?;
        Some(Type::function(self.record_signature(record), record.symbol))
    }

    pub(crate) fn callee_signatures(&self, ty: &Type, arity: usize) -> Option<Signature> {
        let signatures = ty.call_signatures();
        let fits = |signature: &&Signature| {
            let required = signature
                .params
                .iter()
                .filter(|p| !p.optional && !p.rest)
                .count();
            let rest = signature.params.iter().any(|p| p.rest);
            required <= arity && (rest || signature.params.len() >= arity)
        };
        signatures
            .iter()
            .find(|signature| fits(*signature))
            .or_else(|| signatures.first())
            .map(|signature| (*signature).clone())
    }
}

impl<'a> TypeOracle for Checker<'a> {
    fn symbol_at(&self, ident: &Ident) -> Option<SymbolRef> {
        self.bindings.value_refs.get(&ident.span.lo).copied()
    }

    fn symbol(&self, symbol: SymbolRef) -> &SymbolInfo {
        &self.bindings.data(symbol).info
    }

    fn type_of_expr(&self, expr: &Expr) -> Type {
        self.expr_type(expr)
    }

    fn type_of_symbol(&self, symbol: SymbolRef) -> Type {
        self.symbol_type(symbol)
    }

    fn annotation_type(&self, ty: &TsType) -> Type {
        self.annotation(ty)
    }

    fn resolved_signature(&self, site: CallSite<'_>) -> Option<Signature> {
        match site {
            CallSite::Call(call) => {
                let swc_ecma_ast::Callee::Expr(callee) = &call.callee else {
                    return None;
                };
                let ty = self.expr_type(callee);
                self.callee_signatures(&ty, call.args.len())
            }
            CallSite::New(new) => {
                let arity = new.args.as_ref().map_or(0, Vec::len);
                self.construct_signature(&self.expr_type(&new.callee), arity)
            }
            CallSite::TaggedTemplate(tagged) => {
                let ty = self.expr_type(&tagged.tag);
                self.callee_signatures(&ty, tagged.tpl.exprs.len() + 1)
            }
        }
    }

    fn function_type(&self, span: Span) -> Option<Type> {
        let record = self.bindings.functions.get(&span.lo)?;
        match record.symbol {
            Some(symbol) if matches!(self.bindings.data(symbol).sources.first(), Some(DeclSource::Function(_))) => {
                Some(self.symbol_type(symbol))
            }
            _ => self.function_record_type_at(span.lo),
        }
    }

    fn contextual_type(&self, expr: &Expr) -> Option<Type> {
        self.contextual_type_at(span_key(expr.span()))
    }

    fn property_type(&self, ty: &Type, name: &str) -> Type {
        self.member_type(ty, name)
    }

    fn member_names(&self, ty: &Type) -> Vec<String> {
        self.declared_member_names(ty)
    }

    fn class_info(&self, class: SymbolRef) -> Option<&ClassInfo> {
        self.bindings.classes.get(&class).map(|data| &data.info)
    }

    fn class_symbol(&self, class: &Class) -> Option<SymbolRef> {
        self.bindings.class_symbols.get(&class.span.lo).copied()
    }

    fn file_directives(&self) -> &Directives {
        &self.bindings.file_directives
    }

    fn module_directives(&self, specifier: &str) -> Directives {
        self.bindings
            .module_directives
            .get(specifier)
            .cloned()
            .unwrap_or_default()
    }

    fn const_value(&self, expr: &Expr) -> Option<ConstValue> {
        match expr {
            Expr::Paren(paren) => self.const_value(&paren.expr),
            Expr::Member(member) => {
                let name = match &member.prop {
                    MemberProp::Ident(ident) => ident.sym.to_string(),
                    MemberProp::Computed(computed) => match &*computed.expr {
                        Expr::Lit(swc_ecma_ast::Lit::Str(s)) => s.value.as_str().unwrap_or("").to_string(),
                        _ => return None,
                    },
                    MemberProp::PrivateName(_) => return None,
                };
                match self.expr_type(&member.obj) {
                    Type::Named(named) if named.kind == NamedKind::Enum => {
                        self.enum_member_value(named.symbol?, &name)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn enum_member_value(&self, enumeration: SymbolRef, member: &str) -> Option<ConstValue> {
        let member = *self.bindings.data(enumeration).exports.get(member)?;
        self.member_value(member)
    }

    fn is_value_referenced(&self, symbol: SymbolRef) -> bool {
        self.bindings.value_reads.get(&symbol).copied().unwrap_or(0) > 0
    }

    fn is_module(&self) -> bool {
        self.bindings.is_module
    }

    fn line_column(&self, pos: BytePos) -> Option<(u32, u32)> {
        if pos.0 < self.mapper.base.0 {
            return None;
        }
        let offset = self.mapper.offset(pos);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Some((line as u32, offset - self.line_starts[line]))
    }

    fn offset(&self, pos: BytePos) -> u32 {
        self.mapper.offset(pos)
    }

    fn source_span(&self, span: Span) -> tslua_diagnostics::Span {
        self.mapper.span(span)
    }
}
