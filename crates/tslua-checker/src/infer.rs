//! Best-effort type inference.
//!
//! Annotations are converted structurally; unannotated bindings take the
//! type of their initializer (widened unless `const`), parameters of
//! function expressions take the type their contextual signature gives
//! them. Anything the checker cannot see through is `any`.

use swc_ecma_ast::*;
use tslua_types::{
    ConstValue, ContextType, LiteralType, NamedKind, NamedType, Parameter, PropertySignature,
    Signature, SymbolRef, Type,
};

use crate::binder::{
    key_expr_text, prop_name_text, ContextSource, DeclSource, FunctionKind, FunctionRecord,
    PatStep, SpanKey, ThisBinding, VarInit,
};
use crate::builtins;
use crate::checker::Checker;
use crate::oracle::{CallSite, SymbolKind, TypeOracle};

/// Literal types widen to their primitive in mutable positions.
pub(crate) fn widen(ty: Type) -> Type {
    match ty {
        Type::Literal(LiteralType::Number(_)) => Type::Number,
        Type::Literal(LiteralType::String(_)) => Type::String,
        Type::Literal(LiteralType::Boolean(_)) => Type::Boolean,
        Type::Literal(LiteralType::BigInt(_)) => Type::BigInt,
        Type::Union(members) => Type::union(members.into_iter().map(widen)),
        other => other,
    }
}

fn keyword(kind: TsKeywordTypeKind) -> Type {
    match kind {
        TsKeywordTypeKind::TsAnyKeyword => Type::Any,
        TsKeywordTypeKind::TsUnknownKeyword => Type::Unknown,
        TsKeywordTypeKind::TsNumberKeyword => Type::Number,
        TsKeywordTypeKind::TsObjectKeyword => Type::Object,
        TsKeywordTypeKind::TsBooleanKeyword => Type::Boolean,
        TsKeywordTypeKind::TsBigIntKeyword => Type::BigInt,
        TsKeywordTypeKind::TsStringKeyword => Type::String,
        TsKeywordTypeKind::TsSymbolKeyword => Type::EsSymbol,
        TsKeywordTypeKind::TsVoidKeyword => Type::Void,
        TsKeywordTypeKind::TsUndefinedKeyword => Type::Undefined,
        TsKeywordTypeKind::TsNullKeyword => Type::Null,
        TsKeywordTypeKind::TsNeverKeyword => Type::Never,
        TsKeywordTypeKind::TsIntrinsicKeyword => Type::Any,
    }
}

fn str_value(s: &Str) -> String {
    s.value.as_str().unwrap_or("").to_string()
}

fn num_value(value: &ConstValue) -> Option<f64> {
    match value {
        ConstValue::Number(n) => Some(*n),
        ConstValue::String(_) => None,
    }
}

fn named(name: &str, symbol: SymbolRef, kind: NamedKind) -> Type {
    Type::Named(NamedType {
        name: name.to_string(),
        symbol: Some(symbol),
        kind,
        args: Vec::new(),
    })
}

impl<'a> Checker<'a> {
    // ----- annotations -----

    pub(crate) fn annotation(&self, ty: &TsType) -> Type {
        match ty {
            TsType::TsKeywordType(keyword_type) => keyword(keyword_type.kind),
            TsType::TsThisType(_) => Type::Any,
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsFnType(function)) => {
                let mut signature = Signature::new(
                    self.fn_params(&function.params),
                    self.annotation(&function.type_ann.type_ann),
                    ContextType::NonVoid,
                );
                if let Some(site) = self.bindings.type_sites.get(&function.span.lo) {
                    signature.context = site.context;
                    signature.directives = site.directives.clone();
                    signature.declared_in_type = site.declared_in_type;
                }
                Type::function(signature, None)
            }
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsConstructorType(constructor)) => {
                Type::function(
                    Signature::new(
                        self.fn_params(&constructor.params),
                        self.annotation(&constructor.type_ann.type_ann),
                        ContextType::NonVoid,
                    ),
                    None,
                )
            }
            TsType::TsTypeRef(reference) => {
                let args: Vec<Type> = reference
                    .type_params
                    .as_ref()
                    .map(|params| params.params.iter().map(|p| self.annotation(p)).collect())
                    .unwrap_or_default();
                match self.resolve_type_entity(&reference.type_name) {
                    Some(symbol) => self.declared_type(symbol, args),
                    None => match &reference.type_name {
                        TsEntityName::Ident(ident) => {
                            builtins::annotation_type(&ident.sym, args).unwrap_or(Type::Any)
                        }
                        TsEntityName::TsQualifiedName(_) => Type::Any,
                    },
                }
            }
            TsType::TsTypeQuery(query) => match &query.expr_name {
                TsTypeQueryExpr::TsEntityName(entity) => self
                    .resolve_value_entity(entity)
                    .map_or(Type::Any, |symbol| self.symbol_type(symbol)),
                TsTypeQueryExpr::Import(_) => Type::Any,
            },
            TsType::TsTypeLit(literal) => self.type_literal(&literal.members),
            TsType::TsArrayType(array) => Type::Array(Box::new(self.annotation(&array.elem_type))),
            TsType::TsTupleType(tuple) => {
                Type::Tuple(tuple.elem_types.iter().map(|e| self.annotation(&e.ty)).collect())
            }
            TsType::TsOptionalType(optional) => {
                Type::union([self.annotation(&optional.type_ann), Type::Undefined])
            }
            TsType::TsRestType(rest) => self.annotation(&rest.type_ann),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(union)) => {
                Type::union(union.types.iter().map(|t| self.annotation(t)))
            }
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(intersection)) => {
                Type::Intersection(intersection.types.iter().map(|t| self.annotation(t)).collect())
            }
            TsType::TsParenthesizedType(paren) => self.annotation(&paren.type_ann),
            TsType::TsTypeOperator(operator) => match operator.op {
                TsTypeOperatorOp::KeyOf => Type::String,
                TsTypeOperatorOp::Unique => Type::EsSymbol,
                TsTypeOperatorOp::ReadOnly => self.annotation(&operator.type_ann),
            },
            TsType::TsLitType(literal) => match &literal.lit {
                TsLit::Number(n) => Type::Literal(LiteralType::Number(n.value)),
                TsLit::Str(s) => Type::Literal(LiteralType::String(str_value(s))),
                TsLit::Bool(b) => Type::Literal(LiteralType::Boolean(b.value)),
                TsLit::BigInt(b) => Type::Literal(LiteralType::BigInt(b.value.to_string())),
                TsLit::Tpl(_) => Type::String,
            },
            TsType::TsTypePredicate(_) => Type::Boolean,
            TsType::TsIndexedAccessType(access) => {
                let object = self.annotation(&access.obj_type);
                match &*access.index_type {
                    TsType::TsLitType(TsLitType {
                        lit: TsLit::Str(s), ..
                    }) => self.member_type(&object, &str_value(s)),
                    TsType::TsKeywordType(TsKeywordType {
                        kind: TsKeywordTypeKind::TsNumberKeyword,
                        ..
                    }) => match object.resolved() {
                        Type::Tuple(members) => Type::union(members.iter().cloned()),
                        other => other.element_type().cloned().unwrap_or(Type::Any),
                    },
                    _ => Type::Any,
                }
            }
            _ => Type::Any,
        }
    }

    pub(crate) fn fn_params(&self, params: &[TsFnParam]) -> Vec<Parameter> {
        params
            .iter()
            .filter_map(|param| match param {
                TsFnParam::Ident(ident) if &*ident.id.sym == "this" => None,
                TsFnParam::Ident(ident) => Some(Parameter {
                    name: ident.id.sym.to_string(),
                    ty: ident
                        .type_ann
                        .as_ref()
                        .map_or(Type::Any, |ann| self.annotation(&ann.type_ann)),
                    optional: ident.id.optional,
                    rest: false,
                }),
                TsFnParam::Rest(rest) => Some(Parameter {
                    name: match &*rest.arg {
                        Pat::Ident(ident) => ident.id.sym.to_string(),
                        _ => "args".to_string(),
                    },
                    ty: rest
                        .type_ann
                        .as_ref()
                        .map_or(Type::Array(Box::new(Type::Any)), |ann| self.annotation(&ann.type_ann)),
                    optional: false,
                    rest: true,
                }),
                TsFnParam::Array(array) => Some(Parameter {
                    name: "____".to_string(),
                    ty: array.type_ann.as_ref().map_or(Type::Any, |ann| self.annotation(&ann.type_ann)),
                    optional: array.optional,
                    rest: false,
                }),
                TsFnParam::Object(object) => Some(Parameter {
                    name: "____".to_string(),
                    ty: object.type_ann.as_ref().map_or(Type::Any, |ann| self.annotation(&ann.type_ann)),
                    optional: object.optional,
                    rest: false,
                }),
            })
            .collect()
    }

    fn element_signature(&self, pos: swc_common::BytePos, params: &[TsFnParam], ret: Option<&TsTypeAnn>) -> Signature {
        let mut signature = Signature::new(
            self.fn_params(params),
            ret.map_or(Type::Any, |ann| self.annotation(&ann.type_ann)),
            ContextType::NonVoid,
        );
        if let Some(site) = self.bindings.type_sites.get(&pos) {
            signature.context = site.context;
            signature.directives = site.directives.clone();
            signature.declared_in_type = site.declared_in_type;
        }
        signature
    }

    /// Object type literal; one made only of call signatures is a function
    /// type.
    fn type_literal(&self, members: &[TsTypeElement]) -> Type {
        let calls: Vec<Signature> = members
            .iter()
            .filter_map(|member| match member {
                TsTypeElement::TsCallSignatureDecl(call) => {
                    Some(self.element_signature(call.span.lo, &call.params, call.type_ann.as_deref()))
                }
                _ => None,
            })
            .collect();
        if !calls.is_empty() && calls.len() == members.len() {
            return Type::Function(Box::new(tslua_types::FunctionType {
                signatures: calls,
                symbol: None,
            }));
        }
        let mut properties: Vec<PropertySignature> = Vec::new();
        for member in members {
            let Some(name) = self.element_name(member) else { continue };
            let Some(ty) = self.element_type(members, member, &name) else { continue };
            if properties.iter().all(|p| p.name != name) {
                let optional = matches!(member, TsTypeElement::TsPropertySignature(p) if p.optional);
                properties.push(PropertySignature { name, ty, optional });
            }
        }
        Type::ObjectLiteral(properties)
    }

    fn element_name(&self, member: &TsTypeElement) -> Option<String> {
        match member {
            TsTypeElement::TsPropertySignature(p) => key_expr_text(&p.key),
            TsTypeElement::TsMethodSignature(m) => key_expr_text(&m.key),
            TsTypeElement::TsGetterSignature(g) => key_expr_text(&g.key),
            TsTypeElement::TsSetterSignature(s) => key_expr_text(&s.key),
            _ => None,
        }
    }

    /// Type of member `name` among type elements; method overloads merge.
    fn element_type(&self, members: &[TsTypeElement], member: &TsTypeElement, name: &str) -> Option<Type> {
        match member {
            TsTypeElement::TsPropertySignature(property) => {
                let ty = property
                    .type_ann
                    .as_ref()
                    .map_or(Type::Any, |ann| self.annotation(&ann.type_ann));
                Some(if property.optional {
                    Type::union([ty, Type::Undefined])
                } else {
                    ty
                })
            }
            TsTypeElement::TsMethodSignature(_) => {
                let signatures: Vec<Signature> = members
                    .iter()
                    .filter_map(|other| match other {
                        TsTypeElement::TsMethodSignature(method) if key_expr_text(&method.key).as_deref() == Some(name) => {
                            Some(self.element_signature(method.span.lo, &method.params, method.type_ann.as_deref()))
                        }
                        _ => None,
                    })
                    .collect();
                Some(Type::Function(Box::new(tslua_types::FunctionType {
                    signatures,
                    symbol: None,
                })))
            }
            TsTypeElement::TsGetterSignature(getter) => Some(
                getter
                    .type_ann
                    .as_ref()
                    .map_or(Type::Any, |ann| self.annotation(&ann.type_ann)),
            ),
            TsTypeElement::TsSetterSignature(_) => Some(Type::Any),
            _ => None,
        }
    }

    fn resolve_type_entity(&self, entity: &TsEntityName) -> Option<SymbolRef> {
        match entity {
            TsEntityName::Ident(ident) => self.bindings.type_refs.get(&ident.span.lo).copied(),
            TsEntityName::TsQualifiedName(qualified) => {
                let namespace = self.resolve_value_entity(&qualified.left)?;
                let data = self.bindings.data(namespace);
                data.type_exports
                    .get(&*qualified.right.sym)
                    .or_else(|| data.exports.get(&*qualified.right.sym))
                    .copied()
            }
        }
    }

    fn resolve_value_entity(&self, entity: &TsEntityName) -> Option<SymbolRef> {
        match entity {
            TsEntityName::Ident(ident) => self.bindings.value_refs.get(&ident.span.lo).copied(),
            TsEntityName::TsQualifiedName(qualified) => {
                let namespace = self.resolve_value_entity(&qualified.left)?;
                self.bindings.data(namespace).exports.get(&*qualified.right.sym).copied()
            }
        }
    }

    /// Type named by a reference to a type symbol.
    fn declared_type(&self, symbol: SymbolRef, args: Vec<Type>) -> Type {
        let data = self.bindings.data(symbol);
        let info = &data.info;
        match info.kind {
            SymbolKind::Class => Type::Named(NamedType {
                name: info.name.clone(),
                symbol: Some(symbol),
                kind: NamedKind::Class,
                args,
            }),
            SymbolKind::Interface => {
                let calls: Vec<Signature> = data
                    .sources
                    .iter()
                    .filter_map(|source| match source {
                        DeclSource::Interface(interface) => Some(interface),
                        _ => None,
                    })
                    .flat_map(|interface| interface.body.body.iter())
                    .filter_map(|member| match member {
                        TsTypeElement::TsCallSignatureDecl(call) => Some(self.element_signature(
                            call.span.lo,
                            &call.params,
                            call.type_ann.as_deref(),
                        )),
                        _ => None,
                    })
                    .collect();
                if calls.is_empty() {
                    Type::Named(NamedType {
                        name: info.name.clone(),
                        symbol: Some(symbol),
                        kind: NamedKind::Interface,
                        args,
                    })
                } else {
                    Type::Function(Box::new(tslua_types::FunctionType {
                        signatures: calls,
                        symbol: Some(symbol),
                    }))
                }
            }
            SymbolKind::TypeAlias => {
                let Some(DeclSource::TypeAlias(alias)) = data.sources.first() else {
                    return Type::Any;
                };
                if !self.in_progress.borrow_mut().insert(symbol) {
                    return Type::Any;
                }
                let target = self.annotation(&alias.type_ann);
                self.in_progress.borrow_mut().remove(&symbol);
                if info.directives.is_empty() {
                    target
                } else {
                    Type::Alias {
                        symbol,
                        target: Box::new(target),
                    }
                }
            }
            SymbolKind::TypeParameter => {
                let constraint = match data.sources.first() {
                    Some(DeclSource::TypeParameter(param)) => param.constraint.as_ref().map(|c| Box::new(self.annotation(c))),
                    _ => None,
                };
                Type::TypeParameter {
                    name: info.name.clone(),
                    constraint,
                }
            }
            SymbolKind::Enum | SymbolKind::EnumMember => {
                let string_enum = data.sources.iter().any(|source| {
                    matches!(source, DeclSource::Enum(decl) if decl.members.iter().all(|m| matches!(m.init.as_deref(), Some(Expr::Lit(Lit::Str(_))))))
                });
                if string_enum {
                    Type::String
                } else {
                    Type::Number
                }
            }
            SymbolKind::Namespace => named(&info.name, symbol, NamedKind::Namespace),
            SymbolKind::Builtin => builtins::annotation_type(&info.name, args).unwrap_or(Type::Any),
            _ => Type::Any,
        }
    }

    // ----- symbols -----

    pub(crate) fn symbol_type(&self, symbol: SymbolRef) -> Type {
        if let Some(ty) = self.symbol_types.borrow().get(&symbol) {
            return ty.clone();
        }
        if !self.in_progress.borrow_mut().insert(symbol) {
            return Type::Any;
        }
        let ty = self.compute_symbol_type(symbol);
        self.in_progress.borrow_mut().remove(&symbol);
        self.symbol_types.borrow_mut().insert(symbol, ty.clone());
        ty
    }

    fn compute_symbol_type(&self, symbol: SymbolRef) -> Type {
        let data = self.bindings.data(symbol);
        let info = &data.info;
        match info.kind {
            SymbolKind::Builtin => builtins::global_value_type(&info.name, symbol),
            SymbolKind::Class => named(&info.name, symbol, NamedKind::ClassConstructor),
            SymbolKind::Enum => named(&info.name, symbol, NamedKind::Enum),
            SymbolKind::Namespace => named(&info.name, symbol, NamedKind::Namespace),
            SymbolKind::EnumMember => match self.member_value(symbol) {
                Some(ConstValue::Number(n)) => Type::Literal(LiteralType::Number(n)),
                Some(ConstValue::String(s)) => Type::Literal(LiteralType::String(s)),
                None => Type::Number,
            },
            SymbolKind::Function => {
                let records: Vec<&FunctionRecord> = data
                    .sources
                    .iter()
                    .filter_map(|source| match source {
                        DeclSource::Function(function) => self.bindings.functions.get(&function.span.lo),
                        _ => None,
                    })
                    .collect();
                let overloads: Vec<&&FunctionRecord> = records.iter().filter(|r| !r.has_body).collect();
                let chosen: Vec<&FunctionRecord> = if overloads.is_empty() || records.len() == overloads.len() {
                    records.clone()
                } else {
                    overloads.into_iter().copied().collect()
                };
                Type::Function(Box::new(tslua_types::FunctionType {
                    signatures: chosen.into_iter().map(|r| self.record_signature(r)).collect(),
                    symbol: Some(symbol),
                }))
            }
            SymbolKind::Variable | SymbolKind::Parameter => match data.sources.first() {
                Some(DeclSource::Variable {
                    annotation,
                    init,
                    path,
                    is_const,
                }) => {
                    let base = match (annotation, init) {
                        (Some(annotation), _) => return self.annotation(annotation),
                        (None, VarInit::Expr(expr)) => {
                            let ty = self.expr_type(expr);
                            if *is_const && path.is_empty() {
                                ty
                            } else {
                                widen(ty)
                            }
                        }
                        (None, VarInit::ForOf(iterable)) => {
                            let iterable = self.expr_type(iterable);
                            self.iterated_type(&iterable)
                        }
                        (None, VarInit::ForIn) => Type::String,
                        (None, VarInit::None) => Type::Any,
                    };
                    widen_path(self.project(base, path), path)
                }
                Some(DeclSource::Parameter {
                    annotation,
                    function,
                    index,
                    default,
                    path,
                }) => {
                    if let Some(annotation) = annotation {
                        return self.annotation(annotation);
                    }
                    let base = self
                        .bindings
                        .functions
                        .get(function)
                        .and_then(|record| self.contextual_signature(record))
                        .and_then(|signature| signature.param_type(*index).cloned())
                        .or_else(|| default.map(|d| widen(self.expr_type(d))))
                        .unwrap_or(Type::Any);
                    self.project(base, path)
                }
                _ => Type::Any,
            },
            SymbolKind::Import => match data.sources.first() {
                Some(DeclSource::ImportAlias(entity)) => self
                    .resolve_value_entity(entity)
                    .map_or(Type::Any, |target| self.symbol_type(target)),
                _ => Type::Any,
            },
            _ => Type::Any,
        }
    }

    /// Element type produced by iterating `ty` with `for...of`.
    fn iterated_type(&self, ty: &Type) -> Type {
        match ty.resolved() {
            Type::Tuple(members) => Type::union(members.iter().cloned()),
            Type::String | Type::Literal(LiteralType::String(_)) => Type::String,
            other => other.element_type().cloned().unwrap_or(Type::Any),
        }
    }

    /// Type of the binding reached by following `path` into `ty`.
    fn project(&self, ty: Type, path: &[PatStep]) -> Type {
        path.iter().fold(ty, |ty, step| match step {
            PatStep::Index(index) => match ty.resolved() {
                Type::Tuple(members) => members.get(*index).cloned().unwrap_or(Type::Undefined),
                other => other.element_type().cloned().unwrap_or(Type::Any),
            },
            PatStep::Rest(index) => match ty.resolved() {
                Type::Tuple(members) => Type::Tuple(members.iter().skip(*index).cloned().collect()),
                other => Type::Array(Box::new(other.element_type().cloned().unwrap_or(Type::Any))),
            },
            PatStep::Key(name) => self.member_type(&ty, name),
            PatStep::ObjectRest => Type::Any,
        })
    }

    // ----- functions -----

    /// Call signature of the contextual type of a function expression.
    pub(crate) fn contextual_signature(&self, record: &FunctionRecord) -> Option<Signature> {
        let key = record.context_key?;
        let contextual = self.contextual_type_at(key)?;
        self.callee_signatures(&contextual.non_nullable(), record.params.len())
    }

    pub(crate) fn record_signature(&self, record: &FunctionRecord) -> Signature {
        let contextual = self.contextual_signature(record);
        let params = record
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                let ty = match param.annotation {
                    Some(annotation) => self.annotation(annotation),
                    None => contextual
                        .as_ref()
                        .and_then(|signature| signature.param_type(index).cloned())
                        .or_else(|| param.default.map(|d| widen(self.expr_type(d))))
                        .unwrap_or_else(|| {
                            if param.rest {
                                Type::Array(Box::new(Type::Any))
                            } else {
                                Type::Any
                            }
                        }),
                };
                Parameter {
                    name: param.name.clone(),
                    ty,
                    optional: param.optional,
                    rest: param.rest,
                }
            })
            .collect();

        let return_type = match (record.return_annotation, record.expression_body, record.kind) {
            (Some(annotation), _, _) => self.annotation(annotation),
            (None, _, FunctionKind::Constructor) => match record.class {
                Some(class) => self.instance_type(class),
                None => Type::Any,
            },
            (None, Some(body), _) => widen(self.expr_type(body)),
            (None, None, _) => match &contextual {
                Some(signature) => signature.return_type.clone(),
                None => Type::Any,
            },
        };

        let mut signature = Signature::new(params, return_type, record.context);
        signature.directives = record.directives.clone();
        if record.context_key.is_some() && !record.explicit_this {
            if let Some(contextual) = record.context_key.and_then(|key| self.contextual_type_at(key)) {
                let context = self.function_context_type(&contextual.non_nullable());
                if context != ContextType::None {
                    signature.inferred_context = Some(context);
                }
            }
        }
        signature
    }

    fn instance_type(&self, class: SymbolRef) -> Type {
        named(&self.bindings.data(class).info.name, class, NamedKind::Class)
    }

    pub(crate) fn construct_signature(&self, callee: &Type, arity: usize) -> Option<Signature> {
        match callee.resolved() {
            Type::Named(named) if named.kind == NamedKind::ClassConstructor => {
                Some(self.class_constructor_signature(named.symbol?))
            }
            Type::Named(named) if named.kind == NamedKind::Builtin => {
                let instance = builtins::constructed_type(&named.name, named.args.clone())?;
                let rest = Parameter {
                    name: "args".to_string(),
                    ty: Type::Array(Box::new(Type::Any)),
                    optional: false,
                    rest: true,
                };
                Some(Signature::new(vec![rest], instance, ContextType::NonVoid))
            }
            other => self.callee_signatures(other, arity),
        }
    }

    fn class_constructor_signature(&self, class: SymbolRef) -> Signature {
        let mut current = Some(class);
        let mut guard = 0;
        while let Some(symbol) = current {
            let Some(data) = self.bindings.classes.get(&symbol) else { break };
            let constructor = data.class.body.iter().find_map(|member| match member {
                ClassMember::Constructor(constructor) => self.bindings.functions.get(&constructor.span.lo),
                _ => None,
            });
            if let Some(record) = constructor {
                let mut signature = self.record_signature(record);
                signature.return_type = self.instance_type(class);
                return signature;
            }
            current = data.extends;
            guard += 1;
            if guard > 64 {
                break;
            }
        }
        Signature::new(Vec::new(), self.instance_type(class), ContextType::NonVoid)
    }

    // ----- contextual types -----

    pub(crate) fn contextual_type_at(&self, key: SpanKey) -> Option<Type> {
        match self.bindings.contexts.get(&key)? {
            ContextSource::Annotation(ty) => Some(self.annotation(ty)),
            ContextSource::Argument { site, index } => {
                let signature = self.resolved_signature(*site)?;
                signature.param_type(*index).cloned()
            }
            ContextSource::Return { function } => {
                let record = self.bindings.functions.get(function)?;
                match record.return_annotation {
                    Some(annotation) => Some(self.annotation(annotation)),
                    None => self.contextual_signature(record).map(|s| s.return_type),
                }
            }
            ContextSource::Symbol(symbol) => Some(self.symbol_type(*symbol)),
            ContextSource::Member(member) => Some(self.member_expr_type(member)),
            ContextSource::Property { object, name } => {
                let object = self.contextual_type_at(*object)?;
                Some(self.member_type(&object.non_nullable(), name))
            }
            ContextSource::Element { array, index } => {
                let array = self.contextual_type_at(*array)?;
                match array.resolved() {
                    Type::Tuple(members) => members.get(*index).cloned(),
                    other => other.element_type().cloned(),
                }
            }
        }
    }

    // ----- members -----

    pub(crate) fn member_type(&self, ty: &Type, name: &str) -> Type {
        match ty.resolved() {
            Type::String | Type::Literal(LiteralType::String(_)) => builtins::string_member(name),
            Type::Array(element) => builtins::array_member(element, name),
            Type::Tuple(members) => match name.parse::<usize>() {
                Ok(index) => members.get(index).cloned().unwrap_or(Type::Undefined),
                Err(_) if name == "length" => Type::Number,
                Err(_) => builtins::array_member(&Type::union(members.iter().cloned()), name),
            },
            Type::ObjectLiteral(properties) => properties
                .iter()
                .find(|p| p.name == name)
                .map_or(Type::Any, |p| p.ty.clone()),
            Type::Union(members) => {
                let found: Vec<Type> = members
                    .iter()
                    .filter(|m| !matches!(m, Type::Undefined | Type::Null))
                    .map(|m| self.member_type(m, name))
                    .collect();
                if found.iter().any(Type::is_any) {
                    Type::Any
                } else {
                    Type::union(found)
                }
            }
            Type::Intersection(members) => members
                .iter()
                .map(|m| self.member_type(m, name))
                .find(|t| !t.is_any())
                .unwrap_or(Type::Any),
            Type::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.member_type(constraint, name),
            Type::Named(named) => self.named_member(named, name),
            _ => Type::Any,
        }
    }

    fn named_member(&self, named: &NamedType, name: &str) -> Type {
        let Some(symbol) = named.symbol else {
            return builtins::named_member(named, name);
        };
        match named.kind {
            NamedKind::Builtin => builtins::named_member(named, name),
            NamedKind::Class => self.class_member(symbol, name, false),
            NamedKind::ClassConstructor => self.class_member(symbol, name, true),
            NamedKind::Interface => self.interface_member(symbol, name).unwrap_or(Type::Any),
            NamedKind::Enum | NamedKind::Namespace => self
                .bindings
                .data(symbol)
                .exports
                .get(name)
                .map_or(Type::Any, |member| self.symbol_type(*member)),
        }
    }

    /// Names of the members declared by an object type or interface
    /// (including inherited interfaces).
    pub(crate) fn declared_member_names(&self, ty: &Type) -> Vec<String> {
        match ty.resolved() {
            Type::ObjectLiteral(properties) => properties.iter().map(|p| p.name.clone()).collect(),
            Type::Named(NamedType {
                kind: NamedKind::Interface,
                symbol: Some(symbol),
                ..
            }) => {
                let mut names = Vec::new();
                let mut pending = vec![*symbol];
                let mut visited = Vec::new();
                while let Some(current) = pending.pop() {
                    if visited.contains(&current) {
                        continue;
                    }
                    visited.push(current);
                    for source in &self.bindings.data(current).sources {
                        let DeclSource::Interface(interface) = source else { continue };
                        for member in &interface.body.body {
                            if let Some(name) = self.element_name(member) {
                                if !names.contains(&name) {
                                    names.push(name);
                                }
                            }
                        }
                        for heritage in &interface.extends {
                            if let Expr::Ident(ident) = &*heritage.expr {
                                if let Some(base) = self.bindings.type_refs.get(&ident.span.lo) {
                                    pending.push(*base);
                                }
                            }
                        }
                    }
                }
                names
            }
            _ => Vec::new(),
        }
    }

    fn interface_member(&self, symbol: SymbolRef, name: &str) -> Option<Type> {
        let mut pending = vec![symbol];
        let mut visited = Vec::new();
        while let Some(current) = pending.pop() {
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            for source in &self.bindings.data(current).sources {
                let DeclSource::Interface(interface) = source else { continue };
                let members = &interface.body.body;
                for member in members {
                    if self.element_name(member).as_deref() == Some(name) {
                        if let Some(ty) = self.element_type(members, member, name) {
                            return Some(ty);
                        }
                    }
                }
                for heritage in &interface.extends {
                    if let Expr::Ident(ident) = &*heritage.expr {
                        if let Some(base) = self.bindings.type_refs.get(&ident.span.lo) {
                            pending.push(*base);
                        }
                    }
                }
            }
        }
        None
    }

    fn class_member(&self, class: SymbolRef, name: &str, is_static: bool) -> Type {
        let mut current = Some(class);
        let mut guard = 0;
        while let Some(symbol) = current {
            if let Some(ty) = self.own_class_member(symbol, name, is_static) {
                return ty;
            }
            if !is_static {
                if let Some(ty) = self.interface_member(symbol, name) {
                    return ty;
                }
            }
            current = self.bindings.classes.get(&symbol).and_then(|data| data.extends);
            guard += 1;
            if guard > 64 {
                break;
            }
        }
        if is_static && name == "prototype" {
            return self.instance_type(class);
        }
        Type::Any
    }

    fn own_class_member(&self, class: SymbolRef, name: &str, is_static: bool) -> Option<Type> {
        let data = self.bindings.classes.get(&class)?;
        for member in &data.class.body {
            match member {
                ClassMember::Method(method) if method.is_static == is_static => {
                    if prop_name_text(&method.key).as_deref() != Some(name) {
                        continue;
                    }
                    let record = self.bindings.functions.get(&method.function.span.lo)?;
                    let signature = self.record_signature(record);
                    return Some(match method.kind {
                        MethodKind::Method => Type::function(signature, None),
                        MethodKind::Getter => signature.return_type,
                        MethodKind::Setter => signature.params.first().map_or(Type::Any, |p| p.ty.clone()),
                    });
                }
                ClassMember::ClassProp(prop) if prop.is_static == is_static => {
                    if prop_name_text(&prop.key).as_deref() != Some(name) {
                        continue;
                    }
                    return Some(match (&prop.type_ann, &prop.value) {
                        (Some(annotation), _) => self.annotation(&annotation.type_ann),
                        (None, Some(value)) => {
                            let ty = self.expr_type(value);
                            if prop.readonly {
                                ty
                            } else {
                                widen(ty)
                            }
                        }
                        (None, None) => Type::Any,
                    });
                }
                ClassMember::Constructor(constructor) if !is_static => {
                    for param in &constructor.params {
                        let ParamOrTsParamProp::TsParamProp(prop) = param else { continue };
                        let binding = match &prop.param {
                            TsParamPropParam::Ident(binding) => Some(binding),
                            TsParamPropParam::Assign(assign) => match &*assign.left {
                                Pat::Ident(binding) => Some(binding),
                                _ => None,
                            },
                        };
                        if let Some(binding) = binding {
                            if &*binding.id.sym == name {
                                return Some(binding.type_ann.as_ref().map_or(Type::Any, |ann| self.annotation(&ann.type_ann)));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn member_expr_type(&self, member: &MemberExpr) -> Type {
        let object = self.expr_type(&member.obj);
        match &member.prop {
            MemberProp::Ident(ident) => self.member_type(&object, &ident.sym),
            MemberProp::PrivateName(_) => Type::Any,
            MemberProp::Computed(computed) => match &*computed.expr {
                Expr::Lit(Lit::Str(s)) => self.member_type(&object, &str_value(s)),
                Expr::Lit(Lit::Num(n)) if object.is_tuple() => self.member_type(&object, &n.value.to_string()),
                _ => match object.resolved() {
                    Type::Tuple(members) => Type::union(members.iter().cloned()),
                    Type::String => Type::String,
                    other => other.element_type().cloned().unwrap_or(Type::Any),
                },
            },
        }
    }

    // ----- expressions -----

    pub(crate) fn expr_type(&self, expr: &Expr) -> Type {
        match expr {
            Expr::Lit(literal) => match literal {
                Lit::Str(s) => Type::Literal(LiteralType::String(str_value(s))),
                Lit::Num(n) => Type::Literal(LiteralType::Number(n.value)),
                Lit::Bool(b) => Type::Literal(LiteralType::Boolean(b.value)),
                Lit::Null(_) => Type::Null,
                Lit::BigInt(b) => Type::Literal(LiteralType::BigInt(b.value.to_string())),
                Lit::Regex(_) => builtins::builtin("RegExp", None, Vec::new()),
                _ => Type::String,
            },
            Expr::Tpl(_) => Type::String,
            Expr::Ident(ident) => match self.bindings.value_refs.get(&ident.span.lo) {
                Some(symbol) => self.symbol_type(*symbol),
                None if &*ident.sym == "undefined" => Type::Undefined,
                None => Type::Any,
            },
            Expr::This(this) => match self.bindings.this_bindings.get(&this.span.lo) {
                Some(ThisBinding::Instance(class)) => self.instance_type(*class),
                Some(ThisBinding::Static(class)) => named(&self.bindings.data(*class).info.name, *class, NamedKind::ClassConstructor),
                None => Type::Any,
            },
            Expr::Array(array) => {
                let contextual = self.contextual_type_at(crate::binder::span_key(array.span));
                let elements: Vec<Type> = array
                    .elems
                    .iter()
                    .flatten()
                    .map(|element| {
                        let ty = self.expr_type(&element.expr);
                        if element.spread.is_some() {
                            self.iterated_type(&ty)
                        } else {
                            ty
                        }
                    })
                    .collect();
                if matches!(contextual.as_ref().map(Type::resolved), Some(Type::Tuple(_))) {
                    Type::Tuple(elements)
                } else if elements.is_empty() {
                    Type::Array(Box::new(Type::Any))
                } else {
                    Type::Array(Box::new(widen(Type::union(elements))))
                }
            }
            Expr::Object(object) => {
                let mut properties: Vec<PropertySignature> = Vec::new();
                for prop in &object.props {
                    let (name, ty) = match prop {
                        PropOrSpread::Spread(spread) => {
                            if let Type::ObjectLiteral(spread_props) = self.expr_type(&spread.expr) {
                                for p in spread_props {
                                    properties.retain(|existing| existing.name != p.name);
                                    properties.push(p);
                                }
                            }
                            continue;
                        }
                        PropOrSpread::Prop(prop) => match &**prop {
                            Prop::Shorthand(ident) => (ident.sym.to_string(), widen(self.expr_type(&Expr::Ident(ident.clone())))),
                            Prop::KeyValue(kv) => match prop_name_text(&kv.key) {
                                Some(name) => (name, widen(self.expr_type(&kv.value))),
                                None => continue,
                            },
                            Prop::Method(method) => match prop_name_text(&method.key) {
                                Some(name) => (
                                    name,
                                    self.function_record_type_at(method.function.span.lo).unwrap_or(Type::Any),
                                ),
                                None => continue,
                            },
                            Prop::Getter(getter) => match prop_name_text(&getter.key) {
                                Some(name) => (name, Type::Any),
                                None => continue,
                            },
                            _ => continue,
                        },
                    };
                    properties.retain(|existing| existing.name != name);
                    properties.push(PropertySignature {
                        name,
                        ty,
                        optional: false,
                    });
                }
                Type::ObjectLiteral(properties)
            }
            Expr::Fn(function) => self
                .function_record_type_at(function.function.span.lo)
                .unwrap_or(Type::Any),
            Expr::Arrow(arrow) => self.function_record_type_at(arrow.span.lo).unwrap_or(Type::Any),
            Expr::Class(class) => match self.bindings.class_symbols.get(&class.class.span.lo) {
                Some(symbol) => named(&self.bindings.data(*symbol).info.name, *symbol, NamedKind::ClassConstructor),
                None => Type::Any,
            },
            Expr::Unary(unary) => match unary.op {
                UnaryOp::Bang | UnaryOp::Delete => Type::Boolean,
                UnaryOp::TypeOf => Type::String,
                UnaryOp::Void => Type::Undefined,
                UnaryOp::Minus => match self.expr_type(&unary.arg) {
                    Type::Literal(LiteralType::Number(n)) => Type::Literal(LiteralType::Number(-n)),
                    _ => Type::Number,
                },
                UnaryOp::Plus | UnaryOp::Tilde => Type::Number,
            },
            Expr::Update(_) => Type::Number,
            Expr::Bin(bin) => self.binary_type(bin),
            Expr::Assign(assign) => self.expr_type(&assign.right),
            Expr::Member(member) => self.member_expr_type(member),
            Expr::Cond(cond) => Type::union([self.expr_type(&cond.cons), self.expr_type(&cond.alt)]),
            Expr::Call(call) => match &call.callee {
                Callee::Expr(callee) => {
                    let callee_type = self.expr_type(callee);
                    if let Some(signature) = self.callee_signatures(&callee_type, call.args.len()) {
                        return signature.return_type;
                    }
                    match callee_type.as_named() {
                        Some(named) if named.kind == NamedKind::Builtin => builtins::call_return_type(&named.name),
                        _ => Type::Any,
                    }
                }
                _ => Type::Void,
            },
            Expr::New(new) => self
                .resolved_signature(CallSite::New(new))
                .map_or(Type::Any, |signature| signature.return_type),
            Expr::TaggedTpl(tagged) => self
                .resolved_signature(CallSite::TaggedTemplate(tagged))
                .map_or(Type::Any, |signature| signature.return_type),
            Expr::Seq(seq) => seq.exprs.last().map_or(Type::Undefined, |last| self.expr_type(last)),
            Expr::Paren(paren) => self.expr_type(&paren.expr),
            Expr::TsAs(as_expr) => self.annotation(&as_expr.type_ann),
            Expr::TsTypeAssertion(assertion) => self.annotation(&assertion.type_ann),
            Expr::TsConstAssertion(assertion) => self.expr_type(&assertion.expr),
            Expr::TsNonNull(non_null) => self.expr_type(&non_null.expr).non_nullable(),
            Expr::TsSatisfies(satisfies) => self.expr_type(&satisfies.expr),
            Expr::TsInstantiation(instantiation) => self.expr_type(&instantiation.expr),
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => Type::union([self.member_expr_type(member), Type::Undefined]),
                OptChainBase::Call(call) => {
                    let callee = self.expr_type(&call.callee).non_nullable();
                    match self.callee_signatures(&callee, call.args.len()) {
                        Some(signature) => Type::union([signature.return_type, Type::Undefined]),
                        None => Type::Any,
                    }
                }
            },
            _ => Type::Any,
        }
    }

    fn binary_type(&self, bin: &BinExpr) -> Type {
        match bin.op {
            BinaryOp::Add => {
                let left = self.expr_type(&bin.left);
                let right = self.expr_type(&bin.right);
                if left.is_string_like() || right.is_string_like() {
                    Type::String
                } else if left.is_number_like() && right.is_number_like() {
                    Type::Number
                } else {
                    Type::Any
                }
            }
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp
            | BinaryOp::LShift
            | BinaryOp::RShift
            | BinaryOp::ZeroFillRShift
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::BitAnd => Type::Number,
            BinaryOp::EqEq
            | BinaryOp::NotEq
            | BinaryOp::EqEqEq
            | BinaryOp::NotEqEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
            | BinaryOp::In
            | BinaryOp::InstanceOf => Type::Boolean,
            BinaryOp::LogicalAnd => Type::union([self.expr_type(&bin.left), self.expr_type(&bin.right)]),
            BinaryOp::LogicalOr | BinaryOp::NullishCoalescing => {
                Type::union([self.expr_type(&bin.left).non_nullable(), self.expr_type(&bin.right)])
            }
        }
    }

    // ----- enum values -----

    pub(crate) fn member_value(&self, member: SymbolRef) -> Option<ConstValue> {
        if let Some(value) = self.enum_values.borrow().get(&member) {
            return value.clone();
        }
        // a member referring back to itself has no value
        self.enum_values.borrow_mut().insert(member, None);
        let value = self.compute_member_value(member);
        self.enum_values.borrow_mut().insert(member, value.clone());
        value
    }

    fn compute_member_value(&self, member: SymbolRef) -> Option<ConstValue> {
        let Some(DeclSource::EnumMember {
            enumeration,
            index,
            member: node,
        }) = self.bindings.data(member).sources.first()
        else {
            return None;
        };
        if let Some(init) = &node.init {
            return self.eval_const(init, *enumeration);
        }
        if *index == 0 {
            return Some(ConstValue::Number(0.0));
        }
        let previous = self.bindings.data(*enumeration).sources.iter().find_map(|source| match source {
            DeclSource::Enum(decl) => decl.members.get(index - 1),
            _ => None,
        })?;
        let previous_name = match &previous.id {
            TsEnumMemberId::Ident(ident) => ident.sym.to_string(),
            TsEnumMemberId::Str(s) => str_value(s),
        };
        let previous = *self.bindings.data(*enumeration).exports.get(&previous_name)?;
        match self.member_value(previous)? {
            ConstValue::Number(n) => Some(ConstValue::Number(n + 1.0)),
            ConstValue::String(_) => None,
        }
    }

    fn eval_const(&self, expr: &Expr, enumeration: SymbolRef) -> Option<ConstValue> {
        match expr {
            Expr::Lit(Lit::Num(n)) => Some(ConstValue::Number(n.value)),
            Expr::Lit(Lit::Str(s)) => Some(ConstValue::String(str_value(s))),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => Some(ConstValue::String(
                tpl.quasis
                    .iter()
                    .map(|q| q.cooked.as_ref().and_then(|c| c.as_str()).unwrap_or("").to_string())
                    .collect(),
            )),
            Expr::Paren(paren) => self.eval_const(&paren.expr, enumeration),
            Expr::Unary(unary) => {
                let operand = num_value(&self.eval_const(&unary.arg, enumeration)?)?;
                match unary.op {
                    UnaryOp::Minus => Some(ConstValue::Number(-operand)),
                    UnaryOp::Plus => Some(ConstValue::Number(operand)),
                    UnaryOp::Tilde => Some(ConstValue::Number(!(operand as i64 as i32) as f64)),
                    _ => None,
                }
            }
            Expr::Bin(bin) => {
                let left = self.eval_const(&bin.left, enumeration)?;
                let right = self.eval_const(&bin.right, enumeration)?;
                let is_string = |v: &ConstValue| matches!(v, ConstValue::String(_));
                if bin.op == BinaryOp::Add && (is_string(&left) || is_string(&right)) {
                    let text = |v: &ConstValue| match v {
                        ConstValue::String(s) => s.clone(),
                        ConstValue::Number(n) => n.to_string(),
                    };
                    return Some(ConstValue::String(format!("{}{}", text(&left), text(&right))));
                }
                let (l, r) = (num_value(&left)?, num_value(&right)?);
                let (li, ri) = (l as i64 as i32, r as i64 as i32);
                let value = match bin.op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Mod => l % r,
                    BinaryOp::Exp => l.powf(r),
                    BinaryOp::BitOr => (li | ri) as f64,
                    BinaryOp::BitAnd => (li & ri) as f64,
                    BinaryOp::BitXor => (li ^ ri) as f64,
                    BinaryOp::LShift => li.wrapping_shl(ri as u32 & 31) as f64,
                    BinaryOp::RShift => li.wrapping_shr(ri as u32 & 31) as f64,
                    BinaryOp::ZeroFillRShift => (li as u32).wrapping_shr(ri as u32 & 31) as f64,
                    _ => return None,
                };
                Some(ConstValue::Number(value))
            }
            Expr::Ident(ident) => {
                let symbol = self
                    .bindings
                    .value_refs
                    .get(&ident.span.lo)
                    .copied()
                    .or_else(|| self.bindings.data(enumeration).exports.get(&*ident.sym).copied())?;
                match self.bindings.data(symbol).info.kind {
                    SymbolKind::EnumMember => self.member_value(symbol),
                    _ => None,
                }
            }
            Expr::Member(_) => self.const_value(expr),
            _ => None,
        }
    }
}

/// Destructured bindings never keep literal types.
fn widen_path(ty: Type, path: &[PatStep]) -> Type {
    if path.is_empty() {
        ty
    } else {
        widen(ty)
    }
}
