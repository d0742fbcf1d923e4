//! Static types as seen by the transformer.

use std::fmt;

use serde::Serialize;

use crate::context::ContextType;
use crate::directive::Directives;

/// Handle to a symbol owned by the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolRef(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralType {
    Number(f64),
    String(String),
    Boolean(bool),
    BigInt(String),
}

/// Compile-time value of an enum member or constant expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstValue {
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NamedKind {
    /// Instance side of a class.
    Class,
    Interface,
    /// `typeof SomeClass`.
    ClassConstructor,
    /// The enum object itself.
    Enum,
    Namespace,
    /// Declared by the standard library (`Math`, `Map`, `StringConstructor`, ...).
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedType {
    pub name: String,
    pub symbol: Option<SymbolRef>,
    pub kind: NamedKind,
    pub args: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signature {
    pub params: Vec<Parameter>,
    pub return_type: Type,
    /// Context of the declaration that introduced this signature;
    /// `ContextType::None` when there is no declaration.
    pub context: ContextType,
    /// For function expressions without an explicit `this`: the context of
    /// the contextual type the expression is assigned to, when it has call
    /// signatures.
    pub inferred_context: Option<ContextType>,
    pub directives: Directives,
    /// Declared by an interface call signature or a type alias, so
    /// directives on the owning type apply to calls through it.
    pub declared_in_type: bool,
}

impl Signature {
    pub fn new(params: Vec<Parameter>, return_type: Type, context: ContextType) -> Self {
        Signature {
            params,
            return_type,
            context,
            inferred_context: None,
            directives: Directives::new(),
            declared_in_type: false,
        }
    }

    /// Context used when reducing a function type.
    pub fn effective_context(&self) -> ContextType {
        self.inferred_context.unwrap_or(self.context)
    }

    pub fn param_type(&self, index: usize) -> Option<&Type> {
        match self.params.get(index) {
            Some(param) if param.rest => Some(param.ty.element_type().unwrap_or(&param.ty)),
            Some(param) => Some(&param.ty),
            None => self.params.last().filter(|p| p.rest).map(|p| p.ty.element_type().unwrap_or(&p.ty)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionType {
    pub signatures: Vec<Signature>,
    /// Function or method declaration the type comes from.
    pub symbol: Option<SymbolRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySignature {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    BigInt,
    EsSymbol,
    /// The `object` keyword.
    Object,
    Literal(LiteralType),
    Array(Box<Type>),
    Tuple(Vec<Type>),
    Function(Box<FunctionType>),
    Named(NamedType),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    TypeParameter {
        name: String,
        constraint: Option<Box<Type>>,
    },
    /// Anonymous object type: `{ a: number }` or the type of an object literal.
    ObjectLiteral(Vec<PropertySignature>),
    /// Reference through a type alias that carries directives.
    Alias {
        symbol: SymbolRef,
        target: Box<Type>,
    },
}

impl Type {
    /// Builds a union, flattening nested unions and dropping duplicates.
    pub fn union(types: impl IntoIterator<Item = Type>) -> Type {
        let mut members: Vec<Type> = Vec::new();
        for ty in types {
            let flattened = match ty {
                Type::Union(inner) => inner,
                other => vec![other],
            };
            for member in flattened {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
        }
        match members.len() {
            0 => Type::Never,
            1 => members.remove(0),
            _ => Type::Union(members),
        }
    }

    pub fn function(signature: Signature, symbol: Option<SymbolRef>) -> Type {
        Type::Function(Box::new(FunctionType {
            signatures: vec![signature],
            symbol,
        }))
    }

    /// The type with any directive-carrying alias removed.
    pub fn resolved(&self) -> &Type {
        match self {
            Type::Alias { target, .. } => target.resolved(),
            other => other,
        }
    }

    /// Type parameters are replaced by their constraint when they have one.
    fn constrained(&self) -> &Type {
        match self.resolved() {
            Type::TypeParameter {
                constraint: Some(constraint),
                ..
            } => constraint.constrained(),
            other => other,
        }
    }

    fn every_or_some(&self, leaf: &dyn Fn(&Type) -> bool) -> bool {
        match self.constrained() {
            Type::Union(members) => members.iter().all(|m| m.every_or_some(leaf)),
            Type::Intersection(members) => members.iter().any(|m| m.every_or_some(leaf)),
            other => leaf(other),
        }
    }

    pub fn is_string_like(&self) -> bool {
        self.every_or_some(&|ty| matches!(ty, Type::String | Type::Literal(LiteralType::String(_))))
    }

    pub fn is_number_like(&self) -> bool {
        self.every_or_some(&|ty| matches!(ty, Type::Number | Type::Literal(LiteralType::Number(_))))
    }

    pub fn is_boolean_like(&self) -> bool {
        self.every_or_some(&|ty| matches!(ty, Type::Boolean | Type::Literal(LiteralType::Boolean(_))))
    }

    /// Written as `T[]`, `Array<T>` or a tuple; any member of a union
    /// qualifies.
    pub fn is_explicit_array(&self) -> bool {
        match self.constrained() {
            Type::Union(members) | Type::Intersection(members) => {
                members.iter().any(Type::is_explicit_array)
            }
            Type::Array(_) | Type::Tuple(_) => true,
            Type::Named(named) => {
                named.kind == NamedKind::Builtin
                    && matches!(named.name.as_str(), "Array" | "ReadonlyArray")
            }
            _ => false,
        }
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.constrained(), Type::Tuple(_))
    }

    /// A bare function type (not an interface with call signatures).
    pub fn is_function(&self) -> bool {
        matches!(self.resolved(), Type::Function(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.resolved(), Type::Literal(_))
    }

    pub fn is_any(&self) -> bool {
        matches!(self.resolved(), Type::Any)
    }

    /// Could a value of this type be `false` or `nil` in Lua?
    pub fn is_falsible(&self, strict_null_checks: bool) -> bool {
        let ty = self.resolved();
        match ty {
            Type::Boolean
            | Type::Literal(LiteralType::Boolean(_))
            | Type::Undefined
            | Type::Null
            | Type::Never
            | Type::Void
            | Type::Any => true,
            _ if !strict_null_checks && !ty.is_literal() => true,
            Type::Union(members) => members.iter().any(|m| m.is_falsible(strict_null_checks)),
            _ => false,
        }
    }

    /// Element type of arrays, tuples (union of members) and `Array<T>`.
    pub fn element_type(&self) -> Option<&Type> {
        match self.constrained() {
            Type::Array(element) => Some(element),
            Type::Named(named) if named.kind == NamedKind::Builtin && named.name.ends_with("Array") => {
                named.args.first()
            }
            _ => None,
        }
    }

    /// Removes `undefined` and `null` from a union.
    pub fn non_nullable(&self) -> Type {
        match self.resolved() {
            Type::Union(members) => Type::union(
                members
                    .iter()
                    .filter(|m| !matches!(m, Type::Undefined | Type::Null))
                    .cloned(),
            ),
            other => other.clone(),
        }
    }

    pub fn as_named(&self) -> Option<&NamedType> {
        match self.constrained() {
            Type::Named(named) => Some(named),
            _ => None,
        }
    }

    /// Standard library declared type with this name.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.as_named()
            .map_or(false, |named| named.kind == NamedKind::Builtin && named.name == name)
    }

    pub fn symbol(&self) -> Option<SymbolRef> {
        match self.resolved() {
            Type::Named(named) => named.symbol,
            Type::Function(function) => function.symbol,
            _ => None,
        }
    }

    /// Call signatures; unions contribute the signatures of every member.
    pub fn call_signatures(&self) -> Vec<&Signature> {
        match self.constrained() {
            Type::Function(function) => function.signatures.iter().collect(),
            Type::Union(members) => members.iter().flat_map(Type::call_signatures).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
            for (i, ty) in types.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", ty)?;
            }
            Ok(())
        }

        match self {
            Type::Any => f.write_str("any"),
            Type::Unknown => f.write_str("unknown"),
            Type::Never => f.write_str("never"),
            Type::Void => f.write_str("void"),
            Type::Undefined => f.write_str("undefined"),
            Type::Null => f.write_str("null"),
            Type::Boolean => f.write_str("boolean"),
            Type::Number => f.write_str("number"),
            Type::String => f.write_str("string"),
            Type::BigInt => f.write_str("bigint"),
            Type::EsSymbol => f.write_str("symbol"),
            Type::Object => f.write_str("object"),
            Type::Literal(LiteralType::Number(n)) => write!(f, "{}", n),
            Type::Literal(LiteralType::String(s)) => write!(f, "\"{}\"", s),
            Type::Literal(LiteralType::Boolean(b)) => write!(f, "{}", b),
            Type::Literal(LiteralType::BigInt(b)) => write!(f, "{}n", b),
            Type::Array(element) => write!(f, "{}[]", element),
            Type::Tuple(elements) => {
                f.write_str("[")?;
                list(f, elements, ", ")?;
                f.write_str("]")
            }
            Type::Function(_) => f.write_str("function"),
            Type::Named(named) if named.args.is_empty() => f.write_str(&named.name),
            Type::Named(named) => {
                write!(f, "{}<", named.name)?;
                list(f, &named.args, ", ")?;
                f.write_str(">")
            }
            Type::Union(members) => list(f, members, " | "),
            Type::Intersection(members) => list(f, members, " & "),
            Type::TypeParameter { name, .. } => f.write_str(name),
            Type::ObjectLiteral(_) => f.write_str("{...}"),
            Type::Alias { target, .. } => write!(f, "{}", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_literal(s: &str) -> Type {
        Type::Literal(LiteralType::String(s.to_string()))
    }

    #[test]
    fn test_union_flattens_and_dedupes() {
        let ty = Type::union([
            Type::Number,
            Type::Union(vec![Type::String, Type::Number]),
            Type::String,
        ]);
        assert_eq!(ty, Type::Union(vec![Type::Number, Type::String]));
        assert_eq!(Type::union([Type::Boolean]), Type::Boolean);
        assert_eq!(Type::union([]), Type::Never);
    }

    #[test]
    fn test_string_and_number_classification() {
        assert!(string_literal("a").is_string_like());
        assert!(Type::Union(vec![Type::String, string_literal("b")]).is_string_like());
        assert!(!Type::Union(vec![Type::String, Type::Number]).is_string_like());
        assert!(Type::Intersection(vec![Type::Number, Type::Object]).is_number_like());

        let constrained = Type::TypeParameter {
            name: "T".to_string(),
            constraint: Some(Box::new(Type::String)),
        };
        assert!(constrained.is_string_like());
    }

    #[test]
    fn test_explicit_array() {
        assert!(Type::Array(Box::new(Type::Number)).is_explicit_array());
        assert!(Type::Tuple(vec![Type::Number, Type::String]).is_explicit_array());
        assert!(Type::Union(vec![Type::Undefined, Type::Array(Box::new(Type::Any))]).is_explicit_array());
        assert!(!Type::String.is_explicit_array());
        let array = Type::Named(NamedType {
            name: "Array".to_string(),
            symbol: None,
            kind: NamedKind::Builtin,
            args: vec![Type::Number],
        });
        assert!(array.is_explicit_array());
        assert_eq!(array.element_type(), Some(&Type::Number));
    }

    #[test]
    fn test_falsible() {
        assert!(Type::Boolean.is_falsible(true));
        assert!(Type::Any.is_falsible(true));
        assert!(!Type::Number.is_falsible(true));
        assert!(Type::Number.is_falsible(false));
        assert!(!string_literal("x").is_falsible(false));
        assert!(Type::Union(vec![Type::String, Type::Undefined]).is_falsible(true));
    }

    #[test]
    fn test_rest_parameter_type() {
        let signature = Signature::new(
            vec![
                Parameter {
                    name: "first".to_string(),
                    ty: Type::String,
                    optional: false,
                    rest: false,
                },
                Parameter {
                    name: "rest".to_string(),
                    ty: Type::Array(Box::new(Type::Number)),
                    optional: false,
                    rest: true,
                },
            ],
            Type::Void,
            ContextType::NonVoid,
        );
        assert_eq!(signature.param_type(0), Some(&Type::String));
        assert_eq!(signature.param_type(3), Some(&Type::Number));
        assert_eq!(signature.effective_context(), ContextType::NonVoid);
    }

    #[test]
    fn test_alias_is_transparent() {
        let alias = Type::Alias {
            symbol: SymbolRef(4),
            target: Box::new(Type::function(
                Signature::new(vec![], Type::Tuple(vec![Type::Number, Type::Number]), ContextType::Void),
                None,
            )),
        };
        assert!(alias.is_function());
        assert_eq!(alias.call_signatures().len(), 1);
        assert_eq!(alias.to_string(), "function");
    }
}
