//! Standard library globals the checker knows without a `lib.d.ts`.
//!
//! Only the surface the transformer special-cases is modelled: the static
//! namespaces (`Math`, `console`, `Object`, ...), the global functions
//! (`isNaN`, `isFinite`) and the return types of string and array methods.

use tslua_types::{ContextType, NamedKind, NamedType, Parameter, Signature, SymbolRef, Type};

/// Names declared in the global scope, in declaration order.
pub const GLOBAL_VALUES: &[&str] = &[
    "Math",
    "console",
    "String",
    "Object",
    "Number",
    "Boolean",
    "Symbol",
    "Array",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "Error",
    "isNaN",
    "isFinite",
    "NaN",
    "Infinity",
    "globalThis",
    "undefined",
];

/// Library types that may be named in annotations.
pub const GLOBAL_TYPES: &[&str] = &[
    "Array",
    "ReadonlyArray",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "ReadonlyMap",
    "ReadonlySet",
    "Iterable",
    "IterableIterator",
    "Iterator",
    "Promise",
    "Record",
    "Partial",
    "Readonly",
    "Error",
    "Function",
    "Object",
    "String",
    "Number",
    "Boolean",
    "Symbol",
    "Console",
    "Math",
];

const MATH_METHODS: &[&str] = &[
    "abs", "acos", "acosh", "asin", "asinh", "atan", "atan2", "atanh", "cbrt", "ceil", "clz32", "cos",
    "cosh", "exp", "expm1", "floor", "fround", "hypot", "imul", "log", "log10", "log1p", "log2", "max",
    "min", "pow", "random", "round", "sign", "sin", "sinh", "sqrt", "tan", "tanh", "trunc",
];

pub fn builtin(name: &str, symbol: Option<SymbolRef>, args: Vec<Type>) -> Type {
    Type::Named(NamedType {
        name: name.to_string(),
        symbol,
        kind: NamedKind::Builtin,
        args,
    })
}

/// A library method: `(...args: any[]) => ret`, declared in an interface.
pub fn method(return_type: Type) -> Type {
    let rest = Parameter {
        name: "args".to_string(),
        ty: Type::Array(Box::new(Type::Any)),
        optional: false,
        rest: true,
    };
    Type::function(Signature::new(vec![rest], return_type, ContextType::NonVoid), None)
}

/// Type of a global value symbol.
pub fn global_value_type(name: &str, symbol: SymbolRef) -> Type {
    let named = |name: &str| builtin(name, Some(symbol), Vec::new());
    match name {
        "Math" => named("Math"),
        "console" => named("Console"),
        "String" => named("StringConstructor"),
        "Object" => named("ObjectConstructor"),
        "Number" => named("NumberConstructor"),
        "Boolean" => named("BooleanConstructor"),
        "Symbol" => named("SymbolConstructor"),
        "Array" => named("ArrayConstructor"),
        "Map" => named("MapConstructor"),
        "Set" => named("SetConstructor"),
        "WeakMap" => named("WeakMapConstructor"),
        "WeakSet" => named("WeakSetConstructor"),
        "Error" => named("ErrorConstructor"),
        "isNaN" | "isFinite" => {
            let number = Parameter {
                name: "number".to_string(),
                ty: Type::Number,
                optional: false,
                rest: false,
            };
            Type::function(
                Signature::new(vec![number], Type::Boolean, ContextType::NonVoid),
                Some(symbol),
            )
        }
        "NaN" | "Infinity" => Type::Number,
        "undefined" => Type::Undefined,
        _ => Type::Any,
    }
}

/// Instance type produced by `new` on a library constructor.
pub fn constructed_type(constructor: &str, args: Vec<Type>) -> Option<Type> {
    let name = constructor.strip_suffix("Constructor")?;
    match name {
        "Map" | "Set" | "WeakMap" | "WeakSet" | "Error" => Some(builtin(name, None, args)),
        "Array" => Some(Type::Array(Box::new(args.into_iter().next().unwrap_or(Type::Any)))),
        "String" => Some(Type::String),
        "Number" => Some(Type::Number),
        "Boolean" => Some(Type::Boolean),
        _ => None,
    }
}

/// Return type of calling a library constructor without `new`.
pub fn call_return_type(constructor: &str) -> Type {
    match constructor {
        "StringConstructor" => Type::String,
        "NumberConstructor" => Type::Number,
        "BooleanConstructor" => Type::Boolean,
        "SymbolConstructor" => Type::EsSymbol,
        "ArrayConstructor" => Type::Array(Box::new(Type::Any)),
        "ErrorConstructor" => builtin("Error", None, Vec::new()),
        _ => Type::Any,
    }
}

pub fn string_member(name: &str) -> Type {
    match name {
        "length" => Type::Number,
        "charAt" | "substring" | "substr" | "slice" | "toUpperCase" | "toLowerCase"
        | "toLocaleUpperCase" | "toLocaleLowerCase" | "trim" | "trimStart" | "trimEnd"
        | "replace" | "concat" | "repeat" | "padStart" | "padEnd" | "toString" => {
            method(Type::String)
        }
        "indexOf" | "lastIndexOf" | "charCodeAt" | "codePointAt" => method(Type::Number),
        "split" => method(Type::Array(Box::new(Type::String))),
        "startsWith" | "endsWith" | "includes" => method(Type::Boolean),
        _ => Type::Any,
    }
}

pub fn array_member(element: &Type, name: &str) -> Type {
    let same = || Type::Array(Box::new(element.clone()));
    match name {
        "length" => Type::Number,
        "push" | "unshift" | "indexOf" | "lastIndexOf" | "findIndex" => method(Type::Number),
        "pop" | "shift" | "find" => method(Type::union([element.clone(), Type::Undefined])),
        "join" | "toString" => method(Type::String),
        "concat" | "reverse" | "slice" | "splice" | "filter" | "sort" | "flat" => method(same()),
        "map" | "flatMap" => method(Type::Array(Box::new(Type::Any))),
        "forEach" => method(Type::Void),
        "some" | "every" | "includes" => method(Type::Boolean),
        "reduce" | "reduceRight" => method(Type::Any),
        _ => Type::Any,
    }
}

/// Members of the named library types (`Math`, `Console`, ...).
pub fn named_member(named: &NamedType, name: &str) -> Type {
    match named.name.as_str() {
        "Math" => match name {
            "PI" | "E" | "LN10" | "LN2" | "LOG10E" | "LOG2E" | "SQRT1_2" | "SQRT2" => Type::Number,
            name if MATH_METHODS.contains(&name) => method(Type::Number),
            _ => Type::Any,
        },
        "Console" => method(Type::Void),
        "StringConstructor" => match name {
            "fromCharCode" => method(Type::String),
            _ => Type::Any,
        },
        "ObjectConstructor" => match name {
            "keys" => method(Type::Array(Box::new(Type::String))),
            "values" | "entries" => method(Type::Array(Box::new(Type::Any))),
            _ => method(Type::Any),
        },
        "NumberConstructor" => match name {
            "isNaN" | "isFinite" | "isInteger" => method(Type::Boolean),
            "MAX_VALUE" | "MIN_VALUE" | "EPSILON" => Type::Number,
            _ => Type::Any,
        },
        "SymbolConstructor" => match name {
            "for" => method(Type::EsSymbol),
            "keyFor" => method(Type::union([Type::String, Type::Undefined])),
            _ => Type::EsSymbol,
        },
        "ArrayConstructor" => match name {
            "isArray" => method(Type::Boolean),
            _ => Type::Any,
        },
        "Map" | "ReadonlyMap" | "WeakMap" => match name {
            "size" => Type::Number,
            "has" | "delete" => method(Type::Boolean),
            "get" => method(named.args.get(1).cloned().unwrap_or(Type::Any)),
            _ => method(Type::Any),
        },
        "Set" | "ReadonlySet" | "WeakSet" => match name {
            "size" => Type::Number,
            "has" | "delete" => method(Type::Boolean),
            _ => method(Type::Any),
        },
        "Error" => match name {
            "message" | "name" | "stack" => Type::String,
            _ => Type::Any,
        },
        "Array" | "ReadonlyArray" => {
            array_member(named.args.first().unwrap_or(&Type::Any), name)
        }
        _ => Type::Any,
    }
}

/// Annotation names that map onto structural types.
pub fn annotation_type(name: &str, args: Vec<Type>) -> Option<Type> {
    let mut args = args.into_iter();
    match name {
        "Array" | "ReadonlyArray" => Some(Type::Array(Box::new(args.next().unwrap_or(Type::Any)))),
        "String" => Some(Type::String),
        "Number" => Some(Type::Number),
        "Boolean" => Some(Type::Boolean),
        "Symbol" => Some(Type::EsSymbol),
        "Object" => Some(Type::Object),
        "Readonly" | "Partial" => Some(args.next().unwrap_or(Type::Any)),
        _ if GLOBAL_TYPES.contains(&name) => Some(builtin(name, None, args.collect())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_namespaces_are_builtin_named_types() {
        let symbol = SymbolRef(3);
        assert!(global_value_type("Math", symbol).is_builtin("Math"));
        assert!(global_value_type("console", symbol).is_builtin("Console"));
        assert_eq!(global_value_type("isNaN", symbol).symbol(), Some(symbol));
        assert_eq!(global_value_type("undefined", symbol), Type::Undefined);
    }

    #[test]
    fn test_math_members() {
        let Type::Named(math) = builtin("Math", None, Vec::new()) else {
            unreachable!()
        };
        assert_eq!(named_member(&math, "SQRT2"), Type::Number);
        assert_eq!(named_member(&math, "floor").call_signatures().len(), 1);
        assert_eq!(named_member(&math, "whatever"), Type::Any);
    }

    #[test]
    fn test_array_member_types_follow_element() {
        let element = Type::String;
        assert_eq!(array_member(&element, "length"), Type::Number);
        let filter = array_member(&element, "filter");
        let signature = filter.call_signatures()[0];
        assert_eq!(signature.return_type, Type::Array(Box::new(Type::String)));
        assert_eq!(signature.context, ContextType::NonVoid);
    }

    #[test]
    fn test_constructed_collections() {
        let map = constructed_type("MapConstructor", vec![Type::String, Type::Number]).unwrap();
        assert!(map.is_builtin("Map"));
        assert_eq!(named_member(map.as_named().unwrap(), "size"), Type::Number);
        assert!(constructed_type("MathConstructor", Vec::new()).is_none());
    }

    #[test]
    fn test_annotation_names() {
        assert_eq!(
            annotation_type("Array", vec![Type::Number]),
            Some(Type::Array(Box::new(Type::Number)))
        );
        assert!(annotation_type("Promise", vec![]).unwrap().is_builtin("Promise"));
        assert_eq!(annotation_type("Widget", vec![]), None);
    }
}
