//! Binder and type oracle for tslua
//!
//! [`Checker`] binds one parsed TypeScript file and answers the semantic
//! questions the Lua transformer asks through [`TypeOracle`]: which symbol
//! an identifier names, whether it is exported, what type an expression
//! has, which calling convention a function was declared with and which
//! JSDoc directives apply.
//!
//! The inference is intentionally local: only the current file is seen,
//! and library types are modelled as far as the lowering rules branch on
//! them.

mod binder;
pub mod builtins;
mod checker;
mod infer;
pub mod jsdoc;
pub mod oracle;

pub use checker::Checker;
pub use oracle::{
    CallSite, ClassInfo, DeclarationInfo, ExportScope, SymbolInfo, SymbolKind, TypeOracle,
};

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::Spanned;
    use swc_ecma_ast::{Decl, Expr, ModuleItem, Stmt};
    use tslua_parser::{parse_typescript, ParseResult};
    use tslua_types::{ConstValue, ContextType, DirectiveKind, LiteralType, NamedKind, Type};

    fn parse(source: &str) -> ParseResult {
        parse_typescript(source, "test.ts").expect("parse failed")
    }

    fn var_init(parsed: &ParseResult, index: usize) -> &Expr {
        match &parsed.module.body[index] {
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => var.decls[0].init.as_deref().unwrap(),
            other => panic!("not a variable statement: {:?}", other.span()),
        }
    }

    #[test]
    fn test_literal_widening() {
        let source = "const a = 1;\nlet b = 'x';\nconst c = [1, 2];";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let a = checker.lookup("a").unwrap();
        let b = checker.lookup("b").unwrap();
        let c = checker.lookup("c").unwrap();
        assert_eq!(checker.type_of_symbol(a), Type::Literal(LiteralType::Number(1.0)));
        assert_eq!(checker.type_of_symbol(b), Type::String);
        assert_eq!(checker.type_of_symbol(c), Type::Array(Box::new(Type::Number)));
    }

    #[test]
    fn test_function_declarations_hoist_within_block() {
        let source = "const r = add(1, 2);\nfunction add(x: number, y: number): number { return x + y; }";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let add = checker.lookup("add").unwrap();
        let info = checker.symbol(add);
        assert_eq!(info.kind, SymbolKind::Function);
        assert!(checker.is_value_referenced(add));
        let r = checker.lookup("r").unwrap();
        assert_eq!(checker.type_of_symbol(r), Type::Number);
    }

    #[test]
    fn test_context_types_follow_no_self() {
        let source = r#"
/** @noSelf */
declare namespace Lib {
    function plain(x: number): void;
}
declare function global(x: number): void;
class Box {
    method(): void {}
}
/** @noSelf */
interface Callbacks {
    handler(): void;
    field: () => void;
}
"#;
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let lib = checker.lookup("Lib").unwrap();
        let plain_type = checker.property_type(&checker.type_of_symbol(lib), "plain");
        assert_eq!(checker.function_context_type(&plain_type), ContextType::Void);

        let global = checker.lookup("global").unwrap();
        assert_eq!(
            checker.function_context_type(&checker.type_of_symbol(global)),
            ContextType::NonVoid
        );

        let class = checker.lookup("Box").unwrap();
        let instance = Type::Named(tslua_types::NamedType {
            name: "Box".to_string(),
            symbol: Some(class),
            kind: NamedKind::Class,
            args: Vec::new(),
        });
        let method = checker.property_type(&instance, "method");
        assert_eq!(checker.function_context_type(&method), ContextType::NonVoid);

        let callbacks = checker.lookup("Callbacks").unwrap();
        let callbacks_type = Type::Named(tslua_types::NamedType {
            name: "Callbacks".to_string(),
            symbol: Some(callbacks),
            kind: NamedKind::Interface,
            args: Vec::new(),
        });
        let handler = checker.property_type(&callbacks_type, "handler");
        let field = checker.property_type(&callbacks_type, "field");
        assert_eq!(checker.function_context_type(&handler), ContextType::Void);
        assert_eq!(checker.function_context_type(&field), ContextType::Void);
    }

    #[test]
    fn test_explicit_this_parameter() {
        let source = "function f(this: void, x: number) {}\nfunction g(this: any) {}";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let f = checker.type_of_symbol(checker.lookup("f").unwrap());
        let g = checker.type_of_symbol(checker.lookup("g").unwrap());
        assert_eq!(checker.function_context_type(&f), ContextType::Void);
        assert_eq!(f.call_signatures()[0].params.len(), 1);
        assert_eq!(checker.function_context_type(&g), ContextType::NonVoid);
    }

    #[test]
    fn test_arrow_infers_context_from_annotation() {
        let source = "declare function run(cb: (this: void) => void): void;\nrun(() => {});";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let ModuleItem::Stmt(Stmt::Expr(stmt)) = &parsed.module.body[1] else { panic!() };
        let Expr::Call(call) = &*stmt.expr else { panic!() };
        let arrow = &call.args[0].expr;
        let ty = checker.type_of_expr(arrow);
        assert_eq!(ty.call_signatures()[0].context, ContextType::NonVoid);
        assert_eq!(checker.function_context_type(&ty), ContextType::Void);
    }

    #[test]
    fn test_exports_and_module_detection() {
        let source = "export const a = 1;\nconst b = 2;\nexport { b };\nnamespace N { export function f() {} }";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        assert!(checker.is_module());
        let a = checker.symbol(checker.lookup("a").unwrap());
        assert_eq!(a.export_scope, Some(ExportScope::File));
        let b = checker.symbol(checker.lookup("b").unwrap());
        assert!(b.export_scope.is_none());
        assert!(b.exported_by_specifier);
        let n = checker.lookup("N").unwrap();
        let f = checker.symbol(checker.lookup("f").unwrap());
        assert_eq!(f.export_scope, Some(ExportScope::Namespace(n)));
    }

    #[test]
    fn test_imports_alone_do_not_make_a_module() {
        let source = "import { x } from 'lib';\nconst y = x;";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        assert!(!checker.is_module());
        let x = checker.lookup("x").unwrap();
        assert_eq!(checker.symbol(x).module_specifier.as_deref(), Some("lib"));
        assert!(checker.is_value_referenced(x));
    }

    #[test]
    fn test_enum_member_values() {
        let source = "enum E { A, B = 5, C, D = 'd', F = B * 2 }\nconst z = E.C;";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let e = checker.lookup("E").unwrap();
        assert_eq!(checker.enum_member_value(e, "A"), Some(ConstValue::Number(0.0)));
        assert_eq!(checker.enum_member_value(e, "C"), Some(ConstValue::Number(6.0)));
        assert_eq!(checker.enum_member_value(e, "D"), Some(ConstValue::String("d".to_string())));
        assert_eq!(checker.enum_member_value(e, "F"), Some(ConstValue::Number(10.0)));
        assert_eq!(checker.const_value(var_init(&parsed, 1)), Some(ConstValue::Number(6.0)));
    }

    #[test]
    fn test_directives_and_deprecated_syntax() {
        let source = "/** @tupleReturn */\ndeclare function pair(): [number, number];\n/** !phantom */\nnamespace P {}";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let pair = checker.symbol(checker.lookup("pair").unwrap());
        assert!(pair.has_directive(DirectiveKind::TupleReturn));
        assert!(pair.is_ambient());
        let p = checker.symbol(checker.lookup("P").unwrap());
        assert!(p.has_directive(DirectiveKind::Phantom));
        assert_eq!(checker.diagnostics().warning_count(), 1);
    }

    #[test]
    fn test_class_info_collects_accessors() {
        let source = r#"
/** @pureAbstract */
declare class Abstract {}
class Base extends Abstract {
    get size(): number { return 1; }
    static set mode(value: string) {}
}
class Derived extends Base {}
"#;
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let base = checker.lookup("Base").unwrap();
        let derived = checker.lookup("Derived").unwrap();
        let base_info = checker.class_info(base).unwrap();
        assert_eq!(base_info.base, None);
        assert!(base_info.instance_getters.contains("size"));
        assert!(base_info.static_setters.contains("mode"));
        assert_eq!(checker.class_info(derived).unwrap().base, Some(base));
    }

    #[test]
    fn test_for_of_element_and_destructuring_types() {
        let source = "const xs = ['a'];\nfor (const x of xs) {}\nconst [p, q] = [1, 'two'] as [number, string];";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        assert_eq!(checker.type_of_symbol(checker.lookup("x").unwrap()), Type::String);
        assert_eq!(checker.type_of_symbol(checker.lookup("p").unwrap()), Type::Number);
        assert_eq!(checker.type_of_symbol(checker.lookup("q").unwrap()), Type::String);
    }

    #[test]
    fn test_line_column() {
        let source = "const a = 1;\n  const b = 2;";
        let parsed = parse(source);
        let checker = Checker::new(&parsed, source);
        let second = parsed.module.body[1].span().lo;
        assert_eq!(checker.line_column(second), Some((1, 2)));
    }
}
