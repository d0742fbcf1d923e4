//! Calls, `new` and `super(...)`.
//!
//! Whether a call passes a leading context argument depends on the
//! resolved signature: `this: void` signatures get none, everything else
//! gets `self`, the receiver, or `nil` for free functions. Calls on the
//! library namespaces and on strings, arrays and functions are routed to
//! [`crate::builtins`].

use swc_common::{Span, Spanned};
use swc_ecma_ast as ast;

use tslua_checker::{CallSite, SymbolKind};
use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::{ContextType, DirectiveKind, Signature};

use crate::assignments::has_evaluation_effect;
use crate::error::{CompileErrorKind, Result};
use crate::identifiers::{is_lua_keyword, is_valid_lua_identifier};
use crate::transformer::LuaTransformer;

/// Array methods that still lower to LuaLib helpers on types that merely
/// extend an array.
const DEFAULT_ARRAY_METHODS: &[&str] = &[
    "concat", "push", "reverse", "shift", "unshift", "sort", "pop", "forEach", "indexOf", "map", "filter", "some",
    "every", "slice", "splice", "join", "flat", "flatMap",
];

fn is_void_signature(signature: Option<&Signature>) -> bool {
    signature.map_or(false, |signature| signature.effective_context() == ContextType::Void)
}

impl LuaTransformer<'_> {
    /// The callee returns several Lua values (`@tupleReturn`).
    pub(crate) fn is_tuple_return_call(&self, call: &ast::CallExpr) -> bool {
        let ast::Callee::Expr(callee) = &call.callee else {
            return false;
        };
        if let Some(signature) = self.oracle.resolved_signature(CallSite::Call(call)) {
            if signature.directives.has(DirectiveKind::TupleReturn) {
                return true;
            }
            if !signature.declared_in_type {
                return false;
            }
        }
        let ty = self.oracle.type_of_expr(callee);
        self.oracle.type_directives(&ty).has(DirectiveKind::TupleReturn)
    }

    /// `wrap_tuple` is set where the call's value is consumed as a single
    /// value; a `@tupleReturn` result is then collected into a table.
    pub(crate) fn transform_call_expression(&mut self, call: &ast::CallExpr, wrap_tuple: bool) -> Result<Expression> {
        let wrap = wrap_tuple && self.is_tuple_return_call(call);
        let result = match &call.callee {
            ast::Callee::Super(callee) => self.transform_super_call(call, callee.span)?,
            ast::Callee::Import(import) => return Err(self.unsupported("call", "ImportCall", import.span)),
            ast::Callee::Expr(callee) => match callee.as_ref() {
                ast::Expr::Member(member) => match &member.prop {
                    ast::MemberProp::Ident(name) => self.transform_property_call(call, member, &name.sym)?,
                    _ => self.transform_element_call(call, callee, member)?,
                },
                ast::Expr::SuperProp(_) => {
                    let signature = self.oracle.resolved_signature(CallSite::Call(call));
                    let mut params = vec![self.create_self_identifier(None).into()];
                    params.extend(self.transform_arguments(&call.args, signature.as_ref())?);
                    let method = self.transform_expression(callee)?;
                    create_call_expression(method, params, self.pos(call.span))
                }
                other => self.transform_function_call_expression(call, other)?,
            },
        };
        Ok(if wrap { self.wrap_in_table(vec![result]) } else { result })
    }

    /// Calls through anything but a member access: identifiers, function
    /// expressions, calls returning functions.
    fn transform_function_call_expression(&mut self, call: &ast::CallExpr, callee: &ast::Expr) -> Result<Expression> {
        let original = self.pos(call.span);
        let signature = self.oracle.resolved_signature(CallSite::Call(call));
        if let Some(result) = self.transform_global_function_call(call, callee, signature.as_ref())? {
            return Ok(result);
        }

        let function = self.transform_expression(callee)?;
        let mut params = Vec::new();
        if !is_void_signature(signature.as_ref()) {
            params.push(self.create_context_argument());
        }
        params.extend(self.transform_arguments(&call.args, signature.as_ref())?);
        Ok(create_call_expression(function, params, original))
    }

    /// `Symbol(...)`, `Number(...)`, `isNaN(...)` and `isFinite(...)`.
    fn transform_global_function_call(
        &mut self,
        call: &ast::CallExpr,
        callee: &ast::Expr,
        signature: Option<&Signature>,
    ) -> Result<Option<Expression>> {
        let original = self.pos(call.span);
        let ty = self.oracle.type_of_expr(callee);
        if ty.is_builtin("SymbolConstructor") {
            let params = self.transform_arguments(&call.args, signature)?;
            return Ok(Some(self.lualib_call(LuaLibFeature::Symbol, params, original)));
        }
        if ty.is_builtin("NumberConstructor") {
            let params = self.transform_arguments(&call.args, signature)?;
            return Ok(Some(self.lualib_call(LuaLibFeature::Number, params, original)));
        }

        let Some(symbol) = ty.symbol() else {
            return Ok(None);
        };
        let info = self.oracle.symbol(symbol);
        if info.kind != SymbolKind::Builtin {
            return Ok(None);
        }
        let feature = match info.name.as_str() {
            "isNaN" => LuaLibFeature::NumberIsNaN,
            "isFinite" => LuaLibFeature::NumberIsFinite,
            _ => return Ok(None),
        };
        let params = self.transform_arguments(&call.args, signature)?;
        let numeric = call.args.first().map_or(true, |argument| {
            self.oracle.type_of_expr(&argument.expr).is_number_like()
        });
        let params = if numeric {
            params
        } else {
            vec![self.lualib_call(LuaLibFeature::Number, params, None)]
        };
        Ok(Some(self.lualib_call(feature, params, original)))
    }

    /// `owner.name(...)`
    fn transform_property_call(&mut self, call: &ast::CallExpr, member: &ast::MemberExpr, name: &str) -> Result<Expression> {
        let original = self.pos(call.span);
        let owner = self.oracle.type_of_expr(&member.obj);
        let signature = self.oracle.resolved_signature(CallSite::Call(call));

        if owner.is_builtin("Math") {
            return self.transform_math_call(call, name, signature.as_ref());
        }
        if owner.is_builtin("Console") {
            return self.transform_console_call(call, name, signature.as_ref());
        }
        if owner.is_builtin("StringConstructor") {
            return self.transform_string_constructor_call(call, name, member.prop.span(), signature.as_ref());
        }
        if owner.is_builtin("ObjectConstructor") {
            return self.transform_object_call(call, name);
        }
        if owner.is_builtin("SymbolConstructor") {
            return self.transform_symbol_call(call, name, signature.as_ref());
        }
        if owner.is_builtin("NumberConstructor") {
            return self.transform_number_call(call, name);
        }
        if self.oracle.type_directives(&owner).has(DirectiveKind::LuaTable) {
            return self.transform_lua_table_call(call, member);
        }
        if owner.is_string_like() {
            return self.transform_string_call(call, member, name, signature.as_ref());
        }
        if owner.is_explicit_array() || (owner.element_type().is_some() && DEFAULT_ARRAY_METHODS.contains(&name)) {
            return self.transform_array_call(call, member, name, signature.as_ref());
        }
        if owner.is_function() {
            return self.transform_function_method_call(call, member, name, signature.as_ref());
        }

        match name {
            "toString" => {
                let value = self.transform_expression(&member.obj)?;
                let tostring = create_identifier("tostring", None, None, None);
                Ok(create_call_expression(tostring.into(), vec![value], original))
            }
            "hasOwnProperty" => {
                let table = self.transform_expression(&member.obj)?;
                let mut params = vec![table];
                params.extend(self.transform_arguments(&call.args, signature.as_ref())?);
                let rawget = create_identifier("rawget", None, None, None);
                let lookup = create_call_expression(rawget.into(), params, None);
                let found = create_binary_expression(lookup, create_nil_literal(None), BinaryOperator::Inequality, original);
                Ok(create_parenthesized_expression(found, None))
            }
            _ => {
                let params = self.transform_arguments(&call.args, signature.as_ref())?;
                if !is_void_signature(signature.as_ref()) {
                    let ast::Callee::Expr(callee) = &call.callee else {
                        panic!("property call without an expression callee");
                    };
                    return self.transform_contextual_call(callee, params, call.span);
                }
                let table = self.transform_expression(&member.obj)?;
                let table = match table {
                    Expression::Table(_) => create_parenthesized_expression(table, None),
                    other => other,
                };
                let function = create_table_index_expression(table, create_string_literal(name, None), self.pos(member.span));
                Ok(create_call_expression(function.into(), params, original))
            }
        }
    }

    /// `owner[key](...)`
    fn transform_element_call(&mut self, call: &ast::CallExpr, callee: &ast::Expr, member: &ast::MemberExpr) -> Result<Expression> {
        let owner = self.oracle.type_of_expr(&member.obj);
        if self.oracle.type_directives(&owner).has(DirectiveKind::LuaTable) {
            return self.transform_lua_table_call(call, member);
        }
        let signature = self.oracle.resolved_signature(CallSite::Call(call));
        let params = self.transform_arguments(&call.args, signature.as_ref())?;
        if !is_void_signature(signature.as_ref()) {
            return self.transform_contextual_call(callee, params, call.span);
        }
        let function = match self.transform_expression(callee)? {
            table @ Expression::Table(_) => create_parenthesized_expression(table, None),
            other => other,
        };
        Ok(create_call_expression(function, params, self.pos(call.span)))
    }

    /// A call that passes its receiver as the context argument:
    /// `obj:name(...)`, `obj[key](obj, ...)`, or `f(nil, ...)`. A receiver
    /// with side effects is evaluated once into `____self`.
    pub(crate) fn transform_contextual_call(
        &mut self,
        callee: &ast::Expr,
        mut params: Vec<Expression>,
        span: Span,
    ) -> Result<Expression> {
        let original = self.pos(span);
        match callee {
            ast::Expr::Member(member) => {
                if let ast::MemberProp::Ident(name) = &member.prop {
                    if !is_lua_keyword(&name.sym) && is_valid_lua_identifier(&name.sym) {
                        let table = match self.transform_expression(&member.obj)? {
                            table @ Expression::Table(_) => create_parenthesized_expression(table, None),
                            other => other,
                        };
                        let method = create_identifier(&*name.sym, self.pos(name.span), None, Some(name.sym.to_string()));
                        return Ok(create_method_call_expression(table, method, params, original));
                    }
                }

                let context = self.transform_expression(&member.obj)?;
                if has_evaluation_effect(&member.obj) {
                    let key = match &member.prop {
                        ast::MemberProp::Ident(name) => create_string_literal(&*name.sym, None),
                        ast::MemberProp::Computed(computed) => self.transform_element_index(&member.obj, &computed.expr)?,
                        ast::MemberProp::PrivateName(name) => {
                            return Err(self.unsupported("property access", "PrivateName", name.span))
                        }
                    };
                    let receiver = create_identifier("____self", None, None, None);
                    params.insert(0, clone_identifier(&receiver, None).into());
                    let declaration =
                        create_variable_declaration_statement(vec![clone_identifier(&receiver, None)], Some(vec![context]), None);
                    let method = create_table_index_expression(receiver.into(), key, None);
                    let call = create_call_expression(method.into(), params, None);
                    return Ok(self.create_immediately_invoked_function_expression(vec![declaration], vec![call], original));
                }
                let function = self.transform_expression(callee)?;
                params.insert(0, context);
                Ok(create_call_expression(function, params, original))
            }
            ast::Expr::Ident(_) => {
                params.insert(0, self.create_context_argument());
                let function = self.transform_expression(callee)?;
                Ok(create_call_expression(function, params, original))
            }
            other => Err(self.unsupported("Left Hand Side Call Expression", crate::expressions::expression_kind_name(other), other.span())),
        }
    }

    /// Context passed to free functions: `nil` in strict mode, `_G`
    /// otherwise.
    pub(crate) fn create_context_argument(&self) -> Expression {
        if self.options.strict {
            create_nil_literal(None)
        } else {
            create_identifier("_G", None, None, None).into()
        }
    }

    pub(crate) fn transform_arguments(&mut self, args: &[ast::ExprOrSpread], signature: Option<&Signature>) -> Result<Vec<Expression>> {
        let args: Vec<(&ast::Expr, Option<Span>)> = args.iter().map(|argument| (argument.expr.as_ref(), argument.spread)).collect();
        self.transform_argument_values(&args, signature, 0)
    }

    /// Lowers arguments, checking each against its parameter's function
    /// context. `first_param` is the parameter the first argument binds to.
    pub(crate) fn transform_argument_values(
        &mut self,
        args: &[(&ast::Expr, Option<Span>)],
        signature: Option<&Signature>,
        first_param: usize,
    ) -> Result<Vec<Expression>> {
        let checked = signature.filter(|signature| signature.params.len() >= args.len() + first_param);
        let mut params = Vec::with_capacity(args.len());
        for (index, (argument, spread)) in args.iter().enumerate() {
            if let (Some(signature), None) = (checked, spread) {
                let parameter = &signature.params[index + first_param];
                let from = self.oracle.type_of_expr(argument);
                self.validate_function_assignment(argument.span(), &from, &parameter.ty, Some(parameter.name.clone()))?;
            }
            params.push(match spread {
                Some(spread) => self.transform_spread(argument, *spread)?,
                None => self.transform_expression(argument)?,
            });
        }
        Ok(params)
    }

    /// `super(...)` calls the base constructor with `self`.
    fn transform_super_call(&mut self, call: &ast::CallExpr, super_span: Span) -> Result<Expression> {
        let signature = self.oracle.resolved_signature(CallSite::Call(call));
        let mut params = vec![self.create_self_identifier(None).into()];
        params.extend(self.transform_arguments(&call.args, signature.as_ref())?);
        let prototype = self.transform_super_prototype(super_span)?;
        let constructor = create_table_index_expression(prototype, create_string_literal("____constructor", None), None);
        Ok(create_call_expression(constructor.into(), params, self.pos(call.span)))
    }

    /// `new C(...)` is `C.new(...)`; `@customConstructor` and `@luaTable`
    /// classes construct differently and extensions cannot be constructed.
    pub(crate) fn transform_new_expression(&mut self, new: &ast::NewExpr) -> Result<Expression> {
        let original = self.pos(new.span);
        let class = self.transform_expression(&new.callee)?;
        let signature = self.oracle.resolved_signature(CallSite::New(new));
        let params = match &new.args {
            Some(args) => self.transform_arguments(args, signature.as_ref())?,
            None => vec![create_boolean_literal(true, None)],
        };

        let ty = self.oracle.type_of_expr(&new.callee);
        self.check_for_lualib_type(&ty);
        let directives = self.oracle.type_directives(&ty);
        if directives.has(DirectiveKind::Extension) || directives.has(DirectiveKind::MetaExtension) {
            return Err(self.error(CompileErrorKind::InvalidNewExpressionOnExtension, new.span));
        }
        if let Some(args) = directives.args(DirectiveKind::CustomConstructor) {
            let Some(constructor) = args.first() else {
                return Err(self.error(
                    CompileErrorKind::InvalidDecoratorArgumentNumber {
                        name: "@customConstructor".to_string(),
                        got: 0,
                        expected: 1,
                    },
                    new.span,
                ));
            };
            let params = match &new.args {
                Some(args) => self.transform_arguments(args, None)?,
                None => Vec::new(),
            };
            let function = create_identifier(constructor.as_str(), None, None, None);
            return Ok(create_call_expression(function.into(), params, original));
        }
        if directives.has(DirectiveKind::LuaTable) {
            if new.args.as_ref().map_or(false, |args| !args.is_empty()) {
                return Err(self.lua_table_error("No parameters are allowed when constructing a LuaTable object.", new.span));
            }
            return Ok(create_table_expression(Vec::new(), original));
        }

        let constructor = create_table_index_expression(class, create_string_literal("new", None), None);
        Ok(create_call_expression(constructor.into(), params, original))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};
    use tslua_lualib::LuaLibFeature;

    #[test]
    fn test_free_function_gets_nil_context() {
        let text = lower("function f(x: number) { return x; }\nf(1);").text();
        assert!(text.contains("f(nil, 1)\n"), "{}", text);
    }

    #[test]
    fn test_void_function_has_no_context() {
        let text = lower("declare function g(this: void, x: number): void;\ng(1);").text();
        assert!(text.ends_with("g(1)\n"), "{}", text);
    }

    #[test]
    fn test_method_calls_use_colon() {
        let source = "declare const o: { run(x: number): void, \"end\"(): void };\no.run(1);\no.end();";
        let text = lower(source).text();
        assert!(text.contains("o:run(1)\n"), "{}", text);
        assert!(text.contains("o[\"end\"](o)\n"), "{}", text);
    }

    #[test]
    fn test_effectful_receiver_is_cached() {
        let source = "declare function make(this: void): { run(): void };\nmake()[\"run\"]();";
        let text = lower(source).text();
        assert!(text.contains("local ____self = make()"), "{}", text);
        assert!(text.contains("return ____self[\"run\"](____self)"), "{}", text);
    }

    #[test]
    fn test_no_self_method_uses_dot() {
        let source = "declare const lib: { go(this: void, x: number): void };\nlib.go(2);";
        let text = lower(source).text();
        assert!(text.contains("lib[\"go\"](2)\n"), "{}", text);
    }

    #[test]
    fn test_tuple_return_wrapping() {
        let source = "/** @tupleReturn */\ndeclare function pair(this: void): [number, number];\nconst t = pair();\nconst [a, b] = pair();";
        let text = lower(source).text();
        assert!(text.contains("local t = ({pair()})\n"), "{}", text);
        assert!(text.contains("local a, b = pair()\n"), "{}", text);
    }

    #[test]
    fn test_directives_share_one_doc_line() {
        let source = "/** @noSelf @tupleReturn */\ndeclare function pair(this: void): [number, number];\nconst t = pair();\n/** Library. @luaIterator @noSelf */\ninterface Lib { go(x: number): void }\ndeclare const lib: Lib;\nlib.go(1);";
        let text = lower(source).text();
        assert!(text.contains("local t = ({pair()})\n"), "{}", text);
        assert!(text.contains("lib[\"go\"](1)\n"), "{}", text);
    }

    #[test]
    fn test_new_expression_forms() {
        let source = "class A { constructor(public x: number) {} }\nconst a = new A(1);\nconst m = new Map<string, number>();";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(text.contains("local a = A[\"new\"](1)\n"), "{}", text);
        assert!(text.contains("local m = Map[\"new\"]()\n"), "{}", text);
        assert!(lowered.features.contains(LuaLibFeature::Map));
    }

    #[test]
    fn test_custom_constructor_and_extension() {
        let source = "/** @customConstructor CreateThing */\ndeclare class Thing { constructor(n: number); }\nconst t = new Thing(3);";
        assert!(lower(source).text().contains("local t = CreateThing(3)\n"));
        let error = lower_error("/** @extension */\ndeclare class Ext {}\nconst e = new Ext();");
        assert_eq!(error.kind, CompileErrorKind::InvalidNewExpressionOnExtension);
    }

    #[test]
    fn test_lua_table_construction() {
        let source = "/** @luaTable */\ndeclare class Table { get(k: string): number; set(k: string, v: number): void; }\nconst t = new Table();\nt.set(\"a\", 1);\nconst v = t.get(\"a\");";
        let text = lower(source).text();
        assert!(text.contains("local t = {}\n"), "{}", text);
        assert!(text.contains("t[\"a\"] = 1\n"), "{}", text);
        assert!(text.contains("local v = t[\"a\"]\n"), "{}", text);
        let error = lower_error("/** @luaTable */\ndeclare class Table {}\nconst t = new Table(1);");
        assert!(matches!(error.kind, CompileErrorKind::ForbiddenLuaTableUseException(_)));
    }

    #[test]
    fn test_global_number_helpers() {
        let lowered = lower("declare const s: string;\nconst a = isNaN(s as any);\nconst b = Number(s);\nconst c = isFinite(2);");
        let text = lowered.text();
        assert!(text.contains("local a = __TS__NumberIsNaN(__TS__Number(s))\n"), "{}", text);
        assert!(text.contains("local b = __TS__Number(s)\n"), "{}", text);
        assert!(text.contains("local c = __TS__NumberIsFinite(2)\n"), "{}", text);
    }

    #[test]
    fn test_to_string_and_has_own_property() {
        let source = "declare const o: { a: number };\nconst s = o.toString();\nconst h = o.hasOwnProperty(\"a\");";
        let text = lower(source).text();
        assert!(text.contains("local s = tostring(o)\n"), "{}", text);
        assert!(text.contains("local h = (rawget(o, \"a\") ~= nil)\n"), "{}", text);
    }
}
