//! Calls on library namespaces and on string, array and function values.

use swc_common::Span;
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::{ContextType, Signature};

use crate::error::{CompileErrorKind, Result};
use crate::operators::library_member;
use crate::transformer::LuaTransformer;

/// `math` functions that map one to one.
const MATH_FUNCTIONS: &[&str] = &[
    "abs", "acos", "asin", "atan", "ceil", "cos", "exp", "floor", "log", "max", "min", "pow", "random", "sin", "sqrt",
    "tan",
];

/// Lua `string` library methods callable directly on a string value.
const LUA_STRING_METHODS: &[&str] = &[
    "byte", "char", "dump", "find", "format", "gmatch", "gsub", "len", "lower", "match", "pack", "packsize", "rep",
    "reverse", "sub", "unpack", "upper",
];

/// A string literal containing a `%` directive.
fn is_format_template(argument: Option<&ast::ExprOrSpread>) -> bool {
    match argument.map(|argument| argument.expr.as_ref()) {
        Some(ast::Expr::Lit(ast::Lit::Str(s))) => s.value.as_str().map_or(false, |text| text.contains('%')),
        _ => false,
    }
}

fn next_or_nil(params: &mut impl Iterator<Item = Expression>) -> Expression {
    params.next().unwrap_or_else(|| create_nil_literal(None))
}

fn library_call(library: &str, function: &str, params: Vec<Expression>, original: Option<Position>) -> Expression {
    create_call_expression(library_member(library, function), params, original)
}

impl LuaTransformer<'_> {
    pub(crate) fn transform_math_call(
        &mut self,
        call: &ast::CallExpr,
        name: &str,
        signature: Option<&Signature>,
    ) -> Result<Expression> {
        let original = self.pos(call.span);
        let params = self.transform_arguments(&call.args, signature)?;
        let mut args = params.into_iter();
        match name {
            "atan2" => {
                let (y, x) = (next_or_nil(&mut args), next_or_nil(&mut args));
                let quotient = create_binary_expression(y, x, BinaryOperator::Division, None);
                Ok(library_call("math", "atan", vec![quotient], original))
            }
            "log10" | "log2" => {
                let log = library_call("math", "log", args.collect(), None);
                let base = if name == "log10" {
                    std::f64::consts::LN_10
                } else {
                    std::f64::consts::LN_2
                };
                let quotient = create_binary_expression(log, create_numeric_literal(base, None), BinaryOperator::Division, None);
                Ok(create_parenthesized_expression(quotient, original))
            }
            "log1p" => {
                let sum = create_binary_expression(
                    create_numeric_literal(1.0, None),
                    next_or_nil(&mut args),
                    BinaryOperator::Addition,
                    None,
                );
                Ok(library_call("math", "log", vec![sum], original))
            }
            "round" => {
                let sum = create_binary_expression(
                    next_or_nil(&mut args),
                    create_numeric_literal(0.5, None),
                    BinaryOperator::Addition,
                    None,
                );
                Ok(library_call("math", "floor", vec![sum], original))
            }
            _ if MATH_FUNCTIONS.contains(&name) => Ok(library_call("math", name, args.collect(), original)),
            _ => Err(self.error(CompileErrorKind::unsupported_property("Math", name), call.span)),
        }
    }

    /// `console.log` and `console.trace` print; `console.assert` asserts.
    /// A first message containing `%` is passed through `string.format`.
    pub(crate) fn transform_console_call(
        &mut self,
        call: &ast::CallExpr,
        name: &str,
        signature: Option<&Signature>,
    ) -> Result<Expression> {
        let original = self.pos(call.span);
        let print = |params: Vec<Expression>| {
            create_call_expression(create_identifier("print", None, None, None).into(), params, original)
        };
        match name {
            "log" => {
                let params = self.transform_arguments(&call.args, signature)?;
                if is_format_template(call.args.first()) {
                    return Ok(print(vec![library_call("string", "format", params, None)]));
                }
                Ok(print(params))
            }
            "assert" => {
                let mut params = self.transform_arguments(&call.args, signature)?;
                if call.args.len() > 1 && is_format_template(call.args.get(1)) {
                    let message = params.split_off(1);
                    params.push(library_call("string", "format", message, None));
                }
                let assert = create_identifier("assert", None, None, None);
                Ok(create_call_expression(assert.into(), params, original))
            }
            "trace" => {
                let mut params = self.transform_arguments(&call.args, signature)?;
                if is_format_template(call.args.first()) {
                    params = vec![library_call("string", "format", params, None)];
                }
                Ok(print(vec![library_call("debug", "traceback", params, None)]))
            }
            _ => Err(self.error(CompileErrorKind::unsupported_property("console", name), call.span)),
        }
    }

    pub(crate) fn transform_string_constructor_call(
        &mut self,
        call: &ast::CallExpr,
        name: &str,
        name_span: Span,
        signature: Option<&Signature>,
    ) -> Result<Expression> {
        let function = match name {
            "fromCharCode" => library_member("string", "char"),
            _ => return Err(self.error(CompileErrorKind::unsupported_property("String", name), name_span)),
        };
        let params = self.transform_arguments(&call.args, signature)?;
        Ok(create_call_expression(function, params, self.pos(call.span)))
    }

    pub(crate) fn transform_object_call(&mut self, call: &ast::CallExpr, name: &str) -> Result<Expression> {
        let feature = match name {
            "assign" => LuaLibFeature::ObjectAssign,
            "entries" => LuaLibFeature::ObjectEntries,
            "fromEntries" => LuaLibFeature::ObjectFromEntries,
            "keys" => LuaLibFeature::ObjectKeys,
            "values" => LuaLibFeature::ObjectValues,
            _ => return Err(self.error(CompileErrorKind::unsupported_property("Object", name), call.span)),
        };
        let params = self.transform_arguments(&call.args, None)?;
        Ok(self.lualib_call(feature, params, self.pos(call.span)))
    }

    /// `Symbol.for` and `Symbol.keyFor` go through the symbol registry.
    pub(crate) fn transform_symbol_call(
        &mut self,
        call: &ast::CallExpr,
        name: &str,
        signature: Option<&Signature>,
    ) -> Result<Expression> {
        let function = match name {
            "for" => "__TS__SymbolRegistryFor",
            "keyFor" => "__TS__SymbolRegistryKeyFor",
            _ => return Err(self.error(CompileErrorKind::unsupported_property("Symbol", name), call.span)),
        };
        let params = self.transform_arguments(&call.args, signature)?;
        self.import_feature(LuaLibFeature::SymbolRegistry);
        let function = create_identifier(function, None, None, None);
        Ok(create_call_expression(function.into(), params, self.pos(call.span)))
    }

    pub(crate) fn transform_number_call(&mut self, call: &ast::CallExpr, name: &str) -> Result<Expression> {
        let feature = match name {
            "isNaN" => LuaLibFeature::NumberIsNaN,
            "isFinite" => LuaLibFeature::NumberIsFinite,
            _ => return Err(self.error(CompileErrorKind::unsupported_property("Number", name), call.span)),
        };
        let params = self.transform_arguments(&call.args, None)?;
        Ok(self.lualib_call(feature, params, self.pos(call.span)))
    }

    /// `table.get(key)` used as a value.
    pub(crate) fn transform_lua_table_call(&mut self, call: &ast::CallExpr, member: &ast::MemberExpr) -> Result<Expression> {
        self.validate_lua_table_call(call, member, false)?;
        let table = self.transform_expression(&member.obj)?;
        let mut params = self.transform_arguments(&call.args, None)?.into_iter();
        let key = next_or_nil(&mut params);
        Ok(create_table_index_expression(table, key, self.pos(call.span)).into())
    }

    /// String methods with zero-based positions shifted onto `string.*`.
    pub(crate) fn transform_string_call(
        &mut self,
        call: &ast::CallExpr,
        member: &ast::MemberExpr,
        name: &str,
        signature: Option<&Signature>,
    ) -> Result<Expression> {
        let original = self.pos(call.span);
        let params = self.transform_arguments(&call.args, signature)?;
        let caller = self.transform_expression(&member.obj)?;
        let arity = call.args.len();
        let mut args = params.clone().into_iter();

        let lualib = match name {
            "replace" => Some(LuaLibFeature::StringReplace),
            "concat" => Some(LuaLibFeature::StringConcat),
            "split" => Some(LuaLibFeature::StringSplit),
            "startsWith" => Some(LuaLibFeature::StringStartsWith),
            "endsWith" => Some(LuaLibFeature::StringEndsWith),
            "padStart" => Some(LuaLibFeature::StringPadStart),
            "padEnd" => Some(LuaLibFeature::StringPadEnd),
            _ => None,
        };
        if let Some(feature) = lualib {
            let mut helper_params = vec![caller];
            helper_params.extend(params);
            return Ok(self.lualib_call(feature, helper_params, original));
        }

        match name {
            "indexOf" => {
                let pattern = next_or_nil(&mut args);
                let start = match args.next() {
                    Some(start) => self.expression_plus_one(start),
                    None => create_nil_literal(None),
                };
                let find = library_call("string", "find", vec![caller, pattern, start, create_boolean_literal(true, None)], None);
                let found = create_binary_expression(find, create_numeric_literal(0.0, None), BinaryOperator::Or, None);
                let index = create_binary_expression(
                    create_parenthesized_expression(found, None),
                    create_numeric_literal(1.0, None),
                    BinaryOperator::Subtraction,
                    original,
                );
                Ok(create_parenthesized_expression(index, None))
            }
            "substr" => {
                let start = next_or_nil(&mut args);
                match args.next() {
                    Some(length) if arity > 1 => {
                        let end = create_binary_expression(
                            create_parenthesized_expression(start.clone(), None),
                            create_parenthesized_expression(length, None),
                            BinaryOperator::Addition,
                            None,
                        );
                        let start = self.expression_plus_one(start);
                        Ok(library_call("string", "sub", vec![caller, start, end], original))
                    }
                    _ => {
                        let start = self.expression_plus_one(start);
                        Ok(library_call("string", "sub", vec![caller, start], original))
                    }
                }
            }
            "slice" if arity == 0 => Ok(caller),
            "substring" | "slice" => {
                let start = self.expression_plus_one(next_or_nil(&mut args));
                let mut sub_params = vec![caller, start];
                sub_params.extend(args.next());
                Ok(library_call("string", "sub", sub_params, original))
            }
            "toLowerCase" => Ok(library_call("string", "lower", vec![caller], original)),
            "toUpperCase" => Ok(library_call("string", "upper", vec![caller], original)),
            "charAt" => {
                let position = self.expression_plus_one(args.next().unwrap_or_else(|| create_numeric_literal(0.0, None)));
                Ok(library_call("string", "sub", vec![caller, position.clone(), position], original))
            }
            "charCodeAt" => {
                let position = self.expression_plus_one(args.next().unwrap_or_else(|| create_numeric_literal(0.0, None)));
                Ok(library_call("string", "byte", vec![caller, position], original))
            }
            "repeat" => {
                let count = library_call("math", "floor", vec![next_or_nil(&mut args)], None);
                Ok(library_call("string", "rep", vec![caller, count], original))
            }
            _ if LUA_STRING_METHODS.contains(&name) => {
                let receiver = match member.obj.as_ref() {
                    ast::Expr::Lit(ast::Lit::Str(_)) | ast::Expr::Tpl(_) => create_parenthesized_expression(caller, None),
                    _ => caller,
                };
                let method = create_identifier(name, None, None, None);
                Ok(create_method_call_expression(receiver, method, params, original))
            }
            _ => Err(self.error(CompileErrorKind::unsupported_property("string", name), call.span)),
        }
    }

    pub(crate) fn transform_array_call(
        &mut self,
        call: &ast::CallExpr,
        member: &ast::MemberExpr,
        name: &str,
        signature: Option<&Signature>,
    ) -> Result<Expression> {
        let original = self.pos(call.span);
        let params = self.transform_arguments(&call.args, signature)?;
        let caller = self.transform_expression(&member.obj)?;

        let (feature, with_params) = match name {
            "concat" => (LuaLibFeature::ArrayConcat, true),
            "push" => (LuaLibFeature::ArrayPush, true),
            "reverse" => (LuaLibFeature::ArrayReverse, false),
            "shift" => (LuaLibFeature::ArrayShift, false),
            "unshift" => (LuaLibFeature::ArrayUnshift, true),
            "sort" => (LuaLibFeature::ArraySort, true),
            "forEach" => (LuaLibFeature::ArrayForEach, true),
            "findIndex" => (LuaLibFeature::ArrayFindIndex, true),
            "indexOf" => (LuaLibFeature::ArrayIndexOf, true),
            "map" => (LuaLibFeature::ArrayMap, true),
            "filter" => (LuaLibFeature::ArrayFilter, true),
            "reduce" => (LuaLibFeature::ArrayReduce, true),
            "some" => (LuaLibFeature::ArraySome, true),
            "every" => (LuaLibFeature::ArrayEvery, true),
            "slice" => (LuaLibFeature::ArraySlice, true),
            "splice" => (LuaLibFeature::ArraySplice, true),
            "flat" => (LuaLibFeature::ArrayFlat, true),
            "flatMap" => (LuaLibFeature::ArrayFlatMap, true),
            "pop" => return Ok(library_call("table", "remove", vec![caller], original)),
            "join" => {
                let mut join_params = vec![caller];
                if call.args.is_empty() {
                    join_params.push(create_string_literal(",", None));
                } else {
                    join_params.extend(params);
                }
                return Ok(library_call("table", "concat", join_params, original));
            }
            _ => return Err(self.error(CompileErrorKind::unsupported_property("array", name), call.span)),
        };
        let mut helper_params = vec![caller];
        if with_params {
            helper_params.extend(params);
        }
        Ok(self.lualib_call(feature, helper_params, original))
    }

    /// `fn.apply`, `fn.bind` and `fn.call`; only functions taking a
    /// context can be rebound.
    pub(crate) fn transform_function_method_call(
        &mut self,
        call: &ast::CallExpr,
        member: &ast::MemberExpr,
        name: &str,
        signature: Option<&Signature>,
    ) -> Result<Expression> {
        let caller_type = self.oracle.type_of_expr(&member.obj);
        if self.oracle.function_context_type(&caller_type) == ContextType::Void {
            return Err(self.error(CompileErrorKind::UnsupportedSelfFunctionConversion(None), call.span));
        }
        let feature = match name {
            "apply" => LuaLibFeature::FunctionApply,
            "bind" => LuaLibFeature::FunctionBind,
            "call" => LuaLibFeature::FunctionCall,
            _ => return Err(self.error(CompileErrorKind::unsupported_property("function", name), call.span)),
        };
        let params = self.transform_arguments(&call.args, signature)?;
        let caller = self.transform_expression(&member.obj)?;
        let mut helper_params = vec![caller];
        helper_params.extend(params);
        Ok(self.lualib_call(feature, helper_params, self.pos(call.span)))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};
    use tslua_lualib::LuaLibFeature;

    #[test]
    fn test_math_calls() {
        let source = "declare const x: number;\nconst a = Math.atan2(x, 2);\nconst b = Math.log10(x);\nconst c = Math.round(x);\nconst d = Math.max(x, 1);\nconst e = Math.log1p(x);";
        let text = lower(source).text();
        assert!(text.contains("local a = math[\"atan\"](x / 2)\n"), "{}", text);
        assert!(text.contains("local b = (math[\"log\"](x) / 2.302585092994046)\n"), "{}", text);
        assert!(text.contains("local c = math[\"floor\"](x + 0.5)\n"), "{}", text);
        assert!(text.contains("local d = math[\"max\"](x, 1)\n"), "{}", text);
        assert!(text.contains("local e = math[\"log\"](1 + x)\n"), "{}", text);
        let error = lower_error("declare const x: number;\nconst t = Math.trunc(x);");
        assert_eq!(error.kind, CompileErrorKind::unsupported_property("Math", "trunc"));
    }

    #[test]
    fn test_console_calls() {
        let source = "declare const n: number;\nconsole.log(\"a\", n);\nconsole.log(\"%d items\", n);\nconsole.assert(n > 0, \"bad %d\", n);\nconsole.trace(\"here\");";
        let text = lower(source).text();
        assert!(text.contains("print(\"a\", n)\n"), "{}", text);
        assert!(text.contains("print(string[\"format\"](\"%d items\", n))\n"), "{}", text);
        assert!(text.contains("assert(n > 0, string[\"format\"](\"bad %d\", n))\n"), "{}", text);
        assert!(text.contains("print(debug[\"traceback\"](\"here\"))\n"), "{}", text);
    }

    #[test]
    fn test_string_methods() {
        let source = "declare const s: string;\ndeclare const i: number;\nconst a = s.indexOf(\"x\");\nconst b = s.substring(1, i);\nconst c = s.substr(i, 2);\nconst d = s.toUpperCase();\nconst e = s.charAt(i);\nconst f = s.repeat(3);\nconst g = s.slice();\nconst h = s.split(\",\");";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(text.contains("local a = ((string[\"find\"](s, \"x\", nil, true) or 0) - 1)\n"), "{}", text);
        assert!(text.contains("local b = string[\"sub\"](s, 2, i)\n"), "{}", text);
        assert!(text.contains("local c = string[\"sub\"](s, i + 1, (i) + (2))\n"), "{}", text);
        assert!(text.contains("local d = string[\"upper\"](s)\n"), "{}", text);
        assert!(text.contains("local e = string[\"sub\"](s, i + 1, i + 1)\n"), "{}", text);
        assert!(text.contains("local f = string[\"rep\"](s, math[\"floor\"](3))\n"), "{}", text);
        assert!(text.contains("local g = s\n"), "{}", text);
        assert!(text.contains("local h = __TS__StringSplit(s, \",\")\n"), "{}", text);
        assert!(lowered.features.contains(LuaLibFeature::StringSplit));
    }

    #[test]
    fn test_lua_string_methods_pass_through() {
        let text = lower("declare const s: string;\nconst a = s.gsub(\"a\", \"b\");").text();
        assert!(text.contains("local a = s:gsub(\"a\", \"b\")"), "{}", text);
    }

    #[test]
    fn test_array_methods() {
        let source = "declare const xs: number[];\nxs.push(1);\nconst m = xs.map((x) => x * 2);\nconst j = xs.join();\nconst p = xs.pop();";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(text.contains("__TS__ArrayPush(xs, 1)\n"), "{}", text);
        assert!(text.contains("local m = __TS__ArrayMap(xs, function(____, x)\n    return x * 2\nend)\n"), "{}", text);
        assert!(text.contains("local j = table[\"concat\"](xs, \",\")\n"), "{}", text);
        assert!(text.contains("local p = table[\"remove\"](xs)\n"), "{}", text);
        assert!(lowered.features.contains(LuaLibFeature::ArrayMap));
        let error = lower_error("declare const xs: number[];\nconst r = xs.copyWithin(0, 1);");
        assert_eq!(error.kind, CompileErrorKind::unsupported_property("array", "copyWithin"));
    }

    #[test]
    fn test_object_symbol_and_number_namespaces() {
        let source = "declare const o: object;\nconst k = Object.keys(o);\nconst s = Symbol.for(\"x\");\nconst n = Number.isNaN(1);\nconst c = String.fromCharCode(65);";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(text.contains("local k = __TS__ObjectKeys(o)\n"), "{}", text);
        assert!(text.contains("local s = __TS__SymbolRegistryFor(\"x\")\n"), "{}", text);
        assert!(text.contains("local n = __TS__NumberIsNaN(1)\n"), "{}", text);
        assert!(text.contains("local c = string[\"char\"](65)\n"), "{}", text);
        assert!(lowered.features.contains(LuaLibFeature::SymbolRegistry));
    }

    #[test]
    fn test_function_methods() {
        let source = "function f(this: any, a: number) { return a; }\nconst g = f.bind({}, 1);";
        assert!(lower(source).text().contains("local g = __TS__FunctionBind(f, {}, 1)\n"));
        let error = lower_error("declare function v(this: void): void;\nconst w = v.call(undefined);");
        assert_eq!(error.kind, CompileErrorKind::UnsupportedSelfFunctionConversion(None));
    }
}
