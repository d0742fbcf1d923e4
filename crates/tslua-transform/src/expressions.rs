//! Expression dispatch, literals, templates and table constructors.

use swc_common::{Span, Spanned};
use swc_ecma_ast as ast;

use tslua_checker::CallSite;
use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::{ContextType, DirectiveKind};

use crate::error::Result;
use crate::transformer::LuaTransformer;

/// Kind name used in "Unsupported expression kind" errors.
pub(crate) fn expression_kind_name(expression: &ast::Expr) -> &'static str {
    match expression {
        ast::Expr::This(_) => "ThisKeyword",
        ast::Expr::Array(_) => "ArrayLiteralExpression",
        ast::Expr::Object(_) => "ObjectLiteralExpression",
        ast::Expr::Fn(_) => "FunctionExpression",
        ast::Expr::Unary(_) => "PrefixUnaryExpression",
        ast::Expr::Update(_) => "PostfixUnaryExpression",
        ast::Expr::Bin(_) => "BinaryExpression",
        ast::Expr::Assign(_) => "AssignmentExpression",
        ast::Expr::Member(_) => "PropertyAccessExpression",
        ast::Expr::SuperProp(_) => "SuperPropertyAccess",
        ast::Expr::Cond(_) => "ConditionalExpression",
        ast::Expr::Call(_) => "CallExpression",
        ast::Expr::New(_) => "NewExpression",
        ast::Expr::Seq(_) => "CommaListExpression",
        ast::Expr::Ident(_) => "Identifier",
        ast::Expr::Lit(_) => "Literal",
        ast::Expr::Tpl(_) => "TemplateExpression",
        ast::Expr::TaggedTpl(_) => "TaggedTemplateExpression",
        ast::Expr::Arrow(_) => "ArrowFunction",
        ast::Expr::Class(_) => "ClassExpression",
        ast::Expr::Yield(_) => "YieldExpression",
        ast::Expr::MetaProp(_) => "MetaProperty",
        ast::Expr::Await(_) => "AwaitExpression",
        ast::Expr::Paren(_) => "ParenthesizedExpression",
        ast::Expr::TsTypeAssertion(_) => "TypeAssertionExpression",
        ast::Expr::TsConstAssertion(_) => "AsConstExpression",
        ast::Expr::TsNonNull(_) => "NonNullExpression",
        ast::Expr::TsAs(_) => "AsExpression",
        ast::Expr::TsInstantiation(_) => "ExpressionWithTypeArguments",
        ast::Expr::TsSatisfies(_) => "SatisfiesExpression",
        ast::Expr::PrivateName(_) => "PrivateIdentifier",
        ast::Expr::OptChain(_) => "OptionalChain",
        ast::Expr::Invalid(_) => "Invalid",
        _ => "JsxElement",
    }
}

fn cooked_text(element: &ast::TplElement) -> &str {
    element
        .cooked
        .as_ref()
        .and_then(|cooked| cooked.as_str())
        .unwrap_or(&*element.raw)
}

impl LuaTransformer<'_> {
    pub(crate) fn transform_expression(&mut self, expression: &ast::Expr) -> Result<Expression> {
        match expression {
            ast::Expr::Lit(literal) => self.transform_literal(literal),
            ast::Expr::Tpl(template) => self.transform_template(template),
            ast::Expr::TaggedTpl(tagged) => self.transform_tagged_template(tagged),
            ast::Expr::Ident(ident) => self.transform_identifier_expression(ident),
            ast::Expr::This(this) => Ok(self.create_self_identifier(self.pos(this.span)).into()),
            ast::Expr::Array(array) => self.transform_array_literal(array),
            ast::Expr::Object(object) => self.transform_object_literal(object),
            ast::Expr::Fn(function) => self.transform_function_expression(expression, function),
            ast::Expr::Arrow(arrow) => self.transform_arrow_function(expression, arrow),
            ast::Expr::Class(class) => self.transform_class_expression(class),
            ast::Expr::Unary(unary) => self.transform_unary_expression(unary),
            ast::Expr::Update(update) => self.transform_update_expression(update),
            ast::Expr::Bin(binary) => self.transform_binary_expression(binary),
            ast::Expr::Assign(assign) => self.transform_assignment_expression(assign),
            ast::Expr::Member(member) => self.transform_member_expression(expression, member),
            ast::Expr::SuperProp(prop) => self.transform_super_property(prop),
            ast::Expr::Cond(conditional) => self.transform_conditional_expression(conditional),
            ast::Expr::Call(call) => self.transform_call_expression(call, true),
            ast::Expr::New(new) => self.transform_new_expression(new),
            ast::Expr::Seq(sequence) => self.transform_sequence_expression(sequence),
            ast::Expr::Yield(expression) => self.transform_yield_expression(expression),
            ast::Expr::Paren(paren) => {
                let inner = self.transform_expression(&paren.expr)?;
                Ok(create_parenthesized_expression(inner, self.pos(paren.span)))
            }
            ast::Expr::TsAs(assertion) => {
                self.validate_assertion(&assertion.expr, &assertion.type_ann, assertion.span)?;
                self.transform_expression(&assertion.expr)
            }
            ast::Expr::TsTypeAssertion(assertion) => {
                self.validate_assertion(&assertion.expr, &assertion.type_ann, assertion.span)?;
                self.transform_expression(&assertion.expr)
            }
            ast::Expr::TsConstAssertion(assertion) => self.transform_expression(&assertion.expr),
            ast::Expr::TsNonNull(non_null) => self.transform_expression(&non_null.expr),
            ast::Expr::TsSatisfies(satisfies) => self.transform_expression(&satisfies.expr),
            ast::Expr::TsInstantiation(instantiation) => self.transform_expression(&instantiation.expr),
            other => Err(self.unsupported("expression", expression_kind_name(other), other.span())),
        }
    }

    fn validate_assertion(&mut self, expression: &ast::Expr, ty: &ast::TsType, span: Span) -> Result<()> {
        let from = self.oracle.type_of_expr(expression);
        let to = self.oracle.annotation_type(ty);
        self.validate_function_assignment(span, &from, &to, None)
    }

    fn transform_literal(&mut self, literal: &ast::Lit) -> Result<Expression> {
        let original = self.pos(literal.span());
        match literal {
            ast::Lit::Str(s) => Ok(create_string_literal(s.value.as_str().unwrap_or(""), original)),
            ast::Lit::Num(n) => Ok(create_numeric_literal(n.value, original)),
            ast::Lit::Bool(b) => Ok(create_boolean_literal(b.value, original)),
            ast::Lit::Null(_) => Ok(create_nil_literal(original)),
            ast::Lit::BigInt(b) => Err(self.unsupported("literal", "BigIntLiteral", b.span)),
            ast::Lit::Regex(r) => Err(self.unsupported("literal", "RegularExpressionLiteral", r.span)),
            ast::Lit::JSXText(t) => Err(self.unsupported("literal", "JsxText", t.span)),
        }
    }

    /// `` `a${b}c` `` becomes `"a" .. tostring(b) .. "c"`; empty text
    /// segments are dropped.
    fn transform_template(&mut self, template: &ast::Tpl) -> Result<Expression> {
        let original = self.pos(template.span);
        let mut quasis = template.quasis.iter();
        let head = quasis.next().map(cooked_text).unwrap_or("");
        if template.exprs.is_empty() {
            return Ok(create_string_literal(head, original));
        }

        let mut parts = Vec::new();
        if !head.is_empty() {
            parts.push(create_string_literal(head, None));
        }
        for expression in &template.exprs {
            let value = self.transform_expression(expression)?;
            parts.push(self.wrap_in_to_string_for_concat(value));
            if let Some(text) = quasis.next().map(cooked_text).filter(|text| !text.is_empty()) {
                parts.push(create_string_literal(text, None));
            }
        }
        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            panic!("template with substitutions produced no parts");
        };
        Ok(parts.fold(first, |left, right| {
            create_binary_expression(left, right, BinaryOperator::Concat, original)
        }))
    }

    /// ``tag`a${b}` `` calls `tag` with a strings table (carrying a `raw`
    /// field) followed by the substitutions.
    fn transform_tagged_template(&mut self, tagged: &ast::TaggedTpl) -> Result<Expression> {
        let original = self.pos(tagged.span);
        let strings = tagged
            .tpl
            .quasis
            .iter()
            .map(|element| create_table_field_expression(create_string_literal(cooked_text(element), None), None, None))
            .collect::<Vec<_>>();
        let raw = tagged
            .tpl
            .quasis
            .iter()
            .map(|element| create_table_field_expression(create_string_literal(&*element.raw, None), None, None))
            .collect::<Vec<_>>();
        let mut fields = strings;
        fields.push(create_table_field_expression(
            create_table_expression(raw, None),
            Some(create_string_literal("raw", None)),
            None,
        ));
        let strings_table = create_table_expression(fields, None);

        let signature = self.oracle.resolved_signature(CallSite::TaggedTemplate(tagged));
        let use_self = signature
            .as_ref()
            .map_or(false, |signature| signature.effective_context() != ContextType::Void);
        let substitutions: Vec<(&ast::Expr, Option<Span>)> =
            tagged.tpl.exprs.iter().map(|expression| (expression.as_ref(), None)).collect();
        let mut arguments = self.transform_argument_values(&substitutions, signature.as_ref(), 1)?;
        arguments.insert(0, strings_table);

        if use_self {
            return self.transform_contextual_call(&tagged.tag, arguments, tagged.span);
        }
        let tag = self.transform_expression(&tagged.tag)?;
        Ok(create_call_expression(tag, arguments, original))
    }

    /// `{v1, v2, ...}`; holes are `nil` and spreads are unpacked in place.
    fn transform_array_literal(&mut self, array: &ast::ArrayLit) -> Result<Expression> {
        let mut fields = Vec::with_capacity(array.elems.len());
        for element in &array.elems {
            let value = match element {
                None => create_nil_literal(None),
                Some(element) => match element.spread {
                    Some(spread) => self.transform_spread(&element.expr, spread)?,
                    None => self.transform_expression(&element.expr)?,
                },
            };
            fields.push(create_table_field_expression(value, None, None));
        }
        Ok(create_table_expression(fields, self.pos(array.span)))
    }

    /// `{[k] = v}`. Spreads split the literal into consecutive tables merged
    /// with `__TS__ObjectAssign` so later keys still win.
    fn transform_object_literal(&mut self, object: &ast::ObjectLit) -> Result<Expression> {
        let original = self.pos(object.span);
        let mut properties = Vec::new();
        let mut tables = Vec::new();

        for property in &object.props {
            match property {
                ast::PropOrSpread::Spread(spread) => {
                    if !properties.is_empty() {
                        tables.push(create_table_expression(std::mem::take(&mut properties), original));
                    }
                    let value = self.transform_expression(&spread.expr)?;
                    let spread_type = self.oracle.type_of_expr(&spread.expr);
                    let table = if spread_type.is_explicit_array() {
                        self.lualib_call(LuaLibFeature::ArrayToObject, vec![value], self.pos(spread.dot3_token))
                    } else {
                        value
                    };
                    tables.push(table);
                }
                ast::PropOrSpread::Prop(prop) => properties.push(self.transform_object_property(prop)?),
            }
        }

        if tables.is_empty() {
            return Ok(create_table_expression(properties, original));
        }
        if !properties.is_empty() {
            tables.push(create_table_expression(properties, original));
        }
        if !matches!(tables.first(), Some(Expression::Table(_))) {
            tables.insert(0, create_table_expression(Vec::new(), original));
        }
        Ok(self.lualib_call(LuaLibFeature::ObjectAssign, tables, original))
    }

    fn transform_object_property(&mut self, prop: &ast::Prop) -> Result<TableFieldExpression> {
        let original = self.pos(prop.span());
        match prop {
            ast::Prop::KeyValue(property) => {
                let key = self.transform_property_name(&property.key)?;
                let value = self.transform_expression(&property.value)?;
                Ok(create_table_field_expression(value, Some(key), original))
            }
            ast::Prop::Shorthand(ident) => {
                let key = create_string_literal(&*ident.sym, None);
                let value = self.transform_identifier_expression(ident)?;
                Ok(create_table_field_expression(value, Some(key), original))
            }
            ast::Prop::Method(method) => {
                let key = self.transform_property_name(&method.key)?;
                let value = self.transform_method_function(&method.function)?;
                Ok(create_table_field_expression(value, Some(key), original))
            }
            ast::Prop::Getter(getter) => Err(self.unsupported("object literal element", "GetAccessor", getter.span)),
            ast::Prop::Setter(setter) => Err(self.unsupported("object literal element", "SetAccessor", setter.span)),
            ast::Prop::Assign(assign) => {
                Err(self.unsupported("object literal element", "ShorthandPropertyAssignment", assign.span()))
            }
        }
    }

    /// Key of an object literal member, class member or destructured
    /// property.
    pub(crate) fn transform_property_name(&mut self, name: &ast::PropName) -> Result<Expression> {
        match name {
            ast::PropName::Ident(ident) => Ok(create_string_literal(&*ident.sym, None)),
            ast::PropName::Str(s) => Ok(create_string_literal(s.value.as_str().unwrap_or(""), self.pos(s.span))),
            ast::PropName::Num(n) => Ok(create_numeric_literal(n.value, self.pos(n.span))),
            ast::PropName::Computed(computed) => self.transform_expression(&computed.expr),
            ast::PropName::BigInt(b) => Err(self.unsupported("property name", "BigIntLiteral", b.span)),
        }
    }

    /// `...expression` in an argument list or array literal.
    pub(crate) fn transform_spread(&mut self, expression: &ast::Expr, span: Span) -> Result<Expression> {
        let original = self.pos(span);
        if let ast::Expr::Call(call) = expression {
            if self.is_tuple_return_call(call) {
                return self.transform_call_expression(call, false);
            }
        }
        let ty = self.oracle.type_of_expr(expression);
        if let ast::Expr::Ident(_) = expression {
            if self.oracle.type_directives(&ty).has(DirectiveKind::Vararg) {
                return Ok(create_dots_literal(original));
            }
        }
        let value = self.transform_expression(expression)?;
        if ty.is_explicit_array() {
            return Ok(self.create_unpack_call(value, original));
        }
        Ok(self.lualib_call(LuaLibFeature::Spread, vec![value], original))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};
    use tslua_lualib::LuaLibFeature;

    #[test]
    fn test_literals() {
        let text = lower("const a = 1.5;\nconst b = \"x\";\nconst c = true;\nconst d = null;\nconst e = undefined;").text();
        assert!(text.contains("local a = 1.5\n"), "{}", text);
        assert!(text.contains("local b = \"x\"\n"), "{}", text);
        assert!(text.contains("local c = true\n"), "{}", text);
        assert!(text.contains("local d = nil\n"), "{}", text);
        assert!(text.contains("local e = nil\n"), "{}", text);
    }

    #[test]
    fn test_unsupported_literals() {
        let error = lower_error("const r = /ab+c/;");
        assert_eq!(error.kind, CompileErrorKind::unsupported_kind("literal", "RegularExpressionLiteral"));
        let error = lower_error("const big = 10n;");
        assert_eq!(error.kind, CompileErrorKind::unsupported_kind("literal", "BigIntLiteral"));
    }

    #[test]
    fn test_template_literals() {
        let source = "declare const n: number;\ndeclare const s: string;\nconst a = `x${n}y${s}`;\nconst b = `${n}`;\nconst c = `plain`;";
        let text = lower(source).text();
        assert!(text.contains("local a = \"x\" .. tostring(n) .. \"y\" .. tostring(s)\n"), "{}", text);
        assert!(text.contains("local b = tostring(n)\n"), "{}", text);
        assert!(text.contains("local c = \"plain\"\n"), "{}", text);
    }

    #[test]
    fn test_tagged_template_passes_strings_table() {
        let source = "declare function tag(this: void, strings: string[], ...values: number[]): string;\ndeclare const n: number;\nconst t = tag`a${n}b`;";
        let text = lower(source).text();
        assert!(
            text.contains("local t = tag({\"a\", \"b\", [\"raw\"] = {\"a\", \"b\"}}, n)\n"),
            "{}",
            text
        );
    }

    #[test]
    fn test_array_literal_with_spread_and_holes() {
        let source = "declare const xs: number[];\nconst a = [1, , ...xs];";
        let text = lower(source).text();
        assert!(text.contains("local a = {1, nil, unpack(xs)}\n"), "{}", text);
    }

    #[test]
    fn test_object_literal_members() {
        let source = "const v = 2;\nconst o = { a: 1, \"b-c\": v, [v]: 3, v, m() { return 1; } };";
        let text = lower(source).text();
        assert!(text.contains("[\"a\"] = 1"), "{}", text);
        assert!(text.contains("[\"b-c\"] = v"), "{}", text);
        assert!(text.contains("[v] = 3"), "{}", text);
        assert!(text.contains("[\"v\"] = v"), "{}", text);
        assert!(text.contains("[\"m\"] = function(self)"), "{}", text);
    }

    #[test]
    fn test_object_spread_uses_object_assign() {
        let source = "declare const rest: { y: number };\ndeclare const xs: number[];\nconst o = { x: 0, ...rest, z: 2 };\nconst p = { ...xs };";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(
            text.contains("local o = __TS__ObjectAssign({[\"x\"] = 0}, rest, {[\"z\"] = 2})\n"),
            "{}",
            text
        );
        assert!(text.contains("local p = __TS__ObjectAssign({}, __TS__ArrayToObject(xs))\n"), "{}", text);
        assert!(lowered.features.contains(LuaLibFeature::ArrayToObject));
    }

    #[test]
    fn test_assertions_are_transparent() {
        let text = lower("declare const x: unknown;\nconst a = x as number;\nconst b = <number>x;\nconst c = x!;\nconst d = [1] as const;").text();
        assert!(text.contains("local a = x\n"), "{}", text);
        assert!(text.contains("local b = x\n"), "{}", text);
        assert!(text.contains("local c = x\n"), "{}", text);
        assert!(text.contains("local d = {1}\n"), "{}", text);
    }

    #[test]
    fn test_optional_chaining_is_rejected() {
        let error = lower_error("declare const o: { a: number } | undefined;\nconst x = o?.a;");
        assert_eq!(error.kind, CompileErrorKind::unsupported_kind("expression", "OptionalChain"));
    }
}
