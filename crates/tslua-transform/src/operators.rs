//! Binary, unary and conditional operators.

use swc_common::Span;
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::DirectiveKind;

use crate::error::{CompileErrorKind, Result};
use crate::options::LuaTarget;
use crate::transformer::LuaTransformer;

fn is_bitwise(operator: ast::BinaryOp) -> bool {
    use ast::BinaryOp::*;
    matches!(operator, BitAnd | BitOr | BitXor | LShift | RShift | ZeroFillRShift)
}

fn is_comparison(operator: ast::BinaryOp) -> bool {
    use ast::BinaryOp::*;
    matches!(operator, EqEq | EqEqEq | NotEq | NotEqEq | Lt | LtEq | Gt | GtEq)
}

/// Name of the `bit`/`bit32` library function for a bitwise operator.
fn bit_library_function(operator: ast::BinaryOp) -> Option<&'static str> {
    use ast::BinaryOp::*;
    Some(match operator {
        BitAnd => "band",
        BitOr => "bor",
        BitXor => "bxor",
        LShift => "lshift",
        ZeroFillRShift => "rshift",
        RShift => "arshift",
        _ => return None,
    })
}

/// `library.function`
pub(crate) fn library_member(library: &str, function: &str) -> Expression {
    create_table_index_expression(
        create_identifier(library, None, None, None).into(),
        create_string_literal(function, None),
        None,
    )
    .into()
}

fn is_typeof(expression: &ast::Expr) -> Option<&ast::Expr> {
    match expression {
        ast::Expr::Unary(unary) if unary.op == ast::UnaryOp::TypeOf => Some(&unary.arg),
        _ => None,
    }
}

impl LuaTransformer<'_> {
    /// `+` concatenates when either side is a string.
    pub(crate) fn is_string_concat(&self, left: &ast::Expr, right: &ast::Expr) -> bool {
        self.oracle.type_of_expr(left).is_string_like() || self.oracle.type_of_expr(right).is_string_like()
    }

    pub(crate) fn transform_binary_expression(&mut self, binary: &ast::BinExpr) -> Result<Expression> {
        let original = self.pos(binary.span);
        match binary.op {
            operator if is_comparison(operator) => self.transform_comparison_expression(binary),
            ast::BinaryOp::In => {
                let key = self.transform_expression(&binary.left)?;
                let table = self.transform_expression(&binary.right)?;
                let index = create_table_index_expression(table, key, None);
                Ok(create_binary_expression(
                    index.into(),
                    create_nil_literal(None),
                    BinaryOperator::Inequality,
                    original,
                ))
            }
            ast::BinaryOp::InstanceOf => self.transform_instance_of_expression(binary),
            ast::BinaryOp::NullishCoalescing => Err(self.unsupported("binary operator", "??", binary.span)),
            operator => {
                let concat = operator == ast::BinaryOp::Add && self.is_string_concat(&binary.left, &binary.right);
                let left = self.transform_expression(&binary.left)?;
                let right = self.transform_expression(&binary.right)?;
                self.transform_binary_operation(left, right, operator, concat, binary.span)
            }
        }
    }

    /// Applies `operator` to already lowered operands. `concat` selects
    /// string concatenation for `+`.
    pub(crate) fn transform_binary_operation(
        &mut self,
        left: Expression,
        right: Expression,
        operator: ast::BinaryOp,
        concat: bool,
        span: Span,
    ) -> Result<Expression> {
        use ast::BinaryOp as B;
        let original = self.pos(span);
        if is_bitwise(operator) {
            return self.transform_bit_operation(left, right, operator, span);
        }
        let lua_operator = match operator {
            B::Add if concat => {
                let left = self.wrap_in_to_string_for_concat(left);
                let right = self.wrap_in_to_string_for_concat(right);
                return Ok(create_binary_expression(left, right, BinaryOperator::Concat, original));
            }
            B::Add => BinaryOperator::Addition,
            B::Sub => BinaryOperator::Subtraction,
            B::Mul => BinaryOperator::Multiplication,
            B::Div => BinaryOperator::Division,
            B::Mod => BinaryOperator::Modulo,
            B::Exp => BinaryOperator::Power,
            B::LogicalAnd => BinaryOperator::And,
            B::LogicalOr => BinaryOperator::Or,
            B::EqEq | B::EqEqEq => BinaryOperator::Equality,
            B::NotEq | B::NotEqEq => BinaryOperator::Inequality,
            B::Lt => BinaryOperator::LessThan,
            B::LtEq => BinaryOperator::LessEqual,
            B::Gt => BinaryOperator::GreaterThan,
            B::GtEq => BinaryOperator::GreaterEqual,
            other => return Err(self.unsupported("binary operator", other.as_str(), span)),
        };
        Ok(create_binary_expression(left, right, lua_operator, original))
    }

    /// Bitwise operators: library calls before Lua 5.3, native after.
    fn transform_bit_operation(
        &mut self,
        left: Expression,
        right: Expression,
        operator: ast::BinaryOp,
        span: Span,
    ) -> Result<Expression> {
        let original = self.pos(span);
        let library = match self.options.lua_target {
            LuaTarget::Lua51 => {
                return Err(self.error(
                    CompileErrorKind::unsupported_for_target("Bitwise operations", self.options.lua_target),
                    span,
                ))
            }
            LuaTarget::Lua52 => "bit32",
            LuaTarget::LuaJIT => "bit",
            LuaTarget::Lua53 => {
                let lua_operator = match operator {
                    ast::BinaryOp::BitAnd => BinaryOperator::BitwiseAnd,
                    ast::BinaryOp::BitOr => BinaryOperator::BitwiseOr,
                    ast::BinaryOp::BitXor => BinaryOperator::BitwiseExclusiveOr,
                    ast::BinaryOp::LShift => BinaryOperator::BitwiseLeftShift,
                    ast::BinaryOp::ZeroFillRShift => BinaryOperator::BitwiseRightShift,
                    ast::BinaryOp::RShift => {
                        return Err(self.unsupported("right shift operator (use >>> instead)", ">>", span))
                    }
                    other => return Err(self.unsupported("binary bitwise operator", other.as_str(), span)),
                };
                return Ok(create_binary_expression(left, right, lua_operator, original));
            }
        };
        let Some(function) = bit_library_function(operator) else {
            return Err(self.unsupported("binary bitwise operator", operator.as_str(), span));
        };
        Ok(create_call_expression(library_member(library, function), vec![left, right], original))
    }

    fn transform_bitwise_not(&mut self, operand: Expression, span: Span) -> Result<Expression> {
        let original = self.pos(span);
        match self.options.lua_target {
            LuaTarget::Lua51 => Err(self.error(
                CompileErrorKind::unsupported_for_target("Bitwise operations", self.options.lua_target),
                span,
            )),
            LuaTarget::Lua52 => Ok(create_call_expression(library_member("bit32", "bnot"), vec![operand], original)),
            LuaTarget::LuaJIT => Ok(create_call_expression(library_member("bit", "bnot"), vec![operand], original)),
            LuaTarget::Lua53 => Ok(create_unary_expression(operand, UnaryOperator::BitwiseNot, original)),
        }
    }

    /// Comparisons; `typeof x === "object"` compares `type(x)` with the
    /// Lua type name.
    fn transform_comparison_expression(&mut self, binary: &ast::BinExpr) -> Result<Expression> {
        if let Some(operand) = is_typeof(&binary.left) {
            let right = self.transform_expression(&binary.right)?;
            if let Expression::StringLiteral(literal) = right {
                return self.transform_typeof_literal_comparison(operand, literal.value, binary.op, false, binary.span);
            }
            let left = self.transform_expression(&binary.left)?;
            return self.transform_binary_operation(left, right, binary.op, false, binary.span);
        }
        if let Some(operand) = is_typeof(&binary.right) {
            let left = self.transform_expression(&binary.left)?;
            if let Expression::StringLiteral(literal) = left {
                return self.transform_typeof_literal_comparison(operand, literal.value, binary.op, true, binary.span);
            }
            let right = self.transform_expression(&binary.right)?;
            return self.transform_binary_operation(left, right, binary.op, false, binary.span);
        }
        let left = self.transform_expression(&binary.left)?;
        let right = self.transform_expression(&binary.right)?;
        self.transform_binary_operation(left, right, binary.op, false, binary.span)
    }

    fn transform_typeof_literal_comparison(
        &mut self,
        operand: &ast::Expr,
        type_name: String,
        operator: ast::BinaryOp,
        literal_first: bool,
        span: Span,
    ) -> Result<Expression> {
        let type_name = match type_name.as_str() {
            "object" => "table".to_string(),
            "undefined" => "nil".to_string(),
            _ => type_name,
        };
        let inner = self.transform_expression(operand)?;
        let type_call = create_call_expression(
            create_identifier("type", None, None, None).into(),
            vec![inner],
            self.pos_of(operand),
        );
        let literal = create_string_literal(type_name, None);
        if literal_first {
            self.transform_binary_operation(literal, type_call, operator, false, span)
        } else {
            self.transform_binary_operation(type_call, literal, operator, false, span)
        }
    }

    fn transform_instance_of_expression(&mut self, binary: &ast::BinExpr) -> Result<Expression> {
        let original = self.pos(binary.span);
        let left = self.transform_expression(&binary.left)?;
        let right = self.transform_expression(&binary.right)?;
        let class_type = self.oracle.type_of_expr(&binary.right);
        let directives = self.oracle.type_directives(&class_type);
        if directives.has(DirectiveKind::Extension) || directives.has(DirectiveKind::MetaExtension) {
            return Err(self.error(CompileErrorKind::InvalidInstanceOfExtension, binary.span));
        }
        if directives.has(DirectiveKind::LuaTable) {
            return Err(self.error(CompileErrorKind::InvalidInstanceOfLuaTable, binary.span));
        }
        if class_type.is_builtin("ObjectConstructor") {
            return Ok(self.lualib_call(LuaLibFeature::InstanceOfObject, vec![left], original));
        }
        Ok(self.lualib_call(LuaLibFeature::InstanceOf, vec![left, right], original))
    }

    pub(crate) fn transform_unary_expression(&mut self, unary: &ast::UnaryExpr) -> Result<Expression> {
        let original = self.pos(unary.span);
        match unary.op {
            ast::UnaryOp::Plus => self.transform_expression(&unary.arg),
            ast::UnaryOp::Minus => {
                let operand = self.transform_expression(&unary.arg)?;
                Ok(create_unary_expression(operand, UnaryOperator::Negation, original))
            }
            ast::UnaryOp::Bang => {
                let operand = self.transform_expression(&unary.arg)?;
                Ok(create_unary_expression(operand, UnaryOperator::Not, original))
            }
            ast::UnaryOp::Tilde => {
                let operand = self.transform_expression(&unary.arg)?;
                self.transform_bitwise_not(operand, unary.span)
            }
            ast::UnaryOp::TypeOf => {
                let operand = self.transform_expression(&unary.arg)?;
                Ok(self.lualib_call(LuaLibFeature::TypeOf, vec![operand], original))
            }
            ast::UnaryOp::Delete => {
                let target = self.transform_assignment_left_hand_side(&unary.arg)?;
                let assignment = create_assignment_statement(vec![target], vec![create_nil_literal(None)], original);
                Ok(self.create_immediately_invoked_function_expression(
                    vec![assignment],
                    vec![create_boolean_literal(true, None)],
                    original,
                ))
            }
            ast::UnaryOp::Void => {
                let statements = self.transform_expression_statement(&unary.arg)?;
                Ok(self.create_immediately_invoked_function_expression(
                    statements,
                    vec![create_nil_literal(None)],
                    original,
                ))
            }
        }
    }

    /// `c and a or b`, or the function-wrapped form when `a` may be falsy.
    pub(crate) fn transform_conditional_expression(&mut self, conditional: &ast::CondExpr) -> Result<Expression> {
        let original = self.pos(conditional.span);
        let strict = self.options.null_checks();
        let when_true_type = self.oracle.type_of_expr(&conditional.cons);
        let condition = self.transform_expression(&conditional.test)?;
        let when_true = self.transform_expression(&conditional.cons)?;
        let when_false = self.transform_expression(&conditional.alt)?;

        if when_true_type.is_falsible(strict) {
            let when_true = self.wrap_in_function_call(when_true);
            let when_false = self.wrap_in_function_call(when_false);
            let and = create_binary_expression(condition, when_true, BinaryOperator::And, None);
            let or = create_binary_expression(and, when_false, BinaryOperator::Or, None);
            return Ok(create_call_expression(create_parenthesized_expression(or, None), vec![], original));
        }

        let and = create_binary_expression(condition, when_true, BinaryOperator::And, None);
        Ok(create_binary_expression(and, when_false, BinaryOperator::Or, original))
    }

    /// `(a, b, c)`: the leading expressions run as statements and the last
    /// one is the value.
    pub(crate) fn transform_sequence_expression(&mut self, sequence: &ast::SeqExpr) -> Result<Expression> {
        let Some((last, leading)) = sequence.exprs.split_last() else {
            return Ok(create_nil_literal(self.pos(sequence.span)));
        };
        let mut statements = Vec::new();
        for expression in leading {
            statements.extend(self.transform_expression_statement(expression)?);
        }
        let value = self.transform_expression(last)?;
        Ok(self.create_immediately_invoked_function_expression(statements, vec![value], self.pos(sequence.span)))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::options::{CompilerOptions, LuaTarget};
    use crate::testing::{lower, lower_error, lower_with};
    use tslua_lualib::LuaLibFeature;

    fn with_target(source: &str, target: LuaTarget) -> crate::error::Result<String> {
        let options = CompilerOptions {
            lua_target: target,
            ..Default::default()
        };
        lower_with(source, options).map(|lowered| lowered.text())
    }

    #[test]
    fn test_arithmetic_and_logic() {
        let text = lower("declare let a: number, b: number;\nlet c = a + b * 2 ** 3;\nlet d = a > b && a !== 0 || !b;").text();
        assert!(text.contains("local c = a + b * 2 ^ 3\n"), "{}", text);
        assert!(text.contains("local d = a > b and a ~= 0 or not b\n"), "{}", text);
    }

    #[test]
    fn test_string_addition_concatenates() {
        let text = lower("declare const n: number;\nconst s = \"n=\" + n;\nconst t = 1 + \"x\";").text();
        assert!(text.contains("local s = \"n=\" .. tostring(n)\n"), "{}", text);
        assert!(text.contains("local t = 1 .. \"x\"\n"), "{}", text);
    }

    #[test]
    fn test_bitwise_per_target() {
        let source = "declare const a: number, b: number;\nconst c = a & b;\nconst d = ~a;\nconst e = a >>> b;";
        let jit = with_target(source, LuaTarget::LuaJIT).unwrap();
        assert!(jit.contains("local c = bit[\"band\"](a, b)\n"), "{}", jit);
        assert!(jit.contains("local d = bit[\"bnot\"](a)\n"), "{}", jit);
        assert!(jit.contains("local e = bit[\"rshift\"](a, b)\n"), "{}", jit);

        let lua52 = with_target(source, LuaTarget::Lua52).unwrap();
        assert!(lua52.contains("local c = bit32[\"band\"](a, b)\n"), "{}", lua52);

        let lua53 = with_target(source, LuaTarget::Lua53).unwrap();
        assert!(lua53.contains("local c = a & b\n"), "{}", lua53);
        assert!(lua53.contains("local d = ~a\n"), "{}", lua53);
        assert!(lua53.contains("local e = a >> b\n"), "{}", lua53);

        let error = with_target(source, LuaTarget::Lua51).unwrap_err();
        assert_eq!(
            error.kind,
            CompileErrorKind::unsupported_for_target("Bitwise operations", LuaTarget::Lua51)
        );
    }

    #[test]
    fn test_signed_right_shift_rejected_on_53() {
        let error = with_target("declare const a: number;\nconst b = a >> 1;", LuaTarget::Lua53).unwrap_err();
        assert_eq!(error.kind, CompileErrorKind::unsupported_kind("right shift operator (use >>> instead)", ">>"));
    }

    #[test]
    fn test_typeof_comparisons() {
        let lowered = lower("declare const x: any;\nconst a = typeof x === \"object\";\nconst b = \"undefined\" == typeof x;\nconst c = typeof x;");
        let text = lowered.text();
        assert!(text.contains("local a = type(x) == \"table\"\n"), "{}", text);
        assert!(text.contains("local b = \"nil\" == type(x)\n"), "{}", text);
        assert!(text.contains("local c = __TS__TypeOf(x)\n"), "{}", text);
        assert!(lowered.features.contains(LuaLibFeature::TypeOf));
    }

    #[test]
    fn test_in_and_instanceof() {
        let source = "class A {}\ndeclare const o: any;\nconst a = \"k\" in o;\nconst b = o instanceof A;\nconst c = o instanceof Object;";
        let lowered = lower(source);
        let text = lowered.text();
        assert!(text.contains("local a = o[\"k\"] ~= nil\n"), "{}", text);
        assert!(text.contains("local b = __TS__InstanceOf(o, A)\n"), "{}", text);
        assert!(text.contains("local c = __TS__InstanceOfObject(o)\n"), "{}", text);
    }

    #[test]
    fn test_instanceof_lua_table_rejected() {
        let source = "/** @luaTable */\ndeclare class T {}\ndeclare const o: any;\nconst b = o instanceof T;";
        assert_eq!(lower_error(source).kind, CompileErrorKind::InvalidInstanceOfLuaTable);
    }

    #[test]
    fn test_conditional_forms() {
        let source = "declare const c: boolean;\nconst a = c ? 1 : 2;\nconst b = c ? false : true;";
        let text = lower(source).text();
        assert!(text.contains("local a = c and 1 or 2\n"), "{}", text);
        assert!(
            text.contains("local b = (c and function()\n    return false\nend or function()\n    return true\nend)()\n"),
            "{}",
            text
        );
    }

    #[test]
    fn test_delete_expression_returns_true() {
        let text = lower("declare const t: { [k: string]: number };\nconst ok = delete t.x;").text();
        assert!(text.contains("local ok = (function()\n    t[\"x\"] = nil\n    return true\nend)()\n"), "{}", text);
    }

    #[test]
    fn test_unary_operators() {
        let text = lower("declare const n: number;\nconst a = -n;\nconst b = +n;").text();
        assert!(text.contains("local a = -n\n"), "{}", text);
        assert!(text.contains("local b = n\n"), "{}", text);
    }
}
