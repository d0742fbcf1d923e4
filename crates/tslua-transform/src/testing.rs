//! Test helpers: lower a snippet and render the tree as compact Lua.
//!
//! The renderer exists so assertions can be written against readable
//! text. It does not add precedence parentheses and always prints table
//! keys in bracket form.

use std::fmt::Write;

use tslua_checker::Checker;
use tslua_lua_ast::*;
use tslua_lualib::FeatureSet;
use tslua_parser::parse_typescript;

use crate::error::{CompileError, Result};
use crate::options::CompilerOptions;
use crate::transformer::LuaTransformer;

#[derive(Debug)]
pub(crate) struct Lowered {
    pub block: Block,
    pub features: FeatureSet,
}

impl Lowered {
    pub fn text(&self) -> String {
        render_block(&self.block)
    }
}

pub(crate) fn lower_with(source: &str, options: CompilerOptions) -> Result<Lowered> {
    let parsed = parse_typescript(source, "test.ts").expect("parse failed");
    let checker = Checker::new(&parsed, source);
    let mut transformer = LuaTransformer::new(options, &checker);
    let (block, features) = transformer.transform_source_file(&parsed.module)?;
    Ok(Lowered { block, features })
}

pub(crate) fn lower(source: &str) -> Lowered {
    match lower_with(source, CompilerOptions::default()) {
        Ok(lowered) => lowered,
        Err(error) => panic!("lowering failed: {}", error),
    }
}

pub(crate) fn lower_error(source: &str) -> CompileError {
    match lower_with(source, CompilerOptions::default()) {
        Ok(lowered) => panic!("expected an error, got:\n{}", lowered.text()),
        Err(error) => error,
    }
}

/// Runs `f` with a transformer bound to `source`, outside any unit.
pub(crate) fn with_transformer<R>(source: &str, f: impl FnOnce(&mut LuaTransformer<'_>) -> R) -> R {
    let parsed = parse_typescript(source, "test.ts").expect("parse failed");
    let checker = Checker::new(&parsed, source);
    let mut transformer = LuaTransformer::new(CompilerOptions::default(), &checker);
    f(&mut transformer)
}

pub(crate) fn render_block(block: &Block) -> String {
    let mut out = String::new();
    statements(&mut out, &block.statements, 0);
    out
}

pub(crate) fn render_expression(expression: &Expression) -> String {
    let mut out = String::new();
    expr(&mut out, expression, 0);
    out
}

fn pad(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("    ");
    }
}

fn statements(out: &mut String, list: &[Statement], indent: usize) {
    for statement in list {
        stmt(out, statement, indent);
    }
}

fn list(out: &mut String, expressions: &[Expression], indent: usize) {
    for (i, e) in expressions.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        expr(out, e, indent);
    }
}

fn names(identifiers: &[Identifier]) -> String {
    identifiers.iter().map(|i| i.text.as_str()).collect::<Vec<_>>().join(", ")
}

fn stmt(out: &mut String, statement: &Statement, indent: usize) {
    pad(out, indent);
    match statement {
        Statement::Do(d) => {
            out.push_str("do\n");
            statements(out, &d.statements, indent + 1);
            pad(out, indent);
            out.push_str("end");
        }
        Statement::VariableDeclaration(v) => {
            let _ = write!(out, "local {}", names(&v.left));
            if let Some(right) = &v.right {
                out.push_str(" = ");
                list(out, right, indent);
            }
        }
        Statement::Assignment(a) => {
            for (i, left) in a.left.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                expr(out, &Expression::from(left.clone()), indent);
            }
            out.push_str(" = ");
            list(out, &a.right, indent);
        }
        Statement::If(i) => if_chain(out, i, indent),
        Statement::While(w) => {
            out.push_str("while ");
            expr(out, &w.condition, indent);
            out.push_str(" do\n");
            statements(out, &w.body.statements, indent + 1);
            pad(out, indent);
            out.push_str("end");
        }
        Statement::Repeat(r) => {
            out.push_str("repeat\n");
            statements(out, &r.body.statements, indent + 1);
            pad(out, indent);
            out.push_str("until ");
            expr(out, &r.condition, indent);
        }
        Statement::For(f) => {
            let _ = write!(out, "for {} = ", f.control_variable.text);
            expr(out, &f.control_variable_initializer, indent);
            out.push_str(", ");
            expr(out, &f.limit_expression, indent);
            if let Some(step) = &f.step_expression {
                out.push_str(", ");
                expr(out, step, indent);
            }
            out.push_str(" do\n");
            statements(out, &f.body.statements, indent + 1);
            pad(out, indent);
            out.push_str("end");
        }
        Statement::ForIn(f) => {
            let _ = write!(out, "for {} in ", names(&f.names));
            list(out, &f.expressions, indent);
            out.push_str(" do\n");
            statements(out, &f.body.statements, indent + 1);
            pad(out, indent);
            out.push_str("end");
        }
        Statement::Goto(g) => {
            let _ = write!(out, "goto {}", g.label);
        }
        Statement::Label(l) => {
            let _ = write!(out, "::{}::", l.name);
        }
        Statement::Return(r) => {
            out.push_str("return");
            if !r.expressions.is_empty() {
                out.push(' ');
                list(out, &r.expressions, indent);
            }
        }
        Statement::Break(_) => out.push_str("break"),
        Statement::Expression(e) => expr(out, &e.expression, indent),
    }
    out.push('\n');
}

fn if_chain(out: &mut String, statement: &IfStatement, indent: usize) {
    out.push_str("if ");
    expr(out, &statement.condition, indent);
    out.push_str(" then\n");
    statements(out, &statement.if_block.statements, indent + 1);
    pad(out, indent);
    match &statement.else_block {
        Some(ElseBranch::If(nested)) => {
            out.push_str("else");
            if_chain(out, nested, indent);
        }
        Some(ElseBranch::Block(block)) => {
            out.push_str("else\n");
            statements(out, &block.statements, indent + 1);
            pad(out, indent);
            out.push_str("end");
        }
        None => out.push_str("end"),
    }
}

fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn binary_operator(operator: BinaryOperator) -> &'static str {
    use BinaryOperator::*;
    match operator {
        Addition => "+",
        Subtraction => "-",
        Multiplication => "*",
        Division => "/",
        FloorDivision => "//",
        Modulo => "%",
        Power => "^",
        Concat => "..",
        Equality => "==",
        Inequality => "~=",
        LessThan => "<",
        LessEqual => "<=",
        GreaterThan => ">",
        GreaterEqual => ">=",
        And => "and",
        Or => "or",
        BitwiseAnd => "&",
        BitwiseOr => "|",
        BitwiseExclusiveOr => "~",
        BitwiseRightShift => ">>",
        BitwiseLeftShift => "<<",
    }
}

fn expr(out: &mut String, expression: &Expression, indent: usize) {
    match expression {
        Expression::StringLiteral(s) => {
            out.push('"');
            for c in s.value.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        Expression::NumericLiteral(n) => out.push_str(&number(n.value)),
        Expression::Nil(_) => out.push_str("nil"),
        Expression::Dots(_) => out.push_str("..."),
        Expression::Boolean(b) => out.push_str(if b.value { "true" } else { "false" }),
        Expression::Function(f) => {
            let mut params: Vec<&str> = f.params.iter().map(|p| p.text.as_str()).collect();
            if f.dots {
                params.push("...");
            }
            let _ = writeln!(out, "function({})", params.join(", "));
            statements(out, &f.body.statements, indent + 1);
            pad(out, indent);
            out.push_str("end");
        }
        Expression::Table(t) => {
            out.push('{');
            for (i, field) in t.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(key) = &field.key {
                    out.push('[');
                    expr(out, key, indent);
                    out.push_str("] = ");
                }
                expr(out, &field.value, indent);
            }
            out.push('}');
        }
        Expression::Unary(u) => {
            out.push_str(match u.operator {
                UnaryOperator::Negation => "-",
                UnaryOperator::Length => "#",
                UnaryOperator::Not => "not ",
                UnaryOperator::BitwiseNot => "~",
            });
            expr(out, &u.operand, indent);
        }
        Expression::Binary(b) => {
            expr(out, &b.left, indent);
            let _ = write!(out, " {} ", binary_operator(b.operator));
            expr(out, &b.right, indent);
        }
        Expression::Parenthesized(p) => {
            out.push('(');
            expr(out, &p.inner_expression, indent);
            out.push(')');
        }
        Expression::Call(c) => {
            expr(out, &c.expression, indent);
            out.push('(');
            list(out, &c.params, indent);
            out.push(')');
        }
        Expression::MethodCall(c) => {
            expr(out, &c.prefix_expression, indent);
            let _ = write!(out, ":{}(", c.name.text);
            list(out, &c.params, indent);
            out.push(')');
        }
        Expression::Identifier(i) => out.push_str(&i.text),
        Expression::TableIndex(t) => {
            expr(out, &t.table, indent);
            out.push('[');
            expr(out, &t.index, indent);
            out.push(']');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_nested_blocks() {
        let body = create_block(
            vec![create_return_statement(vec![create_numeric_literal(1.5, None)], None)],
            None,
        );
        let function = create_function_expression(body, vec![], true, None, FunctionExpressionFlags::NONE, None);
        let statement = create_variable_declaration_statement(
            vec![create_identifier("f", None, None, None)],
            Some(vec![function]),
            None,
        );
        let block = create_block(vec![create_do_statement(vec![statement], None)], None);
        assert_eq!(
            render_block(&block),
            "do\n    local f = function(...)\n        return 1.5\n    end\nend\n"
        );
    }
}
