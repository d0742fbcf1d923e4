//! Predicates and in-place statement rewriting.

use crate::ast::*;

pub fn is_assignment_left_hand_side_expression(expression: &Expression) -> bool {
    matches!(expression, Expression::Identifier(_) | Expression::TableIndex(_))
}

/// `local f = function() end` or `f = function() end` with a single target.
pub fn is_function_definition(statement: &Statement) -> bool {
    match statement {
        Statement::VariableDeclaration(declaration) => {
            declaration.left.len() == 1
                && matches!(declaration.right.as_deref(), Some([Expression::Function(_)]))
        }
        Statement::Assignment(assignment) => {
            assignment.left.len() == 1
                && matches!(assignment.right.as_slice(), [Expression::Function(_)])
        }
        _ => false,
    }
}

/// An expression-bodied arrow function: `function(...) return e end` with
/// the inline flag set.
pub fn is_inline_function_expression(expression: &FunctionExpression) -> bool {
    expression.flags.contains(FunctionExpressionFlags::INLINE)
        && matches!(
            expression.body.statements.as_slice(),
            [Statement::Return(ret)] if !ret.expressions.is_empty()
        )
}

pub fn is_iteration_statement(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::While(_) | Statement::Repeat(_) | Statement::For(_) | Statement::ForIn(_)
    )
}

/// True when evaluating the expression cannot call anything.
pub fn is_simple_expression(expression: &Expression) -> bool {
    match expression {
        Expression::Call(_) | Expression::MethodCall(_) | Expression::Function(_) => false,
        Expression::Table(table) => table.fields.iter().all(|field| {
            field.key.as_ref().map_or(true, is_simple_expression) && is_simple_expression(&field.value)
        }),
        Expression::TableIndex(index) => {
            is_simple_expression(&index.table) && is_simple_expression(&index.index)
        }
        Expression::Unary(unary) => is_simple_expression(&unary.operand),
        Expression::Binary(binary) => {
            is_simple_expression(&binary.left) && is_simple_expression(&binary.right)
        }
        Expression::Parenthesized(paren) => is_simple_expression(&paren.inner_expression),
        _ => true,
    }
}

/// Statement lists directly owned by `statement`, together with the id of
/// the node that owns each list.
fn child_lists(statement: &mut Statement) -> Vec<(NodeId, &mut Vec<Statement>)> {
    fn block(b: &mut Block) -> (NodeId, &mut Vec<Statement>) {
        (b.meta.id, &mut b.statements)
    }

    match statement {
        Statement::Do(d) => vec![(d.meta.id, &mut d.statements)],
        Statement::If(i) => if_lists(i),
        Statement::While(w) => vec![block(&mut w.body)],
        Statement::Repeat(r) => vec![block(&mut r.body)],
        Statement::For(f) => vec![block(&mut f.body)],
        Statement::ForIn(f) => vec![block(&mut f.body)],
        Statement::VariableDeclaration(v) => {
            let mut lists = Vec::new();
            for e in v.right.iter_mut().flatten() {
                function_lists(e, &mut lists);
            }
            lists
        }
        Statement::Assignment(a) => {
            let mut lists = Vec::new();
            for e in a.right.iter_mut() {
                function_lists(e, &mut lists);
            }
            lists
        }
        Statement::Return(r) => {
            let mut lists = Vec::new();
            for e in r.expressions.iter_mut() {
                function_lists(e, &mut lists);
            }
            lists
        }
        Statement::Expression(e) => {
            let mut lists = Vec::new();
            function_lists(&mut e.expression, &mut lists);
            lists
        }
        Statement::Goto(_) | Statement::Label(_) | Statement::Break(_) => Vec::new(),
    }
}

/// Bodies of function expressions reachable through calls and parentheses,
/// which is where `pcall` closures and IIFEs keep their statements.
fn function_lists<'a>(expression: &'a mut Expression, lists: &mut Vec<(NodeId, &'a mut Vec<Statement>)>) {
    match expression {
        Expression::Function(f) => lists.push((f.body.meta.id, &mut f.body.statements)),
        Expression::Call(c) => {
            function_lists(&mut c.expression, lists);
            for p in c.params.iter_mut() {
                function_lists(p, lists);
            }
        }
        Expression::Parenthesized(p) => function_lists(&mut p.inner_expression, lists),
        _ => {}
    }
}

fn if_lists(statement: &mut IfStatement) -> Vec<(NodeId, &mut Vec<Statement>)> {
    let mut lists = vec![(statement.if_block.meta.id, &mut statement.if_block.statements)];
    match &mut statement.else_block {
        Some(ElseBranch::Block(b)) => lists.push((b.meta.id, &mut b.statements)),
        Some(ElseBranch::If(nested)) => lists.extend(if_lists(nested)),
        None => {}
    }
    lists
}

/// Finds the statement with `id` in `statements` or any nested block,
/// including bodies of functions passed to calls, and replaces it with the result of
/// `replace`, removing it when that returns `None`. The replacement is
/// re-parented to the container the original lived in.
///
/// Returns `false` when no statement with that id exists.
pub fn replace_statement<F>(statements: &mut Vec<Statement>, id: NodeId, replace: F) -> bool
where
    F: FnOnce(Statement) -> Option<Statement>,
{
    let mut replace = Some(replace);
    replace_in(statements, None, id, &mut replace)
}

fn replace_in<F>(
    statements: &mut Vec<Statement>,
    owner: Option<NodeId>,
    id: NodeId,
    replace: &mut Option<F>,
) -> bool
where
    F: FnOnce(Statement) -> Option<Statement>,
{
    if let Some(index) = statements.iter().position(|s| s.id() == id) {
        let Some(replace) = replace.take() else {
            return false;
        };
        let original = statements.remove(index);
        if let Some(mut replacement) = replace(original) {
            replacement.meta_mut().parent = owner;
            statements.insert(index, replacement);
        }
        return true;
    }

    for statement in statements.iter_mut() {
        for (owner, list) in child_lists(statement) {
            if replace_in(list, Some(owner), id, replace) {
                return true;
            }
        }
    }
    false
}

/// Depth-first walk over every statement, descending into nested blocks
/// and function bodies.
pub fn walk_statements<'a>(statements: &'a [Statement], visit: &mut dyn FnMut(&'a Statement)) {
    for statement in statements {
        visit(statement);
        match statement {
            Statement::Do(d) => walk_statements(&d.statements, visit),
            Statement::If(i) => walk_if(i, visit),
            Statement::While(w) => walk_statements(&w.body.statements, visit),
            Statement::Repeat(r) => walk_statements(&r.body.statements, visit),
            Statement::For(f) => walk_statements(&f.body.statements, visit),
            Statement::ForIn(f) => walk_statements(&f.body.statements, visit),
            Statement::VariableDeclaration(v) => {
                for e in v.right.iter().flatten() {
                    walk_expression_bodies(e, visit);
                }
            }
            Statement::Assignment(a) => {
                for e in &a.right {
                    walk_expression_bodies(e, visit);
                }
            }
            Statement::Return(r) => {
                for e in &r.expressions {
                    walk_expression_bodies(e, visit);
                }
            }
            Statement::Expression(e) => walk_expression_bodies(&e.expression, visit),
            Statement::Goto(_) | Statement::Label(_) | Statement::Break(_) => {}
        }
    }
}

fn walk_if<'a>(statement: &'a IfStatement, visit: &mut dyn FnMut(&'a Statement)) {
    walk_statements(&statement.if_block.statements, visit);
    match &statement.else_block {
        Some(ElseBranch::Block(b)) => walk_statements(&b.statements, visit),
        Some(ElseBranch::If(nested)) => walk_if(nested, visit),
        None => {}
    }
}

fn walk_expression_bodies<'a>(expression: &'a Expression, visit: &mut dyn FnMut(&'a Statement)) {
    match expression {
        Expression::Function(f) => walk_statements(&f.body.statements, visit),
        Expression::Call(c) => {
            walk_expression_bodies(&c.expression, visit);
            for p in &c.params {
                walk_expression_bodies(p, visit);
            }
        }
        Expression::MethodCall(c) => {
            walk_expression_bodies(&c.prefix_expression, visit);
            for p in &c.params {
                walk_expression_bodies(p, visit);
            }
        }
        Expression::Parenthesized(p) => walk_expression_bodies(&p.inner_expression, visit),
        Expression::Table(t) => {
            for field in &t.fields {
                walk_expression_bodies(&field.value, visit);
            }
        }
        Expression::Binary(b) => {
            walk_expression_bodies(&b.left, visit);
            walk_expression_bodies(&b.right, visit);
        }
        Expression::Unary(u) => walk_expression_bodies(&u.operand, visit),
        _ => {}
    }
}
