//! Node constructors.
//!
//! Each `create_*` function takes the node's children and an optional
//! source position, allocates a fresh [`NodeId`] and points the `parent`
//! link of every direct child at the new node.

use crate::ast::*;

fn adopt<N: Node>(child: &mut N, parent: NodeId) {
    child.meta_mut().parent = Some(parent);
}

fn adopt_all<N: Node>(children: &mut [N], parent: NodeId) {
    for child in children {
        adopt(child, parent);
    }
}

pub fn create_block(mut statements: Vec<Statement>, original: Option<Position>) -> Block {
    let meta = NodeMeta::new(original);
    adopt_all(&mut statements, meta.id);
    Block { meta, statements }
}

pub fn create_do_statement(mut statements: Vec<Statement>, original: Option<Position>) -> Statement {
    let meta = NodeMeta::new(original);
    adopt_all(&mut statements, meta.id);
    Statement::Do(DoStatement { meta, statements })
}

pub fn create_variable_declaration_statement(
    mut left: Vec<Identifier>,
    right: Option<Vec<Expression>>,
    original: Option<Position>,
) -> Statement {
    let meta = NodeMeta::new(original);
    adopt_all(&mut left, meta.id);
    let right = right.map(|mut right| {
        adopt_all(&mut right, meta.id);
        right
    });
    Statement::VariableDeclaration(VariableDeclarationStatement { meta, left, right })
}

pub fn create_assignment_statement(
    mut left: Vec<AssignmentLeftHandSide>,
    mut right: Vec<Expression>,
    original: Option<Position>,
) -> Statement {
    let meta = NodeMeta::new(original);
    adopt_all(&mut left, meta.id);
    adopt_all(&mut right, meta.id);
    Statement::Assignment(AssignmentStatement { meta, left, right })
}

pub fn create_if_statement(
    condition: Expression,
    if_block: Block,
    else_block: Option<ElseBranch>,
    original: Option<Position>,
) -> IfStatement {
    let meta = NodeMeta::new(original);
    let mut statement = IfStatement {
        meta,
        condition,
        if_block,
        else_block,
    };
    let id = statement.meta.id;
    adopt(&mut statement.condition, id);
    adopt(&mut statement.if_block, id);
    match &mut statement.else_block {
        Some(ElseBranch::Block(block)) => adopt(block, id),
        Some(ElseBranch::If(nested)) => adopt(nested.as_mut(), id),
        None => {}
    }
    statement
}

pub fn create_while_statement(
    mut body: Block,
    mut condition: Expression,
    original: Option<Position>,
) -> Statement {
    let meta = NodeMeta::new(original);
    adopt(&mut body, meta.id);
    adopt(&mut condition, meta.id);
    Statement::While(WhileStatement {
        meta,
        body,
        condition,
    })
}

pub fn create_repeat_statement(
    mut body: Block,
    mut condition: Expression,
    original: Option<Position>,
) -> Statement {
    let meta = NodeMeta::new(original);
    adopt(&mut body, meta.id);
    adopt(&mut condition, meta.id);
    Statement::Repeat(RepeatStatement {
        meta,
        body,
        condition,
    })
}

pub fn create_for_statement(
    mut body: Block,
    mut control_variable: Identifier,
    mut control_variable_initializer: Expression,
    mut limit_expression: Expression,
    mut step_expression: Option<Expression>,
    original: Option<Position>,
) -> Statement {
    let meta = NodeMeta::new(original);
    adopt(&mut body, meta.id);
    adopt(&mut control_variable, meta.id);
    adopt(&mut control_variable_initializer, meta.id);
    adopt(&mut limit_expression, meta.id);
    if let Some(step) = step_expression.as_mut() {
        adopt(step, meta.id);
    }
    Statement::For(ForStatement {
        meta,
        body,
        control_variable,
        control_variable_initializer,
        limit_expression,
        step_expression,
    })
}

pub fn create_for_in_statement(
    mut body: Block,
    mut names: Vec<Identifier>,
    mut expressions: Vec<Expression>,
    original: Option<Position>,
) -> Statement {
    let meta = NodeMeta::new(original);
    adopt(&mut body, meta.id);
    adopt_all(&mut names, meta.id);
    adopt_all(&mut expressions, meta.id);
    Statement::ForIn(ForInStatement {
        meta,
        body,
        names,
        expressions,
    })
}

pub fn create_goto_statement(label: impl Into<String>, original: Option<Position>) -> Statement {
    Statement::Goto(GotoStatement {
        meta: NodeMeta::new(original),
        label: label.into(),
    })
}

pub fn create_label_statement(name: impl Into<String>, original: Option<Position>) -> Statement {
    Statement::Label(LabelStatement {
        meta: NodeMeta::new(original),
        name: name.into(),
    })
}

pub fn create_return_statement(mut expressions: Vec<Expression>, original: Option<Position>) -> Statement {
    let meta = NodeMeta::new(original);
    adopt_all(&mut expressions, meta.id);
    Statement::Return(ReturnStatement { meta, expressions })
}

pub fn create_break_statement(original: Option<Position>) -> Statement {
    Statement::Break(BreakStatement {
        meta: NodeMeta::new(original),
    })
}

pub fn create_expression_statement(mut expression: Expression, original: Option<Position>) -> Statement {
    let meta = NodeMeta::new(original);
    adopt(&mut expression, meta.id);
    Statement::Expression(ExpressionStatement { meta, expression })
}

pub fn create_nil_literal(original: Option<Position>) -> Expression {
    Expression::Nil(NilLiteral {
        meta: NodeMeta::new(original),
    })
}

pub fn create_boolean_literal(value: bool, original: Option<Position>) -> Expression {
    Expression::Boolean(BooleanLiteral {
        meta: NodeMeta::new(original),
        value,
    })
}

pub fn create_dots_literal(original: Option<Position>) -> Expression {
    Expression::Dots(DotsLiteral {
        meta: NodeMeta::new(original),
    })
}

pub fn create_numeric_literal(value: f64, original: Option<Position>) -> Expression {
    Expression::NumericLiteral(NumericLiteral {
        meta: NodeMeta::new(original),
        value,
    })
}

pub fn create_string_literal(value: impl Into<String>, original: Option<Position>) -> Expression {
    Expression::StringLiteral(StringLiteral {
        meta: NodeMeta::new(original),
        value: value.into(),
    })
}

pub fn create_function_expression(
    mut body: Block,
    mut params: Vec<Identifier>,
    dots: bool,
    mut rest_param_name: Option<Identifier>,
    flags: FunctionExpressionFlags,
    original: Option<Position>,
) -> Expression {
    let meta = NodeMeta::new(original);
    adopt(&mut body, meta.id);
    adopt_all(&mut params, meta.id);
    if let Some(rest) = rest_param_name.as_mut() {
        adopt(rest, meta.id);
    }
    Expression::Function(FunctionExpression {
        meta,
        params,
        dots,
        rest_param_name,
        body,
        flags,
    })
}

pub fn create_table_field_expression(
    mut value: Expression,
    mut key: Option<Expression>,
    original: Option<Position>,
) -> TableFieldExpression {
    let meta = NodeMeta::new(original);
    adopt(&mut value, meta.id);
    if let Some(key) = key.as_mut() {
        adopt(key, meta.id);
    }
    TableFieldExpression { meta, value, key }
}

pub fn create_table_expression(mut fields: Vec<TableFieldExpression>, original: Option<Position>) -> Expression {
    let meta = NodeMeta::new(original);
    adopt_all(&mut fields, meta.id);
    Expression::Table(TableExpression { meta, fields })
}

pub fn create_unary_expression(
    mut operand: Expression,
    operator: UnaryOperator,
    original: Option<Position>,
) -> Expression {
    let meta = NodeMeta::new(original);
    adopt(&mut operand, meta.id);
    Expression::Unary(UnaryExpression {
        meta,
        operand: Box::new(operand),
        operator,
    })
}

pub fn create_binary_expression(
    mut left: Expression,
    mut right: Expression,
    operator: BinaryOperator,
    original: Option<Position>,
) -> Expression {
    let meta = NodeMeta::new(original);
    adopt(&mut left, meta.id);
    adopt(&mut right, meta.id);
    Expression::Binary(BinaryExpression {
        meta,
        left: Box::new(left),
        right: Box::new(right),
        operator,
    })
}

pub fn create_parenthesized_expression(mut inner: Expression, original: Option<Position>) -> Expression {
    let meta = NodeMeta::new(original);
    adopt(&mut inner, meta.id);
    Expression::Parenthesized(ParenthesizedExpression {
        meta,
        inner_expression: Box::new(inner),
    })
}

pub fn create_call_expression(
    mut expression: Expression,
    mut params: Vec<Expression>,
    original: Option<Position>,
) -> Expression {
    let meta = NodeMeta::new(original);
    adopt(&mut expression, meta.id);
    adopt_all(&mut params, meta.id);
    Expression::Call(CallExpression {
        meta,
        expression: Box::new(expression),
        params,
    })
}

pub fn create_method_call_expression(
    mut prefix_expression: Expression,
    mut name: Identifier,
    mut params: Vec<Expression>,
    original: Option<Position>,
) -> Expression {
    let meta = NodeMeta::new(original);
    adopt(&mut prefix_expression, meta.id);
    adopt(&mut name, meta.id);
    adopt_all(&mut params, meta.id);
    Expression::MethodCall(MethodCallExpression {
        meta,
        prefix_expression: Box::new(prefix_expression),
        name,
        params,
    })
}

pub fn create_identifier(
    text: impl Into<String>,
    original: Option<Position>,
    symbol_id: Option<u32>,
    original_name: Option<String>,
) -> Identifier {
    Identifier {
        meta: NodeMeta::new(original),
        text: text.into(),
        symbol_id,
        original_name,
    }
}

/// Copy of an identifier with a fresh id, optionally re-positioned.
pub fn clone_identifier(identifier: &Identifier, original: Option<Position>) -> Identifier {
    create_identifier(
        identifier.text.clone(),
        original,
        identifier.symbol_id,
        identifier.original_name.clone(),
    )
}

/// The `____` placeholder used for ignored values and anonymous names.
pub fn create_anonymous_identifier(original: Option<Position>) -> Identifier {
    create_identifier("____", original, None, None)
}

pub fn create_table_index_expression(
    mut table: Expression,
    mut index: Expression,
    original: Option<Position>,
) -> TableIndexExpression {
    let meta = NodeMeta::new(original);
    adopt(&mut table, meta.id);
    adopt(&mut index, meta.id);
    TableIndexExpression {
        meta,
        table: Box::new(table),
        index: Box::new(index),
    }
}

/// Copy of a node under a fresh id. The copy has no parent until it is
/// placed into a new container.
pub fn clone_node<N: Node + Clone>(node: &N) -> N {
    let mut copy = node.clone();
    let meta = copy.meta_mut();
    meta.id = NodeId::fresh();
    meta.parent = None;
    copy
}

pub fn set_node_position<N: Node>(mut node: N, position: Position) -> N {
    node.meta_mut().position = Some(position);
    node
}

/// Stamps `original` onto the node when it is known.
pub fn set_node_original<N: Node>(node: N, original: Option<Position>) -> N {
    match original {
        Some(position) => set_node_position(node, position),
        None => node,
    }
}
