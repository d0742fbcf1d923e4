//! Lua syntax tree node definitions
//!
//! A simplified Lua AST: keywords and punctuation are elided because the
//! tree is never produced from text. Every node carries a [`NodeMeta`]
//! with a unique id, the id of the node that contains it, and the source
//! position it was lowered from.

use bitflags::bitflags;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a node, unique for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Zero-based line and column of the TypeScript token a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMeta {
    pub id: NodeId,
    /// Non-owning link to the containing node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(flatten)]
    pub position: Option<Position>,
}

impl NodeMeta {
    pub fn new(position: Option<Position>) -> Self {
        Self {
            id: NodeId::fresh(),
            parent: None,
            position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyntaxKind {
    Block,

    // Statements
    DoStatement,
    VariableDeclarationStatement,
    AssignmentStatement,
    IfStatement,
    WhileStatement,
    RepeatStatement,
    ForStatement,
    ForInStatement,
    GotoStatement,
    LabelStatement,
    ReturnStatement,
    BreakStatement,
    ExpressionStatement,

    // Expressions
    StringLiteral,
    NumericLiteral,
    NilKeyword,
    DotsKeyword,
    TrueKeyword,
    FalseKeyword,
    FunctionExpression,
    TableFieldExpression,
    TableExpression,
    UnaryExpression,
    BinaryExpression,
    ParenthesizedExpression,
    CallExpression,
    MethodCallExpression,
    Identifier,
    TableIndexExpression,

    // Arithmetic
    AdditionOperator,
    SubtractionOperator,
    MultiplicationOperator,
    DivisionOperator,
    FloorDivisionOperator,
    ModuloOperator,
    PowerOperator,
    NegationOperator,
    ConcatOperator,
    LengthOperator,

    // Relational
    EqualityOperator,
    InequalityOperator,
    LessThanOperator,
    LessEqualOperator,
    GreaterThanOperator,
    GreaterEqualOperator,

    // Logical
    AndOperator,
    OrOperator,
    NotOperator,

    // Bitwise
    BitwiseAndOperator,
    BitwiseOrOperator,
    BitwiseExclusiveOrOperator,
    BitwiseRightShiftOperator,
    BitwiseLeftShiftOperator,
    BitwiseNotOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOperator {
    Negation,
    Length,
    Not,
    BitwiseNot,
}

impl UnaryOperator {
    pub fn kind(self) -> SyntaxKind {
        match self {
            UnaryOperator::Negation => SyntaxKind::NegationOperator,
            UnaryOperator::Length => SyntaxKind::LengthOperator,
            UnaryOperator::Not => SyntaxKind::NotOperator,
            UnaryOperator::BitwiseNot => SyntaxKind::BitwiseNotOperator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    FloorDivision,
    Modulo,
    Power,
    Concat,
    Equality,
    Inequality,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    And,
    Or,
    BitwiseAnd,
    BitwiseOr,
    BitwiseExclusiveOr,
    BitwiseRightShift,
    BitwiseLeftShift,
}

impl BinaryOperator {
    pub fn kind(self) -> SyntaxKind {
        match self {
            BinaryOperator::Addition => SyntaxKind::AdditionOperator,
            BinaryOperator::Subtraction => SyntaxKind::SubtractionOperator,
            BinaryOperator::Multiplication => SyntaxKind::MultiplicationOperator,
            BinaryOperator::Division => SyntaxKind::DivisionOperator,
            BinaryOperator::FloorDivision => SyntaxKind::FloorDivisionOperator,
            BinaryOperator::Modulo => SyntaxKind::ModuloOperator,
            BinaryOperator::Power => SyntaxKind::PowerOperator,
            BinaryOperator::Concat => SyntaxKind::ConcatOperator,
            BinaryOperator::Equality => SyntaxKind::EqualityOperator,
            BinaryOperator::Inequality => SyntaxKind::InequalityOperator,
            BinaryOperator::LessThan => SyntaxKind::LessThanOperator,
            BinaryOperator::LessEqual => SyntaxKind::LessEqualOperator,
            BinaryOperator::GreaterThan => SyntaxKind::GreaterThanOperator,
            BinaryOperator::GreaterEqual => SyntaxKind::GreaterEqualOperator,
            BinaryOperator::And => SyntaxKind::AndOperator,
            BinaryOperator::Or => SyntaxKind::OrOperator,
            BinaryOperator::BitwiseAnd => SyntaxKind::BitwiseAndOperator,
            BinaryOperator::BitwiseOr => SyntaxKind::BitwiseOrOperator,
            BinaryOperator::BitwiseExclusiveOr => SyntaxKind::BitwiseExclusiveOrOperator,
            BinaryOperator::BitwiseRightShift => SyntaxKind::BitwiseRightShiftOperator,
            BinaryOperator::BitwiseLeftShift => SyntaxKind::BitwiseLeftShiftOperator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Statement {
    Do(DoStatement),
    VariableDeclaration(VariableDeclarationStatement),
    Assignment(AssignmentStatement),
    If(IfStatement),
    While(WhileStatement),
    Repeat(RepeatStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    Goto(GotoStatement),
    Label(LabelStatement),
    Return(ReturnStatement),
    Break(BreakStatement),
    Expression(ExpressionStatement),
}

/// `do ... end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub statements: Vec<Statement>,
}

/// `local a, b = x, y`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclarationStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub left: Vec<Identifier>,
    /// `None` for a declaration without values
    pub right: Option<Vec<Expression>>,
}

/// `a, t[k] = x, y`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub left: Vec<AssignmentLeftHandSide>,
    pub right: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub condition: Expression,
    pub if_block: Block,
    pub else_block: Option<ElseBranch>,
}

/// `else` body or a chained `elseif`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfStatement>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhileStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub body: Block,
    pub condition: Expression,
}

/// `repeat ... until condition`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub body: Block,
    pub condition: Expression,
}

/// Numeric `for i = init, limit, step do ... end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub body: Block,
    pub control_variable: Identifier,
    pub control_variable_initializer: Expression,
    pub limit_expression: Expression,
    pub step_expression: Option<Expression>,
}

/// Generic `for a, b in explist do ... end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForInStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub body: Block,
    pub names: Vec<Identifier>,
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GotoStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionStatement {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Expression {
    StringLiteral(StringLiteral),
    NumericLiteral(NumericLiteral),
    Nil(NilLiteral),
    Dots(DotsLiteral),
    Boolean(BooleanLiteral),
    Function(FunctionExpression),
    Table(TableExpression),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Parenthesized(ParenthesizedExpression),
    Call(CallExpression),
    MethodCall(MethodCallExpression),
    Identifier(Identifier),
    TableIndex(TableIndexExpression),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringLiteral {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericLiteral {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NilLiteral {
    #[serde(flatten)]
    pub meta: NodeMeta,
}

/// `...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DotsLiteral {
    #[serde(flatten)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanLiteral {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub value: bool,
}

bitflags! {
    /// Bit flags carried by function expressions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct FunctionExpressionFlags: u8 {
        const NONE = 0;
        /// Lowered from an arrow function with an expression body
        const INLINE = 1;
        /// Lowered from a function or method declaration
        const DECLARATION = 1 << 1;
    }
}

impl Default for FunctionExpressionFlags {
    fn default() -> Self {
        Self::NONE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub params: Vec<Identifier>,
    pub dots: bool,
    pub rest_param_name: Option<Identifier>,
    pub body: Block,
    pub flags: FunctionExpressionFlags,
}

/// One entry of a table constructor: `value` or `[key] = value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFieldExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub value: Expression,
    pub key: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub fields: Vec<TableFieldExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnaryExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub operand: Box<Expression>,
    pub operator: UnaryOperator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub operator: BinaryOperator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParenthesizedExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub inner_expression: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub expression: Box<Expression>,
    pub params: Vec<Expression>,
}

/// `prefix:name(params)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodCallExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub prefix_expression: Box<Expression>,
    pub name: Identifier,
    pub params: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub text: String,
    /// Transformer symbol id used for hoisting decisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_id: Option<u32>,
    /// Name in the TypeScript source when it differs from `text`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

/// `table[index]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableIndexExpression {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub table: Box<Expression>,
    pub index: Box<Expression>,
}

/// Expressions that may appear on the left of `=`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AssignmentLeftHandSide {
    Identifier(Identifier),
    TableIndex(TableIndexExpression),
}

/// Access to the shared metadata of every node type.
pub trait Node {
    fn meta(&self) -> &NodeMeta;
    fn meta_mut(&mut self) -> &mut NodeMeta;
    fn kind(&self) -> SyntaxKind;

    fn id(&self) -> NodeId {
        self.meta().id
    }

    fn parent(&self) -> Option<NodeId> {
        self.meta().parent
    }

    fn position(&self) -> Option<Position> {
        self.meta().position
    }
}

macro_rules! impl_node {
    ($($ty:ident => $kind:ident),* $(,)?) => {
        $(
            impl Node for $ty {
                fn meta(&self) -> &NodeMeta {
                    &self.meta
                }
                fn meta_mut(&mut self) -> &mut NodeMeta {
                    &mut self.meta
                }
                fn kind(&self) -> SyntaxKind {
                    SyntaxKind::$kind
                }
            }
        )*
    };
}

impl_node! {
    Block => Block,
    DoStatement => DoStatement,
    VariableDeclarationStatement => VariableDeclarationStatement,
    AssignmentStatement => AssignmentStatement,
    IfStatement => IfStatement,
    WhileStatement => WhileStatement,
    RepeatStatement => RepeatStatement,
    ForStatement => ForStatement,
    ForInStatement => ForInStatement,
    GotoStatement => GotoStatement,
    LabelStatement => LabelStatement,
    ReturnStatement => ReturnStatement,
    BreakStatement => BreakStatement,
    ExpressionStatement => ExpressionStatement,
    StringLiteral => StringLiteral,
    NumericLiteral => NumericLiteral,
    NilLiteral => NilKeyword,
    DotsLiteral => DotsKeyword,
    FunctionExpression => FunctionExpression,
    TableFieldExpression => TableFieldExpression,
    TableExpression => TableExpression,
    UnaryExpression => UnaryExpression,
    BinaryExpression => BinaryExpression,
    ParenthesizedExpression => ParenthesizedExpression,
    CallExpression => CallExpression,
    MethodCallExpression => MethodCallExpression,
    Identifier => Identifier,
    TableIndexExpression => TableIndexExpression,
}

impl Node for BooleanLiteral {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }
    fn kind(&self) -> SyntaxKind {
        if self.value {
            SyntaxKind::TrueKeyword
        } else {
            SyntaxKind::FalseKeyword
        }
    }
}

impl Node for Statement {
    fn meta(&self) -> &NodeMeta {
        match self {
            Statement::Do(s) => &s.meta,
            Statement::VariableDeclaration(s) => &s.meta,
            Statement::Assignment(s) => &s.meta,
            Statement::If(s) => &s.meta,
            Statement::While(s) => &s.meta,
            Statement::Repeat(s) => &s.meta,
            Statement::For(s) => &s.meta,
            Statement::ForIn(s) => &s.meta,
            Statement::Goto(s) => &s.meta,
            Statement::Label(s) => &s.meta,
            Statement::Return(s) => &s.meta,
            Statement::Break(s) => &s.meta,
            Statement::Expression(s) => &s.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            Statement::Do(s) => &mut s.meta,
            Statement::VariableDeclaration(s) => &mut s.meta,
            Statement::Assignment(s) => &mut s.meta,
            Statement::If(s) => &mut s.meta,
            Statement::While(s) => &mut s.meta,
            Statement::Repeat(s) => &mut s.meta,
            Statement::For(s) => &mut s.meta,
            Statement::ForIn(s) => &mut s.meta,
            Statement::Goto(s) => &mut s.meta,
            Statement::Label(s) => &mut s.meta,
            Statement::Return(s) => &mut s.meta,
            Statement::Break(s) => &mut s.meta,
            Statement::Expression(s) => &mut s.meta,
        }
    }

    fn kind(&self) -> SyntaxKind {
        match self {
            Statement::Do(s) => s.kind(),
            Statement::VariableDeclaration(s) => s.kind(),
            Statement::Assignment(s) => s.kind(),
            Statement::If(s) => s.kind(),
            Statement::While(s) => s.kind(),
            Statement::Repeat(s) => s.kind(),
            Statement::For(s) => s.kind(),
            Statement::ForIn(s) => s.kind(),
            Statement::Goto(s) => s.kind(),
            Statement::Label(s) => s.kind(),
            Statement::Return(s) => s.kind(),
            Statement::Break(s) => s.kind(),
            Statement::Expression(s) => s.kind(),
        }
    }
}

impl Node for Expression {
    fn meta(&self) -> &NodeMeta {
        match self {
            Expression::StringLiteral(e) => &e.meta,
            Expression::NumericLiteral(e) => &e.meta,
            Expression::Nil(e) => &e.meta,
            Expression::Dots(e) => &e.meta,
            Expression::Boolean(e) => &e.meta,
            Expression::Function(e) => &e.meta,
            Expression::Table(e) => &e.meta,
            Expression::Unary(e) => &e.meta,
            Expression::Binary(e) => &e.meta,
            Expression::Parenthesized(e) => &e.meta,
            Expression::Call(e) => &e.meta,
            Expression::MethodCall(e) => &e.meta,
            Expression::Identifier(e) => &e.meta,
            Expression::TableIndex(e) => &e.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            Expression::StringLiteral(e) => &mut e.meta,
            Expression::NumericLiteral(e) => &mut e.meta,
            Expression::Nil(e) => &mut e.meta,
            Expression::Dots(e) => &mut e.meta,
            Expression::Boolean(e) => &mut e.meta,
            Expression::Function(e) => &mut e.meta,
            Expression::Table(e) => &mut e.meta,
            Expression::Unary(e) => &mut e.meta,
            Expression::Binary(e) => &mut e.meta,
            Expression::Parenthesized(e) => &mut e.meta,
            Expression::Call(e) => &mut e.meta,
            Expression::MethodCall(e) => &mut e.meta,
            Expression::Identifier(e) => &mut e.meta,
            Expression::TableIndex(e) => &mut e.meta,
        }
    }

    fn kind(&self) -> SyntaxKind {
        match self {
            Expression::StringLiteral(e) => e.kind(),
            Expression::NumericLiteral(e) => e.kind(),
            Expression::Nil(e) => e.kind(),
            Expression::Dots(e) => e.kind(),
            Expression::Boolean(e) => e.kind(),
            Expression::Function(e) => e.kind(),
            Expression::Table(e) => e.kind(),
            Expression::Unary(e) => e.kind(),
            Expression::Binary(e) => e.kind(),
            Expression::Parenthesized(e) => e.kind(),
            Expression::Call(e) => e.kind(),
            Expression::MethodCall(e) => e.kind(),
            Expression::Identifier(e) => e.kind(),
            Expression::TableIndex(e) => e.kind(),
        }
    }
}

impl Node for AssignmentLeftHandSide {
    fn meta(&self) -> &NodeMeta {
        match self {
            AssignmentLeftHandSide::Identifier(e) => &e.meta,
            AssignmentLeftHandSide::TableIndex(e) => &e.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            AssignmentLeftHandSide::Identifier(e) => &mut e.meta,
            AssignmentLeftHandSide::TableIndex(e) => &mut e.meta,
        }
    }

    fn kind(&self) -> SyntaxKind {
        match self {
            AssignmentLeftHandSide::Identifier(_) => SyntaxKind::Identifier,
            AssignmentLeftHandSide::TableIndex(_) => SyntaxKind::TableIndexExpression,
        }
    }
}

macro_rules! impl_into_expression {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Expression {
                fn from(node: $ty) -> Self {
                    Expression::$variant(node)
                }
            }
        )*
    };
}

impl_into_expression! {
    StringLiteral => StringLiteral,
    NumericLiteral => NumericLiteral,
    NilLiteral => Nil,
    DotsLiteral => Dots,
    BooleanLiteral => Boolean,
    FunctionExpression => Function,
    TableExpression => Table,
    UnaryExpression => Unary,
    BinaryExpression => Binary,
    ParenthesizedExpression => Parenthesized,
    CallExpression => Call,
    MethodCallExpression => MethodCall,
    Identifier => Identifier,
    TableIndexExpression => TableIndex,
}

impl From<AssignmentLeftHandSide> for Expression {
    fn from(node: AssignmentLeftHandSide) -> Self {
        match node {
            AssignmentLeftHandSide::Identifier(e) => Expression::Identifier(e),
            AssignmentLeftHandSide::TableIndex(e) => Expression::TableIndex(e),
        }
    }
}

impl From<Identifier> for AssignmentLeftHandSide {
    fn from(node: Identifier) -> Self {
        AssignmentLeftHandSide::Identifier(node)
    }
}

impl From<TableIndexExpression> for AssignmentLeftHandSide {
    fn from(node: TableIndexExpression) -> Self {
        AssignmentLeftHandSide::TableIndex(node)
    }
}

impl TryFrom<Expression> for AssignmentLeftHandSide {
    type Error = Expression;

    fn try_from(expression: Expression) -> Result<Self, Expression> {
        match expression {
            Expression::Identifier(e) => Ok(AssignmentLeftHandSide::Identifier(e)),
            Expression::TableIndex(e) => Ok(AssignmentLeftHandSide::TableIndex(e)),
            other => Err(other),
        }
    }
}

macro_rules! impl_into_statement {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Statement {
                fn from(node: $ty) -> Self {
                    Statement::$variant(node)
                }
            }
        )*
    };
}

impl_into_statement! {
    DoStatement => Do,
    VariableDeclarationStatement => VariableDeclaration,
    AssignmentStatement => Assignment,
    IfStatement => If,
    WhileStatement => While,
    RepeatStatement => Repeat,
    ForStatement => For,
    ForInStatement => ForIn,
    GotoStatement => Goto,
    LabelStatement => Label,
    ReturnStatement => Return,
    BreakStatement => Break,
    ExpressionStatement => Expression,
}
