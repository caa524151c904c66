// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for the typed source language.
//!
//! These structures are the input boundary of the backend: an external
//! frontend parses and type-checks the source and hands over a tree of
//! these nodes together with a [`crate::oracle::NameOracle`]. The backend
//! never mutates the tree; per-node bookkeeping (such as memoized
//! resolution) lives in side tables keyed by [`NodeId`].
//!
//! The shapes are ESTree-compatible where possible. Variants without a
//! compilation rule still exist here so that the emitter can reject them
//! loudly instead of miscompiling.

/// Identity of an AST node, assigned by the frontend.
///
/// Must be unique within one compilation unit. The resolver keys its
/// memoization side table by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// A complete program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The top-level statements
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// Node identity, for resolution side tables
    pub id: NodeId,
    /// The name of the identifier
    pub name: String,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Empty statement `;`
    Empty,
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(FunctionDeclaration),
    /// Expression statement
    Expression(Expression),
    /// Return statement
    Return(ReturnStatement),
    /// Block statement `{ ... }` (no compilation rule yet)
    Block(Vec<Statement>),
    /// If statement (no compilation rule yet)
    If(IfStatement),
    /// While statement (no compilation rule yet)
    While(WhileStatement),
}

/// The declaration kind of a variable statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// `var` — function-scoped, backed by the environment table
    Var,
    /// `let` — block-scoped
    Let,
    /// `const` — block-scoped, immutable
    Const,
}

impl VariableKind {
    /// Whether this kind declares a block-scoped (register-local) binding.
    pub fn is_block_scoped(self) -> bool {
        matches!(self, VariableKind::Let | VariableKind::Const)
    }
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// var, let, or const
    pub kind: VariableKind,
    /// The individual declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single declarator within a variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The declared name
    pub id: Identifier,
    /// The initializer expression, if any
    pub init: Option<Expression>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// The function name
    pub id: Identifier,
    /// The parameter list
    pub params: Vec<Identifier>,
    /// The function body statements
    pub body: Vec<Statement>,
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// The returned expression, if any
    pub argument: Option<Expression>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then-branch
    pub consequent: Box<Statement>,
    /// The else-branch, if any
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The loop condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Boolean literal
    Boolean(bool),
    /// Null literal
    Null,
    /// Numeric literal
    Number(NumberLiteral),
    /// String literal
    String(String),
    /// Identifier reference
    Identifier(Identifier),
    /// Property access `a.b`
    Member(MemberExpression),
    /// Element access `a[b]`
    Index(IndexExpression),
    /// Binary expression, including assignment
    Binary(BinaryExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Call expression
    Call(CallExpression),
    /// Function expression
    Function(FunctionExpression),
    /// Arrow function
    Arrow(ArrowFunction),
    /// Array literal
    Array(Vec<Expression>),
    /// Object literal (no compilation rule yet)
    Object(Vec<(Identifier, Expression)>),
}

/// A numeric literal, already split into the VM's two number subtypes.
///
/// The frontend decides integer-ness lexically (`5` is an integer,
/// `5.0` is a float), so constant tagging in the output is exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberLiteral {
    /// An integer literal
    Integer(i64),
    /// A floating-point literal
    Float(f64),
}

/// A property access expression `object.property`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object being accessed
    pub object: Box<Expression>,
    /// The property name
    pub property: Identifier,
}

/// An element access expression `object[index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    /// The object being indexed
    pub object: Box<Expression>,
    /// The index expression
    pub index: Box<Expression>,
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators, including plain assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `=`
    Assign,
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `**`
    Exponent,
    // Bitwise
    /// `&`
    BitwiseAnd,
    /// `|`
    BitwiseOr,
    /// `^`
    BitwiseXor,
    /// `<<`
    LeftShift,
    /// `>>`
    RightShift,
    /// `>>>`
    UnsignedRightShift,
    // Comparison (no opcode mapping yet)
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `===`
    StrictEqual,
    /// `!==`
    StrictNotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
    // Logical (no opcode mapping yet)
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
}

impl BinaryOperator {
    /// Source-level spelling, for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Assign => "=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Exponent => "**",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::UnsignedRightShift => ">>>",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::StrictEqual => "===",
            BinaryOperator::StrictNotEqual => "!==",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanEqual => ">=",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
        }
    }
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `-`
    Minus,
    /// `+` (no opcode mapping yet)
    Plus,
    /// `!`
    LogicalNot,
    /// `~`
    BitwiseNot,
    /// `typeof` (no opcode mapping yet)
    Typeof,
}

impl UnaryOperator {
    /// Source-level spelling, for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::Typeof => "typeof",
        }
    }
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee expression
    pub callee: Box<Expression>,
    /// The argument expressions
    pub arguments: Vec<Expression>,
}

/// A function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    /// The parameter list
    pub params: Vec<Identifier>,
    /// The function body statements
    pub body: Vec<Statement>,
}

/// An arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    /// The parameter list
    pub params: Vec<Identifier>,
    /// The body, either a block or a bare expression
    pub body: ArrowBody,
}

/// The body of an arrow function.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    /// A block body `=> { ... }`
    Block(Vec<Statement>),
    /// An expression body `=> expr` (no compilation rule yet)
    Expression(Box<Expression>),
}
