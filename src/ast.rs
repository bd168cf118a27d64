//! AST for the JS-literal grammar
//!
//! `undefined`, `NaN` and `Infinity` are plain identifiers here; the evaluator
//! resolves them from its global scope, as JS does.

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    /// Key order is source order
    Object(Vec<(String, Expr)>),
    Function(Arc<FunctionDef>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `object.name` is stored as `Member { property: Str(name) }`
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// A function or arrow expression
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Set for `function name(...) {}`; bound inside the body for recursion
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: FunctionBody,
    /// Exact source slice, kept for `toString` and serialization
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// Arrow concise body: `x => x + 1`
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let`, `const`, `var` and function declarations
    Let { name: String, init: Option<Expr> },
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Expr(Expr),
}
