//! Abstract Syntax Tree node types
//!
//! Programs are built directly as typed AST values; there is no source text or
//! parser in this crate. All nodes serialize with tagged representations so
//! programs can round-trip through JSON.

use serde::{Deserialize, Serialize};

/// What kind of function a body belongs to. Decides how a call to it behaves:
/// ordinary run-to-completion, or the creation of a suspendable instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuncKind {
    Normal,
    Generator,
    Async,
    AsyncGenerator,
}

/// Function definition: parameters plus a statement-list body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub kind: FuncKind,
}

/// One `case`/`default` clause of a switch statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` marks the default clause.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// Catch clause of a try statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Vec<Stmt>,
}

/// Statement AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stmt {
    Block {
        body: Vec<Stmt>,
    },
    Let {
        name: String,
        init: Option<Expr>,
    },
    Expr {
        expr: Expr,
    },
    If {
        test: Expr,
        then_s: Box<Stmt>,
        else_s: Option<Box<Stmt>>,
    },
    While {
        label: Option<String>,
        test: Expr,
        body: Box<Stmt>,
    },
    /// Classic three-part loop with `let` declarations scoped per iteration.
    For {
        label: Option<String>,
        decls: Vec<(String, Expr)>,
        test: Option<Expr>,
        /// Post-body assignments (the "update" part).
        update: Vec<(String, Expr)>,
        body: Box<Stmt>,
    },
    ForOf {
        label: Option<String>,
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
        /// for-await-of: each produced value (or next-result) is awaited.
        awaits: bool,
    },
    Switch {
        disc: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Return {
        value: Option<Expr>,
    },
    Throw {
        expr: Expr,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Expression AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    LitUndefined,
    LitNull,
    LitBool { v: bool },
    LitNum { v: f64 },
    LitStr { v: String },
    Ident { name: String },
    Assign { name: String, expr: Box<Expr> },
    Member { object: Box<Expr>, property: String },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr> },
    Logical { op: LogicalOp, left: Box<Expr>, right: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    List { items: Vec<Expr> },
    ObjLit { entries: Vec<(String, Expr)> },
    Func { def: FuncDef },
    Await { inner: Box<Expr> },
    Yield { inner: Option<Box<Expr>> },
    YieldStar { inner: Box<Expr> },
}
