//! Runtime value types

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::ast::FuncDef;
use super::async_gen::AsyncGenRef;
use super::control::Signal;
use super::errors::ErrorInfo;
use super::frame::Scope;
use super::generator::GenRef;
use crate::promise::PromiseRef;
use crate::realm::Realm;

/// Shared mutable object: plain string-keyed property map.
pub type ObjRef = Rc<RefCell<HashMap<String, Val>>>;

/// Shared mutable list.
pub type ListRef = Rc<RefCell<Vec<Val>>>;

/// A host function callable from interpreted code.
#[derive(Clone)]
pub struct NativeFn {
    pub name: String,
    #[allow(clippy::type_complexity)]
    pub f: Rc<dyn Fn(&Realm, &[Val]) -> Result<Val, Signal>>,
}

impl NativeFn {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&Realm, &[Val]) -> Result<Val, Signal> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Rc::new(f),
        }
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

/// An interpreted function value: definition plus captured environment.
#[derive(Debug, Clone)]
pub struct ClosureData {
    pub def: Rc<FuncDef>,
    pub env: Scope,
}

/// Runtime value type
#[derive(Clone)]
pub enum Val {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(ListRef),
    Obj(ObjRef),
    Native(NativeFn),
    Closure(Rc<ClosureData>),
    Promise(PromiseRef),
    Generator(GenRef),
    AsyncGenerator(AsyncGenRef),
    /// Error value with class name and message
    Error(ErrorInfo),
}

impl Val {
    pub fn str(s: impl Into<String>) -> Val {
        Val::Str(s.into())
    }

    pub fn list(items: Vec<Val>) -> Val {
        Val::List(Rc::new(RefCell::new(items)))
    }

    pub fn obj(entries: impl IntoIterator<Item = (String, Val)>) -> Val {
        Val::Obj(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Bool(b) => *b,
            Val::Undefined | Val::Null => false,
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Undefined => "undefined",
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Obj(_) => "object",
            Val::Native(_) | Val::Closure(_) => "function",
            Val::Promise(_) => "promise",
            Val::Generator(_) => "generator",
            Val::AsyncGenerator(_) => "async generator",
            Val::Error(_) => "error",
        }
    }
}

/// Strict equality: same-kind value comparison, identity for reference kinds.
pub fn strict_eq(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Undefined, Val::Undefined) | (Val::Null, Val::Null) => true,
        (Val::Bool(x), Val::Bool(y)) => x == y,
        (Val::Num(x), Val::Num(y)) => x == y,
        (Val::Str(x), Val::Str(y)) => x == y,
        (Val::List(x), Val::List(y)) => Rc::ptr_eq(x, y),
        (Val::Obj(x), Val::Obj(y)) => Rc::ptr_eq(x, y),
        (Val::Native(x), Val::Native(y)) => Rc::ptr_eq(&x.f, &y.f),
        (Val::Closure(x), Val::Closure(y)) => Rc::ptr_eq(x, y),
        (Val::Promise(x), Val::Promise(y)) => Rc::ptr_eq(x, y),
        (Val::Generator(x), Val::Generator(y)) => Rc::ptr_eq(x, y),
        (Val::AsyncGenerator(x), Val::AsyncGenerator(y)) => Rc::ptr_eq(x, y),
        (Val::Error(x), Val::Error(y)) => x == y,
        _ => false,
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        strict_eq(self, other)
    }
}

// Shallow on reference kinds: closures capture scopes that can transitively
// contain the value being printed.
impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Undefined => write!(f, "undefined"),
            Val::Null => write!(f, "null"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Num(n) => write!(f, "{n}"),
            Val::Str(s) => write!(f, "{s:?}"),
            Val::List(l) => write!(f, "<list[{}]>", l.borrow().len()),
            Val::Obj(o) => write!(f, "<object[{}]>", o.borrow().len()),
            Val::Native(n) => write!(f, "<native {}>", n.name),
            Val::Closure(c) => match &c.def.name {
                Some(name) => write!(f, "<function {name}>"),
                None => write!(f, "<function>"),
            },
            Val::Promise(_) => write!(f, "<promise>"),
            Val::Generator(_) => write!(f, "<generator>"),
            Val::AsyncGenerator(_) => write!(f, "<async generator>"),
            Val::Error(e) => write!(f, "<{e}>"),
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Str(s) => write!(f, "{s}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One step of the iterator protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct IterResult {
    pub value: Val,
    pub done: bool,
}

impl IterResult {
    pub fn next(value: Val) -> Self {
        Self { value, done: false }
    }

    pub fn done(value: Val) -> Self {
        Self { value, done: true }
    }

    /// Expose the result to interpreted code as a `{value, done}` object.
    pub fn to_val(&self) -> Val {
        Val::obj([
            ("value".to_string(), self.value.clone()),
            ("done".to_string(), Val::Bool(self.done)),
        ])
    }

    /// Parse a `{value, done}` shape produced by user iterator methods.
    pub fn from_val(v: &Val) -> Result<Self, Signal> {
        match v {
            Val::Obj(o) => {
                let o = o.borrow();
                let value = o.get("value").cloned().unwrap_or(Val::Undefined);
                let done = o.get("done").map(Val::is_truthy).unwrap_or(false);
                Ok(IterResult { value, done })
            }
            other => Err(Signal::type_error(format!(
                "iterator result is not an object (got {})",
                other.type_name()
            ))),
        }
    }
}
