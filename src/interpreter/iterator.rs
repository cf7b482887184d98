//! Iterator protocol collaborator
//!
//! Adapts the values a program can iterate (generators, lists, duck-typed
//! objects with next/throw/return methods, async generators) into one
//! `IterTarget` surface used by for-of loops and yield* delegation. The
//! target is treated as opaque: everything goes through next/throw/return
//! returning `{value, done}` shapes.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use super::async_gen::{self, AsyncGenRef};
use super::control::{Completion, Signal};
use super::dispatch;
use super::generator::{self, GenRef};
use super::value::{IterResult, NativeFn, ObjRef, Val};
use crate::promise::PromiseRef;
use crate::realm::Realm;

/// A live iterator being driven by a loop or a delegation.
#[derive(Debug, Clone)]
pub enum IterTarget {
    Generator(GenRef),
    AsyncGenerator(AsyncGenRef),
    /// Duck-typed object with a `next` method and optional `throw`/`return`.
    Object(ObjRef),
}

impl IterTarget {
    pub fn next(&self, realm: &Realm, v: Val) -> Result<IterResult, Signal> {
        match self {
            IterTarget::Generator(g) => generator::resume(realm, g, Completion::Normal(v)),
            IterTarget::Object(o) => call_method(realm, o, "next", v),
            IterTarget::AsyncGenerator(_) => Err(Signal::type_error(
                "async generator cannot be iterated synchronously",
            )),
        }
    }

    pub fn has_throw(&self) -> bool {
        match self {
            IterTarget::Generator(_) | IterTarget::AsyncGenerator(_) => true,
            IterTarget::Object(o) => o.borrow().contains_key("throw"),
        }
    }

    pub fn throw(&self, realm: &Realm, e: Val) -> Result<IterResult, Signal> {
        match self {
            IterTarget::Generator(g) => generator::resume(realm, g, Completion::Throw(e)),
            IterTarget::Object(o) => call_method(realm, o, "throw", e),
            IterTarget::AsyncGenerator(_) => Err(Signal::type_error(
                "async generator cannot be iterated synchronously",
            )),
        }
    }

    pub fn has_return(&self) -> bool {
        match self {
            IterTarget::Generator(_) | IterTarget::AsyncGenerator(_) => true,
            IterTarget::Object(o) => o.borrow().contains_key("return"),
        }
    }

    pub fn ret(&self, realm: &Realm, v: Val) -> Result<IterResult, Signal> {
        match self {
            IterTarget::Generator(g) => generator::resume(realm, g, Completion::Return(v)),
            IterTarget::Object(o) => call_method(realm, o, "return", v),
            IterTarget::AsyncGenerator(_) => Err(Signal::type_error(
                "async generator cannot be iterated synchronously",
            )),
        }
    }

    /// Async next: one request enqueued against the instance; the returned
    /// promise settles with the `{value, done}` result object.
    pub fn next_promise(&self, realm: &Realm, v: Val) -> Result<PromiseRef, Signal> {
        match self {
            IterTarget::AsyncGenerator(a) => {
                Ok(async_gen::enqueue(realm, a, Completion::Normal(v)))
            }
            _ => Err(Signal::internal("next_promise on a sync iterator")),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, IterTarget::AsyncGenerator(_))
    }
}

fn call_method(realm: &Realm, o: &ObjRef, name: &str, arg: Val) -> Result<IterResult, Signal> {
    let method = o.borrow().get(name).cloned().ok_or_else(|| {
        Signal::type_error(format!("iterator has no {name} method"))
    })?;
    let result = dispatch::call(realm, &method, vec![arg])?;
    IterResult::from_val(&result)
}

/// Obtain an iterator for a value, or a TypeError if it is not iterable.
pub fn get_iterator(v: &Val) -> Result<IterTarget, Signal> {
    match v {
        Val::Generator(g) => Ok(IterTarget::Generator(g.clone())),
        Val::AsyncGenerator(a) => Ok(IterTarget::AsyncGenerator(a.clone())),
        Val::Obj(o) => {
            if o.borrow().contains_key("next") {
                Ok(IterTarget::Object(o.clone()))
            } else {
                Err(Signal::type_error("object is not an iterator"))
            }
        }
        Val::List(l) => Ok(IterTarget::Object(list_iterator(l.clone()))),
        other => Err(Signal::type_error(format!(
            "{} is not iterable",
            other.type_name()
        ))),
    }
}

/// Native cursor over a list value.
fn list_iterator(list: super::value::ListRef) -> ObjRef {
    let idx = Rc::new(Cell::new(0usize));
    let next = NativeFn::new("list_iterator_next", move |_realm, _args| {
        let i = idx.get();
        let items = list.borrow();
        if i < items.len() {
            idx.set(i + 1);
            Ok(IterResult::next(items[i].clone()).to_val())
        } else {
            Ok(IterResult::done(Val::Undefined).to_val())
        }
    });
    match Val::obj([("next".to_string(), Val::Native(next))]) {
        Val::Obj(o) => o,
        _ => unreachable!(),
    }
}

/// Close an iterator on abrupt exit: call its return method if present and
/// suppress any secondary error so the primary outcome propagates unchanged.
pub fn iterator_close(realm: &Realm, iter: &IterTarget) {
    if let IterTarget::AsyncGenerator(a) = iter {
        // Teardown request queued behind any in-flight work; nothing awaits it.
        let _ = async_gen::enqueue(realm, a, Completion::Return(Val::Undefined));
        return;
    }
    if !iter.has_return() {
        return;
    }
    if let Err(err) = iter.ret(realm, Val::Undefined) {
        debug!(?err, "suppressed error from iterator return during close");
    }
}
