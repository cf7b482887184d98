//! Variable scopes and captured frames
//!
//! A `Scope` is one link of a heap-resident chain of variable maps. Calling a
//! generator or async function captures a frame (the chain rooted at the
//! closure environment with parameters bound); that frame stays alive for the
//! instance's lifetime and is only ever mutated by that instance's driver
//! invocations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::Val;

struct ScopeData {
    vars: HashMap<String, Val>,
    parent: Option<Scope>,
}

/// A shared handle to one lexical scope.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    pub fn root() -> Scope {
        Scope(Rc::new(RefCell::new(ScopeData {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    pub fn child(&self) -> Scope {
        Scope(Rc::new(RefCell::new(ScopeData {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Build a function activation frame: child of the closure environment
    /// with parameters bound to arguments (missing arguments are undefined).
    pub fn function_frame(env: &Scope, params: &[String], mut args: Vec<Val>) -> Scope {
        let frame = env.child();
        args.resize(params.len(), Val::Undefined);
        for (name, val) in params.iter().zip(args) {
            frame.declare(name, val);
        }
        frame
    }

    /// Declare (or shadow) a binding in this scope.
    pub fn declare(&self, name: &str, val: Val) {
        self.0.borrow_mut().vars.insert(name.to_string(), val);
    }

    /// Read a binding, walking the parent chain.
    pub fn get(&self, name: &str) -> Option<Val> {
        let data = self.0.borrow();
        if let Some(v) = data.vars.get(name) {
            return Some(v.clone());
        }
        data.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Assign to an existing binding, walking the parent chain.
    /// Returns false when no binding with that name exists.
    pub fn set(&self, name: &str, val: Val) -> bool {
        let mut data = self.0.borrow_mut();
        if let Some(slot) = data.vars.get_mut(name) {
            *slot = val;
            return true;
        }
        match &data.parent {
            Some(p) => p.set(name, val),
            None => false,
        }
    }

    /// Fresh sibling scope (same parent) with the named bindings copied over.
    /// Used for per-iteration loop environments: bindings are carried forward
    /// exactly once per iteration.
    pub fn copy_bindings(&self, names: impl IntoIterator<Item = impl AsRef<str>>) -> Scope {
        let parent = self.0.borrow().parent.clone();
        let next = Scope(Rc::new(RefCell::new(ScopeData {
            vars: HashMap::new(),
            parent,
        })));
        for name in names {
            let name = name.as_ref();
            let val = self
                .0
                .borrow()
                .vars
                .get(name)
                .cloned()
                .unwrap_or(Val::Undefined);
            next.declare(name, val);
        }
        next
    }
}

// Scope chains can be cyclic through closure values; print only the handle.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<scope>")
    }
}
