//! Promise collaborator
//!
//! A minimal promise: create a capability, resolve or reject it, and register
//! two-callback reactions that are invoked asynchronously (from the realm's
//! microtask queue) and at most once each. Resolving with another promise
//! adopts its eventual state.

use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::value::Val;
use crate::realm::Realm;

type ReactionFn = Box<dyn FnOnce(&Realm, Val)>;

#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Val),
    Rejected(Val),
}

struct Reaction {
    on_fulfilled: ReactionFn,
    on_rejected: ReactionFn,
}

pub struct Promise {
    state: PromiseState,
    reactions: Vec<Reaction>,
}

pub type PromiseRef = Rc<RefCell<Promise>>;

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Promise({:?})", self.state)
    }
}

/// Create a pending promise.
pub fn pending() -> PromiseRef {
    Rc::new(RefCell::new(Promise {
        state: PromiseState::Pending,
        reactions: Vec::new(),
    }))
}

/// Current state, cloned out.
pub fn state(p: &PromiseRef) -> PromiseState {
    p.borrow().state.clone()
}

/// Coerce a value into a promise: promises pass through, everything else
/// becomes an already-fulfilled promise (reactions still run as microtasks).
pub fn resolve_val(realm: &Realm, v: Val) -> PromiseRef {
    match v {
        Val::Promise(p) => p,
        other => {
            let p = pending();
            fulfill(realm, &p, other);
            p
        }
    }
}

/// Resolve a promise. A promise value is adopted: this promise settles the
/// way the inner one does.
pub fn resolve(realm: &Realm, p: &PromiseRef, v: Val) {
    if let Val::Promise(inner) = v {
        if Rc::ptr_eq(&inner, p) {
            reject(
                realm,
                p,
                Val::Error(crate::interpreter::errors::ErrorInfo::type_error(
                    "promise cannot adopt itself",
                )),
            );
            return;
        }
        let target = p.clone();
        let target2 = p.clone();
        then(
            realm,
            &inner,
            move |realm, v| fulfill(realm, &target, v),
            move |realm, e| reject(realm, &target2, e),
        );
        return;
    }
    fulfill(realm, p, v);
}

pub fn fulfill(realm: &Realm, p: &PromiseRef, v: Val) {
    settle(realm, p, PromiseState::Fulfilled(v));
}

pub fn reject(realm: &Realm, p: &PromiseRef, e: Val) {
    settle(realm, p, PromiseState::Rejected(e));
}

fn settle(realm: &Realm, p: &PromiseRef, state: PromiseState) {
    let reactions = {
        let mut pr = p.borrow_mut();
        if pr.state != PromiseState::Pending {
            // Already settled; later resolutions are ignored.
            return;
        }
        pr.state = state.clone();
        std::mem::take(&mut pr.reactions)
    };
    for r in reactions {
        schedule(realm, &state, r);
    }
}

/// Register a reaction pair. Exactly one of the callbacks will eventually run,
/// always from the microtask queue, never synchronously.
pub fn then(
    realm: &Realm,
    p: &PromiseRef,
    on_fulfilled: impl FnOnce(&Realm, Val) + 'static,
    on_rejected: impl FnOnce(&Realm, Val) + 'static,
) {
    let reaction = Reaction {
        on_fulfilled: Box::new(on_fulfilled),
        on_rejected: Box::new(on_rejected),
    };
    let state = p.borrow().state.clone();
    match state {
        PromiseState::Pending => p.borrow_mut().reactions.push(reaction),
        settled => schedule(realm, &settled, reaction),
    }
}

fn schedule(realm: &Realm, state: &PromiseState, reaction: Reaction) {
    match state.clone() {
        PromiseState::Fulfilled(v) => {
            realm.enqueue(Box::new(move |realm| (reaction.on_fulfilled)(realm, v)))
        }
        PromiseState::Rejected(e) => {
            realm.enqueue(Box::new(move |realm| (reaction.on_rejected)(realm, e)))
        }
        PromiseState::Pending => unreachable!("scheduling a reaction against a pending promise"),
    }
}

/// Capability handle: the resolve/reject pair for one promise.
#[derive(Clone)]
pub struct Capability {
    pub promise: PromiseRef,
}

impl Capability {
    pub fn new() -> Capability {
        Capability { promise: pending() }
    }

    pub fn resolve(&self, realm: &Realm, v: Val) {
        resolve(realm, &self.promise, v);
    }

    pub fn reject(&self, realm: &Realm, e: Val) {
        reject(realm, &self.promise, e);
    }
}

impl Default for Capability {
    fn default() -> Self {
        Capability::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> ReactionFn) {
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        let tag = move |name: &str| -> ReactionFn {
            let log = log2.clone();
            let name = name.to_string();
            Box::new(move |_realm: &Realm, v: Val| {
                log.borrow_mut().push(format!("{name}:{v}"));
            })
        };
        (log, tag)
    }

    #[test]
    fn reactions_run_in_registration_order() {
        let realm = Realm::new();
        let p = pending();
        let (log, tag) = seen();
        then(&realm, &p, {
            let f = tag("a");
            move |r, v| f(r, v)
        }, |_, _| panic!("rejected"));
        then(&realm, &p, {
            let f = tag("b");
            move |r, v| f(r, v)
        }, |_, _| panic!("rejected"));
        fulfill(&realm, &p, Val::Num(1.0));
        assert!(log.borrow().is_empty(), "reactions must not run synchronously");
        realm.run_jobs();
        assert_eq!(*log.borrow(), vec!["a:1".to_string(), "b:1".to_string()]);
    }

    #[test]
    fn settle_is_at_most_once() {
        let realm = Realm::new();
        let p = pending();
        fulfill(&realm, &p, Val::Num(1.0));
        reject(&realm, &p, Val::str("late"));
        assert_eq!(state(&p), PromiseState::Fulfilled(Val::Num(1.0)));
    }

    #[test]
    fn resolving_with_a_promise_adopts_it() {
        let realm = Realm::new();
        let inner = pending();
        let outer = pending();
        resolve(&realm, &outer, Val::Promise(inner.clone()));
        reject(&realm, &inner, Val::str("boom"));
        realm.run_jobs();
        assert_eq!(state(&outer), PromiseState::Rejected(Val::str("boom")));
    }

    #[test]
    fn late_then_on_settled_promise_still_fires() {
        let realm = Realm::new();
        let p = pending();
        reject(&realm, &p, Val::str("e"));
        let (log, tag) = seen();
        then(&realm, &p, |_, _| panic!("fulfilled"), {
            let f = tag("err");
            move |r, v| f(r, v)
        });
        realm.run_jobs();
        assert_eq!(*log.borrow(), vec!["err:e".to_string()]);
    }
}
