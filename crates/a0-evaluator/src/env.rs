//! Lexical environments.
//!
//! A frame is a `HashMap` of bindings plus an optional parent. Frames
//! chain via `Rc`, not `Arc`: the evaluator is single-threaded (spec
//! §5), so there is no cross-thread sharing to pay `Arc`'s atomic
//! refcount for. A closure captures its definition-site frame by
//! cloning the `Rc`; calling it later creates a fresh child frame
//! rooted there, so sibling calls never see each other's locals.

use a0_value::A0Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

struct Frame {
    bindings: HashMap<Arc<str>, A0Value>,
    parent: Option<Environment>,
}

/// A reference-counted handle to one frame in the environment chain.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

/// The program's top-level frame, with no parent.
pub fn root() -> Environment {
    Environment(Rc::new(RefCell::new(Frame { bindings: HashMap::new(), parent: None })))
}

/// A fresh frame whose parent is `env`. Used for `for` iterations,
/// `match` arms, `try`/`catch` bodies, and function calls.
pub fn child(env: &Environment) -> Environment {
    Environment(Rc::new(RefCell::new(Frame { bindings: HashMap::new(), parent: Some(env.clone()) })))
}

/// Binds `name` in the innermost frame, shadowing any outer binding of
/// the same name. Re-declaring a name already bound in this same frame
/// overwrites it — the validator already rejects duplicate `let`s
/// within one frame, so this path is only reached for legitimately
/// distinct bindings (or `if`-branch bindings re-running on a
/// different loop iteration, which is still the same logical frame).
pub fn declare(env: &Environment, name: Arc<str>, value: A0Value) {
    env.0.borrow_mut().bindings.insert(name, value);
}

/// Looks up `name` starting at `env` and walking outward through
/// parents. Returns `None` only for names the validator should already
/// have rejected as unbound.
pub fn lookup(env: &Environment, name: &str) -> Option<A0Value> {
    let frame = env.0.borrow();
    if let Some(value) = frame.bindings.get(name) {
        return Some(value.clone());
    }
    match &frame.parent {
        Some(parent) => {
            let parent = parent.clone();
            drop(frame);
            lookup(&parent, name)
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_walks_parent_chain() {
        let root = root();
        declare(&root, Arc::from("x"), A0Value::Number(1.0));
        let c = child(&root);
        assert_eq!(lookup(&c, "x"), Some(A0Value::Number(1.0)));
    }

    #[test]
    fn child_binding_does_not_leak_to_parent() {
        let root = root();
        let c = child(&root);
        declare(&c, Arc::from("y"), A0Value::Bool(true));
        assert_eq!(lookup(&root, "y"), None);
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let root = root();
        declare(&root, Arc::from("x"), A0Value::Number(1.0));
        let c = child(&root);
        declare(&c, Arc::from("x"), A0Value::Number(2.0));
        assert_eq!(lookup(&c, "x"), Some(A0Value::Number(2.0)));
        assert_eq!(lookup(&root, "x"), Some(A0Value::Number(1.0)));
    }

    #[test]
    fn unbound_name_is_none() {
        let root = root();
        assert_eq!(lookup(&root, "nope"), None);
    }
}
