//! Per-thread reaction queue
//!
//! Listener reactions (`stop_on_stop`, `start_on_restart`) are collected
//! while the thread is inside a `start`/`stop` call and run, in arrival
//! order, once the outermost call has released every lifecycle lock and
//! before it returns. A thread running reactions therefore never holds a
//! lock out of dependency order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::marker::PhantomData;

type Reaction = Box<dyn FnOnce()>;

#[derive(Default)]
struct Cascade {
    depth: usize,
    draining: bool,
    pending: VecDeque<Reaction>,
}

thread_local! {
    static CASCADE: RefCell<Cascade> = RefCell::new(Cascade::default());
}

/// Marks the current thread as inside a lifecycle call
///
/// Dropping the outermost scope runs the queued reactions.
pub(crate) struct CallScope {
    // Tied to the thread-local it counts on
    _not_send: PhantomData<*const ()>,
}

impl CallScope {
    pub(crate) fn enter() -> Self {
        CASCADE.with(|c| c.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for CallScope {
    fn drop(&mut self) {
        let outermost = CASCADE.with(|c| {
            let mut c = c.borrow_mut();
            c.depth -= 1;
            c.depth == 0 && !c.draining
        });
        if outermost && !std::thread::panicking() {
            drain();
        }
    }
}

/// Run `reaction` now if the thread is idle, otherwise after the outermost call
pub(crate) fn defer(reaction: impl FnOnce() + 'static) {
    let idle = CASCADE.with(|c| {
        let c = c.borrow();
        c.depth == 0 && !c.draining
    });
    if idle {
        reaction();
    } else {
        CASCADE.with(|c| c.borrow_mut().pending.push_back(Box::new(reaction)));
    }
}

struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        CASCADE.with(|c| {
            let mut c = c.borrow_mut();
            c.draining = false;
            if std::thread::panicking() {
                c.pending.clear();
            }
        });
    }
}

fn drain() {
    CASCADE.with(|c| c.borrow_mut().draining = true);
    let _guard = DrainGuard;
    // The borrow must end before the reaction runs: reactions enqueue more
    while let Some(reaction) = CASCADE.with(|c| c.borrow_mut().pending.pop_front()) {
        reaction();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_idle_thread_runs_immediately() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        defer(move || l.borrow_mut().push(1));
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn test_reactions_wait_for_outermost_scope() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let _outer = CallScope::enter();
            {
                let _inner = CallScope::enter();
                let l = log.clone();
                defer(move || l.borrow_mut().push("first"));
            }
            assert!(log.borrow().is_empty());
            let l = log.clone();
            defer(move || l.borrow_mut().push("second"));
        }
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_nested_reactions_are_drained() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let _scope = CallScope::enter();
            let l = log.clone();
            defer(move || {
                let _scope = CallScope::enter();
                let inner = l.clone();
                defer(move || inner.borrow_mut().push("nested"));
                l.borrow_mut().push("outer");
            });
        }
        assert_eq!(*log.borrow(), vec!["outer", "nested"]);
    }
}
