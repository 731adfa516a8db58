//! Debug-only reentrancy guard.
//!
//! Every engine calls user code (comparator, hasher, `K: Eq`) while its
//! links or slots are in flux. A comparator that reaches back into the same
//! container through a raw pointer would observe a half-rebalanced tree or a
//! table mid-rehash. In debug builds such nesting panics with the engine's
//! name; in release builds the guard compiles away.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;
#[cfg(debug_assertions)]
use std::rc::Rc;

/// Per-container tracker. Public entry points open a section with
/// `let _g = self.reentrancy.enter();`.
///
/// The guard shares the flag rather than borrowing the tracker, so the
/// entry point stays free to call `&mut self` helpers while it is held.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Rc<Cell<bool>>,
    #[cfg(debug_assertions)]
    engine: &'static str,
    // Containers are single-owner; keep them !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    #[cfg_attr(not(debug_assertions), allow(unused_variables))]
    pub(crate) fn new(engine: &'static str) -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Rc::new(Cell::new(false)),
            #[cfg(debug_assertions)]
            engine,
            _nosend: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn enter(&self) -> SectionGuard {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "reentrant call into {} while an operation is in progress",
                self.engine
            );
            SectionGuard {
                active: Rc::clone(&self.active),
            }
        }

        #[cfg(not(debug_assertions))]
        {
            SectionGuard { _z: PhantomData }
        }
    }
}

/// Closes the section on drop, including during unwinding.
pub(crate) struct SectionGuard {
    #[cfg(debug_assertions)]
    active: Rc<Cell<bool>>,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<*mut ()>,
}

impl Drop for SectionGuard {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.active.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_sections_are_ok() {
        let r = DebugReentrancy::new("test engine");
        {
            let _g = r.enter();
        }
        let _g = r.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_section_panics_in_debug() {
        let r = DebugReentrancy::new("test engine");
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter();
            let _inner = r.enter();
        }));
        assert!(res.is_err(), "expected nested entry to panic");
        // The outer guard was released during unwinding.
        let _g = r.enter();
    }

    #[test]
    fn guard_does_not_borrow_the_owner() {
        struct Owner {
            reentrancy: DebugReentrancy,
            writes: u32,
        }
        impl Owner {
            fn bump(&mut self) {
                self.writes += 1;
            }
            fn op(&mut self) {
                let _g = self.reentrancy.enter();
                self.bump();
                self.bump();
            }
        }
        let mut o = Owner {
            reentrancy: DebugReentrancy::new("test engine"),
            writes: 0,
        };
        o.op();
        o.op();
        assert_eq!(o.writes, 4);
    }
}
