//! Throttle and debounce wrappers for event handlers
//!
//! Both wrappers only change *when* the wrapped action runs. Arguments are
//! passed through untouched.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::host::scheduler::{Scheduler, TimerId};

struct ThrottleState<A> {
    scheduler: Scheduler,
    interval: Duration,
    locked: Cell<bool>,
    cooldown: Cell<Option<TimerId>>,
    action: RefCell<Box<dyn FnMut(A)>>,
}

/// Action that runs at most once per interval; calls during the cooldown are dropped
pub struct Throttled<A> {
    state: Rc<ThrottleState<A>>,
}

impl<A> Clone for Throttled<A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

/// Wrap `action` so it runs immediately, then ignores calls for `interval`
pub fn throttle<A: 'static>(
    scheduler: &Scheduler,
    interval: Duration,
    action: impl FnMut(A) + 'static,
) -> Throttled<A> {
    Throttled {
        state: Rc::new(ThrottleState {
            scheduler: scheduler.clone(),
            interval,
            locked: Cell::new(false),
            cooldown: Cell::new(None),
            action: RefCell::new(Box::new(action)),
        }),
    }
}

impl<A: 'static> Throttled<A> {
    /// Run the action unless a cooldown is active. Returns true if it ran.
    pub fn call(&self, args: A) -> bool {
        let state = &self.state;
        if state.locked.get() {
            return false;
        }
        state.locked.set(true);

        let weak: Weak<ThrottleState<A>> = Rc::downgrade(state);
        let id = state.scheduler.set_timeout(state.interval, move || {
            if let Some(state) = weak.upgrade() {
                state.cooldown.set(None);
                state.locked.set(false);
            }
        });
        state.cooldown.set(Some(id));

        // Re-entrant calls from inside the action see the lock and are dropped
        match state.action.try_borrow_mut() {
            Ok(mut action) => (*action)(args),
            Err(_) => return false,
        }
        true
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.locked.get()
    }

    /// Drop the cooldown timer and reopen the gate
    pub fn cancel(&self) {
        if let Some(id) = self.state.cooldown.take() {
            self.state.scheduler.clear_timeout(id);
        }
        self.state.locked.set(false);
    }
}

struct DebounceState<A> {
    scheduler: Scheduler,
    wait: Duration,
    pending: Cell<Option<TimerId>>,
    action: RefCell<Box<dyn FnMut(A)>>,
}

/// Action that runs once calls have stopped for the wait period
pub struct Debounced<A> {
    state: Rc<DebounceState<A>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

/// Wrap `action` so it runs `wait` after the last call, with that call's arguments
pub fn debounce<A: 'static>(
    scheduler: &Scheduler,
    wait: Duration,
    action: impl FnMut(A) + 'static,
) -> Debounced<A> {
    Debounced {
        state: Rc::new(DebounceState {
            scheduler: scheduler.clone(),
            wait,
            pending: Cell::new(None),
            action: RefCell::new(Box::new(action)),
        }),
    }
}

impl<A: 'static> Debounced<A> {
    /// Replace any pending run with one carrying `args`
    pub fn call(&self, args: A) {
        let state = &self.state;
        if let Some(id) = state.pending.take() {
            state.scheduler.clear_timeout(id);
        }

        let weak: Weak<DebounceState<A>> = Rc::downgrade(state);
        let id = state.scheduler.set_timeout(state.wait, move || {
            if let Some(state) = weak.upgrade() {
                state.pending.set(None);
                if let Ok(mut action) = state.action.try_borrow_mut() {
                    (*action)(args);
                }
            }
        });
        state.pending.set(Some(id));
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.state.pending.get().is_some()
    }

    /// Drop the pending run, if any
    pub fn cancel(&self) {
        if let Some(id) = self.state.pending.take() {
            self.state.scheduler.clear_timeout(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_throttle_runs_once_per_window() {
        let scheduler = Scheduler::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let throttled = throttle(&scheduler, ms(100), move |n: u32| log.borrow_mut().push(n));

        assert!(throttled.call(1));
        for n in 2..10 {
            scheduler.advance_to(ms(n as u64 * 10));
            assert!(!throttled.call(n));
        }
        assert_eq!(*calls.borrow(), vec![1]);

        scheduler.advance_to(ms(100));
        assert!(!throttled.is_locked());
        assert!(throttled.call(42));
        assert_eq!(*calls.borrow(), vec![1, 42]);
    }

    #[test]
    fn test_throttle_cancel_reopens() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let throttled = throttle(&scheduler, ms(1000), move |_: ()| c.set(c.get() + 1));

        throttled.call(());
        throttled.cancel();
        assert_eq!(scheduler.pending_timers(), 0);
        throttled.call(());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_debounce_runs_last_call_after_quiet_period() {
        let scheduler = Scheduler::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let debounced = debounce(&scheduler, ms(250), move |s: &'static str| {
            log.borrow_mut().push(s)
        });

        for (t, arg) in [(0, "a"), (100, "b"), (200, "c"), (300, "d")] {
            scheduler.advance_to(ms(t));
            debounced.call(arg);
        }
        assert!(debounced.is_pending());

        scheduler.advance_to(ms(549));
        assert!(calls.borrow().is_empty());

        scheduler.advance_to(ms(550));
        assert_eq!(*calls.borrow(), vec!["d"]);
        assert!(!debounced.is_pending());
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_debounce_cancel() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let debounced = debounce(&scheduler, ms(50), move |_: ()| c.set(c.get() + 1));

        debounced.call(());
        debounced.cancel();
        scheduler.advance_to(ms(500));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_dropped_wrapper_never_fires() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let debounced = debounce(&scheduler, ms(50), move |_: ()| c.set(c.get() + 1));
        debounced.call(());
        drop(debounced);

        scheduler.advance_to(ms(100));
        assert_eq!(count.get(), 0);
    }
}
