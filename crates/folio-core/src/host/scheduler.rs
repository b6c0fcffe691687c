//! Host-driven timer and frame queue
//!
//! Time never advances on its own: the embedding environment calls
//! [`Scheduler::advance_to`] for timers and [`Scheduler::run_frame`] once per
//! display refresh. Every scheduling call returns an id that cancels it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// Handle for a pending timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Handle for a pending animation frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

type TimerCallback = Box<dyn FnOnce()>;
type FrameCallback = Box<dyn FnOnce(Duration)>;

#[derive(Default)]
struct SchedulerState {
    now: Duration,
    next_seq: u64,
    /// Keyed by (deadline, sequence) so equal deadlines run in scheduling order
    timers: BTreeMap<(Duration, u64), TimerCallback>,
    frames: BTreeMap<u64, FrameCallback>,
}

impl SchedulerState {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Single-threaded cooperative scheduler shared by every controller on a page
#[derive(Clone, Default)]
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Scheduler")
            .field("now", &state.now)
            .field("timers", &state.timers.len())
            .field("frames", &state.frames.len())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current monotonic time since page start
    #[inline]
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Run `callback` once `delay` has elapsed
    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        let mut state = self.state.borrow_mut();
        let seq = state.next_seq();
        let deadline = state.now.saturating_add(delay);
        state.timers.insert((deadline, seq), Box::new(callback));
        TimerId(seq)
    }

    /// Cancel a pending timeout. Returns false if it already ran or was cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();
        let key = state.timers.keys().find(|(_, seq)| *seq == id.0).copied();
        match key {
            Some(key) => state.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Run `callback` on the next display refresh
    pub fn request_frame(&self, callback: impl FnOnce(Duration) + 'static) -> FrameId {
        let mut state = self.state.borrow_mut();
        let seq = state.next_seq();
        state.frames.insert(seq, Box::new(callback));
        FrameId(seq)
    }

    /// Cancel a pending frame request. Returns false if it already ran.
    pub fn cancel_frame(&self, id: FrameId) -> bool {
        self.state.borrow_mut().frames.remove(&id.0).is_some()
    }

    /// Advance the clock to `now`, running every timer whose deadline has passed
    ///
    /// Timers run in deadline order; a timer scheduled by a callback runs in the
    /// same call if its deadline is not later than `now`.
    pub fn advance_to(&self, now: Duration) {
        loop {
            let due = {
                let mut state = self.state.borrow_mut();
                let next = state.timers.first_key_value().map(|(&key, _)| key);
                match next {
                    Some((deadline, seq)) if deadline <= now => {
                        state.now = state.now.max(deadline);
                        state.timers.remove(&(deadline, seq))
                    }
                    _ => None,
                }
            };
            match due {
                Some(callback) => callback(),
                None => break,
            }
        }
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(now);
    }

    /// Advance to `now` and run one display frame
    ///
    /// Only frames requested before this call run; a callback that requests
    /// another frame lands in the next one.
    pub fn run_frame(&self, now: Duration) -> usize {
        self.advance_to(now);
        let batch: Vec<u64> = self.state.borrow().frames.keys().copied().collect();
        let mut ran = 0;
        for seq in batch {
            let callback = self.state.borrow_mut().frames.remove(&seq);
            if let Some(callback) = callback {
                callback(now);
                ran += 1;
            }
        }
        ran
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state
            .borrow()
            .timers
            .first_key_value()
            .map(|(&(deadline, _), _)| deadline)
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// Check if anything is waiting on the clock or the display
    #[inline]
    pub fn has_pending_work(&self) -> bool {
        let state = self.state.borrow();
        !state.timers.is_empty() || !state.frames.is_empty()
    }
}

/// Shared flag checked at every tick boundary of a repeating job
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_timers_run_in_deadline_order() {
        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let log = log.clone();
            scheduler.set_timeout(ms(delay), move || log.borrow_mut().push(label));
        }

        scheduler.advance_to(ms(15));
        assert_eq!(*log.borrow(), vec!["a", "a2"]);

        scheduler.advance_to(ms(100));
        assert_eq!(*log.borrow(), vec!["a", "a2", "b", "c"]);
        assert_eq!(scheduler.now(), ms(100));
    }

    #[test]
    fn test_clear_timeout() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let id = scheduler.set_timeout(ms(10), move || flag.set(true));

        assert!(scheduler.clear_timeout(id));
        assert!(!scheduler.clear_timeout(id));
        scheduler.advance_to(ms(50));
        assert!(!fired.get());
    }

    #[test]
    fn test_callback_sees_its_deadline_as_now() {
        let scheduler = Scheduler::new();
        let seen = Rc::new(Cell::new(Duration::ZERO));
        let (s, out) = (scheduler.clone(), seen.clone());
        scheduler.set_timeout(ms(40), move || out.set(s.now()));

        scheduler.advance_to(ms(100));
        assert_eq!(seen.get(), ms(40));
    }

    #[test]
    fn test_nested_frame_lands_in_next_frame() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));

        let (s, c) = (scheduler.clone(), count.clone());
        scheduler.request_frame(move |_| {
            c.set(c.get() + 1);
            let c2 = c.clone();
            s.request_frame(move |_| c2.set(c2.get() + 1));
        });

        assert_eq!(scheduler.run_frame(ms(16)), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.pending_frames(), 1);
        assert_eq!(scheduler.run_frame(ms(32)), 1);
        assert_eq!(count.get(), 2);
        assert!(!scheduler.has_pending_work());
    }

    #[test]
    fn test_frame_cancelled_by_earlier_callback_in_same_batch() {
        let scheduler = Scheduler::new();
        let ran = Rc::new(Cell::new(false));
        let victim = Rc::new(Cell::new(None));

        let (s, v) = (scheduler.clone(), victim.clone());
        scheduler.request_frame(move |_| {
            if let Some(id) = v.get() {
                s.cancel_frame(id);
            }
        });
        let flag = ran.clone();
        victim.set(Some(scheduler.request_frame(move |_| flag.set(true))));

        scheduler.run_frame(ms(16));
        assert!(!ran.get());
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
