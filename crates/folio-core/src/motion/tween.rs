//! Frame-driven value animation
//!
//! A [`Tween`] is the pure description (start, target, timing, easing).
//! [`animate_value`] runs one on the scheduler's frame queue, calling back
//! once per frame until the target is reached or the handle is cancelled.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::easing::Easing;
use super::timing::{is_complete, lerp, progress};
use crate::host::scheduler::{CancelToken, FrameId, Scheduler};

/// Value animation from `from` to `to`
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    /// Starting value
    from: f64,
    /// Target value
    to: f64,
    /// Animation start time
    start: Duration,
    /// Animation duration
    duration: Duration,
    /// Easing function
    easing: Easing,
}

/// Value of a tween at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSample {
    pub value: f64,
    /// True once progress has reached 1; `value` is then exactly the target
    pub done: bool,
}

impl Tween {
    pub fn new(from: f64, to: f64, start: Duration, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            start,
            duration,
            easing,
        }
    }

    pub fn from_value(&self) -> f64 {
        self.from
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    /// Linear progress at `now`, clamped to [0, 1]
    pub fn progress(&self, now: Duration) -> f64 {
        progress(self.start, now, self.duration)
    }

    pub fn sample(&self, now: Duration) -> TweenSample {
        if is_complete(self.start, now, self.duration) {
            return TweenSample {
                value: self.to,
                done: true,
            };
        }
        let eased = self.easing.apply(self.progress(now));
        TweenSample {
            value: lerp(self.from, self.to, eased),
            done: false,
        }
    }
}

struct TweenRunner {
    tween: Tween,
    on_frame: RefCell<Box<dyn FnMut(f64)>>,
    token: CancelToken,
    pending: Rc<Cell<Option<FrameId>>>,
    finished: Rc<Cell<bool>>,
    scheduler: Scheduler,
}

/// Cancellation handle for a running tween
#[derive(Clone)]
pub struct TweenHandle {
    token: CancelToken,
    pending: Rc<Cell<Option<FrameId>>>,
    finished: Rc<Cell<bool>>,
    scheduler: Scheduler,
}

impl TweenHandle {
    /// Stop the tween; no further frame callbacks are made
    pub fn cancel(&self) {
        self.token.cancel();
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Check if the tween delivered its final value
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Still waiting for frames
    pub fn is_running(&self) -> bool {
        !self.is_finished() && !self.is_cancelled()
    }
}

impl std::fmt::Debug for TweenHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenHandle")
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Animate from `from` to `to` over `duration`, calling `on_frame` every frame
///
/// The first value is produced on the next frame. The final call receives
/// exactly `to`, after which the tween stops requesting frames.
pub fn animate_value(
    scheduler: &Scheduler,
    from: f64,
    to: f64,
    duration: Duration,
    easing: impl Into<Easing>,
    on_frame: impl FnMut(f64) + 'static,
) -> TweenHandle {
    let token = CancelToken::new();
    let pending = Rc::new(Cell::new(None));
    let finished = Rc::new(Cell::new(false));

    let runner = Rc::new(TweenRunner {
        tween: Tween::new(from, to, scheduler.now(), duration, easing.into()),
        on_frame: RefCell::new(Box::new(on_frame)),
        token: token.clone(),
        pending: pending.clone(),
        finished: finished.clone(),
        scheduler: scheduler.clone(),
    });
    schedule_next(&runner);

    TweenHandle {
        token,
        pending,
        finished,
        scheduler: scheduler.clone(),
    }
}

fn schedule_next(runner: &Rc<TweenRunner>) {
    let next = runner.clone();
    let id = runner.scheduler.request_frame(move |now| step(&next, now));
    runner.pending.set(Some(id));
}

fn step(runner: &Rc<TweenRunner>, now: Duration) {
    runner.pending.set(None);
    if runner.token.is_cancelled() {
        return;
    }

    let sample = runner.tween.sample(now);
    (runner.on_frame.borrow_mut())(sample.value);

    if sample.done {
        runner.finished.set(true);
    } else if !runner.token.is_cancelled() {
        schedule_next(runner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EasingType;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn run_frames(scheduler: &Scheduler, until: Duration, step: Duration) {
        let mut t = scheduler.now();
        while t < until {
            t += step;
            scheduler.run_frame(t);
        }
    }

    #[test]
    fn test_sample_ends_exactly_on_target() {
        let tween = Tween::new(0.0, 100.0, ms(0), ms(1000), Easing::default());
        assert_eq!(tween.sample(ms(0)).value, 0.0);
        assert!((tween.sample(ms(500)).value - 87.5).abs() < 1e-9);
        assert_eq!(
            tween.sample(ms(1000)),
            TweenSample {
                value: 100.0,
                done: true
            }
        );
    }

    #[test]
    fn test_values_non_decreasing_and_final_exact() {
        let scheduler = Scheduler::new();
        let values = Rc::new(RefCell::new(Vec::new()));
        let out = values.clone();
        let handle = animate_value(&scheduler, 0.0, 100.0, ms(1000), Easing::default(), move |v| {
            out.borrow_mut().push(v)
        });

        run_frames(&scheduler, ms(1500), ms(16));

        let values = values.borrow();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*values.last().unwrap(), 100.0);
        assert_eq!(values.iter().filter(|v| **v == 100.0).count(), 1);
        assert!(handle.is_finished());
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn test_descending_tween() {
        let scheduler = Scheduler::new();
        let values = Rc::new(RefCell::new(Vec::new()));
        let out = values.clone();
        animate_value(&scheduler, 10.0, -10.0, ms(200), EasingType::Linear, move |v| {
            out.borrow_mut().push(v)
        });

        run_frames(&scheduler, ms(300), ms(20));

        let values = values.borrow();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(*values.last().unwrap(), -10.0);
    }

    #[test]
    fn test_zero_duration_completes_on_first_frame() {
        let scheduler = Scheduler::new();
        let values = Rc::new(RefCell::new(Vec::new()));
        let out = values.clone();
        let handle = animate_value(&scheduler, 3.0, 7.0, Duration::ZERO, Easing::default(), move |v| {
            out.borrow_mut().push(v)
        });

        scheduler.run_frame(ms(16));
        assert_eq!(*values.borrow(), vec![7.0]);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_cancel_stops_callbacks() {
        let scheduler = Scheduler::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let handle = animate_value(&scheduler, 0.0, 1.0, ms(1000), Easing::default(), move |_| {
            c.set(c.get() + 1)
        });

        run_frames(&scheduler, ms(100), ms(16));
        let seen = calls.get();
        assert!(seen > 0);

        handle.cancel();
        assert_eq!(scheduler.pending_frames(), 0);
        run_frames(&scheduler, ms(2000), ms(16));
        assert_eq!(calls.get(), seen);
        assert!(!handle.is_finished());
        assert!(!handle.is_running());
    }

    #[test]
    fn test_cancel_from_inside_callback() {
        let scheduler = Scheduler::new();
        let slot: Rc<RefCell<Option<TweenHandle>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));

        let (s, c) = (slot.clone(), calls.clone());
        let handle = animate_value(&scheduler, 0.0, 1.0, ms(1000), Easing::default(), move |_| {
            c.set(c.get() + 1);
            if let Some(ref h) = *s.borrow() {
                h.cancel();
            }
        });
        *slot.borrow_mut() = Some(handle);

        run_frames(&scheduler, ms(200), ms(16));
        assert_eq!(calls.get(), 1);
    }
}
