//! Real-time frame loop
//!
//! Ticks at the configured frame rate and hands the elapsed time since start to
//! the caller, which advances its page. Stops on a shutdown signal or when the
//! frame callback asks to.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::MAX_FPS;

/// Returned by the frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}

/// Frame interval for a target frame rate, never shorter than 1ms
#[inline]
pub fn frame_interval(fps: u32) -> Duration {
    if fps == 0 {
        Duration::from_millis(16) // ~60fps fallback
    } else {
        Duration::from_micros(1_000_000 / fps.min(MAX_FPS) as u64)
    }
}

/// Drive `on_frame` until shutdown; returns the number of frames run
pub async fn run_realtime<F>(
    interval: Duration,
    mut on_frame: F,
    mut shutdown: watch::Receiver<bool>,
) -> u64
where
    F: FnMut(Duration) -> FrameControl,
{
    let start = Instant::now();
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames = 0u64;

    info!("Frame loop started: interval={}us", interval.as_micros());

    loop {
        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    info!("Frame loop received shutdown signal");
                    break;
                }
            }

            _ = ticker.tick() => {
                frames += 1;
                if on_frame(start.elapsed()) == FrameControl::Stop {
                    debug!("Frame callback requested stop after {} frames", frames);
                    break;
                }
            }
        }
    }

    info!("Frame loop stopped");
    frames
}
