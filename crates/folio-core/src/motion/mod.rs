//! Time-based motion for page effects
//!
//! # Layout
//!
//! ## Pure functions
//! - `easing` - easing curves mapping progress [0, 1] to eased progress
//! - `timing` - progress and interpolation on the host's monotonic clock
//!
//! ## Controllers
//! - `tween` - frame-driven value animation with cancellation
//! - `follow` - per-frame lerp toward a moving target (pointer glow)
//!
//! # Usage
//!
//! ```ignore
//! use folio_core::motion::{animate_value, Easing};
//!
//! let handle = animate_value(&scheduler, 0.0, 100.0, Duration::from_secs(1), Easing::default(), |v| {
//!     document.set_text(counter, &format!("{}", v.round()));
//! });
//!
//! // On teardown
//! handle.cancel();
//! ```

pub mod easing;
pub mod follow;
pub mod timing;
pub mod tween;

pub use easing::{Easing, EasingType};
pub use follow::{Follow, Point};
pub use tween::{animate_value, Tween, TweenHandle, TweenSample};
