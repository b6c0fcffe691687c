pub mod config;
pub mod error;
pub mod host;
pub mod motion;
pub mod rate_limit;
pub mod typing;
pub mod visibility;

pub use config::{AppConfig, EasingType, Environment, FailurePolicy};
pub use error::{Error, Result};
pub use host::{Document, ElementId, Host};
pub use rate_limit::{debounce, throttle, Debounced, Throttled};
pub use typing::{TypingCycle, TypingPhase, TypingStep, TypingTimings};
pub use visibility::{GateState, VisibilityGate, VisibilityOptions};
