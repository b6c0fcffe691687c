//! Host environment abstraction
//!
//! # Layout
//!
//! - `document` - the presentation surface trait and geometry types
//! - `selector` - the selector subset used for element discovery
//! - `events` - event types and the subscription bus
//! - `scheduler` - host-driven timers, frames and cancellation tokens
//! - `intersection` - viewport intersection measurement and observers
//! - `headless` - in-memory document and page driver
//! - `driver` - real-time frame loop on tokio

pub mod document;
pub mod driver;
pub mod events;
pub mod headless;
pub mod intersection;
pub mod scheduler;
pub mod selector;

use std::rc::Rc;

pub use document::{Document, ElementId, ReadyState, Rect, ScrollBehavior, Viewport};
pub use events::{Event, EventBus, EventKind, ListenerId, PerformanceEntry};
pub use headless::{ElementSpec, HeadlessDocument, HeadlessPage, Mutation, PageSpec};
pub use intersection::{IntersectionEntry, IntersectionRegistry, ObserverId, RootMargin};
pub use scheduler::{CancelToken, FrameId, Scheduler, TimerId};
pub use selector::Selector;

/// Everything a controller may touch, bundled for the composition root
///
/// Cloning is cheap; clones share the same document, clock and registries.
#[derive(Clone)]
pub struct Host {
    document: Rc<dyn Document>,
    scheduler: Scheduler,
    events: EventBus,
    intersections: IntersectionRegistry,
}

impl Host {
    pub fn new(document: Rc<dyn Document>) -> Self {
        Self {
            document,
            scheduler: Scheduler::new(),
            events: EventBus::new(),
            intersections: IntersectionRegistry::new(),
        }
    }

    #[inline]
    pub fn document(&self) -> &dyn Document {
        &*self.document
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[inline]
    pub fn intersections(&self) -> &IntersectionRegistry {
        &self.intersections
    }

    pub fn dispatch(&self, event: &Event) -> usize {
        self.events.dispatch(event)
    }

    /// Measure observed elements against the current layout
    pub fn layout_pass(&self) -> usize {
        self.intersections.layout_pass(&*self.document)
    }
}
