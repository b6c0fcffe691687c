//! Feature controllers
//!
//! Each controller discovers its elements at construction, binds its event
//! listeners through [`Subscriptions`] and self-disables when the elements it
//! needs are missing. `teardown` releases everything it bound or scheduled.

pub mod animation;
pub mod content;
pub mod cursor;
pub mod errors;
pub mod navigation;
pub mod performance;
pub mod scroll_top;
pub mod typing;

use folio_core::host::{Event, EventBus, EventKind, Host, ListenerId};

pub use animation::Animation;
pub use content::Content;
pub use cursor::PointerGlow;
pub use errors::ErrorHook;
pub use navigation::Navigation;
pub use performance::PerformanceMonitor;
pub use scroll_top::ScrollToTop;
pub use typing::TypingEffect;

/// A feature owned by the composition root
pub trait Controller {
    fn name(&self) -> &'static str;

    /// False when the controller found nothing to drive and bound nothing
    fn is_active(&self) -> bool {
        true
    }

    /// Unbind listeners and cancel outstanding timers, frames and tweens
    fn teardown(&mut self);
}

/// Listener ids and cleanup actions owned by one controller
pub struct Subscriptions {
    events: EventBus,
    listeners: Vec<ListenerId>,
    cleanups: Vec<Box<dyn FnOnce()>>,
}

impl Subscriptions {
    pub fn new(host: &Host) -> Self {
        Self {
            events: host.events().clone(),
            listeners: Vec::new(),
            cleanups: Vec::new(),
        }
    }

    /// Bind a listener that lives until [`Subscriptions::release`]
    pub fn on(&mut self, kind: EventKind, listener: impl Fn(&Event) + 'static) -> ListenerId {
        let id = self.events.on(kind, listener);
        self.listeners.push(id);
        id
    }

    /// Run `cleanup` on release
    pub fn on_release(&mut self, cleanup: impl FnOnce() + 'static) {
        self.cleanups.push(Box::new(cleanup));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.cleanups.is_empty()
    }

    pub fn release(&mut self) {
        for id in self.listeners.drain(..) {
            self.events.off(id);
        }
        for cleanup in self.cleanups.drain(..).rev() {
            cleanup();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release();
    }
}
