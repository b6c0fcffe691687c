use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use super::document::ElementId;

/// Performance entry reported by the host
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceEntry {
    /// Largest contentful paint candidate
    LargestContentfulPaint { start_time: f64 },
    /// First input delay sample
    FirstInput {
        start_time: f64,
        processing_start: f64,
    },
    /// Cumulative layout shift sample
    LayoutShift {
        value: f64,
        had_recent_input: bool,
    },
}

/// Events pushed into the page by the host environment
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Document structure has been parsed
    DomContentLoaded,
    /// Every resource finished loading
    Load { load_time: Duration },
    /// Scroll position changed (read it from the document)
    Scroll,
    /// Viewport size changed (read it from the document)
    Resize,
    PointerMove { x: f64, y: f64 },
    PointerEnter { target: ElementId },
    PointerLeave { target: ElementId },
    Click { target: ElementId },
    KeyPress { key: String },
    /// Uncaught runtime error
    Error { message: String },
    /// Asynchronous operation rejected without a handler
    UnhandledRejection { reason: String },
    Performance(PerformanceEntry),
}

/// Discriminant used to subscribe to a class of events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    DomContentLoaded,
    Load,
    Scroll,
    Resize,
    PointerMove,
    PointerEnter,
    PointerLeave,
    Click,
    KeyPress,
    Error,
    UnhandledRejection,
    Performance,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::DomContentLoaded => EventKind::DomContentLoaded,
            Event::Load { .. } => EventKind::Load,
            Event::Scroll => EventKind::Scroll,
            Event::Resize => EventKind::Resize,
            Event::PointerMove { .. } => EventKind::PointerMove,
            Event::PointerEnter { .. } => EventKind::PointerEnter,
            Event::PointerLeave { .. } => EventKind::PointerLeave,
            Event::Click { .. } => EventKind::Click,
            Event::KeyPress { .. } => EventKind::KeyPress,
            Event::Error { .. } => EventKind::Error,
            Event::UnhandledRejection { .. } => EventKind::UnhandledRejection,
            Event::Performance(_) => EventKind::Performance,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unbind the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&Event)>;

struct Registration {
    kind: EventKind,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    /// Ordered by id so listeners run in binding order
    listeners: BTreeMap<u64, Registration>,
}

/// Event subscription registry
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a listener for every event of `kind`
    pub fn on(&self, kind: EventKind, listener: impl Fn(&Event) + 'static) -> ListenerId {
        self.register(kind, false, Rc::new(listener))
    }

    /// Bind a listener that unbinds itself after its first call
    pub fn once(&self, kind: EventKind, listener: impl Fn(&Event) + 'static) -> ListenerId {
        self.register(kind, true, Rc::new(listener))
    }

    fn register(&self, kind: EventKind, once: bool, listener: Listener) -> ListenerId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.listeners.insert(
            id,
            Registration {
                kind,
                once,
                listener,
            },
        );
        ListenerId(id)
    }

    /// Unbind a listener. Returns false if it was not bound.
    pub fn off(&self, id: ListenerId) -> bool {
        self.state.borrow_mut().listeners.remove(&id.0).is_some()
    }

    /// Deliver an event to every listener bound for its kind
    ///
    /// Listeners bound or unbound while dispatching take effect for the next
    /// event, so handlers are free to call back into the bus.
    pub fn dispatch(&self, event: &Event) -> usize {
        let kind = event.kind();
        let targets: Vec<Listener> = {
            let mut state = self.state.borrow_mut();
            let ids: Vec<(u64, bool)> = state
                .listeners
                .iter()
                .filter(|(_, reg)| reg.kind == kind)
                .map(|(id, reg)| (*id, reg.once))
                .collect();
            ids.into_iter()
                .filter_map(|(id, once)| {
                    if once {
                        state.listeners.remove(&id).map(|reg| reg.listener)
                    } else {
                        state.listeners.get(&id).map(|reg| reg.listener.clone())
                    }
                })
                .collect()
        };

        for listener in &targets {
            listener(event);
        }
        targets.len()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.state
            .borrow()
            .listeners
            .values()
            .filter(|reg| reg.kind == kind)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_dispatch_reaches_matching_kind_only() {
        let bus = EventBus::new();
        let scrolls = Rc::new(Cell::new(0));
        let s = scrolls.clone();
        bus.on(EventKind::Scroll, move |_| s.set(s.get() + 1));

        assert_eq!(bus.dispatch(&Event::Scroll), 1);
        assert_eq!(bus.dispatch(&Event::Resize), 0);
        assert_eq!(scrolls.get(), 1);
    }

    #[test]
    fn test_off_unbinds() {
        let bus = EventBus::new();
        let id = bus.on(EventKind::Resize, |_| {});
        assert_eq!(bus.listener_count(EventKind::Resize), 1);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        assert_eq!(bus.total_listeners(), 0);
    }

    #[test]
    fn test_once_listener_runs_once() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        bus.once(EventKind::DomContentLoaded, move |_| c.set(c.get() + 1));

        bus.dispatch(&Event::DomContentLoaded);
        bus.dispatch(&Event::DomContentLoaded);
        assert_eq!(calls.get(), 1);
        assert_eq!(bus.total_listeners(), 0);
    }

    #[test]
    fn test_listener_may_bind_during_dispatch() {
        let bus = EventBus::new();
        let inner = bus.clone();
        bus.on(EventKind::Click, move |_| {
            inner.on(EventKind::Click, |_| {});
        });

        assert_eq!(bus.dispatch(&Event::Click { target: ElementId(0) }), 1);
        assert_eq!(bus.listener_count(EventKind::Click), 2);
    }
}
