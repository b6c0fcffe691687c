//! One-shot "first visible" notifications
//!
//! [`GateState`] is the pure bookkeeping: every element fires at most once,
//! the first time it is reported crossing the threshold, and is forgotten
//! afterwards. [`VisibilityGate`] wires that state to the host's intersection
//! registry and unobserves each element as it fires.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::host::document::ElementId;
use crate::host::intersection::{IntersectionEntry, IntersectionRegistry, ObserverId, RootMargin};
use crate::host::Host;
use crate::{Error, Result};

/// Threshold and root margin for a gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityOptions {
    /// Visible fraction that counts as "seen", in [0, 1]
    pub threshold: f64,
    pub root_margin: RootMargin,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            root_margin: RootMargin::default(),
        }
    }
}

impl VisibilityOptions {
    /// Build options from a threshold and a CSS margin string
    pub fn new(threshold: f64, root_margin: &str) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "visibility threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self {
            threshold,
            root_margin: RootMargin::parse(root_margin)?,
        })
    }
}

/// Elements still waiting for their first visible report
#[derive(Debug, Clone, Default)]
pub struct GateState {
    waiting: Vec<ElementId>,
    threshold: f64,
}

impl GateState {
    pub fn new(elements: &[ElementId], threshold: f64) -> Self {
        let mut waiting = Vec::with_capacity(elements.len());
        for &element in elements {
            if !waiting.contains(&element) {
                waiting.push(element);
            }
        }
        Self { waiting, threshold }
    }

    /// Consume a batch of reports; returns the elements that fire, in report order
    pub fn handle(&mut self, entries: &[IntersectionEntry]) -> Vec<ElementId> {
        let mut fired = Vec::new();
        for entry in entries {
            if !entry.crosses(self.threshold) {
                continue;
            }
            if let Some(pos) = self.waiting.iter().position(|e| *e == entry.target) {
                self.waiting.remove(pos);
                fired.push(entry.target);
            }
        }
        fired
    }

    pub fn is_waiting(&self, element: ElementId) -> bool {
        self.waiting.contains(&element)
    }

    pub fn remaining(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.waiting.is_empty()
    }
}

/// Gate bound to a host's intersection registry
pub struct VisibilityGate {
    registry: IntersectionRegistry,
    observer: ObserverId,
    state: Rc<RefCell<GateState>>,
    connected: Rc<Cell<bool>>,
}

impl VisibilityGate {
    /// Observe `elements` and call `on_first_visible` once for each
    pub fn observe(
        host: &Host,
        elements: &[ElementId],
        options: VisibilityOptions,
        on_first_visible: impl FnMut(ElementId) + 'static,
    ) -> Self {
        let registry = host.intersections().clone();
        let state = Rc::new(RefCell::new(GateState::new(elements, options.threshold)));
        let connected = Rc::new(Cell::new(true));
        let observer_slot: Rc<Cell<Option<ObserverId>>> = Rc::new(Cell::new(None));
        let on_first_visible = RefCell::new(on_first_visible);

        let callback = {
            let registry = registry.clone();
            let state = state.clone();
            let connected = connected.clone();
            let observer_slot = observer_slot.clone();
            move |entries: &[IntersectionEntry]| {
                let fired = state.borrow_mut().handle(entries);
                let exhausted = state.borrow().is_exhausted();
                let observer = observer_slot.get();

                if let Some(observer) = observer {
                    for &element in &fired {
                        registry.unobserve(observer, element);
                    }
                }
                for element in fired {
                    if let Ok(mut callback) = on_first_visible.try_borrow_mut() {
                        (*callback)(element);
                    }
                }
                if exhausted {
                    if let Some(observer) = observer {
                        registry.disconnect(observer);
                    }
                    connected.set(false);
                }
            }
        };

        let observer = registry.observe(
            &state.borrow().waiting,
            options.root_margin,
            options.threshold,
            callback,
        );
        observer_slot.set(Some(observer));

        if state.borrow().is_exhausted() {
            registry.disconnect(observer);
            connected.set(false);
        }

        Self {
            registry,
            observer,
            state,
            connected,
        }
    }

    pub fn is_waiting(&self, element: ElementId) -> bool {
        self.state.borrow().is_waiting(element)
    }

    pub fn remaining(&self) -> usize {
        self.state.borrow().remaining()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Stop observing every element that has not fired yet
    pub fn disconnect(&self) {
        if self.connected.replace(false) {
            self.registry.disconnect(self.observer);
        }
    }
}

impl Drop for VisibilityGate {
    fn drop(&mut self) {
        self.disconnect();
    }
}
