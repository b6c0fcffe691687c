//! Intersection reporting
//!
//! The registry plays the role of the browser's intersection observer: on each
//! layout pass it measures every observed element against the viewport
//! (grown or shrunk by the observer's root margin) and notifies the observer
//! of elements whose visibility relative to its threshold changed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;

use super::document::{Document, ElementId, Rect};
use crate::{Error, Result};

/// Margin applied to the viewport before intersecting, CSS shorthand order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

fn length_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<num>[+-]?(?:\d+(?:\.\d*)?|\.\d+))(?P<unit>px)?$")
            .expect("length regex is valid")
    })
}

impl RootMargin {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Parse `"50px"`, `"0px 0px -50px 0px"` and the 2/3-value shorthands
    pub fn parse(source: &str) -> Result<Self> {
        let values = source
            .split_whitespace()
            .map(|token| {
                let caps = length_regex()
                    .captures(token)
                    .ok_or_else(|| Error::RootMargin(format!("bad length '{}' in '{}'", token, source)))?;
                let value: f64 = caps["num"]
                    .parse()
                    .map_err(|_| Error::RootMargin(format!("bad number '{}'", token)))?;
                if caps.name("unit").is_none() && value != 0.0 {
                    return Err(Error::RootMargin(format!(
                        "length '{}' needs a px unit",
                        token
                    )));
                }
                Ok(value)
            })
            .collect::<Result<Vec<f64>>>()?;

        match values.as_slice() {
            [all] => Ok(Self::uniform(*all)),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            _ => Err(Error::RootMargin(format!(
                "expected 1 to 4 lengths, got '{}'",
                source
            ))),
        }
    }

    /// Grow `rect` outward by the margin (negative values shrink it)
    pub fn expand(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.top - self.top,
            rect.left - self.left,
            rect.width + self.left + self.right,
            rect.height + self.top + self.bottom,
        )
    }
}

impl std::str::FromStr for RootMargin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One measurement delivered to an observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: ElementId,
    /// Visible fraction of the target's area, in [0, 1]
    pub ratio: f64,
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    /// Check if the entry counts as visible for `threshold`
    #[inline]
    pub fn crosses(&self, threshold: f64) -> bool {
        self.is_intersecting && self.ratio >= threshold
    }
}

/// Measure `target` against the viewport adjusted by `margin`
pub fn measure(
    document: &dyn Document,
    target: ElementId,
    margin: &RootMargin,
) -> Option<IntersectionEntry> {
    let rect = document.bounding_rect(target)?;
    let root = margin.expand(document.viewport().rect());
    let entry = match rect.intersection(&root) {
        Some(overlap) => {
            let area = rect.area();
            let ratio = if area > 0.0 {
                (overlap.area() / area).clamp(0.0, 1.0)
            } else {
                1.0
            };
            IntersectionEntry {
                target,
                ratio,
                is_intersecting: true,
            }
        }
        None => IntersectionEntry {
            target,
            ratio: 0.0,
            is_intersecting: false,
        },
    };
    Some(entry)
}

/// Handle for a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

type ObserverCallback = Rc<dyn Fn(&[IntersectionEntry])>;

struct Observation {
    target: ElementId,
    /// Visibility reported last time, None before the first measurement
    last_visible: Option<bool>,
}

struct ObserverState {
    root_margin: RootMargin,
    threshold: f64,
    targets: Vec<Observation>,
    callback: ObserverCallback,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    observers: BTreeMap<u64, ObserverState>,
}

/// Page-wide set of intersection observers
#[derive(Clone, Default)]
pub struct IntersectionRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl IntersectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing `targets`; the first layout pass reports each of them
    pub fn observe(
        &self,
        targets: &[ElementId],
        root_margin: RootMargin,
        threshold: f64,
        callback: impl Fn(&[IntersectionEntry]) + 'static,
    ) -> ObserverId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;

        let mut observations: Vec<Observation> = Vec::with_capacity(targets.len());
        for &target in targets {
            if !observations.iter().any(|o| o.target == target) {
                observations.push(Observation {
                    target,
                    last_visible: None,
                });
            }
        }

        state.observers.insert(
            id,
            ObserverState {
                root_margin,
                threshold: threshold.clamp(0.0, 1.0),
                targets: observations,
                callback: Rc::new(callback),
            },
        );
        ObserverId(id)
    }

    /// Stop observing one element
    pub fn unobserve(&self, observer: ObserverId, target: ElementId) -> bool {
        let mut state = self.state.borrow_mut();
        match state.observers.get_mut(&observer.0) {
            Some(obs) => {
                let before = obs.targets.len();
                obs.targets.retain(|o| o.target != target);
                obs.targets.len() != before
            }
            None => false,
        }
    }

    /// Drop an observer and everything it watches
    pub fn disconnect(&self, observer: ObserverId) -> bool {
        self.state.borrow_mut().observers.remove(&observer.0).is_some()
    }

    pub fn observed_count(&self, observer: ObserverId) -> usize {
        self.state
            .borrow()
            .observers
            .get(&observer.0)
            .map(|o| o.targets.len())
            .unwrap_or(0)
    }

    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    /// Measure every observed element and notify observers of changes
    ///
    /// Returns the number of entries delivered.
    pub fn layout_pass(&self, document: &dyn Document) -> usize {
        let ids: Vec<u64> = self.state.borrow().observers.keys().copied().collect();
        let mut delivered = 0;

        for id in ids {
            let snapshot = {
                let state = self.state.borrow();
                state.observers.get(&id).map(|obs| {
                    let targets: Vec<ElementId> = obs.targets.iter().map(|o| o.target).collect();
                    (obs.root_margin, obs.threshold, targets, obs.callback.clone())
                })
            };
            let Some((margin, threshold, targets, callback)) = snapshot else {
                continue;
            };

            let measured: Vec<IntersectionEntry> = targets
                .into_iter()
                .filter_map(|target| measure(document, target, &margin))
                .collect();

            let changed: Vec<IntersectionEntry> = {
                let mut state = self.state.borrow_mut();
                let Some(obs) = state.observers.get_mut(&id) else {
                    continue;
                };
                measured
                    .into_iter()
                    .filter(|entry| {
                        let visible = entry.crosses(threshold);
                        match obs.targets.iter_mut().find(|o| o.target == entry.target) {
                            Some(observation) if observation.last_visible != Some(visible) => {
                                observation.last_visible = Some(visible);
                                true
                            }
                            _ => false,
                        }
                    })
                    .collect()
            };

            if !changed.is_empty() {
                delivered += changed.len();
                callback(&changed);
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shorthands() {
        assert_eq!(RootMargin::parse("50px").unwrap(), RootMargin::uniform(50.0));
        assert_eq!(
            RootMargin::parse("0px 0px -50px 0px").unwrap(),
            RootMargin {
                top: 0.0,
                right: 0.0,
                bottom: -50.0,
                left: 0.0
            }
        );
        assert_eq!(
            RootMargin::parse("10px 20px").unwrap(),
            RootMargin {
                top: 10.0,
                right: 20.0,
                bottom: 10.0,
                left: 20.0
            }
        );
        assert_eq!(RootMargin::parse("0").unwrap(), RootMargin::default());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RootMargin::parse("").is_err());
        assert!(RootMargin::parse("50").is_err());
        assert!(RootMargin::parse("5em").is_err());
        assert!(RootMargin::parse("1px 2px 3px 4px 5px").is_err());
    }

    #[test]
    fn test_expand() {
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        let grown = RootMargin::uniform(50.0).expand(viewport);
        assert_eq!(grown, Rect::new(-50.0, -50.0, 900.0, 700.0));

        let shrunk = RootMargin::parse("0px 0px -50px 0px").unwrap().expand(viewport);
        assert_eq!(shrunk.bottom(), 550.0);
    }

    #[test]
    fn test_entry_crosses() {
        let entry = IntersectionEntry {
            target: ElementId(1),
            ratio: 0.05,
            is_intersecting: true,
        };
        assert!(!entry.crosses(0.1));
        assert!(entry.crosses(0.0));
    }
}
