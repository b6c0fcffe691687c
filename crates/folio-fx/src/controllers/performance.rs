use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use folio_core::host::{Event, EventKind, Host, PerformanceEntry};
use folio_core::Result;
use tracing::info;

use super::{Controller, Subscriptions};

/// Metrics observed so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceSummary {
    pub load_time: Option<Duration>,
    /// Start time of the latest largest-contentful-paint candidate, in ms
    pub largest_contentful_paint: Option<f64>,
    /// Delay of the first input, in ms
    pub first_input_delay: Option<f64>,
    /// Sum of layout shifts not caused by recent input
    pub cumulative_layout_shift: f64,
}

/// Logs page load time and core web vitals; development builds only
pub struct PerformanceMonitor {
    subscriptions: Subscriptions,
    summary: Rc<RefCell<PerformanceSummary>>,
}

impl PerformanceMonitor {
    pub fn new(host: &Host) -> Result<Self> {
        let mut subscriptions = Subscriptions::new(host);
        let summary = Rc::new(RefCell::new(PerformanceSummary::default()));

        let metrics = summary.clone();
        subscriptions.on(EventKind::Load, move |event| {
            if let Event::Load { load_time } = event {
                info!("Page loaded in {}ms", load_time.as_millis());
                metrics.borrow_mut().load_time = Some(*load_time);
            }
        });

        let metrics = summary.clone();
        subscriptions.on(EventKind::Performance, move |event| {
            let Event::Performance(entry) = event else {
                return;
            };
            let mut metrics = metrics.borrow_mut();
            match *entry {
                // Paint candidates are only observed once the page has loaded
                PerformanceEntry::LargestContentfulPaint { start_time } => {
                    if metrics.load_time.is_some() {
                        info!("LCP: {}", start_time);
                        metrics.largest_contentful_paint = Some(start_time);
                    }
                }
                PerformanceEntry::FirstInput {
                    start_time,
                    processing_start,
                } => {
                    let delay = processing_start - start_time;
                    info!("FID: {}", delay);
                    metrics.first_input_delay.get_or_insert(delay);
                }
                PerformanceEntry::LayoutShift {
                    value,
                    had_recent_input,
                } => {
                    if !had_recent_input {
                        info!("CLS: {}", value);
                        metrics.cumulative_layout_shift += value;
                    }
                }
            }
        });

        Ok(Self {
            subscriptions,
            summary,
        })
    }

    pub fn summary(&self) -> PerformanceSummary {
        self.summary.borrow().clone()
    }
}

impl Controller for PerformanceMonitor {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn teardown(&mut self) {
        self.subscriptions.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::{ms, page};

    #[test]
    fn test_collects_vitals() {
        let page = page(vec![]);
        let monitor = PerformanceMonitor::new(page.host()).unwrap();

        // Before load: ignored
        page.report_performance(PerformanceEntry::LargestContentfulPaint { start_time: 90.0 });
        page.load(ms(420));
        page.report_performance(PerformanceEntry::LargestContentfulPaint { start_time: 120.0 });
        page.report_performance(PerformanceEntry::LargestContentfulPaint { start_time: 310.5 });
        page.report_performance(PerformanceEntry::FirstInput {
            start_time: 1000.0,
            processing_start: 1012.0,
        });
        page.report_performance(PerformanceEntry::LayoutShift {
            value: 0.05,
            had_recent_input: false,
        });
        page.report_performance(PerformanceEntry::LayoutShift {
            value: 0.5,
            had_recent_input: true,
        });
        page.report_performance(PerformanceEntry::LayoutShift {
            value: 0.25,
            had_recent_input: false,
        });

        let summary = monitor.summary();
        assert_eq!(summary.load_time, Some(ms(420)));
        assert_eq!(summary.largest_contentful_paint, Some(310.5));
        assert_eq!(summary.first_input_delay, Some(12.0));
        assert!((summary.cumulative_layout_shift - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_teardown_unbinds() {
        let page = page(vec![]);
        let mut monitor = PerformanceMonitor::new(page.host()).unwrap();
        monitor.teardown();
        page.load(ms(100));
        assert_eq!(monitor.summary(), PerformanceSummary::default());
    }
}
