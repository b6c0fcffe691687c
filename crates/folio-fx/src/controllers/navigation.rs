use std::rc::Rc;
use std::time::Duration;

use folio_core::config::NavigationConfig;
use folio_core::host::{ElementId, Event, EventKind, Host, ScrollBehavior};
use folio_core::rate_limit::{debounce, throttle};
use folio_core::Result;
use tracing::debug;

use super::{Controller, Subscriptions};

struct NavState {
    host: Host,
    nav: ElementId,
    links: Vec<ElementId>,
    sections: Vec<ElementId>,
    config: NavigationConfig,
}

impl NavState {
    /// Id of the section under `scroll_y + scroll_offset`; the last match wins
    fn current_section(&self) -> Option<String> {
        let doc = self.host.document();
        let position = doc.viewport().scroll_y + self.config.scroll_offset;

        let mut current = None;
        for &section in &self.sections {
            let (Some(top), Some(height)) = (doc.offset_top(section), doc.client_height(section))
            else {
                continue;
            };
            if position >= top && position < top + height {
                current = doc.attribute(section, "id");
            }
        }
        current
    }

    fn update_active_link(&self) {
        let doc = self.host.document();
        let target = self.current_section().map(|id| format!("#{}", id));
        for &link in &self.links {
            let active = match (&target, doc.attribute(link, "href")) {
                (Some(target), Some(href)) => *target == href,
                _ => false,
            };
            doc.toggle_class(link, "active", active);
        }
    }

    fn update_scrolled(&self) {
        let doc = self.host.document();
        let scrolled = doc.viewport().scroll_y > self.config.scrolled_threshold;
        doc.toggle_class(self.nav, "scrolled", scrolled);
    }

    fn handle_click(&self, target: ElementId) {
        let doc = self.host.document();
        let Some(&link) = self.links.iter().find(|&&link| doc.contains(link, target)) else {
            return;
        };
        let Some(href) = doc.attribute(link, "href") else {
            return;
        };
        let Some(section) = href.strip_prefix('#').and_then(|id| doc.element_by_id(id)) else {
            debug!("Navigation target {} not found", href);
            return;
        };
        if let Some(top) = doc.offset_top(section) {
            doc.scroll_to(top - self.config.nav_height, ScrollBehavior::Smooth);
        }
    }
}

/// Active-link highlighting, the `scrolled` nav state and smooth link scrolling
pub struct Navigation {
    subscriptions: Subscriptions,
    active: bool,
}

impl Navigation {
    pub fn new(host: &Host, config: &NavigationConfig) -> Result<Self> {
        let mut subscriptions = Subscriptions::new(host);
        let doc = host.document();

        let Some(nav) = doc.select_one(".nav")? else {
            debug!("Navigation disabled: no .nav element");
            return Ok(Self {
                subscriptions,
                active: false,
            });
        };

        let state = Rc::new(NavState {
            host: host.clone(),
            nav,
            links: doc.select(".nav-link")?,
            sections: doc.select(".section")?,
            config: config.clone(),
        });
        debug!(
            "Navigation: {} links, {} sections",
            state.links.len(),
            state.sections.len()
        );

        let on_scroll = {
            let state = state.clone();
            throttle(
                host.scheduler(),
                Duration::from_millis(config.scroll_throttle_ms),
                move |()| {
                    state.update_active_link();
                    state.update_scrolled();
                },
            )
        };
        let throttled = on_scroll.clone();
        subscriptions.on(EventKind::Scroll, move |_| {
            throttled.call(());
        });
        subscriptions.on_release(move || on_scroll.cancel());

        let on_resize = {
            let state = state.clone();
            debounce(
                host.scheduler(),
                Duration::from_millis(config.resize_debounce_ms),
                move |()| state.update_active_link(),
            )
        };
        let debounced = on_resize.clone();
        subscriptions.on(EventKind::Resize, move |_| debounced.call(()));
        subscriptions.on_release(move || on_resize.cancel());

        let clicks = state.clone();
        subscriptions.on(EventKind::Click, move |event| {
            if let Event::Click { target } = event {
                clicks.handle_click(*target);
            }
        });

        state.update_active_link();
        state.update_scrolled();

        Ok(Self {
            subscriptions,
            active: true,
        })
    }
}

impl Controller for Navigation {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn teardown(&mut self) {
        self.subscriptions.release();
    }
}
