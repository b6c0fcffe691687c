use std::time::Duration;

use folio_core::config::ScrollTopConfig;
use folio_core::host::{Event, EventKind, Host, ScrollBehavior};
use folio_core::rate_limit::throttle;
use folio_core::Result;
use tracing::debug;

use super::{Controller, Subscriptions};

const SCROLL_TO_TOP: &str = ".scroll-to-top";

/// Button that appears past a scroll depth and scrolls back to the top
pub struct ScrollToTop {
    subscriptions: Subscriptions,
    active: bool,
}

impl ScrollToTop {
    pub fn new(host: &Host, config: &ScrollTopConfig, throttle_interval: Duration) -> Result<Self> {
        let mut subscriptions = Subscriptions::new(host);
        let Some(button) = host.document().select_one(SCROLL_TO_TOP)? else {
            debug!("Scroll-to-top disabled: no {} element", SCROLL_TO_TOP);
            return Ok(Self {
                subscriptions,
                active: false,
            });
        };

        let show_after = config.show_after;
        let page = host.clone();
        let update = move || {
            let doc = page.document();
            doc.toggle_class(button, "visible", doc.viewport().scroll_y > show_after);
        };
        update();

        let on_scroll = throttle(host.scheduler(), throttle_interval, move |()| update());
        let throttled = on_scroll.clone();
        subscriptions.on(EventKind::Scroll, move |_| {
            throttled.call(());
        });
        subscriptions.on_release(move || on_scroll.cancel());

        let page = host.clone();
        subscriptions.on(EventKind::Click, move |event| {
            if let Event::Click { target } = event {
                if page.document().contains(button, *target) {
                    page.document().scroll_to(0.0, ScrollBehavior::Smooth);
                }
            }
        });

        Ok(Self {
            subscriptions,
            active: true,
        })
    }
}

impl Controller for ScrollToTop {
    fn name(&self) -> &'static str {
        "scroll_top"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn teardown(&mut self) {
        self.subscriptions.release();
    }
}
