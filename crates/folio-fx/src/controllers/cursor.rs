use std::cell::{Cell, RefCell};
use std::rc::Rc;

use folio_core::config::CursorConfig;
use folio_core::host::{CancelToken, ElementId, Event, EventKind, FrameId, Host};
use folio_core::motion::{Follow, Point};
use folio_core::{Error, Result};
use tracing::debug;

use super::{Controller, Subscriptions};

const CURSOR_GLOW: &str = ".cursor-glow";

/// Remaining distance, in px, below which the glow stops requesting frames
const SETTLE_EPSILON: f64 = 0.1;

struct GlowState {
    host: Host,
    element: ElementId,
    follow: RefCell<Follow>,
    shown: Cell<bool>,
    frame: Cell<Option<FrameId>>,
    token: CancelToken,
}

impl GlowState {
    fn render(&self, point: Point) {
        let doc = self.host.document();
        doc.set_style(self.element, "left", &format!("{:.1}px", point.x));
        doc.set_style(self.element, "top", &format!("{:.1}px", point.y));
    }

    fn pointer_moved(self: &Rc<Self>, point: Point) {
        if !self.shown.replace(true) {
            self.follow.borrow_mut().jump_to(point);
            self.host.document().set_style(self.element, "opacity", "1");
            self.render(point);
            return;
        }
        self.follow.borrow_mut().set_target(point);
        if self.frame.get().is_none() {
            request_frame(self);
        }
    }
}

fn request_frame(state: &Rc<GlowState>) {
    let next = state.clone();
    let id = state.host.scheduler().request_frame(move |_| step(&next));
    state.frame.set(Some(id));
}

fn step(state: &Rc<GlowState>) {
    state.frame.set(None);
    if state.token.is_cancelled() {
        return;
    }
    let (point, settled) = {
        let mut follow = state.follow.borrow_mut();
        let point = follow.update();
        (point, follow.is_settled(SETTLE_EPSILON))
    };
    state.render(point);
    if !settled {
        request_frame(state);
    }
}

/// Glow element trailing the pointer with a per-frame lerp
pub struct PointerGlow {
    subscriptions: Subscriptions,
    state: Option<Rc<GlowState>>,
}

impl PointerGlow {
    pub fn new(host: &Host, config: &CursorConfig) -> Result<Self> {
        let mut subscriptions = Subscriptions::new(host);
        if !config.enabled {
            debug!("Pointer glow disabled by configuration");
            return Ok(Self {
                subscriptions,
                state: None,
            });
        }
        // A zero factor never settles and would request frames forever
        if !(config.follow_factor > 0.0 && config.follow_factor <= 1.0) {
            return Err(Error::Config(format!(
                "cursor.follow_factor must be within (0, 1], got {}",
                config.follow_factor
            )));
        }
        let Some(element) = host.document().select_one(CURSOR_GLOW)? else {
            debug!("Pointer glow disabled: no {} element", CURSOR_GLOW);
            return Ok(Self {
                subscriptions,
                state: None,
            });
        };

        host.document().set_style(element, "opacity", "0");
        let state = Rc::new(GlowState {
            host: host.clone(),
            element,
            follow: RefCell::new(Follow::new(config.follow_factor)),
            shown: Cell::new(false),
            frame: Cell::new(None),
            token: CancelToken::new(),
        });

        let moved = state.clone();
        subscriptions.on(EventKind::PointerMove, move |event| {
            if let Event::PointerMove { x, y } = event {
                moved.pointer_moved(Point::new(*x, *y));
            }
        });

        Ok(Self {
            subscriptions,
            state: Some(state),
        })
    }

    /// Position the glow is currently drawn at
    pub fn position(&self) -> Option<Point> {
        self.state.as_ref().map(|s| s.follow.borrow().current())
    }
}

impl Controller for PointerGlow {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn is_active(&self) -> bool {
        self.state.is_some()
    }

    fn teardown(&mut self) {
        self.subscriptions.release();
        if let Some(state) = self.state.take() {
            state.token.cancel();
            if let Some(id) = state.frame.take() {
                state.host.scheduler().cancel_frame(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::testing::{ms, page};
    use folio_core::host::{ElementSpec, HeadlessPage};
    use folio_core::Document;

    fn glow_page() -> (HeadlessPage, ElementId) {
        let page = page(vec![ElementSpec::new("div").id("glow").class("cursor-glow")]);
        let glow = page.document().element_by_id("glow").unwrap();
        (page, glow)
    }

    #[test]
    fn test_hidden_until_first_move() {
        let (page, glow) = glow_page();
        let _cursor = PointerGlow::new(page.host(), &CursorConfig::default()).unwrap();
        let doc = page.document();
        assert_eq!(doc.style(glow, "opacity").as_deref(), Some("0"));

        page.pointer_move(100.0, 50.0);
        assert_eq!(doc.style(glow, "opacity").as_deref(), Some("1"));
        assert_eq!(doc.style(glow, "left").as_deref(), Some("100.0px"));
        assert_eq!(doc.style(glow, "top").as_deref(), Some("50.0px"));
    }

    #[test]
    fn test_follows_by_factor_per_frame() {
        let (page, glow) = glow_page();
        let cursor = PointerGlow::new(page.host(), &CursorConfig::default()).unwrap();

        page.pointer_move(100.0, 50.0);
        page.pointer_move(200.0, 50.0);
        page.advance(ms(16));
        assert_eq!(page.document().style(glow, "left").as_deref(), Some("110.0px"));

        page.advance(ms(16 * 200));
        let p = cursor.position().unwrap();
        assert!((p.x - 200.0).abs() < SETTLE_EPSILON);
        assert_eq!(page.host().scheduler().pending_frames(), 0);
    }

    #[test]
    fn test_disabled_by_config() {
        let (page, glow) = glow_page();
        let config = CursorConfig {
            enabled: false,
            ..CursorConfig::default()
        };
        let cursor = PointerGlow::new(page.host(), &config).unwrap();
        assert!(!cursor.is_active());
        assert_eq!(page.document().style(glow, "opacity"), None);
    }

    #[test]
    fn test_teardown_cancels_frame() {
        let (page, _) = glow_page();
        let mut cursor = PointerGlow::new(page.host(), &CursorConfig::default()).unwrap();
        page.pointer_move(0.0, 0.0);
        page.pointer_move(500.0, 500.0);
        assert_eq!(page.host().scheduler().pending_frames(), 1);

        cursor.teardown();
        assert_eq!(page.host().scheduler().pending_frames(), 0);
        assert_eq!(page.host().events().total_listeners(), 0);
    }

    #[test]
    fn test_stalled_follow_factor_is_rejected() {
        let (page, _glow) = glow_page();
        let config = CursorConfig {
            follow_factor: 0.0,
            ..CursorConfig::default()
        };
        assert!(PointerGlow::new(page.host(), &config).is_err());
        assert_eq!(page.host().events().total_listeners(), 0);
        assert!(!page.host().scheduler().has_pending_work());
    }
}
