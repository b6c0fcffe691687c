use std::cell::{Cell, RefCell};
use std::rc::Rc;

use folio_core::config::TypingConfig;
use folio_core::host::{CancelToken, ElementId, Host, TimerId};
use folio_core::typing::{TypingCycle, TypingTimings};
use folio_core::Result;
use tracing::debug;

use super::Controller;

const TYPING_TEXT: &str = ".typing-text";

struct TypingRunner {
    host: Host,
    element: ElementId,
    cycle: RefCell<TypingCycle>,
    token: CancelToken,
    pending: Rc<Cell<Option<TimerId>>>,
}

/// Drives a [`TypingCycle`] on the host's timers and renders it into `.typing-text`
pub struct TypingEffect {
    host: Host,
    token: CancelToken,
    pending: Rc<Cell<Option<TimerId>>>,
    active: bool,
}

impl TypingEffect {
    pub fn new(host: &Host, config: &TypingConfig) -> Result<Self> {
        let token = CancelToken::new();
        let pending = Rc::new(Cell::new(None));
        let mut effect = Self {
            host: host.clone(),
            token: token.clone(),
            pending: pending.clone(),
            active: false,
        };

        if !config.enabled {
            debug!("Typing effect disabled by configuration");
            return Ok(effect);
        }
        let Some(element) = host.document().select_one(TYPING_TEXT)? else {
            debug!("Typing effect disabled: no {} element", TYPING_TEXT);
            return Ok(effect);
        };
        let Some(cycle) = TypingCycle::from_config(config) else {
            debug!("Typing effect disabled: empty word list");
            return Ok(effect);
        };

        host.document().set_text(element, "");
        let runner = Rc::new(TypingRunner {
            host: host.clone(),
            element,
            cycle: RefCell::new(cycle),
            token,
            pending,
        });
        schedule(&runner, TypingTimings::from(config).type_delay);

        effect.active = true;
        Ok(effect)
    }

    pub fn is_running(&self) -> bool {
        self.active && !self.token.is_cancelled()
    }
}

fn schedule(runner: &Rc<TypingRunner>, delay: std::time::Duration) {
    let next = runner.clone();
    let id = runner.host.scheduler().set_timeout(delay, move || tick(&next));
    runner.pending.set(Some(id));
}

fn tick(runner: &Rc<TypingRunner>) {
    runner.pending.set(None);
    if runner.token.is_cancelled() {
        return;
    }
    let step = runner.cycle.borrow_mut().tick();
    runner.host.document().set_text(runner.element, &step.text);
    schedule(runner, step.delay);
}

impl Controller for TypingEffect {
    fn name(&self) -> &'static str {
        "typing"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn teardown(&mut self) {
        self.token.cancel();
        if let Some(id) = self.pending.take() {
            self.host.scheduler().clear_timeout(id);
        }
    }
}
