//! Scroll reveal and card hover lift

use std::rc::Rc;

use folio_core::config::RevealConfig;
use folio_core::host::{ElementId, Event, EventKind, Host};
use folio_core::visibility::{VisibilityGate, VisibilityOptions};
use folio_core::Result;
use tracing::debug;

use super::{Controller, Subscriptions};

pub struct Animation {
    subscriptions: Subscriptions,
    gate: Option<VisibilityGate>,
}

impl Animation {
    pub fn new(host: &Host, config: &RevealConfig) -> Result<Self> {
        let doc = host.document();
        let mut subscriptions = Subscriptions::new(host);

        // Every lookup that can fail runs before anything is bound
        let revealed = doc.select(&config.selector)?;
        let cards: Rc<Vec<ElementId>> = Rc::new(doc.select(&config.hover_selector)?);
        let options = if revealed.is_empty() {
            None
        } else {
            Some(VisibilityOptions::new(config.threshold, &config.root_margin)?)
        };

        let gate = options.map(|options| {
            let page = host.clone();
            VisibilityGate::observe(host, &revealed, options, move |el| {
                page.document().add_class(el, "animate-in")
            })
        });

        if !cards.is_empty() {
            let lifted = format!("translateY(-{}px)", config.hover_lift_px);

            let (page, targets) = (host.clone(), cards.clone());
            subscriptions.on(EventKind::PointerEnter, move |event| {
                if let Event::PointerEnter { target } = event {
                    if targets.contains(target) {
                        page.document().set_style(*target, "transform", &lifted);
                    }
                }
            });

            let (page, targets) = (host.clone(), cards.clone());
            subscriptions.on(EventKind::PointerLeave, move |event| {
                if let Event::PointerLeave { target } = event {
                    if targets.contains(target) {
                        page.document().set_style(*target, "transform", "translateY(0)");
                    }
                }
            });
        }

        debug!(
            "Animation: {} reveal targets, {} hover cards",
            revealed.len(),
            cards.len()
        );
        Ok(Self { subscriptions, gate })
    }
}

impl Controller for Animation {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn is_active(&self) -> bool {
        self.gate.is_some() || !self.subscriptions.is_empty()
    }

    fn teardown(&mut self) {
        if let Some(gate) = self.gate.take() {
            gate.disconnect();
        }
        self.subscriptions.release();
    }
}
