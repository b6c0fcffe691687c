//! Dynamic text, lazy images and count-up statistics

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chrono::Datelike;
use folio_core::host::{Document, ElementId, Host};
use folio_core::motion::{animate_value, TweenHandle};
use folio_core::visibility::{VisibilityGate, VisibilityOptions};
use folio_core::{AppConfig, Result};
use tracing::{debug, warn};

use super::Controller;

const LAZY_IMAGES: &str = r#"img[loading="lazy"]"#;
const COUNTERS: &str = ".stat-number[data-target]";

/// Whole years between `start_year` and `current_year`
pub fn years_since(start_year: i32, current_year: i32) -> i32 {
    current_year - start_year
}

/// Text shown by a counter for an animated value
pub fn counter_text(value: f64, suffix: &str) -> String {
    format!("{}{}", value.round() as i64, suffix)
}

struct Counter {
    element: ElementId,
    target: f64,
    suffix: String,
}

pub struct Content {
    gates: Vec<VisibilityGate>,
    tweens: Rc<RefCell<Vec<TweenHandle>>>,
    active: bool,
}

impl Content {
    pub fn new(host: &Host, config: &AppConfig) -> Result<Self> {
        Self::with_year(host, config, chrono::Local::now().year())
    }

    /// Construct with an explicit calendar year for the age and career texts
    pub fn with_year(host: &Host, config: &AppConfig, current_year: i32) -> Result<Self> {
        let doc = host.document();
        let lazy_options =
            VisibilityOptions::new(config.lazy_load.threshold, &config.lazy_load.root_margin)?;
        let counter_options = VisibilityOptions::new(config.count_up.threshold, "0px")?;
        let mut active = false;

        if let Some(el) = doc.element_by_id("current-age") {
            let age = years_since(config.profile.birth_year, current_year);
            doc.set_text(el, &age.to_string());
            active = true;
        }
        if let Some(el) = doc.element_by_id("career-years") {
            let years = years_since(config.profile.career_start_year, current_year);
            doc.set_text(el, &format!("{}+", years));
            active = true;
        }

        let mut content = Self {
            gates: Vec::new(),
            tweens: Rc::new(RefCell::new(Vec::new())),
            active,
        };
        content.setup_lazy_loading(host, lazy_options)?;
        content.setup_counters(host, config, counter_options)?;

        if !content.active {
            debug!("Content disabled: no dynamic elements");
        }
        Ok(content)
    }

    fn setup_lazy_loading(&mut self, host: &Host, options: VisibilityOptions) -> Result<()> {
        let images = host.document().select(LAZY_IMAGES)?;
        if images.is_empty() {
            return Ok(());
        }
        debug!("Lazy loading {} images", images.len());

        let page = host.clone();
        self.gates.push(VisibilityGate::observe(host, &images, options, move |img| {
            load_image(page.document(), img)
        }));
        self.active = true;
        Ok(())
    }

    fn setup_counters(
        &mut self,
        host: &Host,
        config: &AppConfig,
        options: VisibilityOptions,
    ) -> Result<()> {
        let doc = host.document();
        let counters: Vec<Counter> = doc
            .select(COUNTERS)?
            .into_iter()
            .filter_map(|element| {
                let raw = doc.attribute(element, "data-target")?;
                match raw.trim().parse::<f64>() {
                    Ok(target) if target.is_finite() => Some(Counter {
                        element,
                        target,
                        suffix: doc.attribute(element, "data-suffix").unwrap_or_default(),
                    }),
                    _ => {
                        warn!("Ignoring counter with invalid data-target '{}'", raw);
                        None
                    }
                }
            })
            .collect();
        if counters.is_empty() {
            return Ok(());
        }

        let elements: Vec<ElementId> = counters.iter().map(|c| c.element).collect();
        let duration = Duration::from_millis(config.count_up.duration_ms);
        let easing = config.count_up_easing();
        let page = host.clone();
        let tweens = self.tweens.clone();

        self.gates.push(VisibilityGate::observe(host, &elements, options, move |element| {
            let Some(counter) = counters.iter().find(|c| c.element == element) else {
                return;
            };
            let doc = page.clone();
            let suffix = counter.suffix.clone();
            let handle = animate_value(
                page.scheduler(),
                0.0,
                counter.target,
                duration,
                easing,
                move |value| doc.document().set_text(element, &counter_text(value, &suffix)),
            );
            tweens.borrow_mut().push(handle);
        }));
        self.active = true;
        Ok(())
    }

    /// Tweens started so far that are still running
    pub fn running_tweens(&self) -> usize {
        self.tweens.borrow().iter().filter(|t| t.is_running()).count()
    }
}

fn load_image(doc: &dyn Document, img: ElementId) {
    if let Some(src) = doc.attribute(img, "data-src").or_else(|| doc.attribute(img, "src")) {
        doc.set_attribute(img, "src", &src);
    }
    doc.add_class(img, "loaded");
}

impl Controller for Content {
    fn name(&self) -> &'static str {
        "content"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn teardown(&mut self) {
        for gate in self.gates.drain(..) {
            gate.disconnect();
        }
        for tween in self.tweens.borrow_mut().drain(..) {
            tween.cancel();
        }
    }
}
