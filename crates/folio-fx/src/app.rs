use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use folio_core::host::{EventKind, Host, ListenerId, ReadyState};
use folio_core::{AppConfig, Environment, Error, FailurePolicy, Result};
use tracing::{debug, error, info};

use crate::controllers::{
    Animation, Content, Controller, ErrorHook, Navigation, PerformanceMonitor, PointerGlow,
    ScrollToTop, TypingEffect,
};

type BuildFn = dyn Fn(&Host, &AppConfig) -> Result<Box<dyn Controller>>;

/// Named constructor for one controller
pub struct ControllerEntry {
    pub name: &'static str,
    build: Box<BuildFn>,
}

impl ControllerEntry {
    pub fn new(
        name: &'static str,
        build: impl Fn(&Host, &AppConfig) -> Result<Box<dyn Controller>> + 'static,
    ) -> Self {
        Self {
            name,
            build: Box::new(build),
        }
    }
}

/// The page's controllers in construction order
pub fn default_controllers(config: &AppConfig) -> Vec<ControllerEntry> {
    let mut entries = vec![
        ControllerEntry::new("errors", |host, _| Ok(Box::new(ErrorHook::new(host)?))),
        ControllerEntry::new("navigation", |host, config| {
            Ok(Box::new(Navigation::new(host, &config.navigation)?))
        }),
        ControllerEntry::new("content", |host, config| {
            Ok(Box::new(Content::new(host, config)?))
        }),
        ControllerEntry::new("animation", |host, config| {
            Ok(Box::new(Animation::new(host, &config.reveal)?))
        }),
        ControllerEntry::new("typing", |host, config| {
            Ok(Box::new(TypingEffect::new(host, &config.typing)?))
        }),
        ControllerEntry::new("cursor", |host, config| {
            Ok(Box::new(PointerGlow::new(host, &config.cursor)?))
        }),
        ControllerEntry::new("scroll_top", |host, config| {
            let throttle = Duration::from_millis(config.navigation.scroll_throttle_ms);
            Ok(Box::new(ScrollToTop::new(host, &config.scroll_top, throttle)?))
        }),
    ];

    if config.general.environment == Environment::Development {
        entries.push(ControllerEntry::new("performance", |host, _| {
            Ok(Box::new(PerformanceMonitor::new(host)?))
        }));
    }
    entries
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartupFailure {
    pub controller: &'static str,
    pub error: String,
}

/// Outcome of constructing the controllers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartupReport {
    /// Constructed and driving at least one element
    pub started: Vec<&'static str>,
    /// Constructed, but found nothing to drive
    pub inactive: Vec<&'static str>,
    pub failed: Vec<StartupFailure>,
    /// Never constructed because an earlier controller failed under fail-fast
    pub skipped: Vec<&'static str>,
}

impl StartupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

struct AppState {
    host: Host,
    config: AppConfig,
    pending: Option<Vec<ControllerEntry>>,
    controllers: Vec<Box<dyn Controller>>,
    report: Option<StartupReport>,
    deferred: Option<ListenerId>,
}

/// Composition root owning every controller of one page
pub struct App {
    state: Rc<RefCell<AppState>>,
}

impl App {
    /// Start the default controllers, deferring until the document is parsed
    pub fn start(host: &Host, config: AppConfig) -> Self {
        let entries = default_controllers(&config);
        Self::start_with(host, config, entries)
    }

    pub fn start_with(host: &Host, config: AppConfig, entries: Vec<ControllerEntry>) -> Self {
        let state = Rc::new(RefCell::new(AppState {
            host: host.clone(),
            config,
            pending: Some(entries),
            controllers: Vec::new(),
            report: None,
            deferred: None,
        }));

        if host.document().ready_state() == ReadyState::Loading {
            let weak = Rc::downgrade(&state);
            let id = host.events().once(EventKind::DomContentLoaded, move |_| {
                if let Some(state) = weak.upgrade() {
                    initialize(&state);
                }
            });
            state.borrow_mut().deferred = Some(id);
            debug!("Document still loading, startup deferred");
        } else {
            initialize(&state);
        }

        Self { state }
    }

    pub fn is_started(&self) -> bool {
        self.state.borrow().report.is_some()
    }

    /// Startup outcome; None while startup is deferred
    pub fn report(&self) -> Option<StartupReport> {
        self.state.borrow().report.clone()
    }

    /// Names of the constructed controllers, in construction order
    pub fn controllers(&self) -> Vec<&'static str> {
        self.state
            .borrow()
            .controllers
            .iter()
            .map(|c| c.name())
            .collect()
    }

    pub fn config(&self) -> AppConfig {
        self.state.borrow().config.clone()
    }

    /// Tear down every controller in reverse construction order
    pub fn teardown(&self) {
        let (host, deferred, mut controllers) = {
            let mut state = self.state.borrow_mut();
            state.pending = None;
            (
                state.host.clone(),
                state.deferred.take(),
                std::mem::take(&mut state.controllers),
            )
        };

        if let Some(id) = deferred {
            host.events().off(id);
        }
        for controller in controllers.iter_mut().rev() {
            controller.teardown();
        }
        debug!("Torn down {} controllers", controllers.len());
    }
}

fn initialize(state: &Rc<RefCell<AppState>>) {
    let (host, config, entries) = {
        let mut state = state.borrow_mut();
        state.deferred = None;
        (state.host.clone(), state.config.clone(), state.pending.take())
    };
    let Some(entries) = entries else {
        return;
    };

    let policy = config.general.failure_policy;
    let mut report = StartupReport::default();
    let mut controllers: Vec<Box<dyn Controller>> = Vec::with_capacity(entries.len());

    let names: Vec<&'static str> = entries.iter().map(|e| e.name).collect();
    for (idx, entry) in entries.into_iter().enumerate() {
        match (entry.build)(&host, &config) {
            Ok(controller) => {
                if controller.is_active() {
                    report.started.push(entry.name);
                } else {
                    report.inactive.push(entry.name);
                }
                controllers.push(controller);
            }
            Err(e) => {
                let err = Error::Controller {
                    name: entry.name,
                    message: e.to_string(),
                };
                error!("{}", err);
                report.failed.push(StartupFailure {
                    controller: entry.name,
                    error: e.to_string(),
                });
                if policy == FailurePolicy::FailFast {
                    report.skipped.extend_from_slice(&names[idx + 1..]);
                    break;
                }
            }
        }
    }

    if report.is_clean() {
        info!(
            "Portfolio application initialized successfully: {} active, {} inactive",
            report.started.len(),
            report.inactive.len()
        );
    } else {
        error!(
            "Failed to initialize application: {} controller(s) failed, {} skipped",
            report.failed.len(),
            report.skipped.len()
        );
    }

    let mut state = state.borrow_mut();
    state.controllers = controllers;
    state.report = Some(report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::Subscriptions;
    use folio_core::host::{ElementSpec, HeadlessDocument, HeadlessPage};
    use folio_core::Document;

    struct Listening {
        name: &'static str,
        subscriptions: Subscriptions,
    }

    impl Controller for Listening {
        fn name(&self) -> &'static str {
            self.name
        }

        fn teardown(&mut self) {
            self.subscriptions.release();
        }
    }

    fn listening(name: &'static str, kind: EventKind) -> ControllerEntry {
        ControllerEntry::new(name, move |host, _| {
            let mut subscriptions = Subscriptions::new(host);
            subscriptions.on(kind, |_| {});
            Ok(Box::new(Listening {
                name,
                subscriptions,
            }))
        })
    }

    fn broken(name: &'static str) -> ControllerEntry {
        ControllerEntry::new(name, |_, _| {
            Err(Error::Other("required markup is malformed".to_string()))
        })
    }

    fn blank_page() -> HeadlessPage {
        HeadlessPage::new(HeadlessDocument::new(1000.0, 600.0), Duration::from_millis(16))
    }

    fn config_with(policy: FailurePolicy) -> AppConfig {
        let mut config = AppConfig::default();
        config.general.failure_policy = policy;
        config
    }

    #[test]
    fn test_fail_fast_stops_after_first_failure() {
        let page = blank_page();
        let events = page.host().events();
        let app = App::start_with(
            page.host(),
            config_with(FailurePolicy::FailFast),
            vec![
                listening("first", EventKind::Scroll),
                broken("second"),
                listening("third", EventKind::Resize),
            ],
        );

        assert_eq!(events.listener_count(EventKind::Scroll), 1);
        assert_eq!(events.listener_count(EventKind::Resize), 0);

        let report = app.report().unwrap();
        assert_eq!(report.started, vec!["first"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].controller, "second");
        assert_eq!(report.skipped, vec!["third"]);
        assert_eq!(app.controllers(), vec!["first"]);
    }

    #[test]
    fn test_isolate_keeps_later_controllers() {
        let page = blank_page();
        let events = page.host().events();
        let app = App::start_with(
            page.host(),
            config_with(FailurePolicy::Isolate),
            vec![
                listening("first", EventKind::Scroll),
                broken("second"),
                listening("third", EventKind::Resize),
            ],
        );

        assert_eq!(events.listener_count(EventKind::Scroll), 1);
        assert_eq!(events.listener_count(EventKind::Resize), 1);

        let report = app.report().unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.started, vec!["first", "third"]);
        assert!(report.failed[0].error.contains("malformed"));
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_startup_deferred_until_content_loaded() {
        let doc = HeadlessDocument::new(1000.0, 600.0);
        doc.set_ready_state(ReadyState::Loading);
        let page = HeadlessPage::new(doc, Duration::from_millis(16));

        let app = App::start_with(
            page.host(),
            AppConfig::default(),
            vec![listening("only", EventKind::Click)],
        );
        assert!(!app.is_started());
        assert_eq!(page.host().events().listener_count(EventKind::Click), 0);

        page.content_loaded();
        assert!(app.is_started());
        assert_eq!(page.host().events().listener_count(EventKind::Click), 1);
        assert_eq!(
            page.host().events().listener_count(EventKind::DomContentLoaded),
            0
        );
    }

    #[test]
    fn test_teardown_before_content_loaded() {
        let doc = HeadlessDocument::new(1000.0, 600.0);
        doc.set_ready_state(ReadyState::Loading);
        let page = HeadlessPage::new(doc, Duration::from_millis(16));

        let app = App::start_with(
            page.host(),
            AppConfig::default(),
            vec![listening("only", EventKind::Click)],
        );
        app.teardown();
        page.content_loaded();
        assert!(!app.is_started());
        assert_eq!(page.host().events().total_listeners(), 0);
    }

    fn portfolio_page() -> HeadlessPage {
        let doc = HeadlessDocument::new(1000.0, 600.0);
        for spec in [
            ElementSpec::new("nav").id("nav").class("nav").at(0.0, 70.0),
            ElementSpec::new("a").class("nav-link").attr("href", "#about").parent("nav"),
            ElementSpec::new("div").class("cursor-glow"),
            ElementSpec::new("section").id("about").class("section").at(0.0, 900.0),
            ElementSpec::new("span").class("typing-text").parent("about"),
            ElementSpec::new("span").id("current-age").parent("about"),
            ElementSpec::new("span")
                .class("stat-number")
                .attr("data-target", "50")
                .parent("about")
                .at(300.0, 40.0),
            ElementSpec::new("div").class("project-card").at(1200.0, 300.0),
            ElementSpec::new("img")
                .attr("loading", "lazy")
                .attr("data-src", "a.png")
                .at(1600.0, 200.0),
            ElementSpec::new("button").class("scroll-to-top"),
            ElementSpec::new("footer").at(1800.0, 400.0),
        ] {
            doc.add_element(&spec).unwrap();
        }
        HeadlessPage::new(doc, Duration::from_millis(16))
    }

    #[test]
    fn test_default_controllers_start_in_order() {
        let page = portfolio_page();
        let app = App::start(page.host(), AppConfig::default());

        assert_eq!(
            app.controllers(),
            vec![
                "errors",
                "navigation",
                "content",
                "animation",
                "typing",
                "cursor",
                "scroll_top"
            ]
        );
        let report = app.report().unwrap();
        assert!(report.is_clean());
        assert!(report.inactive.is_empty());
    }

    #[test]
    fn test_development_adds_performance_monitor() {
        let page = blank_page();
        let mut config = AppConfig::default();
        config.general.environment = Environment::Development;
        let app = App::start(page.host(), config);

        assert_eq!(app.controllers().last(), Some(&"performance"));
        let report = app.report().unwrap();
        assert!(report.inactive.contains(&"navigation"));
        assert!(report.started.contains(&"performance"));
    }

    #[test]
    fn test_bad_config_is_isolated() {
        let page = portfolio_page();
        let mut config = AppConfig::default();
        config.reveal.root_margin = "sideways".to_string();
        let app = App::start(page.host(), config);

        let report = app.report().unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].controller, "animation");
        assert!(app.controllers().contains(&"scroll_top"));
    }

    #[test]
    fn test_failed_animation_leaves_no_gate_behind() {
        let page = portfolio_page();
        let mut config = AppConfig::default();
        config.reveal.hover_selector = ".a > .b".to_string();
        let app = App::start(page.host(), config);

        let report = app.report().unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].controller, "animation");

        app.teardown();
        let host = page.host();
        assert_eq!(host.intersections().observer_count(), 0);
        assert_eq!(host.events().total_listeners(), 0);

        let card = page.document().select_one(".project-card").unwrap().unwrap();
        page.scroll_to(1000.0);
        assert!(!page.document().has_class(card, "animate-in"));
    }

    #[test]
    fn test_teardown_releases_everything() {
        let page = portfolio_page();
        let app = App::start(page.host(), AppConfig::default());

        page.settle();
        page.pointer_move(10.0, 10.0);
        page.pointer_move(400.0, 300.0);
        page.resize(900.0, 600.0);
        page.advance(Duration::from_millis(120));
        assert!(page.host().scheduler().has_pending_work());

        app.teardown();
        assert!(app.controllers().is_empty());
        let host = page.host();
        assert_eq!(host.events().total_listeners(), 0);
        assert_eq!(host.intersections().observer_count(), 0);
        assert!(!host.scheduler().has_pending_work());

        page.document().take_mutations();
        page.advance(Duration::from_secs(5));
        page.scroll_to(1000.0);
        page.document().take_mutations();
        page.advance(Duration::from_secs(1));
        assert!(page.document().take_mutations().is_empty());
    }

    #[test]
    fn test_independent_instances() {
        let first = portfolio_page();
        let second = portfolio_page();
        let a = App::start(first.host(), AppConfig::default());
        let _b = App::start(second.host(), AppConfig::default());

        a.teardown();
        assert_eq!(first.host().events().total_listeners(), 0);
        assert!(second.host().events().total_listeners() > 0);
    }
}
