use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{info, warn};

use folio_core::host::driver::{self, FrameControl};
use folio_core::host::{ElementId, HeadlessPage, Mutation, PerformanceEntry, ReadyState};
use folio_core::{AppConfig, Document};
use folio_fx::App;

use crate::OutputFormat;

/// Simulated time when neither the script nor the command line sets one
const DEFAULT_RUN_MS: u64 = 3000;

pub struct RunOptions {
    pub page: PathBuf,
    pub script: Option<PathBuf>,
    pub until: Option<u64>,
    pub realtime: bool,
    pub format: OutputFormat,
    pub state: bool,
}

/// Scripted session: timed host events
#[derive(Debug, Default, Deserialize)]
pub struct Script {
    /// Stop after this many milliseconds
    #[serde(default)]
    pub until_ms: Option<u64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// Element targets are selectors, e.g. "#about" or ".scroll-to-top"
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ContentLoaded,
    Load {
        #[serde(default)]
        load_time_ms: u64,
    },
    Scroll {
        y: f64,
    },
    Resize {
        width: f64,
        height: f64,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerEnter {
        target: String,
    },
    PointerLeave {
        target: String,
    },
    Click {
        target: String,
    },
    KeyPress {
        key: String,
    },
    Error {
        message: String,
    },
    Reject {
        reason: String,
    },
    Lcp {
        start_time: f64,
    },
    FirstInput {
        start_time: f64,
        processing_start: f64,
    },
    LayoutShift {
        value: f64,
        #[serde(default)]
        had_recent_input: bool,
    },
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let mut script: Script = toml::from_str(&content)
            .with_context(|| format!("Failed to parse script {}", path.display()))?;
        script.steps.sort_by_key(|s| s.at_ms);
        Ok(script)
    }
}

fn resolve(page: &HeadlessPage, target: &str) -> Result<ElementId> {
    page.document()
        .select_one(target)?
        .ok_or_else(|| anyhow!("No element matches '{}'", target))
}

fn apply(page: &HeadlessPage, action: &Action) -> Result<()> {
    match action {
        Action::ContentLoaded => page.content_loaded(),
        Action::Load { load_time_ms } => page.load(Duration::from_millis(*load_time_ms)),
        Action::Scroll { y } => page.scroll_to(*y),
        Action::Resize { width, height } => page.resize(*width, *height),
        Action::PointerMove { x, y } => page.pointer_move(*x, *y),
        Action::PointerEnter { target } => page.pointer_enter(resolve(page, target)?),
        Action::PointerLeave { target } => page.pointer_leave(resolve(page, target)?),
        Action::Click { target } => page.click(resolve(page, target)?),
        Action::KeyPress { key } => page.key_press(key),
        Action::Error { message } => page.raise_error(message),
        Action::Reject { reason } => page.reject(reason),
        Action::Lcp { start_time } => {
            page.report_performance(PerformanceEntry::LargestContentfulPaint {
                start_time: *start_time,
            })
        }
        Action::FirstInput {
            start_time,
            processing_start,
        } => page.report_performance(PerformanceEntry::FirstInput {
            start_time: *start_time,
            processing_start: *processing_start,
        }),
        Action::LayoutShift {
            value,
            had_recent_input,
        } => page.report_performance(PerformanceEntry::LayoutShift {
            value: *value,
            had_recent_input: *had_recent_input,
        }),
    }
    Ok(())
}

/// Prints drained mutations as they happen
struct Printer<'a> {
    page: &'a HeadlessPage,
    format: OutputFormat,
    quiet: bool,
}

impl Printer<'_> {
    fn label(&self, element: ElementId) -> String {
        match self.page.document().attribute(element, "id") {
            Some(id) => format!("#{}", id),
            None => format!("@{}", element.0),
        }
    }

    fn describe(&self, mutation: &Mutation) -> String {
        match mutation {
            Mutation::ClassAdded { element, class } => {
                format!("{} +.{}", self.label(*element), class)
            }
            Mutation::ClassRemoved { element, class } => {
                format!("{} -.{}", self.label(*element), class)
            }
            Mutation::Style {
                element,
                property,
                value,
            } => format!("{} {}: {}", self.label(*element), property, value),
            Mutation::Text { element, text } => format!("{} text {:?}", self.label(*element), text),
            Mutation::Attribute {
                element,
                name,
                value,
            } => format!("{} [{}={:?}]", self.label(*element), name, value),
            Mutation::ScrollTo { y, behavior } => format!("scroll to {} ({:?})", y, behavior),
        }
    }

    fn flush(&self) -> Result<()> {
        let mutations = self.page.document().take_mutations();
        if self.quiet {
            return Ok(());
        }
        let at = self.page.now().as_millis();
        for mutation in &mutations {
            match self.format {
                OutputFormat::Text => println!("[{:>6}ms] {}", at, self.describe(mutation)),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "at_ms": at, "mutation": mutation })
                ),
            }
        }
        Ok(())
    }
}

pub async fn run(config: AppConfig, options: RunOptions) -> Result<()> {
    config.validate()?;
    let page = super::load_page(&options.page, &config)?;
    let script = match &options.script {
        Some(path) => Script::load(path)?,
        None => Script::default(),
    };
    let until = Duration::from_millis(
        options
            .until
            .or(script.until_ms)
            .unwrap_or(DEFAULT_RUN_MS),
    );
    let fps = config.animation.fps;

    let printer = Printer {
        page: &page,
        format: options.format,
        quiet: options.state,
    };

    let app = start(&page, config, &script);
    printer.flush()?;

    if let Some(report) = app.report() {
        for failure in &report.failed {
            warn!("{} failed to start: {}", failure.controller, failure.error);
        }
    }

    if options.realtime {
        run_realtime(&page, &script, until, fps, &printer).await?;
    } else {
        replay(&page, &script, until, || printer.flush())?;
    }

    app.teardown();

    if options.state {
        let snapshot = page.document().snapshot();
        match options.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            OutputFormat::Text => print_state(&snapshot),
        }
    }
    Ok(())
}

/// Start the effects, issuing `DOMContentLoaded` unless the script does
fn start(page: &HeadlessPage, config: AppConfig, script: &Script) -> App {
    let app = App::start(page.host(), config);
    let scripted_load = script
        .steps
        .iter()
        .any(|s| matches!(s.action, Action::ContentLoaded));
    if page.document().ready_state() == ReadyState::Loading && !scripted_load {
        page.content_loaded();
    }
    page.settle();
    app
}

/// Apply the steps due by `until` in order, then run on to `until`.
/// `observe` runs after every advance and every step.
fn replay(
    page: &HeadlessPage,
    script: &Script,
    until: Duration,
    mut observe: impl FnMut() -> Result<()>,
) -> Result<()> {
    for step in &script.steps {
        let at = Duration::from_millis(step.at_ms);
        if at > until {
            break;
        }
        page.advance_to(at);
        observe()?;
        apply(page, &step.action)?;
        observe()?;
    }
    page.advance_to(until);
    observe()
}

async fn run_realtime(
    page: &HeadlessPage,
    script: &Script,
    until: Duration,
    fps: u32,
    printer: &Printer<'_>,
) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let next_step = Cell::new(0usize);
    let mut failure: Option<anyhow::Error> = None;
    info!("Running in real time for {}ms", until.as_millis());

    driver::run_realtime(
        driver::frame_interval(fps),
        |elapsed| {
            let now = elapsed.min(until);
            while let Some(step) = script.steps.get(next_step.get()) {
                let at = Duration::from_millis(step.at_ms);
                if at > now {
                    break;
                }
                page.advance_to(at);
                let result = printer.flush().and_then(|_| apply(page, &step.action));
                next_step.set(next_step.get() + 1);
                if let Err(e) = result {
                    failure = Some(e);
                    return FrameControl::Stop;
                }
            }
            page.advance_to(now);
            if let Err(e) = printer.flush() {
                failure = Some(e);
                return FrameControl::Stop;
            }
            if now >= until {
                FrameControl::Stop
            } else {
                FrameControl::Continue
            }
        },
        shutdown_rx,
    )
    .await;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_state(snapshot: &serde_json::Value) {
    println!("scroll_y: {}", snapshot["scroll_y"]);
    let Some(elements) = snapshot["elements"].as_array() else {
        return;
    };
    for element in elements {
        let tag = element["tag"].as_str().unwrap_or("?");
        let id = element["id"]
            .as_str()
            .map(|id| format!("#{}", id))
            .unwrap_or_default();
        let classes: Vec<&str> = element["classes"]
            .as_array()
            .map(|c| c.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        let class = if classes.is_empty() {
            String::new()
        } else {
            format!(".{}", classes.join("."))
        };
        println!("<{}{}{}>", tag, id, class);

        if let Some(text) = element["text"].as_str().filter(|t| !t.is_empty()) {
            println!("    text: {:?}", text);
        }
        if let Some(styles) = element["styles"].as_object() {
            for (property, value) in styles {
                println!("    {}: {}", property, value.as_str().unwrap_or_default());
            }
        }
    }
}
