use std::path::Path;

use anyhow::{bail, Result};

use folio_core::host::ReadyState;
use folio_core::{AppConfig, Document};
use folio_fx::{App, StartupReport};

pub fn run(config: AppConfig, page_path: &Path) -> Result<()> {
    let report = check_page(config, page_path)?;

    println!("Page: {}", page_path.display());
    println!("  Active:   {}", list(&report.started));
    println!("  Inactive: {}", list(&report.inactive));
    if !report.skipped.is_empty() {
        println!("  Skipped:  {}", list(&report.skipped));
    }
    for failure in &report.failed {
        println!("  FAILED {}: {}", failure.controller, failure.error);
    }

    if !report.is_clean() {
        bail!("{} controller(s) failed to start", report.failed.len());
    }
    println!("\nOK");
    Ok(())
}

/// Start every controller on the page, tear them down again and report
fn check_page(config: AppConfig, page_path: &Path) -> Result<StartupReport> {
    config.validate()?;
    let page = super::load_page(page_path, &config)?;

    let app = App::start(page.host(), config);
    if page.document().ready_state() == ReadyState::Loading {
        page.content_loaded();
    }
    let report = app.report();
    app.teardown();

    match report {
        Some(report) => Ok(report),
        None => bail!("Application did not start"),
    }
}

fn list(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn portfolio() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/portfolio.toml")
    }

    #[test]
    fn test_demo_page_starts_cleanly() {
        let report = check_page(AppConfig::default(), &portfolio()).unwrap();
        assert!(report.is_clean());
        assert!(report.started.contains(&"typing"));
        assert!(report.inactive.is_empty());
        assert!(run(AppConfig::default(), &portfolio()).is_ok());
    }

    #[test]
    fn test_failed_controller_fails_the_check() {
        let mut config = AppConfig::default();
        config.reveal.hover_selector = ".a > .b".to_string();

        let report = check_page(config.clone(), &portfolio()).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].controller, "animation");
        assert!(report.started.contains(&"scroll_top"));

        assert!(run(config, &portfolio()).is_err());
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let missing = Path::new("/nonexistent/page.toml");
        assert!(check_page(AppConfig::default(), missing).is_err());
    }
}
