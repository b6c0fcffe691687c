pub mod check;
pub mod config;
pub mod run;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use folio_core::host::{driver, HeadlessPage, PageSpec};
use folio_core::AppConfig;

/// Load a page description and build a headless page for it
pub fn load_page(path: &Path, config: &AppConfig) -> Result<HeadlessPage> {
    let spec = PageSpec::load(path)
        .with_context(|| format!("Failed to load page description {}", path.display()))?;
    let interval: Duration = driver::frame_interval(config.animation.fps);
    Ok(HeadlessPage::from_spec(&spec, interval)?)
}
