use std::path::Path;

use anyhow::Result;

use folio_core::AppConfig;

pub fn run(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(AppConfig::config_path);
    if path.exists() {
        println!("# Loaded from {}", path.display());
    } else {
        println!("# {} not found, showing defaults", path.display());
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
