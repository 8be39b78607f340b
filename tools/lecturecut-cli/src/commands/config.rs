//! Show or initialize the configuration.

use std::path::PathBuf;

use lecturecut_common::config::{config_file_path, AppConfig};

pub fn run(config: AppConfig, path: Option<PathBuf>, init: bool) -> anyhow::Result<()> {
    if init {
        let path = path.unwrap_or_else(config_file_path);
        if path.exists() {
            anyhow::bail!(
                "Config already exists at {}; remove it first to reset",
                path.display()
            );
        }
        AppConfig::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
