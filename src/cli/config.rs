use crate::core::AppConfig;
use anyhow::{Context, Result};

/// Prints where the config is read from and the effective configuration after merging.
pub fn run(config: &AppConfig, config_path: Option<&str>) -> Result<()> {
    let path = match config_path {
        Some(p) => std::path::PathBuf::from(p),
        None => AppConfig::default_config_path()?,
    };
    let status = if path.exists() {
        "found"
    } else {
        "not found, using built-in defaults"
    };

    println!("# Config file: {} ({})", path.display(), status);
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    println!("{yaml}");
    Ok(())
}
