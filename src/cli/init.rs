//! Init command - write an example hdva.toml

use anyhow::{Context, Result};
use console::style;
use hdva::config::{HdvaConfig, EXAMPLE_CONFIG, LOCAL_CONFIG_FILE};
use std::path::Path;

/// Run the init command
pub fn run(dir: &Path, user: bool) -> Result<()> {
    if user {
        let path = HdvaConfig::init_user_config()?;
        println!("{} User config at {}", style("✓").green(), style(path.display()).cyan());
        return Ok(());
    }

    let config_path = dir.join(LOCAL_CONFIG_FILE);
    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    Ok(())
}
