//! Config command implementation.
//!
//! Store and inspect the IQM API token in the iqmtk config file.

use anyhow::{Context, Result};
use console::style;

use iqmtk_adapter_iqm::config::default_config_path;
use iqmtk_adapter_iqm::{IqmConfig, set_iqm_config};

/// Store an API token.
pub fn execute_set(api_token: Option<&str>) -> Result<()> {
    let path = default_config_path()?;
    set_iqm_config(api_token).context("Failed to update config")?;

    println!(
        "{} Updated IQM config in {}",
        style("✓").green().bold(),
        style(path.display()).green()
    );
    Ok(())
}

/// Show the stored config with the token masked.
pub fn execute_show() -> Result<()> {
    let path = default_config_path()?;
    let config = IqmConfig::from_file(&path).context("Failed to read config")?;

    println!("Config file: {}", style(path.display()).green());
    match config.api_token.as_deref() {
        Some(token) => println!("  api_token: {}", style(mask(token)).yellow()),
        None => println!("  api_token: {}", style("not set").dim()),
    }
    Ok(())
}

fn mask(token: &str) -> String {
    let shown: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{shown}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("abcdefghijkl"), "abcd****");
    }
}
