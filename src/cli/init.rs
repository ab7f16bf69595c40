//! Init command - write an example cardshark.toml

use crate::config::{CONFIG_FILENAME, EXAMPLE_CONFIG};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }

    let config_path = path.join(CONFIG_FILENAME);
    if config_path.exists() && !force {
        println!(
            "{} Already initialized at {} (use --force to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to create {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    println!("\nNext steps:");
    println!(
        "  {} Fetch abstracts",
        style("cardshark download --range 2017/01/01:2017/01/31").cyan()
    );
    println!(
        "  {} Build a model",
        style("cardshark build --positive pos.json --background bg.json").cyan()
    );
    println!(
        "  {} Score abstracts",
        style("cardshark score abstracts.json").cyan()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_parseable_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        run(dir.path(), false).expect("init");
        let written = std::fs::read_to_string(dir.path().join(CONFIG_FILENAME)).expect("read");
        assert_eq!(written, EXAMPLE_CONFIG);
        let config = crate::config::load_project_config(dir.path());
        assert_eq!(config.defaults.workers, Some(4));
    }

    #[test]
    fn test_init_keeps_existing_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "# mine\n").expect("write");
        run(dir.path(), false).expect("init");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "# mine\n");
        run(dir.path(), true).expect("init --force");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), EXAMPLE_CONFIG);
    }
}
