//! Initialize the configuration directory: create ~/.footman, a default
//! config, and the bundled script templates.
//!
//! The bundled `assets/` directory is extracted to `~/.footman/templates/`.

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};

use crate::config;

static BUNDLED_TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Ensure the configuration directory has been initialized (config file and
/// templates directory exist).
pub fn require_initialized(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `footman init` first (config file not found: {})",
            config_path.display()
        );
    }
    let templates = config::templates_dir(config_path);
    if !templates.exists() {
        anyhow::bail!(
            "configuration not initialized; run `footman init` first (templates directory not found: {})",
            templates.display()
        );
    }
    Ok(())
}

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of the config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Extracts the bundled script guide and template into `templates` if the
///   directory does not exist yet.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let templates = config::templates_dir(config_path);
    if !templates.exists() {
        std::fs::create_dir_all(&templates)
            .with_context(|| format!("creating templates directory {}", templates.display()))?;
        if let Err(e) = BUNDLED_TEMPLATES.extract(&templates) {
            anyhow::bail!("extracting bundled templates to {}: {}", templates.display(), e);
        }
        log::info!("extracted bundled templates to {}", templates.display());
    } else {
        log::debug!(
            "templates directory already exists at {}, skipping",
            templates.display()
        );
    }

    Ok(config_dir.to_path_buf())
}
