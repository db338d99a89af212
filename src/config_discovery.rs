use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{RenderConfig, CONFIG_FILE_NAME};

/// A loaded configuration and the directory its relative paths resolve against
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RenderConfig,
    pub path: PathBuf,
    pub project_dir: PathBuf,
}

/// Discovers the configuration by traversing up the directory tree
pub fn discover_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            return Ok(Some(config_path));
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    // Fallback to global config
    if let Some(home) = dirs::home_dir() {
        let global_config = home.join(".config/ytt-render/config.toml");
        if global_config.is_file() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Loads configuration with auto-discovery support
///
/// An explicit path wins; otherwise the tree above `start_dir` is searched.
/// The project directory is the config file's directory, except for the
/// global config, whose relative paths resolve against `start_dir`.
pub fn load_config(explicit_path: Option<&str>, start_dir: &Path) -> Result<LoadedConfig> {
    let (path, is_global) = match explicit_path {
        Some(path) => (start_dir.join(path), false),
        None => {
            let path = discover_config(start_dir)?.with_context(|| {
                format!(
                    "No {} found in {} or any parent directory (run `ytt-render init` to create one)",
                    CONFIG_FILE_NAME,
                    start_dir.display()
                )
            })?;
            let is_global = !path.ends_with(CONFIG_FILE_NAME);
            (path, is_global)
        }
    };

    let config = RenderConfig::from_file(&path)?;

    let project_dir = if is_global {
        start_dir.to_path_buf()
    } else {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| start_dir.to_path_buf())
    };

    Ok(LoadedConfig {
        config,
        path,
        project_dir,
    })
}
