/// Configuration merger: CLI args > Env vars > Config file > Defaults
///
/// Env vars are handled by clap, so merging only has to layer the parsed
/// arguments over the loaded file.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::CommonConfigArgs;
use crate::config::RenderConfig;
use crate::config_discovery::{load_config, LoadedConfig};
use crate::render::values::{parse_assignment, DataValues};
use crate::render::{SpecRegistry, StateStore};

/// Effective configuration of a project
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub config: RenderConfig,
    pub config_path: PathBuf,
    pub project_dir: PathBuf,
    /// `--data-value` overrides, applied on top of every spec
    pub overrides: DataValues,
}

impl MergedConfig {
    /// Merge CLI arguments into a loaded configuration
    pub fn merge(args: &CommonConfigArgs, loaded: LoadedConfig) -> Result<Self> {
        let mut config = loaded.config;

        if let Some(executable) = &args.executable {
            config.executable = executable.clone();
        }

        if let Some(output_dir) = &args.output_dir {
            config.output_dir = Some(output_dir.clone());
        }

        let overrides = parse_overrides(&args.data_values)?;

        Ok(Self {
            config,
            config_path: loaded.path,
            project_dir: loaded.project_dir,
            overrides,
        })
    }

    /// Load, merge and validate the configuration for a command
    pub fn load(args: &CommonConfigArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::load_from(args, &cwd)
    }

    pub fn load_from(args: &CommonConfigArgs, start_dir: &Path) -> Result<Self> {
        let loaded = load_config(args.config.as_deref(), start_dir)?;
        let merged = Self::merge(args, loaded)?;
        merged
            .config
            .validate()
            .with_context(|| format!("Invalid config: {}", merged.config_path.display()))?;
        Ok(merged)
    }

    pub fn registry(&self) -> SpecRegistry {
        SpecRegistry::new(&self.config, &self.project_dir)
            .with_overrides(self.overrides.clone())
    }

    pub fn state_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.state_dir)
    }

    pub fn state_store(&self) -> Result<StateStore> {
        StateStore::new(&self.state_dir())
    }
}

fn parse_overrides(raw: &[String]) -> Result<DataValues> {
    let mut overrides = DataValues::new();
    for assignment in raw {
        let (key, value) = parse_assignment(assignment).with_context(|| {
            format!("Invalid --data-value '{}': expected key=value", assignment)
        })?;
        overrides.insert(key, Some(value));
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(toml: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ytt-render.toml"), toml).unwrap();
        temp
    }

    #[test]
    fn test_cli_overrides_file() {
        let temp = project(
            r#"
executable = "ytt"
output_dir = "dist"

[data_values]
version = "1.0.0"

[specs.api]
inputs = ["a.yaml"]
into = "api.yaml"
"#,
        );

        let args = CommonConfigArgs {
            executable: Some("/opt/ytt".to_string()),
            output_dir: Some("out".to_string()),
            data_values: vec!["version=9.9.9".to_string()],
            ..Default::default()
        };
        let merged = MergedConfig::load_from(&args, temp.path()).unwrap();

        assert_eq!(merged.config.executable, "/opt/ytt");
        let job = merged.registry().resolve("api").unwrap();
        assert_eq!(job.executable, "/opt/ytt");
        assert_eq!(job.output, temp.path().join("out/api.yaml"));
        assert_eq!(job.normalized, vec!["version=9.9.9"]);
        assert_eq!(merged.state_dir(), temp.path().join(".ytt-render"));
    }

    #[test]
    fn test_file_values_without_overrides() {
        let temp = project(
            r#"
[specs.api]
inputs = ["a.yaml"]
output_file = "api.yaml"
"#,
        );

        let args = CommonConfigArgs::default();
        let merged = MergedConfig::load_from(&args, temp.path()).unwrap();

        assert_eq!(merged.config.executable, "ytt");
        assert!(merged.overrides.is_empty());
    }

    #[test]
    fn test_invalid_override() {
        let temp = project("");
        let args = CommonConfigArgs {
            data_values: vec!["noequals".to_string()],
            ..Default::default()
        };
        let err = MergedConfig::load_from(&args, temp.path()).unwrap_err();
        assert!(err.to_string().contains("noequals"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp = project("[specs.\"bad name\"]\ninputs = [\"a.yaml\"]\n");
        let args = CommonConfigArgs::default();
        assert!(MergedConfig::load_from(&args, temp.path()).is_err());
    }
}
