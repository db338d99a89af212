use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::render::values::DataValues;

/// Default config file name, discovered by walking up from the working directory
pub const CONFIG_FILE_NAME: &str = "ytt-render.toml";

/// Complete ytt-render configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// ytt executable (name on PATH or path)
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Shared output directory for specs using `into`
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Directory holding up-to-date records (relative to the project directory)
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Data values applied to every spec
    #[serde(default)]
    pub data_values: DataValues,

    /// Render specs by name
    #[serde(default)]
    pub specs: BTreeMap<String, SpecConfig>,
}

/// One render spec: a set of input templates rendered to one output file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SpecConfig {
    /// Input templates, in ytt merge order. Glob patterns are expanded.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Explicit output file
    #[serde(default)]
    pub output_file: Option<String>,

    /// Output file name relative to `output_dir`
    #[serde(default)]
    pub into: Option<String>,

    /// Hash injection mode ("sha256")
    #[serde(default)]
    pub hash: Option<String>,

    /// Spec-specific data values, layered on top of the defaults
    #[serde(default)]
    pub data_values: DataValues,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            output_dir: None,
            state_dir: default_state_dir(),
            data_values: DataValues::new(),
            specs: BTreeMap::new(),
        }
    }
}

fn default_executable() -> String {
    "ytt".to_string()
}

fn default_state_dir() -> String {
    ".ytt-render".to_string()
}

impl RenderConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RenderConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Generate example configuration as TOML string
    pub fn example() -> String {
        r#"# ytt-render configuration

# ytt executable (name on PATH or absolute path)
executable = "ytt"

# Shared output directory for specs that use `into`
output_dir = "build/distributions"

# Data values passed to every spec
[data_values]
version = "1.0.0"

[specs.api]
inputs = ["src/main/resources/cloudformation/api.yaml", "src/main/resources/cloudformation/openapi-*.yaml"]
into = "api.yaml"

[specs.api.data_values]
stage = "prod"
"#
        .to_string()
    }

    /// Validate configuration
    ///
    /// Output resolution is checked when jobs are resolved, since it depends on
    /// the project directory.
    pub fn validate(&self) -> Result<()> {
        if self.executable.trim().is_empty() {
            anyhow::bail!("executable must not be empty");
        }

        if self.state_dir.trim().is_empty() {
            anyhow::bail!("state_dir must not be empty");
        }

        for (name, spec) in &self.specs {
            if !is_valid_spec_name(name) {
                anyhow::bail!(
                    "Invalid spec name '{}': use only letters, digits, '_', '-' and '.'",
                    name
                );
            }

            if spec.inputs.is_empty() {
                anyhow::bail!("spec '{}' has no inputs", name);
            }

            if let Some(hash) = &spec.hash {
                if hash != "sha256" {
                    anyhow::bail!(
                        "spec '{}': hash must be \"sha256\" when set (got \"{}\")",
                        name,
                        hash
                    );
                }
            }
        }

        Ok(())
    }
}

/// Spec names become state file names, so keep them path-safe
pub fn is_valid_spec_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
