/// Spec registry and job resolution
///
/// Resolves the named specs of a configuration into immutable render jobs:
/// output target, expanded inputs and merged data values.
use glob::glob;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::command::{build, HashMode, RenderCommand};
use super::error::RenderError;
use super::values::{merge, normalize, DataValues};
use crate::config::{is_valid_spec_name, RenderConfig, SpecConfig};

/// A resolved, ready-to-run render job
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub name: String,
    pub executable: String,
    /// Absolute input paths, in ytt merge order
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub hash: Option<HashMode>,
    /// Defaults overlaid by spec values (and command line overrides)
    pub data_values: DataValues,
    /// Sorted `key=value` tokens of `data_values`
    pub normalized: Vec<String>,
}

impl RenderJob {
    /// Assemble the ytt invocation; injects a fresh nonce in sha256 mode
    pub fn command(&self) -> RenderCommand {
        build(&self.executable, &self.normalized, &self.inputs, self.hash)
    }
}

/// Named render specs plus the settings shared between them
#[derive(Debug, Clone)]
pub struct SpecRegistry {
    project_dir: PathBuf,
    executable: String,
    output_dir: Option<PathBuf>,
    defaults: DataValues,
    overrides: DataValues,
    specs: BTreeMap<String, SpecConfig>,
}

impl SpecRegistry {
    /// Snapshot `config`; relative paths resolve against `project_dir`
    pub fn new(config: &RenderConfig, project_dir: &Path) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            executable: config.executable.clone(),
            output_dir: config
                .output_dir
                .as_ref()
                .map(|dir| project_dir.join(dir)),
            defaults: config.data_values.clone(),
            overrides: DataValues::new(),
            specs: config.specs.clone(),
        }
    }

    /// Data values that win over both defaults and spec values
    pub fn with_overrides(mut self, overrides: DataValues) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Resolve a single spec by name
    pub fn resolve(&self, name: &str) -> Result<RenderJob, RenderError> {
        let spec = self
            .specs
            .get(name)
            .ok_or_else(|| RenderError::config(format!("Unknown spec '{}'", name)))?;

        if !is_valid_spec_name(name) {
            return Err(RenderError::config(format!(
                "Invalid spec name '{}': use only letters, digits, '_', '-' and '.'",
                name
            )));
        }

        let output = resolve_output(name, spec, self.output_dir.as_deref(), &self.project_dir)?;
        self.check_output_owner(name, &output)?;

        let hash = spec
            .hash
            .as_deref()
            .map(str::parse::<HashMode>)
            .transpose()?;

        let inputs = expand_inputs(&spec.inputs, &self.project_dir)?;

        let data_values = merge(&merge(&self.defaults, &spec.data_values), &self.overrides);
        let normalized = normalize(&data_values);

        debug!(
            spec = name,
            inputs = inputs.len(),
            output = %output.display(),
            "resolved render job"
        );

        Ok(RenderJob {
            name: name.to_string(),
            executable: self.executable.clone(),
            inputs,
            output,
            hash,
            data_values,
            normalized,
        })
    }

    /// Resolve every spec, in name order
    pub fn resolve_all(&self) -> Result<Vec<RenderJob>, RenderError> {
        self.specs.keys().map(|name| self.resolve(name)).collect()
    }

    /// Resolve the named specs, or all of them when `names` is empty
    ///
    /// Unknown names fail the whole selection. Repeated names are kept once,
    /// at their first position. Every other resolution error stays with its
    /// spec so the caller can decide whether the rest still runs.
    pub fn resolve_selected(&self, names: &[String]) -> Result<Vec<Resolution>, RenderError> {
        let selected: Vec<&str> = if names.is_empty() {
            self.names().collect()
        } else {
            let mut seen = HashSet::new();
            let mut selected = Vec::with_capacity(names.len());
            for name in names {
                if !self.specs.contains_key(name) {
                    return Err(RenderError::config(format!("Unknown spec '{}'", name)));
                }
                if seen.insert(name.as_str()) {
                    selected.push(name.as_str());
                }
            }
            selected
        };

        Ok(selected
            .into_iter()
            .map(|name| Resolution {
                name: name.to_string(),
                job: self.resolve(name),
            })
            .collect())
    }

    /// Fail when another spec resolves to the same output file
    fn check_output_owner(&self, name: &str, output: &Path) -> Result<(), RenderError> {
        let output = lexical(output);

        for (other, spec) in &self.specs {
            if other == name {
                continue;
            }
            let Ok(other_output) =
                resolve_output(other, spec, self.output_dir.as_deref(), &self.project_dir)
            else {
                continue;
            };
            if lexical(&other_output) == output {
                return Err(RenderError::config(format!(
                    "Specs '{}' and '{}' both render to {}",
                    name,
                    other,
                    output.display()
                )));
            }
        }

        Ok(())
    }
}

/// Outcome of resolving one selected spec
#[derive(Debug)]
pub struct Resolution {
    pub name: String,
    pub job: Result<RenderJob, RenderError>,
}

impl From<RenderJob> for Resolution {
    fn from(job: RenderJob) -> Self {
        Self {
            name: job.name.clone(),
            job: Ok(job),
        }
    }
}

/// Drop `.` components and redundant separators, without touching the filesystem
fn lexical(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Resolve the output target of a spec
///
/// An explicit `output_file` wins; otherwise `into` is resolved against the
/// shared output directory, which must then be set.
pub fn resolve_output(
    name: &str,
    spec: &SpecConfig,
    output_dir: Option<&Path>,
    project_dir: &Path,
) -> Result<PathBuf, RenderError> {
    if let Some(file) = &spec.output_file {
        return Ok(project_dir.join(file));
    }

    if let Some(into) = &spec.into {
        let dir = output_dir.ok_or_else(|| {
            RenderError::config(format!(
                "output_dir must be set to use into = \"{}\" for spec '{}'",
                into, name
            ))
        })?;
        return Ok(dir.join(into));
    }

    Err(RenderError::config(format!(
        "No output configured for spec '{}'. Set into = \"file.yaml\" or output_file = \"...\"",
        name
    )))
}

/// Expand input declarations into absolute paths, keeping declaration order
///
/// Patterns with glob metacharacters expand in place to their sorted matches.
pub fn expand_inputs(
    patterns: &[String],
    project_dir: &Path,
) -> Result<Vec<PathBuf>, RenderError> {
    let mut inputs = Vec::with_capacity(patterns.len());

    for pattern in patterns {
        if !is_glob(pattern) {
            inputs.push(project_dir.join(pattern));
            continue;
        }

        let full_pattern = project_dir.join(pattern).to_string_lossy().to_string();
        let entries = glob(&full_pattern).map_err(|e| {
            RenderError::config(format!("Invalid glob pattern '{}': {}", pattern, e))
        })?;

        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                RenderError::io("Failed to read glob entry", path, e.into())
            })?;
            if path.is_file() {
                matches.push(path);
            }
        }

        if matches.is_empty() {
            return Err(RenderError::config(format!(
                "Input pattern '{}' matched no files",
                pattern
            )));
        }

        matches.sort();
        inputs.extend(matches);
    }

    Ok(inputs)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
