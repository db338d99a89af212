// Library interface for ytt-render
// This allows integration tests and external code to use the render engine

pub mod cli;
pub mod cli_utils;
pub mod commands;
pub mod config;
pub mod config_discovery;
pub mod logging;
pub mod merger;
pub mod render;

// Re-export commonly used types
pub use config::{RenderConfig, SpecConfig};
pub use config_discovery::{discover_config, load_config};
pub use render::{
    ErrorKind, JobOutcome, RenderError, RenderExecutor, RenderJob, RunOptions, Runner,
    SpecRegistry, StateStore,
};
