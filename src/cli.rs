use clap::{Parser, Subcommand};

/// ytt-render - incremental ytt template rendering
///
/// Renders named ytt specs declared in ytt-render.toml, skipping the ones whose
/// inputs, data values and outputs have not changed since the last render.
#[derive(Parser, Debug)]
#[command(name = "ytt-render")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental ytt template rendering", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Configuration arguments shared across commands
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonConfigArgs {
    /// Config file path (default: discover ytt-render.toml upwards)
    #[arg(short = 'c', long, env = "YTT_RENDER_CONFIG")]
    pub config: Option<String>,

    /// ytt executable, overrides the config file
    #[arg(long, env = "YTT_RENDER_EXECUTABLE")]
    pub executable: Option<String>,

    /// Shared output directory, overrides the config file
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Data value applied on top of every spec (repeatable, key=value)
    #[arg(long = "data-value", value_name = "KEY=VALUE")]
    pub data_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render specs that are not up to date
    Render(RenderArgs),

    /// List specs with their resolved outputs, inputs and data values
    List(ListArgs),

    /// Show whether specs are up to date
    Status(StatusArgs),

    /// Remove up-to-date records (and optionally rendered outputs)
    Clean(CleanArgs),

    /// Create a starter ytt-render.toml
    Init(InitArgs),

    /// Configuration management utilities
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Specs to render (default: all)
    pub specs: Vec<String>,

    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Render even if up to date
    #[arg(long)]
    pub rerun: bool,

    /// Show what would run without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Keep rendering other specs after a failure
    #[arg(long = "continue")]
    pub keep_going: bool,

    /// Number of specs rendered in parallel (default: number of CPUs)
    #[arg(short, long, env = "YTT_RENDER_JOBS")]
    pub jobs: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Show inputs and data values
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Specs to check (default: all)
    pub specs: Vec<String>,

    #[command(flatten)]
    pub common: CommonConfigArgs,
}

#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Specs to clean (default: all)
    pub specs: Vec<String>,

    #[command(flatten)]
    pub common: CommonConfigArgs,

    /// Also delete rendered output files
    #[arg(long)]
    pub outputs: bool,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing ytt-render.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Validate {
        /// Config file path (default: discover ytt-render.toml upwards)
        #[arg(short = 'c', long, env = "YTT_RENDER_CONFIG")]
        config: Option<String>,
    },
    /// Print an example config file
    Example,
    /// Show effective configuration
    Show {
        #[command(flatten)]
        common: CommonConfigArgs,
    },
}
