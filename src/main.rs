use anyhow::Result;
use clap::Parser;

use ytt_render::cli::{Cli, Commands};
use ytt_render::{commands, logging};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize structured logging
    let verbose = matches!(&cli.command, Commands::Render(args) if args.verbose);
    logging::init(if verbose { "debug" } else { "info" });

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Render(args) => commands::render::run(&args),
        Commands::List(args) => commands::list::run(&args),
        Commands::Status(args) => commands::status::run(&args),
        Commands::Clean(args) => commands::clean::run(&args),
        Commands::Init(args) => commands::init::run(args),
        Commands::Config(args) => commands::config::run(args.command),
    }
}
