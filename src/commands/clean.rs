/// `ytt-render clean` command implementation
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;

use crate::cli::CleanArgs;
use crate::cli_utils::{display_path, prefix};
use crate::merger::MergedConfig;

pub fn run(args: &CleanArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;
    let store = merged
        .state_store()
        .context("Failed to open render state directory")?;

    if args.specs.is_empty() && !args.outputs {
        store.clean_all()?;
        eprintln!("{} Removed all render records", prefix());
        return Ok(());
    }

    let registry = merged.registry();
    let names: Vec<String> = if args.specs.is_empty() {
        registry.names().map(str::to_string).collect()
    } else {
        args.specs.clone()
    };

    for name in &names {
        store.remove(name)?;

        if args.outputs {
            let job = match registry.resolve(name) {
                Ok(job) => job,
                Err(err) => {
                    eprintln!("{} Keeping output of {}: {}", prefix(), name, err);
                    continue;
                }
            };
            match fs::remove_file(&job.output) {
                Ok(()) => println!("removed {}", display_path(&job.output, &merged.project_dir)),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to remove output: {}", job.output.display())
                    })
                }
            }
        }
    }

    eprintln!("{} Cleaned {} spec(s)", prefix(), names.len());
    Ok(())
}
