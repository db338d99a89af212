/// `ytt-render list` command implementation
use anyhow::Result;

use crate::cli::ListArgs;
use crate::cli_utils::{display_path, prefix};
use crate::merger::MergedConfig;

pub fn run(args: &ListArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;
    let registry = merged.registry();

    if registry.is_empty() {
        eprintln!(
            "{} No specs declared in {}",
            prefix(),
            merged.config_path.display()
        );
        return Ok(());
    }

    for name in registry.names() {
        // Unresolvable specs are listed with their error so one broken spec
        // does not hide the others.
        let job = match registry.resolve(name) {
            Ok(job) => job,
            Err(err) => {
                println!("{}: [{}] {}", name, err.kind(), err);
                continue;
            }
        };

        println!(
            "{} -> {}",
            job.name,
            display_path(&job.output, &merged.project_dir)
        );

        if args.verbose {
            for input in &job.inputs {
                println!("  input: {}", display_path(input, &merged.project_dir));
            }
            for token in &job.normalized {
                println!("  data value: {}", token);
            }
            if let Some(hash) = job.hash {
                println!("  hash: {}", hash);
            }
        }
    }

    Ok(())
}
