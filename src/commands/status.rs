/// `ytt-render status` command implementation
///
/// Reports whether each spec would render, without running anything.
use anyhow::{Context, Result};

use crate::cli::StatusArgs;
use crate::cli_utils::display_path;
use crate::merger::MergedConfig;
use crate::render::fingerprint::compute_fingerprint;
use crate::render::Freshness;

pub fn run(args: &StatusArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;
    let selected = merged.registry().resolve_selected(&args.specs)?;
    let store = merged
        .state_store()
        .context("Failed to open render state directory")?;

    let mut stale = 0;
    let mut invalid = 0;
    for resolution in &selected {
        let job = match &resolution.job {
            Ok(job) => job,
            Err(err) => {
                invalid += 1;
                println!("{}: INVALID [{}] {}", resolution.name, err.kind(), err);
                continue;
            }
        };

        let fingerprint = compute_fingerprint(job, &merged.project_dir)?;
        let output = display_path(&job.output, &merged.project_dir);

        match store.check(&job.name, &fingerprint, &job.output)? {
            Freshness::UpToDate => println!("{}: UP-TO-DATE -> {}", job.name, output),
            Freshness::Stale(reason) => {
                stale += 1;
                println!("{}: STALE ({}) -> {}", job.name, reason, output);
            }
        }
    }

    eprintln!(
        "{} spec(s): {} up to date, {} stale, {} invalid",
        selected.len(),
        selected.len() - stale - invalid,
        stale,
        invalid
    );

    Ok(())
}
