/// `ytt-render render` command implementation
///
/// Resolves the selected specs and renders the ones that are not up to date.
use anyhow::{Context, Result};

use crate::cli::RenderArgs;
use crate::cli_utils::{display_path, prefix};
use crate::merger::MergedConfig;
use crate::render::{JobOutcome, RunOptions, RunSummary, Runner};

pub fn run(args: &RenderArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;

    if args.verbose {
        eprintln!(
            "{} Using config: {}",
            prefix(),
            merged.config_path.display()
        );
    }

    let registry = merged.registry();
    if registry.is_empty() {
        eprintln!(
            "{} No specs declared in {}",
            prefix(),
            merged.config_path.display()
        );
        return Ok(());
    }

    let plan = registry.resolve_selected(&args.specs)?;
    let store = merged
        .state_store()
        .context("Failed to open render state directory")?;

    let mut options = RunOptions {
        rerun: args.rerun,
        dry_run: args.dry_run,
        keep_going: args.keep_going,
        verbose: args.verbose,
        ..Default::default()
    };
    if let Some(jobs) = args.jobs {
        options.workers = jobs.max(1);
    }

    let runner = Runner::new(&merged.project_dir, store, options);
    let summary = runner.run(plan);

    print_reports(&summary, &merged);
    print_summary(&summary);

    if !summary.is_success() {
        for report in summary.failures() {
            if let JobOutcome::Failed(err) = &report.outcome {
                eprintln!("{} {} [{}]: {}", prefix(), report.name, err.kind(), err);
            }
        }
        let failed = summary.count(JobOutcome::is_failure);
        anyhow::bail!("{} spec(s) failed to render", failed);
    }

    Ok(())
}

fn print_reports(summary: &RunSummary, merged: &MergedConfig) {
    for report in &summary.reports {
        let output = match &report.output {
            Some(path) => display_path(path, &merged.project_dir),
            None => "?".to_string(),
        };
        match &report.outcome {
            JobOutcome::Success(result) => println!(
                "{}: {} -> {} ({} bytes, {:.2}s)",
                report.name,
                report.outcome.label(),
                output,
                result.bytes_written,
                result.duration.as_secs_f64()
            ),
            JobOutcome::Planned(command) => {
                println!("{}: {} -> {}", report.name, report.outcome.label(), output);
                println!("  {}", command);
            }
            _ => println!("{}: {} -> {}", report.name, report.outcome.label(), output),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let rendered = summary.count(|o| matches!(o, JobOutcome::Success(_)));
    let up_to_date = summary.count(|o| matches!(o, JobOutcome::UpToDate));
    let planned = summary.count(|o| matches!(o, JobOutcome::Planned(_)));
    let skipped = summary.count(|o| matches!(o, JobOutcome::Skipped));
    let failed = summary.count(JobOutcome::is_failure);

    let mut line = format!(
        "{} spec(s): {} rendered, {} up to date",
        summary.reports.len(),
        rendered,
        up_to_date
    );
    if planned > 0 {
        line.push_str(&format!(", {} planned", planned));
    }
    if skipped > 0 {
        line.push_str(&format!(", {} skipped", skipped));
    }
    if failed > 0 {
        line.push_str(&format!(", {} failed", failed));
    }
    eprintln!("{} {}", prefix(), line);
}
