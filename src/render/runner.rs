/// Job runner
///
/// Decides per job whether it is up to date, renders the stale ones on a small
/// worker pool and records successful renders.
use crossbeam_channel::unbounded;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{info, warn};

use super::command::RenderCommand;
use super::error::RenderError;
use super::executor::{RenderExecutor, RenderResult};
use super::fingerprint::compute_fingerprint;
use super::registry::{RenderJob, Resolution};
use super::state::{Freshness, JobState, StateStore};
use crate::logging::{operations, services, status};

/// What happened to a job during a run
#[derive(Debug)]
pub enum JobOutcome {
    /// Rendered successfully
    Success(RenderResult),
    /// Nothing changed since the last render
    UpToDate,
    /// Would have rendered (dry run)
    Planned(RenderCommand),
    /// Not started because an earlier job failed
    Skipped,
    Failed(RenderError),
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Success(_) => "SUCCESS",
            JobOutcome::UpToDate => "UP-TO-DATE",
            JobOutcome::Planned(_) => "PLANNED",
            JobOutcome::Skipped => "SKIPPED",
            JobOutcome::Failed(_) => "FAILED",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

#[derive(Debug)]
pub struct JobReport {
    pub name: String,
    /// Unknown when the spec failed to resolve
    pub output: Option<PathBuf>,
    pub outcome: JobOutcome,
}

/// Outcome of every job of a run, in job order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<JobReport>,
}

impl RunSummary {
    pub fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Ignore up-to-date records
    pub rerun: bool,
    /// Report what would render without running anything
    pub dry_run: bool,
    /// Keep scheduling jobs after a failure
    pub keep_going: bool,
    /// Number of worker threads
    pub workers: usize,
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            rerun: false,
            dry_run: false,
            keep_going: false,
            workers: num_cpus::get(),
            verbose: false,
        }
    }
}

pub struct Runner {
    project_dir: PathBuf,
    store: StateStore,
    executor: RenderExecutor,
    options: RunOptions,
}

impl Runner {
    pub fn new(project_dir: &Path, store: StateStore, options: RunOptions) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            store,
            executor: RenderExecutor::new(options.verbose),
            options,
        }
    }

    /// Run the resolved specs; independent jobs may render concurrently
    ///
    /// A spec that failed to resolve is reported as failed. Unless
    /// `keep_going` is set, that failure skips every other spec.
    pub fn run(&self, plan: Vec<Resolution>) -> RunSummary {
        let mut names = Vec::with_capacity(plan.len());
        let mut outcomes: Vec<Option<JobOutcome>> = Vec::with_capacity(plan.len());
        let mut jobs: Vec<(usize, RenderJob)> = Vec::new();

        for (index, resolution) in plan.into_iter().enumerate() {
            names.push(resolution.name);
            match resolution.job {
                Ok(job) => {
                    outcomes.push(None);
                    jobs.push((index, job));
                }
                Err(e) => {
                    warn!(spec = %names[index], "Cannot render: {}", e);
                    outcomes.push(Some(JobOutcome::Failed(e)));
                }
            }
        }

        let unresolved = outcomes.iter().any(Option::is_some);
        let abort = AtomicBool::new(unresolved && !self.options.keep_going);

        let workers = self.options.workers.clamp(1, jobs.len().max(1));

        let (task_tx, task_rx) = unbounded::<usize>();
        for position in 0..jobs.len() {
            let _ = task_tx.send(position);
        }
        drop(task_tx);

        let (result_tx, result_rx) = unbounded::<(usize, JobOutcome)>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let abort = &abort;
                let jobs = &jobs;

                scope.spawn(move || {
                    for position in task_rx.iter() {
                        let (index, job) = &jobs[position];

                        if abort.load(Ordering::SeqCst) {
                            let _ = result_tx.send((*index, JobOutcome::Skipped));
                            continue;
                        }

                        let outcome = self.run_job(job);
                        if outcome.is_failure() && !self.options.keep_going {
                            abort.store(true, Ordering::SeqCst);
                        }
                        let _ = result_tx.send((*index, outcome));
                    }
                });
            }
        });
        drop(result_tx);

        for (index, outcome) in result_rx.iter() {
            outcomes[index] = Some(outcome);
        }

        let mut job_outputs: Vec<Option<PathBuf>> = vec![None; names.len()];
        for (index, job) in jobs {
            job_outputs[index] = Some(job.output);
        }

        let reports = names
            .into_iter()
            .zip(job_outputs)
            .zip(outcomes)
            .map(|((name, output), outcome)| JobReport {
                name,
                output,
                outcome: outcome.unwrap_or(JobOutcome::Skipped),
            })
            .collect();

        RunSummary { reports }
    }

    /// Check and, when stale, render a single job
    pub fn run_job(&self, job: &RenderJob) -> JobOutcome {
        let fingerprint = match compute_fingerprint(job, &self.project_dir) {
            Ok(fingerprint) => fingerprint,
            Err(e) => return JobOutcome::Failed(e),
        };

        if !self.options.rerun {
            match self.store.check(&job.name, &fingerprint, &job.output) {
                Ok(Freshness::UpToDate) => {
                    info!(
                        service = services::RUNNER,
                        operation = operations::CHECK,
                        status = status::UP_TO_DATE,
                        spec = %job.name,
                        "up to date"
                    );
                    return JobOutcome::UpToDate;
                }
                Ok(Freshness::Stale(reason)) => {
                    info!(
                        service = services::RUNNER,
                        operation = operations::CHECK,
                        status = status::STALE,
                        spec = %job.name,
                        reason = %reason,
                        "render needed"
                    );
                }
                Err(e) => {
                    warn!(spec = %job.name, "Failed to read state record, rendering: {:#}", e);
                }
            }
        }

        if self.options.dry_run {
            return JobOutcome::Planned(job.command());
        }

        // A failed or interrupted render must never look up to date
        if let Err(e) = self.store.remove(&job.name) {
            warn!(spec = %job.name, "Failed to remove state record: {:#}", e);
        }

        match self.executor.execute(&job.command(), &job.output) {
            Ok(result) => {
                match JobState::capture(&job.name, &fingerprint, &job.output)
                    .and_then(|state| self.store.put(&state))
                {
                    Ok(()) => {}
                    Err(e) => warn!(spec = %job.name, "Failed to record render: {:#}", e),
                }
                JobOutcome::Success(result)
            }
            Err(e) => JobOutcome::Failed(e),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::render::values::{normalize, DataValues};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn plan(jobs: &[RenderJob]) -> Vec<Resolution> {
        jobs.iter().cloned().map(Resolution::from).collect()
    }

    struct Project {
        temp: TempDir,
        counter: PathBuf,
    }

    impl Project {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let counter = temp.path().join("invocations.log");
            let script = temp.path().join("fake-ytt.sh");
            fs::write(
                &script,
                format!(
                    "#!/bin/sh\necho run >> '{}'\necho FAKE_YTT\necho args: \"$@\"\n",
                    counter.display()
                ),
            )
            .unwrap();
            let mut perms = fs::metadata(&script).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script, perms).unwrap();

            fs::write(temp.path().join("api.yaml"), "api: v1\n").unwrap();

            Self { temp, counter }
        }

        fn path(&self) -> &Path {
            self.temp.path()
        }

        fn job(&self, name: &str, version: &str) -> RenderJob {
            let mut data_values = DataValues::new();
            data_values.insert("version".to_string(), Some(version.to_string()));
            RenderJob {
                name: name.to_string(),
                executable: self.path().join("fake-ytt.sh").display().to_string(),
                inputs: vec![self.path().join("api.yaml")],
                output: self.path().join(format!("dist/{}.yaml", name)),
                hash: None,
                normalized: normalize(&data_values),
                data_values,
            }
        }

        fn runner(&self, options: RunOptions) -> Runner {
            let store = StateStore::new(&self.path().join(".ytt-render")).unwrap();
            Runner::new(self.path(), store, options)
        }

        fn invocations(&self) -> usize {
            fs::read_to_string(&self.counter)
                .map(|s| s.lines().count())
                .unwrap_or(0)
        }
    }

    #[test]
    fn test_second_run_is_up_to_date() {
        let project = Project::new();
        let runner = project.runner(RunOptions::default());
        let jobs = vec![project.job("api", "1.0.0")];

        let first = runner.run(plan(&jobs));
        assert!(matches!(first.reports[0].outcome, JobOutcome::Success(_)));
        assert_eq!(project.invocations(), 1);

        let second = runner.run(plan(&jobs));
        assert!(matches!(second.reports[0].outcome, JobOutcome::UpToDate));
        assert_eq!(project.invocations(), 1);
    }

    #[test]
    fn test_changes_trigger_one_render() {
        let project = Project::new();
        let runner = project.runner(RunOptions::default());

        runner.run(plan(&[project.job("api", "1.0.0")]));

        fs::write(project.path().join("api.yaml"), "api: v2\n").unwrap();
        let touched = runner.run(plan(&[project.job("api", "1.0.0")]));
        assert!(matches!(touched.reports[0].outcome, JobOutcome::Success(_)));
        assert_eq!(project.invocations(), 2);

        let changed = runner.run(plan(&[project.job("api", "2.0.0")]));
        assert!(matches!(changed.reports[0].outcome, JobOutcome::Success(_)));
        assert_eq!(project.invocations(), 3);
    }

    #[test]
    fn test_rerun_ignores_records() {
        let project = Project::new();
        let jobs = vec![project.job("api", "1.0.0")];

        project.runner(RunOptions::default()).run(plan(&jobs));
        let forced = project
            .runner(RunOptions {
                rerun: true,
                ..Default::default()
            })
            .run(plan(&jobs));

        assert!(matches!(forced.reports[0].outcome, JobOutcome::Success(_)));
        assert_eq!(project.invocations(), 2);
    }

    #[test]
    fn test_dry_run_spawns_nothing() {
        let project = Project::new();
        let summary = project
            .runner(RunOptions {
                dry_run: true,
                ..Default::default()
            })
            .run(plan(&[project.job("api", "1.0.0")]));

        match &summary.reports[0].outcome {
            JobOutcome::Planned(command) => assert!(command.to_string().contains("-f")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(project.invocations(), 0);
        assert!(!project.path().join("dist/api.yaml").exists());
    }

    #[test]
    fn test_failure_stops_scheduling_unless_keep_going() {
        let project = Project::new();
        let mut broken = project.job("a-broken", "1.0.0");
        broken.executable = project.path().join("missing-ytt").display().to_string();
        let jobs = vec![broken, project.job("b", "1.0.0"), project.job("c", "1.0.0")];

        let summary = project
            .runner(RunOptions {
                workers: 1,
                ..Default::default()
            })
            .run(plan(&jobs));
        assert!(!summary.is_success());
        assert!(summary.reports[0].outcome.is_failure());
        assert!(matches!(summary.reports[1].outcome, JobOutcome::Skipped));
        assert!(matches!(summary.reports[2].outcome, JobOutcome::Skipped));

        let summary = project
            .runner(RunOptions {
                workers: 1,
                keep_going: true,
                ..Default::default()
            })
            .run(plan(&jobs));
        assert_eq!(summary.count(JobOutcome::is_failure), 1);
        assert_eq!(summary.count(|o| matches!(o, JobOutcome::Success(_))), 2);
    }

    #[test]
    fn test_failed_render_is_retried() {
        let project = Project::new();
        let runner = project.runner(RunOptions::default());
        let good = project.job("api", "1.0.0");
        runner.run(plan(std::slice::from_ref(&good)));

        let mut broken = good.clone();
        broken.executable = project.path().join("missing-ytt").display().to_string();
        assert!(!runner.run(plan(&[broken])).is_success());

        // Back to the previous configuration: the record is gone, so it renders again
        let summary = runner.run(plan(&[good]));
        assert!(matches!(summary.reports[0].outcome, JobOutcome::Success(_)));
    }

    #[test]
    fn test_parallel_jobs_render_distinct_outputs() {
        let project = Project::new();
        let jobs: Vec<RenderJob> = (0..6)
            .map(|i| project.job(&format!("job{}", i), "1.0.0"))
            .collect();

        let summary = project
            .runner(RunOptions {
                workers: 4,
                ..Default::default()
            })
            .run(plan(&jobs));

        assert!(summary.is_success());
        for (report, job) in summary.reports.iter().zip(&jobs) {
            assert_eq!(report.name, job.name);
            assert!(job.output.exists());
        }
    }

    #[test]
    fn test_unresolved_spec_fails_alone_with_keep_going() {
        let project = Project::new();
        let unresolved = || Resolution {
            name: "zbroken".to_string(),
            job: Err(RenderError::config("spec 'zbroken' has no output")),
        };

        let mut stop = plan(&[project.job("good", "1.0.0")]);
        stop.push(unresolved());
        let summary = project.runner(RunOptions::default()).run(stop);
        assert!(matches!(summary.reports[0].outcome, JobOutcome::Skipped));
        assert!(summary.reports[1].outcome.is_failure());
        assert_eq!(summary.reports[1].output, None);
        assert_eq!(project.invocations(), 0);

        let mut keep_going = plan(&[project.job("good", "1.0.0")]);
        keep_going.push(unresolved());
        let summary = project
            .runner(RunOptions {
                keep_going: true,
                ..Default::default()
            })
            .run(keep_going);
        assert!(matches!(summary.reports[0].outcome, JobOutcome::Success(_)));
        assert_eq!(summary.reports[1].name, "zbroken");
        assert!(summary.reports[1].outcome.is_failure());
        assert_eq!(project.invocations(), 1);
        assert!(project.path().join("dist/good.yaml").exists());
    }
}
