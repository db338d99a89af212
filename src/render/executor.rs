/// Render executor
///
/// Spawns ytt, streams its stdout into the output file and surfaces a
/// non-zero exit as an error. stderr goes straight to our own stderr.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::command::RenderCommand;
use super::error::RenderError;
use crate::logging::{operations, services, status};

/// Result of a successful render
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub exit_code: i32,
    pub bytes_written: u64,
    pub duration: Duration,
}

/// Runs render commands, one subprocess per call
#[derive(Debug, Clone, Default)]
pub struct RenderExecutor {
    verbose: bool,
}

impl RenderExecutor {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run `command`, writing its stdout to `output`
    ///
    /// The output file is left as-is on failure, partial or not.
    pub fn execute(
        &self,
        command: &RenderCommand,
        output: &Path,
    ) -> Result<RenderResult, RenderError> {
        let start = Instant::now();

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    RenderError::io("Failed to create output directory", parent, e)
                })?;
            }
        }

        info!(
            service = services::YTT,
            operation = operations::EXECUTE,
            "Running: {}",
            command
        );

        let program = resolve_program(&command.program, self.verbose);

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        bind_lifetime(&mut cmd);

        let child = cmd.spawn().map_err(|e| RenderError::Spawn {
            program: command.program.clone(),
            source: e,
        })?;
        let mut guard = ChildGuard::new(child);

        let bytes_written = guard.drain_stdout_to(output)?;

        let exit_status = guard
            .wait()
            .map_err(|e| RenderError::io("Failed to wait for", PathBuf::from(&program), e))?;
        let exit_code = exit_code_of(exit_status);
        let duration = start.elapsed();

        if exit_code != 0 {
            info!(
                service = services::YTT,
                operation = operations::EXECUTE,
                status = status::ERROR,
                exit_code,
                output = %output.display(),
                "ytt failed"
            );
            return Err(RenderError::ExitStatus {
                exit_code,
                output: output.to_path_buf(),
            });
        }

        debug!(
            service = services::YTT,
            operation = operations::EXECUTE,
            status = status::SUCCESS,
            size_bytes = bytes_written,
            duration_ms = duration.as_millis() as u64,
            output = %output.display(),
            "render complete"
        );

        Ok(RenderResult {
            exit_code,
            bytes_written,
            duration,
        })
    }
}

/// Resolve the executable from PATH, falling back to the name as given
fn resolve_program(program: &str, verbose: bool) -> PathBuf {
    which::which(program).unwrap_or_else(|e| {
        if verbose {
            debug!("Could not find '{}' in PATH: {}. Trying as-is.", program, e);
        }
        PathBuf::from(program)
    })
}

fn exit_code_of(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(-1)
}

/// Ask the kernel to signal the child if the spawning thread goes away
#[cfg(target_os = "linux")]
fn bind_lifetime(cmd: &mut Command) {
    use nix::sys::prctl::set_pdeathsig;
    use nix::sys::signal::Signal;
    use std::os::unix::process::CommandExt;

    // SAFETY: prctl is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| set_pdeathsig(Signal::SIGTERM).map_err(io::Error::from));
    }
}

#[cfg(not(target_os = "linux"))]
fn bind_lifetime(_cmd: &mut Command) {}

/// Kills and reaps the child unless it was waited for
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn drain_stdout_to(&mut self, output: &Path) -> Result<u64, RenderError> {
        let mut stdout = self.child.stdout.take().ok_or_else(|| {
            RenderError::io(
                "Failed to capture stdout for",
                output,
                io::Error::other("stdout not piped"),
            )
        })?;

        let file = File::create(output)
            .map_err(|e| RenderError::io("Failed to create output file", output, e))?;
        let mut writer = BufWriter::new(file);

        let copied = io::copy(&mut stdout, &mut writer)
            .map_err(|e| RenderError::io("Failed to write output file", output, e))?;
        writer
            .flush()
            .map_err(|e| RenderError::io("Failed to write output file", output, e))?;

        Ok(copied)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
