use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or executing render jobs
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{0}")]
    Configuration(String),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ytt exited with code {exit_code} for {}", .output.display())]
    ExitStatus { exit_code: i32, output: PathBuf },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of a [`RenderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationError,
    ProcessFailure,
    IoFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigurationError => "configuration error",
            ErrorKind::ProcessFailure => "process failure",
            ErrorKind::IoFailure => "I/O failure",
        };
        f.write_str(name)
    }
}

impl RenderError {
    pub fn config(message: impl Into<String>) -> Self {
        RenderError::Configuration(message.into())
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Configuration(_) => ErrorKind::ConfigurationError,
            RenderError::Spawn { .. } | RenderError::ExitStatus { .. } => {
                ErrorKind::ProcessFailure
            }
            RenderError::Io { .. } => ErrorKind::IoFailure,
        }
    }

    /// Exit code of the subprocess, when it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RenderError::ExitStatus { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
