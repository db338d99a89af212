//! Structured logging utilities for ytt-render
//!
//! All logs go to stderr; stdout carries command output only.
//!
//! # Log Format Conventions
//!
//! - `service`: The component logging ("ytt", "ytt.runner")
//! - `operation`: The operation being performed (e.g., "execute", "check")
//! - `status`: The result status ("success", "up_to_date", "stale", "error")
//! - `spec`: Name of the render spec
//!
//! # Examples
//!
//! ```rust
//! use tracing::info;
//!
//! info!(
//!     service = "ytt.runner",
//!     operation = "check",
//!     status = "up_to_date",
//!     spec = "api",
//!     "up to date"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Formatter that tags every line with "(ytt-render)" instead of the module path
struct RenderFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for RenderFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            };
            write!(
                writer,
                "{}{:5}(ytt-render)\x1b[0m: ",
                level_style,
                meta.level()
            )?;
        } else {
            write!(writer, "{:5}(ytt-render): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored
    Pretty,
    /// No colors (CI)
    Compact,
    /// JSON lines
    Json,
}

impl LogFormat {
    /// Parse from environment variable (YTT_RENDER_LOG_FORMAT)
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var("YTT_RENDER_LOG_FORMAT").ok().as_deref(),
            std::env::var("CI").is_ok(),
        )
    }

    fn parse(value: Option<&str>, ci: bool) -> Self {
        match value.unwrap_or_default().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ if ci => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "debug", "info", "warn")
/// - `YTT_RENDER_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
///
/// `default_level` applies when `RUST_LOG` is not set.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let with_ansi = std::io::IsTerminal::is_terminal(&io::stderr());

    match LogFormat::from_env() {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(RenderFormatter { with_ansi })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(RenderFormatter { with_ansi: false })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(false)
                        .with_writer(io::stderr)
                        .json(),
                )
                .init();
        }
    }
}

/// Service names for consistent logging
pub mod services {
    pub const YTT: &str = "ytt";
    pub const RUNNER: &str = "ytt.runner";
}

/// Operation names for consistent logging
pub mod operations {
    pub const EXECUTE: &str = "execute";
    pub const CHECK: &str = "check";
}

/// Status values for consistent logging
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
    pub const UP_TO_DATE: &str = "up_to_date";
    pub const STALE: &str = "stale";
}
