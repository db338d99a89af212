/// CLI utilities for consistent output formatting
use std::io::IsTerminal;
use std::path::Path;

/// Get a colored prefix for stderr messages
///
/// Returns bright cyan if stderr is a TTY, plain text otherwise.
pub fn prefix() -> &'static str {
    if std::io::stderr().is_terminal() {
        "\x1b[96m[ytt-render]\x1b[0m"
    } else {
        "[ytt-render]"
    }
}

/// Display `path` relative to `base` when it lives below it
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
