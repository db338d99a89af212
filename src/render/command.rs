/// ytt command line assembly
///
/// Builds `[ytt, (--data-value k=v)*, (-f <abs path>)*]` for a render job.
use rand::Rng;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::RenderError;
use super::values::denormalize;

/// Data value key used for the per-run nonce
pub const HASH_KEY: &str = "hash";

const NONCE_LEN: usize = 10;
const NONCE_FIRST_CHAR: u8 = b'0';
const NONCE_CHAR_SPAN: u8 = 75;

/// Optional hash injection mode of a spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// Inject `hash=<sha256 of a random string>`, different on every run
    Sha256,
}

impl HashMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashMode::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashMode {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(HashMode::Sha256),
            other => Err(RenderError::config(format!(
                "Unsupported hash mode '{}'. Supported modes: sha256",
                other
            ))),
        }
    }
}

/// A fully assembled process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl RenderCommand {
    /// Full argument vector, program first
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(OsString::from(&self.program));
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl fmt::Display for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the ytt invocation for a job
///
/// `normalized` is the sorted token list; it is rebuilt into a map here, so
/// `--data-value` flags come out in map order. Input order is preserved since
/// it decides ytt's merge precedence.
pub fn build(
    executable: &str,
    normalized: &[String],
    inputs: &[PathBuf],
    hash: Option<HashMode>,
) -> RenderCommand {
    let mut values = denormalize(normalized);

    if hash == Some(HashMode::Sha256) {
        values.insert(HASH_KEY.to_string(), generate_nonce());
    }

    let mut args = Vec::with_capacity(values.len() * 2 + inputs.len() * 2);

    for (key, value) in &values {
        args.push(OsString::from("--data-value"));
        args.push(OsString::from(format!("{}={}", key, value)));
    }

    for input in inputs {
        args.push(OsString::from("-f"));
        args.push(absolute(input).into_os_string());
    }

    RenderCommand {
        program: executable.to_string(),
        args,
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// SHA-256 hex digest of a fresh random ASCII string
///
/// A uniqueness nonce, not a content hash of anything.
pub fn generate_nonce() -> String {
    let mut hasher = Sha256::new();
    hasher.update(random_ascii().as_bytes());
    hex::encode(hasher.finalize())
}

fn random_ascii() -> String {
    let mut rng = rand::rng();
    (0..NONCE_LEN)
        .map(|_| (NONCE_FIRST_CHAR + rng.random_range(0..NONCE_CHAR_SPAN)) as char)
        .collect()
}
