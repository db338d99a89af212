/// Fingerprint generation for up-to-date checks
///
/// The fingerprint covers everything that decides whether a job must re-render:
/// - executable
/// - normalized data values
/// - hash mode
/// - output path
/// - input files (path relative to the project directory, plus content)
///
/// The per-run nonce of sha256 mode is not part of it.
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

use super::error::RenderError;
use super::registry::RenderJob;

const MISSING_MARKER: &[u8] = b"<missing>";

/// Compute the fingerprint of a job, as a hex SHA-256 digest
pub fn compute_fingerprint(job: &RenderJob, project_dir: &Path) -> Result<String, RenderError> {
    let mut hasher = Sha256::new();

    field(&mut hasher, b"executable", job.executable.as_bytes());

    for token in &job.normalized {
        field(&mut hasher, b"data-value", token.as_bytes());
    }

    if let Some(mode) = job.hash {
        field(&mut hasher, b"hash", mode.as_str().as_bytes());
    }

    let output = relative(&job.output, project_dir);
    field(&mut hasher, b"output", output.as_bytes());

    for input in &job.inputs {
        let rel_path = relative(input, project_dir);
        field(&mut hasher, b"input", rel_path.as_bytes());

        match hash_file(input) {
            Ok(digest) => hasher.update(&digest),
            Err(e) if e.kind() == io::ErrorKind::NotFound => hasher.update(MISSING_MARKER),
            Err(e) => return Err(RenderError::io("Failed to read input", input, e)),
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of a file's content
pub fn hash_file(path: &Path) -> io::Result<Vec<u8>> {
    let content = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hasher.finalize().to_vec())
}

fn relative(path: &Path, project_dir: &Path) -> String {
    path.strip_prefix(project_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Tagged and length-prefixed
fn field(hasher: &mut Sha256, tag: &[u8], value: &[u8]) {
    hasher.update(tag);
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::command::HashMode;
    use crate::render::values::{normalize, DataValues};
    use tempfile::TempDir;

    fn job(base: &Path, values: &[(&str, &str)]) -> RenderJob {
        let data_values: DataValues = values
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect();
        RenderJob {
            name: "api".to_string(),
            executable: "ytt".to_string(),
            inputs: vec![base.join("api.yaml"), base.join("jwt.yaml")],
            output: base.join("dist/api.yaml"),
            hash: None,
            normalized: normalize(&data_values),
            data_values,
        }
    }

    fn setup() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("api.yaml"), "api: v1\n").unwrap();
        fs::write(temp.path().join("jwt.yaml"), "jwt: enabled\n").unwrap();
        temp
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let temp = setup();
        let job = job(temp.path(), &[("version", "1.0.0")]);

        let first = compute_fingerprint(&job, temp.path()).unwrap();
        let second = compute_fingerprint(&job, temp.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_input_content() {
        let temp = setup();
        let job = job(temp.path(), &[("version", "1.0.0")]);
        let before = compute_fingerprint(&job, temp.path()).unwrap();

        fs::write(temp.path().join("api.yaml"), "api: v2\n").unwrap();

        assert_ne!(before, compute_fingerprint(&job, temp.path()).unwrap());
    }

    #[test]
    fn test_fingerprint_changes_with_data_value() {
        let temp = setup();
        let v1 = compute_fingerprint(&job(temp.path(), &[("version", "1.0.0")]), temp.path());
        let v2 = compute_fingerprint(&job(temp.path(), &[("version", "2.0.0")]), temp.path());
        assert_ne!(v1.unwrap(), v2.unwrap());
    }

    #[test]
    fn test_fingerprint_changes_with_input_order() {
        let temp = setup();
        let job_a = job(temp.path(), &[]);
        let mut job_b = job_a.clone();
        job_b.inputs.reverse();

        assert_ne!(
            compute_fingerprint(&job_a, temp.path()).unwrap(),
            compute_fingerprint(&job_b, temp.path()).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_changes_with_executable_and_hash_mode() {
        let temp = setup();
        let base = job(temp.path(), &[]);
        let base_fp = compute_fingerprint(&base, temp.path()).unwrap();

        let mut other_exe = base.clone();
        other_exe.executable = "/opt/ytt".to_string();
        let other_fp = compute_fingerprint(&other_exe, temp.path()).unwrap();
        assert_ne!(base_fp, other_fp);

        let mut hashed = base.clone();
        hashed.hash = Some(HashMode::Sha256);
        let hashed_fp = compute_fingerprint(&hashed, temp.path()).unwrap();
        assert_ne!(base_fp, hashed_fp);

        // The nonce is generated at execution time, not here
        let again = compute_fingerprint(&hashed, temp.path()).unwrap();
        assert_eq!(hashed_fp, again);
    }

    #[test]
    fn test_fingerprint_tolerates_missing_input() {
        let temp = setup();
        let mut job = job(temp.path(), &[]);
        job.inputs.push(temp.path().join("absent.yaml"));

        let before = compute_fingerprint(&job, temp.path()).unwrap();
        fs::write(temp.path().join("absent.yaml"), "now: here\n").unwrap();

        assert_ne!(before, compute_fingerprint(&job, temp.path()).unwrap());
    }

    #[test]
    fn test_fingerprint_is_relative_to_project_dir() {
        let first = setup();
        let second = setup();

        let job_a = job(first.path(), &[]);
        let job_b = job(second.path(), &[]);

        assert_eq!(
            compute_fingerprint(&job_a, first.path()).unwrap(),
            compute_fingerprint(&job_b, second.path()).unwrap()
        );
    }
}
