/// ytt rendering
///
/// Resolves named specs into jobs, fingerprints them, and runs ytt for the
/// ones that are not up to date.
pub mod command;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod registry;
pub mod runner;
pub mod state;
pub mod values;

pub use command::{HashMode, RenderCommand};
pub use error::{ErrorKind, RenderError};
pub use executor::{RenderExecutor, RenderResult};
pub use registry::{RenderJob, Resolution, SpecRegistry};
pub use runner::{JobOutcome, RunOptions, RunSummary, Runner};
pub use state::{Freshness, StaleReason, StateStore};
pub use values::{normalize, DataValues};
