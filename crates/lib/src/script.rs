//! Contract between automation scripts and the front-ends that run them.

use crate::coerce::CollectionError;
use crate::schema::{CollectedValues, Schema, SectionOptions};

/// Services a front-end provides to a running script.
///
/// Implementations live on the front-end side: the CLI prompts inline, the
/// desktop hands the request to the UI thread and blocks the script until
/// the form is submitted.
pub trait ScriptHost: Send + Sync {
    /// Emit one line of script output.
    fn emit(&self, line: &str);

    /// Collect an extra parameter section mid-run, blocking until the
    /// front-end returns the values. `options` overrides the choice lists
    /// of the named schema keys before rendering.
    fn request_section(
        &self,
        title: &str,
        schema: Schema,
        options: SectionOptions,
    ) -> Result<CollectedValues, CollectionError>;
}

/// Failure modes of a script run.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script itself reported a failure.
    #[error("{0}")]
    Failed(String),
    /// Collecting a mid-run section failed or was abandoned.
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A runnable automation script.
pub trait Script: Send + Sync {
    /// Slash-separated registry path, e.g. `net/ping`.
    fn path(&self) -> &str;

    /// One-line description shown in listings.
    fn description(&self) -> &str;

    /// Parameters to collect before the run starts.
    fn params(&self) -> Schema;

    /// Run with the collected parameters.
    fn run(&self, host: &dyn ScriptHost, params: &CollectedValues) -> Result<(), ScriptError>;
}
