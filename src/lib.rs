pub mod diff;
pub mod error;
pub mod execute;
pub mod harness;
pub mod normalize;
pub mod notebook;
pub mod workdir;

pub use diff::{Diff, ExcludePaths, diff_values};
pub use error::HarnessError;
pub use execute::{Executor, JupyterExecutor};
pub use harness::{CaseOutcome, Harness, HarnessOptions};
pub use normalize::{strip_memory_address, strip_memory_addresses};
pub use notebook::Notebook;

/// Re-execute the notebook `name` under `root` with Jupyter and fail if its
/// outputs changed.
///
/// Memory addresses are masked, and per-cell metadata and execution counters
/// are ignored.
pub fn check_notebook(
    root: impl Into<std::path::PathBuf>,
    name: &str,
) -> Result<(), HarnessError> {
    let options = HarnessOptions {
        root: root.into(),
        ..Default::default()
    };
    Harness::new(options, JupyterExecutor::default())?.check(name)
}
