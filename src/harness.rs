use std::path::PathBuf;

use crate::diff::{self, ExcludePaths, NOTEBOOK_EXCLUDE_PATTERNS};
use crate::error::HarnessError;
use crate::execute::Executor;
use crate::normalize;
use crate::notebook::Notebook;
use crate::workdir::WorkingDirectory;

/// Directory holding the user-guide notebooks, relative to the repository root.
pub const DEFAULT_ROOT_DIR: &str = "docs/user_guide";

/// The user-guide notebooks checked by default.
pub const USER_GUIDE_NOTEBOOKS: &[&str] = &[
    "atomic_models.ipynb",
    "potentials.ipynb",
    "wave_functions.ipynb",
];

/// Options controlling a harness run.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Directory notebooks are loaded from and executed in.
    pub root: PathBuf,
    /// Regex patterns of paths ignored by the comparison.
    pub exclude_patterns: Vec<String>,
    /// Mask memory addresses in outputs before comparing.
    pub normalize: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT_DIR),
            exclude_patterns: NOTEBOOK_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            normalize: true,
        }
    }
}

/// Result of checking a single notebook.
#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub result: Result<(), HarnessError>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Re-executes golden notebooks and compares them with their stored outputs.
pub struct Harness<E> {
    options: HarnessOptions,
    exclude: ExcludePaths,
    executor: E,
}

impl<E: Executor> Harness<E> {
    pub fn new(options: HarnessOptions, executor: E) -> Result<Self, HarnessError> {
        let exclude = ExcludePaths::new(&options.exclude_patterns)?;
        Ok(Self {
            options,
            exclude,
            executor,
        })
    }

    /// Check one notebook, named relative to the root directory.
    ///
    /// Returns [`HarnessError::NotebookChanged`] carrying the rendered diff
    /// when the re-executed notebook differs from the stored one.
    pub fn check(&self, name: &str) -> Result<(), HarnessError> {
        let (mut expected, mut actual) = {
            let _cwd = WorkingDirectory::enter(&self.options.root)?;

            log::debug!("{name}: loading");
            let expected = Notebook::read(name)?;
            let mut actual = expected.clone();

            log::debug!("{name}: executing");
            self.executor.execute(&mut actual)?;
            (expected, actual)
        };

        if self.options.normalize {
            log::debug!("{name}: normalizing");
            normalize::strip_memory_addresses(&mut expected);
            normalize::strip_memory_addresses(&mut actual);
        }

        log::debug!("{name}: comparing");
        let diff = diff::diff_values(expected.as_value(), actual.as_value(), &self.exclude);
        if diff.is_empty() {
            return Ok(());
        }

        log::debug!("{name}: {} difference(s)", diff.len());
        Err(HarnessError::NotebookChanged {
            name: name.to_string(),
            report: diff.to_string(),
        })
    }

    /// Check each notebook once, in order. A failing case does not stop the
    /// remaining ones.
    pub fn check_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<CaseOutcome> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let result = self.check(name);
                match &result {
                    Ok(()) => log::info!("{name}: unchanged"),
                    Err(e) => log::info!("{name}: failed: {e}"),
                }
                CaseOutcome {
                    name: name.to_string(),
                    result,
                }
            })
            .collect()
    }
}
