/// Errors that can occur while checking a notebook.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("malformed notebook: {reason}")]
    MalformedNotebook { reason: String },

    #[error("unsupported nbformat version: {found}")]
    UnsupportedVersion { found: String },

    #[error("invalid exclusion pattern")]
    InvalidPattern(#[from] regex::Error),

    #[error("working directory already changed on this thread; cannot enter {}", dir.display())]
    NestedWorkingDirectory { dir: std::path::PathBuf },

    #[error("failed to start execution engine `{program}`")]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notebook execution failed ({status}):\n{stderr}")]
    Execution { status: String, stderr: String },

    #[error("notebook changed - diff:\n{report}")]
    NotebookChanged { name: String, report: String },
}
