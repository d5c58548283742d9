use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::HarnessError;
use crate::notebook::Notebook;

/// An engine that runs the code cells of a notebook.
///
/// [`Harness::check`](crate::Harness::check) calls the engine while it holds
/// the working-directory guard, so an engine must not start another check or
/// enter a [`WorkingDirectory`](crate::workdir::WorkingDirectory) itself; doing
/// so fails with [`HarnessError::NestedWorkingDirectory`].
pub trait Executor {
    /// Execute every code cell in order, replacing outputs and execution
    /// counters in place. Errors raised by notebook code are returned as-is.
    fn execute(&self, notebook: &mut Notebook) -> Result<(), HarnessError>;
}

impl<F> Executor for F
where
    F: Fn(&mut Notebook) -> Result<(), HarnessError>,
{
    fn execute(&self, notebook: &mut Notebook) -> Result<(), HarnessError> {
        self(notebook)
    }
}

/// Executes notebooks with `jupyter nbconvert --execute`.
///
/// The notebook is piped through the subprocess, which inherits the current
/// working directory, so relative paths inside the notebook resolve against
/// the directory the harness changed into.
#[derive(Debug, Clone)]
pub struct JupyterExecutor {
    /// The `jupyter` program to invoke.
    pub program: PathBuf,
    /// Kernel to run instead of the one recorded in the notebook.
    pub kernel_name: Option<String>,
}

impl Default for JupyterExecutor {
    fn default() -> Self {
        Self {
            program: PathBuf::from("jupyter"),
            kernel_name: None,
        }
    }
}

impl JupyterExecutor {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "nbconvert",
            "--to",
            "notebook",
            "--execute",
            "--stdin",
            "--stdout",
        ]);
        if let Some(kernel) = &self.kernel_name {
            cmd.arg(format!("--ExecutePreprocessor.kernel_name={kernel}"));
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Executor for JupyterExecutor {
    fn execute(&self, notebook: &mut Notebook) -> Result<(), HarnessError> {
        let input = notebook.to_vec()?;

        let mut child = self
            .command()
            .spawn()
            .map_err(|source| HarnessError::EngineUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        // Feed stdin from another thread so a large notebook cannot deadlock
        // against a full stdout pipe.
        let stdin = child.stdin.take();
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input)?;
            }
            Ok(())
        });

        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));

        if !output.status.success() {
            return Err(HarnessError::Execution {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        written?;

        *notebook = Notebook::from_slice(&output.stdout)?;
        Ok(())
    }
}
