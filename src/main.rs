use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use flexi_logger::Logger;

use nbregress::harness::{DEFAULT_ROOT_DIR, USER_GUIDE_NOTEBOOKS};
use nbregress::{Harness, HarnessError, HarnessOptions, JupyterExecutor};

/// Re-execute Jupyter notebooks and fail when their outputs changed.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Notebooks to check, relative to --root. Defaults to the user-guide notebooks.
    #[arg()]
    notebooks: Vec<String>,

    /// Directory notebooks are loaded from and executed in.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_ROOT_DIR)]
    root: PathBuf,

    /// The jupyter executable used to run notebooks.
    #[arg(long, value_name = "PATH", default_value = "jupyter")]
    jupyter: PathBuf,

    /// Kernel to execute with instead of the notebook's own.
    #[arg(long, value_name = "NAME")]
    kernel: Option<String>,

    /// Additional path regex to ignore when comparing (repeatable).
    #[arg(long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// Do not ignore cell metadata and execution counters.
    #[arg(long)]
    no_default_excludes: bool,

    /// Compare outputs without masking memory addresses.
    #[arg(long)]
    no_normalize: bool,

    /// Log each step of every check.
    #[arg(short, long)]
    verbose: bool,
}

fn build_options(cli: &Cli) -> HarnessOptions {
    let defaults = HarnessOptions::default();
    let mut exclude_patterns = if cli.no_default_excludes {
        Vec::new()
    } else {
        defaults.exclude_patterns
    };
    exclude_patterns.extend(cli.exclude.iter().cloned());

    HarnessOptions {
        root: cli.root.clone(),
        exclude_patterns,
        normalize: !cli.no_normalize,
    }
}

fn run(cli: Cli) -> Result<ExitCode, ExitCode> {
    let executor = JupyterExecutor {
        program: cli.jupyter.clone(),
        kernel_name: cli.kernel.clone(),
    };

    let harness = Harness::new(build_options(&cli), executor).map_err(|e| {
        match &e {
            HarnessError::InvalidPattern(inner) => eprintln!("error: {e}: {inner}"),
            _ => eprintln!("error: {e}"),
        }
        ExitCode::from(2)
    })?;

    let names: Vec<String> = if cli.notebooks.is_empty() {
        USER_GUIDE_NOTEBOOKS.iter().map(|n| n.to_string()).collect()
    } else {
        cli.notebooks
    };

    let mut failed = 0;
    for outcome in harness.check_all(names.as_slice()) {
        match outcome.result {
            Ok(()) => println!("ok: {}", outcome.name),
            Err(e) => {
                failed += 1;
                println!("FAILED: {}", outcome.name);
                match &e {
                    HarnessError::Io(inner) => eprintln!("error: {}: {e}: {inner}", outcome.name),
                    HarnessError::EngineUnavailable { source, .. } => {
                        eprintln!("error: {}: {e}: {source}", outcome.name)
                    }
                    _ => eprintln!("error: {}: {e}", outcome.name),
                }
            }
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} notebook(s) failed", names.len());
        Err(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let _logger = match Logger::try_with_env_or_str(level).and_then(|l| l.log_to_stderr().start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("warning: logging disabled: {e}");
            None
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(code) => code,
    }
}
