#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Golden fixture with an object repr in a stream and an execute result.
pub const FIXTURE_ROOT: &str = "tests/fixtures";
pub const OBJECT_REPR_NOTEBOOK: &str = "object_repr.ipynb";

/// The address recorded in the fixture's outputs.
pub const RECORDED_ADDRESS: &str = "0x7f3a2c1d5e90";

/// Write a stand-in `jupyter` executable that runs `body` as a shell script.
///
/// The script receives the notebook JSON on stdin and must print the
/// "executed" notebook on stdout, like `jupyter nbconvert --stdin --stdout`.
#[cfg(unix)]
pub fn fake_jupyter(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("jupyter");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// An engine that reproduces the golden outputs except for the address.
#[cfg(unix)]
pub fn relocating_jupyter(dir: &Path) -> PathBuf {
    fake_jupyter(dir, &format!("sed 's/{RECORDED_ADDRESS}/0x55d1e2f3a4b0/g'"))
}

/// An engine whose output text genuinely differs from the golden notebook.
#[cfg(unix)]
pub fn drifting_jupyter(dir: &Path) -> PathBuf {
    fake_jupyter(dir, "sed 's/Hello from/Goodbye from/'")
}

/// An engine that fails the way nbconvert does when a cell raises.
#[cfg(unix)]
pub fn failing_jupyter(dir: &Path) -> PathBuf {
    fake_jupyter(
        dir,
        "cat > /dev/null\necho 'ZeroDivisionError: division by zero' >&2\nexit 1",
    )
}
