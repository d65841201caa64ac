use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// `llc -filetype=obj`, next to the `.ll` file.
pub fn emit_object(ll: &Path, target: Option<&str>) -> Result<PathBuf> {
    let llc = which::which("llc").context("`llc` not found in PATH (install LLVM)")?;
    let obj = ll.with_extension("o");
    let mut cmd = Command::new(llc);
    cmd.arg("-filetype=obj");
    if let Some(triple) = target {
        cmd.arg(format!("-mtriple={triple}"));
    }
    cmd.arg("-o").arg(&obj).arg(ll);
    execute(cmd)?;
    Ok(obj)
}

/// Links against the C library with the first driver found among `cc`,
/// `clang` and `gcc`.
pub fn link_executable(obj: &Path) -> Result<PathBuf> {
    let linker = ["cc", "clang", "gcc"]
        .iter()
        .find_map(|name| which::which(name).ok())
        .context("no C compiler driver (cc, clang or gcc) found in PATH")?;
    let exe = obj.with_extension(std::env::consts::EXE_EXTENSION);
    let mut cmd = Command::new(linker);
    cmd.arg("-o").arg(&exe).arg(obj);
    execute(cmd)?;
    Ok(exe)
}

fn execute(mut cmd: Command) -> Result<()> {
    debug!(command = ?cmd, "running");
    let output = cmd.output().with_context(|| format!("failed to start {cmd:?}"))?;
    if !output.status.success() {
        bail!(
            "{cmd:?} exited with {}:\n{}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }
    Ok(())
}
