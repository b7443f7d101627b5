pub mod fortran;
pub mod python;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Fortran-side name of an opaque handle type (`MSH_MESH` -> `msh_mesh`).
pub fn fortran_type_name(handle: &str) -> String {
    handle.to_lowercase()
}

/// Write one generated file. The content lands in a sibling temp file first
/// and is renamed over the destination, so a failed run never leaves a
/// half-written module behind.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    fs::write(tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(tmp, path)
        .with_context(|| format!("failed to move output into place at {}", path.display()))?;
    Ok(())
}
