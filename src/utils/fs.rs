//! Filesystem helpers for the generated trees.

use color_eyre::eyre::{Result, WrapErr};
use log::info;
use std::fs;
use std::path::Path;

/// Delete `dir` recursively; a missing directory is not an error
pub fn remove_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        info!("Removing {}", dir.display());
        fs::remove_dir_all(dir).wrap_err_with(|| format!("Failed to remove {:?}", dir))?;
    }
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {:?}", dir))
}

/// Set unix permission bits, e.g. `0o755`
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .wrap_err_with(|| format!("Failed to stat {:?}", path))?
            .permissions();
        perms.set_mode(mode);
        fs::set_permissions(path, perms)
            .wrap_err_with(|| format!("Failed to chmod {:?}", path))?;
    }
    #[cfg(not(unix))]
    let _ = (path, mode);
    Ok(())
}
