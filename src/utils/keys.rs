//! Private key copies expected by the CA and peer containers.
//!
//! cryptogen names private keys `<hash>_sk`; the containers read a fixed
//! `server.key` next to them.

use color_eyre::eyre::{Result, WrapErr};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SERVER_KEY: &str = "server.key";

/// Copy every `**/ca/*_sk*` to `server.key` in the same directory
pub fn copy_ca_keys(artifacts_dir: &Path) -> Result<usize> {
    let keys = find_files(artifacts_dir, |path, name| {
        name.contains("_sk")
            && path
                .parent()
                .and_then(Path::file_name)
                .map_or(false, |dir| dir == "ca")
    })?;
    copy_to_server_key(&keys)
}

/// Copy every `*_sk` file to `server.key` in the same directory
pub fn copy_private_keys(artifacts_dir: &Path) -> Result<usize> {
    let keys = find_files(artifacts_dir, |_, name| name.ends_with("_sk"))?;
    copy_to_server_key(&keys)
}

fn find_files<F>(root: &Path, matches: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path, &str) -> bool,
{
    let mut found = Vec::new();
    if !root.exists() {
        return Ok(found);
    }
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.wrap_err_with(|| format!("Failed to walk {:?}", root))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if matches(entry.path(), &name) {
            found.push(entry.path().to_path_buf());
        }
    }
    Ok(found)
}

fn copy_to_server_key(keys: &[PathBuf]) -> Result<usize> {
    for key in keys {
        let Some(dir) = key.parent() else {
            continue;
        };
        let target = dir.join(SERVER_KEY);
        debug!("Copy {} to {}", key.display(), target.display());
        fs::copy(key, &target)
            .wrap_err_with(|| format!("Failed to copy {:?} to {:?}", key, target))?;
    }
    if !keys.is_empty() {
        info!("Copied {} private key(s) to {}", keys.len(), SERVER_KEY);
    }
    Ok(keys.len())
}
