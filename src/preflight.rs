//! Host tool checks run before any operation touches the filesystem.
//!
//! Missing tools would otherwise surface halfway through `generate`, after
//! the previous artifacts were already deleted.

use crate::network::{Deployment, Role};
use crate::process::docker::{DOCKER, DOCKER_COMPOSE};

/// A host binary and the package that usually provides it
pub type Tool = (&'static str, &'static str);

pub const CONTAINER_TOOLS: &[Tool] = &[(DOCKER, "docker"), (DOCKER_COMPOSE, "docker-compose")];
/// Needed by `up` to install explorer health-check cron jobs
pub const CRON_TOOLS: &[Tool] = &[("sudo", "sudo"), ("tee", "coreutils")];

#[derive(Debug, thiserror::Error)]
#[error("Missing required host tools:\n{0}")]
pub struct PreflightError(String);

pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Tools required by an action on this deployment
pub fn required_tools(deployment: &Deployment, starts_network: bool) -> Vec<Tool> {
    let mut tools = CONTAINER_TOOLS.to_vec();
    if starts_network && deployment.organizations_with(Role::Explorer).next().is_some() {
        tools.extend_from_slice(CRON_TOOLS);
    }
    tools
}

pub fn check_required_tools(tools: &[Tool]) -> Result<(), PreflightError> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .map(|(tool, package)| format!("  {} (install: {})", tool, package))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PreflightError(missing.join("\n")))
    }
}
