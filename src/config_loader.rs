use crate::inventory::{ConfigError, Inventory};
use crate::network::{Deployment, DeploymentOptions};
use log::{debug, info};
use std::fs::File;
use std::path::Path;

/// Load, parse and validate an inventory file
pub fn load_inventory(inventory_path: &Path) -> Result<Inventory, ConfigError> {
    info!("Loading inventory from: {:?}", inventory_path);

    let file = File::open(inventory_path).map_err(|source| ConfigError::Io {
        path: inventory_path.to_path_buf(),
        source,
    })?;

    let inventory: Inventory =
        serde_yaml::from_reader(file).map_err(|source| ConfigError::Parse {
            path: inventory_path.to_path_buf(),
            source,
        })?;

    inventory.validate()?;

    debug!(
        "Inventory declares {} host(s) and {} channel(s)",
        inventory.hosts().len(),
        inventory.vars().global_channels.len()
    );

    Ok(inventory)
}

/// Load an inventory and derive the immutable deployment model from it
///
/// Nothing is written and no command is issued before this returns `Ok`.
pub fn load_deployment(
    inventory_path: &Path,
    options: DeploymentOptions,
) -> Result<Deployment, ConfigError> {
    let inventory = load_inventory(inventory_path)?;
    Deployment::from_inventory(&inventory, options)
}
