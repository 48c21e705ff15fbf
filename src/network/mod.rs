//! Derived network configuration.
//!
//! Expands the raw inventory into the immutable [`Deployment`] model every
//! operation receives: resolved organizations with their ordinals and ports,
//! the active channel, and the endorsement policy. Run options that used to be
//! process-wide state (the local compose variant, the compose project name,
//! the owner of generated files) live here as plain fields.

pub mod policy;
pub mod types;

pub use policy::EndorsementPolicy;
pub use types::{
    derive_port, Chaincode, ChannelSpec, ExplorerSettings, GenerationPaths, Organization,
    Ownership, Role, ORDERER_PORT, PEER0_BASE_PORT, PEER0_EVENT_BASE_PORT,
};

use crate::inventory::{ConfigError, Host, Inventory, ReadinessSettings};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Network-wide settings resolved from the inventory
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub domain: String,
    /// Compose project and docker network name
    pub network: String,
    pub channels: Vec<ChannelSpec>,
    pub paths: GenerationPaths,
    pub fabric_version: String,
    pub rest_api_image: String,
    pub explorer: ExplorerSettings,
    pub readiness: ReadinessSettings,
}

/// Per-run options supplied by the caller rather than the inventory
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentOptions {
    /// Render and start the `local-peer.yaml` compose overlay
    pub local: bool,
    pub owner: Ownership,
    /// Directory relative inventory paths are resolved against
    pub work_dir: PathBuf,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            local: false,
            owner: Ownership::current(),
            work_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Everything an operation needs, built once and read-only afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub network: NetworkConfig,
    pub organizations: Vec<Organization>,
    /// The channel this tool operates on (first declared)
    pub channel: ChannelSpec,
    pub policy: EndorsementPolicy,
    pub local: bool,
    pub owner: Ownership,
    pub work_dir: PathBuf,
}

impl Deployment {
    pub fn from_inventory(
        inventory: &Inventory,
        options: DeploymentOptions,
    ) -> Result<Self, ConfigError> {
        inventory.validate()?;

        let vars = inventory.vars();
        let gen = inventory.generate_vars();

        let organizations = build_organizations(inventory.hosts())?;
        let policy = EndorsementPolicy::any_peer_of(&organizations)?;

        let channels: Vec<ChannelSpec> = vars
            .global_channels
            .iter()
            .map(|c| ChannelSpec {
                name: c.name.clone(),
                chaincode: Chaincode {
                    name: c.chaincode.name.clone(),
                    version: c.chaincode.version.clone(),
                },
            })
            .collect();
        let channel = channels.first().cloned().ok_or(ConfigError::NoChannels)?;

        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                options.work_dir.join(p)
            }
        };

        let network = NetworkConfig {
            domain: vars.global_domain.clone(),
            network: gen.network.clone(),
            channels,
            paths: GenerationPaths {
                template_artifacts_dir: resolve(&gen.template_artifacts_dir),
                template_compose_dir: resolve(&gen.template_compose_dir),
                artifacts_dir: resolve(&gen.artifacts_dir),
                compose_dir: resolve(&gen.compose_dir),
            },
            fabric_version: gen.fabric_version.clone(),
            rest_api_image: gen.rest_api_image.clone(),
            explorer: ExplorerSettings {
                port: vars.default_hl_explorer_port,
                username: vars.default_hl_explorer_username.clone(),
                password: vars.default_hl_explorer_password.clone(),
                healthcheck_schedule: vars.explorer_healthcheck_schedule.clone(),
            },
            readiness: vars.readiness.clone(),
        };

        info!(
            "Derived network {} for domain {} with {} organization(s), channel {}",
            network.network,
            network.domain,
            organizations.len(),
            channel.name
        );
        debug!("Endorsement policy: {}", policy);

        Ok(Self {
            network,
            organizations,
            channel,
            policy,
            local: options.local,
            owner: options.owner,
            work_dir: options.work_dir,
        })
    }

    pub fn domain(&self) -> &str {
        &self.network.domain
    }

    pub fn paths(&self) -> &GenerationPaths {
        &self.network.paths
    }

    pub fn org_names(&self) -> Vec<String> {
        self.organizations.iter().map(|o| o.name.clone()).collect()
    }

    pub fn organizations_with(&self, role: Role) -> impl Iterator<Item = &Organization> {
        self.organizations.iter().filter(move |o| o.has_role(role))
    }

    /// Domain-level utility container used for crypto generation
    pub fn cli_container(&self) -> String {
        format!("cli.{}", self.network.domain)
    }

    pub fn orderer_container(&self, n: usize) -> String {
        format!("orderer{}.{}", n, self.network.domain)
    }

    /// Orderer all channel operations are sent to
    pub fn orderer_address(&self) -> String {
        format!("{}:{}", self.orderer_container(0), ORDERER_PORT)
    }
}

/// Resolve organizations in ordinal order with their derived ports
///
/// Without explicit ordinals, `n` is the declaration position. With them,
/// every host must carry one and together they must be exactly `0..N`.
pub fn build_organizations(hosts: &[Host]) -> Result<Vec<Organization>, ConfigError> {
    if hosts.is_empty() {
        return Err(ConfigError::NoOrganizations);
    }

    let explicit = hosts.iter().filter(|h| h.entry.ordinal.is_some()).count();
    let mut ordered: Vec<(usize, &Host)> = if explicit == 0 {
        hosts.iter().enumerate().collect()
    } else {
        let mut seen: HashMap<usize, &str> = HashMap::new();
        let mut ordered = Vec::with_capacity(hosts.len());
        for host in hosts {
            let n = host
                .entry
                .ordinal
                .ok_or_else(|| ConfigError::PartialOrdinals(host.key.clone()))?;
            // Orderer names and the leader wait assume a dense 0..N numbering.
            if n >= hosts.len() {
                return Err(ConfigError::OrdinalOutOfRange {
                    ordinal: n,
                    host: host.key.clone(),
                    count: hosts.len(),
                });
            }
            if let Some(first) = seen.insert(n, host.key.as_str()) {
                return Err(ConfigError::DuplicateOrdinal {
                    ordinal: n,
                    first: first.to_string(),
                    second: host.key.clone(),
                });
            }
            ordered.push((n, host));
        }
        ordered
    };
    ordered.sort_by_key(|(n, _)| *n);

    let mut names: HashSet<&str> = HashSet::new();
    let mut organizations = Vec::with_capacity(ordered.len());
    for (n, host) in ordered {
        let entry = &host.entry;
        if !names.insert(entry.org.as_str()) {
            return Err(ConfigError::DuplicateOrganization(entry.org.clone()));
        }

        let overflow = || ConfigError::PortOverflow {
            org: entry.org.clone(),
            n,
        };
        let peer0_port = derive_port(PEER0_BASE_PORT, n).ok_or_else(overflow)?;
        let peer0_event_port = derive_port(PEER0_EVENT_BASE_PORT, n).ok_or_else(overflow)?;

        organizations.push(Organization {
            name: entry.org.clone(),
            org_ou: entry.org_ou.clone(),
            www_port: entry.www_port,
            ca_port: entry.ca_port,
            couchdb_port: entry.couchdb_port,
            roles: types::parse_roles(&entry.org, &entry.node_roles.names())?,
            n,
            peer0_port,
            peer0_event_port,
        });
    }

    Ok(organizations)
}
