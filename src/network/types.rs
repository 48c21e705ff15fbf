//! Resolved network model types.
//!
//! These are built once from the inventory and never mutated afterwards.
//! Their serialized form is what templates see, so field names follow the
//! inventory's spelling.

use crate::inventory::ConfigError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Base port of peer0 for the organization with `n = 0`
pub const PEER0_BASE_PORT: u16 = 7051;
/// Base event port of peer0 for the organization with `n = 0`
pub const PEER0_EVENT_BASE_PORT: u16 = 7053;
/// Port offset between consecutive organizations
pub const PORT_STRIDE: usize = 1000;
/// Orderer listen port inside the network
pub const ORDERER_PORT: u16 = 7050;

/// Service role an organization runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Peer,
    Orderer,
    Explorer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Peer => "peer",
            Role::Orderer => "orderer",
            Role::Explorer => "explorer",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "peer" => Ok(Role::Peer),
            "orderer" => Ok(Role::Orderer),
            "explorer" => Ok(Role::Explorer),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved organization record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Organization {
    pub name: String,
    pub org_ou: String,
    pub www_port: u16,
    pub ca_port: u16,
    pub couchdb_port: u16,
    #[serde(rename = "node_roles")]
    pub roles: Vec<Role>,
    /// Ordinal used to offset per-organization ports
    pub n: usize,
    #[serde(rename = "PEER0_PORT")]
    pub peer0_port: u16,
    #[serde(rename = "PEER0_EVENT_PORT")]
    pub peer0_event_port: u16,
}

impl Organization {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Membership service provider identifier, e.g. `org1MSP`
    pub fn msp_id(&self) -> String {
        format!("{}MSP", self.name)
    }

    /// Per-organization CLI container, e.g. `cli.org1.example.com`
    pub fn cli_container(&self, domain: &str) -> String {
        format!("cli.{}.{}", self.name, domain)
    }

    /// In-network address of the organization's first peer
    pub fn peer0_address(&self, domain: &str) -> String {
        format!("peer0.{}.{}:{}", self.name, domain, PEER0_BASE_PORT)
    }

    pub fn explorer_container(&self, domain: &str) -> String {
        format!("explorer.{}.{}", self.name, domain)
    }

    pub fn explorer_db_container(&self, domain: &str) -> String {
        format!("explorer-db.{}.{}", self.name, domain)
    }
}

/// Derive `base + PORT_STRIDE * n`, or `None` when it leaves the port range
pub fn derive_port(base: u16, n: usize) -> Option<u16> {
    let port = n.checked_mul(PORT_STRIDE)?.checked_add(base as usize)?;
    u16::try_from(port).ok()
}

/// Parse role names for one organization
pub fn parse_roles(org: &str, names: &[String]) -> Result<Vec<Role>, ConfigError> {
    let mut roles = Vec::with_capacity(names.len());
    for name in names {
        let role = name.parse::<Role>().map_err(|role| ConfigError::UnknownRole {
            org: org.to_string(),
            role,
        })?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chaincode {
    pub name: String,
    pub version: String,
}

/// A channel and the chaincode attached to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSpec {
    pub name: String,
    pub chaincode: Chaincode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerSettings {
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Cron schedule of the explorer health-check job
    pub healthcheck_schedule: String,
}

/// Template sources and generated output locations
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPaths {
    pub template_artifacts_dir: PathBuf,
    pub template_compose_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub compose_dir: PathBuf,
}

impl GenerationPaths {
    pub fn org_artifacts_dir(&self, org: &str) -> PathBuf {
        self.artifacts_dir.join(org)
    }

    pub fn org_compose_dir(&self, org: &str) -> PathBuf {
        self.compose_dir.join(org)
    }

    /// Shared directory for the genesis block and channel transactions
    pub fn channel_dir(&self) -> PathBuf {
        self.artifacts_dir.join("channel")
    }

    pub fn artifact_template(&self, name: &str) -> PathBuf {
        self.template_artifacts_dir.join(name)
    }

    pub fn compose_template(&self, name: &str) -> PathBuf {
        self.template_compose_dir.join(name)
    }
}

/// User and group that generated files are handed back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    /// Real uid/gid of the running process
    pub fn current() -> Self {
        // SAFETY: getuid/getgid have no preconditions and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self { uid, gid }
    }

    /// `uid:gid` as accepted by chown
    pub fn chown_spec(&self) -> String {
        format!("{}:{}", self.uid, self.gid)
    }
}
