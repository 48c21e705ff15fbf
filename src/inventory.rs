use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level inventory document (`hosts.yml`)
#[derive(Debug, Deserialize)]
pub struct Inventory {
    pub all: InventoryRoot,
}

/// The `all` group: global vars, generation vars and the node hosts
#[derive(Debug, Deserialize)]
pub struct InventoryRoot {
    pub vars: GlobalVars,
    pub generate_vars: GenerateVars,
    pub children: Children,
}

/// Network-wide settings shared by every organization
#[derive(Debug, Deserialize)]
pub struct GlobalVars {
    pub global_domain: String,
    pub global_channels: Vec<ChannelEntry>,
    pub default_hl_explorer_port: u16,
    pub default_hl_explorer_username: String,
    pub default_hl_explorer_password: String,
    #[serde(default = "default_healthcheck_schedule")]
    pub explorer_healthcheck_schedule: String,
    #[serde(default)]
    pub readiness: ReadinessSettings,
}

/// Channel declaration with its chaincode
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    pub chaincode: ChaincodeEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChaincodeEntry {
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
}

/// Paths and image pins used while generating artifacts
#[derive(Debug, Deserialize)]
pub struct GenerateVars {
    #[serde(rename = "TMPL_ARTIFACTS_DIR")]
    pub template_artifacts_dir: PathBuf,
    #[serde(rename = "TMPL_DOCKER_COMPOSE_DIR")]
    pub template_compose_dir: PathBuf,
    #[serde(rename = "ARTIFACTS_DIR")]
    pub artifacts_dir: PathBuf,
    #[serde(rename = "DOCKER_COMPOSE_DIR")]
    pub compose_dir: PathBuf,
    #[serde(rename = "FABRIC_VERSION", deserialize_with = "scalar_string")]
    pub fabric_version: String,
    #[serde(rename = "REST_API_IMAGE")]
    pub rest_api_image: String,
    #[serde(rename = "NETWORK")]
    pub network: String,
}

#[derive(Debug, Deserialize)]
pub struct Children {
    pub nodes: NodeGroup,
}

/// Node hosts, kept in declaration order
#[derive(Debug, Deserialize)]
pub struct NodeGroup {
    #[serde(deserialize_with = "ordered_hosts")]
    pub hosts: Vec<Host>,
}

/// A single inventory host with its organization entry
#[derive(Debug, Clone)]
pub struct Host {
    pub key: String,
    pub entry: HostEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostEntry {
    pub org: String,
    pub org_ou: String,
    pub www_port: u16,
    pub ca_port: u16,
    pub couchdb_port: u16,
    pub node_roles: RoleList,
    /// Explicit position used for port derivation; overrides declaration order
    #[serde(default)]
    pub ordinal: Option<usize>,
}

/// Roles given either as a YAML list or as a comma-separated string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RoleList {
    List(Vec<String>),
    Csv(String),
}

impl RoleList {
    /// Role names with surrounding whitespace removed and blanks dropped
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            RoleList::List(items) => items.iter().map(String::as_str).collect(),
            RoleList::Csv(s) => s.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Bounded polling settings used instead of fixed sleeps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessSettings {
    #[serde(with = "humantime_serde", default = "default_readiness_timeout")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_readiness_interval")]
    pub interval: Duration,
    /// Orderer log line that signals a completed leader election
    #[serde(default = "default_leader_marker")]
    pub leader_marker: String,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout: default_readiness_timeout(),
            interval: default_readiness_interval(),
            leader_marker: default_leader_marker(),
        }
    }
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_readiness_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_leader_marker() -> String {
    "Raft leader changed".to_string()
}

fn default_healthcheck_schedule() -> String {
    "0 */3 * * *".to_string()
}

/// Inventory loading and derivation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read inventory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed inventory {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Required value `{0}` is empty")]
    EmptyValue(&'static str),
    #[error("`readiness.interval` must be greater than zero")]
    ZeroReadinessInterval,
    #[error("No channels declared in `global_channels`")]
    NoChannels,
    #[error("No organizations declared under `children.nodes.hosts`")]
    NoOrganizations,
    #[error("Unknown role `{role}` for organization {org}")]
    UnknownRole { org: String, role: String },
    #[error("Organization {0} is declared more than once")]
    DuplicateOrganization(String),
    #[error("Either every host or no host may set `ordinal` (missing on {0})")]
    PartialOrdinals(String),
    #[error("Ordinal {ordinal} is used by both {first} and {second}")]
    DuplicateOrdinal {
        ordinal: usize,
        first: String,
        second: String,
    },
    #[error("Ordinal {ordinal} on {host} is out of range: {count} hosts need ordinals 0..{count}")]
    OrdinalOutOfRange {
        ordinal: usize,
        host: String,
        count: usize,
    },
    #[error("Derived ports for organization {org} (n = {n}) exceed the port range")]
    PortOverflow { org: String, n: usize },
}

impl Inventory {
    /// Validate the values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vars = &self.all.vars;
        let gen = &self.all.generate_vars;

        require(&vars.global_domain, "global_domain")?;
        require(&gen.network, "NETWORK")?;
        require(&gen.fabric_version, "FABRIC_VERSION")?;

        if vars.readiness.interval.is_zero() {
            return Err(ConfigError::ZeroReadinessInterval);
        }
        require(&vars.readiness.leader_marker, "readiness.leader_marker")?;

        if vars.global_channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        for channel in &vars.global_channels {
            require(&channel.name, "global_channels.name")?;
            require(&channel.chaincode.name, "global_channels.chaincode.name")?;
            require(&channel.chaincode.version, "global_channels.chaincode.version")?;
        }

        for host in &self.all.children.nodes.hosts {
            require(&host.entry.org, "org")?;
        }

        Ok(())
    }

    pub fn vars(&self) -> &GlobalVars {
        &self.all.vars
    }

    pub fn generate_vars(&self) -> &GenerateVars {
        &self.all.generate_vars
    }

    pub fn hosts(&self) -> &[Host] {
        &self.all.children.nodes.hosts
    }
}

fn require(value: &str, key: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key));
    }
    Ok(())
}

/// Accept strings, numbers and booleans for version-like fields
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

fn ordered_hosts<'de, D>(deserializer: D) -> Result<Vec<Host>, D::Error>
where
    D: Deserializer<'de>,
{
    struct HostsVisitor;

    impl<'de> Visitor<'de> for HostsVisitor {
        type Value = Vec<Host>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of host names to organization entries")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut hosts = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, entry)) = map.next_entry::<String, HostEntry>()? {
                hosts.push(Host { key, entry });
            }
            Ok(hosts)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(HostsVisitor)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TWO_ORGS: &str = r#"
all:
  vars:
    global_domain: example.com
    global_channels:
      - name: common
        chaincode:
          name: iotcc
          version: 1.0
    default_hl_explorer_port: 8090
    default_hl_explorer_username: admin
    default_hl_explorer_password: adminpw
  generate_vars:
    TMPL_ARTIFACTS_DIR: templates/artifacts
    TMPL_DOCKER_COMPOSE_DIR: templates/docker-compose
    ARTIFACTS_DIR: artifacts
    DOCKER_COMPOSE_DIR: docker-compose
    FABRIC_VERSION: 1.4.4
    REST_API_IMAGE: example/rest-api:latest
    NETWORK: fabnet
  children:
    nodes:
      hosts:
        zeta.example.com:
          org: org1
          org_ou: org1-ou
          www_port: 80
          ca_port: 7054
          couchdb_port: 5984
          node_roles: "peer,orderer"
        alpha.example.com:
          org: org2
          org_ou: org2-ou
          www_port: 81
          ca_port: 8054
          couchdb_port: 6984
          node_roles: [peer, orderer, explorer]
"#;

    #[test]
    fn test_inventory_parsing_keeps_declaration_order() {
        let inventory: Inventory = serde_yaml::from_str(TWO_ORGS).unwrap();
        assert!(inventory.validate().is_ok());

        let orgs: Vec<&str> = inventory.hosts().iter().map(|h| h.entry.org.as_str()).collect();
        assert_eq!(orgs, vec!["org1", "org2"]);
        assert_eq!(inventory.hosts()[0].key, "zeta.example.com");
        assert_eq!(inventory.vars().global_channels[0].chaincode.version, "1.0");
        assert_eq!(inventory.generate_vars().fabric_version, "1.4.4");
    }

    #[test]
    fn test_role_list_forms() {
        let csv = RoleList::Csv("peer, orderer,,explorer ".to_string());
        assert_eq!(csv.names(), vec!["peer", "orderer", "explorer"]);

        let list = RoleList::List(vec!["peer".to_string(), " ".to_string()]);
        assert_eq!(list.names(), vec!["peer"]);
    }

    #[test]
    fn test_readiness_defaults_and_overrides() {
        let inventory: Inventory = serde_yaml::from_str(TWO_ORGS).unwrap();
        assert_eq!(inventory.vars().readiness, ReadinessSettings::default());
        assert_eq!(inventory.vars().explorer_healthcheck_schedule, "0 */3 * * *");

        let yaml = TWO_ORGS.replace(
            "    default_hl_explorer_port: 8090\n",
            "    default_hl_explorer_port: 8090\n    readiness:\n      timeout: 90s\n      interval: 500ms\n",
        );
        let inventory: Inventory = serde_yaml::from_str(&yaml).unwrap();
        let readiness = &inventory.vars().readiness;
        assert_eq!(readiness.timeout, Duration::from_secs(90));
        assert_eq!(readiness.interval, Duration::from_millis(500));
        assert_eq!(readiness.leader_marker, "Raft leader changed");
    }

    #[test]
    fn test_missing_domain_is_rejected() {
        let yaml = TWO_ORGS.replace("    global_domain: example.com\n", "");
        let err = serde_yaml::from_str::<Inventory>(&yaml).unwrap_err();
        assert!(err.to_string().contains("global_domain"));
    }

    #[test]
    fn test_validation_errors() {
        let yaml = TWO_ORGS.replace("global_domain: example.com", "global_domain: \"\"");
        let inventory: Inventory = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            inventory.validate(),
            Err(ConfigError::EmptyValue("global_domain"))
        ));

        let yaml = TWO_ORGS.replace(
            "    global_channels:\n      - name: common\n        chaincode:\n          name: iotcc\n          version: 1.0\n",
            "    global_channels: []\n",
        );
        let inventory: Inventory = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(inventory.validate(), Err(ConfigError::NoChannels)));
    }

    #[test]
    fn test_readiness_validation() {
        let with_readiness = |block: &str| {
            TWO_ORGS.replace(
                "    default_hl_explorer_port: 8090\n",
                &format!("    default_hl_explorer_port: 8090\n    readiness:\n{}", block),
            )
        };

        let yaml = with_readiness("      interval: 0s\n");
        let inventory: Inventory = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            inventory.validate(),
            Err(ConfigError::ZeroReadinessInterval)
        ));

        let yaml = with_readiness("      leader_marker: \"\"\n");
        let inventory: Inventory = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            inventory.validate(),
            Err(ConfigError::EmptyValue("readiness.leader_marker"))
        ));

        let yaml = with_readiness("      interval: 250ms\n");
        let inventory: Inventory = serde_yaml::from_str(&yaml).unwrap();
        inventory.validate().unwrap();
    }
}
