//! Shared fixtures: a two-organization inventory and a recording runner that
//! simulates the Fabric generators.

#![allow(dead_code)]

use fabnet::config_loader::load_deployment;
use fabnet::network::{Deployment, DeploymentOptions, Ownership};
use fabnet::process::{CommandError, CommandLine, CommandOutput, CommandRunner};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DOMAIN: &str = "example.com";
pub const LEADER_LOG: &str = "2024-01-01 INFO [orderer.consensus.etcdraft] Raft leader changed: 0 -> 1\n";

/// Two organizations; only org2 runs an explorer
pub fn inventory_yaml() -> String {
    let templates = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    format!(
        r#"all:
  vars:
    global_domain: {domain}
    global_channels:
      - name: common
        chaincode:
          name: iotcc
          version: "1.0"
    default_hl_explorer_port: 8090
    default_hl_explorer_username: admin
    default_hl_explorer_password: adminpw
    readiness:
      timeout: 2s
      interval: 10ms
  generate_vars:
    TMPL_ARTIFACTS_DIR: {artifacts}
    TMPL_DOCKER_COMPOSE_DIR: {compose}
    ARTIFACTS_DIR: artifacts
    DOCKER_COMPOSE_DIR: docker-compose
    FABRIC_VERSION: 1.4.4
    REST_API_IMAGE: example/rest-api:latest
    NETWORK: fabnet
  children:
    nodes:
      hosts:
        org1.example.com:
          org: org1
          org_ou: org1-ou
          www_port: 80
          ca_port: 7054
          couchdb_port: 5984
          node_roles: peer,orderer
        org2.example.com:
          org: org2
          org_ou: org2-ou
          www_port: 81
          ca_port: 8054
          couchdb_port: 6984
          node_roles: peer,orderer,explorer
"#,
        domain = DOMAIN,
        artifacts = templates.join("artifacts").display(),
        compose = templates.join("docker-compose").display(),
    )
}

/// Scratch working directory holding `hosts.yml`
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_inventory(&inventory_yaml())
    }

    pub fn with_inventory(yaml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hosts.yml"), yaml).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn inventory(&self) -> PathBuf {
        self.path().join("hosts.yml")
    }

    pub fn artifacts(&self) -> PathBuf {
        self.path().join("artifacts")
    }

    pub fn compose(&self) -> PathBuf {
        self.path().join("docker-compose")
    }

    pub fn deployment(&self, local: bool) -> Deployment {
        load_deployment(
            &self.inventory(),
            DeploymentOptions {
                local,
                owner: Ownership { uid: 1000, gid: 1000 },
                work_dir: self.path().to_path_buf(),
            },
        )
        .unwrap()
    }
}

/// Records every command and fakes the side effects of the generators
pub struct FakeRunner {
    artifacts_dir: PathBuf,
    commands: RefCell<Vec<CommandLine>>,
    /// Commands whose display contains this text fail
    fail_on: Option<String>,
    /// Number of `docker logs` calls before the leader marker shows up
    leader_after: usize,
    logs_calls: RefCell<usize>,
}

impl FakeRunner {
    pub fn new(artifacts_dir: PathBuf) -> Self {
        Self {
            artifacts_dir,
            commands: RefCell::new(Vec::new()),
            fail_on: None,
            leader_after: 0,
            logs_calls: RefCell::new(0),
        }
    }

    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    pub fn leader_after(mut self, calls: usize) -> Self {
        self.leader_after = calls;
        self
    }

    pub fn commands(&self) -> Vec<CommandLine> {
        self.commands.borrow().clone()
    }

    /// Display strings of every recorded command
    pub fn lines(&self) -> Vec<String> {
        self.commands.borrow().iter().map(|c| c.to_string()).collect()
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines().iter().position(|line| line.contains(needle))
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.artifacts_dir.join(relative.trim_start_matches("./"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn simulate_cryptogen(&self, config: &str) {
        if let Some(org) = config.strip_suffix("/cryptogen.yaml") {
            let base = format!("crypto-config/peerOrganizations/{}.{}", org, DOMAIN);
            self.write(&format!("{}/ca/{}-ca_sk", base, org), "ca key");
            self.write(
                &format!("{}/users/Admin@{}.{}/msp/keystore/{}-admin_sk", base, org, DOMAIN, org),
                "admin key",
            );
        } else {
            let base = format!("crypto-config/ordererOrganizations/{}", DOMAIN);
            self.write(&format!("{}/ca/orderer-ca_sk", base), "orderer ca key");
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, CommandError> {
        self.commands.borrow_mut().push(command.clone());
        let display = command.to_string();

        if let Some(pattern) = &self.fail_on {
            if display.contains(pattern.as_str()) {
                return Err(CommandError::Failed {
                    command: display,
                    status: "exit status: 1".to_string(),
                    stderr: "simulated failure".to_string(),
                });
            }
        }

        let mut output = CommandOutput {
            status: Some(0),
            ..CommandOutput::default()
        };

        for flag in ["-outputBlock", "-outputCreateChannelTx", "-outputAnchorPeersUpdate"] {
            if let Some(target) = command.arg_after(flag) {
                self.write(target, "simulated");
            }
        }

        if let Some(config) = command
            .args
            .iter()
            .find_map(|arg| arg.strip_prefix("--config="))
        {
            self.simulate_cryptogen(config);
        }

        if command.program == "docker" {
            match command.args.first().map(String::as_str) {
                Some("logs") => {
                    let mut calls = self.logs_calls.borrow_mut();
                    *calls += 1;
                    if *calls > self.leader_after {
                        output.stderr = LEADER_LOG.to_string();
                    }
                }
                Some("ps") => {
                    output.stdout = format!("c1 peer0.org1.{d}\nc2 postgres\nc3 cli.{d}\n", d = DOMAIN);
                }
                Some("volume") if command.has_arg("ls") => {
                    output.stdout = format!("explorer-db.org2.{}\nunrelated\n", DOMAIN);
                }
                Some("image") if command.has_arg("ls") => {
                    output.stdout = "i1 hyperledger/fabric-peer\n".to_string();
                }
                _ => {}
            }
        }

        Ok(output)
    }
}
