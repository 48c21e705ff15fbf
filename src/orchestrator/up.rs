use super::Orchestrator;
use crate::network::{Organization, Role};
use crate::process::{docker, fabric, CommandLine};
use crate::readiness::Readiness;
use color_eyre::eyre::{Result, WrapErr};
use log::{info, warn};
use std::path::PathBuf;

const CREATE_DB_SCRIPT: &str = "/opt/createdb.sh";

impl Orchestrator<'_> {
    /// Start every organization and wire the channel and chaincode
    pub fn up(&self) -> Result<()> {
        let deployment = self.deployment;
        let channel = &deployment.channel;

        for org in &deployment.organizations {
            self.start_organization(org)?;
        }

        self.wait_for_leader()?;

        for org in &deployment.organizations {
            self.install_chaincode(org)?;
        }

        let (first, rest) = deployment
            .organizations
            .split_first()
            .ok_or_else(|| color_eyre::eyre::eyre!("No organizations to start"))?;
        self.create_channel(first)?;
        self.join_channel(first)?;
        self.instantiate_chaincode(first)?;

        for org in rest {
            self.join_channel(org)?;
        }

        for org in deployment.organizations_with(Role::Explorer) {
            self.start_explorer(org)?;
        }

        info!(
            "Network {} is up: channel {} with chaincode {} {}",
            deployment.domain(),
            channel.name,
            channel.chaincode.name,
            channel.chaincode.version
        );
        Ok(())
    }

    /// Compose files started for an organization's peer services
    pub(crate) fn peer_compose_files(&self, org: &Organization) -> Vec<PathBuf> {
        let compose_dir = self.deployment.paths().org_compose_dir(&org.name);
        let mut files = vec![compose_dir.join("peer.yaml")];
        if self.deployment.local {
            files.push(compose_dir.join("local-peer.yaml"));
        }
        files
    }

    fn start_organization(&self, org: &Organization) -> Result<()> {
        let files = self.peer_compose_files(org);
        info!("Starting docker instances from {:?}", files);
        self.compose_up(&files, &[])?;

        let orderer = self.deployment.paths().org_compose_dir(&org.name).join("orderer.yaml");
        info!("Starting docker instances from {}", orderer.display());
        self.compose_up(&[orderer], &[])?;
        Ok(())
    }

    fn readiness(&self) -> Readiness {
        Readiness::from(&self.deployment.network.readiness)
    }

    /// Block until the ordering service has elected a leader
    fn wait_for_leader(&self) -> Result<()> {
        if self.runner.is_simulated() {
            info!("Skipping leader election wait");
            return Ok(());
        }
        let orderer = self.deployment.orderer_container(0);
        let marker = &self.deployment.network.readiness.leader_marker;
        let logs = docker::logs(&orderer);

        self.readiness()
            .wait_until(&format!("leader election on {}", orderer), || {
                self.runner
                    .run(&logs)
                    .map(|output| output.combined().contains(marker.as_str()))
            })
            .wrap_err("Ordering service did not become ready")
    }

    fn install_chaincode(&self, org: &Organization) -> Result<()> {
        let domain = self.deployment.domain();
        let chaincode = &self.deployment.channel.chaincode;
        info!(
            "Installing chaincode {} version {} on peers of {}",
            chaincode.name, chaincode.version, org.name
        );
        self.run_in(
            &org.cli_container(domain),
            &fabric::chaincode_install(&org.peer0_address(domain), chaincode),
        )?;
        Ok(())
    }

    fn create_channel(&self, org: &Organization) -> Result<()> {
        let deployment = self.deployment;
        let cli = org.cli_container(deployment.domain());
        let channel = &deployment.channel.name;
        let orderer = deployment.orderer_address();

        info!("Creating channel {} by {} using {}", channel, org.name, cli);
        self.run_in(&cli, &fabric::channel_create(&orderer, channel))?;
        self.run_in(&cli, &fabric::channel_update_anchors(&orderer, channel, &org.name))?;

        info!("Changing ownership of channel block files");
        self.run_in(&cli, &fabric::chown(&deployment.owner))?;
        Ok(())
    }

    fn join_channel(&self, org: &Organization) -> Result<()> {
        let domain = self.deployment.domain();
        let channel = &self.deployment.channel.name;
        info!("Joining channel {} by all peers of {}", channel, org.name);
        self.run_in(
            &org.cli_container(domain),
            &fabric::channel_join(&org.peer0_address(domain), channel),
        )?;
        Ok(())
    }

    fn instantiate_chaincode(&self, org: &Organization) -> Result<()> {
        let deployment = self.deployment;
        let domain = deployment.domain();
        let channel = &deployment.channel;
        info!(
            "Instantiating chaincode {} on {} by {} with policy {}",
            channel.chaincode.name, channel.name, org.name, deployment.policy
        );
        self.run_in(
            &org.cli_container(domain),
            &fabric::chaincode_instantiate(
                &org.peer0_address(domain),
                &deployment.orderer_address(),
                &channel.name,
                &channel.chaincode,
                &deployment.policy,
            ),
        )?;
        Ok(())
    }

    /// Wait for the explorer database, initialise it, restart the explorer
    /// and schedule its periodic re-creation
    fn start_explorer(&self, org: &Organization) -> Result<()> {
        let domain = self.deployment.domain();
        let db = org.explorer_db_container(domain);
        let explorer = org.explorer_container(domain);

        if self.runner.is_simulated() {
            info!("Skipping explorer database wait");
        } else {
            let probe = docker::exec(&db, &[], &["pg_isready"]);
            self.readiness()
                .wait_until(&format!("database {}", db), || {
                    self.runner.run(&probe).map(|_| true)
                })
                .wrap_err_with(|| format!("Explorer database {} did not become ready", db))?;
        }

        info!("Initialising explorer database {}", db);
        self.run(&docker::exec(&db, &[], &["/bin/bash", CREATE_DB_SCRIPT]))?;

        self.run(&docker::restart(&explorer))?;
        self.run(&self.explorer_cron(org))?;
        Ok(())
    }

    /// `sudo tee /etc/cron.d/explorer-<org>` fed with the health-check entry
    pub(crate) fn explorer_cron(&self, org: &Organization) -> CommandLine {
        let deployment = self.deployment;
        let network = &deployment.network;
        let explorer = org.explorer_container(deployment.domain());
        let compose_file = deployment.paths().org_compose_dir(&org.name).join("peer.yaml");

        if network.explorer.healthcheck_schedule.split_whitespace().count() != 5 {
            warn!(
                "Explorer health-check schedule {:?} does not have five cron fields",
                network.explorer.healthcheck_schedule
            );
        }

        let entry = format!(
            "{schedule} root docker rm -f {explorer}; cd {work_dir} && {env}={project} {compose} --file {file} up -d {explorer} 2>&1\n",
            schedule = network.explorer.healthcheck_schedule,
            explorer = explorer,
            work_dir = deployment.work_dir.display(),
            env = docker::COMPOSE_PROJECT_ENV,
            project = network.network,
            compose = docker::DOCKER_COMPOSE,
            file = compose_file.display(),
        );

        CommandLine::new("sudo")
            .arg("tee")
            .arg(format!("/etc/cron.d/explorer-{}", org.name))
            .stdin(entry)
    }
}
