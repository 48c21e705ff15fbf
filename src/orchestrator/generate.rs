use super::Orchestrator;
use crate::network::{Organization, Role};
use crate::process::fabric;
use crate::utils::{fs, keys};
use color_eyre::eyre::{bail, Result, WrapErr};
use log::info;

/// Artifact templates rendered into `<artifacts>/<org>/`, as (template, output)
const ORG_ARTIFACTS: &[(&str, &str)] = &[
    ("nginx.conf", "nginx.conf"),
    ("api-configs/api.yaml", "api-configs/api.yaml"),
    ("api-configs/network.yaml", "api-configs/network.yaml"),
    ("cryptogen-peer.yaml", "cryptogen.yaml"),
    ("fabric-ca-server-config.yaml", "fabric-ca-server-config.yaml"),
];

const EXPLORER_CONFIG: &str = "explorer-config.json";

impl Orchestrator<'_> {
    /// Regenerate every artifact and compose file from scratch
    pub fn generate(&self) -> Result<()> {
        self.clean_docker()?;
        self.remove_generated()?;

        let paths = self.deployment.paths();
        fs::ensure_dir(&paths.artifacts_dir)?;
        fs::ensure_dir(&paths.compose_dir)?;

        self.generate_domain_compose()?;

        for org in &self.deployment.organizations {
            self.generate_peer_artifacts(org)?;
            self.generate_orderer_compose(org)?;
            if org.has_role(Role::Explorer) {
                self.generate_explorer_config(org)?;
            }
        }

        self.generate_channel_artifacts()?;
        keys::copy_private_keys(&paths.artifacts_dir)?;

        info!("Generated network artifacts for {}", self.deployment.domain());
        Ok(())
    }

    fn generate_domain_compose(&self) -> Result<()> {
        info!("Creating domain docker-compose files");
        let paths = self.deployment.paths();
        let ctx = self.base_context()?;

        self.render(
            &paths.compose_template("base.yaml"),
            &paths.compose_dir.join("base.yaml"),
            &ctx,
        )?;
        self.render(
            &paths.compose_template("domain-cli.yaml"),
            &paths.compose_dir.join("cli.yaml"),
            &ctx,
        )
    }

    /// Start the domain cli container used to run the generators
    fn start_cli(&self) -> Result<String> {
        let cli = self.deployment.cli_container();
        let compose_file = self.deployment.paths().compose_dir.join("cli.yaml");
        self.compose_up(&[compose_file], &[cli.as_str()])?;
        Ok(cli)
    }

    fn generate_peer_artifacts(&self, org: &Organization) -> Result<()> {
        let paths = self.deployment.paths();
        let artifacts_dir = paths.org_artifacts_dir(&org.name);
        let compose_dir = paths.org_compose_dir(&org.name);

        info!("Generating artifacts for {} into {}", org.name, artifacts_dir.display());
        info!("Generating docker compose files for {} into {}", org.name, compose_dir.display());
        fs::ensure_dir(&artifacts_dir)?;
        fs::ensure_dir(&compose_dir)?;

        let ctx = self.org_context(org)?;
        for (template, output) in ORG_ARTIFACTS {
            self.render(&paths.artifact_template(template), &artifacts_dir.join(output), &ctx)?;
        }

        self.render(&paths.compose_template("peer.yaml"), &compose_dir.join("peer.yaml"), &ctx)?;
        if self.deployment.local {
            self.render(
                &paths.compose_template("local-peer.yaml"),
                &compose_dir.join("local-peer.yaml"),
                &ctx,
            )?;
        }

        info!("Generating crypto material for {} in the domain cli container", org.name);
        let cli = self.start_cli()?;
        self.run_in(&cli, &fabric::cryptogen(&format!("{}/cryptogen.yaml", org.name)))?;
        self.run_in(&cli, &fabric::chown(&self.deployment.owner))?;

        keys::copy_ca_keys(&paths.artifacts_dir)?;
        self.stop_and_remove(&cli)?;

        info!("Done generating artifacts for {}", org.name);
        Ok(())
    }

    fn generate_orderer_compose(&self, org: &Organization) -> Result<()> {
        info!("Creating orderer docker-compose file for {}", org.name);
        let paths = self.deployment.paths();
        self.render(
            &paths.compose_template("orderer.yaml"),
            &paths.org_compose_dir(&org.name).join("orderer.yaml"),
            &self.orderer_context(org)?,
        )
    }

    fn generate_explorer_config(&self, org: &Organization) -> Result<()> {
        info!("Generating explorer config for {}", org.name);
        let paths = self.deployment.paths();
        let target = paths.org_artifacts_dir(&org.name).join(EXPLORER_CONFIG);
        self.render(
            &paths.artifact_template(EXPLORER_CONFIG),
            &target,
            &self.explorer_context(org)?,
        )?;
        fs::set_mode(&target, 0o755)
    }

    fn generate_channel_artifacts(&self) -> Result<()> {
        info!("Creating channel artifacts");
        let deployment = self.deployment;
        let paths = deployment.paths();
        let domain = deployment.domain();
        let channel = &deployment.channel.name;

        fs::ensure_dir(&paths.channel_dir())?;
        let cli = self.start_cli()?;

        let ctx = self.channel_context()?;
        self.render(
            &paths.artifact_template("configtx-template.yaml"),
            &paths.artifacts_dir.join("configtx.yaml"),
            &ctx,
        )?;
        let orderer_crypto = format!("cryptogen-{}.yaml", domain);
        self.render(
            &paths.artifact_template("cryptogen-orderer.yaml"),
            &paths.artifacts_dir.join(&orderer_crypto),
            &ctx,
        )?;

        info!("Generating orderer crypto material");
        self.run_in(&cli, &fabric::cryptogen(&orderer_crypto))?;

        info!("Generating genesis block");
        self.run_in(&cli, &fabric::genesis_block())?;

        info!("Generating channel config transaction for {}", channel);
        self.run_in(&cli, &fabric::channel_tx(channel))?;

        for org in &deployment.organizations {
            info!("Generating anchor peers update for {}", org.name);
            self.run_in(&cli, &fabric::anchor_peers_tx(channel, &org.name))?;
        }

        self.run_in(&cli, &fabric::chown(&deployment.owner))?;
        self.stop_and_remove(&cli)?;

        self.verify_channel_artifacts()
    }

    /// The generators can exit cleanly without writing their output
    fn verify_channel_artifacts(&self) -> Result<()> {
        if self.runner.is_simulated() {
            return Ok(());
        }
        let deployment = self.deployment;
        let channel_dir = deployment.paths().channel_dir();
        let channel = &deployment.channel.name;

        let mut expected = vec![fabric::genesis_block_file(), fabric::channel_tx_file(channel)];
        expected.extend(
            deployment
                .organizations
                .iter()
                .map(|org| fabric::anchor_tx_file(&org.name, channel)),
        );

        let missing: Vec<&String> = expected
            .iter()
            .filter(|file| !channel_dir.join(file).is_file())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Channel artifacts missing from {}: {:?}",
                channel_dir.display(),
                missing
            );
        }
        Ok(())
    }

    /// Delete the generated artifacts and compose trees
    pub(super) fn remove_generated(&self) -> Result<()> {
        let paths = self.deployment.paths();
        info!(
            "Removing generated artifacts from: {}, {}",
            paths.compose_dir.display(),
            paths.artifacts_dir.display()
        );
        fs::remove_dir(&paths.compose_dir)
            .and_then(|_| fs::remove_dir(&paths.artifacts_dir))
            .wrap_err("Failed to remove generated files")
    }
}
