//! Network lifecycle orchestration.
//!
//! [`Orchestrator`] drives the three top-level actions against one
//! [`Deployment`]: `generate` renders every artifact and runs the crypto
//! generators, `up` starts the containers and wires the channel, and `clean`
//! removes everything that `generate` produced. Steps run strictly in order;
//! the first failure aborts the action and nothing is rolled back.

mod clean;
mod generate;
mod up;

use crate::network::{Deployment, Organization, Role};
use crate::process::{docker, CommandLine, CommandOutput, CommandRunner};
use crate::template::{self, RenderContext};
use color_eyre::eyre::{Result, WrapErr};
use log::info;
use std::fmt;
use std::path::Path;

/// Top-level actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    Up,
    Generate,
    Clean,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Up => "up",
            Action::Generate => "generate",
            Action::Clean => "clean",
        })
    }
}

pub struct Orchestrator<'a> {
    deployment: &'a Deployment,
    runner: &'a dyn CommandRunner,
}

impl<'a> Orchestrator<'a> {
    pub fn new(deployment: &'a Deployment, runner: &'a dyn CommandRunner) -> Self {
        Self { deployment, runner }
    }

    pub fn execute(&self, action: Action) -> Result<()> {
        info!("Running {} for {}", action, self.deployment.domain());
        match action {
            Action::Up => self.up(),
            Action::Generate => self.generate(),
            Action::Clean => self.clean(),
        }
    }

    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.runner
            .run(command)
            .wrap_err_with(|| format!("Step failed: {}", command))
    }

    /// Run a tool inside a container
    fn run_in(&self, container: &str, inner: &CommandLine) -> Result<CommandOutput> {
        self.run(&docker::exec_in(container, inner))
    }

    fn compose_up<P: AsRef<Path>>(&self, files: &[P], services: &[&str]) -> Result<CommandOutput> {
        self.run(&docker::compose_up(files, &self.deployment.network.network, services))
    }

    /// `docker stop` then `docker rm`
    fn stop_and_remove(&self, container: &str) -> Result<()> {
        info!("Removing container {}", container);
        self.run(&docker::stop(container))?;
        self.run(&docker::remove(container))?;
        Ok(())
    }

    fn render(&self, src: &Path, target: &Path, context: &RenderContext) -> Result<()> {
        template::render_to_file(src, target, context)
            .wrap_err_with(|| format!("Failed to render {}", src.display()))
    }

    /// Variables shared by every template
    fn base_context(&self) -> Result<RenderContext> {
        let network = &self.deployment.network;
        let mut ctx = RenderContext::new();
        ctx.insert("DOMAIN", &network.domain)?
            .insert("NETWORK", &network.network)?
            .insert("FABRIC_VERSION", &network.fabric_version)?;
        Ok(ctx)
    }

    /// Variables for the per-organization artifacts and `peer.yaml`
    fn org_context(&self, org: &Organization) -> Result<RenderContext> {
        let deployment = self.deployment;
        let network = &deployment.network;
        let mut ctx = self.base_context()?;
        ctx.insert("ORG", org)?
            .insert("ORG_NAME", &org.name)?
            .insert("ORG_NAMES", &deployment.org_names())?
            .insert("REST_API_IMAGE", &network.rest_api_image)?
            .insert("CHANNEL", &deployment.channel.name)?
            .insert("CHAINCODE", &deployment.channel.chaincode.name)?;
        if org.has_role(Role::Explorer) {
            ctx.insert("EXPLORER_PORT", &network.explorer.port)?;
        }
        Ok(ctx)
    }

    fn orderer_context(&self, org: &Organization) -> Result<RenderContext> {
        let mut ctx = self.base_context()?;
        ctx.insert("ORG_N", &org.n)?;
        Ok(ctx)
    }

    /// Variables for `configtx.yaml` and the orderer cryptogen config
    fn channel_context(&self) -> Result<RenderContext> {
        let deployment = self.deployment;
        let mut ctx = self.base_context()?;
        ctx.insert("ORGS", &deployment.organizations)?
            .insert("ORG_NAMES", &deployment.org_names())?
            .insert("ORGS_COUNT", &deployment.organizations.len())?
            .insert("CHANNEL", &deployment.channel.name)?
            .insert("CHANNELS", &deployment.network.channels)?;
        Ok(ctx)
    }

    fn explorer_context(&self, org: &Organization) -> Result<RenderContext> {
        let explorer = &self.deployment.network.explorer;
        let mut ctx = self.base_context()?;
        ctx.insert("ORG", org)?
            .insert("ORG_NAME", &org.name)?
            .insert("CHANNELS", &self.deployment.network.channels)?
            .insert("EXPLORER_USER", &explorer.username)?
            .insert("EXPLORER_PASSWORD", &explorer.password)?;
        Ok(ctx)
    }
}
