use super::Orchestrator;
use crate::process::docker::{self, ResourceKind};
use color_eyre::eyre::{Result, WrapErr};
use log::info;

impl Orchestrator<'_> {
    /// Remove generated files and every docker resource of the domain
    pub fn clean(&self) -> Result<()> {
        self.remove_generated()?;
        self.clean_docker()
    }

    /// Force-remove containers, volumes and images named `*.<domain>*`
    pub(super) fn clean_docker(&self) -> Result<()> {
        let domain = self.deployment.domain();
        info!("Remove docker containers, volumes and images");
        let matcher = docker::domain_matcher(domain)
            .wrap_err_with(|| format!("Cannot build a name filter for {}", domain))?;

        for kind in ResourceKind::ALL {
            let listing = self.run(&kind.list())?;
            let ids = docker::matching_ids(&listing.stdout, &matcher);
            if ids.is_empty() {
                info!("No docker {} available for deletion with {}", kind.plural(), domain);
                continue;
            }
            info!(
                "Removing docker {} found with {}: {}",
                kind.plural(),
                domain,
                ids.join(", ")
            );
            self.run(&kind.remove(&ids))?;
        }
        Ok(())
    }
}
