use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use fabnet::config_loader;
use fabnet::network::DeploymentOptions;
use fabnet::orchestrator::{Action, Orchestrator};
use fabnet::preflight;
use fabnet::process::{CommandRunner, DryRunRunner, ShellRunner};
use log::info;
use std::path::PathBuf;

/// Bootstrap a multi-organization Fabric network from a YAML inventory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Network action to perform
    #[arg(value_enum)]
    action: Action,

    /// Local deployment: also render and start the local-peer compose overlay
    #[arg(long)]
    local: bool,

    /// Path to the inventory YAML file
    #[arg(short, long, default_value = "hosts.yml")]
    inventory: PathBuf,

    /// Log external commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Action: {}", args.action);
    info!("Inventory: {:?}", args.inventory);

    // Configuration errors abort before anything is touched.
    let options = DeploymentOptions {
        local: args.local,
        ..DeploymentOptions::default()
    };
    let deployment = config_loader::load_deployment(&args.inventory, options)
        .wrap_err_with(|| format!("Invalid inventory '{}'", args.inventory.display()))?;

    let runner: &dyn CommandRunner = if args.dry_run {
        &DryRunRunner
    } else {
        preflight::check_required_tools(&preflight::required_tools(
            &deployment,
            args.action == Action::Up,
        ))?;
        &ShellRunner
    };

    Orchestrator::new(&deployment, runner).execute(args.action)?;

    info!("{} completed successfully", args.action);
    Ok(())
}
