//! # fabnet - bootstrapper for multi-organization Fabric networks
//!
//! This library turns a small YAML inventory into a running permissioned
//! blockchain network. It does not implement any ledger logic itself; it
//! renders configuration and compose files and drives the existing tooling
//! (docker, docker-compose, cryptogen, configtxgen and the peer CLI).
//!
//! ## Architecture
//!
//! - `inventory`: raw inventory model and validation
//! - `config_loader`: inventory file loading
//! - `network`: derived organizations, ports, channel and endorsement policy
//! - `template`: the template language used for every generated file
//! - `process`: external command lines and runners
//! - `readiness`: bounded polling for started containers
//! - `preflight`: host tool checks
//! - `utils`: filesystem helpers and private key copies
//! - `orchestrator`: the `generate`, `up` and `clean` actions
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fabnet::config_loader::load_deployment;
//! use fabnet::network::DeploymentOptions;
//! use fabnet::orchestrator::{Action, Orchestrator};
//! use fabnet::process::ShellRunner;
//! use std::path::Path;
//!
//! let deployment = load_deployment(Path::new("hosts.yml"), DeploymentOptions::default())?;
//! Orchestrator::new(&deployment, &ShellRunner).execute(Action::Generate)?;
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! Each module reports a typed `thiserror` error. The orchestrator and the
//! binary add context with `color_eyre`.

pub mod config_loader;
pub mod inventory;
pub mod network;
pub mod orchestrator;
pub mod preflight;
pub mod process;
pub mod readiness;
pub mod template;
pub mod utils;
