//! Fabric tool invocations (cryptogen, configtxgen and the peer CLI).
//!
//! These are the inner command lines; the orchestrator runs them inside the
//! cli containers through [`super::docker::exec_in`].

use super::CommandLine;
use crate::network::{Chaincode, EndorsementPolicy, Ownership};

/// Config directory mounted into the cli containers
pub const FABRIC_CFG_PATH: &str = "/etc/hyperledger/artifacts";
/// Orderer TLS root certificate inside the org cli containers
pub const ORDERER_TLS_CA: &str = "/etc/hyperledger/crypto/orderer/tls/ca.crt";
pub const GENESIS_PROFILE: &str = "OrdererGenesis";
pub const CHAINCODE_LANG: &str = "golang";
/// Constructor arguments passed on instantiate
pub const CHAINCODE_INIT: &str = r#"{"Args":[]}"#;

pub fn genesis_block_file() -> String {
    "genesis.block".to_string()
}

pub fn channel_tx_file(channel: &str) -> String {
    format!("{}.tx", channel)
}

pub fn anchor_tx_file(org: &str, channel: &str) -> String {
    format!("{}MSPanchors-{}.tx", org, channel)
}

pub fn cryptogen(config: &str) -> CommandLine {
    CommandLine::new("cryptogen")
        .arg("generate")
        .arg(format!("--config={}", config))
}

fn configtxgen(profile: &str) -> CommandLine {
    CommandLine::new("configtxgen")
        .env("FABRIC_CFG_PATH", FABRIC_CFG_PATH)
        .args(["-profile", profile])
}

pub fn genesis_block() -> CommandLine {
    configtxgen(GENESIS_PROFILE)
        .arg("-outputBlock")
        .arg(format!("./channel/{}", genesis_block_file()))
}

pub fn channel_tx(channel: &str) -> CommandLine {
    configtxgen(channel)
        .arg("-outputCreateChannelTx")
        .arg(format!("./channel/{}", channel_tx_file(channel)))
        .args(["-channelID", channel])
}

pub fn anchor_peers_tx(channel: &str, org: &str) -> CommandLine {
    configtxgen(channel)
        .arg("-outputAnchorPeersUpdate")
        .arg(format!("./channel/{}", anchor_tx_file(org, channel)))
        .args(["-channelID", channel])
        .arg("-asOrg")
        .arg(format!("{}MSP", org))
}

/// Hand generated files back to the invoking user
pub fn chown(owner: &Ownership) -> CommandLine {
    CommandLine::new("chown").arg("-R").arg(owner.chown_spec()).arg(".")
}

fn peer(address: &str) -> CommandLine {
    CommandLine::new("peer").env("CORE_PEER_ADDRESS", address)
}

fn with_orderer_tls(cmd: CommandLine, orderer: &str) -> CommandLine {
    cmd.args(["-o", orderer]).args(["--tls", "--cafile", ORDERER_TLS_CA])
}

pub fn chaincode_install(peer_address: &str, chaincode: &Chaincode) -> CommandLine {
    peer(peer_address)
        .args(["chaincode", "install"])
        .args(["-n", &chaincode.name, "-v", &chaincode.version])
        .args(["-p", &chaincode.name, "-l", CHAINCODE_LANG])
}

pub fn chaincode_instantiate(
    peer_address: &str,
    orderer: &str,
    channel: &str,
    chaincode: &Chaincode,
    policy: &EndorsementPolicy,
) -> CommandLine {
    let cmd = peer(peer_address)
        .args(["chaincode", "instantiate"])
        .args(["-n", &chaincode.name, "-v", &chaincode.version])
        .arg("-P")
        .arg(policy.expression())
        .args(["-c", CHAINCODE_INIT]);
    with_orderer_tls(cmd, orderer).args(["-C", channel])
}

pub fn channel_create(orderer: &str, channel: &str) -> CommandLine {
    let cmd = CommandLine::new("peer")
        .args(["channel", "create", "-c", channel])
        .arg("-f")
        .arg(format!("{}/channel/{}", FABRIC_CFG_PATH, channel_tx_file(channel)));
    with_orderer_tls(cmd, orderer)
}

pub fn channel_update_anchors(orderer: &str, channel: &str, org: &str) -> CommandLine {
    let cmd = CommandLine::new("peer")
        .args(["channel", "update", "-c", channel])
        .arg("-f")
        .arg(format!("{}/channel/{}", FABRIC_CFG_PATH, anchor_tx_file(org, channel)));
    with_orderer_tls(cmd, orderer)
}

pub fn channel_join(peer_address: &str, channel: &str) -> CommandLine {
    peer(peer_address)
        .args(["channel", "join", "-b"])
        .arg(format!("{}.block", channel))
}
