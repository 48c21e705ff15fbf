//! Chaincode endorsement policy derived from the organization set.

use super::types::Organization;
use crate::inventory::ConfigError;
use std::fmt;

/// "Any peer of any declared organization may endorse"
///
/// Members keep the order of the organization list they were built from,
/// so the rendered expression is stable for a given inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndorsementPolicy {
    members: Vec<String>,
}

impl EndorsementPolicy {
    pub fn any_peer_of(organizations: &[Organization]) -> Result<Self, ConfigError> {
        if organizations.is_empty() {
            return Err(ConfigError::NoOrganizations);
        }
        let members = organizations
            .iter()
            .map(|org| format!("{}.peer", org.msp_id()))
            .collect();
        Ok(Self { members })
    }

    /// Policy expression as passed to `peer chaincode instantiate -P`
    pub fn expression(&self) -> String {
        let quoted: Vec<String> = self.members.iter().map(|m| format!("\"{}\"", m)).collect();
        format!("OR({})", quoted.join(", "))
    }
}

impl fmt::Display for EndorsementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression())
    }
}
