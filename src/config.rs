// 8.0 config.rs: all settings in one place. oracle gate, vault bounds/fees,
// position thresholds. defaults mirror a euro-style synthetic against a
// dollar reserve.

use crate::oracle::OracleParams;
use crate::position::PositionParams;
use crate::vault::VaultParams;
use serde::{Deserialize, Serialize};

/// The complete parameter set injected into the engine at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineParams {
    pub oracle: OracleParams,
    pub vault: VaultParams,
    pub positions: PositionParams,
}
