// 9.0 snapshot.rs: the persisted state layout. a versioned struct behind the
// stable engine interface; upgrades are explicit data transforms, applied on
// restore, never in-place surgery. everything is keyed by stable identifiers
// so a newer engine can load an older snapshot without renumbering.

use crate::access::Role;
use crate::account::Account;
use crate::engine::InsuranceFund;
use crate::fills::FillRecord;
use crate::position::Position;
use crate::types::{AccountId, Timestamp};
use crate::vault::VaultState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 2;

/// Gate state that survives restarts. The feed reference itself is a live
/// object and is re-injected on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceGateState {
    pub min_bound: Decimal,
    pub max_bound: Decimal,
    pub circuit_broken: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub vault: VaultState,
    pub price: PriceGateState,
    pub positions: Vec<Position>,
    /// Absent in v1 snapshots; migration synthesizes records.
    #[serde(default)]
    pub fills: Vec<FillRecord>,
    pub accounts: Vec<Account>,
    pub roles: Vec<(AccountId, Vec<Role>)>,
    pub insurance: InsuranceFund,
    pub next_position_id: u64,
    pub next_event_id: u64,
    pub current_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {found}, supported up to {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Bring a snapshot up to the current version, one explicit step at a time.
pub fn migrate(mut snapshot: EngineSnapshot) -> Result<EngineSnapshot, SnapshotError> {
    loop {
        match snapshot.version {
            1 => migrate_v1_to_v2(&mut snapshot),
            SNAPSHOT_VERSION => return Ok(snapshot),
            found => {
                return Err(SnapshotError::UnsupportedVersion {
                    found,
                    supported: SNAPSHOT_VERSION,
                })
            }
        }
    }
}

/// v1 predates the fill tracker. Every active position gets a zero-filled
/// record for its full requested notional; the engine re-apportions capacity
/// on the first issuance change after restore.
fn migrate_v1_to_v2(snapshot: &mut EngineSnapshot) {
    for position in snapshot.positions.iter().filter(|p| p.is_active()) {
        let already_tracked = snapshot
            .fills
            .iter()
            .any(|r| r.position_id == position.id);
        if !already_tracked {
            snapshot.fills.push(FillRecord {
                position_id: position.id,
                requested: position.notional,
                filled: crate::types::ReserveAmount::zero(),
            });
        }
    }
    snapshot.version = 2;
}
