use serde::{Deserialize, Serialize};
use wsm_types::LedgerId;

/// Configuration of a state machine instance.
///
/// Each instance is scoped to exactly one ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// The ledger whose blocks are projected.
    pub ledger_id: LedgerId,
    /// Height of the genesis block. The genesis block carries ledger
    /// configuration only, so replay starts at the height after it.
    pub genesis_height: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            ledger_id: LedgerId::generate(),
            genesis_height: 0,
        }
    }
}

impl StateConfig {
    pub fn for_ledger(ledger_id: LedgerId) -> Self {
        Self {
            ledger_id,
            ..Default::default()
        }
    }
}
