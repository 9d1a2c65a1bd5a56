// synth-core: price-gated synthetic currency engine.
// risk-first architecture: the oracle gate, collateral math and liquidation
// take priority. all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: ReserveAmount, SyntheticAmount, Price, Bps, Leverage
//   2.x  oracle.rs: price gate: feed wrapper, freshness, bounds, circuit breaker
//   3.x  vault.rs: collateral ledger: mint/redeem math, reserves, fees, ratio
//   4.x  fills.rs: exposure fill tracker: requested vs backed hedge notional
//   5.x  position.rs: hedge position struct, PnL, margin-ratio math
//   6.x  access.rs: capability roles per caller
//   7.x  events.rs: state transition events for audit
//   8.x  config.rs: engine parameters, defaults
//   9.x  snapshot.rs: versioned persisted state, explicit migrations
//   10.x engine/: orchestration: issuance, positions, liquidations

// core components
pub mod access;
pub mod account;
pub mod engine;
pub mod events;
pub mod fills;
pub mod oracle;
pub mod position;
pub mod types;
pub mod vault;

// integration modules
pub mod config;
pub mod snapshot;

// re exports for convenience
pub use access::*;
pub use account::*;
pub use config::*;
pub use engine::*;
pub use events::*;
pub use fills::*;
pub use oracle::*;
pub use position::*;
pub use snapshot::*;
pub use types::*;
pub use vault::*;
