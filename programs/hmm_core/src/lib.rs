//! Concentrated-liquidity AMM core with oracle-aware HMM pricing.
//!
//! A pool holds two fungible tokens X and Y. Liquidity providers commit
//! reserves to arbitrary price ranges on an exponential tick grid; traders
//! swap one token for the other against whatever liquidity is active at the
//! current price. On trades that converge toward an external oracle price,
//! the HMM policy quotes the trader the oracle-weighted rate and retains the
//! difference in the pool.
//!
//! The crate is the pool state machine only: tick-indexed liquidity
//! bookkeeping, position and fee-growth accounting, and swap execution.
//! Token transfers, the oracle feed, and persistence are the caller's
//! concern; the pool reports debits and credits and accepts the oracle root
//! price as a plain argument.

// Protocol parameters, error taxonomy, and the numeric kernel.
pub mod constants;
pub mod errors;
pub mod math;

// State definitions.
pub mod position;
pub mod tick;
pub mod token_pair;

// The pool state machine and its operations.
pub mod pool_state;
pub mod position_manager;
pub mod swap;

#[cfg(test)]
pub mod unit_test;

#[cfg(test)]
pub mod property_based_test;

pub use errors::{ErrorCode, Result};
pub use pool_state::{GlobalState, Pool, PoolConfig};
pub use position::{PositionKey, PositionState};
pub use position_manager::{DepositReceipt, WithdrawReceipt};
pub use swap::{SwapDirection, SwapSummary};
pub use tick::{GrowthChannel, GrowthPair, TickState};
pub use token_pair::{Token, TokenPair};
