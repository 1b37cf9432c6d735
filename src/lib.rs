//! Aquifer: a multi-pool lending ledger with weighted-LTV risk checks.
//!
//! A shared accounting engine that tracks depositor claims and borrower
//! debt across independently configured lending pools, plus the risk
//! layer that decides whether a borrowing position is solvent enough to
//! avoid liquidation.
//!
//! The ledger guarantees:
//! 1. Conservation - a pool's assets always cover its borrows, and the
//!    per-account share ledgers always sum to the pool share supplies
//! 2. Share/asset pairing - a rebasing pair's notional is zero exactly
//!    when its share supply is zero
//! 3. All-or-nothing operations - a failed call leaves no trace; every
//!    check runs before the first write
//! 4. Fixed rounding - each conversion has one documented direction,
//!    chosen so rounding dust never becomes a claim on the pool
//! 5. Timelocked economics - rate-model and LTV changes sit in a
//!    pending record until their timelock matures, and lapse past the
//!    acceptance deadline
//!
//! State lives in plain owned structs with no interior mutability, so a
//! host can snapshot, compare, and roll back whole worlds by `Clone`.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(kani)]
extern crate kani;

extern crate alloc;

pub mod bank;
pub mod error;
pub mod math;
pub mod pool;
pub mod position;
pub mod rate;
pub mod risk;
pub mod types;

pub use bank::{AssetBank, InMemoryBank, Party};
pub use error::{LedgerError, Result};
pub use math::{mul_div_down, mul_div_up, WAD};
pub use pool::{PendingRateModel, Pool, PoolLedger, PoolParams, RebasePair};
pub use position::{PositionRegistry, MAX_COLLATERAL_ASSETS, MAX_DEBT_POOLS};
pub use rate::{FixedRateModel, KinkedRateModel, RateModel, SECONDS_PER_YEAR};
pub use risk::{
    CollateralSeizure, DebtRepayment, PendingLtv, PriceFeed, RiskContext, RiskData, RiskEngine,
    RiskModule,
};
pub use types::{
    AccountId, AssetId, Caller, PoolId, PositionId, FULL_REPAYMENT, TIMELOCK_DEADLINE,
    TIMELOCK_DURATION,
};
