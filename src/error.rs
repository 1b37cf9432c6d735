//! Error types for the ledger and risk components.
//!
//! Every failure carries enough context (pool, position, amounts) for the
//! dispatcher to report it without re-deriving state. No operation that
//! returns an error mutates anything.

use crate::types::{AccountId, AssetId, PoolId, PositionId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerError {
    // ── configuration ──────────────────────────────────────────────

    /// A fee fraction above 100%.
    FeeTooHigh { fee: u128 },

    /// Global LTV bounds must satisfy 0 < min <= max <= 100%.
    InvalidLtvBounds { min_ltv: u128, max_ltv: u128 },

    /// Liquidation discount must be strictly below 100%.
    InvalidLiquidationDiscount { discount: u128 },

    /// Oracle prices of zero are rejected at registration.
    ZeroOraclePrice { asset: AssetId },

    /// A pool with this (owner, asset, rate model) configuration exists.
    PoolAlreadyExists { pool: PoolId },

    /// No pool with this id.
    UnknownPool { pool: PoolId },

    // ── authorization ──────────────────────────────────────────────

    /// The caller's capability does not fit the operation.
    Unauthorized,

    /// Restricted to the pool owner.
    OnlyPoolOwner { pool: PoolId },

    /// Restricted to the position dispatcher.
    OnlyDispatcher,

    /// Restricted to protocol administration.
    OnlyAdmin,

    /// Spender lacks allowance for the owner's shares.
    InsufficientAllowance { pool: PoolId, owner: AccountId, spender: AccountId },

    // ── capacity and liquidity ─────────────────────────────────────

    /// Pool is paused for new deposits and borrows.
    PoolPaused { pool: PoolId },

    /// Deposit would push the pool past its cap.
    CapExceeded { pool: PoolId, requested: u128, cap: u128 },

    /// Requested amount exceeds un-borrowed liquidity.
    InsufficientLiquidity { pool: PoolId, requested: u128, available: u128 },

    /// Owner holds fewer deposit shares than the withdrawal burns.
    InsufficientBalance { pool: PoolId, account: AccountId },

    /// Deposit converts to zero shares.
    ZeroSharesDeposit { pool: PoolId, amount: u128 },

    /// Withdrawal converts to zero shares.
    ZeroShareWithdraw { pool: PoolId, amount: u128 },

    /// Borrow converts to zero borrow shares.
    ZeroSharesBorrow { pool: PoolId, amount: u128 },

    /// Repayment converts to zero borrow shares.
    ZeroSharesRepay { pool: PoolId, amount: u128 },

    /// Repayment exceeds the position's outstanding debt.
    RepayExceedsDebt { pool: PoolId, position: PositionId },

    /// The asset bank refused or could not cover a transfer.
    TransferFailed { asset: AssetId, amount: u128 },

    // ── timelocks ──────────────────────────────────────────────────

    /// No pending rate model update for this pool.
    NoRateModelUpdate { pool: PoolId },

    /// No pending LTV update for this (pool, asset).
    NoLtvUpdate { pool: PoolId, asset: AssetId },

    /// The timelock has not elapsed yet.
    TimelockPending { pool: PoolId, valid_after: u64, now: u64 },

    /// The acceptance window has closed; the request must be re-submitted.
    TimelockExpired { pool: PoolId, valid_after: u64, now: u64 },

    /// Requested LTV is outside the global bounds.
    OutOfBounds { pool: PoolId, asset: AssetId, ltv: u128, min_ltv: u128, max_ltv: u128 },

    // ── solvency and liquidation ───────────────────────────────────

    /// No oracle registered for this asset.
    NoOracle { asset: AssetId },

    /// A position holds collateral the debt pool assigns zero LTV.
    /// Hard failure: the whole evaluation aborts rather than skipping
    /// the asset.
    UnsupportedAsset { position: PositionId, pool: PoolId, asset: AssetId },

    /// Non-zero debt produced a zero collateral minimum, which can only
    /// be a modeling bug.
    ZeroMinRequiredAssets { position: PositionId },

    /// Liquidation attempted against a healthy position.
    LiquidateHealthyPosition { position: PositionId },

    /// Seized collateral value exceeds the discounted repayment value.
    SeizedTooMuch { seized_value: u128, max_seized_value: u128 },

    /// Position is not in bad debt (collateral still covers it).
    NoBadDebt { position: PositionId },

    /// Position already tracks the maximum number of collateral assets.
    TooManyAssets { position: PositionId },

    /// Position already tracks the maximum number of debt pools.
    TooManyDebtPools { position: PositionId },

    // ── arithmetic ─────────────────────────────────────────────────

    /// Arithmetic overflow.
    Overflow,

    /// Division by zero.
    DivisionByZero,
}

pub type Result<T> = core::result::Result<T, LedgerError>;
