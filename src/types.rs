//! Identifiers, capabilities, and protocol-wide constants.

use crate::math::fnv1a_64;

/// Delay between requesting a timelocked parameter change and the earliest
/// moment it can be accepted.
pub const TIMELOCK_DURATION: u64 = 24 * 60 * 60;

/// Window after `valid_after` during which a pending change can still be
/// accepted. Past it the request is stale and must be re-submitted.
pub const TIMELOCK_DEADLINE: u64 = 3 * 24 * 60 * 60;

/// Sentinel repayment amount meaning "the position's full debt in this pool".
pub const FULL_REPAYMENT: u128 = u128::MAX;

/// A fungible asset recognised by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub u32);

/// An end-user account (depositor, pool owner, allowance spender).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub u64);

/// A borrowing position managed by the external dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionId(pub u64);

/// A lending pool. Derived deterministically from its configuration so the
/// same (owner, asset, rate model) triple always maps to the same pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolId(pub u64);

impl PoolId {
    /// Derive the pool id for an (owner, asset, rate model) configuration.
    ///
    /// The rate model enters through its parameter fingerprint, so two pools
    /// differing only in curve parameters get distinct ids.
    pub fn derive(owner: AccountId, asset: AssetId, rate_model_fingerprint: u64) -> PoolId {
        PoolId(fnv1a_64(&[owner.0, asset.0 as u64, rate_model_fingerprint]))
    }
}

/// The capability a caller presents to the ledger.
///
/// There is no ambient identity: every operation receives the caller's role
/// explicitly and checks it up front.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caller {
    /// Protocol administration: oracle directory, fee recipient.
    Admin,
    /// The position dispatcher. Only it may move position debt
    /// (`borrow`/`repay`), since it sequences position mutations and runs
    /// the health check over the whole batch.
    Dispatcher,
    /// An end-user account acting as itself.
    Account(AccountId),
}

impl Caller {
    /// The account behind this caller, if it is one.
    pub fn account(self) -> Option<AccountId> {
        match self {
            Caller::Account(a) => Some(a),
            _ => None,
        }
    }
}
