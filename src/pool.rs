//! Multi-pool lending ledger.
//!
//! Each pool tracks lender claims and borrower debt as two rebasing
//! pairs. Share prices drift as interest accrues; the rounding
//! direction of every conversion is fixed so rounding dust always lands
//! on the pool side, never on a claimant.
//!
//! Mutating operations are all-or-nothing: accrual and every check run
//! against a read-only simulation first, and state is written only once
//! nothing can fail. A caller that gets an `Err` observes no change.

use alloc::collections::{BTreeMap, BTreeSet};

use crate::bank::{AssetBank, Party};
use crate::error::{LedgerError, Result};
use crate::math::{mul_div_down, mul_div_up, WAD};
use crate::rate::RateModel;
use crate::types::{
    AccountId, AssetId, Caller, PoolId, PositionId, TIMELOCK_DEADLINE, TIMELOCK_DURATION,
};

// ============================================================================
// Rebasing Pairs
// ============================================================================

/// A notional amount and the share supply that collectively owns it.
///
/// Invariant: `notional == 0` exactly when `shares == 0`. An empty pair
/// converts 1:1 in both directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebasePair {
    pub notional: u128,
    pub shares: u128,
}

impl RebasePair {
    pub fn is_empty(&self) -> bool {
        self.notional == 0 && self.shares == 0
    }

    /// Notional to shares, rounded down.
    pub fn to_shares_down(&self, amount: u128) -> Result<u128> {
        if self.notional == 0 {
            return Ok(amount);
        }
        mul_div_down(amount, self.shares, self.notional)
    }

    /// Notional to shares, rounded up.
    pub fn to_shares_up(&self, amount: u128) -> Result<u128> {
        if self.notional == 0 {
            return Ok(amount);
        }
        mul_div_up(amount, self.shares, self.notional)
    }

    /// Shares to notional, rounded down.
    pub fn to_notional_down(&self, shares: u128) -> Result<u128> {
        if self.shares == 0 {
            return Ok(shares);
        }
        mul_div_down(shares, self.notional, self.shares)
    }

    /// Shares to notional, rounded up.
    pub fn to_notional_up(&self, shares: u128) -> Result<u128> {
        if self.shares == 0 {
            return Ok(shares);
        }
        mul_div_up(shares, self.notional, self.shares)
    }

    fn credited(self, amount: u128, shares: u128) -> Result<RebasePair> {
        Ok(RebasePair {
            notional: self.notional.checked_add(amount).ok_or(LedgerError::Overflow)?,
            shares: self.shares.checked_add(shares).ok_or(LedgerError::Overflow)?,
        })
    }

    fn debited(self, amount: u128, shares: u128) -> Result<RebasePair> {
        Ok(RebasePair {
            notional: self.notional.checked_sub(amount).ok_or(LedgerError::Overflow)?,
            shares: self.shares.checked_sub(shares).ok_or(LedgerError::Overflow)?,
        })
    }
}

// ============================================================================
// Pool State
// ============================================================================

/// Rate model change waiting out its timelock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRateModel {
    pub model: RateModel,
    pub valid_after: u64,
}

/// Per-pool configuration and cached totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pool {
    pub owner: AccountId,
    pub asset: AssetId,
    pub rate_model: RateModel,
    /// Hard ceiling on `total_assets.notional`.
    pub deposit_cap: u128,
    /// Share of accrued interest minted to the fee recipient, WAD-scaled.
    pub interest_fee: u128,
    /// Share of each borrow skimmed at origination, WAD-scaled.
    pub origination_fee: u128,
    pub paused: bool,
    pub last_updated: u64,
    pub total_assets: RebasePair,
    pub total_borrows: RebasePair,
    pub pending_rate_model: Option<PendingRateModel>,
}

/// Everything needed to create a pool. The pool id is derived from
/// `(owner, asset, rate_model)`, so the creator cannot pick it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolParams {
    pub owner: AccountId,
    pub asset: AssetId,
    pub rate_model: RateModel,
    pub deposit_cap: u128,
    pub interest_fee: u128,
    pub origination_fee: u128,
}

/// Post-accrual totals, computed read-only and committed only after
/// every other check of the surrounding operation has passed.
#[derive(Clone, Copy, Debug)]
struct Accrual {
    fee_shares: u128,
    assets: RebasePair,
    borrows: RebasePair,
}

impl Pool {
    fn simulate_accrue(&self, now: u64) -> Result<Accrual> {
        let dt = now.saturating_sub(self.last_updated);
        let interest = self.rate_model.interest_accrued(
            dt,
            self.total_borrows.notional,
            self.total_assets.notional,
        )?;
        if interest == 0 {
            return Ok(Accrual {
                fee_shares: 0,
                assets: self.total_assets,
                borrows: self.total_borrows,
            });
        }
        let fee_assets = mul_div_down(interest, self.interest_fee, WAD)?;
        // Fee shares are priced at the pre-accrual ratio, rounded down,
        // so the fee recipient never captures more than its cut.
        let fee_shares = self.total_assets.to_shares_down(fee_assets)?;
        Ok(Accrual {
            fee_shares,
            assets: RebasePair {
                notional: self
                    .total_assets
                    .notional
                    .checked_add(interest)
                    .ok_or(LedgerError::Overflow)?,
                shares: self
                    .total_assets
                    .shares
                    .checked_add(fee_shares)
                    .ok_or(LedgerError::Overflow)?,
            },
            borrows: RebasePair {
                notional: self
                    .total_borrows
                    .notional
                    .checked_add(interest)
                    .ok_or(LedgerError::Overflow)?,
                shares: self.total_borrows.shares,
            },
        })
    }

    pub(crate) fn ensure_owner(&self, caller: Caller, pool_id: PoolId) -> Result<()> {
        match caller {
            Caller::Account(account) if account == self.owner => Ok(()),
            _ => Err(LedgerError::OnlyPoolOwner { pool: pool_id }),
        }
    }
}

// ============================================================================
// Pool Ledger
// ============================================================================

/// Owns all pool and balance state. Mutate only through the operations
/// below; the fields are public for inspection and serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolLedger {
    /// Receives interest-fee shares and origination fees.
    pub fee_recipient: AccountId,
    pub pools: BTreeMap<PoolId, Pool>,
    pub deposit_shares: BTreeMap<(PoolId, AccountId), u128>,
    pub borrow_shares: BTreeMap<(PoolId, PositionId), u128>,
    /// Spending allowances in deposit shares, keyed (pool, owner, spender).
    /// `u128::MAX` means unlimited and is never decremented.
    pub allowances: BTreeMap<(PoolId, AccountId, AccountId), u128>,
    /// (owner, operator) pairs; an operator spends any of the owner's
    /// shares in any pool without an allowance.
    pub operators: BTreeSet<(AccountId, AccountId)>,
}

impl PoolLedger {
    pub fn new(fee_recipient: AccountId) -> Self {
        Self {
            fee_recipient,
            pools: BTreeMap::new(),
            deposit_shares: BTreeMap::new(),
            borrow_shares: BTreeMap::new(),
            allowances: BTreeMap::new(),
            operators: BTreeSet::new(),
        }
    }

    pub fn pool(&self, pool_id: PoolId) -> Result<&Pool> {
        self.pools.get(&pool_id).ok_or(LedgerError::UnknownPool { pool: pool_id })
    }

    /// Writes simulated accrual back. Infallible in practice: callers
    /// have already looked the pool up and bounded every sum.
    fn commit_accrual(&mut self, pool_id: PoolId, acc: &Accrual, now: u64) -> Result<()> {
        let recipient = self.fee_recipient;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.total_assets = acc.assets;
        pool.total_borrows = acc.borrows;
        // Refresh even on zero interest: a later borrow must not earn
        // interest retroactively over an idle gap.
        if now > pool.last_updated {
            pool.last_updated = now;
        }
        if acc.fee_shares > 0 {
            let entry = self.deposit_shares.entry((pool_id, recipient)).or_insert(0);
            *entry = entry.saturating_add(acc.fee_shares);
        }
        Ok(())
    }

    // ========================================
    // Pool Lifecycle
    // ========================================

    /// Creates a pool and returns its derived id. Anyone may create a
    /// pool; `params.owner` holds the owner capability afterwards.
    pub fn initialize_pool(&mut self, now: u64, params: PoolParams) -> Result<PoolId> {
        if params.interest_fee > WAD {
            return Err(LedgerError::FeeTooHigh { fee: params.interest_fee });
        }
        if params.origination_fee > WAD {
            return Err(LedgerError::FeeTooHigh { fee: params.origination_fee });
        }
        let pool_id =
            PoolId::derive(params.owner, params.asset, params.rate_model.fingerprint());
        if self.pools.contains_key(&pool_id) {
            return Err(LedgerError::PoolAlreadyExists { pool: pool_id });
        }
        self.pools.insert(
            pool_id,
            Pool {
                owner: params.owner,
                asset: params.asset,
                rate_model: params.rate_model,
                deposit_cap: params.deposit_cap,
                interest_fee: params.interest_fee,
                origination_fee: params.origination_fee,
                paused: false,
                last_updated: now,
                total_assets: RebasePair::default(),
                total_borrows: RebasePair::default(),
                pending_rate_model: None,
            },
        );
        Ok(pool_id)
    }

    // ========================================
    // Accrual
    // ========================================

    /// Accrues interest since `last_updated`. Permissionless and
    /// idempotent within a timestamp; every other mutation runs this
    /// logic first.
    pub fn accrue(&mut self, now: u64, pool_id: PoolId) -> Result<()> {
        let acc = self.pool(pool_id)?.simulate_accrue(now)?;
        self.commit_accrual(pool_id, &acc, now)
    }

    // ========================================
    // Deposit / Withdraw
    // ========================================

    /// Deposits `amount` of the pool's asset from the caller, minting
    /// deposit shares to `receiver`. Returns the shares minted.
    pub fn deposit<B: AssetBank>(
        &mut self,
        now: u64,
        caller: Caller,
        bank: &mut B,
        pool_id: PoolId,
        amount: u128,
        receiver: AccountId,
    ) -> Result<u128> {
        let payer = caller.account().ok_or(LedgerError::Unauthorized)?;
        let pool = self.pool(pool_id)?;
        if pool.paused {
            return Err(LedgerError::PoolPaused { pool: pool_id });
        }
        let acc = pool.simulate_accrue(now)?;
        let total = acc.assets.notional.checked_add(amount).ok_or(LedgerError::Overflow)?;
        if total > pool.deposit_cap {
            return Err(LedgerError::CapExceeded {
                pool: pool_id,
                requested: total,
                cap: pool.deposit_cap,
            });
        }
        // Deposit shares round down: dust stays with existing lenders.
        let shares = acc.assets.to_shares_down(amount)?;
        if shares == 0 {
            return Err(LedgerError::ZeroSharesDeposit { pool: pool_id, amount });
        }
        let assets = acc.assets.credited(amount, shares)?;
        let asset = pool.asset;

        // Assets move in before any claim is recorded.
        bank.transfer(asset, Party::Account(payer), Party::Vault, amount)?;

        self.commit_accrual(pool_id, &acc, now)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.total_assets = assets;
        let entry = self.deposit_shares.entry((pool_id, receiver)).or_insert(0);
        *entry = entry.saturating_add(shares);
        Ok(shares)
    }

    /// Burns `owner`'s deposit shares worth `amount` and pays the
    /// assets out to `receiver`. The caller must be `owner`, one of
    /// their operators, or hold a sufficient allowance (decremented in
    /// shares; `u128::MAX` is treated as unlimited). Returns the shares
    /// burned. Withdrawals stay open while a pool is paused.
    pub fn withdraw<B: AssetBank>(
        &mut self,
        now: u64,
        caller: Caller,
        bank: &mut B,
        pool_id: PoolId,
        amount: u128,
        receiver: AccountId,
        owner: AccountId,
    ) -> Result<u128> {
        let spender = caller.account().ok_or(LedgerError::Unauthorized)?;
        let pool = self.pool(pool_id)?;
        let acc = pool.simulate_accrue(now)?;
        // Withdrawn shares round down: the dust forfeited stays in the
        // pool rather than leaving with the withdrawer.
        let shares = acc.assets.to_shares_down(amount)?;
        if shares == 0 {
            return Err(LedgerError::ZeroShareWithdraw { pool: pool_id, amount });
        }

        // Plan the allowance spend; applied only at commit.
        let mut spent_allowance = None;
        if spender != owner && !self.operators.contains(&(owner, spender)) {
            let key = (pool_id, owner, spender);
            let allowance = self.allowances.get(&key).copied().unwrap_or(0);
            if allowance != u128::MAX {
                let remaining = allowance.checked_sub(shares).ok_or(
                    LedgerError::InsufficientAllowance { pool: pool_id, owner, spender },
                )?;
                spent_allowance = Some((key, remaining));
            }
        }

        // Pools never lend each other liquidity.
        let liquidity = acc.assets.notional.saturating_sub(acc.borrows.notional);
        if amount > liquidity {
            return Err(LedgerError::InsufficientLiquidity {
                pool: pool_id,
                requested: amount,
                available: liquidity,
            });
        }
        let mut held = self.deposit_shares.get(&(pool_id, owner)).copied().unwrap_or(0);
        if owner == self.fee_recipient {
            // Fee shares from this accrual are spendable immediately.
            held = held.saturating_add(acc.fee_shares);
        }
        if shares > held {
            return Err(LedgerError::InsufficientBalance { pool: pool_id, account: owner });
        }
        let assets = acc.assets.debited(amount, shares)?;
        let asset = pool.asset;
        if bank.balance_of(asset, Party::Vault) < amount {
            return Err(LedgerError::TransferFailed { asset, amount });
        }

        self.commit_accrual(pool_id, &acc, now)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.total_assets = assets;
        let remaining_shares = held - shares;
        if remaining_shares == 0 {
            self.deposit_shares.remove(&(pool_id, owner));
        } else {
            self.deposit_shares.insert((pool_id, owner), remaining_shares);
        }
        match spent_allowance {
            Some((key, 0)) => {
                self.allowances.remove(&key);
            }
            Some((key, remaining)) => {
                self.allowances.insert(key, remaining);
            }
            None => {}
        }

        // Assets leave last.
        bank.transfer(asset, Party::Vault, Party::Account(receiver), amount)?;
        Ok(shares)
    }

    // ========================================
    // Borrow / Repay
    // ========================================

    /// Lends `amount` to `position`, net of the origination fee.
    /// Dispatcher-only: the dispatcher must verify position health
    /// after the call and unwind the batch if it fails. Returns the
    /// borrow shares minted.
    pub fn borrow<B: AssetBank>(
        &mut self,
        now: u64,
        caller: Caller,
        bank: &mut B,
        pool_id: PoolId,
        position: PositionId,
        amount: u128,
    ) -> Result<u128> {
        if caller != Caller::Dispatcher {
            return Err(LedgerError::OnlyDispatcher);
        }
        let pool = self.pool(pool_id)?;
        if pool.paused {
            return Err(LedgerError::PoolPaused { pool: pool_id });
        }
        let acc = pool.simulate_accrue(now)?;
        let liquidity = acc.assets.notional.saturating_sub(acc.borrows.notional);
        if amount > liquidity {
            return Err(LedgerError::InsufficientLiquidity {
                pool: pool_id,
                requested: amount,
                available: liquidity,
            });
        }
        // Debt shares round up: obligations are never under-counted.
        let shares = acc.borrows.to_shares_up(amount)?;
        if shares == 0 {
            return Err(LedgerError::ZeroSharesBorrow { pool: pool_id, amount });
        }
        let borrows = acc.borrows.credited(amount, shares)?;
        let held = self.borrow_shares.get(&(pool_id, position)).copied().unwrap_or(0);
        let new_held = held.checked_add(shares).ok_or(LedgerError::Overflow)?;
        // Origination fee rounds down, in the borrower's favor.
        let fee = mul_div_down(amount, pool.origination_fee, WAD)?;
        let asset = pool.asset;
        if bank.balance_of(asset, Party::Vault) < amount {
            return Err(LedgerError::TransferFailed { asset, amount });
        }

        self.commit_accrual(pool_id, &acc, now)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.total_borrows = borrows;
        self.borrow_shares.insert((pool_id, position), new_held);
        let recipient = self.fee_recipient;
        if fee > 0 {
            bank.transfer(asset, Party::Vault, Party::Account(recipient), fee)?;
        }
        bank.transfer(asset, Party::Vault, Party::Position(position), amount - fee)?;
        Ok(shares)
    }

    /// Pays down `position`'s debt by `amount`. Dispatcher-only; the
    /// dispatcher has already returned the assets to the vault, this
    /// updates accounting only. Works on paused pools. Returns the
    /// position's remaining borrow shares.
    pub fn repay(
        &mut self,
        now: u64,
        caller: Caller,
        pool_id: PoolId,
        position: PositionId,
        amount: u128,
    ) -> Result<u128> {
        if caller != Caller::Dispatcher {
            return Err(LedgerError::OnlyDispatcher);
        }
        let pool = self.pool(pool_id)?;
        let acc = pool.simulate_accrue(now)?;
        // Repaid shares round down: a repayer never erases more debt
        // than the notional they returned.
        let shares = acc.borrows.to_shares_down(amount)?;
        if shares == 0 {
            return Err(LedgerError::ZeroSharesRepay { pool: pool_id, amount });
        }
        let held = self.borrow_shares.get(&(pool_id, position)).copied().unwrap_or(0);
        if shares > held || amount > acc.borrows.notional {
            return Err(LedgerError::RepayExceedsDebt { pool: pool_id, position });
        }
        let borrows = acc.borrows.debited(amount, shares)?;

        self.commit_accrual(pool_id, &acc, now)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.total_borrows = borrows;
        let remaining = held - shares;
        if remaining == 0 {
            self.borrow_shares.remove(&(pool_id, position));
        } else {
            self.borrow_shares.insert((pool_id, position), remaining);
        }
        Ok(remaining)
    }

    // ========================================
    // Owner Knobs
    // ========================================

    pub fn set_pool_cap(&mut self, caller: Caller, pool_id: PoolId, cap: u128) -> Result<()> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.ensure_owner(caller, pool_id)?;
        pool.deposit_cap = cap;
        Ok(())
    }

    pub fn toggle_pause(&mut self, caller: Caller, pool_id: PoolId) -> Result<()> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.ensure_owner(caller, pool_id)?;
        pool.paused = !pool.paused;
        Ok(())
    }

    pub fn set_pool_owner(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        new_owner: AccountId,
    ) -> Result<()> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.ensure_owner(caller, pool_id)?;
        pool.owner = new_owner;
        Ok(())
    }

    /// Changes the interest fee. Accrues first so interest earned up to
    /// now is settled under the outgoing fee.
    pub fn set_interest_fee(
        &mut self,
        now: u64,
        caller: Caller,
        pool_id: PoolId,
        fee: u128,
    ) -> Result<()> {
        let pool = self.pool(pool_id)?;
        pool.ensure_owner(caller, pool_id)?;
        if fee > WAD {
            return Err(LedgerError::FeeTooHigh { fee });
        }
        let acc = pool.simulate_accrue(now)?;
        self.commit_accrual(pool_id, &acc, now)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.interest_fee = fee;
        Ok(())
    }

    /// Changes the origination fee. Applies per borrow, so no accrual
    /// is needed.
    pub fn set_origination_fee(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        fee: u128,
    ) -> Result<()> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.ensure_owner(caller, pool_id)?;
        if fee > WAD {
            return Err(LedgerError::FeeTooHigh { fee });
        }
        pool.origination_fee = fee;
        Ok(())
    }

    /// Points fee flows at a new recipient. Shares already minted to
    /// the old recipient stay where they are.
    pub fn set_fee_recipient(&mut self, caller: Caller, recipient: AccountId) -> Result<()> {
        if caller != Caller::Admin {
            return Err(LedgerError::OnlyAdmin);
        }
        self.fee_recipient = recipient;
        Ok(())
    }

    // ========================================
    // Approvals
    // ========================================

    /// Lets `spender` withdraw up to `shares` of the caller's deposit
    /// shares in `pool_id`. Zero clears the approval; `u128::MAX` is
    /// unlimited.
    pub fn approve(
        &mut self,
        caller: Caller,
        pool_id: PoolId,
        spender: AccountId,
        shares: u128,
    ) -> Result<()> {
        let owner = caller.account().ok_or(LedgerError::Unauthorized)?;
        let key = (pool_id, owner, spender);
        if shares == 0 {
            self.allowances.remove(&key);
        } else {
            self.allowances.insert(key, shares);
        }
        Ok(())
    }

    /// Grants or revokes `operator` the right to spend any of the
    /// caller's shares in every pool.
    pub fn set_operator(
        &mut self,
        caller: Caller,
        operator: AccountId,
        enabled: bool,
    ) -> Result<()> {
        let owner = caller.account().ok_or(LedgerError::Unauthorized)?;
        if enabled {
            self.operators.insert((owner, operator));
        } else {
            self.operators.remove(&(owner, operator));
        }
        Ok(())
    }

    // ========================================
    // Rate Model Timelock
    // ========================================

    /// Proposes a new rate model for the pool; replaces any earlier
    /// proposal. Becomes acceptable after the timelock elapses, giving
    /// borrowers notice before their debt economics change.
    pub fn request_rate_model_update(
        &mut self,
        now: u64,
        caller: Caller,
        pool_id: PoolId,
        model: RateModel,
    ) -> Result<()> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.ensure_owner(caller, pool_id)?;
        pool.pending_rate_model = Some(PendingRateModel {
            model,
            valid_after: now.saturating_add(TIMELOCK_DURATION),
        });
        Ok(())
    }

    /// Applies a matured proposal. Stale proposals past the acceptance
    /// deadline must be re-requested.
    pub fn accept_rate_model_update(
        &mut self,
        now: u64,
        caller: Caller,
        pool_id: PoolId,
    ) -> Result<()> {
        let pool = self.pool(pool_id)?;
        pool.ensure_owner(caller, pool_id)?;
        let pending = pool
            .pending_rate_model
            .ok_or(LedgerError::NoRateModelUpdate { pool: pool_id })?;
        if now < pending.valid_after {
            return Err(LedgerError::TimelockPending {
                pool: pool_id,
                valid_after: pending.valid_after,
                now,
            });
        }
        if now > pending.valid_after.saturating_add(TIMELOCK_DEADLINE) {
            return Err(LedgerError::TimelockExpired {
                pool: pool_id,
                valid_after: pending.valid_after,
                now,
            });
        }
        // Interest up to the switch accrues under the outgoing model.
        let acc = pool.simulate_accrue(now)?;
        self.commit_accrual(pool_id, &acc, now)?;
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.rate_model = pending.model;
        pool.pending_rate_model = None;
        Ok(())
    }

    /// Drops any pending proposal. A no-op when none exists.
    pub fn reject_rate_model_update(&mut self, caller: Caller, pool_id: PoolId) -> Result<()> {
        let pool = self
            .pools
            .get_mut(&pool_id)
            .ok_or(LedgerError::UnknownPool { pool: pool_id })?;
        pool.ensure_owner(caller, pool_id)?;
        pool.pending_rate_model = None;
        Ok(())
    }

    // ========================================
    // Queries
    // ========================================
    //
    // Read-only views simulate accrual instead of mutating, so they are
    // current at any `now` without a prior write.

    pub fn total_assets(&self, now: u64, pool_id: PoolId) -> Result<u128> {
        let acc = self.pool(pool_id)?.simulate_accrue(now)?;
        Ok(acc.assets.notional)
    }

    pub fn total_borrows(&self, now: u64, pool_id: PoolId) -> Result<u128> {
        let acc = self.pool(pool_id)?.simulate_accrue(now)?;
        Ok(acc.borrows.notional)
    }

    /// Assets available to withdraw or borrow right now.
    pub fn liquidity(&self, now: u64, pool_id: PoolId) -> Result<u128> {
        let acc = self.pool(pool_id)?.simulate_accrue(now)?;
        Ok(acc.assets.notional.saturating_sub(acc.borrows.notional))
    }

    /// Value of `account`'s deposit shares, rounded down.
    pub fn assets_of(&self, now: u64, pool_id: PoolId, account: AccountId) -> Result<u128> {
        let acc = self.pool(pool_id)?.simulate_accrue(now)?;
        let mut held = self.deposit_shares.get(&(pool_id, account)).copied().unwrap_or(0);
        if account == self.fee_recipient {
            held = held.saturating_add(acc.fee_shares);
        }
        acc.assets.to_notional_down(held)
    }

    /// Value of `position`'s borrow shares, rounded up. This is the
    /// amount that fully repays the debt.
    pub fn borrows_of(&self, now: u64, pool_id: PoolId, position: PositionId) -> Result<u128> {
        let acc = self.pool(pool_id)?.simulate_accrue(now)?;
        let held = self.borrow_shares.get(&(pool_id, position)).copied().unwrap_or(0);
        acc.borrows.to_notional_up(held)
    }

    pub fn deposit_shares_of(&self, pool_id: PoolId, account: AccountId) -> u128 {
        self.deposit_shares.get(&(pool_id, account)).copied().unwrap_or(0)
    }

    pub fn borrow_shares_of(&self, pool_id: PoolId, position: PositionId) -> u128 {
        self.borrow_shares.get(&(pool_id, position)).copied().unwrap_or(0)
    }

    pub fn allowance(&self, pool_id: PoolId, owner: AccountId, spender: AccountId) -> u128 {
        self.allowances.get(&(pool_id, owner, spender)).copied().unwrap_or(0)
    }

    pub fn is_operator(&self, owner: AccountId, operator: AccountId) -> bool {
        self.operators.contains(&(owner, operator))
    }

    /// Annual borrow rate at current utilization, WAD-scaled.
    pub fn borrow_rate(&self, now: u64, pool_id: PoolId) -> Result<u128> {
        let pool = self.pool(pool_id)?;
        let acc = pool.simulate_accrue(now)?;
        pool.rate_model.current_rate(acc.borrows.notional, acc.assets.notional)
    }

    /// Checks the pool's accounting identities: assets cover borrows,
    /// share ledgers sum to the pair supplies, and neither pair is
    /// half-empty.
    pub fn check_conservation(&self, pool_id: PoolId) -> bool {
        let Some(pool) = self.pools.get(&pool_id) else {
            return false;
        };
        let deposit_total = self
            .deposit_shares
            .range((pool_id, AccountId(u64::MIN))..=(pool_id, AccountId(u64::MAX)))
            .map(|(_, s)| *s)
            .fold(0u128, |a, s| a.saturating_add(s));
        let borrow_total = self
            .borrow_shares
            .range((pool_id, PositionId(u64::MIN))..=(pool_id, PositionId(u64::MAX)))
            .map(|(_, s)| *s)
            .fold(0u128, |a, s| a.saturating_add(s));
        pool.total_assets.notional >= pool.total_borrows.notional
            && deposit_total == pool.total_assets.shares
            && borrow_total == pool.total_borrows.shares
            && (pool.total_assets.notional == 0) == (pool.total_assets.shares == 0)
            && (pool.total_borrows.notional == 0) == (pool.total_borrows.shares == 0)
    }
}


#[cfg(kani)]
mod kani_proofs {
    use super::*;

    // ═══════════════════════════════════════════════════════════
    //                KANI FORMAL VERIFICATION PROOFS
    // ═══════════════════════════════════════════════════════════

    /// R1: a deposit round-trip never pays out more than went in.
    #[kani::proof]
    fn proof_round_trip_never_inflates() {
        let pair = RebasePair { notional: kani::any(), shares: kani::any() };
        kani::assume(pair.notional < u64::MAX as u128);
        kani::assume(pair.shares < u64::MAX as u128);
        kani::assume((pair.notional == 0) == (pair.shares == 0));
        let amount: u128 = kani::any();
        kani::assume(amount < u64::MAX as u128);

        let shares = match pair.to_shares_down(amount) {
            Ok(s) => s,
            Err(_) => return,
        };
        let back = match pair.to_notional_down(shares) {
            Ok(a) => a,
            Err(_) => return,
        };
        assert!(back <= amount);
    }

    /// R2: debt valuation rounds against the borrower: converting
    /// borrow shares up then repaying them converts down to no more
    /// than what was quoted.
    #[kani::proof]
    fn proof_debt_quote_covers_shares() {
        let pair = RebasePair { notional: kani::any(), shares: kani::any() };
        kani::assume(pair.notional < u64::MAX as u128);
        kani::assume(pair.shares < u64::MAX as u128);
        kani::assume((pair.notional == 0) == (pair.shares == 0));
        let shares: u128 = kani::any();
        kani::assume(shares < u64::MAX as u128);

        let quote = match pair.to_notional_up(shares) {
            Ok(a) => a,
            Err(_) => return,
        };
        let burned = match pair.to_shares_down(quote) {
            Ok(s) => s,
            Err(_) => return,
        };
        assert!(burned >= shares);
    }
}
