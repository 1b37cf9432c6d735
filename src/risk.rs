//! Solvency evaluation.
//!
//! [`RiskEngine`] owns the per-(pool, asset) loan-to-value table and
//! the oracle directory; LTV changes go through the same two-step
//! timelock as rate models. [`RiskModule`] owns no state: it derives a
//! position's collateral value, debt value, and minimum required
//! collateral from the ledger, the engine, and the registry, and gates
//! liquidations on them.
//!
//! Rounding is adversarial to the borrower throughout: debt notionals
//! round up before valuation, minimum-required terms round up,
//! collateral weights round down.

use alloc::collections::BTreeMap;
use arrayvec::ArrayVec;

use crate::bank::{AssetBank, Party};
use crate::error::{LedgerError, Result};
use crate::math::{mul_div_down, mul_div_up, WAD};
use crate::pool::PoolLedger;
use crate::position::{PositionRegistry, MAX_COLLATERAL_ASSETS, MAX_DEBT_POOLS};
use crate::types::{
    AssetId, Caller, PoolId, PositionId, FULL_REPAYMENT, TIMELOCK_DEADLINE, TIMELOCK_DURATION,
};

// ============================================================================
// Risk Engine
// ============================================================================

/// Price of one whole unit of an asset in the unit of account,
/// WAD-scaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceFeed {
    pub price: u128,
}

/// LTV change waiting out its timelock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingLtv {
    pub ltv: u128,
    pub valid_after: u64,
}

/// Per-(pool, asset) LTV table plus the asset price directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskEngine {
    /// Global floor for any pool's LTV, WAD-scaled, nonzero.
    pub min_ltv: u128,
    /// Global ceiling for any pool's LTV, WAD-scaled, at most 1e18.
    pub max_ltv: u128,
    /// Zero (absent) means the asset is not accepted by that pool.
    pub ltvs: BTreeMap<(PoolId, AssetId), u128>,
    pub pending_ltvs: BTreeMap<(PoolId, AssetId), PendingLtv>,
    pub oracles: BTreeMap<AssetId, PriceFeed>,
}

impl RiskEngine {
    pub fn new(min_ltv: u128, max_ltv: u128) -> Result<Self> {
        if min_ltv == 0 || min_ltv > max_ltv || max_ltv > WAD {
            return Err(LedgerError::InvalidLtvBounds { min_ltv, max_ltv });
        }
        Ok(Self {
            min_ltv,
            max_ltv,
            ltvs: BTreeMap::new(),
            pending_ltvs: BTreeMap::new(),
            oracles: BTreeMap::new(),
        })
    }

    /// Registers or replaces the price feed for `asset`.
    pub fn set_oracle(&mut self, caller: Caller, asset: AssetId, feed: PriceFeed) -> Result<()> {
        if caller != Caller::Admin {
            return Err(LedgerError::OnlyAdmin);
        }
        if feed.price == 0 {
            return Err(LedgerError::ZeroOraclePrice { asset });
        }
        self.oracles.insert(asset, feed);
        Ok(())
    }

    pub fn oracle_for(&self, asset: AssetId) -> Result<PriceFeed> {
        self.oracles.get(&asset).copied().ok_or(LedgerError::NoOracle { asset })
    }

    /// Values `amount` of `asset` in the unit of account, rounded down.
    pub fn value_in_unit(&self, asset: AssetId, amount: u128) -> Result<u128> {
        let feed = self.oracle_for(asset)?;
        mul_div_down(amount, feed.price, WAD)
    }

    /// Proposes an LTV for (pool, asset); pool owner only. The asset
    /// must have a registered oracle and the value must sit inside the
    /// global bounds. First-time listings take effect immediately;
    /// changes to a live LTV wait out the timelock.
    pub fn request_ltv_update(
        &mut self,
        now: u64,
        caller: Caller,
        ledger: &PoolLedger,
        pool_id: PoolId,
        asset: AssetId,
        ltv: u128,
    ) -> Result<()> {
        let pool = ledger.pool(pool_id)?;
        pool.ensure_owner(caller, pool_id)?;
        if !self.oracles.contains_key(&asset) {
            return Err(LedgerError::NoOracle { asset });
        }
        if ltv < self.min_ltv || ltv > self.max_ltv {
            return Err(LedgerError::OutOfBounds {
                pool: pool_id,
                asset,
                ltv,
                min_ltv: self.min_ltv,
                max_ltv: self.max_ltv,
            });
        }
        let valid_after = if self.ltvs.contains_key(&(pool_id, asset)) {
            now.saturating_add(TIMELOCK_DURATION)
        } else {
            now
        };
        self.pending_ltvs.insert((pool_id, asset), PendingLtv { ltv, valid_after });
        Ok(())
    }

    /// Applies a matured LTV proposal; pool owner only. Proposals past
    /// the acceptance deadline must be re-requested.
    pub fn accept_ltv_update(
        &mut self,
        now: u64,
        caller: Caller,
        ledger: &PoolLedger,
        pool_id: PoolId,
        asset: AssetId,
    ) -> Result<()> {
        let pool = ledger.pool(pool_id)?;
        pool.ensure_owner(caller, pool_id)?;
        let pending = self
            .pending_ltvs
            .get(&(pool_id, asset))
            .copied()
            .ok_or(LedgerError::NoLtvUpdate { pool: pool_id, asset })?;
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
        self.ltvs.insert((pool_id, asset), pending.ltv);
        self.pending_ltvs.remove(&(pool_id, asset));
        Ok(())
    }

    /// Drops any pending LTV proposal. A no-op when none exists.
    pub fn reject_ltv_update(
        &mut self,
        caller: Caller,
        ledger: &PoolLedger,
        pool_id: PoolId,
        asset: AssetId,
    ) -> Result<()> {
        let pool = ledger.pool(pool_id)?;
        pool.ensure_owner(caller, pool_id)?;
        self.pending_ltvs.remove(&(pool_id, asset));
        Ok(())
    }

    /// LTV of `asset` as collateral for `pool`. Zero means the pool
    /// does not accept the asset.
    pub fn ltv_for(&self, pool: PoolId, asset: AssetId) -> u128 {
        self.ltvs.get(&(pool, asset)).copied().unwrap_or(0)
    }
}

// ============================================================================
// Risk Module
// ============================================================================

/// Read-only view of everything solvency evaluation touches.
pub struct RiskContext<'a, B: AssetBank> {
    pub ledger: &'a PoolLedger,
    pub engine: &'a RiskEngine,
    pub registry: &'a PositionRegistry,
    pub bank: &'a B,
}

impl<'a, B: AssetBank> Clone for RiskContext<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B: AssetBank> Copy for RiskContext<'a, B> {}

/// The three aggregates health is decided on, all in the unit of
/// account. `min_required_collateral` is zero whenever debt or
/// collateral is zero; the four-case rule in
/// [`RiskModule::is_position_healthy`] covers those states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RiskData {
    pub collateral_value: u128,
    pub debt_value: u128,
    pub min_required_collateral: u128,
}

/// One leg of a liquidation: repay `amount` of the pool's asset.
/// [`FULL_REPAYMENT`] repays the position's entire debt in that pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebtRepayment {
    pub pool: PoolId,
    pub amount: u128,
}

/// One leg of a liquidation: seize `amount` of a collateral asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollateralSeizure {
    pub asset: AssetId,
    pub amount: u128,
}

type CollateralValues = ArrayVec<(AssetId, u128), MAX_COLLATERAL_ASSETS>;
type DebtValues = ArrayVec<(PoolId, u128), MAX_DEBT_POOLS>;

/// Stateless solvency evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiskModule {
    /// Liquidator bonus, WAD-scaled, strictly below 1e18.
    pub liquidation_discount: u128,
}

impl RiskModule {
    pub fn new(liquidation_discount: u128) -> Result<Self> {
        if liquidation_discount >= WAD {
            return Err(LedgerError::InvalidLiquidationDiscount { discount: liquidation_discount });
        }
        Ok(Self { liquidation_discount })
    }

    fn collateral_data<B: AssetBank>(
        &self,
        ctx: &RiskContext<'_, B>,
        position: PositionId,
    ) -> Result<(CollateralValues, u128)> {
        let mut values = CollateralValues::new();
        let mut total: u128 = 0;
        for asset in ctx.registry.collateral_assets(position) {
            let amount = ctx.bank.balance_of(*asset, Party::Position(position));
            let value = ctx.engine.value_in_unit(*asset, amount)?;
            total = total.checked_add(value).ok_or(LedgerError::Overflow)?;
            values
                .try_push((*asset, value))
                .map_err(|_| LedgerError::TooManyAssets { position })?;
        }
        Ok((values, total))
    }

    fn debt_data<B: AssetBank>(
        &self,
        ctx: &RiskContext<'_, B>,
        now: u64,
        position: PositionId,
    ) -> Result<(DebtValues, u128)> {
        let mut values = DebtValues::new();
        let mut total: u128 = 0;
        for pool_id in ctx.registry.debt_pools(position) {
            // Debt notionals round up before valuation.
            let amount = ctx.ledger.borrows_of(now, *pool_id, position)?;
            let asset = ctx.ledger.pool(*pool_id)?.asset;
            let value = ctx.engine.value_in_unit(asset, amount)?;
            total = total.checked_add(value).ok_or(LedgerError::Overflow)?;
            values
                .try_push((*pool_id, value))
                .map_err(|_| LedgerError::TooManyDebtPools { position })?;
        }
        Ok((values, total))
    }

    /// `Σ_i Σ_j debtValue_i * weight_j / ltv(pool_i, asset_j)`, every
    /// term rounded up, where `weight_j` is asset j's share of total
    /// collateral value, rounded down.
    ///
    /// Every (debt pool, collateral asset) cell must have a nonzero
    /// LTV. A position may not hold collateral a pool it owes money to
    /// does not accept, whatever that collateral is worth.
    fn min_required_collateral<B: AssetBank>(
        &self,
        ctx: &RiskContext<'_, B>,
        position: PositionId,
        debt_values: &DebtValues,
        collateral_values: &CollateralValues,
        total_collateral: u128,
    ) -> Result<u128> {
        let mut weights = CollateralValues::new();
        for (asset, value) in collateral_values {
            let weight = mul_div_down(*value, WAD, total_collateral)?;
            weights
                .try_push((*asset, weight))
                .map_err(|_| LedgerError::TooManyAssets { position })?;
        }

        let mut min_required: u128 = 0;
        for (pool_id, debt_value) in debt_values {
            for (asset, weight) in &weights {
                let ltv = ctx.engine.ltv_for(*pool_id, *asset);
                if ltv == 0 {
                    return Err(LedgerError::UnsupportedAsset {
                        position,
                        pool: *pool_id,
                        asset: *asset,
                    });
                }
                let term = mul_div_up(*debt_value, *weight, ltv)?;
                min_required = min_required.checked_add(term).ok_or(LedgerError::Overflow)?;
            }
        }
        // A zero floor with live debt would wave through any position.
        if min_required == 0 {
            return Err(LedgerError::ZeroMinRequiredAssets { position });
        }
        Ok(min_required)
    }

    /// The three aggregates for `position` at `now`.
    pub fn risk_data<B: AssetBank>(
        &self,
        ctx: &RiskContext<'_, B>,
        now: u64,
        position: PositionId,
    ) -> Result<RiskData> {
        let (debt_values, debt_value) = self.debt_data(ctx, now, position)?;
        let (collateral_values, collateral_value) = self.collateral_data(ctx, position)?;
        let min_required_collateral = if debt_value == 0 || collateral_value == 0 {
            0
        } else {
            self.min_required_collateral(
                ctx,
                position,
                &debt_values,
                &collateral_values,
                collateral_value,
            )?
        };
        Ok(RiskData { collateral_value, debt_value, min_required_collateral })
    }

    /// Four-case health rule:
    /// no debt is always healthy; debt with no collateral is always
    /// unhealthy; otherwise collateral value must cover the minimum
    /// required.
    pub fn is_position_healthy<B: AssetBank>(
        &self,
        ctx: &RiskContext<'_, B>,
        now: u64,
        position: PositionId,
    ) -> Result<bool> {
        let (debt_values, debt_value) = self.debt_data(ctx, now, position)?;
        if debt_value == 0 {
            return Ok(true);
        }
        let (collateral_values, collateral_value) = self.collateral_data(ctx, position)?;
        if collateral_value == 0 {
            return Ok(false);
        }
        let min_required = self.min_required_collateral(
            ctx,
            position,
            &debt_values,
            &collateral_values,
            collateral_value,
        )?;
        Ok(collateral_value >= min_required)
    }

    /// Checks a proposed liquidation: the position must be unhealthy,
    /// and the seized value must not exceed the repaid value marked up
    /// by the liquidation discount.
    pub fn validate_liquidation<B: AssetBank>(
        &self,
        ctx: &RiskContext<'_, B>,
        now: u64,
        position: PositionId,
        debt_repayments: &[DebtRepayment],
        collateral_seized: &[CollateralSeizure],
    ) -> Result<()> {
        if self.is_position_healthy(ctx, now, position)? {
            return Err(LedgerError::LiquidateHealthyPosition { position });
        }

        let mut debt_repaid_value: u128 = 0;
        for repayment in debt_repayments {
            let amount = if repayment.amount == FULL_REPAYMENT {
                ctx.ledger.borrows_of(now, repayment.pool, position)?
            } else {
                repayment.amount
            };
            let asset = ctx.ledger.pool(repayment.pool)?.asset;
            let value = ctx.engine.value_in_unit(asset, amount)?;
            debt_repaid_value =
                debt_repaid_value.checked_add(value).ok_or(LedgerError::Overflow)?;
        }

        let mut seized_value: u128 = 0;
        for seizure in collateral_seized {
            let value = ctx.engine.value_in_unit(seizure.asset, seizure.amount)?;
            seized_value = seized_value.checked_add(value).ok_or(LedgerError::Overflow)?;
        }

        // Discount < WAD by construction. Rounding down tightens the
        // cap on the liquidator.
        let max_seized_value =
            mul_div_down(debt_repaid_value, WAD, WAD - self.liquidation_discount)?;
        if seized_value > max_seized_value {
            return Err(LedgerError::SeizedTooMuch { seized_value, max_seized_value });
        }
        Ok(())
    }

    /// Gates bad-debt socialization: debt value must strictly exceed
    /// collateral value.
    pub fn validate_bad_debt<B: AssetBank>(
        &self,
        ctx: &RiskContext<'_, B>,
        now: u64,
        position: PositionId,
    ) -> Result<()> {
        let data = self.risk_data(ctx, now, position)?;
        if data.debt_value > data.collateral_value {
            Ok(())
        } else {
            Err(LedgerError::NoBadDebt { position })
        }
    }
}
