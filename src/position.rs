//! Per-position collateral and debt membership.
//!
//! The registry tracks which assets back each position and which pools
//! it has borrowed from. Both sets are bounded so that health checks
//! touch a fixed number of oracles and pools.

use alloc::collections::BTreeMap;
use arrayvec::ArrayVec;

use crate::error::{LedgerError, Result};
use crate::types::{AssetId, PoolId, PositionId};

/// Most collateral assets a single position may hold.
pub const MAX_COLLATERAL_ASSETS: usize = 5;
/// Most pools a single position may borrow from.
pub const MAX_DEBT_POOLS: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct PositionRecord {
    collateral_assets: ArrayVec<AssetId, MAX_COLLATERAL_ASSETS>,
    debt_pools: ArrayVec<PoolId, MAX_DEBT_POOLS>,
}

/// Membership index over all known positions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionRegistry {
    positions: BTreeMap<PositionId, PositionRecord>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `asset` as collateral for `position`. Idempotent.
    pub fn add_collateral_asset(&mut self, position: PositionId, asset: AssetId) -> Result<()> {
        let record = self.positions.entry(position).or_default();
        if record.collateral_assets.contains(&asset) {
            return Ok(());
        }
        record
            .collateral_assets
            .try_push(asset)
            .map_err(|_| LedgerError::TooManyAssets { position })
    }

    /// Marks `pool` as a debt source for `position`. Idempotent.
    pub fn add_debt_pool(&mut self, position: PositionId, pool: PoolId) -> Result<()> {
        let record = self.positions.entry(position).or_default();
        if record.debt_pools.contains(&pool) {
            return Ok(());
        }
        record
            .debt_pools
            .try_push(pool)
            .map_err(|_| LedgerError::TooManyDebtPools { position })
    }

    /// Drops `asset` from the position's collateral set. Unknown
    /// positions and absent assets are ignored.
    pub fn remove_collateral_asset(&mut self, position: PositionId, asset: AssetId) {
        if let Some(record) = self.positions.get_mut(&position) {
            record.collateral_assets.retain(|a| *a != asset);
            if record.collateral_assets.is_empty() && record.debt_pools.is_empty() {
                self.positions.remove(&position);
            }
        }
    }

    /// Drops `pool` from the position's debt set. Unknown positions and
    /// absent pools are ignored.
    pub fn remove_debt_pool(&mut self, position: PositionId, pool: PoolId) {
        if let Some(record) = self.positions.get_mut(&position) {
            record.debt_pools.retain(|p| *p != pool);
            if record.collateral_assets.is_empty() && record.debt_pools.is_empty() {
                self.positions.remove(&position);
            }
        }
    }

    /// Collateral assets of `position`, empty for unknown positions.
    pub fn collateral_assets(&self, position: PositionId) -> &[AssetId] {
        self.positions
            .get(&position)
            .map(|r| r.collateral_assets.as_slice())
            .unwrap_or(&[])
    }

    /// Pools `position` has borrowed from, empty for unknown positions.
    pub fn debt_pools(&self, position: PositionId) -> &[PoolId] {
        self.positions
            .get(&position)
            .map(|r| r.debt_pools.as_slice())
            .unwrap_or(&[])
    }
}
