//! Asset custody seam.
//!
//! The ledger never holds raw balances itself; every movement of assets
//! goes through an [`AssetBank`]. Production embedders back this with
//! their token layer, tests and the CLI use [`InMemoryBank`].

use alloc::collections::BTreeMap;

use crate::error::{LedgerError, Result};
use crate::types::{AccountId, AssetId, PositionId};

/// A party that can hold assets.
///
/// `Vault` is the ledger's own custody bucket: deposits sit there until
/// withdrawn or lent out, and repayments flow back into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Party {
    Vault,
    Account(AccountId),
    Position(PositionId),
}

/// Moves assets between parties on behalf of the ledger.
pub trait AssetBank {
    /// Current balance of `party` in `asset`.
    fn balance_of(&self, asset: AssetId, party: Party) -> u128;

    /// Transfers `amount` of `asset` from `from` to `to`.
    ///
    /// Fails with [`LedgerError::TransferFailed`] when `from` does not
    /// hold `amount`; balances are unchanged on failure.
    fn transfer(&mut self, asset: AssetId, from: Party, to: Party, amount: u128) -> Result<()>;
}

/// Map-backed bank for tests and single-process embedders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryBank {
    balances: BTreeMap<(AssetId, Party), u128>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `amount` of `asset` out of thin air for `party`.
    pub fn mint(&mut self, asset: AssetId, party: Party, amount: u128) -> Result<()> {
        let entry = self.balances.entry((asset, party)).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }
}

impl AssetBank for InMemoryBank {
    fn balance_of(&self, asset: AssetId, party: Party) -> u128 {
        self.balances.get(&(asset, party)).copied().unwrap_or(0)
    }

    fn transfer(&mut self, asset: AssetId, from: Party, to: Party, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let from_balance = self.balance_of(asset, from);
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(LedgerError::TransferFailed { asset, amount })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if remaining == 0 {
            self.balances.remove(&(asset, from));
        } else {
            self.balances.insert((asset, from), remaining);
        }
        self.balances.insert((asset, to), credited);
        Ok(())
    }
}
