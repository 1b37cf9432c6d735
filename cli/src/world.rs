//! The sandbox world and the journaled actions that build it.
//!
//! The CLI plays the role of the external dispatcher: every mutation is
//! an [`Action`], applied to a clone of the world and committed only on
//! success, so the journal only ever contains actions that replay
//! cleanly. Position-touching actions run the health check after the
//! mutation and roll the whole batch back if it fails, which is exactly
//! the all-or-nothing contract the real dispatcher provides.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use aquifer::{
    AccountId, AssetBank, AssetId, Caller, CollateralSeizure, DebtRepayment, FixedRateModel,
    InMemoryBank, KinkedRateModel, Party, PoolId, PoolLedger, PoolParams, PositionId,
    PositionRegistry, PriceFeed, RateModel, RiskContext, RiskEngine, RiskModule, FULL_REPAYMENT,
    WAD,
};

/// Map a core ledger error into the CLI's error domain.
pub fn core<T>(result: aquifer::Result<T>) -> Result<T> {
    result.map_err(|e| anyhow!("ledger rejected the action: {e:?}"))
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Parses a decimal fraction into 18-decimal fixed point ("0.5" -> 5e17,
/// "1" -> 1e18).
pub fn parse_wad(s: &str) -> Result<u128> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if frac_part.len() > 18 {
        bail!("at most 18 decimal places: {s}");
    }
    let int: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().with_context(|| format!("bad number: {s}"))?
    };
    let frac: u128 = if frac_part.is_empty() {
        0
    } else {
        let digits: u128 = frac_part.parse().with_context(|| format!("bad number: {s}"))?;
        digits * 10u128.pow((18 - frac_part.len()) as u32)
    };
    int.checked_mul(WAD)
        .and_then(|v| v.checked_add(frac))
        .with_context(|| format!("value too large: {s}"))
}

/// Parses a base-unit amount; "max" means `u128::MAX` (unlimited
/// allowance / full repayment).
pub fn parse_amount(s: &str) -> Result<u128> {
    if s.eq_ignore_ascii_case("max") {
        return Ok(u128::MAX);
    }
    s.replace('_', "").parse().with_context(|| format!("bad amount: {s}"))
}

/// Parses a pool id, decimal or 0x-prefixed hex.
pub fn parse_pool_id(s: &str) -> Result<PoolId> {
    let raw = if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).with_context(|| format!("bad pool id: {s}"))?
    } else {
        s.parse().with_context(|| format!("bad pool id: {s}"))?
    };
    Ok(PoolId(raw))
}

/// Formats a pool id the way `parse_pool_id` reads it back.
pub fn fmt_pool_id(pool: PoolId) -> String {
    format!("{:#018x}", pool.0)
}

/// Formats a WAD fraction as a decimal with trailing zeros trimmed.
pub fn fmt_wad(value: u128) -> String {
    let int = value / WAD;
    let frac = value % WAD;
    if frac == 0 {
        return format!("{int}");
    }
    let frac = format!("{frac:018}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}

// ============================================================================
// Rate model specs
// ============================================================================

/// Journal-friendly rate model description.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateModelSpec {
    Fixed { rate: u128 },
    Kinked { base_rate: u128, slope1: u128, slope2: u128, kink: u128 },
}

impl RateModelSpec {
    /// Parses "fixed:<rate>" or "kinked:<base>:<slope1>:<slope2>:<kink>",
    /// each parameter a decimal annual fraction.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["fixed", rate] => Ok(RateModelSpec::Fixed { rate: parse_wad(rate)? }),
            ["kinked", base, s1, s2, kink] => Ok(RateModelSpec::Kinked {
                base_rate: parse_wad(base)?,
                slope1: parse_wad(s1)?,
                slope2: parse_wad(s2)?,
                kink: parse_wad(kink)?,
            }),
            _ => bail!(
                "bad rate model {s:?}; use fixed:<rate> or kinked:<base>:<slope1>:<slope2>:<kink>"
            ),
        }
    }

    pub fn model(self) -> RateModel {
        match self {
            RateModelSpec::Fixed { rate } => RateModel::Fixed(FixedRateModel { rate }),
            RateModelSpec::Kinked { base_rate, slope1, slope2, kink } => {
                RateModel::Kinked(KinkedRateModel { base_rate, slope1, slope2, kink })
            }
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// One leg of a liquidation in journal form.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RepayLeg {
    pub pool: u64,
    pub amount: u128,
}

/// One seizure leg in journal form.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SeizeLeg {
    pub asset: u32,
    pub amount: u128,
}

/// Everything that can change the world, in journal form. Plain integer
/// ids keep the JSON stable across releases.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Init {
        fee_recipient: u64,
        min_ltv: u128,
        max_ltv: u128,
        liquidation_discount: u128,
    },
    Mint { asset: u32, account: u64, amount: u128 },
    SetOracle { asset: u32, price: u128 },
    SetFeeRecipient { recipient: u64 },
    CreatePool {
        now: u64,
        owner: u64,
        asset: u32,
        rate_model: RateModelSpec,
        deposit_cap: u128,
        interest_fee: u128,
        origination_fee: u128,
    },
    Accrue { now: u64, pool: u64 },
    Deposit { now: u64, account: u64, pool: u64, amount: u128, receiver: u64 },
    Withdraw { now: u64, caller: u64, pool: u64, amount: u128, receiver: u64, owner: u64 },
    Approve { caller: u64, pool: u64, spender: u64, shares: u128 },
    SetOperator { caller: u64, operator: u64, enabled: bool },
    SetPoolCap { caller: u64, pool: u64, cap: u128 },
    TogglePause { caller: u64, pool: u64 },
    SetInterestFee { now: u64, caller: u64, pool: u64, fee: u128 },
    SetOriginationFee { caller: u64, pool: u64, fee: u128 },
    SetPoolOwner { caller: u64, pool: u64, new_owner: u64 },
    RequestRateModelUpdate { now: u64, caller: u64, pool: u64, rate_model: RateModelSpec },
    AcceptRateModelUpdate { now: u64, caller: u64, pool: u64 },
    RejectRateModelUpdate { caller: u64, pool: u64 },
    RequestLtvUpdate { now: u64, caller: u64, pool: u64, asset: u32, ltv: u128 },
    AcceptLtvUpdate { now: u64, caller: u64, pool: u64, asset: u32 },
    RejectLtvUpdate { caller: u64, pool: u64, asset: u32 },
    SupplyCollateral { account: u64, position: u64, asset: u32, amount: u128 },
    WithdrawCollateral { now: u64, position: u64, asset: u32, amount: u128, receiver: u64 },
    Borrow { now: u64, pool: u64, position: u64, amount: u128 },
    Repay { now: u64, account: u64, pool: u64, position: u64, amount: u128 },
    Liquidate {
        now: u64,
        liquidator: u64,
        position: u64,
        repayments: Vec<RepayLeg>,
        seizures: Vec<SeizeLeg>,
    },
}

impl Action {
    /// Timestamp carried by the action, if any.
    pub fn now(&self) -> Option<u64> {
        match self {
            Action::CreatePool { now, .. }
            | Action::Accrue { now, .. }
            | Action::Deposit { now, .. }
            | Action::Withdraw { now, .. }
            | Action::SetInterestFee { now, .. }
            | Action::RequestRateModelUpdate { now, .. }
            | Action::AcceptRateModelUpdate { now, .. }
            | Action::RequestLtvUpdate { now, .. }
            | Action::AcceptLtvUpdate { now, .. }
            | Action::WithdrawCollateral { now, .. }
            | Action::Borrow { now, .. }
            | Action::Repay { now, .. }
            | Action::Liquidate { now, .. } => Some(*now),
            _ => None,
        }
    }
}

/// What an action produced, for reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    PoolCreated(PoolId),
    SharesMinted(u128),
    SharesBurned(u128),
    BorrowSharesMinted(u128),
    RemainingBorrowShares(u128),
}

// ============================================================================
// World
// ============================================================================

/// Every component a dispatcher batch touches, as one cloneable value.
#[derive(Clone, Debug, PartialEq)]
pub struct World {
    pub ledger: PoolLedger,
    pub bank: InMemoryBank,
    pub engine: RiskEngine,
    pub registry: PositionRegistry,
    pub module: RiskModule,
    /// High-water mark of timestamps seen so far; new actions default
    /// to it.
    pub now: u64,
}

impl World {
    pub fn from_init(action: &Action) -> Result<Self> {
        let Action::Init { fee_recipient, min_ltv, max_ltv, liquidation_discount } = action else {
            bail!("journal must start with an init action");
        };
        Ok(World {
            ledger: PoolLedger::new(AccountId(*fee_recipient)),
            bank: InMemoryBank::new(),
            engine: core(RiskEngine::new(*min_ltv, *max_ltv))?,
            registry: PositionRegistry::new(),
            module: core(RiskModule::new(*liquidation_discount))?,
            now: 0,
        })
    }

    pub fn ctx(&self) -> RiskContext<'_, InMemoryBank> {
        RiskContext {
            ledger: &self.ledger,
            engine: &self.engine,
            registry: &self.registry,
            bank: &self.bank,
        }
    }

    fn check_health(&self, now: u64, position: PositionId) -> Result<()> {
        let healthy = core(self.module.is_position_healthy(&self.ctx(), now, position))?;
        if !healthy {
            bail!("position {} would be left unhealthy; batch rolled back", position.0);
        }
        Ok(())
    }

    /// Applies one action. May leave `self` half-mutated on error; the
    /// journal applies actions to a clone and commits only on success.
    pub fn apply(&mut self, action: &Action) -> Result<Outcome> {
        if let Some(now) = action.now() {
            if now < self.now {
                bail!("clock went backwards: action at {now}, world at {}", self.now);
            }
            self.now = now;
        }
        match action {
            Action::Init { .. } => bail!("journal already initialized"),

            Action::Mint { asset, account, amount } => {
                core(self.bank.mint(
                    AssetId(*asset),
                    Party::Account(AccountId(*account)),
                    *amount,
                ))?;
                Ok(Outcome::Done)
            }

            Action::SetOracle { asset, price } => {
                core(self.engine.set_oracle(
                    Caller::Admin,
                    AssetId(*asset),
                    PriceFeed { price: *price },
                ))?;
                Ok(Outcome::Done)
            }

            Action::SetFeeRecipient { recipient } => {
                core(self.ledger.set_fee_recipient(Caller::Admin, AccountId(*recipient)))?;
                Ok(Outcome::Done)
            }

            Action::CreatePool {
                now,
                owner,
                asset,
                rate_model,
                deposit_cap,
                interest_fee,
                origination_fee,
            } => {
                let pool = core(self.ledger.initialize_pool(
                    *now,
                    PoolParams {
                        owner: AccountId(*owner),
                        asset: AssetId(*asset),
                        rate_model: rate_model.model(),
                        deposit_cap: *deposit_cap,
                        interest_fee: *interest_fee,
                        origination_fee: *origination_fee,
                    },
                ))?;
                Ok(Outcome::PoolCreated(pool))
            }

            Action::Accrue { now, pool } => {
                core(self.ledger.accrue(*now, PoolId(*pool)))?;
                Ok(Outcome::Done)
            }

            Action::Deposit { now, account, pool, amount, receiver } => {
                let shares = core(self.ledger.deposit(
                    *now,
                    Caller::Account(AccountId(*account)),
                    &mut self.bank,
                    PoolId(*pool),
                    *amount,
                    AccountId(*receiver),
                ))?;
                Ok(Outcome::SharesMinted(shares))
            }

            Action::Withdraw { now, caller, pool, amount, receiver, owner } => {
                let shares = core(self.ledger.withdraw(
                    *now,
                    Caller::Account(AccountId(*caller)),
                    &mut self.bank,
                    PoolId(*pool),
                    *amount,
                    AccountId(*receiver),
                    AccountId(*owner),
                ))?;
                Ok(Outcome::SharesBurned(shares))
            }

            Action::Approve { caller, pool, spender, shares } => {
                core(self.ledger.approve(
                    Caller::Account(AccountId(*caller)),
                    PoolId(*pool),
                    AccountId(*spender),
                    *shares,
                ))?;
                Ok(Outcome::Done)
            }

            Action::SetOperator { caller, operator, enabled } => {
                core(self.ledger.set_operator(
                    Caller::Account(AccountId(*caller)),
                    AccountId(*operator),
                    *enabled,
                ))?;
                Ok(Outcome::Done)
            }

            Action::SetPoolCap { caller, pool, cap } => {
                core(self.ledger.set_pool_cap(
                    Caller::Account(AccountId(*caller)),
                    PoolId(*pool),
                    *cap,
                ))?;
                Ok(Outcome::Done)
            }

            Action::TogglePause { caller, pool } => {
                core(self.ledger.toggle_pause(Caller::Account(AccountId(*caller)), PoolId(*pool)))?;
                Ok(Outcome::Done)
            }

            Action::SetInterestFee { now, caller, pool, fee } => {
                core(self.ledger.set_interest_fee(
                    *now,
                    Caller::Account(AccountId(*caller)),
                    PoolId(*pool),
                    *fee,
                ))?;
                Ok(Outcome::Done)
            }

            Action::SetOriginationFee { caller, pool, fee } => {
                core(self.ledger.set_origination_fee(
                    Caller::Account(AccountId(*caller)),
                    PoolId(*pool),
                    *fee,
                ))?;
                Ok(Outcome::Done)
            }

            Action::SetPoolOwner { caller, pool, new_owner } => {
                core(self.ledger.set_pool_owner(
                    Caller::Account(AccountId(*caller)),
                    PoolId(*pool),
                    AccountId(*new_owner),
                ))?;
                Ok(Outcome::Done)
            }

            Action::RequestRateModelUpdate { now, caller, pool, rate_model } => {
                core(self.ledger.request_rate_model_update(
                    *now,
                    Caller::Account(AccountId(*caller)),
                    PoolId(*pool),
                    rate_model.model(),
                ))?;
                Ok(Outcome::Done)
            }

            Action::AcceptRateModelUpdate { now, caller, pool } => {
                core(self.ledger.accept_rate_model_update(
                    *now,
                    Caller::Account(AccountId(*caller)),
                    PoolId(*pool),
                ))?;
                Ok(Outcome::Done)
            }

            Action::RejectRateModelUpdate { caller, pool } => {
                core(
                    self.ledger
                        .reject_rate_model_update(Caller::Account(AccountId(*caller)), PoolId(*pool)),
                )?;
                Ok(Outcome::Done)
            }

            Action::RequestLtvUpdate { now, caller, pool, asset, ltv } => {
                core(self.engine.request_ltv_update(
                    *now,
                    Caller::Account(AccountId(*caller)),
                    &self.ledger,
                    PoolId(*pool),
                    AssetId(*asset),
                    *ltv,
                ))?;
                Ok(Outcome::Done)
            }

            Action::AcceptLtvUpdate { now, caller, pool, asset } => {
                core(self.engine.accept_ltv_update(
                    *now,
                    Caller::Account(AccountId(*caller)),
                    &self.ledger,
                    PoolId(*pool),
                    AssetId(*asset),
                ))?;
                Ok(Outcome::Done)
            }

            Action::RejectLtvUpdate { caller, pool, asset } => {
                core(self.engine.reject_ltv_update(
                    Caller::Account(AccountId(*caller)),
                    &self.ledger,
                    PoolId(*pool),
                    AssetId(*asset),
                ))?;
                Ok(Outcome::Done)
            }

            Action::SupplyCollateral { account, position, asset, amount } => {
                let position = PositionId(*position);
                let asset = AssetId(*asset);
                core(self.bank.transfer(
                    asset,
                    Party::Account(AccountId(*account)),
                    Party::Position(position),
                    *amount,
                ))?;
                core(self.registry.add_collateral_asset(position, asset))?;
                Ok(Outcome::Done)
            }

            Action::WithdrawCollateral { now, position, asset, amount, receiver } => {
                let position = PositionId(*position);
                let asset = AssetId(*asset);
                core(self.bank.transfer(
                    asset,
                    Party::Position(position),
                    Party::Account(AccountId(*receiver)),
                    *amount,
                ))?;
                if self.bank.balance_of(asset, Party::Position(position)) == 0 {
                    self.registry.remove_collateral_asset(position, asset);
                }
                self.check_health(*now, position)?;
                Ok(Outcome::Done)
            }

            Action::Borrow { now, pool, position, amount } => {
                let pool = PoolId(*pool);
                let position = PositionId(*position);
                core(self.registry.add_debt_pool(position, pool))?;
                let shares = core(self.ledger.borrow(
                    *now,
                    Caller::Dispatcher,
                    &mut self.bank,
                    pool,
                    position,
                    *amount,
                ))?;
                self.check_health(*now, position)?;
                Ok(Outcome::BorrowSharesMinted(shares))
            }

            Action::Repay { now, account, pool, position, amount } => {
                let pool = PoolId(*pool);
                let position = PositionId(*position);
                let amount = if *amount == FULL_REPAYMENT {
                    core(self.ledger.borrows_of(*now, pool, position))?
                } else {
                    *amount
                };
                let asset = core(self.ledger.pool(pool))?.asset;
                core(self.bank.transfer(
                    asset,
                    Party::Account(AccountId(*account)),
                    Party::Vault,
                    amount,
                ))?;
                let remaining =
                    core(self.ledger.repay(*now, Caller::Dispatcher, pool, position, amount))?;
                if remaining == 0 {
                    self.registry.remove_debt_pool(position, pool);
                }
                Ok(Outcome::RemainingBorrowShares(remaining))
            }

            Action::Liquidate { now, liquidator, position, repayments, seizures } => {
                let position = PositionId(*position);
                let liquidator = AccountId(*liquidator);
                let repay_legs: Vec<DebtRepayment> = repayments
                    .iter()
                    .map(|r| DebtRepayment { pool: PoolId(r.pool), amount: r.amount })
                    .collect();
                let seize_legs: Vec<CollateralSeizure> = seizures
                    .iter()
                    .map(|s| CollateralSeizure { asset: AssetId(s.asset), amount: s.amount })
                    .collect();
                core(self.module.validate_liquidation(
                    &self.ctx(),
                    *now,
                    position,
                    &repay_legs,
                    &seize_legs,
                ))?;
                for leg in &repay_legs {
                    let amount = if leg.amount == FULL_REPAYMENT {
                        core(self.ledger.borrows_of(*now, leg.pool, position))?
                    } else {
                        leg.amount
                    };
                    let asset = core(self.ledger.pool(leg.pool))?.asset;
                    core(self.bank.transfer(
                        asset,
                        Party::Account(liquidator),
                        Party::Vault,
                        amount,
                    ))?;
                    let remaining =
                        core(self.ledger.repay(*now, Caller::Dispatcher, leg.pool, position, amount))?;
                    if remaining == 0 {
                        self.registry.remove_debt_pool(position, leg.pool);
                    }
                }
                for leg in &seize_legs {
                    core(self.bank.transfer(
                        leg.asset,
                        Party::Position(position),
                        Party::Account(liquidator),
                        leg.amount,
                    ))?;
                    if self.bank.balance_of(leg.asset, Party::Position(position)) == 0 {
                        self.registry.remove_collateral_asset(position, leg.asset);
                    }
                }
                Ok(Outcome::Done)
            }
        }
    }
}
