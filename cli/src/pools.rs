//! Pool lifecycle and owner-knob commands.

use anyhow::Result;
use colored::Colorize;

use crate::store::Journal;
use crate::world::{
    fmt_pool_id, parse_amount, parse_pool_id, parse_wad, Action, Outcome, RateModelSpec,
};

pub fn init(
    journal: &mut Journal,
    fee_recipient: u64,
    min_ltv: &str,
    max_ltv: &str,
    discount: &str,
) -> Result<()> {
    let min_ltv = parse_wad(min_ltv)?;
    let max_ltv = parse_wad(max_ltv)?;
    let liquidation_discount = parse_wad(discount)?;
    journal.execute(Action::Init { fee_recipient, min_ltv, max_ltv, liquidation_discount })?;

    println!("{}", "=== Journal Initialized ===".bright_green().bold());
    println!("{} {}", "Fee Recipient:".bright_cyan(), fee_recipient);
    println!(
        "{} {} .. {}",
        "LTV Bounds:".bright_cyan(),
        crate::world::fmt_wad(min_ltv),
        crate::world::fmt_wad(max_ltv)
    );
    println!(
        "{} {}",
        "Liquidation Discount:".bright_cyan(),
        crate::world::fmt_wad(liquidation_discount)
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    journal: &mut Journal,
    owner: u64,
    asset: u32,
    rate_model: &str,
    cap: &str,
    interest_fee: &str,
    origination_fee: &str,
    now: Option<u64>,
) -> Result<()> {
    let action = Action::CreatePool {
        now: now.unwrap_or_else(|| journal.now()),
        owner,
        asset,
        rate_model: RateModelSpec::parse(rate_model)?,
        deposit_cap: parse_amount(cap)?,
        interest_fee: parse_wad(interest_fee)?,
        origination_fee: parse_wad(origination_fee)?,
    };
    let outcome = journal.execute(action)?;

    println!("{}", "=== Pool Created ===".bright_green().bold());
    if let Outcome::PoolCreated(pool) = outcome {
        println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));
    }
    println!("{} {}", "Owner:".bright_cyan(), owner);
    println!("{} {}", "Asset:".bright_cyan(), asset);
    println!("{} {}", "Rate Model:".bright_cyan(), rate_model);
    Ok(())
}

pub fn accrue(journal: &mut Journal, pool: &str, now: Option<u64>) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::Accrue { now, pool: pool.0 })?;
    println!(
        "{} accrued {} to t={}",
        "✓".green(),
        fmt_pool_id(pool),
        now
    );
    Ok(())
}

pub fn set_cap(journal: &mut Journal, owner: u64, pool: &str, cap: &str) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let cap = parse_amount(cap)?;
    journal.execute(Action::SetPoolCap { caller: owner, pool: pool.0, cap })?;
    println!("{} cap of {} set to {}", "✓".green(), fmt_pool_id(pool), cap);
    Ok(())
}

pub fn pause(journal: &mut Journal, owner: u64, pool: &str) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    journal.execute(Action::TogglePause { caller: owner, pool: pool.0 })?;
    let paused = journal.world()?.ledger.pool(pool).map(|p| p.paused).unwrap_or(false);
    if paused {
        println!("{} {} paused", "✓".green(), fmt_pool_id(pool));
    } else {
        println!("{} {} unpaused", "✓".green(), fmt_pool_id(pool));
    }
    Ok(())
}

pub fn set_interest_fee(
    journal: &mut Journal,
    owner: u64,
    pool: &str,
    fee: &str,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let fee = parse_wad(fee)?;
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::SetInterestFee { now, caller: owner, pool: pool.0, fee })?;
    println!(
        "{} interest fee of {} set to {}",
        "✓".green(),
        fmt_pool_id(pool),
        crate::world::fmt_wad(fee)
    );
    Ok(())
}

pub fn set_origination_fee(journal: &mut Journal, owner: u64, pool: &str, fee: &str) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let fee = parse_wad(fee)?;
    journal.execute(Action::SetOriginationFee { caller: owner, pool: pool.0, fee })?;
    println!(
        "{} origination fee of {} set to {}",
        "✓".green(),
        fmt_pool_id(pool),
        crate::world::fmt_wad(fee)
    );
    Ok(())
}

pub fn set_owner(journal: &mut Journal, owner: u64, pool: &str, new_owner: u64) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    journal.execute(Action::SetPoolOwner { caller: owner, pool: pool.0, new_owner })?;
    println!("{} {} handed to account {}", "✓".green(), fmt_pool_id(pool), new_owner);
    Ok(())
}

pub fn set_fee_recipient(journal: &mut Journal, recipient: u64) -> Result<()> {
    journal.execute(Action::SetFeeRecipient { recipient })?;
    println!("{} fee recipient set to account {}", "✓".green(), recipient);
    Ok(())
}

pub fn request_rate_model(
    journal: &mut Journal,
    owner: u64,
    pool: &str,
    rate_model: &str,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let spec = RateModelSpec::parse(rate_model)?;
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::RequestRateModelUpdate {
        now,
        caller: owner,
        pool: pool.0,
        rate_model: spec,
    })?;

    let pending = journal.world()?.ledger.pool(pool).ok().and_then(|p| p.pending_rate_model);
    println!("{}", "=== Rate Model Update Requested ===".bright_green().bold());
    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));
    println!("{} {}", "Proposed:".bright_cyan(), rate_model);
    if let Some(pending) = pending {
        println!("{} t={}", "Acceptable After:".bright_cyan(), pending.valid_after);
    }
    Ok(())
}

pub fn accept_rate_model(
    journal: &mut Journal,
    owner: u64,
    pool: &str,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::AcceptRateModelUpdate { now, caller: owner, pool: pool.0 })?;
    println!("{} rate model of {} updated", "✓".green(), fmt_pool_id(pool));
    Ok(())
}

pub fn reject_rate_model(journal: &mut Journal, owner: u64, pool: &str) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    journal.execute(Action::RejectRateModelUpdate { caller: owner, pool: pool.0 })?;
    println!("{} pending rate model of {} dropped", "✓".green(), fmt_pool_id(pool));
    Ok(())
}
