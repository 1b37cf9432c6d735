//! Oracle directory and LTV table commands.

use anyhow::Result;
use colored::Colorize;

use crate::store::Journal;
use crate::world::{fmt_pool_id, fmt_wad, parse_pool_id, parse_wad, Action};

pub fn set_oracle(journal: &mut Journal, asset: u32, price: &str) -> Result<()> {
    let price = parse_wad(price)?;
    journal.execute(Action::SetOracle { asset, price })?;
    println!("{} asset {} priced at {}", "✓".green(), asset, fmt_wad(price));
    Ok(())
}

pub fn show_oracles(journal: &Journal) -> Result<()> {
    let world = journal.world()?;
    println!("{}", "=== Oracle Directory ===".bright_green().bold());
    if world.engine.oracles.is_empty() {
        println!("{}", "(no oracles registered)".dimmed());
        return Ok(());
    }
    for (asset, feed) in &world.engine.oracles {
        println!("  {} {} = {}", "Asset".bright_cyan(), asset.0, fmt_wad(feed.price));
    }
    Ok(())
}

pub fn request_ltv(
    journal: &mut Journal,
    owner: u64,
    pool: &str,
    asset: u32,
    ltv: &str,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let ltv = parse_wad(ltv)?;
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::RequestLtvUpdate { now, caller: owner, pool: pool.0, asset, ltv })?;

    let pending = journal
        .world()?
        .engine
        .pending_ltvs
        .get(&(pool, aquifer::AssetId(asset)))
        .copied();
    println!("{}", "=== LTV Update Requested ===".bright_green().bold());
    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));
    println!("{} {}", "Asset:".bright_cyan(), asset);
    println!("{} {}", "Proposed LTV:".bright_cyan(), fmt_wad(ltv));
    if let Some(pending) = pending {
        if pending.valid_after <= now {
            println!("{} first listing, acceptable immediately", "Timelock:".bright_cyan());
        } else {
            println!("{} t={}", "Acceptable After:".bright_cyan(), pending.valid_after);
        }
    }
    Ok(())
}

pub fn accept_ltv(
    journal: &mut Journal,
    owner: u64,
    pool: &str,
    asset: u32,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::AcceptLtvUpdate { now, caller: owner, pool: pool.0, asset })?;
    let ltv = journal.world()?.engine.ltv_for(pool, aquifer::AssetId(asset));
    println!(
        "{} LTV of asset {} for {} now {}",
        "✓".green(),
        asset,
        fmt_pool_id(pool),
        fmt_wad(ltv)
    );
    Ok(())
}

pub fn reject_ltv(journal: &mut Journal, owner: u64, pool: &str, asset: u32) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    journal.execute(Action::RejectLtvUpdate { caller: owner, pool: pool.0, asset })?;
    println!("{} pending LTV for asset {} dropped", "✓".green(), asset);
    Ok(())
}

pub fn show_ltvs(journal: &Journal, pool: &str) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let world = journal.world()?;
    println!("{}", "=== LTV Table ===".bright_green().bold());
    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));

    let mut any = false;
    for ((p, asset), ltv) in &world.engine.ltvs {
        if *p == pool {
            println!("  {} {} = {}", "Asset".bright_cyan(), asset.0, fmt_wad(*ltv));
            any = true;
        }
    }
    if !any {
        println!("{}", "(no collateral accepted)".dimmed());
    }
    for ((p, asset), pending) in &world.engine.pending_ltvs {
        if *p == pool {
            println!(
                "  {} asset {} -> {} after t={}",
                "pending:".yellow(),
                asset.0,
                fmt_wad(pending.ltv),
                pending.valid_after
            );
        }
    }
    Ok(())
}
