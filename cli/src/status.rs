//! Read-only reports. Queries simulate accrual, so no journal entry is
//! written and any `--now` can be inspected.

use anyhow::Result;
use colored::Colorize;

use aquifer::{AssetBank, Party, PoolId, PositionId};

use crate::store::Journal;
use crate::world::{core, fmt_pool_id, fmt_wad, parse_pool_id, World};

fn print_pool(world: &World, now: u64, pool_id: PoolId) -> Result<()> {
    let pool = core(world.ledger.pool(pool_id))?;
    let assets = core(world.ledger.total_assets(now, pool_id))?;
    let borrows = core(world.ledger.total_borrows(now, pool_id))?;
    let liquidity = core(world.ledger.liquidity(now, pool_id))?;
    let rate = core(world.ledger.borrow_rate(now, pool_id))?;

    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool_id));
    println!("  {} {}", "Owner:".bright_cyan(), pool.owner.0);
    println!("  {} {}", "Asset:".bright_cyan(), pool.asset.0);
    if pool.paused {
        println!("  {} {}", "State:".bright_cyan(), "paused".yellow());
    }
    println!("  {} {}", "Total Assets:".bright_cyan(), assets);
    println!("  {} {}", "Total Borrows:".bright_cyan(), borrows);
    println!("  {} {}", "Liquidity:".bright_cyan(), liquidity);
    println!("  {} {}/year", "Borrow Rate:".bright_cyan(), fmt_wad(rate));
    if pool.deposit_cap != u128::MAX {
        println!("  {} {}", "Deposit Cap:".bright_cyan(), pool.deposit_cap);
    }
    if pool.interest_fee != 0 {
        println!("  {} {}", "Interest Fee:".bright_cyan(), fmt_wad(pool.interest_fee));
    }
    if pool.origination_fee != 0 {
        println!("  {} {}", "Origination Fee:".bright_cyan(), fmt_wad(pool.origination_fee));
    }
    if let Some(pending) = pool.pending_rate_model {
        println!(
            "  {} rate model change after t={}",
            "Pending:".yellow(),
            pending.valid_after
        );
    }
    let conserved = world.ledger.check_conservation(pool_id);
    if conserved {
        println!("  {} conservation holds", "✓".green());
    } else {
        println!("  {} conservation violated", "✗".bright_red().bold());
    }
    Ok(())
}

pub fn pool(journal: &Journal, pool: &str, now: Option<u64>) -> Result<()> {
    let world = journal.world()?;
    let now = now.unwrap_or(world.now);
    println!("{}", "=== Pool Status ===".bright_green().bold());
    print_pool(world, now, parse_pool_id(pool)?)
}

pub fn pools(journal: &Journal, now: Option<u64>) -> Result<()> {
    let world = journal.world()?;
    let now = now.unwrap_or(world.now);
    println!("{}", "=== Pools ===".bright_green().bold());
    if world.ledger.pools.is_empty() {
        println!("{}", "(no pools)".dimmed());
        return Ok(());
    }
    let ids: Vec<PoolId> = world.ledger.pools.keys().copied().collect();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_pool(world, now, *id)?;
    }
    Ok(())
}

pub fn position(journal: &Journal, position: u64, now: Option<u64>) -> Result<()> {
    let world = journal.world()?;
    let now = now.unwrap_or(world.now);
    let position = PositionId(position);

    println!("{}", "=== Position Status ===".bright_green().bold());
    println!("{} {}", "Position:".bright_cyan(), position.0);

    println!("\n{}", "Collateral:".bright_yellow());
    let assets = world.registry.collateral_assets(position);
    if assets.is_empty() {
        println!("{}", "  (none)".dimmed());
    }
    for asset in assets {
        let amount = world.bank.balance_of(*asset, Party::Position(position));
        let value = core(world.engine.value_in_unit(*asset, amount))?;
        println!(
            "  {} {}: {} (value {})",
            "Asset".bright_cyan(),
            asset.0,
            amount,
            value
        );
    }

    println!("\n{}", "Debt:".bright_yellow());
    let pools = world.registry.debt_pools(position);
    if pools.is_empty() {
        println!("{}", "  (none)".dimmed());
    }
    for pool_id in pools {
        let owed = core(world.ledger.borrows_of(now, *pool_id, position))?;
        println!("  {} {}: {}", "Pool".bright_cyan(), fmt_pool_id(*pool_id), owed);
    }

    println!("\n{}", "Risk:".bright_yellow());
    match world.module.risk_data(&world.ctx(), now, position) {
        Ok(data) => {
            println!("  {} {}", "Collateral Value:".bright_cyan(), data.collateral_value);
            println!("  {} {}", "Debt Value:".bright_cyan(), data.debt_value);
            println!(
                "  {} {}",
                "Min Required Collateral:".bright_cyan(),
                data.min_required_collateral
            );
            let healthy = core(world.module.is_position_healthy(&world.ctx(), now, position))?;
            if healthy {
                println!("  {} healthy", "✓".green());
            } else {
                println!("  {} unhealthy, liquidatable", "✗".bright_red().bold());
            }
            if world.module.validate_bad_debt(&world.ctx(), now, position).is_ok() {
                println!("  {} bad debt: value shortfall", "✗".bright_red().bold());
            }
        }
        Err(e) => println!("  {} {:?}", "evaluation failed:".bright_red(), e),
    }
    Ok(())
}

pub fn world(journal: &Journal, now: Option<u64>) -> Result<()> {
    let world = journal.world()?;
    let now = now.unwrap_or(world.now);

    println!("{}", "=== World ===".bright_green().bold());
    println!("{} {}", "Clock:".bright_cyan(), world.now);
    println!("{} {}", "Fee Recipient:".bright_cyan(), world.ledger.fee_recipient.0);
    println!(
        "{} {} .. {}",
        "LTV Bounds:".bright_cyan(),
        fmt_wad(world.engine.min_ltv),
        fmt_wad(world.engine.max_ltv)
    );
    println!(
        "{} {}",
        "Liquidation Discount:".bright_cyan(),
        fmt_wad(world.module.liquidation_discount)
    );
    println!("{} {}", "Pools:".bright_cyan(), world.ledger.pools.len());
    println!("{} {}", "Oracles:".bright_cyan(), world.engine.oracles.len());
    println!();
    pools(journal, Some(now))
}
