//! Deposits, withdrawals, position debt, and liquidations.

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::store::Journal;
use crate::world::{
    fmt_pool_id, parse_amount, parse_pool_id, Action, Outcome, RepayLeg, SeizeLeg,
};

pub fn mint(journal: &mut Journal, asset: u32, account: u64, amount: &str) -> Result<()> {
    let amount = parse_amount(amount)?;
    journal.execute(Action::Mint { asset, account, amount })?;
    println!(
        "{} minted {} of asset {} to account {}",
        "✓".green(),
        amount,
        asset,
        account
    );
    Ok(())
}

pub fn deposit(
    journal: &mut Journal,
    account: u64,
    pool: &str,
    amount: &str,
    receiver: Option<u64>,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let amount = parse_amount(amount)?;
    let receiver = receiver.unwrap_or(account);
    let now = now.unwrap_or_else(|| journal.now());
    let outcome = journal.execute(Action::Deposit {
        now,
        account,
        pool: pool.0,
        amount,
        receiver,
    })?;

    println!("{}", "=== Deposit ===".bright_green().bold());
    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));
    println!("{} {}", "Amount:".bright_cyan(), amount);
    if let Outcome::SharesMinted(shares) = outcome {
        println!("{} {} to account {}", "Shares Minted:".bright_cyan(), shares, receiver);
    }
    Ok(())
}

pub fn withdraw(
    journal: &mut Journal,
    caller: u64,
    pool: &str,
    amount: &str,
    receiver: Option<u64>,
    owner: Option<u64>,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let amount = parse_amount(amount)?;
    let receiver = receiver.unwrap_or(caller);
    let owner = owner.unwrap_or(caller);
    let now = now.unwrap_or_else(|| journal.now());
    let outcome = journal.execute(Action::Withdraw {
        now,
        caller,
        pool: pool.0,
        amount,
        receiver,
        owner,
    })?;

    println!("{}", "=== Withdrawal ===".bright_green().bold());
    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));
    println!("{} {} to account {}", "Amount:".bright_cyan(), amount, receiver);
    if let Outcome::SharesBurned(shares) = outcome {
        println!("{} {} from account {}", "Shares Burned:".bright_cyan(), shares, owner);
    }
    Ok(())
}

pub fn approve(
    journal: &mut Journal,
    owner: u64,
    pool: &str,
    spender: u64,
    shares: &str,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let shares = parse_amount(shares)?;
    journal.execute(Action::Approve { caller: owner, pool: pool.0, spender, shares })?;
    if shares == 0 {
        println!("{} allowance for account {} cleared", "✓".green(), spender);
    } else if shares == u128::MAX {
        println!("{} unlimited allowance granted to account {}", "✓".green(), spender);
    } else {
        println!("{} account {} may spend {} shares", "✓".green(), spender, shares);
    }
    Ok(())
}

pub fn set_operator(
    journal: &mut Journal,
    owner: u64,
    operator: u64,
    enabled: bool,
) -> Result<()> {
    journal.execute(Action::SetOperator { caller: owner, operator, enabled })?;
    if enabled {
        println!("{} account {} is now an operator for {}", "✓".green(), operator, owner);
    } else {
        println!("{} operator {} revoked for {}", "✓".green(), operator, owner);
    }
    Ok(())
}

pub fn supply_collateral(
    journal: &mut Journal,
    account: u64,
    position: u64,
    asset: u32,
    amount: &str,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    journal.execute(Action::SupplyCollateral { account, position, asset, amount })?;
    println!(
        "{} supplied {} of asset {} to position {}",
        "✓".green(),
        amount,
        asset,
        position
    );
    Ok(())
}

pub fn withdraw_collateral(
    journal: &mut Journal,
    position: u64,
    asset: u32,
    amount: &str,
    receiver: u64,
    now: Option<u64>,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::WithdrawCollateral { now, position, asset, amount, receiver })?;
    println!(
        "{} withdrew {} of asset {} from position {} to account {}",
        "✓".green(),
        amount,
        asset,
        position,
        receiver
    );
    Ok(())
}

pub fn borrow(
    journal: &mut Journal,
    pool: &str,
    position: u64,
    amount: &str,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let amount = parse_amount(amount)?;
    let now = now.unwrap_or_else(|| journal.now());
    let outcome = journal.execute(Action::Borrow { now, pool: pool.0, position, amount })?;

    println!("{}", "=== Borrow ===".bright_green().bold());
    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));
    println!("{} {}", "Position:".bright_cyan(), position);
    println!("{} {}", "Amount:".bright_cyan(), amount);
    if let Outcome::BorrowSharesMinted(shares) = outcome {
        println!("{} {}", "Borrow Shares:".bright_cyan(), shares);
    }
    println!("{} position remains healthy", "✓".green());
    Ok(())
}

pub fn repay(
    journal: &mut Journal,
    account: u64,
    pool: &str,
    position: u64,
    amount: &str,
    now: Option<u64>,
) -> Result<()> {
    let pool = parse_pool_id(pool)?;
    let amount = parse_amount(amount)?;
    let now = now.unwrap_or_else(|| journal.now());
    let outcome = journal.execute(Action::Repay { now, account, pool: pool.0, position, amount })?;

    println!("{}", "=== Repayment ===".bright_green().bold());
    println!("{} {}", "Pool:".bright_cyan(), fmt_pool_id(pool));
    println!("{} {}", "Position:".bright_cyan(), position);
    match outcome {
        Outcome::RemainingBorrowShares(0) => {
            println!("{} debt fully repaid, pool dropped from the position", "✓".green());
        }
        Outcome::RemainingBorrowShares(shares) => {
            println!("{} {}", "Remaining Borrow Shares:".bright_cyan(), shares);
        }
        _ => {}
    }
    Ok(())
}

/// Parses "key=amount" legs, e.g. `--repay 0xabc=500 --seize 2=100`.
fn split_leg<'a>(leg: &'a str, what: &str) -> Result<(&'a str, u128)> {
    let (key, amount) = leg
        .split_once('=')
        .with_context(|| format!("bad {what} leg {leg:?}; expected <id>=<amount>"))?;
    Ok((key, parse_amount(amount)?))
}

pub fn liquidate(
    journal: &mut Journal,
    liquidator: u64,
    position: u64,
    repayments: &[String],
    seizures: &[String],
    now: Option<u64>,
) -> Result<()> {
    if repayments.is_empty() || seizures.is_empty() {
        bail!("liquidation needs at least one --repay and one --seize leg");
    }
    let mut repay_legs = Vec::new();
    for leg in repayments {
        let (pool, amount) = split_leg(leg, "repay")?;
        repay_legs.push(RepayLeg { pool: parse_pool_id(pool)?.0, amount });
    }
    let mut seize_legs = Vec::new();
    for leg in seizures {
        let (asset, amount) = split_leg(leg, "seize")?;
        seize_legs.push(SeizeLeg {
            asset: asset.parse().with_context(|| format!("bad asset id: {asset}"))?,
            amount,
        });
    }
    let now = now.unwrap_or_else(|| journal.now());
    journal.execute(Action::Liquidate {
        now,
        liquidator,
        position,
        repayments: repay_legs,
        seizures: seize_legs,
    })?;

    println!("{}", "=== Liquidation ===".bright_green().bold());
    println!("{} {}", "Position:".bright_cyan(), position);
    println!("{} {}", "Liquidator:".bright_cyan(), liquidator);
    println!("{} {} repay, {} seize", "Legs:".bright_cyan(), repayments.len(), seizures.len());
    println!("{} seizure within the discount bound", "✓".green());
    Ok(())
}
