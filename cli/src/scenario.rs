//! Scripted end-to-end sandbox checks.
//!
//! Each scenario builds a fresh world through the same action machinery
//! the journal uses, so a green run demonstrates the full dispatcher
//! path: batching, health checks, rollbacks, and the liquidation
//! bounds. The journal on disk is never touched.

use anyhow::{ensure, Result};
use colored::Colorize;

use aquifer::{AssetBank, Party, PoolId, SECONDS_PER_YEAR};

use crate::world::{Action, Outcome, RateModelSpec, World};

/// Journal semantics: apply to a clone, commit only on success.
fn try_apply(w: &mut World, action: &Action) -> Result<Outcome> {
    let mut next = w.clone();
    let outcome = next.apply(action)?;
    *w = next;
    Ok(outcome)
}

const USDC: u32 = 1;
const WETH: u32 = 2;
const OWNER: u64 = 1;
const LENDER: u64 = 10;
const BORROWER_POS: u64 = 7;
const LIQUIDATOR: u64 = 20;
const FEE_SINK: u64 = 999;

const WAD: u128 = aquifer::WAD;

fn fresh_world() -> Result<World> {
    World::from_init(&Action::Init {
        fee_recipient: FEE_SINK,
        min_ltv: WAD / 100,
        max_ltv: WAD,
        liquidation_discount: WAD / 10,
    })
}

/// World with a funded zero-rate USDC pool accepting USDC and WETH at
/// 50% LTV, and a position holding WETH collateral.
fn lending_world(rate: RateModelSpec) -> Result<(World, PoolId)> {
    let mut w = fresh_world()?;
    w.apply(&Action::SetOracle { asset: USDC, price: WAD })?;
    w.apply(&Action::SetOracle { asset: WETH, price: 2 * WAD })?;
    let Outcome::PoolCreated(pool) = w.apply(&Action::CreatePool {
        now: 0,
        owner: OWNER,
        asset: USDC,
        rate_model: rate,
        deposit_cap: u128::MAX,
        interest_fee: 0,
        origination_fee: 0,
    })?
    else {
        anyhow::bail!("pool creation produced no id");
    };
    for asset in [USDC, WETH] {
        w.apply(&Action::RequestLtvUpdate {
            now: 0,
            caller: OWNER,
            pool: pool.0,
            asset,
            ltv: WAD / 2,
        })?;
        w.apply(&Action::AcceptLtvUpdate { now: 0, caller: OWNER, pool: pool.0, asset })?;
    }
    w.apply(&Action::Mint { asset: USDC, account: LENDER, amount: 1_000_000 })?;
    w.apply(&Action::Deposit { now: 0, account: LENDER, pool: pool.0, amount: 100_000, receiver: LENDER })?;
    w.apply(&Action::Mint { asset: WETH, account: LENDER, amount: 1_000 })?;
    w.apply(&Action::SupplyCollateral {
        account: LENDER,
        position: BORROWER_POS,
        asset: WETH,
        amount: 100,
    })?;
    Ok((w, pool))
}

fn deposit_withdraw_round_trip() -> Result<()> {
    let mut w = fresh_world()?;
    w.apply(&Action::SetOracle { asset: USDC, price: WAD })?;
    let Outcome::PoolCreated(pool) = w.apply(&Action::CreatePool {
        now: 0,
        owner: OWNER,
        asset: USDC,
        rate_model: RateModelSpec::Fixed { rate: 0 },
        deposit_cap: u128::MAX,
        interest_fee: 0,
        origination_fee: 0,
    })?
    else {
        anyhow::bail!("pool creation produced no id");
    };
    w.apply(&Action::Mint { asset: USDC, account: LENDER, amount: 100 })?;
    w.apply(&Action::Deposit { now: 0, account: LENDER, pool: pool.0, amount: 100, receiver: LENDER })?;
    w.apply(&Action::Withdraw {
        now: 0,
        caller: LENDER,
        pool: pool.0,
        amount: 100,
        receiver: LENDER,
        owner: LENDER,
    })?;
    let balance = w.bank.balance_of(aquifer::AssetId(USDC), Party::Account(aquifer::AccountId(LENDER)));
    ensure!(balance == 100, "expected the full 100 back, got {balance}");
    ensure!(w.ledger.check_conservation(pool), "conservation broken after round trip");
    Ok(())
}

fn interest_doubles_debt_in_a_year() -> Result<()> {
    let (mut w, pool) = lending_world(RateModelSpec::Fixed { rate: WAD })?;
    w.apply(&Action::Borrow { now: 0, pool: pool.0, position: BORROWER_POS, amount: 10 })?;
    let owed = w.ledger.borrows_of(SECONDS_PER_YEAR, pool, aquifer::PositionId(BORROWER_POS))
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;
    ensure!((19..=21).contains(&owed), "expected ~20 after a year at 100%, got {owed}");
    Ok(())
}

fn unhealthy_borrow_is_rolled_back() -> Result<()> {
    let (mut w, pool) = lending_world(RateModelSpec::Fixed { rate: 0 })?;
    let before = w.clone();
    // 100 WETH at price 2.0 and LTV 50% supports at most 100 of debt.
    let result =
        try_apply(&mut w, &Action::Borrow { now: 0, pool: pool.0, position: BORROWER_POS, amount: 150 });
    ensure!(result.is_err(), "over-borrow was accepted");
    ensure!(w == before, "failed batch left a trace");
    try_apply(&mut w, &Action::Borrow { now: 0, pool: pool.0, position: BORROWER_POS, amount: 90 })?;
    Ok(())
}

fn liquidation_respects_the_discount() -> Result<()> {
    let (mut w, pool) = lending_world(RateModelSpec::Fixed { rate: 0 })?;
    w.apply(&Action::Borrow { now: 0, pool: pool.0, position: BORROWER_POS, amount: 100 })?;
    w.apply(&Action::Mint { asset: USDC, account: LIQUIDATOR, amount: 1_000 })?;

    // Healthy position: liquidation must be rejected.
    let healthy = try_apply(&mut w, &Action::Liquidate {
        now: 0,
        liquidator: LIQUIDATOR,
        position: BORROWER_POS,
        repayments: vec![crate::world::RepayLeg { pool: pool.0, amount: 10 }],
        seizures: vec![crate::world::SeizeLeg { asset: WETH, amount: 1 }],
    });
    ensure!(healthy.is_err(), "liquidated a healthy position");

    // Crash WETH so the position goes under water.
    w.apply(&Action::SetOracle { asset: WETH, price: WAD })?;

    // Repaying 100 (value 100) allows seizing at most 100/0.9 = 111 of
    // value, i.e. 111 WETH at the crashed price.
    let greedy = try_apply(&mut w, &Action::Liquidate {
        now: 0,
        liquidator: LIQUIDATOR,
        position: BORROWER_POS,
        repayments: vec![crate::world::RepayLeg { pool: pool.0, amount: u128::MAX }],
        seizures: vec![crate::world::SeizeLeg { asset: WETH, amount: 120 }],
    });
    ensure!(greedy.is_err(), "over-seizure was accepted");

    w.apply(&Action::Liquidate {
        now: 0,
        liquidator: LIQUIDATOR,
        position: BORROWER_POS,
        repayments: vec![crate::world::RepayLeg { pool: pool.0, amount: u128::MAX }],
        seizures: vec![crate::world::SeizeLeg { asset: WETH, amount: 90 }],
    })?;
    let debt = w.ledger.borrow_shares_of(pool, aquifer::PositionId(BORROWER_POS));
    ensure!(debt == 0, "debt not cleared by full repayment");
    Ok(())
}

fn rate_model_timelock_gates_acceptance() -> Result<()> {
    let (mut w, pool) = lending_world(RateModelSpec::Fixed { rate: 0 })?;
    w.apply(&Action::RequestRateModelUpdate {
        now: 0,
        caller: OWNER,
        pool: pool.0,
        rate_model: RateModelSpec::Fixed { rate: WAD / 10 },
    })?;
    let early = try_apply(&mut w, &Action::AcceptRateModelUpdate { now: 60, caller: OWNER, pool: pool.0 });
    ensure!(early.is_err(), "timelock did not gate acceptance");
    w.apply(&Action::AcceptRateModelUpdate {
        now: aquifer::TIMELOCK_DURATION,
        caller: OWNER,
        pool: pool.0,
    })?;
    Ok(())
}

pub fn run_all() -> Result<()> {
    println!("{}", "=== Sandbox Scenarios ===".bright_green().bold());

    let scenarios: &[(&str, fn() -> Result<()>)] = &[
        ("deposit/withdraw round trip", deposit_withdraw_round_trip),
        ("interest doubles debt in a year", interest_doubles_debt_in_a_year),
        ("unhealthy borrow is rolled back", unhealthy_borrow_is_rolled_back),
        ("liquidation respects the discount", liquidation_respects_the_discount),
        ("rate model timelock gates acceptance", rate_model_timelock_gates_acceptance),
    ];

    let mut failed = 0;
    for (name, scenario) in scenarios {
        match scenario() {
            Ok(()) => println!("  {} {}", "✓".green(), name),
            Err(e) => {
                println!("  {} {}: {:#}", "✗".bright_red().bold(), name, e);
                failed += 1;
            }
        }
    }

    println!();
    if failed == 0 {
        println!("{}", format!("All {} scenarios passed", scenarios.len()).bright_green().bold());
        Ok(())
    } else {
        anyhow::bail!("{failed} of {} scenarios failed", scenarios.len());
    }
}
