//! Solvency evaluation scenarios
//!
//! This file verifies the risk module end to end against a live ledger:
//! - the four-case health rule (no debt, no collateral, covered, short)
//! - weighted-LTV minimum collateral, including the uniform-LTV collapse
//! - zero-LTV collateral aborts evaluation instead of being skipped
//! - liquidation gating: healthy positions and over-seizure are rejected
//! - the full-repayment sentinel resolves to the position's live debt
//! - bad-debt gating on a strict value shortfall
//! - the LTV timelock: first listings are immediate, changes are delayed

use aquifer::*;

const ADMIN: Caller = Caller::Admin;
const DISPATCHER: Caller = Caller::Dispatcher;

const USDC: AssetId = AssetId(1);
const WETH: AssetId = AssetId(2);
const WBTC: AssetId = AssetId(3);

const POOL_OWNER: AccountId = AccountId(1);
const LENDER: AccountId = AccountId(10);
const FEE_SINK: AccountId = AccountId(999);
const POS: PositionId = PositionId(7);
const POS2: PositionId = PositionId(8);

fn owner() -> Caller {
    Caller::Account(POOL_OWNER)
}

struct Harness {
    ledger: PoolLedger,
    bank: InMemoryBank,
    engine: RiskEngine,
    registry: PositionRegistry,
    module: RiskModule,
    /// USDC pool owned by POOL_OWNER, zero rate, zero fees.
    pool: PoolId,
}

impl Harness {
    fn ctx(&self) -> RiskContext<'_, InMemoryBank> {
        RiskContext {
            ledger: &self.ledger,
            engine: &self.engine,
            registry: &self.registry,
            bank: &self.bank,
        }
    }

    /// First-time listing: request + accept at the same instant.
    fn list(&mut self, asset: AssetId, ltv: u128) {
        self.engine.request_ltv_update(0, owner(), &self.ledger, self.pool, asset, ltv).unwrap();
        self.engine.accept_ltv_update(0, owner(), &self.ledger, self.pool, asset).unwrap();
    }

    fn add_collateral(&mut self, asset: AssetId, amount: u128) {
        self.bank.mint(asset, Party::Position(POS), amount).unwrap();
        self.registry.add_collateral_asset(POS, asset).unwrap();
    }

    fn add_debt(&mut self, amount: u128) {
        self.ledger.borrow(0, DISPATCHER, &mut self.bank, self.pool, POS, amount).unwrap();
        self.registry.add_debt_pool(POS, self.pool).unwrap();
        // The position deploys the borrowed funds elsewhere, so its
        // collateral balances stay exactly what the tests minted.
        self.bank
            .transfer(USDC, Party::Position(POS), Party::Account(LENDER), amount)
            .unwrap();
    }
}

/// 10% liquidation discount; oracle prices USDC=1.0, WETH=2.0.
fn harness() -> Harness {
    let mut ledger = PoolLedger::new(FEE_SINK);
    let mut bank = InMemoryBank::new();
    let mut engine = RiskEngine::new(WAD / 100, WAD).unwrap();
    engine.set_oracle(ADMIN, USDC, PriceFeed { price: WAD }).unwrap();
    engine.set_oracle(ADMIN, WETH, PriceFeed { price: 2 * WAD }).unwrap();

    let params = PoolParams {
        owner: POOL_OWNER,
        asset: USDC,
        rate_model: RateModel::Fixed(FixedRateModel { rate: 0 }),
        deposit_cap: u128::MAX,
        interest_fee: 0,
        origination_fee: 0,
    };
    let pool = ledger.initialize_pool(0, params).unwrap();
    bank.mint(USDC, Party::Account(LENDER), 1_000_000).unwrap();
    ledger.deposit(0, Caller::Account(LENDER), &mut bank, pool, 1_000_000, LENDER).unwrap();

    Harness {
        ledger,
        bank,
        engine,
        registry: PositionRegistry::new(),
        module: RiskModule::new(WAD / 10).unwrap(),
        pool,
    }
}

// ----------------------------------------------------------------------------
// Four-case health rule
// ----------------------------------------------------------------------------

#[test]
fn empty_position_is_healthy() {
    let h = harness();
    assert!(h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());
    assert_eq!(h.module.risk_data(&h.ctx(), 0, POS).unwrap(), RiskData::default());
}

#[test]
fn collateral_without_debt_is_healthy() {
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.add_collateral(USDC, 1000);

    assert!(h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());
    let data = h.module.risk_data(&h.ctx(), 0, POS).unwrap();
    assert_eq!(
        data,
        RiskData { collateral_value: 1000, debt_value: 0, min_required_collateral: 0 }
    );
}

#[test]
fn debt_without_collateral_is_unhealthy() {
    let mut h = harness();
    h.add_debt(100);

    assert!(!h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());
    let data = h.module.risk_data(&h.ctx(), 0, POS).unwrap();
    assert_eq!(
        data,
        RiskData { collateral_value: 0, debt_value: 100, min_required_collateral: 0 }
    );
}

#[test]
fn covered_and_short_positions() {
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.add_collateral(USDC, 200);
    h.add_debt(100);

    // min required = 100 / 0.5 = 200, exactly covered
    assert!(h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());

    // Burn one unit of collateral and the position tips over
    h.bank
        .transfer(USDC, Party::Position(POS), Party::Account(LENDER), 1)
        .unwrap();
    assert!(!h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());
}

// ----------------------------------------------------------------------------
// Weighted minimum collateral
// ----------------------------------------------------------------------------

#[test]
fn uniform_ltv_collapses_weights() {
    // With every LTV at 0.5, the 60/40 split must not matter:
    // min required is debt / 0.5 regardless of composition.
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.list(WETH, WAD / 2);
    h.add_collateral(USDC, 600);
    h.add_collateral(WETH, 200); // value 400 at price 2.0
    h.add_debt(100);

    let data = h.module.risk_data(&h.ctx(), 0, POS).unwrap();
    assert_eq!(
        data,
        RiskData { collateral_value: 1000, debt_value: 100, min_required_collateral: 200 }
    );

    // A different split, same answer
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.list(WETH, WAD / 2);
    h.add_collateral(USDC, 500);
    h.add_collateral(WETH, 250); // value 500
    h.add_debt(100);
    assert_eq!(h.module.risk_data(&h.ctx(), 0, POS).unwrap().min_required_collateral, 200);

    // Even when the weights themselves round (1/3 and 2/3 of WAD),
    // the per-term round-up keeps the total at debt / ltv
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.list(WETH, WAD / 2);
    h.add_collateral(USDC, 1);
    h.add_collateral(WETH, 1); // value 2, total 3
    h.add_debt(300);
    assert_eq!(h.module.risk_data(&h.ctx(), 0, POS).unwrap().min_required_collateral, 600);
}

#[test]
fn min_required_rounds_against_the_borrower() {
    let mut h = harness();
    h.list(USDC, 3 * WAD / 10);
    h.add_collateral(USDC, 1000);
    h.add_debt(100);

    // ceil(100 / 0.3) = 334, not 333
    assert_eq!(h.module.risk_data(&h.ctx(), 0, POS).unwrap().min_required_collateral, 334);
}

#[test]
fn debt_across_pools_is_summed() {
    let mut h = harness();
    // Second pool lends WETH
    let params = PoolParams {
        owner: POOL_OWNER,
        asset: WETH,
        rate_model: RateModel::Fixed(FixedRateModel { rate: 0 }),
        deposit_cap: u128::MAX,
        interest_fee: 0,
        origination_fee: 0,
    };
    let pool_b = h.ledger.initialize_pool(0, params).unwrap();
    h.bank.mint(WETH, Party::Account(LENDER), 10_000).unwrap();
    h.ledger
        .deposit(0, Caller::Account(LENDER), &mut h.bank, pool_b, 10_000, LENDER)
        .unwrap();

    // Both pools accept USDC collateral at 0.5
    h.list(USDC, WAD / 2);
    h.engine.request_ltv_update(0, owner(), &h.ledger, pool_b, USDC, WAD / 2).unwrap();
    h.engine.accept_ltv_update(0, owner(), &h.ledger, pool_b, USDC).unwrap();

    h.add_collateral(USDC, 1000);
    h.add_debt(100); // value 100
    h.ledger.borrow(0, DISPATCHER, &mut h.bank, pool_b, POS, 25).unwrap(); // value 50
    h.registry.add_debt_pool(POS, pool_b).unwrap();

    let data = h.module.risk_data(&h.ctx(), 0, POS).unwrap();
    assert_eq!(
        data,
        RiskData { collateral_value: 1000, debt_value: 150, min_required_collateral: 300 }
    );
    assert!(h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());
}

#[test]
fn debt_quotes_round_up_before_valuation() {
    // Fixed 100%/year so the borrow pair rebases to {12, 10}
    let mut h = harness();
    let params = PoolParams {
        owner: POOL_OWNER,
        asset: USDC,
        rate_model: RateModel::Fixed(FixedRateModel { rate: WAD }),
        deposit_cap: u128::MAX,
        interest_fee: 0,
        origination_fee: 0,
    };
    let pool = h.ledger.initialize_pool(0, params).unwrap();
    h.bank.mint(USDC, Party::Account(LENDER), 1_000).unwrap();
    h.ledger.deposit(0, Caller::Account(LENDER), &mut h.bank, pool, 1_000, LENDER).unwrap();

    h.ledger.borrow(0, DISPATCHER, &mut h.bank, pool, POS, 7).unwrap();
    h.bank.transfer(USDC, Party::Position(POS), Party::Account(LENDER), 7).unwrap();
    h.ledger.borrow(0, DISPATCHER, &mut h.bank, pool, POS2, 3).unwrap();
    h.registry.add_debt_pool(POS, pool).unwrap();
    h.engine.request_ltv_update(0, owner(), &h.ledger, pool, USDC, WAD / 2).unwrap();
    h.engine.accept_ltv_update(0, owner(), &h.ledger, pool, USDC).unwrap();
    h.bank.mint(USDC, Party::Position(POS), 100).unwrap();
    h.registry.add_collateral_asset(POS, USDC).unwrap();

    // Quarter year: interest floor(10 * 0.25) = 2, pair {12, 10}.
    // 7 shares quote ceil(7 * 12 / 10) = 9, not 8.
    let quarter = SECONDS_PER_YEAR / 4;
    assert_eq!(h.ledger.borrows_of(quarter, pool, POS).unwrap(), 9);
    let data = h.module.risk_data(&h.ctx(), quarter, POS).unwrap();
    assert_eq!(
        data,
        RiskData { collateral_value: 100, debt_value: 9, min_required_collateral: 18 }
    );
}

#[test]
fn health_degrades_as_interest_accrues() {
    let mut h = harness();
    let params = PoolParams {
        owner: POOL_OWNER,
        asset: USDC,
        rate_model: RateModel::Fixed(FixedRateModel { rate: WAD }),
        deposit_cap: u128::MAX,
        interest_fee: 0,
        origination_fee: 0,
    };
    let pool = h.ledger.initialize_pool(0, params).unwrap();
    h.bank.mint(USDC, Party::Account(LENDER), 1_000).unwrap();
    h.ledger.deposit(0, Caller::Account(LENDER), &mut h.bank, pool, 1_000, LENDER).unwrap();
    h.engine.request_ltv_update(0, owner(), &h.ledger, pool, USDC, WAD / 2).unwrap();
    h.engine.accept_ltv_update(0, owner(), &h.ledger, pool, USDC).unwrap();

    h.bank.mint(USDC, Party::Position(POS), 210).unwrap();
    h.registry.add_collateral_asset(POS, USDC).unwrap();
    h.ledger.borrow(0, DISPATCHER, &mut h.bank, pool, POS, 100).unwrap();
    h.registry.add_debt_pool(POS, pool).unwrap();

    // Covered at t=0 (min required 200 vs 210 + the borrowed 100 held
    // by the position itself)
    assert!(h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());

    // After a year the debt doubled and the same collateral is short
    assert!(!h.module.is_position_healthy(&h.ctx(), SECONDS_PER_YEAR, POS).unwrap());
}

// ----------------------------------------------------------------------------
// Zero-LTV collateral
// ----------------------------------------------------------------------------

#[test]
fn unsupported_collateral_fails_loudly() {
    // WETH is priced but never listed for the pool. However valuable,
    // it must abort evaluation, not silently count for nothing.
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.add_collateral(USDC, 10);
    h.add_collateral(WETH, 1_000_000);
    h.add_debt(100);

    let expected = LedgerError::UnsupportedAsset { position: POS, pool: h.pool, asset: WETH };
    assert_eq!(h.module.risk_data(&h.ctx(), 0, POS).unwrap_err(), expected);
    assert_eq!(h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap_err(), expected);
    assert_eq!(
        h.module.validate_bad_debt(&h.ctx(), 0, POS).unwrap_err(),
        expected
    );
}

#[test]
fn zero_balance_of_unsupported_asset_still_fails() {
    // The registry entry alone is enough; the check does not depend on
    // the offending asset carrying value.
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.add_collateral(USDC, 1000);
    h.registry.add_collateral_asset(POS, WETH).unwrap();
    h.add_debt(100);

    assert_eq!(
        h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap_err(),
        LedgerError::UnsupportedAsset { position: POS, pool: h.pool, asset: WETH }
    );
}

// ----------------------------------------------------------------------------
// Liquidation gating
// ----------------------------------------------------------------------------

/// Unhealthy WETH-collateralized position: 100 WETH crashed to price
/// 0.5 (value 50) against 90 USDC of debt (min required 180).
fn underwater() -> Harness {
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.list(WETH, WAD / 2);
    h.add_collateral(WETH, 100);
    h.add_debt(90);
    h.engine.set_oracle(ADMIN, WETH, PriceFeed { price: WAD / 2 }).unwrap();
    assert!(!h.module.is_position_healthy(&h.ctx(), 0, POS).unwrap());
    h
}

#[test]
fn liquidating_a_healthy_position_is_rejected() {
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.add_collateral(USDC, 1000);
    h.add_debt(100);

    assert_eq!(
        h.module.validate_liquidation(
            &h.ctx(),
            0,
            POS,
            &[DebtRepayment { pool: h.pool, amount: 50 }],
            &[CollateralSeizure { asset: USDC, amount: 50 }],
        ),
        Err(LedgerError::LiquidateHealthyPosition { position: POS })
    );
}

#[test]
fn seizure_capped_by_discounted_repayment() {
    let h = underwater();
    let repay = [DebtRepayment { pool: h.pool, amount: 45 }];

    // Repaid value 45, 10% discount: cap = 45 / 0.9 = 50 in value,
    // which is 100 WETH at the crashed price
    let ok = [CollateralSeizure { asset: WETH, amount: 100 }];
    h.module.validate_liquidation(&h.ctx(), 0, POS, &repay, &ok).unwrap();

    let greedy = [CollateralSeizure { asset: WETH, amount: 102 }];
    assert_eq!(
        h.module.validate_liquidation(&h.ctx(), 0, POS, &repay, &greedy),
        Err(LedgerError::SeizedTooMuch { seized_value: 51, max_seized_value: 50 })
    );
}

#[test]
fn zero_discount_caps_seizure_at_repaid_value() {
    let mut h = underwater();
    h.module = RiskModule::new(0).unwrap();
    let repay = [DebtRepayment { pool: h.pool, amount: 45 }];

    h.module
        .validate_liquidation(&h.ctx(), 0, POS, &repay, &[CollateralSeizure { asset: WETH, amount: 90 }])
        .unwrap();
    assert_eq!(
        h.module.validate_liquidation(
            &h.ctx(),
            0,
            POS,
            &repay,
            &[CollateralSeizure { asset: WETH, amount: 92 }],
        ),
        Err(LedgerError::SeizedTooMuch { seized_value: 46, max_seized_value: 45 })
    );
}

#[test]
fn full_repayment_sentinel_resolves_live_debt() {
    let h = underwater();
    // FULL_REPAYMENT stands for the whole 90 of debt: cap 90 / 0.9 =
    // 100 in value, 200 WETH at the crashed price
    let repay = [DebtRepayment { pool: h.pool, amount: FULL_REPAYMENT }];

    h.module
        .validate_liquidation(&h.ctx(), 0, POS, &repay, &[CollateralSeizure { asset: WETH, amount: 200 }])
        .unwrap();
    assert_eq!(
        h.module.validate_liquidation(
            &h.ctx(),
            0,
            POS,
            &repay,
            &[CollateralSeizure { asset: WETH, amount: 202 }],
        ),
        Err(LedgerError::SeizedTooMuch { seized_value: 101, max_seized_value: 100 })
    );
}

#[test]
fn bad_debt_requires_value_shortfall() {
    // Underwater but collateralized: 50 of collateral vs 90 of debt
    let h = underwater();
    h.module.validate_bad_debt(&h.ctx(), 0, POS).unwrap();

    // Exactly break-even is not bad debt
    let mut h = underwater();
    h.engine.set_oracle(ADMIN, WETH, PriceFeed { price: 9 * WAD / 10 }).unwrap();
    assert_eq!(h.module.risk_data(&h.ctx(), 0, POS).unwrap().collateral_value, 90);
    assert_eq!(
        h.module.validate_bad_debt(&h.ctx(), 0, POS),
        Err(LedgerError::NoBadDebt { position: POS })
    );

    // A healthy position certainly is not
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.add_collateral(USDC, 1000);
    h.add_debt(100);
    assert_eq!(
        h.module.validate_bad_debt(&h.ctx(), 0, POS),
        Err(LedgerError::NoBadDebt { position: POS })
    );
}

// ----------------------------------------------------------------------------
// LTV timelock
// ----------------------------------------------------------------------------

#[test]
fn first_listing_is_immediate_changes_are_delayed() {
    let mut h = harness();
    assert_eq!(h.engine.ltv_for(h.pool, USDC), 0);

    // First listing takes effect at the request timestamp
    h.list(USDC, WAD / 2);
    assert_eq!(h.engine.ltv_for(h.pool, USDC), WAD / 2);

    // Changing a live LTV waits out the full timelock
    h.engine
        .request_ltv_update(1000, owner(), &h.ledger, h.pool, USDC, 8 * WAD / 10)
        .unwrap();
    let valid_after = 1000 + TIMELOCK_DURATION;
    assert_eq!(h.engine.ltv_for(h.pool, USDC), WAD / 2);
    assert_eq!(
        h.engine.accept_ltv_update(valid_after - 1, owner(), &h.ledger, h.pool, USDC),
        Err(LedgerError::TimelockPending { pool: h.pool, valid_after, now: valid_after - 1 })
    );
    h.engine.accept_ltv_update(valid_after, owner(), &h.ledger, h.pool, USDC).unwrap();
    assert_eq!(h.engine.ltv_for(h.pool, USDC), 8 * WAD / 10);
}

#[test]
fn stale_ltv_update_expires() {
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.engine
        .request_ltv_update(0, owner(), &h.ledger, h.pool, USDC, 6 * WAD / 10)
        .unwrap();

    let too_late = TIMELOCK_DURATION + TIMELOCK_DEADLINE + 1;
    assert_eq!(
        h.engine.accept_ltv_update(too_late, owner(), &h.ledger, h.pool, USDC),
        Err(LedgerError::TimelockExpired {
            pool: h.pool,
            valid_after: TIMELOCK_DURATION,
            now: too_late
        })
    );
    // The stale request can be re-submitted
    h.engine
        .request_ltv_update(too_late, owner(), &h.ledger, h.pool, USDC, 6 * WAD / 10)
        .unwrap();
    h.engine
        .accept_ltv_update(too_late + TIMELOCK_DURATION, owner(), &h.ledger, h.pool, USDC)
        .unwrap();
    assert_eq!(h.engine.ltv_for(h.pool, USDC), 6 * WAD / 10);
}

#[test]
fn rejected_ltv_update_is_dropped() {
    let mut h = harness();
    h.list(USDC, WAD / 2);
    h.engine
        .request_ltv_update(0, owner(), &h.ledger, h.pool, USDC, 6 * WAD / 10)
        .unwrap();
    h.engine.reject_ltv_update(owner(), &h.ledger, h.pool, USDC).unwrap();

    assert_eq!(
        h.engine.accept_ltv_update(TIMELOCK_DURATION, owner(), &h.ledger, h.pool, USDC),
        Err(LedgerError::NoLtvUpdate { pool: h.pool, asset: USDC })
    );
    assert_eq!(h.engine.ltv_for(h.pool, USDC), WAD / 2);
}

#[test]
fn ltv_requests_validate_oracle_bounds_and_owner() {
    let mut h = harness();

    // No oracle for WBTC
    assert_eq!(
        h.engine.request_ltv_update(0, owner(), &h.ledger, h.pool, WBTC, WAD / 2),
        Err(LedgerError::NoOracle { asset: WBTC })
    );

    // Outside the global [1%, 100%] bounds
    assert_eq!(
        h.engine.request_ltv_update(0, owner(), &h.ledger, h.pool, USDC, WAD / 200),
        Err(LedgerError::OutOfBounds {
            pool: h.pool,
            asset: USDC,
            ltv: WAD / 200,
            min_ltv: WAD / 100,
            max_ltv: WAD
        })
    );
    assert_eq!(
        h.engine.request_ltv_update(0, owner(), &h.ledger, h.pool, USDC, WAD + 1),
        Err(LedgerError::OutOfBounds {
            pool: h.pool,
            asset: USDC,
            ltv: WAD + 1,
            min_ltv: WAD / 100,
            max_ltv: WAD
        })
    );

    // Only the pool owner may list
    assert_eq!(
        h.engine
            .request_ltv_update(0, Caller::Account(LENDER), &h.ledger, h.pool, USDC, WAD / 2),
        Err(LedgerError::OnlyPoolOwner { pool: h.pool })
    );
    assert_eq!(
        h.engine.request_ltv_update(0, ADMIN, &h.ledger, h.pool, USDC, WAD / 2),
        Err(LedgerError::OnlyPoolOwner { pool: h.pool })
    );

    // Unknown pool
    assert_eq!(
        h.engine.request_ltv_update(0, owner(), &h.ledger, PoolId(404), USDC, WAD / 2),
        Err(LedgerError::UnknownPool { pool: PoolId(404) })
    );
}
