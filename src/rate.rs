//! Interest rate models.
//!
//! Models are stateless: given the elapsed time and the pool's current
//! notionals they return the interest accrued over the gap. Rates are
//! 18-decimal fractions per year; accrual is simple (non-compounding)
//! over the elapsed seconds, rounded down.

use crate::error::{LedgerError, Result};
use crate::math::{fnv1a_64, mul_div_down, WAD};

pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

const YEAR_WAD: u128 = (SECONDS_PER_YEAR as u128) * WAD;

/// Flat borrow rate regardless of utilization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedRateModel {
    /// Annual rate, WAD-scaled (1e18 = 100% per year).
    pub rate: u128,
}

impl FixedRateModel {
    fn interest_accrued(&self, dt: u64, total_borrows: u128) -> Result<u128> {
        let rate_dt = self.rate.checked_mul(dt as u128).ok_or(LedgerError::Overflow)?;
        mul_div_down(total_borrows, rate_dt, YEAR_WAD)
    }
}

/// Two-slope utilization curve: a gentle slope up to the kink point and a
/// steep one past it, so rates spike as the pool runs out of liquidity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KinkedRateModel {
    /// Annual rate at zero utilization, WAD-scaled.
    pub base_rate: u128,
    /// Annual rate added over the `[0, kink]` utilization range.
    pub slope1: u128,
    /// Annual rate added per unit of utilization past the kink.
    pub slope2: u128,
    /// Utilization breakpoint, WAD-scaled (expected <= 1e18).
    pub kink: u128,
}

impl KinkedRateModel {
    fn annual_rate(&self, total_borrows: u128, total_assets: u128) -> Result<u128> {
        let util = if total_assets == 0 {
            0
        } else {
            // Conservation keeps borrows <= assets; clamp anyway.
            mul_div_down(total_borrows, WAD, total_assets)?.min(WAD)
        };

        let rate = if util <= self.kink {
            let slope_part = if self.kink == 0 {
                0
            } else {
                mul_div_down(self.slope1, util, self.kink)?
            };
            self.base_rate.checked_add(slope_part).ok_or(LedgerError::Overflow)?
        } else {
            let above = util - self.kink;
            let excess = if WAD > self.kink {
                mul_div_down(self.slope2, above, WAD - self.kink)?
            } else {
                0
            };
            self.base_rate
                .checked_add(self.slope1)
                .and_then(|r| r.checked_add(excess))
                .ok_or(LedgerError::Overflow)?
        };
        Ok(rate)
    }
}

/// The rate model attached to a pool.
///
/// A closed enum of concrete curves keeps pool state plainly comparable
/// and clonable; new curves are added as variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateModel {
    Fixed(FixedRateModel),
    Kinked(KinkedRateModel),
}

impl RateModel {
    /// Interest earned by the pool's lenders over `dt` seconds, rounded
    /// down. Zero when nothing is borrowed.
    pub fn interest_accrued(&self, dt: u64, total_borrows: u128, total_assets: u128) -> Result<u128> {
        if dt == 0 || total_borrows == 0 {
            return Ok(0);
        }
        let rate = self.current_rate(total_borrows, total_assets)?;
        let rate_dt = rate.checked_mul(dt as u128).ok_or(LedgerError::Overflow)?;
        mul_div_down(total_borrows, rate_dt, YEAR_WAD)
    }

    /// Annual borrow rate at the given notionals, WAD-scaled.
    pub fn current_rate(&self, total_borrows: u128, total_assets: u128) -> Result<u128> {
        match self {
            RateModel::Fixed(m) => Ok(m.rate),
            RateModel::Kinked(m) => m.annual_rate(total_borrows, total_assets),
        }
    }

    /// Parameter fingerprint used for pool id derivation.
    pub fn fingerprint(&self) -> u64 {
        fn split(x: u128) -> [u64; 2] {
            [x as u64, (x >> 64) as u64]
        }
        match self {
            RateModel::Fixed(m) => {
                let [a, b] = split(m.rate);
                fnv1a_64(&[1, a, b])
            }
            RateModel::Kinked(m) => {
                let mut words = [0u64; 9];
                words[0] = 2;
                for (i, p) in [m.base_rate, m.slope1, m.slope2, m.kink].iter().enumerate() {
                    let [a, b] = split(*p);
                    words[1 + 2 * i] = a;
                    words[2 + 2 * i] = b;
                }
                fnv1a_64(&words)
            }
        }
    }
}
