//! Fixed-point math utilities
//!
//! All fractions in the ledger (fees, rates, LTVs, weights) are 18-decimal
//! fixed point. `mul_div_down` / `mul_div_up` are exact over the full
//! `u128 x u128` range: the product is carried in 256 bits and divided with
//! an explicit rounding direction, so callers never lose precision to an
//! intermediate overflow.

use crate::error::{LedgerError, Result};

/// Fixed-point precision (18 decimals).
pub const WAD: u128 = 1_000_000_000_000_000_000;

const MASK_64: u128 = 0xffff_ffff_ffff_ffff;

/// Full 256-bit product of two u128 values as (high, low) limbs.
#[inline]
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & MASK_64);
    let (b_hi, b_lo) = (b >> 64, b & MASK_64);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Middle column sums at most three 64-bit values, so it fits in u128.
    let mid = (ll >> 64) + (lh & MASK_64) + (hl & MASK_64);
    let lo = (mid << 64) | (ll & MASK_64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divide the 256-bit value `hi * 2^128 + lo` by `d`, returning the quotient
/// and remainder. Requires `d > 0` and `hi < d` (quotient fits in u128).
#[inline]
fn div_rem_wide(hi: u128, lo: u128, d: u128) -> (u128, u128) {
    debug_assert!(d > 0 && hi < d);
    let mut rem = hi;
    let mut quo: u128 = 0;
    // Restoring binary long division over the 128 bits of `lo`. The loop
    // invariant is rem < d at the top of each iteration.
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quo <<= 1;
        // If the shift carried out of 128 bits the true remainder is
        // rem + 2^128 >= d, and wrapping subtraction yields the right value.
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quo |= 1;
        }
    }
    (quo, rem)
}

/// `a * b / d`, rounded toward zero.
///
/// Fails with `DivisionByZero` when `d == 0` and with `Overflow` when the
/// quotient does not fit in u128.
#[inline]
pub fn mul_div_down(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(LedgerError::DivisionByZero);
    }
    if let Some(p) = a.checked_mul(b) {
        return Ok(p / d);
    }
    let (hi, lo) = mul_wide(a, b);
    if hi >= d {
        return Err(LedgerError::Overflow);
    }
    let (quo, _rem) = div_rem_wide(hi, lo, d);
    Ok(quo)
}

/// `a * b / d`, rounded away from zero.
#[inline]
pub fn mul_div_up(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(LedgerError::DivisionByZero);
    }
    if let Some(p) = a.checked_mul(b) {
        let quo = p / d;
        return if p % d == 0 { Ok(quo) } else { quo.checked_add(1).ok_or(LedgerError::Overflow) };
    }
    let (hi, lo) = mul_wide(a, b);
    if hi >= d {
        return Err(LedgerError::Overflow);
    }
    let (quo, rem) = div_rem_wide(hi, lo, d);
    if rem == 0 { Ok(quo) } else { quo.checked_add(1).ok_or(LedgerError::Overflow) }
}

/// FNV-1a fold over a word sequence, used for deterministic id derivation.
#[inline]
pub(crate) fn fnv1a_64(words: &[u64]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for word in words {
        for byte in word.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}


// ═══════════════════════════════════════════════════════════════
// KANI FORMAL VERIFICATION PROOFS
// ═══════════════════════════════════════════════════════════════

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// W1: wide multiplication matches native multiplication when the
    /// product fits in u128.
    #[kani::proof]
    fn w1_mul_wide_matches_native() {
        let a: u64 = kani::any();
        let b: u64 = kani::any();

        let (hi, lo) = mul_wide(a as u128, b as u128);
        assert!(hi == 0, "W1: no high limb for 64-bit inputs");
        assert!(lo == (a as u128) * (b as u128), "W1: low limb correctness");
    }

    /// W2: rounding modes bracket the exact quotient and differ by at
    /// most one.
    #[kani::proof]
    fn w2_rounding_modes() {
        let a: u128 = kani::any();
        let b: u128 = kani::any();
        let d: u128 = kani::any();

        kani::assume(d > 0);
        kani::assume(a < 1u128 << 64);
        kani::assume(b < 1u128 << 64);

        let down = mul_div_down(a, b, d).unwrap();
        let up = mul_div_up(a, b, d).unwrap();

        assert!(up >= down, "W2: up >= down");
        assert!(up - down <= 1, "W2: modes differ by at most 1");
        if (a * b) % d == 0 {
            assert!(up == down, "W2: exact division agrees");
        }
    }

    /// W3: the wide division path agrees with native division on inputs
    /// where both are defined.
    #[kani::proof]
    fn w3_div_rem_wide_correct() {
        let lo: u128 = kani::any();
        let d: u128 = kani::any();

        kani::assume(d > 0);

        let (quo, rem) = div_rem_wide(0, lo, d);
        assert!(quo == lo / d, "W3: quotient");
        assert!(rem == lo % d, "W3: remainder");
    }
}
