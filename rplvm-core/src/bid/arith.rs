//! Decimal128 arithmetic.
//!
//! Operands are unpacked to sign/exponent/coefficient, intermediates are
//! exact `BigUint` values, and every result goes through one common
//! rounding finisher: round-half-even to 34 digits, overflow to infinity,
//! gradual underflow to subnormals and zero.

use super::{ndigits, Bid128, Unpacked, COEF_MAX, EXP_MAX, EXP_MIN, PRECISION};
use num_bigint::BigUint;
use std::cmp::Ordering;

const SIGN_BIT: u128 = 1 << 127;

fn big(coef: u128) -> BigUint {
    BigUint::from(coef)
}

fn big_zero() -> BigUint {
    BigUint::from(0u32)
}

/// 10^k as a `BigUint`, for arbitrary k.
fn pow10_big(k: u64) -> BigUint {
    // 10^19 is the largest power of ten in a u64.
    let chunk = BigUint::from(10_000_000_000_000_000_000u64);
    let mut r = BigUint::from(1u32);
    let mut k = k;
    while k >= 19 {
        r *= &chunk;
        k -= 19;
    }
    let mut rest: u64 = 1;
    for _ in 0..k {
        rest *= 10;
    }
    r * BigUint::from(rest)
}

fn is_odd(v: &BigUint) -> bool {
    v.to_u64_digits().first().map_or(false, |d| d & 1 == 1)
}

fn decimal_digits(v: &BigUint) -> i64 {
    v.to_string().len() as i64
}

/// Converts a value known to fit the canonical coefficient range.
fn big_to_u128(v: &BigUint) -> u128 {
    let digits = v.to_u64_digits();
    match digits.len() {
        0 => 0,
        1 => digits[0] as u128,
        2 => (digits[0] as u128) | ((digits[1] as u128) << 64),
        _ => unreachable!("coefficient exceeds 128 bits"),
    }
}

/// Rounds an exact (sign, coefficient, exponent) triple into a packed
/// decimal128: one round-half-even pass covering both the 34-digit
/// precision limit and exponent-range underflow, then overflow handling.
/// `sticky` records discarded non-zero digits below the coefficient.
pub(crate) fn round_finish(sign: bool, coef: BigUint, exp: i64, sticky: bool) -> Bid128 {
    let zero = big_zero();
    if coef == zero {
        let exp = exp.clamp(EXP_MIN as i64, EXP_MAX as i64) as i32;
        return Bid128::pack(sign, exp, 0);
    }

    let mut coef = coef;
    let mut exp = exp;
    let ndig = decimal_digits(&coef);
    let drop_precision = ndig - PRECISION as i64;
    let drop_underflow = EXP_MIN as i64 - exp;
    let drop = drop_precision.max(drop_underflow).max(0);
    // Dropping more digits than the coefficient has puts the value
    // strictly below half an ulp of the smallest subnormal.
    if drop > ndig {
        return Bid128::pack(sign, EXP_MIN, 0);
    }
    if drop > 0 {
        let p = pow10_big(drop as u64);
        let half = &p / BigUint::from(2u32);
        let q = &coef / &p;
        let r = &coef % &p;
        let up = match r.cmp(&half) {
            Ordering::Greater => true,
            Ordering::Equal => sticky || is_odd(&q),
            Ordering::Less => false,
        };
        coef = if up { q + BigUint::from(1u32) } else { q };
        exp += drop;
        // The round-up can carry into a 35th digit; that value is exactly
        // a power of ten, so one exact shift restores the precision.
        if decimal_digits(&coef) > PRECISION as i64 {
            coef /= BigUint::from(10u32);
            exp += 1;
        }
    }

    if coef == zero {
        return Bid128::pack(sign, EXP_MIN, 0);
    }

    // Overflow: pad the coefficient with zeros while that keeps it
    // canonical, then give up and round to infinity.
    let ten = BigUint::from(10u32);
    let max = big(COEF_MAX);
    while exp > EXP_MAX as i64 {
        let wider = &coef * &ten;
        if wider > max {
            return Bid128::infinity(sign);
        }
        coef = wider;
        exp -= 1;
    }

    Bid128::pack(sign, exp as i32, big_to_u128(&coef))
}

/// Magnitude comparison of two non-zero finite operands.
fn cmp_mag(e1: i32, c1: u128, e2: i32, c2: u128) -> Ordering {
    let a1 = e1 as i64 + ndigits(c1) as i64;
    let a2 = e2 as i64 + ndigits(c2) as i64;
    if a1 != a2 {
        return a1.cmp(&a2);
    }
    let e = e1.min(e2);
    let s1 = big(c1) * pow10_big((e1 - e) as u64);
    let s2 = big(c2) * pow10_big((e2 - e) as u64);
    s1.cmp(&s2)
}

impl Bid128 {
    pub fn neg(self) -> Bid128 {
        Bid128::from_bits(self.to_bits() ^ SIGN_BIT)
    }

    pub fn abs(self) -> Bid128 {
        Bid128::from_bits(self.to_bits() & !SIGN_BIT)
    }

    pub fn add(self, other: Bid128) -> Bid128 {
        use Unpacked::*;
        match (self.unpack(), other.unpack()) {
            (Nan { .. }, _) | (_, Nan { .. }) => Bid128::nan(),
            (Infinity { sign: a }, Infinity { sign: b }) => {
                if a == b {
                    Bid128::infinity(a)
                } else {
                    Bid128::nan()
                }
            }
            (Infinity { sign }, Finite { .. }) | (Finite { .. }, Infinity { sign }) => {
                Bid128::infinity(sign)
            }
            (
                Finite {
                    sign: s1,
                    exp: e1,
                    coef: c1,
                },
                Finite {
                    sign: s2,
                    exp: e2,
                    coef: c2,
                },
            ) => {
                let e = e1.min(e2);
                let a = big(c1) * pow10_big((e1 - e) as u64);
                let b = big(c2) * pow10_big((e2 - e) as u64);
                if s1 == s2 {
                    round_finish(s1, a + b, e as i64, false)
                } else {
                    match a.cmp(&b) {
                        Ordering::Equal => round_finish(false, big_zero(), e as i64, false),
                        Ordering::Greater => round_finish(s1, a - b, e as i64, false),
                        Ordering::Less => round_finish(s2, b - a, e as i64, false),
                    }
                }
            }
        }
    }

    pub fn sub(self, other: Bid128) -> Bid128 {
        self.add(other.neg())
    }

    pub fn mul(self, other: Bid128) -> Bid128 {
        use Unpacked::*;
        match (self.unpack(), other.unpack()) {
            (Nan { .. }, _) | (_, Nan { .. }) => Bid128::nan(),
            (Infinity { sign: a }, Infinity { sign: b }) => Bid128::infinity(a != b),
            (Infinity { sign }, Finite { sign: s, coef, .. })
            | (Finite { sign: s, coef, .. }, Infinity { sign }) => {
                if coef == 0 {
                    Bid128::nan()
                } else {
                    Bid128::infinity(sign != s)
                }
            }
            (
                Finite {
                    sign: s1,
                    exp: e1,
                    coef: c1,
                },
                Finite {
                    sign: s2,
                    exp: e2,
                    coef: c2,
                },
            ) => round_finish(s1 != s2, big(c1) * big(c2), e1 as i64 + e2 as i64, false),
        }
    }

    pub fn div(self, other: Bid128) -> Bid128 {
        use Unpacked::*;
        match (self.unpack(), other.unpack()) {
            (Nan { .. }, _) | (_, Nan { .. }) => Bid128::nan(),
            (Infinity { .. }, Infinity { .. }) => Bid128::nan(),
            (Infinity { sign }, Finite { sign: s, .. }) => Bid128::infinity(sign != s),
            (Finite { sign: s, .. }, Infinity { sign }) => {
                round_finish(s != sign, big_zero(), EXP_MIN as i64, false)
            }
            (
                Finite {
                    sign: s1,
                    exp: e1,
                    coef: c1,
                },
                Finite {
                    sign: s2,
                    exp: e2,
                    coef: c2,
                },
            ) => {
                let sign = s1 != s2;
                let preferred = e1 as i64 - e2 as i64;
                if c2 == 0 {
                    return if c1 == 0 {
                        Bid128::nan()
                    } else {
                        Bid128::infinity(sign)
                    };
                }
                if c1 == 0 {
                    return round_finish(sign, big_zero(), preferred, false);
                }
                let dx = ndigits(c1) as i64;
                let dy = ndigits(c2) as i64;
                // Scale the dividend so the quotient has at least 35
                // digits; the finisher then performs the one rounding.
                let k = (35 - (dx - dy)).max(0) as u64;
                let num = big(c1) * pow10_big(k);
                let den = big(c2);
                let mut q = &num / &den;
                let r = &num % &den;
                let mut exp = preferred - k as i64;
                if r == big_zero() {
                    // Exact: move back toward the preferred exponent.
                    let ten = BigUint::from(10u32);
                    while exp < preferred && (&q % &ten) == big_zero() {
                        q /= &ten;
                        exp += 1;
                    }
                    round_finish(sign, q, exp, false)
                } else {
                    round_finish(sign, q, exp, true)
                }
            }
        }
    }

    /// Truncated-toward-zero remainder; the result has the dividend's sign.
    pub fn modulo(self, other: Bid128) -> Bid128 {
        use Unpacked::*;
        match (self.unpack(), other.unpack()) {
            (Nan { .. }, _) | (_, Nan { .. }) => Bid128::nan(),
            (Infinity { .. }, _) => Bid128::nan(),
            (Finite { .. }, Infinity { .. }) => self,
            (
                Finite {
                    sign: s1,
                    exp: e1,
                    coef: c1,
                },
                Finite {
                    exp: e2, coef: c2, ..
                },
            ) => {
                if c2 == 0 {
                    return Bid128::nan();
                }
                if c1 == 0 {
                    return self;
                }
                if cmp_mag(e1, c1, e2, c2) == Ordering::Less {
                    return self;
                }
                let e = e1.min(e2);
                let a = big(c1) * pow10_big((e1 - e) as u64);
                let b = big(c2) * pow10_big((e2 - e) as u64);
                round_finish(s1, a % b, e as i64, false)
            }
        }
    }

    /// IEEE-754 remainder: `x - n*y` with `n` the round-half-even integer
    /// nearest `x/y`.
    pub fn remainder(self, other: Bid128) -> Bid128 {
        use Unpacked::*;
        match (self.unpack(), other.unpack()) {
            (Nan { .. }, _) | (_, Nan { .. }) => Bid128::nan(),
            (Infinity { .. }, _) => Bid128::nan(),
            (Finite { .. }, Infinity { .. }) => self,
            (
                Finite {
                    sign: s1,
                    exp: e1,
                    coef: c1,
                },
                Finite {
                    exp: e2, coef: c2, ..
                },
            ) => {
                if c2 == 0 {
                    return Bid128::nan();
                }
                if c1 == 0 {
                    return self;
                }
                let e = e1.min(e2);
                let a = big(c1) * pow10_big((e1 - e) as u64);
                let b = big(c2) * pow10_big((e2 - e) as u64);
                let q = &a / &b;
                let r = &a % &b;
                if r == big_zero() {
                    return round_finish(s1, big_zero(), e as i64, false);
                }
                let up = match (&r + &r).cmp(&b) {
                    Ordering::Greater => true,
                    Ordering::Equal => is_odd(&q),
                    Ordering::Less => false,
                };
                if up {
                    round_finish(!s1, b - r, e as i64, false)
                } else {
                    round_finish(s1, r, e as i64, false)
                }
            }
        }
    }

    /// IEEE ordering: `None` when either operand is a NaN; zeros compare
    /// equal regardless of sign.
    pub fn compare(self, other: Bid128) -> Option<Ordering> {
        use Unpacked::*;
        match (self.unpack(), other.unpack()) {
            (Nan { .. }, _) | (_, Nan { .. }) => None,
            (Infinity { sign: a }, Infinity { sign: b }) => Some(match (a, b) {
                (true, true) | (false, false) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
            }),
            (Infinity { sign }, Finite { .. }) => Some(if sign {
                Ordering::Less
            } else {
                Ordering::Greater
            }),
            (Finite { .. }, Infinity { sign }) => Some(if sign {
                Ordering::Greater
            } else {
                Ordering::Less
            }),
            (
                Finite {
                    sign: s1,
                    exp: e1,
                    coef: c1,
                },
                Finite {
                    sign: s2,
                    exp: e2,
                    coef: c2,
                },
            ) => Some(match (c1 == 0, c2 == 0) {
                (true, true) => Ordering::Equal,
                (true, false) => {
                    if s2 {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                }
                (false, true) => {
                    if s1 {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    }
                }
                (false, false) => {
                    if s1 != s2 {
                        if s1 {
                            Ordering::Less
                        } else {
                            Ordering::Greater
                        }
                    } else {
                        let mag = cmp_mag(e1, c1, e2, c2);
                        if s1 {
                            mag.reverse()
                        } else {
                            mag
                        }
                    }
                }
            }),
        }
    }
}
