//! IEEE-754-2008 decimal128 values, BID encoding.
//!
//! The calculator stores these as verbatim 16-byte bit patterns inside
//! arena objects, so the type is a plain `u128` wrapper with explicit
//! pack/unpack rather than anything clever. Arithmetic lives in
//! [`arith`], text conversion in [`text`].
//!
//! Layout (bit 127 down):
//! - sign: 1 bit
//! - if the two bits below the sign are not `11`: 14-bit biased exponent,
//!   then a 113-bit coefficient;
//! - if they are `11`: either infinity (`11110` below the sign), NaN
//!   (`11111`, next bit = signaling), or the "large coefficient" form
//!   whose implied coefficient always exceeds 34 digits and therefore
//!   decodes as zero.

pub mod arith;
pub mod text;

use num_bigint::BigInt;
use num_bigint::Sign;

/// Exponent bias.
pub const BIAS: i32 = 6176;
/// Smallest quantum exponent.
pub const EXP_MIN: i32 = -6176;
/// Largest quantum exponent.
pub const EXP_MAX: i32 = 6111;
/// Smallest adjusted exponent of a normal number.
pub const EMIN_NORMAL: i32 = -6143;
/// Coefficient precision in decimal digits.
pub const PRECISION: usize = 34;
/// Largest canonical coefficient: 34 nines.
pub const COEF_MAX: u128 = 9_999_999_999_999_999_999_999_999_999_999_999;

const SIGN_BIT: u128 = 1 << 127;
const COEF_MASK: u128 = (1 << 113) - 1;

/// A decimal128 bit pattern.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Bid128 {
    bits: u128,
}

/// The ten-way IEEE classification. Variant order is meaningful: the
/// derived predicates below are range tests over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Class {
    SignalingNan,
    QuietNan,
    NegInfinity,
    NegNormal,
    NegSubnormal,
    NegZero,
    PosZero,
    PosSubnormal,
    PosNormal,
    PosInfinity,
}

/// Decoded form used by arithmetic and formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Unpacked {
    Nan { signaling: bool },
    Infinity { sign: bool },
    /// `coef` is canonical (at most 34 digits); `exp` is the quantum
    /// exponent in `[EXP_MIN, EXP_MAX]`.
    Finite { sign: bool, exp: i32, coef: u128 },
}

impl Bid128 {
    pub const ZERO: Bid128 = Bid128 {
        bits: (BIAS as u128) << 113,
    };

    pub fn from_bits(bits: u128) -> Self {
        Bid128 { bits }
    }

    pub fn to_bits(self) -> u128 {
        self.bits
    }

    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Bid128 {
            bits: u128::from_le_bytes(bytes),
        }
    }

    pub fn to_le_bytes(self) -> [u8; 16] {
        self.bits.to_le_bytes()
    }

    /// Canonical quiet NaN.
    pub fn nan() -> Self {
        Bid128 {
            bits: 0b11111 << 122,
        }
    }

    /// Canonical signaling NaN.
    pub fn signaling_nan() -> Self {
        Bid128 {
            bits: (0b11111 << 122) | (1 << 121),
        }
    }

    pub fn infinity(negative: bool) -> Self {
        let mut bits = 0b11110u128 << 122;
        if negative {
            bits |= SIGN_BIT;
        }
        Bid128 { bits }
    }

    pub fn zero(negative: bool) -> Self {
        Self::pack(negative, 0, 0)
    }

    /// Checked construction from sign, quantum exponent and coefficient.
    pub fn from_parts(sign: bool, exp: i32, coef: u128) -> Option<Self> {
        if coef > COEF_MAX || !(EXP_MIN..=EXP_MAX).contains(&exp) {
            return None;
        }
        Some(Self::pack(sign, exp, coef))
    }

    /// Packs a finite value. `coef` must be canonical and `exp` in range.
    pub(crate) fn pack(sign: bool, exp: i32, coef: u128) -> Self {
        debug_assert!(coef <= COEF_MAX);
        debug_assert!((EXP_MIN..=EXP_MAX).contains(&exp));
        let biased = (exp + BIAS) as u128;
        let mut bits = (biased << 113) | coef;
        if sign {
            bits |= SIGN_BIT;
        }
        Bid128 { bits }
    }

    pub(crate) fn unpack(self) -> Unpacked {
        let bits = self.bits;
        let sign = bits & SIGN_BIT != 0;
        let g = ((bits >> 122) & 0x1f) as u8;
        if g >> 3 != 0b11 {
            let exp = ((bits >> 113) & 0x3fff) as i32 - BIAS;
            let mut coef = bits & COEF_MASK;
            if coef > COEF_MAX {
                coef = 0;
            }
            return Unpacked::Finite { sign, exp, coef };
        }
        match g {
            0b11110 => Unpacked::Infinity { sign },
            0b11111 => Unpacked::Nan {
                signaling: (bits >> 121) & 1 != 0,
            },
            _ => {
                // Large-coefficient form: the implied coefficient is at
                // least 2^113 > COEF_MAX, hence non-canonical, hence zero.
                let exp = ((bits >> 111) & 0x3fff) as i32 - BIAS;
                Unpacked::Finite { sign, exp, coef: 0 }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn from_u64(value: u64) -> Self {
        Self::pack(false, 0, value as u128)
    }

    pub fn from_i64(value: i64) -> Self {
        Self::pack(value < 0, 0, value.unsigned_abs() as u128)
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_u64(value as u64)
    }

    pub fn from_i32(value: i32) -> Self {
        Self::from_i64(value as i64)
    }

    /// Unsigned magnitude with an explicit sign flag.
    pub fn from_magnitude(value: u64, negative: bool) -> Self {
        Self::pack(negative, 0, value as u128)
    }

    /// Arbitrary-precision integer; goes through the text path once the
    /// magnitude exceeds a machine word.
    pub fn from_bigint(value: &BigInt) -> Self {
        let digits = value.magnitude().to_u64_digits();
        match digits.len() {
            0 => Bid128::ZERO,
            1 => Self::from_magnitude(digits[0], value.sign() == Sign::Minus),
            _ => match text::parse_complete(&value.to_string()) {
                Some(v) => v,
                None => Bid128::nan(),
            },
        }
    }

    /// Lossless widening from decimal64.
    pub fn from_bid64(value: Bid64) -> Self {
        match value.unpack() {
            Unpacked::Nan { signaling: true } => Self::signaling_nan(),
            Unpacked::Nan { signaling: false } => Self::nan(),
            Unpacked::Infinity { sign } => Self::infinity(sign),
            Unpacked::Finite { sign, exp, coef } => Self::pack(sign, exp, coef),
        }
    }

    /// Lossless widening from decimal32.
    pub fn from_bid32(value: Bid32) -> Self {
        match value.unpack() {
            Unpacked::Nan { signaling: true } => Self::signaling_nan(),
            Unpacked::Nan { signaling: false } => Self::nan(),
            Unpacked::Infinity { sign } => Self::infinity(sign),
            Unpacked::Finite { sign, exp, coef } => Self::pack(sign, exp, coef),
        }
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    pub fn fpclass(self) -> Class {
        match self.unpack() {
            Unpacked::Nan { signaling: true } => Class::SignalingNan,
            Unpacked::Nan { signaling: false } => Class::QuietNan,
            Unpacked::Infinity { sign: true } => Class::NegInfinity,
            Unpacked::Infinity { sign: false } => Class::PosInfinity,
            Unpacked::Finite { sign, exp, coef } => {
                if coef == 0 {
                    if sign {
                        Class::NegZero
                    } else {
                        Class::PosZero
                    }
                } else {
                    let adjusted = exp + ndigits(coef) as i32 - 1;
                    match (sign, adjusted < EMIN_NORMAL) {
                        (true, true) => Class::NegSubnormal,
                        (true, false) => Class::NegNormal,
                        (false, true) => Class::PosSubnormal,
                        (false, false) => Class::PosNormal,
                    }
                }
            }
        }
    }

    pub fn is_zero(self) -> bool {
        let c = self.fpclass();
        (Class::NegZero..=Class::PosZero).contains(&c)
    }

    pub fn is_negative(self) -> bool {
        let c = self.fpclass();
        (Class::NegInfinity..=Class::NegZero).contains(&c)
    }

    pub fn is_negative_or_zero(self) -> bool {
        let c = self.fpclass();
        (Class::NegInfinity..=Class::PosZero).contains(&c)
    }

    pub fn is_nan(self) -> bool {
        self.fpclass() <= Class::QuietNan
    }

    /// Exact integer value, when the number is finite, integral, and in
    /// `i64` range.
    pub fn to_i64(self) -> Option<i64> {
        let (sign, exp, coef) = match self.unpack() {
            Unpacked::Finite { sign, exp, coef } => (sign, exp, coef),
            _ => return None,
        };
        let mut coef = coef;
        let mut exp = exp;
        while exp > 0 && coef != 0 {
            coef = coef.checked_mul(10)?;
            exp -= 1;
        }
        while exp < 0 && coef != 0 {
            if coef % 10 != 0 {
                return None;
            }
            coef /= 10;
            exp += 1;
        }
        if sign {
            if coef > i64::MAX as u128 + 1 {
                return None;
            }
            Some((coef as i128).wrapping_neg() as i64)
        } else {
            if coef > i64::MAX as u128 {
                return None;
            }
            Some(coef as i64)
        }
    }
}

impl std::fmt::Debug for Bid128 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bid128({})", text::to_editing_string(*self))
    }
}

/// Decimal digit count; 1 for zero.
pub(crate) fn ndigits(coef: u128) -> usize {
    let mut n = 1;
    let mut v = coef / 10;
    while v != 0 {
        n += 1;
        v /= 10;
    }
    n
}

// ---------------------------------------------------------------------------
// Narrow formats, decode-only: the core only ever widens them
// ---------------------------------------------------------------------------

/// A decimal64 bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bid64(pub u64);

impl Bid64 {
    const BIAS: i32 = 398;
    const COEF_MAX: u64 = 9_999_999_999_999_999;

    fn unpack(self) -> Unpacked {
        let bits = self.0;
        let sign = bits >> 63 != 0;
        let g = ((bits >> 58) & 0x1f) as u8;
        if g >> 3 != 0b11 {
            let exp = ((bits >> 53) & 0x3ff) as i32 - Self::BIAS;
            let mut coef = bits & ((1 << 53) - 1);
            if coef > Self::COEF_MAX {
                coef = 0;
            }
            return Unpacked::Finite {
                sign,
                exp,
                coef: coef as u128,
            };
        }
        match g {
            0b11110 => Unpacked::Infinity { sign },
            0b11111 => Unpacked::Nan {
                signaling: (bits >> 57) & 1 != 0,
            },
            _ => {
                let exp = ((bits >> 51) & 0x3ff) as i32 - Self::BIAS;
                let coef = (1u64 << 53) | (bits & ((1 << 51) - 1));
                let coef = if coef > Self::COEF_MAX { 0 } else { coef };
                Unpacked::Finite {
                    sign,
                    exp,
                    coef: coef as u128,
                }
            }
        }
    }
}

/// A decimal32 bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bid32(pub u32);

impl Bid32 {
    const BIAS: i32 = 101;
    const COEF_MAX: u32 = 9_999_999;

    fn unpack(self) -> Unpacked {
        let bits = self.0;
        let sign = bits >> 31 != 0;
        let g = ((bits >> 26) & 0x1f) as u8;
        if g >> 3 != 0b11 {
            let exp = ((bits >> 23) & 0xff) as i32 - Self::BIAS;
            let mut coef = bits & ((1 << 23) - 1);
            if coef > Self::COEF_MAX {
                coef = 0;
            }
            return Unpacked::Finite {
                sign,
                exp,
                coef: coef as u128,
            };
        }
        match g {
            0b11110 => Unpacked::Infinity { sign },
            0b11111 => Unpacked::Nan {
                signaling: (bits >> 25) & 1 != 0,
            },
            _ => {
                let exp = ((bits >> 21) & 0xff) as i32 - Self::BIAS;
                let coef = (1u32 << 23) | (bits & ((1 << 21) - 1));
                let coef = if coef > Self::COEF_MAX { 0 } else { coef };
                Unpacked::Finite {
                    sign,
                    exp,
                    coef: coef as u128,
                }
            }
        }
    }
}
