//! Decimal128 text conversion.
//!
//! Two renderers share the digit machinery: *editing* output reproduces
//! the coefficient and exponent exactly so re-parsing yields the same bit
//! pattern, *display* output follows the user's display settings.

use super::arith::round_finish;
use super::{Bid128, Unpacked};
use crate::settings::{DisplayMode, Settings};
use num_bigint::BigUint;

/// Largest exponent magnitude accepted from a literal before saturating.
/// Anything beyond this is far outside the representable range and rounds
/// to infinity or zero regardless of the digits.
const EXP_SATURATE: i64 = 2_000_000;

/// Characters that may legitimately follow a standalone value.
fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '\u{ab}' | '\u{bb}' | '"')
}

fn boundary_at(src: &str, pos: usize) -> bool {
    src[pos..].chars().next().map_or(true, is_boundary)
}

/// Attempts to parse a decimal literal at the start of `src`.
///
/// `Ok(Some((value, consumed)))` on success, `Ok(None)` when the text is
/// not number-shaped (so another kind can try), `Err((position, message))`
/// when it is number-shaped but malformed.
pub fn parse_literal(src: &str) -> Result<Option<(Bid128, usize)>, (usize, &'static str)> {
    let bytes = src.as_bytes();
    let mut i = 0;
    let mut sign = false;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        sign = bytes[i] == b'-';
        i += 1;
    }

    // Named specials.
    for (name, value) in [
        ("\u{221e}", Bid128::infinity(sign)),
        ("infinity", Bid128::infinity(sign)),
        ("inf", Bid128::infinity(sign)),
        ("snan", Bid128::signaling_nan()),
        ("nan", Bid128::nan()),
    ] {
        let rest = &bytes[i..];
        if rest.len() >= name.len()
            && rest[..name.len()].eq_ignore_ascii_case(name.as_bytes())
            && boundary_at(src, i + name.len())
        {
            return Ok(Some((value, i + name.len())));
        }
    }

    let mut digits = String::new();
    let mut any = false;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        digits.push(bytes[i] as char);
        any = true;
        i += 1;
    }
    let mut frac_len: i64 = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            digits.push(bytes[i] as char);
            frac_len += 1;
            any = true;
            i += 1;
        }
    }
    if !any {
        return Ok(None);
    }
    if i < bytes.len() && bytes[i] == b'.' {
        return Err((i, "repeated decimal point"));
    }

    let mut exp10 = -frac_len;
    if i < bytes.len() && (bytes[i] == b'E' || bytes[i] == b'e') {
        i += 1;
        let mut exp_sign = false;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            exp_sign = bytes[i] == b'-';
            i += 1;
        }
        if i >= bytes.len() || !bytes[i].is_ascii_digit() {
            return Err((i, "missing exponent digits"));
        }
        let mut e: i64 = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            e = (e * 10 + (bytes[i] - b'0') as i64).min(EXP_SATURATE);
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            return Err((i, "decimal point after exponent"));
        }
        exp10 += if exp_sign { -e } else { e };
    }

    let trimmed = digits.trim_start_matches('0');
    let coef = if trimmed.is_empty() {
        BigUint::from(0u32)
    } else {
        BigUint::parse_bytes(trimmed.as_bytes(), 10).expect("digit string")
    };
    Ok(Some((round_finish(sign, coef, exp10, false), i)))
}

/// Whole-string parse: the literal must span all of `s`.
pub fn parse_complete(s: &str) -> Option<Bid128> {
    match parse_literal(s) {
        Ok(Some((v, consumed))) if consumed == s.len() => Some(v),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Editing renderer: exact, canonical, re-parses to the same bit pattern
// ---------------------------------------------------------------------------

pub fn to_editing_string(v: Bid128) -> String {
    match v.unpack() {
        Unpacked::Nan { signaling: true } => "sNaN".to_string(),
        Unpacked::Nan { signaling: false } => "NaN".to_string(),
        Unpacked::Infinity { sign } => {
            if sign {
                "-\u{221e}".to_string()
            } else {
                "\u{221e}".to_string()
            }
        }
        Unpacked::Finite { sign, exp, coef } => {
            let digits = coef.to_string();
            let n = digits.len() as i64;
            let mut out = String::new();
            if sign {
                out.push('-');
            }
            if exp == 0 {
                out.push_str(&digits);
            } else if exp > 0 {
                scientific(&mut out, &digits, exp as i64 + n - 1);
            } else {
                let point = n + exp as i64;
                if point > 0 {
                    out.push_str(&digits[..point as usize]);
                    out.push('.');
                    out.push_str(&digits[point as usize..]);
                } else if point == 0 {
                    out.push_str("0.");
                    out.push_str(&digits);
                } else {
                    scientific(&mut out, &digits, exp as i64 + n - 1);
                }
            }
            out
        }
    }
}

/// `d[.rest]E<adjusted>`; reparsing recovers the exact coefficient and
/// exponent because the digit string is reproduced verbatim.
fn scientific(out: &mut String, digits: &str, adjusted: i64) {
    out.push_str(&digits[..1]);
    if digits.len() > 1 {
        out.push('.');
        out.push_str(&digits[1..]);
    }
    out.push('E');
    out.push_str(&adjusted.to_string());
}

// ---------------------------------------------------------------------------
// Display renderer
// ---------------------------------------------------------------------------

pub fn to_display_string(v: Bid128, settings: &Settings) -> String {
    let (sign, exp, coef) = match v.unpack() {
        Unpacked::Nan { .. } => return "NaN".to_string(),
        Unpacked::Infinity { sign } => {
            let mut out = String::new();
            if sign {
                out.push('-');
            }
            out.push_str(settings.infinity);
            return out;
        }
        Unpacked::Finite { sign, exp, coef } => (sign, exp, coef),
    };

    let mut out = String::new();
    if sign {
        out.push('-');
    }
    if coef == 0 {
        out.push_str(&zero_for_mode(settings.mode));
        return out;
    }

    // Strip value-preserving trailing zeros before deciding anything.
    let mut digits = coef.to_string();
    let mut exp = exp as i64;
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
        exp += 1;
    }

    match settings.mode {
        DisplayMode::Standard => {
            let (digits, exp) = round_significant(&digits, exp, settings.significant_digits());
            let adjusted = exp + digits.len() as i64 - 1;
            if adjusted > settings.max_exponent as i64 || adjusted < settings.min_exponent as i64 {
                let trimmed = trim_zeros(&digits);
                scientific(&mut out, &trimmed, adjusted);
            } else {
                plain(&mut out, &trim_zeros(&digits), exp + (digits.len() - trim_zeros(&digits).len()) as i64);
            }
        }
        DisplayMode::Fix(k) => {
            let adjusted = exp + digits.len() as i64 - 1;
            if adjusted > settings.max_exponent as i64 {
                let (digits, exp) = round_significant(&digits, exp, k as usize + 1);
                let adjusted = exp + digits.len() as i64 - 1;
                sci_padded(&mut out, &digits, adjusted, k as usize);
            } else {
                let (digits, exp) = round_at(&digits, exp, -(k as i64));
                fixed(&mut out, &digits, exp, k as usize);
            }
        }
        DisplayMode::Sci(k) => {
            let (digits, exp) = round_significant(&digits, exp, k as usize + 1);
            let adjusted = exp + digits.len() as i64 - 1;
            sci_padded(&mut out, &digits, adjusted, k as usize);
        }
        DisplayMode::Eng(k) => {
            let (digits, exp) = round_significant(&digits, exp, k as usize + 1);
            let adjusted = exp + digits.len() as i64 - 1;
            let e3 = adjusted.div_euclid(3) * 3;
            let int_len = (adjusted - e3 + 1) as usize;
            let want = (k as usize + 1).max(int_len);
            let mut padded = digits;
            while padded.len() < want {
                padded.push('0');
            }
            out.push_str(&padded[..int_len]);
            if padded.len() > int_len {
                out.push('.');
                out.push_str(&padded[int_len..]);
            }
            out.push('E');
            out.push_str(&e3.to_string());
        }
    }
    out
}

fn zero_for_mode(mode: DisplayMode) -> String {
    match mode {
        DisplayMode::Standard => "0".to_string(),
        DisplayMode::Fix(0) => "0".to_string(),
        DisplayMode::Fix(k) => format!("0.{}", "0".repeat(k as usize)),
        DisplayMode::Sci(k) | DisplayMode::Eng(k) => {
            if k == 0 {
                "0E0".to_string()
            } else {
                format!("0.{}E0", "0".repeat(k as usize))
            }
        }
    }
}

fn trim_zeros(digits: &str) -> String {
    let t = digits.trim_end_matches('0');
    if t.is_empty() {
        "0".to_string()
    } else {
        t.to_string()
    }
}

/// Plain positional notation for `digits x 10^exp`.
fn plain(out: &mut String, digits: &str, exp: i64) {
    let n = digits.len() as i64;
    if exp >= 0 {
        out.push_str(digits);
        for _ in 0..exp {
            out.push('0');
        }
    } else {
        let point = n + exp;
        if point > 0 {
            out.push_str(&digits[..point as usize]);
            out.push('.');
            out.push_str(&digits[point as usize..]);
        } else {
            out.push_str("0.");
            for _ in 0..-point {
                out.push('0');
            }
            out.push_str(digits);
        }
    }
}

/// Fixed notation with exactly `k` decimals; `digits` already rounded at
/// the 10^-k position.
fn fixed(out: &mut String, digits: &str, exp: i64, k: usize) {
    let mut int_part = String::new();
    let mut frac_part = String::new();
    let n = digits.len() as i64;
    if exp >= 0 {
        int_part.push_str(digits);
        for _ in 0..exp {
            int_part.push('0');
        }
    } else {
        let point = n + exp;
        if point > 0 {
            int_part.push_str(&digits[..point as usize]);
            frac_part.push_str(&digits[point as usize..]);
        } else {
            int_part.push('0');
            for _ in 0..-point {
                frac_part.push('0');
            }
            frac_part.push_str(digits);
        }
    }
    while frac_part.len() < k {
        frac_part.push('0');
    }
    out.push_str(&int_part);
    if k > 0 {
        out.push('.');
        out.push_str(&frac_part[..k]);
    }
}

/// Scientific with exactly `k` mantissa decimals.
fn sci_padded(out: &mut String, digits: &str, adjusted: i64, k: usize) {
    let mut padded = digits.to_string();
    while padded.len() < k + 1 {
        padded.push('0');
    }
    out.push_str(&padded[..1]);
    if k > 0 {
        out.push('.');
        out.push_str(&padded[1..=k]);
    }
    out.push('E');
    out.push_str(&adjusted.to_string());
}

/// Round-half-even to `s` significant digits.
fn round_significant(digits: &str, exp: i64, s: usize) -> (String, i64) {
    if digits.len() <= s {
        return (digits.to_string(), exp);
    }
    let drop = digits.len() - s;
    let (kept, dropped) = digits.split_at(s);
    let mut kept = kept.to_string();
    let exp = exp + drop as i64;
    if should_round_up(&kept, dropped) {
        increment(&mut kept);
        if kept.len() > s {
            kept.pop();
            return (kept, exp + 1);
        }
    }
    (kept, exp)
}

/// Round-half-even at the absolute position `10^target_exp`.
fn round_at(digits: &str, exp: i64, target_exp: i64) -> (String, i64) {
    let drop = target_exp - exp;
    if drop <= 0 {
        return (digits.to_string(), exp);
    }
    let drop = drop as usize;
    if drop >= digits.len() {
        let padded = format!("{}{}", "0".repeat(drop - digits.len()), digits);
        let mut kept = "0".to_string();
        if should_round_up(&kept, &padded) {
            kept = "1".to_string();
        }
        return (kept, target_exp);
    }
    let (kept, dropped) = digits.split_at(digits.len() - drop);
    let mut kept = kept.to_string();
    if should_round_up(&kept, dropped) {
        increment(&mut kept);
    }
    (kept, target_exp)
}

fn should_round_up(kept: &str, dropped: &str) -> bool {
    let first = dropped.as_bytes()[0];
    if first > b'5' {
        return true;
    }
    if first < b'5' {
        return false;
    }
    if dropped.as_bytes()[1..].iter().any(|&b| b != b'0') {
        return true;
    }
    // Tie: round to even.
    kept.as_bytes().last().map_or(false, |&b| (b - b'0') & 1 == 1)
}

/// String increment with carry; "999" becomes "1000".
fn increment(digits: &mut String) {
    let mut bytes = digits.clone().into_bytes();
    let mut i = bytes.len();
    loop {
        if i == 0 {
            bytes.insert(0, b'1');
            break;
        }
        i -= 1;
        if bytes[i] == b'9' {
            bytes[i] = b'0';
        } else {
            bytes[i] += 1;
            break;
        }
    }
    *digits = String::from_utf8(bytes).expect("ascii digits");
}
