//! Display settings consumed by the number renderer.

/// How finite decimals are displayed outside of editing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    /// Significant digits up to `Settings::digits`, trailing zeros
    /// trimmed, scientific beyond the exponent thresholds.
    Standard,
    /// Fixed number of fractional digits.
    Fix(u8),
    /// Scientific with the given number of fractional mantissa digits.
    Sci(u8),
    /// Like `Sci` but the exponent is a multiple of three.
    Eng(u8),
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub mode: DisplayMode,
    /// Significant digits shown in `Standard` mode (1..=34).
    pub digits: u8,
    /// Largest adjusted exponent `Standard` renders without an exponent.
    pub max_exponent: i32,
    /// Smallest adjusted exponent `Standard` renders without an exponent.
    pub min_exponent: i32,
    /// Glyph used for infinities.
    pub infinity: &'static str,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mode: DisplayMode::Standard,
            digits: 12,
            max_exponent: 12,
            min_exponent: -12,
            infinity: "\u{221e}",
        }
    }
}

impl Settings {
    pub fn significant_digits(&self) -> usize {
        (self.digits.clamp(1, 34)) as usize
    }
}
