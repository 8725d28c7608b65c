//! Decimal128 objects.
//!
//! Payload: the 16-byte bit pattern, copied verbatim so nothing depends
//! on the alignment of the arithmetic module's data.

use super::{alloc_object, expect_kind, Id};
use crate::bid::{text as bid_text, Bid128};
use crate::error::{Error, Result};
use crate::render::Renderer;
use crate::runtime::Runtime;

pub fn required() -> usize {
    Id::Decimal128.encoded_len() + 16
}

pub fn make(rt: &mut Runtime, value: Bid128) -> Result<usize> {
    alloc_object(rt, Id::Decimal128, &value.to_le_bytes())
}

/// Reads the value back out of the payload.
pub fn value(rt: &Runtime, off: usize) -> Result<Bid128> {
    let tag_len = expect_kind(rt, off, Id::Decimal128)?;
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(rt.bytes(off + tag_len, 16));
    Ok(Bid128::from_le_bytes(bytes))
}

/// Decimal literal hook for the parse chain.
pub fn parse(rt: &mut Runtime, src: &str, base: usize) -> Result<Option<(usize, usize)>> {
    match bid_text::parse_literal(src) {
        Ok(Some((v, consumed))) => {
            let off = make(rt, v)?;
            Ok(Some((off, consumed)))
        }
        Ok(None) => Ok(None),
        Err((pos, message)) => Err(Error::parse(base + pos, message)),
    }
}

pub fn render(rt: &Runtime, off: usize, out: &mut Renderer) {
    let v = value(rt, off).expect("decimal payload");
    if out.editing() {
        out.push_str(&bid_text::to_editing_string(v));
    } else {
        out.push_str(&bid_text::to_display_string(v, out.settings()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_object;
    use crate::settings::Settings;

    #[test]
    fn payload_is_verbatim() {
        let mut rt = Runtime::new(4096);
        let v = Bid128::pack(true, -2, 375);
        let off = make(&mut rt, v).unwrap();
        assert_eq!(value(&rt, off).unwrap().to_bits(), v.to_bits());
    }

    #[test]
    fn parse_allocates_in_temporaries() {
        let mut rt = Runtime::new(4096);
        let (off, consumed) = parse(&mut rt, "2.25", 0).unwrap().unwrap();
        assert_eq!(consumed, 4);
        assert!(off < rt.temporaries_end());
        assert_eq!(value(&rt, off).unwrap(), Bid128::pack(false, -2, 225));
    }

    #[test]
    fn parse_skips_non_numbers() {
        let mut rt = Runtime::new(4096);
        assert_eq!(parse(&mut rt, "hello", 0).unwrap(), None);
    }

    #[test]
    fn parse_positions_are_absolute() {
        let mut rt = Runtime::new(4096);
        let err = parse(&mut rt, "1.2.3", 10).unwrap_err();
        assert_eq!(
            err,
            Error::parse(13, "repeated decimal point")
        );
    }

    #[test]
    fn renders_both_modes() {
        let mut rt = Runtime::new(4096);
        let settings = Settings::default();
        let (off, _) = parse(&mut rt, "1.50", 0).unwrap().unwrap();
        assert_eq!(render_object(&rt, off, true, &settings), "1.50");
        assert_eq!(render_object(&rt, off, false, &settings), "1.5");
    }
}
