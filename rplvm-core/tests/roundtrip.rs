//! Round-trip laws, checked over generated inputs.

use proptest::prelude::*;
use rplvm_core::bid::text::{parse_complete, to_editing_string};
use rplvm_core::bid::COEF_MAX;
use rplvm_core::object::command;
use rplvm_core::{leb128, Bid128, Calculator, Id};

fn is_reserved_word(name: &str) -> bool {
    command::from_word(name).is_some()
        || ["inf", "infinity", "nan", "snan"]
            .iter()
            .any(|w| name.eq_ignore_ascii_case(w))
}

proptest! {
    /// decode(encode(n)) == n, and the encoded length is exactly
    /// ceil(log2(n+1) / 7) bytes (one byte for zero).
    #[test]
    fn leb128_roundtrip(n in any::<u64>()) {
        let mut buf = Vec::new();
        leb128::write(&mut buf, n);

        let bits = 64 - n.leading_zeros() as usize;
        let expected_len = if n == 0 { 1 } else { bits.div_ceil(7) };
        prop_assert_eq!(buf.len(), expected_len);
        prop_assert_eq!(leb128::encoded_len(n), expected_len);

        let mut off = 0;
        prop_assert_eq!(leb128::read(&buf, &mut off), Some(n));
        prop_assert_eq!(off, buf.len());
    }

    /// Editing output re-parses to the identical bit pattern, for every
    /// canonical finite value.
    #[test]
    fn decimal_editing_roundtrip(
        sign in any::<bool>(),
        exp in -6176i32..=6111,
        coef in 0u128..=COEF_MAX,
    ) {
        let v = Bid128::from_parts(sign, exp, coef).expect("canonical parts");
        let rendered = to_editing_string(v);
        let back = parse_complete(&rendered).expect("re-parse");
        prop_assert_eq!(back.to_bits(), v.to_bits(), "via {}", rendered);
    }

    /// Symbols render to their name and parse back to an equal symbol.
    #[test]
    fn symbol_roundtrip(name in "[A-Za-z][A-Za-z0-9_]{0,15}") {
        prop_assume!(!is_reserved_word(&name));

        let mut calc = Calculator::with_arena(16 * 1024);
        calc.push_text(&name).unwrap();
        let off = calc.runtime().peek(0).unwrap();
        prop_assert_eq!(rplvm_core::object::tag(calc.runtime(), off).0, Id::Symbol);

        let rendered = calc.top_text(true).unwrap();
        prop_assert_eq!(&rendered, &name);

        calc.push_text(&rendered).unwrap();
        let original = calc.runtime().peek(1).unwrap();
        let reparsed = calc.runtime().peek(0).unwrap();
        prop_assert_eq!(
            calc.runtime().object_bytes(original),
            calc.runtime().object_bytes(reparsed)
        );
    }

    /// Display output of a parsed literal parses back to an equal value
    /// (not necessarily the same quantum).
    #[test]
    fn display_reparses_to_equal_value(
        sign in any::<bool>(),
        exp in -20i32..=20,
        coef in 0u128..=999_999_999_999u128,
    ) {
        let v = Bid128::from_parts(sign, exp, coef).expect("canonical parts");
        let mut calc = Calculator::with_arena(16 * 1024);
        let shown = {
            let off = rplvm_core::object::decimal::make(calc.runtime_mut(), v).unwrap();
            calc.runtime_mut().push(off).unwrap();
            calc.top_text(false).unwrap()
        };
        let back = parse_complete(&shown).expect("display output parses");
        prop_assert_eq!(back.compare(v), Some(std::cmp::Ordering::Equal), "via {}", shown);
    }
}
