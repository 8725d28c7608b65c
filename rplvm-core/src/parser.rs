//! Parsing context: text to objects.
//!
//! Kinds are tried in a fixed priority order: numeric literal, string
//! literal, composite, command word, then symbol as the identifier-shaped
//! catch-all. The first hook that consumes input wins; a hook that
//! recognizes its own syntax but finds it malformed fails the whole parse
//! with a position.
//!
//! Source text lives in host memory, outside the arena, so it survives
//! the allocations parsing performs. The parsed object is the newest
//! allocation when a hook returns, which is why the output offset needs
//! no handle until something else allocates.

use crate::error::{Error, Result};
use crate::object::{self, Id};
use crate::runtime::Runtime;

/// State of one parse attempt, handed from hook to hook.
pub struct Parser<'a> {
    /// Kind currently trying to parse.
    pub candidate: Id,
    /// Remaining source text.
    pub source: &'a str,
    /// Position of `source` within the original input, for errors.
    pub base: usize,
    /// End position after a successful parse, relative to `source`.
    pub end: usize,
    /// The parsed object.
    pub out: Option<usize>,
}

type Hook = fn(&mut Runtime, &str, usize) -> Result<Option<(usize, usize)>>;

/// Priority-ordered parse hooks.
const HOOKS: &[(Id, Hook)] = &[
    (Id::Decimal128, object::decimal::parse),
    (Id::Text, object::text::parse),
    (Id::List, object::list::parse),
    (Id::Add, object::command::parse),
    (Id::Symbol, object::symbol::parse),
];

/// Parses one object from the front of `src`; `base` is the offset of
/// `src` within the overall input, used for error positions. Returns the
/// object offset and the bytes consumed.
pub fn parse_object(rt: &mut Runtime, src: &str, base: usize) -> Result<(usize, usize)> {
    let mut p = Parser {
        candidate: Id::Symbol,
        source: src,
        base,
        end: 0,
        out: None,
    };
    for &(candidate, hook) in HOOKS {
        p.candidate = candidate;
        if let Some((off, consumed)) = hook(rt, p.source, p.base)? {
            p.end = consumed;
            p.out = Some(off);
            return Ok((off, consumed));
        }
    }
    Err(Error::parse(base, "unrecognized syntax"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::Bid128;
    use crate::object::decimal;
    use crate::render::render_object;
    use crate::settings::Settings;

    fn parse_full(rt: &mut Runtime, src: &str) -> usize {
        let (off, consumed) = parse_object(rt, src, 0).unwrap();
        assert_eq!(consumed, src.len(), "{}", src);
        off
    }

    #[test]
    fn priority_numbers_before_symbols() {
        let mut rt = Runtime::new(8192);
        let off = parse_full(&mut rt, "1.5");
        assert_eq!(
            decimal::value(&rt, off).unwrap(),
            Bid128::pack(false, -1, 15)
        );
    }

    #[test]
    fn priority_commands_before_symbols() {
        let mut rt = Runtime::new(8192);
        let off = parse_full(&mut rt, "dup");
        assert_eq!(object::tag(&rt, off).0, Id::Dup);

        let off = parse_full(&mut rt, "dupx");
        assert_eq!(object::tag(&rt, off).0, Id::Symbol);
    }

    #[test]
    fn each_kind_parses() {
        let mut rt = Runtime::new(8192);
        let settings = Settings::default();
        for (src, want) in [
            ("3.75", Id::Decimal128),
            ("\"hi\"", Id::Text),
            ("{ 1 2 }", Id::List),
            ("\u{ab} DUP * \u{bb}", Id::Program),
            ("+", Id::Add),
            ("radius", Id::Symbol),
        ] {
            let off = parse_full(&mut rt, src);
            assert_eq!(object::tag(&rt, off).0, want, "{}", src);
            let rendered = render_object(&rt, off, true, &settings);
            assert_eq!(rendered, src, "canonical form of {}", src);
        }
    }

    #[test]
    fn unrecognized_syntax_positions() {
        let mut rt = Runtime::new(8192);
        let err = parse_object(&mut rt, "}", 7).unwrap_err();
        assert_eq!(err, Error::parse(7, "unrecognized syntax"));
    }
}
