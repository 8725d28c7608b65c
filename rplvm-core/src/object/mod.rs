//! The object protocol: every arena object starts with a base-128 type
//! tag, and each kind answers the same four operations (size, parse,
//! render, evaluate), dispatched by a match on the tag.
//!
//! The tag-first layout is what lets the collector walk the temporaries
//! region without knowing kinds statically.

pub mod command;
pub mod decimal;
pub mod list;
pub mod symbol;
pub mod text;

use crate::error::{Error, Result};
use crate::leb128;
use crate::render::Renderer;
use crate::runtime::Runtime;

/// Object kinds. A closed enumeration: the discriminant is the encoded
/// tag value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Id {
    Decimal128 = 1,
    Text = 2,
    List = 3,
    Program = 4,
    Symbol = 5,

    Add = 16,
    Sub = 17,
    Mul = 18,
    Div = 19,
    Mod = 20,
    Rem = 21,
    Neg = 22,
    Abs = 23,
    Dup = 24,
    Drop = 25,
    Swap = 26,
    Pick = 27,
    Roll = 28,
    Sto = 29,
    Rcl = 30,
    Eval = 31,
}

impl Id {
    pub fn from_u64(v: u64) -> Option<Id> {
        use Id::*;
        Some(match v {
            1 => Decimal128,
            2 => Text,
            3 => List,
            4 => Program,
            5 => Symbol,
            16 => Add,
            17 => Sub,
            18 => Mul,
            19 => Div,
            20 => Mod,
            21 => Rem,
            22 => Neg,
            23 => Abs,
            24 => Dup,
            25 => Drop,
            26 => Swap,
            27 => Pick,
            28 => Roll,
            29 => Sto,
            30 => Rcl,
            31 => Eval,
            _ => return None,
        })
    }

    pub fn is_command(self) -> bool {
        self as u8 >= Id::Add as u8
    }

    /// Encoded length of this tag.
    pub fn encoded_len(self) -> usize {
        leb128::encoded_len(self as u64)
    }
}

/// Decodes the tag of the object at `off`, returning the kind and the
/// tag's encoded length.
pub fn tag(rt: &Runtime, off: usize) -> (Id, usize) {
    let (value, len) = leb128::peek(rt.slice_from(off)).expect("well-formed object tag");
    let id = Id::from_u64(value).expect("known object tag");
    (id, len)
}

/// Total extent of the object at `off`, including its tag.
pub fn size_of(rt: &Runtime, off: usize) -> usize {
    let (id, tag_len) = tag(rt, off);
    match id {
        Id::Decimal128 => tag_len + 16,
        Id::Text | Id::Symbol | Id::List | Id::Program => {
            let bytes = rt.slice_from(off);
            let (len, len_len) =
                leb128::peek(&bytes[tag_len..]).expect("well-formed length prefix");
            tag_len + len_len + len as usize
        }
        _ => tag_len,
    }
}

/// Performs the object's action: literals push themselves, symbols look
/// up their binding, programs run their contents, commands operate on the
/// stack.
pub fn evaluate(rt: &mut Runtime, off: usize) -> Result<()> {
    let (id, _) = tag(rt, off);
    match id {
        Id::Decimal128 | Id::Text | Id::List => rt.push(off),
        Id::Symbol => symbol::evaluate(rt, off),
        Id::Program => list::run_program(rt, off),
        _ => command::evaluate(rt, id),
    }
}

/// Renders the object at `off` into `out`.
pub fn render(rt: &Runtime, off: usize, out: &mut Renderer) {
    let (id, _) = tag(rt, off);
    match id {
        Id::Decimal128 => decimal::render(rt, off, out),
        Id::Text => text::render(rt, off, out),
        Id::Symbol => symbol::render(rt, off, out),
        Id::List | Id::Program => list::render(rt, off, out),
        _ => command::render(id, out),
    }
}

/// Allocates an object with the given tag and payload bytes.
pub(crate) fn alloc_object(rt: &mut Runtime, id: Id, payload: &[u8]) -> Result<usize> {
    let tag_len = id.encoded_len();
    let total = tag_len + payload.len();
    let off = rt.allocate(total)?;
    let mut head = Vec::with_capacity(tag_len);
    leb128::write(&mut head, id as u64);
    let dest = rt.bytes_mut(off, total);
    dest[..tag_len].copy_from_slice(&head);
    dest[tag_len..].copy_from_slice(payload);
    Ok(off)
}

/// Kind check helper shared by the operations that demand one kind.
pub(crate) fn expect_kind(rt: &Runtime, off: usize, want: Id) -> Result<usize> {
    let (id, tag_len) = tag(rt, off);
    if id != want {
        return Err(Error::Type {
            expected: want,
            got: id,
        });
    }
    Ok(tag_len)
}

// ---------------------------------------------------------------------------
// Helpers the runtime's globals directory needs
// ---------------------------------------------------------------------------

/// Name of the symbol at `off`, or `None` when it is not a symbol.
pub(crate) fn symbol_text<'a>(rt: &'a Runtime, off: usize) -> Option<&'a str> {
    let (id, tag_len) = tag(rt, off);
    if id != Id::Symbol {
        return None;
    }
    symbol::text_at(rt, off, tag_len)
}

/// Bytes a symbol object for `name` occupies.
pub(crate) fn symbol_required(name: &str) -> usize {
    symbol::required(name)
}

/// Writes a symbol object for `name` at `off` (space already reserved).
pub(crate) fn write_symbol(rt: &mut Runtime, off: usize, name: &str) {
    symbol::write_at(rt, off, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::Bid128;

    #[test]
    fn tag_roundtrip() {
        for id in [
            Id::Decimal128,
            Id::Text,
            Id::List,
            Id::Program,
            Id::Symbol,
            Id::Add,
            Id::Eval,
        ] {
            assert_eq!(Id::from_u64(id as u64), Some(id));
        }
        assert_eq!(Id::from_u64(0), None);
        assert_eq!(Id::from_u64(99), None);
    }

    #[test]
    fn size_matches_required_memory() {
        let mut rt = Runtime::new(4096);

        let d = decimal::make(&mut rt, Bid128::from_u64(7)).unwrap();
        assert_eq!(size_of(&rt, d), decimal::required());

        let s = symbol::make(&mut rt, "hello").unwrap();
        assert_eq!(size_of(&rt, s), symbol::required("hello"));

        let t = text::make(&mut rt, "abc").unwrap();
        assert_eq!(size_of(&rt, t), text::required("abc"));

        let c = command::make(&mut rt, Id::Add).unwrap();
        assert_eq!(size_of(&rt, c), Id::Add.encoded_len());
    }

    #[test]
    fn literals_push_themselves() {
        let mut rt = Runtime::new(4096);
        let d = decimal::make(&mut rt, Bid128::from_u64(7)).unwrap();
        evaluate(&mut rt, d).unwrap();
        assert_eq!(rt.depth(), 1);
        assert_eq!(rt.peek(0).unwrap(), d);
    }

    #[test]
    fn expect_kind_reports_both_sides() {
        let mut rt = Runtime::new(4096);
        let t = text::make(&mut rt, "x").unwrap();
        let err = expect_kind(&rt, t, Id::Decimal128).unwrap_err();
        assert_eq!(
            err,
            Error::Type {
                expected: Id::Decimal128,
                got: Id::Text
            }
        );
    }
}
