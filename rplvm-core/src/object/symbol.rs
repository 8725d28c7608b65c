//! Symbols: named references to globals.
//!
//! Payload: base-128 byte length followed by the raw UTF-8 name, no
//! terminator. Equality is structural; nothing is interned.

use super::{alloc_object, expect_kind, Id};
use crate::error::Result;
use crate::leb128;
use crate::render::Renderer;
use crate::runtime::Runtime;

pub fn required(name: &str) -> usize {
    Id::Symbol.encoded_len() + leb128::encoded_len(name.len() as u64) + name.len()
}

fn payload(name: &str) -> Vec<u8> {
    let mut p = Vec::with_capacity(name.len() + 2);
    leb128::write(&mut p, name.len() as u64);
    p.extend_from_slice(name.as_bytes());
    p
}

pub fn make(rt: &mut Runtime, name: &str) -> Result<usize> {
    alloc_object(rt, Id::Symbol, &payload(name))
}

/// Writes a symbol into space the caller already reserved (the globals
/// directory does this while the gap it opened is still in hand).
pub(crate) fn write_at(rt: &mut Runtime, off: usize, name: &str) {
    let tag_len = Id::Symbol.encoded_len();
    let p = payload(name);
    let mut head = Vec::with_capacity(tag_len);
    leb128::write(&mut head, Id::Symbol as u64);
    let dest = rt.bytes_mut(off, tag_len + p.len());
    dest[..tag_len].copy_from_slice(&head);
    dest[tag_len..].copy_from_slice(&p);
}

/// Decoded name length.
pub fn length(rt: &Runtime, off: usize) -> Result<usize> {
    let tag_len = expect_kind(rt, off, Id::Symbol)?;
    let (len, _) = leb128::peek(&rt.slice_from(off)[tag_len..]).expect("symbol length");
    Ok(len as usize)
}

/// The name, borrowed straight from the payload.
pub fn text(rt: &Runtime, off: usize) -> Result<&str> {
    let tag_len = expect_kind(rt, off, Id::Symbol)?;
    Ok(text_at(rt, off, tag_len).expect("symbol payload is utf-8"))
}

pub(crate) fn text_at(rt: &Runtime, off: usize, tag_len: usize) -> Option<&str> {
    let bytes = rt.slice_from(off);
    let (len, len_len) = leb128::peek(&bytes[tag_len..])?;
    let start = tag_len + len_len;
    std::str::from_utf8(&bytes[start..start + len as usize]).ok()
}

/// Symbol hook for the parse chain: the identifier-shaped catch-all.
/// Consumes up to the next delimiter; never fails, only skips.
pub fn parse(rt: &mut Runtime, src: &str, _base: usize) -> Result<Option<(usize, usize)>> {
    let end = src
        .char_indices()
        .find(|&(_, c)| c.is_whitespace() || matches!(c, '{' | '}' | '\u{ab}' | '\u{bb}' | '"'))
        .map(|(i, _)| i)
        .unwrap_or(src.len());
    if end == 0 {
        return Ok(None);
    }
    let name = &src[..end];
    let off = make(rt, name)?;
    Ok(Some((off, end)))
}

pub fn render(rt: &Runtime, off: usize, out: &mut Renderer) {
    out.push_str(text(rt, off).expect("symbol payload"));
}

/// Evaluating a symbol evaluates its global binding; an unbound name
/// pushes itself, and only an explicit recall reports the absence.
pub fn evaluate(rt: &mut Runtime, off: usize) -> Result<()> {
    let name = text(rt, off)?.to_string();
    if rt.global_value(&name).is_none() {
        return rt.push(off);
    }
    let copy = rt.recall(&name)?;
    let slot = rt.protect(copy);
    let result = super::evaluate(rt, copy);
    rt.unprotect(slot);
    result
}
