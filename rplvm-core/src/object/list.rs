//! Lists and programs: composite objects whose elements are stored
//! inline, one complete tagged object after another.
//!
//! Payload: base-128 byte length of the element area, then the element
//! bytes. The object graph is a forest; an element is reachable only
//! through its container, so a reference anywhere inside the container's
//! extent keeps the whole thing alive.
//!
//! Lists are written `{ … }` and evaluate by pushing themselves; programs
//! are written `« … »` (`<< … >>` accepted on input) and evaluate by
//! running their elements in order, honoring interrupt requests between
//! steps.

use super::{alloc_object, expect_kind, Id};
use crate::error::{Error, Result};
use crate::leb128;
use crate::parser;
use crate::render::Renderer;
use crate::runtime::Runtime;

pub fn required(id: Id, payload_len: usize) -> usize {
    id.encoded_len() + leb128::encoded_len(payload_len as u64) + payload_len
}

pub fn make(rt: &mut Runtime, id: Id, elements: &[u8]) -> Result<usize> {
    debug_assert!(id == Id::List || id == Id::Program);
    let mut p = Vec::with_capacity(elements.len() + 2);
    leb128::write(&mut p, elements.len() as u64);
    p.extend_from_slice(elements);
    alloc_object(rt, id, &p)
}

/// Element area of the container at `off`, relative to the object start:
/// `(first_element, end)`.
fn element_span(rt: &Runtime, off: usize) -> (usize, usize) {
    let (id, tag_len) = super::tag(rt, off);
    debug_assert!(id == Id::List || id == Id::Program);
    let bytes = rt.slice_from(off);
    let (len, len_len) = leb128::peek(&bytes[tag_len..]).expect("container length");
    let start = tag_len + len_len;
    (start, start + len as usize)
}

/// Concatenation for the `+` command; both operands must share `id`.
pub fn concat(rt: &mut Runtime, id: Id, a: usize, b: usize) -> Result<usize> {
    expect_kind(rt, a, id)?;
    expect_kind(rt, b, id)?;
    let (a_start, a_end) = element_span(rt, a);
    let (b_start, b_end) = element_span(rt, b);
    let mut elements = Vec::with_capacity((a_end - a_start) + (b_end - b_start));
    elements.extend_from_slice(rt.bytes(a + a_start, a_end - a_start));
    elements.extend_from_slice(rt.bytes(b + b_start, b_end - b_start));
    make(rt, id, &elements)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

const LIST_OPEN: &[&str] = &["{"];
const LIST_CLOSE: &[&str] = &["}"];
const PROGRAM_OPEN: &[&str] = &["\u{ab}", "<<"];
const PROGRAM_CLOSE: &[&str] = &["\u{bb}", ">>"];

/// Composite hook for the parse chain: tries lists, then programs.
pub fn parse(rt: &mut Runtime, src: &str, base: usize) -> Result<Option<(usize, usize)>> {
    if let Some(found) = parse_delimited(rt, src, base, Id::List, LIST_OPEN, LIST_CLOSE)? {
        return Ok(Some(found));
    }
    parse_delimited(rt, src, base, Id::Program, PROGRAM_OPEN, PROGRAM_CLOSE)
}

fn match_any(src: &str, options: &[&str]) -> Option<usize> {
    options
        .iter()
        .find(|open| src.starts_with(**open))
        .map(|open| open.len())
}

fn skip_spaces(src: &str, mut i: usize) -> usize {
    while let Some(c) = src[i..].chars().next() {
        if !c.is_whitespace() {
            break;
        }
        i += c.len_utf8();
    }
    i
}

/// Parses one delimited container. Elements are assembled in host memory
/// and the container is allocated once at the end, so the collector never
/// sees a half-built object.
fn parse_delimited(
    rt: &mut Runtime,
    src: &str,
    base: usize,
    id: Id,
    open: &[&str],
    close: &[&str],
) -> Result<Option<(usize, usize)>> {
    let mut i = match match_any(src, open) {
        Some(n) => n,
        None => return Ok(None),
    };
    let mut elements: Vec<u8> = Vec::new();
    loop {
        i = skip_spaces(src, i);
        if i >= src.len() {
            return Err(Error::parse(base + i, "unterminated container"));
        }
        if let Some(n) = match_any(&src[i..], close) {
            i += n;
            break;
        }
        let (child, consumed) = parser::parse_object(rt, &src[i..], base + i)?;
        // The child was the most recent allocation; copying it out before
        // the next one keeps this safe without a handle.
        let child_size = rt.size_of(child);
        elements.extend_from_slice(rt.bytes(child, child_size));
        i += consumed;
    }
    let off = make(rt, id, &elements)?;
    Ok(Some((off, i)))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(rt: &Runtime, off: usize, out: &mut Renderer) {
    let (id, _) = super::tag(rt, off);
    let (open, close) = if id == Id::Program {
        ("\u{ab}", "\u{bb}")
    } else {
        ("{", "}")
    };
    out.push_str(open);
    let (start, end) = element_span(rt, off);
    let mut rel = start;
    while rel < end {
        out.push_str(" ");
        super::render(rt, off + rel, out);
        rel += super::size_of(rt, off + rel);
    }
    out.push_str(" ");
    out.push_str(close);
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Runs a program: evaluates each element in order. The program offset is
/// protected for the duration because element evaluation can allocate and
/// therefore collect; the cursor is kept relative for the same reason.
pub fn run_program(rt: &mut Runtime, off: usize) -> Result<()> {
    let slot = rt.protect(off);
    let result = run_protected(rt, slot);
    rt.unprotect(slot);
    result
}

fn run_protected(rt: &mut Runtime, slot: usize) -> Result<()> {
    let (start, end) = element_span(rt, rt.protected(slot));
    let mut rel = start;
    while rel < end {
        rt.check_interrupt()?;
        let elem = rt.protected(slot) + rel;
        let size = rt.size_of(elem);
        super::evaluate(rt, elem)?;
        rel += size;
    }
    Ok(())
}
