//! Text objects: `"…"` string literals.
//!
//! Same payload shape as symbols: base-128 byte length plus UTF-8 bytes.
//! The quote characters are syntax, not content; there are no escapes.

use super::{alloc_object, expect_kind, Id};
use crate::error::{Error, Result};
use crate::leb128;
use crate::render::Renderer;
use crate::runtime::Runtime;

pub fn required(content: &str) -> usize {
    Id::Text.encoded_len() + leb128::encoded_len(content.len() as u64) + content.len()
}

pub fn make(rt: &mut Runtime, content: &str) -> Result<usize> {
    let mut p = Vec::with_capacity(content.len() + 2);
    leb128::write(&mut p, content.len() as u64);
    p.extend_from_slice(content.as_bytes());
    alloc_object(rt, Id::Text, &p)
}

pub fn content(rt: &Runtime, off: usize) -> Result<&str> {
    let tag_len = expect_kind(rt, off, Id::Text)?;
    let bytes = rt.slice_from(off);
    let (len, len_len) = leb128::peek(&bytes[tag_len..]).expect("text length");
    let start = tag_len + len_len;
    Ok(std::str::from_utf8(&bytes[start..start + len as usize]).expect("text payload is utf-8"))
}

/// String literal hook for the parse chain.
pub fn parse(rt: &mut Runtime, src: &str, base: usize) -> Result<Option<(usize, usize)>> {
    if !src.starts_with('"') {
        return Ok(None);
    }
    match src[1..].find('"') {
        Some(i) => {
            let body = &src[1..1 + i];
            let off = make(rt, body)?;
            Ok(Some((off, i + 2)))
        }
        None => Err(Error::parse(base + src.len(), "unterminated string")),
    }
}

pub fn render(rt: &Runtime, off: usize, out: &mut Renderer) {
    out.push_str("\"");
    out.push_str(content(rt, off).expect("text payload"));
    out.push_str("\"");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_object;
    use crate::settings::Settings;

    #[test]
    fn content_roundtrip() {
        let mut rt = Runtime::new(4096);
        let off = make(&mut rt, "hello world").unwrap();
        assert_eq!(content(&rt, off).unwrap(), "hello world");
    }

    #[test]
    fn parse_consumes_both_quotes() {
        let mut rt = Runtime::new(4096);
        let (off, consumed) = parse(&mut rt, "\"ab cd\" rest", 0).unwrap().unwrap();
        assert_eq!(consumed, 7);
        assert_eq!(content(&rt, off).unwrap(), "ab cd");
    }

    #[test]
    fn empty_string() {
        let mut rt = Runtime::new(4096);
        let (off, consumed) = parse(&mut rt, "\"\"", 0).unwrap().unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(content(&rt, off).unwrap(), "");
    }

    #[test]
    fn unterminated_is_an_error() {
        let mut rt = Runtime::new(4096);
        let err = parse(&mut rt, "\"oops", 3).unwrap_err();
        assert_eq!(err, Error::parse(8, "unterminated string"));
    }

    #[test]
    fn renders_with_quotes() {
        let mut rt = Runtime::new(4096);
        let settings = Settings::default();
        let off = make(&mut rt, "hi").unwrap();
        assert_eq!(render_object(&rt, off, true, &settings), "\"hi\"");
        assert_eq!(render_object(&rt, off, false, &settings), "\"hi\"");
    }
}
