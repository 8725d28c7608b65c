//! Command objects: tag-only payloads whose action is a stack operation.
//!
//! Arithmetic works on decimals (`+` also concatenates texts and lists),
//! `DUP`/`DROP`/`SWAP`/`PICK`/`ROLL` rearrange the stack, `STO`/`RCL`
//! move values in and out of the globals directory, and `EVAL` is the
//! explicit recursive entry into evaluation.
//!
//! Every command checks the depth it needs before touching anything, so a
//! failed command leaves the stack exactly as it found it.

use super::{alloc_object, decimal, list, symbol, text, Id};
use crate::error::{Error, Result};
use crate::runtime::Runtime;

pub fn make(rt: &mut Runtime, id: Id) -> Result<usize> {
    debug_assert!(id.is_command());
    alloc_object(rt, id, &[])
}

pub fn name(id: Id) -> &'static str {
    match id {
        Id::Add => "+",
        Id::Sub => "-",
        Id::Mul => "*",
        Id::Div => "/",
        Id::Mod => "MOD",
        Id::Rem => "REM",
        Id::Neg => "NEG",
        Id::Abs => "ABS",
        Id::Dup => "DUP",
        Id::Drop => "DROP",
        Id::Swap => "SWAP",
        Id::Pick => "PICK",
        Id::Roll => "ROLL",
        Id::Sto => "STO",
        Id::Rcl => "RCL",
        Id::Eval => "EVAL",
        _ => unreachable!("not a command"),
    }
}

/// Matches a whole word against the command set; alphabetic names are
/// case-insensitive.
pub fn from_word(word: &str) -> Option<Id> {
    match word {
        "+" => return Some(Id::Add),
        "-" => return Some(Id::Sub),
        "*" => return Some(Id::Mul),
        "/" => return Some(Id::Div),
        _ => {}
    }
    let upper = word.to_ascii_uppercase();
    Some(match upper.as_str() {
        "MOD" => Id::Mod,
        "REM" => Id::Rem,
        "NEG" => Id::Neg,
        "ABS" => Id::Abs,
        "DUP" => Id::Dup,
        "DROP" => Id::Drop,
        "SWAP" => Id::Swap,
        "PICK" => Id::Pick,
        "ROLL" => Id::Roll,
        "STO" => Id::Sto,
        "RCL" => Id::Rcl,
        "EVAL" => Id::Eval,
        _ => return None,
    })
}

/// Command hook for the parse chain: an exact word match wins over the
/// symbol catch-all behind it.
pub fn parse(rt: &mut Runtime, src: &str, _base: usize) -> Result<Option<(usize, usize)>> {
    let end = src
        .char_indices()
        .find(|&(_, c)| c.is_whitespace() || matches!(c, '{' | '}' | '\u{ab}' | '\u{bb}' | '"'))
        .map(|(i, _)| i)
        .unwrap_or(src.len());
    if end == 0 {
        return Ok(None);
    }
    match from_word(&src[..end]) {
        Some(id) => {
            let off = make(rt, id)?;
            Ok(Some((off, end)))
        }
        None => Ok(None),
    }
}

pub fn render(id: Id, out: &mut crate::render::Renderer) {
    out.push_str(name(id));
}

pub fn evaluate(rt: &mut Runtime, id: Id) -> Result<()> {
    match id {
        Id::Add => add(rt),
        Id::Sub | Id::Mul | Id::Div | Id::Mod | Id::Rem => binary(rt, id),
        Id::Neg | Id::Abs => unary(rt, id),
        Id::Dup => {
            need(rt, 1)?;
            let top = rt.peek(0)?;
            rt.push(top)
        }
        Id::Drop => {
            need(rt, 1)?;
            rt.pop()?;
            Ok(())
        }
        Id::Swap => {
            need(rt, 2)?;
            let a = rt.peek(0)?;
            let b = rt.peek(1)?;
            rt.poke(0, b)?;
            rt.poke(1, a)
        }
        Id::Pick => pick(rt),
        Id::Roll => roll(rt),
        Id::Sto => sto(rt),
        Id::Rcl => rcl(rt),
        Id::Eval => eval_top(rt),
        _ => unreachable!("not a command"),
    }
}

fn need(rt: &mut Runtime, n: usize) -> Result<()> {
    if rt.depth() < n {
        return rt.fail(Error::StackUnderflow);
    }
    Ok(())
}

/// `+` is polymorphic: decimal addition, text or list concatenation.
fn add(rt: &mut Runtime) -> Result<()> {
    need(rt, 2)?;
    let x = rt.peek(1)?;
    let y = rt.peek(0)?;
    let (xk, _) = super::tag(rt, x);
    let (yk, _) = super::tag(rt, y);
    let result = match (xk, yk) {
        (Id::Decimal128, Id::Decimal128) => {
            let a = decimal::value(rt, x)?;
            let b = decimal::value(rt, y)?;
            decimal::make(rt, a.add(b))?
        }
        (Id::Text, Id::Text) => {
            let joined = format!(
                "{}{}",
                text::content(rt, x)?,
                text::content(rt, y)?
            );
            text::make(rt, &joined)?
        }
        (Id::List, Id::List) => list::concat(rt, Id::List, x, y)?,
        _ if xk == yk => {
            return rt.fail(Error::Type {
                expected: Id::Decimal128,
                got: xk,
            })
        }
        _ => {
            return rt.fail(Error::Type {
                expected: xk,
                got: yk,
            })
        }
    };
    rt.drop_n(2)?;
    rt.push(result)
}

fn binary(rt: &mut Runtime, op: Id) -> Result<()> {
    need(rt, 2)?;
    let x = rt.peek(1)?;
    let y = rt.peek(0)?;
    let a = decimal::value(rt, x)?;
    let b = decimal::value(rt, y)?;
    let r = match op {
        Id::Sub => a.sub(b),
        Id::Mul => a.mul(b),
        Id::Div => a.div(b),
        Id::Mod => a.modulo(b),
        Id::Rem => a.remainder(b),
        _ => unreachable!("not a binary arithmetic command"),
    };
    let off = decimal::make(rt, r)?;
    rt.drop_n(2)?;
    rt.push(off)
}

fn unary(rt: &mut Runtime, op: Id) -> Result<()> {
    need(rt, 1)?;
    let a = decimal::value(rt, rt.peek(0)?)?;
    let r = match op {
        Id::Neg => a.neg(),
        Id::Abs => a.abs(),
        _ => unreachable!("not a unary arithmetic command"),
    };
    let off = decimal::make(rt, r)?;
    rt.drop_n(1)?;
    rt.push(off)
}

/// Pops the level argument for `PICK`/`ROLL`: a finite integral decimal,
/// at least 1.
fn level_arg(rt: &mut Runtime) -> Result<usize> {
    let off = rt.pop()?;
    let v = decimal::value(rt, off)?;
    match v.to_i64() {
        Some(n) if n >= 1 => Ok(n as usize),
        _ => rt.fail(Error::Arithmetic),
    }
}

fn pick(rt: &mut Runtime) -> Result<()> {
    need(rt, 1)?;
    let n = level_arg(rt)?;
    if n > rt.depth() {
        return rt.fail(Error::StackUnderflow);
    }
    let v = rt.peek(n - 1)?;
    rt.push(v)
}

fn roll(rt: &mut Runtime) -> Result<()> {
    need(rt, 1)?;
    let n = level_arg(rt)?;
    if n > rt.depth() {
        return rt.fail(Error::StackUnderflow);
    }
    let v = rt.peek(n - 1)?;
    for i in (1..n).rev() {
        let below = rt.peek(i - 1)?;
        rt.poke(i, below)?;
    }
    rt.poke(0, v)
}

fn sto(rt: &mut Runtime) -> Result<()> {
    need(rt, 2)?;
    let name = symbol::text(rt, rt.peek(0)?)?.to_string();
    let value = rt.peek(1)?;
    rt.store(&name, value)?;
    rt.drop_n(2)
}

fn rcl(rt: &mut Runtime) -> Result<()> {
    need(rt, 1)?;
    let name = symbol::text(rt, rt.peek(0)?)?.to_string();
    let off = rt.recall(&name)?;
    rt.drop_n(1)?;
    rt.push(off)
}

fn eval_top(rt: &mut Runtime) -> Result<()> {
    let obj = rt.pop()?;
    let slot = rt.protect(obj);
    let result = super::evaluate(rt, obj);
    rt.unprotect(slot);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::{Bid128, Class};
    use crate::object;
    use crate::render::render_object;
    use crate::settings::Settings;

    fn push_decimal(rt: &mut Runtime, s: &str) {
        let (off, _) = decimal::parse(rt, s, 0).unwrap().unwrap();
        rt.push(off).unwrap();
    }

    fn top_value(rt: &Runtime) -> Bid128 {
        decimal::value(rt, rt.peek(0).unwrap()).unwrap()
    }

    #[test]
    fn addition() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "1.5");
        push_decimal(&mut rt, "2.25");
        evaluate(&mut rt, Id::Add).unwrap();
        assert_eq!(rt.depth(), 1);
        assert_eq!(top_value(&rt), Bid128::pack(false, -2, 375));
    }

    #[test]
    fn subtraction_order() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "3");
        push_decimal(&mut rt, "5");
        evaluate(&mut rt, Id::Sub).unwrap();
        assert_eq!(top_value(&rt), Bid128::pack(true, 0, 2));
    }

    #[test]
    fn division_by_zero_is_infinity() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "1");
        push_decimal(&mut rt, "0");
        evaluate(&mut rt, Id::Div).unwrap();
        assert_eq!(top_value(&rt).fpclass(), Class::PosInfinity);
    }

    #[test]
    fn underflow_leaves_stack_alone() {
        let mut rt = Runtime::new(4096);
        assert_eq!(evaluate(&mut rt, Id::Add), Err(Error::StackUnderflow));
        assert_eq!(rt.depth(), 0);

        push_decimal(&mut rt, "1");
        assert_eq!(evaluate(&mut rt, Id::Add), Err(Error::StackUnderflow));
        assert_eq!(rt.depth(), 1);
    }

    #[test]
    fn type_error_names_both_kinds() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "1");
        let t = text::make(&mut rt, "x").unwrap();
        rt.push(t).unwrap();
        assert_eq!(
            evaluate(&mut rt, Id::Add),
            Err(Error::Type {
                expected: Id::Decimal128,
                got: Id::Text
            })
        );
    }

    #[test]
    fn text_concatenation() {
        let mut rt = Runtime::new(4096);
        let a = text::make(&mut rt, "foo").unwrap();
        rt.push(a).unwrap();
        let b = text::make(&mut rt, "bar").unwrap();
        rt.push(b).unwrap();
        evaluate(&mut rt, Id::Add).unwrap();
        let top = rt.peek(0).unwrap();
        assert_eq!(text::content(&rt, top).unwrap(), "foobar");
    }

    #[test]
    fn stack_shuffles() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "1");
        push_decimal(&mut rt, "2");
        evaluate(&mut rt, Id::Dup).unwrap();
        assert_eq!(rt.depth(), 3);
        evaluate(&mut rt, Id::Drop).unwrap();
        evaluate(&mut rt, Id::Swap).unwrap();
        assert_eq!(top_value(&rt), Bid128::from_u64(1));

        // 2 1 -> "2 PICK" copies level 2.
        push_decimal(&mut rt, "2");
        evaluate(&mut rt, Id::Pick).unwrap();
        assert_eq!(rt.depth(), 3);
        assert_eq!(top_value(&rt), Bid128::from_u64(2));
    }

    #[test]
    fn roll_moves_level_to_top() {
        let mut rt = Runtime::new(4096);
        for s in ["1", "2", "3"] {
            push_decimal(&mut rt, s);
        }
        push_decimal(&mut rt, "3");
        evaluate(&mut rt, Id::Roll).unwrap();
        assert_eq!(rt.depth(), 3);
        assert_eq!(top_value(&rt), Bid128::from_u64(1));
        let settings = Settings::default();
        assert_eq!(
            render_object(&rt, rt.peek(1).unwrap(), false, &settings),
            "3"
        );
        assert_eq!(
            render_object(&rt, rt.peek(2).unwrap(), false, &settings),
            "2"
        );
    }

    #[test]
    fn pick_rejects_bad_levels() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "1");
        push_decimal(&mut rt, "0.5");
        assert_eq!(evaluate(&mut rt, Id::Pick), Err(Error::Arithmetic));

        push_decimal(&mut rt, "9");
        assert_eq!(evaluate(&mut rt, Id::Pick), Err(Error::StackUnderflow));
    }

    #[test]
    fn sto_and_rcl() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "42");
        let sym = symbol::make(&mut rt, "x").unwrap();
        rt.push(sym).unwrap();
        evaluate(&mut rt, Id::Sto).unwrap();
        assert_eq!(rt.depth(), 0);

        let sym = symbol::make(&mut rt, "x").unwrap();
        rt.push(sym).unwrap();
        evaluate(&mut rt, Id::Rcl).unwrap();
        assert_eq!(rt.depth(), 1);
        assert_eq!(top_value(&rt), Bid128::from_u64(42));

        let sym = symbol::make(&mut rt, "missing").unwrap();
        rt.push(sym).unwrap();
        assert_eq!(
            evaluate(&mut rt, Id::Rcl),
            Err(Error::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn eval_command_recurses() {
        let mut rt = Runtime::new(4096);
        push_decimal(&mut rt, "2");
        push_decimal(&mut rt, "3");
        let plus = object::command::make(&mut rt, Id::Add).unwrap();
        rt.push(plus).unwrap();
        evaluate(&mut rt, Id::Eval).unwrap();
        assert_eq!(rt.depth(), 1);
        assert_eq!(top_value(&rt), Bid128::from_u64(5));
    }

    #[test]
    fn word_matching() {
        assert_eq!(from_word("+"), Some(Id::Add));
        assert_eq!(from_word("mod"), Some(Id::Mod));
        assert_eq!(from_word("Sto"), Some(Id::Sto));
        assert_eq!(from_word("DUP2"), None);
        assert_eq!(from_word("++"), None);
    }
}
