//! Embedded-host API: the surface a keyboard/display layer or a test
//! harness drives.
//!
//! Failed operations record their error in the runtime's last-error slot
//! and roll the stack pointer back to where it stood at entry.

use crate::error::{Error, Result};
use crate::object;
use crate::parser;
use crate::render::render_object;
use crate::runtime::{Runtime, DEFAULT_ARENA};
use crate::settings::Settings;

pub struct Calculator {
    rt: Runtime,
    settings: Settings,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self::with_arena(DEFAULT_ARENA)
    }

    pub fn with_arena(size: usize) -> Self {
        Calculator {
            rt: Runtime::new(size),
            settings: Settings::default(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.rt
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Parses `text`, any number of whitespace-separated objects, and
    /// pushes each in order. On failure nothing stays pushed.
    pub fn push_text(&mut self, text: &str) -> Result<()> {
        let mark = self.rt.stack_mark();
        let result = self.push_text_inner(text);
        if let Err(err) = &result {
            self.rt.stack_restore(mark);
            self.rt.set_last_error(err.clone());
        }
        result
    }

    fn push_text_inner(&mut self, text: &str) -> Result<()> {
        let mut pos = 0;
        while pos < text.len() {
            let c = text[pos..].chars().next().expect("in-bounds position");
            if c.is_whitespace() {
                pos += c.len_utf8();
                continue;
            }
            let (off, consumed) = parser::parse_object(&mut self.rt, &text[pos..], pos)?;
            self.rt.push(off)?;
            pos += consumed;
        }
        Ok(())
    }

    /// Pops and evaluates the top of stack. A failed evaluation restores
    /// the stack pointer recorded right after the pop, so operands an
    /// operation refused stay put and partial pushes vanish.
    pub fn eval(&mut self) -> Result<()> {
        let obj = self.rt.pop()?;
        let mark = self.rt.stack_mark();
        let slot = self.rt.protect(obj);
        let result = object::evaluate(&mut self.rt, obj);
        self.rt.unprotect(slot);
        if let Err(err) = &result {
            self.rt.stack_restore(mark);
            self.rt.set_last_error(err.clone());
        }
        result
    }

    /// Renders the top of stack into `buf`, returning the bytes written.
    /// Truncates at a character boundary when `buf` is too small.
    pub fn render_top(&mut self, buf: &mut [u8], editing: bool) -> Result<usize> {
        let s = self.top_text(editing)?;
        let mut written = 0;
        for (i, c) in s.char_indices() {
            let end = i + c.len_utf8();
            if end > buf.len() {
                break;
            }
            written = end;
        }
        buf[..written].copy_from_slice(&s.as_bytes()[..written]);
        Ok(written)
    }

    /// The top of stack as a string.
    pub fn top_text(&mut self, editing: bool) -> Result<String> {
        if self.rt.depth() == 0 {
            return self.rt.fail(Error::StackUnderflow);
        }
        let off = self.rt.peek(0)?;
        Ok(render_object(&self.rt, off, editing, &self.settings))
    }

    pub fn depth(&self) -> usize {
        self.rt.depth()
    }

    pub fn drop_n(&mut self, n: usize) -> Result<()> {
        self.rt.drop_n(n)
    }

    pub fn clear(&mut self) {
        self.rt.clear_stack();
    }

    /// Pops the top of stack and binds it to `name`.
    pub fn store(&mut self, name: &str) -> Result<()> {
        if self.rt.depth() == 0 {
            return self.rt.fail(Error::StackUnderflow);
        }
        let value = self.rt.peek(0)?;
        self.rt.store(name, value)?;
        self.rt.drop_n(1)
    }

    /// Pushes a copy of the value bound to `name`.
    pub fn recall(&mut self, name: &str) -> Result<()> {
        let off = self.rt.recall(name)?;
        self.rt.push(off)
    }

    pub fn save_globals(&self) -> Vec<u8> {
        self.rt.save_globals()
    }

    pub fn load_globals(&mut self, blob: &[u8]) -> Result<()> {
        self.rt.load_globals(blob)
    }

    /// Requests cooperative interruption of a running program.
    pub fn request_interrupt(&self) {
        self.rt.request_interrupt()
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.rt.last_error()
    }
}
