//! The calculator runtime: one contiguous arena holding every object.
//!
//! Region map, offsets growing left to right:
//!
//! ```text
//! [ globals | temporaries | free | stack ]
//!   0         globals_end  temporaries_end  stack_top..arena end
//! ```
//!
//! Globals are pinned. Temporaries are bump-allocated upward and compacted
//! by [`gc`](Runtime::gc). The evaluation stack is an array of 8-byte
//! little-endian object offsets at the top of the arena, growing downward;
//! `stack_top` is the newest entry, kept below `stack_base` exactly like
//! the classic `StackTop < StackBottom` convention.
//!
//! Every reference held outside the arena across an allocation must sit in
//! the safe-handle registry: any allocation can trigger a collection, and
//! a collection renumbers temporary offsets.

mod gc;

use crate::error::{Error, Result};
use crate::object;
use std::sync::atomic::{AtomicBool, Ordering};

const STACK_ENTRY: usize = 8;

/// Default arena: a few hundred kilobytes, the class of hardware this
/// core targets.
pub const DEFAULT_ARENA: usize = 256 * 1024;

pub struct Runtime {
    arena: Vec<u8>,
    globals_end: usize,
    temporaries_end: usize,
    stack_top: usize,
    /// LIFO registry of protected offsets. Strictly nested scopes, so a
    /// plain vector stands in for the classic linked list.
    gc_safe: Vec<usize>,
    last_error: Option<Error>,
    interrupt: AtomicBool,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(DEFAULT_ARENA)
    }
}

impl Runtime {
    pub fn new(arena_size: usize) -> Self {
        let arena_size = arena_size.max(1024);
        Runtime {
            arena: vec![0u8; arena_size],
            globals_end: 0,
            temporaries_end: 0,
            stack_top: arena_size,
            gc_safe: Vec::new(),
            last_error: None,
            interrupt: AtomicBool::new(false),
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn globals_end(&self) -> usize {
        self.globals_end
    }

    pub fn temporaries_end(&self) -> usize {
        self.temporaries_end
    }

    /// Start of the temporaries region.
    pub fn temporaries_start(&self) -> usize {
        self.globals_end
    }

    pub fn free_bytes(&self) -> usize {
        self.stack_top - self.temporaries_end
    }

    pub fn depth(&self) -> usize {
        (self.arena.len() - self.stack_top) / STACK_ENTRY
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Records `err` in the last-error slot and returns it.
    pub(crate) fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.last_error = Some(err.clone());
        Err(err)
    }

    pub(crate) fn set_last_error(&mut self, err: Error) {
        self.last_error = Some(err);
    }

    // -----------------------------------------------------------------------
    // Raw arena access
    // -----------------------------------------------------------------------

    /// Bytes of the object starting at `off`, bounded by its region.
    pub(crate) fn slice_from(&self, off: usize) -> &[u8] {
        let end = if off < self.globals_end {
            self.globals_end
        } else {
            self.temporaries_end
        };
        &self.arena[off..end]
    }

    pub(crate) fn bytes(&self, off: usize, len: usize) -> &[u8] {
        &self.arena[off..off + len]
    }

    pub(crate) fn bytes_mut(&mut self, off: usize, len: usize) -> &mut [u8] {
        &mut self.arena[off..off + len]
    }

    fn read_entry(&self, at: usize) -> usize {
        let mut buf = [0u8; STACK_ENTRY];
        buf.copy_from_slice(&self.arena[at..at + STACK_ENTRY]);
        u64::from_le_bytes(buf) as usize
    }

    fn write_entry(&mut self, at: usize, value: usize) {
        self.arena[at..at + STACK_ENTRY].copy_from_slice(&(value as u64).to_le_bytes());
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    /// Reserves `size` bytes at the top of the temporaries region,
    /// collecting first when the free gap is too small. The caller must
    /// write a complete tagged object into the reservation before the
    /// next allocation, because collections walk the region object by
    /// object.
    pub fn allocate(&mut self, size: usize) -> Result<usize> {
        if self.free_bytes() < size {
            let recycled = self.gc();
            log::debug!("allocation pressure: gc recycled {} bytes", recycled);
            if self.free_bytes() < size {
                return self.fail(Error::OutOfMemory);
            }
        }
        let off = self.temporaries_end;
        self.temporaries_end += size;
        log::trace!("allocated {} bytes at {}", size, off);
        Ok(off)
    }

    /// Total size of the object at `off`, delegated to its kind.
    pub fn size_of(&self, off: usize) -> usize {
        object::size_of(self, off)
    }

    /// The full byte image of the object at `off`.
    pub fn object_bytes(&self, off: usize) -> &[u8] {
        let size = self.size_of(off);
        &self.arena[off..off + size]
    }

    // -----------------------------------------------------------------------
    // Evaluation stack
    // -----------------------------------------------------------------------

    /// Pushes an object offset. The offset is kept protected while the
    /// push itself collects, so the caller needs no handle of its own.
    pub fn push(&mut self, off: usize) -> Result<()> {
        let mut off = off;
        if self.free_bytes() < STACK_ENTRY {
            let slot = self.protect(off);
            let recycled = self.gc();
            off = self.unprotect(slot);
            log::debug!("stack pressure: gc recycled {} bytes", recycled);
            if self.free_bytes() < STACK_ENTRY {
                return self.fail(Error::OutOfMemory);
            }
        }
        self.stack_top -= STACK_ENTRY;
        self.write_entry(self.stack_top, off);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<usize> {
        if self.depth() == 0 {
            return self.fail(Error::StackUnderflow);
        }
        let off = self.read_entry(self.stack_top);
        self.stack_top += STACK_ENTRY;
        Ok(off)
    }

    /// Entry `i` levels below the top (0 = top of stack).
    pub fn peek(&self, i: usize) -> Result<usize> {
        if i >= self.depth() {
            return Err(Error::StackUnderflow);
        }
        Ok(self.read_entry(self.stack_top + i * STACK_ENTRY))
    }

    /// Overwrites entry `i` levels below the top.
    pub fn poke(&mut self, i: usize, off: usize) -> Result<()> {
        if i >= self.depth() {
            return self.fail(Error::StackUnderflow);
        }
        self.write_entry(self.stack_top + i * STACK_ENTRY, off);
        Ok(())
    }

    pub fn drop_n(&mut self, n: usize) -> Result<()> {
        if n > self.depth() {
            return self.fail(Error::StackUnderflow);
        }
        self.stack_top += n * STACK_ENTRY;
        Ok(())
    }

    pub fn clear_stack(&mut self) {
        self.stack_top = self.arena.len();
    }

    /// Raw stack pointer, used to roll back a failed evaluation.
    pub(crate) fn stack_mark(&self) -> usize {
        self.stack_top
    }

    pub(crate) fn stack_restore(&mut self, mark: usize) {
        self.stack_top = mark;
    }

    fn stack_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.depth()).map(move |i| self.read_entry(self.stack_top + i * STACK_ENTRY))
    }

    // -----------------------------------------------------------------------
    // Safe handles
    // -----------------------------------------------------------------------

    /// Registers `off` so collections keep it alive and renumbered.
    /// Scopes are strictly nested: the matching `unprotect` must be the
    /// next one.
    pub fn protect(&mut self, off: usize) -> usize {
        self.gc_safe.push(off);
        self.gc_safe.len() - 1
    }

    /// Current (possibly renumbered) value of a protected offset.
    pub fn protected(&self, slot: usize) -> usize {
        self.gc_safe[slot]
    }

    /// Releases the most recent handle, returning its current offset.
    pub fn unprotect(&mut self, slot: usize) -> usize {
        debug_assert_eq!(slot + 1, self.gc_safe.len(), "handles are LIFO");
        self.gc_safe.pop().expect("unprotect without protect")
    }

    // -----------------------------------------------------------------------
    // Interrupt flag
    // -----------------------------------------------------------------------

    /// Requests a cooperative interruption; observed between evaluation
    /// steps. Callable from another thread (a UI) through a shared
    /// reference.
    pub fn request_interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Consumes a pending interrupt request, failing with `Interrupted`.
    pub(crate) fn check_interrupt(&mut self) -> Result<()> {
        if self.interrupt.swap(false, Ordering::Relaxed) {
            return self.fail(Error::Interrupted);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Globals directory: consecutive [symbol][value] pairs
    // -----------------------------------------------------------------------

    /// Finds the last pair bound to `name`, returning
    /// `(pair_start, value_offset, pair_end)`.
    fn find_global(&self, name: &str) -> Option<(usize, usize, usize)> {
        let mut found = None;
        let mut pos = 0;
        while pos < self.globals_end {
            let sym = pos;
            let val = sym + self.size_of(sym);
            let end = val + self.size_of(val);
            if object::symbol_text(self, sym) == Some(name) {
                found = Some((sym, val, end));
            }
            pos = end;
        }
        found
    }

    /// Binds `name` to the object at `value`, replacing any previous
    /// binding. The value object's bytes are copied into the globals
    /// region; globals never move afterwards.
    pub fn store(&mut self, name: &str, value: usize) -> Result<()> {
        let value_size = self.size_of(value);
        let needed = object::symbol_required(name) + value_size;

        // Make room first: the collection may renumber `value`.
        let slot = self.protect(value);
        if self.free_bytes() < needed {
            self.gc();
        }
        if self.free_bytes() < needed {
            self.unprotect(slot);
            return self.fail(Error::OutOfMemory);
        }

        if let Some((pair_start, _, pair_end)) = self.find_global(name) {
            self.remove_global_range(pair_start, pair_end);
        }

        // Open a gap at the end of globals by sliding every temporary up.
        let gap = self.globals_end;
        self.arena.copy_within(gap..self.temporaries_end, gap + needed);
        self.shift_references(gap, needed as isize);
        self.globals_end += needed;
        self.temporaries_end += needed;

        let value = self.unprotect(slot);
        let sym_size = object::symbol_required(name);
        object::write_symbol(self, gap, name);
        self.arena
            .copy_within(value..value + value_size, gap + sym_size);
        log::debug!("stored '{}' ({} bytes)", name, needed);
        Ok(())
    }

    /// Copies the value bound to `name` into the temporaries region and
    /// returns its offset.
    pub fn recall(&mut self, name: &str) -> Result<usize> {
        let (_, val, end) = match self.find_global(name) {
            Some(found) => found,
            None => return self.fail(Error::NotFound(name.to_string())),
        };
        let size = end - val;
        // Globals are pinned, so `val` survives the allocation.
        let off = self.allocate(size)?;
        self.arena.copy_within(val..end, off);
        Ok(off)
    }

    /// Offset of the value bound to `name` inside the globals region.
    pub(crate) fn global_value(&self, name: &str) -> Option<usize> {
        self.find_global(name).map(|(_, val, _)| val)
    }

    /// Removes `[start, end)` from the globals region, sliding the rest
    /// of the arena down and renumbering references.
    fn remove_global_range(&mut self, start: usize, end: usize) {
        let sz = end - start;
        self.arena.copy_within(end..self.temporaries_end, start);
        self.shift_references(end, -(sz as isize));
        self.globals_end -= sz;
        self.temporaries_end -= sz;
    }

    /// Renumbers every stack entry and safe handle at or above `from`.
    fn shift_references(&mut self, from: usize, delta: isize) {
        for i in 0..self.depth() {
            let at = self.stack_top + i * STACK_ENTRY;
            let r = self.read_entry(at);
            if r >= from {
                self.write_entry(at, (r as isize + delta) as usize);
            }
        }
        for r in &mut self.gc_safe {
            if *r >= from {
                *r = (*r as isize + delta) as usize;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Globals persistence
    // -----------------------------------------------------------------------

    /// The whole globals region as a length-prefixed blob.
    pub fn save_globals(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.globals_end + 4);
        crate::leb128::write(&mut out, self.globals_end as u64);
        out.extend_from_slice(&self.arena[..self.globals_end]);
        out
    }

    /// Appends a previously saved blob to the globals region. The blob
    /// must have been produced by [`save_globals`](Self::save_globals);
    /// only its framing is validated here.
    pub fn load_globals(&mut self, blob: &[u8]) -> Result<()> {
        let mut cursor = 0;
        let len = match crate::leb128::read(blob, &mut cursor) {
            Some(len) => len as usize,
            None => return self.fail(Error::parse(0, "malformed globals blob")),
        };
        if blob.len() - cursor != len {
            return self.fail(Error::parse(cursor, "globals blob length mismatch"));
        }
        if self.free_bytes() < len {
            self.gc();
        }
        if self.free_bytes() < len {
            return self.fail(Error::OutOfMemory);
        }
        let gap = self.globals_end;
        self.arena.copy_within(gap..self.temporaries_end, gap + len);
        self.shift_references(gap, len as isize);
        self.arena[gap..gap + len].copy_from_slice(&blob[cursor..]);
        self.globals_end += len;
        self.temporaries_end += len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_start_empty() {
        let rt = Runtime::new(4096);
        assert_eq!(rt.globals_end(), 0);
        assert_eq!(rt.temporaries_end(), 0);
        assert_eq!(rt.depth(), 0);
        assert_eq!(rt.free_bytes(), 4096);
    }

    #[test]
    fn allocation_bumps_temporaries() {
        let mut rt = Runtime::new(4096);
        let a = rt.allocate(10).unwrap();
        let b = rt.allocate(5).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 10);
        assert_eq!(rt.temporaries_end(), 15);
    }

    #[test]
    fn allocating_exact_free_space_succeeds() {
        let mut rt = Runtime::new(2048);
        // A text object of exactly the free size: 1 tag byte, a two-byte
        // length prefix, 2045 content bytes.
        let body = "a".repeat(2045);
        let off = crate::object::text::make(&mut rt, &body).unwrap();
        assert_eq!(rt.size_of(off), 2048);
        assert_eq!(rt.free_bytes(), 0);

        // One more byte fails while the object stays reachable.
        let slot = rt.protect(off);
        assert_eq!(rt.allocate(1), Err(Error::OutOfMemory));
        assert_eq!(rt.last_error(), Some(&Error::OutOfMemory));
        rt.unprotect(slot);
    }

    #[test]
    fn stack_push_pop() {
        let mut rt = Runtime::new(4096);
        rt.push(3).unwrap();
        rt.push(7).unwrap();
        assert_eq!(rt.depth(), 2);
        assert_eq!(rt.peek(0).unwrap(), 7);
        assert_eq!(rt.peek(1).unwrap(), 3);
        assert_eq!(rt.pop().unwrap(), 7);
        assert_eq!(rt.pop().unwrap(), 3);
        assert_eq!(rt.pop(), Err(Error::StackUnderflow));
    }

    #[test]
    fn drop_and_clear() {
        let mut rt = Runtime::new(4096);
        for i in 0..4 {
            rt.push(i).unwrap();
        }
        rt.drop_n(2).unwrap();
        assert_eq!(rt.depth(), 2);
        assert_eq!(rt.peek(0).unwrap(), 1);
        assert_eq!(rt.drop_n(3), Err(Error::StackUnderflow));
        rt.clear_stack();
        assert_eq!(rt.depth(), 0);
    }

    #[test]
    fn handles_are_lifo() {
        let mut rt = Runtime::new(4096);
        let a = rt.protect(10);
        let b = rt.protect(20);
        assert_eq!(rt.protected(a), 10);
        assert_eq!(rt.protected(b), 20);
        assert_eq!(rt.unprotect(b), 20);
        assert_eq!(rt.unprotect(a), 10);
    }

    #[test]
    fn interrupt_is_consumed_once() {
        let mut rt = Runtime::new(4096);
        assert!(rt.check_interrupt().is_ok());
        rt.request_interrupt();
        assert_eq!(rt.check_interrupt(), Err(Error::Interrupted));
        assert!(rt.check_interrupt().is_ok());
    }
}
