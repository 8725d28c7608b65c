//! Slide-compacting collector over the temporaries region.
//!
//! Single pass, low offsets first. Globals are pinned and never scanned.
//! An object is reachable when any stack entry or safe handle points
//! inside its extent; everything else slides down and the walk resumes at
//! the compacted slot, which now holds what used to be the next object.

use super::Runtime;

impl Runtime {
    /// Recycles unreachable temporaries, returning the bytes reclaimed.
    pub fn gc(&mut self) -> usize {
        let mut recycled = 0;
        let mut obj = self.globals_end;
        while obj < self.temporaries_end {
            let next = obj + self.size_of(obj);
            debug_assert!(next <= self.temporaries_end, "object overruns region");
            if self.is_referenced(obj, next) {
                obj = next;
            } else {
                recycled += next - obj;
                self.unused(obj, next);
                // The bytes formerly at `next` now sit at `obj`.
            }
        }
        if recycled > 0 {
            log::debug!("gc: recycled {} bytes", recycled);
        }
        recycled
    }

    /// True when a stack entry or safe handle points within `[obj, next)`.
    fn is_referenced(&self, obj: usize, next: usize) -> bool {
        self.stack_offsets().any(|s| s >= obj && s < next)
            || self.gc_safe.iter().any(|&p| p >= obj && p < next)
    }

    /// Deletes the unused object at `[obj, next)`: renumbers references to
    /// everything above it, slides the tail of the region down, and
    /// shrinks the region.
    fn unused(&mut self, obj: usize, next: usize) {
        let sz = next - obj;
        let last = self.temporaries_end;

        for i in 0..self.depth() {
            let at = self.stack_top + i * super::STACK_ENTRY;
            let r = self.read_entry(at);
            if r >= next && r < last {
                self.write_entry(at, r - sz);
            }
        }
        for p in &mut self.gc_safe {
            if *p >= next && *p < last {
                *p -= sz;
            }
        }

        self.arena.copy_within(next..last, obj);
        self.temporaries_end -= sz;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object;

    fn alloc_decimal(rt: &mut Runtime, n: u64) -> usize {
        object::decimal::make(rt, crate::bid::Bid128::from_u64(n)).unwrap()
    }

    #[test]
    fn gc_with_no_garbage_is_identity() {
        let mut rt = Runtime::new(4096);
        let a = alloc_decimal(&mut rt, 1);
        let b = alloc_decimal(&mut rt, 2);
        rt.push(a).unwrap();
        rt.push(b).unwrap();

        let before = rt.bytes(0, rt.temporaries_end()).to_vec();
        assert_eq!(rt.gc(), 0);
        let after = rt.bytes(0, rt.temporaries_end()).to_vec();
        assert_eq!(before, after);
    }

    #[test]
    fn gc_reclaims_everything_unreachable() {
        let mut rt = Runtime::new(4096);
        let mut total = 0;
        for n in 0..10 {
            let off = alloc_decimal(&mut rt, n);
            total += rt.size_of(off);
        }
        assert_eq!(rt.gc(), total);
        assert_eq!(rt.temporaries_end(), rt.temporaries_start());
    }

    #[test]
    fn gc_preserves_stacked_object() {
        let mut rt = Runtime::new(4096);
        let mut fifth = 0;
        let mut one_size = 0;
        for n in 0..10 {
            let off = alloc_decimal(&mut rt, n);
            one_size = rt.size_of(off);
            if n == 4 {
                fifth = off;
            }
        }
        rt.push(fifth).unwrap();

        let recycled = rt.gc();
        assert_eq!(recycled, 9 * one_size);
        assert_eq!(rt.temporaries_end() - rt.temporaries_start(), one_size);

        let survivor = rt.peek(0).unwrap();
        assert_eq!(
            object::decimal::value(&rt, survivor).unwrap(),
            crate::bid::Bid128::from_u64(4)
        );
    }

    #[test]
    fn gc_updates_safe_handles() {
        let mut rt = Runtime::new(4096);
        let _garbage = alloc_decimal(&mut rt, 0);
        let kept = alloc_decimal(&mut rt, 7);
        let one_size = rt.size_of(kept);
        let slot = rt.protect(kept);

        let recycled = rt.gc();
        assert_eq!(recycled, one_size);

        let kept = rt.unprotect(slot);
        assert_eq!(kept, rt.temporaries_start());
        assert_eq!(
            object::decimal::value(&rt, kept).unwrap(),
            crate::bid::Bid128::from_u64(7)
        );
    }

    #[test]
    fn live_object_bytes_survive_compaction() {
        let mut rt = Runtime::new(4096);
        let _a = alloc_decimal(&mut rt, 11);
        let b = alloc_decimal(&mut rt, 22);
        let _c = alloc_decimal(&mut rt, 33);
        let d = alloc_decimal(&mut rt, 44);

        let b_bytes = rt.bytes(b, rt.size_of(b)).to_vec();
        let d_bytes = rt.bytes(d, rt.size_of(d)).to_vec();
        rt.push(b).unwrap();
        rt.push(d).unwrap();

        rt.gc();

        let b = rt.peek(1).unwrap();
        let d = rt.peek(0).unwrap();
        assert_eq!(rt.bytes(b, rt.size_of(b)), &b_bytes[..]);
        assert_eq!(rt.bytes(d, rt.size_of(d)), &d_bytes[..]);
    }

    #[test]
    fn reference_into_interior_keeps_object() {
        let mut rt = Runtime::new(4096);
        let a = alloc_decimal(&mut rt, 5);
        // Point one past the tag, as a container element reference would.
        rt.push(a + 1).unwrap();
        assert_eq!(rt.gc(), 0);
    }
}
