//! Register allocator (spec §4.7): a structured per-function layout
//! with a reserved return slot, a parameter band, a local band, and a
//! reusable temporary band.

/// A contiguous run of registers, used both for single-register
/// temporaries (`len == 1`) and `allocateContiguous` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FreeBlock {
    start: u32,
    len: u32,
}

#[derive(Debug)]
pub struct RegisterAllocator {
    /// One past the highest register ever handed out.
    high_water: u32,
    /// First register of the temporary band (after return slot,
    /// parameters, and locals).
    temp_band_start: u32,
    free_singles: Vec<u32>,
    free_blocks: Vec<FreeBlock>,
}

impl RegisterAllocator {
    /// `param_count` includes an implicit leading `this` for methods
    /// (the caller passes `param_count + 1` in that case); `local_count`
    /// is the number of declared locals. Register 0 is always the
    /// return slot.
    pub fn new(param_count: u32, local_count: u32) -> Self {
        let temp_band_start = 1 + param_count + local_count;
        Self {
            high_water: temp_band_start,
            temp_band_start,
            free_singles: Vec::new(),
            free_blocks: Vec::new(),
        }
    }

    pub fn return_slot() -> u32 {
        0
    }

    pub fn param_register(&self, index: u32) -> u32 {
        1 + index
    }

    pub fn local_register(&self, param_count: u32, index: u32) -> u32 {
        1 + param_count + index
    }

    /// Draws from the LIFO free list first, else extends the
    /// high-water mark (spec §4.7).
    pub fn allocate_temporary(&mut self) -> u32 {
        if let Some(r) = self.free_singles.pop() {
            return r;
        }
        let r = self.high_water;
        self.high_water += 1;
        r
    }

    pub fn free_temporary(&mut self, reg: u32) -> Result<(), String> {
        if reg < self.temp_band_start {
            return Err(format!("register {reg} is not in the temporary band"));
        }
        self.free_singles.push(reg);
        Ok(())
    }

    /// Never draws from the single-register free list; prefers an
    /// exact-size freed block, then extends the high-water mark
    /// (spec §4.7).
    pub fn allocate_contiguous(&mut self, n: u32) -> u32 {
        if n == 0 {
            return self.high_water;
        }
        if let Some(pos) = self.free_blocks.iter().position(|b| b.len == n) {
            return self.free_blocks.remove(pos).start;
        }
        if let Some(pos) = self.free_blocks.iter().position(|b| b.len > n) {
            let block = self.free_blocks.remove(pos);
            self.free_blocks.push(FreeBlock {
                start: block.start + n,
                len: block.len - n,
            });
            return block.start;
        }
        let start = self.high_water;
        self.high_water += n;
        start
    }

    pub fn free_contiguous(&mut self, start: u32, n: u32) -> Result<(), String> {
        if n == 0 {
            return Ok(());
        }
        if start < self.temp_band_start {
            return Err(format!("register {start} is not in the temporary band"));
        }
        self.free_blocks.push(FreeBlock { start, len: n });
        self.coalesce();
        Ok(())
    }

    /// Merge adjacent freed blocks to maximize future reuse (spec
    /// §4.7 "freed contiguous blocks are merged with adjacent
    /// blocks").
    fn coalesce(&mut self) {
        self.free_blocks.sort_by_key(|b| b.start);
        let mut merged: Vec<FreeBlock> = Vec::new();
        for block in self.free_blocks.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.start + last.len == block.start {
                    last.len += block.len;
                    continue;
                }
            }
            merged.push(block);
        }
        self.free_blocks = merged;
    }

    pub fn total_registers(&self) -> u32 {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_reuse_returns_same_start() {
        let mut alloc = RegisterAllocator::new(0, 0);
        let first = alloc.allocate_contiguous(2);
        alloc.free_contiguous(first, 2).unwrap();
        let second = alloc.allocate_contiguous(2);
        assert_eq!(first, second);
    }

    #[test]
    fn adjacent_blocks_coalesce_for_larger_request() {
        let mut alloc = RegisterAllocator::new(0, 0);
        let a = alloc.allocate_contiguous(2);
        let b = alloc.allocate_contiguous(2);
        assert_eq!(b, a + 2);
        alloc.free_contiguous(a, 2).unwrap();
        alloc.free_contiguous(b, 2).unwrap();
        let combined = alloc.allocate_contiguous(4);
        assert_eq!(combined, a);
    }

    #[test]
    fn temporary_lifo_reuse() {
        let mut alloc = RegisterAllocator::new(0, 0);
        let r1 = alloc.allocate_temporary();
        let r2 = alloc.allocate_temporary();
        alloc.free_temporary(r2).unwrap();
        let r3 = alloc.allocate_temporary();
        assert_eq!(r2, r3);
        assert_ne!(r1, r2);
    }

    #[test]
    fn freeing_non_temporary_register_is_an_error() {
        let mut alloc = RegisterAllocator::new(2, 1);
        assert!(alloc.free_temporary(0).is_err());
        assert!(alloc.free_temporary(1).is_err());
    }
}
