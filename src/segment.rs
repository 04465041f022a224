//! The segmented memory manager: a mapping from small integer addresses to
//! variable-length word arrays, with LIFO recycling of freed addresses.
//!
//! This mirrors the two-sequence design of the source implementation
//! (`main_memory` alongside `deleted_addresses`), traded for a single
//! `Vec<Option<Vec<u32>>>` plus a free list, since Rust's `Vec` already
//! gives the geometric growth the source hand-rolled with `UArray`/`Seq`.

use crate::error::UmError;

/// An opaque handle identifying a live segment. Not a word pointer.
pub type Address = u32;

/// Maps addresses to word arrays. Owns all segment storage; nothing
/// outside the store holds a reference to a segment.
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Option<Vec<u32>>>,
    free_list: Vec<Address>,
}

impl SegmentStore {
    /// Creates an empty store. Address 0 does not exist yet; it comes
    /// into being on the first call to `alloc`, which the image loader
    /// makes immediately.
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocates a segment of `len` zero words and returns its address.
    /// Recycled addresses (LIFO) are preferred over fresh ones.
    pub fn alloc(&mut self, len: u32) -> Address {
        match self.free_list.pop() {
            Some(address) => {
                let slot = self.segments[address as usize]
                    .get_or_insert_with(Vec::new);
                slot.clear();
                slot.resize(len as usize, 0);
                address
            }
            None => {
                let address = self.segments.len() as Address;
                self.segments.push(Some(vec![0; len as usize]));
                address
            }
        }
    }

    /// Frees `address`, making it available for a future `alloc`. The
    /// segment's contents become inaccessible through `address` until
    /// it is reallocated.
    pub fn free(&mut self, address: Address) -> Result<(), UmError> {
        let slot = self.segment_mut(address)?;
        *slot = None;
        self.free_list.push(address);
        Ok(())
    }

    /// Reads the word at `offset` within the segment at `address`.
    pub fn get(&self, address: Address, offset: u32) -> Result<u32, UmError> {
        let segment = self.segment(address)?;
        segment
            .get(offset as usize)
            .copied()
            .ok_or(UmError::OutOfBounds {
                address,
                offset,
                length: segment.len() as u32,
            })
    }

    /// Writes `word` at `offset` within the segment at `address`.
    pub fn set(&mut self, address: Address, offset: u32, word: u32) -> Result<(), UmError> {
        let length = self.length(address)?;
        if offset >= length {
            return Err(UmError::OutOfBounds { address, offset, length });
        }
        let segment = self.segment_mut(address)?;
        segment.as_mut().unwrap()[offset as usize] = word;
        Ok(())
    }

    /// Returns the current length of the segment at `address`.
    pub fn length(&self, address: Address) -> Result<u32, UmError> {
        self.segment(address).map(|s| s.len() as u32)
    }

    /// Overwrites segment 0 with a copy of the segment at `src`,
    /// preserving address 0's identity. Returns the new length of
    /// segment 0. `src` may equal 0, in which case this is a no-op.
    pub fn dup_into_zero(&mut self, src: Address) -> Result<u32, UmError> {
        if src == 0 {
            return self.length(0);
        }
        let copy = self.segment(src)?.clone();
        let len = copy.len() as u32;
        *self.segment_mut(0)? = Some(copy);
        Ok(len)
    }

    fn segment(&self, address: Address) -> Result<&Vec<u32>, UmError> {
        self.segments
            .get(address as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(UmError::InvalidAddress(address))
    }

    fn segment_mut(&mut self, address: Address) -> Result<&mut Option<Vec<u32>>, UmError> {
        let slot = self
            .segments
            .get_mut(address as usize)
            .ok_or(UmError::InvalidAddress(address))?;
        if slot.is_none() {
            return Err(UmError::InvalidAddress(address));
        }
        Ok(slot)
    }
}
