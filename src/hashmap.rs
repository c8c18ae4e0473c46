use crate::error::{Error, Result};
use crate::hash;
use crate::u8;
use tracing::debug;

/// Slots per bucket
pub const SLOTS: usize = 7;
/// Bytes per slot. Byte 0 is the slot's first bit history and doubles as its priority.
pub const SLOT_BYTES: usize = 7;

/// One cache line of context slots.
///
/// The low nibble of `mru` is the most recently used slot, the high nibble the one before.
#[repr(C, align(64))]
#[derive(Clone, Copy)]
pub struct Bucket {
    checksums: [u16; SLOTS],
    mru: u8,
    slots: [[u8; SLOT_BYTES]; SLOTS],
}

impl Bucket {
    const fn empty() -> Self {
        Self { checksums: [0; SLOTS], mru: 0, slots: [[0; SLOT_BYTES]; SLOTS] }
    }

    fn touch(&mut self, i: usize) {
        self.mru = (self.mru << 4) | i as u8;
    }

    fn is_recent(&self, i: usize) -> bool {
        usize::from(self.mru & 15) == i || usize::from(self.mru >> 4) == i
    }

    /// Returns the slot owned by `checksum`, claiming an empty or the least valuable slot if none is.
    /// The two most recently used slots are never evicted.
    pub fn find(&mut self, checksum: u16) -> usize {
        let last = usize::from(self.mru & 15);
        if self.checksums[last] == checksum {
            return last;
        }

        let mut victim = None;
        let mut worst = u8::MAX;
        for i in 0..SLOTS {
            if self.checksums[i] == checksum {
                self.touch(i);
                return i;
            }
            let priority = self.slots[i][0];
            if !self.is_recent(i) && (victim.is_none() || priority < worst) {
                worst = priority;
                victim = Some(i);
            }
        }

        // more slots than recency nibbles, so a victim always exists
        let i = victim.unwrap_or(SLOTS - 1);
        self.checksums[i] = checksum;
        self.slots[i] = [0; SLOT_BYTES];
        self.touch(i);
        i
    }

    #[inline(always)]
    pub fn slot(&self, i: usize) -> &[u8; SLOT_BYTES] {
        &self.slots[i]
    }

    #[inline(always)]
    pub fn slot_mut(&mut self, i: usize) -> &mut [u8; SLOT_BYTES] {
        &mut self.slots[i]
    }
}

/// Location of a slot inside a [`HashTable`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotHandle {
    bucket: usize,
    slot: u8,
}

/// Fixed-size table of buckets addressed by context fingerprints.
pub struct HashTable {
    buckets: Vec<Bucket>,
    bits: u32,
}

impl HashTable {
    /// Allocates `size` bytes of buckets; `size / 64` must be a power of two.
    pub fn new(size: usize, what: &'static str) -> Result<Self> {
        let count = size / std::mem::size_of::<Bucket>();
        if count == 0 || !count.is_power_of_two() {
            return Err(Error::TableSize { what, size });
        }
        debug!(what, size, buckets = count, "allocating hash table");
        Ok(Self { buckets: vec![Bucket::empty(); count], bits: count.trailing_zeros() })
    }

    pub fn mask(&self) -> usize {
        self.buckets.len() - 1
    }

    /// Slot owned by `checksum` in bucket `idx`
    pub fn find_at(&mut self, idx: usize, checksum: u16) -> SlotHandle {
        let slot = self.buckets[idx].find(checksum);
        SlotHandle { bucket: idx, slot: u8!(slot) }
    }

    /// Bucket index and checksum of a finalized fingerprint
    pub fn locate(&self, h: u64) -> (usize, u16) {
        if self.bits == 0 {
            (0, hash::checksum(h, 0))
        } else {
            (hash::bucket_index(h, self.bits), hash::checksum(h, self.bits))
        }
    }

    #[inline(always)]
    pub fn slot(&self, handle: SlotHandle) -> &[u8; SLOT_BYTES] {
        self.buckets[handle.bucket].slot(usize::from(handle.slot))
    }

    #[inline(always)]
    pub fn slot_mut(&mut self, handle: SlotHandle) -> &mut [u8; SLOT_BYTES] {
        self.buckets[handle.bucket].slot_mut(usize::from(handle.slot))
    }
}
