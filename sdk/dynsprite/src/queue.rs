//! # VRAM Upload Queue
//!
//! Tile uploads waiting for the next flush. The queue is bounded by how much
//! DMA fits into one vertical blank (about seven 16x16 sprites on the reference
//! hardware) and is emptied by every flush; nothing carries over between
//! frames except the descriptors' own refresh flags.
//!
//! Entries are keyed by VRAM destination. Queueing a second upload for the same
//! block replaces the first, since only the last graphics before the flush will
//! ever be seen.

use heapless::Vec;
use log::warn;

use crate::{
    config::{OverflowPolicy, SpriteSize},
    descriptor::FarPtr,
    layout::{SHEET_ROW_BYTES, VRAM_ROW_WORDS},
};

/// Seven sprite uploads per vertical blank.
pub const DEFAULT_BUDGET: usize = 7;

/// One sprite's worth of tile data to copy into VRAM.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UploadEntry {
    /// Slot that asked for the upload.
    pub slot: u8,
    pub source: FarPtr,
    /// VRAM word address of the slot's block.
    pub destination: u16,
    pub size: SpriteSize,
}

/// A single contiguous DMA copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub source: FarPtr,
    /// VRAM word address.
    pub destination: u16,
    /// Length in bytes.
    pub len: u16,
}

impl UploadEntry {
    #[inline(always)]
    pub const fn byte_len(&self) -> u16 {
        self.size.frame_bytes()
    }

    /// One transfer per tile row: sheet rows are `0x200` bytes apart, VRAM rows
    /// `0x100` words apart.
    pub fn transfers(&self) -> impl Iterator<Item = Transfer> + '_ {
        let rows = self.size.tiles_wide();
        (0..rows).map(move |row| Transfer {
            source: self.source.offset(row as u32 * SHEET_ROW_BYTES),
            destination: self.destination.wrapping_add(row * VRAM_ROW_WORDS) & 0x7FFF,
            len: self.size.row_bytes(),
        })
    }
}

/// Result of [`UploadQueue::push`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Enqueued {
    Added,
    /// An entry for the same destination was already waiting and got replaced.
    Replaced,
    /// The queue was full; this older entry was dropped to make room.
    Evicted(UploadEntry),
    /// The queue was full; the new entry was not stored.
    Rejected,
}

#[derive(Clone, Debug)]
pub struct UploadQueue<const N: usize = DEFAULT_BUDGET> {
    entries: Vec<UploadEntry, N>,
    policy: OverflowPolicy,
    overflows: u32,
}

impl<const N: usize> Default for UploadQueue<N> {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

impl<const N: usize> UploadQueue<N> {
    pub const fn new(policy: OverflowPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
            overflows: 0,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline(always)]
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Times the budget was exceeded since construction.
    #[inline(always)]
    pub fn overflows(&self) -> u32 {
        self.overflows
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[UploadEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &UploadEntry> {
        self.entries.iter()
    }

    /// Pending upload for a VRAM block, if any.
    pub fn get(&self, destination: u16) -> Option<&UploadEntry> {
        self.entries.iter().find(|e| e.destination == destination)
    }

    /// Queue an upload. A replaced entry moves to the back, as the newest.
    pub fn push(&mut self, entry: UploadEntry) -> Enqueued {
        if let Some(pos) = self.entries.iter().position(|e| e.destination == entry.destination) {
            self.entries.remove(pos);
            // just freed a slot, cannot fail
            let _ = self.entries.push(entry);
            return Enqueued::Replaced;
        }

        if self.entries.push(entry).is_ok() {
            return Enqueued::Added;
        }

        self.overflows = self.overflows.wrapping_add(1);
        match self.policy {
            OverflowPolicy::DeferNewest => {
                warn!(target: "dynsprite", "upload queue full ({N}), slot {} deferred", entry.slot);
                Enqueued::Rejected
            }
            OverflowPolicy::EvictOldest if N > 0 => {
                let oldest = self.entries.remove(0);
                let _ = self.entries.push(entry);
                warn!(target: "dynsprite", "upload queue full ({N}), slot {} evicted for slot {}", oldest.slot, entry.slot);
                Enqueued::Evicted(oldest)
            }
            OverflowPolicy::EvictOldest => Enqueued::Rejected,
        }
    }

    /// Empty the queue. Called once the entries have been handed to the driver.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
