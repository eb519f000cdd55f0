//! # OAM Shadow
//!
//! The hardware sprite table is 544 bytes:
//!
//! ```text
//! 0x000-0x1FF  low table, 4 bytes per slot
//!              +0 X (low 8 bits)  +1 Y  +2 tile (low 8 bits)  +3 vhoopppc
//! 0x200-0x21F  high table, 2 bits per slot, 4 slots per byte
//!              bit 0 X bit 8      bit 1 large size
//! ```
//!
//! [`OamMirror`] keeps the *committed* copy that the next flush DMAs to the
//! hardware, plus the set of slots drawn since the last commit. Descriptors can
//! change freely after a commit; the committed table only changes on the next
//! [`OamMirror::commit`].
//!
//! A slot is hidden by parking it at Y=240 with X=256. Y alone is not enough:
//! sprites taller than 16 pixels wrap back onto the top of the screen.

use bit_field::{BitArray, BitField};
use bytemuck::{Pod, Zeroable};
use log::debug;

use crate::{
    descriptor::{SpriteDescriptor, SpriteTable, MAX_SPRITES},
    layout::VramMap,
};

pub const OAM_LOW_SIZE: usize = MAX_SPRITES * 4;
pub const OAM_HIGH_SIZE: usize = MAX_SPRITES / 4;
pub const OAM_TABLE_SIZE: usize = OAM_LOW_SIZE + OAM_HIGH_SIZE;

/// Y coordinate of a hidden sprite.
pub const HIDE_Y: u8 = 240;

bitflags::bitflags! {
    /// One slot's 2 bits of the high table.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct HighBits: u8 {
        const X_HIGH = 0b01;
        const LARGE  = 0b10;
    }
}

/// One slot of the low table.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct OamEntry {
    pub x: u8,
    pub y: u8,
    pub tile: u8,
    pub attr: u8,
}

impl OamEntry {
    pub const HIDDEN: OamEntry = OamEntry {
        x: 0,
        y: HIDE_Y,
        tile: 0,
        attr: 0,
    };
}

/// Byte-exact image of hardware OAM.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct OamTable {
    pub low: [OamEntry; MAX_SPRITES],
    pub high: [u8; OAM_HIGH_SIZE],
}

impl Default for OamTable {
    fn default() -> Self {
        Self::hidden()
    }
}

impl OamTable {
    /// Every slot hidden, every size bit small.
    pub const fn hidden() -> Self {
        Self {
            low: [OamEntry::HIDDEN; MAX_SPRITES],
            high: [0x55; OAM_HIGH_SIZE],
        }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    #[inline(always)]
    pub fn entry(&self, id: usize) -> Option<&OamEntry> {
        self.low.get(id)
    }

    /// Empty for an id outside the table.
    pub fn high_bits(&self, id: usize) -> HighBits {
        let shift = (id & 3) * 2;
        match self.high.get(id >> 2) {
            Some(byte) => HighBits::from_bits_truncate(byte.get_bits(shift..shift + 2)),
            None => HighBits::empty(),
        }
    }

    /// Ignored for an id outside the table.
    pub fn set_high_bits(&mut self, id: usize, bits: HighBits) {
        let shift = (id & 3) * 2;
        if let Some(byte) = self.high.get_mut(id >> 2) {
            byte.set_bits(shift..shift + 2, bits.bits());
        }
    }

    /// Park one slot off-screen.
    pub fn hide(&mut self, id: usize) {
        if id >= MAX_SPRITES {
            return;
        }
        self.low[id] = OamEntry::HIDDEN;
        self.set_high_bits(id, HighBits::X_HIGH);
    }

    pub fn is_hidden(&self, id: usize) -> bool {
        match self.entry(id) {
            Some(entry) => {
                entry.y == HIDE_Y && entry.x == 0 && self.high_bits(id).contains(HighBits::X_HIGH)
            }
            None => false,
        }
    }

    /// Write a visible slot. `x` wraps to 9 bits and `y` to 8 bits.
    pub fn set(&mut self, id: usize, x: i16, y: i16, tile: u16, attr: u8, large: bool) {
        if id >= MAX_SPRITES {
            return;
        }
        let x9 = (x as u16) & 0x01FF;
        self.low[id] = OamEntry {
            x: x9 as u8,
            y: y as u8,
            tile: tile as u8,
            attr,
        };

        let mut bits = HighBits::empty();
        bits.set(HighBits::X_HIGH, x9.get_bit(8));
        bits.set(HighBits::LARGE, large);
        self.set_high_bits(id, bits);
    }
}

/// What a commit did, for logging and tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub shown: u8,
    pub hidden: u8,
}

#[derive(Clone, Debug)]
pub struct OamMirror {
    committed: OamTable,
    drawn: [u32; MAX_SPRITES / 32],
    dirty: bool,
    commits: u32,
}

impl Default for OamMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl OamMirror {
    pub const fn new() -> Self {
        Self {
            committed: OamTable::hidden(),
            drawn: [0; MAX_SPRITES / 32],
            // the hidden table still has to reach the hardware once
            dirty: true,
            commits: 0,
        }
    }

    /// The table the next flush will upload.
    #[inline(always)]
    pub fn committed(&self) -> &OamTable {
        &self.committed
    }

    /// Committed since the last upload.
    #[inline(always)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline(always)]
    pub fn commits(&self) -> u32 {
        self.commits
    }

    pub(crate) fn mark_uploaded(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_drawn(&mut self, id: usize) {
        if id < MAX_SPRITES {
            self.drawn[..].set_bit(id, true);
        }
    }

    pub fn was_drawn(&self, id: usize) -> bool {
        id < MAX_SPRITES && self.drawn[..].get_bit(id)
    }

    /// Hide every slot in the committed table.
    pub fn clear(&mut self) {
        self.committed = OamTable::hidden();
        self.drawn = [0; MAX_SPRITES / 32];
        self.dirty = true;
    }

    /// Rebuild the committed table from the descriptors.
    ///
    /// Visits all slots. A slot shows only if it was drawn since the last
    /// commit, is visible, and owns a VRAM block at its size; anything else is
    /// hidden.
    pub fn commit(&mut self, sprites: &SpriteTable, vram: &VramMap) -> CommitStats {
        let mut stats = CommitStats::default();

        for (id, sprite) in sprites.iter() {
            let shown = self.drawn[..].get_bit(id) && sprite.visible && self.encode(id, sprite, vram);
            if shown {
                stats.shown += 1;
            } else {
                self.committed.hide(id);
                stats.hidden += 1;
            }
        }

        self.drawn = [0; MAX_SPRITES / 32];
        self.dirty = true;
        self.commits = self.commits.wrapping_add(1);
        debug!(target: "dynsprite", "oam commit {}: {} shown, {} hidden", self.commits, stats.shown, stats.hidden);
        stats
    }

    fn encode(&mut self, id: usize, sprite: &SpriteDescriptor, vram: &VramMap) -> bool {
        let (Some(dest), Some(large)) = (vram.destination(id, sprite.size), vram.is_large(sprite.size)) else {
            return false;
        };
        let tile = vram.tile(dest);
        let attr = sprite.attr.to_byte(tile.get_bit(8));
        self.committed.set(id, sprite.x, sprite.y, tile, attr, large);
        true
    }
}
