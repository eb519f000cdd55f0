//! # Graphics Layout
//!
//! Two mappings, both fixed arithmetic so they cost the same every frame:
//!
//! - **Sheet → source**: where frame `n` of a sprite starts inside its sprite
//!   sheet in ROM ([`FrameLookup`]).
//! - **Slot → VRAM**: which VRAM block a slot owns, and the OAM tile number that
//!   points at it ([`VramMap`]).
//!
//! ## Sprite Sheets
//!
//! A sheet is a 4bpp image 128 pixels wide, so one row of 8x8 tiles is
//! `0x200` bytes. Frames are packed left to right, top to bottom:
//!
//! ```text
//! 16x16 frames (8 per row):
//! ┌────┬────┬────┬────┬────┬────┬────┬────┐
//! │ 0  │ 1  │ 2  │ 3  │ 4  │ 5  │ 6  │ 7  │  tile rows 0-1
//! ├────┼────┼────┼────┼────┼────┼────┼────┤
//! │ 8  │ 9  │ 10 │ .. │    │    │    │    │  tile rows 2-3
//! └────┴────┴────┴────┴────┴────┴────┴────┘
//! ```
//!
//! ## VRAM Blocks
//!
//! VRAM is laid out the same way, 16 tiles per row, but addressed in 16-bit
//! words: a tile is `0x10` words and a tile row is `0x100` words.

use crate::{
    config::{EngineConfig, ObjSize, SpriteSize},
    descriptor::FarPtr,
};

/// Bytes between two tile rows of a sprite sheet.
pub const SHEET_ROW_BYTES: u32 = 0x200;
/// Words between two tile rows in VRAM.
pub const VRAM_ROW_WORDS: u16 = 0x100;
/// Words in one 4bpp 8x8 tile.
pub const TILE_WORDS: u16 = 0x10;
/// Tiles in one row of a sheet or of VRAM.
pub const TILES_PER_ROW: u16 = 16;

/// Maps a frame id to the address of its tile data.
///
/// Any `Fn(FarPtr, u16, SpriteSize) -> FarPtr` works as a lookup, which covers
/// sheets with a custom arrangement or per-frame pointer tables.
pub trait FrameLookup {
    fn source(&self, sheet: FarPtr, frame_id: u16, size: SpriteSize) -> FarPtr;
}

impl<F> FrameLookup for F
where
    F: Fn(FarPtr, u16, SpriteSize) -> FarPtr,
{
    #[inline(always)]
    fn source(&self, sheet: FarPtr, frame_id: u16, size: SpriteSize) -> FarPtr {
        self(sheet, frame_id, size)
    }
}

/// The standard 128-pixel-wide sheet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SheetLayout;

impl SheetLayout {
    /// Byte offset of a frame from the start of the sheet.
    pub const fn frame_offset(frame_id: u16, size: SpriteSize) -> u32 {
        let w = size.tiles_wide() as u32;
        let per_row = TILES_PER_ROW as u32 / w;
        let row = frame_id as u32 / per_row;
        let col = frame_id as u32 % per_row;
        row * w * SHEET_ROW_BYTES + col * w * 32
    }
}

impl FrameLookup for SheetLayout {
    #[inline(always)]
    fn source(&self, sheet: FarPtr, frame_id: u16, size: SpriteSize) -> FarPtr {
        sheet.offset(Self::frame_offset(frame_id, size))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Region {
    base: u16,
    first_slot: u8,
    words: u16,
}

/// Slot-to-VRAM mapping derived from an [`EngineConfig`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VramMap {
    obj_size: ObjSize,
    name_base: u16,
    large: Region,
    small: Region,
}

impl VramMap {
    pub const fn new(config: &EngineConfig) -> Self {
        Self {
            obj_size: config.obj_size,
            name_base: config.name_base,
            large: Region {
                base: config.large_vram,
                first_slot: config.large_first_slot,
                words: config.region_words,
            },
            small: Region {
                base: config.small_vram,
                first_slot: config.small_first_slot,
                words: config.region_words,
            },
        }
    }

    /// See [`ObjSize::is_large`].
    #[inline(always)]
    pub const fn is_large(&self, size: SpriteSize) -> Option<bool> {
        self.obj_size.is_large(size)
    }

    const fn region(&self, size: SpriteSize) -> Option<&Region> {
        match self.is_large(size) {
            Some(true) => Some(&self.large),
            Some(false) => Some(&self.small),
            None => None,
        }
    }

    /// How many blocks of `size` fit in its region. Zero when the size is not
    /// part of the configured OBJSEL pair.
    pub fn capacity(&self, size: SpriteSize) -> usize {
        let Some(region) = self.region(size) else {
            return 0;
        };
        let w = size.tiles_wide();
        let per_row = (TILES_PER_ROW / w) as usize;
        let rows = (region.words / (w * VRAM_ROW_WORDS)) as usize;
        per_row * rows
    }

    /// VRAM word address of the block owned by slot `id` when drawn at `size`.
    pub fn destination(&self, id: usize, size: SpriteSize) -> Option<u16> {
        let region = self.region(size)?;
        let block = id.checked_sub(region.first_slot as usize)?;
        if block >= self.capacity(size) {
            return None;
        }

        let w = size.tiles_wide();
        let per_row = (TILES_PER_ROW / w) as usize;
        let row = (block / per_row) as u16;
        let col = (block % per_row) as u16;
        let offset = row * w * VRAM_ROW_WORDS + col * w * TILE_WORDS;
        Some(region.base.wrapping_add(offset) & 0x7FFF)
    }

    /// 9-bit OAM tile number for a block starting at `destination`.
    #[inline(always)]
    pub const fn tile(&self, destination: u16) -> u16 {
        (destination.wrapping_sub(self.name_base) / TILE_WORDS) & 0x01FF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_offsets_per_size() {
        assert_eq!(SheetLayout::frame_offset(0, SpriteSize::Px16), 0);
        assert_eq!(SheetLayout::frame_offset(1, SpriteSize::Px16), 0x40);
        assert_eq!(SheetLayout::frame_offset(9, SpriteSize::Px16), 0x440);
        assert_eq!(SheetLayout::frame_offset(17, SpriteSize::Px8), 0x220);
        assert_eq!(SheetLayout::frame_offset(5, SpriteSize::Px32), 0x880);
    }

    #[test]
    fn closures_are_lookups() {
        let table = |sheet: FarPtr, frame: u16, _size: SpriteSize| sheet.offset(frame as u32 * 0x80);
        let src = table.source(FarPtr::new(2, 0), 3, SpriteSize::Px16);
        assert_eq!(src, FarPtr::new(2, 0x180));
    }

    #[test]
    fn default_regions_match_lookup_tables() {
        let map = VramMap::new(&EngineConfig::default());
        assert_eq!(map.capacity(SpriteSize::Px16), 64);
        assert_eq!(map.capacity(SpriteSize::Px8), 256);
        assert_eq!(map.capacity(SpriteSize::Px32), 0);

        assert_eq!(map.destination(0, SpriteSize::Px16), Some(0x0000));
        assert_eq!(map.destination(1, SpriteSize::Px16), Some(0x0020));
        assert_eq!(map.destination(9, SpriteSize::Px16), Some(0x0220));
        assert_eq!(map.destination(64, SpriteSize::Px16), None);
        assert_eq!(map.destination(3, SpriteSize::Px8), Some(0x1030));
    }

    #[test]
    fn tile_numbers_follow_blocks() {
        let map = VramMap::new(&EngineConfig::default());
        assert_eq!(map.tile(0x0220), 34);
        assert_eq!(map.tile(0x1000), 256);
    }

    #[test]
    fn first_slot_offsets_the_block_index() {
        let cfg = EngineConfig::new()
            .with_obj_size(ObjSize::S16L32)
            .with_first_slots(4, 0);
        let map = VramMap::new(&cfg);
        assert_eq!(map.capacity(SpriteSize::Px32), 16);
        assert_eq!(map.destination(3, SpriteSize::Px32), None);
        assert_eq!(map.destination(4, SpriteSize::Px32), Some(0x0000));
        assert_eq!(map.destination(8, SpriteSize::Px32), Some(0x0400));
    }
}
