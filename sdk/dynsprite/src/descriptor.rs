//! # Sprite Descriptors
//!
//! The logical state of every hardware sprite slot. Game code writes here; the
//! engine reads it when drawing and committing. Nothing in this module touches
//! hardware.
//!
//! A descriptor remembers which frame, source address and size were last queued
//! for upload. Any change to one of them raises `refresh`, and the next
//! [`draw`](crate::DynamicSprites::draw) turns that into a VRAM transfer.

use bit_field::BitField;

use crate::{config::SpriteSize, layout::FrameLookup};

/// Number of hardware sprite slots.
pub const MAX_SPRITES: usize = 128;

/// A 24-bit bus address: bank byte plus 16-bit offset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FarPtr {
    pub bank: u8,
    pub addr: u16,
}

impl FarPtr {
    pub const NULL: FarPtr = FarPtr { bank: 0, addr: 0 };

    #[inline(always)]
    pub const fn new(bank: u8, addr: u16) -> Self {
        Self { bank, addr }
    }

    /// Build from a flat 24-bit address. Bits above 23 are dropped.
    #[inline(always)]
    pub const fn from_linear(linear: u32) -> Self {
        Self {
            bank: (linear >> 16) as u8,
            addr: linear as u16,
        }
    }

    #[inline(always)]
    pub const fn linear(self) -> u32 {
        ((self.bank as u32) << 16) | self.addr as u32
    }

    /// Address `bytes` further on, wrapping inside the 24-bit space.
    #[inline(always)]
    pub const fn offset(self, bytes: u32) -> Self {
        Self::from_linear(self.linear().wrapping_add(bytes) & 0x00FF_FFFF)
    }
}

bitflags::bitflags! {
    /// Flip bits of the OAM attribute byte.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ObjFlags: u8 {
        const FLIP_X = 0b0100_0000;
        const FLIP_Y = 0b1000_0000;
    }
}

/// Priority, palette and flips of a sprite.
///
/// Packs into the OAM attribute byte `vhoopppc`: `v`/`h` flips, `oo` priority,
/// `ppp` palette, `c` the high bit of the tile number (filled in at commit).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjAttribute {
    /// 0-3, 3 draws above everything.
    pub priority: u8,
    /// 0-7, selects CGRAM colors `128 + palette * 16`.
    pub palette: u8,
    pub flags: ObjFlags,
}

impl Default for ObjAttribute {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl ObjAttribute {
    /// Out-of-range values are masked to their field width.
    pub const fn new(priority: u8, palette: u8) -> Self {
        Self {
            priority: priority & 0x03,
            palette: palette & 0x07,
            flags: ObjFlags::empty(),
        }
    }

    pub const fn with_flags(mut self, flags: ObjFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Decode a `vhoopppc` byte. The tile high bit is ignored.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            priority: byte.get_bits(4..6),
            palette: byte.get_bits(1..4),
            flags: ObjFlags::from_bits_truncate(byte),
        }
    }

    /// Encode as `vhoopppc` with the given tile high bit.
    pub fn to_byte(&self, tile_high: bool) -> u8 {
        let mut byte = self.flags.bits();
        byte.set_bits(4..6, self.priority & 0x03);
        byte.set_bits(1..4, self.palette & 0x07);
        byte.set_bit(0, tile_high);
        byte
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct QueuedGfx {
    frame_id: u16,
    gfx: FarPtr,
    size: SpriteSize,
}

/// Logical state of one sprite slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpriteDescriptor {
    /// Horizontal position. Wraps across the 512-pixel coordinate space.
    pub x: i16,
    /// Vertical position. Only the low 8 bits reach the hardware.
    pub y: i16,
    pub frame_id: u16,
    pub attr: ObjAttribute,
    pub size: SpriteSize,
    /// Base of the sprite sheet holding every frame of this sprite.
    pub sheet: FarPtr,
    /// Source of the current frame's tiles, resolved from `sheet` and `frame_id`.
    pub gfx: FarPtr,
    /// Graphics must be uploaded on the next draw.
    pub refresh: bool,
    pub visible: bool,
    queued: Option<QueuedGfx>,
}

impl SpriteDescriptor {
    pub const fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            frame_id: 0,
            attr: ObjAttribute::new(0, 0),
            size: SpriteSize::Px16,
            sheet: FarPtr::NULL,
            gfx: FarPtr::NULL,
            refresh: false,
            visible: false,
            queued: None,
        }
    }

    fn resolve(&mut self, lookup: &impl FrameLookup) {
        self.gfx = lookup.source(self.sheet, self.frame_id, self.size);
        let current = QueuedGfx {
            frame_id: self.frame_id,
            gfx: self.gfx,
            size: self.size,
        };
        if self.queued != Some(current) {
            self.refresh = true;
        }
    }

    /// Record that the current graphics have been handed to the upload queue.
    pub(crate) fn mark_queued(&mut self) {
        self.queued = Some(QueuedGfx {
            frame_id: self.frame_id,
            gfx: self.gfx,
            size: self.size,
        });
        self.refresh = false;
    }
}

impl Default for SpriteDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed table of [`MAX_SPRITES`] descriptors, indexed by slot id.
///
/// Every mutator returns `false` and does nothing for an id outside the table.
#[derive(Clone, Debug)]
pub struct SpriteTable {
    slots: [SpriteDescriptor; MAX_SPRITES],
}

impl Default for SpriteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteTable {
    pub const fn new() -> Self {
        Self {
            slots: [SpriteDescriptor::new(); MAX_SPRITES],
        }
    }

    #[inline(always)]
    pub fn get(&self, id: usize) -> Option<&SpriteDescriptor> {
        self.slots.get(id)
    }

    #[inline(always)]
    pub(crate) fn get_mut(&mut self, id: usize) -> Option<&mut SpriteDescriptor> {
        self.slots.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &SpriteDescriptor)> {
        self.slots.iter().enumerate()
    }

    /// Position, frame and attributes in one go. Marks the slot visible.
    pub fn set_sprite(
        &mut self,
        id: usize,
        x: i16,
        y: i16,
        frame_id: u16,
        attr: ObjAttribute,
        lookup: &impl FrameLookup,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.x = x;
        slot.y = y;
        slot.frame_id = frame_id;
        slot.attr = attr;
        slot.visible = true;
        slot.resolve(lookup);
        true
    }

    /// Point the slot at a new sprite sheet.
    pub fn set_gfx(&mut self, id: usize, sheet: FarPtr, lookup: &impl FrameLookup) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.sheet = sheet;
        slot.resolve(lookup);
        true
    }

    pub fn set_frame(&mut self, id: usize, frame_id: u16, lookup: &impl FrameLookup) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.frame_id = frame_id;
        slot.resolve(lookup);
        true
    }

    pub fn set_size(&mut self, id: usize, size: SpriteSize, lookup: &impl FrameLookup) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.size = size;
        slot.resolve(lookup);
        true
    }

    /// Moves the sprite without touching its graphics.
    pub fn set_position(&mut self, id: usize, x: i16, y: i16) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.x = x;
        slot.y = y;
        true
    }

    /// Force an upload on the next draw even if nothing changed, e.g. after the
    /// sheet contents were rewritten in RAM.
    pub fn request_refresh(&mut self, id: usize) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.refresh = true;
        true
    }

    pub fn hide(&mut self, id: usize) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.visible = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SheetLayout;

    const SHEET: FarPtr = FarPtr::new(0x01, 0x8000);

    #[test]
    fn attribute_byte_layout() {
        assert_eq!(ObjAttribute::new(2, 3).to_byte(false), 0x26);
        let flipped = ObjAttribute::new(1, 5).with_flags(ObjFlags::FLIP_X | ObjFlags::FLIP_Y);
        assert_eq!(flipped.to_byte(true), 0xDB);
        assert_eq!(ObjAttribute::from_byte(0xDB), flipped);
        assert_eq!(ObjAttribute::new(7, 9), ObjAttribute::new(3, 1));
    }

    #[test]
    fn far_pointer_offsets_cross_banks() {
        let p = FarPtr::new(0x02, 0xFFF0).offset(0x20);
        assert_eq!(p, FarPtr::new(0x03, 0x0010));
        assert_eq!(FarPtr::new(0xFF, 0xFFFF).offset(1), FarPtr::NULL);
    }

    #[test]
    fn out_of_range_ids_are_ignored() {
        let mut table = SpriteTable::new();
        let lookup = SheetLayout;
        assert!(!table.set_sprite(MAX_SPRITES, 0, 0, 0, ObjAttribute::default(), &lookup));
        assert!(!table.hide(200));
        assert!(table.get(MAX_SPRITES).is_none());
    }

    #[test]
    fn refresh_follows_graphics_changes() {
        let mut table = SpriteTable::new();
        let lookup = SheetLayout;
        table.set_gfx(3, SHEET, &lookup);
        table.set_sprite(3, 10, 20, 1, ObjAttribute::new(3, 0), &lookup);
        assert!(table.get(3).unwrap().refresh);

        table.get_mut(3).unwrap().mark_queued();
        table.set_sprite(3, 11, 20, 1, ObjAttribute::new(3, 0), &lookup);
        assert!(!table.get(3).unwrap().refresh, "moving alone needs no upload");

        table.set_frame(3, 2, &lookup);
        assert!(table.get(3).unwrap().refresh);

        // switching back to the queued frame clears nothing on its own
        table.set_frame(3, 1, &lookup);
        assert!(table.get(3).unwrap().refresh);
    }

    #[test]
    fn hide_keeps_graphics_state() {
        let mut table = SpriteTable::new();
        let lookup = SheetLayout;
        table.set_gfx(0, SHEET, &lookup);
        table.set_sprite(0, 0, 0, 4, ObjAttribute::default(), &lookup);
        let gfx = table.get(0).unwrap().gfx;
        table.hide(0);
        let slot = table.get(0).unwrap();
        assert!(!slot.visible);
        assert_eq!(slot.gfx, gfx);
        assert!(slot.refresh);
    }
}
