//! # Engine Configuration
//!
//! Mirrors the arguments of the hardware sprite setup: the OBJSEL size pair,
//! where in VRAM the large and small sprite blocks live, and the first OAM slot
//! of each size class.
//!
//! | Setting            | Default  | Meaning                                   |
//! |--------------------|----------|-------------------------------------------|
//! | `obj_size`         | `S8L16`  | small/large pixel sizes (OBJSEL bits 5-7) |
//! | `name_base`        | `0x0000` | OBJ tile base, word address (8K aligned)  |
//! | `large_vram`       | `0x0000` | VRAM word address of the large region     |
//! | `small_vram`       | `0x1000` | VRAM word address of the small region     |
//! | `large_first_slot` | `0`      | OAM slot mapped to the first large block  |
//! | `small_first_slot` | `0`      | OAM slot mapped to the first small block  |
//! | `region_words`     | `0x1000` | size of each region in VRAM words         |
//! | `overflow`         | defer    | what a full upload queue does             |

/// Pixel size of one dynamic sprite.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpriteSize {
    Px8,
    #[default]
    Px16,
    Px32,
}

impl SpriteSize {
    #[inline(always)]
    pub const fn pixels(self) -> u8 {
        match self {
            SpriteSize::Px8 => 8,
            SpriteSize::Px16 => 16,
            SpriteSize::Px32 => 32,
        }
    }

    /// Width (and height) in 8x8 tiles.
    #[inline(always)]
    pub const fn tiles_wide(self) -> u16 {
        self.pixels() as u16 / 8
    }

    /// Bytes of 4bpp tile data in one tile row of the sprite.
    #[inline(always)]
    pub const fn row_bytes(self) -> u16 {
        self.tiles_wide() * 32
    }

    /// Total bytes uploaded for one frame of the sprite.
    #[inline(always)]
    pub const fn frame_bytes(self) -> u16 {
        self.row_bytes() * self.tiles_wide()
    }
}

/// OBJSEL size pair, `(small, large)`.
///
/// 64x64 sprites exist on the hardware but have no dynamic block layout, so a
/// slot can only be drawn when its [`SpriteSize`] is one of the pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ObjSize {
    #[default]
    S8L16,
    S8L32,
    S8L64,
    S16L32,
    S16L64,
    S32L64,
}

impl ObjSize {
    /// Value for OBJSEL bits 5-7.
    #[inline(always)]
    pub const fn index(self) -> u8 {
        match self {
            ObjSize::S8L16 => 0,
            ObjSize::S8L32 => 1,
            ObjSize::S8L64 => 2,
            ObjSize::S16L32 => 3,
            ObjSize::S16L64 => 4,
            ObjSize::S32L64 => 5,
        }
    }

    const fn pair(self) -> (u8, u8) {
        match self {
            ObjSize::S8L16 => (8, 16),
            ObjSize::S8L32 => (8, 32),
            ObjSize::S8L64 => (8, 64),
            ObjSize::S16L32 => (16, 32),
            ObjSize::S16L64 => (16, 64),
            ObjSize::S32L64 => (32, 64),
        }
    }

    /// `Some(true)` when `size` is this pair's large size, `Some(false)` for the
    /// small size, `None` when the hardware cannot show it at all.
    pub const fn is_large(self, size: SpriteSize) -> Option<bool> {
        let (small, large) = self.pair();
        let px = size.pixels();
        if px == large {
            Some(true)
        } else if px == small {
            Some(false)
        } else {
            None
        }
    }
}

/// What the upload queue does when a frame asks for more transfers than fit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reject the newest entry. Its slot keeps the refresh flag and uploads on
    /// a later frame.
    #[default]
    DeferNewest,
    /// Drop the oldest pending entry to make room. The dropped slot has its
    /// refresh flag raised again.
    EvictOldest,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub obj_size: ObjSize,
    pub name_base: u16,
    pub large_vram: u16,
    pub small_vram: u16,
    pub large_first_slot: u8,
    pub small_first_slot: u8,
    pub region_words: u16,
    pub overflow: OverflowPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub const fn new() -> Self {
        Self {
            obj_size: ObjSize::S8L16,
            name_base: 0x0000,
            large_vram: 0x0000,
            small_vram: 0x1000,
            large_first_slot: 0,
            small_first_slot: 0,
            region_words: 0x1000,
            overflow: OverflowPolicy::DeferNewest,
        }
    }

    pub const fn with_obj_size(mut self, obj_size: ObjSize) -> Self {
        self.obj_size = obj_size;
        self
    }

    /// Large and small region bases, in VRAM words.
    pub const fn with_vram(mut self, large: u16, small: u16) -> Self {
        self.large_vram = large;
        self.small_vram = small;
        self
    }

    pub const fn with_first_slots(mut self, large: u8, small: u8) -> Self {
        self.large_first_slot = large;
        self.small_first_slot = small;
        self
    }

    pub const fn with_name_base(mut self, name_base: u16) -> Self {
        self.name_base = name_base;
        self
    }

    pub const fn with_region_words(mut self, words: u16) -> Self {
        self.region_words = words;
        self
    }

    pub const fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// OBJSEL register value: `sssnnbbb`, size pair and name base.
    #[inline(always)]
    pub const fn objsel(&self) -> u8 {
        (self.obj_size.index() << 5) | ((self.name_base >> 13) as u8 & 0x07)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_demo_setup() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.large_vram, 0x0000);
        assert_eq!(cfg.small_vram, 0x1000);
        assert_eq!(cfg.objsel(), 0x00);
    }

    #[test]
    fn objsel_packs_size_and_base() {
        let cfg = EngineConfig::new()
            .with_obj_size(ObjSize::S16L32)
            .with_name_base(0x6000);
        assert_eq!(cfg.objsel(), (3 << 5) | 3);
    }

    #[test]
    fn size_classes() {
        assert_eq!(ObjSize::S8L16.is_large(SpriteSize::Px16), Some(true));
        assert_eq!(ObjSize::S8L16.is_large(SpriteSize::Px8), Some(false));
        assert_eq!(ObjSize::S8L16.is_large(SpriteSize::Px32), None);
        assert_eq!(SpriteSize::Px32.frame_bytes(), 512);
        assert_eq!(SpriteSize::Px16.row_bytes(), 64);
    }
}
