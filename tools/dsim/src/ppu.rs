//! # Simulated PPU
//!
//! Just enough of the picture processor and the DMA unit to check what the
//! engine puts into video memory, and when.
//!
//! ## Timing
//!
//! The beam is modelled per scanline. Each [`VideoPort::spin`] advances one
//! line:
//!
//! ```text
//! line 0 ──────────── 224 │ 225 ──────── 261 │ 0 ...
//!      active display     │  vertical blank  │
//! ```
//!
//! ## DMA
//!
//! Under forced blank every copy lands. During vertical blank copies land until
//! the per-vblank byte budget runs out; whatever does not fit spills into active
//! display and is lost, which is counted as an overrun. Copies started during
//! active display are dropped entirely, as the hardware ignores VRAM and OAM
//! writes while it is drawing.

use bit_field::BitField;
use dynsprite::{FlushDriver, OamTable, UploadEntry, VideoPort};
use log::{debug, warn};

use crate::rom::RomImage;

pub const VRAM_SIZE: usize = 0x10000;
pub const OAM_SIZE: usize = 544;

pub const LINES_PER_FRAME: u16 = 262;
pub const VBLANK_START: u16 = 225;

/// Bytes general-purpose DMA moves in one NTSC vblank, at 8 master cycles
/// per byte.
pub const VBLANK_DMA_BYTES: usize = 5_600;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub vram_flushes: u32,
    pub oam_commits: u32,
    pub transfers: u32,
    pub bytes_written: u64,
    /// Bytes lost to active display, from overruns or writes started outside
    /// a blanking window.
    pub dropped_bytes: u64,
    /// Copies that ran past the end of the vblank budget.
    pub overruns: u32,
    /// Vertical blanks started.
    pub frames: u32,
    /// `vram_flushes + oam_commits` when forced blank was first released.
    pub uploads_at_display_on: Option<u32>,
}

impl SimStats {
    /// Anything reached the screen torn or not at all.
    pub fn tearing(&self) -> bool {
        self.overruns > 0 || self.dropped_bytes > 0
    }
}

/// One OAM slot decoded from the simulated OAM bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimSprite {
    /// 9-bit X.
    pub x: u16,
    pub y: u8,
    /// 9-bit tile number.
    pub tile: u16,
    /// Attribute byte with the tile high bit masked off.
    pub attr: u8,
    pub large: bool,
}

impl SimSprite {
    /// Parked at the hide position.
    pub fn is_hidden(&self) -> bool {
        self.y == dynsprite::oam::HIDE_Y && self.x == 0x100
    }
}

#[derive(Debug)]
pub struct SimPpu {
    rom: RomImage,
    vram: Box<[u8]>,
    oam: [u8; OAM_SIZE],
    line: u16,
    forced_blank: bool,
    objsel: u8,
    dma_budget: usize,
    dma_used: usize,
    stats: SimStats,
}

impl SimPpu {
    /// Starts blanked at the top of the frame, the way boot code leaves it.
    pub fn new(rom: RomImage) -> Self {
        Self {
            rom,
            vram: vec![0; VRAM_SIZE].into_boxed_slice(),
            oam: [0; OAM_SIZE],
            line: 0,
            forced_blank: true,
            objsel: 0,
            dma_budget: VBLANK_DMA_BYTES,
            dma_used: 0,
            stats: SimStats::default(),
        }
    }

    pub fn with_dma_budget(mut self, bytes: usize) -> Self {
        self.dma_budget = bytes;
        self
    }

    pub fn rom(&self) -> &RomImage {
        &self.rom
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn line(&self) -> u16 {
        self.line
    }

    pub fn forced_blank(&self) -> bool {
        self.forced_blank
    }

    pub fn objsel(&self) -> u8 {
        self.objsel
    }

    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    /// `len` bytes of VRAM starting at a word address.
    pub fn vram_at(&self, word: u16, len: usize) -> Vec<u8> {
        let start = word as usize * 2;
        (0..len).map(|i| self.vram[(start + i) % VRAM_SIZE]).collect()
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam
    }

    pub fn sprite(&self, id: usize) -> SimSprite {
        let low = &self.oam[id * 4..id * 4 + 4];
        let high = self.oam[512 + id / 4].get_bits((id % 4) * 2..(id % 4) * 2 + 2);
        SimSprite {
            x: low[0] as u16 | ((high.get_bit(0) as u16) << 8),
            y: low[1],
            tile: low[2] as u16 | (((low[3] & 1) as u16) << 8),
            attr: low[3] & 0xFE,
            large: high.get_bit(1),
        }
    }

    /// Advance the beam by `lines` scanlines.
    pub fn run_lines(&mut self, lines: u32) {
        for _ in 0..lines {
            self.step();
        }
    }

    /// Advance until the beam is on `line`.
    pub fn run_to_line(&mut self, line: u16) {
        let target = line % LINES_PER_FRAME;
        while self.line != target {
            self.step();
        }
    }

    fn step(&mut self) {
        self.line = (self.line + 1) % LINES_PER_FRAME;
        if self.line == VBLANK_START {
            self.stats.frames += 1;
            self.dma_used = 0;
        }
    }

    /// How many of `len` bytes make it into video memory right now.
    fn dma_window(&mut self, len: usize) -> usize {
        if self.forced_blank {
            return len;
        }
        if !self.in_vblank() {
            self.stats.dropped_bytes += len as u64;
            warn!(target: "dsim", "dma of {len} bytes during active display at line {}", self.line);
            return 0;
        }

        let allowed = len.min(self.dma_budget.saturating_sub(self.dma_used));
        self.dma_used += allowed;
        if allowed < len {
            self.stats.overruns += 1;
            self.stats.dropped_bytes += (len - allowed) as u64;
            debug!(target: "dsim", "vblank dma budget exhausted, {} bytes torn", len - allowed);
        }
        allowed
    }
}

impl FlushDriver for SimPpu {
    fn flush_vram(&mut self, entries: &[UploadEntry]) {
        self.stats.vram_flushes += 1;
        for entry in entries {
            for transfer in entry.transfers() {
                self.stats.transfers += 1;
                let len = transfer.len as usize;
                let allowed = self.dma_window(len);
                let start = transfer.destination as usize * 2;
                for (i, byte) in self.rom.read_range(transfer.source, allowed).enumerate() {
                    self.vram[(start + i) % VRAM_SIZE] = byte;
                }
                self.stats.bytes_written += allowed as u64;
            }
        }
    }

    fn commit_oam(&mut self, table: &OamTable) {
        self.stats.oam_commits += 1;
        let bytes = table.as_bytes();
        let allowed = self.dma_window(bytes.len());
        self.oam[..allowed].copy_from_slice(&bytes[..allowed]);
        self.stats.bytes_written += allowed as u64;
    }
}

impl VideoPort for SimPpu {
    fn in_vblank(&self) -> bool {
        self.line >= VBLANK_START
    }

    fn spin(&mut self) {
        self.step();
    }

    fn set_forced_blank(&mut self, blank: bool) {
        if self.forced_blank && !blank && self.stats.uploads_at_display_on.is_none() {
            self.stats.uploads_at_display_on = Some(self.stats.vram_flushes + self.stats.oam_commits);
        }
        self.forced_blank = blank;
    }

    fn set_obj_select(&mut self, value: u8) {
        self.objsel = value;
    }
}

#[cfg(test)]
mod tests {
    use dynsprite::{FarPtr, SpriteSize};

    use super::*;

    fn rom() -> RomImage {
        let mut rom = RomImage::new();
        rom.load(FarPtr::new(1, 0), &[0xAA; 0x400]);
        rom
    }

    fn entry() -> UploadEntry {
        UploadEntry {
            slot: 0,
            source: FarPtr::new(1, 0),
            destination: 0x0010,
            size: SpriteSize::Px16,
        }
    }

    #[test]
    fn frame_timing() {
        let mut ppu = SimPpu::new(RomImage::new());
        assert!(!ppu.in_vblank());
        ppu.run_to_line(VBLANK_START);
        assert!(ppu.in_vblank());
        assert_eq!(ppu.stats().frames, 1);
        ppu.run_lines((LINES_PER_FRAME - VBLANK_START) as u32);
        assert_eq!(ppu.line(), 0);
        assert!(!ppu.in_vblank());
    }

    #[test]
    fn writes_during_display_are_dropped() {
        let mut ppu = SimPpu::new(rom());
        ppu.set_forced_blank(false);
        ppu.flush_vram(&[entry()]);
        assert_eq!(ppu.stats().bytes_written, 0);
        assert_eq!(ppu.stats().dropped_bytes, 128);
        assert!(ppu.stats().tearing());
        assert_eq!(ppu.vram_at(0x0010, 1), [0u8]);
    }

    #[test]
    fn vblank_budget_tears_the_tail() {
        let mut ppu = SimPpu::new(rom()).with_dma_budget(100);
        ppu.set_forced_blank(false);
        ppu.run_to_line(VBLANK_START);
        ppu.flush_vram(&[entry()]);

        let stats = ppu.stats();
        assert_eq!(stats.bytes_written, 100);
        assert_eq!(stats.overruns, 1, "second row only partly fits");
        // first row: words 0x10.., second row: words 0x110..
        assert!(ppu.vram_at(0x0010, 64).iter().all(|b| *b == 0xAA));
        assert_eq!(ppu.vram_at(0x0110, 37)[35..], [0xAAu8, 0]);
    }

    #[test]
    fn records_uploads_at_display_on() {
        let mut ppu = SimPpu::new(rom());
        ppu.flush_vram(&[entry()]);
        ppu.commit_oam(&OamTable::hidden());
        ppu.set_forced_blank(false);
        assert_eq!(ppu.stats().uploads_at_display_on, Some(2));
        assert!(ppu.sprite(3).is_hidden());
    }
}
