//! Synthetic sprite sheets.
//!
//! Every byte of frame `n` is [`marker(n)`](marker), so a VRAM block can be
//! traced back to the frame that was uploaded into it.

use dynsprite::{SheetLayout, SpriteSize};

use crate::ppu::SimPpu;

const SHEET_ROW_BYTES: usize = 0x200;
const VRAM_ROW_WORDS: u16 = 0x100;

/// Fill byte for frame `n`. Never zero, so untouched VRAM is recognisable.
pub const fn marker(frame: u16) -> u8 {
    (frame % 255) as u8 + 1
}

/// A 128-pixel-wide 4bpp sheet holding `frames` frames of `size`.
pub fn build(size: SpriteSize, frames: u16) -> Vec<u8> {
    let w = size.tiles_wide() as usize;
    let per_row = 16 / w;
    let frame_rows = (frames as usize).div_ceil(per_row);
    let mut sheet = vec![0; frame_rows * w * SHEET_ROW_BYTES];

    for frame in 0..frames {
        let start = SheetLayout::frame_offset(frame, size) as usize;
        for row in 0..w {
            let at = start + row * SHEET_ROW_BYTES;
            sheet[at..at + size.row_bytes() as usize].fill(marker(frame));
        }
    }
    sheet
}

/// The frame whose marker fills the whole block at `destination`, if any.
pub fn frame_in_block(ppu: &SimPpu, destination: u16, size: SpriteSize) -> Option<u8> {
    let mut seen = None;
    for row in 0..size.tiles_wide() {
        let bytes = ppu.vram_at(destination + row * VRAM_ROW_WORDS, size.row_bytes() as usize);
        for byte in bytes {
            match seen {
                None => seen = Some(byte),
                Some(b) if b != byte => return None,
                Some(_) => {}
            }
        }
    }
    seen.filter(|b| *b != 0).map(|b| b - 1)
}
