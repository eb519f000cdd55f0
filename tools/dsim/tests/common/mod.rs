#![allow(dead_code)]

use dsim::{rom::RomImage, sheet, SimPpu};
use dynsprite::{
    DynamicSprites, EngineConfig, FarPtr, FlushMode, FlushOutcome, ObjAttribute, SpriteSize,
};

pub const SHEET: FarPtr = dsim::scenario::SHEET;

pub fn ppu_with_sheet(size: SpriteSize, frames: u16) -> SimPpu {
    let mut rom = RomImage::new();
    rom.load(SHEET, &sheet::build(size, frames));
    SimPpu::new(rom)
}

/// Initialised engine with every slot pointed at [`SHEET`].
pub fn engine<const Q: usize>(config: EngineConfig, ppu: &mut SimPpu) -> DynamicSprites<dynsprite::SheetLayout, Q> {
    let mut engine = DynamicSprites::new(config);
    engine.init(ppu);
    for id in 0..dynsprite::MAX_SPRITES {
        engine.set_gfx(id, SHEET);
    }
    engine
}

/// Draw slot 0 under forced blank, flush it and turn the display on.
pub fn start<const Q: usize>(
    engine: &mut DynamicSprites<dynsprite::SheetLayout, Q>,
    ppu: &mut SimPpu,
    mode: FlushMode,
) {
    engine.set_sprite(0, 100, 100, 0, ObjAttribute::new(3, 0));
    engine.draw(0).unwrap();
    engine.end_frame_commit();
    assert!(matches!(engine.flush_queue(ppu), Ok(FlushOutcome::Flushed { .. })));
    engine.enable_display(ppu, mode).unwrap();
}
