//! The animated demo: a grid of 16x16 sprites cycling through a sheet while
//! drifting right, one animation step every `period` frames.

use std::path::Path;

use anyhow::{ensure, Context};
use dynsprite::{
    Drawn, DynamicSprites, EngineConfig, FarPtr, FlushMode, FlushOutcome, FlushStats, ObjAttribute,
    OverflowPolicy, SpriteSize, DEFAULT_BUDGET,
};
use log::{debug, info};

use crate::{
    ppu::{SimPpu, SimStats, VBLANK_DMA_BYTES},
    rom::RomImage,
    sheet,
};

/// Where the demo sheet is loaded.
pub const SHEET: FarPtr = FarPtr::new(0x01, 0x8000);

/// Setup frames allowed before giving up on uploading everything.
const MAX_SETUP_FRAMES: u32 = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    pub sprites: usize,
    pub frames: u32,
    /// Frames between two animation steps.
    pub period: u32,
    pub sheet_frames: u16,
    pub mode: FlushMode,
    pub overflow: OverflowPolicy,
    pub dma_budget: usize,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            sprites: DEFAULT_BUDGET,
            frames: 600,
            period: 6,
            sheet_frames: 8,
            mode: FlushMode::Deferred,
            overflow: OverflowPolicy::DeferNewest,
            dma_budget: VBLANK_DMA_BYTES,
        }
    }
}

impl Scenario {
    /// Animation frame of sprite `id` at frame `t`.
    pub fn frame_of(&self, id: usize, t: u32) -> u16 {
        ((id as u32 + t / self.period) % self.sheet_frames as u32) as u16
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub queued: u32,
    pub replaced: u32,
    pub deferred: u32,
    pub evicted: u32,
}

impl Tally {
    fn count(&mut self, drawn: Drawn) {
        match drawn {
            Drawn::Unchanged => {}
            Drawn::Queued => self.queued += 1,
            Drawn::Replaced => self.replaced += 1,
            Drawn::Deferred => self.deferred += 1,
            Drawn::Evicted(_) => self.evicted += 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Report {
    pub setup_frames: u32,
    pub frames: u32,
    pub draws: Tally,
    pub flushed_frames: u32,
    pub flush: FlushStats,
    pub sim: SimStats,
}

pub fn run(scenario: &Scenario) -> anyhow::Result<(Report, SimPpu)> {
    ensure!(scenario.period > 0, "animation period must be at least one frame");
    ensure!(scenario.sheet_frames > 0, "sheet needs at least one frame");

    let mut rom = RomImage::new();
    rom.load(SHEET, &sheet::build(SpriteSize::Px16, scenario.sheet_frames));
    let mut ppu = SimPpu::new(rom).with_dma_budget(scenario.dma_budget);

    let mut engine: DynamicSprites = DynamicSprites::new(EngineConfig::new().with_overflow(scenario.overflow));
    let capacity = engine.vram_map().capacity(SpriteSize::Px16);
    ensure!(
        scenario.sprites <= capacity,
        "{} sprites requested, only {capacity} 16x16 blocks",
        scenario.sprites
    );

    engine.init(&mut ppu);
    let mut draws = Tally::default();

    // everything has to be in vram before the screen comes on
    let mut setup_frames = 0;
    loop {
        setup_frames += 1;
        engine.run_frame(&mut ppu, |f| {
            for id in 0..scenario.sprites {
                f.set_gfx(id, SHEET);
                f.set_sprite(id, x_of(id, 0), y_of(id), scenario.frame_of(id, 0), ObjAttribute::new(3, 0));
                draws.count(f.draw(id)?);
            }
            Ok(())
        })?;

        let pending = (0..scenario.sprites).any(|id| engine.sprite(id).is_some_and(|s| s.refresh));
        if !pending {
            break;
        }
        ensure!(setup_frames < MAX_SETUP_FRAMES, "setup did not converge after {setup_frames} frames");
    }
    debug!(target: "dsim", "setup done in {setup_frames} frames");

    engine.enable_display(&mut ppu, scenario.mode).context("enabling display")?;

    let mut flushed_frames = 0;
    for t in 1..=scenario.frames {
        let outcome = engine.run_frame(&mut ppu, |f| {
            for id in 0..scenario.sprites {
                f.set_frame(id, scenario.frame_of(id, t));
                f.set_position(id, x_of(id, t), y_of(id));
                draws.count(f.draw(id)?);
            }
            Ok(())
        })?;
        if matches!(outcome, FlushOutcome::Flushed { .. }) {
            flushed_frames += 1;
        }
    }

    let report = Report {
        setup_frames,
        frames: scenario.frames,
        draws,
        flushed_frames,
        flush: *engine.scheduler().stats(),
        sim: *ppu.stats(),
    };
    info!(target: "dsim", "{} frames, {} uploads", report.frames, report.flush.entries);
    Ok((report, ppu))
}

fn x_of(id: usize, t: u32) -> i16 {
    ((id % 8) * 28) as i16 + (t % 256) as i16
}

fn y_of(id: usize) -> i16 {
    ((id / 8) * 24 + 16) as i16
}

/// Write the simulated OAM to `path`.
pub fn dump_oam(ppu: &SimPpu, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, ppu.oam()).with_context(|| format!("writing oam to {}", path.display()))
}
