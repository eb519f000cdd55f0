//! # Engine
//!
//! [`DynamicSprites`] owns the descriptor table, the OAM mirror, the upload
//! queue and the scheduler. Game code only ever talks to this type.
//!
//! ## Drawing
//!
//! [`draw`](DynamicSprites::draw) is called once per visible sprite per frame.
//! It marks the slot as used, and if the sprite's graphics changed since the
//! last upload it queues a copy of the new frame into the slot's VRAM block:
//!
//! ```ignore
//! for (id, enemy) in enemies.iter().enumerate() {
//!     engine.set_sprite(id, enemy.x, enemy.y, enemy.frame, ObjAttribute::new(2, 1));
//!     engine.draw(id)?;
//! }
//! engine.end_frame_commit(); // every slot not drawn above is hidden
//! ```
//!
//! ## Whole Frames
//!
//! [`run_frame`](DynamicSprites::run_frame) runs one frame in the right order
//! for the current [`DisplayState`]. The closure gets a [`DrawPhase`], which
//! can touch sprites but cannot flush:
//!
//! ```ignore
//! engine.run_frame(&mut hw, |frame| {
//!     frame.set_frame(0, anim.next());
//!     frame.draw(0)
//! })?;
//! ```

use log::{debug, warn};

use crate::{
    config::{EngineConfig, SpriteSize},
    descriptor::{FarPtr, ObjAttribute, SpriteDescriptor, SpriteTable},
    driver::Hardware,
    error::EngineError,
    layout::{FrameLookup, SheetLayout, VramMap},
    oam::{CommitStats, OamMirror},
    queue::{Enqueued, UploadEntry, UploadQueue, DEFAULT_BUDGET},
    scheduler::{DisplayState, FlushMode, FlushOutcome, FrameScheduler, VblankHook},
};

/// What [`DynamicSprites::draw`] did with a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Drawn {
    /// Graphics already in VRAM; only the OAM entry will change.
    Unchanged,
    Queued,
    /// Replaced an upload queued earlier this frame for the same block.
    Replaced,
    /// Queued by evicting the oldest upload, which belonged to the given
    /// slot. That slot uploads again on its next draw.
    Evicted(u8),
    /// The queue is full. The slot keeps its refresh flag and tries again on
    /// its next draw.
    Deferred,
}

pub struct DynamicSprites<L: FrameLookup = SheetLayout, const Q: usize = DEFAULT_BUDGET> {
    config: EngineConfig,
    vram: VramMap,
    lookup: L,
    sprites: SpriteTable,
    oam: OamMirror,
    queue: UploadQueue<Q>,
    scheduler: FrameScheduler,
}

impl<const Q: usize> DynamicSprites<SheetLayout, Q> {
    /// An engine using the standard sheet layout.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_lookup(config, SheetLayout)
    }
}

impl<L: FrameLookup, const Q: usize> DynamicSprites<L, Q> {
    pub fn with_lookup(config: EngineConfig, lookup: L) -> Self {
        Self {
            config,
            vram: VramMap::new(&config),
            lookup,
            sprites: SpriteTable::new(),
            oam: OamMirror::new(),
            queue: UploadQueue::new(config.overflow),
            scheduler: FrameScheduler::new(),
        }
    }

    /// Blank the screen and program OBJSEL. Call once before the first flush.
    pub fn init<H: Hardware>(&mut self, hw: &mut H) {
        self.scheduler.set_forced_blank(hw, true);
        hw.set_obj_select(self.config.objsel());
        debug!(target: "dynsprite", "init: objsel {:#04x}, queue budget {}", self.config.objsel(), Q);
    }

    #[inline(always)]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline(always)]
    pub fn vram_map(&self) -> &VramMap {
        &self.vram
    }

    #[inline(always)]
    pub fn sprites(&self) -> &SpriteTable {
        &self.sprites
    }

    #[inline(always)]
    pub fn sprite(&self, id: usize) -> Option<&SpriteDescriptor> {
        self.sprites.get(id)
    }

    #[inline(always)]
    pub fn oam(&self) -> &OamMirror {
        &self.oam
    }

    #[inline(always)]
    pub fn queue(&self) -> &UploadQueue<Q> {
        &self.queue
    }

    #[inline(always)]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    #[inline(always)]
    pub fn state(&self) -> DisplayState {
        self.scheduler.state()
    }

    /// Vertical blanks seen so far.
    #[inline(always)]
    pub fn frame(&self) -> u32 {
        self.scheduler.frame()
    }

    pub fn set_sprite(&mut self, id: usize, x: i16, y: i16, frame_id: u16, attr: ObjAttribute) -> bool {
        self.sprites.set_sprite(id, x, y, frame_id, attr, &self.lookup)
    }

    pub fn set_gfx(&mut self, id: usize, sheet: FarPtr) -> bool {
        self.sprites.set_gfx(id, sheet, &self.lookup)
    }

    pub fn set_frame(&mut self, id: usize, frame_id: u16) -> bool {
        self.sprites.set_frame(id, frame_id, &self.lookup)
    }

    pub fn set_size(&mut self, id: usize, size: SpriteSize) -> bool {
        self.sprites.set_size(id, size, &self.lookup)
    }

    pub fn set_position(&mut self, id: usize, x: i16, y: i16) -> bool {
        self.sprites.set_position(id, x, y)
    }

    pub fn request_refresh(&mut self, id: usize) -> bool {
        self.sprites.request_refresh(id)
    }

    pub fn hide(&mut self, id: usize) -> bool {
        self.sprites.hide(id)
    }

    /// Use slot `id` this frame, queueing its graphics if they changed.
    pub fn draw(&mut self, id: usize) -> Result<Drawn, EngineError> {
        let sprite = self.sprites.get_mut(id).ok_or(EngineError::InvalidSlot(id))?;
        let destination = self
            .vram
            .destination(id, sprite.size)
            .ok_or(EngineError::Unmapped(id))?;
        self.oam.mark_drawn(id);

        if !sprite.refresh {
            return Ok(Drawn::Unchanged);
        }

        let entry = UploadEntry {
            slot: id as u8,
            source: sprite.gfx,
            destination,
            size: sprite.size,
        };
        let drawn = match self.queue.push(entry) {
            Enqueued::Added => Drawn::Queued,
            Enqueued::Replaced => Drawn::Replaced,
            Enqueued::Evicted(old) => Drawn::Evicted(old.slot),
            Enqueued::Rejected => return Ok(Drawn::Deferred),
        };
        sprite.mark_queued();

        if let Drawn::Evicted(slot) = drawn {
            self.sprites.request_refresh(slot as usize);
        }
        Ok(drawn)
    }

    /// Encode every slot into the committed OAM table. Slots not drawn since
    /// the last commit are hidden. In `Deferred` this arms the next vblank
    /// flush.
    pub fn end_frame_commit(&mut self) -> CommitStats {
        let stats = self.oam.commit(&self.sprites, &self.vram);
        self.scheduler.arm();
        stats
    }

    /// Upload queued tiles and the committed OAM table now.
    ///
    /// Only valid during setup or in `Immediate`; in `Deferred` the vblank
    /// hook does this.
    pub fn flush_queue<H: Hardware>(&mut self, hw: &mut H) -> Result<FlushOutcome, EngineError> {
        self.scheduler.flush(hw, &mut self.queue, &mut self.oam)
    }

    /// Leave setup and turn the screen on.
    ///
    /// Fails with [`EngineError::DisplayNotReady`] until a committed frame has
    /// been flushed under forced blank, and while uploads or a newer commit
    /// are still waiting for a flush.
    pub fn enable_display<H: Hardware>(&mut self, hw: &mut H, mode: FlushMode) -> Result<(), EngineError> {
        self.scheduler.enable(hw, &self.queue, &self.oam, mode)
    }

    /// Install the vblank hook, returning the one it replaces.
    pub fn set_vblank_hook(&mut self, hook: VblankHook) -> Option<VblankHook> {
        if !self.queue.is_empty() || self.oam.is_dirty() {
            warn!(
                target: "dynsprite",
                "vblank hook replaced with {} uploads pending; next window flushes them",
                self.queue.len()
            );
        }
        self.scheduler.replace_hook(Some(hook))
    }

    pub fn clear_vblank_hook(&mut self) -> Option<VblankHook> {
        if self.state() == DisplayState::Deferred {
            warn!(target: "dynsprite", "vblank hook removed in deferred mode; nothing will flush");
        }
        self.scheduler.replace_hook(None)
    }

    /// Spin until the next vblank starts, then run the vblank hook.
    ///
    /// Returns whatever the hook's flush did.
    pub fn wait_for_vblank<H: Hardware>(&mut self, hw: &mut H) -> FlushOutcome {
        while hw.in_vblank() {
            hw.spin();
        }
        while !hw.in_vblank() {
            hw.spin();
        }
        self.vblank_interrupt(hw)
    }

    /// Entry point for the vblank interrupt. Call at the start of vblank.
    pub fn vblank_interrupt<H: Hardware>(&mut self, hw: &mut H) -> FlushOutcome {
        self.scheduler.vblank(hw, &mut self.queue, &mut self.oam)
    }

    /// Run one frame in the order the current state needs: draw, commit and
    /// flush around the vblank wait.
    pub fn run_frame<H, F, T>(&mut self, hw: &mut H, draw: F) -> Result<FlushOutcome, EngineError>
    where
        H: Hardware,
        F: FnOnce(&mut DrawPhase<'_, L, Q>) -> Result<T, EngineError>,
    {
        match self.state() {
            DisplayState::Setup => {
                draw(&mut DrawPhase { engine: self })?;
                self.end_frame_commit();
                self.flush_queue(hw)
            }
            DisplayState::Immediate => {
                self.wait_for_vblank(hw);
                draw(&mut DrawPhase { engine: self })?;
                self.end_frame_commit();
                self.flush_queue(hw)
            }
            DisplayState::Deferred => {
                draw(&mut DrawPhase { engine: self })?;
                self.end_frame_commit();
                Ok(self.wait_for_vblank(hw))
            }
        }
    }
}

/// The part of the engine available between two flushes.
pub struct DrawPhase<'a, L: FrameLookup, const Q: usize> {
    engine: &'a mut DynamicSprites<L, Q>,
}

impl<L: FrameLookup, const Q: usize> DrawPhase<'_, L, Q> {
    pub fn set_sprite(&mut self, id: usize, x: i16, y: i16, frame_id: u16, attr: ObjAttribute) -> bool {
        self.engine.set_sprite(id, x, y, frame_id, attr)
    }

    pub fn set_gfx(&mut self, id: usize, sheet: FarPtr) -> bool {
        self.engine.set_gfx(id, sheet)
    }

    pub fn set_frame(&mut self, id: usize, frame_id: u16) -> bool {
        self.engine.set_frame(id, frame_id)
    }

    pub fn set_size(&mut self, id: usize, size: SpriteSize) -> bool {
        self.engine.set_size(id, size)
    }

    pub fn set_position(&mut self, id: usize, x: i16, y: i16) -> bool {
        self.engine.set_position(id, x, y)
    }

    pub fn hide(&mut self, id: usize) -> bool {
        self.engine.hide(id)
    }

    pub fn sprite(&self, id: usize) -> Option<&SpriteDescriptor> {
        self.engine.sprite(id)
    }

    pub fn draw(&mut self, id: usize) -> Result<Drawn, EngineError> {
        self.engine.draw(id)
    }

    /// Vertical blanks seen so far.
    pub fn frame(&self) -> u32 {
        self.engine.frame()
    }
}
