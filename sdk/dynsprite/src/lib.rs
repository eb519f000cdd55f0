//! # Dynamic Sprites
//!
//! A software shadow of the 128-slot sprite table (OAM) plus a bounded queue of
//! VRAM uploads, scheduled around the two windows in which video memory may be
//! written: forced blank during setup, and the vertical blank between frames.
//!
//! Everything lives in one owned [`DynamicSprites`] value. There are no statics,
//! so the engine runs the same against real registers ([`hw::Snes`]) and
//! against a simulated PPU in tests.
//!
//! ## Setup
//!
//! The first frame must be fully uploaded while the screen is force-blanked:
//!
//! ```ignore
//! let mut engine: DynamicSprites = DynamicSprites::new(EngineConfig::default());
//! engine.init(&mut hw);
//!
//! engine.set_gfx(0, SHEET);
//! engine.set_sprite(0, 100, 100, 0, ObjAttribute::new(3, 0));
//! engine.draw(0)?;
//! engine.end_frame_commit();
//! engine.flush_queue(&mut hw)?;
//!
//! engine.enable_display(&mut hw, FlushMode::Deferred)?;
//! ```
//!
//! ## Main Loop
//!
//! In [`FlushMode::Deferred`] the flush runs from the vblank hook, so drawing
//! and committing happen *before* waiting:
//!
//! ```ignore
//! loop {
//!     engine.set_frame(0, next_frame);
//!     engine.draw(0)?;
//!     engine.end_frame_commit();
//!     engine.wait_for_vblank(&mut hw); // hook flushes at the vblank edge
//! }
//! ```
//!
//! In [`FlushMode::Immediate`] the order is wait, draw, commit, flush, and the
//! flush races whatever is left of the blanking window.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod descriptor;
pub mod driver;
pub mod engine;
pub mod error;
pub mod hw;
pub mod layout;
pub mod oam;
pub mod queue;
pub mod scheduler;

pub use config::{EngineConfig, ObjSize, OverflowPolicy, SpriteSize};
pub use descriptor::{FarPtr, ObjAttribute, ObjFlags, SpriteDescriptor, SpriteTable, MAX_SPRITES};
pub use driver::{FlushDriver, Hardware, VideoPort};
pub use engine::{DrawPhase, Drawn, DynamicSprites};
pub use error::EngineError;
pub use layout::{FrameLookup, SheetLayout, VramMap};
pub use oam::{CommitStats, OamEntry, OamMirror, OamTable};
pub use queue::{Enqueued, Transfer, UploadEntry, UploadQueue, DEFAULT_BUDGET};
pub use scheduler::{
    deferred_flush, DisplayState, FlushMode, FlushOutcome, FlushStats, FrameScheduler, VblankContext, VblankHook,
};
