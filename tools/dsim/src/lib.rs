//! # dsim
//!
//! A host-side stand-in for the console's picture processor, used to run the
//! [`dynsprite`] engine without hardware.
//!
//! [`SimPpu`] implements the engine's hardware traits over plain memory: 64 KiB
//! of VRAM, the 544-byte OAM, a scanline clock and a per-vblank DMA budget.
//! It records what happened so tests can check it afterwards:
//!
//! ```ignore
//! let mut rom = RomImage::new();
//! rom.load(SHEET, &sheet::build(SpriteSize::Px16, 8));
//! let mut ppu = SimPpu::new(rom);
//!
//! let mut engine: DynamicSprites = DynamicSprites::new(EngineConfig::default());
//! engine.init(&mut ppu);
//! // ...
//! assert_eq!(sheet::frame_in_block(&ppu, 0x0000, SpriteSize::Px16), Some(0));
//! assert!(!ppu.stats().tearing());
//! ```

pub mod ppu;
pub mod rom;
pub mod scenario;
pub mod sheet;

pub use ppu::{SimPpu, SimSprite, SimStats};
pub use rom::RomImage;
pub use scenario::{Report, Scenario};
