//! # Hardware Seams
//!
//! The engine never touches registers directly. Everything it needs from the
//! console goes through two small traits:
//!
//! - [`FlushDriver`]: the bulk copies. Fire-and-forget; both calls complete
//!   before returning and report nothing.
//! - [`VideoPort`]: blanking state and the few registers set during setup.
//!
//! [`Snes`](crate::hw::Snes) implements both on real hardware. Tests and the
//! host tools use a simulated PPU instead.
//!
//! Both [`FlushDriver`] calls are only legal inside forced blank or an active
//! vertical blank. The engine checks this before calling them.

use crate::{oam::OamTable, queue::UploadEntry};

pub trait FlushDriver {
    /// Copy every entry's tile data into VRAM, in order.
    fn flush_vram(&mut self, entries: &[UploadEntry]);

    /// Copy the whole 544-byte table into OAM.
    fn commit_oam(&mut self, table: &OamTable);
}

pub trait VideoPort {
    /// True while the beam is in the vertical blanking interval.
    fn in_vblank(&self) -> bool;

    /// Burn a little time while polling. On hardware this is a few cycles, in
    /// a simulation it advances the clock.
    fn spin(&mut self);

    fn set_forced_blank(&mut self, blank: bool);

    /// Write OBJSEL.
    fn set_obj_select(&mut self, value: u8);
}

/// Everything the engine needs from the console.
pub trait Hardware: FlushDriver + VideoPort {}

impl<T: FlushDriver + VideoPort + ?Sized> Hardware for T {}
