//! # Frame Scheduler
//!
//! Video memory may only be written in two windows: while the screen is
//! force-blanked, and during the vertical blank between frames. The scheduler
//! decides which window a flush runs in.
//!
//! ```text
//!             enable_display(Immediate)
//!   ┌───────┐ ─────────────────────────▶ ┌───────────┐
//!   │ Setup │                            │ Immediate │  main loop flushes
//!   └───────┘ ─────────────────────────▶ ├───────────┤
//!             enable_display(Deferred)   │ Deferred  │  vblank hook flushes
//!                                        └───────────┘
//! ```
//!
//! | State       | Who flushes                        | Frame order                      |
//! |-------------|------------------------------------|----------------------------------|
//! | `Setup`     | main loop, under forced blank      | draw, commit, flush              |
//! | `Immediate` | main loop, right after vblank      | wait, draw, commit, flush        |
//! | `Deferred`  | the [`VblankHook`] at the edge     | draw, commit, wait (hook flushes) |
//!
//! In `Deferred` the commit arms a one-shot flush and the hook only uploads
//! when armed. A main loop that misses a vblank leaves the previous frame on
//! screen.
//!
//! A flush with nothing queued and no new OAM commit is a no-op that touches no
//! hardware.

use log::{debug, error, warn};

use crate::{
    driver::Hardware,
    error::EngineError,
    oam::OamMirror,
    queue::{UploadEntry, UploadQueue},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DisplayState {
    /// Forced blank, display off. Flushes run from the main loop.
    #[default]
    Setup,
    Immediate,
    Deferred,
}

/// How the display runs once enabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlushMode {
    Immediate,
    Deferred,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing pending; no hardware was touched.
    #[default]
    Idle,
    Flushed {
        /// Upload entries handed to the driver.
        entries: usize,
        /// Whether the committed OAM table was uploaded.
        oam: bool,
    },
    /// A previous flush never completed.
    Busy,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub flushes: u32,
    /// Flushes that ran before the display was enabled.
    pub setup_flushes: u32,
    pub idle: u32,
    pub entries: u32,
    pub oam_uploads: u32,
    /// Flushes that ran with the beam in active display.
    pub timing_violations: u32,
}

/// Called once per vertical blank while the display is running.
pub type VblankHook = fn(&mut VblankContext<'_>);

/// Built-in hook installed when entering `Deferred` without one.
pub fn deferred_flush(ctx: &mut VblankContext<'_>) {
    ctx.flush();
}

/// Queue entries without the queue's capacity in the type.
pub(crate) trait PendingUploads {
    fn entries(&self) -> &[UploadEntry];
    fn clear(&mut self);
}

impl<const N: usize> PendingUploads for UploadQueue<N> {
    #[inline(always)]
    fn entries(&self) -> &[UploadEntry] {
        self.as_slice()
    }

    #[inline(always)]
    fn clear(&mut self) {
        UploadQueue::clear(self)
    }
}

#[derive(Debug, Default)]
struct Flusher {
    in_progress: bool,
    stats: FlushStats,
}

impl Flusher {
    fn run(
        &mut self,
        hw: &mut dyn Hardware,
        pending: &mut dyn PendingUploads,
        oam: &mut OamMirror,
        forced_blank: bool,
        setup: bool,
    ) -> FlushOutcome {
        if self.in_progress {
            warn!(target: "dynsprite", "flush requested while another is in progress");
            return FlushOutcome::Busy;
        }

        let entries = pending.entries().len();
        let upload_oam = oam.is_dirty();
        if entries == 0 && !upload_oam {
            self.stats.idle = self.stats.idle.wrapping_add(1);
            return FlushOutcome::Idle;
        }

        let window_open = forced_blank || hw.in_vblank();
        if !window_open {
            self.stats.timing_violations = self.stats.timing_violations.wrapping_add(1);
            error!(target: "dynsprite", "flush outside forced blank and vblank ({entries} uploads)");
        }
        debug_assert!(window_open, "flush outside forced blank and vblank");

        self.in_progress = true;
        if entries > 0 {
            hw.flush_vram(pending.entries());
        }
        if upload_oam {
            hw.commit_oam(oam.committed());
            oam.mark_uploaded();
        }
        pending.clear();
        self.in_progress = false;

        self.stats.flushes = self.stats.flushes.wrapping_add(1);
        if setup {
            self.stats.setup_flushes = self.stats.setup_flushes.wrapping_add(1);
        }
        self.stats.entries = self.stats.entries.wrapping_add(entries as u32);
        if upload_oam {
            self.stats.oam_uploads = self.stats.oam_uploads.wrapping_add(1);
        }
        debug!(target: "dynsprite", "flush: {entries} uploads, oam {upload_oam}");

        FlushOutcome::Flushed {
            entries,
            oam: upload_oam,
        }
    }
}

/// What a [`VblankHook`] gets to touch: the hardware and the pending flush.
/// Sprite descriptors are not reachable from here.
pub struct VblankContext<'a> {
    hw: &'a mut dyn Hardware,
    pending: &'a mut dyn PendingUploads,
    oam: &'a mut OamMirror,
    flusher: &'a mut Flusher,
    armed: &'a mut bool,
    state: DisplayState,
    frame: u32,
    outcome: FlushOutcome,
}

impl VblankContext<'_> {
    /// Upload pending work. In `Deferred` this only happens once per commit.
    pub fn flush(&mut self) -> FlushOutcome {
        if self.state == DisplayState::Deferred && !*self.armed {
            return FlushOutcome::Idle;
        }
        let outcome = self.flusher.run(self.hw, self.pending, self.oam, false, false);
        if matches!(outcome, FlushOutcome::Flushed { .. }) {
            *self.armed = false;
        }
        self.outcome = outcome;
        outcome
    }

    #[inline(always)]
    pub fn hardware(&mut self) -> &mut dyn Hardware {
        &mut *self.hw
    }

    /// Vertical blanks seen so far, including this one.
    #[inline(always)]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    #[inline(always)]
    pub fn state(&self) -> DisplayState {
        self.state
    }

    /// Uploads waiting in the queue.
    #[inline(always)]
    pub fn pending(&self) -> usize {
        self.pending.entries().len()
    }
}

/// Display state, the vblank hook and the flush guard.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    state: DisplayState,
    hook: Option<VblankHook>,
    armed: bool,
    forced_blank: bool,
    /// A committed frame reached the hardware under forced blank.
    ready: bool,
    frame: u32,
    flusher: Flusher,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn state(&self) -> DisplayState {
        self.state
    }

    #[inline(always)]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    #[inline(always)]
    pub fn stats(&self) -> &FlushStats {
        &self.flusher.stats
    }

    #[inline(always)]
    pub fn hook(&self) -> Option<VblankHook> {
        self.hook
    }

    /// A deferred flush is waiting for the next vblank.
    #[inline(always)]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Last value written to the forced blank bit.
    #[inline(always)]
    pub fn forced_blank(&self) -> bool {
        self.forced_blank
    }

    pub(crate) fn set_forced_blank(&mut self, hw: &mut dyn Hardware, blank: bool) {
        hw.set_forced_blank(blank);
        self.forced_blank = blank;
    }

    pub(crate) fn arm(&mut self) {
        if self.state == DisplayState::Deferred {
            self.armed = true;
        }
    }

    pub(crate) fn replace_hook(&mut self, hook: Option<VblankHook>) -> Option<VblankHook> {
        core::mem::replace(&mut self.hook, hook)
    }

    /// Leave setup. The last committed frame must already be on the hardware,
    /// with nothing left in the queue.
    pub(crate) fn enable(
        &mut self,
        hw: &mut dyn Hardware,
        pending: &dyn PendingUploads,
        oam: &OamMirror,
        mode: FlushMode,
    ) -> Result<(), EngineError> {
        if self.state != DisplayState::Setup {
            return Err(EngineError::AlreadyRunning);
        }
        if !self.ready {
            warn!(target: "dynsprite", "display enable refused: no committed frame flushed during setup");
            return Err(EngineError::DisplayNotReady);
        }
        if !pending.entries().is_empty() || oam.is_dirty() {
            warn!(
                target: "dynsprite",
                "display enable refused: {} uploads pending, oam dirty {}",
                pending.entries().len(),
                oam.is_dirty()
            );
            return Err(EngineError::DisplayNotReady);
        }

        self.state = match mode {
            FlushMode::Immediate => DisplayState::Immediate,
            FlushMode::Deferred => {
                if self.hook.is_none() {
                    self.hook = Some(deferred_flush);
                }
                DisplayState::Deferred
            }
        };
        self.set_forced_blank(hw, false);
        debug!(target: "dynsprite", "display on, {:?}", self.state);
        Ok(())
    }

    /// Main-loop flush.
    pub(crate) fn flush(
        &mut self,
        hw: &mut dyn Hardware,
        pending: &mut dyn PendingUploads,
        oam: &mut OamMirror,
    ) -> Result<FlushOutcome, EngineError> {
        if self.state == DisplayState::Deferred {
            return Err(EngineError::HookOwnsFlush);
        }
        let setup = self.state == DisplayState::Setup;
        let outcome = self.flusher.run(hw, pending, oam, self.forced_blank, setup);
        if setup && matches!(outcome, FlushOutcome::Flushed { oam: true, .. }) && oam.commits() > 0 {
            self.ready = true;
        }
        Ok(outcome)
    }

    /// Advance the frame counter and run the hook, as the vblank interrupt
    /// would. Hooks only run once the display is on.
    pub(crate) fn vblank(
        &mut self,
        hw: &mut dyn Hardware,
        pending: &mut dyn PendingUploads,
        oam: &mut OamMirror,
    ) -> FlushOutcome {
        self.frame = self.frame.wrapping_add(1);
        let Some(hook) = self.hook else {
            return FlushOutcome::Idle;
        };
        if self.state == DisplayState::Setup {
            return FlushOutcome::Idle;
        }

        let mut ctx = VblankContext {
            hw,
            pending,
            oam,
            flusher: &mut self.flusher,
            armed: &mut self.armed,
            state: self.state,
            frame: self.frame,
            outcome: FlushOutcome::Idle,
        };
        hook(&mut ctx);
        ctx.outcome
    }

    #[cfg(test)]
    pub(crate) fn force_busy(&mut self) {
        self.flusher.in_progress = true;
    }
}
