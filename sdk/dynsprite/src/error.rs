use core::fmt;

/// Errors returned by [`DynamicSprites`](crate::DynamicSprites).
///
/// None of these leave the engine in a bad state; the call that returned one
/// simply had no effect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Slot id is not below [`MAX_SPRITES`](crate::MAX_SPRITES).
    InvalidSlot(usize),
    /// The slot's size has no VRAM block under the current configuration.
    Unmapped(usize),
    /// The display was enabled before anything was flushed to the hardware.
    DisplayNotReady,
    /// A main-loop flush was attempted while the vblank hook owns flushing.
    HookOwnsFlush,
    /// The display is already running.
    AlreadyRunning,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidSlot(id) => write!(f, "sprite slot {id} out of range"),
            EngineError::Unmapped(id) => write!(f, "sprite slot {id} has no vram block at its size"),
            EngineError::DisplayNotReady => f.write_str("display enabled before the first flush"),
            EngineError::HookOwnsFlush => f.write_str("flush belongs to the vblank hook in deferred mode"),
            EngineError::AlreadyRunning => f.write_str("display already enabled"),
        }
    }
}

impl core::error::Error for EngineError {}
