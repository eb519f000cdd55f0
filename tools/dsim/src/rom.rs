use dynsprite::FarPtr;

/// Open bus reads as `0xFF`.
const OPEN_BUS: u8 = 0xFF;

/// Flat 24-bit address space holding cartridge data.
///
/// Bank mapping is not modelled: a [`FarPtr`] maps straight to its linear
/// address. Unloaded addresses read as open bus.
#[derive(Clone, Debug, Default)]
pub struct RomImage {
    data: Vec<u8>,
}

impl RomImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `bytes` into the image at `at`, growing it as needed.
    pub fn load(&mut self, at: FarPtr, bytes: &[u8]) {
        let start = at.linear() as usize;
        let end = start + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, OPEN_BUS);
        }
        self.data[start..end].copy_from_slice(bytes);
    }

    #[inline]
    pub fn read(&self, at: FarPtr) -> u8 {
        self.data.get(at.linear() as usize).copied().unwrap_or(OPEN_BUS)
    }

    /// `len` bytes starting at `at`, wrapping at the top of the address space.
    pub fn read_range(&self, at: FarPtr, len: usize) -> impl Iterator<Item = u8> + '_ {
        (0..len as u32).map(move |i| self.read(at.offset(i)))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
