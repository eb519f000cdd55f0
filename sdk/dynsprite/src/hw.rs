//! # Console Registers
//!
//! Memory-mapped register blocks for the parts of the PPU and CPU the engine
//! drives, and [`Snes`], which implements the [`driver`](crate::driver) traits
//! on top of them.
//!
//! | Block       | Address  | Registers used                                  |
//! |-------------|----------|-------------------------------------------------|
//! | [`Ppu`]     | `$2100`  | INIDISP, OBSEL, OAMADD, VMAIN, VMADD            |
//! | [`CpuIo`]   | `$4200`  | MDMAEN, HVBJOY                                  |
//! | [`DmaRegs`] | `$4300`  | one [`DmaChannel`] per 16 bytes, 8 channels      |
//!
//! All uploads use DMA channel 0. OAM goes through `$2104` one byte at a time;
//! VRAM goes through `$2118/$2119` as words, incrementing after the high byte.

use bit_field::BitField;
use volatile_register::{RO, RW, WO};

use crate::{
    descriptor::FarPtr,
    driver::{FlushDriver, VideoPort},
    oam::{OamTable, OAM_TABLE_SIZE},
    queue::UploadEntry,
};

bitflags::bitflags! {
    /// INIDISP (`$2100`).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Inidisp: u8 {
        const FORCE_BLANK = 0b1000_0000;
        const BRIGHTNESS  = 0b0000_1111;
    }

    /// DMAPx (`$43x0`).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct DmaControl: u8 {
        /// Two registers, written alternately (`$2118/$2119`).
        const TWO_REGISTERS = 0b0000_0001;
        const FIXED_SOURCE  = 0b0000_1000;
        const DECREMENT     = 0b0001_0000;
        const PPU_TO_CPU    = 0b1000_0000;
    }
}

/// VMAIN value: increment the address after writing `$2119`, by one word.
const VMAIN_INC_HIGH: u8 = 0x80;
/// B-bus address of OAMDATA.
const BBUS_OAMDATA: u8 = 0x04;
/// B-bus address of VMDATAL.
const BBUS_VMDATA: u8 = 0x18;
/// Work RAM, where the OAM shadow lives.
const WRAM_BANK: u8 = 0x7E;

/// PPU registers `$2100-$2119`.
#[repr(C, packed)]
pub struct Ppu {
    pub inidisp: WO<u8>,
    pub obsel: WO<u8>,
    pub oamaddl: WO<u8>,
    pub oamaddh: WO<u8>,
    pub oamdata: WO<u8>,
    /// `$2105-$2114`, background registers.
    _bg: [WO<u8>; 16],
    pub vmain: WO<u8>,
    pub vmaddl: WO<u8>,
    pub vmaddh: WO<u8>,
    pub vmdatal: WO<u8>,
    pub vmdatah: WO<u8>,
}

impl Ppu {
    #[inline(always)]
    pub unsafe fn new() -> &'static mut Ppu {
        unsafe { &mut *(0x2100 as *mut Ppu) }
    }
}

/// CPU I/O registers `$4200-$4212`.
#[repr(C, packed)]
pub struct CpuIo {
    pub nmitimen: WO<u8>,
    /// `$4201-$420A`, I/O port, multiplier, divider and IRQ timer.
    _math: [WO<u8>; 10],
    pub mdmaen: WO<u8>,
    pub hdmaen: WO<u8>,
    pub memsel: WO<u8>,
    _open: [u8; 2],
    pub rdnmi: RO<u8>,
    pub timeup: RO<u8>,
    pub hvbjoy: RO<u8>,
}

impl CpuIo {
    #[inline(always)]
    pub unsafe fn new() -> &'static mut CpuIo {
        unsafe { &mut *(0x4200 as *mut CpuIo) }
    }
}

/// One DMA channel, `$43x0-$43xF`.
#[repr(C, packed)]
pub struct DmaChannel {
    pub dmap: RW<u8>,
    pub bbad: RW<u8>,
    pub a1tl: RW<u8>,
    pub a1th: RW<u8>,
    pub a1b: RW<u8>,
    pub dasl: RW<u8>,
    pub dash: RW<u8>,
    /// HDMA only from here on.
    pub dasb: RW<u8>,
    pub a2al: RW<u8>,
    pub a2ah: RW<u8>,
    pub ntrl: RW<u8>,
    _unused: [RW<u8>; 5],
}

impl DmaChannel {
    /// Program a general-purpose transfer from `source` to B-bus `bbad`.
    #[inline(always)]
    fn setup(&mut self, control: DmaControl, bbad: u8, source: FarPtr, len: u16) {
        unsafe {
            self.dmap.write(control.bits());
            self.bbad.write(bbad);
            self.a1tl.write(source.addr as u8);
            self.a1th.write((source.addr >> 8) as u8);
            self.a1b.write(source.bank);
            self.dasl.write(len as u8);
            self.dash.write((len >> 8) as u8);
        }
    }
}

#[repr(C, packed)]
pub struct DmaRegs {
    pub channels: [DmaChannel; 8],
}

impl DmaRegs {
    #[inline(always)]
    pub unsafe fn new() -> &'static mut DmaRegs {
        unsafe { &mut *(0x4300 as *mut DmaRegs) }
    }
}

/// The real console.
///
/// INIDISP is write-only, so the last value written is kept here.
pub struct Snes {
    ppu: &'static mut Ppu,
    cpu: &'static mut CpuIo,
    dma: &'static mut DmaRegs,
    inidisp: Inidisp,
}

impl Snes {
    /// # Safety
    ///
    /// Only one `Snes` may exist, and nothing else may touch these registers
    /// while it does.
    pub unsafe fn new() -> Self {
        unsafe {
            Self {
                ppu: Ppu::new(),
                cpu: CpuIo::new(),
                dma: DmaRegs::new(),
                inidisp: Inidisp::FORCE_BLANK,
            }
        }
    }

    #[inline(always)]
    fn start_channel0(&mut self) {
        unsafe { self.cpu.mdmaen.write(0b0000_0001) };
    }
}

impl FlushDriver for Snes {
    fn flush_vram(&mut self, entries: &[UploadEntry]) {
        unsafe { self.ppu.vmain.write(VMAIN_INC_HIGH) };
        for entry in entries {
            for transfer in entry.transfers() {
                unsafe {
                    self.ppu.vmaddl.write(transfer.destination as u8);
                    self.ppu.vmaddh.write((transfer.destination >> 8) as u8);
                }
                self.dma.channels[0].setup(DmaControl::TWO_REGISTERS, BBUS_VMDATA, transfer.source, transfer.len);
                self.start_channel0();
            }
        }
    }

    fn commit_oam(&mut self, table: &OamTable) {
        let source = FarPtr::new(WRAM_BANK, table.as_bytes().as_ptr() as usize as u16);
        unsafe {
            self.ppu.oamaddl.write(0);
            self.ppu.oamaddh.write(0);
        }
        self.dma.channels[0].setup(DmaControl::empty(), BBUS_OAMDATA, source, OAM_TABLE_SIZE as u16);
        self.start_channel0();
    }
}

impl VideoPort for Snes {
    #[inline(always)]
    fn in_vblank(&self) -> bool {
        self.cpu.hvbjoy.read().get_bit(7)
    }

    #[inline(always)]
    fn spin(&mut self) {
        core::hint::spin_loop();
    }

    fn set_forced_blank(&mut self, blank: bool) {
        self.inidisp.set(Inidisp::FORCE_BLANK, blank);
        if !blank {
            self.inidisp.insert(Inidisp::BRIGHTNESS);
        }
        unsafe { self.ppu.inidisp.write(self.inidisp.bits()) };
    }

    fn set_obj_select(&mut self, value: u8) {
        unsafe { self.ppu.obsel.write(value) };
    }
}

#[cfg(test)]
mod tests {
    use core::mem::{offset_of, size_of};

    use super::*;

    #[test]
    fn register_offsets() {
        assert_eq!(offset_of!(Ppu, obsel), 0x01);
        assert_eq!(offset_of!(Ppu, oamdata), 0x04);
        assert_eq!(offset_of!(Ppu, vmain), 0x15);
        assert_eq!(offset_of!(Ppu, vmdatah), 0x19);

        assert_eq!(offset_of!(CpuIo, mdmaen), 0x0B);
        assert_eq!(offset_of!(CpuIo, hvbjoy), 0x12);

        assert_eq!(size_of::<DmaChannel>(), 0x10);
        assert_eq!(offset_of!(DmaChannel, dash), 0x06);
        assert_eq!(size_of::<DmaRegs>(), 0x80);
    }
}
