//! The HSI register file, as seen by the GDD transport.
//!
//! Access to the register file goes through the [`Registers`] trait, so that
//! the same driver code can run against real memory-mapped hardware
//! ([`Mmio`]) or against a simulated register bank in tests.
//!
//! The descriptor registers of each GDD logical channel are 16 bits wide;
//! their layouts are in the [`fields`] module and re-exported here.
use core::ptr::{self, NonNull};

pub mod fields;

pub use self::fields::*;

/// Raw access to the HSI register file.
///
/// Individual accesses are assumed to be atomic at the bus level, but
/// read-modify-write sequences are not. The [`Gdd`](crate::Gdd) only ever
/// touches its registers while holding the controller lock, which is why
/// writes take `&mut self`.
pub trait Registers {
    /// Reads the byte register at `offset`.
    fn read8(&self, offset: usize) -> u8;
    /// Reads the 16-bit register at `offset`.
    fn read16(&self, offset: usize) -> u16;
    /// Reads the 32-bit register at `offset`.
    fn read32(&self, offset: usize) -> u32;

    /// Writes `val` to the byte register at `offset`.
    fn write8(&mut self, offset: usize, val: u8);
    /// Writes `val` to the 16-bit register at `offset`.
    fn write16(&mut self, offset: usize, val: u16);
    /// Writes `val` to the 32-bit register at `offset`.
    fn write32(&mut self, offset: usize, val: u32);

    /// Sets `bits` in the byte register at `offset`.
    #[inline]
    fn or8(&mut self, offset: usize, bits: u8) {
        let val = self.read8(offset);
        self.write8(offset, val | bits);
    }

    /// Keeps only the bits of `mask` in the byte register at `offset`.
    #[inline]
    fn and8(&mut self, offset: usize, mask: u8) {
        let val = self.read8(offset);
        self.write8(offset, val & mask);
    }

    /// Sets `bits` in the 16-bit register at `offset`.
    #[inline]
    fn or16(&mut self, offset: usize, bits: u16) {
        let val = self.read16(offset);
        self.write16(offset, val | bits);
    }

    /// Keeps only the bits of `mask` in the 16-bit register at `offset`.
    #[inline]
    fn and16(&mut self, offset: usize, mask: u16) {
        let val = self.read16(offset);
        self.write16(offset, val & mask);
    }

    /// Sets `bits` in the 32-bit register at `offset`.
    #[inline]
    fn or32(&mut self, offset: usize, bits: u32) {
        let val = self.read32(offset);
        self.write32(offset, val | bits);
    }

    /// Keeps only the bits of `mask` in the 32-bit register at `offset`.
    #[inline]
    fn and32(&mut self, offset: usize, mask: u32) {
        let val = self.read32(offset);
        self.write32(offset, val & mask);
    }
}

/// A [`Registers`] implementation performing volatile accesses relative to
/// the base address of the HSI register block.
#[derive(Debug)]
pub struct Mmio {
    base: NonNull<u8>,
}

// The register block is only ever accessed through the controller lock.
unsafe impl Send for Mmio {}

impl Mmio {
    /// Returns accessors for the register block mapped at `base`.
    ///
    /// # Safety
    ///
    /// - `base` must point to the mapped HSI register block, and the block
    ///   must stay mapped for as long as this `Mmio` exists.
    /// - No other code may write to the GDD registers of this block
    ///   concurrently.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    #[inline]
    fn ptr<T>(&self, offset: usize) -> *mut T {
        // SAFETY: offsets are taken from the register map in this module,
        // which lies within the block `base` points to.
        unsafe { self.base.as_ptr().add(offset).cast() }
    }
}

impl Registers for Mmio {
    fn read8(&self, offset: usize) -> u8 {
        unsafe { ptr::read_volatile(self.ptr(offset)) }
    }

    fn read16(&self, offset: usize) -> u16 {
        unsafe { ptr::read_volatile(self.ptr(offset)) }
    }

    fn read32(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.ptr(offset)) }
    }

    fn write8(&mut self, offset: usize, val: u8) {
        unsafe { ptr::write_volatile(self.ptr(offset), val) }
    }

    fn write16(&mut self, offset: usize, val: u16) {
        unsafe { ptr::write_volatile(self.ptr(offset), val) }
    }

    fn write32(&mut self, offset: usize, val: u32) {
        unsafe { ptr::write_volatile(self.ptr(offset), val) }
    }
}

// === register map ===

/// The GDD MPU interrupt status register. One bit per logical channel,
/// write 1 to clear.
pub const SYS_GDD_MPU_IRQ_STATUS: usize = 0x0818;

/// The GDD MPU interrupt enable register. One bit per logical channel. A set
/// bit also marks the logical channel as in use.
pub const SYS_GDD_MPU_IRQ_ENABLE: usize = 0x081c;

const GDD_BASE: usize = 0x0c00;
const GDD_LCH_STRIDE: usize = 0x40;

const HST_BASE: usize = 0x2000;
const HSR_BASE: usize = 0x3000;
const PORT_STRIDE: usize = 0x2000;
const BUFSTATE: usize = 0x0c;

#[inline]
const fn lch_reg(lch: u8, reg: usize) -> usize {
    GDD_BASE + (lch as usize * GDD_LCH_STRIDE) + reg
}

/// Channel source/destination parameters.
#[inline]
#[must_use]
pub const fn gdd_csdp(lch: u8) -> usize {
    lch_reg(lch, 0x00)
}

/// Channel control.
#[inline]
#[must_use]
pub const fn gdd_ccr(lch: u8) -> usize {
    lch_reg(lch, 0x02)
}

/// Channel interrupt control.
#[inline]
#[must_use]
pub const fn gdd_cicr(lch: u8) -> usize {
    lch_reg(lch, 0x04)
}

/// Channel status.
#[inline]
#[must_use]
pub const fn gdd_csr(lch: u8) -> usize {
    lch_reg(lch, 0x06)
}

/// Channel source start address.
#[inline]
#[must_use]
pub const fn gdd_cssa(lch: u8) -> usize {
    lch_reg(lch, 0x08)
}

/// Channel destination start address.
#[inline]
#[must_use]
pub const fn gdd_cdsa(lch: u8) -> usize {
    lch_reg(lch, 0x0c)
}

/// Channel element number, in 32-bit words.
#[inline]
#[must_use]
pub const fn gdd_cen(lch: u8) -> usize {
    lch_reg(lch, 0x10)
}

/// Transmitter buffer state for a 1-based `port`.
#[inline]
#[must_use]
pub const fn hst_bufstate(port: u8) -> usize {
    HST_BASE + (port as usize - 1) * PORT_STRIDE + BUFSTATE
}

/// Receiver buffer state for a 1-based `port`.
#[inline]
#[must_use]
pub const fn hsr_bufstate(port: u8) -> usize {
    HSR_BASE + (port as usize - 1) * PORT_STRIDE + BUFSTATE
}

/// The bit for `lch` in the status and enable bitmaps.
#[inline]
#[must_use]
pub const fn gdd_lch(lch: u8) -> u32 {
    1 << lch
}

/// The bit for an HSI `channel` in a buffer state register.
#[inline]
#[must_use]
pub const fn bufstate_channel(channel: u8) -> u32 {
    1 << channel
}
