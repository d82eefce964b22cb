//! GDD logical channel allocation.
//!
//! The GDD has no allocation state of its own: a logical channel is in use
//! exactly when its bit is set in the MPU interrupt enable register. The
//! allocator reads that register and hands out the next clear bit after the
//! last channel it returned, so that repeated transfers spread over the whole
//! pool rather than always reusing channel 0.
use crate::{
    regs::{self, Registers},
    Inner,
};

impl<R: Registers> Inner<R> {
    /// Returns a free GDD logical channel, or `None` if all `count` of them
    /// are busy.
    ///
    /// The channel is not reserved by this call; the caller must mark it
    /// busy (by binding a transfer record and setting its enable bit) before
    /// releasing the controller lock.
    pub(crate) fn allocate(&mut self, count: u8) -> Option<u8> {
        debug_assert!(count.is_power_of_two(), "GDD channel count must be a power of two");
        let enabled = self.regs.read32(regs::SYS_GDD_MPU_IRQ_ENABLE);
        let mask = count - 1;
        let lch = (1..=count)
            .map(|i| self.last_lch.wrapping_add(i) & mask)
            .find(|&lch| enabled & regs::gdd_lch(lch) == 0)?;
        self.last_lch = lch;
        Some(lch)
    }
}
