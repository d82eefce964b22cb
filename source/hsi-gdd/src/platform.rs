//! The services the GDD transport needs from the rest of the system.
use core::{fmt, ptr::NonNull};

use crate::{
    endpoint::{Direction, Endpoint},
    regs::Registers,
};

/// A bus address handed out by [`Platform::map_single`].
pub type DmaAddr = u32;

/// Events raised towards the owner of an HSI port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortEvent {
    /// A GDD transfer on one of the port's channels timed out.
    Error,
}

/// Returned by [`Platform::irq_request`] when the interrupt line could not
/// be claimed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IrqUnavailable;

/// Receives completion notifications for one HSI channel.
///
/// Notifications are delivered from the bottom half, after the controller
/// lock has been released, so implementations may start a new transfer on
/// the same [`Gdd`](crate::Gdd) from inside the callback.
pub trait ChannelClient: Sync {
    /// A write of `words` 32-bit words has been handed to the transmitter.
    fn write_done(&self, words: usize);

    /// A read of `words` 32-bit words has landed in memory.
    fn read_done(&self, words: usize);
}

/// Platform services used by the [`Gdd`](crate::Gdd).
///
/// This covers the DMA mapping API, the shared GDD interrupt line, and the
/// hooks into the port-level driver that owns the non-DMA (polling) side of
/// the HSI block.
pub trait Platform {
    /// Makes `len` bytes at `buf` visible to the device, returning the bus
    /// address the GDD should be programmed with.
    fn map_single(&self, buf: NonNull<u32>, len: usize, dir: Direction) -> DmaAddr;

    /// Releases a mapping made by [`map_single`](Self::map_single).
    fn unmap_single(&self, addr: DmaAddr, len: usize, dir: Direction);

    /// Makes data the device wrote into a mapping visible to the CPU.
    fn sync_single_for_cpu(&self, addr: DmaAddr, len: usize, dir: Direction);

    /// Claims `irq` for the GDD. The line should start out unmasked.
    fn irq_request(&self, irq: u32) -> Result<(), IrqUnavailable>;

    /// Gives `irq` back. Called at shutdown.
    fn irq_free(&self, irq: u32);

    /// Unmasks `irq` after the bottom half has drained every event.
    fn irq_enable(&self, irq: u32);

    /// Masks `irq` without waiting for running handlers. Called from the
    /// top half, so this must not block.
    fn irq_disable_nosync(&self, irq: u32);

    /// Switches a receiving endpoint out of polling mode before a DMA read
    /// is armed on it.
    ///
    /// Called with the controller lock held; `regs` is the locked register
    /// file.
    fn disable_read_interrupt(&self, regs: &mut dyn Registers, endpoint: Endpoint);

    /// Switches a receiving endpoint back to polling mode once a DMA read on
    /// it is over.
    ///
    /// Called with the controller lock held; `regs` is the locked register
    /// file.
    fn enable_read_interrupt(&self, regs: &mut dyn Registers, endpoint: Endpoint);

    /// Tells the owner of `port` about `event`. Called from the bottom half
    /// with the controller lock released.
    fn port_event(&self, port: u8, event: PortEvent);
}

impl fmt::Display for IrqUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupt line unavailable")
    }
}
