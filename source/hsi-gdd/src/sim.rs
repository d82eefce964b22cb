//! A simulated HSI controller, for running the GDD transport off-target.
//!
//! [`SimRegisters`] is a register bank that behaves like the bits of the HSI
//! block the transport relies on: the interrupt status register is
//! write-one-to-clear, and the test can play the part of the GDD engine by
//! finishing ([`SimRegisters::complete`]) or timing out
//! ([`SimRegisters::time_out`]) a logical channel. [`SimPlatform`] hands out
//! fake bus addresses and records everything else the transport asks of the
//! platform.
use std::{
    collections::{BTreeMap, BTreeSet},
    ptr::NonNull,
    sync::Arc,
};

use maitake_sync::spin::Mutex;

use crate::{
    endpoint::{Direction, Endpoint},
    platform::{DmaAddr, IrqUnavailable},
    regs::{self, Ccr, Csr, Registers},
    ChannelClient, Platform, PortEvent,
};

/// A shared handle to a simulated register bank.
///
/// Clones refer to the same bank, so a test can keep one handle while the
/// [`Gdd`](crate::Gdd) owns another.
#[derive(Clone)]
pub struct SimRegisters {
    bank: Arc<Mutex<Bank>>,
}

#[derive(Default)]
struct Bank {
    regs: BTreeMap<usize, u32>,
    writes: usize,
}

/// A [`Platform`] that records what the transport does with it.
pub struct SimPlatform {
    state: Mutex<PlatformState>,
}

#[derive(Default)]
struct PlatformState {
    next_addr: DmaAddr,
    mappings: BTreeMap<DmaAddr, Mapping>,
    bad_unmaps: usize,
    syncs: Vec<(DmaAddr, usize)>,
    refuse_irq: bool,
    irq_requested: Option<u32>,
    irq_masked: bool,
    irq_enables: usize,
    dma_reads: BTreeSet<Endpoint>,
    port_events: Vec<(u8, PortEvent)>,
}

/// A live DMA mapping made through [`SimPlatform`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Mapping {
    /// The address of the mapped buffer.
    pub buf: usize,
    /// The length of the mapping in bytes.
    pub len: usize,
    /// The direction it was mapped for.
    pub dir: Direction,
}

/// A [`ChannelClient`] that records every notification it gets.
pub struct SimClient {
    done: Mutex<Vec<(Direction, usize)>>,
}

// === impl SimRegisters ===

impl SimRegisters {
    /// Returns a bank with every register reading as zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bank: Arc::new(Mutex::new(Bank::default())),
        }
    }

    /// The number of writes made through the [`Registers`] interface.
    /// Hardware-side changes made by the simulation itself do not count.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.bank.lock().writes
    }

    /// Finishes the transfer on `lch` the way the GDD does: the channel
    /// disables itself and raises its status bit.
    pub fn complete(&self, lch: u8) {
        self.finish(lch, Csr::new().with(Csr::BLOCK, true));
    }

    /// Times out the transfer on `lch`.
    pub fn time_out(&self, lch: u8) {
        self.finish(lch, Csr::new().with(Csr::TOUT, true));
    }

    /// Raises the status bit for `lch` without changing anything else.
    pub fn raise_status(&self, lch: u8) {
        let mut bank = self.bank.lock();
        *bank.reg(regs::SYS_GDD_MPU_IRQ_STATUS) |= regs::gdd_lch(lch);
    }

    fn finish(&self, lch: u8, csr: Csr) {
        let mut bank = self.bank.lock();
        *bank.reg(regs::gdd_ccr(lch)) &= !(Ccr::enable_bit() as u32);
        *bank.reg(regs::gdd_csr(lch)) = csr.bits() as u32;
        *bank.reg(regs::SYS_GDD_MPU_IRQ_STATUS) |= regs::gdd_lch(lch);
    }

    fn store(&mut self, offset: usize, val: u32) {
        let mut bank = self.bank.lock();
        bank.writes += 1;
        if offset == regs::SYS_GDD_MPU_IRQ_STATUS {
            *bank.reg(offset) &= !val;
        } else {
            *bank.reg(offset) = val;
        }
    }
}

impl Default for SimRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers for SimRegisters {
    fn read8(&self, offset: usize) -> u8 {
        self.read32(offset) as u8
    }

    fn read16(&self, offset: usize) -> u16 {
        self.read32(offset) as u16
    }

    fn read32(&self, offset: usize) -> u32 {
        self.bank.lock().regs.get(&offset).copied().unwrap_or(0)
    }

    fn write8(&mut self, offset: usize, val: u8) {
        self.store(offset, val as u32)
    }

    fn write16(&mut self, offset: usize, val: u16) {
        self.store(offset, val as u32)
    }

    fn write32(&mut self, offset: usize, val: u32) {
        self.store(offset, val)
    }
}

impl Bank {
    fn reg(&mut self, offset: usize) -> &mut u32 {
        self.regs.entry(offset).or_default()
    }
}

// === impl SimPlatform ===

impl SimPlatform {
    /// Bus addresses are handed out from here, so they are easy to tell
    /// apart from HSI channel numbers in the descriptor registers.
    pub const DMA_BASE: DmaAddr = 0x8000_0000;

    /// Returns a platform with no mappings and no interrupt line claimed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
        }
    }

    /// Makes [`Platform::irq_request`] fail.
    #[must_use]
    pub fn refusing_irq(self) -> Self {
        self.state.lock().refuse_irq = true;
        self
    }

    /// Mappings that have not been released yet.
    #[must_use]
    pub fn live_mappings(&self) -> Vec<Mapping> {
        self.state.lock().mappings.values().copied().collect()
    }

    /// Unmaps of an address that was not mapped.
    #[must_use]
    pub fn bad_unmaps(&self) -> usize {
        self.state.lock().bad_unmaps
    }

    /// Every `sync_single_for_cpu` call, as `(addr, len)`.
    #[must_use]
    pub fn syncs(&self) -> Vec<(DmaAddr, usize)> {
        self.state.lock().syncs.clone()
    }

    /// The line claimed through [`Platform::irq_request`] and not freed
    /// since.
    #[must_use]
    pub fn irq_requested(&self) -> Option<u32> {
        self.state.lock().irq_requested
    }

    /// Whether the line is currently masked.
    #[must_use]
    pub fn irq_masked(&self) -> bool {
        self.state.lock().irq_masked
    }

    /// How many times the line was unmasked.
    #[must_use]
    pub fn irq_enables(&self) -> usize {
        self.state.lock().irq_enables
    }

    /// Whether `endpoint` has been switched out of polling mode for a DMA
    /// read.
    #[must_use]
    pub fn dma_read_armed(&self, endpoint: Endpoint) -> bool {
        self.state.lock().dma_reads.contains(&endpoint)
    }

    /// Every [`Platform::port_event`] call, as `(port, event)`.
    #[must_use]
    pub fn port_events(&self) -> Vec<(u8, PortEvent)> {
        self.state.lock().port_events.clone()
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SimPlatform {
    fn map_single(&self, buf: NonNull<u32>, len: usize, dir: Direction) -> DmaAddr {
        let mut state = self.state.lock();
        let addr = Self::DMA_BASE + state.next_addr;
        // keep mappings apart even if `len` is not a multiple of a page
        state.next_addr += ((len as DmaAddr + 0xfff) & !0xfff).max(0x1000);
        state.mappings.insert(
            addr,
            Mapping {
                buf: buf.as_ptr() as usize,
                len,
                dir,
            },
        );
        addr
    }

    fn unmap_single(&self, addr: DmaAddr, len: usize, dir: Direction) {
        let mut state = self.state.lock();
        match state.mappings.remove(&addr) {
            Some(mapping) if mapping.len == len && mapping.dir == dir => {}
            Some(mapping) => {
                tracing::warn!(addr, len, %dir, ?mapping, "unmap does not match mapping");
                state.bad_unmaps += 1;
            }
            None => {
                tracing::warn!(addr, len, %dir, "unmap of unmapped address");
                state.bad_unmaps += 1;
            }
        }
    }

    fn sync_single_for_cpu(&self, addr: DmaAddr, len: usize, _dir: Direction) {
        self.state.lock().syncs.push((addr, len));
    }

    fn irq_request(&self, irq: u32) -> Result<(), IrqUnavailable> {
        let mut state = self.state.lock();
        if state.refuse_irq {
            return Err(IrqUnavailable);
        }
        state.irq_requested = Some(irq);
        Ok(())
    }

    fn irq_free(&self, _irq: u32) {
        self.state.lock().irq_requested = None;
    }

    fn irq_enable(&self, _irq: u32) {
        let mut state = self.state.lock();
        state.irq_masked = false;
        state.irq_enables += 1;
    }

    fn irq_disable_nosync(&self, _irq: u32) {
        self.state.lock().irq_masked = true;
    }

    fn disable_read_interrupt(&self, _regs: &mut dyn Registers, endpoint: Endpoint) {
        self.state.lock().dma_reads.insert(endpoint);
    }

    fn enable_read_interrupt(&self, _regs: &mut dyn Registers, endpoint: Endpoint) {
        self.state.lock().dma_reads.remove(&endpoint);
    }

    fn port_event(&self, port: u8, event: PortEvent) {
        self.state.lock().port_events.push((port, event));
    }
}

// === impl SimClient ===

impl SimClient {
    /// Returns a new client that lives forever, as clients must.
    #[must_use]
    pub fn leak() -> &'static Self {
        Box::leak(Box::new(Self {
            done: Mutex::new(Vec::new()),
        }))
    }

    /// Every notification so far, in order.
    #[must_use]
    pub fn done(&self) -> Vec<(Direction, usize)> {
        self.done.lock().clone()
    }
}

impl ChannelClient for SimClient {
    fn write_done(&self, words: usize) {
        self.done.lock().push((Direction::Write, words));
    }

    fn read_done(&self, words: usize) {
        self.done.lock().push((Direction::Read, words));
    }
}
