//! Programming GDD transfers.
use core::ptr::NonNull;

use crate::{
    endpoint::{Direction, Endpoint, MAX_PORTS, PORT_MAX_CH},
    regs::{self, Access, AddrMode, Ccr, Cicr, Csdp, DataType, PortKind, Registers},
    Error, Gdd, Platform,
};

/// Synchronization codes, indexed by direction, port and channel. These
/// select the HSI DMA request line the GDD channel follows.
static SYNC_TABLE: [[[u8; PORT_MAX_CH]; MAX_PORTS]; 2] = [
    // write
    [
        [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
        [0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x00],
    ],
    // read
    [
        [0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17],
        [0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f],
    ],
];

#[inline]
pub(crate) fn sync_code(dir: Direction, endpoint: Endpoint) -> u8 {
    SYNC_TABLE[dir.idx()][endpoint.port as usize - 1][endpoint.channel as usize]
}

impl<R, P> Gdd<R, P>
where
    R: Registers,
    P: Platform,
{
    /// Starts a DMA transfer of `words` 32-bit words from `data` to the HSI
    /// transmitter of `endpoint`.
    ///
    /// The endpoint's [`ChannelClient::write_done`](crate::ChannelClient::write_done)
    /// is called once the transfer completes.
    ///
    /// # Returns
    ///
    /// - [`Ok`]`(())` once the transfer is armed.
    /// - [`Err`]`(`[`Error::NoFreeChannel`]`)` if every GDD logical channel
    ///   is busy. Nothing was changed, and the request may be retried later.
    /// - [`Err`]`(`[`Error::EndpointBusy`]`)` if a write is already in flight
    ///   on `endpoint`.
    /// - [`Err`]`(`[`Error::InvalidArgument`]`)` if `data` is null, `words`
    ///   is zero or too large, or `endpoint` does not exist.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads of `words` words, and must not be
    /// written to until the transfer has completed or been cancelled.
    pub unsafe fn program_write(
        &self,
        endpoint: Endpoint,
        data: *const u32,
        words: usize,
    ) -> Result<(), Error> {
        self.program(endpoint, Direction::Write, data.cast_mut(), words)
    }

    /// Starts a DMA transfer of `words` 32-bit words from the HSI receiver of
    /// `endpoint` into `data`.
    ///
    /// The endpoint is switched out of polling mode for the duration of the
    /// transfer. Its [`ChannelClient::read_done`](crate::ChannelClient::read_done)
    /// is called once the transfer completes.
    ///
    /// Returns the same errors as [`Gdd::program_write`].
    ///
    /// # Safety
    ///
    /// `data` must be valid for writes of `words` words, and must not be
    /// accessed until the transfer has completed or been cancelled.
    pub unsafe fn program_read(
        &self,
        endpoint: Endpoint,
        data: *mut u32,
        words: usize,
    ) -> Result<(), Error> {
        self.program(endpoint, Direction::Read, data, words)
    }

    unsafe fn program(
        &self,
        endpoint: Endpoint,
        dir: Direction,
        data: *mut u32,
        words: usize,
    ) -> Result<(), Error> {
        self.check_endpoint(endpoint)?;
        let data = NonNull::new(data).ok_or(Error::InvalidArgument)?;
        // CEN is a 16-bit element counter.
        if words == 0 || words > u16::MAX as usize {
            tracing::warn!(%endpoint, %dir, words, "bad GDD transfer size");
            return Err(Error::InvalidArgument);
        }

        let mut inner = self.lock();
        if inner.channel(endpoint).record(dir).is_bound() {
            return Err(Error::EndpointBusy);
        }

        let Some(lch) = inner.allocate(self.settings.channel_count) else {
            tracing::error!(%endpoint, %dir, "No free GDD logical channels.");
            return Err(Error::NoFreeChannel);
        };

        if dir == Direction::Read {
            // otherwise the first received word raises a data-available
            // event on the polling path
            self.platform
                .disable_read_interrupt(&mut inner.regs, endpoint);
        }

        // binding the record before the lock is released is what reserves
        // the logical channel
        inner.record_mut(endpoint, dir).lch = Some(lch);

        let sync = sync_code(dir, endpoint);
        let dma = self.platform.map_single(data, words * 4, dir);

        let (csdp, ccr, src, dst) = match dir {
            Direction::Write => (
                Csdp::new()
                    .with(Csdp::SRC_ACCESS, Access::Single0)
                    .with(Csdp::SRC_PORT, PortKind::Memory)
                    .with(Csdp::DST_ACCESS, Access::Single0)
                    .with(Csdp::DST_PORT, PortKind::Peripheral),
                Ccr::new()
                    .with(Ccr::SRC_AMODE, AddrMode::PostIncrement)
                    .with(Ccr::DST_AMODE, AddrMode::Constant),
                dma,
                endpoint.channel as u32,
            ),
            Direction::Read => (
                Csdp::new()
                    .with(Csdp::DST_ACCESS, Access::Single0)
                    .with(Csdp::DST_PORT, PortKind::Memory)
                    .with(Csdp::SRC_ACCESS, Access::Single0)
                    .with(Csdp::SRC_PORT, PortKind::Peripheral),
                Ccr::new()
                    .with(Ccr::DST_AMODE, AddrMode::PostIncrement)
                    .with(Ccr::SRC_AMODE, AddrMode::Constant),
                endpoint.channel as u32,
                dma,
            ),
        };
        let csdp = csdp.with(Csdp::DATA_TYPE, DataType::S32);
        let ccr = ccr.with(Ccr::SYNC, sync as u16);
        let cicr = Cicr::new()
            .with(Cicr::BLOCK_IE, true)
            .with(Cicr::TOUT_IE, true);

        let hw = &mut inner.regs;
        hw.write16(regs::gdd_csdp(lch), csdp.bits());
        hw.write16(regs::gdd_ccr(lch), ccr.bits());
        hw.write16(regs::gdd_cicr(lch), cicr.bits());
        hw.write32(regs::gdd_cssa(lch), src);
        hw.write32(regs::gdd_cdsa(lch), dst);
        hw.write16(regs::gdd_cen(lch), words as u16);

        hw.or32(regs::SYS_GDD_MPU_IRQ_ENABLE, regs::gdd_lch(lch));
        hw.or16(regs::gdd_ccr(lch), Ccr::enable_bit());

        tracing::debug!(%endpoint, %dir, lch, words, sync, "GDD transfer armed");
        Ok(())
    }
}
