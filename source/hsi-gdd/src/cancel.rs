//! Cancelling transfers in flight.
use crate::{
    endpoint::{Direction, Endpoint},
    regs::{self, Ccr, Registers},
    Error, Gdd, Platform,
};

/// How a cancellation went.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cancelled {
    /// No transfer was in flight; nothing was done.
    NotBound,
    /// A transfer was bound, but its logical channel had already stopped
    /// (usually because it completed and the bottom half has not run yet).
    /// The endpoint was released without touching the channel registers.
    AlreadyStopped,
    /// The transfer was stopped and its logical channel released.
    Stopped,
}

impl<R, P> Gdd<R, P>
where
    R: Registers,
    P: Platform,
{
    /// Cancels the write in flight on `endpoint`, if any.
    ///
    /// The endpoint's client is not notified. Once this returns, the buffer
    /// passed to [`Gdd::program_write`] is no longer in use.
    pub fn cancel_write(&self, endpoint: Endpoint) -> Result<Cancelled, Error> {
        self.check_endpoint(endpoint)?;
        Ok(self.cancel(endpoint, Direction::Write))
    }

    /// Cancels the read in flight on `endpoint`, if any, and switches the
    /// endpoint back to polling mode.
    ///
    /// The endpoint's client is not notified. Once this returns, the buffer
    /// passed to [`Gdd::program_read`] is no longer in use.
    pub fn cancel_read(&self, endpoint: Endpoint) -> Result<Cancelled, Error> {
        self.check_endpoint(endpoint)?;
        Ok(self.cancel(endpoint, Direction::Read))
    }

    pub(crate) fn cancel(&self, endpoint: Endpoint, dir: Direction) -> Cancelled {
        let mut inner = self.lock();
        let Some(lch) = inner.channel(endpoint).record(dir).lch else {
            return Cancelled::NotBound;
        };

        if dir == Direction::Read {
            self.platform
                .enable_read_interrupt(&mut inner.regs, endpoint);
        }

        let ccr = inner.regs.read16(regs::gdd_ccr(lch));
        let outcome = if Ccr::from_bits(ccr).get(Ccr::ENABLE) {
            let bit = regs::gdd_lch(lch);
            inner.regs.and16(regs::gdd_ccr(lch), !Ccr::enable_bit());
            inner.regs.and32(regs::SYS_GDD_MPU_IRQ_ENABLE, !bit);
            inner.regs.write32(regs::SYS_GDD_MPU_IRQ_STATUS, bit);
            inner.clear_bufstate(self.bufstate(endpoint, dir));
            Cancelled::Stopped
        } else {
            // Nothing to tell apart a transfer that already finished from one
            // that was never armed, so leave the hardware alone. If an event
            // is pending, the bottom half acknowledges it.
            tracing::debug!(
                %endpoint,
                %dir,
                lch,
                ccr = ?format_args!("{ccr:#06x}"),
                "cancel on a GDD channel that is not enabled",
            );
            Cancelled::AlreadyStopped
        };

        inner.unmap(&self.platform, lch, dir, false);
        inner.record_mut(endpoint, dir).reset();
        drop(inner);

        tracing::debug!(%endpoint, %dir, lch, ?outcome, "GDD transfer cancelled");
        outcome
    }
}
