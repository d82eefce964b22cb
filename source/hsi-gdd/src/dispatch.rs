//! Completion dispatch.
//!
//! All GDD logical channels share a single interrupt line. The top half
//! ([`Gdd::handle_interrupt`]) only masks that line and schedules the bottom
//! half, which does the actual work of matching each completed logical
//! channel to the endpoint it was serving.
use core::{fmt, sync::atomic::Ordering};

use crate::{
    endpoint::{Direction, Endpoint, Owner},
    regs::{self, Csr, Registers},
    ChannelClient, Error, Gdd, Platform, PortEvent,
};

/// What one run of the bottom half did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BottomHalf {
    /// Transfers that completed and were handed to their client.
    pub served: usize,
    /// Transfers that timed out.
    pub errors: usize,
    /// Logical channels that raised an event without being bound to any
    /// endpoint.
    pub unresolved: usize,
    /// Whether more events arrived while the bottom half was running. If
    /// so, the bottom half has been scheduled again and the interrupt line
    /// is still masked.
    pub rescheduled: bool,
}

/// What the bottom half found on one logical channel, decided under the
/// lock and acted upon after it was released.
enum Completion {
    Done {
        endpoint: Endpoint,
        direction: Direction,
        client: Option<&'static dyn ChannelClient>,
        words: usize,
    },
    TimedOut {
        endpoint: Endpoint,
    },
    Unresolved,
    /// Someone else (a cancellation) already acknowledged the event.
    Stale,
}

impl<R, P> Gdd<R, P>
where
    R: Registers,
    P: Platform,
{
    /// The top half. Call this from the GDD interrupt handler.
    ///
    /// This masks the interrupt line and schedules the bottom half. It does
    /// not touch any endpoint state, and never blocks.
    pub fn handle_interrupt(&self) {
        self.platform.irq_disable_nosync(self.settings.irq);
        self.schedule_bottom_half();
    }

    /// Runs the bottom half once, regardless of whether it was scheduled.
    ///
    /// Every logical channel flagged in the interrupt status register is
    /// torn down and its client notified. Afterwards, if new events arrived
    /// in the meantime the bottom half is scheduled again; otherwise the
    /// interrupt line is unmasked.
    pub fn bottom_half(&self) -> BottomHalf {
        let mask = self.pool_mask();
        let status = self.lock().regs.read32(regs::SYS_GDD_MPU_IRQ_STATUS) & mask;
        tracing::trace!(status = ?format_args!("{status:#b}"), "GDD bottom half");

        let mut report = BottomHalf::default();
        for lch in 0..self.settings.channel_count {
            if status & regs::gdd_lch(lch) == 0 {
                continue;
            }

            match self.complete(lch) {
                Completion::Done {
                    endpoint,
                    direction,
                    client,
                    words,
                } => {
                    report.served += 1;
                    let Some(client) = client else {
                        tracing::warn!(%endpoint, %direction, words, "GDD transfer done, but nobody is listening");
                        continue;
                    };
                    match direction {
                        Direction::Write => client.write_done(words),
                        Direction::Read => client.read_done(words),
                    }
                }
                Completion::TimedOut { endpoint } => {
                    report.errors += 1;
                    self.platform.port_event(endpoint.port, PortEvent::Error);
                }
                Completion::Unresolved => report.unresolved += 1,
                Completion::Stale => {}
            }
        }

        let pending = {
            let inner = self.lock();
            inner.regs.read32(regs::SYS_GDD_MPU_IRQ_STATUS)
                & inner.regs.read32(regs::SYS_GDD_MPU_IRQ_ENABLE)
                & mask
        };
        if pending != 0 {
            tracing::trace!(pending = ?format_args!("{pending:#b}"), "more GDD events, rescheduling");
            report.rescheduled = true;
            self.schedule_bottom_half();
        } else {
            self.platform.irq_enable(self.settings.irq);
        }

        report
    }

    /// Runs the bottom half if the top half has scheduled it.
    pub fn poll_bottom_half(&self) -> Option<BottomHalf> {
        if self.bh_scheduled.swap(false, Ordering::AcqRel) {
            Some(self.bottom_half())
        } else {
            None
        }
    }

    /// Runs the bottom half every time the top half schedules it, until the
    /// controller is shut down.
    pub async fn run_bottom_half(&self) {
        loop {
            if let Some(report) = self.poll_bottom_half() {
                tracing::trace!(?report, "GDD bottom half done");
                continue;
            }

            if self.bh_wait.wait().await.is_err() {
                tracing::debug!("GDD shut down, bottom half exiting");
                return;
            }
        }
    }

    fn schedule_bottom_half(&self) {
        self.bh_scheduled.store(true, Ordering::Release);
        self.bh_wait.wake();
    }

    /// Tears down the transfer on `lch`, which the status register says is
    /// over.
    fn complete(&self, lch: u8) -> Completion {
        let bit = regs::gdd_lch(lch);
        let mut inner = self.lock();

        // A cancellation that won the race for the lock has acknowledged
        // the event already.
        if inner.regs.read32(regs::SYS_GDD_MPU_IRQ_STATUS) & bit == 0 {
            tracing::trace!(lch, "GDD event already acknowledged");
            return Completion::Stale;
        }

        inner.regs.and32(regs::SYS_GDD_MPU_IRQ_ENABLE, !bit);
        inner.regs.write32(regs::SYS_GDD_MPU_IRQ_STATUS, bit);

        let Some(Owner {
            endpoint,
            direction,
        }) = inner.resolve(lch)
        else {
            drop(inner);
            tracing::error!(
                error = %Error::UnresolvedChannel(lch),
                "dropping GDD event; expected if the transfer was cancelled after it finished",
            );
            return Completion::Unresolved;
        };
        tracing::trace!(lch, %endpoint, %direction, "GDD event");

        let csr = Csr::from_bits(inner.regs.read16(regs::gdd_csr(lch)));
        let timed_out = csr.get(Csr::TOUT);

        let sync = !timed_out && direction == Direction::Read;
        let words = inner.unmap(&self.platform, lch, direction, sync);
        inner.clear_bufstate(self.bufstate(endpoint, direction));
        inner.record_mut(endpoint, direction).reset();
        if direction == Direction::Read {
            self.platform
                .enable_read_interrupt(&mut inner.regs, endpoint);
        }
        let client = inner.channel(endpoint).client;
        drop(inner);

        if timed_out {
            tracing::error!(%endpoint, %direction, error = %Error::TransferError(lch), "GDD transfer timed out");
            Completion::TimedOut { endpoint }
        } else {
            tracing::debug!(%endpoint, %direction, lch, words, "GDD transfer done");
            Completion::Done {
                endpoint,
                direction,
                client,
                words,
            }
        }
    }
}

impl fmt::Display for BottomHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            served,
            errors,
            unresolved,
            rescheduled,
        } = self;
        write!(
            f,
            "{served} served, {errors} errors, {unresolved} unresolved"
        )?;
        if *rescheduled {
            f.write_str(" (rescheduled)")?;
        }
        Ok(())
    }
}
