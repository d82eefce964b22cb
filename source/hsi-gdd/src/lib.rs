//! # HSI GDD transport
//!
//! The HSI block moves data to and from memory using a small general purpose
//! DMA engine, the GDD, which has a fixed pool of logical channels (usually
//! 8). There are many more HSI endpoints than logical channels (up to two
//! ports of eight channels, each with a read and a write direction), so a
//! logical channel is claimed when a transfer is programmed and given back
//! when the transfer completes or is cancelled.
//!
//! All logical channels share one interrupt line. The [`Gdd`] handles it in
//! two steps:
//!
//! * The *top half*, [`Gdd::handle_interrupt`], runs in interrupt context. It
//!   masks the line and schedules the bottom half, and does nothing else.
//! * The *bottom half* ([`Gdd::run_bottom_half`], or [`Gdd::bottom_half`] when
//!   driven by hand) reads the status bitmap, works out which endpoint each
//!   completed logical channel belonged to, tears the channel down and calls
//!   the endpoint's [`ChannelClient`]. When no more events are pending, it
//!   unmasks the line again.
//!
//! Register access, transfer bookkeeping and channel allocation all happen
//! under a single spinlock. Client callbacks are always invoked after that
//! lock is released, so a client may program its next transfer from inside
//! its completion callback.
//!
//! ## Programming a transfer
//!
//! ```rust,ignore
//! let gdd = Gdd::new(regs, platform, GddSettings::default())?;
//! gdd.init()?;
//! gdd.open(Endpoint::new(1, 0), &MY_CLIENT)?;
//!
//! // SAFETY: `BUF` is not touched until `MY_CLIENT.write_done` is called or
//! // the transfer is cancelled.
//! unsafe { gdd.program_write(Endpoint::new(1, 0), BUF.as_ptr(), BUF.len())? };
//! ```
#![cfg_attr(not(any(test, feature = "sim")), no_std)]
#![warn(missing_docs)]

mod cancel;
mod dispatch;
pub mod endpoint;
mod error;
mod lch;
pub mod platform;
mod program;
pub mod regs;
mod settings;

#[cfg(any(test, feature = "sim"))]
pub mod sim;
#[cfg(test)]
mod test_util;

use core::fmt;

use maitake_sync::{
    spin::{Mutex, MutexGuard},
    WaitCell,
};
use portable_atomic::AtomicBool;

pub use self::{
    cancel::Cancelled,
    dispatch::BottomHalf,
    endpoint::{Direction, Endpoint, Owner},
    error::Error,
    platform::{ChannelClient, Platform, PortEvent},
    regs::Registers,
    settings::GddSettings,
};
use self::{
    endpoint::{Channel, Port, TransferRecord, MAX_PORTS},
    platform::DmaAddr,
};

/// The GDD transport for one HSI controller.
pub struct Gdd<R, P> {
    inner: Mutex<Inner<R>>,
    platform: P,
    settings: GddSettings,
    /// Set by the top half, consumed by the bottom half.
    bh_scheduled: AtomicBool,
    /// Woken when the bottom half is scheduled, closed on shutdown.
    bh_wait: WaitCell,
}

/// State guarded by the controller lock.
struct Inner<R> {
    regs: R,
    /// The logical channel handed out most recently.
    last_lch: u8,
    ports: [Port; MAX_PORTS],
}

// === impl Gdd ===

impl<R, P> Gdd<R, P>
where
    R: Registers,
    P: Platform,
{
    /// Returns a new `Gdd` driving the HSI controller behind `regs`.
    ///
    /// The interrupt line is not requested until [`Gdd::init`] is called.
    pub fn new(regs: R, platform: P, settings: GddSettings) -> Result<Self, Error> {
        settings.validate()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                regs,
                last_lch: 0,
                ports: core::array::from_fn(|_| Port::new()),
            }),
            platform,
            settings,
            bh_scheduled: AtomicBool::new(false),
            bh_wait: WaitCell::new(),
        })
    }

    /// Requests the shared GDD interrupt line.
    ///
    /// Any status left over from before the driver was loaded is acknowledged
    /// first, so that the first interrupt only reports transfers this `Gdd`
    /// programmed.
    #[tracing::instrument(
        name = "Gdd::init",
        level = tracing::Level::INFO,
        skip(self),
        fields(irq = self.settings.irq),
        err(Display),
    )]
    pub fn init(&self) -> Result<(), Error> {
        {
            let mut inner = self.lock();
            let stale = inner.regs.read32(regs::SYS_GDD_MPU_IRQ_STATUS) & self.pool_mask();
            if stale != 0 {
                tracing::debug!(stale = ?format_args!("{stale:#b}"), "acknowledging stale GDD status");
                inner.regs.write32(regs::SYS_GDD_MPU_IRQ_STATUS, stale);
            }
        }

        self.platform
            .irq_request(self.settings.irq)
            .map_err(|_| Error::IrqRequest(self.settings.irq))?;
        tracing::info!(channels = self.settings.channel_count, "GDD ready");
        Ok(())
    }

    /// Stops the bottom half, cancels every transfer still in flight and
    /// releases the interrupt line.
    ///
    /// Cancelled transfers do not get a completion callback.
    pub fn shutdown(&self) {
        self.bh_wait.close();

        let mut cancelled = 0;
        for endpoint in self.endpoints() {
            for dir in [Direction::Write, Direction::Read] {
                if self.cancel(endpoint, dir) != Cancelled::NotBound {
                    cancelled += 1;
                }
            }
        }

        self.platform.irq_free(self.settings.irq);
        tracing::info!(cancelled, "GDD shut down");
    }

    /// Registers the client notified when transfers on `endpoint` complete.
    pub fn open(&self, endpoint: Endpoint, client: &'static dyn ChannelClient) -> Result<(), Error> {
        self.check_endpoint(endpoint)?;
        let mut inner = self.lock();
        inner.channel_mut(endpoint).client = Some(client);
        tracing::debug!(%endpoint, "HSI channel opened");
        Ok(())
    }

    /// Cancels any transfers in flight on `endpoint` and forgets its client.
    pub fn close(&self, endpoint: Endpoint) -> Result<(), Error> {
        self.check_endpoint(endpoint)?;
        self.cancel_write(endpoint)?;
        self.cancel_read(endpoint)?;
        self.lock().channel_mut(endpoint).client = None;
        tracing::debug!(%endpoint, "HSI channel closed");
        Ok(())
    }

    /// Returns the endpoint direction GDD logical channel `lch` is bound to,
    /// if any.
    #[must_use]
    pub fn resolve_channel_owner(&self, lch: u8) -> Option<Owner> {
        self.lock().resolve(lch)
    }

    /// The settings this controller was created with.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &GddSettings {
        &self.settings
    }

    /// The platform services this controller runs on.
    #[inline]
    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// All endpoints within the configured geometry.
    fn endpoints(&self) -> impl Iterator<Item = Endpoint> {
        let GddSettings {
            ports,
            channels_per_port,
            ..
        } = self.settings;
        (1..=ports).flat_map(move |port| (0..channels_per_port).map(move |ch| Endpoint::new(port, ch)))
    }

    fn check_endpoint(&self, endpoint: Endpoint) -> Result<(), Error> {
        let Endpoint { port, channel } = endpoint;
        if port == 0 || port > self.settings.ports || channel >= self.settings.channels_per_port {
            tracing::warn!(%endpoint, "no such HSI endpoint");
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    /// One bit for each logical channel in the pool.
    #[inline]
    fn pool_mask(&self) -> u32 {
        u32::MAX >> (u32::BITS - self.settings.channel_count as u32)
    }

    /// The shadow buffer-state register and bit for `endpoint`, if it has
    /// one.
    fn bufstate(&self, endpoint: Endpoint, dir: Direction) -> Option<(usize, u32)> {
        if endpoint.channel >= self.settings.bufstate_channels {
            return None;
        }
        let reg = match dir {
            Direction::Write => regs::hst_bufstate(endpoint.port),
            Direction::Read => regs::hsr_bufstate(endpoint.port),
        };
        Some((reg, regs::bufstate_channel(endpoint.channel)))
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Inner<R>> {
        self.inner.lock()
    }
}

impl<R, P> fmt::Debug for Gdd<R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gdd")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// === impl Inner ===

impl<R: Registers> Inner<R> {
    /// Finds the endpoint direction bound to `lch` by scanning every
    /// transfer record.
    fn resolve(&self, lch: u8) -> Option<Owner> {
        for (port_idx, port) in self.ports.iter().enumerate() {
            for (ch_idx, channel) in port.channels.iter().enumerate() {
                let endpoint = Endpoint::new(port_idx as u8 + 1, ch_idx as u8);
                for direction in [Direction::Read, Direction::Write] {
                    if channel.record(direction).lch == Some(lch) {
                        return Some(Owner {
                            endpoint,
                            direction,
                        });
                    }
                }
            }
        }
        None
    }

    #[inline]
    fn channel(&self, endpoint: Endpoint) -> &Channel {
        &self.ports[endpoint.port as usize - 1].channels[endpoint.channel as usize]
    }

    #[inline]
    fn channel_mut(&mut self, endpoint: Endpoint) -> &mut Channel {
        &mut self.ports[endpoint.port as usize - 1].channels[endpoint.channel as usize]
    }

    #[inline]
    fn record_mut(&mut self, endpoint: Endpoint, dir: Direction) -> &mut TransferRecord {
        self.channel_mut(endpoint).record_mut(dir)
    }

    /// Reads back the memory side of the transfer programmed on `lch` and
    /// releases its mapping, returning the programmed word count.
    fn unmap(&mut self, platform: &impl Platform, lch: u8, dir: Direction, sync: bool) -> usize {
        let addr: DmaAddr = match dir {
            Direction::Write => self.regs.read32(regs::gdd_cssa(lch)),
            Direction::Read => self.regs.read32(regs::gdd_cdsa(lch)),
        };
        let words = self.regs.read16(regs::gdd_cen(lch)) as usize;
        let len = words * 4;
        if sync {
            platform.sync_single_for_cpu(addr, len, dir);
        }
        platform.unmap_single(addr, len, dir);
        words
    }

    /// Clears the shadow buffer-state bit, if the endpoint has one.
    #[inline]
    fn clear_bufstate(&mut self, bufstate: Option<(usize, u32)>) {
        if let Some((reg, bit)) = bufstate {
            self.regs.and32(reg, !bit);
        }
    }
}
