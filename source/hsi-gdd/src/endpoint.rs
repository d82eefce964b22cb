//! HSI ports, channels and the per-direction transfer bookkeeping.
use core::fmt;

use crate::platform::ChannelClient;

/// The maximum number of HSI ports on a controller.
pub const MAX_PORTS: usize = 2;

/// The maximum number of HSI channels on a port.
pub const PORT_MAX_CH: usize = 8;

/// A logical HSI endpoint: one channel on one port.
///
/// Ports are numbered from 1, channels from 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    /// The HSI port, starting at 1.
    pub port: u8,
    /// The channel on `port`, starting at 0.
    pub channel: u8,
}

/// Which way a transfer moves data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Memory to the HSI transmitter.
    Write,
    /// The HSI receiver to memory.
    Read,
}

/// The endpoint direction a GDD logical channel is currently bound to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    /// The endpoint the transfer belongs to.
    pub endpoint: Endpoint,
    /// The direction of the transfer on `endpoint`.
    pub direction: Direction,
}

/// Which GDD logical channel, if any, is serving one direction of an
/// endpoint.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TransferRecord {
    pub(crate) lch: Option<u8>,
}

pub(crate) struct Channel {
    pub(crate) client: Option<&'static dyn ChannelClient>,
    pub(crate) read: TransferRecord,
    pub(crate) write: TransferRecord,
}

pub(crate) struct Port {
    pub(crate) channels: [Channel; PORT_MAX_CH],
}

// === impl Endpoint ===

impl Endpoint {
    /// Returns the endpoint for `channel` on the 1-based `port`.
    #[must_use]
    pub const fn new(port: u8, channel: u8) -> Self {
        Self { port, channel }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.port, self.channel)
    }
}

// === impl Direction ===

impl Direction {
    /// Index into per-direction tables.
    #[inline]
    pub(crate) const fn idx(self) -> usize {
        match self {
            Direction::Write => 0,
            Direction::Read => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Write => f.write_str("write"),
            Direction::Read => f.write_str("read"),
        }
    }
}

// === impl TransferRecord ===

impl TransferRecord {
    #[inline]
    pub(crate) fn is_bound(&self) -> bool {
        self.lch.is_some()
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.lch = None;
    }
}

// === impl Channel ===

impl Channel {
    const fn new() -> Self {
        Self {
            client: None,
            read: TransferRecord { lch: None },
            write: TransferRecord { lch: None },
        }
    }

    #[inline]
    pub(crate) fn record(&self, dir: Direction) -> &TransferRecord {
        match dir {
            Direction::Write => &self.write,
            Direction::Read => &self.read,
        }
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, dir: Direction) -> &mut TransferRecord {
        match dir {
            Direction::Write => &mut self.write,
            Direction::Read => &mut self.read,
        }
    }
}

// === impl Port ===

impl Port {
    pub(crate) const fn new() -> Self {
        const NEW_CHANNEL: Channel = Channel::new();
        Self {
            channels: [NEW_CHANNEL; PORT_MAX_CH],
        }
    }
}
