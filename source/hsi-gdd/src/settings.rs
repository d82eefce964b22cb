use serde::{Deserialize, Serialize};

use crate::{
    endpoint::{MAX_PORTS, PORT_MAX_CH},
    Error,
};

/// Describes the HSI controller a [`Gdd`](crate::Gdd) drives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GddSettings {
    /// Number of GDD logical channels. Must be a power of two, no larger
    /// than 32.
    #[serde(default = "GddSettings::default_channel_count")]
    pub channel_count: u8,
    /// Number of HSI ports.
    #[serde(default = "GddSettings::default_ports")]
    pub ports: u8,
    /// Number of HSI channels on each port.
    #[serde(default = "GddSettings::default_channels_per_port")]
    pub channels_per_port: u8,
    /// HSI channels below this number have a bit in the per-port buffer
    /// state registers, which is cleared when their transfer is torn down.
    #[serde(default = "GddSettings::default_bufstate_channels")]
    pub bufstate_channels: u8,
    /// The GDD MPU interrupt line.
    #[serde(default = "GddSettings::default_irq")]
    pub irq: u32,
}

impl GddSettings {
    /// The size of the logical channel pool on OMAP parts.
    pub const DEFAULT_CHANNEL_COUNT: u8 = 8;
    /// Every port the controller can have.
    pub const DEFAULT_PORTS: u8 = MAX_PORTS as u8;
    /// Every channel a port can have.
    pub const DEFAULT_CHANNELS_PER_PORT: u8 = PORT_MAX_CH as u8;
    /// Buffer state bits for every channel of a port.
    pub const DEFAULT_BUFSTATE_CHANNELS: u8 = PORT_MAX_CH as u8;
    /// The GDD MPU interrupt line on OMAP3.
    pub const DEFAULT_IRQ: u32 = 71;

    const fn default_channel_count() -> u8 {
        Self::DEFAULT_CHANNEL_COUNT
    }

    const fn default_ports() -> u8 {
        Self::DEFAULT_PORTS
    }

    const fn default_channels_per_port() -> u8 {
        Self::DEFAULT_CHANNELS_PER_PORT
    }

    const fn default_bufstate_channels() -> u8 {
        Self::DEFAULT_BUFSTATE_CHANNELS
    }

    const fn default_irq() -> u32 {
        Self::DEFAULT_IRQ
    }

    /// Sets the number of GDD logical channels.
    #[must_use]
    pub fn with_channel_count(self, channel_count: u8) -> Self {
        Self {
            channel_count,
            ..self
        }
    }

    /// Sets the number of HSI ports.
    #[must_use]
    pub fn with_ports(self, ports: u8) -> Self {
        Self { ports, ..self }
    }

    /// Sets the number of channels on each port.
    #[must_use]
    pub fn with_channels_per_port(self, channels_per_port: u8) -> Self {
        Self {
            channels_per_port,
            ..self
        }
    }

    /// Sets how many channels have a bit in the buffer state registers.
    #[must_use]
    pub fn with_bufstate_channels(self, bufstate_channels: u8) -> Self {
        Self {
            bufstate_channels,
            ..self
        }
    }

    /// Sets the GDD interrupt line.
    #[must_use]
    pub fn with_irq(self, irq: u32) -> Self {
        Self { irq, ..self }
    }

    /// Checks that these settings describe a controller the driver can run.
    pub fn validate(&self) -> Result<(), Error> {
        if self.channel_count == 0 || !self.channel_count.is_power_of_two() {
            return Err(Error::InvalidSettings(
                "channel count must be a power of two",
            ));
        }
        if self.channel_count as u32 > u32::BITS {
            return Err(Error::InvalidSettings(
                "channel count must fit the 32-bit interrupt registers",
            ));
        }
        if self.ports == 0 || self.ports as usize > MAX_PORTS {
            return Err(Error::InvalidSettings("unsupported number of ports"));
        }
        if self.channels_per_port == 0 || self.channels_per_port as usize > PORT_MAX_CH {
            return Err(Error::InvalidSettings(
                "unsupported number of channels per port",
            ));
        }
        Ok(())
    }
}

impl Default for GddSettings {
    fn default() -> Self {
        Self {
            channel_count: Self::DEFAULT_CHANNEL_COUNT,
            ports: Self::DEFAULT_PORTS,
            channels_per_port: Self::DEFAULT_CHANNELS_PER_PORT,
            bufstate_channels: Self::DEFAULT_BUFSTATE_CHANNELS,
            irq: Self::DEFAULT_IRQ,
        }
    }
}
