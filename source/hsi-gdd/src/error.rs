use core::fmt;

/// Errors returned by the GDD transport.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Every GDD logical channel is busy. This is transient; the caller may
    /// retry once a transfer completes.
    NoFreeChannel,
    /// Zero-length or null-buffer request, an endpoint outside the
    /// configured geometry, or a word count the GDD cannot express.
    InvalidArgument,
    /// The endpoint already has a transfer in flight in this direction.
    EndpointBusy,
    /// The GDD raised an event for a logical channel no endpoint is bound
    /// to.
    ///
    /// The bottom half has no caller to return this to. It is only logged,
    /// and counted in [`BottomHalf::unresolved`](crate::BottomHalf::unresolved).
    UnresolvedChannel(u8),
    /// The GDD reported a timeout on a logical channel.
    ///
    /// Like [`Error::UnresolvedChannel`], this is only logged. It is counted
    /// in [`BottomHalf::errors`](crate::BottomHalf::errors), and the port
    /// owner is told through [`PortEvent::Error`](crate::PortEvent::Error).
    TransferError(u8),
    /// The settings describe a controller this driver cannot run.
    InvalidSettings(&'static str),
    /// The interrupt line could not be requested.
    IrqRequest(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoFreeChannel => f.write_str("no free GDD logical channels"),
            Error::InvalidArgument => f.write_str("invalid transfer request"),
            Error::EndpointBusy => f.write_str("endpoint already has a transfer in flight"),
            Error::UnresolvedChannel(lch) => {
                write!(f, "GDD channel {lch} does not match any HSI channel")
            }
            Error::TransferError(lch) => write!(f, "error on GDD transfer on channel {lch}"),
            Error::InvalidSettings(reason) => write!(f, "invalid GDD settings: {reason}"),
            Error::IrqRequest(irq) => write!(f, "failed to request GDD IRQ {irq}"),
        }
    }
}
