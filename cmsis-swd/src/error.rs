use std::time::Duration;

use crate::probe::cmsisdap::commands::{transfer::TransferStatus, CommandId, FramingError};

/// The error type for every operation in this crate.
///
/// Errors are surfaced to the immediate caller without further recovery. The only
/// retry that happens internally is the bounded WAIT retry of
/// [`DapClient::transfer`](crate::DapClient::transfer). After any error, layer caches
/// are not guaranteed to match the hardware and the session should be re-initialised.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// The probe sent a malformed response to {command:?}.
    ProtocolFraming {
        command: CommandId,
        #[source]
        source: FramingError,
    },

    /// An error occurred while accessing the USB HID device.
    DeviceIo(#[from] hidapi::HidError),

    /// The SWD transfer failed with status {0}.
    TransferFault(TransferStatus),

    /// Operation timed out: {0}
    TransferTimeout(TimeoutKind),

    /// Invalid configuration: {0}
    Configuration(#[from] ConfigurationError),

    /// The operation is not supported: {0}
    NotSupported(&'static str),

    /// The probe answered {0:?} with an error status.
    ErrorResponse(CommandId),

    /// The probe could not initialise the requested debug port.
    ConnectFailed,

    /// The probe has already been closed.
    ProbeClosed,
}

impl Error {
    /// Returns `true` if the error is an SWD transfer fault reported by the probe.
    pub fn is_fault(&self) -> bool {
        matches!(self, Error::TransferFault(_))
    }

    pub(crate) fn framing(command: CommandId, source: FramingError) -> Self {
        Error::ProtocolFraming { command, source }
    }
}

/// The reason a [`Error::TransferTimeout`] was raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum TimeoutKind {
    /// the target kept answering WAIT after {0} attempts
    WaitRetries(usize),

    /// {what} did not complete within {timeout:?}
    Poll {
        what: &'static str,
        timeout: Duration,
    },

    /// the probe did not respond within {0:?}
    Response(Duration),

    /// the pending command was cancelled
    Cancelled,
}

/// Misuse of the API or a target/probe setup that cannot work.
///
/// These errors are raised before any traffic for the offending request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum ConfigurationError {
    /// MEM-AP {ap_sel} is disabled (CSW {csw:#010x})
    MemApDisabled { ap_sel: u8, csw: u32 },

    /// packet of {got} bytes exceeds the probe packet size of {max} bytes
    PacketTooLarge { max: usize, got: usize },

    /// block transfer of {got} words exceeds the maximum of {max} words
    BlockTooLarge { max: usize, got: usize },

    /// batch of {0} transfers exceeds the maximum of 255
    TooManyTransfers(usize),

    /// address {address:#010x} is not word aligned
    UnalignedAddress { address: u32 },

    /// target is not a Cortex-M4 (CPUID {cpuid:#010x})
    WrongTarget { cpuid: u32 },

    /// register offset {0:#04x} is not word aligned
    InvalidRegister(u8),

    /// core register selector {0:#x} is out of range
    InvalidCoreRegister(u16),

    /// delay of {0:?} does not fit into 65535 microseconds
    DelayTooLong(Duration),

    /// SWJ sequence of {bits} bits cannot be sent with {bytes} bytes of data
    InvalidSequenceLength { bits: usize, bytes: usize },

    /// no CMSIS-DAP probe matches {0}
    ProbeNotFound(String),

    /// the core has not been initialised
    NotInitialized,
}
