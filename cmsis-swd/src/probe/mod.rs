//! Probe access: the CMSIS-DAP transport and the traits the upper layers use to talk to it.

pub mod cmsisdap;
#[cfg(test)]
pub(crate) mod fake_probe;
mod selector;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use self::cmsisdap::commands::{
    general::{connect::ConnectRequest as ConnectMode, host_status::HostStatusKind, info::Capabilities},
    transfer::{Ack, TransferOp, TransferRequest, TransferStatus},
    CommandId, FramingError,
};
pub use self::selector::{ProbeSelector, ProbeSelectorParseError};
use crate::Error;

/// A byte channel to a CMSIS-DAP probe.
///
/// Writes are whole HID reports including the leading report ID byte. Reads
/// return one report without the report ID.
pub trait DapChannel {
    /// Write a complete report, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Error>;

    /// Read a report into `buf`, waiting at most `timeout`.
    ///
    /// Returns 0 if nothing arrived in time.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Error>;
}

impl DapChannel for hidapi::HidDevice {
    fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
        Ok(hidapi::HidDevice::write(self, data)?)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Error> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        Ok(hidapi::HidDevice::read_timeout(self, buf, millis)?)
    }
}

/// The CMSIS-DAP command set, as used by the debug port layer.
///
/// Every call is a blocking request/response exchange; only one command is in
/// flight at a time.
pub trait DapClient {
    /// DAP_Info. Returns the raw response, starting with the length byte.
    fn info(&mut self, id: u8) -> Result<Vec<u8>, Error>;

    /// DAP_Connect. Fails with [`Error::ConnectFailed`] if the probe could not
    /// initialise the port.
    fn connect(&mut self, mode: ConnectMode) -> Result<(), Error>;

    /// DAP_Disconnect.
    fn disconnect(&mut self) -> Result<(), Error>;

    /// DAP_HostStatus, drives the connected/running indicators of the probe.
    fn set_host_status(&mut self, kind: HostStatusKind, on: bool) -> Result<(), Error>;

    /// DAP_TransferConfigure.
    fn transfer_configure(
        &mut self,
        idle_cycles: u8,
        wait_retry: u16,
        match_retry: u16,
    ) -> Result<(), Error>;

    /// DAP_Transfer. Returns the values of the plain reads, in request order.
    ///
    /// A batch the target answers with WAIT is repeated up to five times. Any other
    /// non-OK status is returned as [`Error::TransferFault`] without retry.
    fn transfer(&mut self, dap_index: u8, requests: &[TransferRequest]) -> Result<Vec<u32>, Error>;

    /// The largest number of words a single block transfer can carry.
    fn transfer_block_max_size(&self) -> usize;

    /// DAP_TransferBlock reading `count` words from one register.
    fn transfer_block_read(
        &mut self,
        dap_index: u8,
        ap: bool,
        reg: u8,
        count: usize,
    ) -> Result<Vec<u32>, Error>;

    /// DAP_TransferBlock writing `data` to one register.
    fn transfer_block_write(
        &mut self,
        dap_index: u8,
        ap: bool,
        reg: u8,
        data: &[u32],
    ) -> Result<(), Error>;

    /// DAP_Delay. At most 65535 µs.
    fn delay(&mut self, delay: Duration) -> Result<(), Error>;

    /// DAP_ResetTarget. Returns whether a device specific reset sequence ran.
    fn reset_target(&mut self) -> Result<bool, Error>;

    /// DAP_SWJ_Clock.
    fn swj_clock(&mut self, clock_hz: u32) -> Result<(), Error>;

    /// DAP_SWJ_Sequence, clocks out `bits` bits of `data` on SWDIO/TMS.
    fn swj_sequence(&mut self, bits: usize, data: &[u8]) -> Result<(), Error>;

    /// DAP_SWD_Configure.
    fn swd_configure(&mut self, config: u8) -> Result<(), Error>;

    /// Release the probe. Later calls fail with [`Error::ProbeClosed`].
    fn close(&mut self) -> Result<(), Error>;
}

/// Aborts the pending wait for a probe response when set.
///
/// Clones share the same flag, so a handle can be moved to another thread or a
/// signal handler while the probe is in use.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current and all further commands.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Re-arm the handle after a cancellation has been handled.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Describes a CMSIS-DAP probe found on the USB bus.
#[derive(Clone, PartialEq, Eq)]
pub struct DebugProbeInfo {
    pub identifier: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub interface: i32,
}

impl std::fmt::Debug for DebugProbeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} (VID: {:04x}, PID: {:04x}, {}Interface: {})",
            self.identifier,
            self.vendor_id,
            self.product_id,
            self.serial_number
                .clone()
                .map_or("".to_owned(), |v| format!("Serial: {v}, ")),
            self.interface
        )
    }
}

impl std::fmt::Display for DebugProbeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} -- {}", self.identifier, ProbeSelector::from(self))
    }
}
