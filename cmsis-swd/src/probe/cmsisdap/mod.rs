//! CMSIS-DAP v1 probe driver over USB HID.

pub mod commands;
pub mod tools;

use std::time::{Duration, Instant};

use self::commands::{
    general::{
        connect::{ConnectRequest, ConnectResponse},
        delay::DelayRequest,
        disconnect::DisconnectRequest,
        host_status::{HostStatusKind, HostStatusRequest},
        info::{
            Capabilities, CapabilitiesCommand, FirmwareVersionCommand, InfoRequest,
            PacketCountCommand, PacketSizeCommand, ProductIdCommand, SerialNumberCommand,
            TargetDeviceNameCommand, TargetDeviceVendorCommand, VendorCommand,
        },
        reset::{Execute, ResetRequest},
    },
    swd,
    swj::{clock::SwjClockRequest, sequence::SequenceRequest},
    trace_buffer,
    transfer::{configure::ConfigureRequest, Transfer, TransferBlockRequest, TransferRequest},
    CommandId, FramingError, Request, Status,
};
use crate::probe::{CancelHandle, DapChannel, DapClient, ProbeSelector};
use crate::{ConfigurationError, Error, TimeoutKind};

/// Packet size assumed until the probe reported its own.
const DEFAULT_PACKET_SIZE: usize = 8;

/// Number of times a DAP_Transfer batch is sent while the target answers WAIT.
const TRANSFER_ATTEMPTS: usize = 5;

/// Longest single wait on the channel between cancellation checks.
const READ_SLICE: Duration = Duration::from_millis(10);

/// Header of a DAP_TransferBlock: command, DAP index, count (2 bytes) and request.
const TRANSFER_BLOCK_HEADER: usize = 5;

/// A CMSIS-DAP probe.
///
/// Owns the channel to the probe exclusively. Commands are never fragmented: a
/// command which does not fit into the negotiated packet size is rejected before
/// it is sent.
pub struct CmsisDap<C: DapChannel = hidapi::HidDevice> {
    channel: Option<C>,
    packet_size: usize,
    response_timeout: Duration,
    cancel: CancelHandle,
}

impl<C: DapChannel> std::fmt::Debug for CmsisDap<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsisDap")
            .field("open", &self.channel.is_some())
            .field("packet_size", &self.packet_size)
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

impl CmsisDap<hidapi::HidDevice> {
    /// Find and open the probe matching `selector`.
    pub fn open(selector: &ProbeSelector, response_timeout: Duration) -> Result<Self, Error> {
        let device = tools::open_device(selector)?;
        Self::new(device, response_timeout)
    }
}

impl<C: DapChannel> CmsisDap<C> {
    /// Take ownership of an open channel and negotiate the packet size.
    ///
    /// Stale reports left over from a previous session are drained first.
    pub fn new(channel: C, response_timeout: Duration) -> Result<Self, Error> {
        let mut probe = CmsisDap {
            channel: Some(channel),
            packet_size: DEFAULT_PACKET_SIZE,
            response_timeout,
            cancel: CancelHandle::new(),
        };
        probe.drain()?;

        let packet_size = probe.send(&PacketSizeCommand)? as usize;
        probe.packet_size = packet_size;
        tracing::info!("Probe packet size is {} bytes", packet_size);

        Ok(probe)
    }

    /// The maximum size of a command, excluding the HID report ID.
    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    /// A handle that aborts the pending response wait when cancelled.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn channel(&mut self) -> Result<&mut C, Error> {
        self.channel.as_mut().ok_or(Error::ProbeClosed)
    }

    /// Drop any pending reports, so that the next response belongs to the next request.
    fn drain(&mut self) -> Result<(), Error> {
        tracing::debug!("Draining probe of any pending data.");
        let mut discard = vec![0u8; self.packet_size.max(64) + 1];
        let channel = self.channel()?;
        while channel.read_timeout(&mut discard, Duration::from_millis(1))? != 0 {}
        Ok(())
    }

    fn send<Req: Request>(&mut self, request: &Req) -> Result<Req::Response, Error> {
        // Byte 0 is the HID report ID.
        let mut buffer = vec![0, Req::COMMAND_ID as u8];
        request.to_bytes(&mut buffer);

        let len = buffer.len() - 1;
        if len > self.packet_size {
            return Err(ConfigurationError::PacketTooLarge {
                max: self.packet_size,
                got: len,
            }
            .into());
        }

        // HID reports always have the full size.
        buffer.resize(self.packet_size + 1, 0);

        let response = self.exec(&buffer)?;

        match response.first() {
            None => Err(Error::framing(Req::COMMAND_ID, FramingError::NotEnoughData)),
            Some(&id) if id != Req::COMMAND_ID as u8 => Err(Error::framing(
                Req::COMMAND_ID,
                FramingError::CommandIdMismatch(id),
            )),
            Some(_) => request
                .parse_response(&response[1..])
                .map_err(|e| Error::framing(Req::COMMAND_ID, e)),
        }
    }

    /// Write one report and wait for the response, honoring cancellation and the
    /// response timeout.
    fn exec(&mut self, report: &[u8]) -> Result<Vec<u8>, Error> {
        let timeout = self.response_timeout;
        let cancel = self.cancel.clone();
        let mut buffer = vec![0u8; self.packet_size.max(DEFAULT_PACKET_SIZE) + 1];

        let channel = self.channel()?;
        channel.write(report)?;
        trace_buffer("Transmit buffer", report);

        let deadline = Instant::now() + timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::TransferTimeout(TimeoutKind::Cancelled));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::TransferTimeout(TimeoutKind::Response(timeout)));
            }
            let slice = (deadline - now).min(READ_SLICE);
            let n = channel.read_timeout(&mut buffer, slice)?;
            if n > 0 {
                buffer.truncate(n);
                trace_buffer("Receive buffer", &buffer);
                return Ok(buffer);
            }
        }
    }

    fn send_checked<Req: Request>(
        &mut self,
        request: &Req,
        status: impl FnOnce(&Req::Response) -> Status,
    ) -> Result<Req::Response, Error> {
        let response = self.send(request)?;
        match status(&response) {
            Status::DapOk => Ok(response),
            Status::DapError => Err(Error::ErrorResponse(Req::COMMAND_ID)),
        }
    }

    fn do_transfer(
        &mut self,
        dap_index: u8,
        requests: &[TransferRequest],
    ) -> Result<Vec<u32>, Error> {
        let response = self.send(&Transfer {
            dap_index,
            transfers: requests,
        })?;
        if !response.status.is_ok() {
            return Err(Error::TransferFault(response.status));
        }
        Ok(response.data)
    }

    fn check_block_size(&self, count: usize) -> Result<(), ConfigurationError> {
        let max = self.transfer_block_max_size();
        if count > max {
            return Err(ConfigurationError::BlockTooLarge { max, got: count });
        }
        Ok(())
    }

    fn info_string<Req: Request<Response = Option<String>>>(
        &mut self,
        request: Req,
    ) -> Result<Option<String>, Error> {
        self.send(&request)
    }

    pub fn vendor_name(&mut self) -> Result<Option<String>, Error> {
        self.info_string(VendorCommand)
    }

    pub fn product_name(&mut self) -> Result<Option<String>, Error> {
        self.info_string(ProductIdCommand)
    }

    pub fn serial_number(&mut self) -> Result<Option<String>, Error> {
        self.info_string(SerialNumberCommand)
    }

    pub fn firmware_version(&mut self) -> Result<Option<String>, Error> {
        self.info_string(FirmwareVersionCommand)
    }

    pub fn target_vendor(&mut self) -> Result<Option<String>, Error> {
        self.info_string(TargetDeviceVendorCommand)
    }

    pub fn target_name(&mut self) -> Result<Option<String>, Error> {
        self.info_string(TargetDeviceNameCommand)
    }

    pub fn capabilities(&mut self) -> Result<Capabilities, Error> {
        self.send(&CapabilitiesCommand)
    }

    /// Number of packets the probe can buffer.
    pub fn packet_count(&mut self) -> Result<u8, Error> {
        self.send(&PacketCountCommand)
    }
}

impl<C: DapChannel> DapClient for CmsisDap<C> {
    fn info(&mut self, id: u8) -> Result<Vec<u8>, Error> {
        tracing::debug!("GetInfo({:#04x})", id);
        self.send(&InfoRequest(id))
    }

    fn connect(&mut self, mode: ConnectRequest) -> Result<(), Error> {
        tracing::debug!("Connect({:?})", mode);
        if mode == ConnectRequest::UseJtag {
            return Err(Error::NotSupported("JTAG transport"));
        }
        match self.send(&mode)? {
            ConnectResponse::InitFailed => Err(Error::ConnectFailed),
            port => {
                tracing::debug!("Connected: {:?}", port);
                Ok(())
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        tracing::debug!("Disconnect");
        self.send_checked(&DisconnectRequest, |r| r.0)?;
        Ok(())
    }

    fn set_host_status(&mut self, kind: HostStatusKind, on: bool) -> Result<(), Error> {
        tracing::debug!("SetHostStatus({:?}, {})", kind, on);
        self.send_checked(&HostStatusRequest::new(kind, on), |r| r.0)?;
        Ok(())
    }

    fn transfer_configure(
        &mut self,
        idle_cycles: u8,
        wait_retry: u16,
        match_retry: u16,
    ) -> Result<(), Error> {
        tracing::debug!(
            "TransferConfigure({}, {}, {})",
            idle_cycles,
            wait_retry,
            match_retry
        );
        self.send_checked(
            &ConfigureRequest {
                idle_cycles,
                wait_retry,
                match_retry,
            },
            |r| r.0,
        )?;
        Ok(())
    }

    fn transfer(&mut self, dap_index: u8, requests: &[TransferRequest]) -> Result<Vec<u32>, Error> {
        // The request count is a single byte on the wire.
        if requests.len() > u8::MAX as usize {
            return Err(ConfigurationError::TooManyTransfers(requests.len()).into());
        }
        for request in requests {
            TransferRequest::validate_reg(request.reg)?;
        }

        for attempt in 1..=TRANSFER_ATTEMPTS {
            match self.do_transfer(dap_index, requests) {
                Err(Error::TransferFault(status)) if status.is_wait() => {
                    tracing::warn!(
                        "Target answered WAIT (attempt {}/{})",
                        attempt,
                        TRANSFER_ATTEMPTS
                    );
                }
                other => return other,
            }
        }

        Err(Error::TransferTimeout(TimeoutKind::WaitRetries(
            TRANSFER_ATTEMPTS,
        )))
    }

    fn transfer_block_max_size(&self) -> usize {
        self.packet_size.saturating_sub(TRANSFER_BLOCK_HEADER) / 4
    }

    fn transfer_block_read(
        &mut self,
        dap_index: u8,
        ap: bool,
        reg: u8,
        count: usize,
    ) -> Result<Vec<u32>, Error> {
        tracing::debug!("TransferBlockRead({}, {}, {:#x}, {})", dap_index, ap, reg, count);
        self.check_block_size(count)?;
        TransferRequest::validate_reg(reg)?;

        let response = self.send(&TransferBlockRequest::read_request(
            dap_index,
            ap,
            reg,
            count as u16,
        ))?;
        if !response.status.is_ok() {
            return Err(Error::TransferFault(response.status));
        }
        Ok(response.transfer_data)
    }

    fn transfer_block_write(
        &mut self,
        dap_index: u8,
        ap: bool,
        reg: u8,
        data: &[u32],
    ) -> Result<(), Error> {
        tracing::debug!(
            "TransferBlockWrite({}, {}, {:#x}, {})",
            dap_index,
            ap,
            reg,
            data.len()
        );
        self.check_block_size(data.len())?;
        TransferRequest::validate_reg(reg)?;

        let response = self.send(&TransferBlockRequest::write_request(dap_index, ap, reg, data))?;
        if !response.status.is_ok() {
            tracing::debug!(
                "Block write stopped after {} of {} words",
                response.transfer_count,
                data.len()
            );
            return Err(Error::TransferFault(response.status));
        }
        Ok(())
    }

    fn delay(&mut self, delay: Duration) -> Result<(), Error> {
        let request = DelayRequest::new(delay)?;
        tracing::debug!("Delay({:?})", delay);
        self.send_checked(&request, |r| r.0)?;
        Ok(())
    }

    fn reset_target(&mut self) -> Result<bool, Error> {
        tracing::debug!("ResetTarget");
        let response = self.send_checked(&ResetRequest, |r| r.status)?;
        Ok(response.execute == Execute::DeviceSpecificResetSequenceImplemented)
    }

    fn swj_clock(&mut self, clock_hz: u32) -> Result<(), Error> {
        tracing::debug!("SWJClock({})", clock_hz);
        self.send_checked(&SwjClockRequest(clock_hz), |r| r.0)?;
        Ok(())
    }

    fn swj_sequence(&mut self, bits: usize, data: &[u8]) -> Result<(), Error> {
        let request = SequenceRequest::new(bits, data)?;
        tracing::debug!("SWJSequence({}, {:02x?})", bits, data);
        self.send_checked(&request, |r| r.0)?;
        Ok(())
    }

    fn swd_configure(&mut self, config: u8) -> Result<(), Error> {
        tracing::debug!("SWDConfigure({:#04x})", config);
        self.send_checked(&swd::configure::ConfigureRequest(config), |r| r.0)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        match self.channel.take() {
            Some(_) => {
                tracing::info!("Closed probe");
                Ok(())
            }
            None => Err(Error::ProbeClosed),
        }
    }
}
