pub mod configure;

use std::fmt;

use super::{CommandId, FramingError, Request};
use crate::ConfigurationError;
use scroll::{Pread, LE};

/// The kind of access a single [`TransferRequest`] performs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferOp {
    /// Read the register. The value is returned in the response.
    Read,
    /// Read the register until it matches the given value (under the match mask).
    ReadMatch(u32),
    /// Write the register.
    Write(u32),
    /// Write the match mask used by subsequent `ReadMatch` requests.
    WriteMatch(u32),
}

impl TransferOp {
    fn data(&self) -> Option<u32> {
        match *self {
            TransferOp::Read => None,
            TransferOp::ReadMatch(v) | TransferOp::Write(v) | TransferOp::WriteMatch(v) => Some(v),
        }
    }
}

/// A single DP or AP register access inside a DAP_Transfer batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub op: TransferOp,
    /// `true` for an access port register, `false` for a debug port register.
    pub ap: bool,
    /// Register offset, one of 0x0, 0x4, 0x8 or 0xC.
    pub reg: u8,
}

impl TransferRequest {
    pub fn read(ap: bool, reg: u8) -> Self {
        TransferRequest {
            op: TransferOp::Read,
            ap,
            reg,
        }
    }

    pub fn write(ap: bool, reg: u8, data: u32) -> Self {
        TransferRequest {
            op: TransferOp::Write(data),
            ap,
            reg,
        }
    }

    /// Checks that the register offset can be expressed with A2/A3.
    pub(crate) fn validate_reg(reg: u8) -> Result<(), ConfigurationError> {
        if reg & !0xC != 0 {
            Err(ConfigurationError::InvalidRegister(reg))
        } else {
            Ok(())
        }
    }

    /// Encodes the request byte:
    /// bit 0 APnDP, bit 1 RnW, bits 2..3 A2/A3, bit 4 value match, bit 5 match mask.
    fn request_byte(&self) -> u8 {
        let mut byte = u8::from(self.ap) | (self.reg & 0xC);
        byte |= match self.op {
            TransferOp::Read => 1 << 1,
            TransferOp::ReadMatch(_) => 1 << 1 | 1 << 4,
            TransferOp::Write(_) => 0,
            TransferOp::WriteMatch(_) => 1 << 5,
        };
        byte
    }

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.request_byte());
        if let Some(data) = self.op.data() {
            buffer.extend_from_slice(&data.to_le_bytes());
        }
    }
}

/// SWD acknowledge of the last transfer in a batch.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Ack {
    Ok,
    Wait,
    Fault,
    NoAck,
    /// A value the probe should not report.
    Other(u8),
}

/// Status byte of a DAP_Transfer or DAP_TransferBlock response.
///
/// Bits 0..2 hold the ACK of the last transfer, bit 3 flags an SWD protocol
/// error and bit 4 a value mismatch on a `ReadMatch`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferStatus(pub u8);

impl TransferStatus {
    pub const OK: TransferStatus = TransferStatus(0x01);
    pub const WAIT: TransferStatus = TransferStatus(0x02);
    pub const FAULT: TransferStatus = TransferStatus(0x04);

    pub fn ack(&self) -> Ack {
        match self.0 & 0x7 {
            1 => Ack::Ok,
            2 => Ack::Wait,
            4 => Ack::Fault,
            7 => Ack::NoAck,
            other => Ack::Other(other),
        }
    }

    pub fn swd_error(&self) -> bool {
        self.0 & 0x08 != 0
    }

    pub fn value_mismatch(&self) -> bool {
        self.0 & 0x10 != 0
    }

    /// OK acknowledge without protocol error or value mismatch.
    pub fn is_ok(&self) -> bool {
        self.ack() == Ack::Ok && !self.swd_error() && !self.value_mismatch()
    }

    /// WAIT acknowledge without protocol error or value mismatch.
    pub fn is_wait(&self) -> bool {
        self.ack() == Ack::Wait && !self.swd_error() && !self.value_mismatch()
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} (ack {:?}", self.0, self.ack())?;
        if self.swd_error() {
            write!(f, ", SWD error")?;
        }
        if self.value_mismatch() {
            write!(f, ", value mismatch")?;
        }
        write!(f, ")")
    }
}

/// Read/write single and multiple registers.
///
/// The transfer data in the response follows the order of the requests, one
/// word per plain `Read`. The batch is aborted by the probe on the first
/// failing transfer.
#[derive(Debug)]
pub struct Transfer<'a> {
    /// Zero based device index of the selected JTAG device. For SWD mode the value is ignored.
    pub dap_index: u8,
    pub transfers: &'a [TransferRequest],
}

impl Request for Transfer<'_> {
    const COMMAND_ID: CommandId = CommandId::Transfer;

    type Response = TransferResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.dap_index);
        buffer.push(self.transfers.len() as u8);
        for transfer in self.transfers {
            transfer.to_bytes(buffer);
        }
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        if buffer.len() < 2 {
            return Err(FramingError::NotEnoughData);
        }
        let count = buffer[0] as usize;
        let status = TransferStatus(buffer[1]);
        if count > self.transfers.len() {
            tracing::error!("Transfer count larger than requested number of transfers");
            return Err(FramingError::TransferCountMismatch {
                requested: self.transfers.len(),
                got: count,
            });
        }

        // Data is only meaningful once every transfer completed.
        let mut data = Vec::new();
        if status.is_ok() {
            if count != self.transfers.len() {
                return Err(FramingError::TransferCountMismatch {
                    requested: self.transfers.len(),
                    got: count,
                });
            }
            let reads = self
                .transfers
                .iter()
                .filter(|t| t.op == TransferOp::Read)
                .count();
            data = read_words(&buffer[2..], reads)?;
        }

        Ok(TransferResponse {
            count,
            status,
            data,
        })
    }
}

#[derive(Debug)]
pub struct TransferResponse {
    /// Number of transfers the probe executed.
    pub count: usize,
    /// Status of the last executed transfer.
    pub status: TransferStatus,
    /// Values of the plain reads, only filled in on success.
    pub data: Vec<u32>,
}

fn read_words(buffer: &[u8], count: usize) -> Result<Vec<u32>, FramingError> {
    (0..count)
        .map(|i| {
            buffer
                .pread_with::<u32>(i * 4, LE)
                .map_err(|_| FramingError::NotEnoughData)
        })
        .collect()
}

/// Read or write a single register multiple times.
#[derive(Debug)]
pub(crate) struct TransferBlockRequest<'a> {
    /// Zero-based device index of the selected JTAG device. For SWD mode the
    /// value is ignored.
    dap_index: u8,
    /// Number of transfers
    transfer_count: u16,

    request: TransferRequest,

    /// Register values to write for writes
    transfer_data: &'a [u32],
}

impl<'a> TransferBlockRequest<'a> {
    pub(crate) fn write_request(dap_index: u8, ap: bool, reg: u8, data: &'a [u32]) -> Self {
        TransferBlockRequest {
            dap_index,
            transfer_count: data.len() as u16,
            request: TransferRequest::write(ap, reg, 0),
            transfer_data: data,
        }
    }

    pub(crate) fn read_request(dap_index: u8, ap: bool, reg: u8, read_count: u16) -> Self {
        TransferBlockRequest {
            dap_index,
            transfer_count: read_count,
            request: TransferRequest::read(ap, reg),
            transfer_data: &[],
        }
    }
}

impl Request for TransferBlockRequest<'_> {
    const COMMAND_ID: CommandId = CommandId::TransferBlock;

    type Response = TransferBlockResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.dap_index);
        buffer.extend_from_slice(&self.transfer_count.to_le_bytes());
        buffer.push(self.request.request_byte());
        for word in self.transfer_data {
            buffer.extend_from_slice(&word.to_le_bytes());
        }
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        let transfer_count: u16 = buffer
            .pread_with(0, LE)
            .map_err(|_| FramingError::NotEnoughData)?;
        let status = TransferStatus(
            buffer
                .pread_with(2, LE)
                .map_err(|_| FramingError::NotEnoughData)?,
        );

        let mut data = Vec::new();
        if status.is_ok() {
            if transfer_count != self.transfer_count {
                return Err(FramingError::TransferCountMismatch {
                    requested: self.transfer_count as usize,
                    got: transfer_count as usize,
                });
            }
            // Writes carry no data in the response.
            if self.request.op == TransferOp::Read {
                data = read_words(&buffer[3..], transfer_count as usize)?;
            }
        }

        Ok(TransferBlockResponse {
            transfer_count,
            status,
            transfer_data: data,
        })
    }
}

#[derive(Debug)]
pub(crate) struct TransferBlockResponse {
    pub transfer_count: u16,
    pub status: TransferStatus,
    pub transfer_data: Vec<u32>,
}
