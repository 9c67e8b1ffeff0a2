pub mod general {
    pub mod connect;
    pub mod delay;
    pub mod disconnect;
    pub mod host_status;
    pub mod info;
    pub mod reset;
}
pub mod swd {
    pub mod configure;
}
pub mod swj {
    pub mod clock;
    pub mod sequence;
}
pub mod transfer;

use std::str::Utf8Error;

/// A response that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum FramingError {
    /// Command ID in response ({0:#04x}) does not match sent command ID.
    CommandIdMismatch(u8),

    /// Not enough data in response from probe.
    NotEnoughData,

    /// Status can only be 0x00 or 0xFF, got {0:#04x}.
    InvalidResponseStatus(u8),

    /// Info response announced {expected} bytes, got {got}.
    UnexpectedInfoLength { expected: usize, got: usize },

    /// Probe reported {got} completed transfers, {requested} were requested.
    TransferCountMismatch { requested: usize, got: usize },

    /// Unexpected value {0:#04x} in response.
    UnexpectedAnswer(u8),

    /// String in response is not valid UTF-8.
    InvalidString(#[from] Utf8Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    DapOk = 0x00,
    DapError = 0xFF,
}

impl Status {
    pub fn from_byte(value: u8) -> Result<Self, FramingError> {
        match value {
            0x00 => Ok(Status::DapOk),
            0xFF => Ok(Status::DapError),
            other => Err(FramingError::InvalidResponseStatus(other)),
        }
    }

    /// Reads the status from the first byte of a response.
    pub(crate) fn from_response(buffer: &[u8]) -> Result<Self, FramingError> {
        buffer
            .first()
            .ok_or(FramingError::NotEnoughData)
            .and_then(|&b| Self::from_byte(b))
    }
}

/// Command ID for CMSIS-DAP commands.
///
/// The command ID is always sent as the first byte for every command,
/// and also is the first byte of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    Info = 0x00,
    HostStatus = 0x01,
    Connect = 0x02,
    Disconnect = 0x03,
    TransferConfigure = 0x04,
    Transfer = 0x05,
    TransferBlock = 0x06,
    Delay = 0x09,
    ResetTarget = 0x0A,
    SwjClock = 0x11,
    SwjSequence = 0x12,
    SwdConfigure = 0x13,
}

pub(crate) trait Request {
    const COMMAND_ID: CommandId;

    type Response;

    /// Append the request arguments to `buffer`.
    ///
    /// The report ID and the command ID have already been written.
    fn to_bytes(&self, buffer: &mut Vec<u8>);

    /// Decode the response, with the echoed command ID already stripped.
    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError>;
}

/// Trace log a buffer, including only the first trailing zero.
///
/// HID reports are padded to the full packet size, which makes the
/// trace output very long and difficult to read.
pub(crate) fn trace_buffer(name: &str, buf: &[u8]) {
    if tracing::enabled!(tracing::Level::TRACE) {
        let len = buf.len();
        let cut = len + 1 - buf.iter().rev().position(|&x| x != 0).unwrap_or(len);
        let end = std::cmp::min(len, std::cmp::max(1, cut));
        tracing::trace!("{}: {:02X?}...", name, &buf[..end]);
    }
}
