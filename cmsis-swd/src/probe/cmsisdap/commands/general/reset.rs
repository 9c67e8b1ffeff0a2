use super::super::{CommandId, FramingError, Request, Status};

#[derive(Clone, Copy, Debug)]
pub struct ResetRequest;

impl Request for ResetRequest {
    const COMMAND_ID: CommandId = CommandId::ResetTarget;

    type Response = ResetResponse;

    fn to_bytes(&self, _buffer: &mut Vec<u8>) {}

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        let status = Status::from_response(buffer)?;
        let execute = Execute::from_byte(*buffer.get(1).ok_or(FramingError::NotEnoughData)?)?;
        Ok(ResetResponse { status, execute })
    }
}

/// Execute: indicates whether a device specific reset sequence was executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execute {
    NoDeviceSpecificResetSequenceImplemented = 0,
    DeviceSpecificResetSequenceImplemented = 1,
}

impl Execute {
    pub(crate) fn from_byte(byte: u8) -> Result<Self, FramingError> {
        match byte {
            0 => Ok(Execute::NoDeviceSpecificResetSequenceImplemented),
            1 => Ok(Execute::DeviceSpecificResetSequenceImplemented),
            other => Err(FramingError::UnexpectedAnswer(other)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ResetResponse {
    pub status: Status,
    pub execute: Execute,
}
