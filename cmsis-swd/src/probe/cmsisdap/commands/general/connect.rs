use super::super::{CommandId, FramingError, Request};

/// The debug port the probe should initialise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectRequest {
    UseDefaultPort = 0x00,
    UseSwd = 0x01,
    UseJtag = 0x02,
}

impl Request for ConnectRequest {
    const COMMAND_ID: CommandId = CommandId::Connect;

    type Response = ConnectResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(*self as u8);
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        match buffer.first() {
            Some(0) => Ok(ConnectResponse::InitFailed),
            Some(1) => Ok(ConnectResponse::SuccessfulInitForSwd),
            Some(2) => Ok(ConnectResponse::SuccessfulInitForJtag),
            Some(&other) => Err(FramingError::UnexpectedAnswer(other)),
            None => Err(FramingError::NotEnoughData),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectResponse {
    InitFailed = 0x00,
    SuccessfulInitForSwd = 0x01,
    SuccessfulInitForJtag = 0x02,
}
