use std::time::Duration;

use super::super::{CommandId, FramingError, Request, Status};
use crate::ConfigurationError;

/// DAP_Delay, waits for a number of microseconds on the probe.
#[derive(Clone, Copy, Debug)]
pub struct DelayRequest {
    micros: u16,
}

impl DelayRequest {
    pub fn new(delay: Duration) -> Result<Self, ConfigurationError> {
        let micros = u16::try_from(delay.as_micros())
            .map_err(|_| ConfigurationError::DelayTooLong(delay))?;
        Ok(DelayRequest { micros })
    }
}

impl Request for DelayRequest {
    const COMMAND_ID: CommandId = CommandId::Delay;

    type Response = DelayResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.micros.to_le_bytes());
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(DelayResponse(Status::from_response(buffer)?))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DelayResponse(pub(crate) Status);
