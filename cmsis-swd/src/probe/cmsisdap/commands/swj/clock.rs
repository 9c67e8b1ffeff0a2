use super::super::{CommandId, FramingError, Request, Status};

/// DAP_SWJ_Clock, sets the SWD/JTAG clock frequency in Hz.
#[derive(Clone, Copy, Debug)]
pub struct SwjClockRequest(pub(crate) u32);

impl Request for SwjClockRequest {
    const COMMAND_ID: CommandId = CommandId::SwjClock;

    type Response = SwjClockResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.0.to_le_bytes());
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(SwjClockResponse(Status::from_response(buffer)?))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SwjClockResponse(pub(crate) Status);
