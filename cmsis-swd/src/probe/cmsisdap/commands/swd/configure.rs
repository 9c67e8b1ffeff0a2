use super::super::{CommandId, FramingError, Request, Status};

/// DAP_SWD_Configure.
///
/// Bits 0..1 select the turnaround clock period minus one, bit 2 forces a
/// data phase on WAIT and FAULT responses.
#[derive(Clone, Copy, Debug)]
pub struct ConfigureRequest(pub(crate) u8);

impl Request for ConfigureRequest {
    const COMMAND_ID: CommandId = CommandId::SwdConfigure;

    type Response = ConfigureResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.0);
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(ConfigureResponse(Status::from_response(buffer)?))
    }
}

#[derive(Debug)]
pub struct ConfigureResponse(pub(crate) Status);
