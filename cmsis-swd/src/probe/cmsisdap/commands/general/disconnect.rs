use super::super::{CommandId, FramingError, Request, Status};

#[derive(Clone, Copy, Debug)]
pub struct DisconnectRequest;

impl Request for DisconnectRequest {
    const COMMAND_ID: CommandId = CommandId::Disconnect;

    type Response = DisconnectResponse;

    fn to_bytes(&self, _buffer: &mut Vec<u8>) {}

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(DisconnectResponse(Status::from_response(buffer)?))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DisconnectResponse(pub(crate) Status);
