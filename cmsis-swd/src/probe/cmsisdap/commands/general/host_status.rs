use super::super::{CommandId, FramingError, Request, Status};

/// The host status indicator to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostStatusKind {
    Connected = 0x00,
    Running = 0x01,
}

#[derive(Clone, Copy, Debug)]
pub struct HostStatusRequest {
    status_type: HostStatusKind,
    status: bool,
}

impl HostStatusRequest {
    pub fn new(status_type: HostStatusKind, status: bool) -> Self {
        HostStatusRequest {
            status_type,
            status,
        }
    }
}

impl Request for HostStatusRequest {
    const COMMAND_ID: CommandId = CommandId::HostStatus;

    type Response = HostStatusResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.status_type as u8);
        buffer.push(self.status as u8);
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(HostStatusResponse(Status::from_response(buffer)?))
    }
}

#[derive(Copy, Clone, Debug)]
pub struct HostStatusResponse(pub(crate) Status);
