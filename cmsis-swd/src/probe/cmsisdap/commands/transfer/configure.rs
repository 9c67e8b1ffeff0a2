use super::super::{CommandId, FramingError, Request, Status};

/// The DAP_TransferConfigure Command sets parameters for DAP_Transfer and DAP_TransferBlock.
#[derive(Debug)]
pub struct ConfigureRequest {
    /// Number of extra idle cycles after each transfer.
    pub idle_cycles: u8,
    /// Number of transfer retries after WAIT response.
    pub wait_retry: u16,
    /// Number of retries on reads with Value Match in DAP_Transfer. On value mismatch the Register is read again until its value matches or the Match Retry count exceeds.
    pub match_retry: u16,
}

impl Request for ConfigureRequest {
    const COMMAND_ID: CommandId = CommandId::TransferConfigure;

    type Response = ConfigureResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.idle_cycles);
        buffer.extend_from_slice(&self.wait_retry.to_le_bytes());
        buffer.extend_from_slice(&self.match_retry.to_le_bytes());
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(ConfigureResponse(Status::from_response(buffer)?))
    }
}

#[derive(Debug)]
pub struct ConfigureResponse(pub(crate) Status);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn argument_layout() {
        let mut buffer = vec![];
        ConfigureRequest {
            idle_cycles: 0,
            wait_retry: 100,
            match_retry: 0x1234,
        }
        .to_bytes(&mut buffer);
        assert_eq!(buffer, [0x00, 0x64, 0x00, 0x34, 0x12]);
    }
}
