/// Implementation of the DAP_SWJ_Sequence command
use super::super::{CommandId, FramingError, Request, Status};
use crate::ConfigurationError;

#[derive(Clone, Copy, Debug)]
pub struct SequenceRequest {
    bit_count: u8,
    data: [u8; 32],
}

impl SequenceRequest {
    /// Sends the first `bits` bits of `data`, LSB of the first byte first.
    ///
    /// Between 1 and 256 bits can be sent, and `data` must hold at least
    /// `bits` bits.
    pub(crate) fn new(bits: usize, data: &[u8]) -> Result<SequenceRequest, ConfigurationError> {
        let byte_len = bits.div_ceil(8);
        if !(1..=256).contains(&bits) || data.len() < byte_len {
            return Err(ConfigurationError::InvalidSequenceLength {
                bits,
                bytes: data.len(),
            });
        }

        let mut owned_data = [0u8; 32];
        owned_data[..byte_len].copy_from_slice(&data[..byte_len]);

        Ok(SequenceRequest {
            // A bit count of zero means 256 bits.
            bit_count: (bits % 256) as u8,
            data: owned_data,
        })
    }

    fn byte_len(&self) -> usize {
        match self.bit_count {
            0 => 32,
            n => usize::from(n).div_ceil(8),
        }
    }
}

impl Request for SequenceRequest {
    const COMMAND_ID: CommandId = CommandId::SwjSequence;

    type Response = SequenceResponse;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.bit_count);
        buffer.extend_from_slice(&self.data[..self.byte_len()]);
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(SequenceResponse(Status::from_response(buffer)?))
    }
}

#[derive(Debug)]
pub struct SequenceResponse(pub(crate) Status);

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test]
    fn line_reset() {
        let mut buffer = vec![];
        SequenceRequest::new(64, &[0xff; 8])
            .unwrap()
            .to_bytes(&mut buffer);
        assert_eq!(buffer, [64, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn partial_byte() {
        let mut buffer = vec![];
        SequenceRequest::new(12, &[0x9e, 0xe7, 0x55])
            .unwrap()
            .to_bytes(&mut buffer);
        assert_eq!(buffer, [12, 0x9e, 0xe7]);
    }

    #[test]
    fn full_length_is_encoded_as_zero() {
        let mut buffer = vec![];
        SequenceRequest::new(256, &[0xaa; 32])
            .unwrap()
            .to_bytes(&mut buffer);
        assert_eq!(buffer[0], 0);
        assert_eq!(buffer.len(), 33);
    }

    #[test_case(0, 1; "no bits")]
    #[test_case(257, 33; "too many bits")]
    #[test_case(16, 1; "not enough data")]
    fn invalid_lengths(bits: usize, bytes: usize) {
        let data = vec![0u8; bytes];
        assert_eq!(
            SequenceRequest::new(bits, &data).unwrap_err(),
            ConfigurationError::InvalidSequenceLength { bits, bytes }
        );
    }
}
