use super::super::{CommandId, FramingError, Request};

use scroll::{Pread, LE};

/// DAP_Info with an arbitrary info ID.
///
/// The response is returned as received, starting with the length byte.
#[derive(Clone, Copy, Debug)]
pub struct InfoRequest(pub u8);

impl Request for InfoRequest {
    const COMMAND_ID: CommandId = CommandId::Info;

    type Response = Vec<u8>;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.0);
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        Ok(buffer.to_vec())
    }
}

macro_rules! info_command {
    ($id:expr, $name:ident, $response_type:ty) => {
        #[derive(Clone, Copy, Default, Debug)]
        pub struct $name;

        impl $name {
            pub const ID: u8 = $id;
        }

        impl Request for $name {
            const COMMAND_ID: CommandId = CommandId::Info;

            type Response = $response_type;

            fn to_bytes(&self, buffer: &mut Vec<u8>) {
                buffer.push($id);
            }

            fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
                ParseFromResponse::from_response(buffer)
            }
        }
    };
}

info_command!(0x01, VendorCommand, Option<String>);

info_command!(0x02, ProductIdCommand, Option<String>);

info_command!(0x03, SerialNumberCommand, Option<String>);

info_command!(0x04, FirmwareVersionCommand, Option<String>);

info_command!(0x05, TargetDeviceVendorCommand, Option<String>);

info_command!(0x06, TargetDeviceNameCommand, Option<String>);

info_command!(0xF0, CapabilitiesCommand, Capabilities);

info_command!(0xFE, PacketCountCommand, u8);

/// DAP_Info(0xFF), the maximum packet size.
///
/// Some probes report a wrong length byte here, so only the value
/// following it is looked at.
#[derive(Clone, Copy, Default, Debug)]
pub struct PacketSizeCommand;

impl Request for PacketSizeCommand {
    const COMMAND_ID: CommandId = CommandId::Info;

    type Response = u16;

    fn to_bytes(&self, buffer: &mut Vec<u8>) {
        buffer.push(0xFF);
    }

    fn parse_response(&self, buffer: &[u8]) -> Result<Self::Response, FramingError> {
        buffer
            .pread_with(1, LE)
            .map_err(|_| FramingError::NotEnoughData)
    }
}

trait ParseFromResponse: Sized {
    fn from_response(buffer: &[u8]) -> Result<Self, FramingError>;
}

impl ParseFromResponse for Option<String> {
    /// Create a String out of the received buffer.
    ///
    /// The length of the buffer is read from the first byte of the buffer.
    /// If the length is zero, no string is returned.
    fn from_response(buffer: &[u8]) -> Result<Self, FramingError> {
        let string_len = *buffer.first().ok_or(FramingError::NotEnoughData)? as usize;

        match string_len {
            0 => Ok(None),
            n => {
                let raw = buffer
                    .get(1..1 + n)
                    .ok_or(FramingError::UnexpectedInfoLength {
                        expected: n,
                        got: buffer.len() - 1,
                    })?;
                // Probes are allowed to include the zero terminator.
                let res = std::str::from_utf8(raw)?.trim_end_matches('\0');
                Ok(Some(res.to_owned()))
            }
        }
    }
}

impl ParseFromResponse for u8 {
    fn from_response(buffer: &[u8]) -> Result<Self, FramingError> {
        match buffer.first() {
            Some(1) => buffer
                .pread_with(1, LE)
                .map_err(|_| FramingError::NotEnoughData),
            Some(&n) => Err(FramingError::UnexpectedInfoLength {
                expected: 1,
                got: n as usize,
            }),
            None => Err(FramingError::NotEnoughData),
        }
    }
}

/// The probe capabilities reported by DAP_Info(0xF0).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub swd_implemented: bool,
    pub jtag_implemented: bool,
    pub swo_uart_implemented: bool,
    pub swo_manchester_implemented: bool,
    pub atomic_commands_implemented: bool,
    pub test_domain_timer_implemented: bool,
    pub swo_streaming_trace_implemented: bool,
    pub uart_communication_port_implemented: bool,
    pub uart_com_port_implemented: bool,
}

impl ParseFromResponse for Capabilities {
    fn from_response(buffer: &[u8]) -> Result<Self, FramingError> {
        // The response can contain two info bytes, only the first one is mandatory.
        let len = *buffer.first().ok_or(FramingError::NotEnoughData)?;
        if len == 0 {
            return Err(FramingError::UnexpectedInfoLength {
                expected: 1,
                got: 0,
            });
        }
        let first = *buffer.get(1).ok_or(FramingError::NotEnoughData)?;

        let mut capabilities = Capabilities {
            swd_implemented: first & 0x01 > 0,
            jtag_implemented: first & 0x02 > 0,
            swo_uart_implemented: first & 0x04 > 0,
            swo_manchester_implemented: first & 0x08 > 0,
            atomic_commands_implemented: first & 0x10 > 0,
            test_domain_timer_implemented: first & 0x20 > 0,
            swo_streaming_trace_implemented: first & 0x40 > 0,
            uart_communication_port_implemented: first & 0x80 > 0,
            uart_com_port_implemented: false,
        };

        if len >= 2 {
            let second = *buffer.get(2).ok_or(FramingError::NotEnoughData)?;
            capabilities.uart_com_port_implemented = second & 0x01 != 0;
        }

        Ok(capabilities)
    }
}
