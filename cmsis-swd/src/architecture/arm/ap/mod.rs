//! Access ports behind an ADIv5 debug port.

pub mod memory_ap;

/// An AP register address split into the bank selected through SELECT and
/// the offset addressed by A2/A3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApRegAddress {
    pub bank: u8,
    pub offset: u8,
}

impl From<u8> for ApRegAddress {
    fn from(reg: u8) -> Self {
        ApRegAddress {
            bank: reg / 16,
            offset: reg % 16,
        }
    }
}
