//! Memory access port

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;

use bitfield::bitfield;

use crate::architecture::arm::dp::DpClient;
use crate::target::{TargetMemReader, TargetMemWriter};
use crate::{ConfigurationError, Error};

/// TAR only auto-increments within an aligned block of this size.
const AUTO_INCREMENT_BLOCK: u32 = 0x400;

/// The MEM-AP registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemApRegister {
    Csw = 0x00,
    Tar = 0x04,
    Drw = 0x0C,
    Bd0 = 0x10,
    Bd1 = 0x14,
    Bd2 = 0x18,
    Bd3 = 0x1C,
    Base = 0xF8,
}

impl MemApRegister {
    pub fn address(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MemApRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemApRegister::Csw => "CSW",
            MemApRegister::Tar => "TAR",
            MemApRegister::Drw => "DRW",
            MemApRegister::Bd0 => "BD0",
            MemApRegister::Bd1 => "BD1",
            MemApRegister::Bd2 => "BD2",
            MemApRegister::Bd3 => "BD3",
            MemApRegister::Base => "BASE",
        })
    }
}

bitfield! {
    /// Control/Status Word.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Csw(u32);
    impl Debug;
    pub dbg_sw_enable, set_dbg_sw_enable: 31;
    pub u8, prot, set_prot: 30, 24;
    pub spiden, _: 23;
    pub u8, mode, set_mode: 11, 8;
    pub tr_in_prog, _: 7;
    pub device_en, _: 6;
    pub u8, addr_inc, set_addr_inc: 5, 4;
    pub u8, size, set_size: 2, 0;
}

impl Csw {
    /// Basic mode, 32 bit accesses, TAR incremented after every access.
    pub fn word_auto_increment() -> Self {
        let mut csw = Csw(0);
        csw.set_prot(0x23);
        csw.set_addr_inc(0b01);
        csw.set_size(0b010);
        // DeviceEn is read-only, but is written back as set.
        Csw(csw.0 | 0x40)
    }
}

/// Access to the target address space through a MEM-AP.
pub trait MemApClient: TargetMemReader + TargetMemWriter {
    /// Check the AP is enabled and configure it for word-sized auto-incrementing accesses.
    fn init(&mut self) -> Result<(), Error>;

    fn read_reg(&mut self, reg: MemApRegister) -> Result<u32, Error>;

    fn write_reg(&mut self, reg: MemApRegister, value: u32) -> Result<(), Error>;
}

/// A MEM-AP behind a debug port.
#[derive(Debug)]
pub struct MemoryAp<D: DpClient> {
    dp: D,
    ap_sel: u8,
}

impl<D: DpClient> MemoryAp<D> {
    pub fn new(dp: D, ap_sel: u8) -> Self {
        MemoryAp { dp, ap_sel }
    }

    pub fn ap_sel(&self) -> u8 {
        self.ap_sel
    }

    pub fn dp(&mut self) -> &mut D {
        &mut self.dp
    }

    pub fn into_dp(self) -> D {
        self.dp
    }

    fn check_alignment(address: u32) -> Result<(), ConfigurationError> {
        if address % 4 != 0 {
            return Err(ConfigurationError::UnalignedAddress { address });
        }
        Ok(())
    }

    /// Number of words that can be transferred from `address` before TAR wraps.
    fn words_until_wrap(address: u32) -> usize {
        ((AUTO_INCREMENT_BLOCK - (address & (AUTO_INCREMENT_BLOCK - 1))) / 4) as usize
    }
}

impl<D: DpClient> MemApClient for MemoryAp<D> {
    fn init(&mut self) -> Result<(), Error> {
        let csw = Csw(self.read_reg(MemApRegister::Csw)?);
        if !csw.device_en() {
            return Err(ConfigurationError::MemApDisabled {
                ap_sel: self.ap_sel,
                csw: csw.0,
            }
            .into());
        }
        self.write_reg(MemApRegister::Csw, Csw::word_auto_increment().0)
    }

    fn read_reg(&mut self, reg: MemApRegister) -> Result<u32, Error> {
        let value = self.dp.read_ap_reg(self.ap_sel, reg.address())?;
        tracing::debug!("{} == {:#010x}", reg, value);
        Ok(value)
    }

    fn write_reg(&mut self, reg: MemApRegister, value: u32) -> Result<(), Error> {
        tracing::debug!("{} = {:#010x}", reg, value);
        self.dp.write_ap_reg(self.ap_sel, reg.address(), value)
    }
}

impl<D: DpClient> TargetMemReader for MemoryAp<D> {
    fn read_target_reg(&mut self, address: u32) -> Result<u32, Error> {
        Self::check_alignment(address)?;
        self.write_reg(MemApRegister::Tar, address)?;
        let value = self.read_reg(MemApRegister::Drw)?;
        tracing::debug!("ReadTargetReg({:#010x}) == {:#010x}", address, value);
        Ok(value)
    }

    fn read_target_mem(&mut self, address: u32, words: usize) -> Result<Vec<u32>, Error> {
        tracing::debug!("ReadTargetMem({:#010x}, {})", address, words);
        Self::check_alignment(address)?;

        let mut data = Vec::with_capacity(words);
        let mut address = address;
        while data.len() < words {
            self.write_reg(MemApRegister::Tar, address)?;
            let chunk = Self::words_until_wrap(address).min(words - data.len());
            data.extend(
                self.dp
                    .read_ap_reg_multi(self.ap_sel, MemApRegister::Drw.address(), chunk)?,
            );
            address = address.wrapping_add(chunk as u32 * 4);
        }
        Ok(data)
    }
}

impl<D: DpClient> TargetMemWriter for MemoryAp<D> {
    fn write_target_reg(&mut self, address: u32, value: u32) -> Result<(), Error> {
        Self::check_alignment(address)?;
        self.write_reg(MemApRegister::Tar, address)?;
        tracing::debug!("WriteTargetReg({:#010x}, {:#010x})", address, value);
        self.write_reg(MemApRegister::Drw, value)
    }

    fn write_target_mem(&mut self, address: u32, data: &[u32]) -> Result<(), Error> {
        tracing::debug!("WriteTargetMem({:#010x}, {})", address, data.len());
        Self::check_alignment(address)?;

        let mut address = address;
        let mut rest = data;
        while !rest.is_empty() {
            self.write_reg(MemApRegister::Tar, address)?;
            let (chunk, tail) = rest.split_at(Self::words_until_wrap(address).min(rest.len()));
            self.dp
                .write_ap_reg_multi(self.ap_sel, MemApRegister::Drw.address(), chunk)?;
            address = address.wrapping_add(chunk.len() as u32 * 4);
            rest = tail;
        }
        Ok(())
    }
}
