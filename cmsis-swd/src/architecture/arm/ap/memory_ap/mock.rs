use std::collections::HashMap;

use crate::target::{TargetMemReader, TargetMemWriter};
use crate::{ConfigurationError, Error};

/// One access seen by [`MockMemory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemOp {
    Read(u32),
    Write(u32, u32),
}

/// Sparse word memory recording every access, for testing code above the MEM-AP.
#[derive(Debug, Default)]
pub(crate) struct MockMemory {
    pub words: HashMap<u32, u32>,
    pub log: Vec<MemOp>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words(words: &[(u32, u32)]) -> Self {
        MockMemory {
            words: words.iter().copied().collect(),
            log: Vec::new(),
        }
    }

    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.log
            .iter()
            .filter_map(|op| match *op {
                MemOp::Write(address, value) => Some((address, value)),
                MemOp::Read(_) => None,
            })
            .collect()
    }

    fn check_alignment(address: u32) -> Result<(), Error> {
        if address % 4 != 0 {
            return Err(ConfigurationError::UnalignedAddress { address }.into());
        }
        Ok(())
    }
}

impl TargetMemReader for MockMemory {
    fn read_target_reg(&mut self, address: u32) -> Result<u32, Error> {
        Self::check_alignment(address)?;
        self.log.push(MemOp::Read(address));
        Ok(self.words.get(&address).copied().unwrap_or(0))
    }

    fn read_target_mem(&mut self, address: u32, words: usize) -> Result<Vec<u32>, Error> {
        (0..words as u32)
            .map(|i| self.read_target_reg(address.wrapping_add(4 * i)))
            .collect()
    }
}

impl TargetMemWriter for MockMemory {
    fn write_target_reg(&mut self, address: u32, value: u32) -> Result<(), Error> {
        Self::check_alignment(address)?;
        self.log.push(MemOp::Write(address, value));
        self.words.insert(address, value);
        Ok(())
    }

    fn write_target_mem(&mut self, address: u32, data: &[u32]) -> Result<(), Error> {
        for (i, &value) in data.iter().enumerate() {
            self.write_target_reg(address.wrapping_add(4 * i as u32), value)?;
        }
        Ok(())
    }
}
