//! Capabilities offered to code that programs or debugs a target.
//!
//! Flash loaders and debuggers are written against these traits only, so they
//! work with any probe stack (or a test double) that implements them.

use std::time::Duration;

use crate::Error;

/// Reads 32 bit words from the target address space.
pub trait TargetMemReader {
    /// Read a single word, handy for memory mapped registers.
    fn read_target_reg(&mut self, address: u32) -> Result<u32, Error>;

    /// Read `words` consecutive words starting at `address`, which must be word aligned.
    fn read_target_mem(&mut self, address: u32, words: usize) -> Result<Vec<u32>, Error>;
}

/// Writes 32 bit words to the target address space.
pub trait TargetMemWriter {
    /// Write a single word.
    fn write_target_reg(&mut self, address: u32, value: u32) -> Result<(), Error>;

    /// Write `data` starting at `address`, which must be word aligned.
    fn write_target_mem(&mut self, address: u32, data: &[u32]) -> Result<(), Error>;
}

pub trait TargetMemReaderWriter: TargetMemReader + TargetMemWriter {}

impl<T: TargetMemReader + TargetMemWriter> TargetMemReaderWriter for T {}

/// Run control and register access of a target core.
pub trait Target {
    /// The full set of core registers, as transferred by [`Target::get_regs`].
    type RegFile;

    /// Reset the system and let it run without debug.
    fn reset_run(&mut self) -> Result<(), Error>;

    /// Reset the system and halt the core on the reset vector.
    fn reset_halt(&mut self, timeout: Duration) -> Result<(), Error>;

    /// Read a core register. The core must be halted.
    fn get_reg(&mut self, reg: u16) -> Result<u32, Error>;

    /// Write a core register. The core must be halted.
    fn set_reg(&mut self, reg: u16, value: u32) -> Result<(), Error>;

    fn get_regs(&mut self, regs: &mut Self::RegFile) -> Result<(), Error>;

    fn set_regs(&mut self, regs: &Self::RegFile) -> Result<(), Error>;

    /// Release the core from halt.
    ///
    /// With `wait_halt` set, block until the core halts again, for at most the
    /// given time.
    fn run(&mut self, wait_halt: Option<Duration>) -> Result<(), Error>;

    /// Wait until the core halts.
    fn wait_halt(&mut self, timeout: Duration) -> Result<(), Error>;
}
