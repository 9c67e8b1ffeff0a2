//! Cortex-M cores, driven through their memory mapped debug registers.

use std::fmt;

pub mod cortex_m;
pub mod m4;

/// Selector of the stack pointer, an alias for R13.
pub const SP: u16 = 13;
/// Selector of the link register, an alias for R14.
pub const LR: u16 = 14;
/// Selector of the program counter, an alias for R15.
pub const PC: u16 = 15;
pub const XPSR: u16 = 0x10;
pub const MSP: u16 = 0x11;
pub const PSP: u16 = 0x12;

/// The lifecycle of a core debug client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    /// The core identity has not been checked yet, or the last operation faulted.
    Uninitialized,
    Initialized,
    Halted,
    Running,
}

/// The core registers of a Cortex-M, as transferred while the core is halted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CortexRegFile {
    /// R0 to R15, where R13 to R15 are [`SP`], [`LR`] and [`PC`].
    pub r: [u32; 16],
    pub xpsr: u32,
    pub msp: u32,
    pub psp: u32,
}

impl CortexRegFile {
    pub fn sp(&self) -> u32 {
        self.r[SP as usize]
    }

    pub fn lr(&self) -> u32 {
        self.r[LR as usize]
    }

    pub fn pc(&self) -> u32 {
        self.r[PC as usize]
    }

    /// All registers in transfer order, paired with their DCRSR selector.
    pub(crate) fn selectors(&self) -> impl Iterator<Item = (u16, u32)> + '_ {
        self.r
            .iter()
            .enumerate()
            .map(|(i, &value)| (i as u16, value))
            .chain([(XPSR, self.xpsr), (MSP, self.msp), (PSP, self.psp)])
    }

    pub(crate) fn slot(&mut self, selector: u16) -> Option<&mut u32> {
        match selector {
            0..=15 => self.r.get_mut(selector as usize),
            XPSR => Some(&mut self.xpsr),
            MSP => Some(&mut self.msp),
            PSP => Some(&mut self.psp),
            _ => None,
        }
    }
}

impl fmt::Display for CortexRegFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.r[..13].iter().enumerate() {
            write!(f, "R{i}={value:#x} ")?;
        }
        write!(
            f,
            "SP={:#x} LR={:#x} PC={:#x} xPSR={:#x} MSP={:#x} PSP={:#x}]",
            self.sp(),
            self.lr(),
            self.pc(),
            self.xpsr,
            self.msp,
            self.psp
        )
    }
}
