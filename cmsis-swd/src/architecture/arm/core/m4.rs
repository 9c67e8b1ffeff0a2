//! Cortex-M4 core debug

use std::time::Duration;

use super::cortex_m::{
    read_register, write_register, Aircr, CpuId, Dcrdr, Dcrsr, Demcr, Dhcsr,
};
use super::{CoreState, CortexRegFile};
use crate::architecture::arm::poll_until;
use crate::target::{Target, TargetMemReaderWriter};
use crate::{ConfigurationError, Error};

/// Halt, run, reset and register access for a Cortex-M4, through its
/// memory mapped debug registers.
#[derive(Debug)]
pub struct CortexM4<M: TargetMemReaderWriter> {
    mem: M,
    state: CoreState,
    register_timeout: Duration,
}

impl<M: TargetMemReaderWriter> CortexM4<M> {
    /// `register_timeout` bounds the wait for every DCRDR transfer.
    pub fn new(mem: M, register_timeout: Duration) -> Self {
        CortexM4 {
            mem,
            state: CoreState::Uninitialized,
            register_timeout,
        }
    }

    /// Check that the target is a Cortex-M4.
    pub fn init(&mut self) -> Result<(), Error> {
        let cpuid: CpuId = read_register(&mut self.mem)?;
        if !cpuid.is_cortex_m4() {
            self.state = CoreState::Uninitialized;
            return Err(ConfigurationError::WrongTarget { cpuid: cpuid.into() }.into());
        }
        tracing::debug!("CPUID: {:#010x}", u32::from(cpuid));
        self.state = CoreState::Initialized;
        Ok(())
    }

    /// Stop the core wherever it is, without a reset.
    pub fn halt(&mut self, timeout: Duration) -> Result<(), Error> {
        self.check_initialized()?;
        tracing::debug!("Halt()");
        let result = write_register(&mut self.mem, Dhcsr::with_control(true, true))
            .and_then(|()| self.poll_halted(timeout));
        self.track(result, CoreState::Halted)
    }

    pub fn state(&self) -> CoreState {
        self.state
    }

    pub fn memory(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn into_memory(self) -> M {
        self.mem
    }

    fn check_initialized(&self) -> Result<(), Error> {
        match self.state {
            CoreState::Uninitialized => Err(ConfigurationError::NotInitialized.into()),
            _ => Ok(()),
        }
    }

    /// Record the outcome of an operation. After a failed transfer the core
    /// must be initialised again.
    fn track<T>(&mut self, result: Result<T, Error>, next: CoreState) -> Result<T, Error> {
        self.state = match result {
            Ok(_) => next,
            Err(Error::Configuration(_)) => self.state,
            Err(_) => CoreState::Uninitialized,
        };
        result
    }

    fn reset(&mut self, dhcsr: Dhcsr, demcr: Demcr) -> Result<(), Error> {
        write_register(&mut self.mem, dhcsr)?;
        write_register(&mut self.mem, demcr)?;
        write_register(&mut self.mem, Aircr::system_reset())
    }

    fn wait_register_ready(&mut self) -> Result<(), Error> {
        let mem = &mut self.mem;
        poll_until("core register transfer", self.register_timeout, || {
            let dhcsr: Dhcsr = read_register(&mut *mem)?;
            Ok(dhcsr.s_regrdy())
        })
    }

    fn dcrsr(reg: u16, write: bool) -> Result<Dcrsr, Error> {
        if reg > Dcrsr::MAX_SELECTOR {
            return Err(ConfigurationError::InvalidCoreRegister(reg).into());
        }
        let mut dcrsr = Dcrsr(0);
        dcrsr.set_regwnr(write);
        dcrsr.set_regsel(reg as u8);
        Ok(dcrsr)
    }

    fn read_core_reg(&mut self, reg: u16) -> Result<u32, Error> {
        write_register(&mut self.mem, Self::dcrsr(reg, false)?)?;
        self.wait_register_ready()?;
        let Dcrdr(value) = read_register(&mut self.mem)?;
        tracing::trace!("GetReg({}) == {:#x}", reg, value);
        Ok(value)
    }

    fn write_core_reg(&mut self, reg: u16, value: u32) -> Result<(), Error> {
        let dcrsr = Self::dcrsr(reg, true)?;
        tracing::trace!("SetReg({}, {:#x})", reg, value);
        write_register(&mut self.mem, Dcrdr(value))?;
        write_register(&mut self.mem, dcrsr)?;
        self.wait_register_ready()
    }

    fn poll_halted(&mut self, timeout: Duration) -> Result<(), Error> {
        let mem = &mut self.mem;
        poll_until("core halt", timeout, || {
            let dhcsr: Dhcsr = read_register(&mut *mem)?;
            tracing::trace!("WaitHalt DHCSR {:#010x}", u32::from(dhcsr));
            Ok(dhcsr.c_halt())
        })
    }
}

impl<M: TargetMemReaderWriter> Target for CortexM4<M> {
    type RegFile = CortexRegFile;

    fn reset_run(&mut self) -> Result<(), Error> {
        self.check_initialized()?;
        tracing::debug!("ResetRun()");
        let result = self.reset(Dhcsr::with_control(false, false), Demcr(0));
        self.track(result, CoreState::Running)
    }

    fn reset_halt(&mut self, timeout: Duration) -> Result<(), Error> {
        self.check_initialized()?;
        tracing::debug!("ResetHalt()");
        let result = self
            .reset(Dhcsr::with_control(true, false), Demcr::reset_vector_catch())
            .and_then(|()| self.poll_halted(timeout));
        self.track(result, CoreState::Halted)
    }

    fn get_reg(&mut self, reg: u16) -> Result<u32, Error> {
        self.check_initialized()?;
        let state = self.state;
        let result = self.read_core_reg(reg);
        self.track(result, state)
    }

    fn set_reg(&mut self, reg: u16, value: u32) -> Result<(), Error> {
        self.check_initialized()?;
        let state = self.state;
        let result = self.write_core_reg(reg, value);
        self.track(result, state)
    }

    fn get_regs(&mut self, regs: &mut CortexRegFile) -> Result<(), Error> {
        self.check_initialized()?;
        let state = self.state;

        let selectors: Vec<u16> = regs.selectors().map(|(reg, _)| reg).collect();
        for reg in selectors {
            let result = self.read_core_reg(reg);
            let value = self.track(result, state)?;
            if let Some(slot) = regs.slot(reg) {
                *slot = value;
            }
        }
        tracing::debug!("Regs: {}", regs);
        Ok(())
    }

    fn set_regs(&mut self, regs: &CortexRegFile) -> Result<(), Error> {
        self.check_initialized()?;
        tracing::debug!("SetRegs({})", regs);
        let state = self.state;

        for (reg, value) in regs.selectors() {
            let result = self.write_core_reg(reg, value);
            self.track(result, state)?;
        }
        Ok(())
    }

    fn run(&mut self, wait_halt: Option<Duration>) -> Result<(), Error> {
        self.check_initialized()?;
        tracing::debug!("Run({:?})", wait_halt);
        let result = write_register(&mut self.mem, Dhcsr::with_control(true, false));
        self.track(result, CoreState::Running)?;

        match wait_halt {
            Some(timeout) => self.wait_halt(timeout),
            None => Ok(()),
        }
    }

    fn wait_halt(&mut self, timeout: Duration) -> Result<(), Error> {
        self.check_initialized()?;
        let result = self.poll_halted(timeout);
        self.track(result, CoreState::Halted)
    }
}
