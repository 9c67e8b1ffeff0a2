//! Debug registers and identification common to all Cortex-M variants

use bitfield::bitfield;

use crate::target::{TargetMemReader, TargetMemWriter};
use crate::Error;

/// A register in the System Control Space, accessed as a single word.
pub trait MemoryMappedRegister: Copy + From<u32> + Into<u32> {
    const ADDRESS: u32;
    const NAME: &'static str;
}

pub(crate) fn read_register<R: MemoryMappedRegister>(
    mem: &mut (impl TargetMemReader + ?Sized),
) -> Result<R, Error> {
    let value = mem.read_target_reg(R::ADDRESS)?;
    tracing::trace!("{} == {:#010x}", R::NAME, value);
    Ok(R::from(value))
}

pub(crate) fn write_register<R: MemoryMappedRegister>(
    mem: &mut (impl TargetMemWriter + ?Sized),
    register: R,
) -> Result<(), Error> {
    let value: u32 = register.into();
    tracing::trace!("{} = {:#010x}", R::NAME, value);
    mem.write_target_reg(R::ADDRESS, value)
}

macro_rules! memory_mapped_register {
    ($name:ident, $address:expr, $display:expr) => {
        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl MemoryMappedRegister for $name {
            const ADDRESS: u32 = $address;
            const NAME: &'static str = $display;
        }
    };
}

bitfield! {
    /// Debug Halting Control and Status Register.
    ///
    /// Writes are ignored unless the debug key is set with [`Dhcsr::enable_write`].
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Dhcsr(u32);
    impl Debug;
    pub s_reset_st, _: 25;
    pub s_retire_st, _: 24;
    pub s_lockup, _: 19;
    pub s_sleep, _: 18;
    pub s_halt, _: 17;
    /// Set once a DCRDR transfer requested through DCRSR has completed.
    pub s_regrdy, _: 16;
    pub c_maskints, set_c_maskints: 3;
    pub c_step, set_c_step: 2;
    pub c_halt, set_c_halt: 1;
    pub c_debugen, set_c_debugen: 0;
}

impl Dhcsr {
    pub fn enable_write(&mut self) {
        self.0 &= !(0xffff << 16);
        self.0 |= 0xa05f << 16;
    }

    /// A writable value with only the given control bits set.
    pub fn with_control(debugen: bool, halt: bool) -> Self {
        let mut dhcsr = Dhcsr(0);
        dhcsr.enable_write();
        dhcsr.set_c_debugen(debugen);
        dhcsr.set_c_halt(halt);
        dhcsr
    }
}

memory_mapped_register!(Dhcsr, 0xE000_EDF0, "DHCSR");

bitfield! {
    /// Debug Core Register Selector Register.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Dcrsr(u32);
    impl Debug;
    pub regwnr, set_regwnr: 16;
    pub u8, regsel, set_regsel: 6, 0;
}

impl Dcrsr {
    /// Largest selector REGSEL can hold.
    pub const MAX_SELECTOR: u16 = 0x7f;
}

memory_mapped_register!(Dcrsr, 0xE000_EDF4, "DCRSR");

/// Debug Core Register Data Register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Dcrdr(pub u32);

memory_mapped_register!(Dcrdr, 0xE000_EDF8, "DCRDR");

bitfield! {
    /// Application Interrupt and Reset Control Register.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Aircr(u32);
    impl Debug;
    pub get_vectkeystat, set_vectkey: 31, 16;
    pub endianness, _: 15;
    pub u8, prigroup, set_prigroup: 10, 8;
    pub sysresetreq, set_sysresetreq: 2;
    pub vectclractive, set_vectclractive: 1;
    pub vectreset, set_vectreset: 0;
}

impl Aircr {
    pub fn vectkey(&mut self) {
        self.set_vectkey(0x05FA);
    }

    /// Request a system reset.
    pub fn system_reset() -> Self {
        let mut aircr = Aircr(0);
        aircr.vectkey();
        aircr.set_sysresetreq(true);
        aircr
    }
}

memory_mapped_register!(Aircr, 0xE000_ED0C, "AIRCR");

bitfield! {
    /// Debug Exception and Monitor Control Register.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Demcr(u32);
    impl Debug;
    /// Global enable for DWT and ITM features
    pub trcena, set_trcena: 24;
    pub mon_req, set_mon_req: 19;
    pub mon_step, set_mon_step: 18;
    pub mon_pend, set_mon_pend: 17;
    pub mon_en, set_mon_en: 16;
    pub vc_harderr, set_vc_harderr: 10;
    pub vc_interr, set_vc_interr: 9;
    pub vc_buserr, set_vc_buserr: 8;
    pub vc_staterr, set_vc_staterr: 7;
    pub vc_chkerr, set_vc_chkerr: 6;
    pub vc_nocperr, set_vc_nocperr: 5;
    pub vc_mmerr, set_vc_mmerr: 4;
    /// Halt on the reset vector
    pub vc_corereset, set_vc_corereset: 0;
}

impl Demcr {
    /// Catch the reset vector and every fault except HardFault.
    pub fn reset_vector_catch() -> Self {
        let mut demcr = Demcr(0);
        demcr.set_vc_corereset(true);
        demcr.set_vc_mmerr(true);
        demcr.set_vc_nocperr(true);
        demcr.set_vc_chkerr(true);
        demcr.set_vc_staterr(true);
        demcr.set_vc_buserr(true);
        demcr.set_vc_interr(true);
        demcr
    }
}

memory_mapped_register!(Demcr, 0xE000_EDFC, "DEMCR");

bitfield! {
    /// CPUID Base Register.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct CpuId(u32);
    impl Debug;
    pub u8, implementer, _: 31, 24;
    pub u8, variant, _: 23, 20;
    pub u8, architecture, _: 19, 16;
    pub u16, partno, _: 15, 4;
    pub u8, revision, _: 3, 0;
}

impl CpuId {
    pub const IMPLEMENTER_ARM: u8 = 0x41;

    /// Any revision of an ARM Cortex-M4.
    pub fn is_cortex_m4(&self) -> bool {
        self.0 & 0xff00_fff0 == 0x4100_c240
    }

    pub fn part_name(&self) -> Option<&'static str> {
        match self.partno() {
            0xc20 => Some("Cortex-M0"),
            0xc60 => Some("Cortex-M0+"),
            0xc21 => Some("Cortex-M1"),
            0xc23 => Some("Cortex-M3"),
            0xc24 => Some("Cortex-M4"),
            0xc27 => Some("Cortex-M7"),
            _ => None,
        }
    }
}

memory_mapped_register!(CpuId, 0xE000_ED00, "CPUID");

/// Peripheral ID0 of the System Control Space ROM table entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pid0(pub u32);

impl Pid0 {
    /// PID0 value of a Cortex-M4 with FPU.
    const CORTEX_M4F: u32 = 0xc;

    pub fn has_fpu(&self) -> bool {
        self.0 == Self::CORTEX_M4F
    }
}

memory_mapped_register!(Pid0, 0xE000_EFE0, "PID0");

/// A human readable name for the core, such as `ARM Cortex-M4F r0p1`.
///
/// Unknown implementers and parts are left blank.
pub fn target_name(cpuid: u32, pid0: u32) -> String {
    let cpuid = CpuId(cpuid);
    let vendor = match cpuid.implementer() {
        CpuId::IMPLEMENTER_ARM => "ARM",
        _ => "",
    };
    let fpu = if Pid0(pid0).has_fpu() { "F" } else { "" };

    format!(
        "{} {}{} r{}p{}",
        vendor,
        cpuid.part_name().unwrap_or(""),
        fpu,
        cpuid.variant(),
        cpuid.revision()
    )
}

/// Read CPUID and PID0 from the target and name the core.
pub fn identify(mem: &mut (impl TargetMemReader + ?Sized)) -> Result<String, Error> {
    let cpuid: CpuId = read_register(mem)?;
    let pid0: Pid0 = read_register(mem)?;
    tracing::debug!("CPUID: {:#010x}, PID0: {:#010x}", cpuid.0, pid0.0);
    Ok(target_name(cpuid.0, pid0.0))
}
