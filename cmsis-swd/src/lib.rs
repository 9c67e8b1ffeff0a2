//! # Host-side CMSIS-DAP client for Cortex-M targets
//!
//! This crate talks to a CMSIS-DAP debug probe over USB HID and uses it to control
//! an ARM Cortex-M microcontroller through SWD. It is organised in layers, each one
//! depending only on the trait of the layer beneath it:
//!
//! - [`DapClient`]: CMSIS-DAP command framing, implemented by [`CmsisDap`].
//! - [`DpClient`]: the ADIv5 Debug Port, implemented by [`DebugPort`].
//! - [`MemApClient`]: linear memory access through a MEM-AP, implemented by [`MemoryAp`].
//! - [`Target`]: halt/run/reset and core registers, implemented by [`CortexM4`].
//!
//! # Examples
//!
//! ## Halting the attached core and dumping its registers
//! ```no_run
//! # use cmsis_swd::Error;
//! use cmsis_swd::{CortexRegFile, ProbeSelector, Session, SessionConfig, Target};
//! use std::time::Duration;
//!
//! let selector: ProbeSelector = "0d28:0204".parse().unwrap();
//! let mut session = Session::open(&selector, &SessionConfig::default())?;
//!
//! let core = session.core();
//! core.reset_halt(Duration::from_secs(1))?;
//!
//! let mut regs = CortexRegFile::default();
//! core.get_regs(&mut regs)?;
//! println!("{regs}");
//!
//! session.close()?;
//! # Ok::<(), Error>(())
//! ```
//!
//! ## Reading from RAM
//! ```no_run
//! # use cmsis_swd::Error;
//! use cmsis_swd::{ProbeSelector, Session, SessionConfig, TargetMemReader};
//!
//! let selector: ProbeSelector = "0d28:0204".parse().unwrap();
//! let mut session = Session::open(&selector, &SessionConfig::default())?;
//!
//! // Read a block of 50 32 bit words.
//! let words = session.memory().read_target_mem(0x2000_0000, 50)?;
//! assert_eq!(words.len(), 50);
//! # Ok::<(), Error>(())
//! ```

pub mod architecture;
pub mod config;
mod error;
pub mod probe;
mod session;
pub mod target;

pub use crate::architecture::arm::{
    ap::memory_ap::{MemApClient, MemApRegister, MemoryAp},
    core::{m4::CortexM4, CoreState, CortexRegFile},
    dp::{DebugPort, DebugPortId, DpClient, DpRegister},
};
pub use crate::config::SessionConfig;
pub use crate::error::{ConfigurationError, Error, TimeoutKind};
pub use crate::probe::{
    cmsisdap::CmsisDap, CancelHandle, DapChannel, DapClient, DebugProbeInfo, ProbeSelector,
};
pub use crate::session::Session;
pub use crate::target::{Target, TargetMemReader, TargetMemReaderWriter, TargetMemWriter};
