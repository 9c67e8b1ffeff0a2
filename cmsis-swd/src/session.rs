use crate::architecture::arm::{
    ap::memory_ap::{MemApClient, MemoryAp},
    core::{cortex_m, m4::CortexM4},
    dp::{DebugPort, DebugPortId, DpClient},
};
use crate::probe::{cmsisdap::CmsisDap, ConnectMode, DapClient, HostStatusKind, ProbeSelector};
use crate::{Error, SessionConfig};

/// SWD line reset: at least 50 clocks with SWDIO high.
const LINE_RESET: [u8; 8] = [0xff; 8];
/// Idle clocks with SWDIO low.
const IDLE: [u8; 2] = [0x00; 2];
/// The 16 bit JTAG-to-SWD select sequence 0xE79E, LSB first.
const JTAG_TO_SWD: [u8; 2] = [0x9e, 0xe7];

/// An attached Cortex-M4 target, reached through a CMSIS-DAP probe.
///
/// The session owns the whole stack: probe, debug port, MEM-AP and core.
#[derive(Debug)]
pub struct Session<P: DapClient = CmsisDap> {
    core: CortexM4<MemoryAp<DebugPort<P>>>,
    dp_id: DebugPortId,
    target_name: String,
}

impl Session<CmsisDap> {
    /// Open the probe matching `selector` and attach to its target.
    pub fn open(selector: &ProbeSelector, config: &SessionConfig) -> Result<Self, Error> {
        let probe = CmsisDap::open(selector, config.response_timeout)?;
        tracing::info!("Opened probe {} ({:?})", selector, probe);
        Self::attach(probe, config)
    }
}

impl<P: DapClient> Session<P> {
    /// Bring up the SWD link and initialise every layer down to the core.
    pub fn attach(mut probe: P, config: &SessionConfig) -> Result<Self, Error> {
        probe.connect(ConnectMode::UseSwd)?;
        probe.swj_clock(config.swj_clock_hz)?;
        probe.swd_configure(0)?;

        // Reset the line, switch a JTAG/SWD port to SWD, and reset again.
        probe.swj_sequence(64, &LINE_RESET)?;
        probe.swj_sequence(16, &IDLE)?;
        probe.swj_sequence(64, &LINE_RESET)?;
        probe.swj_sequence(16, &JTAG_TO_SWD)?;
        probe.swj_sequence(64, &LINE_RESET)?;
        probe.swj_sequence(16, &IDLE)?;

        probe.transfer_configure(config.idle_cycles, config.wait_retry, config.match_retry)?;

        let mut dp = DebugPort::new(probe);
        dp.init(config.poll_timeout)?;
        let dp_id = dp.idr()?;

        let mut mem = MemoryAp::new(dp, config.ap_sel);
        mem.init()?;
        let target_name = cortex_m::identify(&mut mem)?;
        tracing::info!("Core: {}, DP: {}", target_name, dp_id);

        let mut core = CortexM4::new(mem, config.register_timeout);
        core.init()?;

        let probe = core.memory().dp().probe();
        if let Err(e) = probe.set_host_status(HostStatusKind::Connected, true) {
            tracing::warn!("Failed to set the connected indicator: {}", e);
        }

        Ok(Session {
            core,
            dp_id,
            target_name,
        })
    }

    pub fn core(&mut self) -> &mut CortexM4<MemoryAp<DebugPort<P>>> {
        &mut self.core
    }

    pub fn memory(&mut self) -> &mut MemoryAp<DebugPort<P>> {
        self.core.memory()
    }

    pub fn dp(&mut self) -> &mut DebugPort<P> {
        self.core.memory().dp()
    }

    pub fn probe(&mut self) -> &mut P {
        self.core.memory().dp().probe()
    }

    /// The DPIDR read during bring-up.
    pub fn dp_id(&self) -> &DebugPortId {
        &self.dp_id
    }

    /// The core name, such as `ARM Cortex-M4F r0p1`.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Disconnect from the target and release the probe.
    pub fn close(self) -> Result<(), Error> {
        let mut probe = self.core.into_memory().into_dp().into_probe();

        if let Err(e) = probe.set_host_status(HostStatusKind::Connected, false) {
            tracing::warn!("Failed to clear the connected indicator: {}", e);
        }
        let disconnected = probe.disconnect();
        probe.close()?;
        disconnected
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::probe::fake_probe::MockDap;
    use crate::{ConfigurationError, CoreState, TargetMemReader};
    use pretty_assertions::assert_eq;

    fn cortex_m4() -> MockDap {
        let mut probe = MockDap::new();
        probe.memory.insert(0xE000_ED00, 0x410F_C241);
        probe.memory.insert(0xE000_EFE0, 0xC);
        probe
    }

    #[test]
    fn bring_up() {
        let mut session = Session::attach(cortex_m4(), &SessionConfig::default()).unwrap();

        assert_eq!(session.target_name(), "ARM Cortex-M4F r0p1");
        assert_eq!(session.dp_id().raw, 0x2ba0_1477);
        assert_eq!(session.core().state(), CoreState::Initialized);

        let probe = session.probe();
        let commands = probe.commands.borrow().clone();
        assert_eq!(
            &commands[..4],
            &["connect", "swj_clock", "swd_configure", "swj_sequence"]
        );
        assert_eq!(
            probe.swj_sequences,
            vec![
                (64, vec![0xff; 8]),
                (16, vec![0x00, 0x00]),
                (64, vec![0xff; 8]),
                (16, vec![0x9e, 0xe7]),
                (64, vec![0xff; 8]),
                (16, vec![0x00, 0x00]),
            ]
        );
        assert_eq!(&commands[9..], &["transfer_configure", "host_status"]);
        assert_eq!(probe.csw, 0x2300_0052);
    }

    #[test]
    fn memory_access_through_session() {
        let mut probe = cortex_m4();
        probe.memory.insert(0x2000_0000, 0xdead_beef);
        let mut session = Session::attach(probe, &SessionConfig::default()).unwrap();

        assert_eq!(
            session.memory().read_target_mem(0x2000_0000, 2).unwrap(),
            vec![0xdead_beef, 0]
        );
    }

    #[test]
    fn wrong_core_is_rejected() {
        let mut probe = cortex_m4();
        probe.memory.insert(0xE000_ED00, 0x4100_C3A0);

        let err = Session::attach(probe, &SessionConfig::default()).unwrap_err();

        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::WrongTarget { cpuid: 0x4100_C3A0 })
        ));
    }

    #[test]
    fn disabled_ap_stops_bring_up() {
        let mut probe = cortex_m4();
        probe.csw = 0;
        let config = SessionConfig {
            ap_sel: 2,
            ..SessionConfig::default()
        };

        let err = Session::attach(probe, &config).unwrap_err();

        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::MemApDisabled { ap_sel: 2, .. })
        ));
    }

    #[test]
    fn close_disconnects() {
        let mut session = Session::attach(cortex_m4(), &SessionConfig::default()).unwrap();
        let commands = session.probe().commands.clone();
        commands.borrow_mut().clear();

        session.close().unwrap();

        assert_eq!(*commands.borrow(), ["host_status", "disconnect", "close"]);
    }
}
