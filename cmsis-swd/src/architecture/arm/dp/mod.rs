//! The ADIv5 Debug Port.

use std::fmt;
use std::time::Duration;

use bitfield::bitfield;
use jep106::JEP106Code;

use super::{ap::ApRegAddress, poll_until};
use crate::probe::{CommandId, DapClient, FramingError, TransferRequest};
use crate::{ConfigurationError, Error};

/// Value written to CTRL/STAT at the end of [`DpClient::init`]: keep both power
/// requests and set MASKLANE to all byte lanes.
const CTRL_STAT_INIT: u32 = 0x5000_0F00;

/// The DP registers reachable with DPBANKSEL 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpRegister {
    Idr = 0x0,
    CtrlStat = 0x4,
    Select = 0x8,
    RdBuff = 0xC,
}

impl DpRegister {
    pub fn address(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for DpRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DpRegister::Idr => "DPIDR",
            DpRegister::CtrlStat => "CTRL/STAT",
            DpRegister::Select => "SELECT",
            DpRegister::RdBuff => "RDBUFF",
        })
    }
}

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Ctrl(u32);
    impl Debug;
    pub csyspwrupack, _: 31;
    pub csyspwrupreq, set_csyspwrupreq: 30;
    pub cdbgpwrupack, _: 29;
    pub cdbgpwrupreq, set_cdbgpwrupreq: 28;
    pub cdbgrstack, _: 27;
    pub c_dbg_rst_req, set_c_dbg_rst_req: 26;
    pub u16, trn_cnt, set_trn_cnt: 23, 12;
    pub u8, mask_lane, set_mask_lane: 11, 8;
    pub w_data_err, _ : 7;
    pub read_ok, _ : 6;
    pub sticky_err, _: 5;
    pub stick_cmp, _: 4;
    pub u8, trn_mode, _: 3, 2;
    pub sticky_orun, _: 1;
    pub orun_detect, set_orun_detect: 0;
}

impl Ctrl {
    const POWER_MASK: u32 = 0xF000_0000;
    const RESET_MASK: u32 = 0x0C00_0000;
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Select(u32);
    impl Debug;
    pub u8, ap_sel, set_ap_sel: 31, 24;
    pub u8, ap_bank_sel, set_ap_bank_sel: 7, 4;
    pub u8, dp_bank_sel, set_dp_bank_sel: 3, 0;
}

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Dpidr(u32);
    impl Debug;
    pub u8, revision, _: 31, 28;
    pub u8, part_no, _: 27, 20;
    pub min, _: 16;
    pub u8, version, _: 15, 12;
    pub u16, designer, _: 11, 1;
    u8, jep_cc, _: 11, 8;
    u8, jep_id, _: 7, 1;
}

/// The decoded contents of DPIDR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugPortId {
    pub raw: u32,
    pub revision: u8,
    pub part_no: u8,
    pub version: DebugPortVersion,
    pub min_dp_support: MinDpSupport,
    pub designer: JEP106Code,
}

impl From<u32> for DebugPortId {
    fn from(raw: u32) -> DebugPortId {
        let dpidr = Dpidr(raw);
        DebugPortId {
            raw,
            revision: dpidr.revision(),
            part_no: dpidr.part_no(),
            version: dpidr.version().into(),
            min_dp_support: dpidr.min().into(),
            designer: JEP106Code::new(dpidr.jep_cc(), dpidr.jep_id()),
        }
    }
}

impl fmt::Display for DebugPortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} by {} (part {:#04x}, revision {})",
            self.version,
            self.designer.get().unwrap_or("<unknown>"),
            self.part_no,
            self.revision
        )?;
        if self.min_dp_support == MinDpSupport::Implemented {
            write!(f, ", MINDP")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinDpSupport {
    NotImplemented,
    Implemented,
}

impl From<bool> for MinDpSupport {
    fn from(bit_set: bool) -> Self {
        if bit_set {
            MinDpSupport::Implemented
        } else {
            MinDpSupport::NotImplemented
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugPortVersion {
    DPv0,
    DPv1,
    DPv2,
    Unsupported(u8),
}

impl From<u8> for DebugPortVersion {
    fn from(value: u8) -> Self {
        match value {
            0 => DebugPortVersion::DPv0,
            1 => DebugPortVersion::DPv1,
            2 => DebugPortVersion::DPv2,
            other => DebugPortVersion::Unsupported(other),
        }
    }
}

/// Register level access to a debug port and the access ports behind it.
pub trait DpClient {
    /// Bring the debug port up: read DPIDR, reset SELECT, power up the debug and
    /// system domains and clear sticky errors.
    fn init(&mut self, timeout: Duration) -> Result<(), Error>;

    /// Read and decode DPIDR.
    fn idr(&mut self) -> Result<DebugPortId, Error>;

    fn read_dp_reg(&mut self, reg: DpRegister) -> Result<u32, Error>;

    fn write_dp_reg(&mut self, reg: DpRegister, value: u32) -> Result<(), Error>;

    /// Request debug and/or system power and wait until CTRL/STAT reflects exactly
    /// the requested state.
    fn set_dbg_power(&mut self, dbg: bool, sys: bool, timeout: Duration) -> Result<(), Error>;

    /// Pulse CDBGRSTREQ and wait for the acknowledge to rise and fall.
    fn dbg_reset(&mut self, timeout: Duration) -> Result<(), Error>;

    /// Read AP register `reg` (bank in the upper nibble) of access port `ap_sel`.
    fn read_ap_reg(&mut self, ap_sel: u8, reg: u8) -> Result<u32, Error>;

    fn write_ap_reg(&mut self, ap_sel: u8, reg: u8, value: u32) -> Result<(), Error>;

    /// Read the same AP register `count` times.
    fn read_ap_reg_multi(&mut self, ap_sel: u8, reg: u8, count: usize) -> Result<Vec<u32>, Error>;

    /// Write every value of `values` to the same AP register.
    fn write_ap_reg_multi(&mut self, ap_sel: u8, reg: u8, values: &[u32]) -> Result<(), Error>;
}

/// A debug port reached through a CMSIS-DAP probe.
///
/// Keeps the last value written to SELECT, so that consecutive accesses to the
/// same AP bank do not repeat the SELECT write. The cached value is dropped
/// whenever a SELECT write or an AP access fails, as it is then unknown whether
/// the hardware state changed.
#[derive(Debug)]
pub struct DebugPort<P: DapClient> {
    probe: P,
    select: Option<u32>,
}

impl<P: DapClient> DebugPort<P> {
    pub fn new(probe: P) -> Self {
        DebugPort {
            probe,
            select: None,
        }
    }

    pub fn probe(&mut self) -> &mut P {
        &mut self.probe
    }

    pub fn into_probe(self) -> P {
        self.probe
    }

    /// The cached SELECT value, if it is known to match the hardware.
    pub fn cached_select(&self) -> Option<u32> {
        self.select
    }

    fn read_reg(&mut self, reg: u8, ap: bool) -> Result<u32, Error> {
        let values = self
            .probe
            .transfer(0, &[TransferRequest::read(ap, reg)])?;
        // A successful transfer always carries the word of a single read.
        values
            .first()
            .copied()
            .ok_or_else(|| Error::framing(CommandId::Transfer, FramingError::NotEnoughData))
    }

    fn write_reg(&mut self, reg: u8, ap: bool, value: u32) -> Result<(), Error> {
        self.probe
            .transfer(0, &[TransferRequest::write(ap, reg, value)])?;
        Ok(())
    }

    fn read_reg_multi(&mut self, reg: u8, ap: bool, count: usize) -> Result<Vec<u32>, Error> {
        let max = self.block_max_size(count)?;
        let mut values = Vec::with_capacity(count);
        while values.len() < count {
            let chunk = (count - values.len()).min(max);
            values.extend(self.probe.transfer_block_read(0, ap, reg, chunk)?);
        }
        Ok(values)
    }

    fn write_reg_multi(&mut self, reg: u8, ap: bool, values: &[u32]) -> Result<(), Error> {
        let max = self.block_max_size(values.len())?;
        for chunk in values.chunks(max) {
            self.probe.transfer_block_write(0, ap, reg, chunk)?;
        }
        Ok(())
    }

    fn block_max_size(&self, count: usize) -> Result<usize, Error> {
        match self.probe.transfer_block_max_size() {
            0 if count > 0 => Err(ConfigurationError::BlockTooLarge { max: 0, got: count }.into()),
            max => Ok(max.max(1)),
        }
    }

    /// Make sure SELECT addresses `ap_sel` and `ap_bank`, writing it only if needed.
    fn select_ap(&mut self, ap_sel: u8, ap_bank: u8) -> Result<(), Error> {
        let current = self.select.unwrap_or(0);
        let mut select = Select(current & 0x00ff_ff0f);
        select.set_ap_sel(ap_sel);
        select.set_ap_bank_sel(ap_bank & 0xf);

        if self.select == Some(select.0) {
            return Ok(());
        }

        self.select = None;
        self.write_dp_reg(DpRegister::Select, select.0)?;
        self.select = Some(select.0);
        Ok(())
    }

    /// Runs an AP access, dropping the cached SELECT value if it fails.
    fn ap_access<T>(
        &mut self,
        ap_sel: u8,
        reg: u8,
        access: impl FnOnce(&mut Self, u8) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let address = ApRegAddress::from(reg);
        self.select_ap(ap_sel, address.bank)?;
        access(self, address.offset).inspect_err(|e| {
            if self.select.take().is_some() {
                tracing::warn!("Invalidating cached SELECT after failed AP access: {}", e);
            }
        })
    }

    fn read_ctrl_stat(&mut self) -> Result<Ctrl, Error> {
        Ok(Ctrl(self.read_dp_reg(DpRegister::CtrlStat)?))
    }
}

impl<P: DapClient> DpClient for DebugPort<P> {
    fn init(&mut self, timeout: Duration) -> Result<(), Error> {
        let idr = self.idr()?;
        tracing::info!("Found debug port: {}", idr);

        self.select = None;
        self.write_dp_reg(DpRegister::Select, 0)?;
        self.select = Some(0);

        self.set_dbg_power(true, true, timeout)?;

        // Clear all the errors (if any).
        self.write_dp_reg(DpRegister::CtrlStat, CTRL_STAT_INIT)
    }

    fn idr(&mut self) -> Result<DebugPortId, Error> {
        Ok(DebugPortId::from(self.read_dp_reg(DpRegister::Idr)?))
    }

    fn read_dp_reg(&mut self, reg: DpRegister) -> Result<u32, Error> {
        let value = self.read_reg(reg.address(), false)?;
        tracing::debug!("{} == {:#010x}", reg, value);
        Ok(value)
    }

    fn write_dp_reg(&mut self, reg: DpRegister, value: u32) -> Result<(), Error> {
        tracing::debug!("{} = {:#010x}", reg, value);
        self.write_reg(reg.address(), false, value)
    }

    fn set_dbg_power(&mut self, dbg: bool, sys: bool, timeout: Duration) -> Result<(), Error> {
        let mut request = Ctrl(0);
        request.set_cdbgpwrupreq(dbg);
        request.set_csyspwrupreq(sys);
        // The acknowledge bits sit right above their request bits.
        let expected = request.0 | request.0 << 1;

        poll_until("debug power-up", timeout, || {
            let stat = self.read_ctrl_stat()?;
            if stat.0 & Ctrl::POWER_MASK == expected {
                return Ok(true);
            }
            let ctrl = (stat.0 & 0x07ff_ffff) | request.0;
            self.write_dp_reg(DpRegister::CtrlStat, ctrl)?;
            Ok(false)
        })
    }

    fn dbg_reset(&mut self, timeout: Duration) -> Result<(), Error> {
        let stat = self.read_ctrl_stat()?;
        let mut ctrl = Ctrl(stat.0 & !Ctrl::RESET_MASK);
        ctrl.set_c_dbg_rst_req(true);
        self.write_dp_reg(DpRegister::CtrlStat, ctrl.0)?;

        let mut stat = stat;
        poll_until("debug reset request", timeout, || {
            stat = self.read_ctrl_stat()?;
            Ok(stat.cdbgrstack())
        })?;

        self.write_dp_reg(DpRegister::CtrlStat, stat.0 & !Ctrl::RESET_MASK)?;

        poll_until("debug reset release", timeout, || {
            Ok(!self.read_ctrl_stat()?.cdbgrstack())
        })
    }

    fn read_ap_reg(&mut self, ap_sel: u8, reg: u8) -> Result<u32, Error> {
        self.ap_access(ap_sel, reg, |dp, offset| dp.read_reg(offset, true))
    }

    fn write_ap_reg(&mut self, ap_sel: u8, reg: u8, value: u32) -> Result<(), Error> {
        self.ap_access(ap_sel, reg, |dp, offset| dp.write_reg(offset, true, value))
    }

    fn read_ap_reg_multi(&mut self, ap_sel: u8, reg: u8, count: usize) -> Result<Vec<u32>, Error> {
        self.ap_access(ap_sel, reg, |dp, offset| {
            dp.read_reg_multi(offset, true, count)
        })
    }

    fn write_ap_reg_multi(&mut self, ap_sel: u8, reg: u8, values: &[u32]) -> Result<(), Error> {
        self.ap_access(ap_sel, reg, |dp, offset| {
            dp.write_reg_multi(offset, true, values)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::probe::fake_probe::{DapOp, MockDap};
    use crate::probe::TransferStatus;
    use crate::TimeoutKind;
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn initialized() -> DebugPort<MockDap> {
        let mut dp = DebugPort::new(MockDap::new());
        dp.init(TIMEOUT).unwrap();
        dp.probe().ops.clear();
        dp
    }

    #[test]
    fn init_sequence() {
        let mut dp = DebugPort::new(MockDap::new());
        dp.init(TIMEOUT).unwrap();

        assert_eq!(
            dp.probe().ops,
            vec![
                DapOp::DpRead(0x0),
                DapOp::DpWrite(0x8, 0),
                DapOp::DpRead(0x4),
                DapOp::DpWrite(0x4, 0x5000_0000),
                DapOp::DpRead(0x4),
                DapOp::DpWrite(0x4, 0x5000_0F00),
            ]
        );
        assert_eq!(dp.cached_select(), Some(0));
    }

    #[test]
    fn idr_decoding() {
        let mut dp = DebugPort::new(MockDap::new());
        let idr = dp.idr().unwrap();

        assert_eq!(idr.raw, 0x2ba0_1477);
        assert_eq!(idr.version, DebugPortVersion::DPv1);
        assert_eq!(idr.part_no, 0xba);
        assert_eq!(idr.revision, 2);
        assert_eq!(idr.min_dp_support, MinDpSupport::NotImplemented);
        assert_eq!(idr.designer, JEP106Code::new(4, 0x3b));
        assert_eq!(idr.designer.get(), Some("ARM Ltd"));
    }

    #[test]
    fn power_up_times_out_without_ack() {
        let mut probe = MockDap::new();
        probe.acks = false;
        let mut dp = DebugPort::new(probe);

        let err = dp.set_dbg_power(true, true, TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            Error::TransferTimeout(TimeoutKind::Poll {
                what: "debug power-up",
                ..
            })
        ));
    }

    #[test]
    fn power_down() {
        let mut dp = initialized();
        dp.set_dbg_power(false, false, TIMEOUT).unwrap();
        assert_eq!(dp.probe().ctrl_stat & 0xf000_0000, 0);
    }

    #[test]
    fn debug_reset_handshake() {
        let mut dp = initialized();
        dp.dbg_reset(TIMEOUT).unwrap();

        let writes: Vec<_> = dp
            .probe()
            .ops
            .iter()
            .filter_map(|op| match op {
                DapOp::DpWrite(0x4, v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![0xf400_0f00, 0xf000_0f00]);
        assert_eq!(dp.probe().ctrl_stat & 0x0c00_0000, 0);
    }

    #[test]
    fn same_bank_selects_once() {
        let mut dp = initialized();

        dp.write_ap_reg(0, 0x0C, 1).unwrap();
        dp.write_ap_reg(0, 0x0C, 2).unwrap();

        // SELECT is already 0 after init.
        assert_eq!(dp.probe().select_writes(), 0);

        dp.write_ap_reg(1, 0x0C, 3).unwrap();
        dp.write_ap_reg(1, 0x0C, 4).unwrap();

        let select = 0x0100_0000;
        assert_eq!(
            dp.probe().ops,
            vec![
                DapOp::ApWrite {
                    select: 0,
                    reg: 0xC,
                    value: 1
                },
                DapOp::ApWrite {
                    select: 0,
                    reg: 0xC,
                    value: 2
                },
                DapOp::DpWrite(0x8, select),
                DapOp::ApWrite {
                    select,
                    reg: 0xC,
                    value: 3
                },
                DapOp::ApWrite {
                    select,
                    reg: 0xC,
                    value: 4
                },
            ]
        );
    }

    #[test]
    fn bank_switch() {
        let mut dp = initialized();

        dp.read_ap_reg(0, 0xFC).unwrap();
        dp.read_ap_reg(0, 0xF8).unwrap();
        dp.read_ap_reg(0, 0x00).unwrap();

        assert_eq!(
            dp.probe().ops,
            vec![
                DapOp::DpWrite(0x8, 0x0000_00F0),
                DapOp::ApRead {
                    select: 0xF0,
                    reg: 0xC
                },
                DapOp::ApRead {
                    select: 0xF0,
                    reg: 0x8
                },
                DapOp::DpWrite(0x8, 0),
                DapOp::ApRead { select: 0, reg: 0x0 },
            ]
        );
    }

    #[test]
    fn select_preserves_dp_bank() {
        let mut dp = initialized();
        dp.write_dp_reg(DpRegister::Select, 0x0000_0003).unwrap();
        dp.select = Some(0x0000_0003);

        dp.read_ap_reg(2, 0x10).unwrap();

        assert_eq!(dp.cached_select(), Some(0x0200_0013));
    }

    #[test]
    fn fault_on_ap_access_invalidates_select() {
        let mut dp = initialized();
        dp.write_ap_reg(0, 0x04, 0x2000_0000).unwrap();

        dp.probe().fault_next = Some(TransferStatus::FAULT);
        let err = dp.write_ap_reg(0, 0x04, 0x2000_0004).unwrap_err();
        assert!(err.is_fault());
        assert_eq!(dp.cached_select(), None);

        dp.probe().ops.clear();
        dp.write_ap_reg(0, 0x04, 0x2000_0004).unwrap();
        assert_eq!(dp.probe().select_writes(), 1);
    }

    #[test]
    fn fault_on_select_write_invalidates_select() {
        let mut dp = initialized();

        dp.probe().fault_next = Some(TransferStatus::FAULT);
        assert!(dp.read_ap_reg(0, 0xFC).unwrap_err().is_fault());
        assert_eq!(dp.cached_select(), None);

        // Even the previously cached bank is selected again.
        dp.probe().ops.clear();
        dp.read_ap_reg(0, 0x00).unwrap();
        assert_eq!(dp.probe().ops[0], DapOp::DpWrite(0x8, 0));
    }

    #[test]
    fn multi_access_is_split_into_blocks() {
        let mut probe = MockDap::new();
        probe.block_max = 3;
        let mut dp = DebugPort::new(probe);
        dp.init(TIMEOUT).unwrap();
        dp.probe().ops.clear();

        dp.write_ap_reg_multi(0, 0x0C, &[1, 2, 3, 4, 5, 6, 7]).unwrap();
        let values = dp.read_ap_reg_multi(0, 0x0C, 4).unwrap();
        assert_eq!(values.len(), 4);

        let sizes: Vec<_> = dp
            .probe()
            .ops
            .iter()
            .filter_map(|op| match op {
                DapOp::BlockWrite { data, .. } => Some(data.len()),
                DapOp::BlockRead { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![3, 3, 1, 3, 1]);
    }

    #[test]
    fn zero_block_size_is_an_error() {
        let mut probe = MockDap::new();
        probe.block_max = 0;
        let mut dp = DebugPort::new(probe);

        let err = dp.read_ap_reg_multi(0, 0x0C, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::BlockTooLarge { max: 0, got: 1 })
        ));
    }
}
