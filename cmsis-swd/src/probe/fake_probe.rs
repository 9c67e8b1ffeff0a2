//! Test doubles for the probe layer.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use crate::probe::{
    ConnectMode, DapChannel, DapClient, HostStatusKind, TransferOp, TransferRequest,
    TransferStatus,
};
use crate::{ConfigurationError, Error};

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>>>;

struct ChannelState {
    responder: Responder,
    writes: Vec<Vec<u8>>,
    pending: VecDeque<Vec<u8>>,
}

/// A HID channel answering every report through a closure.
///
/// The closure sees the full report including the report ID, and returns the
/// response without it, or `None` to stay silent.
#[derive(Clone)]
pub(crate) struct FakeChannel(Rc<RefCell<ChannelState>>);

impl FakeChannel {
    pub fn new(responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + 'static) -> Self {
        FakeChannel(Rc::new(RefCell::new(ChannelState {
            responder: Box::new(responder),
            writes: Vec::new(),
            pending: VecDeque::new(),
        })))
    }

    /// Answers the packet size query with `packet_size`, everything else with `responder`.
    pub fn with_packet_size(
        packet_size: u16,
        mut responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + 'static,
    ) -> Self {
        let [lo, hi] = packet_size.to_le_bytes();
        Self::new(move |request| match request {
            [0x00, 0x00, 0xFF, ..] => Some(vec![0x00, 0x02, lo, hi]),
            _ => responder(request),
        })
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.0.borrow_mut().writes.clear();
    }
}

impl DapChannel for FakeChannel {
    fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
        let mut state = self.0.borrow_mut();
        state.writes.push(data.to_vec());
        if let Some(response) = (state.responder)(data) {
            state.pending.push_back(response);
        }
        Ok(data.len())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Error> {
        let next = self.0.borrow_mut().pending.pop_front();
        match next {
            Some(response) => {
                let n = response.len().min(buf.len());
                buf[..n].copy_from_slice(&response[..n]);
                Ok(n)
            }
            None => {
                std::thread::sleep(timeout);
                Ok(0)
            }
        }
    }
}

/// One register access seen by [`MockDap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DapOp {
    DpRead(u8),
    DpWrite(u8, u32),
    ApRead { select: u32, reg: u8 },
    ApWrite { select: u32, reg: u8, value: u32 },
    BlockRead { select: u32, reg: u8, count: usize },
    BlockWrite { select: u32, reg: u8, data: Vec<u32> },
}

/// A simulated probe with a target behind it.
///
/// Models the DP (power and reset handshakes, SELECT) and one MEM-AP whose TAR
/// only auto-increments within its low 10 bits, backed by a sparse word memory.
#[derive(Debug)]
pub(crate) struct MockDap {
    pub ops: Vec<DapOp>,
    /// Start address and length in words of every auto-increment run on DRW.
    pub runs: Vec<(u32, usize)>,
    pub idr: u32,
    pub ctrl_stat: u32,
    pub select: u32,
    pub csw: u32,
    pub tar: u32,
    pub ap_regs: HashMap<u8, u32>,
    pub memory: HashMap<u32, u32>,
    pub block_max: usize,
    /// Acknowledge power-up and debug reset requests.
    pub acks: bool,
    /// Fail the next transfer with this status, without side effects.
    pub fault_next: Option<TransferStatus>,
    pub swj_sequences: Vec<(usize, Vec<u8>)>,
    /// Names of the non-transfer commands, shared so it outlives the mock.
    pub commands: Rc<RefCell<Vec<&'static str>>>,
}

impl Default for MockDap {
    fn default() -> Self {
        MockDap {
            ops: Vec::new(),
            runs: Vec::new(),
            idr: 0x2ba0_1477,
            ctrl_stat: 0,
            select: 0,
            csw: 0x0300_0040,
            tar: 0,
            ap_regs: HashMap::new(),
            memory: HashMap::new(),
            block_max: 126,
            acks: true,
            fault_next: None,
            swj_sequences: Vec::new(),
            commands: Rc::default(),
        }
    }
}

const ACK_BITS: u32 = 0xA800_0000;

impl MockDap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DapOp::DpWrite(0x8, _)))
            .count()
    }

    fn log_command(&self, name: &'static str) {
        self.commands.borrow_mut().push(name);
    }

    fn check_fault(&mut self) -> Result<(), Error> {
        match self.fault_next.take() {
            Some(status) => Err(Error::TransferFault(status)),
            None => Ok(()),
        }
    }

    fn ap_addr(&self, reg: u8) -> u8 {
        (((self.select >> 4) & 0xf) as u8) << 4 | reg
    }

    fn advance_tar(&mut self) {
        self.tar = (self.tar & !0x3ff) | (self.tar.wrapping_add(4) & 0x3ff);
        if let Some(run) = self.runs.last_mut() {
            run.1 += 1;
        }
    }

    fn dp_read(&mut self, reg: u8) -> u32 {
        self.ops.push(DapOp::DpRead(reg));
        match reg {
            0x0 => self.idr,
            0x4 => self.ctrl_stat,
            0x8 => self.select,
            _ => 0,
        }
    }

    fn dp_write(&mut self, reg: u8, value: u32) {
        self.ops.push(DapOp::DpWrite(reg, value));
        match reg {
            0x4 => {
                let mut acks = 0;
                if self.acks {
                    // Each request bit is acknowledged by the bit above it.
                    acks = (value & 0x5400_0000) << 1;
                }
                self.ctrl_stat = (value & !ACK_BITS) | acks;
            }
            0x8 => self.select = value,
            _ => {}
        }
    }

    fn ap_read(&mut self, reg: u8) -> u32 {
        self.ops.push(DapOp::ApRead {
            select: self.select,
            reg,
        });
        self.ap_read_raw(reg)
    }

    fn ap_read_raw(&mut self, reg: u8) -> u32 {
        match self.ap_addr(reg) {
            0x00 => self.csw,
            0x04 => self.tar,
            0x0C => {
                let value = self.memory.get(&self.tar).copied().unwrap_or(0);
                self.advance_tar();
                value
            }
            addr => self.ap_regs.get(&addr).copied().unwrap_or(0),
        }
    }

    fn ap_write(&mut self, reg: u8, value: u32) {
        self.ops.push(DapOp::ApWrite {
            select: self.select,
            reg,
            value,
        });
        self.ap_write_raw(reg, value);
    }

    fn ap_write_raw(&mut self, reg: u8, value: u32) {
        match self.ap_addr(reg) {
            0x00 => self.csw = value,
            0x04 => {
                self.tar = value;
                self.runs.push((value, 0));
            }
            0x0C => {
                self.memory.insert(self.tar, value);
                self.advance_tar();
            }
            addr => {
                self.ap_regs.insert(addr, value);
            }
        }
    }
}

impl DapClient for MockDap {
    fn info(&mut self, id: u8) -> Result<Vec<u8>, Error> {
        self.log_command("info");
        Ok(vec![0x01, id])
    }

    fn connect(&mut self, _mode: ConnectMode) -> Result<(), Error> {
        self.log_command("connect");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Error> {
        self.log_command("disconnect");
        Ok(())
    }

    fn set_host_status(&mut self, _kind: HostStatusKind, _on: bool) -> Result<(), Error> {
        self.log_command("host_status");
        Ok(())
    }

    fn transfer_configure(
        &mut self,
        _idle_cycles: u8,
        _wait_retry: u16,
        _match_retry: u16,
    ) -> Result<(), Error> {
        self.log_command("transfer_configure");
        Ok(())
    }

    fn transfer(&mut self, _dap_index: u8, requests: &[TransferRequest]) -> Result<Vec<u32>, Error> {
        for request in requests {
            TransferRequest::validate_reg(request.reg)?;
        }
        self.check_fault()?;

        let mut values = Vec::new();
        for request in requests {
            match (request.op, request.ap) {
                (TransferOp::Read, false) => values.push(self.dp_read(request.reg)),
                (TransferOp::Read, true) => values.push(self.ap_read(request.reg)),
                (TransferOp::Write(v), false) => self.dp_write(request.reg, v),
                (TransferOp::Write(v), true) => self.ap_write(request.reg, v),
                _ => {}
            }
        }
        Ok(values)
    }

    fn transfer_block_max_size(&self) -> usize {
        self.block_max
    }

    fn transfer_block_read(
        &mut self,
        _dap_index: u8,
        ap: bool,
        reg: u8,
        count: usize,
    ) -> Result<Vec<u32>, Error> {
        if count > self.block_max {
            return Err(ConfigurationError::BlockTooLarge {
                max: self.block_max,
                got: count,
            }
            .into());
        }
        assert!(ap, "block reads are only used on AP registers");
        self.check_fault()?;

        self.ops.push(DapOp::BlockRead {
            select: self.select,
            reg,
            count,
        });
        Ok((0..count).map(|_| self.ap_read_raw(reg)).collect())
    }

    fn transfer_block_write(
        &mut self,
        _dap_index: u8,
        ap: bool,
        reg: u8,
        data: &[u32],
    ) -> Result<(), Error> {
        if data.len() > self.block_max {
            return Err(ConfigurationError::BlockTooLarge {
                max: self.block_max,
                got: data.len(),
            }
            .into());
        }
        assert!(ap, "block writes are only used on AP registers");
        self.check_fault()?;

        self.ops.push(DapOp::BlockWrite {
            select: self.select,
            reg,
            data: data.to_vec(),
        });
        for &value in data {
            self.ap_write_raw(reg, value);
        }
        Ok(())
    }

    fn delay(&mut self, _delay: Duration) -> Result<(), Error> {
        self.log_command("delay");
        Ok(())
    }

    fn reset_target(&mut self) -> Result<bool, Error> {
        self.log_command("reset_target");
        Ok(false)
    }

    fn swj_clock(&mut self, _clock_hz: u32) -> Result<(), Error> {
        self.log_command("swj_clock");
        Ok(())
    }

    fn swj_sequence(&mut self, bits: usize, data: &[u8]) -> Result<(), Error> {
        self.log_command("swj_sequence");
        self.swj_sequences.push((bits, data.to_vec()));
        Ok(())
    }

    fn swd_configure(&mut self, _config: u8) -> Result<(), Error> {
        self.log_command("swd_configure");
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.log_command("close");
        Ok(())
    }
}
