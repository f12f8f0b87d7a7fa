//! Software register-file model of the CD-ROM host hardware.
//!
//! `SimBus` implements every port trait plus the event seam, records each
//! side-effecting access in order, and lets tests script the inputs the
//! driver polls (command-ready bit, interrupt mask/cause, flag and response
//! bytes).

use std::collections::VecDeque;

use crate::{CdromPorts, DmaPorts, EventSink, IrqPorts, STATUS_CMD_READY};

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortOp {
    SelectBank(u8),
    Command(u8),
    Param(u8),
    Request(u8),
    ResponseRead,
    IrqFlagsRead,
    IrqFlagsWrite(u8),
    DummyCycle,
    InterruptControl(u32),
    Control(u32),
    BaseAddress(u32),
    BlockControl(u32),
    ChannelControl(u32),
    CdromDecodeControl(u32),
    CommonDelay(u32),
}

/// One recorded notification-system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOp {
    Deliver(u32, u16),
    UndeliverAll,
    UndeliverAllExceptAckAndDone,
}

/// Scriptable host model. Registers read back scripted values; every write
/// (and FIFO read) lands in [`SimBus::ops`] in issue order.
#[derive(Debug, Default)]
pub struct SimBus {
    ops: Vec<PortOp>,
    events: Vec<EventOp>,
    cmd_ready: bool,
    mask: u32,
    cause: u32,
    irq_flags: VecDeque<u8>,
    responses: VecDeque<u8>,
    dicr: u32,
    dpcr: u32,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with the command-ready bit set and the CD-ROM interrupt line
    /// unmasked, the common starting point for driver tests.
    pub fn ready() -> Self {
        let mut sim = Self::new();
        sim.cmd_ready = true;
        sim.mask = crate::IRQ_CDROM;
        sim
    }

    pub fn set_cmd_ready(&mut self, ready: bool) {
        self.cmd_ready = ready;
    }

    pub fn set_mask(&mut self, mask: u32) {
        self.mask = mask;
    }

    pub fn set_cause(&mut self, cause: u32) {
        self.cause = cause;
    }

    /// Queue an interrupt-flag byte for the next dispatcher read.
    pub fn push_irq_flags(&mut self, flags: u8) {
        self.irq_flags.push_back(flags);
        self.cause |= crate::IRQ_CDROM;
    }

    /// Queue response-FIFO bytes.
    pub fn push_responses(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    pub fn ops(&self) -> &[PortOp] {
        &self.ops
    }

    pub fn events(&self) -> &[EventOp] {
        &self.events
    }

    pub fn clear_trace(&mut self) {
        self.ops.clear();
        self.events.clear();
    }

    /// Recorded controller commands, in issue order.
    pub fn commands(&self) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                PortOp::Command(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, op: PortOp) -> usize {
        self.ops.iter().filter(|&&o| o == op).count()
    }
}

impl CdromPorts for SimBus {
    fn index_status(&mut self) -> u8 {
        if self.cmd_ready {
            STATUS_CMD_READY
        } else {
            0
        }
    }

    fn select_bank(&mut self, bank: u8) {
        self.ops.push(PortOp::SelectBank(bank));
    }

    fn write_command(&mut self, cmd: u8) {
        self.ops.push(PortOp::Command(cmd));
    }

    fn read_response(&mut self) -> u8 {
        self.ops.push(PortOp::ResponseRead);
        self.responses.pop_front().unwrap_or(0)
    }

    fn write_param(&mut self, value: u8) {
        self.ops.push(PortOp::Param(value));
    }

    fn write_request(&mut self, value: u8) {
        self.ops.push(PortOp::Request(value));
    }

    fn read_irq_flags(&mut self) -> u8 {
        self.ops.push(PortOp::IrqFlagsRead);
        self.irq_flags.pop_front().unwrap_or(0)
    }

    fn write_irq_flags(&mut self, value: u8) {
        self.ops.push(PortOp::IrqFlagsWrite(value));
    }

    fn dummy_cycle(&mut self) {
        self.ops.push(PortOp::DummyCycle);
    }
}

impl IrqPorts for SimBus {
    fn mask(&mut self) -> u32 {
        self.mask
    }

    fn cause(&mut self) -> u32 {
        self.cause
    }
}

impl DmaPorts for SimBus {
    fn interrupt_control(&mut self) -> u32 {
        self.dicr
    }

    fn set_interrupt_control(&mut self, value: u32) {
        self.dicr = value;
        self.ops.push(PortOp::InterruptControl(value));
    }

    fn control(&mut self) -> u32 {
        self.dpcr
    }

    fn set_control(&mut self, value: u32) {
        self.dpcr = value;
        self.ops.push(PortOp::Control(value));
    }

    fn set_base_address(&mut self, addr: u32) {
        self.ops.push(PortOp::BaseAddress(addr));
    }

    fn set_block_control(&mut self, value: u32) {
        self.ops.push(PortOp::BlockControl(value));
    }

    fn set_channel_control(&mut self, value: u32) {
        self.ops.push(PortOp::ChannelControl(value));
    }

    fn set_cdrom_decode_control(&mut self, value: u32) {
        self.ops.push(PortOp::CdromDecodeControl(value));
    }

    fn set_common_delay(&mut self, value: u32) {
        self.ops.push(PortOp::CommonDelay(value));
    }
}

impl EventSink for SimBus {
    fn deliver(&mut self, event: u32, spec: u16) {
        self.events.push(EventOp::Deliver(event, spec));
    }

    fn undeliver_all(&mut self) {
        self.events.push(EventOp::UndeliverAll);
    }

    fn undeliver_all_except_ack_and_done(&mut self) {
        self.events.push(EventOp::UndeliverAllExceptAckAndDone);
    }
}
