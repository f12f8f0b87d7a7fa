//! Interrupt servicing: flag decode, acknowledge protocol, completion
//! routing.

use psx_cdrom_hw::{
    CdromPorts, DmaPorts, EventSink, IrqPorts, EVENT_CDROM, FLAG_RESPONSE_MASK, FLAG_SOUND_MASK,
    IRQ_CDROM, SPEC_ACKNOWLEDGE, SPEC_READY,
};
use tracing::trace;

use crate::{CdromDriver, CommandState};

/// Which completion handler a serviced interrupt was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqKind {
    DataReady,
    Complete,
    Acknowledge,
    End,
    DiscError,
}

/// Outcome of one dispatcher invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serviced {
    /// The CD-ROM line was masked or not pending; nothing was touched.
    NotPending,
    /// The interrupt line was acknowledged. `Some` names the handler that
    /// ran; `None` means the flag code (0, 6 or 7) has no dispatch.
    Acknowledged(Option<IrqKind>),
}

/// Tally of controller conditions that reached their dispatch slot but have
/// no defined handler action. Recorded so the gap stays observable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnhandledIrqs {
    pub complete: u32,
    pub acknowledge: u32,
    pub end: u32,
    pub disc_error: u32,
}

/// Dead cycles the controller needs after an interrupt-flag acknowledge.
const SETTLE_CYCLES: usize = 4;

/// Post-acknowledge settle delay. A hardware timing requirement, executed
/// as explicit dead bus cycles; hosts may substitute an equivalent delay.
fn settle_delay(ports: &mut dyn CdromPorts) {
    for _ in 0..SETTLE_CYCLES {
        ports.dummy_cycle();
    }
}

impl CdromDriver {
    /// Service at most one pending CD-ROM interrupt.
    ///
    /// Non-blocking; invoked from the interrupt path or from a polling
    /// loop. Reads and acknowledges the controller's flag byte (each
    /// nonzero bit group is written back and followed by the settle
    /// delay), then dispatches strictly on the low three bits.
    pub fn service(
        &mut self,
        ports: &mut dyn CdromPorts,
        irq: &mut dyn IrqPorts,
        dma: &mut dyn DmaPorts,
        events: &mut dyn EventSink,
    ) -> Serviced {
        if irq.mask() & IRQ_CDROM == 0 {
            return Serviced::NotPending;
        }
        if irq.cause() & IRQ_CDROM == 0 {
            return Serviced::NotPending;
        }

        ports.select_bank(1);
        let flags = ports.read_irq_flags();
        if flags & FLAG_RESPONSE_MASK != 0 {
            ports.select_bank(1);
            // The BIOS acknowledges the whole response group, not the
            // masked snapshot.
            ports.write_irq_flags(FLAG_RESPONSE_MASK);
            settle_delay(ports);
        }
        if flags & FLAG_SOUND_MASK != 0 {
            ports.select_bank(1);
            ports.write_irq_flags(flags & FLAG_SOUND_MASK);
            settle_delay(ports);
        }

        let dispatched = match flags & FLAG_RESPONSE_MASK {
            1 => {
                self.data_ready(ports, dma, events);
                Some(IrqKind::DataReady)
            }
            2 => {
                self.unhandled.complete += 1;
                Some(IrqKind::Complete)
            }
            3 => {
                self.unhandled.acknowledge += 1;
                Some(IrqKind::Acknowledge)
            }
            4 => {
                self.unhandled.end += 1;
                Some(IrqKind::End)
            }
            5 => {
                self.unhandled.disc_error += 1;
                Some(IrqKind::DiscError)
            }
            _ => None,
        };
        trace!(flags, ?dispatched, "cdrom irq serviced");
        Serviced::Acknowledged(dispatched)
    }

    /// Data-ready completion. A preempted read resumes its stream before
    /// the current state is even considered.
    fn data_ready(
        &mut self,
        ports: &mut dyn CdromPorts,
        dma: &mut dyn DmaPorts,
        events: &mut dyn EventSink,
    ) {
        let status = ports.read_response();
        if self.preempted.is_some_and(CommandState::is_read) {
            self.initiate_dma(ports, dma);
            return;
        }
        if self.preempted.is_some_and(CommandState::is_undocumented) {
            events.deliver(EVENT_CDROM, SPEC_READY);
            return;
        }

        match self.state {
            CommandState::ReadN | CommandState::ReadS => self.initiate_dma(ports, dma),
            CommandState::Unknown(0xE6) | CommandState::Unknown(0xEB) => {
                events.deliver(EVENT_CDROM, SPEC_READY);
            }
            CommandState::Unknown(3..=5) => self.record_audio_response(status, ports, events),
            _ => events.deliver(EVENT_CDROM, SPEC_ACKNOWLEDGE),
        }
    }

    /// Snapshot the raw response FIFO for the audio sub-states.
    /// Retail-BIOS compatibility path; nothing reads it back inside the
    /// driver.
    fn record_audio_response(
        &mut self,
        status: u8,
        ports: &mut dyn CdromPorts,
        events: &mut dyn EventSink,
    ) {
        self.audio_response[0] = status;
        for byte in &mut self.audio_response[1..] {
            *byte = ports.read_response();
        }
        events.deliver(EVENT_CDROM, SPEC_READY);
    }
}
