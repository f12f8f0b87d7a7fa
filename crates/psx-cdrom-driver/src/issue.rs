//! Command issuance: precondition checks, register writes, transitions.

use psx_cdrom_hw::{
    CdromMode, CdromPorts, EventSink, CMD_GETSTAT, CMD_SETLOC, CMD_SETMODE, STATUS_CMD_READY,
};
use thiserror::Error;
use tracing::debug;

use crate::{CdromDriver, CommandState};

/// Why a command could not be issued. No retry happens internally; callers
/// poll and re-issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IssueError {
    #[error("command outstanding in state {state:?}")]
    Busy { state: CommandState },
    #[error("controller cannot accept a command")]
    NotReady,
    #[error("sector count must be positive")]
    NoSectors,
    #[error("undocumented state still awaiting its acknowledge interrupt")]
    AckPending,
}

impl CdromDriver {
    /// Issue a data-track seek to the given MSF address.
    ///
    /// Unlike the other commands, a seek may preempt one of the
    /// undocumented `Unknown` states, but only once that state's
    /// acknowledge interrupt has been observed; the interrupted state is
    /// recorded so its completion can be resumed. Failure leaves the
    /// context untouched.
    pub fn seek_l(
        &mut self,
        msf: [u8; 3],
        ports: &mut dyn CdromPorts,
        events: &mut dyn EventSink,
    ) -> Result<(), IssueError> {
        if self.state.is_undocumented() {
            if !self.got_ack {
                return Err(IssueError::AckPending);
            }
        } else if self.state != CommandState::Idle {
            return Err(IssueError::Busy { state: self.state });
        }

        if ports.index_status() & STATUS_CMD_READY == 0 {
            return Err(IssueError::NotReady);
        }
        events.undeliver_all_except_ack_and_done();
        if self.state.is_undocumented() {
            self.preempted = Some(self.state);
        }
        ports.select_bank(0);
        ports.write_param(msf[0]);
        ports.write_param(msf[1]);
        ports.write_param(msf[2]);
        ports.write_command(CMD_SETLOC);
        self.state = CommandState::SeekLSetLoc;
        debug!(?msf, "seekL issued");
        Ok(())
    }

    /// Request the drive status. `slot` is the caller-owned response buffer
    /// the external completion path will write.
    pub fn get_status(
        &mut self,
        slot: u32,
        ports: &mut dyn CdromPorts,
        events: &mut dyn EventSink,
    ) -> Result<(), IssueError> {
        if self.state != CommandState::Idle {
            return Err(IssueError::Busy { state: self.state });
        }
        events.undeliver_all();
        ports.select_bank(0);
        self.state = CommandState::GetStatus;
        ports.write_command(CMD_GETSTAT);
        self.status_slot = Some(slot);
        Ok(())
    }

    /// Start a sector-streaming read: `count` sectors into caller-owned
    /// memory at physical address `buffer`.
    ///
    /// Compatibility quirks, matching retail BIOS behavior:
    /// - the transfer counters, cursor and mode are cached *before* the
    ///   hardware-ready check, so a `NotReady` failure leaves them mutated
    ///   and a later successful call reuses whatever it wrote last;
    /// - the state field is not transitioned here. The controller sequence
    ///   opens with SETMODE; the interrupt-driven path (external event
    ///   layer) moves the state to `ReadN`/`ReadS` when that completes.
    pub fn read(
        &mut self,
        count: i32,
        buffer: u32,
        mode: CdromMode,
        ports: &mut dyn CdromPorts,
        events: &mut dyn EventSink,
    ) -> Result<(), IssueError> {
        if self.state != CommandState::Idle {
            return Err(IssueError::Busy { state: self.state });
        }
        if count <= 0 {
            return Err(IssueError::NoSectors);
        }

        events.undeliver_all();
        self.got_ack = false;
        self.words_per_sector = mode.words_per_sector();
        self.sectors_remaining = count;
        self.dma_sectors = count;
        self.cursor = buffer;
        self.mode = mode;
        if ports.index_status() & STATUS_CMD_READY == 0 {
            return Err(IssueError::NotReady);
        }
        ports.select_bank(0);
        ports.write_param(mode.bits() as u8);
        ports.write_command(CMD_SETMODE);
        debug!(
            count,
            buffer,
            words_per_sector = self.words_per_sector,
            "read issued"
        );
        Ok(())
    }

    /// Configure the drive mode. The mode is cached before the
    /// hardware-ready check (same quirk as [`CdromDriver::read`]).
    pub fn set_mode(
        &mut self,
        mode: CdromMode,
        ports: &mut dyn CdromPorts,
        events: &mut dyn EventSink,
    ) -> Result<(), IssueError> {
        if self.state != CommandState::Idle {
            return Err(IssueError::Busy { state: self.state });
        }
        events.undeliver_all();

        self.mode = mode;
        if ports.index_status() & STATUS_CMD_READY == 0 {
            return Err(IssueError::NotReady);
        }
        ports.select_bank(0);
        ports.write_param(mode.bits() as u8);
        self.state = CommandState::SetMode;
        ports.write_command(CMD_SETMODE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use psx_cdrom_hw::sim::{EventOp, PortOp, SimBus};
    use psx_cdrom_hw::{DATA_SECTOR_WORDS, WHOLE_SECTOR_WORDS};

    use super::*;

    #[test]
    fn seek_writes_msf_then_setloc() {
        let mut sim = SimBus::ready();
        let mut drv = CdromDriver::new();

        drv.seek_l([0x12, 0x34, 0x56], &mut sim, &mut SimBus::new())
            .unwrap();

        assert_eq!(drv.state(), CommandState::SeekLSetLoc);
        assert_eq!(
            sim.ops(),
            &[
                PortOp::SelectBank(0),
                PortOp::Param(0x12),
                PortOp::Param(0x34),
                PortOp::Param(0x56),
                PortOp::Command(CMD_SETLOC),
            ]
        );
    }

    #[test]
    fn seek_preserves_ack_and_done_notifications() {
        let mut sim = SimBus::ready();
        let mut events = SimBus::new();
        let mut drv = CdromDriver::new();

        drv.seek_l([0, 2, 0], &mut sim, &mut events).unwrap();

        assert_eq!(events.events(), &[EventOp::UndeliverAllExceptAckAndDone]);
    }

    #[test]
    fn seek_fails_when_busy_without_touching_context() {
        let mut sim = SimBus::ready();
        let mut drv = CdromDriver::new();
        drv.set_state(CommandState::GetStatus);

        let err = drv.seek_l([0, 2, 0], &mut sim, &mut SimBus::new());

        assert_eq!(
            err,
            Err(IssueError::Busy {
                state: CommandState::GetStatus
            })
        );
        assert_eq!(drv.state(), CommandState::GetStatus);
        assert_eq!(drv.preempted(), None);
        assert!(sim.ops().is_empty(), "no register traffic on failure");
    }

    #[test]
    fn seek_from_undocumented_state_requires_ack() {
        let mut sim = SimBus::ready();
        let mut drv = CdromDriver::new();
        drv.set_state(CommandState::Unknown(0xE6));

        assert_eq!(
            drv.seek_l([0, 2, 0], &mut sim, &mut SimBus::new()),
            Err(IssueError::AckPending)
        );
        assert_eq!(drv.state(), CommandState::Unknown(0xE6));
        assert_eq!(drv.preempted(), None);

        drv.set_acknowledge_received(true);
        drv.seek_l([0, 2, 0], &mut sim, &mut SimBus::new()).unwrap();
        assert_eq!(drv.state(), CommandState::SeekLSetLoc);
        assert_eq!(drv.preempted(), Some(CommandState::Unknown(0xE6)));
    }

    #[test]
    fn seek_fails_when_controller_not_ready() {
        let mut sim = SimBus::new(); // command-ready bit clear
        let mut events = SimBus::new();
        let mut drv = CdromDriver::new();

        assert_eq!(
            drv.seek_l([0, 2, 0], &mut sim, &mut events),
            Err(IssueError::NotReady)
        );
        assert_eq!(drv.state(), CommandState::Idle);
        assert!(
            events.events().is_empty(),
            "ready check precedes the undeliver call"
        );
    }

    #[test]
    fn get_status_stores_slot_and_transitions() {
        let mut sim = SimBus::ready();
        let mut drv = CdromDriver::new();

        drv.get_status(0x8000_1F00, &mut sim, &mut SimBus::new())
            .unwrap();

        assert_eq!(drv.state(), CommandState::GetStatus);
        assert_eq!(drv.status_slot(), Some(0x8000_1F00));
        assert_eq!(
            sim.ops(),
            &[PortOp::SelectBank(0), PortOp::Command(CMD_GETSTAT)]
        );
    }

    #[test]
    fn get_status_rejects_non_idle() {
        let mut drv = CdromDriver::new();
        drv.set_state(CommandState::Pausing);

        let err = drv.get_status(0, &mut SimBus::ready(), &mut SimBus::new());

        assert_eq!(
            err,
            Err(IssueError::Busy {
                state: CommandState::Pausing
            })
        );
        assert_eq!(drv.status_slot(), None);
    }

    #[test]
    fn read_issues_setmode_with_mode_byte_but_keeps_state() {
        let mut sim = SimBus::ready();
        let mut drv = CdromDriver::new();
        let mode = CdromMode::DOUBLE_SPEED;

        drv.read(4, 0x0008_0000, mode, &mut sim, &mut SimBus::new())
            .unwrap();

        // The read sequence opens with SETMODE; the state transition to
        // ReadN/ReadS belongs to the interrupt-driven path.
        assert_eq!(drv.state(), CommandState::Idle);
        assert_eq!(drv.sectors_remaining(), 4);
        assert_eq!(drv.dma_sectors(), 4);
        assert_eq!(drv.cursor(), 0x0008_0000);
        assert_eq!(drv.words_per_sector(), DATA_SECTOR_WORDS);
        assert!(!drv.acknowledge_received());
        assert_eq!(
            sim.ops(),
            &[
                PortOp::SelectBank(0),
                PortOp::Param(mode.bits() as u8),
                PortOp::Command(CMD_SETMODE),
            ]
        );
    }

    #[test]
    fn read_rejects_zero_and_negative_counts() {
        let mut drv = CdromDriver::new();

        for count in [0, -3] {
            assert_eq!(
                drv.read(
                    count,
                    0,
                    CdromMode::empty(),
                    &mut SimBus::ready(),
                    &mut SimBus::new()
                ),
                Err(IssueError::NoSectors)
            );
        }
        assert_eq!(drv.sectors_remaining(), 0);
    }

    #[test]
    fn read_not_ready_still_caches_counters_and_mode() {
        let mut sim = SimBus::new(); // not ready
        let mut drv = CdromDriver::new();
        let mode = CdromMode::WHOLE_SECTOR;

        assert_eq!(
            drv.read(7, 0x1000, mode, &mut sim, &mut SimBus::new()),
            Err(IssueError::NotReady)
        );

        // Preserved quirk: the failure leaves the cached transfer values
        // behind, and a later success reuses them unless overwritten.
        assert_eq!(drv.sectors_remaining(), 7);
        assert_eq!(drv.dma_sectors(), 7);
        assert_eq!(drv.cursor(), 0x1000);
        assert_eq!(drv.words_per_sector(), WHOLE_SECTOR_WORDS);
        assert_eq!(drv.mode(), mode);
        assert_eq!(drv.state(), CommandState::Idle);
    }

    #[test]
    fn set_mode_not_ready_still_caches_mode() {
        let mut sim = SimBus::new(); // not ready
        let mut drv = CdromDriver::new();

        assert_eq!(
            drv.set_mode(CdromMode::XA_ADPCM, &mut sim, &mut SimBus::new()),
            Err(IssueError::NotReady)
        );
        assert_eq!(drv.mode(), CdromMode::XA_ADPCM);
        assert_eq!(drv.state(), CommandState::Idle);
    }

    #[test]
    fn set_mode_transitions_and_forwards_mode_byte() {
        let mut sim = SimBus::ready();
        let mut drv = CdromDriver::new();
        let mode = CdromMode::DOUBLE_SPEED | CdromMode::WHOLE_SECTOR;

        drv.set_mode(mode, &mut sim, &mut SimBus::new()).unwrap();

        assert_eq!(drv.state(), CommandState::SetMode);
        assert_eq!(
            sim.ops(),
            &[
                PortOp::SelectBank(0),
                PortOp::Param(mode.bits() as u8),
                PortOp::Command(CMD_SETMODE),
            ]
        );
    }
}
