//! Interrupt-driven command state machine for the PSX CD-ROM controller.
//!
//! One [`CdromDriver`] tracks the single outstanding controller command,
//! issues new commands when the hardware can accept them, and advances
//! multi-sector DMA streaming as interrupt completions arrive. Command
//! issuance and interrupt servicing run on the same logical thread of
//! control; a multi-threaded host must put the driver and its ports behind
//! one lock (or confine both to a dedicated worker) — the `&mut` API makes
//! anything else fail to borrow-check rather than race.
//!
//! Hardware and the BIOS event system are collaborators behind the
//! `psx-cdrom-hw` traits; this crate holds no register addresses.

#![forbid(unsafe_code)]

use psx_cdrom_hw::CdromMode;

mod dma;
mod irq;
mod issue;
mod state;

pub use irq::{IrqKind, Serviced, UnhandledIrqs};
pub use issue::IssueError;
pub use state::CommandState;

/// Driver context: the one mutable record behind every operation.
///
/// Created once at driver initialization and owned by whichever component
/// schedules CD-ROM work. Only the command issuer, the DMA engine, and the
/// completion handlers mutate it, plus the raw-state hooks the external
/// event layer uses to advance sequences this module does not own.
#[derive(Debug)]
pub struct CdromDriver {
    state: CommandState,
    preempted: Option<CommandState>,
    /// Set by the event layer once the controller acknowledged the command
    /// in flight; gates seek preemption of the undocumented states.
    got_ack: bool,
    words_per_sector: u32,
    sectors_remaining: i32,
    /// Mirror of the requested sector count at issue time; the completion
    /// side of the event layer consumes it.
    dma_sectors: i32,
    /// Physical byte address the next sector lands at. Caller-owned memory;
    /// advanced by one sector's worth of words per DMA arm.
    cursor: u32,
    /// Cursor snapshot taken at the last DMA arm, for diagnostics.
    initial_cursor: u32,
    status_slot: Option<u32>,
    mode: CdromMode,
    audio_response: [u8; 8],
    unhandled: UnhandledIrqs,
}

impl Default for CdromDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CdromDriver {
    pub fn new() -> Self {
        Self {
            state: CommandState::Idle,
            preempted: None,
            got_ack: false,
            words_per_sector: 0,
            sectors_remaining: 0,
            dma_sectors: 0,
            cursor: 0,
            initial_cursor: 0,
            status_slot: None,
            mode: CdromMode::empty(),
            audio_response: [0; 8],
            unhandled: UnhandledIrqs::default(),
        }
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// External-layer hook: the BIOS event handlers own several transitions
    /// (reinit, the Setloc→ReadN/ReadS progression) and write them through
    /// here, as raw codes.
    pub fn set_state(&mut self, state: CommandState) {
        self.state = state;
    }

    pub fn preempted(&self) -> Option<CommandState> {
        self.preempted
    }

    /// External-layer hook: a seek that interrupts an in-flight read is
    /// recorded by the event layer, not by this module.
    pub fn set_preempted(&mut self, state: CommandState) {
        self.preempted = Some(state);
    }

    /// The preempted slot is never cleared by this module; the event layer
    /// does it once the resumed command completes.
    pub fn clear_preempted(&mut self) {
        self.preempted = None;
    }

    pub fn acknowledge_received(&self) -> bool {
        self.got_ack
    }

    /// External-layer hook, set when the controller's acknowledge interrupt
    /// for the in-flight command has been observed.
    pub fn set_acknowledge_received(&mut self, got_ack: bool) {
        self.got_ack = got_ack;
    }

    pub fn mode(&self) -> CdromMode {
        self.mode
    }

    pub fn words_per_sector(&self) -> u32 {
        self.words_per_sector
    }

    /// Sectors left to stream. Negative is the continuous-streaming
    /// sentinel: the DMA engine will keep re-arming and never pause.
    pub fn sectors_remaining(&self) -> i32 {
        self.sectors_remaining
    }

    pub fn dma_sectors(&self) -> i32 {
        self.dma_sectors
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn initial_cursor(&self) -> u32 {
        self.initial_cursor
    }

    /// Response buffer address stored by the last `get_status`; the
    /// external completion path writes through it.
    pub fn status_slot(&self) -> Option<u32> {
        self.status_slot
    }

    /// Raw response-register snapshot captured for the audio sub-states.
    /// Compatibility path; nothing in the driver consumes it.
    pub fn audio_response(&self) -> &[u8; 8] {
        &self.audio_response
    }

    /// Controller conditions that were dispatched but have no defined
    /// handler action yet.
    pub fn unhandled_irqs(&self) -> UnhandledIrqs {
        self.unhandled
    }
}
