//! Hardware seam for the PSX CD-ROM driver.
//!
//! The driver crate never touches register addresses directly; it goes
//! through the port traits defined here. Real hosts map them onto the
//! controller's four byte-wide registers, the interrupt controller, and DMA
//! channel 3; tests use the [`sim::SimBus`] register-file model.

#![forbid(unsafe_code)]

use bitflags::bitflags;

pub mod sim;

/// CD-ROM controller command opcodes used by the driver.
pub const CMD_GETSTAT: u8 = 0x01;
pub const CMD_SETLOC: u8 = 0x02;
pub const CMD_PAUSE: u8 = 0x09;
pub const CMD_SETMODE: u8 = 0x0E;

/// Index/status register bit: the parameter FIFO can accept a command.
pub const STATUS_CMD_READY: u8 = 0x10;

/// Interrupt-flag register: low three bits carry the response code.
pub const FLAG_RESPONSE_MASK: u8 = 0x07;
/// Interrupt-flag register: sound-buffer bits, acknowledged as a group.
pub const FLAG_SOUND_MASK: u8 = 0x18;

/// Request-register bit: ask the controller to present sector data.
pub const REQUEST_DATA: u8 = 0x80;

/// CD-ROM line in the interrupt mask/cause registers.
pub const IRQ_CDROM: u32 = 1 << 2;

/// Event class the driver reports completions under.
pub const EVENT_CDROM: u32 = 0xF000_0003;
/// Event spec: data ready / audio response captured.
pub const SPEC_READY: u16 = 0x0040;
/// Event spec: generic command acknowledge.
pub const SPEC_ACKNOWLEDGE: u16 = 0x0200;

/// Words per sector when the whole 2340-byte sector is transferred.
pub const WHOLE_SECTOR_WORDS: u32 = 0x249;
/// Words per sector for the 2048-byte data portion only.
pub const DATA_SECTOR_WORDS: u32 = 0x200;

bitflags! {
    /// Setmode parameter byte, forwarded verbatim to the controller.
    ///
    /// The driver only interprets [`CdromMode::IGNORE_BIT`] and
    /// [`CdromMode::WHOLE_SECTOR`] (sector-size selection); the rest passes
    /// through untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CdromMode: u32 {
        const CDDA = 1 << 0;
        const AUTO_PAUSE = 1 << 1;
        const REPORT = 1 << 2;
        const XA_FILTER = 1 << 3;
        const IGNORE_BIT = 1 << 4;
        const WHOLE_SECTOR = 1 << 5;
        const XA_ADPCM = 1 << 6;
        const DOUBLE_SPEED = 1 << 7;
    }
}

impl CdromMode {
    /// DMA words per sector selected by bits 4/5.
    pub fn words_per_sector(self) -> u32 {
        if self.intersects(Self::IGNORE_BIT | Self::WHOLE_SECTOR) {
            WHOLE_SECTOR_WORDS
        } else {
            DATA_SECTOR_WORDS
        }
    }
}

/// The controller's register block (index/status, command, parameter,
/// interrupt-flag registers).
///
/// Reads and writes are side-effecting on real hardware; implementations
/// must not cache or reorder them. `select_bank` corresponds to writing the
/// index register: bank 0 exposes command/parameter ports, bank 1 the
/// interrupt-flag ports.
pub trait CdromPorts {
    /// Read the index/status register (see [`STATUS_CMD_READY`]).
    fn index_status(&mut self) -> u8;
    fn select_bank(&mut self, bank: u8);
    /// Write the command register (bank 0).
    fn write_command(&mut self, cmd: u8);
    /// Pop one byte from the response FIFO.
    fn read_response(&mut self) -> u8;
    /// Push one byte into the parameter FIFO (bank 0).
    fn write_param(&mut self, value: u8);
    /// Write the data-request register (bank 0); see [`REQUEST_DATA`].
    fn write_request(&mut self, value: u8);
    /// Read the interrupt-flag register (bank 1).
    fn read_irq_flags(&mut self) -> u8;
    /// Write the interrupt-flag register to acknowledge bits (bank 1).
    fn write_irq_flags(&mut self, value: u8);
    /// One dead bus cycle. The controller needs a short settle period after
    /// an interrupt-flag acknowledge; the driver requests it as explicit
    /// cycles so hosts can substitute a platform-appropriate delay.
    fn dummy_cycle(&mut self);
}

/// Interrupt controller view: mask and cause registers.
pub trait IrqPorts {
    fn mask(&mut self) -> u32;
    fn cause(&mut self) -> u32;
}

/// DMA channel 3 plus the global DMA/system-bus control registers the
/// arming sequence touches.
pub trait DmaPorts {
    fn interrupt_control(&mut self) -> u32;
    fn set_interrupt_control(&mut self, value: u32);
    fn control(&mut self) -> u32;
    fn set_control(&mut self, value: u32);
    /// Base address register of the CD-ROM channel.
    fn set_base_address(&mut self, addr: u32);
    /// Block control register of the CD-ROM channel.
    fn set_block_control(&mut self, value: u32);
    /// Channel control register of the CD-ROM channel.
    fn set_channel_control(&mut self, value: u32);
    /// CD-ROM decode delay/size system-bus register.
    fn set_cdrom_decode_control(&mut self, value: u32);
    /// Common delay system-bus register.
    fn set_common_delay(&mut self, value: u32);
}

/// Fire-and-forget notification seam into the BIOS event system.
pub trait EventSink {
    fn deliver(&mut self, event: u32, spec: u16);
    /// Drop every queued CD-ROM notification.
    fn undeliver_all(&mut self);
    /// Drop every queued CD-ROM notification except acknowledge/done, which
    /// a preempting seek must leave observable.
    fn undeliver_all_except_ack_and_done(&mut self);
}
