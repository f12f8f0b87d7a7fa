//! Per-sector DMA programming.

use psx_cdrom_hw::{CdromPorts, DmaPorts, CMD_PAUSE, REQUEST_DATA};
use tracing::debug;

use crate::{CdromDriver, CommandState};

/// DICR bits the BIOS forces on for every CD-ROM transfer (channel-3
/// interrupt enable plus the master enable), applied over the preserved
/// low 24 bits.
const DICR_FORCE_BITS: u32 = 0x0088_0000;
const DICR_KEEP_MASK: u32 = 0x00FF_FFFF;
/// DPCR master-enable bit for the CD-ROM channel.
const DPCR_CDROM_ENABLE: u32 = 0x8000;
/// BCR: one block of `words_per_sector` words.
const BCR_ONE_BLOCK: u32 = 0x0001_0000;
/// CHCR: device to memory, burst mode, start immediately.
const CHCR_START_BURST: u32 = 0x1100_0000;
/// System-bus timing values the BIOS reprograms before every transfer.
const CDROM_DECODE_CTRL: u32 = 0x0002_0943;
const COMMON_DELAY: u32 = 0x0000_132C;

impl CdromDriver {
    /// Arm the DMA channel for one sector and account for it.
    ///
    /// Called from the data-ready completion handler, once per sector
    /// interrupt. A `sectors_remaining` of exactly 0 at entry flips to the
    /// -1 continuous-streaming sentinel first; negative values never
    /// pause. When the post-decrement count lands exactly on 0 the
    /// transfer is over: a PAUSE command goes out and the state moves to
    /// `Pausing`, which only a fresh command leaves. Otherwise the engine
    /// expects to be called again on the next sector-ready interrupt.
    pub fn initiate_dma(&mut self, ports: &mut dyn CdromPorts, dma: &mut dyn DmaPorts) {
        if self.sectors_remaining == 0 {
            self.sectors_remaining = -1;
        }
        self.initial_cursor = self.cursor;

        // Handshake: clear the request register, then ask for data.
        ports.select_bank(0);
        ports.write_request(0);
        ports.select_bank(0);
        ports.write_request(REQUEST_DATA);
        dma.set_cdrom_decode_control(CDROM_DECODE_CTRL);
        dma.set_common_delay(COMMON_DELAY);

        self.sectors_remaining -= 1;

        let dicr = (dma.interrupt_control() & DICR_KEEP_MASK) | DICR_FORCE_BITS;
        dma.set_interrupt_control(dicr);
        let dpcr = dma.control() | DPCR_CDROM_ENABLE;
        dma.set_control(dpcr);
        dma.set_base_address(self.cursor);
        dma.set_block_control(self.words_per_sector | BCR_ONE_BLOCK);
        dma.set_channel_control(CHCR_START_BURST);
        self.cursor = self
            .cursor
            .wrapping_add(self.words_per_sector.wrapping_mul(4));

        if self.sectors_remaining != 0 {
            return;
        }
        ports.select_bank(0);
        ports.write_command(CMD_PAUSE);
        self.state = CommandState::Pausing;
        debug!(cursor = self.cursor, "stream complete, pausing");
    }
}
