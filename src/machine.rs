//! The interrupt-driven event chain.
//!
//! Every node of the chain issues exactly one SPI exchange through
//! [`Bus::submit`] and records which [`Step`] it is; the completion
//! arrives through [`MCP2515::spi_complete`], which dispatches on the
//! recorded step and picks the next node from the cached CANINTF/EFLG
//! bytes and the latched `transmit`/`interrupt` flags. The chain keeps
//! re-reading the flag registers until the chip reports none pending, so
//! a flag raised between a read and the matching clear is never lost.

use embedded_can::Frame;

use crate::bus::{Bus, MAX_TRANSFER};
use crate::host::Host;
use crate::registers::{Register, CANINTF, EFLG};
use crate::{CanFrame, Instruction, MCP2515};

/// Tag of the SPI exchange currently in flight.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Step {
    Idle,
    ReadFlags,
    ReadRxb0,
    ReadRxb1,
    ClearIntf,
    ClearEflg,
    LoadTxb0,
    RtsTxb0,
}

/// The single reusable transfer: one 32-byte area split into fixed TX
/// and RX halves, each 8-byte aligned for buses that DMA straight out
/// of it. No exchange exceeds [`MAX_TRANSFER`] bytes, so the halves
/// suffice exactly; multi-register reads longer than that must not be
/// added.
#[derive(Default)]
#[repr(C, align(8))]
pub(crate) struct Transfer {
    pub(crate) tx: [u8; 16],
    pub(crate) rx: [u8; 16],
    pub(crate) len: usize,
}

impl<B: Bus, H: Host> MCP2515<B, H> {
    /// Hardware interrupt entry point.
    ///
    /// Call on every falling edge of the chip's interrupt line. Never
    /// performs I/O beyond starting one SPI exchange and never blocks:
    /// if an exchange is already in flight the event is latched and
    /// serviced when the running chain drains.
    pub fn on_interrupt(&mut self) {
        if self.busy {
            self.interrupt = true;
            return;
        }
        self.busy = true;

        self.read_flags();
    }

    /// Host transmit entry point.
    ///
    /// Accepts the frame into the single outstanding-transmit slot and
    /// stops the host queue; the queue is woken again once the chip
    /// acknowledges the transmission, which preserves submission order.
    /// A host that submits despite the stopped queue gets `WouldBlock`.
    pub fn transmit(&mut self, frame: &CanFrame) -> nb::Result<(), B::Error> {
        if self.pending.is_some() {
            return Err(nb::Error::WouldBlock);
        }

        self.host.stop_queue();
        self.pending = Some(frame.clone());

        if self.busy {
            self.transmit = true;
            return Ok(());
        }
        self.busy = true;

        self.load_txb0();
        Ok(())
    }

    /// SPI completion entry point.
    ///
    /// The platform glue calls this with the bytes clocked in by the
    /// exchange most recently submitted through [`Bus::submit`], on
    /// whatever context the bus completes on.
    pub fn spi_complete(&mut self, rx: &[u8]) {
        let n = rx.len().min(self.xfer.len).min(self.xfer.rx.len());
        self.xfer.rx[..n].copy_from_slice(&rx[..n]);

        match self.step {
            Step::Idle => log::warn!("SPI completion with no exchange in flight"),
            Step::ReadFlags => self.read_flags_complete(),
            Step::ReadRxb0 => self.read_rxb0_complete(),
            Step::ReadRxb1 => self.read_rxb1_complete(),
            Step::ClearIntf => self.clear_canintf_complete(),
            Step::ClearEflg => self.clear_eflg_complete(),
            Step::LoadTxb0 => self.rts_txb0(),
            Step::RtsTxb0 => self.read_flags(),
        }
    }

    pub(crate) fn reset_machine(&mut self) {
        self.step = Step::Idle;
        self.busy = false;
        self.interrupt = false;
        self.transmit = false;
        self.canintf = 0;
        self.eflg = 0;
        self.pending = None;
    }

    fn start_transfer(&mut self, len: usize) {
        debug_assert!(len <= MAX_TRANSFER);
        self.xfer.len = len;
        if let Err(err) = self.bus.submit(&self.xfer.tx[..len]) {
            // No retry timer: `busy` stays set and the next hardware
            // interrupt restarts the chain with a flag read.
            log::error!("async SPI submit failed: {:?}", err);
        }
    }

    /// Read CANINTF and EFLG in one exchange.
    fn read_flags(&mut self) {
        self.step = Step::ReadFlags;
        self.xfer.tx[..4].copy_from_slice(&[Instruction::Read as u8, CANINTF::ADDRESS, 0, 0]);
        self.start_transfer(4);
    }

    fn read_rxb(&mut self, step: Step, instruction: u8) {
        self.step = step;
        self.xfer.tx = [0; 16];
        self.xfer.tx[0] = instruction;
        // opcode + id(4) + dlc + data(8)
        self.start_transfer(14);
    }

    fn read_rxb0(&mut self) {
        self.read_rxb(Step::ReadRxb0, Instruction::ReadRxBuffer as u8);
    }

    fn read_rxb1(&mut self) {
        self.read_rxb(Step::ReadRxb1, Instruction::ReadRxBuffer as u8 | (1 << 2));
    }

    /// Acknowledge every flag of the last CANINTF read except the RX
    /// ones, which READ-RXB already cleared on deselect.
    fn clear_canintf(&mut self) {
        self.step = Step::ClearIntf;
        let mask = self.canintf & !(CANINTF::RX0IF | CANINTF::RX1IF);
        self.xfer.tx[..4].copy_from_slice(&[
            Instruction::BitModify as u8,
            CANINTF::ADDRESS,
            mask,
            0,
        ]);
        self.start_transfer(4);
    }

    fn clear_eflg(&mut self) {
        self.step = Step::ClearEflg;
        self.xfer.tx[..4].copy_from_slice(&[
            Instruction::BitModify as u8,
            EFLG::ADDRESS,
            self.eflg,
            0,
        ]);
        self.start_transfer(4);
    }

    fn load_txb0(&mut self) {
        self.step = Step::LoadTxb0;
        let len = match &self.pending {
            Some(frame) => {
                let n = 5 + frame.dlc();
                self.xfer.tx[0] = Instruction::LoadTxBuffer as u8;
                self.xfer.tx[1..1 + n].copy_from_slice(&frame.as_bytes()[..n]);
                1 + n
            }
            None => {
                log::error!("transmission scheduled without a pending frame");
                return self.read_flags();
            }
        };
        self.start_transfer(len);
    }

    fn rts_txb0(&mut self) {
        self.step = Step::RtsTxb0;
        self.xfer.tx[0] = Instruction::Rts as u8 | 1;
        self.start_transfer(1);
    }

    fn read_flags_complete(&mut self) {
        self.canintf = self.xfer.rx[2];
        self.eflg = self.xfer.rx[3];

        if self.canintf & CANINTF::RX0IF != 0 {
            self.read_rxb0();
        } else if self.canintf & CANINTF::RX1IF != 0 {
            self.read_rxb1();
        } else if self.canintf != 0 {
            self.clear_canintf();
        } else if self.transmit {
            self.transmit = false;
            self.load_txb0();
        } else if self.interrupt {
            // an edge arrived while the chain was running
            self.interrupt = false;
            self.read_flags();
        } else {
            self.busy = false;
            self.step = Step::Idle;
        }
    }

    fn read_rxb0_complete(&mut self) {
        self.deliver_frame();

        if self.canintf & CANINTF::RX1IF != 0 {
            self.read_rxb1();
        } else {
            self.transmit_or_read_flags();
        }
    }

    fn read_rxb1_complete(&mut self) {
        self.deliver_frame();

        self.transmit_or_read_flags();
    }

    /// A frame accepted mid-chain takes priority over re-reading flags,
    /// so a long RX burst cannot starve the transmit slot.
    fn transmit_or_read_flags(&mut self) {
        if self.transmit {
            self.transmit = false;
            self.load_txb0();
        } else {
            self.read_flags();
        }
    }

    fn deliver_frame(&mut self) {
        let mut bytes = [0u8; 13];
        bytes.copy_from_slice(&self.xfer.rx[1..14]);
        let frame = CanFrame::from_rx_bytes(bytes);
        let dlc = frame.dlc() as u32;

        match self.host.receive(frame) {
            Ok(()) => {
                self.stats.rx_packets += 1;
                self.stats.rx_bytes += dlc;
            }
            Err(_) => self.stats.rx_dropped += 1,
        }
    }

    fn clear_canintf_complete(&mut self) {
        if self.canintf & CANINTF::TX0IF != 0 {
            if let Some(frame) = self.pending.take() {
                self.stats.tx_packets += 1;
                self.stats.tx_bytes += frame.dlc() as u32;
                self.host.transmit_done(frame);
            }
            self.host.wake_queue();
        }

        if self.eflg != 0 {
            self.clear_eflg();
        } else {
            self.read_flags();
        }
    }

    fn clear_eflg_complete(&mut self) {
        // The receive flow chart (figure 4-3) of the data sheet (DS21801E)
        // says that with BUKT set an overflow raises EFLG.RX1OVR, when in
        // fact it is EFLG.RX0OVR that is set. Test for either.
        if self.eflg & (EFLG::RX0OVR | EFLG::RX1OVR) != 0 {
            self.stats.rx_over_errors += 1;
        }

        self.read_flags();
    }
}
