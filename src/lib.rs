//! Interrupt-driven driver core for the Microchip MCP2515 SPI CAN
//! controller.
//!
//! The chip raises a single active-low interrupt for receive, transmit
//! and error events, and every reaction to it is a multi-byte SPI
//! exchange. This crate services all of that without ever blocking the
//! interrupt path: each exchange is submitted asynchronously through the
//! [`Bus`] collaborator and the next one is chosen when its completion
//! comes back through [`MCP2515::spi_complete`].
//!
//! Integration contract:
//! * wire the chip's interrupt line (falling edge) to
//!   [`MCP2515::on_interrupt`],
//! * deliver every finished SPI exchange to [`MCP2515::spi_complete`],
//! * feed outbound frames to [`MCP2515::transmit`],
//! * serialise those three entry points with an interrupt-safe critical
//!   section; they share the controller state and may be triggered from
//!   interrupt context. None of them blocks, so the sections stay short.
//!
//! [`MCP2515::open`], [`MCP2515::close`], [`MCP2515::set_mode`] and
//! [`MCP2515::berr_counter`] use the blocking side of the bus and must
//! only run from thread context, with the interrupt line quiesced.

#![no_std]

use embedded_hal::delay::DelayNs;

pub use bus::{BlockingBus, Bus};
pub use config::{BitTiming, Config, CtrlMode};
pub use frame::CanFrame;
pub use host::{BerrCounter, CanMode, CanState, FrameDropped, Host, Stats};
pub use idheader::IdHeader;

use crate::machine::{Step, Transfer};
use crate::registers::*;

pub mod bus;
mod config;
mod frame;
mod host;
mod idheader;
mod machine;
pub mod registers;

/// SPI instruction set of the MCP2515.
#[derive(Copy, Clone, Debug)]
#[repr(u8)]
pub enum Instruction {
    /// Resets internal registers to the default state, sets Configuration mode.
    Reset = 0b1100_0000,
    /// Reads data from the register beginning at the selected address.
    Read = 0b0000_0011,
    /// Writes data to the register beginning at the selected address.
    Write = 0b0000_0010,
    /// Instructs the controller to begin the message transmission sequence for
    /// any of the transmit buffers specified in `0b1000_0nnn`.
    Rts = 0b1000_0000,
    /// Allows the user to set or clear individual bits in a particular register.
    ///
    /// Note: Not all registers can be bit modified with this command.
    /// Executing this command on registers that are not bit modifiable will force the mask to FFh.
    ///
    /// Registers that can be modified with this command implement
    /// [`Modify`](registers::Modify).
    BitModify = 0b0000_0101,
    /// When reading a receive buffer, reduces the overhead of a normal `Read`
    /// command by placing the Address Pointer at one of four locations, as
    /// indicated by ‘nm’ in `0b1001_0nm0`.
    ///
    /// Note: The associated RX flag bit (`rxNif` bits in the [`CANINTF`] register) will be cleared after bringing CS high.
    ReadRxBuffer = 0b1001_0000,
    /// When loading a transmit buffer, reduces the overhead of a normal `Write`
    /// command by placing the Address Pointer at one of six locations, as
    /// indicated by ‘abc’ in `0b0100_0abc`.
    LoadTxBuffer = 0b0100_0000,
}

/// Errors reported by the synchronous entry points.
///
/// The asynchronous machine never surfaces errors to the host; its
/// failures are logged and counted instead.
#[derive(Debug, Eq, PartialEq)]
pub enum Error<E> {
    /// SPI bus failure
    Spi(E),
    /// Power-on signature mismatch: no MCP2515 on the bus
    NoDevice { canstat: u8, canctrl: u8 },
    /// The chip did not reach the requested operation mode in time
    ModeTimeout,
    /// Mode change not supported by this controller
    NotSupported,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Spi(err)
    }
}

/// How often, at 1 ms spacing, CANSTAT is polled for a requested mode
/// before bring-up gives up.
const MODE_POLL_TRIES: u32 = 1000;

/// Driver state for one MCP2515.
///
/// `B` is the SPI bus endpoint the chip hangs off, `H` the host CAN
/// stack being served. Construct with [`MCP2515::new`], verify the chip
/// with [`MCP2515::detect`], then [`MCP2515::open`].
pub struct MCP2515<B, H> {
    pub bus: B,
    pub host: H,
    pub(crate) config: Config,
    pub(crate) state: CanState,
    pub(crate) stats: Stats,
    // Event machine bookkeeping. `busy` is owned by whichever context
    // set it; `interrupt` and `transmit` latch stimuli that arrived
    // while the chain was running.
    pub(crate) step: Step,
    pub(crate) busy: bool,
    pub(crate) interrupt: bool,
    pub(crate) transmit: bool,
    /// CANINTF byte of the most recent flag read
    pub(crate) canintf: u8,
    /// EFLG byte of the most recent flag read
    pub(crate) eflg: u8,
    /// The frame being transmitted or queued for TXB0
    pub(crate) pending: Option<CanFrame>,
    pub(crate) xfer: Transfer,
}

impl<B, H> MCP2515<B, H> {
    pub fn new(bus: B, host: H, config: Config) -> Self {
        MCP2515 {
            bus,
            host,
            config,
            state: CanState::Stopped,
            stats: Stats::default(),
            step: Step::Idle,
            busy: false,
            interrupt: false,
            transmit: false,
            canintf: 0,
            eflg: 0,
            pending: None,
            xfer: Transfer::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> CanState {
        self.state
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// True while no SPI exchange is in flight or scheduled.
    pub fn is_idle(&self) -> bool {
        !self.busy
    }
}

impl<B: Bus, H: Host> MCP2515<B, H> {
    /// Probe for the chip.
    ///
    /// Runs the board hook, powers the chip up, resets it and compares
    /// CANSTAT/CANCTRL against their documented power-on values. The
    /// magic masks avoid mistaking a floating bus (all zeroes or all
    /// ones) for a device. Powers back off before returning.
    pub fn detect(&mut self) -> Result<(), Error<B::Error>> {
        self.host.board_setup();
        self.host.power_enable(true);
        let res = self.probe_signature();
        self.host.power_enable(false);
        res
    }

    fn probe_signature(&mut self) -> Result<(), Error<B::Error>> {
        self.reset_chip()?;

        let (canstat, canctrl) = self.read_2regs(CANSTAT::ADDRESS)?;
        log::debug!("detect: canstat={:#04x} canctrl={:#04x}", canstat, canctrl);

        if canstat & 0xee != 0x80 || canctrl & 0x17 != 0x07 {
            log::error!(
                "failed to detect chip (canstat={:#04x}, canctrl={:#04x})",
                canstat,
                canctrl
            );
            return Err(Error::NoDevice { canstat, canctrl });
        }
        Ok(())
    }

    /// Bring the interface up.
    ///
    /// Powers on and configures the chip, then opens the host transmit
    /// queue. The caller registers the interrupt handler; on failure
    /// everything done here is undone.
    pub fn open(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<B::Error>> {
        self.host.power_enable(true);
        self.reset_machine();

        if let Err(err) = self.chip_start(delay) {
            self.host.power_enable(false);
            return Err(err);
        }

        self.host.wake_queue();
        Ok(())
    }

    /// Take the interface down. The caller must have freed the
    /// interrupt line first; a frame still in the transmit slot is
    /// dropped.
    pub fn close(&mut self) {
        self.host.stop_queue();
        self.chip_stop();
        self.reset_machine();
        self.host.power_enable(false);
    }

    /// Host framework mode request. Only [`CanMode::Start`] (restart
    /// after bus-off) is supported.
    pub fn set_mode(
        &mut self,
        mode: CanMode,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::Error>> {
        match mode {
            CanMode::Start => {
                self.chip_start(delay)?;
                self.host.wake_queue();
                Ok(())
            }
            _ => Err(Error::NotSupported),
        }
    }

    /// Current transmit and receive error counters.
    pub fn berr_counter(&mut self) -> Result<BerrCounter, Error<B::Error>> {
        let (txerr, rxerr) = self.read_2regs(TEC::ADDRESS)?;
        Ok(BerrCounter { txerr, rxerr })
    }

    /// Reset, program bit timing, interrupt enables and receive buffer
    /// behaviour, then move the chip out of Configuration mode.
    fn chip_start(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<B::Error>> {
        self.reset_chip()?;

        let ctrl_mode = self.config.ctrl_mode;
        let cnf = self
            .config
            .bit_timing
            .cnf(ctrl_mode.triple_sampling())
            .into_bytes();
        let inte = CANINTE::new()
            .with_rx0ie(true)
            .with_rx1ie(true)
            .with_tx0ie(true)
            .with_tx1ie(true)
            .with_tx2ie(true)
            .with_errie(true);

        log::info!("writing CNF: {:#04x} {:#04x} {:#04x}", cnf[2], cnf[1], cnf[0]);
        self.bus.write(&[
            Instruction::Write as u8,
            CNF3::ADDRESS,
            cnf[0],
            cnf[1],
            cnf[2],
            u8::from(inte),
        ])?;

        // Accept everything; BUKT lets a frame roll over from buffer 0
        // to buffer 1 when 0 is still full.
        let rxb0ctrl = RXB0CTRL::new().with_rxm(RXM::ReceiveAny).with_bukt(true);
        let rxb1ctrl = RXB1CTRL::new().with_rxm(RXM::ReceiveAny);
        self.bus.write(&[
            Instruction::Write as u8,
            RXB0CTRL::ADDRESS,
            u8::from(rxb0ctrl),
            u8::from(rxb1ctrl),
        ])?;

        let reqop = if ctrl_mode.loopback() {
            OperationMode::Loopback
        } else if ctrl_mode.listen_only() {
            OperationMode::ListenOnly
        } else {
            OperationMode::NormalOperation
        };
        let canctrl = CANCTRL::new()
            .with_reqop(reqop)
            .with_osm(ctrl_mode.one_shot());

        self.host.transceiver_enable(true);
        match self.enter_mode(canctrl, delay) {
            Ok(()) => {
                self.state = CanState::ErrorActive;
                Ok(())
            }
            Err(err) => {
                self.host.transceiver_enable(false);
                Err(err)
            }
        }
    }

    fn enter_mode(
        &mut self,
        canctrl: CANCTRL,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<B::Error>> {
        let requested = u8::from(canctrl) & CANCTRL::REQOP_MASK;
        self.write_reg(CANCTRL::ADDRESS, canctrl.into())?;

        for _ in 0..MODE_POLL_TRIES {
            let canstat = self.read_reg(CANSTAT::ADDRESS)?;
            if canstat & CANCTRL::REQOP_MASK == requested {
                return Ok(());
            }
            delay.delay_ms(1);
        }

        log::error!("didn't enter requested mode {:#04x}", requested);
        Err(Error::ModeTimeout)
    }

    fn chip_stop(&mut self) {
        if let Err(err) = self.bus.write(&[Instruction::Reset as u8]) {
            log::warn!("reset on stop failed: {:?}", err);
        }
        self.host.transceiver_enable(false);
        self.state = CanState::Stopped;
    }

    /// Reset internal registers to default state and enter Configuration
    /// mode. Synchronous.
    fn reset_chip(&mut self) -> Result<(), B::Error> {
        self.bus.write(&[Instruction::Reset as u8])
    }

    fn write_reg(&mut self, reg: u8, val: u8) -> Result<(), B::Error> {
        self.bus.write(&[Instruction::Write as u8, reg, val])
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, B::Error> {
        let mut val = [0u8; 1];
        self.bus
            .write_then_read(&[Instruction::Read as u8, reg], &mut val)?;
        Ok(val[0])
    }

    /// Read two consecutive registers in one exchange.
    fn read_2regs(&mut self, reg: u8) -> Result<(u8, u8), B::Error> {
        let mut vals = [0u8; 2];
        self.bus
            .write_then_read(&[Instruction::Read as u8, reg], &mut vals)?;
        Ok((vals[0], vals[1]))
    }
}
