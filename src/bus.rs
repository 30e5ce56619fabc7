use core::fmt::Debug;

use embedded_hal::spi::{Operation, SpiDevice};

/// Longest transaction the driver ever issues: LOAD-TXB and READ-RXB are
/// an opcode plus 13 payload bytes.
pub const MAX_TRANSFER: usize = 14;

/// Contract the SPI bus controller must provide.
///
/// The two blocking operations are used only from bring-up and the
/// synchronous entry points. `submit` starts a full-duplex exchange and
/// returns immediately; when the exchange finishes, the platform glue
/// must hand the clocked-in bytes to [`MCP2515::spi_complete`], on
/// whatever context the bus completes on.
///
/// At most one submitted exchange is outstanding per controller; the
/// driver never submits again before the completion has been delivered.
///
/// [`MCP2515::spi_complete`]: crate::MCP2515::spi_complete
pub trait Bus {
    type Error: Debug;

    /// Blocking write of `tx`.
    fn write(&mut self, tx: &[u8]) -> Result<(), Self::Error>;

    /// Blocking write of `tx`, then read of `rx.len()` bytes.
    fn write_then_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;

    /// Start an asynchronous full-duplex exchange of `tx.len()` bytes.
    /// The implementation must not retain `tx` past this call.
    fn submit(&mut self, tx: &[u8]) -> Result<(), Self::Error>;
}

/// [`Bus`] adapter over a blocking [`SpiDevice`].
///
/// `submit` performs the exchange immediately and latches the response;
/// the integration pumps [`take_completion`] into
/// [`MCP2515::spi_complete`] from its main loop. Suitable for targets
/// without an asynchronous SPI controller and for the test suite.
///
/// [`take_completion`]: BlockingBus::take_completion
/// [`MCP2515::spi_complete`]: crate::MCP2515::spi_complete
pub struct BlockingBus<SPI> {
    pub spi: SPI,
    completion: Option<([u8; MAX_TRANSFER], usize)>,
}

impl<SPI> BlockingBus<SPI> {
    pub fn new(spi: SPI) -> Self {
        BlockingBus {
            spi,
            completion: None,
        }
    }

    /// The response of the most recent `submit`, once.
    pub fn take_completion(&mut self) -> Option<([u8; MAX_TRANSFER], usize)> {
        self.completion.take()
    }
}

impl<SPI: SpiDevice> Bus for BlockingBus<SPI> {
    type Error = SPI::Error;

    fn write(&mut self, tx: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(tx)
    }

    fn write_then_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error> {
        self.spi
            .transaction(&mut [Operation::Write(tx), Operation::Read(rx)])
    }

    fn submit(&mut self, tx: &[u8]) -> Result<(), Self::Error> {
        let mut buf = [0u8; MAX_TRANSFER];
        let len = tx.len().min(MAX_TRANSFER);
        buf[..len].copy_from_slice(&tx[..len]);
        self.spi.transfer_in_place(&mut buf[..len])?;
        self.completion = Some((buf, len));
        Ok(())
    }
}
