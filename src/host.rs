use crate::CanFrame;

/// Returned by [`Host::receive`] when the stack cannot take the frame.
/// The driver counts it as `rx_dropped` and carries on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameDropped;

/// Services the host CAN stack provides to the driver.
///
/// `receive` and `transmit_done` are invoked from the SPI completion
/// context and must not block. The queue methods pair up: the driver
/// stops the queue when it accepts a frame into its single transmit slot
/// and wakes it once that frame's TX interrupt has been acknowledged,
/// which is what keeps frames ordered.
///
/// The power hooks default to no-ops for boards without switchable
/// supplies or transceivers.
pub trait Host {
    /// Deliver a received frame.
    fn receive(&mut self, frame: CanFrame) -> Result<(), FrameDropped>;

    /// Return the echo of a frame whose transmission completed.
    fn transmit_done(&mut self, frame: CanFrame);

    /// No more frames until `wake_queue`.
    fn stop_queue(&mut self);

    fn wake_queue(&mut self);

    fn power_enable(&mut self, _on: bool) {}

    fn transceiver_enable(&mut self, _on: bool) {}

    /// One-time board hook, run at probe before the chip is touched.
    fn board_setup(&mut self) {}
}

/// Operational state of the controller as seen by the host framework.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CanState {
    Stopped,
    ErrorActive,
    ErrorWarning,
    ErrorPassive,
    BusOff,
}

/// Mode change requested through [`MCP2515::set_mode`].
///
/// [`MCP2515::set_mode`]: crate::MCP2515::set_mode
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CanMode {
    Start,
    Stop,
    Sleep,
}

/// Transmit and receive error counters (TEC and REC).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BerrCounter {
    pub txerr: u8,
    pub rxerr: u8,
}

/// Interface counters, reset at probe only.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    pub rx_packets: u32,
    pub rx_bytes: u32,
    pub tx_packets: u32,
    pub tx_bytes: u32,
    /// Frames the host stack refused on delivery
    pub rx_dropped: u32,
    /// Receive buffer overflows reported through EFLG
    pub rx_over_errors: u32,
}
