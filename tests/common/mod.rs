#![allow(dead_code)]

use std::collections::VecDeque;

use mcp2515_async::{BitTiming, Bus, CanFrame, Config, FrameDropped, Host, MCP2515};

/// Scripted asynchronous bus: records every submitted exchange and
/// answers it with the next scripted response. Panics if the driver
/// ever submits while a completion is still undelivered, which pins
/// down the single-transaction-in-flight invariant in every test.
#[derive(Default)]
pub struct ScriptedBus {
    /// Every `submit`ed exchange, verbatim
    pub submitted: Vec<Vec<u8>>,
    /// Responses handed out per submit, in order
    pub responses: VecDeque<Vec<u8>>,
    /// Completion not yet pumped into the driver
    pub completed: Option<Vec<u8>>,
    /// Blocking traffic (bring-up paths)
    pub writes: Vec<Vec<u8>>,
    /// Make the next `submit` fail
    pub fail_next: bool,
}

#[derive(Debug, Eq, PartialEq)]
pub struct BusFault;

impl Bus for ScriptedBus {
    type Error = BusFault;

    fn write(&mut self, tx: &[u8]) -> Result<(), BusFault> {
        self.writes.push(tx.to_vec());
        Ok(())
    }

    fn write_then_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), BusFault> {
        self.writes.push(tx.to_vec());
        rx.fill(0);
        Ok(())
    }

    fn submit(&mut self, tx: &[u8]) -> Result<(), BusFault> {
        assert!(
            self.completed.is_none(),
            "exchange submitted while another is outstanding"
        );
        if self.fail_next {
            self.fail_next = false;
            return Err(BusFault);
        }

        self.submitted.push(tx.to_vec());
        let rx = self
            .responses
            .pop_front()
            .unwrap_or_else(|| vec![0; tx.len()]);
        assert_eq!(rx.len(), tx.len(), "scripted response length mismatch");
        self.completed = Some(rx);
        Ok(())
    }
}

/// Host stack double: records deliveries, echoes and queue/power
/// transitions.
#[derive(Default)]
pub struct RecordingHost {
    pub received: Vec<CanFrame>,
    pub echoed: Vec<CanFrame>,
    pub queue_stopped: bool,
    pub wakes: usize,
    pub power_events: Vec<bool>,
    pub transceiver_events: Vec<bool>,
    /// Simulate allocation failure on delivery
    pub reject_rx: bool,
}

impl Host for RecordingHost {
    fn receive(&mut self, frame: CanFrame) -> Result<(), FrameDropped> {
        if self.reject_rx {
            return Err(FrameDropped);
        }
        self.received.push(frame);
        Ok(())
    }

    fn transmit_done(&mut self, frame: CanFrame) {
        self.echoed.push(frame);
    }

    fn stop_queue(&mut self) {
        self.queue_stopped = true;
    }

    fn wake_queue(&mut self) {
        self.queue_stopped = false;
        self.wakes += 1;
    }

    fn power_enable(&mut self, on: bool) {
        self.power_events.push(on);
    }

    fn transceiver_enable(&mut self, on: bool) {
        self.transceiver_events.push(on);
    }
}

/// 500 kbit/s from a 16 MHz crystal.
pub fn test_config() -> Config {
    Config::new(
        BitTiming {
            brp: 1,
            sjw: 1,
            prop_seg: 2,
            phase_seg1: 7,
            phase_seg2: 6,
        },
        16_000_000,
    )
}

pub fn controller() -> MCP2515<ScriptedBus, RecordingHost> {
    MCP2515::new(ScriptedBus::default(), RecordingHost::default(), test_config())
}

/// Deliver completions until the bus has nothing outstanding.
pub fn pump(can: &mut MCP2515<ScriptedBus, RecordingHost>) {
    while let Some(rx) = can.bus.completed.take() {
        can.spi_complete(&rx);
    }
}

/// Deliver exactly one completion.
pub fn step(can: &mut MCP2515<ScriptedBus, RecordingHost>) {
    let rx = can.bus.completed.take().expect("no completion outstanding");
    can.spi_complete(&rx);
}

/// 14-byte READ-RXB response for a standard-identifier data frame.
pub fn rxb_response(id: u16, data: &[u8]) -> Vec<u8> {
    let mut rx = vec![0u8; 14];
    rx[1] = (id >> 3) as u8;
    rx[2] = ((id << 5) & 0xE0) as u8;
    rx[5] = data.len() as u8;
    rx[6..6 + data.len()].copy_from_slice(data);
    rx
}
