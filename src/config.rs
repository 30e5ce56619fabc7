use modular_bitfield::prelude::*;

use crate::registers::{CNF, CNF1, CNF2, CNF3};

/// CAN bit timing, already validated by the host framework.
///
/// Limits: `prop_seg + phase_seg1` in 2..=16, `phase_seg2` in 2..=8,
/// `sjw` up to 4, `brp` in 1..=64. The time quantum is derived from
/// half the oscillator frequency.
#[derive(Copy, Clone, Debug)]
pub struct BitTiming {
    /// Baud rate prescaler, 1..=64
    pub brp: u8,
    /// Synchronization jump width, 1..=4
    pub sjw: u8,
    /// Propagation segment, in time quanta
    pub prop_seg: u8,
    /// Phase segment 1, in time quanta
    pub phase_seg1: u8,
    /// Phase segment 2, in time quanta
    pub phase_seg2: u8,
}

impl BitTiming {
    /// Configuration register values for this timing.
    ///
    /// BTLMODE is always set: PS2 length comes from CNF3 rather than
    /// being derived from PS1.
    pub fn cnf(&self, triple_sampling: bool) -> CNF {
        CNF {
            cnf3: CNF3::new().with_phseg2(self.phase_seg2 - 1),
            cnf2: CNF2::new()
                .with_btlmode(true)
                .with_sam(triple_sampling)
                .with_phseg1(self.phase_seg1 - 1)
                .with_prseg(self.prop_seg - 1),
            cnf1: CNF1::new().with_sjw(self.sjw - 1).with_brp(self.brp - 1),
        }
    }
}

/// Requested controller behaviour, mirroring the host framework's
/// control-mode bitset.
#[bitfield]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default)]
pub struct CtrlMode {
    /// Internal loopback, no bus traffic
    pub loopback: bool,
    /// Listen-only, no dominant bits driven
    pub listen_only: bool,
    /// Sample each bit three times
    pub triple_sampling: bool,
    /// No automatic retransmission
    pub one_shot: bool,
    #[skip]
    __: B4,
}

/// Static per-controller configuration, fixed between open and close.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    pub bit_timing: BitTiming,
    pub ctrl_mode: CtrlMode,
    /// Crystal frequency of the chip, in Hz
    pub oscillator_hz: u32,
}

impl Config {
    pub fn new(bit_timing: BitTiming, oscillator_hz: u32) -> Self {
        Config {
            bit_timing,
            ctrl_mode: CtrlMode::default(),
            oscillator_hz,
        }
    }

    pub fn ctrl_mode(mut self, mode: CtrlMode) -> Self {
        self.ctrl_mode = mode;
        self
    }

    /// The CAN bit-rate divisor source: the MCP2515 runs its bit timing
    /// off half the oscillator frequency.
    pub fn can_clock_hz(&self) -> u32 {
        self.oscillator_hz / 2
    }
}
