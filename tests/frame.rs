//! Frame <-> buffer mapping, exercised end to end: the bytes a transmit
//! puts into LOAD-TXB are fed back as a READ-RXB response and must decode
//! to the original frame.

use embedded_can::{ExtendedId, Frame, Id, StandardId};
use mcp2515_async::CanFrame;

mod common;
use common::{controller, pump};

/// Transmit `frame` and capture the 13 payload bytes of the LOAD-TXB0
/// exchange, zero-padded the way the chip's buffer registers would be.
fn loaded_payload(frame: &CanFrame) -> [u8; 13] {
    let mut can = controller();
    can.transmit(frame).unwrap();

    let load = &can.bus.submitted[0];
    assert_eq!(load[0], 0x40);
    assert_eq!(load.len(), 1 + 5 + frame.dlc());

    let mut payload = [0u8; 13];
    payload[..load.len() - 1].copy_from_slice(&load[1..]);
    payload
}

/// Deliver `payload` as the contents of receive buffer 0.
fn received_frame(payload: [u8; 13]) -> CanFrame {
    let mut can = controller();
    can.bus.responses.push_back(vec![0, 0, 0x01, 0x00]);
    let mut rxb = vec![0u8; 14];
    rxb[1..].copy_from_slice(&payload);
    can.bus.responses.push_back(rxb);
    can.bus.responses.push_back(vec![0, 0, 0x00, 0x00]);

    can.on_interrupt();
    pump(&mut can);

    assert_eq!(can.host.received.len(), 1);
    can.host.received.remove(0)
}

#[test]
fn standard_frame_round_trip() {
    let id = Id::Standard(StandardId::new(0x123).unwrap());
    let frame = CanFrame::new(id, &[0xAA, 0xBB, 0xCC]).unwrap();

    let payload = loaded_payload(&frame);
    assert_eq!(payload[0], 0x24); // SIDH
    assert_eq!(payload[1], 0x60); // SIDL, IDE clear
    assert_eq!(payload[4], 3); // DLC
    assert_eq!(&payload[5..8], [0xAA, 0xBB, 0xCC]);

    let back = received_frame(payload);
    assert_eq!(back.id(), id);
    assert_eq!(back.dlc(), 3);
    assert_eq!(back.data(), [0xAA, 0xBB, 0xCC]);
    assert!(!back.is_extended());
    assert!(!back.is_remote_frame());
}

#[test]
fn extended_frame_round_trip() {
    let id = Id::Extended(ExtendedId::new(0x1ABC_DEF0).unwrap());
    let frame = CanFrame::new(id, &[0x11, 0x22]).unwrap();

    let payload = loaded_payload(&frame);
    assert_eq!(payload[0], 0xD5); // SIDH = id >> 21
    assert_ne!(payload[1] & 0x08, 0); // IDE set

    let back = received_frame(payload);
    assert_eq!(back.id(), id);
    assert_eq!(back.dlc(), 2);
    assert_eq!(back.data(), [0x11, 0x22]);
    assert!(back.is_extended());
}

#[test]
fn standard_remote_frame_round_trip() {
    let id = Id::Standard(StandardId::new(0x42).unwrap());
    let frame = CanFrame::new_remote(id, 3).unwrap();

    let payload = loaded_payload(&frame);
    assert_eq!(payload[4], 0x40 | 3); // RTR bit beside the length

    // the chip reports a standard remote frame through SIDL's SRR bit
    let mut rx_payload = payload;
    rx_payload[1] |= 0x10;
    rx_payload[4] = 3;

    let back = received_frame(rx_payload);
    assert_eq!(back.id(), id);
    assert!(back.is_remote_frame());
    assert_eq!(back.dlc(), 3);
    assert_eq!(back.data(), [0, 0, 0]);
}

#[test]
fn extended_remote_frame_round_trip() {
    let id = Id::Extended(ExtendedId::new(0xBEEF).unwrap());
    let frame = CanFrame::new_remote(id, 2).unwrap();

    let back = received_frame(loaded_payload(&frame));
    assert_eq!(back.id(), id);
    assert!(back.is_extended());
    assert!(back.is_remote_frame());
    assert_eq!(back.dlc(), 2);
}

#[test]
fn received_dlc_is_clamped_to_eight() {
    let mut payload = [0u8; 13];
    payload[0] = 0x40; // SIDH for id 0x200
    payload[4] = 0x0F; // nonsense length from the wire

    let back = received_frame(payload);
    assert_eq!(back.dlc(), 8);
    assert_eq!(back.data().len(), 8);
}

#[test]
fn oversized_frames_are_rejected() {
    let id = Id::Standard(StandardId::new(1).unwrap());
    assert!(CanFrame::new(id, &[0; 9]).is_none());
    assert!(CanFrame::new_remote(id, 9).is_none());
}
