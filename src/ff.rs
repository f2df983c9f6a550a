//! C5: FF effect manager. Synthesizes the fixed 64-byte USB interrupt-OUT
//! packets for the T818's force-feedback engine and hands them to the URB
//! sender tagged with pipe index 3. Byte templates are taken verbatim from
//! the vendor driver this core replaces; the manager never blocks on USB,
//! it only enqueues.

use crate::error::Result;
use crate::urb::{UrbSender, URB_MESSAGE_LEN};

/// Pipe index the FF engine listens on.
pub const FF_PIPE_INDEX: u8 = 3;

const ID_INDEX: usize = 2;
const SPRING_ID: u8 = 0x01;
const CONSTANT_ID: u8 = 0x02;
const GAIN_INDEX: usize = 2;
const CONSTANT_LOW_INDEX: usize = 4;
const CONSTANT_HIGH_INDEX: usize = 5;

const CONFIGURATION_PACK_1: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x01;
    p[2] = 0x04;
    p
};

const CONFIGURATION_PACK_2: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x01;
    p[2] = 0x05;
    p
};

const SET_RANGE: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x08;
    p[2] = 0x11;
    p[3] = 0x60;
    p[4] = 0x54;
    p
};

const GAIN_BASE: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x02;
    p[2] = 0xFF;
    p
};

const SPRING: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x00;
    p[2] = 0x01;
    p[3] = 0x64;
    p[4] = 0x66;
    p[5] = 0x26;
    p[6] = 0x66;
    p[7] = 0x26;
    p
};

const PLAY_EFFECT_BASE: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x00;
    p[2] = 0x01;
    p[3] = 0x89;
    p[4] = 0x41;
    p[5] = 0x01;
    p
};

const CONSTANT_BASE: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x00;
    p[2] = 0x01;
    p[3] = 0x6A;
    p[4] = 0xFF;
    p[5] = 0xF0;
    p
};

const STOP_EFFECT_BASE: [u8; URB_MESSAGE_LEN] = {
    let mut p = [0u8; URB_MESSAGE_LEN];
    p[0] = 0x60;
    p[1] = 0x00;
    p[2] = 0x01;
    p[3] = 0x89;
    p
};

/// Runs the init sequence: two configuration packets, a range packet, then
/// gain=0xFF. Spring upload/play is left to the caller (`drive_control` runs
/// it once, on the WaitingWheelConfiguration -> ReadingWheel transition) so
/// this function stays a pure enqueue burst.
pub fn init_sequence(urb: &mut UrbSender) -> Result<()> {
    urb.enqueue(FF_PIPE_INDEX, CONFIGURATION_PACK_1)?;
    urb.enqueue(FF_PIPE_INDEX, CONFIGURATION_PACK_2)?;
    urb.enqueue(FF_PIPE_INDEX, SET_RANGE)?;
    set_gain(urb, 0xFF)?;
    Ok(())
}

pub fn set_gain(urb: &mut UrbSender, value: u8) -> Result<()> {
    let mut pkt = GAIN_BASE;
    pkt[GAIN_INDEX] = value;
    urb.enqueue(FF_PIPE_INDEX, pkt)
}

pub fn upload_spring(urb: &mut UrbSender) -> Result<()> {
    urb.enqueue(FF_PIPE_INDEX, SPRING)
}

pub fn upload_constant(urb: &mut UrbSender, value: i16) -> Result<()> {
    let mut pkt = CONSTANT_BASE;
    pkt[ID_INDEX] = CONSTANT_ID;
    let bytes = value.to_le_bytes();
    pkt[CONSTANT_LOW_INDEX] = bytes[0];
    pkt[CONSTANT_HIGH_INDEX] = bytes[1];
    urb.enqueue(FF_PIPE_INDEX, pkt)
}

pub fn play_spring(urb: &mut UrbSender) -> Result<()> {
    let mut pkt = PLAY_EFFECT_BASE;
    pkt[ID_INDEX] = SPRING_ID;
    urb.enqueue(FF_PIPE_INDEX, pkt)
}

pub fn play_constant(urb: &mut UrbSender) -> Result<()> {
    let mut pkt = PLAY_EFFECT_BASE;
    pkt[ID_INDEX] = CONSTANT_ID;
    urb.enqueue(FF_PIPE_INDEX, pkt)
}

pub fn stop_spring(urb: &mut UrbSender) -> Result<()> {
    let mut pkt = STOP_EFFECT_BASE;
    pkt[ID_INDEX] = SPRING_ID;
    urb.enqueue(FF_PIPE_INDEX, pkt)
}

pub fn stop_constant(urb: &mut UrbSender) -> Result<()> {
    let mut pkt = STOP_EFFECT_BASE;
    pkt[ID_INDEX] = CONSTANT_ID;
    urb.enqueue(FF_PIPE_INDEX, pkt)
}
