//! C7: drive-control input state machine. Owns the 25 button classifiers,
//! normalizes pedal/wheel raw units, and drives the FF tracking loop. The
//! HID report handed to `step` is assumed already copied out of the USB
//! double-buffer under a scoped critical section by the caller — this
//! module never touches the raw buffer directly.

use crate::button::{Button, ButtonKind};
use crate::error::Result;
use crate::ff;
use crate::hid::{self, DPad, REPORT_LEN};
use crate::math::{map_value, slew_toward};
use crate::rotation::RotationManager;
use crate::urb::UrbSender;

pub const BUTTON_COUNT: usize = 25;

pub const BUTTON_PADDLE_SHIFTER_LEFT: usize = 0;
pub const BUTTON_PADDLE_SHIFTER_RIGHT: usize = 1;
pub const BUTTON_DRINK: usize = 2;
pub const BUTTON_RADIO: usize = 3;
pub const BUTTON_ONE_PLUS: usize = 4;
pub const BUTTON_TEN_MINUS: usize = 5;
pub const BUTTON_SHA: usize = 6;
pub const BUTTON_OIL: usize = 7;
pub const BUTTON_PARKING: usize = 8;
pub const BUTTON_NEUTRAL: usize = 9;
pub const BUTTON_K1: usize = 10;
pub const BUTTON_K2: usize = 11;
pub const BUTTON_S1: usize = 12;
pub const BUTTON_LEFT_SIDE_WHEEL_UP: usize = 13;
pub const BUTTON_LEFT_SIDE_WHEEL_DOWN: usize = 14;
pub const BUTTON_RIGHT_SIDE_WHEEL_UP: usize = 15;
pub const BUTTON_RIGHT_SIDE_WHEEL_DOWN: usize = 16;
pub const BUTTON_GRIP_ANTICLOCKWISE: usize = 17;
pub const BUTTON_GRIP_CLOCKWISE: usize = 18;
pub const BUTTON_ENG_ANTICLOCKWISE: usize = 19;
pub const BUTTON_ENG_CLOCKWISE: usize = 20;
pub const BUTTON_22: usize = 21;
pub const BUTTON_23: usize = 22;
pub const BUTTON_GRIP: usize = 23;
pub const BUTTON_ENG: usize = 24;

/// Gear-shift and lighting button assignments, grounded on the vendor
/// driver's `auto_control.h` macro table.
pub const GEAR_UP_BUTTON: usize = BUTTON_PADDLE_SHIFTER_RIGHT;
pub const GEAR_DOWN_BUTTON: usize = BUTTON_PADDLE_SHIFTER_LEFT;
pub const NEUTRAL_BUTTON: usize = BUTTON_NEUTRAL;
pub const PARKING_BUTTON: usize = BUTTON_PARKING;
pub const LEFT_LIGHT_BUTTON: usize = BUTTON_K1;
pub const RIGHT_LIGHT_BUTTON: usize = BUTTON_K2;
pub const FRONT_LIGHT_BUTTON: usize = BUTTON_SHA;

const STEERING_MIN_DEG: f32 = -30.0;
const STEERING_MAX_DEG: f32 = 30.0;
const STEER_FEEDBACK_MIN: f32 = -300.0;
const STEER_FEEDBACK_MAX: f32 = 300.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, defmt::Format)]
pub enum DriveControlState {
    WaitingWheelConfiguration,
    ReadingWheel,
    AutonomousDriving,
}

/// The conditioned operator input snapshot, rebuilt every 20 ms tick.
#[derive(Clone, Copy, Debug)]
pub struct DrivingCommands {
    pub steering_deg: f32,
    pub brake: f32,
    pub throttle: f32,
    pub clutch: f32,
    pub buttons: [bool; BUTTON_COUNT],
    pub pad_arrow: DPad,
}

impl Default for DrivingCommands {
    fn default() -> Self {
        Self {
            steering_deg: 0.0,
            brake: 0.0,
            throttle: 0.0,
            clutch: 0.0,
            buttons: [false; BUTTON_COUNT],
            pad_arrow: DPad::None,
        }
    }
}

pub struct DriveControl {
    state: DriveControlState,
    commands: DrivingCommands,
    button_classifiers: [Button; BUTTON_COUNT],
    rotation: RotationManager,
}

impl DriveControl {
    pub fn new(rotation: RotationManager) -> Self {
        Self {
            state: DriveControlState::WaitingWheelConfiguration,
            commands: DrivingCommands::default(),
            button_classifiers: [Button::new(ButtonKind::Base); BUTTON_COUNT],
            rotation,
        }
    }

    pub fn state(&self) -> DriveControlState {
        self.state
    }

    pub fn commands(&self) -> &DrivingCommands {
        &self.commands
    }

    /// One 20 ms tick. `gear_is_parked` carries the *previous* tick's gear
    /// state (C10 runs after C7 in the control flow, so this tick's gear
    /// isn't known yet) and selects ReadingWheel's neutral centering versus
    /// AutonomousDriving's vehicle-tracking force (resolving the
    /// unspecified Reading->Autonomous trigger).
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        report: &[u8; REPORT_LEN],
        wheel_linked: bool,
        gear_is_parked: bool,
        steer_feedback: i16,
        now_ms: u32,
        waiting_braking_slew: f32,
        urb: &mut UrbSender,
    ) -> Result<DrivingCommands> {
        match self.state {
            DriveControlState::WaitingWheelConfiguration => {
                self.step_waiting(report, wheel_linked, waiting_braking_slew, urb)?;
            }
            DriveControlState::ReadingWheel | DriveControlState::AutonomousDriving => {
                self.step_reading(report, wheel_linked, gear_is_parked, steer_feedback, now_ms, urb)?;
            }
        }
        Ok(self.commands)
    }

    fn step_waiting(
        &mut self,
        report: &[u8; REPORT_LEN],
        wheel_linked: bool,
        waiting_braking_slew: f32,
        urb: &mut UrbSender,
    ) -> Result<()> {
        let dec = hid::decode(report)?;
        let pedal_max = 1023u16;
        let floored = dec.brake_raw == pedal_max && dec.throttle_raw == pedal_max && dec.clutch_raw == pedal_max;

        if wheel_linked && floored {
            ff::init_sequence(urb)?;
            self.state = DriveControlState::ReadingWheel;
            self.commands.brake = 1.0;
            self.commands.throttle = 0.0;
        } else {
            self.commands.brake = slew_toward(self.commands.brake, 1.0, waiting_braking_slew);
            self.commands.throttle = 0.0;
        }
        Ok(())
    }

    fn step_reading(
        &mut self,
        report: &[u8; REPORT_LEN],
        wheel_linked: bool,
        gear_is_parked: bool,
        steer_feedback: i16,
        now_ms: u32,
        urb: &mut UrbSender,
    ) -> Result<()> {
        let dec = hid::decode(report)?;

        self.commands.steering_deg = map_value(dec.wheel_rotation_raw as f32, 0.0, 65535.0, STEERING_MIN_DEG, STEERING_MAX_DEG);
        self.commands.brake = 1.0 - dec.brake_raw as f32 / 1023.0;
        self.commands.throttle = 1.0 - dec.throttle_raw as f32 / 1023.0;
        self.commands.clutch = 1.0 - dec.clutch_raw as f32 / 1023.0;
        self.commands.pad_arrow = dec.pad_arrow;

        for i in 0..BUTTON_COUNT {
            self.button_classifiers[i].update(dec.buttons[i], now_ms);
            self.commands.buttons[i] = self.button_classifiers[i].state();
        }

        self.state = if gear_is_parked {
            DriveControlState::ReadingWheel
        } else {
            DriveControlState::AutonomousDriving
        };

        let wheel_1024 = map_value(self.commands.steering_deg, STEERING_MIN_DEG, STEERING_MAX_DEG, -1024.0, 1024.0);
        let target = match self.state {
            DriveControlState::ReadingWheel => 0.0,
            DriveControlState::AutonomousDriving => {
                map_value(steer_feedback as f32, STEER_FEEDBACK_MIN, STEER_FEEDBACK_MAX, -1024.0, 1024.0)
            }
            DriveControlState::WaitingWheelConfiguration => unreachable!(),
        };
        self.rotation.update(target, wheel_1024, urb)?;

        if !wheel_linked {
            self.state = DriveControlState::WaitingWheelConfiguration;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::Pid;
    use heapless::spsc::Queue;

    fn report_floored() -> [u8; REPORT_LEN] {
        let mut r = [0u8; REPORT_LEN];
        r[3] = 0xFF;
        r[4] = 0x03;
        r[5] = 0xFF;
        r[6] = 0x03;
        r[7] = 0xFF;
        r[8] = 0x03;
        r[19] = 0x0F;
        r
    }

    fn new_dc() -> DriveControl {
        DriveControl::new(RotationManager::new(Pid::new(5.5, 0.0, 4000.0, 32766.0, -32767.0)))
    }

    #[test]
    fn wheel_ready_gate_ramps_monotonically_until_floored() {
        let mut dc = new_dc();
        let mut q: crate::urb::UrbBackingQueue = Queue::new();
        let (p, _c) = q.split();
        let mut urb = UrbSender::new(p);

        let unfloored = [0u8; REPORT_LEN];
        let mut prev = 0.0;
        for t in 0..50 {
            let out = dc
                .step(&unfloored, true, true, 0, t, 0.01, &mut urb)
                .unwrap();
            assert!(out.brake >= prev);
            assert!(out.brake - prev <= 0.01 + 1e-6);
            prev = out.brake;
            assert_eq!(out.throttle, 0.0);
        }
        assert_eq!(dc.state(), DriveControlState::WaitingWheelConfiguration);
    }

    #[test]
    fn floored_pedals_transition_to_reading_wheel() {
        let mut dc = new_dc();
        let mut q: crate::urb::UrbBackingQueue = Queue::new();
        let (p, _c) = q.split();
        let mut urb = UrbSender::new(p);

        let floored = report_floored();
        dc.step(&floored, true, true, 0, 0, 0.01, &mut urb).unwrap();
        assert_eq!(dc.state(), DriveControlState::ReadingWheel);
    }

    #[test]
    fn unlinking_wheel_falls_back_to_waiting() {
        let mut dc = new_dc();
        let mut q: crate::urb::UrbBackingQueue = Queue::new();
        let (p, _c) = q.split();
        let mut urb = UrbSender::new(p);

        let floored = report_floored();
        dc.step(&floored, true, true, 0, 0, 0.01, &mut urb).unwrap();
        assert_eq!(dc.state(), DriveControlState::ReadingWheel);

        dc.step(&floored, false, true, 0, 20, 0.01, &mut urb).unwrap();
        assert_eq!(dc.state(), DriveControlState::WaitingWheelConfiguration);
    }

    #[test]
    fn steering_degrees_track_raw_rotation_endpoints() {
        let mut dc = new_dc();
        let mut q: crate::urb::UrbBackingQueue = Queue::new();
        let (p, _c) = q.split();
        let mut urb = UrbSender::new(p);

        let floored = report_floored();
        dc.step(&floored, true, true, 0, 0, 0.01, &mut urb).unwrap();

        let mut r = [0u8; REPORT_LEN];
        r[1] = 0xFF;
        r[2] = 0xFF;
        r[19] = 0x0F;
        let out = dc.step(&r, true, true, 0, 20, 0.01, &mut urb).unwrap();
        assert!((out.steering_deg - 30.0).abs() < 0.01);
    }
}
