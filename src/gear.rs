//! C10: gear state machine. Per-state output rules execute first, then the
//! transition function runs.

use crate::can_codec::{AutoControlData, GEAR_DRIVE, GEAR_NEUTRAL, GEAR_PARKING, GEAR_RETRO, MODE_SELECTION_FIELD};
use crate::math::{clamp, map_value, round, slew_toward};

#[derive(Clone, Copy, PartialEq, Eq, Debug, defmt::Format)]
pub enum GearState {
    Parking,
    Retro,
    Neutral,
    Drive,
}

/// The four gear-shift button states sampled this tick, checked in this
/// order when more than one is pressed.
#[derive(Clone, Copy, Default, Debug)]
pub struct GearButtons {
    pub gear_up: bool,
    pub gear_down: bool,
    pub neutral: bool,
    pub parking: bool,
}

#[derive(Clone, Copy, Default, Debug)]
pub struct LightButtons {
    pub left: bool,
    pub right: bool,
    pub front: bool,
}

/// Everything the output rules need besides the machine's own state.
pub struct GearInputs {
    pub wheel_deg: f32,
    pub brake_module: f32,
    pub throttle_module: f32,
    pub lights: LightButtons,
    pub feedback_speed: i16,
}

pub struct GearMachine {
    state: GearState,
    /// Slew-limited internal speed accumulator; AutoControlData.speed is
    /// `round(speed)` each tick.
    speed: f32,
}

impl GearMachine {
    pub fn new() -> Self {
        Self {
            state: GearState::Parking,
            speed: 0.0,
        }
    }

    pub fn state(&self) -> GearState {
        self.state
    }

    /// `speed_slew` is the per-tick max speed change (100/tick).
    pub fn step(
        &mut self,
        buttons: GearButtons,
        inputs: &GearInputs,
        speed_slew: f32,
        parking_enable_speed: i16,
    ) -> AutoControlData {
        let out = self.output(inputs, speed_slew);
        self.transition(buttons, inputs.feedback_speed, parking_enable_speed);
        out
    }

    fn basic(&self, inputs: &GearInputs) -> AutoControlData {
        AutoControlData {
            self_driving: true,
            advanced_mode: false,
            state_control: false,
            speed_mode: false,
            right_light: inputs.lights.right,
            left_light: inputs.lights.left,
            front_light: inputs.lights.front,
            mode_selection: MODE_SELECTION_FIELD,
            steering: round(map_value(inputs.wheel_deg, -30.0, 30.0, -1024.0, 1024.0)) as i16,
            ..Default::default()
        }
    }

    fn output(&mut self, inputs: &GearInputs, speed_slew: f32) -> AutoControlData {
        let mut out = self.basic(inputs);
        match self.state {
            GearState::Parking => {
                out.ebp = true;
                out.gear_shift = GEAR_PARKING;
                out.braking = 1024;
                out.speed = 0;
                self.speed = 0.0;
            }
            GearState::Neutral => {
                out.ebp = false;
                out.gear_shift = GEAR_NEUTRAL;
                out.braking = round(inputs.brake_module * 1024.0) as u16;
                out.speed = 0;
                self.speed = 0.0;
            }
            GearState::Retro | GearState::Drive => {
                out.ebp = false;
                out.gear_shift = if self.state == GearState::Retro {
                    GEAR_RETRO
                } else {
                    GEAR_DRIVE
                };
                let braking = round(inputs.brake_module * 1024.0) as u16;
                out.braking = braking;
                if braking > 0 {
                    self.speed = 0.0;
                } else {
                    let target = clamp(inputs.throttle_module * 1024.0, 0.0, 1024.0);
                    self.speed = slew_toward(self.speed, target, speed_slew);
                }
                out.speed = round(self.speed) as u16;
            }
        }
        out
    }

    fn transition(&mut self, b: GearButtons, feedback_speed: i16, parking_enable_speed: i16) {
        let parking_enabled = feedback_speed.unsigned_abs() < parking_enable_speed as u16;

        self.state = match self.state {
            GearState::Parking => {
                if b.gear_up {
                    GearState::Retro
                } else if b.gear_down {
                    GearState::Parking
                } else if b.neutral {
                    GearState::Neutral
                } else if b.parking {
                    GearState::Parking
                } else {
                    GearState::Parking
                }
            }
            GearState::Retro => {
                if b.gear_up {
                    GearState::Neutral
                } else if b.gear_down {
                    if parking_enabled {
                        GearState::Parking
                    } else {
                        GearState::Retro
                    }
                } else if b.neutral {
                    GearState::Neutral
                } else if b.parking {
                    if parking_enabled {
                        GearState::Parking
                    } else {
                        GearState::Retro
                    }
                } else {
                    GearState::Retro
                }
            }
            GearState::Neutral => {
                if b.gear_up {
                    GearState::Drive
                } else if b.gear_down {
                    GearState::Retro
                } else if b.neutral {
                    GearState::Neutral
                } else if b.parking {
                    if parking_enabled {
                        GearState::Parking
                    } else {
                        GearState::Neutral
                    }
                } else {
                    GearState::Neutral
                }
            }
            GearState::Drive => {
                if b.gear_up {
                    GearState::Drive
                } else if b.gear_down {
                    GearState::Neutral
                } else if b.neutral {
                    GearState::Neutral
                } else if b.parking {
                    if parking_enabled {
                        GearState::Parking
                    } else {
                        GearState::Drive
                    }
                } else {
                    GearState::Drive
                }
            }
        };
    }
}

impl Default for GearMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(feedback_speed: i16) -> GearInputs {
        GearInputs {
            wheel_deg: 0.0,
            brake_module: 0.0,
            throttle_module: 0.0,
            lights: LightButtons::default(),
            feedback_speed,
        }
    }

    #[test]
    fn parking_disabled_above_speed_threshold() {
        let mut gm = GearMachine::new();
        // Get to DRIVE first.
        gm.step(
            GearButtons { gear_up: true, ..Default::default() },
            &inputs(0),
            100.0,
            10,
        );
        gm.step(Default::default(), &inputs(0), 100.0, 10);
        gm.step(
            GearButtons { gear_up: true, ..Default::default() },
            &inputs(0),
            100.0,
            10,
        );
        assert_eq!(gm.state(), GearState::Drive);

        // speed=20: parking request must not reach PARKING.
        gm.step(
            GearButtons { parking: true, ..Default::default() },
            &inputs(20),
            100.0,
            10,
        );
        assert_eq!(gm.state(), GearState::Drive);

        // speed=5: parking request now succeeds.
        gm.step(
            GearButtons { parking: true, ..Default::default() },
            &inputs(5),
            100.0,
            10,
        );
        assert_eq!(gm.state(), GearState::Parking);
    }

    #[test]
    fn steering_map_endpoints() {
        let mut gm = GearMachine::new();
        let mut i = inputs(0);
        i.wheel_deg = 30.0;
        let out = gm.step(Default::default(), &i, 100.0, 10);
        assert_eq!(out.steering, 1024);

        i.wheel_deg = -30.0;
        let out = gm.step(Default::default(), &i, 100.0, 10);
        assert_eq!(out.steering, -1024);

        i.wheel_deg = 0.0;
        let out = gm.step(Default::default(), &i, 100.0, 10);
        assert!(out.steering.abs() <= 1);
    }

    #[test]
    fn slew_limited_speed_never_overshoots() {
        let mut gm = GearMachine::new();
        // Drive into DRIVE.
        gm.step(GearButtons { gear_up: true, ..Default::default() }, &inputs(0), 100.0, 10);
        gm.step(Default::default(), &inputs(0), 100.0, 10);
        gm.step(GearButtons { gear_up: true, ..Default::default() }, &inputs(0), 100.0, 10);
        assert_eq!(gm.state(), GearState::Drive);

        let mut i = inputs(0);
        i.throttle_module = 1.0;
        for n in 1..=12 {
            let out = gm.step(Default::default(), &i, 100.0, 10);
            let expected = (100u32 * n).min(1024) as u16;
            assert_eq!(out.speed, expected);
        }
    }

    #[test]
    fn braking_zeroes_speed_even_with_full_throttle() {
        let mut gm = GearMachine::new();
        gm.step(GearButtons { gear_up: true, ..Default::default() }, &inputs(0), 100.0, 10);
        gm.step(Default::default(), &inputs(0), 100.0, 10);
        gm.step(GearButtons { gear_up: true, ..Default::default() }, &inputs(0), 100.0, 10);

        let mut i = inputs(0);
        i.throttle_module = 1.0;
        i.brake_module = 0.5;
        let out = gm.step(Default::default(), &i, 100.0, 10);
        assert_eq!(out.speed, 0);
    }
}
