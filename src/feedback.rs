//! C9: default initial state of the incoming vehicle feedback, before the
//! first CAN RX interrupt has landed a real frame.

use crate::can_codec::AutoDataFeedback;

impl Default for AutoDataFeedback {
    /// Matches the vendor driver's boot defaults: parked, centered, brakes
    /// applied, emergency-stop latched until the vehicle reports otherwise.
    fn default() -> Self {
        Self {
            speed: 0,
            steer: 0,
            braking: 0,
            gear: crate::can_codec::GEAR_PARKING,
            mode: 1,
            l_steer_light: false,
            r_steer_light: false,
            tail_light: false,
            braking_light: false,
            vehicle_status: false,
            vehicle_mode: true,
            emergency_stop: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_parked_and_estopped() {
        let fb = AutoDataFeedback::default();
        assert_eq!(fb.speed, 0);
        assert_eq!(fb.gear, crate::can_codec::GEAR_PARKING);
        assert!(fb.emergency_stop);
    }
}
