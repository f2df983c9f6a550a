//! Tunable constants collected behind one defaultable `Config` struct rather
//! than scattering bare `const`s through every module. Not persisted to
//! flash; rebuilt from `Default` at bring-up every boot.

/// Steering PID and the rest of the tunables a field engineer might retune
/// without touching the control logic itself.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub pid_kp: f32,
    pub pid_ki: f32,
    pub pid_kd: f32,
    pub pid_u_max: f32,
    pub pid_u_min: f32,

    /// Minimum wheel rotation, in raw HID units.
    pub wheel_rotation_max_raw: f32,
    /// Pedal raw full-scale (10-bit axis).
    pub pedal_raw_max: f32,

    /// Parking-enable speed gate.
    pub parking_enable_speed: i16,

    /// Waiting-wheel braking slew rate, per tick.
    pub waiting_wheel_braking_slew: f32,
    /// Moving-state throttle slew rate, per tick, in AutoControlData speed
    /// units.
    pub moving_speed_slew: f32,

    /// Consecutive-abort bound after which the CAN bus is declared
    /// non-functional by the caller.
    pub can_max_aborts: u8,
    /// Abort-poll timeout, ms.
    pub can_abort_poll_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pid_kp: 5.50,
            pid_ki: 0.0,
            pid_kd: 4000.0,
            pid_u_max: 32766.0,
            pid_u_min: -32767.0,

            wheel_rotation_max_raw: 65535.0,
            pedal_raw_max: 1023.0,

            parking_enable_speed: 10,

            waiting_wheel_braking_slew: 0.01,
            moving_speed_slew: 100.0,

            can_max_aborts: 3,
            can_abort_poll_ms: 2,
        }
    }
}
