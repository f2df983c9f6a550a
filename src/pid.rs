//! C3: discrete PID regulator, kd-on-error variant, with clamping
//! anti-windup.
//!
//! `u = kp*e + ki*sum_e + kd*(e - e_prev)`, `sum_e` accumulated only when the
//! previous output wasn't already saturating further in the direction the
//! new error would push it.

/// A single PID loop's live state plus its gains and output limits.
#[derive(Clone, Copy, Debug)]
pub struct Pid {
    kp: f32,
    ki: f32,
    kd: f32,
    u_max: f32,
    u_min: f32,
    prev_error: f32,
    prev_output: f32,
    integrator: f32,
}

impl Pid {
    pub fn new(kp: f32, ki: f32, kd: f32, u_max: f32, u_min: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            u_max,
            u_min,
            prev_error: 0.0,
            prev_output: 0.0,
            integrator: 0.0,
        }
    }

    /// Runs one step at the state-tick rate (50 Hz). Returns `u`, clamped to
    /// `[u_min, u_max]`.
    pub fn step(&mut self, e: f32) -> f32 {
        // `prev_output` holds the *unclamped* output from the previous step,
        // so this comparison can actually observe saturation; gating on the
        // already-clamped value would never trip.
        let saturating_further = (self.prev_output > self.u_max && e > 0.0)
            || (self.prev_output < self.u_min && e < 0.0);
        if !saturating_further {
            self.integrator += e;
        }

        let u = self.kp * e + self.ki * self.integrator + self.kd * (e - self.prev_error);

        self.prev_error = e;
        self.prev_output = u;
        u.clamp(self.u_min, self.u_max)
    }
}
