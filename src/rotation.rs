//! C8: rotation manager. Wraps the PID regulator: `e = target - feedback`,
//! both already mapped to the common signed-1024 scale by the caller, and
//! hands the clipped output to the FF manager as a constant-force command
//! followed by a play command.

use crate::error::Result;
use crate::ff;
use crate::pid::Pid;
use crate::urb::UrbSender;

pub struct RotationManager {
    pid: Pid,
}

impl RotationManager {
    pub fn new(pid: Pid) -> Self {
        Self { pid }
    }

    /// One FF-loop tick: computes `e`, steps the PID, clips to `i16`, and
    /// enqueues constant-force upload + play.
    pub fn update(&mut self, target: f32, feedback: f32, urb: &mut UrbSender) -> Result<()> {
        let e = target - feedback;
        let u = self.pid.step(e);
        let u_i16 = u.clamp(i16::MIN as f32, i16::MAX as f32) as i16;

        ff::upload_constant(urb, u_i16)?;
        ff::play_constant(urb)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::spsc::Queue;

    #[test]
    fn positive_error_drives_a_positive_constant_force_command() {
        let mut rm = RotationManager::new(Pid::new(5.5, 0.0, 4000.0, 32766.0, -32767.0));
        let mut q: Queue<crate::urb::UrbMessage, { crate::urb::URB_BACKING_LEN }> = Queue::new();
        let (p, mut c) = q.split();
        let mut sender = UrbSender::new(p);

        rm.update(100.0, 0.0, &mut sender).unwrap();

        let upload = c.dequeue().unwrap();
        let play = c.dequeue().unwrap();
        let value = i16::from_le_bytes([upload.payload[4], upload.payload[5]]);
        assert!(value > 0);
        assert_eq!(play.payload[2], 0x02); // constant-force effect id
    }
}
