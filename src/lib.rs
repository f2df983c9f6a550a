#![cfg_attr(not(test), no_std)]

//! Control core for the T818-to-Pix-Moving drive-by-wire teleoperation
//! bridge. See the module list below for the component breakdown; `main`
//! (the `h7` binary target) is the only piece of this crate that touches
//! real hardware.

pub mod button;
pub mod can_codec;
pub mod can_tx;
pub mod clock;
pub mod config;
pub mod drive_control;
pub mod error;
pub mod feedback;
pub mod ff;
pub mod gear;
pub mod hid;
pub mod math;
pub mod pid;
pub mod rotation;
pub mod urb;

pub use error::{Error, Result};
