#![no_main]
#![no_std]

// Drive-by-wire teleoperation bridge for a Pix Moving vehicle: reads a
// Thrustmaster T818 wheel over USB HID (host mode), runs the gear and
// steering-feedback control core, and frames the result onto CAN.
//
// https://www.pixmoving.com/

use cfg_if::cfg_if;
use cortex_m::peripheral::DWT;
use defmt::{debug, error, println};
use defmt_rtt as _;
use panic_probe as _;

use critical_section::Mutex;
use fdcan::filter::{StandardFilter, StandardFilterSlot};
use fdcan::frame::{FrameFormat, TxFrameHeader};
use fdcan::id::{Id, StandardId};
use fdcan::interrupt::Interrupt;
use heapless::spsc::Queue;

use stm32_hal2::{
    self,
    clocks::Clocks,
    gpio::{Pin, Port},
    pac,
    timer::{Timer, TimerInterrupt},
};

use t818_dbw_bridge::can_codec::{self, AutoDataFeedback, CONTROL_FRAME_ID};
use t818_dbw_bridge::can_tx::{CanMailbox, CanTxManager};
use t818_dbw_bridge::config::Config;
use t818_dbw_bridge::drive_control::{self, DriveControl};
use t818_dbw_bridge::gear::{GearButtons, GearInputs, GearMachine, LightButtons};
use t818_dbw_bridge::hid::REPORT_LEN;
use t818_dbw_bridge::pid::Pid;
use t818_dbw_bridge::rotation::RotationManager;
use t818_dbw_bridge::urb::{UrbBackingQueue, UrbDrain, UrbSender};

mod usb_host;
use usb_host::UsbHidHost;

cfg_if! {
    if #[cfg(feature = "h7")] {
        use stm32_hal2::clocks::{PllCfg, PllSrc};
        type CanInstance = pac::FDCAN1;
    } else if #[cfg(feature = "g4")] {
        use stm32_hal2::clocks::{InputSrc, PllSrc};
        type CanInstance = pac::FDCAN1;
    }
}

type Can = fdcan::FdCan<CanInstance, fdcan::NormalOperationMode>;

/// State-tick rate: C11-decode(RX) -> C7-step -> C10-step -> C11-encode(TX)
/// -> C12-send, once per period.
const STATE_TICK_HZ: f32 = 50.0; // 20 ms
/// URB drain rate: services one queued FF packet per period.
const URB_TICK_HZ: f32 = 500.0; // 2 ms

/// Raw HID report double-buffer, written by the USB ISR and copied out by
/// the state tick under a scoped critical section to prevent
/// tearing.
static HID_SNAPSHOT: Mutex<core::cell::RefCell<[u8; REPORT_LEN]>> =
    Mutex::new(core::cell::RefCell::new([0u8; REPORT_LEN]));

static mut URB_QUEUE: UrbBackingQueue = Queue::new();

struct FdcanMailbox<'a> {
    can: &'a mut Can,
}

impl CanMailbox for FdcanMailbox<'_> {
    fn is_pending(&mut self) -> bool {
        !self.can.is_transmitter_idle()
    }

    fn request_abort(&mut self) {
        // Aborts whichever pending-transmit buffer is occupying our single
        // reserved mailbox.
        self.can.abort(fdcan::Mailbox::_0);
    }

    fn post(&mut self, payload: &[u8; 8]) {
        let header = TxFrameHeader {
            len: 8,
            frame_format: FrameFormat::Standard,
            id: Id::Standard(StandardId::new(CONTROL_FRAME_ID).unwrap()),
            bit_rate_switching: false,
            marker: None,
        };
        self.can.transmit(header, payload).ok();
    }
}

/// Free-running millisecond clock backed by the cycle counter; this is the
/// concrete clock the control core's `MonoClock` trait is wired to.
struct DwtClock {
    cycles_per_ms: u32,
}

impl t818_dbw_bridge::clock::MonoClock for DwtClock {
    fn now_ms(&self) -> u32 {
        DWT::cycle_count() / self.cycles_per_ms
    }
}

#[rtic::app(device = pac, peripherals = false, dispatchers = [EXTI9_5])]
mod app {
    use super::*;
    use t818_dbw_bridge::clock::MonoClock;

    #[shared]
    struct Shared {
        can: Can,
        can_tx_mgr: CanTxManager,
        feedback: AutoDataFeedback,
        usb_host: UsbHidHost,
    }

    #[local]
    struct Local {
        state_tick_timer: Timer<pac::TIM15>,
        urb_tick_timer: Timer<pac::TIM16>,
        drive_control: DriveControl,
        gear: GearMachine,
        urb_sender: UrbSender<'static>,
        urb_drain: UrbDrain<'static>,
        clock: DwtClock,
        config: Config,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let mut cp = cx.core;
        let dp = pac::Peripherals::take().unwrap();

        cp.SCB.enable_icache();
        cp.SCB.enable_dcache(&mut cp.CPUID);

        cp.DCB.enable_trace();
        cp.DWT.enable_cycle_counter();

        cfg_if! {
            if #[cfg(feature = "h7")] {
                let clock_cfg = Clocks {
                    pll_src: PllSrc::Hse(16_000_000),
                    pll1: PllCfg {
                        divm: 8,
                        ..Default::default()
                    },
                    hsi48_on: true,
                    usb_src: stm32_hal2::clocks::UsbSrc::Hsi48,
                    ..Clocks::full_speed()
                };
            } else {
                let clock_cfg = Clocks {
                    input_src: InputSrc::Pll(PllSrc::Hse(16_000_000)),
                    hsi48_on: true,
                    clk48_src: stm32_hal2::clocks::Clk48Src::Hsi48,
                    ..Default::default()
                };
            }
        }
        clock_cfg.setup().unwrap();

        let cycles_per_ms = clock_cfg.sysclk() / 1_000;

        // CAN pins: PB8 (RX), PB9 (TX), AF9.
        let _can_rx = Pin::new(Port::B, 8, stm32_hal2::gpio::PinMode::Alt(9));
        let _can_tx = Pin::new(Port::B, 9, stm32_hal2::gpio::PinMode::Alt(9));

        // todo: Board bring-up for the OTG_HS ULPI/embedded-PHY pins belongs
        // here once host-mode transfer scheduling (usb_host.rs) is filled
        // in; omitted along with the rest of the USB host stack (non-goal).

        let can = {
            let can = fdcan::FdCan::new(dp.FDCAN1);
            let mut can = can.into_config_mode();
            can.set_standard_filter(
                StandardFilterSlot::_0,
                StandardFilter {
                    filter: fdcan::filter::StandardFilterType::Match(
                        StandardId::new(CONTROL_FRAME_ID).unwrap(),
                    ),
                    action: fdcan::filter::Action::StoreInFifo0,
                },
            );
            can.enable_interrupt(Interrupt::RxFifo0NewMsg);
            can.into_normal()
        };

        let mut state_tick_timer = Timer::new_tim15(dp.TIM15, STATE_TICK_HZ, Default::default(), &clock_cfg);
        state_tick_timer.enable_interrupt(TimerInterrupt::Update);
        state_tick_timer.enable();

        let mut urb_tick_timer = Timer::new_tim16(dp.TIM16, URB_TICK_HZ, Default::default(), &clock_cfg);
        urb_tick_timer.enable_interrupt(TimerInterrupt::Update);
        urb_tick_timer.enable();

        let config = Config::default();
        let pid = Pid::new(config.pid_kp, config.pid_ki, config.pid_kd, config.pid_u_max, config.pid_u_min);
        let drive_control = DriveControl::new(RotationManager::new(pid));
        let gear = GearMachine::new();

        let queue: &'static mut UrbBackingQueue = unsafe { &mut URB_QUEUE };
        let (producer, consumer) = queue.split();
        let urb_sender = UrbSender::new(producer);
        let urb_drain = UrbDrain::new(consumer);

        let clock = DwtClock { cycles_per_ms };

        println!("T818 DBW bridge init complete; starting control loop");

        (
            Shared {
                can,
                can_tx_mgr: CanTxManager::new(),
                feedback: AutoDataFeedback::default(),
                usb_host: UsbHidHost::new(),
            },
            Local {
                state_tick_timer,
                urb_tick_timer,
                drive_control,
                gear,
                urb_sender,
                urb_drain,
                clock,
                config,
            },
            init::Monotonics(),
        )
    }

    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::nop();
        }
    }

    /// The 20 ms state tick: decode(RX) -> drive-control -> gear -> encode
    /// (TX) -> CAN send.
    #[task(
        binds = TIM1_BRK_TIM15,
        shared = [can, can_tx_mgr, feedback, usb_host],
        local = [state_tick_timer, drive_control, gear, urb_sender, clock, config],
        priority = 2,
    )]
    fn state_tick(mut cx: state_tick::Context) {
        cx.local.state_tick_timer.clear_interrupt(TimerInterrupt::Update);

        let mut report = [0u8; REPORT_LEN];
        critical_section::with(|token| {
            report = *HID_SNAPSHOT.borrow(token).borrow();
        });

        let wheel_linked = cx.shared.usb_host.lock(|host| {
            use t818_dbw_bridge::urb::UsbHost;
            host.wheel_linked()
        });

        let feedback = cx.shared.feedback.lock(|fb| *fb);
        let now_ms = cx.local.clock.now_ms();
        let gear_is_parked =
            cx.local.gear.state() == t818_dbw_bridge::gear::GearState::Parking;

        let commands = match cx.local.drive_control.step(
            &report,
            wheel_linked,
            gear_is_parked,
            feedback.steer,
            now_ms,
            cx.local.config.waiting_wheel_braking_slew,
            &mut cx.local.urb_sender,
        ) {
            Ok(c) => c,
            Err(e) => {
                error!("drive_control::step failed: {}", e);
                return;
            }
        };

        let gear_buttons = GearButtons {
            gear_up: commands.buttons[drive_control::GEAR_UP_BUTTON],
            gear_down: commands.buttons[drive_control::GEAR_DOWN_BUTTON],
            neutral: commands.buttons[drive_control::NEUTRAL_BUTTON],
            parking: commands.buttons[drive_control::PARKING_BUTTON],
        };
        let lights = LightButtons {
            left: commands.buttons[drive_control::LEFT_LIGHT_BUTTON],
            right: commands.buttons[drive_control::RIGHT_LIGHT_BUTTON],
            front: commands.buttons[drive_control::FRONT_LIGHT_BUTTON],
        };
        let gear_inputs = GearInputs {
            wheel_deg: commands.steering_deg,
            brake_module: commands.brake,
            throttle_module: commands.throttle,
            lights,
            feedback_speed: feedback.speed,
        };

        let control_data = cx.local.gear.step(
            gear_buttons,
            &gear_inputs,
            cx.local.config.moving_speed_slew,
            cx.local.config.parking_enable_speed,
        );
        let payload = can_codec::encode(&control_data);

        let abort_poll_ms = cx.local.config.can_abort_poll_ms;
        let clock = &cx.local.clock;
        (cx.shared.can, cx.shared.can_tx_mgr).lock(|can, mgr| {
            let mut mailbox = FdcanMailbox { can };
            if let Err(e) = mgr.send(&mut mailbox, &payload, abort_poll_ms, || clock.now_ms()) {
                error!("CAN TX failed: {}", e);
            }
        });
    }

    /// The 2 ms URB tick: drains one queued FF packet.
    #[task(
        binds = TIM1_UP_TIM16,
        shared = [usb_host],
        local = [urb_tick_timer, urb_drain],
        priority = 1,
    )]
    fn urb_tick(mut cx: urb_tick::Context) {
        cx.local.urb_tick_timer.clear_interrupt(TimerInterrupt::Update);

        cx.shared.usb_host.lock(|host| {
            if let Err(e) = cx.local.urb_drain.service_tick(host) {
                debug!("URB drain retry: {}", e);
            }
        });
    }

    /// Landed CAN frame on FIFO0; decode and publish the latest vehicle
    /// feedback snapshot.
    #[task(binds = FDCAN1_IT0, shared = [can, feedback], priority = 3)]
    fn can_rx_isr(mut cx: can_rx_isr::Context) {
        let mut buf = [0u8; 8];
        let received = cx.shared.can.lock(|can| can.receive0(&mut buf).is_ok());

        if !received {
            return;
        }

        match can_codec::decode(&buf) {
            Ok(fb) => {
                cx.shared.feedback.lock(|feedback| *feedback = fb);
            }
            Err(e) => error!("CAN decode failed: {}", e),
        }
    }

    /// OTG_HS host-channel interrupt: copies the latest IN report into the
    /// shared snapshot under a critical section, and updates the
    /// wheel-linked flag the rest of the core reads through `UsbHost`.
    #[task(binds = OTG_HS, shared = [usb_host], priority = 4)]
    fn usb_isr(mut cx: usb_isr::Context) {
        cx.shared.usb_host.lock(|host| {
            let mut report = [0u8; REPORT_LEN];
            host.copy_in_report(&mut report);
            host.set_linked(true);

            critical_section::with(|token| {
                *HID_SNAPSHOT.borrow(token).borrow_mut() = report;
            });
        });
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
