//! C4: USB URB sender. A bounded FIFO of `(pipe_index, 64-byte payload)`
//! pairs, serialized against the host stack's per-pipe transfer state.
//!
//! Single-producer (any FF/HID code calling `enqueue`), single-consumer (the
//! 2 ms tick calling `service_tick`), backed by `heapless::spsc::Queue` so no
//! allocator is required.

use heapless::spsc::{Consumer, Producer, Queue};

use crate::error::{Error, Result};

pub const URB_MESSAGE_LEN: usize = 64;
/// Usable FIFO capacity: 40 in-flight messages.
pub const URB_QUEUE_CAPACITY: usize = 40;
/// `heapless::spsc::Queue<T, N>` only ever holds `N - 1` items, so the
/// backing store needs one extra slot to actually fit `URB_QUEUE_CAPACITY`.
pub(crate) const URB_BACKING_LEN: usize = URB_QUEUE_CAPACITY + 1;

/// One in-flight USB interrupt-OUT payload, tagged with its pipe.
#[derive(Clone, Copy)]
pub struct UrbMessage {
    pub pipe_index: u8,
    pub payload: [u8; URB_MESSAGE_LEN],
}

/// The per-pipe transfer state the host stack reports back.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UrbState {
    Idle,
    Done,
    Busy,
}

/// The host-stack operations the consumer side needs; kept behind a trait so
/// this module has no dependency on `usb-device`/`synopsys-usb-otg` types
/// and stays host-testable.
pub trait UsbHost {
    fn wheel_linked(&mut self) -> bool;
    fn urb_state(&mut self, pipe_index: u8) -> UrbState;
    fn interrupt_send(&mut self, pipe_index: u8, payload: &[u8; URB_MESSAGE_LEN]);
}

pub type UrbProducer<'a> = Producer<'a, UrbMessage, URB_BACKING_LEN>;
pub type UrbConsumer<'a> = Consumer<'a, UrbMessage, URB_BACKING_LEN>;
pub type UrbBackingQueue = Queue<UrbMessage, URB_BACKING_LEN>;

/// Producer-side handle. Any FF/HID code enqueues through this.
pub struct UrbSender<'a> {
    producer: UrbProducer<'a>,
}

impl<'a> UrbSender<'a> {
    pub fn new(producer: UrbProducer<'a>) -> Self {
        Self { producer }
    }

    pub fn enqueue(&mut self, pipe_index: u8, payload: [u8; URB_MESSAGE_LEN]) -> Result<()> {
        self.producer
            .enqueue(UrbMessage { pipe_index, payload })
            .map_err(|_| Error::UrbQueueFull)
    }
}

/// Consumer-side handle. Drained once per 2 ms tick.
pub struct UrbDrain<'a> {
    consumer: UrbConsumer<'a>,
}

impl<'a> UrbDrain<'a> {
    pub fn new(consumer: UrbConsumer<'a>) -> Self {
        Self { consumer }
    }

    /// One iteration of the consumer-side drain algorithm.
    pub fn service_tick(&mut self, host: &mut impl UsbHost) -> Result<()> {
        let Some(head) = self.consumer.peek() else {
            return Ok(());
        };

        if !host.wheel_linked() {
            return Ok(());
        }

        match host.urb_state(head.pipe_index) {
            UrbState::Done | UrbState::Idle => {
                host.interrupt_send(head.pipe_index, &head.payload);
                self.consumer.dequeue();
                Ok(())
            }
            UrbState::Busy => Err(Error::UrbStateBusy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHost {
        linked: bool,
        state: UrbState,
        sent: heapless::Vec<([u8; URB_MESSAGE_LEN], u8), 8>,
    }

    impl UsbHost for FakeHost {
        fn wheel_linked(&mut self) -> bool {
            self.linked
        }
        fn urb_state(&mut self, _pipe_index: u8) -> UrbState {
            self.state
        }
        fn interrupt_send(&mut self, pipe_index: u8, payload: &[u8; URB_MESSAGE_LEN]) {
            self.sent.push((*payload, pipe_index)).ok();
        }
    }

    fn msg(tag: u8) -> [u8; URB_MESSAGE_LEN] {
        let mut m = [0u8; URB_MESSAGE_LEN];
        m[0] = tag;
        m
    }

    #[test]
    fn fifo_ordering_preserved_across_drain_ticks() {
        let mut q: UrbBackingQueue = Queue::new();
        let (p, c) = q.split();
        let mut sender = UrbSender::new(p);
        let mut drain = UrbDrain::new(c);

        sender.enqueue(3, msg(b'A')).unwrap();
        sender.enqueue(3, msg(b'B')).unwrap();
        sender.enqueue(3, msg(b'C')).unwrap();

        let mut host = FakeHost {
            linked: true,
            state: UrbState::Idle,
            sent: heapless::Vec::new(),
        };

        for _ in 0..3 {
            drain.service_tick(&mut host).unwrap();
        }

        assert_eq!(host.sent.len(), 3);
        assert_eq!(host.sent[0].0[0], b'A');
        assert_eq!(host.sent[1].0[0], b'B');
        assert_eq!(host.sent[2].0[0], b'C');
    }

    #[test]
    fn unlinked_wheel_leaves_queue_untouched() {
        let mut q: UrbBackingQueue = Queue::new();
        let (p, c) = q.split();
        let mut sender = UrbSender::new(p);
        let mut drain = UrbDrain::new(c);
        sender.enqueue(3, msg(1)).unwrap();

        let mut host = FakeHost {
            linked: false,
            state: UrbState::Idle,
            sent: heapless::Vec::new(),
        };
        drain.service_tick(&mut host).unwrap();
        assert!(host.sent.is_empty());
    }

    #[test]
    fn busy_pipe_retries_next_tick_without_dropping() {
        let mut q: UrbBackingQueue = Queue::new();
        let (p, c) = q.split();
        let mut sender = UrbSender::new(p);
        let mut drain = UrbDrain::new(c);
        sender.enqueue(3, msg(9)).unwrap();

        let mut host = FakeHost {
            linked: true,
            state: UrbState::Busy,
            sent: heapless::Vec::new(),
        };
        assert_eq!(drain.service_tick(&mut host), Err(Error::UrbStateBusy));
        host.state = UrbState::Done;
        drain.service_tick(&mut host).unwrap();
        assert_eq!(host.sent.len(), 1);
    }

    #[test]
    fn full_queue_rejects_enqueue() {
        let mut q: UrbBackingQueue = Queue::new();
        let (p, _c) = q.split();
        let mut sender = UrbSender::new(p);
        for _ in 0..URB_QUEUE_CAPACITY {
            sender.enqueue(3, msg(0)).unwrap();
        }
        assert_eq!(sender.enqueue(3, msg(0)), Err(Error::UrbQueueFull));
    }
}
