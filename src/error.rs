//! Error kinds shared across the control core.
//!
//! Every component function returns `Result<T, Error>`; the tick aggregates
//! with short-circuit semantics and returns at the first `Err`. Transient
//! kinds (`UrbStateBusy`, `WheelUnlinked`) are expected during normal
//! operation and are swallowed by their caller rather than propagated to the
//! scheduler.

/// The full set of failure modes the core can report.
#[derive(Copy, Clone, PartialEq, Eq, Debug, defmt::Format)]
pub enum Error {
    /// A required argument was missing (e.g. an empty slice where a fixed-size
    /// report was expected).
    NullArgument,
    /// A component was used before its `init` ran.
    NotInitialized,
    /// The CAN TX manager could not clear a pending mailbox within the abort
    /// timeout.
    BusStuck,
    /// The URB FIFO had no free slot for `enqueue`.
    UrbQueueFull,
    /// The head-of-queue URB is still in flight; retried next tick.
    UrbStateBusy,
    /// The wheel's USB class state isn't in `{Poll, GetData}`.
    WheelUnlinked,
    /// A HID report shorter than the fields it's decoded against.
    DecodeShortReport,
    /// A gear transition predicate (e.g. parking-enable) was violated.
    InvalidState,
}

pub type Result<T> = core::result::Result<T, Error>;
