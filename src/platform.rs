//! Host-environment hooks.
//!
//! Pin configuration, the tick clock, the deferred-callback facility and the
//! observer broadcast all live in the host; the driver consumes them through
//! this trait so the boot sequence can be exercised without real hardware or
//! real delays.

/// Services the host environment provides to the driver.
pub trait Platform {
    /// One-time pin configuration performed on hardware init.
    ///
    /// The interrupt pin should become a pulled-down input with hysteresis
    /// (it is not used for actual interrupts but is configured to avoid
    /// leakage), the power pin a push-pull output.
    fn setup_pins(&mut self);

    /// Monotonic tick counter bounding the data-ready wait.
    fn now(&self) -> u32;

    /// Schedules the single pending deferred callback to fire after `ticks`.
    ///
    /// When it fires, the host delivers the corresponding
    /// [`Event`](crate::Event) to [`advance`](crate::Mpu9250Sensor::advance).
    /// Scheduling again replaces any pending callback.
    fn schedule(&mut self, ticks: u32);

    /// Cancels the pending deferred callback, if any.
    fn cancel(&mut self);

    /// Broadcasts that sensor data became available; invoked exactly once
    /// per boot sequence, when the startup delay elapses.
    fn notify_changed(&mut self);
}
