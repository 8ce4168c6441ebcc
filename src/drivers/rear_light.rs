// Helmet IMU - Rear Light Driver
//
// GPIO-driven brake light. `pulse` switches it on and records a deadline;
// `update` from the main loop switches it off once the deadline passes.
// Nothing here sleeps, so acquisition keeps running while the light is on.

use embedded_hal::digital::OutputPin;

pub struct RearLight<P> {
    pin: P,
    off_at: Option<u32>,
}

impl<P: OutputPin> RearLight<P> {
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self { pin, off_at: None }
    }

    pub fn is_on(&self) -> bool {
        self.off_at.is_some()
    }

    /// Light on for `duration_ms` from `now_ms`. A pulse while lit extends it.
    pub fn pulse(&mut self, now_ms: u32, duration_ms: u32) {
        if self.pin.set_high().is_err() {
            log::warn!("Rear light pin write failed");
            return;
        }
        if self.off_at.is_none() {
            log::info!("Rear light on for {} ms", duration_ms);
        }
        self.off_at = Some(now_ms.wrapping_add(duration_ms));
    }

    /// Switch off once the deadline has passed.
    pub fn update(&mut self, now_ms: u32) {
        let Some(off_at) = self.off_at else {
            return;
        };
        // Signed difference so the comparison survives u32 rollover.
        if (now_ms.wrapping_sub(off_at) as i32) >= 0 {
            let _ = self.pin.set_low();
            self.off_at = None;
            log::debug!("Rear light off");
        }
    }

    #[cfg(test)]
    pub(crate) fn pin(&self) -> &P {
        &self.pin
    }
}
