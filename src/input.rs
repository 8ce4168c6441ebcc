// Helmet IMU - Trigger Input
//
// Software debounce for the trigger switch. The GPIO ISR only raises a
// flag; the main loop hands each observed edge to `TriggerDebouncer` with
// its own timestamp. Edges closer than the window to the last accepted
// edge are contact bounce and are discarded.

pub struct TriggerDebouncer {
    window_ms: u32,
    last_accepted: Option<u32>,
}

impl TriggerDebouncer {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_accepted: None,
        }
    }

    /// Returns `true` if the edge at `now_ms` counts as a new press.
    pub fn accept(&mut self, now_ms: u32) -> bool {
        if let Some(last) = self.last_accepted {
            // wrapping_sub keeps this correct across the ~49-day u32 rollover
            if now_ms.wrapping_sub(last) < self.window_ms {
                log::debug!("Trigger edge inside debounce window, ignored");
                return false;
            }
        }
        self.last_accepted = Some(now_ms);
        true
    }
}
