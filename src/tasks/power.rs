// Helmet IMU - Power Management
//
// The LSM6DSOX drives INT2 HIGH while its inactivity engine considers the
// helmet asleep. Once that has held for the confirm window, and no burst is
// being sent, the ESP32 goes into deep sleep with ext0 wake on INT2 LOW
// (motion). Wake-up is a full reset, so nothing needs to be saved.

pub struct SleepPolicy {
    confirm_ms: u32,
    asserted_since: Option<u32>,
}

impl SleepPolicy {
    pub fn new(confirm_ms: u32) -> Self {
        Self {
            confirm_ms,
            asserted_since: None,
        }
    }

    /// Feed the INT2 level and controller state; `true` means sleep now.
    pub fn should_sleep(&mut self, now_ms: u32, int2_asserted: bool, busy: bool) -> bool {
        if !int2_asserted {
            if self.asserted_since.take().is_some() {
                log::debug!("Motion resumed before sleep confirm");
            }
            return false;
        }

        let since = *self.asserted_since.get_or_insert(now_ms);
        if busy {
            return false;
        }
        now_ms.wrapping_sub(since) >= self.confirm_ms
    }
}

/// Arm ext0 wake on INT2 LOW and enter deep sleep. Does not return.
#[cfg(target_os = "espidf")]
pub fn enter_deep_sleep() -> ! {
    use crate::config::PIN_SLEEP_INT;

    log::info!("Inactive - entering deep sleep (wake on GPIO{} LOW)", PIN_SLEEP_INT);
    unsafe {
        esp_idf_sys::esp_sleep_enable_ext0_wakeup(PIN_SLEEP_INT, 0);
        esp_idf_sys::esp_deep_sleep_start();
    }
}
