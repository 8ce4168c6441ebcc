// Helmet IMU - Firmware Entry Point
//
// Boot sequence:
//   1. Power-cycle the STEMMA QT rail so the LSM6DSOX starts from reset.
//   2. Bring up I2C, check WHO_AM_I, write the FIFO configuration.
//   3. Start the BLE GATT server and advertise.
//   4. Hook INT1 (FIFO watermark) and the trigger switch to PendingSignals.
//   5. Run the streaming loop on the main task.
//
// The system enters deep sleep when INT2 reports inactivity for
// SLEEP_CONFIRM_MS and no burst is in progress.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("helmet-imu is ESP32 firmware; build it for an esp-idf target");
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::gpio::{InterruptType, PinDriver};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;

    use helmet_imu::config::*;
    use helmet_imu::drivers::ble::NimbleRadio;
    use helmet_imu::drivers::lsm6dsox::Lsm6dsox;
    use helmet_imu::drivers::rear_light::RearLight;
    use helmet_imu::drivers::transport::RegisterTransport;
    use helmet_imu::events::PendingSignals;
    use helmet_imu::notifier::Notifier;
    use helmet_imu::tasks::power::{enter_deep_sleep, SleepPolicy};
    use helmet_imu::tasks::stream::Streamer;

    // -----------------------------------------------------------------------
    // Utility: milliseconds since boot (wraps at ~49 days, callers use
    // wrapping arithmetic)
    // -----------------------------------------------------------------------
    fn now_ms() -> u32 {
        unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
    }

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("Helmet IMU firmware starting");

        let peripherals = Peripherals::take()?;
        log::info!(
            "Pins: SDA {} SCL {} STEMMA {} INT1 {} INT2 {} trigger {} light {}",
            PIN_I2C_SDA,
            PIN_I2C_SCL,
            PIN_I2C_POWER,
            PIN_FIFO_INT,
            PIN_SLEEP_INT,
            PIN_TRIGGER,
            PIN_REAR_LIGHT
        );

        // ---- Sensor power -------------------------------------------------
        let mut i2c_power = PinDriver::output(peripherals.pins.gpio2)?; // PIN_I2C_POWER
        i2c_power.set_low()?;
        thread::sleep(Duration::from_millis(SENSOR_POWER_CYCLE_MS));
        i2c_power.set_high()?;
        thread::sleep(Duration::from_millis(SENSOR_POWER_CYCLE_MS));

        // ---- I2C + LSM6DSOX -----------------------------------------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio22, // PIN_I2C_SDA
            peripherals.pins.gpio20, // PIN_I2C_SCL
            &i2c_config,
        )?;

        let sensor_config = SensorConfig::default();
        let mut imu = Lsm6dsox::new(
            RegisterTransport::new(i2c, I2C_ADDR_LSM6DSOX),
            sensor_config,
        );
        // DeviceNotFound is fatal: never configure or drain an unknown device.
        imu.identify()?;
        imu.configure()?;

        // ---- BLE ----------------------------------------------------------
        let (radio_tx, radio_rx) = mpsc::channel();
        let radio = NimbleRadio::init(radio_tx)?;
        let notifier = Notifier::start(radio, BLE_DEVICE_NAME)?;

        // ---- Interrupt inputs -----------------------------------------------
        let signals = Arc::new(PendingSignals::default());

        let mut fifo_int = PinDriver::input(peripherals.pins.gpio32)?; // PIN_FIFO_INT
        fifo_int.set_interrupt_type(InterruptType::PosEdge)?;
        let fifo_signals = Arc::clone(&signals);
        // SAFETY: the callback only stores to an atomic flag.
        unsafe {
            fifo_int.subscribe(move || fifo_signals.raise_fifo_ready())?;
        }
        fifo_int.enable_interrupt()?;

        // GPIO38 is input-only; the board provides the pull-up.
        let mut trigger = PinDriver::input(peripherals.pins.gpio38)?; // PIN_TRIGGER
        trigger.set_interrupt_type(InterruptType::NegEdge)?;
        let trigger_signals = Arc::clone(&signals);
        // SAFETY: as above.
        unsafe {
            trigger.subscribe(move || trigger_signals.raise_trigger())?;
        }
        trigger.enable_interrupt()?;

        let sleep_int = PinDriver::input(peripherals.pins.gpio33)?; // PIN_SLEEP_INT
        let sleep_enabled = sensor_config.inactivity.is_some();

        // ---- Control loop -------------------------------------------------
        let light = RearLight::new(PinDriver::output(peripherals.pins.gpio13)?); // PIN_REAR_LIGHT
        let mut streamer = Streamer::new(
            imu,
            notifier,
            light,
            Arc::clone(&signals),
            radio_rx,
            StreamConfig::default(),
        );
        let mut sleep = SleepPolicy::new(SLEEP_CONFIRM_MS);

        log::info!("Boot complete - streaming");
        let tick = Duration::from_millis(LOOP_TICK_MS);
        loop {
            // INT1 stays high while the FIFO sits at the watermark; an edge
            // that fired before the ISR was re-armed would otherwise be lost.
            if fifo_int.is_high() {
                signals.raise_fifo_ready();
            }

            streamer.poll(now_ms());

            // Interrupts are disabled after each trigger until re-enabled.
            if let Err(e) = fifo_int.enable_interrupt() {
                log::warn!("INT1 re-arm failed: {}", e);
            }
            if let Err(e) = trigger.enable_interrupt() {
                log::warn!("Trigger re-arm failed: {}", e);
            }

            if sleep_enabled && sleep.should_sleep(now_ms(), sleep_int.is_high(), streamer.is_busy()) {
                enter_deep_sleep();
            }

            thread::sleep(tick);
        }
    }
}
