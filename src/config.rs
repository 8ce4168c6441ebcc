// Helmet IMU - Hardware & System Configuration
// Target: Adafruit ESP32 Feather V2 + LSM6DSOX breakout (STEMMA QT)

use crate::drivers::registers::{
    AccelScale, BatchDataRate, FifoMode, GyroScale, OutputDataRate, TimestampDecimation,
};

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (ESP32 Feather V2 pinout)
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 22;
pub const PIN_I2C_SCL: i32 = 20;
pub const PIN_I2C_POWER: i32 = 2;    // STEMMA QT rail enable
pub const PIN_FIFO_INT: i32 = 32;    // LSM6DSOX INT1 - FIFO watermark
pub const PIN_SLEEP_INT: i32 = 33;   // LSM6DSOX INT2 - sleep state (HIGH = inactive)
pub const PIN_TRIGGER: i32 = 38;     // On-board switch (pull-up, active LOW)
pub const PIN_REAR_LIGHT: i32 = 13;  // Rear light MOSFET gate

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_LSM6DSOX: u8 = 0x6A;
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const LSM6DSOX_WHO_AM_I: u8 = 0x6C;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const LOOP_TICK_MS: u64 = 10;                 // Main loop poll period
pub const CONTINUOUS_TICK_MS: u32 = 1000;         // Free-run drain period (~26 slots @ 26 Hz)
pub const DEBOUNCE_MS: u32 = 50;
pub const REAR_LIGHT_ON_MS: u32 = 3000;           // Brake light hold
pub const SLEEP_CONFIRM_MS: u32 = 2000;           // INT2 must stay asserted this long
pub const SENSOR_POWER_CYCLE_MS: u64 = 500;

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------
pub const BURST_BATCHES: u32 = 10;                // Batches sent per trigger
pub const FIFO_WATERMARK: u16 = 52;               // 26 accel + 26 gyro slots
pub const FIFO_MAX_LEVEL: u16 = 0x03FF;           // 10-bit DIFF_FIFO

// ---------------------------------------------------------------------------
// BLE
// ---------------------------------------------------------------------------
pub const BLE_DEVICE_NAME: &str = "Smart Cycle Helmet";
pub const BLE_SERVICE_UUID: &str = "5b6ad9a0-7e66-43c7-b4f8-b9d0c734393d";
pub const BLE_CHAR_UUID: &str = "ee1247d7-6ac4-4bf6-b0b3-1828d127823c";
pub const BLE_PREFERRED_MTU: u16 = 512;
pub const BLE_ATT_OVERHEAD: usize = 3;            // opcode + handle
pub const BLE_ADV_INTERVAL_MS: u32 = 100;
pub const BLE_ADV_MAX_LEN: usize = 31;            // legacy advertising PDU

/// Largest notification value the peer accepts at the preferred MTU.
pub const TRANSFER_UNIT: usize = BLE_PREFERRED_MTU as usize - BLE_ATT_OVERHEAD;

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------
pub const MIN_SAMPLES_PER_SENSOR: usize = 8;
pub const CLASSIFIER_CONFIDENCE_THRESHOLD: f32 = 0.6;

// ---------------------------------------------------------------------------
// Sensor configuration
// ---------------------------------------------------------------------------

/// Activity / inactivity (sleep-change) detection routed to INT2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityConfig {
    /// WAKE_UP_THS: threshold in FS_XL / 2^6 steps.
    pub wake_threshold: u8,
    /// WAKE_UP_DUR: sleep duration in 512 / ODR steps.
    pub sleep_duration: u8,
    /// WAKE_UP_DUR: wake duration in 1 / ODR steps.
    pub wake_duration: u8,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            wake_threshold: 3,
            sleep_duration: 1,
            wake_duration: 3,
        }
    }
}

/// Everything the LSM6DSOX driver writes at configure time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    pub accel_odr: OutputDataRate,
    pub gyro_odr: OutputDataRate,
    pub accel_scale: AccelScale,
    pub gyro_scale: GyroScale,
    pub fifo_mode: FifoMode,
    /// Watermark in FIFO slots (9 bits).
    pub watermark: u16,
    /// Limit FIFO depth to the watermark (FIFO_CTRL2.STOP_ON_WTM).
    pub stop_on_watermark: bool,
    pub accel_batch_rate: BatchDataRate,
    pub gyro_batch_rate: BatchDataRate,
    pub timestamp_decimation: TimestampDecimation,
    /// Route the FIFO threshold flag to INT1.
    pub watermark_on_int1: bool,
    pub inactivity: Option<InactivityConfig>,
}

impl SensorConfig {
    /// Upper bound on the slots a single drain will read.
    pub fn fifo_capacity(&self) -> u16 {
        if self.stop_on_watermark {
            self.watermark
        } else {
            FIFO_MAX_LEVEL
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            accel_odr: OutputDataRate::Hz26,
            gyro_odr: OutputDataRate::Hz26,
            accel_scale: AccelScale::G16,
            gyro_scale: GyroScale::Dps2000,
            fifo_mode: FifoMode::Continuous,
            watermark: FIFO_WATERMARK,
            stop_on_watermark: true,
            accel_batch_rate: BatchDataRate::Hz26,
            gyro_batch_rate: BatchDataRate::Hz26,
            timestamp_decimation: TimestampDecimation::Off,
            watermark_on_int1: true,
            inactivity: Some(InactivityConfig::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Stream configuration
// ---------------------------------------------------------------------------

/// When the control loop drains and sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// Idle until the trigger switch, then send `batches` batches.
    Burst { batches: u32 },
    /// Always streaming; drain on FIFO-ready or on the periodic tick.
    Continuous { tick_ms: u32 },
}

/// What leaves the device for each streamed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPath {
    RawFrames,
    Labels,
}

/// Wire layout agreed with the host decoder at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Prefix each frame with a little-endian u32 sequence counter.
    pub sequence_header: bool,
    /// Fixed number of i16 elements per frame, if the host expects one.
    pub declared_elements: Option<usize>,
    /// Maximum notification value size in bytes.
    pub transfer_unit: usize,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            sequence_header: true,
            declared_elements: None,
            transfer_unit: TRANSFER_UNIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub mode: AcquisitionMode,
    pub output: OutputPath,
    pub layout: FrameLayout,
    pub debounce_ms: u32,
    pub rear_light_ms: u32,
    pub sleep_confirm_ms: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let mode = if cfg!(feature = "continuous") {
            AcquisitionMode::Continuous { tick_ms: CONTINUOUS_TICK_MS }
        } else {
            AcquisitionMode::Burst { batches: BURST_BATCHES }
        };
        let output = if cfg!(feature = "inference") {
            OutputPath::Labels
        } else {
            OutputPath::RawFrames
        };
        Self {
            mode,
            output,
            layout: FrameLayout::default(),
            debounce_ms: DEBOUNCE_MS,
            rear_light_ms: REAR_LIGHT_ON_MS,
            sleep_confirm_ms: SLEEP_CONFIRM_MS,
        }
    }
}
