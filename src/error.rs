// Helmet IMU - Error Types

use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

/// Register transport failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The bus transaction itself failed (NACK, arbitration loss, timeout).
    #[error("I2C error at register 0x{register:02X}: {kind:?}")]
    Bus { register: u8, kind: ErrorKind },

    /// A configuration write was not reflected on read-back.
    #[error("write to 0x{register:02X} not confirmed: wrote 0x{wrote:02X}, read 0x{read:02X}")]
    WriteNotConfirmed { register: u8, wrote: u8, read: u8 },
}

/// Invalid configuration value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Value does not fit in the register field.
    #[error("value {value} does not fit {width}-bit field of register 0x{register:02X}")]
    FieldOverflow { register: u8, width: u8, value: u16 },
}

/// Sensor driver error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// WHO_AM_I did not return the LSM6DSOX identity.
    #[error("device not found: expected WHO_AM_I 0x6C, got 0x{found:02X}")]
    DeviceNotFound { found: u8 },

    /// A FIFO slot carried a tag that is not batched by the current configuration.
    #[error("unexpected FIFO tag 0x{0:02X}")]
    UnexpectedTag(u8),
}

/// Frame encoding / decoding error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload of {size} bytes exceeds transfer unit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("frame declares {declared} elements, batch has {actual}")]
    ElementCountMismatch { declared: usize, actual: usize },

    #[error("frame of {0} bytes is not a whole number of samples")]
    Truncated(usize),
}

/// Notification push failed while connected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    #[error("notify failed: {0}")]
    Notify(String),

    #[error("advertising failed: {0}")]
    Advertise(String),

    #[error("advertising payload of {size} bytes exceeds {limit} bytes")]
    AdvertisementTooLong { size: usize, limit: usize },
}

/// Batch unusable for classification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureExtractionError {
    #[error("batch has {accel} accel and {gyro} gyro samples, need {required} of each")]
    TooFewSamples {
        accel: usize,
        gyro: usize,
        required: usize,
    },
}
