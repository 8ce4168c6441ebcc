// Helmet IMU - Library Root
//
// LSM6DSOX FIFO acquisition for the Smart Cycle Helmet, streamed over BLE.
//
// Everything here is hardware-agnostic: the sensor sits behind
// `embedded_hal::i2c::I2c`, the BLE stack behind [`notifier::Radio`] and the
// rear light behind `embedded_hal::digital::OutputPin`. `src/main.rs` wires
// the ESP32 peripherals into a [`tasks::stream::Streamer`].

pub mod acquisition;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fifo;
pub mod framer;
pub mod inference;
pub mod input;
pub mod notifier;
pub mod tasks;

#[cfg(test)]
mod testing;
