#[cfg(target_os = "espidf")]
pub mod ble;
pub mod lsm6dsox;
pub mod rear_light;
pub mod registers;
pub mod transport;
