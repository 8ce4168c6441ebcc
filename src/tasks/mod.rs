pub mod power;
pub mod stream;
