// Helmet IMU - Register Transport
//
// Byte / burst register access to one device address over any
// `embedded_hal::i2c::I2c` bus (esp-idf-hal's `I2cDriver` on target).

use embedded_hal::i2c::{Error as _, I2c};

use crate::drivers::registers::Register;
use crate::error::TransportError;

pub struct RegisterTransport<I2C> {
    bus: I2C,
    address: u8,
}

impl<I2C: I2c> RegisterTransport<I2C> {
    pub fn new(bus: I2C, address: u8) -> Self {
        Self { bus, address }
    }

    /// Give the bus back (used by tests to inspect the simulated device).
    pub fn release(self) -> I2C {
        self.bus
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        &mut self.bus
    }

    pub fn write_byte(&mut self, reg: Register, value: u8) -> Result<(), TransportError> {
        self.bus
            .write(self.address, &[reg.addr(), value])
            .map_err(|e| bus_error(reg, e))
    }

    pub fn read_byte(&mut self, reg: Register) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        self.read_bytes(reg, &mut buf)?;
        Ok(buf[0])
    }

    /// Burst read starting at `reg`; relies on CTRL3_C.IF_INC.
    pub fn read_bytes(&mut self, reg: Register, buf: &mut [u8]) -> Result<(), TransportError> {
        self.bus
            .write_read(self.address, &[reg.addr()], buf)
            .map_err(|e| bus_error(reg, e))
    }

    /// Write then read back; a mismatch means the write was not acknowledged.
    pub fn write_confirmed(&mut self, reg: Register, value: u8) -> Result<(), TransportError> {
        self.write_byte(reg, value)?;
        let read = self.read_byte(reg)?;
        if read != value {
            return Err(TransportError::WriteNotConfirmed {
                register: reg.addr(),
                wrote: value,
                read,
            });
        }
        log::debug!("write {:?}({:#04X}) = {:#04x}", reg, reg.addr(), value);
        Ok(())
    }
}

fn bus_error<E: embedded_hal::i2c::Error>(reg: Register, e: E) -> TransportError {
    TransportError::Bus {
        register: reg.addr(),
        kind: e.kind(),
    }
}
