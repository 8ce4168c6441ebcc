// Helmet IMU - Test Doubles
//
// Host-side stand-ins for the bus, radio and GPIO.

use std::collections::VecDeque;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::config::LSM6DSOX_WHO_AM_I;
use crate::drivers::registers::Register;
use crate::error::RadioError;
use crate::notifier::Radio;

const FIFO_FIRST: u8 = Register::FifoDataOutTag.addr();
const FIFO_LAST: u8 = Register::FifoDataOutZH.addr();

/// Simulated LSM6DSOX on an I2C bus.
///
/// Reads of FIFO_DATA_OUT_TAG..Z_H walk the front slot and pop it once
/// Z_H is read, like the device's auto-advancing read pointer.
pub struct SimulatedImu {
    pub regs: [u8; 128],
    pub fifo: VecDeque<[u8; 7]>,
    pub overrun: bool,
    /// Completed slot reads.
    pub slot_reads: usize,
    /// Fail the read of this (zero-based) slot.
    pub fail_slot: Option<usize>,
    /// Fail any access to this register.
    pub fail_register: Option<u8>,
    /// Ignore writes to this register (read-back will not match).
    pub stuck_register: Option<u8>,
    /// Registers accessed, in order.
    pub log: Vec<Access>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Write(u8, u8),
    Read(u8),
}

impl SimulatedImu {
    pub fn new() -> Self {
        let mut regs = [0u8; 128];
        regs[Register::WhoAmI.addr() as usize] = LSM6DSOX_WHO_AM_I;
        Self {
            regs,
            fifo: VecDeque::new(),
            overrun: false,
            slot_reads: 0,
            fail_slot: None,
            fail_register: None,
            stuck_register: None,
            log: Vec::new(),
        }
    }

    pub fn push_slot(&mut self, tag: u8, x: i16, y: i16, z: i16) {
        let [xl, xh] = x.to_le_bytes();
        let [yl, yh] = y.to_le_bytes();
        let [zl, zh] = z.to_le_bytes();
        // TAG_CNT / parity bits are noise the driver must mask off.
        self.fifo.push_back([(tag << 3) | 0b011, xl, xh, yl, yh, zl, zh]);
    }

    /// Fill with alternating gyro / accel slots.
    pub fn fill(&mut self, slots: usize) {
        for i in 0..slots {
            let v = i as i16;
            if i % 2 == 0 {
                self.push_slot(0x01, v, -v, 100 + v);
            } else {
                self.push_slot(0x02, v, v * 2, 2048);
            }
        }
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(r, v) => Some((r, v)),
                Access::Read(_) => None,
            })
            .collect()
    }

    fn read_at(&mut self, addr: u8) -> Result<u8, ErrorKind> {
        self.log.push(Access::Read(addr));
        if self.fail_register == Some(addr) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }
        match addr {
            a if a == Register::FifoStatus1.addr() => Ok((self.fifo.len() & 0xFF) as u8),
            a if a == Register::FifoStatus2.addr() => {
                let level = self.fifo.len();
                let mut status = ((level >> 8) & 0x03) as u8;
                if self.overrun {
                    status |= 0x20;
                }
                Ok(status)
            }
            FIFO_FIRST..=FIFO_LAST => {
                if self.fail_slot == Some(self.slot_reads) {
                    return Err(ErrorKind::ArbitrationLoss);
                }
                let slot = self.fifo.front().copied().unwrap_or([0; 7]);
                let byte = slot[(addr - FIFO_FIRST) as usize];
                if addr == FIFO_LAST {
                    self.fifo.pop_front();
                    self.slot_reads += 1;
                }
                Ok(byte)
            }
            _ => Ok(self.regs[addr as usize]),
        }
    }

    fn write_at(&mut self, addr: u8, value: u8) -> Result<(), ErrorKind> {
        self.log.push(Access::Write(addr, value));
        if self.fail_register == Some(addr) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }
        if self.stuck_register != Some(addr) {
            self.regs[addr as usize] = value;
        }
        if addr == Register::FifoCtrl4.addr() && value & 0x07 == 0 {
            // Bypass mode empties the FIFO.
            self.fifo.clear();
        }
        Ok(())
    }
}

impl ErrorType for SimulatedImu {
    type Error = ErrorKind;
}

impl I2c for SimulatedImu {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut cursor: u8 = 0;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    cursor = reg;
                    for &b in data {
                        self.write_at(cursor, b)?;
                        cursor = cursor.wrapping_add(1);
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.read_at(cursor)?;
                        cursor = if cursor == FIFO_LAST { FIFO_FIRST } else { cursor + 1 };
                    }
                }
            }
        }
        Ok(())
    }
}

/// Records radio calls; `fail_advertise` / `fail_notify` make those calls fail.
#[derive(Debug, Default)]
pub struct FakeRadio {
    pub adverts: Vec<(Vec<u8>, u32)>,
    pub notified: Vec<Vec<u8>>,
    pub fail_advertise: bool,
    pub fail_notify: bool,
}

impl Radio for FakeRadio {
    fn advertise(&mut self, payload: &[u8], interval_ms: u32) -> Result<(), RadioError> {
        if self.fail_advertise {
            return Err(RadioError::Advertise("controller busy".into()));
        }
        self.adverts.push((payload.to_vec(), interval_ms));
        Ok(())
    }

    fn notify(&mut self, value: &[u8]) -> Result<(), RadioError> {
        if self.fail_notify {
            return Err(RadioError::Notify("peer gone".into()));
        }
        self.notified.push(value.to_vec());
        Ok(())
    }
}

/// Output pin that remembers its level.
#[derive(Debug, Default)]
pub struct FakePin {
    pub high: bool,
    pub toggles: usize,
}

impl PinErrorType for FakePin {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            self.toggles += 1;
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.toggles += 1;
        }
        self.high = true;
        Ok(())
    }
}
