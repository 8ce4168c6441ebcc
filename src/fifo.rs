// Helmet IMU - FIFO Drain Engine
//
// One drain = one status read, then exactly `level` slot reads (bounded by
// the configured capacity). Slots that arrive after the status snapshot are
// left for the next cycle. No retries: a failed read ends the batch early.

use embedded_hal::i2c::I2c;

use crate::drivers::lsm6dsox::Lsm6dsox;
use crate::error::SensorError;
use crate::events::Batch;

/// Successful drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    pub batch: Batch,
    /// The device reported overrun: samples were lost before this drain.
    pub overrun: bool,
    /// Level at start of drain.
    pub level: u16,
}

/// A drain that stopped early. `partial` holds the slots read before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDrain {
    pub partial: Batch,
    pub error: SensorError,
}

pub struct DrainEngine {
    capacity: u16,
    overruns: u32,
}

impl DrainEngine {
    pub fn new(capacity: u16) -> Self {
        Self { capacity, overruns: 0 }
    }

    /// Overrun events seen since boot.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    pub fn drain<I2C: I2c>(&mut self, imu: &mut Lsm6dsox<I2C>) -> Result<Drained, PartialDrain> {
        let status = imu.read_status().map_err(|error| PartialDrain {
            partial: Batch::default(),
            error,
        })?;

        if status.overrun {
            self.overruns = self.overruns.wrapping_add(1);
            log::warn!("FIFO overrun at level {} (total {})", status.level, self.overruns);
        }

        if status.level == 0 {
            return Ok(Drained {
                batch: Batch::default(),
                overrun: status.overrun,
                level: 0,
            });
        }

        let count = if status.level > self.capacity {
            log::warn!(
                "FIFO level {} above capacity {}; leaving the rest for next drain",
                status.level,
                self.capacity
            );
            self.capacity
        } else {
            status.level
        };

        let mut batch = Batch::with_capacity(count as usize);
        for _ in 0..count {
            match imu.read_fifo_slot() {
                Ok(sample) => batch.push(sample),
                Err(error) => {
                    log::warn!("FIFO drain aborted after {}/{} slots: {}", batch.len(), count, error);
                    return Err(PartialDrain { partial: batch, error });
                }
            }
        }

        log::debug!("Drained {} slots", batch.len());
        Ok(Drained {
            batch,
            overrun: status.overrun,
            level: status.level,
        })
    }
}
