// Helmet IMU - LSM6DSOX Driver
//
// Register-level driver: identity check, configuration, FIFO status and
// slot decoding. This is the only code that writes sensor registers.

use embedded_hal::i2c::I2c;

use crate::config::{SensorConfig, LSM6DSOX_WHO_AM_I};
use crate::drivers::registers::{fields, FifoMode, Register, TimestampDecimation, FIFO_SLOT_LEN};
use crate::drivers::transport::RegisterTransport;
use crate::error::SensorError;
use crate::events::{FifoStatus, Sample, SampleTag};

pub struct Lsm6dsox<I2C> {
    transport: RegisterTransport<I2C>,
    config: SensorConfig,
}

impl<I2C: I2c> Lsm6dsox<I2C> {
    pub fn new(transport: RegisterTransport<I2C>, config: SensorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut I2C {
        self.transport.bus_mut()
    }

    pub fn release(self) -> RegisterTransport<I2C> {
        self.transport
    }

    /// Verify WHO_AM_I. Must succeed before [`configure`](Self::configure).
    pub fn identify(&mut self) -> Result<(), SensorError> {
        let found = self.transport.read_byte(Register::WhoAmI)?;
        if found != LSM6DSOX_WHO_AM_I {
            log::error!("LSM6DSOX not found (WHO_AM_I = {:#04x})", found);
            return Err(SensorError::DeviceNotFound { found });
        }
        log::info!("LSM6DSOX found (WHO_AM_I = {:#04x})", found);
        Ok(())
    }

    /// Write the whole configuration. Control registers go first and
    /// FIFO_CTRL4 (which starts batching) goes last.
    pub fn configure(&mut self) -> Result<(), SensorError> {
        let plan = self.register_plan()?;
        for (reg, value) in plan {
            self.transport.write_confirmed(reg, value)?;
        }
        log::info!(
            "LSM6DSOX configured ({:?}/{:?}, {:?}/{:?}, FIFO {:?} wtm {})",
            self.config.accel_odr,
            self.config.accel_scale,
            self.config.gyro_odr,
            self.config.gyro_scale,
            self.config.fifo_mode,
            self.config.watermark,
        );
        Ok(())
    }

    /// Ordered register writes for the current configuration.
    pub fn register_plan(&self) -> Result<Vec<(Register, u8)>, SensorError> {
        let c = &self.config;
        let mut plan = Vec::with_capacity(14);

        let ctrl3 = fields::CTRL3_C_BDU.insert(0, 1)?;
        plan.push((Register::Ctrl3C, fields::CTRL3_C_IF_INC.insert(ctrl3, 1)?));

        let xl = fields::CTRL1_XL_ODR.insert(0, c.accel_odr.code())?;
        plan.push((Register::Ctrl1Xl, fields::CTRL1_XL_FS.insert(xl, c.accel_scale.code())?));

        let g = fields::CTRL2_G_ODR.insert(0, c.gyro_odr.code())?;
        plan.push((Register::Ctrl2G, fields::CTRL2_G_FS.insert(g, c.gyro_scale.code())?));

        if let Some(inact) = c.inactivity {
            let dur = fields::WAKE_UP_DUR_WAKE.insert(0, inact.wake_duration as u16)?;
            let dur = fields::WAKE_UP_DUR_SLEEP.insert(dur, inact.sleep_duration as u16)?;
            plan.push((Register::WakeUpDur, dur));
            plan.push((
                Register::WakeUpThs,
                fields::WAKE_UP_THS_THS.insert(0, inact.wake_threshold as u16)?,
            ));
            let tap2 = fields::TAP_CFG2_INTERRUPTS_ENABLE.insert(0, 1)?;
            plan.push((Register::TapCfg2, fields::TAP_CFG2_INACT_EN.insert(tap2, 0b11)?));
            plan.push((Register::TapCfg0, fields::TAP_CFG0_SLEEP_STATUS_ON_INT.insert(0, 1)?));
            plan.push((Register::Md2Cfg, fields::MD2_CFG_INT2_SLEEP_CHANGE.insert(0, 1)?));
        }

        plan.push((Register::FifoCtrl1, fields::FIFO_CTRL1_WTM.insert(0, c.watermark & 0xFF)?));
        // WTM is 9 bits; anything above overflows the WTM8 field.
        let ctrl2 = fields::FIFO_CTRL2_WTM8.insert(0, c.watermark >> 8)?;
        plan.push((
            Register::FifoCtrl2,
            fields::FIFO_CTRL2_STOP_ON_WTM.insert(ctrl2, c.stop_on_watermark as u16)?,
        ));

        let bdr = fields::FIFO_CTRL3_BDR_GY.insert(0, c.gyro_batch_rate.code())?;
        plan.push((
            Register::FifoCtrl3,
            fields::FIFO_CTRL3_BDR_XL.insert(bdr, c.accel_batch_rate.code())?,
        ));

        plan.push((
            Register::Int1Ctrl,
            fields::INT1_CTRL_FIFO_TH.insert(0, c.watermark_on_int1 as u16)?,
        ));

        plan.push((Register::FifoCtrl4, self.fifo_ctrl4(c.fifo_mode)?));
        Ok(plan)
    }

    fn fifo_ctrl4(&self, mode: FifoMode) -> Result<u8, SensorError> {
        let reg = fields::FIFO_CTRL4_DEC_TS.insert(0, self.config.timestamp_decimation.code())?;
        Ok(fields::FIFO_CTRL4_MODE.insert(reg, mode.code())?)
    }

    /// Discard everything queued: bypass, then restore the configured mode.
    pub fn flush_fifo(&mut self) -> Result<(), SensorError> {
        let bypass = self.fifo_ctrl4(FifoMode::Bypass)?;
        let restore = self.fifo_ctrl4(self.config.fifo_mode)?;
        self.transport.write_byte(Register::FifoCtrl4, bypass)?;
        self.transport.write_byte(Register::FifoCtrl4, restore)?;
        log::debug!("FIFO flushed");
        Ok(())
    }

    /// Read FIFO_STATUS1/2 in one burst.
    pub fn read_status(&mut self) -> Result<FifoStatus, SensorError> {
        let mut raw = [0u8; 2];
        self.transport.read_bytes(Register::FifoStatus1, &mut raw)?;
        Ok(decode_status(raw[0], raw[1]))
    }

    /// Read one FIFO slot (tag + X/Y/Z) as a single 7-byte burst.
    ///
    /// The read pointer advances on access, so consecutive calls must not
    /// be interleaved with other register reads.
    pub fn read_fifo_slot(&mut self) -> Result<Sample, SensorError> {
        let mut raw = [0u8; FIFO_SLOT_LEN];
        self.transport.read_bytes(Register::FifoDataOutTag, &mut raw)?;
        self.decode_slot(&raw)
    }

    fn decode_slot(&self, raw: &[u8; FIFO_SLOT_LEN]) -> Result<Sample, SensorError> {
        let tag_val = raw[0] >> 3;
        let tag = SampleTag::from_raw(tag_val)
            .filter(|t| self.is_batched(*t))
            .ok_or(SensorError::UnexpectedTag(tag_val))?;
        Ok(Sample {
            tag,
            x: i16::from_le_bytes([raw[1], raw[2]]),
            y: i16::from_le_bytes([raw[3], raw[4]]),
            z: i16::from_le_bytes([raw[5], raw[6]]),
        })
    }

    /// Whether the configuration puts this source into the FIFO.
    pub fn is_batched(&self, tag: SampleTag) -> bool {
        match tag {
            SampleTag::Accel => self.config.accel_batch_rate.is_batched(),
            SampleTag::Gyro => self.config.gyro_batch_rate.is_batched(),
            SampleTag::Timestamp => self.config.timestamp_decimation != TimestampDecimation::Off,
        }
    }
}

/// `level = status1 | (status2[1:0] << 8)`, `overrun = status2[5]`,
/// `watermark = status2[7]`.
pub fn decode_status(status1: u8, status2: u8) -> FifoStatus {
    FifoStatus {
        level: status1 as u16 | (fields::FIFO_STATUS2_DIFF_HI.extract(status2) << 8),
        overrun: fields::FIFO_STATUS2_FULL.extract(status2) != 0,
        watermark: fields::FIFO_STATUS2_WTM.extract(status2) != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::I2C_ADDR_LSM6DSOX;
    use crate::error::TransportError;
    use crate::testing::SimulatedImu;

    fn driver(sim: SimulatedImu) -> Lsm6dsox<SimulatedImu> {
        Lsm6dsox::new(
            RegisterTransport::new(sim, I2C_ADDR_LSM6DSOX),
            SensorConfig::default(),
        )
    }

    #[test]
    fn identify_accepts_0x6c() {
        let mut imu = driver(SimulatedImu::new());
        assert!(imu.identify().is_ok());
    }

    #[test]
    fn identify_rejects_0x00() {
        let mut sim = SimulatedImu::new();
        sim.regs[Register::WhoAmI.addr() as usize] = 0x00;
        let mut imu = driver(sim);
        assert_eq!(
            imu.identify().unwrap_err(),
            SensorError::DeviceNotFound { found: 0x00 }
        );
    }

    #[test]
    fn status_decodes_level_and_overrun() {
        // DIFF_FIFO[9:8] lives in status2[1:0].
        let s = decode_status(0x05, 0x01);
        assert_eq!(s.level, 0x105);

        let s = decode_status(0x05, 0x00);
        assert_eq!(s.level, 5);
        assert!(!s.overrun);

        let s = decode_status(0xFF, 0b1010_0011);
        assert_eq!(s.level, 1023);
        assert!(s.overrun);
        assert!(s.watermark);
    }

    #[test]
    fn status1_0x05_status2_0x01_bit5_clear() {
        // status2 = 0x01 leaves bit 5 clear: no overrun.
        let s = decode_status(0x05, 0x01);
        assert!(!s.overrun);
        assert!(!s.watermark);
    }

    #[test]
    fn configure_writes_controls_before_fifo_mode() {
        let mut imu = driver(SimulatedImu::new());
        imu.configure().unwrap();
        let writes = imu.release().release().writes();
        let regs: Vec<u8> = writes.iter().map(|(r, _)| *r).collect();

        let pos = |r: Register| regs.iter().position(|&a| a == r.addr()).unwrap();
        assert!(pos(Register::Ctrl1Xl) < pos(Register::FifoCtrl1));
        assert!(pos(Register::Ctrl2G) < pos(Register::FifoCtrl3));
        assert_eq!(*regs.last().unwrap(), Register::FifoCtrl4.addr());

        let value = |r: Register| writes.iter().find(|(a, _)| *a == r.addr()).unwrap().1;
        assert_eq!(value(Register::Ctrl3C), 0x44);
        assert_eq!(value(Register::Ctrl1Xl), 0b0010_0100);
        assert_eq!(value(Register::Ctrl2G), 0b0010_1100);
        assert_eq!(value(Register::FifoCtrl1), 0x34);
        assert_eq!(value(Register::FifoCtrl2), 0x80);
        assert_eq!(value(Register::FifoCtrl3), 0x22);
        assert_eq!(value(Register::FifoCtrl4), 0x06);
        assert_eq!(value(Register::Int1Ctrl), 0x08);
        assert_eq!(value(Register::WakeUpDur), 0b0110_0001);
        assert_eq!(value(Register::TapCfg2), 0b1110_0000);
        assert_eq!(value(Register::Md2Cfg), 0x80);
    }

    #[test]
    fn configure_fails_when_write_not_confirmed() {
        let mut sim = SimulatedImu::new();
        sim.stuck_register = Some(Register::Ctrl2G.addr());
        let mut imu = driver(sim);
        assert_eq!(
            imu.configure().unwrap_err(),
            SensorError::Transport(TransportError::WriteNotConfirmed {
                register: 0x11,
                wrote: 0b0010_1100,
                read: 0,
            })
        );
    }

    #[test]
    fn configure_rejects_oversized_watermark() {
        let sim = SimulatedImu::new();
        let config = SensorConfig { watermark: 600, ..SensorConfig::default() };
        let mut imu = Lsm6dsox::new(RegisterTransport::new(sim, I2C_ADDR_LSM6DSOX), config);
        assert!(matches!(imu.configure(), Err(SensorError::Config(_))));
    }

    #[test]
    fn slot_decodes_little_endian_axes() {
        let mut sim = SimulatedImu::new();
        sim.push_slot(0x02, -2, 0x1234, i16::MIN);
        let mut imu = driver(sim);
        let s = imu.read_fifo_slot().unwrap();
        assert_eq!(s, Sample { tag: SampleTag::Accel, x: -2, y: 0x1234, z: i16::MIN });
    }

    #[test]
    fn unbatched_tag_is_decode_error() {
        let mut sim = SimulatedImu::new();
        sim.push_slot(0x04, 1, 2, 3);
        let mut imu = driver(sim);
        assert_eq!(imu.read_fifo_slot().unwrap_err(), SensorError::UnexpectedTag(0x04));

        let mut sim = SimulatedImu::new();
        sim.push_slot(0x04, 1, 2, 3);
        let config = SensorConfig {
            timestamp_decimation: TimestampDecimation::Every32,
            ..SensorConfig::default()
        };
        let mut imu = Lsm6dsox::new(RegisterTransport::new(sim, I2C_ADDR_LSM6DSOX), config);
        assert_eq!(imu.read_fifo_slot().unwrap().tag, SampleTag::Timestamp);
    }

    #[test]
    fn flush_empties_fifo_and_restores_mode() {
        let mut sim = SimulatedImu::new();
        sim.fill(10);
        let mut imu = driver(sim);
        imu.flush_fifo().unwrap();
        assert_eq!(imu.read_status().unwrap().level, 0);
        let sim = imu.release().release();
        assert_eq!(sim.regs[Register::FifoCtrl4.addr() as usize], 0x06);
    }
}
