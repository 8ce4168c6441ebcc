// Helmet IMU - LSM6DSOX Register Map
//
// Addresses and bit fields from the LSM6DSOX datasheet (DocID 032509).
// Only the registers the firmware touches are listed.

use crate::error::ConfigError;

/// Registers in the primary (user) bank. All addresses lie in 0x01..=0x7E.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    FifoCtrl1 = 0x07,
    FifoCtrl2 = 0x08,
    FifoCtrl3 = 0x09,
    FifoCtrl4 = 0x0A,
    Int1Ctrl = 0x0D,
    WhoAmI = 0x0F,
    Ctrl1Xl = 0x10,
    Ctrl2G = 0x11,
    Ctrl3C = 0x12,
    FifoStatus1 = 0x3A,
    FifoStatus2 = 0x3B,
    TapCfg0 = 0x56,
    TapCfg2 = 0x58,
    WakeUpThs = 0x5B,
    WakeUpDur = 0x5C,
    Md2Cfg = 0x5F,
    FifoDataOutTag = 0x78,
    /// Last byte of the seven-byte slot window.
    FifoDataOutZH = 0x7E,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Lowest / highest documented register address.
pub const ADDR_MIN: u8 = 0x01;
pub const ADDR_MAX: u8 = 0x7E;

/// Bytes in one FIFO slot: tag + X/Y/Z little-endian words.
pub const FIFO_SLOT_LEN: usize = 7;

// ---------------------------------------------------------------------------
// Bit fields
// ---------------------------------------------------------------------------

/// A contiguous bit range inside one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub register: Register,
    pub shift: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(register: Register, shift: u8, width: u8) -> Self {
        Self { register, shift, width }
    }

    const fn mask(self) -> u16 {
        ((1u16 << self.width) - 1) << self.shift
    }

    /// Place `value` into this field of `reg`, leaving the other bits alone.
    pub fn insert(self, reg: u8, value: u16) -> Result<u8, ConfigError> {
        if value >> self.width != 0 {
            return Err(ConfigError::FieldOverflow {
                register: self.register.addr(),
                width: self.width,
                value,
            });
        }
        let mask = self.mask();
        Ok(((reg as u16 & !mask) | ((value << self.shift) & mask)) as u8)
    }

    pub fn extract(self, reg: u8) -> u16 {
        (reg as u16 & self.mask()) >> self.shift
    }
}

pub mod fields {
    use super::{Field, Register};

    pub const CTRL1_XL_ODR: Field = Field::new(Register::Ctrl1Xl, 4, 4);
    pub const CTRL1_XL_FS: Field = Field::new(Register::Ctrl1Xl, 2, 2);
    pub const CTRL2_G_ODR: Field = Field::new(Register::Ctrl2G, 4, 4);
    pub const CTRL2_G_FS: Field = Field::new(Register::Ctrl2G, 1, 3);
    pub const CTRL3_C_BDU: Field = Field::new(Register::Ctrl3C, 6, 1);
    pub const CTRL3_C_IF_INC: Field = Field::new(Register::Ctrl3C, 2, 1);

    /// WTM[7:0]
    pub const FIFO_CTRL1_WTM: Field = Field::new(Register::FifoCtrl1, 0, 8);
    /// WTM[8]
    pub const FIFO_CTRL2_WTM8: Field = Field::new(Register::FifoCtrl2, 0, 1);
    pub const FIFO_CTRL2_STOP_ON_WTM: Field = Field::new(Register::FifoCtrl2, 7, 1);
    pub const FIFO_CTRL3_BDR_GY: Field = Field::new(Register::FifoCtrl3, 4, 4);
    pub const FIFO_CTRL3_BDR_XL: Field = Field::new(Register::FifoCtrl3, 0, 4);
    pub const FIFO_CTRL4_MODE: Field = Field::new(Register::FifoCtrl4, 0, 3);
    pub const FIFO_CTRL4_DEC_TS: Field = Field::new(Register::FifoCtrl4, 6, 2);

    pub const INT1_CTRL_FIFO_TH: Field = Field::new(Register::Int1Ctrl, 3, 1);

    /// DIFF_FIFO[9:8]
    pub const FIFO_STATUS2_DIFF_HI: Field = Field::new(Register::FifoStatus2, 0, 2);
    pub const FIFO_STATUS2_FULL: Field = Field::new(Register::FifoStatus2, 5, 1);
    pub const FIFO_STATUS2_WTM: Field = Field::new(Register::FifoStatus2, 7, 1);

    pub const WAKE_UP_DUR_SLEEP: Field = Field::new(Register::WakeUpDur, 0, 4);
    pub const WAKE_UP_DUR_WAKE: Field = Field::new(Register::WakeUpDur, 5, 2);
    pub const WAKE_UP_THS_THS: Field = Field::new(Register::WakeUpThs, 0, 6);
    /// INACT_EN: accel low-power 12.5 Hz, gyro power-down while asleep.
    pub const TAP_CFG2_INACT_EN: Field = Field::new(Register::TapCfg2, 5, 2);
    pub const TAP_CFG2_INTERRUPTS_ENABLE: Field = Field::new(Register::TapCfg2, 7, 1);
    pub const TAP_CFG0_SLEEP_STATUS_ON_INT: Field = Field::new(Register::TapCfg0, 5, 1);
    pub const MD2_CFG_INT2_SLEEP_CHANGE: Field = Field::new(Register::Md2Cfg, 7, 1);
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// ODR_XL / ODR_G codes (high-performance mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDataRate {
    PowerDown,
    Hz12_5,
    Hz26,
    Hz52,
    Hz104,
    Hz208,
    Hz416,
    Hz833,
}

impl OutputDataRate {
    pub const fn code(self) -> u16 {
        match self {
            Self::PowerDown => 0b0000,
            Self::Hz12_5 => 0b0001,
            Self::Hz26 => 0b0010,
            Self::Hz52 => 0b0011,
            Self::Hz104 => 0b0100,
            Self::Hz208 => 0b0101,
            Self::Hz416 => 0b0110,
            Self::Hz833 => 0b0111,
        }
    }
}

/// Accelerometer full scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelScale {
    G2,
    G4,
    G8,
    G16,
}

impl AccelScale {
    pub const fn code(self) -> u16 {
        match self {
            Self::G2 => 0b00,
            Self::G16 => 0b01,
            Self::G4 => 0b10,
            Self::G8 => 0b11,
        }
    }

    /// Sensitivity in g per LSB.
    pub const fn g_per_lsb(self) -> f32 {
        match self {
            Self::G2 => 0.000_061,
            Self::G4 => 0.000_122,
            Self::G8 => 0.000_244,
            Self::G16 => 0.000_488,
        }
    }
}

/// Gyroscope full scale (FS_125 folded into the 3-bit field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroScale {
    Dps125,
    Dps250,
    Dps500,
    Dps1000,
    Dps2000,
}

impl GyroScale {
    pub const fn code(self) -> u16 {
        match self {
            Self::Dps125 => 0b001,
            Self::Dps250 => 0b000,
            Self::Dps500 => 0b010,
            Self::Dps1000 => 0b100,
            Self::Dps2000 => 0b110,
        }
    }

    /// Sensitivity in dps per LSB.
    pub const fn dps_per_lsb(self) -> f32 {
        match self {
            Self::Dps125 => 0.004_375,
            Self::Dps250 => 0.008_75,
            Self::Dps500 => 0.017_5,
            Self::Dps1000 => 0.035,
            Self::Dps2000 => 0.070,
        }
    }
}

/// FIFO_MODE[2:0]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoMode {
    Bypass,
    /// Stop collecting when full.
    Fifo,
    ContinuousToFifo,
    BypassToContinuous,
    /// Overwrite oldest when full.
    Continuous,
    BypassToFifo,
}

impl FifoMode {
    pub const fn code(self) -> u16 {
        match self {
            Self::Bypass => 0b000,
            Self::Fifo => 0b001,
            Self::ContinuousToFifo => 0b011,
            Self::BypassToContinuous => 0b100,
            Self::Continuous => 0b110,
            Self::BypassToFifo => 0b111,
        }
    }
}

/// BDR_XL / BDR_GY codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDataRate {
    NotBatched,
    Hz12_5,
    Hz26,
    Hz52,
    Hz104,
    Hz208,
    Hz417,
    Hz833,
}

impl BatchDataRate {
    pub const fn code(self) -> u16 {
        match self {
            Self::NotBatched => 0b0000,
            Self::Hz12_5 => 0b0001,
            Self::Hz26 => 0b0010,
            Self::Hz52 => 0b0011,
            Self::Hz104 => 0b0100,
            Self::Hz208 => 0b0101,
            Self::Hz417 => 0b0110,
            Self::Hz833 => 0b0111,
        }
    }

    pub const fn is_batched(self) -> bool {
        !matches!(self, Self::NotBatched)
    }
}

/// DEC_TS_BATCH[1:0]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampDecimation {
    Off,
    Every1,
    Every8,
    Every32,
}

impl TimestampDecimation {
    pub const fn code(self) -> u16 {
        match self {
            Self::Off => 0b00,
            Self::Every1 => 0b01,
            Self::Every8 => 0b10,
            Self::Every32 => 0b11,
        }
    }
}

/// TAG_SENSOR values of FIFO_DATA_OUT_TAG (bits 7:3).
pub mod tags {
    pub const GYRO_NC: u8 = 0x01;
    pub const ACCEL_NC: u8 = 0x02;
    pub const TIMESTAMP: u8 = 0x04;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_inside_documented_space() {
        let all = [
            Register::FifoCtrl1,
            Register::WhoAmI,
            Register::FifoStatus2,
            Register::Md2Cfg,
            Register::FifoDataOutTag,
            Register::FifoDataOutZH,
        ];
        for reg in all {
            assert!((ADDR_MIN..=ADDR_MAX).contains(&reg.addr()), "{reg:?}");
        }
    }

    #[test]
    fn insert_matches_original_ctrl_values() {
        // 26 Hz, +/-16 g -> 0b0010_0100
        let xl = fields::CTRL1_XL_ODR.insert(0, OutputDataRate::Hz26.code()).unwrap();
        let xl = fields::CTRL1_XL_FS.insert(xl, AccelScale::G16.code()).unwrap();
        assert_eq!(xl, 0b0010_0100);

        // 26 Hz, +/-2000 dps -> 0b0010_1100
        let g = fields::CTRL2_G_ODR.insert(0, OutputDataRate::Hz26.code()).unwrap();
        let g = fields::CTRL2_G_FS.insert(g, GyroScale::Dps2000.code()).unwrap();
        assert_eq!(g, 0b0010_1100);
    }

    #[test]
    fn insert_preserves_other_bits() {
        let reg = fields::FIFO_CTRL2_STOP_ON_WTM.insert(0x01, 1).unwrap();
        assert_eq!(reg, 0x81);
    }

    #[test]
    fn insert_rejects_overflow() {
        let err = fields::FIFO_CTRL4_MODE.insert(0, 0b1000).unwrap_err();
        assert_eq!(
            err,
            ConfigError::FieldOverflow { register: 0x0A, width: 3, value: 8 }
        );
    }

    #[test]
    fn extract_status_bits() {
        assert_eq!(fields::FIFO_STATUS2_DIFF_HI.extract(0b1010_0011), 0b11);
        assert_eq!(fields::FIFO_STATUS2_FULL.extract(0b0010_0000), 1);
        assert_eq!(fields::FIFO_STATUS2_WTM.extract(0b0010_0000), 0);
    }
}
