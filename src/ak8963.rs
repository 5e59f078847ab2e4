//! AK8963, the I2C magnetometer inside the MPU-9250 package.
//!
//! The AK8963 sits behind the MPU's internal I2C bridge and is only
//! addressable on the main bus while the bypass bit of `INT_PIN_CFG` is set.

use crate::vec3::{Scale, Vec3};

/// I2C slave address of the magnetometer.
pub const I2C_ADDRESS: u8 = 0x0c;

/// Expected `WIA` value.
pub const DEVICE_ID: u8 = 0x48;

/// ST1 bit: a new conversion result is available.
pub(crate) const DATA_READY: u8 = 0x01;
/// ST2 bit: magnetic sensor overflow, the sample is invalid.
pub(crate) const OVERFLOW: u8 = 0x08;
/// CNTL2 bit: soft reset.
pub(crate) const RESET: u8 = 0x01;

#[allow(dead_code)]
#[derive(Clone, Copy)]
pub(crate) enum Register {
    WIA = 0x00,
    INFO = 0x01,
    ST1 = 0x02,
    HXL = 0x03,
    ST2 = 0x09,
    CNTL1 = 0x0a,
    CNTL2 = 0x0b,
    ASTC = 0x0c,
    I2CDIS = 0x0f,
    ASAX = 0x10,
}

impl Register {
    pub(crate) fn addr(self) -> u8 {
        self as u8
    }
}

/// Magnetometer operating mode; default: single measurement.
///
/// In single measurement mode the AK8963 powers down after every
/// conversion, so the driver re-arms `CNTL1` after each read attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagMode {
    /// Power down
    PowerDown = 0x00,
    /// Single measurement, re-armed after every read
    Single = 0x01,
    /// Continuous measurement at 8 Hz
    Continuous8Hz = 0x02,
    /// Continuous measurement at 100 Hz
    Continuous100Hz = 0x06,
    /// Fuse ROM access, exposes the factory sensitivity values
    FuseRom = 0x0f,
}

impl Default for MagMode {
    fn default() -> Self {
        MagMode::Single
    }
}

/// Magnetometer output resolution; default: 16 bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagResolution {
    /// 14 bit, 0.6 mG per LSB
    Bits14 = 0,
    /// 16 bit, 0.15 mG per LSB
    Bits16 = 1,
}

impl Default for MagResolution {
    fn default() -> Self {
        MagResolution::Bits16
    }
}

/// `CNTL1` value arming the next conversion.
pub(crate) fn cntl1_value(resolution: MagResolution, mode: MagMode) -> u8 {
    ((resolution as u8) << 4) | mode as u8
}

/// Per-axis factory sensitivity adjustment.
///
/// The AK8963 ships per-axis sensitivity values in its fuse ROM; each raw
/// fuse byte maps to a factor in `128..=383` (`byte + 128`) and every sample
/// is scaled as `sample * factor >> 8`. The default is the identity factor
/// (256 per axis), which leaves samples untouched; call
/// [`read_mag_calibration`](crate::Mpu9250Sensor::read_mag_calibration) to
/// load the factory values instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MagCalibration {
    /// X axis sensitivity factor
    pub x: i16,
    /// Y axis sensitivity factor
    pub y: i16,
    /// Z axis sensitivity factor
    pub z: i16,
}

impl MagCalibration {
    /// Builds the calibration triple from the three fuse ROM bytes
    /// (`ASAX`, `ASAY`, `ASAZ`).
    pub fn from_fuse_rom(raw: [u8; 3]) -> Self {
        MagCalibration { x: raw[0] as i16 + 128,
                         y: raw[1] as i16 + 128,
                         z: raw[2] as i16 + 128, }
    }

    fn apply(factor: i16, raw: i16) -> i16 {
        ((raw as i32 * factor as i32) >> 8) as i16
    }
}

impl Default for MagCalibration {
    fn default() -> Self {
        MagCalibration { x: 256,
                         y: 256,
                         z: 256, }
    }
}

impl Scale<MagCalibration> for Vec3<i16> {
    fn scale(self, cal: MagCalibration) -> Vec3<i16> {
        Vec3 { x: MagCalibration::apply(cal.x, self.x),
               y: MagCalibration::apply(cal.y, self.y),
               z: MagCalibration::apply(cal.z, self.z), }
    }
}

/// Failure modes of a magnetometer read attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagError<E> {
    /// Enabling the bus bypass on the main device failed.
    BridgeEnable(E),
    /// Reading the `ST1` status register failed.
    StatusRead(E),
    /// No conversion result is available yet; retry later.
    NotReady,
    /// The sample overflowed the magnetic sensor and is invalid.
    Overflow,
    /// The burst read of the sample registers failed.
    DataRead(E),
}
