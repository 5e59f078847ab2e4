//! Configuration types for the MPU-9250 board sensor.

use core::default::Default;

use bitflags::bitflags;

/// Accelerometer full scale configuration; default: +-2g.
///
/// The two configuration bits land in positions 4:3 of `ACCEL_CONFIG`.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
    /// +-2g
    _2G = 0,
    /// +-4g
    _4G = 1,
    /// +-8g
    _8G = 2,
    /// +-16g
    _16G = 3,
}

impl AccelRange {
    pub(crate) fn reg_value(self) -> u8 {
        (self as u8) << 3
    }

    pub(crate) fn resolution(self) -> f32 {
        match self {
            AccelRange::_2G => 2.0 / 32768.0,
            AccelRange::_4G => 4.0 / 32768.0,
            AccelRange::_8G => 8.0 / 32768.0,
            AccelRange::_16G => 16.0 / 32768.0,
        }
    }

    /// Converts a raw accelerometer sample to g for this range.
    pub fn convert(self, raw: i16) -> f32 {
        raw as f32 * self.resolution()
    }
}

impl Default for AccelRange {
    fn default() -> Self {
        AccelRange::_2G
    }
}

/// Converts a raw gyroscope sample to deg/s.
///
/// The scale is a fixed +-500 deg/s: the gyroscope is left at its power-on
/// full scale configuration and the readout is interpreted accordingly.
pub fn gyro_convert(raw: i16) -> f32 {
    raw as f32 * (500.0 / 65536.0)
}

bitflags! {
    /// Active axis selection.
    ///
    /// Bit positions match the standby bits of `PWR_MGMT_2`, so the register
    /// value enabling exactly this set is the bitwise complement restricted
    /// to the six valid bits (see [`AxisSet::standby_value`]).
    pub struct AxisSet: u8 {
        /// Gyroscope Z axis
        const GYRO_Z = 0b0000_0001;
        /// Gyroscope Y axis
        const GYRO_Y = 0b0000_0010;
        /// Gyroscope X axis
        const GYRO_X = 0b0000_0100;
        /// All gyroscope axes
        const GYRO_ALL = 0b0000_0111;
        /// Accelerometer Z axis
        const ACCEL_Z = 0b0000_1000;
        /// Accelerometer Y axis
        const ACCEL_Y = 0b0001_0000;
        /// Accelerometer X axis
        const ACCEL_X = 0b0010_0000;
        /// All accelerometer axes
        const ACCEL_ALL = 0b0011_1000;
        /// All six axes
        const ALL = 0b0011_1111;
    }
}

impl AxisSet {
    /// `PWR_MGMT_2` value that puts every axis *not* in this set in standby.
    pub fn standby_value(self) -> u8 {
        !self.bits() & AxisSet::ALL.bits()
    }
}

/// Axis selector for [`value`](crate::Mpu9250Sensor::value) readings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Accelerometer X axis, centi-g
    AccelX,
    /// Accelerometer Y axis, centi-g
    AccelY,
    /// Accelerometer Z axis, centi-g
    AccelZ,
    /// Gyroscope X axis, centi-deg/s
    GyroX,
    /// Gyroscope Y axis, centi-deg/s
    GyroY,
    /// Gyroscope Z axis, centi-deg/s
    GyroZ,
}

/// Sensor lifecycle state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Power rail down, no register traffic.
    Disabled,
    /// Power rail up, waiting out the boot and startup delays.
    Booting,
    /// Boot sequence complete, readings are meaningful.
    Enabled,
}

/// Operations accepted by [`configure`](crate::Mpu9250Sensor::configure).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Configure {
    /// One-time pin setup at driver attach; leaves the sensor disabled.
    HardwareInit,
    /// Enable the given axes, or shut the sensor down if the set is empty.
    SetActive(AxisSet),
}

/// Queries accepted by [`status`](crate::Mpu9250Sensor::status).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Query {
    /// Is the sensor active?
    Active,
    /// Is the sensor ready to deliver readings?
    Ready,
}

/// Timed events delivered by the host scheduler to
/// [`advance`](crate::Mpu9250Sensor::advance).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The boot delay requested on power-up has elapsed.
    BootElapsed,
    /// The startup (settling) delay requested after configuration has
    /// elapsed.
    StartupElapsed,
}

/// Driver configuration.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    pub(crate) accel_range: AccelRange,
    pub(crate) mag_resolution: crate::ak8963::MagResolution,
    pub(crate) mag_mode: crate::ak8963::MagMode,
}

impl Default for Config {
    fn default() -> Self {
        Config { accel_range: AccelRange::default(),
                 mag_resolution: Default::default(),
                 mag_mode: Default::default(), }
    }
}

impl Config {
    /// Sets the accelerometer full scale applied during the boot sequence
    /// ([`AccelRange`]).
    pub fn accel_range(&mut self, range: AccelRange) -> &mut Self {
        self.accel_range = range;
        self
    }

    /// Sets the magnetometer resolution used when re-arming conversions
    /// ([`MagResolution`](crate::MagResolution)).
    pub fn mag_resolution(&mut self,
                          resolution: crate::ak8963::MagResolution)
                          -> &mut Self {
        self.mag_resolution = resolution;
        self
    }

    /// Sets the magnetometer operating mode used when re-arming conversions
    /// ([`MagMode`](crate::MagMode)).
    pub fn mag_mode(&mut self, mode: crate::ak8963::MagMode) -> &mut Self {
        self.mag_mode = mode;
        self
    }
}
