//! A no_std, generic driver for the MPU9250 motion sensor (accelerometer +
//! gyroscope + magnetometer IMU) as wired on battery-powered sensor boards:
//! the power rail is host-switched, the boot sequence is deferred through a
//! host timer, and data readiness is polled rather than interrupt-driven.
//!
//! The driver is a three-state lifecycle machine (disabled, booting,
//! enabled). Enabling powers the rail and schedules a two-stage deferred
//! sequence through the host [`Platform`]; once the startup delay elapses,
//! axis readings are served in integer centi-units (centi-g and
//! centi-deg/s). The on-package AK8963 magnetometer is reached through the
//! MPU's bus bypass and read with its own status/overflow protocol.

#![deny(missing_docs)]
#![no_std]

mod ak8963;
mod bus;
pub mod conf;
mod platform;
mod vec3;

pub use ak8963::{MagCalibration, MagError, MagMode, MagResolution,
                 DEVICE_ID as MAG_DEVICE_ID};
pub use bus::{I2cBus, SensorBus};
pub use conf::{AccelRange, AxisSet, Channel, Config, Configure, Event,
               Query, State};
pub use platform::Platform;
pub use vec3::{Scale, Vec3};

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;

/// MPU's I2C address (AD0 low)
const MPU_I2C_ADDR: u8 = 0x68;

/// Ticks to wait after raising the power rail before the device accepts
/// configuration.
pub const SENSOR_BOOT_DELAY: u32 = 8;

/// Ticks to wait after configuration before readings are ready.
///
/// Kept separate from [`SENSOR_BOOT_DELAY`]: the gyroscope settles slower
/// than the accelerometer.
pub const SENSOR_STARTUP_DELAY: u32 = 5;

/// Tick budget for the data-ready poll. A low bound on purpose: the first
/// status read usually succeeds already.
pub const READING_WAIT_TIMEOUT: u32 = 10;

/// PWR_MGMT_1: sleep + stop all clocks
const SLEEP: u8 = 0x4f;
/// PWR_MGMT_1: disable temperature sensor + internal oscillator
const WAKE_UP: u8 = 0x09;
/// PWR_MGMT_2: every axis in standby
const ALL_AXES_STANDBY: u8 = 0x3f;
/// INT_STATUS: raw sensor data ready
const RAW_DATA_RDY: u8 = 0x01;
/// INT_PIN_CFG: route the magnetometer onto the main bus
const BYPASS_EN: u8 = 0x02;
/// INT_PIN_CFG: hold the interrupt level until the status read
const LATCH_INT_EN: u8 = 0x20;

/// Pattern written over the reading buffer when a burst read fails.
const READING_ERROR: i16 = i16::MIN;

#[allow(dead_code)]
#[derive(Clone, Copy)]
enum Register {
    SmplrtDiv = 0x19,
    Config = 0x1a,
    GyroConfig = 0x1b,
    AccelConfig = 0x1c,
    AccelConfig2 = 0x1d,
    LpAccelOdr = 0x1e,
    WomThr = 0x1f,
    FifoEn = 0x23,
    IntPinCfg = 0x37,
    IntEnable = 0x38,
    IntStatus = 0x3a,
    AccelXoutH = 0x3b,
    TempOutH = 0x41,
    GyroXoutH = 0x43,
    SignalPathReset = 0x68,
    AccelIntelCtrl = 0x69,
    UserCtrl = 0x6a,
    PwrMgmt1 = 0x6b,
    PwrMgmt2 = 0x6c,
    WhoAmI = 0x75,
}

impl Register {
    fn addr(self) -> u8 {
        self as u8
    }
}

/// Driver error for accelerometer/gyroscope operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The sensor is not in the `Enabled` lifecycle state.
    NotEnabled,
    /// The data-ready flag was not observed; retry later.
    NotReady,
    /// Bus transaction failed.
    Bus(E),
    /// Power pin toggle failed.
    Pin,
}

impl<E> core::convert::From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::Bus(error)
    }
}

/// MPU9250 board sensor driver.
pub struct Mpu9250Sensor<BUS, PWR, PLAT> {
    bus: BUS,
    power: PWR,
    platform: PLAT,
    state: State,
    /// Axes requested by the host, applied during the boot sequence.
    axes: AxisSet,
    /// Axes currently enabled in hardware; empty means fully asleep.
    applied: AxisSet,
    /// Range to apply during the boot sequence.
    range: AccelRange,
    /// Mirror of the last `ACCEL_CONFIG` range written successfully;
    /// readings convert with this, never with `range`.
    acc_range: AccelRange,
    /// Last `INT_STATUS` byte captured by the data-ready poll.
    interrupt_status: u8,
    reading: [i16; 3],
    powered: bool,
    mag_cal: MagCalibration,
    mag_mode: MagMode,
    mag_resolution: MagResolution,
}

impl<E, BUS, PWR, PLAT> Mpu9250Sensor<BUS, PWR, PLAT>
    where BUS: SensorBus<Error = E>,
          PWR: OutputPin,
          PLAT: Platform
{
    /// Creates a new driver from a bus transport, the power rail pin and the
    /// host platform hooks. No bus traffic happens until the sensor is
    /// enabled.
    pub fn new(bus: BUS, power: PWR, platform: PLAT, config: &mut Config) -> Self {
        Mpu9250Sensor { bus,
                        power,
                        platform,
                        state: State::Disabled,
                        axes: AxisSet::empty(),
                        applied: AxisSet::empty(),
                        range: config.accel_range,
                        acc_range: AccelRange::default(),
                        interrupt_status: 0,
                        reading: [0; 3],
                        powered: false,
                        mag_cal: MagCalibration::default(),
                        mag_mode: config.mag_mode,
                        mag_resolution: config.mag_resolution, }
    }

    /// Applies a configuration operation and returns the resulting
    /// lifecycle state.
    ///
    /// Enabling a nonzero axis set raises the power rail and schedules the
    /// first boot stage; the host must deliver [`Event::BootElapsed`] and
    /// [`Event::StartupElapsed`] to [`advance`](Self::advance) as the
    /// scheduled callbacks fire. Disabling (an empty axis set) takes effect
    /// immediately and cancels any pending stage.
    pub fn configure(&mut self, op: Configure) -> Result<State, Error<E>> {
        match op {
            Configure::HardwareInit => {
                self.platform.setup_pins();
                self.power.set_low().map_err(|_| Error::Pin)?;
                self.powered = false;
                self.axes = AxisSet::empty();
                self.state = State::Disabled;
            },
            Configure::SetActive(axes) => {
                let axes = axes & AxisSet::ALL;
                if !axes.is_empty() {
                    self.axes = axes;
                    self.power.set_high().map_err(|_| Error::Pin)?;
                    self.powered = true;
                    self.state = State::Booting;
                    self.platform.schedule(SENSOR_BOOT_DELAY);
                } else if self.powered {
                    self.axes = AxisSet::empty();
                    self.platform.cancel();
                    self.sleep()?;
                    while self.bus.busy() {}
                    self.state = State::Disabled;
                    self.power.set_low().map_err(|_| Error::Pin)?;
                    self.powered = false;
                }
            },
        }
        Ok(self.state)
    }

    /// Advances the deferred boot sequence when a scheduled delay elapses.
    ///
    /// `BootElapsed` configures range and axes and schedules the startup
    /// delay; `StartupElapsed` marks the sensor enabled and fires the
    /// platform's change notification. Events arriving outside the
    /// `Booting` state are ignored.
    pub fn advance<D>(&mut self,
                      event: Event,
                      delay: &mut D)
                      -> Result<State, Error<E>>
        where D: DelayMs<u8>
    {
        if self.state != State::Booting {
            return Ok(self.state);
        }
        match event {
            Event::BootElapsed => {
                if self.axes.intersects(AxisSet::ACCEL_ALL) {
                    self.set_accel_range(self.range)?;
                }
                self.apply_axes(delay)?;
                self.platform.schedule(SENSOR_STARTUP_DELAY);
            },
            Event::StartupElapsed => {
                self.state = State::Enabled;
                self.platform.notify_changed();
            },
        }
        Ok(self.state)
    }

    /// Returns the lifecycle state. `Active` and `Ready` are answered with
    /// the same value: anything but `Enabled` means readings will fail.
    pub fn status(&self, _query: Query) -> State {
        self.state
    }

    /// Sets the accelerometer full scale range.
    ///
    /// A no-op when `range` matches the mirror of the last successful
    /// write; on a failed write the mirror keeps its previous value, so
    /// conversions stay consistent with what the hardware actually uses.
    pub fn set_accel_range(&mut self, range: AccelRange) -> Result<(), Error<E>> {
        if range == self.acc_range {
            return Ok(());
        }
        let reg = range.reg_value();
        self.with_mpu(|bus| bus.write(Register::AccelConfig.addr(), reg))?;
        self.acc_range = range;
        Ok(())
    }

    /// The accelerometer range the hardware is configured to, as mirrored
    /// by the last successful write.
    pub fn accel_range(&self) -> AccelRange {
        self.acc_range
    }

    /// The axis set requested by the last enable.
    pub fn active_axes(&self) -> AxisSet {
        self.axes
    }

    /// Returns one converted axis reading in centi-units (centi-g for
    /// accelerometer channels, centi-deg/s for gyroscope channels),
    /// truncated toward zero.
    pub fn value(&mut self, channel: Channel) -> Result<i32, Error<E>> {
        if self.state != State::Enabled {
            return Err(Error::NotEnabled);
        }

        self.reading = [0; 3];
        self.wait_data_ready();

        let (start, index) = match channel {
            Channel::AccelX => (Register::AccelXoutH, 0),
            Channel::AccelY => (Register::AccelXoutH, 1),
            Channel::AccelZ => (Register::AccelXoutH, 2),
            Channel::GyroX => (Register::GyroXoutH, 0),
            Channel::GyroY => (Register::GyroXoutH, 1),
            Channel::GyroZ => (Register::GyroXoutH, 2),
        };
        self.read_axes(start)?;

        let raw = self.reading[index];
        let converted = match channel {
            Channel::AccelX | Channel::AccelY | Channel::AccelZ => {
                self.acc_range.convert(raw)
            },
            Channel::GyroX | Channel::GyroY | Channel::GyroZ => {
                conf::gyro_convert(raw)
            },
        };
        Ok((converted * 100.0) as i32)
    }

    /// Reads the WHO_AM_I register; should return `0x71`
    pub fn who_am_i(&mut self) -> Result<u8, Error<E>> {
        self.with_mpu(|bus| bus.read(Register::WhoAmI.addr()))
    }

    /// Reads one magnetometer sample through the bus bypass.
    ///
    /// Every call opens the bridge, checks data readiness and overflow,
    /// scales the sample by the calibration triple and, whatever the
    /// outcome, arms the next single-shot conversion.
    pub fn read_mag(&mut self) -> Result<Vec3<i16>, MagError<E>> {
        self.enable_bridge().map_err(MagError::BridgeEnable)?;

        self.bus
            .select(ak8963::I2C_ADDRESS)
            .map_err(MagError::StatusRead)?;
        let outcome = self.mag_sample();

        // Single measurement mode powers the AK8963 down after every
        // conversion; arm the next one no matter how this read went.
        let cntl1 = ak8963::cntl1_value(self.mag_resolution, self.mag_mode);
        let _ = self.bus.write(ak8963::Register::CNTL1.addr(), cntl1);
        self.bus.deselect();

        outcome
    }

    /// Reads the magnetometer WHO_AM_I register; should return
    /// [`MAG_DEVICE_ID`]
    pub fn mag_who_am_i(&mut self) -> Result<u8, Error<E>> {
        self.enable_bridge()?;
        self.bus.select(ak8963::I2C_ADDRESS)?;
        let res = self.bus.read(ak8963::Register::WIA.addr());
        self.bus.deselect();
        Ok(res?)
    }

    /// Loads the factory sensitivity triple from the magnetometer fuse ROM
    /// and uses it for subsequent reads.
    ///
    /// Optional: without it the identity calibration applies and raw
    /// samples pass through unscaled.
    pub fn read_mag_calibration<D>(&mut self,
                                   delay: &mut D)
                                   -> Result<MagCalibration, Error<E>>
        where D: DelayMs<u8>
    {
        self.enable_bridge()?;
        self.bus.select(ak8963::I2C_ADDRESS)?;
        let res = self.fuse_rom_read(delay);
        self.bus.deselect();
        let cal = res?;
        self.mag_cal = cal;
        Ok(cal)
    }

    /// Overrides the magnetometer calibration triple.
    pub fn set_mag_calibration(&mut self, cal: MagCalibration) {
        self.mag_cal = cal;
    }

    /// The calibration triple applied to magnetometer samples.
    pub fn mag_calibration(&self) -> MagCalibration {
        self.mag_cal
    }

    /// Destroys the driver, recovering the bus, the power pin and the
    /// platform hooks.
    pub fn release(self) -> (BUS, PWR, PLAT) {
        (self.bus, self.power, self.platform)
    }

    fn with_mpu<R, F>(&mut self, f: F) -> Result<R, Error<E>>
        where F: FnOnce(&mut BUS) -> Result<R, E>
    {
        self.bus.select(MPU_I2C_ADDR)?;
        let res = f(&mut self.bus);
        self.bus.deselect();
        Ok(res?)
    }

    /// Lowest power state: all axes in standby, clocks stopped.
    fn sleep(&mut self) -> Result<(), Error<E>> {
        self.with_mpu(|bus| {
                bus.write(Register::PwrMgmt2.addr(), ALL_AXES_STANDBY)?;
                bus.write(Register::PwrMgmt1.addr(), SLEEP)
            })
    }

    /// Exit low power mode: axes stay disabled, the cached range is
    /// restored and stale interrupt flags are cleared.
    fn wakeup(&mut self) -> Result<(), Error<E>> {
        let range_reg = self.acc_range.reg_value();
        self.applied = AxisSet::empty();
        self.with_mpu(|bus| {
                bus.write(Register::PwrMgmt1.addr(), WAKE_UP)?;
                bus.write(Register::PwrMgmt2.addr(), ALL_AXES_STANDBY)?;
                bus.write(Register::AccelConfig.addr(), range_reg)?;
                bus.read(Register::IntStatus.addr()).map(|_| ())
            })
    }

    /// Starts conversion on the requested axes, waking the device first if
    /// it was fully asleep.
    fn apply_axes<D>(&mut self, delay: &mut D) -> Result<(), Error<E>>
        where D: DelayMs<u8>
    {
        let axes = self.axes;
        if self.applied.is_empty() && !axes.is_empty() {
            self.wakeup()?;
        }
        self.applied = axes;
        if !axes.is_empty() {
            let standby = axes.standby_value();
            self.with_mpu(|bus| {
                    bus.write(Register::PwrMgmt2.addr(), standby)
                })?;
            delay.delay_ms(10);
        } else {
            self.sleep()?;
        }
        Ok(())
    }

    /// Polls `INT_STATUS` until a nonzero byte shows up or the tick budget
    /// runs out. Only bounds the wait: the burst read that follows is gated
    /// on the snapshot this loop last captured, ready bit or not.
    fn wait_data_ready(&mut self) {
        let t0 = self.platform.now();
        loop {
            if let Ok(status) = self.int_status() {
                if status != 0 {
                    break;
                }
            }
            if self.platform.now().wrapping_sub(t0) >= READING_WAIT_TIMEOUT {
                break;
            }
        }
    }

    fn int_status(&mut self) -> Result<u8, Error<E>> {
        let status =
            self.with_mpu(|bus| bus.read(Register::IntStatus.addr()))?;
        self.interrupt_status = status;
        Ok(status)
    }

    /// Burst read of the three axis words starting at `start`, big-endian
    /// on the wire.
    fn read_axes(&mut self, start: Register) -> Result<(), Error<E>> {
        // TODO: gate on a status byte read after the wait loop; this trusts
        // the snapshot taken before the loop's last exit, so a reading can
        // slip through on a ready bit that was already consumed.
        if self.interrupt_status & RAW_DATA_RDY == 0 {
            return Err(Error::NotReady);
        }

        let mut raw = [0; 6];
        self.bus.select(MPU_I2C_ADDR)?;
        let res = self.bus.read_many(start.addr(), &mut raw);
        self.bus.deselect();

        match res {
            Ok(()) => {
                for (word, bytes) in
                    self.reading.iter_mut().zip(raw.chunks(2))
                {
                    *word = i16::from_be_bytes([bytes[0], bytes[1]]);
                }
                Ok(())
            },
            Err(e) => {
                self.reading = [READING_ERROR; 3];
                Err(Error::Bus(e))
            },
        }
    }

    fn enable_bridge(&mut self) -> Result<(), E> {
        self.bus.select(MPU_I2C_ADDR)?;
        let res = self.bus
                      .write(Register::IntPinCfg.addr(),
                             BYPASS_EN | LATCH_INT_EN);
        self.bus.deselect();
        res
    }

    fn mag_sample(&mut self) -> Result<Vec3<i16>, MagError<E>> {
        let st1 = self.bus
                      .read(ak8963::Register::ST1.addr())
                      .map_err(MagError::StatusRead)?;
        if st1 & ak8963::DATA_READY == 0 {
            return Err(MagError::NotReady);
        }

        // 3 x 2 sample bytes plus ST2; ST2 must be read to close the
        // acquisition, and carries the overflow flag.
        let mut raw = [0; 7];
        self.bus
            .read_many(ak8963::Register::HXL.addr(), &mut raw)
            .map_err(MagError::DataRead)?;
        if raw[6] & ak8963::OVERFLOW != 0 {
            return Err(MagError::Overflow);
        }

        let sample = Vec3 { x: i16::from_le_bytes([raw[0], raw[1]]),
                            y: i16::from_le_bytes([raw[2], raw[3]]),
                            z: i16::from_le_bytes([raw[4], raw[5]]), };
        Ok(sample.scale(self.mag_cal))
    }

    fn fuse_rom_read<D>(&mut self, delay: &mut D) -> Result<MagCalibration, E>
        where D: DelayMs<u8>
    {
        self.bus
            .write(ak8963::Register::CNTL1.addr(), MagMode::FuseRom as u8)?;
        delay.delay_ms(10);

        let mut raw = [0; 3];
        self.bus.read_many(ak8963::Register::ASAX.addr(), &mut raw)?;

        // Leave fuse ROM access mode through a reset.
        self.bus.write(ak8963::Register::CNTL2.addr(), ak8963::RESET)?;

        Ok(MagCalibration::from_fuse_rom(raw))
    }
}
