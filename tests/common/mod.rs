//! Shared mock bus, pin and platform implementations for the driver tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;
use mpu9250_sensor::{AxisSet, Config, Configure, Event, Mpu9250Sensor,
                     Platform, SensorBus, State};

pub const MPU_ADDR: u8 = 0x68;
pub const MAG_ADDR: u8 = 0x0c;

pub const INT_STATUS: u8 = 0x3a;
pub const ACCEL_XOUT_H: u8 = 0x3b;
pub const GYRO_XOUT_H: u8 = 0x43;
pub const ACCEL_CONFIG: u8 = 0x1c;
pub const INT_PIN_CFG: u8 = 0x37;
pub const PWR_MGMT_1: u8 = 0x6b;
pub const PWR_MGMT_2: u8 = 0x6c;

pub const MAG_ST1: u8 = 0x02;
pub const MAG_HXL: u8 = 0x03;
pub const MAG_ST2: u8 = 0x09;
pub const MAG_CNTL1: u8 = 0x0a;
pub const MAG_CNTL2: u8 = 0x0b;
pub const MAG_ASAX: u8 = 0x10;

/// Error type returned by the mock bus when a fault is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// Simulated register file shared between a test and the driver under test.
#[derive(Default)]
pub struct BusState {
    /// (device address, register) -> value
    pub registers: HashMap<(u8, u8), u8>,
    /// Log of single-register writes, in order.
    pub writes: Vec<(u8, u8, u8)>,
    /// Log of read start registers, in order.
    pub reads: Vec<(u8, u8)>,
    /// Fail the next writes to this (address, register).
    pub fail_write: Option<(u8, u8)>,
    /// Fail the next reads starting at this (address, register).
    pub fail_read: Option<(u8, u8)>,
    /// How many times `busy()` reports an in-flight transaction.
    pub busy_polls: u32,
    selected: Option<u8>,
}

impl BusState {
    pub fn set_reg(&mut self, addr: u8, reg: u8, val: u8) {
        self.registers.insert((addr, reg), val);
    }

    /// Stores a 16-bit word big-endian (MPU axis output layout).
    pub fn set_word_be(&mut self, addr: u8, reg: u8, val: i16) {
        let bytes = val.to_be_bytes();
        self.set_reg(addr, reg, bytes[0]);
        self.set_reg(addr, reg + 1, bytes[1]);
    }

    /// Stores a 16-bit word little-endian (AK8963 sample layout).
    pub fn set_word_le(&mut self, addr: u8, reg: u8, val: i16) {
        let bytes = val.to_le_bytes();
        self.set_reg(addr, reg, bytes[0]);
        self.set_reg(addr, reg + 1, bytes[1]);
    }

    /// Values written to one register, in order.
    pub fn writes_to(&self, addr: u8, reg: u8) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(a, r, _)| *a == addr && *r == reg)
            .map(|(_, _, v)| *v)
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.reads.clear();
    }
}

#[derive(Clone, Default)]
pub struct MockBus {
    pub state: Rc<RefCell<BusState>>,
}

impl SensorBus for MockBus {
    type Error = BusFault;

    fn select(&mut self, addr: u8) -> Result<(), BusFault> {
        self.state.borrow_mut().selected = Some(addr);
        Ok(())
    }

    fn deselect(&mut self) {
        self.state.borrow_mut().selected = None;
    }

    fn read_many(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), BusFault> {
        let mut st = self.state.borrow_mut();
        let addr = st.selected.expect("read without select");
        st.reads.push((addr, reg));
        if st.fail_read == Some((addr, reg)) {
            return Err(BusFault);
        }
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = *st.registers.get(&(addr, reg + i as u8)).unwrap_or(&0);
        }
        Ok(())
    }

    fn write(&mut self, reg: u8, val: u8) -> Result<(), BusFault> {
        let mut st = self.state.borrow_mut();
        let addr = st.selected.expect("write without select");
        if st.fail_write == Some((addr, reg)) {
            return Err(BusFault);
        }
        st.writes.push((addr, reg, val));
        st.registers.insert((addr, reg), val);
        Ok(())
    }

    fn busy(&self) -> bool {
        let mut st = self.state.borrow_mut();
        if st.busy_polls > 0 {
            st.busy_polls -= 1;
            true
        } else {
            false
        }
    }
}

/// Power rail pin; the level is observable from the test.
#[derive(Clone, Default)]
pub struct MockPin {
    pub level: Rc<Cell<bool>>,
}

impl OutputPin for MockPin {
    type Error = core::convert::Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        Ok(())
    }
}

/// Everything the driver asked of the host environment.
#[derive(Default)]
pub struct PlatformState {
    pub scheduled: Vec<u32>,
    pub cancels: u32,
    pub notifies: u32,
    pub pins_setup: u32,
    pub ticks: u32,
}

/// Mock platform: the tick clock advances by one on every `now()` call so
/// bounded polls terminate without real delays.
#[derive(Clone, Default)]
pub struct MockPlatform {
    pub state: Rc<RefCell<PlatformState>>,
}

impl Platform for MockPlatform {
    fn setup_pins(&mut self) {
        self.state.borrow_mut().pins_setup += 1;
    }

    fn now(&self) -> u32 {
        let mut st = self.state.borrow_mut();
        st.ticks += 1;
        st.ticks
    }

    fn schedule(&mut self, ticks: u32) {
        self.state.borrow_mut().scheduled.push(ticks);
    }

    fn cancel(&mut self) {
        self.state.borrow_mut().cancels += 1;
    }

    fn notify_changed(&mut self) {
        self.state.borrow_mut().notifies += 1;
    }
}

pub struct MockDelay;

impl DelayMs<u8> for MockDelay {
    fn delay_ms(&mut self, _ms: u8) {}
}

pub type Driver = Mpu9250Sensor<MockBus, MockPin, MockPlatform>;

pub struct Harness {
    pub bus: Rc<RefCell<BusState>>,
    pub power: Rc<Cell<bool>>,
    pub platform: Rc<RefCell<PlatformState>>,
}

/// Runs the full enable sequence: hardware init, activation, both deferred
/// boot stages.
pub fn boot(driver: &mut Driver, axes: AxisSet) {
    driver.configure(Configure::HardwareInit).unwrap();
    driver.configure(Configure::SetActive(axes)).unwrap();
    driver.advance(Event::BootElapsed, &mut MockDelay).unwrap();
    let state = driver.advance(Event::StartupElapsed, &mut MockDelay).unwrap();
    assert_eq!(state, State::Enabled);
}

/// Builds a driver over fresh mocks, returning the shared handles.
pub fn new_driver(config: &mut Config) -> (Driver, Harness) {
    let bus = MockBus::default();
    let pin = MockPin::default();
    let platform = MockPlatform::default();
    let harness = Harness { bus: bus.state.clone(),
                            power: pin.level.clone(),
                            platform: platform.state.clone() };
    (Mpu9250Sensor::new(bus, pin, platform, config), harness)
}
