//! Bus transport abstraction.
//!
//! The two on-package sub-devices (main IMU at `0x68`, magnetometer at
//! `0x0c`) share one two-wire bus; every register transaction is bracketed
//! by an address select and a deselect. Register addresses are raw bytes
//! because the two devices have disjoint register maps.

use embedded_hal::blocking::i2c;

/// A shared-bus transport the driver runs its register protocol on.
pub trait SensorBus {
    /// The type of error for all results
    type Error;

    /// Selects the sub-device at the given 7-bit address for the
    /// transactions that follow.
    fn select(&mut self, addr: u8) -> Result<(), Self::Error>;

    /// Releases the bus after a bracket of transactions.
    fn deselect(&mut self);

    /// Burst read of `buffer.len()` consecutive registers starting at `reg`.
    fn read_many(&mut self,
                 reg: u8,
                 buffer: &mut [u8])
                 -> Result<(), Self::Error>;

    /// Write the provided value to register
    fn write(&mut self, reg: u8, val: u8) -> Result<(), Self::Error>;

    /// Read a single value from the register
    fn read(&mut self, reg: u8) -> Result<u8, Self::Error> {
        let mut buffer = [0; 1];
        self.read_many(reg, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Whether a bus transaction is still in flight.
    ///
    /// Only consulted during shutdown; transports without a hardware busy
    /// flag can keep the default.
    fn busy(&self) -> bool {
        false
    }
}

/// An I2C bus. Use I2cBus when the MPU9250 is connected via I2C.
pub struct I2cBus<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<E, I2C> I2cBus<I2C>
    where I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>
{
    /// Create a new I2C bus transport
    pub fn new(i2c: I2C) -> Self {
        I2cBus { i2c,
                 addr: 0 }
    }

    /// Destroys the transport, recovering the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<E, I2C> SensorBus for I2cBus<I2C>
    where I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>
{
    type Error = E;

    fn select(&mut self, addr: u8) -> Result<(), Self::Error> {
        self.addr = addr;
        Ok(())
    }

    fn deselect(&mut self) {}

    fn read_many(&mut self,
                 reg: u8,
                 buffer: &mut [u8])
                 -> Result<(), Self::Error> {
        self.i2c.write_read(self.addr, &[reg], buffer)?;
        Ok(())
    }

    fn write(&mut self, reg: u8, val: u8) -> Result<(), Self::Error> {
        let buff: [u8; 2] = [reg, val];
        self.i2c.write(self.addr, &buff)?;
        Ok(())
    }
}
