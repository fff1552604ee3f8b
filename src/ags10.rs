// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use crate::crc::{crc8, verify_frame};
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::{debug, warn};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default 7-bit I2C address of the AGS10.
pub const AGS10_I2CADDR_DEFAULT: u8 = 0x1A;

/// Minimum time between two acquisitions of the same buffer. The datasheet
/// asks for 1.5 s.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(2);

const REG_CALIBRATION: u8 = 0x01;
const REG_VERSION: u8 = 0x11;
const REG_RESISTANCE: u8 = 0x20;
const REG_ADDRESS: u8 = 0x21;

const FACTORY_RESET_FRAME: [u8; 5] = [0x00, 0x0C, 0xFF, 0xFF, 0x81];

///
///AGS10 error enum. Transport wraps whatever the
///bus reported, Validation is a crc 8 mismatch on a
///received frame and CalibrationOutOfRange rejects
///a zero point that does not fit the 16 bit register
///
#[derive(Debug, Error)]
pub enum Ags10Error<E> {
    /// The bus transaction failed (NACK, timeout, bus not ready...)
    #[error("bus transaction failed: {0}")]
    Transport(#[source] E),
    /// The checksum sent by the sensor does not match the calculated one
    #[error("crc mismatch: sensor sent {expected:#04x}, calculated {calculated:#04x}")]
    Validation { expected: u8, calculated: u8 },
    /// `kohm / 0.1` is not representable as an unsigned 16 bit value
    #[error("zero point {0} kohm is outside the calibration range")]
    CalibrationOutOfRange(f64),
}

/// Byte level access to an I2C bus.
///
/// Buffers are filled completely or the call fails.
pub trait BusTransport {
    type Error: std::error::Error + 'static;

    /// Sequential read from the device's current read pointer.
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Read starting at `register`.
    fn read_register(&mut self, address: u8, register: u8, buf: &mut [u8])
        -> Result<(), Self::Error>;

    /// Write `bytes` starting at `register`.
    fn write_register(&mut self, address: u8, register: u8, bytes: &[u8])
        -> Result<(), Self::Error>;
}

impl BusTransport for LinuxI2CDevice {
    type Error = LinuxI2CError;

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), LinuxI2CError> {
        self.set_slave_address(u16::from(address))?;
        I2CDevice::read(self, buf)
    }

    fn read_register(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), LinuxI2CError> {
        self.set_slave_address(u16::from(address))?;
        I2CDevice::write(self, &[register])?;
        I2CDevice::read(self, buf)
    }

    fn write_register(
        &mut self,
        address: u8,
        register: u8,
        bytes: &[u8],
    ) -> Result<(), LinuxI2CError> {
        self.set_slave_address(u16::from(address))?;
        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(register);
        frame.extend_from_slice(bytes);
        I2CDevice::write(self, &frame)
    }
}

/// Monotonic time source used by the staleness cache.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

/// `Clock` backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A 5-byte frame together with the time of its last successful read.
/// `read_at` is `None` until the first read.
#[derive(Debug, Default)]
struct CachedFrame {
    bytes: [u8; 5],
    read_at: Option<Duration>,
}

impl CachedFrame {
    fn is_stale(&self, now: Duration) -> bool {
        match self.read_at {
            None => true,
            Some(at) => now.saturating_sub(at) >= REFRESH_INTERVAL,
        }
    }
}

/// AGS10 Struct, wraps a bus transport
/// and has implemented related AGS10 operations
///
/// Status and VOC share one cached frame, resistance has its own; each is
/// re-read from the sensor at most once every [`REFRESH_INTERVAL`].
pub struct Ags10<T: BusTransport, C: Clock = MonotonicClock> {
    transport: T,
    clock: C,
    address: u8,
    validate: bool,
    data: CachedFrame,
    resistance: CachedFrame,
    created_at: Duration,
}

impl Ags10<LinuxI2CDevice> {
    /// Open the AGS10 on a Linux i2c-dev node (e.g. `/dev/i2c-1`)
    /// at the default address 0x1A.
    /// If fails, return an LinuxI2CError from i2cdev
    ///
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LinuxI2CError> {
        Self::open_with_address(path, AGS10_I2CADDR_DEFAULT)
    }

    /// Same as [`Ags10::open`] for a sensor at a non default address.
    pub fn open_with_address<P: AsRef<Path>>(
        path: P,
        address: u8,
    ) -> Result<Self, LinuxI2CError> {
        let device = LinuxI2CDevice::new(path, u16::from(address))?;
        Ok(Self::with_address(device, address))
    }
}

impl<T: BusTransport> Ags10<T> {
    /// Create a driver for a sensor at the default address 0x1A.
    /// CRC validation starts disabled.
    pub fn new(transport: T) -> Self {
        Self::with_address(transport, AGS10_I2CADDR_DEFAULT)
    }

    pub fn with_address(transport: T, address: u8) -> Self {
        Self::with_clock(transport, address, MonotonicClock::new())
    }
}

impl<T: BusTransport, C: Clock> Ags10<T, C> {
    /// Create a driver with an explicit time source.
    pub fn with_clock(transport: T, address: u8, clock: C) -> Self {
        let created_at = clock.now();
        Ags10 {
            transport,
            clock,
            address,
            validate: false,
            data: CachedFrame::default(),
            resistance: CachedFrame::default(),
            created_at,
        }
    }

    /// The address transactions are sent to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Time since the driver was created.
    pub fn uptime(&self) -> Duration {
        self.clock.now().saturating_sub(self.created_at)
    }

    /// Gives back the transport, e.g. to build a new driver after
    /// [`Ags10::update_address`].
    pub fn release(self) -> T {
        self.transport
    }

    /// Status byte, see the datasheet for the meaning of each bit.
    pub fn status(&mut self) -> Result<u8, Ags10Error<T::Error>> {
        self.refresh_data()?;
        Ok(self.data.bytes[0])
    }

    /// True when the sensor reports a completed acquisition (RDY bit clear).
    pub fn is_ready(&mut self) -> Result<bool, Ags10Error<T::Error>> {
        Ok(self.status()? & 0x01 == 0)
    }

    /// TVOC concentration in ppb.
    /// If CRC checking is enabled, a corrupted frame returns
    /// `Ags10Error::Validation` instead of a value.
    pub fn total_volatile_organic_compounds_ppb(&mut self) -> Result<u32, Ags10Error<T::Error>> {
        self.refresh_data()?;
        let frame = self.data.bytes;
        self.validate_frame(&frame)?;
        Ok(u32::from_be_bytes([0, frame[1], frame[2], frame[3]]))
    }

    /// Resistance of the sensing element in kohm (0.1 kohm per LSB).
    pub fn resistance_kohm(&mut self) -> Result<f64, Ags10Error<T::Error>> {
        self.refresh_resistance()?;
        let frame = self.resistance.bytes;
        self.validate_frame(&frame)?;
        let raw = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
        Ok(f64::from(raw) * 0.1)
    }

    /// Firmware version. Always read from the sensor, never cached.
    pub fn version(&mut self) -> Result<u8, Ags10Error<T::Error>> {
        let mut buf = [0u8; 5];
        self.transport
            .read_register(self.address, REG_VERSION, &mut buf)
            .map_err(Ags10Error::Transport)?;
        Ok(buf[3])
    }

    pub fn check_crc(&self) -> bool {
        self.validate
    }

    pub fn set_check_crc(&mut self, enabled: bool) {
        self.validate = enabled;
    }

    /// Sets the zero point resistance in kohm.
    /// The value is sent in 0.1 kohm steps, so `kohm / 0.1` must fit a u16;
    /// otherwise nothing is written and `CalibrationOutOfRange` is returned.
    pub fn zero_point_calibrate(&mut self, kohm: f64) -> Result<(), Ags10Error<T::Error>> {
        let steps = (kohm / 0.1).trunc();
        if !(0.0..=f64::from(u16::MAX)).contains(&steps) {
            return Err(Ags10Error::CalibrationOutOfRange(kohm));
        }
        let [hi, lo] = (steps as u16).to_be_bytes();
        let payload = [0x00, 0x0C, hi, lo];
        self.write_frame(REG_CALIBRATION, payload)
    }

    /// Restores the factory zero point.
    pub fn zero_point_factory_reset(&mut self) -> Result<(), Ags10Error<T::Error>> {
        debug!("ags10 {:#04x}: zero point factory reset", self.address);
        self.transport
            .write_register(self.address, REG_CALIBRATION, &FACTORY_RESET_FRAME)
            .map_err(Ags10Error::Transport)
    }

    /// Reprograms the sensor's I2C address. The change is permanent and
    /// this driver keeps talking to the old address; rebuild it with
    /// [`Ags10::release`] to reach the sensor afterwards.
    pub fn update_address(&mut self, new_addr: u8) -> Result<(), Ags10Error<T::Error>> {
        let inv = !new_addr;
        self.write_frame(REG_ADDRESS, [new_addr, inv, new_addr, inv])
    }

    fn write_frame(&mut self, register: u8, payload: [u8; 4]) -> Result<(), Ags10Error<T::Error>> {
        let crc = crc8(&payload);
        let frame = [payload[0], payload[1], payload[2], payload[3], crc];
        debug!(
            "ags10 {:#04x}: write {:#04x} <- {:02x?}",
            self.address, register, frame
        );
        self.transport
            .write_register(self.address, register, &frame)
            .map_err(Ags10Error::Transport)
    }

    fn validate_frame(&self, frame: &[u8; 5]) -> Result<(), Ags10Error<T::Error>> {
        if !self.validate {
            return Ok(());
        }
        verify_frame(frame).map_err(|(expected, calculated)| {
            warn!(
                "ags10 {:#04x}: crc mismatch in {:02x?} (calculated {:#04x})",
                self.address, frame, calculated
            );
            Ags10Error::Validation {
                expected,
                calculated,
            }
        })
    }

    fn refresh_data(&mut self) -> Result<(), Ags10Error<T::Error>> {
        let now = self.clock.now();
        if !self.data.is_stale(now) {
            return Ok(());
        }
        let mut buf = [0u8; 5];
        self.transport
            .read(self.address, &mut buf)
            .map_err(Ags10Error::Transport)?;
        debug!("ags10 {:#04x}: data frame {:02x?}", self.address, buf);
        self.data.bytes = buf;
        self.data.read_at = Some(self.clock.now());
        Ok(())
    }

    fn refresh_resistance(&mut self) -> Result<(), Ags10Error<T::Error>> {
        let now = self.clock.now();
        if !self.resistance.is_stale(now) {
            return Ok(());
        }
        let mut buf = [0u8; 5];
        self.transport
            .read_register(self.address, REG_RESISTANCE, &mut buf)
            .map_err(Ags10Error::Transport)?;
        debug!("ags10 {:#04x}: resistance frame {:02x?}", self.address, buf);
        self.resistance.bytes = buf;
        self.resistance.read_at = Some(self.clock.now());
        Ok(())
    }
}
