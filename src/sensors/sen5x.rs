//! Sensirion SEN5x environmental sensor node driver (I2C).
//!
//! Generic over any `embedded-hal` 1.0 I2C bus and delay provider, so the
//! same driver runs on the ESP-IDF `I2cDriver` and on host-side fakes.
//!
//! ## Wire format
//!
//! Every command is a 16-bit big-endian word. Responses are sequences of
//! 16-bit words, each followed by a CRC-8 byte (poly 0x31, init 0xFF).
//! The sensor needs an execution delay between the command write and the
//! response read.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use log::{debug, info, warn};

use super::RawValues;
use crate::app::ports::SensorTransport;
use crate::error::SensorError;

/// Default 7-bit I2C address.
pub const DEFAULT_ADDRESS: u8 = 0x69;

/// Measured-values block length in words.
pub const MEASURED_WORDS: usize = 8;

const SERIAL_WORDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
enum Command {
    StartMeasurement = 0x0021,
    StopMeasurement = 0x0104,
    ReadDataReady = 0x0202,
    ReadMeasuredValues = 0x03C4,
    ReadSerialNumber = 0xD033,
    DeviceReset = 0xD304,
}

impl Command {
    /// Execution time before a response (or the next command) is allowed.
    const fn exec_ms(self) -> u32 {
        match self {
            Self::StartMeasurement => 50,
            Self::StopMeasurement | Self::DeviceReset => 200,
            Self::ReadDataReady | Self::ReadMeasuredValues | Self::ReadSerialNumber => 20,
        }
    }

    const fn bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

// ---------------------------------------------------------------------------
// CRC + framing
// ---------------------------------------------------------------------------

/// Sensirion CRC-8 over one data word.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Decode a `[hi, lo, crc]*` response into `out`.
///
/// `buf` must hold exactly `out.len() * 3` bytes.
pub fn decode_words(buf: &[u8], out: &mut [u16]) -> Result<(), SensorError> {
    if buf.len() != out.len() * 3 {
        return Err(SensorError::ReadFailed);
    }
    for (chunk, word) in buf.chunks_exact(3).zip(out.iter_mut()) {
        if crc8(&chunk[..2]) != chunk[2] {
            return Err(SensorError::Crc);
        }
        *word = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(())
}

/// Map a decoded measured-values block onto [`RawValues`].
pub fn raw_from_words(words: &[u16; MEASURED_WORDS]) -> RawValues {
    RawValues {
        pm1_0: words[0],
        pm2_5: words[1],
        pm4_0: words[2],
        pm10: words[3],
        humidity: words[4] as i16,
        temperature: words[5] as i16,
        voc_index: words[6] as i16,
        nox_index: words[7] as i16,
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct Sen5x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Sen5x<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
        }
    }

    /// Release the bus and delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn send(&mut self, cmd: Command) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &cmd.bytes())
            .map_err(|e| {
                debug!("SEN5x: write {:?} failed: {:?}", cmd, e.kind());
                SensorError::I2c
            })?;
        self.delay.delay_ms(cmd.exec_ms());
        Ok(())
    }

    fn query(&mut self, cmd: Command, out: &mut [u16]) -> Result<(), SensorError> {
        self.send(cmd)?;
        let mut buf = [0u8; SERIAL_WORDS * 3];
        let buf = &mut buf[..out.len() * 3];
        self.i2c.read(self.address, buf).map_err(|e| {
            debug!("SEN5x: read {:?} failed: {:?}", cmd, e.kind());
            SensorError::I2c
        })?;
        decode_words(buf, out)
    }

    /// Stop measuring and return to idle mode.
    pub fn stop_measurement(&mut self) -> Result<(), SensorError> {
        self.send(Command::StopMeasurement)
    }

    /// Soft-reset the sensor (same effect as a power cycle).
    pub fn device_reset(&mut self) -> Result<(), SensorError> {
        self.send(Command::DeviceReset)
    }

    /// Read the 32-character ASCII serial number.
    pub fn serial_number(&mut self) -> Result<heapless::String<32>, SensorError> {
        let mut words = [0u16; SERIAL_WORDS];
        self.query(Command::ReadSerialNumber, &mut words)?;
        let mut serial = heapless::String::new();
        for byte in words.iter().flat_map(|w| w.to_be_bytes()) {
            if byte == 0 {
                break;
            }
            // 32 bytes always fit the 32-char capacity.
            let _ = serial.push(char::from(byte));
        }
        Ok(serial)
    }
}

impl<I2C: I2c, D: DelayNs> SensorTransport for Sen5x<I2C, D> {
    fn start_measurement(&mut self) -> Result<(), SensorError> {
        self.send(Command::StartMeasurement).map_err(|e| {
            warn!("SEN5x: start measurement failed ({})", e);
            SensorError::StartFailed
        })?;
        info!("SEN5x: measurement started (addr=0x{:02X})", self.address);
        Ok(())
    }

    fn data_ready(&mut self) -> Result<bool, SensorError> {
        let mut word = [0u16; 1];
        self.query(Command::ReadDataReady, &mut word).map_err(|e| {
            debug!("SEN5x: data-ready: {}", e);
            SensorError::DataReadyFailed
        })?;
        Ok(word[0] & 0x00FF != 0)
    }

    fn read_values(&mut self) -> Result<RawValues, SensorError> {
        let mut words = [0u16; MEASURED_WORDS];
        self.query(Command::ReadMeasuredValues, &mut words)
            .map_err(|e| {
                debug!("SEN5x: measured values: {}", e);
                SensorError::ReadFailed
            })?;
        Ok(raw_from_words(&words))
    }
}
