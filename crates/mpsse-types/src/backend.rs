//! Hardware channel contract.
//!
//! The shell never talks to a USB transceiver directly. Every bus
//! transaction goes through an [`I2cChannel`] obtained from a
//! [`ChannelProvider`]. The shapes here follow the vendor I2C driver:
//! a channel is opened by index, initialized with a clock rate and latency
//! timer, and every transfer reports a [`Status`] plus the number of bytes
//! actually moved.

use std::fmt;

use bitflags::bitflags;
use serde::Deserialize;

use crate::error::Result;

/// Driver status code for a channel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Ok,
    InvalidHandle,
    DeviceNotFound,
    DeviceNotOpened,
    IoError,
    InsufficientResources,
    InvalidParameter,
    InvalidBaudRate,
    OtherError,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "Ok",
            Self::InvalidHandle => "InvalidHandle",
            Self::DeviceNotFound => "DeviceNotFound",
            Self::DeviceNotOpened => "DeviceNotOpened",
            Self::IoError => "IoError",
            Self::InsufficientResources => "InsufficientResources",
            Self::InvalidParameter => "InvalidParameter",
            Self::InvalidBaudRate => "InvalidBaudRate",
            Self::OtherError => "OtherError",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Framing options for a single I2C transfer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TransferOptions: u32 {
        /// Emit a start condition before the transfer.
        const START_BIT           = 0x01;
        /// Emit a stop condition after the transfer.
        const STOP_BIT            = 0x02;
        /// Abort a write as soon as the device NACKs a byte.
        const BREAK_ON_NACK       = 0x04;
        /// NACK the last byte of a read so the device releases the bus.
        const NACK_LAST_BYTE      = 0x08;
        const FAST_TRANSFER_BYTES = 0x10;
        const FAST_TRANSFER_BITS  = 0x20;
        /// Skip the address phase.
        const NO_ADDRESS          = 0x40;
    }
}

impl TransferOptions {
    /// Options used for plain writes and the address phase of register reads.
    pub const WRITE: Self = Self::START_BIT.union(Self::STOP_BIT);

    /// Options used for the data phase of reads.
    pub const READ: Self = Self::START_BIT
        .union(Self::STOP_BIT)
        .union(Self::NACK_LAST_BYTE);
}

/// I2C bus clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockRate {
    /// 100 kHz.
    Standard,
    /// 400 kHz.
    #[default]
    Fast,
    /// 1 MHz.
    FastPlus,
    /// 3.4 MHz.
    HighSpeed,
}

impl ClockRate {
    pub fn hz(self) -> u32 {
        match self {
            Self::Standard => 100_000,
            Self::Fast => 400_000,
            Self::FastPlus => 1_000_000,
            Self::HighSpeed => 3_400_000,
        }
    }
}

/// Settings applied when a channel is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub clock_rate: ClockRate,
    /// USB latency timer in milliseconds.
    pub latency_timer_ms: u8,
    /// Driver-specific option bits, passed through untouched.
    pub options: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            clock_rate: ClockRate::Fast,
            latency_timer_ms: 5,
            options: 0,
        }
    }
}

/// Outcome of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub status: Status,
    /// Bytes actually moved on the bus.
    pub transferred: usize,
}

impl Transfer {
    pub fn ok(transferred: usize) -> Self {
        Self {
            status: Status::Ok,
            transferred,
        }
    }

    pub fn failed(status: Status) -> Self {
        Self {
            status,
            transferred: 0,
        }
    }
}

/// An open I2C channel.
pub trait I2cChannel {
    /// Configure clock and latency. Must succeed before any transfer.
    fn initialize(&mut self, config: &ChannelConfig) -> Status;

    /// Read `buf.len()` bytes from `device`.
    fn read(&mut self, device: u8, buf: &mut [u8], options: TransferOptions) -> Transfer;

    /// Write `data` to `device`.
    fn write(&mut self, device: u8, data: &[u8], options: TransferOptions) -> Transfer;

    /// Write `register` then read `buf.len()` bytes without releasing the bus.
    fn read_register(
        &mut self,
        device: u8,
        register: u8,
        buf: &mut [u8],
        write_options: TransferOptions,
        read_options: TransferOptions,
    ) -> Transfer;

    /// Release the channel.
    fn close(&mut self);
}

/// Source of hardware channels.
pub trait ChannelProvider {
    /// Number of MPSSE channels currently attached.
    fn channel_count(&self) -> Result<u32>;

    /// Open the channel at `index`.
    fn open(&self, index: u32) -> Result<Box<dyn I2cChannel>>;
}
