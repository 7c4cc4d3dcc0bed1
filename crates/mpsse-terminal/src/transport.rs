//! Bus transactions on behalf of shell commands.
//!
//! [`Transport`] owns the open channel and a fixed transfer buffer. Every
//! operation checks the command's [`CancelToken`] immediately before the
//! channel call and turns a non-`Ok` driver status into
//! [`ShellError::Transport`].

use std::ops::Range;

use mpsse_types::backend::{ChannelConfig, ChannelProvider, I2cChannel, Status, TransferOptions};
use mpsse_types::error::{Result, ShellError};

use crate::cancel::CancelToken;

/// Largest single transfer, in bytes.
pub const TRANSFER_BUFFER_SIZE: usize = 256;

/// Default scan range: every 7-bit address.
pub const DEFAULT_SCAN_RANGE: Range<u8> = 0..128;

/// Progress reported while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// A device acknowledged its address.
    Found(u8),
    /// Probing an address failed with something other than "not found".
    Error(u8, Status),
}

/// The shell's handle on the hardware channel.
pub struct Transport {
    channel: Box<dyn I2cChannel>,
    buffer: Vec<u8>,
    write_options: TransferOptions,
    read_options: TransferOptions,
}

impl Transport {
    /// Wrap an already initialized channel.
    pub fn new(channel: Box<dyn I2cChannel>) -> Self {
        Self {
            channel,
            buffer: vec![0; TRANSFER_BUFFER_SIZE],
            write_options: TransferOptions::WRITE,
            read_options: TransferOptions::READ,
        }
    }

    /// Open and initialize channel `index` of `provider`.
    pub fn open(
        provider: &dyn ChannelProvider,
        index: u32,
        config: &ChannelConfig,
    ) -> Result<Self> {
        let count = provider.channel_count()?;
        if count == 0 {
            return Err(ShellError::Startup("No channels detected".to_string()));
        }
        log::debug!("{count} channel(s) detected");

        let mut channel = provider.open(index)?;
        let status = channel.initialize(config);
        if !status.is_ok() {
            channel.close();
            return Err(ShellError::Startup(format!("Error Initialize: {status}")));
        }
        log::info!(
            "Initialized channel {index} ({} Hz)",
            config.clock_rate.hz()
        );
        Ok(Self::new(channel))
    }

    fn checked_len(requested: usize) -> Result<usize> {
        if requested > TRANSFER_BUFFER_SIZE {
            return Err(ShellError::TransferTooLarge {
                requested,
                capacity: TRANSFER_BUFFER_SIZE,
            });
        }
        Ok(requested)
    }

    /// Read `count` bytes from `device` without addressing a register.
    pub fn read(&mut self, device: u8, count: usize, cancel: &CancelToken) -> Result<&[u8]> {
        let len = Self::checked_len(count)?;
        cancel.check()?;
        log::debug!("read dev={device:#04x} len={len}");
        let t = self.channel.read(
            device,
            &mut self.buffer[..len],
            self.read_options | TransferOptions::NO_ADDRESS,
        );
        if !t.status.is_ok() {
            return Err(ShellError::Transport(t.status));
        }
        Ok(&self.buffer[..t.transferred.min(len)])
    }

    /// Read `count` bytes starting at `register` of `device`.
    pub fn read_register(
        &mut self,
        device: u8,
        register: u8,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<&[u8]> {
        let len = Self::checked_len(count)?;
        cancel.check()?;
        log::debug!("read dev={device:#04x} reg={register:#04x} len={len}");
        let t = self.channel.read_register(
            device,
            register,
            &mut self.buffer[..len],
            self.write_options,
            self.read_options,
        );
        if !t.status.is_ok() {
            return Err(ShellError::Transport(t.status));
        }
        Ok(&self.buffer[..t.transferred.min(len)])
    }

    /// Write `data` to `device`, returning the number of bytes sent.
    pub fn write(&mut self, device: u8, data: &[u8], cancel: &CancelToken) -> Result<usize> {
        let len = Self::checked_len(data.len())?;
        self.buffer[..len].copy_from_slice(data);
        cancel.check()?;
        log::debug!("write dev={device:#04x} len={len}");
        let t = self
            .channel
            .write(device, &self.buffer[..len], self.write_options);
        if !t.status.is_ok() {
            return Err(ShellError::Transport(t.status));
        }
        Ok(t.transferred)
    }

    /// Whether `device` acknowledges a zero-length register read.
    pub fn probe(&mut self, device: u8, cancel: &CancelToken) -> Result<bool> {
        match self.read_register(device, 0, 0, cancel) {
            Ok(_) => Ok(true),
            Err(ShellError::Transport(Status::DeviceNotFound)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Probe every address in `range`, reporting hits and failures as they
    /// happen. Failures other than "not found" do not stop the scan;
    /// cancellation does.
    pub fn scan<F>(
        &mut self,
        range: Range<u8>,
        cancel: &CancelToken,
        mut on_event: F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(ScanEvent) -> Result<()>,
    {
        let mut found = Vec::new();
        for device in range {
            match self.probe(device, cancel) {
                Ok(true) => {
                    found.push(device);
                    on_event(ScanEvent::Found(device))?;
                },
                Ok(false) => {},
                Err(ShellError::Transport(status)) => {
                    on_event(ScanEvent::Error(device, status))?;
                },
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// Close the channel. Consumes the transport so this happens once.
    pub fn close(mut self) {
        log::info!("Closing channel");
        self.channel.close();
    }
}
