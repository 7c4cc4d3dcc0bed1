//! In-memory I2C bus.
//!
//! Each device is a 256-byte register file with an auto-incrementing
//! register pointer, the layout used by most EEPROMs and sensors: the first
//! byte of a write selects the register, further bytes are stored at
//! successive registers, and reads stream out from the pointer.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use mpsse_types::backend::{
    ChannelConfig, ChannelProvider, I2cChannel, Status, Transfer, TransferOptions,
};
use mpsse_types::config::SimulatorConfig;
use mpsse_types::error::{Result, ShellError};

const REGISTER_COUNT: usize = 256;

/// A transaction observed on the simulated bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Read {
        device: u8,
        len: usize,
        options: TransferOptions,
    },
    Write {
        device: u8,
        data: Vec<u8>,
        options: TransferOptions,
    },
    ReadRegister {
        device: u8,
        register: u8,
        len: usize,
        write_options: TransferOptions,
        read_options: TransferOptions,
    },
}

#[derive(Debug, Clone)]
struct Device {
    registers: [u8; REGISTER_COUNT],
    pointer: u8,
    fault: Option<Status>,
}

impl Device {
    fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            pointer: 0,
            fault: None,
        }
    }

    fn stream_out(&mut self, buf: &mut [u8]) {
        for slot in buf.iter_mut() {
            *slot = self.registers[usize::from(self.pointer)];
            self.pointer = self.pointer.wrapping_add(1);
        }
    }
}

#[derive(Debug, Default)]
struct BusState {
    devices: BTreeMap<u8, Device>,
    log: Vec<BusOp>,
    closes: usize,
}

/// A simulated MPSSE adapter with one I2C bus.
///
/// Clones share the same bus, so a test can keep a handle while the shell
/// owns the channel.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    state: Rc<RefCell<BusState>>,
    channel_count: u32,
}

impl SimulatedBus {
    /// An empty bus on a single-channel adapter.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState::default())),
            channel_count: 1,
        }
    }

    /// Build a bus from the `[simulator]` config section.
    pub fn from_config(config: &SimulatorConfig) -> Self {
        let bus = Self::new();
        for dev in &config.devices {
            bus.add_device(dev.address, &dev.registers);
            if let Some(status) = dev.fault {
                bus.set_fault(dev.address, Some(status));
            }
        }
        bus
    }

    /// Pretend the adapter exposes `count` channels.
    pub fn with_channel_count(mut self, count: u32) -> Self {
        self.channel_count = count;
        self
    }

    /// Attach a device, preloading registers from 0 upward.
    pub fn add_device(&self, address: u8, registers: &[u8]) {
        let mut dev = Device::new();
        for (slot, &value) in dev.registers.iter_mut().zip(registers) {
            *slot = value;
        }
        self.state.borrow_mut().devices.insert(address, dev);
    }

    /// Make every transfer to `address` fail with `status` (or clear it).
    pub fn set_fault(&self, address: u8, status: Option<Status>) {
        if let Some(dev) = self.state.borrow_mut().devices.get_mut(&address) {
            dev.fault = status;
        }
    }

    /// Current register contents of a device.
    pub fn registers(&self, address: u8) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .devices
            .get(&address)
            .map(|d| d.registers.to_vec())
    }

    /// Every transaction issued so far, in order.
    pub fn transactions(&self) -> Vec<BusOp> {
        self.state.borrow().log.clone()
    }

    /// How many times a channel on this bus has been closed.
    pub fn close_count(&self) -> usize {
        self.state.borrow().closes
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelProvider for SimulatedBus {
    fn channel_count(&self) -> Result<u32> {
        Ok(self.channel_count)
    }

    fn open(&self, index: u32) -> Result<Box<dyn I2cChannel>> {
        if index >= self.channel_count {
            return Err(ShellError::Startup(format!(
                "channel {index} does not exist ({} available)",
                self.channel_count
            )));
        }
        Ok(Box::new(SimulatedChannel {
            state: Rc::clone(&self.state),
            config: None,
            closed: false,
        }))
    }
}

/// A channel opened on a [`SimulatedBus`].
#[derive(Debug)]
pub struct SimulatedChannel {
    state: Rc<RefCell<BusState>>,
    config: Option<ChannelConfig>,
    closed: bool,
}

impl SimulatedChannel {
    fn usable(&self) -> Option<Status> {
        if self.closed {
            Some(Status::InvalidHandle)
        } else if self.config.is_none() {
            Some(Status::DeviceNotOpened)
        } else {
            None
        }
    }
}

impl I2cChannel for SimulatedChannel {
    fn initialize(&mut self, config: &ChannelConfig) -> Status {
        if self.closed {
            return Status::InvalidHandle;
        }
        log::info!(
            "Simulated channel at {} Hz, latency {} ms",
            config.clock_rate.hz(),
            config.latency_timer_ms
        );
        self.config = Some(*config);
        Status::Ok
    }

    fn read(&mut self, device: u8, buf: &mut [u8], options: TransferOptions) -> Transfer {
        if let Some(status) = self.usable() {
            return Transfer::failed(status);
        }
        let mut state = self.state.borrow_mut();
        state.log.push(BusOp::Read {
            device,
            len: buf.len(),
            options,
        });
        let Some(dev) = state.devices.get_mut(&device) else {
            return Transfer::failed(Status::DeviceNotFound);
        };
        if let Some(status) = dev.fault {
            return Transfer::failed(status);
        }
        dev.stream_out(buf);
        Transfer::ok(buf.len())
    }

    fn write(&mut self, device: u8, data: &[u8], options: TransferOptions) -> Transfer {
        if let Some(status) = self.usable() {
            return Transfer::failed(status);
        }
        let mut state = self.state.borrow_mut();
        state.log.push(BusOp::Write {
            device,
            data: data.to_vec(),
            options,
        });
        let Some(dev) = state.devices.get_mut(&device) else {
            return Transfer::failed(Status::DeviceNotFound);
        };
        if let Some(status) = dev.fault {
            return Transfer::failed(status);
        }
        if let Some((&register, payload)) = data.split_first() {
            dev.pointer = register;
            for &value in payload {
                dev.registers[usize::from(dev.pointer)] = value;
                dev.pointer = dev.pointer.wrapping_add(1);
            }
        }
        Transfer::ok(data.len())
    }

    fn read_register(
        &mut self,
        device: u8,
        register: u8,
        buf: &mut [u8],
        write_options: TransferOptions,
        read_options: TransferOptions,
    ) -> Transfer {
        if let Some(status) = self.usable() {
            return Transfer::failed(status);
        }
        let mut state = self.state.borrow_mut();
        state.log.push(BusOp::ReadRegister {
            device,
            register,
            len: buf.len(),
            write_options,
            read_options,
        });
        let Some(dev) = state.devices.get_mut(&device) else {
            return Transfer::failed(Status::DeviceNotFound);
        };
        if let Some(status) = dev.fault {
            return Transfer::failed(status);
        }
        dev.pointer = register;
        dev.stream_out(buf);
        Transfer::ok(buf.len())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.borrow_mut().closes += 1;
        }
    }
}
