//! Test doubles shared by the unit tests of this crate.

use std::cell::{Cell, RefCell};
use std::io::{self, BufRead, Cursor, Read, Write};
use std::rc::Rc;

use mpsse_platform::SimulatedBus;
use mpsse_types::backend::{ChannelConfig, ChannelProvider, I2cChannel};

use crate::{ConsoleMirror, Session, Shell, Transport, register_builtins};

/// In-memory writer whose contents stay readable after it was boxed away.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Wraps a reader or writer and counts how often it was dropped.
pub(crate) struct DropCounter<T> {
    inner: T,
    drops: Rc<Cell<usize>>,
}

impl<T> DropCounter<T> {
    pub(crate) fn new(inner: T, drops: &Rc<Cell<usize>>) -> Self {
        Self {
            inner,
            drops: Rc::clone(drops),
        }
    }
}

impl<T> Drop for DropCounter<T> {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl<T: Read> Read for DropCounter<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<T: BufRead> BufRead for DropCounter<T> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}

impl<T: Write> Write for DropCounter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// An initialized transport on channel 0 of `bus`.
pub(crate) fn transport(bus: &SimulatedBus) -> Transport {
    Transport::open(bus, 0, &ChannelConfig::default()).unwrap()
}

/// A session over `bus` with `input` as console input.
pub(crate) fn session(bus: &SimulatedBus, input: &str) -> (Session, SharedBuf) {
    let out = SharedBuf::new();
    let console = ConsoleMirror::new(Cursor::new(input.to_string()), out.clone());
    (Session::new(console, transport(bus)), out)
}

/// A shell with every built-in command over `bus`.
pub(crate) fn shell(bus: &SimulatedBus, input: &str) -> (Shell, SharedBuf) {
    let (session, out) = session(bus, input);
    let mut reg = crate::CommandRegistry::new();
    register_builtins(&mut reg);
    (Shell::new(reg, session), out)
}

/// A shell with every built-in command over an arbitrary channel double.
pub(crate) fn shell_over(channel: Box<dyn I2cChannel>, input: &str) -> (Shell, SharedBuf) {
    let out = SharedBuf::new();
    let console = ConsoleMirror::new(Cursor::new(input.to_string()), out.clone());
    let session = Session::new(console, Transport::new(channel));
    let mut reg = crate::CommandRegistry::new();
    register_builtins(&mut reg);
    (Shell::new(reg, session), out)
}

/// Bus with one device at `address` and nothing else.
pub(crate) fn bus_with(address: u8, registers: &[u8]) -> SimulatedBus {
    let bus = SimulatedBus::new();
    bus.add_device(address, registers);
    assert_eq!(bus.channel_count().unwrap(), 1);
    bus
}
