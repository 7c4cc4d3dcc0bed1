//! Channel providers.
//!
//! The vendor driver binding lives outside this workspace. What ships here is
//! an in-memory I2C bus that honours the same [`ChannelProvider`] and
//! [`I2cChannel`] contract, used by the desktop binary and by tests.
//!
//! [`ChannelProvider`]: mpsse_types::backend::ChannelProvider
//! [`I2cChannel`]: mpsse_types::backend::I2cChannel

mod simulated;

pub use simulated::{BusOp, SimulatedBus, SimulatedChannel};
