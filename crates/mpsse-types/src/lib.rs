//! Foundation types for the MPSSE shell.
//!
//! This crate holds the pieces shared by every other crate in the workspace:
//! the error enum, byte literal parsing and formatting, the hardware channel
//! contract, and the shell configuration.

pub mod backend;
pub mod byte;
pub mod config;
pub mod error;
