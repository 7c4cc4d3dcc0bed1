//! Error types for the MPSSE shell.

use std::io;
use std::path::PathBuf;

use crate::backend::Status;
use crate::byte::ByteParseError;

/// Errors produced by the shell and its commands.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("invalid number of arguments for {command} (usage: {usage})")]
    ArgumentCount {
        command: String,
        usage: String,
    },

    #[error("could not parse {what} \"{token}\": {source}")]
    Parse {
        what: &'static str,
        token: String,
        #[source]
        source: ByteParseError,
    },

    #[error("could not parse {what} \"{token}\"")]
    InvalidCount { what: &'static str, token: String },

    #[error("invalid output format \"{0}\"")]
    InvalidOutputMode(String),

    #[error("Unknown command \"{0}\".")]
    UnknownCommand(String),

    #[error("FTDI error: {0}")]
    Transport(Status),

    #[error("transfer of {requested} bytes exceeds the {capacity}-byte buffer")]
    TransferTooLarge { requested: usize, capacity: usize },

    #[error("cannot open {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("startup error: {0}")]
    Startup(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ShellError {
    /// Whether this error is a user interrupt rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;
