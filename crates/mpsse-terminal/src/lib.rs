//! Command interpreter for the MPSSE shell.
//!
//! Commands implement the `Command` trait and are registered by name and
//! aliases. The `Shell` reads lines through the `ConsoleMirror` (which also
//! plays scripts and records transcripts), resolves the command and runs it
//! against the session's `Transport` under a cancellable token.

mod bus_commands;
mod cancel;
mod commands;
mod console;
mod interpreter;
mod shell;
mod transport;

#[cfg(test)]
mod testing;

/// Register the read, readloop, write and scan commands into a registry.
pub use bus_commands::register_bus_commands;
/// Cancellation flag checked before every bus transaction.
pub use cancel::CancelToken;
/// Shared slot through which an interrupt reaches the running command.
pub use cancel::InterruptHandle;
/// Register every built-in command into a registry.
pub use commands::register_builtins;
/// Console I/O with script playback and transcript recording.
pub use console::ConsoleMirror;
/// A single executable command trait.
pub use interpreter::Command;
/// Signal returned by a command to the shell.
pub use interpreter::CommandOutput;
/// Registry of available commands.
pub use interpreter::CommandRegistry;
/// Mutable state passed to every command.
pub use interpreter::Session;
/// Default prompt text.
pub use shell::DEFAULT_PROMPT;
/// The read-eval-print loop.
pub use shell::Shell;
/// Loop state.
pub use shell::ShellState;
/// Comment-stripping whitespace tokenizer.
pub use shell::tokenize;
/// Default scan range.
pub use transport::DEFAULT_SCAN_RANGE;
/// Scan progress event.
pub use transport::ScanEvent;
/// Largest single transfer.
pub use transport::TRANSFER_BUFFER_SIZE;
/// Bus transactions on behalf of commands.
pub use transport::Transport;
