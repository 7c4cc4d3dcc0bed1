//! Command trait, session state, and registry.

use std::collections::HashMap;

use mpsse_types::byte::OutputMode;
use mpsse_types::error::{Result, ShellError};

use crate::cancel::CancelToken;
use crate::console::ConsoleMirror;
use crate::transport::Transport;

/// What the dispatcher should do after a command returned successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutput {
    /// Nothing further; any output was already written.
    Done,
    /// Print the command listing.
    Help,
    /// Leave the shell.
    Exit,
}

/// Mutable state handed to every command.
pub struct Session {
    /// Console with script playback and transcript recording.
    pub console: ConsoleMirror,
    /// The open hardware channel.
    pub transport: Transport,
    /// How bytes are printed.
    pub output_mode: OutputMode,
}

impl Session {
    pub fn new(console: ConsoleMirror, transport: Transport) -> Self {
        Self {
            console,
            transport,
            output_mode: OutputMode::default(),
        }
    }
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// Short names resolving to the same command.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "read <dev addr> <num bytes> \[reg addr\]").
    fn usage(&self) -> &str;

    /// Run the command. `args` excludes the command name.
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        cancel: &CancelToken,
    ) -> Result<CommandOutput>;
}

/// Reject an argument list whose length is outside `min..=max`.
pub(crate) fn expect_args(
    cmd: &dyn Command,
    args: &[&str],
    min: usize,
    max: Option<usize>,
) -> Result<()> {
    let too_many = max.is_some_and(|max| args.len() > max);
    if args.len() < min || too_many {
        return Err(ShellError::ArgumentCount {
            command: cmd.name().to_string(),
            usage: cmd.usage().to_string(),
        });
    }
    Ok(())
}

/// Registry of available commands.
///
/// Names and aliases share one flat index, so resolving an alias costs the
/// same as resolving a name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its name and aliases. A name already taken
    /// is rebound to the new command.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        let slot = self.commands.len();
        let names = std::iter::once(cmd.name()).chain(cmd.aliases().iter().copied());
        for name in names {
            if self.index.insert(name.to_string(), slot).is_some() {
                log::warn!("Command name \"{name}\" registered twice; keeping the latest");
            }
        }
        self.commands.push(cmd);
    }

    /// Exact, case-sensitive lookup by name or alias.
    pub fn resolve(&self, token: &str) -> Option<&dyn Command> {
        self.index
            .get(token)
            .and_then(|&i| self.commands.get(i))
            .map(|c| c.as_ref())
    }

    /// Number of distinct reachable commands.
    pub fn len(&self) -> usize {
        self.reachable().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commands still reachable under their own name, in registration order.
    fn reachable(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands
            .iter()
            .enumerate()
            .filter(|(i, c)| self.index.get(c.name()) == Some(i))
            .map(|(_, c)| c.as_ref())
    }

    /// Text printed by `help`.
    pub fn help_listing(&self) -> String {
        let mut out = String::from("Valid commands:\n");
        for cmd in self.reachable() {
            let mut names = cmd.name().to_string();
            for alias in cmd.aliases() {
                names.push_str(", ");
                names.push_str(alias);
            }
            out.push_str(&format!(
                "\t{names} - {}. Usage: {}\n",
                cmd.description(),
                cmd.usage()
            ));
        }
        out
    }
}
