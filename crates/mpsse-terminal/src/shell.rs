//! The read-eval-print loop.
//!
//! [`Shell`] reads a line, strips comments, resolves the command and runs it
//! with a fresh [`CancelToken`](crate::CancelToken) published through its
//! [`InterruptHandle`]. Command errors are reported and the loop continues;
//! only `exit` or console EOF end it.

use mpsse_types::error::{Result, ShellError};

use crate::cancel::InterruptHandle;
use crate::interpreter::{CommandOutput, CommandRegistry, Session};

/// Printed for a blank input line.
const HINT: &str = "Type h or help to view a list of commands.";

/// Default prompt.
pub const DEFAULT_PROMPT: &str = "MPSSE >";

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    /// Waiting for input.
    Prompting,
    /// A command is running.
    Executing,
    /// The loop has ended.
    Terminated,
}

/// Split a line into tokens, ignoring everything from the first `#`.
pub fn tokenize(line: &str) -> Vec<&str> {
    let code = line.split_once('#').map_or(line, |(code, _)| code);
    code.split_whitespace().collect()
}

/// Interactive command loop over a [`Session`].
pub struct Shell {
    registry: CommandRegistry,
    session: Session,
    interrupt: InterruptHandle,
    prompt: String,
    state: ShellState,
}

impl Shell {
    pub fn new(registry: CommandRegistry, session: Session) -> Self {
        Self {
            registry,
            session,
            interrupt: InterruptHandle::new(),
            prompt: DEFAULT_PROMPT.to_string(),
            state: ShellState::Prompting,
        }
    }

    /// Replace the prompt text.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Handle through which an interrupt cancels the running command.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Give up the session, e.g. to close its transport.
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Run until `exit` or console EOF.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? != ShellState::Terminated {}
        Ok(())
    }

    /// Prompt, read one line and execute it.
    pub fn step(&mut self) -> Result<ShellState> {
        if self.state == ShellState::Terminated {
            return Ok(self.state);
        }
        self.session.console.prompt(&self.prompt)?;
        let Some(line) = self.session.console.read_line()? else {
            log::debug!("Console closed");
            self.state = ShellState::Terminated;
            return Ok(self.state);
        };
        self.session.console.write_command(&line);
        self.execute_line(&line)
    }

    /// Execute a single input line.
    pub fn execute_line(&mut self, line: &str) -> Result<ShellState> {
        if line.trim().is_empty() {
            self.session.console.write_line(HINT)?;
            return Ok(self.state);
        }
        let tokens = tokenize(line);
        let Some((&name, args)) = tokens.split_first() else {
            return Ok(self.state);
        };
        let Some(cmd) = self.registry.resolve(name) else {
            let err = ShellError::UnknownCommand(name.to_string());
            self.session.console.write_error(&err.to_string())?;
            return Ok(self.state);
        };

        log::debug!("Executing {} {args:?}", cmd.name());
        self.state = ShellState::Executing;
        let cancel = self.interrupt.begin();
        let result = cmd.execute(args, &mut self.session, &cancel);
        self.interrupt.finish();
        self.state = ShellState::Prompting;

        match result {
            Ok(CommandOutput::Done) => {},
            Ok(CommandOutput::Help) => {
                let listing = self.registry.help_listing();
                self.session.console.write(&listing)?;
            },
            Ok(CommandOutput::Exit) => self.state = ShellState::Terminated,
            Err(e) if e.is_cancelled() => self.session.console.write_line("Cancelled")?,
            Err(e) => {
                log::debug!("{name} failed: {e:?}");
                self.session.console.write_error(&e.to_string())?;
            },
        }
        Ok(self.state)
    }
}
