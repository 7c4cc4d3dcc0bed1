//! Built-in shell commands: exit, help, output, load, fileout.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use mpsse_types::byte::OutputMode;
use mpsse_types::error::{Result, ShellError};

use crate::cancel::CancelToken;
use crate::interpreter::{Command, CommandOutput, CommandRegistry, Session, expect_args};

/// Argument that clears the active script or duplicate sink.
const CLEAR_ARG: &str = "0";

/// Register every built-in command, bus commands included.
pub fn register_builtins(reg: &mut CommandRegistry) {
    reg.register(Box::new(ExitCmd));
    reg.register(Box::new(HelpCmd));
    crate::register_bus_commands(reg);
    reg.register(Box::new(OutputCmd));
    reg.register(Box::new(LoadCmd));
    reg.register(Box::new(FileOutCmd));
}

// ---------------------------------------------------------------------------
// exit
// ---------------------------------------------------------------------------

struct ExitCmd;
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn aliases(&self) -> &[&str] {
        &["quit", "e", "q"]
    }
    fn description(&self) -> &str {
        "Exits the MPSSE shell"
    }
    fn usage(&self) -> &str {
        "exit"
    }
    fn execute(
        &self,
        _args: &[&str],
        session: &mut Session,
        _: &CancelToken,
    ) -> Result<CommandOutput> {
        session.console.write_line("Exiting...")?;
        Ok(CommandOutput::Exit)
    }
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

/// The listing itself needs the registry, so this only signals the shell.
struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn aliases(&self) -> &[&str] {
        &["h"]
    }
    fn description(&self) -> &str {
        "Shows help text"
    }
    fn usage(&self) -> &str {
        "help"
    }
    fn execute(&self, _args: &[&str], _: &mut Session, _: &CancelToken) -> Result<CommandOutput> {
        Ok(CommandOutput::Help)
    }
}

// ---------------------------------------------------------------------------
// output
// ---------------------------------------------------------------------------

struct OutputCmd;
impl Command for OutputCmd {
    fn name(&self) -> &str {
        "output"
    }
    fn aliases(&self) -> &[&str] {
        &["o"]
    }
    fn description(&self) -> &str {
        "Sets the numeric output mode (default: dec)"
    }
    fn usage(&self) -> &str {
        "output <bin|dec|hex>"
    }
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        _: &CancelToken,
    ) -> Result<CommandOutput> {
        expect_args(self, args, 1, Some(1))?;
        let mode: OutputMode = args[0].parse()?;
        log::debug!("Output mode {} -> {mode}", session.output_mode);
        session.output_mode = mode;
        Ok(CommandOutput::Done)
    }
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

struct LoadCmd;
impl Command for LoadCmd {
    fn name(&self) -> &str {
        "load"
    }
    fn aliases(&self) -> &[&str] {
        &["l"]
    }
    fn description(&self) -> &str {
        "Loads a script, or exits the running one with 0"
    }
    fn usage(&self) -> &str {
        "load <file|0> (no spaces in path)"
    }
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        _: &CancelToken,
    ) -> Result<CommandOutput> {
        expect_args(self, args, 1, Some(1))?;
        if args[0] == CLEAR_ARG {
            session.console.load_script(None);
            return Ok(CommandOutput::Done);
        }
        let path = Path::new(args[0]);
        let file = File::open(path).map_err(|source| ShellError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Running script {}", path.display());
        session.console.load_script(Some(Box::new(BufReader::new(file))));
        Ok(CommandOutput::Done)
    }
}

// ---------------------------------------------------------------------------
// fileout
// ---------------------------------------------------------------------------

struct FileOutCmd;
impl Command for FileOutCmd {
    fn name(&self) -> &str {
        "fileout"
    }
    fn aliases(&self) -> &[&str] {
        &["fo"]
    }
    fn description(&self) -> &str {
        "Duplicates all output into a file, or stops with 0"
    }
    fn usage(&self) -> &str {
        "fileout <file|0> (no spaces in path)"
    }
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        _: &CancelToken,
    ) -> Result<CommandOutput> {
        expect_args(self, args, 1, Some(1))?;
        if args[0] == CLEAR_ARG {
            session.console.set_duplicate_sink(None);
            return Ok(CommandOutput::Done);
        }
        let path = Path::new(args[0]);
        let file = File::create(path).map_err(|source| ShellError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Recording transcript to {}", path.display());
        session
            .console
            .set_duplicate_sink(Some(Box::new(BufWriter::new(file))));
        Ok(CommandOutput::Done)
    }
}
