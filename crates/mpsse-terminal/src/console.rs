//! Console I/O with script playback and transcript recording.
//!
//! [`ConsoleMirror`] sits between the shell and the terminal. Input comes
//! from an active script when one is loaded, otherwise from the console.
//! Output always goes to the console and is mirrored into an optional
//! duplicate sink. The sink receives commands verbatim and everything else
//! as `#` comment lines, so a recorded transcript can be replayed with
//! `load`.

use std::io::{self, BufRead, Write};

use mpsse_types::error::Result;

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Console plus optional script source and duplicate sink.
pub struct ConsoleMirror {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    script: Option<Box<dyn BufRead>>,
    sink: Option<Box<dyn Write>>,
    /// Whether the next byte written to the sink starts a new line.
    sink_line_start: bool,
    color: bool,
}

impl ConsoleMirror {
    /// Wrap an arbitrary console input/output pair.
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            script: None,
            sink: None,
            sink_line_start: true,
            color: false,
        }
    }

    /// Bind the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }

    /// Enable ANSI highlighting of reported errors.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Replace the script source. The previous source is released first.
    pub fn load_script(&mut self, script: Option<Box<dyn BufRead>>) {
        drop(self.script.take());
        self.script = script;
    }

    /// Replace the duplicate sink. The previous sink is flushed and released
    /// first.
    pub fn set_duplicate_sink(&mut self, sink: Option<Box<dyn Write>>) {
        if let Some(mut old) = self.sink.take() {
            if let Err(e) = old.flush() {
                log::warn!("Failed to flush duplicate output: {e}");
            }
            drop(old);
        }
        self.sink = sink;
        self.sink_line_start = true;
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    pub fn has_duplicate_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Next input line without its line terminator, or `None` at console EOF.
    ///
    /// Script lines are echoed to the console in place of typed input. An
    /// exhausted or unreadable script is released and reading falls back to
    /// the console.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(script) = self.script.as_mut() {
            let mut line = String::new();
            match script.read_line(&mut line) {
                Ok(n) if n > 0 => {
                    trim_line_end(&mut line);
                    writeln!(self.output, "{line}")?;
                    self.output.flush()?;
                    return Ok(Some(line));
                },
                Ok(_) => log::debug!("Script finished"),
                Err(e) => log::warn!("Script read failed, returning to console: {e}"),
            }
            self.script = None;
        }

        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        // Invalid UTF-8 becomes U+FFFD and fails later as a bad argument.
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        trim_line_end(&mut line);
        Ok(Some(line))
    }

    /// Console-only partial write, used for the prompt.
    pub fn prompt(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }

    /// Write text to the console and mirror it to the sink.
    pub fn write(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()?;
        self.mirror(text);
        Ok(())
    }

    /// Write a line to the console and mirror it to the sink.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        self.output.flush()?;
        self.mirror(text);
        self.mirror("\n");
        Ok(())
    }

    /// Report an error line, highlighted on the console, plain in the sink.
    pub fn write_error(&mut self, text: &str) -> Result<()> {
        if self.color {
            writeln!(self.output, "{RED}{text}{RESET}")?;
        } else {
            writeln!(self.output, "{text}")?;
        }
        self.output.flush()?;
        self.mirror(text);
        self.mirror("\n");
        Ok(())
    }

    /// Record a command line in the sink only.
    pub fn write_command(&mut self, command: &str) {
        let mut text = String::with_capacity(command.len() + 2);
        if !self.sink_line_start {
            text.push('\n');
        }
        text.push_str(command);
        text.push('\n');
        if self.sink_write(text.as_bytes()) {
            self.sink_line_start = true;
        }
    }

    /// Forward console output to the sink as comment lines.
    fn mirror(&mut self, text: &str) {
        if self.sink.is_none() {
            return;
        }
        for piece in text.split_inclusive('\n') {
            let mut chunk = String::with_capacity(piece.len() + 2);
            if self.sink_line_start {
                chunk.push_str(if piece == "\n" { "#" } else { "# " });
            }
            chunk.push_str(piece);
            if !self.sink_write(chunk.as_bytes()) {
                return;
            }
            self.sink_line_start = piece.ends_with('\n');
        }
    }

    /// Write and flush to the sink. A failing sink is dropped.
    fn sink_write(&mut self, bytes: &[u8]) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        match sink.write_all(bytes).and_then(|()| sink.flush()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Duplicate output failed, recording stopped: {e}");
                self.sink = None;
                false
            },
        }
    }
}

fn trim_line_end(line: &mut String) {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
}
