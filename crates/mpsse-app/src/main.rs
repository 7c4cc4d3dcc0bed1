//! MPSSE shell entry point.
//!
//! Opens the configured channel, then runs the interactive shell on
//! stdin/stdout until `exit` or EOF. Ctrl-C cancels the running command;
//! at the prompt it is ignored so the channel is always closed on the way
//! out.

use anyhow::{Context, Result};

use mpsse_platform::SimulatedBus;
use mpsse_terminal::{
    CommandRegistry, ConsoleMirror, InterruptHandle, Session, Shell, Transport, register_builtins,
};
use mpsse_types::config::ShellConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (config, source) = ShellConfig::resolve().context("failed to load configuration")?;
    match &source {
        Some(path) => log::info!("Loaded config from {}", path.display()),
        None => log::info!("Using default config"),
    }

    let bus = SimulatedBus::from_config(&config.simulator);
    let transport = Transport::open(&bus, config.channel, &config.channel_config())
        .with_context(|| format!("failed to open channel {}", config.channel))?;

    let mut console = ConsoleMirror::stdio();
    console.set_color(config.color);
    console.write_line(&format!("Initialized channel {}", config.channel))?;

    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry);
    let session = Session::new(console, transport);
    let mut shell = Shell::new(registry, session).with_prompt(config.prompt);

    let interrupt = shell.interrupt_handle();
    ctrlc::set_handler(move || on_interrupt(&interrupt))
        .context("failed to install Ctrl-C handler")?;

    let outcome = shell.run();
    shell.into_session().transport.close();
    outcome?;
    Ok(())
}

/// Ctrl-C: cancel the running command, if any.
fn on_interrupt(interrupt: &InterruptHandle) {
    if !interrupt.interrupt() {
        log::warn!("Nothing to cancel; type exit to quit");
    }
}
