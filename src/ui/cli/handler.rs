// Mon Oct 19 2026 - Alex

use super::args::{Args, Command, ResolveArgs, ServeArgs};
use crate::config::Config;
use crate::service::{PrivilegeMode, ServiceHandle};
use crate::symbol::SymbolResolver;
use crate::ui::{print_info, print_success, print_warning};
use log::{debug, error};
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const WORKER_POLL: Duration = Duration::from_millis(200);

/// Why `serve` stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Requested,
    InputClosed,
    WorkerStopped,
}

/// Waits for `quit` on `lines`, the end of input, or the worker stopping,
/// whichever comes first. The worker is checked every `poll`.
pub fn wait_for_shutdown<F>(is_running: F, lines: &Receiver<String>, poll: Duration) -> Shutdown
where
    F: Fn() -> bool,
{
    loop {
        if !is_running() {
            return Shutdown::WorkerStopped;
        }
        match lines.recv_timeout(poll) {
            Ok(line) if line.trim() == "quit" => return Shutdown::Requested,
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Shutdown::InputClosed,
        }
    }
}

/// Forwards stdin lines until EOF or a read error, then hangs up.
fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("memhook-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("stdin closed: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, args: Args) -> anyhow::Result<()> {
        self.setup_logging(&args)?;

        let config = match &args.config {
            Some(path) => Config::load(path).map_err(|e| anyhow::anyhow!(e))?,
            None => Config::default(),
        };

        match args.command {
            Command::Serve(serve_args) => self.handle_serve(config, serve_args, args.quiet),
            Command::Resolve(resolve_args) => self.handle_resolve(&config, resolve_args),
            Command::Config(serve_args) => self.handle_config(config, serve_args),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        };

        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .try_init()?;

        Ok(())
    }

    fn handle_serve(&self, config: Config, args: ServeArgs, quiet: bool) -> anyhow::Result<()> {
        let config = args.apply(config);
        config.validate().map_err(|e| anyhow::anyhow!(e))?;

        let mut handle = ServiceHandle::serve(&config)?;
        if !quiet {
            if config.privilege == PrivilegeMode::AllowAll {
                print_warning("capability check disabled");
            }
            print_success(&format!("serving on {}", config.socket_path.display()));
            print_info("close stdin or enter 'quit' to stop");
        }

        let lines = spawn_stdin_reader()?;
        let reason = wait_for_shutdown(|| handle.is_running(), &lines, WORKER_POLL);

        handle.stop();
        if !quiet {
            print_info(&format!("served {} requests", handle.requests_served()));
        }
        if reason == Shutdown::WorkerStopped {
            error!("receive loop stopped on its own");
            anyhow::bail!("service on {} stopped unexpectedly", config.socket_path.display());
        }
        Ok(())
    }

    fn handle_resolve(&self, config: &Config, args: ResolveArgs) -> anyhow::Result<()> {
        let mut resolver = SymbolResolver::new();
        if !args.dynamic_only {
            let image = args.image.as_deref().or(config.symbol_image.as_deref());
            resolver = resolver.with_image_fallback(image)?;
        }

        let address = resolver.resolve(&args.name)?;
        print_success(&format!("{} = {}", args.name, address));
        Ok(())
    }

    fn handle_config(&self, config: Config, args: ServeArgs) -> anyhow::Result<()> {
        let config = args.apply(config);
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        println!("{}", config.to_json().map_err(|e| anyhow::anyhow!(e))?);
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}
