// Mon Oct 19 2026 - Alex

use crate::config::Config;
use crate::service::PrivilegeMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "memhookd")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Privileged memory access service and inline hook toolkit", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve memory requests until stdin closes
    Serve(ServeArgs),
    /// Print the runtime address of a symbol
    Resolve(ResolveArgs),
    /// Print the effective configuration
    Config(ServeArgs),
}

#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    #[arg(short, long)]
    pub pid: Option<i32>,

    #[arg(long)]
    pub physical_device: Option<PathBuf>,

    #[arg(long)]
    pub physical_limit: Option<u64>,

    /// Skip the capability check (development only)
    #[arg(long)]
    pub allow_all: bool,
}

impl ServeArgs {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(socket) = &self.socket {
            config.socket_path = socket.clone();
        }
        if let Some(pid) = self.pid {
            config.target_pid = Some(pid);
        }
        if let Some(device) = &self.physical_device {
            config.physical_device = device.clone();
        }
        if let Some(limit) = self.physical_limit {
            config.physical_limit = Some(limit);
        }
        if self.allow_all {
            config.privilege = PrivilegeMode::AllowAll;
        }
        config
    }
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    pub name: String,

    /// ELF image searched after the dynamic symbols
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    #[arg(long)]
    pub dynamic_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides() {
        let args = Args::parse_from([
            "memhookd",
            "serve",
            "--socket",
            "/tmp/x.sock",
            "--pid",
            "77",
            "--allow-all",
        ]);
        let Command::Serve(serve) = args.command else {
            panic!("expected serve");
        };
        let config = serve.apply(Config::default());
        assert_eq!(config.socket_path, PathBuf::from("/tmp/x.sock"));
        assert_eq!(config.target_pid, Some(77));
        assert_eq!(config.privilege, PrivilegeMode::AllowAll);
        assert!(config.physical_limit.is_none());
    }

    #[test]
    fn test_global_flags() {
        let args = Args::parse_from(["memhookd", "resolve", "getpid", "-l", "debug", "--dynamic-only"]);
        assert_eq!(args.log_level, "debug");
        match args.command {
            Command::Resolve(resolve) => {
                assert_eq!(resolve.name, "getpid");
                assert!(resolve.dynamic_only);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
