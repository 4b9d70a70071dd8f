// Mon Oct 19 2026 - Alex

use crate::memory::physical::DEFAULT_PHYSICAL_DEVICE;
use crate::service::PrivilegeMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SOCKET_PATH: &str = "/run/memhook.sock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub socket_path: PathBuf,
    /// Process whose virtual memory requests address; the daemon itself when unset.
    pub target_pid: Option<i32>,
    pub physical_device: PathBuf,
    pub physical_limit: Option<u64>,
    pub privilege: PrivilegeMode,
    pub verify_prologue: bool,
    pub symbol_image: Option<PathBuf>,
    pub receive_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            target_pid: None,
            physical_device: PathBuf::from(DEFAULT_PHYSICAL_DEVICE),
            physical_limit: None,
            privilege: PrivilegeMode::Capability,
            verify_prologue: true,
            symbol_image: None,
            receive_timeout_ms: 200,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    pub fn with_socket_path(mut self, path: PathBuf) -> Self {
        self.socket_path = path;
        self
    }

    pub fn with_target_pid(mut self, pid: i32) -> Self {
        self.target_pid = Some(pid);
        self
    }

    pub fn with_physical_device(mut self, device: PathBuf) -> Self {
        self.physical_device = device;
        self
    }

    pub fn with_physical_limit(mut self, limit: u64) -> Self {
        self.physical_limit = Some(limit);
        self
    }

    pub fn with_privilege(mut self, mode: PrivilegeMode) -> Self {
        self.privilege = mode;
        self
    }

    pub fn with_verify_prologue(mut self, enabled: bool) -> Self {
        self.verify_prologue = enabled;
        self
    }

    pub fn with_symbol_image(mut self, image: PathBuf) -> Self {
        self.symbol_image = Some(image);
        self
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.socket_path.as_os_str().is_empty() {
            return Err("socket_path must not be empty".to_string());
        }
        // sockaddr_un.sun_path holds 108 bytes including the terminator
        if self.socket_path.as_os_str().len() >= 108 {
            return Err("socket_path is too long for a unix socket".to_string());
        }
        if matches!(self.target_pid, Some(pid) if pid <= 0) {
            return Err("target_pid must be positive".to_string());
        }
        if self.physical_device.as_os_str().is_empty() {
            return Err("physical_device must not be empty".to_string());
        }
        if self.physical_limit == Some(0) {
            return Err("physical_limit must be greater than 0".to_string());
        }
        if self.receive_timeout_ms == 0 {
            return Err("receive_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}
