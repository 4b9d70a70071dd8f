// Mon Oct 19 2026 - Alex

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CAP_SYS_ADMIN: u32 = 21;

/// Identity of the process that sent a request, as attached by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Caller {
    pub pid: i32,
    pub uid: u32,
    pub gid: u32,
}

impl Caller {
    pub fn new(pid: i32, uid: u32, gid: u32) -> Self {
        Self { pid, uid, gid }
    }

    pub fn current() -> Self {
        unsafe { Self::new(libc::getpid(), libc::getuid(), libc::getgid()) }
    }

    /// A sender whose credentials are unknown.
    pub fn anonymous() -> Self {
        Self::new(0, u32::MAX, u32::MAX)
    }

    pub fn is_anonymous(&self) -> bool {
        self.pid <= 0
    }
}

pub trait PrivilegePolicy: Send + Sync {
    fn name(&self) -> &str;
    fn is_privileged(&self, caller: &Caller) -> bool;
}

/// Grants access to callers holding a capability in their effective set.
pub struct CapabilityPolicy {
    capability: u32,
    proc_root: PathBuf,
}

impl CapabilityPolicy {
    pub fn new() -> Self {
        Self {
            capability: CAP_SYS_ADMIN,
            proc_root: PathBuf::from("/proc"),
        }
    }

    pub fn with_capability(mut self, capability: u32) -> Self {
        self.capability = capability;
        self
    }

    pub fn with_proc_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.proc_root = root.as_ref().to_path_buf();
        self
    }

    /// `CapEff` of the process now running as `caller.pid`.
    ///
    /// The status file is read after the datagram arrived, so the sender may
    /// have exited and its pid been reused. The status is only trusted when
    /// its real, effective or saved uid matches the uid the kernel attached
    /// to the message; a reused pid owned by the same uid still passes.
    fn effective_caps(&self, caller: &Caller) -> Option<u64> {
        let path = self.proc_root.join(caller.pid.to_string()).join("status");
        let status = match fs::read_to_string(&path) {
            Ok(status) => status,
            Err(e) => {
                debug!("cannot read {}: {}", path.display(), e);
                return None;
            }
        };

        let uids = parse_uids(&status)?;
        if !uids[..3].contains(&caller.uid) {
            warn!(
                "pid {} now runs as uid {}, message came from uid {}",
                caller.pid, uids[0], caller.uid
            );
            return None;
        }
        parse_cap_eff(&status)
    }
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegePolicy for CapabilityPolicy {
    fn name(&self) -> &str {
        "capability"
    }

    fn is_privileged(&self, caller: &Caller) -> bool {
        if caller.is_anonymous() || self.capability >= 64 {
            return false;
        }
        self.effective_caps(caller)
            .map(|caps| caps & (1u64 << self.capability) != 0)
            .unwrap_or(false)
    }
}

pub struct AllowAll;

impl PrivilegePolicy for AllowAll {
    fn name(&self) -> &str {
        "allow-all"
    }

    fn is_privileged(&self, _caller: &Caller) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivilegeMode {
    #[default]
    Capability,
    AllowAll,
}

impl PrivilegeMode {
    pub fn policy(self) -> Box<dyn PrivilegePolicy> {
        match self {
            Self::Capability => Box::new(CapabilityPolicy::new()),
            Self::AllowAll => {
                warn!("privilege checks disabled, every caller may access memory");
                Box::new(AllowAll)
            }
        }
    }
}

/// Extracts the `CapEff` mask from the text of `/proc/<pid>/status`.
pub fn parse_cap_eff(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("CapEff:"))
        .and_then(|value| u64::from_str_radix(value.trim(), 16).ok())
}

/// Extracts the real, effective, saved and filesystem uids from the text
/// of `/proc/<pid>/status`.
pub fn parse_uids(status: &str) -> Option<[u32; 4]> {
    let line = status.lines().find_map(|line| line.strip_prefix("Uid:"))?;
    let mut uids = [0u32; 4];
    let mut fields = line.split_whitespace();
    for uid in uids.iter_mut() {
        *uid = fields.next()?.parse().ok()?;
    }
    Some(uids)
}
