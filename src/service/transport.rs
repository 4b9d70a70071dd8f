// Mon Oct 19 2026 - Alex

use crate::service::wire::MAX_FRAME_LEN;
use crate::service::{Caller, ServiceError};
use log::{debug, warn};
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Address a reply is routed back to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(PathBuf);

impl Endpoint {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self(path.as_ref().to_path_buf())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    /// `None` when the sender is unbound and cannot be answered.
    pub endpoint: Option<Endpoint>,
    pub caller: Caller,
    pub data: Vec<u8>,
}

pub trait Transport: Send + Sync {
    fn send(&self, endpoint: &Endpoint, data: &[u8]) -> Result<(), ServiceError>;

    /// Waits for the next message; `Ok(None)` when the wait timed out.
    fn receive(&self) -> Result<Option<Envelope>, ServiceError>;
}

/// Datagram socket bound to a filesystem path, receiving kernel-attached
/// sender credentials with every message.
pub struct UnixDatagramTransport {
    socket: UnixDatagram,
    path: PathBuf,
}

impl UnixDatagramTransport {
    pub fn bind<P: AsRef<Path>>(path: P, timeout: Option<Duration>) -> Result<Self, ServiceError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            debug!("removing stale socket {}", path.display());
            std::fs::remove_file(&path)?;
        }
        let socket = UnixDatagram::bind(&path)?;
        enable_passcred(&socket)?;
        socket.set_read_timeout(timeout)?;
        debug!("bound datagram socket {}", path.display());
        Ok(Self { socket, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for UnixDatagramTransport {
    fn send(&self, endpoint: &Endpoint, data: &[u8]) -> Result<(), ServiceError> {
        let sent = self.socket.send_to(data, endpoint.path())?;
        if sent != data.len() {
            return Err(ServiceError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send to {}: {} of {} bytes", endpoint, sent, data.len()),
            )));
        }
        Ok(())
    }

    fn receive(&self) -> Result<Option<Envelope>, ServiceError> {
        let mut buf = vec![0u8; MAX_FRAME_LEN + 1];
        let mut addr: libc::sockaddr_un = unsafe { mem::zeroed() };
        // u64 keeps the control buffer aligned for cmsghdr
        let mut control = [0u64; 8];
        let control_len = unsafe { libc::CMSG_SPACE(mem::size_of::<libc::ucred>() as u32) } as usize;

        let mut iov = libc::iovec {
            iov_base: buf.as_mut_ptr() as *mut libc::c_void,
            iov_len: buf.len(),
        };
        let mut msg: libc::msghdr = unsafe { mem::zeroed() };
        msg.msg_name = &mut addr as *mut libc::sockaddr_un as *mut libc::c_void;
        msg.msg_namelen = mem::size_of::<libc::sockaddr_un>() as libc::socklen_t;
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = control.as_mut_ptr() as *mut libc::c_void;
        msg.msg_controllen = control_len.min(mem::size_of_val(&control)) as _;

        let received = unsafe { libc::recvmsg(self.socket.as_raw_fd(), &mut msg, 0) };
        if received < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => Ok(None),
                _ => Err(err.into()),
            };
        }
        buf.truncate(received as usize);
        if msg.msg_flags & libc::MSG_TRUNC != 0 {
            warn!("datagram truncated to {} bytes", received);
        }

        Ok(Some(Envelope {
            endpoint: sender_endpoint(&addr, msg.msg_namelen),
            caller: sender_credentials(&msg).unwrap_or_else(Caller::anonymous),
            data: buf,
        }))
    }
}

impl Drop for UnixDatagramTransport {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn enable_passcred(socket: &UnixDatagram) -> io::Result<()> {
    let on: libc::c_int = 1;
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_PASSCRED,
            &on as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn sender_credentials(msg: &libc::msghdr) -> Option<Caller> {
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(msg);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_CREDENTIALS {
                let cred = std::ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const libc::ucred);
                return Some(Caller::new(cred.pid, cred.uid, cred.gid));
            }
            cmsg = libc::CMSG_NXTHDR(msg, cmsg);
        }
    }
    None
}

fn sender_endpoint(addr: &libc::sockaddr_un, len: libc::socklen_t) -> Option<Endpoint> {
    let path_offset = mem::size_of::<libc::sa_family_t>();
    let path_len = (len as usize).checked_sub(path_offset)?;
    let raw = &addr.sun_path[..path_len.min(addr.sun_path.len())];
    // unbound senders have no path, abstract ones start with NUL
    if raw.first().map_or(true, |c| *c == 0) {
        return None;
    }
    let bytes: Vec<u8> = raw.iter().take_while(|c| **c != 0).map(|c| *c as u8).collect();
    Some(Endpoint::new(OsStr::from_bytes(&bytes)))
}
