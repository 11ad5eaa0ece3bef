//! # Listener Acquisition
//!
//! Prefer a socket handed over by the service manager (systemd socket
//! activation); otherwise bind the configured address.
//!
//! The activation variables are read and cleared by [`ActivationEnv::take`],
//! which the binary calls before the async runtime starts any threads.

use std::fmt;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::errors::{Error, Result};

/// First inherited descriptor under the socket activation protocol.
pub const LISTEN_FDS_START: i32 = 3;

const ENV_LISTEN_PID: &str = "LISTEN_PID";
const ENV_LISTEN_FDS: &str = "LISTEN_FDS";
const ENV_LISTEN_FDNAMES: &str = "LISTEN_FDNAMES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerSource {
    /// Inherited from the service manager
    Activated,
    /// Bound by this process
    Bound,
}

impl fmt::Display for ListenerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerSource::Activated => write!(f, "socket-activation"),
            ListenerSource::Bound => write!(f, "bind"),
        }
    }
}

#[derive(Debug)]
pub struct AcquiredListener {
    pub listener: TcpListener,
    pub source: ListenerSource,
}

impl AcquiredListener {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Socket activation variables as seen by this process.
///
/// The default value means activation is not in use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationEnv {
    pub listen_pid: Option<String>,
    pub listen_fds: Option<String>,
}

impl ActivationEnv {
    pub fn from_env() -> Self {
        Self {
            listen_pid: std::env::var(ENV_LISTEN_PID).ok(),
            listen_fds: std::env::var(ENV_LISTEN_FDS).ok(),
        }
    }

    /// Read the activation variables and remove them so children do not
    /// inherit them.
    ///
    /// Mutates the process environment: call it while the process is still
    /// single-threaded.
    pub fn take() -> Self {
        let env = Self::from_env();
        std::env::remove_var(ENV_LISTEN_PID);
        std::env::remove_var(ENV_LISTEN_FDS);
        std::env::remove_var(ENV_LISTEN_FDNAMES);
        env
    }

    /// Number of descriptors passed to `pid`.
    ///
    /// `Ok(None)` means activation is not in use; `Err` means the variables
    /// are present but unusable.
    pub fn fd_count_for(&self, pid: u32) -> std::result::Result<Option<u32>, String> {
        let (Some(listen_pid), Some(listen_fds)) = (&self.listen_pid, &self.listen_fds) else {
            return Ok(None);
        };

        let listen_pid: u32 = listen_pid
            .trim()
            .parse()
            .map_err(|e| format!("invalid {} '{}': {}", ENV_LISTEN_PID, listen_pid, e))?;
        if listen_pid != pid {
            return Ok(None);
        }

        let count: u32 = listen_fds
            .trim()
            .parse()
            .map_err(|e| format!("invalid {} '{}': {}", ENV_LISTEN_FDS, listen_fds, e))?;
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(count))
    }
}

/// Turn a Go-style `":8080"` into an address the std resolver accepts.
pub fn normalize_listen_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// Acquire the single listener the gateway serves on.
pub async fn acquire_listener(addr: &str, activation: &ActivationEnv) -> Result<AcquiredListener> {
    match activated_listener(activation) {
        Ok(Some(listener)) => {
            info!(
                local_addr = ?listener.local_addr().ok(),
                "Using listener from socket activation"
            );
            return Ok(AcquiredListener { listener, source: ListenerSource::Activated });
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Socket activation failed, falling back to bind"),
    }

    let bind_addr = normalize_listen_addr(addr);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| Error::transport(format!("failed to bind {}: {}", bind_addr, e)))?;

    info!(local_addr = ?listener.local_addr().ok(), "Bound listener");
    Ok(AcquiredListener { listener, source: ListenerSource::Bound })
}

fn activated_listener(activation: &ActivationEnv) -> Result<Option<TcpListener>> {
    let Some(count) = activation.fd_count_for(std::process::id()).map_err(Error::transport)? else {
        return Ok(None);
    };
    if count > 1 {
        warn!(count, "Multiple sockets passed in, serving only the first");
    }

    listener_from_fd(LISTEN_FDS_START).map(Some)
}

#[cfg(unix)]
fn listener_from_fd(fd: i32) -> Result<TcpListener> {
    use std::os::unix::io::FromRawFd;

    // SAFETY: LISTEN_PID matched our pid, so the service manager passed `fd`
    // to this process and nothing else in it has taken ownership yet.
    let std_listener = unsafe { std::net::TcpListener::from_raw_fd(fd) };
    std_listener.set_nonblocking(true)?;
    Ok(TcpListener::from_std(std_listener)?)
}

#[cfg(not(unix))]
fn listener_from_fd(_fd: i32) -> Result<TcpListener> {
    Err(Error::transport("socket activation is only supported on unix"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pid: Option<&str>, fds: Option<&str>) -> ActivationEnv {
        ActivationEnv { listen_pid: pid.map(String::from), listen_fds: fds.map(String::from) }
    }

    #[test]
    fn test_normalize_go_style_address() {
        assert_eq!(normalize_listen_addr(":8080"), "0.0.0.0:8080");
        assert_eq!(normalize_listen_addr("127.0.0.1:9000"), "127.0.0.1:9000");
        assert_eq!(normalize_listen_addr("[::1]:9000"), "[::1]:9000");
    }

    #[test]
    fn test_activation_not_in_use() {
        assert_eq!(env(None, None).fd_count_for(42), Ok(None));
        assert_eq!(env(Some("42"), None).fd_count_for(42), Ok(None));
    }

    #[test]
    fn test_activation_for_other_process_is_ignored() {
        assert_eq!(env(Some("7"), Some("1")).fd_count_for(42), Ok(None));
    }

    #[test]
    fn test_activation_for_this_process() {
        assert_eq!(env(Some("42"), Some("1")).fd_count_for(42), Ok(Some(1)));
        assert_eq!(env(Some("42"), Some("0")).fd_count_for(42), Ok(None));
    }

    #[test]
    fn test_activation_garbage_is_error() {
        assert!(env(Some("abc"), Some("1")).fd_count_for(42).is_err());
        assert!(env(Some("42"), Some("many")).fd_count_for(42).is_err());
    }

    #[test]
    fn test_default_env_means_no_activation() {
        assert_eq!(ActivationEnv::default().fd_count_for(std::process::id()), Ok(None));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let acquired = acquire_listener("127.0.0.1:0", &ActivationEnv::default()).await.unwrap();
        assert_eq!(acquired.source, ListenerSource::Bound);
        assert_ne!(acquired.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_activation_for_other_process_binds() {
        let other = (std::process::id() + 1).to_string();
        let activation = env(Some(&other), Some("1"));
        let acquired = acquire_listener("127.0.0.1:0", &activation).await.unwrap();
        assert_eq!(acquired.source, ListenerSource::Bound);
    }

    #[tokio::test]
    async fn test_garbage_activation_falls_back_to_bind() {
        let activation = env(Some("not-a-pid"), Some("1"));
        let acquired = acquire_listener("127.0.0.1:0", &activation).await.unwrap();
        assert_eq!(acquired.source, ListenerSource::Bound);
    }

    #[tokio::test]
    async fn test_bind_failure_is_transport_error() {
        let result = acquire_listener("256.0.0.1:80", &ActivationEnv::default()).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
