// Cross-platform TCP connection table backend system
//
// Each backend produces a snapshot of every IPv4 TCP connection the OS
// knows about, annotated with the owning process id:
// - Windows: GetExtendedTcpTable (IP Helper)
// - Linux: procfs (/proc/net/tcp + /proc/[pid]/fd)

use super::BackendPriority;
use crate::connection::ConnectionRecord;
use crate::error::Result;

// Only the IP Helper backend drives the buffer protocol at runtime
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub mod decode;
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub mod reader;

/// Connection table backend trait
pub trait ConnectionTableBackend: Send + Sync {
    /// Backend name (e.g., "iphelper", "procfs")
    fn name(&self) -> &'static str;

    /// Backend priority for auto-selection
    fn priority(&self) -> BackendPriority;

    /// Check if this backend is available on the current system
    fn is_available() -> bool
    where
        Self: Sized;

    /// Query the current connection table.
    ///
    /// Every call re-queries the OS; an empty table is an empty Vec.
    fn snapshot(&self) -> Result<Vec<ConnectionRecord>>;
}

/// Connection table backend metadata for selection
#[derive(Debug, Clone)]
pub struct ConnectionBackendInfo {
    pub name: &'static str,
    pub priority: BackendPriority,
    pub available: bool,
}

// Platform-specific modules
#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

// Platform-specific re-exports and functions
#[cfg(target_os = "linux")]
pub use linux::{detect_connection_backends, select_connection_backend};

#[cfg(target_os = "windows")]
pub use windows::{detect_connection_backends, select_connection_backend};

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
pub fn detect_connection_backends() -> Vec<ConnectionBackendInfo> {
    Vec::new()
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
pub fn select_connection_backend(
    _preference: Option<&str>,
) -> Result<Box<dyn ConnectionTableBackend>> {
    Err(crate::error::Error::NoBackend(
        "no connection table backend for this platform".to_string(),
    ))
}
