// Error types shared by the connection table and process lookup backends

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The OS connection-table query failed after the sized call.
    /// Not retried internally; the next poll may succeed.
    #[error("TCP connection table unavailable (status {status})")]
    TableUnavailable { status: u32 },

    /// The table buffer is shorter than its declared entry count requires
    #[error("malformed TCP table: {required} bytes required, {actual} available")]
    MalformedTable { required: usize, actual: usize },

    /// The pid no longer identifies a running process
    #[error("process {0} not found")]
    ProcessNotFound(u32),

    /// The process exists but we lack the privileges to inspect it
    #[error("access denied looking up process {0}")]
    ProcessLookupDenied(u32),

    #[error("failed to look up process {pid}: {reason}")]
    ProcessLookup { pid: u32, reason: String },

    #[error("no connection table backend available: {0}")]
    NoBackend(String),

    #[cfg(target_os = "linux")]
    #[error("procfs error: {0}")]
    Procfs(#[from] procfs::ProcError),
}
