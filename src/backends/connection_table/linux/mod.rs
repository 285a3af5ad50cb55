// Linux connection table backends

mod procfs;

pub use self::procfs::ProcfsConnectionTable;

use super::{ConnectionBackendInfo, ConnectionTableBackend};
use crate::backends::BackendPriority;
use crate::error::{Error, Result};

/// Detect all available connection table backends on Linux
pub fn detect_connection_backends() -> Vec<ConnectionBackendInfo> {
    vec![ConnectionBackendInfo {
        name: "procfs",
        priority: BackendPriority::Good,
        available: ProcfsConnectionTable::is_available(),
    }]
}

/// Select connection table backend for Linux
pub fn select_connection_backend(
    preference: Option<&str>,
) -> Result<Box<dyn ConnectionTableBackend>> {
    match preference {
        None | Some("procfs") => Ok(Box::new(ProcfsConnectionTable::new()?)),
        Some(name) => Err(Error::NoBackend(format!(
            "unknown connection table backend: {}",
            name
        ))),
    }
}
