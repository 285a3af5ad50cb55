// Windows connection table backends

mod iphelper;

pub use iphelper::IpHelperConnectionTable;

use super::{ConnectionBackendInfo, ConnectionTableBackend};
use crate::backends::BackendPriority;
use crate::error::{Error, Result};

/// Detect available connection table backends on Windows
pub fn detect_connection_backends() -> Vec<ConnectionBackendInfo> {
    vec![ConnectionBackendInfo {
        name: "iphelper",
        priority: BackendPriority::Best,
        available: IpHelperConnectionTable::is_available(),
    }]
}

/// Select connection table backend for Windows
///
/// Currently only supports IP Helper API (iphelper).
pub fn select_connection_backend(
    preference: Option<&str>,
) -> Result<Box<dyn ConnectionTableBackend>> {
    match preference {
        None | Some("iphelper") => Ok(Box::new(IpHelperConnectionTable::new()?)),
        Some(name) => Err(Error::NoBackend(format!(
            "unknown connection table backend: {}",
            name
        ))),
    }
}
