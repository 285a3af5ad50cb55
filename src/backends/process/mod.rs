// Process lookup trait for platform-specific operations
//
// Resolves an owning pid from the connection table to a display name.
// Only the snapshot service uses this; the connection table backends
// never look processes up themselves.

use crate::error::Result;

/// Platform-agnostic process lookup interface
pub trait ProcessLookup: Send + Sync {
    /// Backend name (e.g., "procfs", "sysinfo")
    fn name(&self) -> &'static str;

    /// Get process name by PID
    ///
    /// Fails with `ProcessNotFound` when the pid is no longer running and
    /// `ProcessLookupDenied` when the process cannot be inspected.
    fn process_name(&self, pid: u32) -> Result<String>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::ProcfsProcessLookup;

#[cfg(not(target_os = "linux"))]
mod sysinfo_lookup;
#[cfg(not(target_os = "linux"))]
pub use sysinfo_lookup::SysinfoProcessLookup;

/// Factory function to create the platform-specific ProcessLookup
pub fn create_process_lookup() -> Box<dyn ProcessLookup> {
    #[cfg(target_os = "linux")]
    {
        Box::new(ProcfsProcessLookup)
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(SysinfoProcessLookup::new())
    }
}
