// Process lookup using sysinfo (Windows, macOS)
//
// sysinfo cannot tell a missing process from one we may not inspect, so
// every failed lookup is reported as `ProcessNotFound`.

use super::ProcessLookup;
use crate::error::{Error, Result};
use std::sync::{Mutex, PoisonError};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

pub struct SysinfoProcessLookup {
    // Refreshed one pid at a time, never with refresh_all()
    cached_system: Mutex<System>,
}

impl SysinfoProcessLookup {
    pub fn new() -> Self {
        Self {
            cached_system: Mutex::new(System::new()),
        }
    }
}

impl ProcessLookup for SysinfoProcessLookup {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn process_name(&self, pid: u32) -> Result<String> {
        let mut sys = self
            .cached_system
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let pid = Pid::from_u32(pid);
        let updated = sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            ProcessRefreshKind::new(),
        );

        // A targeted refresh leaves dead processes in place, so only trust
        // the entry if it was just updated
        if updated == 0 {
            return Err(Error::ProcessNotFound(pid.as_u32()));
        }

        sys.process(pid)
            .map(|p| p.name().to_string_lossy().into_owned())
            .ok_or(Error::ProcessNotFound(pid.as_u32()))
    }
}
