// Linux process lookup using procfs

use super::ProcessLookup;
use crate::error::{Error, Result};
use procfs::ProcError;
use procfs::process::Process;

pub struct ProcfsProcessLookup;

impl ProcessLookup for ProcfsProcessLookup {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn process_name(&self, pid: u32) -> Result<String> {
        let pid_arg = i32::try_from(pid).map_err(|_| Error::ProcessNotFound(pid))?;

        Process::new(pid_arg)
            .and_then(|process| process.stat())
            .map(|stat| stat.comm)
            .map_err(|err| map_proc_error(pid, err))
    }
}

fn map_proc_error(pid: u32, err: ProcError) -> Error {
    match err {
        ProcError::NotFound(_) => Error::ProcessNotFound(pid),
        ProcError::PermissionDenied(_) => Error::ProcessLookupDenied(pid),
        other => Error::ProcessLookup {
            pid,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_resolves() {
        let name = ProcfsProcessLookup
            .process_name(std::process::id())
            .unwrap();
        assert!(!name.is_empty());
    }

    #[test]
    fn test_missing_process_is_not_found() {
        // Above the kernel's pid_max ceiling (2^22)
        let pid = 5_000_000;
        assert!(matches!(
            ProcfsProcessLookup.process_name(pid),
            Err(Error::ProcessNotFound(p)) if p == pid
        ));
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_proc_error(1, ProcError::PermissionDenied(None)),
            Error::ProcessLookupDenied(1)
        ));
        assert!(matches!(
            map_proc_error(2, ProcError::NotFound(None)),
            Error::ProcessNotFound(2)
        ));
    }
}
