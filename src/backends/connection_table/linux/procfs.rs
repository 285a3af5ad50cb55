// Linux procfs-based connection table backend

use crate::backends::BackendPriority;
use crate::backends::connection_table::ConnectionTableBackend;
use crate::connection::{ConnectionRecord, TcpState};
use crate::error::{Error, Result};
use procfs::net::TcpState as ProcTcpState;
use procfs::process::{FDTarget, all_processes};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Connection table backend using the Linux /proc filesystem
///
/// This backend reads:
/// - /proc/net/tcp - for TCP IPv4 connections
/// - /proc/[pid]/fd/ - for the socket inodes each process owns
pub struct ProcfsConnectionTable;

impl ProcfsConnectionTable {
    pub fn new() -> Result<Self> {
        if !Self::is_available() {
            return Err(Error::NoBackend(
                "procfs not available (is /proc mounted?)".to_string(),
            ));
        }
        Ok(Self)
    }
}

impl ConnectionTableBackend for ProcfsConnectionTable {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Good // Has to scan every process's fds
    }

    fn is_available() -> bool {
        std::path::Path::new("/proc/net/tcp").exists()
    }

    fn snapshot(&self) -> Result<Vec<ConnectionRecord>> {
        let socket_to_pid = socket_owners()?;

        let mut records: Vec<ConnectionRecord> = procfs::net::tcp()?
            .into_iter()
            .filter_map(|entry| {
                let (SocketAddr::V4(local), SocketAddr::V4(remote)) =
                    (entry.local_address, entry.remote_address)
                else {
                    return None;
                };

                Some(ConnectionRecord {
                    local,
                    remote,
                    state: map_state(&entry.state),
                    // Sockets with no visible owner (other users, kernel) report pid 0
                    owner_pid: socket_to_pid.get(&entry.inode).copied().unwrap_or(0),
                })
            })
            .collect();

        // GetExtendedTcpTable is called with sorting enabled; match its order
        records.sort_by_key(|r| (r.local, r.remote));

        Ok(records)
    }
}

/// Build socket inode -> PID map by scanning all processes
fn socket_owners() -> Result<HashMap<u64, u32>> {
    let mut socket_to_pid = HashMap::new();

    for process in all_processes()?.flatten() {
        let pid = process.pid() as u32;

        // Unreadable fd directories just leave their sockets unowned
        if let Ok(fds) = process.fd() {
            for fd_info in fds.flatten() {
                if let FDTarget::Socket(inode) = fd_info.target {
                    socket_to_pid.insert(inode, pid);
                }
            }
        }
    }

    Ok(socket_to_pid)
}

fn map_state(state: &ProcTcpState) -> TcpState {
    match state {
        ProcTcpState::Established => TcpState::Established,
        ProcTcpState::SynSent => TcpState::SynSent,
        ProcTcpState::SynRecv | ProcTcpState::NewSynRecv => TcpState::SynReceived,
        ProcTcpState::FinWait1 => TcpState::FinWait1,
        ProcTcpState::FinWait2 => TcpState::FinWait2,
        ProcTcpState::TimeWait => TcpState::TimeWait,
        ProcTcpState::Close => TcpState::Closed,
        ProcTcpState::CloseWait => TcpState::CloseWait,
        ProcTcpState::LastAck => TcpState::LastAck,
        ProcTcpState::Listen => TcpState::Listen,
        ProcTcpState::Closing => TcpState::Closing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_state() {
        assert_eq!(map_state(&ProcTcpState::Established), TcpState::Established);
        assert_eq!(map_state(&ProcTcpState::Listen), TcpState::Listen);
        assert_eq!(map_state(&ProcTcpState::Close), TcpState::Closed);
        assert_eq!(map_state(&ProcTcpState::NewSynRecv), TcpState::SynReceived);
    }

    #[test]
    fn test_snapshot_on_live_system() {
        if !ProcfsConnectionTable::is_available() {
            return;
        }

        let table = ProcfsConnectionTable::new().unwrap();
        let records = table.snapshot().unwrap();
        for pair in records.windows(2) {
            assert!(pair[0].local <= pair[1].local);
        }
    }
}
