// Windows IP Helper API-based connection table backend
//
// Uses GetExtendedTcpTable (iphlpapi.dll) with TCP_TABLE_OWNER_PID_ALL,
// available on Windows XP SP2 and later.

use crate::backends::BackendPriority;
use crate::backends::connection_table::ConnectionTableBackend;
use crate::backends::connection_table::reader::{ConnectionTableReader, TcpTableApi};
use crate::connection::ConnectionRecord;
use crate::error::{Error, Result};
use std::ffi::c_void;
use windows::Win32::NetworkManagement::IpHelper::{GetExtendedTcpTable, TCP_TABLE_OWNER_PID_ALL};
use windows::Win32::Networking::WinSock::AF_INET;

/// The raw GetExtendedTcpTable call for IPv4 tables with owning PIDs
pub struct IpHelperApi;

impl TcpTableApi for IpHelperApi {
    fn get_extended_tcp_table(&self, buffer: Option<&mut [u8]>, size: &mut u32) -> u32 {
        let table = buffer.map(|buffer| buffer.as_mut_ptr() as *mut c_void);

        // SAFETY: `table` is either None or points at a live buffer of at
        // least `*size` bytes; the OS writes no more than `*size` bytes.
        unsafe {
            GetExtendedTcpTable(
                table,
                size,
                true,
                AF_INET.0 as u32,
                TCP_TABLE_OWNER_PID_ALL,
                0,
            )
        }
    }
}

/// Connection table backend using the Windows IP Helper API
///
/// This is the standard Windows approach for connection-to-PID mapping
/// (used by netstat, Resource Monitor, etc.)
pub struct IpHelperConnectionTable {
    reader: ConnectionTableReader<IpHelperApi>,
}

impl IpHelperConnectionTable {
    pub fn new() -> Result<Self> {
        if !Self::is_available() {
            return Err(Error::NoBackend("IP Helper API not available".to_string()));
        }
        Ok(Self {
            reader: ConnectionTableReader::new(IpHelperApi),
        })
    }
}

impl ConnectionTableBackend for IpHelperConnectionTable {
    fn name(&self) -> &'static str {
        "iphelper"
    }

    fn priority(&self) -> BackendPriority {
        BackendPriority::Best // Native Windows API
    }

    fn is_available() -> bool {
        cfg!(target_os = "windows")
    }

    fn snapshot(&self) -> Result<Vec<ConnectionRecord>> {
        self.reader.snapshot()
    }
}
