// Two-phase size-probe-then-fetch protocol for the extended TCP table

use super::decode::decode_tcp_table;
use crate::connection::ConnectionRecord;
use crate::error::{Error, Result};

pub const NO_ERROR: u32 = 0;
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;

/// The OS "get extended TCP table" call
///
/// Implementations fill `buffer` (when given) with the packed table and
/// always write the required size to `size`. The return value is the OS
/// status code: `NO_ERROR`, `ERROR_INSUFFICIENT_BUFFER`, or another error.
pub trait TcpTableApi: Send + Sync {
    fn get_extended_tcp_table(&self, buffer: Option<&mut [u8]>, size: &mut u32) -> u32;
}

/// Reads connection snapshots through a `TcpTableApi`
pub struct ConnectionTableReader<A> {
    api: A,
}

impl<A: TcpTableApi> ConnectionTableReader<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Query the current table and decode it.
    ///
    /// A non-zero status from the sized call is `TableUnavailable`; no
    /// partial result is returned. The table can grow between the probe
    /// and the fetch, so callers retry by calling `snapshot` again.
    pub fn snapshot(&self) -> Result<Vec<ConnectionRecord>> {
        // First call to get buffer size
        let mut size: u32 = 0;
        let status = self.api.get_extended_tcp_table(None, &mut size);
        if status != NO_ERROR && status != ERROR_INSUFFICIENT_BUFFER {
            return Err(Error::TableUnavailable { status });
        }

        if size == 0 {
            return Ok(Vec::new());
        }

        // Allocate exactly the probed size and fetch the table
        let mut buffer = vec![0u8; size as usize];
        let status = self
            .api
            .get_extended_tcp_table(Some(buffer.as_mut_slice()), &mut size);
        if status != NO_ERROR {
            return Err(Error::TableUnavailable { status });
        }

        let filled = (size as usize).min(buffer.len());
        decode_tcp_table(&buffer[..filled])
    }
}
