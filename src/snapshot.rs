// Connection snapshots annotated with cached process names

use crate::backends::connection_table::ConnectionTableBackend;
use crate::backends::process::ProcessLookup;
use crate::cache::TtlCache;
use crate::connection::ConnectionRecord;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// How long a resolved (or vanished) process name is remembered
pub const DEFAULT_PROCESS_CACHE_TTL: Duration = Duration::from_secs(30);

/// Row filter; every unset criterion matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionFilter {
    pub remote_addr: Option<Ipv4Addr>,
    pub remote_port: Option<u16>,
    pub process_name: Option<String>,
}

impl ConnectionFilter {
    fn matches_endpoint(&self, record: &ConnectionRecord) -> bool {
        self.remote_addr.is_none_or(|addr| *record.remote.ip() == addr)
            && self.remote_port.is_none_or(|port| record.remote.port() == port)
    }

    fn matches_process(&self, process_name: Option<&str>) -> bool {
        match self.process_name.as_deref() {
            None | Some("") => true,
            Some(wanted) => process_name.unwrap_or_default() == wanted,
        }
    }
}

/// A connection annotated with its owner's name (None if it has exited)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRow {
    #[serde(flatten)]
    pub record: ConnectionRecord,
    pub process_name: Option<String>,
}

impl fmt::Display for ConnectionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LocalEndPoint: {}", self.record.local)?;
        writeln!(f, "RemoteEndPoint: {}", self.record.remote)?;
        writeln!(f, "State: {}", self.record.state)?;
        writeln!(f, "Pid: {}", self.record.owner_pid)?;
        write!(f, "Process: {}", self.process_name.as_deref().unwrap_or_default())
    }
}

pub struct ConnectionSnapshotService {
    table: Box<dyn ConnectionTableBackend>,
    process_names: TtlCache<u32, Option<String>, Error>,
}

impl ConnectionSnapshotService {
    pub fn new(
        table: Box<dyn ConnectionTableBackend>,
        lookup: Arc<dyn ProcessLookup>,
        ttl: Duration,
    ) -> Self {
        log::debug!(
            "Snapshot service using table backend {} and process lookup {} (ttl {:?})",
            table.name(),
            lookup.name(),
            ttl
        );

        let process_names =
            TtlCache::new(Some(ttl), move |pid: &u32| lookup.process_name(*pid).map(Some));

        Self {
            table,
            process_names,
        }
    }

    /// Take a fresh snapshot and return the rows matching `filter`
    pub fn list_connections(&self, filter: &ConnectionFilter) -> Result<Vec<ConnectionRow>> {
        let records = self.table.snapshot()?;

        let mut rows = Vec::new();
        for record in records.into_iter().filter(|r| filter.matches_endpoint(r)) {
            let process_name = self.process_name(record.owner_pid)?;
            if filter.matches_process(process_name.as_deref()) {
                rows.push(ConnectionRow {
                    record,
                    process_name,
                });
            }
        }

        Ok(rows)
    }

    /// Resolve a pid through the cache.
    ///
    /// A pid that no longer exists is remembered as `None` for the TTL so
    /// repeated polls don't query the OS again. Other failures propagate
    /// uncached.
    fn process_name(&self, pid: u32) -> Result<Option<String>> {
        match self.process_names.get(&pid) {
            Err(Error::ProcessNotFound(_)) => {
                self.process_names.set(pid, None);
                Ok(None)
            }
            other => other,
        }
    }

    pub fn cached_process_count(&self) -> usize {
        self.process_names.len()
    }

    pub fn backend_name(&self) -> &'static str {
        self.table.name()
    }

    pub fn shutdown(&self) {
        if !self.process_names.is_empty() {
            log::trace!("Releasing cached process names");
        }
        self.process_names.shutdown();
    }
}
