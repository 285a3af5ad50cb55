use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddrV4;

/// TCP connection state as reported by the OS connection table
///
/// Discriminants match the raw values of `MIB_TCP_STATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TcpState {
    Unknown = 0,
    Closed = 1,
    Listen = 2,
    SynSent = 3,
    SynReceived = 4,
    Established = 5,
    FinWait1 = 6,
    FinWait2 = 7,
    CloseWait = 8,
    Closing = 9,
    LastAck = 10,
    TimeWait = 11,
    DeleteTcb = 12,
}

impl TcpState {
    /// Map a raw table value; anything outside 1..=12 is `Unknown`
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => TcpState::Closed,
            2 => TcpState::Listen,
            3 => TcpState::SynSent,
            4 => TcpState::SynReceived,
            5 => TcpState::Established,
            6 => TcpState::FinWait1,
            7 => TcpState::FinWait2,
            8 => TcpState::CloseWait,
            9 => TcpState::Closing,
            10 => TcpState::LastAck,
            11 => TcpState::TimeWait,
            12 => TcpState::DeleteTcb,
            _ => TcpState::Unknown,
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single IPv4 TCP connection observed in one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub state: TcpState,
    pub owner_pid: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_raw() {
        assert_eq!(TcpState::from_raw(1), TcpState::Closed);
        assert_eq!(TcpState::from_raw(5), TcpState::Established);
        assert_eq!(TcpState::from_raw(12), TcpState::DeleteTcb);
    }

    #[test]
    fn test_state_out_of_range_is_unknown() {
        assert_eq!(TcpState::from_raw(0), TcpState::Unknown);
        assert_eq!(TcpState::from_raw(13), TcpState::Unknown);
        assert_eq!(TcpState::from_raw(u32::MAX), TcpState::Unknown);
    }

    #[test]
    fn test_state_discriminants_round_trip_raw() {
        for raw in 1..=12u32 {
            assert_eq!(TcpState::from_raw(raw) as u32, raw);
        }
    }
}
