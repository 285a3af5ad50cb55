// Decoder for the packed MIB_TCPTABLE_OWNER_PID layout
//
// The table is a native-endian u32 entry count followed by that many
// MIB_TCPROW_OWNER_PID rows:
//
//   offset  size  field
//   0       4     dwState        (native u32)
//   4       4     dwLocalAddr    (4 bytes, network order)
//   8       4     dwLocalPort    (first 2 bytes, network order)
//   12      4     dwRemoteAddr   (4 bytes, network order)
//   16      4     dwRemotePort   (first 2 bytes, network order)
//   20      4     dwOwningPid    (native u32)

use crate::connection::{ConnectionRecord, TcpState};
use crate::error::{Error, Result};
use std::net::{Ipv4Addr, SocketAddrV4};

pub const TABLE_HEADER_LEN: usize = 4;
pub const TCP_ROW_LEN: usize = 24;

/// Decode a raw table buffer into connection records.
///
/// The buffer is checked against the declared entry count before any
/// row is read, so a short buffer is an error rather than an over-read.
pub fn decode_tcp_table(buffer: &[u8]) -> Result<Vec<ConnectionRecord>> {
    let header: [u8; TABLE_HEADER_LEN] = buffer
        .get(..TABLE_HEADER_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(Error::MalformedTable {
            required: TABLE_HEADER_LEN,
            actual: buffer.len(),
        })?;
    let entry_count = u32::from_ne_bytes(header) as usize;

    let required = entry_count
        .checked_mul(TCP_ROW_LEN)
        .and_then(|rows_len| rows_len.checked_add(TABLE_HEADER_LEN))
        .unwrap_or(usize::MAX);
    if buffer.len() < required {
        return Err(Error::MalformedTable {
            required,
            actual: buffer.len(),
        });
    }

    let records = buffer[TABLE_HEADER_LEN..required]
        .chunks_exact(TCP_ROW_LEN)
        .map(decode_row)
        .collect();

    Ok(records)
}

fn decode_row(row: &[u8]) -> ConnectionRecord {
    let state = TcpState::from_raw(read_u32(row, 0));
    let local_addr = read_addr(row, 4);
    let local_port = read_port(row, 8);
    let remote_addr = read_addr(row, 12);
    let remote_port = read_port(row, 16);
    let owner_pid = read_u32(row, 20);

    ConnectionRecord {
        local: SocketAddrV4::new(local_addr, local_port),
        remote: SocketAddrV4::new(remote_addr, remote_port),
        state,
        owner_pid,
    }
}

// Callers only pass offsets inside a TCP_ROW_LEN chunk
fn read_u32(row: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes([row[offset], row[offset + 1], row[offset + 2], row[offset + 3]])
}

fn read_addr(row: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(row[offset], row[offset + 1], row[offset + 2], row[offset + 3])
}

/// Ports sit big-endian in the low two bytes of their 4-byte field
fn read_port(row: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([row[offset], row[offset + 1]])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a row exactly as GetExtendedTcpTable lays it out in memory
    pub(crate) fn encode_row(
        state: u32,
        local: SocketAddrV4,
        remote: SocketAddrV4,
        pid: u32,
    ) -> Vec<u8> {
        let mut row = Vec::with_capacity(TCP_ROW_LEN);
        row.extend_from_slice(&state.to_ne_bytes());
        row.extend_from_slice(&local.ip().octets());
        row.extend_from_slice(&local.port().to_be_bytes());
        row.extend_from_slice(&[0, 0]);
        row.extend_from_slice(&remote.ip().octets());
        row.extend_from_slice(&remote.port().to_be_bytes());
        row.extend_from_slice(&[0, 0]);
        row.extend_from_slice(&pid.to_ne_bytes());
        row
    }

    pub(crate) fn encode_table(rows: &[Vec<u8>]) -> Vec<u8> {
        let mut buffer = (rows.len() as u32).to_ne_bytes().to_vec();
        for row in rows {
            buffer.extend_from_slice(row);
        }
        buffer
    }

    #[test]
    fn test_empty_table() {
        let buffer = encode_table(&[]);
        assert!(decode_tcp_table(&buffer).unwrap().is_empty());
    }

    #[test]
    fn test_established_row() {
        let buffer = encode_table(&[encode_row(
            5,
            "10.0.0.1:8080".parse().unwrap(),
            "93.184.216.34:443".parse().unwrap(),
            1234,
        )]);

        let records = decode_tcp_table(&buffer).unwrap();
        assert_eq!(records.len(), 1);

        let record = records[0];
        assert_eq!(record.state, TcpState::Established);
        assert_eq!(record.owner_pid, 1234);
        assert_eq!(record.local, "10.0.0.1:8080".parse().unwrap());
        assert_eq!(record.remote, "93.184.216.34:443".parse().unwrap());
    }

    #[test]
    fn test_port_field_byte_order() {
        // 8080 = 0x1F90, stored as [0x1F, 0x90, 0, 0]
        let mut row = encode_row(
            2,
            "0.0.0.0:8080".parse().unwrap(),
            "0.0.0.0:0".parse().unwrap(),
            4,
        );
        assert_eq!(&row[8..12], &[0x1F, 0x90, 0x00, 0x00]);

        // Garbage in the unused high bytes must not leak into the port
        row[10] = 0xAB;
        row[11] = 0xCD;
        let records = decode_tcp_table(&encode_table(&[row])).unwrap();
        assert_eq!(records[0].local.port(), 8080);
        assert_eq!(records[0].state, TcpState::Listen);
    }

    #[test]
    fn test_local_port_comes_from_local_field() {
        let buffer = encode_table(&[encode_row(
            5,
            "192.168.1.10:50000".parse().unwrap(),
            "140.82.112.4:22".parse().unwrap(),
            77,
        )]);

        let record = decode_tcp_table(&buffer).unwrap()[0];
        assert_eq!(record.local.port(), 50000);
        assert_eq!(record.remote.port(), 22);
    }

    #[test]
    fn test_unknown_states() {
        let local = "127.0.0.1:1".parse().unwrap();
        let remote = "127.0.0.1:2".parse().unwrap();
        let buffer = encode_table(&[
            encode_row(0, local, remote, 1),
            encode_row(13, local, remote, 1),
            encode_row(200, local, remote, 1),
        ]);

        let records = decode_tcp_table(&buffer).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.state == TcpState::Unknown));
    }

    #[test]
    fn test_multiple_rows_keep_order() {
        let rows: Vec<Vec<u8>> = (1..=3u32)
            .map(|i| {
                encode_row(
                    i,
                    SocketAddrV4::new(Ipv4Addr::LOCALHOST, 1000 + i as u16),
                    SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, i as u8), 80),
                    i * 10,
                )
            })
            .collect();

        let records = decode_tcp_table(&encode_table(&rows)).unwrap();
        let pids: Vec<u32> = records.iter().map(|r| r.owner_pid).collect();
        assert_eq!(pids, vec![10, 20, 30]);
        assert_eq!(records[2].remote.ip(), &Ipv4Addr::new(10, 0, 0, 3));
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut buffer = encode_table(&[encode_row(
            5,
            "10.0.0.1:1".parse().unwrap(),
            "10.0.0.2:2".parse().unwrap(),
            9,
        )]);
        buffer.extend_from_slice(&[0xFF; 16]);

        assert_eq!(decode_tcp_table(&buffer).unwrap().len(), 1);
    }

    #[test]
    fn test_truncated_header() {
        match decode_tcp_table(&[1, 0]) {
            Err(Error::MalformedTable { required, actual }) => {
                assert_eq!(required, TABLE_HEADER_LEN);
                assert_eq!(actual, 2);
            }
            other => panic!("expected MalformedTable, got {:?}", other),
        }
    }

    #[test]
    fn test_count_exceeds_buffer() {
        // Declares two rows but carries only one
        let mut buffer = encode_table(&[encode_row(
            5,
            "10.0.0.1:1".parse().unwrap(),
            "10.0.0.2:2".parse().unwrap(),
            9,
        )]);
        buffer[..4].copy_from_slice(&2u32.to_ne_bytes());

        match decode_tcp_table(&buffer) {
            Err(Error::MalformedTable { required, actual }) => {
                assert_eq!(required, TABLE_HEADER_LEN + 2 * TCP_ROW_LEN);
                assert_eq!(actual, TABLE_HEADER_LEN + TCP_ROW_LEN);
            }
            other => panic!("expected MalformedTable, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_entry_count_does_not_overflow() {
        let buffer = u32::MAX.to_ne_bytes();
        assert!(matches!(
            decode_tcp_table(&buffer),
            Err(Error::MalformedTable { .. })
        ));
    }
}
