//! snapshot.bin: persisted routing state.
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! header   magic u32 | version u16 | flags u16 | vertex_count u32
//!          | edge_count u32 | bus_wait_time u32 | bus_velocity u32
//!          | created_unix u64                                   (32 bytes)
//! table    vertex_count² cells, row-major:
//!          has_value u8 | prev_edge i32 (-1 = none) | weight f64 (13 bytes)
//! topology (only when flags bit 0 is set)
//!          edge_count × { from u32 | to u32 | weight f64 }      (16 bytes)
//!          edge_count × { stop_index u32 | bus_index u32
//!                         | span_count u32 }                    (12 bytes)
//! footer   crc64 u64 over everything above
//! ```
//!
//! Stop and bus identity in the topology section is an index into the
//! lexicographically sorted name list, which is rebuilt from the live
//! catalogue on both sides and never persisted.

use std::fs;
use std::path::Path;

use crate::router::RouteInternalData;
use crate::transit::RoutingSettings;

use super::crc;
use super::PersistenceError;

const MAGIC: u32 = 0x5452_534E; // "TRSN"
const VERSION: u16 = 1;
const FLAG_TOPOLOGY: u16 = 1;

const HEADER_LEN: usize = 32;
const CELL_LEN: usize = 13;
const EDGE_LEN: usize = 16;
const EDGE_INFO_LEN: usize = 12;
const FOOTER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEdge {
    pub from: u32,
    pub to: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEdgeInfo {
    pub stop_index: u32,
    pub bus_index: u32,
    pub span_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub edges: Vec<SnapshotEdge>,
    pub infos: Vec<SnapshotEdgeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub settings: RoutingSettings,
    pub vertex_count: u32,
    pub edge_count: u32,
    /// Row-major |V|² table.
    pub table: Vec<Option<RouteInternalData>>,
    pub topology: Option<Topology>,
    pub created_unix: u64,
}

pub struct SnapshotFile;

impl SnapshotFile {
    pub fn write<P: AsRef<Path>>(path: P, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        fs::write(path, Self::to_bytes(snapshot))?;
        Ok(())
    }

    /// Read a snapshot, insisting that its topology flag matches what the
    /// caller expects to consume.
    pub fn read<P: AsRef<Path>>(
        path: P,
        include_topology: bool,
    ) -> Result<Snapshot, PersistenceError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes, include_topology)
    }

    /// Read a snapshot whichever sections it carries.
    pub fn inspect<P: AsRef<Path>>(path: P) -> Result<Snapshot, PersistenceError> {
        let bytes = fs::read(path)?;
        decode(&bytes, None)
    }

    pub fn to_bytes(snapshot: &Snapshot) -> Vec<u8> {
        let n = snapshot.vertex_count as usize;
        debug_assert_eq!(snapshot.table.len(), n * n);

        let mut flags = 0u16;
        if snapshot.topology.is_some() {
            flags |= FLAG_TOPOLOGY;
        }

        let topology_len = snapshot
            .topology
            .as_ref()
            .map(|t| t.edges.len() * EDGE_LEN + t.infos.len() * EDGE_INFO_LEN)
            .unwrap_or(0);
        let mut out =
            Vec::with_capacity(HEADER_LEN + snapshot.table.len() * CELL_LEN + topology_len + FOOTER_LEN);

        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&snapshot.vertex_count.to_le_bytes());
        out.extend_from_slice(&snapshot.edge_count.to_le_bytes());
        out.extend_from_slice(&snapshot.settings.bus_wait_time.to_le_bytes());
        out.extend_from_slice(&snapshot.settings.bus_velocity.to_le_bytes());
        out.extend_from_slice(&snapshot.created_unix.to_le_bytes());

        for cell in &snapshot.table {
            match cell {
                Some(data) => {
                    out.push(1);
                    let prev = data.prev_edge.map(|id| id as i32).unwrap_or(-1);
                    out.extend_from_slice(&prev.to_le_bytes());
                    out.extend_from_slice(&data.weight.to_le_bytes());
                }
                None => {
                    out.push(0);
                    out.extend_from_slice(&(-1i32).to_le_bytes());
                    out.extend_from_slice(&0f64.to_le_bytes());
                }
            }
        }

        if let Some(topology) = &snapshot.topology {
            for edge in &topology.edges {
                out.extend_from_slice(&edge.from.to_le_bytes());
                out.extend_from_slice(&edge.to.to_le_bytes());
                out.extend_from_slice(&edge.weight.to_le_bytes());
            }
            for info in &topology.infos {
                out.extend_from_slice(&info.stop_index.to_le_bytes());
                out.extend_from_slice(&info.bus_index.to_le_bytes());
                out.extend_from_slice(&info.span_count.to_le_bytes());
            }
        }

        out.extend_from_slice(&crc::checksum(&out).to_le_bytes());
        out
    }

    pub fn from_bytes(
        bytes: &[u8],
        include_topology: bool,
    ) -> Result<Snapshot, PersistenceError> {
        decode(bytes, Some(include_topology))
    }
}

fn decode(bytes: &[u8], expect_topology: Option<bool>) -> Result<Snapshot, PersistenceError> {
    if bytes.len() < HEADER_LEN + FOOTER_LEN {
        return Err(PersistenceError::Truncated {
            needed: HEADER_LEN + FOOTER_LEN,
            got: bytes.len(),
        });
    }

    let magic = u32_at(bytes, 0);
    if magic != MAGIC {
        return Err(PersistenceError::BadMagic {
            expected: MAGIC,
            found: magic,
        });
    }
    let version = u16_at(bytes, 4);
    if version != VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }

    let flags = u16_at(bytes, 6);
    let has_topology = flags & FLAG_TOPOLOGY != 0;
    match expect_topology {
        Some(true) if !has_topology => return Err(PersistenceError::TopologyMissing),
        Some(false) if has_topology => return Err(PersistenceError::TopologyUnexpected),
        _ => {}
    }

    let vertex_count = u32_at(bytes, 8);
    let edge_count = u32_at(bytes, 12);
    let settings = RoutingSettings {
        bus_wait_time: u32_at(bytes, 16),
        bus_velocity: u32_at(bytes, 20),
    };
    let created_unix = u64_at(bytes, 24);

    let cells = (vertex_count as usize) * (vertex_count as usize);
    let topology_len = if has_topology {
        edge_count as usize * (EDGE_LEN + EDGE_INFO_LEN)
    } else {
        0
    };
    let expected_len = HEADER_LEN + cells * CELL_LEN + topology_len + FOOTER_LEN;
    if bytes.len() < expected_len {
        return Err(PersistenceError::Truncated {
            needed: expected_len,
            got: bytes.len(),
        });
    }
    if bytes.len() > expected_len {
        return Err(PersistenceError::Malformed(format!(
            "{} trailing bytes",
            bytes.len() - expected_len
        )));
    }

    let body_end = expected_len - FOOTER_LEN;
    let stored = u64_at(bytes, body_end);
    let computed = crc::checksum(&bytes[..body_end]);
    if stored != computed {
        return Err(PersistenceError::ChecksumMismatch { stored, computed });
    }

    let mut table = Vec::with_capacity(cells);
    let mut offset = HEADER_LEN;
    for _ in 0..cells {
        let has_value = bytes[offset];
        let prev = i32_at(bytes, offset + 1);
        let weight = f64_at(bytes, offset + 5);
        offset += CELL_LEN;

        match has_value {
            0 => table.push(None),
            1 => {
                let prev_edge = match prev {
                    -1 => None,
                    id if id >= 0 && (id as u32) < edge_count => Some(id as u32),
                    id => {
                        return Err(PersistenceError::IndexOutOfRange {
                            what: "edge",
                            index: id as u32,
                            count: edge_count,
                        })
                    }
                };
                table.push(Some(RouteInternalData { weight, prev_edge }));
            }
            other => {
                return Err(PersistenceError::Malformed(format!(
                    "table cell marker {other} at offset {}",
                    offset - CELL_LEN
                )))
            }
        }
    }

    let topology = if has_topology {
        let mut edges = Vec::with_capacity(edge_count as usize);
        for _ in 0..edge_count {
            edges.push(SnapshotEdge {
                from: u32_at(bytes, offset),
                to: u32_at(bytes, offset + 4),
                weight: f64_at(bytes, offset + 8),
            });
            offset += EDGE_LEN;
        }
        let mut infos = Vec::with_capacity(edge_count as usize);
        for _ in 0..edge_count {
            infos.push(SnapshotEdgeInfo {
                stop_index: u32_at(bytes, offset),
                bus_index: u32_at(bytes, offset + 4),
                span_count: u32_at(bytes, offset + 8),
            });
            offset += EDGE_INFO_LEN;
        }
        Some(Topology { edges, infos })
    } else {
        None
    };

    Ok(Snapshot {
        settings,
        vertex_count,
        edge_count,
        table,
        topology,
        created_unix,
    })
}

// Fixed-width accessors; every call site sits behind the expected-length
// check in `decode`.

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[offset..offset + 2]);
    u16::from_le_bytes(buf)
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

fn u64_at(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

fn f64_at(bytes: &[u8], offset: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(topology: bool) -> Snapshot {
        Snapshot {
            settings: RoutingSettings {
                bus_wait_time: 5,
                bus_velocity: 60,
            },
            vertex_count: 2,
            edge_count: 1,
            table: vec![
                Some(RouteInternalData {
                    weight: 0.0,
                    prev_edge: None,
                }),
                Some(RouteInternalData {
                    weight: 6.0,
                    prev_edge: Some(0),
                }),
                None,
                Some(RouteInternalData {
                    weight: 0.0,
                    prev_edge: None,
                }),
            ],
            topology: topology.then(|| Topology {
                edges: vec![SnapshotEdge {
                    from: 0,
                    to: 1,
                    weight: 6.0,
                }],
                infos: vec![SnapshotEdgeInfo {
                    stop_index: 0,
                    bus_index: 0,
                    span_count: 1,
                }],
            }),
            created_unix: 1_700_000_000,
        }
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        for topology in [false, true] {
            let snapshot = sample(topology);
            let bytes = SnapshotFile::to_bytes(&snapshot);
            let decoded = SnapshotFile::from_bytes(&bytes, topology).unwrap();
            assert_eq!(decoded, snapshot);
            assert_eq!(SnapshotFile::to_bytes(&decoded), bytes);
        }
    }

    #[test]
    fn test_empty_snapshot_round_trips() {
        let snapshot = Snapshot {
            settings: RoutingSettings {
                bus_wait_time: 1,
                bus_velocity: 30,
            },
            vertex_count: 0,
            edge_count: 0,
            table: Vec::new(),
            topology: Some(Topology {
                edges: Vec::new(),
                infos: Vec::new(),
            }),
            created_unix: 0,
        };
        let bytes = SnapshotFile::to_bytes(&snapshot);
        let decoded = SnapshotFile::from_bytes(&bytes, true).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut bytes = SnapshotFile::to_bytes(&sample(false));
        bytes[0] ^= 0xFF;
        match SnapshotFile::from_bytes(&bytes, false) {
            Err(PersistenceError::BadMagic { .. }) => {}
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut bytes = SnapshotFile::to_bytes(&sample(false));
        bytes[4] = 2;
        match SnapshotFile::from_bytes(&bytes, false) {
            Err(PersistenceError::UnsupportedVersion(2)) => {}
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_truncation_is_rejected() {
        let bytes = SnapshotFile::to_bytes(&sample(false));
        for cut in [bytes.len() - 1, bytes.len() - FOOTER_LEN, HEADER_LEN, 10] {
            match SnapshotFile::from_bytes(&bytes[..cut], false) {
                Err(PersistenceError::Truncated { .. }) => {}
                other => panic!("cut {cut}: expected Truncated, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_corruption_fails_the_checksum() {
        let mut bytes = SnapshotFile::to_bytes(&sample(false));
        // Flip one bit in a table weight, far from the length fields.
        let index = HEADER_LEN + 6;
        bytes[index] ^= 0x01;
        match SnapshotFile::from_bytes(&bytes, false) {
            Err(PersistenceError::ChecksumMismatch { .. }) => {}
            other => panic!("expected ChecksumMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_topology_flag_must_match_request() {
        let with = SnapshotFile::to_bytes(&sample(true));
        let without = SnapshotFile::to_bytes(&sample(false));
        match SnapshotFile::from_bytes(&without, true) {
            Err(PersistenceError::TopologyMissing) => {}
            other => panic!("expected TopologyMissing, got {other:?}"),
        }
        match SnapshotFile::from_bytes(&with, false) {
            Err(PersistenceError::TopologyUnexpected) => {}
            other => panic!("expected TopologyUnexpected, got {other:?}"),
        }
        // `inspect` takes whichever is present.
        assert!(decode(&with, None).is_ok());
        assert!(decode(&without, None).is_ok());
    }

    #[test]
    fn test_predecessor_outside_edge_range_is_rejected() {
        let mut snapshot = sample(false);
        snapshot.table[1] = Some(RouteInternalData {
            weight: 6.0,
            prev_edge: Some(7),
        });
        let bytes = SnapshotFile::to_bytes(&snapshot);
        match SnapshotFile::from_bytes(&bytes, false) {
            Err(PersistenceError::IndexOutOfRange { what: "edge", .. }) => {}
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = SnapshotFile::to_bytes(&sample(false));
        bytes.push(0);
        match SnapshotFile::from_bytes(&bytes, false) {
            Err(PersistenceError::Malformed(_)) => {}
            other => panic!("expected Malformed, got {other:?}"),
        }
    }
}
