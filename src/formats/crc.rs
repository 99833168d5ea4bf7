//! CRC-64/GO-ISO checksum for snapshot footers.

use crc::{Crc, CRC_64_GO_ISO};

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

/// Checksum over a complete byte slice.
pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable_and_input_sensitive() {
        let data = b"transit snapshot";
        assert_eq!(checksum(data), checksum(data));
        assert_ne!(checksum(data), checksum(b"transit snapshoT"));
        assert_ne!(checksum(data), 0);
    }
}
