//! Marker discovery.
//!
//! The payload has no directory. Records are found by scanning for 4-byte
//! magic markers on byte boundaries and visiting the hits in order.

use alloc::vec::Vec;
use core::fmt;

/// A 4-byte magic pattern, stored in stream order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Marker(pub [u8; 4]);

impl Marker {
    /// Build from the big-endian spelling, e.g. `0x71537645` for `qSvE`.
    pub const fn from_be(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    pub const fn bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Markers whose records the decoder understands.
pub const ACTIVE_MARKERS: [Marker; 2] = [
    Marker::from_be(0x7153_7645), // qSvE
    Marker::from_be(0x7165_534D), // qeSM
];

/// Markers seen in project payloads whose records are not decoded yet.
/// Scanning them is opt-in; their records mostly classify as ignored.
pub const DORMANT_MARKERS: [Marker; 4] = [
    Marker::from_be(0x6B61_7254), // karT
    Marker::from_be(0x7453_6E49), // tSnI
    Marker::from_be(0x7453_7854), // tSxT
    Marker::from_be(0x6976_6E45), // ivnE
];

/// Lazily yields the bit offset of every byte-aligned occurrence of
/// `marker` in `buffer`, ascending. Re-invoke for a fresh scan.
pub fn find_all<'a>(marker: &'a Marker, buffer: &'a [u8]) -> impl Iterator<Item = u64> + 'a {
    buffer
        .windows(4)
        .enumerate()
        .filter(move |(_, w)| *w == marker.bytes())
        .map(|(i, _)| i as u64 * 8)
}

/// Scan for every marker and merge the hits into one ascending,
/// duplicate-free list of bit offsets.
pub fn scan_offsets(buffer: &[u8], markers: &[Marker]) -> Vec<u64> {
    let mut offsets: Vec<u64> = Vec::new();
    for marker in markers {
        let before = offsets.len();
        offsets.extend(find_all(marker, buffer));
        log::debug!("[GB] Marker {}: {} hits", marker, offsets.len() - before);
    }
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn marker_spelling() {
        assert_eq!(ACTIVE_MARKERS[0].bytes(), b"qSvE");
        assert_eq!(ACTIVE_MARKERS[1].bytes(), b"qeSM");
        assert_eq!(alloc::format!("{}", DORMANT_MARKERS[0]), "karT");
    }

    #[test]
    fn finds_overlapping_hits_as_bit_offsets() {
        let marker = Marker(*b"aaaa");
        let hits: Vec<u64> = find_all(&marker, b"xaaaaa").collect();
        assert_eq!(hits, vec![8, 16]);
    }

    #[test]
    fn no_hits_in_short_buffer() {
        let marker = ACTIVE_MARKERS[0];
        assert_eq!(find_all(&marker, b"qSv").count(), 0);
    }

    #[test]
    fn merges_and_sorts_all_markers() {
        let mut buf = vec![0u8; 4];
        buf.extend_from_slice(b"qeSM");
        buf.extend_from_slice(&[0; 3]);
        buf.extend_from_slice(b"qSvE");
        buf.extend_from_slice(b"qeSM");
        let offsets = scan_offsets(&buf, &ACTIVE_MARKERS);
        assert_eq!(offsets, vec![4 * 8, 11 * 8, 15 * 8]);
    }
}
