//! Hex dumps for manual inspection of the payload.

use alloc::string::String;
use core::fmt::Write;

const BYTES_PER_LINE: usize = 16;

fn printable(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte.is_ascii_punctuation()
}

/// Format `data` as `0xOFFSET | hex bytes | ascii |` lines, 16 bytes each.
/// `base_offset` is the payload offset of `data[0]`.
pub fn hexdump(data: &[u8], base_offset: u64) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        let mut hex = String::with_capacity(BYTES_PER_LINE * 3);
        let mut ascii = String::with_capacity(BYTES_PER_LINE);
        for &byte in chunk {
            let _ = write!(hex, "{:02X} ", byte);
            ascii.push(if printable(byte) { byte as char } else { '.' });
        }
        let offset = base_offset + (line * BYTES_PER_LINE) as u64;
        let _ = writeln!(out, "0x{:08X} | {:48}| {:16} |", offset, hex, ascii);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_one_full_line() {
        let data: alloc::vec::Vec<u8> = (0x40..0x50).collect();
        let dump = hexdump(&data, 0);
        assert_eq!(
            dump,
            "0x00000000 | 40 41 42 43 44 45 46 47 48 49 4A 4B 4C 4D 4E 4F | @ABCDEFGHIJKLMNO |\n"
        );
    }

    #[test]
    fn pads_short_last_line_and_masks_unprintable() {
        let data = [0x00, 0x71, 0x53, 0x76, 0x45, 0x20];
        let dump = hexdump(&data, 0x20);
        assert!(dump.starts_with("0x00000020 | 00 71 53 76 45 20 "));
        assert!(dump.ends_with("| .qSvE.           |\n"));
        assert_eq!(dump.lines().count(), 1);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(hexdump(&[], 0).is_empty());
    }
}
