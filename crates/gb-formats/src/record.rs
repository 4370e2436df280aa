//! Record headers found at marker offsets.
//!
//! Layout from the marker offset, little endian:
//!
//! ```text
//! +0   marker (4)
//! +4   record type      u16
//! +6   record subtype   u32
//! +10  record number    u32
//! +14  MIDI id          u32
//! +18  padding (10)
//! +28  data length      u32
//! +32  padding (4)
//! +36  payload: 3-byte block tag, then record-specific data
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use binrw::{BinRead, BinResult};
use std::io::Cursor;
use gb_ir::SectionKey;

use crate::cursor::BitCursor;
use crate::error::{DecodeError, DecodeErrorKind};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: u64 = 36;

/// Block tags that mark a usable section header.
pub const SECTION_TAGS: [BlockTag; 4] = [
    BlockTag([0x2E, 0x03, 0x41]),
    BlockTag([0x3C, 0x03, 0x41]),
    BlockTag([0x64, 0x03, 0x41]),
    BlockTag([0x2E, 0x03, 0x01]),
];

/// Record type field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    Data,
    Section,
    Other(u16),
}

impl From<u16> for RecordType {
    fn from(raw: u16) -> Self {
        match raw {
            1 => Self::Data,
            2 => Self::Section,
            other => Self::Other(other),
        }
    }
}

/// The three bytes at the start of a record payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockTag(pub [u8; 3]);

impl BlockTag {
    pub fn is_section(&self) -> bool {
        SECTION_TAGS.contains(self)
    }
}

/// How the decoder should treat a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Section,
    Data,
    Ignored,
}

#[derive(BinRead, Debug)]
#[br(little)]
struct RawHeader {
    #[br(pad_before = 4)]
    record_type: u16,
    sub_type: u32,
    record_number: u32,
    midi_id: u32,
    #[br(pad_before = 10, pad_after = 4)]
    data_length: u32,
}

#[derive(BinRead, Debug)]
#[br(little)]
struct RawSectionBody {
    #[br(pad_before = 5)]
    associated_midi_id: u32,
    #[br(pad_before = 4)]
    name_len: u16,
    #[br(count = name_len as usize)]
    name: Vec<u8>,
}

/// Decoded fixed header of one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    /// Bit offset of the marker this header was read at
    pub offset: u64,
    pub record_type: RecordType,
    pub sub_type: u32,
    pub record_number: u32,
    pub midi_id: u32,
    /// Payload length in bytes, counted from `payload_start`
    pub data_length: u32,
    /// Bit position right after the fixed header
    pub payload_start: u64,
}

impl RecordHeader {
    /// Seek to `offset`, read the fixed header and the block tag.
    ///
    /// Leaves the cursor right after the tag.
    pub fn parse_at(cursor: &mut BitCursor, offset: u64) -> Result<(Self, BlockTag), DecodeError> {
        cursor.seek(offset)?;
        let raw = read_with(cursor, HEADER_LEN, |r| RawHeader::read(r))?;
        let payload_start = cursor.position();
        let tag = cursor.read_bytes(3)?;
        let tag = BlockTag([tag[0], tag[1], tag[2]]);

        let header = Self {
            offset,
            record_type: RecordType::from(raw.record_type),
            sub_type: raw.sub_type,
            record_number: raw.record_number,
            midi_id: raw.midi_id,
            data_length: raw.data_length,
            payload_start,
        };
        Ok((header, tag))
    }

    /// Section headers need a known tag; data records need only the type.
    pub fn classify(&self, tag: &BlockTag) -> RecordKind {
        match self.record_type {
            RecordType::Section if tag.is_section() => RecordKind::Section,
            RecordType::Data => RecordKind::Data,
            _ => RecordKind::Ignored,
        }
    }

    /// Key a data record uses to find its section.
    pub fn data_key(&self) -> SectionKey {
        SectionKey::new(self.record_number, self.midi_id)
    }

    /// Declared payload size in bits.
    pub fn declared_bits(&self) -> u64 {
        self.data_length as u64 * 8
    }
}

/// Section-specific fields that follow the block tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionBody {
    pub associated_midi_id: u32,
    /// Name as stored, before sanitising
    pub raw_name: String,
}

impl SectionBody {
    /// Read the body; the cursor must sit right after the block tag.
    pub fn parse(cursor: &mut BitCursor) -> Result<Self, DecodeError> {
        let raw = read_with(cursor, 0, |r| RawSectionBody::read(r))?;
        Ok(Self {
            associated_midi_id: raw.associated_midi_id,
            raw_name: String::from_utf8_lossy(&raw.name).into_owned(),
        })
    }
}

/// Run a binrw reader at the cursor and advance the cursor by what it
/// consumed. `min_len` is checked up front so short buffers report the
/// same out-of-bounds error as every other cursor read.
fn read_with<T>(
    cursor: &mut BitCursor,
    min_len: u64,
    read: impl FnOnce(&mut Cursor<&[u8]>) -> BinResult<T>,
) -> Result<T, DecodeError> {
    if cursor.remaining_bits() < min_len * 8 {
        return Err(DecodeError::new(
            cursor.byte_position(),
            DecodeErrorKind::OutOfBounds {
                requested_bits: min_len * 8,
                available_bits: cursor.remaining_bits(),
            },
        ));
    }
    let rest = cursor.rest()?;
    let mut reader = Cursor::new(rest);
    let value = read(&mut reader).map_err(|e| {
        log::debug!("[GB] Record read failed: {}", e);
        let consumed = reader.position().min(rest.len() as u64);
        DecodeError::new(
            cursor.byte_position() + consumed,
            DecodeErrorKind::OutOfBounds {
                requested_bits: (rest.len() as u64 - consumed + 1) * 8,
                available_bits: (rest.len() as u64 - consumed) * 8,
            },
        )
    })?;
    cursor.skip_bytes(reader.position())?;
    Ok(value)
}
