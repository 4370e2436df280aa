//! Section headers and the table that correlates data records with them.

use alloc::string::String;
use alloc::vec::Vec;
use gb_ir::{MusicalEvent, SectionKey, SectionOutput, Tempo, TimeSignature, TrackName};
use std::collections::HashMap;

use crate::cursor::BitCursor;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::record::{RecordHeader, SectionBody};

/// Keep alphanumerics, `.`, `_`, `-` and space; drop everything else.
pub fn sanitize_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect()
}

/// A named section and, once its data record is decoded, its events.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionRecord {
    pub key: SectionKey,
    pub label: String,
    pub has_events: bool,
    pub events: Vec<MusicalEvent>,
    pub track_count: u8,
    pub track_names: Vec<TrackName>,
    /// Number of data records decoded into this section
    pub data_records: u32,
}

impl SectionRecord {
    pub fn new(key: SectionKey, label: String) -> Self {
        Self {
            key,
            label,
            has_events: false,
            events: Vec::new(),
            track_count: 1,
            track_names: Vec::new(),
            data_records: 0,
        }
    }

    /// `{label}-{recordNumber}_{associatedMidiId}`
    pub fn stem(&self) -> String {
        alloc::format!(
            "{}-{}_{}",
            self.label, self.key.record_number, self.key.associated_midi_id
        )
    }

    /// Attach the song-wide metadata a sink needs.
    pub fn to_output(&self, tempo: Tempo, time_signature: TimeSignature) -> SectionOutput {
        SectionOutput {
            label: self.label.clone(),
            key: self.key,
            tempo,
            time_signature,
            track_count: self.track_count,
            track_names: self.track_names.clone(),
            events: self.events.clone(),
            has_events: self.has_events,
        }
    }
}

/// Sections in registration order, indexed by key.
#[derive(Debug, Default)]
pub struct SectionTable {
    records: Vec<SectionRecord>,
    index: HashMap<SectionKey, usize>,
}

impl SectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the section body at the cursor (just after the block tag) and
    /// register it under `(record number, associated MIDI id)`.
    pub fn register_section(
        &mut self,
        header: &RecordHeader,
        cursor: &mut BitCursor,
    ) -> Result<&mut SectionRecord, DecodeError> {
        let body_offset = cursor.byte_position();
        let body = SectionBody::parse(cursor)?;
        let key = SectionKey::new(header.record_number, body.associated_midi_id);
        let label = sanitize_label(&body.raw_name);
        log::debug!(
            "[GB] Section name is {} (orig {}), key is {}",
            label, body.raw_name, key
        );
        self.insert(key, label)
            .map_err(|kind| DecodeError::new(body_offset, kind))
    }

    /// Add a section. A second section for the same key means the scan
    /// lost sync; the table is left unchanged.
    pub fn insert(
        &mut self,
        key: SectionKey,
        label: String,
    ) -> Result<&mut SectionRecord, DecodeErrorKind> {
        if self.index.contains_key(&key) {
            return Err(DecodeErrorKind::DuplicateKey(key));
        }
        let idx = self.records.len();
        self.records.push(SectionRecord::new(key, label));
        self.index.insert(key, idx);
        Ok(&mut self.records[idx])
    }

    pub fn lookup(&mut self, record_number: u32, midi_id: u32) -> Option<&mut SectionRecord> {
        let idx = *self.index.get(&SectionKey::new(record_number, midi_id))?;
        self.records.get_mut(idx)
    }

    pub fn get(&self, key: &SectionKey) -> Option<&SectionRecord> {
        self.index.get(key).and_then(|&idx| self.records.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<SectionRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::{header_bytes, section_body_bytes};

    #[test]
    fn sanitizes_filesystem_unfriendly_characters() {
        assert_eq!(sanitize_label("Intro/Theme #1"), "IntroTheme 1");
        assert_eq!(sanitize_label("a.b_c-d e"), "a.b_c-d e");
        assert_eq!(sanitize_label("Bäss*"), "Bäss");
    }

    #[test]
    fn duplicate_key_leaves_table_unchanged() {
        let mut table = SectionTable::new();
        let key = SectionKey::new(1, 100);
        table.insert(key, String::from("Drums")).unwrap();
        let err = table.insert(key, String::from("Other")).unwrap_err();
        assert_eq!(err, DecodeErrorKind::DuplicateKey(key));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&key).unwrap().label, "Drums");
    }

    #[test]
    fn lookup_by_record_and_midi_id() {
        let mut table = SectionTable::new();
        table.insert(SectionKey::new(1, 100), String::from("A")).unwrap();
        table.insert(SectionKey::new(2, 100), String::from("B")).unwrap();
        assert_eq!(table.lookup(2, 100).unwrap().label, "B");
        assert!(table.lookup(1, 101).is_none());
        let labels: Vec<&str> = table.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["A", "B"]);
    }

    #[test]
    fn register_reads_body_after_tag() {
        let mut buf = header_bytes(2, 3, 0, 0);
        buf.extend_from_slice(&[0x2E, 0x03, 0x41]);
        buf.extend(section_body_bytes(77, "Verse #2"));
        let mut cursor = BitCursor::new(&buf);
        let (header, _) = RecordHeader::parse_at(&mut cursor, 0).unwrap();

        let mut table = SectionTable::new();
        let record = table.register_section(&header, &mut cursor).unwrap();
        assert_eq!(record.key, SectionKey::new(3, 77));
        assert_eq!(record.label, "Verse 2");
        assert_eq!(record.stem(), "Verse 2-3_77");
        assert!(!record.has_events);
    }

    #[test]
    fn register_duplicate_reports_offset() {
        let mut buf = header_bytes(2, 3, 0, 0);
        buf.extend_from_slice(&[0x2E, 0x03, 0x41]);
        buf.extend(section_body_bytes(77, "A"));
        let mut table = SectionTable::new();
        for expect_ok in [true, false] {
            let mut cursor = BitCursor::new(&buf);
            let (header, _) = RecordHeader::parse_at(&mut cursor, 0).unwrap();
            let result = table.register_section(&header, &mut cursor);
            assert_eq!(result.is_ok(), expect_ok);
            if let Err(e) = result {
                assert_eq!(e.offset(), 39);
                assert!(matches!(e.kind(), DecodeErrorKind::DuplicateKey(_)));
            }
        }
    }
}
