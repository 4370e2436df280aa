//! Per-section output handed to sinks.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::event::MusicalEvent;
use crate::timing::{Tempo, TimeSignature};

/// Identifies a musical section: the record number shared by a section
/// header and its data record, plus the MIDI id that links them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey {
    pub record_number: u32,
    pub associated_midi_id: u32,
}

impl SectionKey {
    pub const fn new(record_number: u32, associated_midi_id: u32) -> Self {
        Self { record_number, associated_midi_id }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.record_number, self.associated_midi_id)
    }
}

/// Name attached to one output track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackName {
    pub track: u8,
    pub name: String,
}

/// Everything a sink needs to write one section.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionOutput {
    /// Filesystem-safe section name
    pub label: String,
    pub key: SectionKey,
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    /// Number of output tracks the events are spread over
    pub track_count: u8,
    pub track_names: Vec<TrackName>,
    /// Section-relative events in stream order
    pub events: Vec<MusicalEvent>,
    pub has_events: bool,
}

impl SectionOutput {
    /// `{label}-{recordNumber}_{associatedMidiId}`, the stem shared by the
    /// output file name and the first track name.
    pub fn stem(&self) -> String {
        format!(
            "{}-{}_{}",
            self.label, self.key.record_number, self.key.associated_midi_id
        )
    }

    /// Deterministic output file name for the given extension.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.stem(), extension)
    }

    /// Name of a track, if one was assigned.
    pub fn track_name(&self, track: u8) -> Option<&str> {
        self.track_names
            .iter()
            .find(|t| t.track == track)
            .map(|t| t.name.as_str())
    }
}
