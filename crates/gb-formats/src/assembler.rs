//! Collects the events of one data record and attaches them to a section.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use gb_ir::{MusicalEvent, TrackName};

use crate::config::DecoderConfig;
use crate::section::SectionRecord;

/// Maps note numbers to output tracks.
///
/// Without unique tracks everything lands on track 0. With them, every new
/// note number takes the next track, wrapping to 0 at the limit.
#[derive(Clone, Debug)]
pub struct TrackAssignment {
    unique: bool,
    limit: u8,
    next: u8,
    assigned: BTreeMap<u8, u8>,
}

impl TrackAssignment {
    pub fn new(unique: bool, limit: u8) -> Self {
        Self {
            unique,
            limit: limit.max(1),
            next: 0,
            assigned: BTreeMap::new(),
        }
    }

    /// Track for `note`, and whether this call assigned it.
    pub fn assign(&mut self, note: u8) -> (u8, bool) {
        if !self.unique {
            return (0, false);
        }
        if let Some(&track) = self.assigned.get(&note) {
            return (track, false);
        }
        let track = self.next;
        self.assigned.insert(note, track);
        self.next += 1;
        if self.next >= self.limit {
            log::trace!("[GB] Resetting track counter");
            self.next = 0;
        }
        (track, true)
    }

    pub fn limit(&self) -> u8 {
        self.limit
    }
}

/// Per-record event builder.
///
/// Owns the transient state of one data record decode: the base time, the
/// last accepted note and the track assignment. Created fresh for every
/// record and consumed by [`RecordAssembler::finish`].
pub struct RecordAssembler<'c> {
    config: &'c DecoderConfig,
    stem: String,
    base_time: Option<u32>,
    tracks: TrackAssignment,
    track_names: Vec<TrackName>,
    events: Vec<MusicalEvent>,
    /// (note, raw time) of the last accepted note
    last_note: Option<(u8, u32)>,
}

impl<'c> RecordAssembler<'c> {
    pub fn new(section: &SectionRecord, config: &'c DecoderConfig) -> Self {
        let stem = section.stem();
        let track_names = alloc::vec![TrackName { track: 0, name: stem.clone() }];
        Self {
            config,
            stem,
            base_time: config.base_time,
            tracks: TrackAssignment::new(config.unique_tracks, config.effective_track_limit()),
            track_names,
            events: Vec::new(),
            last_note: None,
        }
    }

    /// Section-relative time for a raw tick.
    fn normalize(&mut self, raw_time: u32) -> u32 {
        let base = *self.base_time.get_or_insert(raw_time);
        if raw_time < base {
            log::warn!(
                "[GB] Event at tick {:#x} precedes base time {:#x}; clamping to 0",
                raw_time, base
            );
        }
        raw_time.saturating_sub(base)
    }

    /// Add a note. Returns false when it repeats the previous note at the
    /// same raw time and was dropped.
    pub fn push_note(
        &mut self,
        raw_time: u32,
        note: u8,
        velocity: u8,
        duration: u32,
        channel: u8,
    ) -> bool {
        if self.last_note == Some((note, raw_time)) {
            log::debug!("[GB] Dropping duplicate note {} at {:#x}", note, raw_time);
            return false;
        }
        let (track, is_new) = self.tracks.assign(note);
        if is_new {
            let note_name = self.config.note_name(note);
            let name = format!("{}_{}_{}", note_name, self.stem, note_name);
            log::trace!("[GB] Track {} is {}", track, name);
            self.track_names.push(TrackName { track, name });
        }
        let time = self.normalize(raw_time);
        self.events.push(MusicalEvent::Note { time, note, velocity, duration, channel, track });
        self.last_note = Some((note, raw_time));
        true
    }

    /// Add a non-note event carrying a raw time.
    pub fn push(&mut self, event: MusicalEvent) {
        let time = self.normalize(event.time());
        self.events.push(event.with_time(time));
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Hand the collected events to `section`.
    ///
    /// A section that already received events from an earlier data record
    /// is overwritten with the newer ones.
    pub fn finish(self, section: &mut SectionRecord) {
        if section.has_events && !self.events.is_empty() {
            log::warn!(
                "[GB] Section {} decoded again; replacing {} earlier events",
                section.label,
                section.events.len()
            );
        }
        section.data_records += 1;
        section.track_count = self.tracks.limit();
        if self.events.is_empty() {
            if !section.has_events {
                section.track_names = self.track_names;
            }
            return;
        }
        section.has_events = true;
        section.events = self.events;
        section.track_names = self.track_names;
    }
}
