//! Decoder configuration.
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::scan::{Marker, ACTIVE_MARKERS, DORMANT_MARKERS};

/// Tick at which a project's timeline starts.
pub const DEFAULT_BASE_TIME: u32 = 0x9600;

/// Highest number of output tracks a section may use.
pub const MAX_TRACKS: u8 = 128;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Scale pitch bends by `pitch_bend_multiplier`. Some playable
    /// instruments store bends unscaled.
    pub pitch_bend_override: bool,
    pub pitch_bend_multiplier: i32,
    /// Case-insensitive regular expressions matched anywhere in a section
    /// label. Empty means every section.
    pub pitch_bend_instrument_filter: Vec<String>,
    /// Give every distinct note number its own track.
    pub unique_tracks: bool,
    /// Only honoured with unique tracks, where it defaults to 16.
    pub track_limit: Option<u8>,
    /// Name split tracks from `note_names` instead of the note number.
    pub rename_tracks: bool,
    pub note_names: BTreeMap<u8, String>,
    /// `None` starts each section at its first event.
    pub base_time: Option<u32>,
    /// Decode controller, pressure and pitch bend commands into events.
    pub extended_controllers: bool,
    /// Also scan for the markers of record kinds that are not decoded yet.
    pub include_dormant_markers: bool,
    pub debug_trace: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            pitch_bend_override: false,
            pitch_bend_multiplier: 24,
            pitch_bend_instrument_filter: alloc::vec!["Grand Piano".to_string()],
            unique_tracks: false,
            track_limit: None,
            rename_tracks: true,
            note_names: default_note_names(),
            base_time: Some(DEFAULT_BASE_TIME),
            extended_controllers: true,
            include_dormant_markers: false,
            debug_trace: false,
        }
    }
}

impl DecoderConfig {
    /// Track count every section is written with.
    pub fn effective_track_limit(&self) -> u8 {
        if !self.unique_tracks {
            return 1;
        }
        self.track_limit.unwrap_or(16)
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        let limit = self.track_limit.unwrap_or_else(|| self.effective_track_limit());
        if limit == 0 || limit > MAX_TRACKS {
            return Err(DecodeError::config(alloc::format!(
                "track limit {} outside 1..={}",
                limit, MAX_TRACKS
            )));
        }
        if self.pitch_bend_override && self.pitch_bend_multiplier == 0 {
            return Err(DecodeError::config("pitch bend multiplier of 0 flattens every bend"));
        }
        self.pitch_bend_filters()?;
        Ok(())
    }

    fn pitch_bend_filters(&self) -> Result<Vec<Regex>, DecodeError> {
        self.pitch_bend_instrument_filter
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern).case_insensitive(true).build().map_err(|e| {
                    DecodeError::config(alloc::format!(
                        "bad pitch bend instrument filter {:?}: {}",
                        pattern, e
                    ))
                })
            })
            .collect()
    }

    /// Whether the pitch bend override applies to a section label.
    pub fn pitch_bend_applies_to(&self, label: &str) -> bool {
        if !self.pitch_bend_override {
            return false;
        }
        if self.pitch_bend_instrument_filter.is_empty() {
            return true;
        }
        match self.pitch_bend_filters() {
            Ok(filters) => filters.iter().any(|re| re.is_match(label)),
            Err(e) => {
                log::warn!("[GB] {}", e);
                false
            }
        }
    }

    /// Markers the scanner looks for.
    pub fn markers(&self) -> Vec<Marker> {
        let mut markers = ACTIVE_MARKERS.to_vec();
        if self.include_dormant_markers {
            markers.extend_from_slice(&DORMANT_MARKERS);
        }
        markers
    }

    /// Display name for a split track.
    pub fn note_name(&self, note: u8) -> String {
        if self.rename_tracks {
            if let Some(name) = self.note_names.get(&note) {
                return name.clone();
            }
        }
        note.to_string()
    }
}

/// General MIDI percussion names, as the drum kits lay them out.
pub fn default_note_names() -> BTreeMap<u8, String> {
    const TABLE: &[(u8, &str)] = &[
        (31, "PedalHiHat"),
        (32, "RimShot"),
        (33, "PedalHiHat"),
        (35, "Kick"),
        (36, "Kick2"),
        (37, "Sidestick"),
        (38, "Snare"),
        (39, "Clap"),
        (40, "Rimshot"),
        (41, "TomFloorLo"),
        (42, "HiHatClosed"),
        (43, "TomFloorHi"),
        (44, "PedalHiHat"),
        (45, "TomLo"),
        (46, "HiHatOpen"),
        (47, "TomLoMid"),
        (48, "TomHiMid"),
        (49, "Crash"),
        (50, "TomHi"),
        (51, "Ride"),
        (52, "RideChina"),
        (53, "RideBell"),
        (54, "Tambourine"),
        (55, "Splash"),
        (56, "Cowbell"),
        (57, "Crash2"),
        (58, "Vibraslap"),
        (59, "Ride2"),
        (60, "BongoHi"),
        (61, "BongoLo"),
        (62, "CongaMuteHi"),
        (63, "CongaOpenHi"),
        (64, "CongaLo"),
        (65, "TimbaleHi"),
        (66, "TimbaleLo"),
        (67, "AgogoHi"),
        (68, "AgogoLo"),
        (69, "Cabasa"),
        (70, "Maracas"),
        (71, "WhistleShort"),
        (72, "WhistleLong"),
        (73, "GuiroShort"),
        (74, "GuiroLong"),
        (75, "Claves"),
        (76, "WoodBlockHi"),
        (77, "WoodBlockLo"),
        (78, "CuicaMute"),
        (79, "CuicaOpen"),
        (80, "TriangleMute"),
        (81, "TriangleOpen"),
    ];
    TABLE
        .iter()
        .map(|&(note, name)| (note, name.to_string()))
        .collect()
}
