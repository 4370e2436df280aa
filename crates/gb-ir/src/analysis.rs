//! Section feature analysis: scans a section's events to report what
//! the decoder recovered.

use alloc::collections::BTreeSet;
use core::fmt;

use crate::event::MusicalEvent;
use crate::section::SectionOutput;

/// Summary of the events in one section.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SectionFeatures {
    pub total_notes: usize,
    pub note_range: Option<(u8, u8)>,
    pub channels: BTreeSet<u8>,
    pub tracks_used: BTreeSet<u8>,
    pub controllers: BTreeSet<u8>,
    pub controller_events: usize,
    pub pitch_bends: usize,
    pub pressure_events: usize,
    /// Tick just past the last note release (or last event)
    pub end_tick: u64,
}

/// Analyze a section and return a summary of what it contains.
pub fn analyze(section: &SectionOutput) -> SectionFeatures {
    let mut features = SectionFeatures::default();
    for event in &section.events {
        analyze_event(event, &mut features);
    }
    features
}

fn analyze_event(event: &MusicalEvent, features: &mut SectionFeatures) {
    features.channels.insert(event.channel());
    features.tracks_used.insert(event.track());
    let mut end = event.time() as u64;

    match *event {
        MusicalEvent::Note { note, duration, .. } => {
            features.total_notes += 1;
            features.note_range = Some(match features.note_range {
                Some((lo, hi)) => (lo.min(note), hi.max(note)),
                None => (note, note),
            });
            end += duration as u64;
        }
        MusicalEvent::Controller { controller, .. } => {
            features.controller_events += 1;
            features.controllers.insert(controller);
        }
        MusicalEvent::PitchBend { .. } => features.pitch_bends += 1,
        MusicalEvent::ChannelPressure { .. } => features.pressure_events += 1,
    }

    features.end_tick = features.end_tick.max(end);
}

impl fmt::Display for SectionFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Notes:    {} total", self.total_notes)?;
        if let Some((lo, hi)) = self.note_range {
            writeln!(f, "Range:    {} - {} (MIDI)", lo, hi)?;
        }
        if !self.channels.is_empty() {
            let chans: alloc::vec::Vec<alloc::string::String> =
                self.channels.iter().map(|c| alloc::format!("{}", c)).collect();
            writeln!(f, "Channels: {}", chans.join(", "))?;
        }
        writeln!(f, "Tracks:   {} used", self.tracks_used.len())?;
        if self.controllers.is_empty() {
            writeln!(f, "CCs:      (none)")?;
        } else {
            let ccs: alloc::vec::Vec<alloc::string::String> =
                self.controllers.iter().map(|c| alloc::format!("{}", c)).collect();
            writeln!(f, "CCs:      {} events ({})", self.controller_events, ccs.join(", "))?;
        }
        writeln!(
            f,
            "Bends:    {}, pressure: {}",
            self.pitch_bends, self.pressure_events
        )?;
        writeln!(f, "Length:   {} ticks", self.end_tick)
    }
}
