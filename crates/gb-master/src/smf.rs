//! Standard MIDI File output.

use gb_ir::{MusicalEvent, SectionOutput, TICKS_PER_QUARTER};
use midly::num::{u14, u15, u24};
use midly::{Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, TrackEvent, TrackEventKind};
use std::io;
use std::path::{Path, PathBuf};

use crate::ExtractError;

/// MIDI clocks per metronome click in the time signature event.
const CLOCKS_PER_CLICK: u8 = 24;
/// Notated 32nd notes per MIDI quarter note.
const THIRTY_SECONDS_PER_QUARTER: u8 = 8;

/// Receives every section that produced events.
pub trait SectionSink {
    fn write_section(&mut self, section: &SectionOutput) -> Result<(), ExtractError>;
}

/// Writes one `.mid` file per section into a directory.
pub struct SmfSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl SmfSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), written: Vec::new() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl SectionSink for SmfSink {
    fn write_section(&mut self, section: &SectionOutput) -> Result<(), ExtractError> {
        let path = self.dir.join(section.file_name("mid"));
        log::info!("[GB] Writing MIDI to {}", path.display());
        let smf = build_smf(section);
        smf.save(&path)
            .map_err(|source| ExtractError::Write { path: path.clone(), source })?;
        self.written.push(path);
        Ok(())
    }
}

/// Encode a section as SMF bytes.
pub fn section_to_smf(section: &SectionOutput) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    build_smf(section).write_std(&mut buf)?;
    Ok(buf)
}

/// Parallel SMF with `track_count` tracks. Track 0 carries tempo, time
/// signature and every non-note event.
pub fn build_smf(section: &SectionOutput) -> Smf<'_> {
    let highest_track = section.events.iter().map(|e| e.track()).max().unwrap_or(0);
    let track_count = section.track_count.max(highest_track + 1).max(1) as usize;

    // (absolute tick, rank, kind); rank orders events sharing a tick
    let mut timed: Vec<Vec<(u32, u8, TrackEventKind<'_>)>> = vec![Vec::new(); track_count];

    let ts = section.time_signature;
    timed[0].push((0, 0, TrackEventKind::Meta(MetaMessage::TimeSignature(
        ts.numerator,
        ts.denominator_pow2,
        CLOCKS_PER_CLICK,
        THIRTY_SECONDS_PER_QUARTER,
    ))));
    timed[0].push((0, 0, TrackEventKind::Meta(MetaMessage::Tempo(u24::from(
        section.tempo.micros_per_quarter(),
    )))));
    for name in &section.track_names {
        let track = (name.track as usize).min(track_count - 1);
        timed[track].push((0, 0, TrackEventKind::Meta(MetaMessage::TrackName(name.name.as_bytes()))));
    }

    for event in &section.events {
        let track = event.track() as usize;
        let channel = event.channel().into();
        match *event {
            MusicalEvent::Note { time, note, velocity, duration, .. } => {
                timed[track].push((time, 2, TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn { key: note.into(), vel: velocity.into() },
                }));
                timed[track].push((time.saturating_add(duration), 1, TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff { key: note.into(), vel: 0.into() },
                }));
            }
            MusicalEvent::Controller { time, controller, value, .. } => {
                timed[track].push((time, 2, TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::Controller {
                        controller: controller.into(),
                        value: value.into(),
                    },
                }));
            }
            MusicalEvent::PitchBend { time, value, .. } => {
                let bend = u14::from((value as i32 + 8192) as u16);
                timed[track].push((time, 2, TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::PitchBend { bend: PitchBend(bend) },
                }));
            }
            MusicalEvent::ChannelPressure { time, pressure, .. } => {
                timed[track].push((time, 2, TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::ChannelAftertouch { vel: pressure.into() },
                }));
            }
        }
    }

    let tracks = timed.into_iter().map(to_track).collect();
    Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::from(TICKS_PER_QUARTER)),
        },
        tracks,
    }
}

/// Sort absolute-time events and convert them to deltas.
fn to_track(mut events: Vec<(u32, u8, TrackEventKind<'_>)>) -> Vec<TrackEvent<'_>> {
    events.sort_by_key(|&(tick, rank, _)| (tick, rank));
    let mut prev_tick = 0u32;
    let mut track: Vec<TrackEvent<'_>> = events
        .into_iter()
        .map(|(tick, _, kind)| {
            let delta = tick - prev_tick;
            prev_tick = tick;
            TrackEvent { delta: delta.into(), kind }
        })
        .collect();
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}
