//! End-to-end decodes of synthetic project payloads.

use gb_formats::{
    decode_project, decode_project_with, DecodeErrorKind, DecoderConfig, TEMPO_OFFSET_BITS,
};
use gb_ir::{MusicalEvent, SectionKey, TimeSignature};
use pretty_assertions::assert_eq;

/// Builds a payload: fixed song header followed by records.
struct PayloadBuilder {
    buf: Vec<u8>,
}

impl PayloadBuilder {
    fn new() -> Self {
        let mut buf = vec![0u8; 0x100];
        let tempo = (TEMPO_OFFSET_BITS / 8) as usize;
        buf[tempo..tempo + 3].copy_from_slice(&900_000u32.to_le_bytes()[..3]);
        buf[0xFA] = 6;
        buf[0xFB] = 3;
        Self { buf }
    }

    fn header(&mut self, record_type: u16, record_number: u32, midi_id: u32, data_length: u32) {
        self.buf.extend_from_slice(b"qSvE");
        self.buf.extend_from_slice(&record_type.to_le_bytes());
        self.buf.extend_from_slice(&0u32.to_le_bytes());
        self.buf.extend_from_slice(&record_number.to_le_bytes());
        self.buf.extend_from_slice(&midi_id.to_le_bytes());
        self.buf.extend_from_slice(&[0; 10]);
        self.buf.extend_from_slice(&data_length.to_le_bytes());
        self.buf.extend_from_slice(&[0; 4]);
    }

    fn section(mut self, record_number: u32, midi_id: u32, name: &str) -> Self {
        self.header(2, record_number, 0, 0);
        self.buf.extend_from_slice(&[0x2E, 0x03, 0x41]);
        self.buf.extend_from_slice(&[0; 5]);
        self.buf.extend_from_slice(&midi_id.to_le_bytes());
        self.buf.extend_from_slice(&[0; 4]);
        self.buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(name.as_bytes());
        self
    }

    fn data(self, record_number: u32, midi_id: u32, stream: &[u8]) -> Self {
        self.data_declared(record_number, midi_id, stream, stream.len() as u32)
    }

    fn data_declared(mut self, record_number: u32, midi_id: u32, stream: &[u8], declared: u32) -> Self {
        self.header(1, record_number, midi_id, declared);
        self.buf.extend_from_slice(stream);
        self
    }

    fn build(self) -> Vec<u8> {
        self.buf
    }
}

fn note(channel: u8, time: u32, velocity: u8, note: u8, duration: u32) -> Vec<u8> {
    let mut v = vec![0x90 | channel, 0, 0, 0];
    v.extend_from_slice(&time.to_le_bytes());
    v.extend_from_slice(&[0, 0, 0, velocity, note, 0, 0, 0]);
    v.extend_from_slice(&[0; 7]);
    v.push(0x80 | channel);
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&duration.to_le_bytes());
    v
}

fn two_part(opcode: u8, time: u32, a: u8, b: u8) -> Vec<u8> {
    let mut v = vec![opcode, 0x40, 0, 0];
    v.extend_from_slice(&time.to_le_bytes());
    v.extend_from_slice(&[0, 0, 0, a, b, 0, 0, 1]);
    v
}

fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.concat()
}

fn zero_base() -> DecoderConfig {
    DecoderConfig { base_time: Some(0), ..Default::default() }
}

#[test]
fn single_drum_note_attaches_to_section() {
    let stream = concat(&[note(0, 1000, 100, 36, 480), vec![0xF1]]);
    let payload = PayloadBuilder::new()
        .section(1, 100, "Drums")
        .data(1, 100, &stream)
        .build();

    let project = decode_project(&payload, &zero_base()).unwrap();
    assert_eq!(project.tempo.bpm, 90.0);
    assert_eq!(project.time_signature, TimeSignature::new(6, 3));
    assert_eq!(project.sections.len(), 1);

    let drums = project.section(SectionKey::new(1, 100)).unwrap();
    assert_eq!(drums.label, "Drums");
    assert!(drums.has_events);
    assert_eq!(
        drums.events,
        vec![MusicalEvent::Note {
            time: 1000,
            note: 36,
            velocity: 100,
            duration: 480,
            channel: 0,
            track: 0,
        }]
    );
    assert_eq!(project.stats.ended_by_sentinel, 1);
    assert_eq!(project.outputs()[0].file_name("mid"), "Drums-1_100.mid");
}

#[test]
fn default_base_time_is_subtracted() {
    let stream = note(9, 0x9600 + 960, 80, 38, 120);
    let payload = PayloadBuilder::new()
        .section(4, 7, "Beat")
        .data(4, 7, &stream)
        .build();
    let project = decode_project(&payload, &DecoderConfig::default()).unwrap();
    let events = &project.sections[0].events;
    assert_eq!(events[0].time(), 960);
    assert_eq!(events[0].channel(), 9);
    assert_eq!(project.stats.ended_by_length, 1);
}

#[test]
fn repeated_note_is_emitted_once() {
    let stream = concat(&[note(0, 10, 90, 40, 5), note(0, 10, 90, 40, 5), vec![0xF1]]);
    let payload = PayloadBuilder::new()
        .section(1, 1, "Keys")
        .data(1, 1, &stream)
        .build();
    let project = decode_project(&payload, &zero_base()).unwrap();
    assert_eq!(project.sections[0].events.len(), 1);
    assert_eq!(project.stats.duplicates_suppressed, 1);
}

#[test]
fn duplicate_section_header_aborts() {
    let payload = PayloadBuilder::new()
        .section(2, 5, "Verse")
        .section(2, 5, "Verse again")
        .build();
    let err = decode_project(&payload, &zero_base()).unwrap_err();
    assert_eq!(err.kind(), &DecodeErrorKind::DuplicateKey(SectionKey::new(2, 5)));
}

#[test]
fn data_without_section_is_skipped() {
    let payload = PayloadBuilder::new()
        .section(1, 1, "Bass")
        .data(9, 9, &[0xF1, 0, 0])
        .build();
    let project = decode_project(&payload, &zero_base()).unwrap();
    assert_eq!(project.records.orphan_data_records, 1);
    assert!(!project.sections[0].has_events);
}

#[test]
fn declared_length_too_short_overruns() {
    let stream = note(0, 0, 1, 60, 1);
    let payload = PayloadBuilder::new()
        .section(1, 1, "Lead")
        .data_declared(1, 1, &stream, 20)
        .build();
    let err = decode_project(&payload, &zero_base()).unwrap_err();
    assert!(matches!(
        err.kind(),
        DecodeErrorKind::BufferOverrun { needed_bytes: 32, declared_bytes: 20 }
    ));
}

#[test]
fn pressure_mismatch_aborts() {
    let stream = two_part(0xD5, 0, 0x1F, 0x20);
    let payload = PayloadBuilder::new()
        .section(1, 1, "Pad")
        .data(1, 1, &stream)
        .build();
    let err = decode_project(&payload, &zero_base()).unwrap_err();
    assert_eq!(
        err.kind(),
        &DecodeErrorKind::InconsistentPressureValue { value_a: 0x1F, value_b: 0x20 }
    );
}

#[test]
fn controllers_pressure_and_bends() {
    let stream = concat(&[
        two_part(0xB0, 100, 0x7F, 0x40),
        two_part(0xD3, 110, 0x1F, 0x1F),
        two_part(0xE4, 120, 0x00, 0x00),
        two_part(0xE4, 130, 0x7F, 0x7F),
        vec![0xF1],
    ]);
    let payload = PayloadBuilder::new()
        .section(3, 2, "Synth")
        .data(3, 2, &stream)
        .build();
    let project = decode_project(&payload, &zero_base()).unwrap();
    assert_eq!(
        project.sections[0].events,
        vec![
            MusicalEvent::Controller { time: 100, controller: 0x40, value: 0x7F, channel: 0 },
            MusicalEvent::ChannelPressure { time: 110, pressure: 0x1F, channel: 3 },
            MusicalEvent::PitchBend { time: 120, value: -8192, channel: 4 },
            MusicalEvent::PitchBend { time: 130, value: 8191, channel: 4 },
        ]
    );
}

#[test]
fn pitch_bend_override_follows_selector() {
    let stream = concat(&[two_part(0xE0, 0, 0x40, 0x17), vec![0xF1]]);
    let payload = PayloadBuilder::new()
        .section(1, 1, "Guitar")
        .data(1, 1, &stream)
        .section(2, 1, "Grand Piano")
        .data(2, 1, &stream)
        .build();
    let config = DecoderConfig { pitch_bend_override: true, ..zero_base() };

    let project =
        decode_project_with(&payload, &config, |label| config.pitch_bend_applies_to(label)).unwrap();
    let bends: Vec<i16> = project
        .sections
        .iter()
        .map(|s| match s.events[0] {
            MusicalEvent::PitchBend { value, .. } => value,
            other => panic!("expected pitch bend, got {:?}", other),
        })
        .collect();
    assert_eq!(bends, [23, 552]);
}

#[test]
fn unique_tracks_split_drum_notes() {
    let stream = concat(&[
        note(9, 0, 100, 36, 10),
        note(9, 10, 100, 38, 10),
        note(9, 20, 100, 42, 10),
        note(9, 30, 100, 36, 10),
        vec![0xF1],
    ]);
    let payload = PayloadBuilder::new()
        .section(1, 100, "Drums")
        .data(1, 100, &stream)
        .build();
    let config = DecoderConfig { unique_tracks: true, track_limit: Some(2), ..zero_base() };
    let project = decode_project(&payload, &config).unwrap();
    let tracks: Vec<u8> = project.sections[0].events.iter().map(|e| e.track()).collect();
    assert_eq!(tracks, [0, 1, 0, 0]);

    let output = &project.outputs()[0];
    assert_eq!(output.track_count, 2);
    assert_eq!(output.track_name(1), Some("Snare_Drums-1_100_Snare"));
}

#[test]
fn unrecognized_command_carries_context() {
    let stream = concat(&[two_part(0x20, 0, 0, 0), vec![0x45, 1, 2, 3, 4]]);
    let payload = PayloadBuilder::new()
        .section(1, 1, "X")
        .data(1, 1, &stream)
        .build();
    let err = decode_project(&payload, &zero_base()).unwrap_err();
    let context = err.context().expect("context");
    assert_eq!(context.start, err.offset() - 64);
    assert_eq!(context.bytes[64], 0x45);
    assert!(context.dump().contains("45 01 02 03"));
}

#[test]
fn layout_bytes_end_record_cleanly() {
    let stream = concat(&[note(0, 5, 1, 50, 1), vec![0x60, 0xDE, 0xAD]]);
    let payload = PayloadBuilder::new()
        .section(1, 1, "Y")
        .data(1, 1, &stream)
        .build();
    let project = decode_project(&payload, &zero_base()).unwrap();
    assert_eq!(project.stats.ended_by_layout_reset, 1);
    assert!(project.sections[0].has_events);
    assert_eq!(project.stats.ended_by_sentinel, 0);
}
