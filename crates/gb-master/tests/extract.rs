//! Extraction through the controller with an in-memory sink.

use gb_master::{
    section_to_smf, unwrap_plist, ExtractError, Extractor, SectionOutput, SectionSink, SmfSink,
};
use gb_formats::{DecodeErrorKind, DecoderConfig};
use base64::Engine as _;

#[derive(Default)]
struct Collect {
    sections: Vec<SectionOutput>,
}

impl SectionSink for Collect {
    fn write_section(&mut self, section: &SectionOutput) -> Result<(), ExtractError> {
        self.sections.push(section.clone());
        Ok(())
    }
}

fn record_header(record_type: u16, record_number: u32, midi_id: u32, data_length: u32) -> Vec<u8> {
    let mut buf = b"qeSM".to_vec();
    buf.extend_from_slice(&record_type.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&record_number.to_le_bytes());
    buf.extend_from_slice(&midi_id.to_le_bytes());
    buf.extend_from_slice(&[0; 10]);
    buf.extend_from_slice(&data_length.to_le_bytes());
    buf.extend_from_slice(&[0; 4]);
    buf
}

fn section(record_number: u32, midi_id: u32, name: &str) -> Vec<u8> {
    let mut buf = record_header(2, record_number, 0, 0);
    buf.extend_from_slice(&[0x64, 0x03, 0x41, 0, 0, 0, 0, 0]);
    buf.extend_from_slice(&midi_id.to_le_bytes());
    buf.extend_from_slice(&[0; 4]);
    buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf
}

fn data(record_number: u32, midi_id: u32, stream: &[u8]) -> Vec<u8> {
    let mut buf = record_header(1, record_number, midi_id, stream.len() as u32);
    buf.extend_from_slice(stream);
    buf
}

fn note_stream(time: u32, note: u8) -> Vec<u8> {
    let mut v = vec![0x90, 0, 0, 0];
    v.extend_from_slice(&time.to_le_bytes());
    v.extend_from_slice(&[0, 0, 0, 100, note, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x80]);
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&480u32.to_le_bytes());
    v.push(0xF1);
    v
}

fn payload() -> Vec<u8> {
    let mut buf = vec![0u8; 0x100];
    buf[0xAA..0xAD].copy_from_slice(&[0x80, 0x4F, 0x12]); // 120 BPM
    buf[0xFA] = 4;
    buf[0xFB] = 2;
    buf.extend(section(1, 100, "Intro/Theme #1"));
    buf.extend(data(1, 100, &note_stream(0x9600, 36)));
    buf.extend(section(2, 100, "Empty"));
    buf
}

#[test]
fn only_sections_with_events_reach_the_sink() {
    let mut sink = Collect::default();
    let extraction = Extractor::default().extract(&payload(), &mut sink).unwrap();
    assert_eq!(extraction.project.sections.len(), 2);
    assert_eq!(sink.sections.len(), 1);
    assert_eq!(sink.sections[0].file_name("mid"), "IntroTheme 1-1_100.mid");
    assert_eq!(sink.sections[0].events[0].time(), 0);
    assert_eq!(sink.sections[0].tempo.bpm, 120.0);
}

#[test]
fn plist_round_trip_into_midi_files() {
    let encoded = base64::engine::general_purpose::STANDARD.encode(payload());
    let xml = format!(
        "<?xml version=\"1.0\"?>\n<plist version=\"1.0\"><dict><key>NS.data</key><data>{}</data></dict></plist>",
        encoded
    );
    let decoded = unwrap_plist(&xml).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut sink = SmfSink::new(dir.path());
    let extraction = Extractor::default().extract(&decoded, &mut sink).unwrap();
    assert_eq!(extraction.written.len(), 1);
    let bytes = std::fs::read(&sink.written()[0]).unwrap();
    assert_eq!(bytes, section_to_smf(&extraction.project.outputs()[0]).unwrap());
}

#[test]
fn decode_failures_keep_their_kind() {
    let mut bad = payload();
    bad.extend(section(1, 100, "Again"));
    let err = Extractor::default().extract(&bad, &mut Collect::default()).unwrap_err();
    let decode = err.decode_error().expect("decode error");
    assert!(matches!(decode.kind(), DecodeErrorKind::DuplicateKey(_)));
}

#[test]
fn invalid_config_surfaces_as_decode_error() {
    let config = DecoderConfig { track_limit: Some(200), ..Default::default() };
    let err = Extractor::new(config).decode(&payload()).unwrap_err();
    assert!(matches!(
        err.decode_error().map(|e| e.kind()),
        Some(DecodeErrorKind::InvalidConfig(_))
    ));
}
