//! Whole-payload decode: song metadata, marker scan, record dispatch.

use alloc::vec::Vec;
use gb_ir::{SectionKey, SectionOutput, Tempo, TimeSignature};

use crate::assembler::RecordAssembler;
use crate::command::{CommandStreamDecoder, DecodeOptions, DecodeStats};
use crate::config::DecoderConfig;
use crate::cursor::BitCursor;
use crate::error::DecodeError;
use crate::hexdump::hexdump;
use crate::record::{RecordHeader, RecordKind};
use crate::scan::scan_offsets;
use crate::section::{SectionRecord, SectionTable};

/// Bit offset of the 24-bit fixed-point tempo.
pub const TEMPO_OFFSET_BITS: u64 = 0x550;
/// Bit offset of the time signature numerator and denominator exponent.
pub const TIME_SIGNATURE_OFFSET_BITS: u64 = 0x7D0;

/// Bytes of payload dumped when tracing starts.
const TRACE_HEAD_BYTES: usize = 0x800;
const TRACE_RECORD_BYTES: usize = 64;

/// How the scanned records were handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordCensus {
    pub offsets: usize,
    pub sections: u32,
    pub data_records: u32,
    /// Data records with no section header for their key
    pub orphan_data_records: u32,
    pub ignored: u32,
}

/// A decoded project payload.
#[derive(Debug)]
pub struct Project {
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    /// Sections in the order their headers were found
    pub sections: Vec<SectionRecord>,
    pub records: RecordCensus,
    pub stats: DecodeStats,
}

impl Project {
    /// Per-section output for sinks, in discovery order.
    pub fn outputs(&self) -> Vec<SectionOutput> {
        self.sections
            .iter()
            .map(|s| s.to_output(self.tempo, self.time_signature))
            .collect()
    }

    pub fn section(&self, key: SectionKey) -> Option<&SectionRecord> {
        self.sections.iter().find(|s| s.key == key)
    }
}

/// Read tempo and time signature from their fixed positions.
pub fn read_song_metadata(cursor: &mut BitCursor) -> Result<(Tempo, TimeSignature), DecodeError> {
    cursor.seek(TEMPO_OFFSET_BITS)?;
    let raw_tempo = cursor.read_u24_le()?;
    let tempo = Tempo::from_fixed_point(raw_tempo);
    log::info!("[GB] Tempo BPM is {} ({:#x})", tempo.bpm, raw_tempo);

    cursor.seek(TIME_SIGNATURE_OFFSET_BITS)?;
    let numerator = cursor.read_u8()?;
    let denominator_pow2 = cursor.read_u8()?;
    let time_signature = TimeSignature::new(numerator, denominator_pow2);
    log::info!(
        "[GB] Time signature is {}/{}",
        numerator,
        time_signature.denominator()
    );
    Ok((tempo, time_signature))
}

/// Decode a payload, applying the pitch bend override to every section
/// when it is enabled.
pub fn decode_project(buffer: &[u8], config: &DecoderConfig) -> Result<Project, DecodeError> {
    decode_project_with(buffer, config, |_| true)
}

/// Decode a payload. `bend_override` is asked, per section label, whether
/// the configured pitch bend multiplier applies.
pub fn decode_project_with<F>(
    buffer: &[u8],
    config: &DecoderConfig,
    mut bend_override: F,
) -> Result<Project, DecodeError>
where
    F: FnMut(&str) -> bool,
{
    config.validate()?;
    let mut cursor = BitCursor::new(buffer);
    if config.debug_trace {
        log::trace!("[GB] Payload head:\n{}", hexdump(cursor.window(0, TRACE_HEAD_BYTES), 0));
    }

    let (tempo, time_signature) = read_song_metadata(&mut cursor)?;
    let offsets = scan_offsets(buffer, &config.markers());
    log::debug!("[GB] {} record offsets", offsets.len());

    let mut table = SectionTable::new();
    let mut stats = DecodeStats::default();
    let mut records = RecordCensus { offsets: offsets.len(), ..Default::default() };

    for &offset in &offsets {
        let (header, tag) = RecordHeader::parse_at(&mut cursor, offset)?;
        if config.debug_trace {
            log::trace!(
                "[GB] Byte offset {:#x}: type {:?} record {} MIDI id {} length {}\n{}",
                offset / 8,
                header.record_type,
                header.record_number,
                header.midi_id,
                header.data_length,
                hexdump(cursor.window(offset / 8, TRACE_RECORD_BYTES), offset / 8)
            );
        }

        match header.classify(&tag) {
            RecordKind::Section => {
                table.register_section(&header, &mut cursor)?;
                records.sections += 1;
            }
            RecordKind::Data => {
                let Some(section) = table.lookup(header.record_number, header.midi_id) else {
                    log::debug!("[GB] No section for data record {}", header.data_key());
                    records.orphan_data_records += 1;
                    continue;
                };
                records.data_records += 1;
                log::debug!("[GB] Found MIDI data for section {}", section.label);

                let pitch_bend_multiplier = (config.pitch_bend_override
                    && bend_override(&section.label))
                .then_some(config.pitch_bend_multiplier);
                let options = DecodeOptions {
                    extended_controllers: config.extended_controllers,
                    pitch_bend_multiplier,
                    trace: config.debug_trace,
                };

                let mut assembler = RecordAssembler::new(section, config);
                let summary = CommandStreamDecoder::new(&mut cursor, &header, options)?
                    .decode(&mut assembler)?;
                log::debug!(
                    "[GB] Section {}: {} commands, stopped at {}",
                    section.label,
                    summary.stats.commands,
                    summary.end
                );
                assembler.finish(section);
                stats.merge(&summary.stats);
            }
            RecordKind::Ignored => records.ignored += 1,
        }
    }

    for section in table.iter() {
        log::debug!("[GB] Key {} with value {}", section.key, section.label);
    }
    Ok(Project {
        tempo,
        time_signature,
        sections: table.into_records(),
        records,
        stats,
    })
}
