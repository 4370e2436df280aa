//! The command stream state machine.
//!
//! A data record's payload is a flat run of commands, each one opcode byte
//! followed by a fixed-size body. The opcode's high nibble selects the
//! command family and the low nibble usually carries the MIDI channel. There
//! are no lengths in the stream, so every family must consume exactly its
//! known shape or the cursor desynchronises.

use core::fmt;

use gb_ir::{MusicalEvent, PITCH_BEND_MAX, PITCH_BEND_MIN};

use crate::assembler::RecordAssembler;
use crate::cursor::BitCursor;
use crate::error::{CommandContext, DecodeError, DecodeErrorKind};
use crate::record::RecordHeader;

/// Bytes of the standard command body after the opcode.
const SHORT_BODY: u64 = 15;
/// Bytes of a note body: note-on shape, padding, note-off byte,
/// extended value and duration.
const NOTE_BODY: u64 = 31;
/// Bytes captured before an unrecognised opcode for diagnostics.
const CONTEXT_BEFORE: u64 = 64;
const CONTEXT_AFTER: u64 = 4;

/// Tag bytes seen inside internal/UI commands.
const KNOWN_UI_TAGS: [u8; 3] = [0xA7, 0xA8, 0xB5];

/// Command family selected by an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `0x90-0x9F`, always followed by a `0x8x` note-off shape.
    NoteOn { channel: u8 },
    /// `0x00-0x0A`, `0xFF`: UI state, no music.
    Internal,
    /// `0x20-0x2F`
    BankSelect,
    /// `0x40`
    Sustain,
    /// `0x50`, general purpose knobs.
    GeneralPurpose,
    /// `0x51-0x5F` have not been seen per channel and are rejected.
    UnvalidatedGeneralPurpose,
    /// `0x70-0x7F`, left behind by manual drum edits.
    DrumEdit,
    /// `0x80-0x8F` without a preceding note-on.
    StandaloneNoteOff,
    /// `0xA0-0xAF`, recognised but not translated.
    PolyPressure,
    /// `0xB0-0xBF`
    Controller { channel: u8 },
    /// `0xC0-0xCF`, not a program change in practice.
    ProgramLike,
    /// `0xD0-0xDF`
    ChannelPressure { channel: u8 },
    /// `0xE0-0xEF`
    PitchBend { channel: u8 },
    /// `0xF1`
    End,
    /// `0x30-0x3F`, `0x60`, `0x11`, `0x12`: the rest of the record is layout
    /// data.
    LayoutReset,
}

impl Command {
    /// `None` for opcodes outside every known range.
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        let channel = opcode & 0x0F;
        let command = match opcode {
            0x00..=0x0A | 0xFF => Self::Internal,
            0x11 | 0x12 | 0x30..=0x3F | 0x60 => Self::LayoutReset,
            0x20..=0x2F => Self::BankSelect,
            0x40 => Self::Sustain,
            0x50 => Self::GeneralPurpose,
            0x51..=0x5F => Self::UnvalidatedGeneralPurpose,
            0x70..=0x7F => Self::DrumEdit,
            0x80..=0x8F => Self::StandaloneNoteOff,
            0x90..=0x9F => Self::NoteOn { channel },
            0xA0..=0xAF => Self::PolyPressure,
            0xB0..=0xBF => Self::Controller { channel },
            0xC0..=0xCF => Self::ProgramLike,
            0xD0..=0xDF => Self::ChannelPressure { channel },
            0xE0..=0xEF => Self::PitchBend { channel },
            0xF1 => Self::End,
            _ => return None,
        };
        Some(command)
    }

    /// Body size in bytes, not counting the opcode.
    pub const fn body_len(self) -> u64 {
        match self {
            Self::NoteOn { .. } | Self::DrumEdit => NOTE_BODY,
            Self::End | Self::LayoutReset | Self::UnvalidatedGeneralPurpose => 0,
            _ => SHORT_BODY,
        }
    }
}

/// The shared 15-byte shape carrying a time and two values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TwoPartValue {
    pub time: u32,
    pub value_a: u8,
    pub value_b: u8,
}

impl TwoPartValue {
    pub fn read(cursor: &mut BitCursor) -> Result<Self, DecodeError> {
        cursor.skip_bytes(3)?;
        let time = cursor.read_u32_le()?;
        cursor.skip_bytes(3)?;
        let value_a = cursor.read_u8()?;
        let value_b = cursor.read_u8()?;
        cursor.skip_bytes(3)?;
        Ok(Self { time, value_a, value_b })
    }
}

/// Signed pitch bend from two 7-bit halves, centre 0.
pub fn pitch_bend_value(value_a: u8, value_b: u8) -> i16 {
    let raw = (((value_a & 0x7F) as i16) << 7) | (value_b & 0x7F) as i16;
    raw - 8192
}

/// Scale a bend, saturating at the 14-bit range.
pub fn scale_pitch_bend(value: i16, multiplier: i32) -> i16 {
    (value as i32)
        .saturating_mul(multiplier)
        .clamp(PITCH_BEND_MIN as i32, PITCH_BEND_MAX as i32) as i16
}

/// Per-record decode switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Turn controller, pressure and bend commands into events.
    pub extended_controllers: bool,
    /// Scale factor for pitch bends in this record.
    pub pitch_bend_multiplier: Option<i32>,
    /// Log every command.
    pub trace: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            extended_controllers: true,
            pitch_bend_multiplier: None,
            trace: false,
        }
    }
}

/// Why a record's command loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// `0xF1`
    Sentinel,
    /// A layout opcode; the rest of the record was not examined.
    LayoutReset,
    /// The declared length was used up exactly.
    DeclaredLength,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sentinel => "end marker",
            Self::LayoutReset => "layout data",
            Self::DeclaredLength => "declared length",
        })
    }
}

/// Counters for one record, or summed over a whole project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub records: u32,
    pub commands: u64,
    pub notes: u64,
    pub duplicates_suppressed: u64,
    pub other_events: u64,
    /// Polyphonic pressure commands have no event to become.
    pub unsupported_poly_pressure: u64,
    pub unknown_ui_tags: u64,
    /// Commands consumed without producing anything.
    pub skipped: u64,
    pub ended_by_sentinel: u32,
    pub ended_by_layout_reset: u32,
    pub ended_by_length: u32,
}

impl DecodeStats {
    pub fn merge(&mut self, other: &DecodeStats) {
        self.records += other.records;
        self.commands += other.commands;
        self.notes += other.notes;
        self.duplicates_suppressed += other.duplicates_suppressed;
        self.other_events += other.other_events;
        self.unsupported_poly_pressure += other.unsupported_poly_pressure;
        self.unknown_ui_tags += other.unknown_ui_tags;
        self.skipped += other.skipped;
        self.ended_by_sentinel += other.ended_by_sentinel;
        self.ended_by_layout_reset += other.ended_by_layout_reset;
        self.ended_by_length += other.ended_by_length;
    }

    fn record_end(&mut self, reason: EndReason) {
        self.records += 1;
        match reason {
            EndReason::Sentinel => self.ended_by_sentinel += 1,
            EndReason::LayoutReset => self.ended_by_layout_reset += 1,
            EndReason::DeclaredLength => self.ended_by_length += 1,
        }
    }
}

impl fmt::Display for DecodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} commands, {} notes ({} duplicates dropped), {} other events",
            self.records, self.commands, self.notes, self.duplicates_suppressed, self.other_events
        )?;
        if self.unsupported_poly_pressure > 0 {
            write!(f, ", {} poly pressure unsupported", self.unsupported_poly_pressure)?;
        }
        if self.unknown_ui_tags > 0 {
            write!(f, ", {} unknown UI tags", self.unknown_ui_tags)?;
        }
        Ok(())
    }
}

/// Result of decoding one data record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordSummary {
    pub end: EndReason,
    /// Bytes consumed from the start of the command stream
    pub consumed_bytes: u64,
    pub stats: DecodeStats,
}

/// Decodes one data record's command stream.
pub struct CommandStreamDecoder<'a, 'b> {
    cursor: &'b mut BitCursor<'a>,
    data_start: u64,
    declared_bytes: u32,
    options: DecodeOptions,
    stats: DecodeStats,
}

impl<'a, 'b> CommandStreamDecoder<'a, 'b> {
    /// Position the cursor at the record's command stream.
    pub fn new(
        cursor: &'b mut BitCursor<'a>,
        header: &RecordHeader,
        options: DecodeOptions,
    ) -> Result<Self, DecodeError> {
        cursor.seek(header.payload_start)?;
        Ok(Self {
            cursor,
            data_start: header.payload_start,
            declared_bytes: header.data_length,
            options,
            stats: DecodeStats::default(),
        })
    }

    fn used_bits(&self) -> u64 {
        self.cursor.position() - self.data_start
    }

    fn declared_bits(&self) -> u64 {
        self.declared_bytes as u64 * 8
    }

    /// Run the loop until the record ends, feeding events to `assembler`.
    ///
    /// The final position is either exactly `data_start + declared length`
    /// or earlier when a sentinel or layout opcode stops the loop; a command
    /// that would cross the declared length is rejected before its body is
    /// read.
    pub fn decode(mut self, assembler: &mut RecordAssembler) -> Result<RecordSummary, DecodeError> {
        let end = loop {
            let used = self.used_bits();
            if self.options.trace {
                log::trace!("[GB] Buffer used so far: {} of {} bits", used, self.declared_bits());
            }
            if used >= self.declared_bits() {
                log::debug!("[GB] Used full buffer");
                break EndReason::DeclaredLength;
            }

            let offset = self.cursor.byte_position();
            let opcode = self.cursor.read_u8()?;
            let Some(command) = Command::from_opcode(opcode) else {
                return Err(self.unrecognized(opcode, offset));
            };
            let needed = used + (1 + command.body_len()) * 8;
            if needed > self.declared_bits() {
                return Err(DecodeError::new(
                    offset,
                    DecodeErrorKind::BufferOverrun {
                        needed_bytes: needed / 8,
                        declared_bytes: self.declared_bytes,
                    },
                ));
            }
            self.stats.commands += 1;
            if self.options.trace {
                log::trace!("[GB] {:#x}: command {:#04x} {:?}", offset, opcode, command);
            }

            if let Some(end) = self.step(opcode, command, offset, assembler)? {
                break end;
            }
        };
        self.stats.record_end(end);
        Ok(RecordSummary {
            end,
            consumed_bytes: self.used_bits() / 8,
            stats: self.stats,
        })
    }

    /// Consume one command body. Returns the end reason for terminators.
    fn step(
        &mut self,
        opcode: u8,
        command: Command,
        offset: u64,
        assembler: &mut RecordAssembler,
    ) -> Result<Option<EndReason>, DecodeError> {
        match command {
            Command::NoteOn { channel } => self.note(channel, assembler)?,
            Command::Internal => {
                self.cursor.skip_bytes(6)?;
                let tag = self.cursor.read_u8()?;
                if !KNOWN_UI_TAGS.contains(&tag) {
                    log::debug!("[GB] Unknown UI tag {:#04x} at {:#x}", tag, offset);
                    self.stats.unknown_ui_tags += 1;
                }
                self.cursor.skip_bytes(8)?;
                self.stats.skipped += 1;
            }
            Command::GeneralPurpose => {
                // Looks like a program change for synth patches, but the
                // host ignores it when replayed that way.
                TwoPartValue::read(self.cursor)?;
                self.stats.skipped += 1;
            }
            Command::UnvalidatedGeneralPurpose => {
                return Err(DecodeError::new(
                    offset,
                    DecodeErrorKind::UnexpectedCommand {
                        opcode,
                        reason: "only 0x50 is known in the 0x5x range",
                    },
                ));
            }
            Command::PolyPressure => {
                log::debug!("[GB] Polyphonic key pressure {:#04x} is unsupported", opcode);
                self.stats.unsupported_poly_pressure += 1;
                self.cursor.skip_bytes(command.body_len())?;
            }
            Command::BankSelect
            | Command::Sustain
            | Command::DrumEdit
            | Command::StandaloneNoteOff
            | Command::ProgramLike => {
                self.cursor.skip_bytes(command.body_len())?;
                self.stats.skipped += 1;
            }
            Command::Controller { channel } => {
                let v = TwoPartValue::read(self.cursor)?;
                self.emit(assembler, MusicalEvent::Controller {
                    time: v.time,
                    controller: v.value_b,
                    value: v.value_a,
                    channel,
                });
            }
            Command::ChannelPressure { channel } => {
                let v = TwoPartValue::read(self.cursor)?;
                if self.options.extended_controllers && v.value_a != v.value_b {
                    return Err(DecodeError::new(
                        offset,
                        DecodeErrorKind::InconsistentPressureValue {
                            value_a: v.value_a,
                            value_b: v.value_b,
                        },
                    ));
                }
                self.emit(assembler, MusicalEvent::ChannelPressure {
                    time: v.time,
                    pressure: v.value_a,
                    channel,
                });
            }
            Command::PitchBend { channel } => {
                let v = TwoPartValue::read(self.cursor)?;
                let mut value = pitch_bend_value(v.value_a, v.value_b);
                if let Some(multiplier) = self.options.pitch_bend_multiplier {
                    value = scale_pitch_bend(value, multiplier);
                    log::trace!("[GB] Adjusted pitch bend is {}", value);
                }
                self.emit(assembler, MusicalEvent::PitchBend { time: v.time, value, channel });
            }
            Command::End => {
                log::debug!("[GB] Found end of buffer");
                return Ok(Some(EndReason::Sentinel));
            }
            Command::LayoutReset => {
                log::debug!("[GB] Layout bytes {:#04x}, skipping rest of record", opcode);
                return Ok(Some(EndReason::LayoutReset));
            }
        }
        Ok(None)
    }

    /// Note-on body, the mandatory note-off shape, then the duration.
    fn note(&mut self, channel: u8, assembler: &mut RecordAssembler) -> Result<(), DecodeError> {
        self.cursor.skip_bytes(3)?;
        let time = self.cursor.read_u32_le()?;
        self.cursor.skip_bytes(3)?;
        let velocity = self.cursor.read_u8()?;
        let note = self.cursor.read_u8()?;
        let _unknown = self.cursor.read_u24_le()?;
        self.cursor.skip_bytes(7)?;

        let follow_offset = self.cursor.byte_position();
        let follow = self.cursor.read_u8()?;
        if !(0x80..=0x8F).contains(&follow) {
            return Err(DecodeError::new(
                follow_offset,
                DecodeErrorKind::UnexpectedCommand {
                    opcode: follow,
                    reason: "note-on not followed by 0x8x",
                },
            ));
        }
        let extended = self.cursor.read_u32_le()?;
        let duration = self.cursor.read_u32_le()?;
        if extended > 0 {
            log::debug!("[GB] Found extended bytes {:#x}", extended);
        }

        if assembler.push_note(time, note, velocity, duration, channel) {
            self.stats.notes += 1;
        } else {
            self.stats.duplicates_suppressed += 1;
        }
        Ok(())
    }

    fn emit(&mut self, assembler: &mut RecordAssembler, event: MusicalEvent) {
        if self.options.extended_controllers {
            assembler.push(event);
            self.stats.other_events += 1;
        } else {
            self.stats.skipped += 1;
        }
    }

    fn unrecognized(&self, opcode: u8, offset: u64) -> DecodeError {
        let start = offset.saturating_sub(CONTEXT_BEFORE);
        let len = (offset - start + CONTEXT_AFTER) as usize;
        let context = CommandContext {
            start,
            bytes: self.cursor.window(start, len).to_vec(),
        };
        DecodeError::new(offset, DecodeErrorKind::UnrecognizedCommand { opcode, context })
    }
}
