//! Decoder for MIDI regions stored in GarageBand project payloads.
//!
//! The payload (the `NS.data` blob of a project's `projectData` property
//! list) has no directory. Records are found by scanning for magic markers;
//! section headers name a region and data records carry its command stream.
//! [`decode_project`] runs the whole pipeline and returns every section with
//! its events.

mod assembler;
mod command;
mod config;
mod cursor;
mod error;
mod hexdump;
mod project;
mod record;
mod scan;
mod section;

pub use assembler::{RecordAssembler, TrackAssignment};
pub use command::{
    pitch_bend_value, scale_pitch_bend, Command, CommandStreamDecoder, DecodeOptions,
    DecodeStats, EndReason, RecordSummary, TwoPartValue,
};
pub use config::{default_note_names, DecoderConfig, DEFAULT_BASE_TIME, MAX_TRACKS};
pub use cursor::{BitCursor, ByteOrder, UintWidth};
pub use error::{CommandContext, DecodeError, DecodeErrorKind};
pub use hexdump::hexdump;
pub use project::{
    decode_project, decode_project_with, read_song_metadata, Project, RecordCensus,
    TEMPO_OFFSET_BITS, TIME_SIGNATURE_OFFSET_BITS,
};
pub use record::{BlockTag, RecordHeader, RecordKind, RecordType, SectionBody, HEADER_LEN, SECTION_TAGS};
pub use scan::{find_all, scan_offsets, Marker, ACTIVE_MARKERS, DORMANT_MARKERS};
pub use section::{sanitize_label, SectionRecord, SectionTable};

extern crate alloc;
