//! Error taxonomy for the decoder.
//!
//! Every error carries the byte offset into the payload where decoding
//! stopped. There is no recovery: a desynchronised cursor would silently
//! corrupt every later record, so callers abort the whole run.

use alloc::string::String;
use alloc::vec::Vec;
use gb_ir::SectionKey;
use thiserror::Error;

use crate::hexdump::hexdump;

/// Errors that stop a decode.
#[derive(Debug, Error)]
#[error("decoding at byte offset {offset:#x}: {kind}")]
pub struct DecodeError {
    offset: u64,
    kind: DecodeErrorKind,
}

/// What went wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A read would run past the end of the payload.
    #[error("read of {requested_bits} bits past end of buffer ({available_bits} bits left)")]
    OutOfBounds {
        requested_bits: u64,
        available_bits: u64,
    },
    /// The command stream would consume more than the record declares.
    #[error("went past end of record: {needed_bytes} bytes needed, {declared_bytes} declared")]
    BufferOverrun {
        needed_bytes: u64,
        declared_bytes: u32,
    },
    /// Two section headers share one key.
    #[error("found second section record for key {0}")]
    DuplicateKey(SectionKey),
    /// A known opcode range that is not allowed here, or a required
    /// follow-up byte that did not arrive.
    #[error("unexpected command {opcode:#04x} ({reason})")]
    UnexpectedCommand { opcode: u8, reason: &'static str },
    /// Opcode outside every modelled range.
    #[error("unrecognised command {opcode:#04x}")]
    UnrecognizedCommand {
        opcode: u8,
        context: CommandContext,
    },
    /// Channel pressure carried two different values.
    #[error("pressure value A ({value_a}) != pressure value B ({value_b})")]
    InconsistentPressureValue { value_a: u8, value_b: u8 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Bytes surrounding an unrecognised command, kept for manual inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Byte offset of `bytes[0]` in the payload
    pub start: u64,
    pub bytes: Vec<u8>,
}

impl CommandContext {
    /// Hex dump of the captured window.
    pub fn dump(&self) -> String {
        hexdump(&self.bytes, self.start)
    }
}

impl DecodeError {
    pub const fn new(offset: u64, kind: DecodeErrorKind) -> Self {
        Self { offset, kind }
    }

    /// Byte offset where decoding stopped.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    pub const fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::OutOfBounds { .. })
    }

    /// Captured bytes around the failure, when the error carries them.
    pub fn context(&self) -> Option<&CommandContext> {
        match &self.kind {
            DecodeErrorKind::UnrecognizedCommand { context, .. } => Some(context),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::new(0, DecodeErrorKind::InvalidConfig(message.into()))
    }
}
