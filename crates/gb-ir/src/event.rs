//! Musical events recovered from a command stream.

/// Lowest signed pitch bend value.
pub const PITCH_BEND_MIN: i16 = -8192;
/// Highest signed pitch bend value.
pub const PITCH_BEND_MAX: i16 = 8191;

/// One timed musical event.
///
/// `time` is in ticks. While the decoder works it holds the raw tick from
/// the stream; events handed to a sink are already section-relative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MusicalEvent {
    /// A note with its full duration.
    Note {
        time: u32,
        note: u8,
        velocity: u8,
        duration: u32,
        channel: u8,
        /// Output track chosen by the track assignment policy
        track: u8,
    },
    /// Control change.
    Controller {
        time: u32,
        controller: u8,
        value: u8,
        channel: u8,
    },
    /// Signed pitch bend, centre 0.
    PitchBend { time: u32, value: i16, channel: u8 },
    /// Channel (mono) aftertouch.
    ChannelPressure { time: u32, pressure: u8, channel: u8 },
}

impl MusicalEvent {
    /// Event time in ticks.
    pub const fn time(&self) -> u32 {
        match *self {
            Self::Note { time, .. }
            | Self::Controller { time, .. }
            | Self::PitchBend { time, .. }
            | Self::ChannelPressure { time, .. } => time,
        }
    }

    /// MIDI channel (0-15).
    pub const fn channel(&self) -> u8 {
        match *self {
            Self::Note { channel, .. }
            | Self::Controller { channel, .. }
            | Self::PitchBend { channel, .. }
            | Self::ChannelPressure { channel, .. } => channel,
        }
    }

    /// Output track. Only notes are spread across tracks; everything else
    /// lives on track 0.
    pub const fn track(&self) -> u8 {
        match *self {
            Self::Note { track, .. } => track,
            _ => 0,
        }
    }

    /// Same event moved to another time.
    pub const fn with_time(self, new_time: u32) -> Self {
        match self {
            Self::Note { note, velocity, duration, channel, track, .. } => Self::Note {
                time: new_time,
                note,
                velocity,
                duration,
                channel,
                track,
            },
            Self::Controller { controller, value, channel, .. } => Self::Controller {
                time: new_time,
                controller,
                value,
                channel,
            },
            Self::PitchBend { value, channel, .. } => Self::PitchBend {
                time: new_time,
                value,
                channel,
            },
            Self::ChannelPressure { pressure, channel, .. } => Self::ChannelPressure {
                time: new_time,
                pressure,
                channel,
            },
        }
    }

    /// Short name for summaries.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Note { .. } => "Note",
            Self::Controller { .. } => "Controller",
            Self::PitchBend { .. } => "PitchBend",
            Self::ChannelPressure { .. } => "ChannelPressure",
        }
    }
}
