//! Core IR types for gbextract.
//!
//! This crate defines the representation shared by the decoder and the
//! output sinks. The decoder emits [`MusicalEvent`]s grouped per
//! [`SectionOutput`]; sinks consume them without knowing anything about
//! the container format.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod analysis;
mod event;
mod section;
mod timing;

pub use analysis::{analyze, SectionFeatures};
pub use event::{MusicalEvent, PITCH_BEND_MAX, PITCH_BEND_MIN};
pub use section::{SectionKey, SectionOutput, TrackName};
pub use timing::{Tempo, TimeSignature, TICKS_PER_QUARTER};
