//! Song-wide tempo and meter.

/// Resolution used when handing events to a MIDI sink.
pub const TICKS_PER_QUARTER: u16 = 960;

/// Tempo in beats per minute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tempo {
    pub bpm: f64,
}

impl Tempo {
    /// Scale applied to the stored fixed-point tempo field.
    pub const FIXED_POINT_SCALE: f64 = 10_000.0;

    /// Build from the 24-bit fixed-point value stored in the project header.
    pub fn from_fixed_point(raw: u32) -> Self {
        Self { bpm: raw as f64 / Self::FIXED_POINT_SCALE }
    }

    /// Microseconds per quarter note, as stored in a MIDI tempo meta event.
    ///
    /// A zero or negative tempo falls back to 120 BPM.
    pub fn micros_per_quarter(self) -> u32 {
        if self.bpm <= 0.0 {
            return 500_000;
        }
        let micros = (60_000_000.0 / self.bpm) as u64;
        micros.min(0x00FF_FFFF) as u32
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

/// Time signature with the denominator stored as a power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator_pow2: u8,
}

impl TimeSignature {
    pub const fn new(numerator: u8, denominator_pow2: u8) -> Self {
        Self { numerator, denominator_pow2 }
    }

    /// Denominator as a note value (4 for quarter notes), saturating on
    /// nonsense exponents.
    pub fn denominator(self) -> u32 {
        1u32.checked_shl(self.denominator_pow2 as u32).unwrap_or(u32::MAX)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_from_fixed_point() {
        let t = Tempo::from_fixed_point(1_200_000);
        assert!((t.bpm - 120.0).abs() < 1e-9);
        assert_eq!(t.micros_per_quarter(), 500_000);
    }

    #[test]
    fn zero_tempo_falls_back() {
        assert_eq!(Tempo::from_fixed_point(0).micros_per_quarter(), 500_000);
    }

    #[test]
    fn denominator_from_exponent() {
        assert_eq!(TimeSignature::new(6, 3).denominator(), 8);
        assert_eq!(TimeSignature::default().denominator(), 4);
        assert_eq!(TimeSignature::new(4, 200).denominator(), u32::MAX);
    }
}
