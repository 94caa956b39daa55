use std::f32::consts::{PI, TAU};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Waveform { Sine, Triangle, Square, Saw }

impl Waveform {
  pub fn from_index(i: i32) -> Self {
    match i { 1 => Waveform::Triangle, 2 => Waveform::Square, 3 => Waveform::Saw, _ => Waveform::Sine }
  }
}

// saturation steepness for the shaped square/saw edges
const SOFT_EDGE: f32 = 8.0;

/// Phase-accumulator oscillator. Phase is normalized cycles in [0,1) and
/// survives frequency changes untouched, so retuning never clicks.
#[derive(Clone)]
pub struct Osc {
  phase: f32,
  sr: f32,
}

impl Osc {
  pub fn new(sr: f32) -> Self { Self { phase: 0.0, sr } }

  #[inline]
  pub fn next(&mut self, freq: f32, shape: Waveform) -> f32 {
    let p = self.phase;
    self.phase = (self.phase + freq / self.sr).fract();
    Self::sample(p, shape)
  }

  /// Waveform value at normalized phase `p` in [0,1).
  /// Square and saw round their edges through a saturated sine instead of a
  /// hard step, which keeps aliasing down at modulation rates.
  #[inline]
  pub fn sample(p: f32, shape: Waveform) -> f32 {
    match shape {
      Waveform::Sine => (TAU * p).sin(),
      Waveform::Triangle => 4.0 * (p - 0.5).abs() - 1.0,
      Waveform::Square => (SOFT_EDGE * (TAU * p).sin()).tanh() / SOFT_EDGE.tanh(),
      Waveform::Saw => (2.0 * p - 1.0) * (SOFT_EDGE * (PI * p).sin()).tanh() / SOFT_EDGE.tanh(),
    }
  }

  #[inline] pub fn phase(&self) -> f32 { self.phase }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phase_survives_frequency_change() {
    let mut o = Osc::new(48_000.0);
    for _ in 0..100 { o.next(440.0, Waveform::Sine); }
    let before = o.phase();
    let y0 = Osc::sample(before, Waveform::Sine);
    // retune; next sample comes from the same phase, advanced by the new rate
    let y1 = o.next(880.0, Waveform::Sine);
    assert_eq!(y0, y1);
    assert!((o.phase() - (before + 880.0 / 48_000.0).fract()).abs() < 1e-6);
  }

  #[test]
  fn waveforms_stay_in_range_and_hit_extremes() {
    // the rounded saw trades its corners for band limiting, so its peaks sit lower
    for (shape, peak) in [
      (Waveform::Sine, 0.9),
      (Waveform::Triangle, 0.9),
      (Waveform::Square, 0.9),
      (Waveform::Saw, 0.75),
    ] {
      let mut min = f32::MAX;
      let mut max = f32::MIN;
      for n in 0..10_000 {
        let y = Osc::sample(n as f32 / 10_000.0, shape);
        assert!(y.abs() <= 1.0 + 1e-6);
        min = min.min(y);
        max = max.max(y);
      }
      assert!(max > peak && min < -peak);
    }
  }

  #[test]
  fn triangle_matches_reference_formula() {
    for &p in &[0.0, 0.25, 0.5, 0.75] {
      assert_eq!(Osc::sample(p, Waveform::Triangle), 4.0 * (p - 0.5f32).abs() - 1.0);
    }
  }
}
