use crate::engine::dsp::osc::{Osc, Waveform};
use crate::engine::dsp::smooth::SmoothParam;
use crate::engine::effects::WetPath;

/// Amplitude tremolo. One shared LFO for both channels; the gain dips by
/// `depth` at the LFO peak and returns to unity at its trough, so depth 0 is
/// exactly transparent. Rate changes land on the live phase, never reset it.
pub struct Tremolo {
  osc: Osc,
  shape: Waveform,
  rate: f32,
  depth: SmoothParam,
}

impl Tremolo {
  pub fn new(sr: f32) -> Self {
    Self { osc: Osc::new(sr), shape: Waveform::Sine, rate: 5.0, depth: SmoothParam::new(sr, 0.6) }
  }
}

impl WetPath for Tremolo {
  fn set_param(&mut self, name: &str, value: f32) {
    match name {
      "rate" => self.rate = value,
      "depth" => self.depth.ramp_to(value, 0.02),
      "wave" => self.shape = Waveform::from_index(value.round() as i32),
      _ => {}
    }
  }

  fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    for i in 0..l.len().min(r.len()) {
      let m = 0.5 + 0.5 * self.osc.next(self.rate, self.shape);
      let g = 1.0 - self.depth.next() * m;
      l[i] *= g;
      r[i] *= g;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_depth_is_transparent() {
    let mut t = Tremolo::new(48_000.0);
    t.set_param("depth", 0.0);
    // let the depth ramp land
    let mut warm = vec![0.0f32; 9_600];
    let mut warm_r = warm.clone();
    t.process_block(&mut warm, &mut warm_r);
    let mut l = vec![0.25f32; 1_024];
    let mut r = vec![-0.25f32; 1_024];
    t.process_block(&mut l, &mut r);
    assert!(l.iter().all(|&v| (v - 0.25).abs() < 1e-3));
    assert!(r.iter().all(|&v| (v + 0.25).abs() < 1e-3));
  }

  #[test]
  fn full_depth_reaches_near_silence_and_unity() {
    let sr = 48_000.0;
    let mut t = Tremolo::new(sr);
    t.set_param("rate", 8.0);
    t.set_param("depth", 1.0);
    let n = sr as usize; // several LFO cycles
    let mut l = vec![1.0f32; n];
    let mut r = vec![1.0f32; n];
    t.process_block(&mut l, &mut r);
    let tail = &l[n / 2..];
    let min = tail.iter().fold(f32::MAX, |m, &v| m.min(v));
    let max = tail.iter().fold(f32::MIN, |m, &v| m.max(v));
    assert!(min < 0.05, "trough {min}");
    assert!(max > 0.95, "crest {max}");
  }
}
