use std::f32::consts::TAU;

/// Dual-grain pitch shifter: two read heads a half grain apart, Hann
/// cross-faded, overlap-added. Good enough for a shimmer feedback path;
/// not a general-purpose transposer.
pub struct GrainShifter {
  buf: Vec<f32>,
  wr: usize,
  read0: f32,
  read1: f32,
  grain_phase: f32,
  grain_samples: f32,
  ratio: f32,
}

impl GrainShifter {
  pub fn new(sr: f32, grain_ms: f32, semitones: f32) -> Self {
    let grain = ((grain_ms.clamp(20.0, 100.0) / 1000.0) * sr).floor().max(128.0);
    let len = (grain as usize) * 4;
    Self {
      buf: vec![0.0; len],
      wr: 0,
      read0: 0.0,
      read1: grain * 0.5,
      grain_phase: 0.0,
      grain_samples: grain,
      ratio: (2.0f32).powf(semitones / 12.0),
    }
  }

  pub fn set_semitones(&mut self, st: f32) {
    self.ratio = (2.0f32).powf(st.clamp(-24.0, 24.0) / 12.0);
  }

  #[inline]
  fn hann(phase: f32) -> f32 { 0.5 * (1.0 - (TAU * phase).cos()) }

  #[inline]
  fn read_lerp(&self, idx: f32) -> f32 {
    let len = self.buf.len() as i32;
    let i0 = idx.floor() as i32;
    let frac = idx - i0 as f32;
    let wrap = |i: i32| -> usize { ((i % len + len) % len) as usize };
    let s0 = self.buf[wrap(i0)];
    let s1 = self.buf[wrap(i0 + 1)];
    s0 + (s1 - s0) * frac
  }

  #[inline]
  pub fn tick(&mut self, x: f32) -> f32 {
    self.buf[self.wr] = x;
    let len = self.buf.len() as f32;

    let w0 = Self::hann(self.grain_phase);
    let w1 = Self::hann((self.grain_phase + 0.5).fract());
    let y = self.read_lerp(self.read0) * w0 + self.read_lerp(self.read1) * w1;

    self.read0 += self.ratio;
    self.read1 += self.ratio;
    if self.read0 >= len { self.read0 -= len; }
    if self.read1 >= len { self.read1 -= len; }

    self.grain_phase += 1.0 / self.grain_samples;
    if self.grain_phase >= 1.0 {
      self.grain_phase -= 1.0;
      // re-anchor head 0 behind the write position, head 1 stays offset
      let mut r0 = self.wr as f32 - self.grain_samples;
      if r0 < 0.0 { r0 += len; }
      self.read0 = r0;
      self.read1 = (r0 + self.grain_samples * 0.5) % len;
    }

    self.wr += 1;
    if self.wr >= self.buf.len() { self.wr = 0; }
    y
  }
}
