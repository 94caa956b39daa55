use std::f32::consts::PI;

/// One-pole low-pass used for in-loop reverb damping and tone controls.
pub struct OnePoleLP { a: f32, y: f32 }

impl OnePoleLP {
  pub fn new() -> Self { Self { a: 0.5, y: 0.0 } }
  #[inline]
  pub fn set_cutoff(&mut self, fc: f32, sr: f32) {
    let fc = fc.clamp(20.0, sr * 0.45);
    self.a = 1.0 - (-2.0 * PI * fc / sr).exp();
  }
  #[inline] pub fn tick(&mut self, x: f32) -> f32 { self.y += self.a * (x - self.y); self.y }
  pub fn reset(&mut self) { self.y = 0.0; }
}

/// State-variable filter, Chamberlin/Zavalishin form. Returns all four outputs.
#[derive(Clone)]
pub struct Svf {
  ic1eq: f32,
  ic2eq: f32,
  g: f32,
  k: f32,
}

impl Svf {
  pub fn new() -> Self { Self { ic1eq: 0.0, ic2eq: 0.0, g: 0.1, k: 0.5 } }
  pub fn set_params(&mut self, cutoff: f32, q: f32, sr: f32) {
    let g = (PI * (cutoff / sr).clamp(0.0001, 0.49)).tan();
    self.g = g;
    self.k = 1.0 / q.max(0.001);
  }
  #[inline]
  pub fn process(&mut self, x: f32) -> (f32, f32, f32, f32) {
    let g = self.g; let k = self.k;
    let v0 = x;
    let v1 = (self.ic1eq + g * (v0 - self.ic2eq)) / (1.0 + g * (g + k));
    let v2 = self.ic2eq + g * v1;
    self.ic1eq = 2.0 * v1 - self.ic1eq;
    self.ic2eq = 2.0 * v2 - self.ic2eq;
    let lp = v2;
    let bp = v1;
    let hp = v0 - k * bp - lp;
    let notch = hp + lp;
    (lp, hp, bp, notch)
  }
}

// RBJ biquad, peaking only (spring reverb resonance)
#[derive(Clone, Copy)]
pub struct Biquad {
  b0: f32,
  b1: f32,
  b2: f32,
  a1: f32,
  a2: f32,
  z1: f32,
  z2: f32,
}

impl Biquad {
  pub fn new() -> Self { Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0, z1: 0.0, z2: 0.0 } }
  pub fn set_peaking(&mut self, sr: f32, freq: f32, q: f32, gain_db: f32) {
    // If near zero gain, bypass
    if gain_db.abs() < 1e-3 { self.b0=1.0; self.b1=0.0; self.b2=0.0; self.a1=0.0; self.a2=0.0; return; }
    let a = 10.0_f32.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * (freq / sr).clamp(0.0, 0.49);
    let alpha = w0.sin() / (2.0 * q.max(0.1));
    let cosw0 = w0.cos();
    let b0 = 1.0 + alpha * a;
    let b1 = -2.0 * cosw0;
    let b2 = 1.0 - alpha * a;
    let a0 = 1.0 + alpha / a;
    let a1 = -2.0 * cosw0;
    let a2 = 1.0 - alpha / a;
    // Normalize
    self.b0 = b0 / a0;
    self.b1 = b1 / a0;
    self.b2 = b2 / a0;
    self.a1 = a1 / a0;
    self.a2 = a2 / a0;
  }
  #[inline]
  pub fn process(&mut self, x: f32) -> f32 {
    let y = self.b0 * x + self.z1;
    self.z1 = self.b1 * x - self.a1 * y + self.z2;
    self.z2 = self.b2 * x - self.a2 * y;
    y
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn one_pole_settles_on_dc() {
    let mut lp = OnePoleLP::new();
    lp.set_cutoff(1000.0, 48_000.0);
    let mut y = 0.0;
    for _ in 0..48_000 { y = lp.tick(1.0); }
    assert!((y - 1.0).abs() < 1e-4);
  }

  #[test]
  fn svf_lowpass_attenuates_high_band() {
    let mut svf = Svf::new();
    svf.set_params(500.0, 0.707, 48_000.0);
    // feed a 10kHz sine, expect strong attenuation on the LP output
    let mut peak = 0.0f32;
    for n in 0..48_000 {
      let x = (std::f32::consts::TAU * 10_000.0 * n as f32 / 48_000.0).sin();
      let (lp, _, _, _) = svf.process(x);
      if n > 4_800 { peak = peak.max(lp.abs()); }
    }
    assert!(peak < 0.05, "lp leak {peak}");
  }
}
