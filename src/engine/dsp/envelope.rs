use crate::engine::error::EngineError;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum EnvMode { Rms, Peak }

/// Block-synchronous envelope follower. Rectifies across channels, smooths
/// with a one-pole whose coefficient switches between attack and release
/// depending on signal direction. Output always lands in [0,1].
pub struct EnvelopeDetector {
  mode: EnvMode,
  sensitivity: f32,
  atk_coeff: f32,
  rel_coeff: f32,
  rms_a: f32,
  rms: f32,
  peak: f32,
  env: f32,
  sr: f32,
}

// floor for degenerate attack/release times
const MIN_TAU: f32 = 0.001;
// rate-invariant RMS window (seconds)
const RMS_WINDOW: f32 = 0.010;

impl EnvelopeDetector {
  pub fn new(sr: f32) -> Result<Self, EngineError> {
    if !(sr.is_finite() && sr > 0.0) { return Err(EngineError::BadSampleRate(sr)); }
    let mut d = Self {
      mode: EnvMode::Rms,
      sensitivity: 1.0,
      atk_coeff: 0.0,
      rel_coeff: 0.0,
      rms_a: (-1.0 / (RMS_WINDOW * sr)).exp(),
      rms: 0.0,
      peak: 0.0,
      env: 0.0,
      sr,
    };
    d.set_times(0.01, 0.1);
    Ok(d)
  }

  pub fn set_mode(&mut self, mode: EnvMode) { self.mode = mode; }
  pub fn set_sensitivity(&mut self, s: f32) { self.sensitivity = s.clamp(0.1, 10.0); }
  pub fn set_times(&mut self, attack: f32, release: f32) {
    let atk = attack.max(MIN_TAU);
    let rel = release.max(MIN_TAU);
    self.atk_coeff = (-1.0 / (atk * self.sr)).exp();
    self.rel_coeff = (-1.0 / (rel * self.sr)).exp();
  }
  #[inline] pub fn value(&self) -> f32 { self.env }

  #[inline]
  pub fn tick(&mut self, l: f32, r: f32) -> f32 {
    // rectify across channels
    let det = (l * self.sensitivity).abs().max((r * self.sensitivity).abs());
    let level = match self.mode {
      EnvMode::Rms => {
        let a = self.rms_a;
        self.rms = (a * self.rms * self.rms + (1.0 - a) * det * det + 1e-12).sqrt();
        self.rms
      }
      EnvMode::Peak => {
        self.peak = det.max(self.peak * 0.999);
        self.peak
      }
    };
    let coeff = if level > self.env { self.atk_coeff } else { self.rel_coeff };
    self.env = level + (self.env - level) * coeff;
    self.env = self.env.clamp(0.0, 1.0);
    self.env
  }

  pub fn process_block(&mut self, l: &[f32], r: &[f32], out: &mut [f32]) {
    for i in 0..l.len().min(r.len()).min(out.len()) {
      out[i] = self.tick(l[i], r[i]);
    }
  }
}
