use crate::engine::dsp::envelope::{EnvMode, EnvelopeDetector};
use crate::engine::dsp::filter::Svf;
use crate::engine::effects::WetPath;
use crate::engine::error::EngineError;

// sweep floor; "range" moves the ceiling
const MIN_FREQ: f32 = 120.0;
// coefficient updates are throttled to control rate
const UPDATE_EVERY: u32 = 8;

/// Auto-wah: the input envelope sweeps a resonant low-pass upward. The
/// detector reads the wet-path input, so the sweep tracks picking dynamics
/// even when the mix is low.
pub struct EnvFilter {
  env: EnvelopeDetector,
  svf_l: Svf,
  svf_r: Svf,
  max_freq: f32,
  sensitivity: f32,
  q: f32,
  attack: f32,
  release: f32,
  sr: f32,
  countdown: u32,
}

impl EnvFilter {
  pub fn new(sr: f32) -> Result<Self, EngineError> {
    let mut env = EnvelopeDetector::new(sr)?;
    env.set_mode(EnvMode::Rms);
    env.set_times(0.01, 0.15);
    let mut f = Self {
      env,
      svf_l: Svf::new(),
      svf_r: Svf::new(),
      max_freq: 2_500.0,
      sensitivity: 0.8,
      q: 10.0,
      attack: 0.01,
      release: 0.15,
      sr,
      countdown: 0,
    };
    f.update_filters(0.0);
    Ok(f)
  }

  fn update_filters(&mut self, env: f32) {
    let fc = MIN_FREQ + env * (self.max_freq - MIN_FREQ) * self.sensitivity;
    self.svf_l.set_params(fc, self.q, self.sr);
    self.svf_r.set_params(fc, self.q, self.sr);
  }
}

impl WetPath for EnvFilter {
  fn set_param(&mut self, name: &str, value: f32) {
    match name {
      "sensitivity" => {
        self.sensitivity = value;
        self.env.set_sensitivity(1.0 + value * 3.0);
      }
      "resonance" => self.q = value,
      "range" => self.max_freq = value.max(MIN_FREQ + 1.0),
      "attack" => {
        self.attack = value;
        self.env.set_times(self.attack, self.release);
      }
      "release" => {
        self.release = value;
        self.env.set_times(self.attack, self.release);
      }
      _ => {}
    }
  }

  fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    for i in 0..l.len().min(r.len()) {
      let e = self.env.tick(l[i], r[i]);
      if self.countdown == 0 {
        self.update_filters(e);
        self.countdown = UPDATE_EVERY;
      }
      self.countdown -= 1;
      let (lp_l, _, _, _) = self.svf_l.process(l[i]);
      let (lp_r, _, _, _) = self.svf_r.process(r[i]);
      l[i] = lp_l;
      r[i] = lp_r;
    }
  }
}
