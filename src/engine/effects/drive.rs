use crate::engine::dsp::filter::OnePoleLP;
use crate::engine::dsp::smooth::SmoothParam;
use crate::engine::dsp::waveshaper::{ClipMode, CurveParams, Waveshaper};
use crate::engine::effects::WetPath;

// gain ramps are short; the curve swap itself is instantaneous
const GAIN_TAU: f32 = 0.01;

/// Shared wet path for the two saturation pedals. Pre-gain into a static
/// transfer curve, one-pole tone, post-gain. Overdrive and Distortion differ
/// only in their curve character and gain staging.
pub struct Drive {
  ws: Waveshaper,
  curve: CurveParams,
  pre_per_drive: f32,
  pre: SmoothParam,
  post: SmoothParam,
  tone_l: OnePoleLP,
  tone_r: OnePoleLP,
  sr: f32,
}

impl Drive {
  fn with_curve(sr: f32, curve: CurveParams, pre_per_drive: f32, post: f32, tone_hz: f32) -> Self {
    let mut tone_l = OnePoleLP::new();
    let mut tone_r = OnePoleLP::new();
    tone_l.set_cutoff(tone_hz, sr);
    tone_r.set_cutoff(tone_hz, sr);
    let pre0 = 1.0 + (curve.drive / 100.0) * pre_per_drive;
    Self {
      ws: Waveshaper::new(&curve),
      curve,
      pre_per_drive,
      pre: SmoothParam::new(sr, pre0),
      post: SmoothParam::new(sr, post),
      tone_l,
      tone_r,
      sr,
    }
  }

  pub fn overdrive(sr: f32) -> Self {
    let curve = CurveParams { drive: 50.0, asymmetry: 12.0, harmonics: 1.0, hardness: 35.0, mode: ClipMode::Soft };
    Self::with_curve(sr, curve, 9.0, 0.56, 2_000.0)
  }

  pub fn distortion(sr: f32) -> Self {
    let curve = CurveParams { drive: 50.0, asymmetry: 5.0, harmonics: 0.4, hardness: 75.0, mode: ClipMode::Hard };
    Self::with_curve(sr, curve, 14.0, 0.35, 3_000.0)
  }
}

impl WetPath for Drive {
  fn set_param(&mut self, name: &str, value: f32) {
    match name {
      "drive" => {
        self.curve.drive = value;
        self.ws.set_params(&self.curve);
        self.pre.ramp_to(1.0 + (value / 100.0) * self.pre_per_drive, GAIN_TAU);
      }
      "tone" => {
        self.tone_l.set_cutoff(value, self.sr);
        self.tone_r.set_cutoff(value, self.sr);
      }
      "level" => self.post.ramp_to(value, GAIN_TAU),
      _ => {}
    }
  }

  fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    for i in 0..l.len().min(r.len()) {
      let pre = self.pre.next();
      let post = self.post.next();
      l[i] = self.tone_l.tick(self.ws.shape(l[i] * pre)) * post;
      r[i] = self.tone_r.tick(self.ws.shape(r[i] * pre)) * post;
    }
  }
}
