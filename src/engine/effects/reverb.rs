use crate::engine::dsp::reverb::{FdnReverb, ReverbPreset};
use crate::engine::effects::WetPath;
use crate::engine::error::EngineError;

/// Thin wet-path adapter over the comb/allpass core. All six pedals share
/// this type; the preset picks the tuning tables and the variant behavior.
pub struct ReverbUnit {
  core: FdnReverb,
}

impl ReverbUnit {
  pub fn new(preset: ReverbPreset, sr: f32) -> Result<Self, EngineError> {
    Ok(Self { core: FdnReverb::new(preset, sr)? })
  }
}

impl WetPath for ReverbUnit {
  fn set_param(&mut self, name: &str, value: f32) {
    match name {
      "size" => self.core.set_size(value),
      "decay" => self.core.set_decay(value),
      "tone" => self.core.set_damping(value),
      "predelay" => self.core.set_predelay_ms(value),
      "diffusion" => self.core.set_diffusion(value),
      "shimmer" => self.core.set_shimmer_amount(value),
      _ => {}
    }
  }

  fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    self.core.process_block(l, r);
  }
}
