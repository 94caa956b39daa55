pub mod engine {
  pub mod audio;
  pub mod chain;
  pub mod dsp;
  pub mod effects;
  pub mod error;
  pub mod messages;
}

pub use engine::audio::AudioEngine;
pub use engine::chain::Chain;
pub use engine::effects::{EffectKind, EffectUnit, ParamSpec, WetPath};
pub use engine::error::EngineError;
pub use engine::messages::EngineMsg;
