use serde::Deserialize;

use crate::engine::effects::EffectKind;

/// Control-plane messages, UI thread to audio thread. Everything the board
/// can do at runtime goes through this enum; the audio callback drains it
/// non-blocking between blocks.
#[derive(Clone, Debug, Deserialize)]
pub enum EngineMsg {
  AddEffect { kind: EffectKind },
  RemoveEffect { index: usize },
  MoveEffect { from: usize, to: usize },
  SetParam { index: usize, name: String, value: f32 },
  SetBypassed { index: usize, bypassed: bool },
  Quit,
}
