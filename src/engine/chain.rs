use crate::engine::effects::{EffectKind, EffectUnit};
use crate::engine::error::EngineError;

/// Ordered series of effect units. The board processes one stereo block
/// through every unit in index order; reordering is a Vec move, no graph
/// rebuild.
pub struct Chain {
  units: Vec<EffectUnit>,
  sr: f32,
}

impl Chain {
  pub fn new(sr: f32) -> Result<Self, EngineError> {
    if !(sr.is_finite() && sr > 0.0) { return Err(EngineError::BadSampleRate(sr)); }
    Ok(Self { units: Vec::new(), sr })
  }

  pub fn sample_rate(&self) -> f32 { self.sr }
  pub fn len(&self) -> usize { self.units.len() }
  pub fn is_empty(&self) -> bool { self.units.is_empty() }
  pub fn unit(&self, index: usize) -> Option<&EffectUnit> { self.units.get(index) }
  pub fn unit_mut(&mut self, index: usize) -> Option<&mut EffectUnit> { self.units.get_mut(index) }

  /// Append a new unit with its default knob settings; returns its index.
  /// Allocates; control-thread use only.
  pub fn add(&mut self, kind: EffectKind) -> Result<usize, EngineError> {
    let unit = EffectUnit::new(kind, self.sr)?;
    self.units.push(unit);
    Ok(self.units.len() - 1)
  }

  /// Append a unit built elsewhere. The audio callback uses this so unit
  /// construction stays off the real-time thread.
  pub fn push(&mut self, unit: EffectUnit) {
    self.units.push(unit);
  }

  /// Detach a unit without dropping it, so the caller can hand it to a
  /// non-real-time thread for disposal.
  pub fn take(&mut self, index: usize) -> Option<EffectUnit> {
    if index < self.units.len() {
      Some(self.units.remove(index))
    } else {
      log::debug!("chain: remove out of range ({index} >= {})", self.units.len());
      None
    }
  }

  pub fn remove(&mut self, index: usize) {
    let _ = self.take(index);
  }

  pub fn move_effect(&mut self, from: usize, to: usize) {
    let n = self.units.len();
    if from >= n || to >= n || from == to { return; }
    let unit = self.units.remove(from);
    self.units.insert(to, unit);
  }

  pub fn set_parameter(&mut self, index: usize, name: &str, value: f32) {
    if let Some(unit) = self.units.get_mut(index) {
      unit.set_parameter(name, value);
    }
  }

  pub fn set_bypassed(&mut self, index: usize, bypassed: bool) {
    if let Some(unit) = self.units.get_mut(index) {
      unit.set_bypassed(bypassed);
    }
  }

  pub fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    for unit in self.units.iter_mut() {
      unit.process_block(l, r);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SR: f32 = 48_000.0;

  #[test]
  fn empty_chain_is_identity() {
    let mut chain = Chain::new(SR).unwrap();
    let src: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin()).collect();
    let mut l = src.clone();
    let mut r = src.clone();
    chain.process_block(&mut l, &mut r);
    assert_eq!(l, src);
    assert_eq!(r, src);
  }

  #[test]
  fn order_changes_the_sound() {
    // drive->tremolo and tremolo->drive are audibly different chains
    let render = |first: EffectKind, second: EffectKind| -> Vec<f32> {
      let mut chain = Chain::new(SR).unwrap();
      chain.add(first).unwrap();
      chain.add(second).unwrap();
      chain.set_parameter(0, "depth", 100.0);
      chain.set_parameter(1, "depth", 100.0);
      chain.set_parameter(0, "drive", 90.0);
      chain.set_parameter(1, "drive", 90.0);
      let n = 9_600;
      let mut l: Vec<f32> = (0..n).map(|i| 0.7 * (std::f32::consts::TAU * 220.0 * i as f32 / SR).sin()).collect();
      let mut r = l.clone();
      chain.process_block(&mut l, &mut r);
      l
    };
    let a = render(EffectKind::Overdrive, EffectKind::Tremolo);
    let b = render(EffectKind::Tremolo, EffectKind::Overdrive);
    let diff: f32 = a.iter().zip(&b).map(|(x, y)| (x - y).abs()).sum();
    assert!(diff > 1.0, "orders produced near-identical output ({diff})");
  }

  #[test]
  fn move_effect_reorders_in_place() {
    let mut chain = Chain::new(SR).unwrap();
    chain.add(EffectKind::Overdrive).unwrap();
    chain.add(EffectKind::Tremolo).unwrap();
    chain.add(EffectKind::HallReverb).unwrap();
    chain.move_effect(2, 0);
    assert_eq!(chain.unit(0).unwrap().kind(), EffectKind::HallReverb);
    assert_eq!(chain.unit(1).unwrap().kind(), EffectKind::Overdrive);
    assert_eq!(chain.unit(2).unwrap().kind(), EffectKind::Tremolo);
    // out-of-range moves and removes are no-ops
    chain.move_effect(0, 9);
    chain.remove(9);
    assert_eq!(chain.len(), 3);
  }

  #[test]
  fn out_of_range_indices_are_ignored() {
    let mut chain = Chain::new(SR).unwrap();
    chain.add(EffectKind::Tremolo).unwrap();
    chain.set_parameter(5, "rate", 50.0);
    chain.set_bypassed(5, true);
    let mut l = vec![0.1f32; 256];
    let mut r = vec![0.1f32; 256];
    chain.process_block(&mut l, &mut r);
    assert!(l.iter().all(|v| v.is_finite()));
  }

  #[test]
  fn rejects_bad_sample_rate() {
    assert!(Chain::new(0.0).is_err());
    assert!(Chain::new(f32::NAN).is_err());
  }
}
