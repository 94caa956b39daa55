pub mod drive;
pub mod envfilter;
pub mod reverb;
pub mod tremolo;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::dsp::smooth::LinearFade;
use crate::engine::error::EngineError;

use drive::Drive;
use envfilter::EnvFilter;
use reverb::ReverbUnit;
use tremolo::Tremolo;

/// A wet-path strategy: the DSP blocks a given pedal wires together.
/// Units differ only in which blocks they compose, so this is a trait
/// object inside `EffectUnit`, not a subclass hierarchy.
pub trait WetPath: Send {
  /// `value` arrives already mapped into natural units by the descriptor table.
  fn set_param(&mut self, name: &str, value: f32);
  fn process_block(&mut self, l: &mut [f32], r: &mut [f32]);
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Taper { Lin, Log }

/// Tagged parameter descriptor: knob range is always 0..100, `lo..hi` is the
/// natural range it maps into. Resolved once at construction, no string
/// dispatch in the hot path beyond the control-rate setter.
pub struct ParamSpec {
  pub name: &'static str,
  pub lo: f32,
  pub hi: f32,
  /// default knob position, 0..100
  pub default: f32,
  pub taper: Taper,
}

impl ParamSpec {
  const fn lin(name: &'static str, lo: f32, hi: f32, default: f32) -> Self {
    Self { name, lo, hi, default, taper: Taper::Lin }
  }
  const fn log(name: &'static str, lo: f32, hi: f32, default: f32) -> Self {
    Self { name, lo, hi, default, taper: Taper::Log }
  }
  pub fn map(&self, knob: f32) -> f32 {
    let t = knob.clamp(0.0, 100.0) / 100.0;
    match self.taper {
      Taper::Lin => self.lo + t * (self.hi - self.lo),
      Taper::Log => self.lo * (self.hi / self.lo).powf(t),
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EffectKind {
  #[serde(rename = "overdrive")] Overdrive,
  #[serde(rename = "distortion")] Distortion,
  #[serde(rename = "tremolo")] Tremolo,
  #[serde(rename = "envfilter")] EnvelopeFilter,
  #[serde(rename = "roomreverb")] RoomReverb,
  #[serde(rename = "hallreverb")] HallReverb,
  #[serde(rename = "platereverb")] PlateReverb,
  #[serde(rename = "springreverb")] SpringReverb,
  #[serde(rename = "shimmerreverb")] ShimmerReverb,
  #[serde(rename = "gatedreverb")] GatedReverb,
}

const OVERDRIVE_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("drive", 0.0, 100.0, 50.0),
  ParamSpec::lin("tone", 500.0, 4000.0, 50.0),
  ParamSpec::lin("level", 0.0, 0.8, 70.0),
  ParamSpec::lin("mix", 0.0, 1.0, 100.0),
];

const DISTORTION_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("drive", 0.0, 100.0, 50.0),
  ParamSpec::lin("tone", 500.0, 5000.0, 55.0),
  ParamSpec::lin("level", 0.0, 1.0, 35.0),
  ParamSpec::lin("mix", 0.0, 1.0, 100.0),
];

const TREMOLO_PARAMS: &[ParamSpec] = &[
  ParamSpec::log("rate", 0.5, 12.0, 40.0),
  ParamSpec::lin("depth", 0.0, 1.0, 60.0),
  ParamSpec::lin("wave", 0.0, 3.0, 0.0),
  ParamSpec::lin("mix", 0.0, 1.0, 100.0),
];

const ENVFILTER_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("sensitivity", 0.0, 1.0, 80.0),
  ParamSpec::lin("resonance", 1.0, 20.0, 47.0),
  ParamSpec::log("range", 500.0, 5000.0, 70.0),
  ParamSpec::lin("attack", 0.001, 0.1, 9.0),
  ParamSpec::lin("release", 0.01, 0.5, 28.0),
  ParamSpec::lin("mix", 0.0, 1.0, 80.0),
];

// Reverb knob defaults are chosen so that mapping them lands on each
// preset's native tuning (its feedback and damping cutoff); a shared table
// here would flatten the pedals into one generic room.
const ROOM_REVERB_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("size", 0.0, 1.0, 50.0),
  ParamSpec::lin("decay", 0.0, 1.0, 40.0), // fb 0.70
  ParamSpec::log("tone", 500.0, 12000.0, 69.1), // 4500 Hz
  ParamSpec::lin("predelay", 0.0, 250.0, 0.0),
  ParamSpec::lin("diffusion", 0.0, 1.0, 73.0),
  ParamSpec::lin("mix", 0.0, 1.0, 35.0),
];

const HALL_REVERB_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("size", 0.0, 1.0, 50.0),
  ParamSpec::lin("decay", 0.0, 1.0, 53.3), // fb 0.88
  ParamSpec::log("tone", 500.0, 12000.0, 83.0), // 7000 Hz
  ParamSpec::lin("predelay", 0.0, 250.0, 0.0),
  ParamSpec::lin("diffusion", 0.0, 1.0, 73.0),
  ParamSpec::lin("mix", 0.0, 1.0, 40.0),
];

const PLATE_REVERB_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("size", 0.0, 1.0, 50.0),
  ParamSpec::lin("decay", 0.0, 1.0, 62.5), // fb 0.86
  ParamSpec::log("tone", 500.0, 12000.0, 91.0), // 9000 Hz
  ParamSpec::lin("predelay", 0.0, 250.0, 0.0),
  ParamSpec::lin("diffusion", 0.0, 1.0, 73.0),
  ParamSpec::lin("mix", 0.0, 1.0, 30.0),
];

const SPRING_REVERB_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("size", 0.0, 1.0, 50.0),
  ParamSpec::lin("decay", 0.0, 1.0, 60.0), // fb 0.78
  ParamSpec::log("tone", 500.0, 12000.0, 56.4), // 3000 Hz
  ParamSpec::lin("predelay", 0.0, 250.0, 0.0),
  ParamSpec::lin("diffusion", 0.0, 1.0, 73.0),
  ParamSpec::lin("mix", 0.0, 1.0, 35.0),
];

const SHIMMER_REVERB_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("size", 0.0, 1.0, 50.0),
  ParamSpec::lin("decay", 0.0, 1.0, 50.0), // fb 0.86
  ParamSpec::log("tone", 500.0, 12000.0, 87.2), // 8000 Hz
  ParamSpec::lin("predelay", 0.0, 250.0, 0.0),
  ParamSpec::lin("diffusion", 0.0, 1.0, 73.0),
  ParamSpec::lin("shimmer", 0.0, 1.0, 40.0),
  ParamSpec::lin("mix", 0.0, 1.0, 40.0),
];

const GATED_REVERB_PARAMS: &[ParamSpec] = &[
  ParamSpec::lin("size", 0.0, 1.0, 50.0),
  ParamSpec::lin("decay", 0.0, 1.0, 50.0), // fb 0.82
  ParamSpec::log("tone", 500.0, 12000.0, 78.2), // 6000 Hz
  ParamSpec::lin("predelay", 0.0, 250.0, 0.0),
  ParamSpec::lin("diffusion", 0.0, 1.0, 73.0),
  ParamSpec::lin("mix", 0.0, 1.0, 35.0),
];

impl EffectKind {
  pub fn label(self) -> &'static str {
    match self {
      EffectKind::Overdrive => "Overdrive",
      EffectKind::Distortion => "Distortion",
      EffectKind::Tremolo => "Tremolo",
      EffectKind::EnvelopeFilter => "Envelope Filter",
      EffectKind::RoomReverb => "Room Reverb",
      EffectKind::HallReverb => "Hall Reverb",
      EffectKind::PlateReverb => "Plate Reverb",
      EffectKind::SpringReverb => "Spring Reverb",
      EffectKind::ShimmerReverb => "Shimmer Reverb",
      EffectKind::GatedReverb => "Gated Reverb",
    }
  }

  pub fn param_specs(self) -> &'static [ParamSpec] {
    match self {
      EffectKind::Overdrive => OVERDRIVE_PARAMS,
      EffectKind::Distortion => DISTORTION_PARAMS,
      EffectKind::Tremolo => TREMOLO_PARAMS,
      EffectKind::EnvelopeFilter => ENVFILTER_PARAMS,
      EffectKind::RoomReverb => ROOM_REVERB_PARAMS,
      EffectKind::HallReverb => HALL_REVERB_PARAMS,
      EffectKind::PlateReverb => PLATE_REVERB_PARAMS,
      EffectKind::SpringReverb => SPRING_REVERB_PARAMS,
      EffectKind::ShimmerReverb => SHIMMER_REVERB_PARAMS,
      EffectKind::GatedReverb => GATED_REVERB_PARAMS,
    }
  }

  fn build_wet_path(self, sr: f32) -> Result<Box<dyn WetPath>, EngineError> {
    use crate::engine::dsp::reverb::ReverbPreset;
    Ok(match self {
      EffectKind::Overdrive => Box::new(Drive::overdrive(sr)),
      EffectKind::Distortion => Box::new(Drive::distortion(sr)),
      EffectKind::Tremolo => Box::new(Tremolo::new(sr)),
      EffectKind::EnvelopeFilter => Box::new(EnvFilter::new(sr)?),
      EffectKind::RoomReverb => Box::new(ReverbUnit::new(ReverbPreset::Room, sr)?),
      EffectKind::HallReverb => Box::new(ReverbUnit::new(ReverbPreset::Hall, sr)?),
      EffectKind::PlateReverb => Box::new(ReverbUnit::new(ReverbPreset::Plate, sr)?),
      EffectKind::SpringReverb => Box::new(ReverbUnit::new(ReverbPreset::Spring, sr)?),
      EffectKind::ShimmerReverb => Box::new(ReverbUnit::new(ReverbPreset::Shimmer, sr)?),
      EffectKind::GatedReverb => Box::new(ReverbUnit::new(ReverbPreset::Gated, sr)?),
    })
  }
}

// bypass/mix crossfade length
const FADE_S: f32 = 0.02;
// scratch capacity; longer host blocks are processed in chunks
const MAX_BLOCK: usize = 4096;

/// One node in the signal chain. Owns a wet-path strategy and the wet/dry
/// gains. The dry path is never disconnected, only faded, so toggling bypass
/// mid-stream needs no graph surgery and cannot click.
pub struct EffectUnit {
  kind: EffectKind,
  wet: Box<dyn WetPath>,
  specs: &'static [ParamSpec],
  knobs: HashMap<String, f32>,
  bypassed: bool,
  mix: f32,
  wet_gain: LinearFade,
  dry_gain: LinearFade,
  sr: f32,
  scratch_l: Vec<f32>,
  scratch_r: Vec<f32>,
}

impl EffectUnit {
  pub fn new(kind: EffectKind, sr: f32) -> Result<Self, EngineError> {
    if !(sr.is_finite() && sr > 0.0) { return Err(EngineError::BadSampleRate(sr)); }
    let specs = kind.param_specs();
    let mut wet = kind.build_wet_path(sr)?;
    let mut knobs = HashMap::new();
    let mut mix = 1.0;
    for spec in specs {
      knobs.insert(spec.name.to_string(), spec.default);
      if spec.name == "mix" {
        mix = spec.map(spec.default);
      } else {
        wet.set_param(spec.name, spec.map(spec.default));
      }
    }
    Ok(Self {
      kind,
      wet,
      specs,
      knobs,
      bypassed: false,
      mix,
      wet_gain: LinearFade::new(mix),
      dry_gain: LinearFade::new(1.0 - mix),
      sr,
      scratch_l: vec![0.0; MAX_BLOCK],
      scratch_r: vec![0.0; MAX_BLOCK],
    })
  }

  /// Rebuild a unit from its persisted (kind, knob map) snapshot.
  pub fn from_params(kind: EffectKind, params: &HashMap<String, f32>, sr: f32) -> Result<Self, EngineError> {
    let mut unit = Self::new(kind, sr)?;
    for (name, value) in params {
      unit.set_parameter(name, *value);
    }
    Ok(unit)
  }

  pub fn kind(&self) -> EffectKind { self.kind }
  pub fn is_bypassed(&self) -> bool { self.bypassed }
  pub fn wet_dry(&self) -> (f32, f32) { (self.wet_gain.value(), self.dry_gain.value()) }

  /// Control-rate knob update, 0..100. Unknown names and out-of-range values
  /// clamp or drop silently; the audio thread never throws.
  pub fn set_parameter(&mut self, name: &str, value: f32) {
    let Some(spec) = self.specs.iter().find(|s| s.name == name) else {
      log::debug!("{}: ignoring unknown parameter '{name}'", self.kind.label());
      return;
    };
    let knob = if value.is_finite() { value.clamp(0.0, 100.0) } else { spec.default };
    self.knobs.insert(spec.name.to_string(), knob);
    if spec.name == "mix" {
      self.mix = spec.map(knob);
      if !self.bypassed {
        self.wet_gain.start(self.mix, FADE_S, self.sr);
        self.dry_gain.start(1.0 - self.mix, FADE_S, self.sr);
      }
    } else {
      self.wet.set_param(spec.name, spec.map(knob));
    }
  }

  /// Inverse mapping for UI/persistence: knob positions 0..100.
  pub fn get_parameters(&self) -> HashMap<String, f32> {
    self.knobs.clone()
  }

  /// Explicit toggle only; executes the capture-then-ramp crossfade.
  pub fn set_bypassed(&mut self, bypassed: bool) {
    if bypassed == self.bypassed { return; }
    self.bypassed = bypassed;
    let (wet_t, dry_t) = if bypassed { (0.0, 1.0) } else { (self.mix, 1.0 - self.mix) };
    self.wet_gain.start(wet_t, FADE_S, self.sr);
    self.dry_gain.start(dry_t, FADE_S, self.sr);
  }

  pub fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    let len = l.len().min(r.len());
    let mut done = 0;
    while done < len {
      let n = (len - done).min(MAX_BLOCK);
      let (lc, rc) = (&mut l[done..done + n], &mut r[done..done + n]);
      self.scratch_l[..n].copy_from_slice(lc);
      self.scratch_r[..n].copy_from_slice(rc);
      // wet path always runs, even bypassed: reverb tails and envelope
      // state keep tracking so a re-enable picks up where the signal is
      self.wet.process_block(&mut self.scratch_l[..n], &mut self.scratch_r[..n]);
      for i in 0..n {
        let wg = self.wet_gain.next();
        let dg = self.dry_gain.next();
        lc[i] = dg * lc[i] + wg * self.scratch_l[i];
        rc[i] = dg * rc[i] + wg * self.scratch_r[i];
      }
      done += n;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SR: f32 = 48_000.0;

  const ALL_KINDS: &[EffectKind] = &[
    EffectKind::Overdrive,
    EffectKind::Distortion,
    EffectKind::Tremolo,
    EffectKind::EnvelopeFilter,
    EffectKind::RoomReverb,
    EffectKind::HallReverb,
    EffectKind::PlateReverb,
    EffectKind::SpringReverb,
    EffectKind::ShimmerReverb,
    EffectKind::GatedReverb,
  ];

  fn run_ms(unit: &mut EffectUnit, ms: f32) {
    let n = ((ms / 1000.0) * SR) as usize;
    let mut l = vec![0.0f32; n];
    let mut r = vec![0.0f32; n];
    unit.process_block(&mut l, &mut r);
  }

  #[test]
  fn set_get_round_trips_every_parameter() {
    for &kind in ALL_KINDS {
      let mut unit = EffectUnit::new(kind, SR).unwrap();
      for spec in kind.param_specs() {
        for v in [0.0, 13.0, 50.0, 87.0, 100.0] {
          unit.set_parameter(spec.name, v);
          let got = unit.get_parameters()[spec.name];
          assert!((got - v).abs() < 0.5, "{:?} {} {v} -> {got}", kind, spec.name);
        }
      }
    }
  }

  #[test]
  fn unknown_and_out_of_range_parameters_never_panic() {
    let mut unit = EffectUnit::new(EffectKind::HallReverb, SR).unwrap();
    unit.set_parameter("no_such_knob", 50.0);
    unit.set_parameter("decay", 1e9);
    unit.set_parameter("decay", -1e9);
    unit.set_parameter("size", f32::NAN);
    let got = unit.get_parameters();
    assert!(got["decay"] >= 0.0 && got["decay"] <= 100.0);
    assert!(got["size"] >= 0.0 && got["size"] <= 100.0);
    run_ms(&mut unit, 10.0);
  }

  #[test]
  fn bypass_round_trip_restores_levels() {
    let mut unit = EffectUnit::new(EffectKind::PlateReverb, SR).unwrap();
    unit.set_parameter("mix", 40.0);
    run_ms(&mut unit, 30.0);
    let before = unit.wet_dry();
    unit.set_bypassed(true);
    run_ms(&mut unit, 30.0);
    assert_eq!(unit.wet_dry(), (0.0, 1.0));
    unit.set_bypassed(false);
    run_ms(&mut unit, 30.0);
    let after = unit.wet_dry();
    assert!((after.0 - before.0).abs() < 1e-6 && (after.1 - before.1).abs() < 1e-6);
  }

  #[test]
  fn bypass_crossfade_is_click_free() {
    // a DC-ish input through the crossfade should never jump between samples
    let mut unit = EffectUnit::new(EffectKind::Overdrive, SR).unwrap();
    let n = (0.1 * SR) as usize;
    let mut warm_l = vec![0.5f32; n / 2];
    let mut warm_r = vec![0.5f32; n / 2];
    unit.process_block(&mut warm_l, &mut warm_r);
    let mut l = vec![0.5f32; n];
    let mut r = vec![0.5f32; n];
    unit.set_bypassed(true);
    unit.process_block(&mut l, &mut r);
    for w in l.windows(2) {
      assert!((w[1] - w[0]).abs() < 0.01, "step {} -> {}", w[0], w[1]);
    }
  }

  #[test]
  fn reconstructs_identically_from_param_map() {
    let mut a = EffectUnit::new(EffectKind::HallReverb, SR).unwrap();
    a.set_parameter("decay", 77.0);
    a.set_parameter("predelay", 20.0);
    a.set_parameter("mix", 55.0);
    let snapshot = a.get_parameters();
    let b = EffectUnit::from_params(EffectKind::HallReverb, &snapshot, SR).unwrap();
    assert_eq!(a.get_parameters(), b.get_parameters());
  }

  #[test]
  fn every_kind_processes_a_block_with_finite_output() {
    for &kind in ALL_KINDS {
      let mut unit = EffectUnit::new(kind, SR).unwrap();
      let n = 2_048;
      let mut l: Vec<f32> = (0..n).map(|i| (std::f32::consts::TAU * 330.0 * i as f32 / SR).sin()).collect();
      let mut r = l.clone();
      unit.process_block(&mut l, &mut r);
      assert!(l.iter().chain(r.iter()).all(|v| v.is_finite()), "{kind:?}");
    }
  }
}
