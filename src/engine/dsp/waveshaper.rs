/// Static nonlinear transfer curves for saturation/distortion units.
/// Tables are rebuilt wholesale on any parameter change and never patched.

pub const CURVE_LEN: usize = 65536;

/// Clipping character. Maps to the knee steepness of the tanh stage:
/// Soft is the classic overdrive knee, Led opens it up harder, Ge is the
/// darker germanium squash, Hard is near-linear into an abrupt ceiling.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClipMode { Soft, Led, Ge, Hard }

impl ClipMode {
  fn knee_factor(self) -> f32 {
    match self {
      ClipMode::Soft => 1.0,
      ClipMode::Led => 1.35,
      ClipMode::Ge => 0.8,
      ClipMode::Hard => 1.8,
    }
  }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CurveParams {
  /// 0..100 knob
  pub drive: f32,
  /// 0..30, percent of positive/negative imbalance
  pub asymmetry: f32,
  /// 0..1, level of the added even-harmonic term
  pub harmonics: f32,
  /// 0..100, transition hardness into clipping
  pub hardness: f32,
  pub mode: ClipMode,
}

impl Default for CurveParams {
  fn default() -> Self {
    Self { drive: 50.0, asymmetry: 12.0, harmonics: 1.0, hardness: 35.0, mode: ClipMode::Soft }
  }
}

/// Pure, deterministic table synthesis. Identical params yield bit-identical
/// tables. Endpoints land exactly on input -1 and +1.
pub fn build_curve(p: &CurveParams) -> Vec<f32> {
  let mut curve = vec![0.0f32; CURVE_LEN];
  build_curve_into(p, &mut curve);
  curve
}

/// In-place variant so a live unit can rebuild into preallocated storage.
pub fn build_curve_into(p: &CurveParams, curve: &mut [f32]) {
  let n = curve.len();

  let k_drive = 1.0 + p.drive.clamp(0.0, 100.0) / 9.0;
  let asym_fac = 1.0 + (p.asymmetry.clamp(0.0, 30.0) / 100.0) * 0.6; // 1..1.18
  let hardness = 0.7 + (p.hardness.clamp(0.0, 100.0) / 100.0) * 3.3; // 0.7..4.0
  let knee = hardness * p.mode.knee_factor();
  let harm = p.harmonics.clamp(0.0, 1.0) * 0.05;

  for (i, c) in curve.iter_mut().enumerate() {
    let x = (i as f32 * 2.0) / (n - 1) as f32 - 1.0; // exact -1..1 inclusive
    let mut y = (x * k_drive * knee).tanh();
    // even-harmonic term at twice the drive multiple
    y += harm * (x * k_drive * knee * 2.0).tanh();
    // asymmetry: positive side slightly hotter, negative compressed
    y *= if x >= 0.0 { asym_fac } else { 2.0 - asym_fac };
    // soft knee past the threshold keeps the transition smooth
    const KNEE_T: f32 = 0.7;
    if y.abs() > KNEE_T {
      let excess = y.abs() - KNEE_T;
      y = y.signum() * (KNEE_T + excess * 0.3);
    }
    // light level-dependent squash, then headroom
    y *= 1.0 - 0.08 * x.abs().min(1.0);
    *c = y * 0.9;
  }

  // renormalize only if the asymmetry pushed past full scale
  let peak = curve.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
  if peak > 1.0 {
    let inv = 1.0 / peak;
    for c in curve.iter_mut() { *c *= inv; }
  }
}

/// Table lookup with linear interpolation, input clamped to [-1,1].
/// Two tables are allocated up front; parameter changes rebuild into the
/// spare and swap, so updates from the audio callback never allocate.
pub struct Waveshaper {
  curve: Vec<f32>,
  spare: Vec<f32>,
}

impl Waveshaper {
  pub fn new(params: &CurveParams) -> Self {
    Self { curve: build_curve(params), spare: vec![0.0; CURVE_LEN] }
  }
  pub fn set_params(&mut self, params: &CurveParams) {
    build_curve_into(params, &mut self.spare);
    std::mem::swap(&mut self.curve, &mut self.spare);
  }
  #[inline]
  pub fn shape(&self, x: f32) -> f32 {
    let n = self.curve.len();
    let pos = (x.clamp(-1.0, 1.0) * 0.5 + 0.5) * (n - 1) as f32;
    let i0 = pos as usize;
    let i1 = (i0 + 1).min(n - 1);
    let frac = pos - i0 as f32;
    self.curve[i0] + (self.curve[i1] - self.curve[i0]) * frac
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_params_build_identical_tables() {
    let p = CurveParams { drive: 63.0, asymmetry: 9.0, harmonics: 0.8, hardness: 40.0, mode: ClipMode::Led };
    let a = build_curve(&p);
    let b = build_curve(&p);
    assert_eq!(a.len(), CURVE_LEN);
    assert!(a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
  }

  #[test]
  fn table_is_bounded_with_exact_endpoints() {
    for mode in [ClipMode::Soft, ClipMode::Led, ClipMode::Ge, ClipMode::Hard] {
      let p = CurveParams { drive: 100.0, asymmetry: 30.0, harmonics: 1.0, hardness: 100.0, mode };
      let c = build_curve(&p);
      assert!(c.iter().all(|v| v.abs() <= 1.0));
      // boundary samples exist at input exactly -1 and +1
      assert!(c[0] < 0.0 && c[CURVE_LEN - 1] > 0.0);
    }
  }

  #[test]
  fn more_drive_saturates_harder() {
    let mild = Waveshaper::new(&CurveParams { drive: 5.0, ..Default::default() });
    let hot = Waveshaper::new(&CurveParams { drive: 95.0, ..Default::default() });
    // at a small input the hot curve is much further into saturation
    assert!(hot.shape(0.1) > mild.shape(0.1) * 1.5);
    // inputs past full scale clamp instead of reading out of the table
    assert_eq!(hot.shape(2.0), hot.shape(1.0));
  }

  #[test]
  fn live_updates_reuse_the_preallocated_tables() {
    let mut ws = Waveshaper::new(&CurveParams::default());
    let a = ws.curve.as_ptr();
    let b = ws.spare.as_ptr();
    ws.set_params(&CurveParams { drive: 80.0, ..Default::default() });
    assert_eq!(ws.curve.as_ptr(), b);
    ws.set_params(&CurveParams { drive: 20.0, ..Default::default() });
    assert_eq!(ws.curve.as_ptr(), a);
    assert_eq!(ws.spare.as_ptr(), b);
  }
}
