use crate::engine::dsp::envelope::{EnvMode, EnvelopeDetector};
use crate::engine::dsp::filter::{Biquad, OnePoleLP};
use crate::engine::dsp::pitch::GrainShifter;
use crate::engine::error::EngineError;

/// Ring buffer sized once at construction for the worst-case delay of its
/// stage. Read before write gives an exact `d`-sample delay.
pub struct DelayLine {
  buf: Vec<f32>,
  wr: usize,
}

impl DelayLine {
  pub fn new(max_samples: usize) -> Self {
    Self { buf: vec![0.0; max_samples.max(2)], wr: 0 }
  }
  #[inline]
  pub fn read(&self, delay: usize) -> f32 {
    let len = self.buf.len();
    let d = delay.clamp(1, len - 1);
    self.buf[(self.wr + len - d) % len]
  }
  #[inline]
  pub fn write(&mut self, x: f32) {
    self.buf[self.wr] = x;
    self.wr += 1;
    if self.wr >= self.buf.len() { self.wr = 0; }
  }
  #[inline] pub fn capacity(&self) -> usize { self.buf.len() - 1 }
}

const MAX_COMB_FB: f32 = 0.98;

/// Comb stage: delay -> in-loop damping low-pass -> feedback. Output is the
/// raw delay tap. Feedback gain is clamped below 1 on every update; anything
/// else grows without bound.
pub struct Comb {
  dl: DelayLine,
  delay: usize,
  fb: f32,
  damp: OnePoleLP,
}

impl Comb {
  pub fn new(max_samples: usize, delay: usize, fb: f32) -> Self {
    let mut c = Self { dl: DelayLine::new(max_samples), delay: 1, fb: 0.0, damp: OnePoleLP::new() };
    c.set_delay(delay);
    c.set_feedback(fb);
    c
  }
  pub fn set_delay(&mut self, d: usize) { self.delay = d.clamp(1, self.dl.capacity()); }
  pub fn set_feedback(&mut self, g: f32) { self.fb = g.clamp(0.0, MAX_COMB_FB); }
  pub fn set_damping(&mut self, cutoff: f32, sr: f32) { self.damp.set_cutoff(cutoff, sr); }
  #[inline] pub fn feedback(&self) -> f32 { self.fb }
  #[inline]
  pub fn tick(&mut self, x: f32) -> f32 {
    let y = self.dl.read(self.delay);
    let d = self.damp.tick(y);
    self.dl.write(x + d * self.fb);
    y
  }
}

/// Schroeder allpass: y[n] = -g·x[n] + x[n-D] + g·y[n-D].
/// Feedforward and feedback share magnitude with opposite sign, which is
/// what keeps the magnitude response flat.
pub struct Allpass {
  dl: DelayLine,
  delay: usize,
  g: f32,
}

impl Allpass {
  pub fn new(max_samples: usize, delay: usize, g: f32) -> Self {
    let mut a = Self { dl: DelayLine::new(max_samples), delay: 1, g: 0.0 };
    a.set_delay(delay);
    a.set_coeff(g);
    a
  }
  pub fn set_delay(&mut self, d: usize) { self.delay = d.clamp(1, self.dl.capacity()); }
  pub fn set_coeff(&mut self, g: f32) { self.g = g.clamp(-0.95, 0.95); }
  #[inline]
  pub fn tick(&mut self, x: f32) -> f32 {
    let d = self.dl.read(self.delay);
    let y = -self.g * x + d;
    self.dl.write(x + self.g * y);
    y
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReverbPreset { Room, Hall, Plate, Spring, Shimmer, Gated }

#[derive(Clone, Copy)]
struct PresetDef {
  comb: [f32; 8],
  allpass: [f32; 4],
  fb_lo: f32,
  fb_hi: f32,
  fb_default: f32,
  damp_hz: f32,
  size_lo: f32,
  size_hi: f32,
}

// Delay time sets are mutually incommensurate; scaling them by anything but a
// single common factor destroys the decorrelation they provide.
const ROOM_COMB: [f32; 8] = [0.0153, 0.0171, 0.0193, 0.0211, 0.0131, 0.0139, 0.0149, 0.0161];
const HALL_COMB: [f32; 8] = [0.0437, 0.0527, 0.0617, 0.0697, 0.0371, 0.0411, 0.0457, 0.0491];
const PLATE_COMB: [f32; 8] = [0.0253, 0.0289, 0.0313, 0.0347, 0.0219, 0.0233, 0.0247, 0.0263];
const ROOM_AP: [f32; 4] = [0.0029, 0.0037, 0.0041, 0.0047];
const HALL_AP: [f32; 4] = [0.0089, 0.0113, 0.0137, 0.0151];
const PLATE_AP: [f32; 4] = [0.0043, 0.0061, 0.0071, 0.0083];

// spring decay is deliberately uneven across the comb bank
const SPRING_JITTER: [f32; 8] = [1.0, 0.93, 1.02, 0.88, 0.97, 1.04, 0.9, 0.99];

impl ReverbPreset {
  fn def(self) -> PresetDef {
    match self {
      ReverbPreset::Room => PresetDef {
        comb: ROOM_COMB, allpass: ROOM_AP,
        fb_lo: 0.60, fb_hi: 0.85, fb_default: 0.70, damp_hz: 4500.0,
        size_lo: 0.5, size_hi: 2.0,
      },
      ReverbPreset::Hall => PresetDef {
        comb: HALL_COMB, allpass: HALL_AP,
        fb_lo: 0.80, fb_hi: 0.95, fb_default: 0.88, damp_hz: 7000.0,
        size_lo: 0.7, size_hi: 2.0,
      },
      ReverbPreset::Plate => PresetDef {
        comb: PLATE_COMB, allpass: PLATE_AP,
        fb_lo: 0.76, fb_hi: 0.92, fb_default: 0.86, damp_hz: 9000.0,
        size_lo: 0.6, size_hi: 2.0,
      },
      ReverbPreset::Spring => PresetDef {
        comb: ROOM_COMB, allpass: ROOM_AP,
        fb_lo: 0.60, fb_hi: 0.90, fb_default: 0.78, damp_hz: 3000.0,
        size_lo: 0.5, size_hi: 1.5,
      },
      ReverbPreset::Shimmer => PresetDef {
        comb: HALL_COMB, allpass: HALL_AP,
        fb_lo: 0.78, fb_hi: 0.94, fb_default: 0.86, damp_hz: 8000.0,
        size_lo: 0.7, size_hi: 2.0,
      },
      ReverbPreset::Gated => PresetDef {
        comb: PLATE_COMB, allpass: PLATE_AP,
        fb_lo: 0.72, fb_hi: 0.92, fb_default: 0.82, damp_hz: 6000.0,
        size_lo: 0.6, size_hi: 2.0,
      },
    }
  }
}

const NUM_COMBS: usize = 8;
const NUM_ALLPASS: usize = 4;
const MAX_SIZE: f32 = 2.0;
const MAX_PREDELAY_S: f32 = 0.25;
const BASE_DIFFUSION: f32 = 0.7;

/// Feedback delay network: 8 parallel combs averaged into 4 serial allpass
/// diffusers, with a pre-delay line ahead of the network. All variants
/// (shimmer, gated, spring) run on this one skeleton.
pub struct FdnReverb {
  sr: f32,
  preset: ReverbPreset,
  def: PresetDef,
  pre: DelayLine,
  pre_delay: usize,
  combs: Vec<Comb>,
  allpasses: Vec<Allpass>,
  jitter: [f32; 8],
  fb: f32,
  damp_hz: f32,
  diffusion: f32,
  size: f32,
  clamp_warned: bool,
  spring_peak: Option<Biquad>,
  shimmer: Option<GrainShifter>,
  shimmer_send: f32,
  gate: Option<EnvelopeDetector>,
  last_wet: f32,
}

impl FdnReverb {
  pub fn new(preset: ReverbPreset, sr: f32) -> Result<Self, EngineError> {
    if !(sr.is_finite() && sr > 0.0) { return Err(EngineError::BadSampleRate(sr)); }
    let def = preset.def();
    let jitter = if preset == ReverbPreset::Spring { SPRING_JITTER } else { [1.0; 8] };

    // worst-case size fixes every allocation; delays are clamped afterwards,
    // never reallocated mid-stream
    let mut combs = Vec::with_capacity(NUM_COMBS);
    for (i, &t) in def.comb.iter().enumerate() {
      let max = (t * MAX_SIZE * sr).ceil() as usize + 2;
      let mut c = Comb::new(max, (t * sr).round() as usize, def.fb_default * jitter[i]);
      c.set_damping(def.damp_hz, sr);
      combs.push(c);
    }
    let mut allpasses = Vec::with_capacity(NUM_ALLPASS);
    for &t in def.allpass.iter() {
      let max = (t * MAX_SIZE * sr).ceil() as usize + 2;
      allpasses.push(Allpass::new(max, (t * sr).round() as usize, BASE_DIFFUSION));
    }

    let spring_peak = if preset == ReverbPreset::Spring {
      let mut bq = Biquad::new();
      bq.set_peaking(sr, 800.0, 8.0, 6.0);
      Some(bq)
    } else {
      None
    };
    let shimmer = if preset == ReverbPreset::Shimmer {
      Some(GrainShifter::new(sr, 50.0, 12.0))
    } else {
      None
    };
    let gate = if preset == ReverbPreset::Gated {
      let mut g = EnvelopeDetector::new(sr)?;
      g.set_mode(EnvMode::Peak);
      g.set_times(0.001, 0.05);
      g.set_sensitivity(4.0);
      Some(g)
    } else {
      None
    };

    Ok(Self {
      sr,
      preset,
      def,
      pre: DelayLine::new((MAX_PREDELAY_S * sr).ceil() as usize + 2),
      pre_delay: 0,
      combs,
      allpasses,
      jitter,
      fb: def.fb_default,
      damp_hz: def.damp_hz,
      diffusion: BASE_DIFFUSION,
      size: 1.0,
      clamp_warned: false,
      spring_peak,
      shimmer,
      shimmer_send: 0.4,
      gate,
      last_wet: 0.0,
    })
  }

  pub fn preset(&self) -> ReverbPreset { self.preset }
  pub fn feedback(&self) -> f32 { self.fb }
  pub fn damping_hz(&self) -> f32 { self.damp_hz }

  /// decay in 0..1 maps into the preset's feedback range; the stability
  /// invariant g < 1 is re-clamped on every update
  pub fn set_decay(&mut self, v: f32) {
    let v = v.clamp(0.0, 1.0);
    self.fb = (self.def.fb_lo + (self.def.fb_hi - self.def.fb_lo) * v).clamp(0.0, MAX_COMB_FB);
    for (i, c) in self.combs.iter_mut().enumerate() {
      c.set_feedback(self.fb * self.jitter[i]);
    }
  }

  /// size in 0..1 scales every delay length by one common factor
  pub fn set_size(&mut self, v: f32) {
    let v = v.clamp(0.0, 1.0);
    self.size = self.def.size_lo + (self.def.size_hi - self.def.size_lo) * v;
    let mut clamped = false;
    for (i, c) in self.combs.iter_mut().enumerate() {
      let want = (self.def.comb[i] * self.size * self.sr).round() as usize;
      if want > c.dl.capacity() { clamped = true; }
      c.set_delay(want);
    }
    for (i, a) in self.allpasses.iter_mut().enumerate() {
      let want = (self.def.allpass[i] * self.size * self.sr).round() as usize;
      if want > a.dl.capacity() { clamped = true; }
      a.set_delay(want);
    }
    if clamped && !self.clamp_warned {
      log::warn!("reverb size exceeds allocated delay lines; clamping");
      self.clamp_warned = true;
    }
  }

  /// in-loop low-pass cutoff; brightness of the decay tail
  pub fn set_damping(&mut self, cutoff_hz: f32) {
    self.damp_hz = cutoff_hz;
    for c in self.combs.iter_mut() { c.set_damping(cutoff_hz, self.sr); }
  }

  pub fn set_predelay_ms(&mut self, ms: f32) {
    let want = ((ms.max(0.0) / 1000.0) * self.sr).round() as usize;
    let cap = self.pre.capacity();
    if want > cap && !self.clamp_warned {
      log::warn!("pre-delay {}ms exceeds allocation; clamping", ms);
      self.clamp_warned = true;
    }
    self.pre_delay = want.min(cap);
  }

  /// diffusion in 0..1 scales all allpass coefficients together
  pub fn set_diffusion(&mut self, v: f32) {
    self.diffusion = 0.3 + 0.55 * v.clamp(0.0, 1.0);
    for a in self.allpasses.iter_mut() { a.set_coeff(self.diffusion); }
  }

  /// shimmer-only: level of the pitched octave fed back into the network
  pub fn set_shimmer_amount(&mut self, v: f32) {
    self.shimmer_send = 0.6 * v.clamp(0.0, 1.0);
  }

  #[inline]
  fn tick(&mut self, x: f32) -> f32 {
    // pre-delay sets first-reflection timing; zero bypasses the line
    let delayed = if self.pre_delay > 0 { self.pre.read(self.pre_delay) } else { x };
    self.pre.write(x);

    let mut inject = delayed;
    if let Some(ps) = self.shimmer.as_mut() {
      // ascending wash: late output goes up an octave and back into the input
      inject += self.shimmer_send * ps.tick(self.last_wet);
    }

    let mut sum = 0.0;
    for c in self.combs.iter_mut() { sum += c.tick(inject); }
    let mut y = sum * (1.0 / NUM_COMBS as f32);

    for a in self.allpasses.iter_mut() { y = a.tick(y); }

    if let Some(bq) = self.spring_peak.as_mut() { y = bq.process(y); }

    self.last_wet = y;
    y
  }

  /// Wet-only render; the owning effect unit holds the dry path.
  pub fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    for i in 0..l.len().min(r.len()) {
      let (dl, dr) = (l[i], r[i]);
      let mut wet = self.tick(0.5 * (dl + dr));
      if let Some(g) = self.gate.as_mut() {
        // gate tracks the DRY input so the tail shuts when the player stops
        wet *= g.tick(dl, dr);
      }
      l[i] = wet;
      r[i] = wet;
    }
  }
}
