/// Exponential approach toward a target, for "musical" parameters
/// (gains, frequencies, feedback). Scheduling a new ramp pins the
/// current value first, so ramps never overlay.
pub struct SmoothParam {
  y: f32,
  target: f32,
  a: f32,
  sr: f32,
}

impl SmoothParam {
  pub fn new(sr: f32, initial: f32) -> Self {
    Self { y: initial, target: initial, a: 0.0, sr }
  }
  /// Cancel any in-flight ramp and approach `target` with time constant `tau` (seconds).
  pub fn ramp_to(&mut self, target: f32, tau: f32) {
    self.target = target;
    self.a = (-1.0 / (tau.max(0.0001) * self.sr)).exp();
  }
  /// Jump immediately, no ramp.
  pub fn set_now(&mut self, v: f32) { self.y = v; self.target = v; }
  #[inline]
  pub fn next(&mut self) -> f32 { self.y = self.target + (self.y - self.target) * self.a; self.y }
  #[inline] pub fn value(&self) -> f32 { self.y }
  #[inline] pub fn target(&self) -> f32 { self.target }
}

/// Fixed-duration linear ramp for bypass/mix crossfades. Symmetric fade
/// timing needs linear, not exponential, segments. Sample-counted; no
/// wall-clock anywhere.
pub struct LinearFade {
  y: f32,
  target: f32,
  step: f32,
  remaining: u32,
}

impl LinearFade {
  pub fn new(initial: f32) -> Self {
    Self { y: initial, target: initial, step: 0.0, remaining: 0 }
  }
  /// Capture the current value, cancel any in-flight fade, ramp to `target`
  /// over `dur` seconds.
  pub fn start(&mut self, target: f32, dur: f32, sr: f32) {
    let n = ((dur * sr).round() as u32).max(1);
    self.target = target;
    self.step = (target - self.y) / n as f32;
    self.remaining = n;
  }
  #[inline]
  pub fn next(&mut self) -> f32 {
    if self.remaining > 0 {
      self.y += self.step;
      self.remaining -= 1;
      if self.remaining == 0 { self.y = self.target; }
    }
    self.y
  }
  #[inline] pub fn value(&self) -> f32 { self.y }
  #[inline] pub fn done(&self) -> bool { self.remaining == 0 }
}
