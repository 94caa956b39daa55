use std::collections::HashMap;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use stompbox::engine::dsp::reverb::Allpass;
use stompbox::{Chain, EffectKind, EffectUnit, EngineMsg};

const SR: f32 = 48_000.0;

#[test]
fn allpass_magnitude_response_is_flat() {
  // impulse response long enough that the truncated tail is far below -100dB
  let n = 8_192;
  let mut ap = Allpass::new(512, 200, 0.5);
  let mut ir: Vec<Complex<f32>> = Vec::with_capacity(n);
  for i in 0..n {
    let x = if i == 0 { 1.0 } else { 0.0 };
    ir.push(Complex { re: ap.tick(x), im: 0.0 });
  }
  FftPlanner::new().plan_fft_forward(n).process(&mut ir);
  for (k, bin) in ir.iter().enumerate() {
    let db = 20.0 * bin.norm().max(1e-12).log10();
    assert!(db.abs() < 0.1, "bin {k}: {db} dB");
  }
}

#[test]
fn board_built_from_control_messages_rings_out() {
  let script = r#"[
    {"AddEffect":{"kind":"overdrive"}},
    {"AddEffect":{"kind":"hallreverb"}},
    {"SetParam":{"index":1,"name":"decay","value":70.0}},
    {"SetParam":{"index":1,"name":"mix","value":60.0}},
    {"SetBypassed":{"index":0,"bypassed":false}}
  ]"#;
  let _ = env_logger::builder().is_test(true).try_init();
  let msgs: Vec<EngineMsg> = serde_json::from_str(script).unwrap();
  let mut chain = Chain::new(SR).unwrap();
  for msg in msgs {
    match msg {
      EngineMsg::AddEffect { kind } => {
        chain.add(kind).unwrap();
      }
      EngineMsg::RemoveEffect { index } => chain.remove(index),
      EngineMsg::MoveEffect { from, to } => chain.move_effect(from, to),
      EngineMsg::SetParam { index, name, value } => chain.set_parameter(index, &name, value),
      EngineMsg::SetBypassed { index, bypassed } => chain.set_bypassed(index, bypassed),
      EngineMsg::Quit => {}
    }
  }
  assert_eq!(chain.len(), 2);

  // a short pluck, then silence
  let burst = (0.05 * SR) as usize;
  let total = (1.0 * SR) as usize;
  let mut l: Vec<f32> = (0..total)
    .map(|i| {
      if i < burst {
        0.6 * (std::f32::consts::TAU * 196.0 * i as f32 / SR).sin()
      } else {
        0.0
      }
    })
    .collect();
  let mut r = l.clone();
  chain.process_block(&mut l, &mut r);
  assert!(l.iter().chain(r.iter()).all(|v| v.is_finite()));
  // the hall keeps ringing well after the input stops
  let tail = &l[(0.3 * SR) as usize..(0.5 * SR) as usize];
  let rms = (tail.iter().map(|v| v * v).sum::<f32>() / tail.len() as f32).sqrt();
  assert!(rms > 1e-4, "no reverb tail, rms {rms}");
}

#[test]
fn board_snapshot_survives_json_round_trip() {
  let mut chain = Chain::new(SR).unwrap();
  chain.add(EffectKind::Distortion).unwrap();
  chain.add(EffectKind::EnvelopeFilter).unwrap();
  chain.add(EffectKind::ShimmerReverb).unwrap();
  chain.set_parameter(0, "drive", 82.0);
  chain.set_parameter(1, "sensitivity", 33.0);
  chain.set_parameter(2, "shimmer", 90.0);

  let snapshot: Vec<(EffectKind, HashMap<String, f32>)> = (0..chain.len())
    .map(|i| {
      let u = chain.unit(i).unwrap();
      (u.kind(), u.get_parameters())
    })
    .collect();
  let json = serde_json::to_string(&snapshot).unwrap();
  let restored: Vec<(EffectKind, HashMap<String, f32>)> = serde_json::from_str(&json).unwrap();

  for (i, (kind, params)) in restored.iter().enumerate() {
    let unit = EffectUnit::from_params(*kind, params, SR).unwrap();
    assert_eq!(unit.kind(), chain.unit(i).unwrap().kind());
    assert_eq!(unit.get_parameters(), chain.unit(i).unwrap().get_parameters());
  }
}
