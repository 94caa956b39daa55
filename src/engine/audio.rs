use std::collections::VecDeque;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender, TryRecvError};

use super::{chain::Chain, messages::EngineMsg};
use crate::engine::effects::EffectUnit;
use crate::engine::error::EngineError;

// input->output bridge depth, in callback-sized blocks
const BRIDGE_BLOCKS: usize = 8;
// command drain cap per callback, keeps control traffic from starving audio
const DRAIN_CAP: usize = 24;
// prebuilt commands and retired units in flight
const CMD_DEPTH: usize = 64;
const RETIRE_DEPTH: usize = 16;

/// Callback-side command. By the time one of these reaches the audio thread
/// every allocating step (unit construction, curve table builds) has already
/// happened on the control pump.
enum ChainCmd {
  Add(EffectUnit),
  Remove(usize),
  Move { from: usize, to: usize },
  SetParam { index: usize, name: String, value: f32 },
  SetBypassed { index: usize, bypassed: bool },
  Quit,
}

/// Owns the duplex stream pair and the control channel. `start` spawns a
/// pump thread that turns `EngineMsg` into prebuilt `ChainCmd`s and disposes
/// of units the callback retires; the chain itself moves into the output
/// callback. The UI side keeps only the `Sender<EngineMsg>`.
pub struct AudioEngine {
  tx: Sender<EngineMsg>,
  rx: Receiver<EngineMsg>,
  pub sr: f32,
  chain: Option<Chain>,
  in_stream: Option<cpal::Stream>,
  out_stream: Option<cpal::Stream>,
}

/// Prefer 44100 (more compatible), then 48000, then whatever the device
/// offers, always stereo-or-mono f32.
fn pick_config(ranges: Vec<cpal::SupportedStreamConfigRange>) -> Option<cpal::SupportedStreamConfig> {
  for want_sr in [44_100u32, 48_000u32] {
    for r in &ranges {
      if r.sample_format() != cpal::SampleFormat::F32 { continue; }
      if r.channels() == 0 || r.channels() > 2 { continue; }
      if r.min_sample_rate().0 <= want_sr && r.max_sample_rate().0 >= want_sr {
        return Some(r.clone().with_sample_rate(cpal::SampleRate(want_sr)));
      }
    }
  }
  ranges
    .into_iter()
    .find(|r| r.sample_format() == cpal::SampleFormat::F32 && r.channels() >= 1 && r.channels() <= 2)
    .map(|r| r.with_max_sample_rate())
}

impl AudioEngine {
  pub fn new() -> Result<Self, EngineError> {
    let (tx, rx) = unbounded();
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(EngineError::NoOutputDevice)?;
    let ranges: Vec<_> = device
      .supported_output_configs()
      .map_err(|e| EngineError::Stream(e.to_string()))?
      .collect();
    let config = match pick_config(ranges) {
      Some(cfg) => cfg,
      None => device.default_output_config().map_err(|e| EngineError::Stream(e.to_string()))?,
    };
    let sr = config.sample_rate().0 as f32;
    Ok(Self { tx, rx, sr, chain: Some(Chain::new(sr)?), in_stream: None, out_stream: None })
  }

  pub fn sender(&self) -> Sender<EngineMsg> { self.tx.clone() }

  /// Take the chain out before `start` to preconfigure it; put it back with
  /// `set_chain`. After `start` it is owned by the audio callback.
  pub fn take_chain(&mut self) -> Option<Chain> { self.chain.take() }
  pub fn set_chain(&mut self, chain: Chain) { self.chain = Some(chain); }

  pub fn start(&mut self) -> Result<(), EngineError> {
    if self.out_stream.is_some() { return Ok(()); }
    let host = cpal::default_host();
    let out_dev = host.default_output_device().ok_or(EngineError::NoOutputDevice)?;
    let in_dev = host.default_input_device().ok_or(EngineError::NoInputDevice)?;

    let out_ranges: Vec<_> = out_dev
      .supported_output_configs()
      .map_err(|e| EngineError::Stream(e.to_string()))?
      .collect();
    let out_supported = match pick_config(out_ranges) {
      Some(cfg) => cfg,
      None => out_dev.default_output_config().map_err(|e| EngineError::Stream(e.to_string()))?,
    };
    let mut out_cfg: cpal::StreamConfig = out_supported.into();
    // larger fixed buffer trades latency for underrun resistance
    out_cfg.buffer_size = cpal::BufferSize::Fixed(1024);
    self.sr = out_cfg.sample_rate.0 as f32;
    let out_channels = out_cfg.channels as usize;

    let in_ranges: Vec<_> = in_dev
      .supported_input_configs()
      .map_err(|e| EngineError::Stream(e.to_string()))?
      .collect();
    let in_supported = pick_config(in_ranges).ok_or(EngineError::NoInputDevice)?;
    let mut in_cfg: cpal::StreamConfig = in_supported.into();
    in_cfg.sample_rate = out_cfg.sample_rate;
    in_cfg.buffer_size = cpal::BufferSize::Fixed(1024);
    let in_channels = in_cfg.channels as usize;

    let mut chain = match self.chain.take() {
      Some(c) if c.sample_rate() == self.sr => c,
      _ => Chain::new(self.sr)?,
    };

    // control pump: unit construction and disposal happen here, never on the
    // audio thread
    let (cmd_tx, cmd_rx) = bounded::<ChainCmd>(CMD_DEPTH);
    let (retired_tx, retired_rx) = bounded::<EffectUnit>(RETIRE_DEPTH);
    let msg_rx = self.rx.clone();
    let sr = self.sr;
    thread::spawn(move || {
      loop {
        select! {
          recv(msg_rx) -> msg => {
            let Ok(msg) = msg else { break };
            let quit = matches!(msg, EngineMsg::Quit);
            if let Some(cmd) = translate_msg(msg, sr) {
              if cmd_tx.send(cmd).is_err() { break; }
            }
            if quit { break; }
          }
          recv(retired_rx) -> unit => {
            // Err means the callback side is gone
            if unit.is_err() { break; }
          }
        }
      }
    });

    // capture side: interleaved frames travel over a bounded channel; a full
    // bridge drops the block (overrun) rather than blocking the driver
    let (frame_tx, frame_rx) = bounded::<Vec<f32>>(BRIDGE_BLOCKS);
    let in_stream = in_dev
      .build_input_stream(
        &in_cfg,
        move |data: &[f32], _| {
          let _ = frame_tx.try_send(data.to_vec());
        },
        |e| log::error!("input stream error: {e}"),
        None,
      )
      .map_err(|e| EngineError::Stream(e.to_string()))?;

    let mut pending: VecDeque<(f32, f32)> = VecDeque::with_capacity(8_192);
    let mut buf_l: Vec<f32> = Vec::with_capacity(4_096);
    let mut buf_r: Vec<f32> = Vec::with_capacity(4_096);
    let mut running = true;

    let out_stream = out_dev
      .build_output_stream(
        &out_cfg,
        move |data: &mut [f32], _| {
          // drain prebuilt commands without blocking
          let mut drained = 0usize;
          loop {
            match cmd_rx.try_recv() {
              Ok(cmd) => apply_cmd(&mut chain, cmd, &mut running, &retired_tx),
              Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
            drained += 1;
            if drained >= DRAIN_CAP { break; }
          }
          if !running {
            data.fill(0.0);
            return;
          }
          // pull captured frames into the local queue
          while let Ok(block) = frame_rx.try_recv() {
            match in_channels {
              1 => pending.extend(block.iter().map(|&s| (s, s))),
              _ => pending.extend(
                block.chunks(in_channels).map(|f| (f[0], f.get(1).copied().unwrap_or(f[0]))),
              ),
            }
          }
          let frames = data.len() / out_channels;
          buf_l.clear();
          buf_r.clear();
          for _ in 0..frames {
            // underrun: run the chain on silence so tails keep ringing
            let (l, r) = pending.pop_front().unwrap_or((0.0, 0.0));
            buf_l.push(l);
            buf_r.push(r);
          }
          chain.process_block(&mut buf_l, &mut buf_r);
          for (frame, (&l, &r)) in data.chunks_mut(out_channels).zip(buf_l.iter().zip(&buf_r)) {
            frame[0] = l;
            if frame.len() > 1 { frame[1] = r; }
          }
        },
        |e| log::error!("output stream error: {e}"),
        None,
      )
      .map_err(|e| EngineError::Stream(e.to_string()))?;

    in_stream.play().map_err(|e| EngineError::Stream(e.to_string()))?;
    out_stream.play().map_err(|e| EngineError::Stream(e.to_string()))?;
    log::info!("audio started: {} Hz, in {} ch, out {} ch", self.sr, in_channels, out_channels);
    self.in_stream = Some(in_stream);
    self.out_stream = Some(out_stream);
    Ok(())
  }

  pub fn stop(&mut self) {
    self.in_stream.take();
    self.out_stream.take();
  }
}

/// Pump-side translation; this is where `AddEffect` pays its allocation cost.
fn translate_msg(msg: EngineMsg, sr: f32) -> Option<ChainCmd> {
  match msg {
    EngineMsg::AddEffect { kind } => match EffectUnit::new(kind, sr) {
      Ok(unit) => Some(ChainCmd::Add(unit)),
      Err(e) => {
        log::warn!("add {:?} failed: {e}", kind);
        None
      }
    },
    EngineMsg::RemoveEffect { index } => Some(ChainCmd::Remove(index)),
    EngineMsg::MoveEffect { from, to } => Some(ChainCmd::Move { from, to }),
    EngineMsg::SetParam { index, name, value } => Some(ChainCmd::SetParam { index, name, value }),
    EngineMsg::SetBypassed { index, bypassed } => Some(ChainCmd::SetBypassed { index, bypassed }),
    EngineMsg::Quit => Some(ChainCmd::Quit),
  }
}

/// Callback-side application: moves and index ops only. Removed units go
/// back to the pump for disposal; if that bridge is full they drop inline as
/// a last resort.
fn apply_cmd(chain: &mut Chain, cmd: ChainCmd, running: &mut bool, retired: &Sender<EffectUnit>) {
  match cmd {
    ChainCmd::Add(unit) => chain.push(unit),
    ChainCmd::Remove(index) => {
      if let Some(unit) = chain.take(index) {
        let _ = retired.try_send(unit);
      }
    }
    ChainCmd::Move { from, to } => chain.move_effect(from, to),
    ChainCmd::SetParam { index, name, value } => chain.set_parameter(index, &name, value),
    ChainCmd::SetBypassed { index, bypassed } => chain.set_bypassed(index, bypassed),
    ChainCmd::Quit => *running = false,
  }
}

// Intentionally not Clone; the chain moves into the audio callback.
