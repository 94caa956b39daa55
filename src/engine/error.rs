use thiserror::Error;

/// Construction-time failures. These are the only errors allowed to abort;
/// anything detected inside the audio callback degrades gracefully instead.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("invalid sample rate: {0}")]
  BadSampleRate(f32),
  #[error("no output device available")]
  NoOutputDevice,
  #[error("no input device available")]
  NoInputDevice,
  #[error("audio stream error: {0}")]
  Stream(String),
}
