pub mod envelope;
pub mod filter;
pub mod osc;
pub mod pitch;
pub mod reverb;
pub mod smooth;
pub mod waveshaper;
