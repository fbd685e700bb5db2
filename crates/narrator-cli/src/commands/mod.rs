pub mod play;
pub mod synth;
