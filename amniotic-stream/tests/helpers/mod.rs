//! Test helpers for amniotic-stream integration tests
//!
//! - audio_generator: deterministic WAV fixtures written with hound
//! - fixture: temporary audio directory + themes file wired into app state

#![allow(dead_code)]

pub mod audio_generator;
pub mod fixture;

pub use audio_generator::{
    generate_constant_wav, generate_empty_wav, generate_ramp_wav, generate_stereo_wav,
    write_text_file, TEST_SAMPLE_RATE,
};
pub use fixture::TestLibrary;
