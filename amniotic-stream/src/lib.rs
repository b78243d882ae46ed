//! # Amniotic Stream Library (amniotic-stream)
//!
//! Ambient-sound streaming engine. A theme mixes any number of looping
//! recordings; each HTTP listener gets its own session that decodes, mixes and
//! encodes the theme to MP3 at playback speed.
//!
//! **Architecture:** symphonia decode + rubato resample -> averaging mixer ->
//! LAME encode -> wall-clock pacer, one OS thread per session, axum in front.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod state;
pub mod stream;
mod sync;
pub mod theme;

pub use error::{Error, Result};
pub use state::SharedState;
