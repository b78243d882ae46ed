//! HTTP interface
//!
//! `/stream/:theme_id` serves the live MP3 feed; `/api/v1` is the REST control
//! plane used by the home-automation bridge.

pub mod handlers;
pub mod server;
pub mod stream;

pub use server::{build_router, run, AppContext};
