//! # Amniotic Common Library
//!
//! Shared code for the Amniotic services including:
//! - Common error type
//! - Bootstrap configuration loading and data directory resolution
//! - Theme identifier slugging

pub mod config;
pub mod error;
pub mod slug;

pub use error::{Error, Result};
pub use slug::slugify;
