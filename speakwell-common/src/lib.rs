//! # Speakwell Common Library
//!
//! Shared code for the Speakwell services including:
//! - Error types
//! - Configuration loading (TOML + environment resolution)
//! - Logging initialisation
//! - Level calculation (XP → level, level → XP)

pub mod config;
pub mod error;
pub mod level;
pub mod logging;

pub use error::{Error, Result};
pub use level::{level_for_xp, xp_for_level, LevelProgress};
