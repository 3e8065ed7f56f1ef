//! CLI command implementations

pub mod audio;
pub mod bank;
pub mod convert;
pub mod cue_points;
