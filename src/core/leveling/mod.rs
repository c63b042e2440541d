// Core leveling module - XP awards, level curve, ranks.
// No Discord-specific code lives here.

pub mod level_curve;
pub mod leveling_models;
pub mod leveling_service;

pub use level_curve::LevelCurve;
pub use leveling_models::*;
pub use leveling_service::*;
