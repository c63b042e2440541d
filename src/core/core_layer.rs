// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "cooldown/cooldown_tracker.rs"]
pub mod cooldown;

#[path = "duration/duration_engine.rs"]
pub mod duration;

#[path = "leveling/mod.rs"]
pub mod leveling;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "snippets/mod.rs"]
pub mod snippets;

#[path = "modlog/modlog_service.rs"]
pub mod modlog;
