// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "database.rs"]
pub mod database;

#[path = "leveling/leveling_store.rs"]
pub mod leveling;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "snippets/mod.rs"]
pub mod snippets;

#[path = "paste/mod.rs"]
pub mod paste;
