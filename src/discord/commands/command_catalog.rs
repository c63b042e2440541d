// Discord commands module.
// Each feature gets its own command file.

use crate::discord::{Data, Error};

pub mod fun;
pub mod general;
pub mod leveling;
pub mod moderation;
pub mod presence;
pub mod settings;
pub mod snippets;

/// Every slash command the bot registers.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        moderation::ban(),
        moderation::unban(),
        moderation::kick(),
        moderation::timeout(),
        moderation::warn(),
        moderation::warnings(),
        leveling::rank(),
        leveling::top(),
        leveling::levels(),
        settings::settings_command(),
        settings::setchannel(),
        snippets::snippet(),
        snippets::trigger(),
        fun::longcat(),
        general::help(),
        general::status(),
        general::setstatus(),
    ]
}
