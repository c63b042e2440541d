// Bot presence management.
//
// Discord-layer glue only: builds ActivityData and hands it to the gateway.

use poise::serenity_prelude as serenity;

const DEFAULT_STATUS: &str = "Use /help to get started";

/// Sets a custom status line, as shown under the bot's name.
pub fn set_custom_status(ctx: &serenity::Context, status: &str) {
    let activity = serenity::ActivityData::custom(status);
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready so it starts with the default status.
pub fn on_ready(ctx: &serenity::Context) {
    set_custom_status(ctx, DEFAULT_STATUS);
}
