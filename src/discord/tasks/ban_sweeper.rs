// Background housekeeping: lifts expired temporary bans and prunes the
// in-memory cooldown and modlog state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::modlog::{ActionOrigin, ModAction, ModlogEntry};
use crate::discord::commands::moderation::http_status;
use crate::discord::modlog::post_modlog;
use crate::discord::Data;
use poise::serenity_prelude as serenity;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn expired_ban_reason(bot_tag: &str) -> String {
    format!("{bot_tag}: Ban expired")
}

/// How a due ban ended up after asking Discord to lift it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiftOutcome {
    Lifted,
    /// Discord answered 404 Unknown Ban: someone unbanned the user by hand.
    AlreadyLifted,
    /// The record stays so the next sweep retries.
    Failed,
}

impl LiftOutcome {
    /// `Err` carries the HTTP status of the failed request, when there is one.
    fn from_result(result: Result<(), Option<u16>>) -> Self {
        match result {
            Ok(()) => LiftOutcome::Lifted,
            Err(Some(404)) => LiftOutcome::AlreadyLifted,
            Err(_) => LiftOutcome::Failed,
        }
    }

    fn clears_record(self) -> bool {
        self != LiftOutcome::Failed
    }
}

/// Run the sweep every [`SWEEP_INTERVAL`] until the process exits.
pub fn spawn(http: Arc<serenity::Http>, bot_tag: String, data: Data) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweep_once(&http, &bot_tag, &data).await;
        }
    });
}

async fn sweep_once(http: &serenity::Http, bot_tag: &str, data: &Data) {
    let due = match data.moderation.due_bans(chrono::Utc::now()).await {
        Ok(due) => due,
        Err(e) => {
            tracing::error!("Failed to load expired bans: {e}");
            Vec::new()
        }
    };

    let reason = expired_ban_reason(bot_tag);
    for ban in due {
        let guild_id = serenity::GuildId::new(ban.guild_id);
        let user_id = serenity::UserId::new(ban.user_id);

        data.modlog
            .mark_bot_action(ban.guild_id, ban.user_id, ModAction::Unban, Instant::now());

        let result = http.remove_ban(guild_id, user_id, Some(reason.as_str())).await;
        let outcome = LiftOutcome::from_result(result.as_ref().map(|_| ()).map_err(http_status));

        match result {
            Ok(()) => {
                tracing::info!(guild_id = ban.guild_id, user_id = ban.user_id, "Lifted expired ban");
                let target = match user_id.to_user(http).await {
                    Ok(user) => user.tag(),
                    Err(_) => format!("<@{}>", ban.user_id),
                };
                let entry = ModlogEntry {
                    action: ModAction::Unban,
                    moderator: Some(bot_tag.to_string()),
                    target,
                    reason: Some("Ban expired".to_string()),
                    duration: None,
                };
                post_modlog(http, data, ban.guild_id, ActionOrigin::Bot, entry).await;
            }
            Err(e) => {
                // No gateway event follows a failed unban.
                data.modlog.take_bot_action(
                    ban.guild_id,
                    ban.user_id,
                    ModAction::Unban,
                    Instant::now(),
                );
                tracing::warn!(
                    guild_id = ban.guild_id,
                    user_id = ban.user_id,
                    ?outcome,
                    "Failed to lift expired ban: {e}"
                );
            }
        }

        if !outcome.clears_record() {
            continue;
        }
        if let Err(e) = data.moderation.clear_temp_ban(ban.guild_id, ban.user_id).await {
            tracing::error!(guild_id = ban.guild_id, "Failed to clear expired ban: {e}");
        }
    }

    let now = Instant::now();
    let cooldowns = data.leveling.purge_cooldowns(now) + data.fun_cooldowns.purge_expired(now);
    let marks = data.modlog.purge(now);
    tracing::debug!(cooldowns, marks, "Pruned expired in-memory state");
}
