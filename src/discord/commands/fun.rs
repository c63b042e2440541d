// Fun commands.

use std::time::Instant;

use crate::discord::checks::fun_enabled;
use crate::discord::{say_ephemeral, Context, Error};

const LONGCAT_HEAD: &str = "<:longcat1:1343073978238894150>";
const LONGCAT_BODY: &str = "<:longcat2:1343073969204625408>";
const LONGCAT_TAIL: &str = "<:longcat3:1343073962330034228>";
const DEFAULT_LENGTH: u8 = 3;

/// Head, `length - 2` body segments and a tail, one per line.
pub fn build_longcat(length: u8) -> String {
    let body = usize::from(length.max(2) - 2);
    std::iter::once(LONGCAT_HEAD)
        .chain(std::iter::repeat(LONGCAT_BODY).take(body))
        .chain(std::iter::once(LONGCAT_TAIL))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sends a long cat emoji chain.
#[poise::command(slash_command, guild_only, check = "fun_enabled")]
pub async fn longcat(
    ctx: Context<'_>,
    #[description = "Length of the long cat chain"]
    #[min = 3]
    #[max = 15]
    length: Option<u8>,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get();

    if let Err(remaining) = ctx.data().fun_cooldowns.try_claim(user_id, Instant::now()) {
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        return say_ephemeral(
            ctx,
            format!("Long Cat is on cooldown. Please wait {secs} more seconds"),
        )
        .await;
    }

    ctx.say(build_longcat(length.unwrap_or(DEFAULT_LENGTH).clamp(3, 15)))
        .await?;
    Ok(())
}
