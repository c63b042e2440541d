// Chat-side snippet delivery: `;name` invocations, trigger phrases and
// paste links.

use crate::core::snippets::{extract_links, parse_snippet_invocation, Snippet};
use crate::discord::{Data, Error};
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter, CreateMessage};

pub const SNIPPET_COLOR: u32 = 0xe6d47b;
const TRIGGER_REPLY: &str = "The following snippet could be relevant for you:";

pub fn snippet_embed(snippet: &Snippet, author_tag: &str, requester_tag: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("📌 Snippet: {}", snippet.name))
        .description(&snippet.content)
        .color(serenity::Colour::new(SNIPPET_COLOR))
        .footer(CreateEmbedFooter::new(format!(
            "Written by {author_tag} • Requested by {requester_tag}"
        )))
}

async fn author_tag(ctx: &serenity::Context, author_id: u64) -> String {
    match serenity::UserId::new(author_id).to_user(ctx).await {
        Ok(user) => user.tag(),
        Err(_) => format!("<@{author_id}>"),
    }
}

async fn embed_for(ctx: &serenity::Context, snippet: &Snippet, message: &serenity::Message) -> CreateEmbed {
    let author = author_tag(ctx, snippet.author_id).await;
    snippet_embed(snippet, &author, &message.author.tag())
}

/// What a `;name` prefix did to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Invocation {
    NotInvoked,
    UnknownSnippet,
    /// The snippet was posted and the invocation deleted.
    Answered,
}

impl Invocation {
    /// Trigger replies reference the message, which an answered invocation
    /// has already removed.
    fn allows_trigger_replies(self) -> bool {
        self != Invocation::Answered
    }
}

async fn answer_invocation(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
    guild_id: u64,
) -> Result<Invocation, Error> {
    let Some(name) = parse_snippet_invocation(&message.content) else {
        return Ok(Invocation::NotInvoked);
    };
    let Some(snippet) = data.snippets.get(guild_id, name).await? else {
        return Ok(Invocation::UnknownSnippet);
    };

    let embed = embed_for(ctx, &snippet, message).await;
    message
        .channel_id
        .send_message(ctx, CreateMessage::new().embed(embed))
        .await?;
    if let Err(e) = message.delete(ctx).await {
        tracing::warn!(guild_id, "Failed to delete snippet invocation: {e}");
    }
    Ok(Invocation::Answered)
}

/// Answer a guild message with snippets where it asks for one or sets off a
/// trigger. Only runs when the guild has utility commands enabled.
pub async fn respond_to_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
    guild_id: u64,
) -> Result<(), Error> {
    let channel_id = message.channel_id.get();

    let invocation = answer_invocation(ctx, message, data, guild_id).await?;
    if !invocation.allows_trigger_replies() {
        return Ok(());
    }

    let triggers = data.snippets.guild_triggers(guild_id).await?;

    if let Some(snippet) = data
        .snippets
        .resolve_trigger(guild_id, &triggers, &message.content, channel_id)
        .await?
    {
        reply_with_snippet(ctx, message, &snippet).await?;
    }

    if extract_links(&message.content).is_empty() {
        return Ok(());
    }

    if let Err(e) = message.react(ctx, '👀').await {
        tracing::debug!("Failed to react to link: {e}");
    }

    if let Some(snippet) = data
        .snippets
        .resolve_paste_trigger(
            data.pastes.as_ref(),
            guild_id,
            &triggers,
            &message.content,
            channel_id,
        )
        .await?
    {
        reply_with_snippet(ctx, message, &snippet).await?;
    }

    Ok(())
}

async fn reply_with_snippet(
    ctx: &serenity::Context,
    message: &serenity::Message,
    snippet: &Snippet,
) -> Result<(), Error> {
    let embed = embed_for(ctx, snippet, message).await;
    message
        .channel_id
        .send_message(
            ctx,
            CreateMessage::new()
                .content(TRIGGER_REPLY)
                .embed(embed)
                .reference_message(message),
        )
        .await?;
    Ok(())
}
