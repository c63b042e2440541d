// Snippet and trigger management commands.

use crate::core::snippets::{
    parse_channel_mentions, SnippetEdit, SnippetError, SnippetTrigger, TriggerEdit,
};
use crate::discord::checks::utility_enabled;
use crate::discord::{guild_of, say_ephemeral, Context, Error};
use poise::serenity_prelude as serenity;

/// Reply with a user-facing snippet error, propagate storage failures.
async fn report(ctx: Context<'_>, error: SnippetError) -> Result<(), Error> {
    match error {
        SnippetError::StorageError(_) => Err(error.into()),
        other => say_ephemeral(ctx, format!("❌ {other}")).await,
    }
}

/// Manage snippets.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("snippet_create", "snippet_edit", "snippet_delete", "snippet_list"),
    subcommand_required
)]
pub async fn snippet(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create a new snippet.
#[poise::command(slash_command, guild_only, rename = "create", check = "utility_enabled")]
pub async fn snippet_create(
    ctx: Context<'_>,
    #[description = "The snippet name"] name: String,
    #[description = "The snippet content"] content: String,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    match ctx
        .data()
        .snippets
        .create(guild_id, ctx.author().id.get(), &name, &content)
        .await
    {
        Ok(snippet) => {
            say_ephemeral(ctx, format!("✅ Snippet `{}` created successfully!", snippet.name)).await
        }
        Err(e) => report(ctx, e).await,
    }
}

/// Edit an existing snippet.
#[poise::command(slash_command, guild_only, rename = "edit", check = "utility_enabled")]
pub async fn snippet_edit(
    ctx: Context<'_>,
    #[description = "The snippet name to edit"] name: String,
    #[description = "The new name for the snippet"] new_name: Option<String>,
    #[description = "The new content for the snippet"] new_content: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let edit = SnippetEdit {
        new_name,
        new_content,
    };
    match ctx.data().snippets.edit(guild_id, &name, edit).await {
        Ok(_) => say_ephemeral(ctx, format!("✅ Snippet `{}` updated successfully!", name.trim())).await,
        Err(e) => report(ctx, e).await,
    }
}

/// Delete a snippet.
#[poise::command(slash_command, guild_only, rename = "delete", check = "utility_enabled")]
pub async fn snippet_delete(
    ctx: Context<'_>,
    #[description = "The snippet name to delete"] name: String,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    match ctx.data().snippets.delete(guild_id, &name).await {
        Ok(snippet) => {
            say_ephemeral(ctx, format!("✅ Snippet `{}` deleted successfully!", snippet.name)).await
        }
        Err(e) => report(ctx, e).await,
    }
}

/// List all snippets.
#[poise::command(slash_command, guild_only, rename = "list", check = "utility_enabled")]
pub async fn snippet_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let snippets = ctx.data().snippets.list(guild_id).await?;

    if snippets.is_empty() {
        return say_ephemeral(ctx, "No snippets found on this server.").await;
    }

    let names: Vec<String> = snippets.iter().map(|s| format!("`{}`", s.name)).collect();
    let embed = serenity::CreateEmbed::new()
        .title("📌 Snippets")
        .description(names.join(", "))
        .color(serenity::Colour::new(crate::discord::snippet_responder::SNIPPET_COLOR));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Manage snippet triggers.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("trigger_create", "trigger_edit", "trigger_delete", "trigger_list"),
    subcommand_required,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn trigger(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create a new trigger.
#[poise::command(
    slash_command,
    guild_only,
    rename = "create",
    check = "utility_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn trigger_create(
    ctx: Context<'_>,
    #[description = "The snippet name"] name: String,
    #[description = "The trigger word/phrase"] trigger: String,
    #[description = "The channels the trigger should listen in"] channels: String,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let channels = parse_channel_mentions(&channels);

    match ctx
        .data()
        .snippets
        .create_trigger(guild_id, &name, &trigger, channels)
        .await
    {
        Ok(created) => {
            say_ephemeral(
                ctx,
                format!(
                    "Trigger \"{}\" for snippet \"{}\" has been created successfully!",
                    created.phrase,
                    name.trim()
                ),
            )
            .await
        }
        Err(e) => report(ctx, e).await,
    }
}

/// Edit an existing trigger.
#[poise::command(
    slash_command,
    guild_only,
    rename = "edit",
    check = "utility_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn trigger_edit(
    ctx: Context<'_>,
    #[description = "The trigger to edit"] trigger: String,
    #[description = "The new trigger word/phrase"] new_trigger: Option<String>,
    #[description = "The new channels it should trigger in"] new_channels: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let edit = TriggerEdit {
        new_phrase: new_trigger,
        new_channels: new_channels.as_deref().map(parse_channel_mentions),
    };

    match ctx
        .data()
        .snippets
        .edit_trigger(guild_id, &trigger, edit)
        .await
    {
        Ok(updated) => {
            say_ephemeral(
                ctx,
                format!("Trigger \"{}\" has been updated successfully.", updated.phrase),
            )
            .await
        }
        Err(e) => report(ctx, e).await,
    }
}

/// Delete a trigger.
#[poise::command(
    slash_command,
    guild_only,
    rename = "delete",
    check = "utility_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn trigger_delete(
    ctx: Context<'_>,
    #[description = "The trigger to delete"] trigger: String,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    match ctx.data().snippets.delete_trigger(guild_id, &trigger).await {
        Ok(()) => {
            say_ephemeral(
                ctx,
                format!(
                    "Trigger \"{}\" has been deleted successfully.",
                    trigger.trim().to_lowercase()
                ),
            )
            .await
        }
        Err(e) => report(ctx, e).await,
    }
}

pub fn triggers_embed(snippet_name: &str, triggers: &[SnippetTrigger]) -> serenity::CreateEmbed {
    let entries: Vec<String> = triggers
        .iter()
        .map(|t| {
            let channels: Vec<String> = t.channels.iter().map(|id| format!("<#{id}>")).collect();
            format!(
                "**Trigger:** {} \n**Channels:** {}",
                t.phrase,
                channels.join(", ")
            )
        })
        .collect();

    serenity::CreateEmbed::new()
        .title(format!("Triggers for snippet \"{snippet_name}\""))
        .description(entries.join("\n\n"))
        .color(serenity::Colour::new(0x3498db))
}

/// List triggers for a snippet.
#[poise::command(
    slash_command,
    guild_only,
    rename = "list",
    check = "utility_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn trigger_list(
    ctx: Context<'_>,
    #[description = "Name of the snippet"] name: String,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let (snippet, triggers) = match ctx.data().snippets.triggers_for(guild_id, &name).await {
        Ok(found) => found,
        Err(e) => return report(ctx, e).await,
    };

    if triggers.is_empty() {
        return say_ephemeral(
            ctx,
            format!("No triggers found for snippet \"{}\".", snippet.name),
        )
        .await;
    }

    ctx.send(
        poise::CreateReply::default()
            .embed(triggers_embed(&snippet.name, &triggers))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
