// Snippet and trigger models, plus the pure text helpers the message handler
// uses to spot invocations, trigger phrases and paste links.

use chrono::{DateTime, Utc};

/// Chat prefix that posts a snippet by name, e.g. `;rules`.
pub const SNIPPET_PREFIX: char = ';';

/// A reusable block of text owned by a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: i64,
    pub guild_id: u64,
    pub author_id: u64,
    /// Unique per guild, compared case-insensitively.
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A phrase that makes the bot answer with a snippet in selected channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetTrigger {
    pub id: i64,
    pub guild_id: u64,
    pub snippet_id: i64,
    /// Always stored lowercased.
    pub phrase: String,
    pub channels: Vec<u64>,
}

impl SnippetTrigger {
    /// Whether `lowercased_text` contains the phrase and was posted in one of
    /// the trigger's channels.
    pub fn matches(&self, lowercased_text: &str, channel_id: u64) -> bool {
        self.channels.contains(&channel_id) && lowercased_text.contains(self.phrase.as_str())
    }
}

/// Changes requested by `/snippet edit`.
#[derive(Debug, Clone, Default)]
pub struct SnippetEdit {
    pub new_name: Option<String>,
    pub new_content: Option<String>,
}

/// Changes requested by `/trigger edit`.
#[derive(Debug, Clone, Default)]
pub struct TriggerEdit {
    pub new_phrase: Option<String>,
    pub new_channels: Option<Vec<u64>>,
}

/// The snippet name in a `;name` message, if the message is one.
pub fn parse_snippet_invocation(content: &str) -> Option<&str> {
    let name = content.strip_prefix(SNIPPET_PREFIX)?.trim();
    (!name.is_empty()).then_some(name)
}

/// Channel ids from `<#id>` mentions, in order, without duplicates.
pub fn parse_channel_mentions(input: &str) -> Vec<u64> {
    let mut channels = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find("<#") {
        rest = &rest[start + 2..];
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, tail) = rest.split_at(digits_end);

        if tail.starts_with('>') {
            if let Ok(id) = digits.parse::<u64>() {
                if id != 0 && !channels.contains(&id) {
                    channels.push(id);
                }
            }
        }
        rest = tail;
    }

    channels
}

/// First trigger whose phrase appears in `text` and which listens in `channel_id`.
pub fn find_trigger_match<'a>(
    triggers: &'a [SnippetTrigger],
    text: &str,
    channel_id: u64,
) -> Option<&'a SnippetTrigger> {
    let lowered = text.to_lowercase();
    triggers.iter().find(|t| t.matches(&lowered, channel_id))
}

/// Every `http://` or `https://` link in a message.
pub fn extract_links(content: &str) -> Vec<&str> {
    content
        .split_whitespace()
        .filter_map(|word| {
            let start = word.find("http://").or_else(|| word.find("https://"))?;
            let link = &word[start..];
            (link.len() > "https://".len()).then_some(link)
        })
        .collect()
}
