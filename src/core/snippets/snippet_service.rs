// Snippet service - CRUD for snippets and their triggers, plus trigger lookup
// for incoming messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use super::paste::PasteFetcher;
use super::snippet_models::{
    extract_links, find_trigger_match, Snippet, SnippetEdit, SnippetTrigger, TriggerEdit,
};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SnippetError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("A snippet with the name `{0}` already exists.")]
    AlreadyExists(String),

    #[error("Snippet `{0}` not found.")]
    NotFound(String),

    #[error("Snippet names cannot be empty.")]
    EmptyName,

    #[error("You must provide either a new name or new content.")]
    NothingToEdit,

    #[error("Trigger phrases cannot be empty.")]
    EmptyTrigger,

    #[error("You must provide at least one valid channel.")]
    NoChannels,

    #[error("Trigger \"{0}\" already exists.")]
    TriggerExists(String),

    #[error("Trigger \"{0}\" not found.")]
    TriggerNotFound(String),

    #[error("You must provide either a new trigger or new channels.")]
    NothingToEditTrigger,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Case-insensitive lookup by name.
    async fn find_snippet(&self, guild_id: u64, name: &str)
        -> Result<Option<Snippet>, SnippetError>;

    async fn find_snippet_by_id(
        &self,
        guild_id: u64,
        snippet_id: i64,
    ) -> Result<Option<Snippet>, SnippetError>;

    async fn insert_snippet(
        &self,
        guild_id: u64,
        author_id: u64,
        name: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Snippet, SnippetError>;

    /// Persist name, content and `updated_at` of an existing snippet.
    async fn update_snippet(&self, snippet: &Snippet) -> Result<(), SnippetError>;

    /// Delete a snippet together with its triggers.
    async fn delete_snippet(&self, guild_id: u64, snippet_id: i64) -> Result<bool, SnippetError>;

    /// All snippets of a guild, ordered by name.
    async fn list_snippets(&self, guild_id: u64) -> Result<Vec<Snippet>, SnippetError>;

    async fn find_trigger(
        &self,
        guild_id: u64,
        phrase: &str,
    ) -> Result<Option<SnippetTrigger>, SnippetError>;

    async fn insert_trigger(
        &self,
        guild_id: u64,
        snippet_id: i64,
        phrase: &str,
        channels: &[u64],
    ) -> Result<SnippetTrigger, SnippetError>;

    async fn update_trigger(&self, trigger: &SnippetTrigger) -> Result<(), SnippetError>;

    async fn delete_trigger(&self, guild_id: u64, trigger_id: i64) -> Result<bool, SnippetError>;

    /// All triggers of a guild, oldest first.
    async fn list_triggers(&self, guild_id: u64) -> Result<Vec<SnippetTrigger>, SnippetError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct SnippetService<S: SnippetStore> {
    store: S,
    /// Uniqueness is checked before writing, so writes go one at a time.
    write_lock: Mutex<()>,
}

fn clean_name(name: &str) -> Result<&str, SnippetError> {
    let name = name.trim();
    if name.is_empty() {
        Err(SnippetError::EmptyName)
    } else {
        Ok(name)
    }
}

fn clean_phrase(phrase: &str) -> Result<String, SnippetError> {
    let phrase = phrase.trim().to_lowercase();
    if phrase.is_empty() {
        Err(SnippetError::EmptyTrigger)
    } else {
        Ok(phrase)
    }
}

impl<S: SnippetStore> SnippetService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn create(
        &self,
        guild_id: u64,
        author_id: u64,
        name: &str,
        content: &str,
    ) -> Result<Snippet, SnippetError> {
        let name = clean_name(name)?;
        let _guard = self.write_lock.lock().await;

        if self.store.find_snippet(guild_id, name).await?.is_some() {
            return Err(SnippetError::AlreadyExists(name.to_string()));
        }
        self.store
            .insert_snippet(guild_id, author_id, name, content, Utc::now())
            .await
    }

    pub async fn edit(
        &self,
        guild_id: u64,
        name: &str,
        edit: SnippetEdit,
    ) -> Result<Snippet, SnippetError> {
        let new_name = edit.new_name.as_deref().map(clean_name).transpose()?;
        let new_content = edit.new_content.filter(|c| !c.trim().is_empty());
        if new_name.is_none() && new_content.is_none() {
            return Err(SnippetError::NothingToEdit);
        }

        let _guard = self.write_lock.lock().await;
        let mut snippet = self
            .store
            .find_snippet(guild_id, name.trim())
            .await?
            .ok_or_else(|| SnippetError::NotFound(name.trim().to_string()))?;

        if let Some(new_name) = new_name {
            if let Some(other) = self.store.find_snippet(guild_id, new_name).await? {
                if other.id != snippet.id {
                    return Err(SnippetError::AlreadyExists(new_name.to_string()));
                }
            }
            snippet.name = new_name.to_string();
        }
        if let Some(content) = new_content {
            snippet.content = content;
        }
        snippet.updated_at = Utc::now();

        self.store.update_snippet(&snippet).await?;
        Ok(snippet)
    }

    pub async fn delete(&self, guild_id: u64, name: &str) -> Result<Snippet, SnippetError> {
        let _guard = self.write_lock.lock().await;
        let snippet = self
            .store
            .find_snippet(guild_id, name.trim())
            .await?
            .ok_or_else(|| SnippetError::NotFound(name.trim().to_string()))?;

        self.store.delete_snippet(guild_id, snippet.id).await?;
        Ok(snippet)
    }

    pub async fn get(&self, guild_id: u64, name: &str) -> Result<Option<Snippet>, SnippetError> {
        self.store.find_snippet(guild_id, name.trim()).await
    }

    pub async fn list(&self, guild_id: u64) -> Result<Vec<Snippet>, SnippetError> {
        self.store.list_snippets(guild_id).await
    }

    pub async fn create_trigger(
        &self,
        guild_id: u64,
        snippet_name: &str,
        phrase: &str,
        channels: Vec<u64>,
    ) -> Result<SnippetTrigger, SnippetError> {
        let phrase = clean_phrase(phrase)?;
        if channels.is_empty() {
            return Err(SnippetError::NoChannels);
        }

        let _guard = self.write_lock.lock().await;
        let snippet = self
            .store
            .find_snippet(guild_id, snippet_name.trim())
            .await?
            .ok_or_else(|| SnippetError::NotFound(snippet_name.trim().to_string()))?;

        if self.store.find_trigger(guild_id, &phrase).await?.is_some() {
            return Err(SnippetError::TriggerExists(phrase));
        }
        self.store
            .insert_trigger(guild_id, snippet.id, &phrase, &channels)
            .await
    }

    pub async fn edit_trigger(
        &self,
        guild_id: u64,
        phrase: &str,
        edit: TriggerEdit,
    ) -> Result<SnippetTrigger, SnippetError> {
        let new_phrase = edit.new_phrase.as_deref().map(clean_phrase).transpose()?;
        if new_phrase.is_none() && edit.new_channels.is_none() {
            return Err(SnippetError::NothingToEditTrigger);
        }
        if matches!(&edit.new_channels, Some(channels) if channels.is_empty()) {
            return Err(SnippetError::NoChannels);
        }

        let phrase = clean_phrase(phrase)?;
        let _guard = self.write_lock.lock().await;
        let mut trigger = self
            .store
            .find_trigger(guild_id, &phrase)
            .await?
            .ok_or(SnippetError::TriggerNotFound(phrase))?;

        if let Some(new_phrase) = new_phrase {
            if let Some(other) = self.store.find_trigger(guild_id, &new_phrase).await? {
                if other.id != trigger.id {
                    return Err(SnippetError::TriggerExists(new_phrase));
                }
            }
            trigger.phrase = new_phrase;
        }
        if let Some(channels) = edit.new_channels {
            trigger.channels = channels;
        }

        self.store.update_trigger(&trigger).await?;
        Ok(trigger)
    }

    pub async fn delete_trigger(&self, guild_id: u64, phrase: &str) -> Result<(), SnippetError> {
        let phrase = clean_phrase(phrase)?;
        let _guard = self.write_lock.lock().await;
        let trigger = self
            .store
            .find_trigger(guild_id, &phrase)
            .await?
            .ok_or(SnippetError::TriggerNotFound(phrase))?;

        self.store.delete_trigger(guild_id, trigger.id).await?;
        Ok(())
    }

    /// A snippet and the triggers attached to it.
    pub async fn triggers_for(
        &self,
        guild_id: u64,
        snippet_name: &str,
    ) -> Result<(Snippet, Vec<SnippetTrigger>), SnippetError> {
        let snippet = self
            .store
            .find_snippet(guild_id, snippet_name.trim())
            .await?
            .ok_or_else(|| SnippetError::NotFound(snippet_name.trim().to_string()))?;

        let triggers = self
            .store
            .list_triggers(guild_id)
            .await?
            .into_iter()
            .filter(|t| t.snippet_id == snippet.id)
            .collect();
        Ok((snippet, triggers))
    }

    /// All triggers of a guild, for matching several texts against them.
    pub async fn guild_triggers(&self, guild_id: u64) -> Result<Vec<SnippetTrigger>, SnippetError> {
        self.store.list_triggers(guild_id).await
    }

    /// The snippet of the first trigger in `triggers` that `text` sets off in
    /// `channel_id`.
    pub async fn resolve_trigger(
        &self,
        guild_id: u64,
        triggers: &[SnippetTrigger],
        text: &str,
        channel_id: u64,
    ) -> Result<Option<Snippet>, SnippetError> {
        match find_trigger_match(triggers, text, channel_id) {
            Some(trigger) => {
                self.store
                    .find_snippet_by_id(guild_id, trigger.snippet_id)
                    .await
            }
            None => Ok(None),
        }
    }

    /// Follow paste links in `content` and match the pasted text against
    /// `triggers`. Links that fail to load are skipped.
    pub async fn resolve_paste_trigger<F: PasteFetcher + ?Sized>(
        &self,
        fetcher: &F,
        guild_id: u64,
        triggers: &[SnippetTrigger],
        content: &str,
        channel_id: u64,
    ) -> Result<Option<Snippet>, SnippetError> {
        if triggers.is_empty() {
            return Ok(None);
        }

        for link in extract_links(content) {
            let text = match fetcher.fetch_paste(link).await {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(link, error = %e, "Could not load paste");
                    continue;
                }
            };

            if let Some(snippet) = self
                .resolve_trigger(guild_id, triggers, &text, channel_id)
                .await?
            {
                return Ok(Some(snippet));
            }
        }

        Ok(None)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snippets::PasteError;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[derive(Default)]
    struct MockSnippetStore {
        snippets: DashMap<i64, Snippet>,
        triggers: DashMap<i64, SnippetTrigger>,
        next_id: AtomicI64,
    }

    impl MockSnippetStore {
        fn next_id(&self) -> i64 {
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    #[async_trait]
    impl SnippetStore for MockSnippetStore {
        async fn find_snippet(
            &self,
            guild_id: u64,
            name: &str,
        ) -> Result<Option<Snippet>, SnippetError> {
            Ok(self
                .snippets
                .iter()
                .find(|s| s.guild_id == guild_id && s.name.eq_ignore_ascii_case(name))
                .map(|s| s.value().clone()))
        }

        async fn find_snippet_by_id(
            &self,
            guild_id: u64,
            snippet_id: i64,
        ) -> Result<Option<Snippet>, SnippetError> {
            Ok(self
                .snippets
                .get(&snippet_id)
                .filter(|s| s.guild_id == guild_id)
                .map(|s| s.value().clone()))
        }

        async fn insert_snippet(
            &self,
            guild_id: u64,
            author_id: u64,
            name: &str,
            content: &str,
            now: DateTime<Utc>,
        ) -> Result<Snippet, SnippetError> {
            let snippet = Snippet {
                id: self.next_id(),
                guild_id,
                author_id,
                name: name.to_string(),
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            };
            self.snippets.insert(snippet.id, snippet.clone());
            Ok(snippet)
        }

        async fn update_snippet(&self, snippet: &Snippet) -> Result<(), SnippetError> {
            self.snippets.insert(snippet.id, snippet.clone());
            Ok(())
        }

        async fn delete_snippet(&self, _: u64, snippet_id: i64) -> Result<bool, SnippetError> {
            self.triggers.retain(|_, t| t.snippet_id != snippet_id);
            Ok(self.snippets.remove(&snippet_id).is_some())
        }

        async fn list_snippets(&self, guild_id: u64) -> Result<Vec<Snippet>, SnippetError> {
            let mut all: Vec<Snippet> = self
                .snippets
                .iter()
                .filter(|s| s.guild_id == guild_id)
                .map(|s| s.value().clone())
                .collect();
            all.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(all)
        }

        async fn find_trigger(
            &self,
            guild_id: u64,
            phrase: &str,
        ) -> Result<Option<SnippetTrigger>, SnippetError> {
            Ok(self
                .triggers
                .iter()
                .find(|t| t.guild_id == guild_id && t.phrase == phrase)
                .map(|t| t.value().clone()))
        }

        async fn insert_trigger(
            &self,
            guild_id: u64,
            snippet_id: i64,
            phrase: &str,
            channels: &[u64],
        ) -> Result<SnippetTrigger, SnippetError> {
            let trigger = SnippetTrigger {
                id: self.next_id(),
                guild_id,
                snippet_id,
                phrase: phrase.to_string(),
                channels: channels.to_vec(),
            };
            self.triggers.insert(trigger.id, trigger.clone());
            Ok(trigger)
        }

        async fn update_trigger(&self, trigger: &SnippetTrigger) -> Result<(), SnippetError> {
            self.triggers.insert(trigger.id, trigger.clone());
            Ok(())
        }

        async fn delete_trigger(&self, _: u64, trigger_id: i64) -> Result<bool, SnippetError> {
            Ok(self.triggers.remove(&trigger_id).is_some())
        }

        async fn list_triggers(&self, guild_id: u64) -> Result<Vec<SnippetTrigger>, SnippetError> {
            let mut all: Vec<SnippetTrigger> = self
                .triggers
                .iter()
                .filter(|t| t.guild_id == guild_id)
                .map(|t| t.value().clone())
                .collect();
            all.sort_by_key(|t| t.id);
            Ok(all)
        }
    }

    fn make_service() -> SnippetService<MockSnippetStore> {
        SnippetService::new(MockSnippetStore::default())
    }

    #[tokio::test]
    async fn snippet_names_are_unique_ignoring_case() {
        let service = make_service();

        service.create(1, 5, "Rules", "Be nice").await.unwrap();
        let err = service.create(1, 5, "rules", "again").await.unwrap_err();
        assert!(matches!(err, SnippetError::AlreadyExists(name) if name == "rules"));

        // Other guilds have their own namespace.
        assert!(service.create(2, 5, "rules", "ok").await.is_ok());
        assert_eq!(
            service.get(1, "RULES").await.unwrap().unwrap().content,
            "Be nice"
        );
    }

    #[tokio::test]
    async fn empty_names_are_rejected() {
        let service = make_service();
        assert!(matches!(
            service.create(1, 5, "   ", "x").await,
            Err(SnippetError::EmptyName)
        ));
    }

    #[tokio::test]
    async fn edit_needs_a_change_and_an_existing_snippet() {
        let service = make_service();
        service.create(1, 5, "faq", "old").await.unwrap();
        service.create(1, 5, "rules", "r").await.unwrap();

        assert!(matches!(
            service.edit(1, "faq", SnippetEdit::default()).await,
            Err(SnippetError::NothingToEdit)
        ));
        assert!(matches!(
            service
                .edit(
                    1,
                    "missing",
                    SnippetEdit {
                        new_content: Some("x".into()),
                        ..Default::default()
                    }
                )
                .await,
            Err(SnippetError::NotFound(_))
        ));
        assert!(matches!(
            service
                .edit(
                    1,
                    "faq",
                    SnippetEdit {
                        new_name: Some("RULES".into()),
                        ..Default::default()
                    }
                )
                .await,
            Err(SnippetError::AlreadyExists(_))
        ));

        let edited = service
            .edit(
                1,
                "FAQ",
                SnippetEdit {
                    new_name: Some("help".into()),
                    new_content: Some("new".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.name, "help");
        assert_eq!(edited.content, "new");
        assert!(service.get(1, "faq").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn renaming_to_a_different_case_of_itself_is_allowed() {
        let service = make_service();
        service.create(1, 5, "faq", "x").await.unwrap();

        let edited = service
            .edit(
                1,
                "faq",
                SnippetEdit {
                    new_name: Some("FAQ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.name, "FAQ");
    }

    #[tokio::test]
    async fn deleting_a_snippet_drops_its_triggers() {
        let service = make_service();
        service.create(1, 5, "faq", "x").await.unwrap();
        service
            .create_trigger(1, "faq", "help me", vec![10])
            .await
            .unwrap();

        service.delete(1, "faq").await.unwrap();

        assert!(service.guild_triggers(1).await.unwrap().is_empty());
        assert!(matches!(
            service.delete(1, "faq").await,
            Err(SnippetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn triggers_are_lowercased_and_validated() {
        let service = make_service();
        service.create(1, 5, "faq", "x").await.unwrap();

        assert!(matches!(
            service.create_trigger(1, "faq", "hi", vec![]).await,
            Err(SnippetError::NoChannels)
        ));
        assert!(matches!(
            service.create_trigger(1, "nope", "hi", vec![1]).await,
            Err(SnippetError::NotFound(_))
        ));

        let trigger = service
            .create_trigger(1, "faq", "  How Do I ", vec![10, 11])
            .await
            .unwrap();
        assert_eq!(trigger.phrase, "how do i");

        assert!(matches!(
            service.create_trigger(1, "faq", "HOW DO I", vec![10]).await,
            Err(SnippetError::TriggerExists(_))
        ));
    }

    #[tokio::test]
    async fn trigger_edit_replaces_phrase_and_channels() {
        let service = make_service();
        service.create(1, 5, "faq", "x").await.unwrap();
        service
            .create_trigger(1, "faq", "crash", vec![10])
            .await
            .unwrap();

        assert!(matches!(
            service.edit_trigger(1, "crash", TriggerEdit::default()).await,
            Err(SnippetError::NothingToEditTrigger)
        ));
        assert!(matches!(
            service
                .edit_trigger(
                    1,
                    "crash",
                    TriggerEdit {
                        new_channels: Some(vec![]),
                        ..Default::default()
                    }
                )
                .await,
            Err(SnippetError::NoChannels)
        ));

        let edited = service
            .edit_trigger(
                1,
                "CRASH",
                TriggerEdit {
                    new_phrase: Some("Crashed".into()),
                    new_channels: Some(vec![20, 30]),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.phrase, "crashed");
        assert_eq!(edited.channels, vec![20, 30]);

        assert!(matches!(
            service.delete_trigger(1, "crash").await,
            Err(SnippetError::TriggerNotFound(_))
        ));
        service.delete_trigger(1, "crashed").await.unwrap();
    }

    #[tokio::test]
    async fn messages_resolve_to_the_triggered_snippet() {
        let service = make_service();
        let faq = service.create(1, 5, "faq", "Read the FAQ").await.unwrap();
        service.create(1, 5, "other", "y").await.unwrap();
        service
            .create_trigger(1, "faq", "how do i", vec![10])
            .await
            .unwrap();

        let triggers = service.guild_triggers(1).await.unwrap();
        let hit = service
            .resolve_trigger(1, &triggers, "So HOW DO I start?", 10)
            .await
            .unwrap();
        assert_eq!(hit.map(|s| s.id), Some(faq.id));

        let wrong_channel = service
            .resolve_trigger(1, &triggers, "how do i start", 11)
            .await
            .unwrap();
        assert!(wrong_channel.is_none());

        let (snippet, listed) = service.triggers_for(1, "FAQ").await.unwrap();
        assert_eq!(snippet.id, faq.id);
        assert_eq!(listed.len(), 1);
    }

    struct FakePastes;

    #[async_trait]
    impl PasteFetcher for FakePastes {
        async fn fetch_paste(&self, link: &str) -> Result<Option<String>, PasteError> {
            match link {
                "https://hastebin.com/crash" => Ok(Some("Exception: OUT OF MEMORY".into())),
                "https://hastebin.com/down" => Err(PasteError::Http("timeout".into())),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn paste_links_are_matched_against_triggers() {
        let service = make_service();
        let memory = service.create(1, 5, "memory", "Raise -Xmx").await.unwrap();
        service
            .create_trigger(1, "memory", "out of memory", vec![10])
            .await
            .unwrap();
        let triggers = service.guild_triggers(1).await.unwrap();

        let hit = service
            .resolve_paste_trigger(
                &FakePastes,
                1,
                &triggers,
                "log: https://hastebin.com/down https://example.com https://hastebin.com/crash",
                10,
            )
            .await
            .unwrap();
        assert_eq!(hit.map(|s| s.id), Some(memory.id));

        let other_channel = service
            .resolve_paste_trigger(&FakePastes, 1, &triggers, "https://hastebin.com/crash", 99)
            .await
            .unwrap();
        assert!(other_channel.is_none());
    }
}
