// Paste-site port. Messages often link a log on a paste site instead of
// pasting it; the text behind the link is matched against triggers too.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasteError {
    #[error("Paste request failed: {0}")]
    Http(String),
}

#[async_trait]
pub trait PasteFetcher: Send + Sync {
    /// The raw text behind `link`, or `None` when the link is not a paste
    /// this fetcher understands.
    async fn fetch_paste(&self, link: &str) -> Result<Option<String>, PasteError>;
}
