use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;

use crate::core::snippets::{PasteError, PasteFetcher};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads pastes from hastebin-style sites, where `https://host/key.ext` is
/// the rendered page and `https://host/raw/key` the plain text.
pub struct HastebinClient {
    client: Client,
}

impl HastebinClient {
    pub fn new() -> Result<Self, PasteError> {
        let mut headers = HeaderMap::new();
        headers.insert("User-Agent", HeaderValue::from_static("DoritoBot/0.3"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PasteError::Http(e.to_string()))?;

        Ok(Self { client })
    }

    async fn get_text(&self, url: &str) -> Result<Option<String>, PasteError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PasteError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        response
            .text()
            .await
            .map(Some)
            .map_err(|e| PasteError::Http(e.to_string()))
    }
}

/// `https://host/raw/key` for a paste link. Links already pointing at the raw
/// text are returned as they are; links without a key give `None`.
pub fn raw_url(link: &str) -> Option<String> {
    if link.contains("/raw/") {
        return Some(link.to_string());
    }

    let (scheme, rest) = link.split_once("://")?;
    let (host, path) = rest.split_once('/')?;
    let key = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    if host.is_empty() || key.is_empty() || key.contains('/') {
        return None;
    }

    let key = key.split('.').next().unwrap_or(key);
    Some(format!("{scheme}://{host}/raw/{key}"))
}

#[async_trait]
impl PasteFetcher for HastebinClient {
    async fn fetch_paste(&self, link: &str) -> Result<Option<String>, PasteError> {
        let Some(raw) = raw_url(link) else {
            return Ok(None);
        };

        // Only follow pages that identify as hastebin, any other site with a
        // `/key` path would otherwise be fetched as a paste.
        if raw != link {
            match self.get_text(link).await? {
                Some(page) if page.to_lowercase().contains("hastebin") => {}
                _ => return Ok(None),
            }
        }

        self.get_text(&raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_links_map_to_raw_links() {
        assert_eq!(
            raw_url("https://hastebin.com/abcdef.rs").as_deref(),
            Some("https://hastebin.com/raw/abcdef")
        );
        assert_eq!(
            raw_url("https://paste.example.org/qwerty").as_deref(),
            Some("https://paste.example.org/raw/qwerty")
        );
        assert_eq!(
            raw_url("http://hastebin.com/key.txt?lang=rs").as_deref(),
            Some("http://hastebin.com/raw/key")
        );
    }

    #[test]
    fn raw_links_are_kept() {
        assert_eq!(
            raw_url("https://hastebin.com/raw/abcdef").as_deref(),
            Some("https://hastebin.com/raw/abcdef")
        );
    }

    #[test]
    fn links_without_a_single_key_are_ignored() {
        assert!(raw_url("https://hastebin.com/").is_none());
        assert!(raw_url("https://hastebin.com").is_none());
        assert!(raw_url("https://github.com/user/repo").is_none());
        assert!(raw_url("not a link").is_none());
    }

    #[test]
    fn client_builds() {
        assert!(HastebinClient::new().is_ok());
    }
}
