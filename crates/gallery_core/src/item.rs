use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// A discovered image plus whatever display metadata the scraper attached.
///
/// Fields the coordinator does not know about are preserved in `extra` so they
/// round-trip to UI observers and checkpoints untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            thumbnail: None,
            filename: None,
            width: None,
            height: None,
            extra: Map::new(),
        }
    }

    /// Dedup key for this item.
    pub fn identity(&self) -> String {
        normalize_identity(&self.url)
    }
}

/// Normalize a URL for dedupe: lower-case scheme/host and drop the fragment.
///
/// Values that are not absolute URLs with a host (relative paths, `data:`
/// URIs, opaque ids) are only trimmed.
pub fn normalize_identity(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) if url.has_host() => {
            url.set_fragment(None);
            url.to_string()
        }
        _ => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AddOutcome {
    pub total: usize,
    pub added: usize,
    pub skipped: usize,
}

/// Insertion-ordered item list with unique identities.
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    items: Vec<Item>,
    identities: HashSet<String>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every item whose identity is not yet present.
    ///
    /// Duplicates inside `batch` itself are skipped as well, so
    /// `added + skipped` always equals the batch length.
    pub fn add<I>(&mut self, batch: I) -> AddOutcome
    where
        I: IntoIterator<Item = Item>,
    {
        let mut added = 0;
        let mut skipped = 0;
        for item in batch {
            if self.identities.insert(item.identity()) {
                self.items.push(item);
                added += 1;
            } else {
                skipped += 1;
            }
        }
        AddOutcome {
            total: self.items.len(),
            added,
            skipped,
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.identities.contains(&normalize_identity(url))
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.identities.clear();
    }
}
