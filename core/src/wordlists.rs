// Exclusion and replacement wordlists
//
// `WordlistManager` caches the server-side index of one wordlist family and
// re-fetches it after every mutation. `WordlistEditor` is the working copy of
// a family's items; the exclusion copy feeds word frequency requests and the
// replacement copy feeds word cloud playback.

use crate::api::{
    ExclusionWordlist, Replacement, ReplacementWordlist, WordlistRecord, WordlistSource,
};
use crate::{ChatScopeError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct Cache<L> {
    lists: Vec<L>,
    loading: bool,
    error: Option<String>,
}

impl<L> Default for Cache<L> {
    fn default() -> Self {
        Self {
            lists: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

pub struct WordlistManager<L: WordlistRecord> {
    source: Arc<dyn WordlistSource<L>>,
    cache: RwLock<Cache<L>>,
}

impl<L: WordlistRecord> WordlistManager<L> {
    pub fn new(source: Arc<dyn WordlistSource<L>>) -> Self {
        Self {
            source,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// Reload the index. Failures are recorded, the previous index is kept.
    pub async fn refresh(&self) {
        self.cache.write().await.loading = true;
        let result = self.source.list_wordlists().await;

        let mut cache = self.cache.write().await;
        match result {
            Ok(lists) => {
                debug!(target: "wordlists", endpoint = L::ENDPOINT, count = lists.len(), "Loaded wordlists");
                cache.lists = lists;
                cache.error = None;
            }
            Err(e) => {
                warn!(target: "wordlists", endpoint = L::ENDPOINT, error = %e, "Failed to load wordlists");
                cache.error = Some(e.to_string());
            }
        }
        cache.loading = false;
    }

    pub async fn save(&self, name: &str, items: Vec<L::Item>) -> Result<L> {
        let created = self.source.create_wordlist(name.to_string(), items).await?;
        info!(target: "wordlists", endpoint = L::ENDPOINT, id = created.id(), name = created.name(), "Created wordlist");
        self.refresh().await;
        Ok(created)
    }

    pub async fn update(&self, id: i64, items: Vec<L::Item>) -> Result<L> {
        let updated = self.source.update_wordlist(id, items).await?;
        info!(target: "wordlists", endpoint = L::ENDPOINT, id, "Updated wordlist");
        self.refresh().await;
        Ok(updated)
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        self.source.delete_wordlist(id).await?;
        info!(target: "wordlists", endpoint = L::ENDPOINT, id, "Deleted wordlist");
        self.refresh().await;
        Ok(())
    }

    /// Fetch one list from the backend, bypassing the cache.
    pub async fn get(&self, id: i64) -> Result<L> {
        self.source.get_wordlist(id).await
    }

    pub async fn wordlists(&self) -> Vec<L> {
        self.cache.read().await.lists.clone()
    }

    pub async fn cached(&self, id: i64) -> Option<L> {
        self.cache
            .read()
            .await
            .lists
            .iter()
            .find(|l| l.id() == id)
            .cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.cache.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.cache.read().await.error.clone()
    }
}

/// Working copy of one wordlist family's items with an optional backing list.
///
/// `is_modified` tracks edits since the last selection, save or update.
pub struct WordlistEditor<L: WordlistRecord> {
    manager: Arc<WordlistManager<L>>,
    items: Vec<L::Item>,
    selected_id: Option<i64>,
    is_modified: bool,
}

pub type ExclusionEditor = WordlistEditor<ExclusionWordlist>;
pub type ReplacementEditor = WordlistEditor<ReplacementWordlist>;

impl<L: WordlistRecord> WordlistEditor<L> {
    pub fn new(manager: Arc<WordlistManager<L>>) -> Self {
        Self {
            manager,
            items: Vec::new(),
            selected_id: None,
            is_modified: false,
        }
    }

    pub fn manager(&self) -> &Arc<WordlistManager<L>> {
        &self.manager
    }

    pub fn items(&self) -> &[L::Item] {
        &self.items
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.selected_id
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Replace the working items wholesale.
    pub fn set_items(&mut self, items: Vec<L::Item>) {
        self.items = items;
        self.is_modified = true;
    }

    /// `None` clears the working set. A failed load leaves the editor as it was.
    pub async fn select(&mut self, id: Option<i64>) -> Result<()> {
        let Some(id) = id else {
            self.clear();
            return Ok(());
        };
        let list = self.manager.get(id).await.map_err(|e| {
            warn!(target: "wordlists", endpoint = L::ENDPOINT, id, error = %e, "Failed to load wordlist");
            e
        })?;
        self.items = list.items().to_vec();
        self.selected_id = Some(id);
        self.is_modified = false;
        Ok(())
    }

    /// Persist the working set under a new name and select it.
    pub async fn save_as(&mut self, name: &str) -> Result<L> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatScopeError::InvalidRequest(
                "wordlist name must not be empty".to_string(),
            ));
        }
        let created = self.manager.save(name, self.items.clone()).await?;
        self.selected_id = Some(created.id());
        self.is_modified = false;
        Ok(created)
    }

    /// Write pending edits to the selected list. No-op without a selection
    /// or without edits.
    pub async fn update_selected(&mut self) -> Result<Option<L>> {
        let Some(id) = self.selected_id else {
            return Ok(None);
        };
        if !self.is_modified {
            return Ok(None);
        }
        let updated = self.manager.update(id, self.items.clone()).await?;
        self.is_modified = false;
        Ok(Some(updated))
    }

    /// Delete the selected list and clear the working set.
    pub async fn delete_selected(&mut self) -> Result<bool> {
        let Some(id) = self.selected_id else {
            return Ok(false);
        };
        self.manager.remove(id).await?;
        self.clear();
        Ok(true)
    }

    fn clear(&mut self) {
        self.selected_id = None;
        self.items.clear();
        self.is_modified = false;
    }
}

impl WordlistEditor<ExclusionWordlist> {
    pub fn words(&self) -> &[String] {
        &self.items
    }

    /// Returns false for blank or already present words.
    pub fn add_word(&mut self, word: &str) -> bool {
        let word = word.trim();
        if word.is_empty() || self.items.iter().any(|w| w == word) {
            return false;
        }
        self.items.push(word.to_string());
        self.is_modified = true;
        true
    }

    pub fn remove_word(&mut self, word: &str) {
        self.items.retain(|w| w != word);
        self.is_modified = true;
    }
}

impl WordlistEditor<ReplacementWordlist> {
    pub fn rules(&self) -> &[Replacement] {
        &self.items
    }

    /// Adds `source -> target`, replacing any rule with the same source.
    /// Returns false when either side is blank.
    pub fn add_rule(&mut self, source: &str, target: &str) -> bool {
        let (source, target) = (source.trim(), target.trim());
        if source.is_empty() || target.is_empty() {
            return false;
        }
        self.items.retain(|r| r.source != source);
        self.items.push(Replacement {
            source: source.to_string(),
            target: target.to_string(),
        });
        self.is_modified = true;
        true
    }

    pub fn remove_rule(&mut self, source: &str) {
        self.items.retain(|r| r.source != source);
        self.is_modified = true;
    }
}
