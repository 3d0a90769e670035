//! Local persistent cache mirror.
//!
//! [`LocalCache`] owns three logical namespaces in a persistent
//! key-value store — the global auth token, per-retro-slug API tokens,
//! and UI dismissal flags — and mirrors every write synchronously into
//! memory so the rest of the system never reads the slower store
//! directly.
//!
//! Invariant: after any write the mirror and the store agree exactly, and
//! [`LocalCache::reload`] (a key-prefix scan) rebuilds the same mirror an
//! incremental sequence of writes would have produced.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Key of the global auth token.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Key prefix of per-retro API tokens: `apiToken-<slug>`.
pub const API_TOKEN_PREFIX: &str = "apiToken-";
/// Key of the home-page terms dismissal flag.
pub const HOME_TERMS_KEY: &str = "homeTermsDismissed";
/// Key of the per-retro terms dismissal list (JSON array of slugs).
pub const RETRO_TERMS_KEY: &str = "retroTermsDismissed";

/// Persistent key-value store interface (the browser-localStorage shape).
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
    fn clear(&mut self);
    fn keys(&self) -> Vec<String>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// JSON-file-backed store. The whole map is rewritten on every mutation;
/// the volumes involved (a handful of tokens and flags) make that cheap.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file
    /// exists. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    fn persist(&self) {
        match serde_json::to_string_pretty(&self.entries) {
            Ok(text) => {
                if let Err(e) = std::fs::write(&self.path, text) {
                    tracing::warn!(path = %self.path.display(), error = %e, "Cache write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Cache serialization failed"),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist();
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.persist();
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Per-retro login prompt state. Never persisted; derived from 403s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginNeeded {
    pub login: bool,
    /// Whether the prompt is due to a changed password.
    pub changed: bool,
}

/// Write-through mirror over a [`KeyValueStore`].
///
/// All writes hit the store first, then the in-memory mirror, so a crash
/// between the two leaves the durable state ahead of (never behind) what
/// the UI has been told.
pub struct LocalCache {
    store: Box<dyn KeyValueStore>,
    has_any_data: bool,
    auth_token: Option<String>,
    api_tokens: BTreeMap<String, String>,
    logins_needed: BTreeMap<String, LoginNeeded>,
    home_terms_dismissed: bool,
    retro_terms_dismissed: Vec<String>,
}

impl LocalCache {
    /// Wrap a store and derive the initial mirror from it.
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        let mut cache = Self {
            store,
            has_any_data: false,
            auth_token: None,
            api_tokens: BTreeMap::new(),
            logins_needed: BTreeMap::new(),
            home_terms_dismissed: false,
            retro_terms_dismissed: Vec::new(),
        };
        cache.reload();
        cache
    }

    /// Re-derive the entire mirror from the store by key-prefix scan.
    ///
    /// Produces the same mirror as replaying the equivalent writes
    /// incrementally, for keys that don't alias. Login prompts are
    /// session state and survive a reload untouched.
    pub fn reload(&mut self) {
        self.has_any_data = !self.store.keys().is_empty();
        self.auth_token = self.store.get(AUTH_TOKEN_KEY);

        self.api_tokens = self
            .store
            .keys()
            .into_iter()
            .filter_map(|key| {
                let slug = key.strip_prefix(API_TOKEN_PREFIX)?.to_string();
                let token = self.store.get(&key)?;
                Some((slug, token))
            })
            .collect();

        self.home_terms_dismissed = self.store.get(HOME_TERMS_KEY).as_deref() == Some("true");
        self.retro_terms_dismissed = self
            .store
            .get(RETRO_TERMS_KEY)
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
    }

    // -- Auth token ---------------------------------------------------

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn set_auth_token(&mut self, token: &str) {
        self.store.set(AUTH_TOKEN_KEY, token);
        self.auth_token = Some(token.to_string());
        self.has_any_data = true;
    }

    // -- API tokens ---------------------------------------------------

    pub fn api_token(&self, slug: &str) -> Option<&str> {
        self.api_tokens.get(slug).map(String::as_str)
    }

    pub fn api_tokens(&self) -> &BTreeMap<String, String> {
        &self.api_tokens
    }

    /// Store a retro token under its slug and clear any pending login
    /// prompt for it.
    pub fn set_api_token(&mut self, slug: &str, token: &str) {
        self.store
            .set(&format!("{API_TOKEN_PREFIX}{slug}"), token);
        self.api_tokens.insert(slug.to_string(), token.to_string());
        self.logins_needed.remove(slug);
        self.has_any_data = true;
    }

    /// Move a retro's token from its old slug key to the new one.
    ///
    /// Ordering is the contract: the new key is written and the old key
    /// deleted — store first, then mirror — before this returns, so a
    /// notification enqueued afterwards can never observe the old key.
    pub fn migrate_api_token(&mut self, old_slug: &str, new_slug: &str) {
        if old_slug == new_slug {
            return;
        }
        let Some(token) = self.api_tokens.get(old_slug).cloned() else {
            return;
        };

        self.store
            .set(&format!("{API_TOKEN_PREFIX}{new_slug}"), &token);
        self.store.remove(&format!("{API_TOKEN_PREFIX}{old_slug}"));

        self.api_tokens.remove(old_slug);
        self.api_tokens.insert(new_slug.to_string(), token);
    }

    // -- Login prompts ------------------------------------------------

    /// Drop the retro's token and flag that a login is required.
    /// Idempotent: repeating it leaves the same end state.
    pub fn mark_login_needed(&mut self, slug: &str, changed: bool) {
        self.store.remove(&format!("{API_TOKEN_PREFIX}{slug}"));
        self.api_tokens.remove(slug);
        self.logins_needed
            .insert(slug.to_string(), LoginNeeded { login: true, changed });
    }

    pub fn login_needed(&self, slug: &str) -> Option<LoginNeeded> {
        self.logins_needed.get(slug).copied()
    }

    // -- Dismissal flags ----------------------------------------------

    pub fn home_terms_dismissed(&self) -> bool {
        self.home_terms_dismissed
    }

    pub fn set_home_terms_dismissed(&mut self) {
        self.store.set(HOME_TERMS_KEY, "true");
        self.home_terms_dismissed = true;
        self.has_any_data = true;
    }

    pub fn retro_terms_dismissed(&self, slug: &str) -> bool {
        self.retro_terms_dismissed.iter().any(|s| s == slug)
    }

    pub fn set_retro_terms_dismissed(&mut self, slug: &str) {
        if self.retro_terms_dismissed(slug) {
            return;
        }
        self.retro_terms_dismissed.push(slug.to_string());
        let serialized = serde_json::to_string(&self.retro_terms_dismissed)
            .expect("a vec of strings serializes");
        self.store.set(RETRO_TERMS_KEY, &serialized);
        self.has_any_data = true;
    }

    // -- Whole-cache operations ---------------------------------------

    pub fn has_any_data(&self) -> bool {
        self.has_any_data
    }

    /// Wipe the store and the mirror.
    pub fn clear(&mut self) {
        self.store.clear();
        self.has_any_data = false;
        self.auth_token = None;
        self.api_tokens.clear();
        self.logins_needed.clear();
        self.home_terms_dismissed = false;
        self.retro_terms_dismissed.clear();
    }

    /// Direct access to the underlying store, for tests that simulate
    /// out-of-band writes.
    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut dyn KeyValueStore {
        self.store.as_mut()
    }
}
