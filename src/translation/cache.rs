/*!
 * Translation caching functionality.
 *
 * Content-addressed, file-backed cache mapping (content, language pair,
 * glossary, provider, model) to a translation and its quality score.
 *
 * Layout under the cache directory:
 * - `index.json`: version tag plus every entry keyed by cache key
 * - `entries/<key>.json`: one file per entry
 * - `metadata.json`: last seen glossary hash, provider and model
 *
 * I/O failures are logged and swallowed; a broken cache degrades to misses.
 */

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::logging::LogContext;
use super::invalidation::{InvalidationContext, InvalidationPolicy, InvalidationResult};

pub const CACHE_VERSION: &str = "1.0";
const INDEX_FILE: &str = "index.json";
const METADATA_FILE: &str = "metadata.json";
const ENTRIES_DIR: &str = "entries";

/// Components identifying one cacheable translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey<'a> {
    pub content: &'a str,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    /// Glossary content; hashed into the key
    pub glossary: Option<&'a str>,
    pub provider: &'a str,
    pub model: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub source_hash: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Empty when no glossary was used
    pub glossary_hash: String,
    pub translation: String,
    pub quality_score: f64,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub provider: String,
    pub model: String,
}

impl CacheEntry {
    pub fn created_at_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub size_bytes: u64,
    pub version: String,
}

/// State carried across runs for policy evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_hash: Option<String>,
    /// Last glossary hash seen per target language
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub glossary_hashes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_invalidation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheIndex {
    version: String,
    #[serde(default)]
    entries: HashMap<String, CacheEntry>,
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            entries: HashMap::new(),
        }
    }
}

/// First 16 hex characters of the SHA-256 of `content`
pub fn hash_content(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Deterministic key for a cache lookup
pub fn generate_cache_key(key: &CacheKey) -> String {
    let glossary_hash = key
        .glossary
        .map(hash_content)
        .unwrap_or_else(|| "none".to_string());

    format!(
        "{}_{}_{}_{}_{}_{}",
        hash_content(key.content),
        key.source_lang,
        key.target_lang,
        glossary_hash,
        key.provider,
        key.model
    )
}

/// Store interface used by the translation engine
pub trait TranslationCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    fn set(&self, key: &CacheKey, translation: &str, quality_score: f64);

    fn delete(&self, key: &CacheKey) -> bool;

    fn clear(&self);

    fn stats(&self) -> CacheStats;

    /// Run the configured invalidation policies; returns entries removed
    fn apply_policies(&self, context: &InvalidationContext) -> usize;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Cache used when caching is disabled; every lookup misses
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl TranslationCache for NullCache {
    fn get(&self, _key: &CacheKey) -> Option<CacheEntry> {
        None
    }

    fn set(&self, _key: &CacheKey, _translation: &str, _quality_score: f64) {}

    fn delete(&self, _key: &CacheKey) -> bool {
        false
    }

    fn clear(&self) {}

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: 0,
            size_bytes: 0,
            version: CACHE_VERSION.to_string(),
        }
    }

    fn apply_policies(&self, _context: &InvalidationContext) -> usize {
        0
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

struct CacheState {
    /// Loaded lazily on first access
    index: Option<CacheIndex>,
    metadata: CacheMetadata,
    policies: Vec<Box<dyn InvalidationPolicy>>,
}

/// File-backed cache
pub struct CacheManager {
    cache_dir: PathBuf,
    index_path: PathBuf,
    metadata_path: PathBuf,
    entries_dir: PathBuf,
    state: Mutex<CacheState>,
    log: LogContext,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

/// Entry keys embed model names, which may contain path separators
fn entry_file_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    format!("{}.json", safe)
}

impl CacheManager {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            index_path: cache_dir.join(INDEX_FILE),
            metadata_path: cache_dir.join(METADATA_FILE),
            entries_dir: cache_dir.join(ENTRIES_DIR),
            cache_dir,
            state: Mutex::new(CacheState {
                index: None,
                metadata: CacheMetadata::default(),
                policies: Vec::new(),
            }),
            log: LogContext::default().scoped("cache"),
        }
    }

    pub fn with_policies(self, policies: Vec<Box<dyn InvalidationPolicy>>) -> Self {
        self.state.lock().policies = policies;
        self
    }

    pub fn with_log(mut self, log: LogContext) -> Self {
        self.log = log.scoped("cache");
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn add_policy(&self, policy: Box<dyn InvalidationPolicy>) {
        self.state.lock().policies.push(policy);
    }

    /// Remove the first policy with this name
    pub fn remove_policy(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        match state.policies.iter().position(|p| p.name() == name) {
            Some(index) => {
                state.policies.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn policy_names(&self) -> Vec<String> {
        self.state.lock().policies.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn metadata(&self) -> CacheMetadata {
        let mut state = self.state.lock();
        self.ensure_initialized(&mut state);
        state.metadata.clone()
    }

    /// Every entry in the index, keyed by cache key
    pub fn entries(&self) -> HashMap<String, CacheEntry> {
        let mut state = self.state.lock();
        self.index_mut(&mut state).entries.clone()
    }

    /// Remove every entry the filter selects; returns how many went
    pub fn invalidate_matching<F>(&self, filter: F) -> usize
    where
        F: Fn(&CacheEntry, &str) -> bool,
    {
        let mut state = self.state.lock();
        self.invalidate_matching_locked(&mut state, &filter)
    }

    fn ensure_initialized(&self, state: &mut CacheState) {
        if state.index.is_some() {
            return;
        }

        if let Err(e) = std::fs::create_dir_all(&self.entries_dir) {
            self.log.warn(format!("Failed to create cache directory {}: {}", self.entries_dir.display(), e));
        }

        let index = match std::fs::read_to_string(&self.index_path) {
            Ok(data) => match serde_json::from_str::<CacheIndex>(&data) {
                Ok(index) if index.version == CACHE_VERSION => index,
                Ok(index) => {
                    self.log.warn(format!(
                        "Cache version mismatch ({} vs {}), clearing cache",
                        index.version, CACHE_VERSION
                    ));
                    self.wipe_files();
                    CacheIndex::default()
                }
                Err(_) => {
                    self.log.warn("Failed to load cache index, creating new one");
                    CacheIndex::default()
                }
            },
            Err(_) => CacheIndex::default(),
        };
        state.index = Some(index);

        state.metadata = std::fs::read_to_string(&self.metadata_path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default();
    }

    fn index_mut<'s>(&self, state: &'s mut CacheState) -> &'s mut CacheIndex {
        self.ensure_initialized(state);
        state.index.get_or_insert_with(CacheIndex::default)
    }

    /// Write JSON through a temp file in the cache dir, then rename into place
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        let dir = path.parent().unwrap_or(&self.cache_dir);
        std::fs::create_dir_all(dir)?;
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn save_index(&self, state: &CacheState) {
        if let Some(index) = &state.index {
            if let Err(e) = self.write_json(&self.index_path, index) {
                self.log.error(format!("Failed to save cache index: {}", e));
            }
        }
    }

    fn save_metadata(&self, state: &CacheState) {
        if let Err(e) = self.write_json(&self.metadata_path, &state.metadata) {
            self.log.error(format!("Failed to save cache metadata: {}", e));
        }
    }

    fn wipe_files(&self) {
        if self.entries_dir.exists() {
            let _ = std::fs::remove_dir_all(&self.entries_dir);
        }
        if self.index_path.exists() {
            let _ = std::fs::remove_file(&self.index_path);
        }
        if let Err(e) = std::fs::create_dir_all(&self.entries_dir) {
            self.log.warn(format!("Failed to recreate cache directory: {}", e));
        }
    }

    fn clear_locked(&self, state: &mut CacheState) {
        self.wipe_files();
        state.index = Some(CacheIndex::default());
        self.save_index(state);
        self.log.info("Cache cleared");
    }

    fn invalidate_matching_locked(&self, state: &mut CacheState, filter: &dyn Fn(&CacheEntry, &str) -> bool) -> usize {
        let index = self.index_mut(state);
        let doomed: Vec<String> = index
            .entries
            .iter()
            .filter(|(key, entry)| filter(entry, key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            let path = self.entries_dir.join(entry_file_name(key));
            if path.exists() {
                let _ = std::fs::remove_file(&path);
            }
            index.entries.remove(key);
        }

        if !doomed.is_empty() {
            self.save_index(state);
            self.log.info(format!("Invalidated {} cache entries", doomed.len()));
        }
        doomed.len()
    }
}

impl TranslationCache for CacheManager {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let cache_key = generate_cache_key(key);
        let mut state = self.state.lock();
        let index = self.index_mut(&mut state);

        let entry = index.entries.get(&cache_key).cloned();
        match entry {
            Some(entry) if self.entries_dir.join(entry_file_name(&cache_key)).exists() => {
                self.log.debug(format!("Cache hit: {}...", truncate_key(&cache_key)));
                Some(entry)
            }
            Some(_) => {
                // Entry file vanished; drop the stale index record
                index.entries.remove(&cache_key);
                self.save_index(&state);
                self.log.debug(format!("Cache miss: {}...", truncate_key(&cache_key)));
                None
            }
            None => {
                self.log.debug(format!("Cache miss: {}...", truncate_key(&cache_key)));
                None
            }
        }
    }

    fn set(&self, key: &CacheKey, translation: &str, quality_score: f64) {
        let cache_key = generate_cache_key(key);
        let entry = CacheEntry {
            source_hash: hash_content(key.content),
            source_lang: key.source_lang.to_string(),
            target_lang: key.target_lang.to_string(),
            glossary_hash: key.glossary.map(hash_content).unwrap_or_default(),
            translation: translation.to_string(),
            quality_score,
            created_at: Utc::now().to_rfc3339(),
            provider: key.provider.to_string(),
            model: key.model.to_string(),
        };

        let mut state = self.state.lock();
        self.ensure_initialized(&mut state);

        let entry_path = self.entries_dir.join(entry_file_name(&cache_key));
        match self.write_json(&entry_path, &entry) {
            Ok(()) => {
                self.index_mut(&mut state).entries.insert(cache_key.clone(), entry);
                self.save_index(&state);
                self.log.debug(format!("Cached: {}...", truncate_key(&cache_key)));
            }
            Err(e) => self.log.error(format!("Failed to cache entry: {}", e)),
        }
    }

    fn delete(&self, key: &CacheKey) -> bool {
        let cache_key = generate_cache_key(key);
        let mut state = self.state.lock();
        let index = self.index_mut(&mut state);

        if index.entries.remove(&cache_key).is_none() {
            return false;
        }
        let path = self.entries_dir.join(entry_file_name(&cache_key));
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        self.save_index(&state);
        true
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        self.ensure_initialized(&mut state);
        self.clear_locked(&mut state);
    }

    fn stats(&self) -> CacheStats {
        let mut state = self.state.lock();
        let entries = self.index_mut(&mut state).entries.len();

        let mut size_bytes = std::fs::read_dir(&self.entries_dir)
            .map(|dir| {
                dir.filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);
        size_bytes += std::fs::metadata(&self.index_path).map(|m| m.len()).unwrap_or(0);

        CacheStats {
            entries,
            size_bytes,
            version: CACHE_VERSION.to_string(),
        }
    }

    fn apply_policies(&self, context: &InvalidationContext) -> usize {
        let mut state = self.state.lock();
        self.ensure_initialized(&mut state);

        if state.policies.is_empty() {
            return 0;
        }

        // A language seen for the first time has no previous hash
        let previous = match &context.target_lang {
            Some(lang) => state.metadata.glossary_hashes.get(lang).cloned(),
            None => state.metadata.glossary_hash.clone(),
        };
        let context = InvalidationContext {
            previous_glossary_hash: previous,
            ..context.clone()
        };

        let results: Vec<(String, InvalidationResult)> = state
            .policies
            .iter()
            .map(|p| (p.name().to_string(), p.check(&context)))
            .collect();

        let mut total = 0;
        for (name, result) in results {
            match result {
                InvalidationResult::Skip => continue,
                InvalidationResult::InvalidateAll { reason } => {
                    self.log.info(format!("Applying {}: {}", name, reason));
                    total += self.index_mut(&mut state).entries.len();
                    self.clear_locked(&mut state);
                    break;
                }
                InvalidationResult::InvalidateMatching { reason, filter } => {
                    self.log.info(format!("Applying {}: {}", name, reason));
                    total += self.invalidate_matching_locked(&mut state, filter.as_ref());
                }
            }
        }

        if let Some(hash) = &context.glossary_hash {
            state.metadata.glossary_hash = Some(hash.clone());
            if let Some(lang) = &context.target_lang {
                state.metadata.glossary_hashes.insert(lang.clone(), hash.clone());
            }
        }
        if let Some(provider) = &context.provider {
            state.metadata.provider = Some(provider.clone());
        }
        if let Some(model) = &context.model {
            state.metadata.model = Some(model.clone());
        }
        if total > 0 {
            state.metadata.last_invalidation = Some(Utc::now().to_rfc3339());
        }
        self.save_metadata(&state);

        total
    }
}

fn truncate_key(key: &str) -> &str {
    match key.char_indices().nth(20) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}
